use std::fmt;
use std::rc::Rc;

use crate::environment::{Environment, ScopeKind};
use crate::error::RuntimeResult;
use crate::interpreter::{Flow, Interpreter};
use crate::stmt::FunctionDecl;
use crate::value::{Callable, Value};

/// A user-defined function together with the environment it was declared in.
///
/// The frame a function is declared in keeps only the declaration (see
/// `Environment::define`); a `Function` with a strong closure exists only while
/// the value is held outside that frame.
pub struct Function {
    declaration: Rc<FunctionDecl>,
    closure: Environment,
}

impl Function {
    pub fn new(declaration: Rc<FunctionDecl>, closure: Environment) -> Function {
        Function {
            declaration,
            closure,
        }
    }

    pub fn declaration(&self) -> &Rc<FunctionDecl> {
        &self.declaration
    }

    pub fn closure(&self) -> &Environment {
        &self.closure
    }
}

impl Callable for Function {
    fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(
        &self,
        interpreter: &mut Interpreter<'_>,
        arguments: Vec<Value>,
        _line: u32,
    ) -> RuntimeResult<Value> {
        // parameters and the body's own declarations share this one environment
        let environment = Environment::nested(&self.closure, ScopeKind::Function);
        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.define(&param.lexeme, argument);
        }

        match interpreter.execute_block(&self.declaration.body, environment)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::nil()),
        }
    }

    fn as_function(&self) -> Option<&Function> {
        Some(self)
    }

    // the same declaration closing over the same environment
    fn same_as(&self, other: &dyn Callable) -> bool {
        other.as_function().is_some_and(|other| {
            Rc::ptr_eq(&self.declaration, &other.declaration)
                && self.closure.same_frame(&other.closure)
        })
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.declaration.name.lexeme)
    }
}
