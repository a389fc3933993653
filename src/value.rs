use std::fmt;
use std::ptr;
use std::rc::Rc;

use crate::error::RuntimeResult;
use crate::expr::LiteralValue;
use crate::function::Function;
use crate::interpreter::Interpreter;

/// Anything that can appear in callee position of a call expression.
pub trait Callable: fmt::Display {
    fn name(&self) -> &str;

    fn arity(&self) -> usize;

    /// `arguments.len()` has already been checked against `arity()`.
    /// `line` is the line of the call site, for errors raised by the callee itself.
    fn call(
        &self,
        interpreter: &mut Interpreter<'_>,
        arguments: Vec<Value>,
        line: u32,
    ) -> RuntimeResult<Value>;

    /// `Some` for functions declared in the program, `None` for natives.
    fn as_function(&self) -> Option<&Function> {
        None
    }

    /// Equality for callables: the same allocation unless overridden.
    fn same_as(&self, other: &dyn Callable) -> bool {
        ptr::addr_eq(self as *const Self, other as *const dyn Callable)
    }
}

#[derive(Clone)]
pub enum Value {
    Literal(LiteralValue),
    Callable(Rc<dyn Callable>),
}

impl Value {
    pub fn nil() -> Value {
        Value::Literal(LiteralValue::Nil)
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Literal(LiteralValue::Nil))
    }

    /// `nil`, `false` and the number zero are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Literal(LiteralValue::Nil) => false,
            Value::Literal(LiteralValue::Boolean(value)) => *value,
            Value::Literal(LiteralValue::Number(value)) => *value != 0.0,
            _ => true,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Literal(LiteralValue::Number(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::Literal(LiteralValue::String(_)))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Literal(left), Value::Literal(right)) => left == right,
            (Value::Callable(left), Value::Callable(right)) => left.same_as(right.as_ref()),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Literal(value) => write!(f, "{value}"),
            Value::Callable(callable) => write!(f, "{callable}"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Literal(value) => write!(f, "{value:?}"),
            Value::Callable(callable) => write!(f, "Callable({callable})"),
        }
    }
}

impl From<LiteralValue> for Value {
    fn from(value: LiteralValue) -> Value {
        Value::Literal(value)
    }
}

impl From<f64> for Value {
    fn from(number: f64) -> Value {
        Value::Literal(LiteralValue::Number(number))
    }
}

impl From<bool> for Value {
    fn from(boolean: bool) -> Value {
        Value::Literal(LiteralValue::Boolean(boolean))
    }
}

impl From<String> for Value {
    fn from(string: String) -> Value {
        Value::Literal(LiteralValue::String(string))
    }
}
