use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{RuntimeError, RuntimeErrorKind, RuntimeResult};
use crate::function::Function;
use crate::scanner::Token;
use crate::stmt::FunctionDecl;
use crate::value::Value;

/// The constructs that introduce a scope. The resolver pushes one static scope
/// and the interpreter creates one environment for each `Block` and each
/// `Function` invocation, so resolved distances line up with the runtime chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Block,
    Function,
}

/// Shared handle to one link of the environment chain. Cloning the handle is
/// how closures keep their defining scope alive.
#[derive(Clone)]
pub struct Environment {
    frame: Rc<RefCell<Frame>>,
}

struct Frame {
    kind: ScopeKind,
    values: HashMap<String, Slot>,
    enclosing: Option<Environment>,
}

enum Slot {
    Value(Value),
    // A function closing over this very frame. Only the declaration is kept so the
    // frame and the function never own each other; reads rebuild the function.
    Function(Rc<FunctionDecl>),
}

impl Environment {
    pub fn global() -> Environment {
        Environment::from_frame(ScopeKind::Global, None)
    }

    pub fn nested(enclosing: &Environment, kind: ScopeKind) -> Environment {
        tracing::trace!(?kind, depth = enclosing.depth() + 1, "entering scope");
        Environment::from_frame(kind, Some(enclosing.clone()))
    }

    fn from_frame(kind: ScopeKind, enclosing: Option<Environment>) -> Environment {
        Environment {
            frame: Rc::new(RefCell::new(Frame {
                kind,
                values: HashMap::new(),
                enclosing,
            })),
        }
    }

    /// Number of links between this environment and the global root.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.enclosing();
        while let Some(env) = current {
            depth += 1;
            current = env.enclosing();
        }
        depth
    }

    pub fn enclosing(&self) -> Option<Environment> {
        self.frame.borrow().enclosing.clone()
    }

    pub fn same_frame(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.frame, &other.frame)
    }

    /// Binds `name` in this scope, replacing any previous binding.
    pub fn define(&self, name: &str, value: Value) {
        let slot = self.slot_for(value);
        self.frame.borrow_mut().values.insert(name.to_string(), slot);
    }

    pub fn get(&self, name: &Token) -> RuntimeResult<Value> {
        let mut current = Some(self.clone());
        while let Some(env) = current {
            if let Some(value) = env.read(&name.lexeme) {
                return Ok(value);
            }
            current = env.enclosing();
        }
        Err(undefined(name))
    }

    pub fn assign(&self, name: &Token, value: Value) -> RuntimeResult<()> {
        let mut current = Some(self.clone());
        while let Some(env) = current {
            if env.frame.borrow().values.contains_key(&name.lexeme) {
                env.define(&name.lexeme, value);
                return Ok(());
            }
            current = env.enclosing();
        }
        Err(undefined(name))
    }

    /// Reads from exactly `distance` links up, without searching further.
    pub fn get_at(&self, distance: usize, name: &Token) -> RuntimeResult<Value> {
        let ancestor = self.ancestor(distance, name)?;
        ancestor.read(&name.lexeme).ok_or_else(|| {
            let kind = ancestor.frame.borrow().kind;
            tracing::warn!(
                name = %name.lexeme,
                distance,
                ?kind,
                "resolved binding missing at runtime"
            );
            undefined(name)
        })
    }

    /// Writes into exactly `distance` links up, without searching further.
    pub fn assign_at(&self, distance: usize, name: &Token, value: Value) -> RuntimeResult<()> {
        let ancestor = self.ancestor(distance, name)?;
        ancestor.define(&name.lexeme, value);
        Ok(())
    }

    fn read(&self, name: &str) -> Option<Value> {
        let frame = self.frame.borrow();
        let value = match frame.values.get(name)? {
            Slot::Value(value) => value.clone(),
            Slot::Function(declaration) => {
                let function = Function::new(Rc::clone(declaration), self.clone());
                Value::Callable(Rc::new(function))
            }
        };
        Some(value)
    }

    fn slot_for(&self, value: Value) -> Slot {
        if let Value::Callable(callable) = &value {
            if let Some(function) = callable.as_function() {
                if function.closure().same_frame(self) {
                    return Slot::Function(Rc::clone(function.declaration()));
                }
            }
        }
        Slot::Value(value)
    }

    fn ancestor(&self, distance: usize, name: &Token) -> RuntimeResult<Environment> {
        let mut env = self.clone();
        for _ in 0..distance {
            // a resolved distance longer than the chain means the resolver and interpreter disagree
            env = env.enclosing().ok_or_else(|| undefined(name))?;
        }
        Ok(env)
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frame = self.frame.borrow();
        let mut names: Vec<&String> = frame.values.keys().collect();
        names.sort();
        f.debug_struct("Environment")
            .field("kind", &frame.kind)
            .field("names", &names)
            .field("depth", &self.depth())
            .finish()
    }
}

fn undefined(name: &Token) -> RuntimeError {
    RuntimeError::at(RuntimeErrorKind::UndefinedVariable(name.lexeme.clone()), name)
}
