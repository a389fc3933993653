use std::fmt;
use std::time::Instant;

use once_cell::sync::Lazy;

use crate::error::{RuntimeError, RuntimeErrorKind, RuntimeResult};
use crate::interpreter::Interpreter;
use crate::value::{Callable, Value};

static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

type NativeFn = fn(&[Value], u32) -> RuntimeResult<Value>;

pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: NativeFn,
}

pub fn standard_library() -> Vec<NativeFunction> {
    // start the clock when the first interpreter is created rather than on the first call
    Lazy::force(&EPOCH);

    vec![
        NativeFunction {
            name: "clock",
            arity: 0,
            func: native_clock,
        },
        NativeFunction {
            name: "sqrt",
            arity: 1,
            func: native_sqrt,
        },
        NativeFunction {
            name: "toString",
            arity: 1,
            func: native_to_string,
        },
    ]
}

impl Callable for NativeFunction {
    fn name(&self) -> &str {
        self.name
    }

    fn arity(&self) -> usize {
        self.arity
    }

    fn call(
        &self,
        _interpreter: &mut Interpreter<'_>,
        arguments: Vec<Value>,
        line: u32,
    ) -> RuntimeResult<Value> {
        (self.func)(&arguments, line)
    }
}

impl fmt::Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn>")
    }
}

/// Seconds since the interpreter's epoch.
fn native_clock(_args: &[Value], _line: u32) -> RuntimeResult<Value> {
    Ok(EPOCH.elapsed().as_secs_f64().into())
}

fn native_sqrt(args: &[Value], line: u32) -> RuntimeResult<Value> {
    let number = single_argument(args, line)?
        .as_number()
        .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::OperandNotNumber, line))?;
    if number < 0.0 {
        return Err(RuntimeError::new(RuntimeErrorKind::NegativeSqrt, line));
    }
    Ok(number.sqrt().into())
}

fn native_to_string(args: &[Value], line: u32) -> RuntimeResult<Value> {
    let value = single_argument(args, line)?;
    Ok(value.to_string().into())
}

fn single_argument(args: &[Value], line: u32) -> RuntimeResult<&Value> {
    match args {
        [value] => Ok(value),
        _ => Err(RuntimeError::new(
            RuntimeErrorKind::ArityMismatch {
                expected: 1,
                found: args.len(),
            },
            line,
        )),
    }
}
