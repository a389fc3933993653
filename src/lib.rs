mod function;
mod stdlib;

pub mod environment;
pub mod error;
pub mod expr;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stmt;
pub mod value;

use crate::error::{Diagnostics, ExecutionError};
use crate::expr::ExprIdGenerator;
use crate::stmt::Stmt;

pub use interpreter::{Interpreter, Mode};

pub type ExecutionResult = Result<(), ExecutionError>;

/// Scans and parses `code`. Lexical and syntax errors are all collected before
/// returning, so a single run reports every one of them.
pub fn parse_source(code: &str, ids: &mut ExprIdGenerator) -> Result<Vec<Stmt>, ExecutionError> {
    let mut diagnostics = Diagnostics::new();
    let tokens = scanner::scan_tokens(code, &mut diagnostics);
    let statements = parser::parse(&tokens, ids, &mut diagnostics);
    diagnostics.check()?;
    Ok(statements)
}

/// Runs `code` through the whole pipeline against `interpreter`. Nothing executes
/// if scanning, parsing or resolving reported an error.
#[tracing::instrument(level = "debug", skip_all)]
pub fn execute(code: &str, interpreter: &mut Interpreter) -> ExecutionResult {
    let statements = parse_source(code, interpreter.expr_ids())?;

    let mut diagnostics = Diagnostics::new();
    let locals = resolver::resolve(&statements, &mut diagnostics);
    diagnostics.check()?;

    interpreter.resolve(locals);
    interpreter.interpret(&statements)?;
    Ok(())
}
