use std::error::Error;
use std::result;

use thiserror::Error;

use crate::scanner::{Token, TokenType};

pub type GenericResult<T> = result::Result<T, Box<dyn Error>>;
pub type RuntimeResult<T> = result::Result<T, RuntimeError>;

/// Exit code for a script that failed to scan, parse or resolve.
pub const EXIT_STATIC_ERROR: u8 = 65;
/// Exit code for a script that stopped on a runtime error.
pub const EXIT_RUNTIME_ERROR: u8 = 70;

/// A lexical, syntactic or resolution error, reported before anything runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[line {line}] Error{location}: {message}")]
pub struct StaticError {
    pub line: u32,
    /// Empty, `" at end"` or `" at '<lexeme>'"`.
    pub location: String,
    pub message: String,
}

/// Collects static errors across the scanner, parser and resolver for a single run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<StaticError>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    pub fn error_at_line(&mut self, line: u32, message: &str) {
        self.push(StaticError {
            line,
            location: String::new(),
            message: message.to_string(),
        });
    }

    pub fn error_at_token(&mut self, token: &Token, message: &str) {
        let location = if token.token_type == TokenType::Eof {
            " at end".to_string()
        } else {
            format!(" at '{}'", token.lexeme)
        };
        self.push(StaticError {
            line: token.line,
            location,
            message: message.to_string(),
        });
    }

    fn push(&mut self, error: StaticError) {
        tracing::debug!(%error, "static error reported");
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[StaticError] {
        &self.errors
    }

    /// Turns any collected errors into an `ExecutionError`, leaving the collector empty.
    pub fn check(&mut self) -> result::Result<(), ExecutionError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ExecutionError::Static(std::mem::take(&mut self.errors)))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeErrorKind {
    #[error("Operand must be a number.")]
    OperandNotNumber,
    #[error("Operands must be numbers.")]
    OperandsNotNumbers,
    #[error("Operands must be two numbers or at least one string.")]
    InvalidAddition,
    #[error("Division by zero.")]
    DivisionByZero,
    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),
    #[error("Can only call functions.")]
    NotCallable,
    #[error("Expected {expected} arguments but got {found}.")]
    ArityMismatch { expected: usize, found: usize },
    #[error("Cannot take the square root of a negative number.")]
    NegativeSqrt,
    #[error("Failed to write program output: {0}")]
    Output(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}\n[line {line}]")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub line: u32,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, line: u32) -> RuntimeError {
        RuntimeError { kind, line }
    }

    pub fn at(kind: RuntimeErrorKind, token: &Token) -> RuntimeError {
        RuntimeError::new(kind, token.line)
    }
}

/// Everything that can stop a call to `execute`.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("{}", join_lines(.0))]
    Static(Vec<StaticError>),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl ExecutionError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ExecutionError::Static(_) => EXIT_STATIC_ERROR,
            ExecutionError::Runtime(_) => EXIT_RUNTIME_ERROR,
        }
    }
}

fn join_lines(errors: &[StaticError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
