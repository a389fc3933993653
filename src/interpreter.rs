use std::io::Write;
use std::rc::Rc;

use crate::environment::{Environment, ScopeKind};
use crate::error::{RuntimeError, RuntimeErrorKind, RuntimeResult};
use crate::expr::{Expr, ExprId, ExprIdGenerator, LiteralValue};
use crate::function::Function;
use crate::resolver::Locals;
use crate::scanner::{Token, TokenType};
use crate::stdlib;
use crate::stmt::{FunctionDecl, Stmt};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Script,
    /// Top-level expression statements also print their non-nil values.
    Interactive,
}

/// Outcome of executing a statement. `Return` travels up through blocks and
/// loops until the enclosing call consumes it.
#[derive(Debug)]
pub enum Flow {
    Normal,
    Return(Value),
}

type FlowResult = RuntimeResult<Flow>;
type ValueResult = RuntimeResult<Value>;

pub struct Interpreter<'a> {
    globals: Environment,
    environment: Environment,
    locals: Locals,
    expr_ids: ExprIdGenerator,
    mode: Mode,
    output_writer: &'a mut dyn Write,
}

impl<'a> Interpreter<'a> {
    pub fn new(output_writer: &'a mut dyn Write) -> Interpreter<'a> {
        Interpreter::with_mode(output_writer, Mode::Script)
    }

    pub fn with_mode(output_writer: &'a mut dyn Write, mode: Mode) -> Interpreter<'a> {
        let globals = Environment::global();
        for native in stdlib::standard_library() {
            let name = native.name;
            globals.define(name, Value::Callable(Rc::new(native)));
        }

        Interpreter {
            environment: globals.clone(),
            globals,
            locals: Locals::new(),
            expr_ids: ExprIdGenerator::new(),
            mode,
            output_writer,
        }
    }

    pub fn globals(&self) -> &Environment {
        &self.globals
    }

    /// Node ids for the parser; shared across runs so the side table never sees a repeat.
    pub fn expr_ids(&mut self) -> &mut ExprIdGenerator {
        &mut self.expr_ids
    }

    /// Adds the resolver's distances for a freshly parsed program.
    pub fn resolve(&mut self, locals: Locals) {
        self.locals.extend(locals);
    }

    /// Runs top-level statements in order, stopping at the first runtime error.
    pub fn interpret(&mut self, statements: &[Stmt]) -> RuntimeResult<()> {
        for statement in statements {
            match statement {
                Stmt::Expression { expression } if self.mode == Mode::Interactive => {
                    let value = self.evaluate(expression)?;
                    if !value.is_nil() {
                        self.write_line(&value, expression)?;
                    }
                }
                _ => {
                    // the resolver rejects top-level `return`, so the flow is always Normal here
                    self.execute(statement)?;
                }
            }
        }
        Ok(())
    }

    /// Executes `statements` in `environment`, restoring the current environment afterwards
    /// even when an error propagates.
    pub(crate) fn execute_block(&mut self, statements: &[Stmt], environment: Environment) -> FlowResult {
        let previous = std::mem::replace(&mut self.environment, environment);
        let result = self.execute_all(statements);
        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> FlowResult {
        for statement in statements {
            if let Flow::Return(value) = self.execute(statement)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn execute(&mut self, statement: &Stmt) -> FlowResult {
        match statement {
            Stmt::Block { statements } => {
                let environment = Environment::nested(&self.environment, ScopeKind::Block);
                self.execute_block(statements, environment)
            }
            Stmt::Expression { expression } => {
                self.evaluate(expression)?;
                Ok(Flow::Normal)
            }
            Stmt::Function(declaration) => self.function_statement(declaration),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_statement) = else_branch {
                    self.execute(else_statement)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::Print { expression } => {
                let value = self.evaluate(expression)?;
                self.write_line(&value, expression)?;
                Ok(Flow::Normal)
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expression) => self.evaluate(expression)?,
                    None => Value::nil(),
                };
                Ok(Flow::Return(value))
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expression) => self.evaluate(expression)?,
                    None => Value::nil(),
                };
                self.environment.define(&name.lexeme, value);
                Ok(Flow::Normal)
            }
            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
        }
    }

    fn function_statement(&mut self, declaration: &Rc<FunctionDecl>) -> FlowResult {
        let function = Function::new(Rc::clone(declaration), self.environment.clone());
        // bound before anything can call it, so the body may refer to itself;
        // the environment keeps only the declaration of a function closing over it
        self.environment
            .define(&declaration.name.lexeme, Value::Callable(Rc::new(function)));
        Ok(Flow::Normal)
    }

    fn evaluate(&mut self, expression: &Expr) -> ValueResult {
        match expression {
            Expr::Assign { id, name, value } => self.evaluate_assign(*id, name, value),
            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }
            Expr::Logical {
                left,
                operator,
                right,
            } => self.evaluate_logical(left, operator, right),
            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary_operation(operator, left, right)
            }
            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),
            Expr::Grouping { expression } => self.evaluate(expression),
            Expr::Literal { value } => Ok(Value::from(value.clone())),
            Expr::Unary { operator, right } => {
                let operand = self.evaluate(right)?;
                unary_operation(operator, &operand)
            }
            Expr::Variable { id, name } => self.look_up_variable(*id, name),
        }
    }

    fn evaluate_assign(&mut self, id: ExprId, name: &Token, value: &Expr) -> ValueResult {
        let value = self.evaluate(value)?;
        match self.locals.get(&id) {
            Some(distance) => self.environment.assign_at(*distance, name, value.clone())?,
            None => self.globals.assign(name, value.clone())?,
        }
        Ok(value)
    }

    fn evaluate_logical(&mut self, left: &Expr, operator: &Token, right: &Expr) -> ValueResult {
        let left = self.evaluate(left)?;

        // short circuit if possible
        match operator.token_type {
            TokenType::Or if left.is_truthy() => return Ok(left),
            TokenType::Or => {}
            // `condition ? value` without an else branch
            TokenType::Question if !left.is_truthy() => return Ok(Value::nil()),
            TokenType::Question => {}
            _ if !left.is_truthy() => return Ok(left),
            _ => {}
        }

        self.evaluate(right)
    }

    fn evaluate_call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr]) -> ValueResult {
        let callee = self.evaluate(callee)?;

        let mut evaluated_args = Vec::with_capacity(arguments.len());
        for argument in arguments {
            evaluated_args.push(self.evaluate(argument)?);
        }

        let Value::Callable(function) = callee else {
            return Err(RuntimeError::at(RuntimeErrorKind::NotCallable, paren));
        };

        if evaluated_args.len() != function.arity() {
            return Err(RuntimeError::at(
                RuntimeErrorKind::ArityMismatch {
                    expected: function.arity(),
                    found: evaluated_args.len(),
                },
                paren,
            ));
        }

        tracing::debug!(name = function.name(), line = paren.line, "calling function");
        function.call(self, evaluated_args, paren.line)
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> ValueResult {
        match self.locals.get(&id) {
            Some(distance) => self.environment.get_at(*distance, name),
            None => self.globals.get(name),
        }
    }

    fn write_line(&mut self, value: &Value, expression: &Expr) -> RuntimeResult<()> {
        writeln!(self.output_writer, "{value}").map_err(|error| {
            RuntimeError::new(
                RuntimeErrorKind::Output(error.to_string()),
                expression.line().unwrap_or_default(),
            )
        })
    }
}

fn binary_operation(operator: &Token, left: Value, right: Value) -> ValueResult {
    let evaluated = match operator.token_type {
        TokenType::Comma => return Ok(right),
        TokenType::EqualEqual => LiteralValue::Boolean(left == right),
        TokenType::BangEqual => LiteralValue::Boolean(left != right),
        TokenType::Plus => {
            if let (Some(left_number), Some(right_number)) = (left.as_number(), right.as_number()) {
                LiteralValue::Number(left_number + right_number)
            } else if left.is_string() || right.is_string() {
                LiteralValue::String(format!("{left}{right}"))
            } else {
                return Err(RuntimeError::at(RuntimeErrorKind::InvalidAddition, operator));
            }
        }
        _ => {
            let (left_number, right_number) = number_operands(operator, &left, &right)?;
            match operator.token_type {
                TokenType::Minus => LiteralValue::Number(left_number - right_number),
                TokenType::Star => LiteralValue::Number(left_number * right_number),
                TokenType::Slash => {
                    if right_number == 0.0 {
                        return Err(RuntimeError::at(RuntimeErrorKind::DivisionByZero, operator));
                    }
                    LiteralValue::Number(left_number / right_number)
                }
                TokenType::Greater => LiteralValue::Boolean(left_number > right_number),
                TokenType::GreaterEqual => LiteralValue::Boolean(left_number >= right_number),
                TokenType::Less => LiteralValue::Boolean(left_number < right_number),
                TokenType::LessEqual => LiteralValue::Boolean(left_number <= right_number),
                // unhandled case here indicates a bug in the parser
                _ => unreachable!("parser produced binary operator {:?}", operator.token_type),
            }
        }
    };
    Ok(Value::from(evaluated))
}

fn unary_operation(operator: &Token, operand: &Value) -> ValueResult {
    match operator.token_type {
        TokenType::Bang => Ok(Value::from(!operand.is_truthy())),
        _ => {
            let number = operand
                .as_number()
                .ok_or_else(|| RuntimeError::at(RuntimeErrorKind::OperandNotNumber, operator))?;
            Ok(Value::from(-number))
        }
    }
}

fn number_operands(operator: &Token, left: &Value, right: &Value) -> RuntimeResult<(f64, f64)> {
    match (left.as_number(), right.as_number()) {
        (Some(left), Some(right)) => Ok((left, right)),
        _ => Err(RuntimeError::at(RuntimeErrorKind::OperandsNotNumbers, operator)),
    }
}
