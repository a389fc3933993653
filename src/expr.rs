use std::fmt;

use crate::scanner::Token;

/// Identity of a variable-reference node, used as the key of the resolver's side table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(u32);

/// Hands out node ids. One generator lives as long as the interpreter that
/// consumes the resolved ids, so ids never repeat between runs.
#[derive(Debug, Default)]
pub struct ExprIdGenerator {
    next: u32,
}

impl ExprIdGenerator {
    pub fn new() -> ExprIdGenerator {
        ExprIdGenerator::default()
    }

    pub fn next_id(&mut self) -> ExprId {
        let id = ExprId(self.next);
        self.next += 1;
        id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },
    Ternary {
        condition: Box<Expr>,
        question: Token,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        paren: Token,
        arguments: Vec<Expr>,
    },
    Grouping {
        expression: Box<Expr>,
    },
    Literal {
        value: LiteralValue,
    },
    Unary {
        operator: Token,
        right: Box<Expr>,
    },
    Variable {
        id: ExprId,
        name: Token,
    },
}

impl Expr {
    /// Source line of the first token the node holds; literals carry none.
    pub fn line(&self) -> Option<u32> {
        match self {
            Expr::Assign { name, .. } | Expr::Variable { name, .. } => Some(name.line),
            Expr::Ternary { question, .. } => Some(question.line),
            Expr::Logical { operator, .. }
            | Expr::Binary { operator, .. }
            | Expr::Unary { operator, .. } => Some(operator.line),
            Expr::Call { paren, .. } => Some(paren.line),
            Expr::Grouping { expression } => expression.line(),
            Expr::Literal { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Boolean(bool),
    Nil,
    Number(f64),
    String(String),
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Nil => write!(f, "nil"),
            Self::Number(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value}"),
        }
    }
}

/// Renders an expression tree in prefix form, e.g. `(* (- 123) (group 45.67))`.
pub fn print_ast(root: &Expr) -> String {
    let mut printed = String::new();
    format_expr(root, &mut printed);
    printed
}

fn format_expr(expr: &Expr, output: &mut String) {
    match expr {
        Expr::Assign { name, value, .. } => {
            output.push_str("(= ");
            output.push_str(&name.lexeme);
            output.push(' ');
            format_expr(value, output);
            output.push(')');
        }
        Expr::Ternary {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            let operands = [condition.as_ref(), then_branch.as_ref(), else_branch.as_ref()];
            format_subexprs("?", &operands, output);
        }
        Expr::Logical {
            left,
            operator,
            right,
        }
        | Expr::Binary {
            left,
            operator,
            right,
        } => {
            format_subexprs(&operator.lexeme, &[left.as_ref(), right.as_ref()], output);
        }
        Expr::Call {
            callee, arguments, ..
        } => {
            let mut operands = vec![callee.as_ref()];
            operands.extend(arguments.iter());
            format_subexprs("call", &operands, output);
        }
        Expr::Grouping { expression } => {
            format_subexprs("group", &[expression.as_ref()], output);
        }
        Expr::Literal { value } => match value {
            LiteralValue::String(text) => {
                output.push('"');
                output.push_str(text);
                output.push('"');
            }
            other => output.push_str(&other.to_string()),
        },
        Expr::Unary { operator, right } => {
            format_subexprs(&operator.lexeme, &[right.as_ref()], output);
        }
        Expr::Variable { name, .. } => {
            output.push_str(&name.lexeme);
        }
    }
}

fn format_subexprs(name: &str, exprs: &[&Expr], output: &mut String) {
    output.push('(');
    output.push_str(name);
    for expr in exprs {
        output.push(' ');
        format_expr(expr, output);
    }
    output.push(')');
}
