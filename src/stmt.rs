use std::rc::Rc;

use crate::expr::{print_ast, Expr};
use crate::scanner::Token;

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block {
        statements: Vec<Stmt>,
    },
    Expression {
        expression: Expr,
    },
    Function(Rc<FunctionDecl>),
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    Print {
        expression: Expr,
    },
    Return {
        keyword: Token,
        value: Option<Expr>,
    },
    Var {
        name: Token,
        initializer: Option<Expr>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
}

/// Shared between the statement tree and every closure created from it.
#[derive(Debug, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

/// Renders a statement tree in the same prefix form as `print_ast`.
pub fn print_stmt(statement: &Stmt) -> String {
    match statement {
        Stmt::Block { statements } => {
            let inner: Vec<String> = statements.iter().map(print_stmt).collect();
            if inner.is_empty() {
                "(block)".to_string()
            } else {
                format!("(block {})", inner.join(" "))
            }
        }
        Stmt::Expression { expression } => format!("(; {})", print_ast(expression)),
        Stmt::Function(decl) => {
            let params: Vec<&str> = decl.params.iter().map(|param| param.lexeme.as_str()).collect();
            let mut printed = format!("(fun {} ({})", decl.name.lexeme, params.join(" "));
            for statement in &decl.body {
                printed.push(' ');
                printed.push_str(&print_stmt(statement));
            }
            printed.push(')');
            printed
        }
        Stmt::If {
            condition,
            then_branch,
            else_branch,
        } => match else_branch {
            Some(else_branch) => format!(
                "(if {} {} {})",
                print_ast(condition),
                print_stmt(then_branch),
                print_stmt(else_branch)
            ),
            None => format!("(if {} {})", print_ast(condition), print_stmt(then_branch)),
        },
        Stmt::Print { expression } => format!("(print {})", print_ast(expression)),
        Stmt::Return { value, .. } => match value {
            Some(value) => format!("(return {})", print_ast(value)),
            None => "(return)".to_string(),
        },
        Stmt::Var { name, initializer } => match initializer {
            Some(initializer) => format!("(var {} {})", name.lexeme, print_ast(initializer)),
            None => format!("(var {})", name.lexeme),
        },
        Stmt::While { condition, body } => {
            format!("(while {} {})", print_ast(condition), print_stmt(body))
        }
    }
}
