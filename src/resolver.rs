use std::collections::HashMap;

use crate::environment::ScopeKind;
use crate::error::Diagnostics;
use crate::expr::{Expr, ExprId};
use crate::scanner::Token;
use crate::stmt::{FunctionDecl, Stmt};

/// Resolver side table: how many environments up from the current one each
/// local variable reference lives. References missing from the table are global.
pub type Locals = HashMap<ExprId, usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    // name reserved, initializer still running
    Declared,
    Defined,
}

struct Scope {
    kind: ScopeKind,
    names: HashMap<String, Binding>,
}

struct VarScopes<'a> {
    // the global scope is never on this stack
    stack: Vec<Scope>,
    locals: Locals,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> VarScopes<'a> {
    fn new(diagnostics: &'a mut Diagnostics) -> VarScopes<'a> {
        VarScopes {
            stack: Vec::new(),
            locals: Locals::new(),
            diagnostics,
        }
    }

    fn push(&mut self, kind: ScopeKind) {
        self.stack.push(Scope {
            kind,
            names: HashMap::new(),
        });
    }

    fn pop(&mut self) {
        self.stack.pop();
    }

    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.stack.last_mut() else {
            return;
        };
        if scope.names.contains_key(&name.lexeme) {
            self.diagnostics
                .error_at_token(name, "Already a variable with this name in this scope.");
        } else {
            scope.names.insert(name.lexeme.clone(), Binding::Declared);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.stack.last_mut() {
            scope.names.insert(name.lexeme.clone(), Binding::Defined);
        }
    }

    fn is_declared_only(&self, name: &str) -> bool {
        self.stack
            .last()
            .and_then(|scope| scope.names.get(name))
            .is_some_and(|binding| *binding == Binding::Declared)
    }

    fn in_function(&self) -> bool {
        self.stack.iter().any(|scope| scope.kind == ScopeKind::Function)
    }

    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        let found = self
            .stack
            .iter()
            .rev()
            .position(|scope| scope.names.contains_key(&name.lexeme));
        if let Some(distance) = found {
            tracing::trace!(name = %name.lexeme, distance, line = name.line, "resolved local");
            self.locals.insert(id, distance);
        }
    }
}

/// Resolves every local variable reference in `statements`. Scoping errors are
/// reported into `diagnostics`; resolution keeps going so all of them surface.
pub fn resolve(statements: &[Stmt], diagnostics: &mut Diagnostics) -> Locals {
    let mut scope = VarScopes::new(diagnostics);
    for statement in statements {
        resolve_statement(statement, &mut scope);
    }
    tracing::debug!(count = scope.locals.len(), "resolved local references");
    scope.locals
}

fn resolve_statement(statement: &Stmt, scope: &mut VarScopes) {
    match statement {
        Stmt::Block { statements } => block_statement(statements, scope),
        Stmt::Expression { expression } => resolve_expr(expression, scope),
        Stmt::Function(declaration) => function_statement(declaration, scope),
        Stmt::If {
            condition,
            then_branch,
            else_branch,
        } => if_statement(condition, then_branch, else_branch.as_deref(), scope),
        Stmt::Print { expression } => resolve_expr(expression, scope),
        Stmt::Return { keyword, value } => return_statement(keyword, value.as_ref(), scope),
        Stmt::Var { name, initializer } => var_statement(name, initializer.as_ref(), scope),
        Stmt::While { condition, body } => while_statement(condition, body, scope),
    }
}

fn block_statement(statements: &[Stmt], scope: &mut VarScopes) {
    scope.push(ScopeKind::Block);
    for statement in statements {
        resolve_statement(statement, scope);
    }
    scope.pop();
}

fn function_statement(declaration: &FunctionDecl, scope: &mut VarScopes) {
    // defined before the body so the function can call itself
    scope.declare(&declaration.name);
    scope.define(&declaration.name);

    scope.push(ScopeKind::Function);
    for param in &declaration.params {
        scope.declare(param);
        scope.define(param);
    }
    for statement in &declaration.body {
        resolve_statement(statement, scope);
    }
    scope.pop();
}

fn if_statement(
    condition: &Expr,
    then_branch: &Stmt,
    else_branch: Option<&Stmt>,
    scope: &mut VarScopes,
) {
    resolve_expr(condition, scope);
    resolve_statement(then_branch, scope);
    if let Some(else_statement) = else_branch {
        resolve_statement(else_statement, scope);
    }
}

fn return_statement(keyword: &Token, value: Option<&Expr>, scope: &mut VarScopes) {
    if !scope.in_function() {
        scope
            .diagnostics
            .error_at_token(keyword, "Can't return from top-level code.");
    }
    if let Some(value) = value {
        resolve_expr(value, scope);
    }
}

fn var_statement(name: &Token, initializer: Option<&Expr>, scope: &mut VarScopes) {
    scope.declare(name);
    if let Some(initializer) = initializer {
        resolve_expr(initializer, scope);
    }
    scope.define(name);
}

fn while_statement(condition: &Expr, body: &Stmt, scope: &mut VarScopes) {
    resolve_expr(condition, scope);
    resolve_statement(body, scope);
}

fn resolve_expr(expression: &Expr, scope: &mut VarScopes) {
    match expression {
        Expr::Assign { id, name, value } => resolve_assign(*id, name, value, scope),
        Expr::Ternary {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            resolve_expr(condition, scope);
            resolve_expr(then_branch, scope);
            resolve_expr(else_branch, scope);
        }
        Expr::Logical { left, right, .. } | Expr::Binary { left, right, .. } => {
            resolve_expr(left, scope);
            resolve_expr(right, scope);
        }
        Expr::Call {
            callee, arguments, ..
        } => resolve_call(callee, arguments, scope),
        Expr::Grouping { expression } => resolve_expr(expression, scope),
        Expr::Literal { .. } => {}
        Expr::Unary { right, .. } => resolve_expr(right, scope),
        Expr::Variable { id, name } => resolve_variable(*id, name, scope),
    }
}

fn resolve_assign(id: ExprId, name: &Token, value: &Expr, scope: &mut VarScopes) {
    resolve_expr(value, scope);
    scope.resolve_local(id, name);
}

fn resolve_call(callee: &Expr, arguments: &[Expr], scope: &mut VarScopes) {
    resolve_expr(callee, scope);
    for argument in arguments {
        resolve_expr(argument, scope);
    }
}

fn resolve_variable(id: ExprId, name: &Token, scope: &mut VarScopes) {
    if scope.is_declared_only(&name.lexeme) {
        scope
            .diagnostics
            .error_at_token(name, "Can't read local variable in its own initializer.");
    }
    scope.resolve_local(id, name);
}
