use std::rc::Rc;

use crate::error::Diagnostics;
use crate::expr::{Expr, ExprIdGenerator, LiteralValue};
use crate::scanner::{Token, TokenType};
use crate::stmt::{FunctionDecl, Stmt};

const MAX_ARGUMENTS: usize = 255;

type StmtResult = Result<Stmt, ParseError>;
type ExprResult = Result<Expr, ParseError>;

/// A syntax error that has already been reported; unwinds to the enclosing declaration.
#[derive(Debug)]
struct ParseError;

/// Parses an `Eof`-terminated token sequence. Syntax errors are reported into
/// `diagnostics` and the parser resynchronizes at the next statement, so the
/// returned list only holds the statements that parsed cleanly.
pub fn parse(tokens: &[Token], ids: &mut ExprIdGenerator, diagnostics: &mut Diagnostics) -> Vec<Stmt> {
    let mut statements = Vec::new();
    if tokens.is_empty() {
        return statements;
    }

    let mut cursor = TokenCursor::new(tokens, ids, diagnostics);
    while !cursor.at_end() {
        if let Some(statement) = declaration(&mut cursor) {
            statements.push(statement);
        }
    }

    tracing::debug!(count = statements.len(), "parsed statements");
    statements
}

fn declaration(cursor: &mut TokenCursor) -> Option<Stmt> {
    let result = if cursor.advance_if_match(TokenType::Var).is_some() {
        var_declaration(cursor)
    } else {
        statement(cursor)
    };

    match result {
        Ok(statement) => Some(statement),
        Err(ParseError) => {
            cursor.synchronize();
            None
        }
    }
}

fn var_declaration(cursor: &mut TokenCursor) -> StmtResult {
    let name = cursor.consume(TokenType::Identifier, "Expect variable name.")?;

    let initializer = if cursor.advance_if_match(TokenType::Equal).is_some() {
        Some(expression(cursor)?)
    } else {
        None
    };

    cursor.consume(TokenType::Semicolon, "Expect ';' after variable declaration.")?;
    Ok(Stmt::Var { name, initializer })
}

fn statement(cursor: &mut TokenCursor) -> StmtResult {
    let token_type = cursor.peek().token_type;
    match token_type {
        TokenType::Fun => {
            cursor.advance();
            function_declaration(cursor, "function")
        }
        TokenType::For => {
            cursor.advance();
            for_statement(cursor)
        }
        TokenType::If => {
            cursor.advance();
            if_statement(cursor)
        }
        TokenType::Print => {
            cursor.advance();
            print_statement(cursor)
        }
        TokenType::Return => {
            cursor.advance();
            return_statement(cursor)
        }
        TokenType::While => {
            cursor.advance();
            while_statement(cursor)
        }
        TokenType::LeftBrace => {
            cursor.advance();
            Ok(Stmt::Block {
                statements: block(cursor)?,
            })
        }
        _ => expression_statement(cursor),
    }
}

fn function_declaration(cursor: &mut TokenCursor, kind: &str) -> StmtResult {
    let name = cursor.consume(TokenType::Identifier, &format!("Expect {kind} name."))?;
    cursor.consume(TokenType::LeftParen, &format!("Expect '(' after {kind} name."))?;

    let mut params = Vec::new();
    if !cursor.check(TokenType::RightParen) {
        loop {
            if params.len() >= MAX_ARGUMENTS {
                let token = cursor.peek();
                cursor.report(token, "Can't have more than 255 parameters.");
            }
            params.push(cursor.consume(TokenType::Identifier, "Expect parameter name.")?);
            if cursor.advance_if_match(TokenType::Comma).is_none() {
                break;
            }
        }
    }
    cursor.consume(TokenType::RightParen, "Expect ')' after parameters.")?;

    // `fun name(params);` declares a function with an empty body
    let body = if cursor.advance_if_match(TokenType::Semicolon).is_some() {
        Vec::new()
    } else {
        cursor.consume(TokenType::LeftBrace, &format!("Expect '{{' or ';' after {kind} signature."))?;
        block(cursor)?
    };

    Ok(Stmt::Function(Rc::new(FunctionDecl { name, params, body })))
}

fn for_statement(cursor: &mut TokenCursor) -> StmtResult {
    cursor.consume(TokenType::LeftParen, "Expect '(' after 'for'.")?;

    let initializer = if cursor.advance_if_match(TokenType::Semicolon).is_some() {
        None
    } else if cursor.advance_if_match(TokenType::Var).is_some() {
        Some(var_declaration(cursor)?)
    } else {
        Some(expression_statement(cursor)?)
    };

    let condition = if cursor.check(TokenType::Semicolon) {
        None
    } else {
        Some(expression(cursor)?)
    };
    cursor.consume(TokenType::Semicolon, "Expect ';' after loop condition.")?;

    let increment = if cursor.check(TokenType::RightParen) {
        None
    } else {
        Some(expression(cursor)?)
    };
    cursor.consume(TokenType::RightParen, "Expect ')' after for clauses.")?;

    let mut body = statement(cursor)?;

    if let Some(increment) = increment {
        body = Stmt::Block {
            statements: vec![body, Stmt::Expression { expression: increment }],
        };
    }

    let condition = condition.unwrap_or(Expr::Literal {
        value: LiteralValue::Boolean(true),
    });
    body = Stmt::While {
        condition,
        body: Box::new(body),
    };

    if let Some(initializer) = initializer {
        body = Stmt::Block {
            statements: vec![initializer, body],
        };
    }

    Ok(body)
}

fn if_statement(cursor: &mut TokenCursor) -> StmtResult {
    cursor.consume(TokenType::LeftParen, "Expect '(' after 'if'.")?;
    let condition = expression(cursor)?;
    cursor.consume(TokenType::RightParen, "Expect ')' after if condition.")?;

    let then_branch = Box::new(statement(cursor)?);
    let else_branch = if cursor.advance_if_match(TokenType::Else).is_some() {
        Some(Box::new(statement(cursor)?))
    } else {
        None
    };

    Ok(Stmt::If {
        condition,
        then_branch,
        else_branch,
    })
}

fn print_statement(cursor: &mut TokenCursor) -> StmtResult {
    let expression = expression(cursor)?;
    cursor.consume(TokenType::Semicolon, "Expect ';' after value.")?;
    Ok(Stmt::Print { expression })
}

fn return_statement(cursor: &mut TokenCursor) -> StmtResult {
    let keyword = cursor.previous().clone();
    let value = if cursor.check(TokenType::Semicolon) {
        None
    } else {
        Some(comma_sequence(cursor)?)
    };

    cursor.consume(TokenType::Semicolon, "Expect ';' after return value.")?;
    Ok(Stmt::Return { keyword, value })
}

fn while_statement(cursor: &mut TokenCursor) -> StmtResult {
    cursor.consume(TokenType::LeftParen, "Expect '(' after 'while'.")?;
    let condition = expression(cursor)?;
    cursor.consume(TokenType::RightParen, "Expect ')' after while condition.")?;
    let body = Box::new(statement(cursor)?);

    Ok(Stmt::While { condition, body })
}

fn expression_statement(cursor: &mut TokenCursor) -> StmtResult {
    let expression = comma_sequence(cursor)?;
    cursor.consume(TokenType::Semicolon, "Expect ';' after expression.")?;
    Ok(Stmt::Expression { expression })
}

fn block(cursor: &mut TokenCursor) -> Result<Vec<Stmt>, ParseError> {
    let mut statements = Vec::new();
    while !cursor.check(TokenType::RightBrace) && !cursor.at_end() {
        if let Some(statement) = declaration(cursor) {
            statements.push(statement);
        }
    }

    cursor.consume(TokenType::RightBrace, "Expect '}' after block.")?;
    Ok(statements)
}

fn comma_sequence(cursor: &mut TokenCursor) -> ExprResult {
    binary_left_associative(cursor, expression, &[TokenType::Comma], make_binary)
}

fn expression(cursor: &mut TokenCursor) -> ExprResult {
    ternary(cursor)
}

fn ternary(cursor: &mut TokenCursor) -> ExprResult {
    if let Some(question) = cursor.advance_if_match(TokenType::Question) {
        assignment(cursor)?;
        if cursor.advance_if_match(TokenType::Colon).is_some() {
            ternary(cursor)?;
        }
        return Err(missing_left_operand(cursor, &question));
    }

    let condition = assignment(cursor)?;

    let Some(question) = cursor.advance_if_match(TokenType::Question) else {
        return Ok(condition);
    };
    let then_branch = assignment(cursor)?;

    if cursor.advance_if_match(TokenType::Colon).is_some() {
        let else_branch = ternary(cursor)?;
        Ok(Expr::Ternary {
            condition: Box::new(condition),
            question,
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    } else {
        // `condition ? value` without an else branch short-circuits like `and`, yielding nil
        Ok(Expr::Logical {
            left: Box::new(condition),
            operator: question,
            right: Box::new(then_branch),
        })
    }
}

fn assignment(cursor: &mut TokenCursor) -> ExprResult {
    reject_leading_operator(cursor, logic_or, &[TokenType::Equal])?;

    let expr = logic_or(cursor)?;

    let Some(equals) = cursor.advance_if_match(TokenType::Equal) else {
        return Ok(expr);
    };
    let value = assignment(cursor)?;

    match expr {
        Expr::Variable { id, name } => Ok(Expr::Assign {
            id,
            name,
            value: Box::new(value),
        }),
        other => {
            cursor.report(&equals, "Invalid assignment target.");
            Ok(other)
        }
    }
}

fn logic_or(cursor: &mut TokenCursor) -> ExprResult {
    binary_left_associative(cursor, logic_and, &[TokenType::Or], make_logical)
}

fn logic_and(cursor: &mut TokenCursor) -> ExprResult {
    binary_left_associative(cursor, equality, &[TokenType::And], make_logical)
}

fn equality(cursor: &mut TokenCursor) -> ExprResult {
    binary_left_associative(
        cursor,
        comparison,
        &[TokenType::BangEqual, TokenType::EqualEqual],
        make_binary,
    )
}

fn comparison(cursor: &mut TokenCursor) -> ExprResult {
    binary_left_associative(
        cursor,
        addition,
        &[
            TokenType::Greater,
            TokenType::GreaterEqual,
            TokenType::Less,
            TokenType::LessEqual,
        ],
        make_binary,
    )
}

fn addition(cursor: &mut TokenCursor) -> ExprResult {
    binary_left_associative(cursor, multiplication, &[TokenType::Minus, TokenType::Plus], make_binary)
}

fn multiplication(cursor: &mut TokenCursor) -> ExprResult {
    binary_left_associative(cursor, unary, &[TokenType::Slash, TokenType::Star], make_binary)
}

// Parse a binary left associative expression as long as the current token matches one of the given types
fn binary_left_associative(
    cursor: &mut TokenCursor,
    higher_precedence: fn(&mut TokenCursor) -> ExprResult,
    types: &[TokenType],
    build: fn(Expr, Token, Expr) -> Expr,
) -> ExprResult {
    reject_leading_operator(cursor, higher_precedence, types)?;

    let mut expr = higher_precedence(cursor)?;

    while let Some(operator) = cursor.advance_if_any_match(types) {
        let right = higher_precedence(cursor)?;
        expr = build(expr, operator, right);
    }

    Ok(expr)
}

// An infix operator at the very start of an operand means the left operand is missing.
// The operand that follows is still consumed so the error covers the whole fragment.
fn reject_leading_operator(
    cursor: &mut TokenCursor,
    operand: fn(&mut TokenCursor) -> ExprResult,
    types: &[TokenType],
) -> Result<(), ParseError> {
    let token_type = cursor.peek().token_type;
    // `-` is also a prefix operator
    if token_type == TokenType::Minus || !types.contains(&token_type) {
        return Ok(());
    }

    let operator = cursor.advance();
    operand(cursor)?;
    Err(missing_left_operand(cursor, &operator))
}

fn missing_left_operand(cursor: &mut TokenCursor, operator: &Token) -> ParseError {
    cursor.error(
        operator,
        &format!("Expected expression before '{}'.", operator.lexeme),
    )
}

fn make_binary(left: Expr, operator: Token, right: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        operator,
        right: Box::new(right),
    }
}

fn make_logical(left: Expr, operator: Token, right: Expr) -> Expr {
    Expr::Logical {
        left: Box::new(left),
        operator,
        right: Box::new(right),
    }
}

fn unary(cursor: &mut TokenCursor) -> ExprResult {
    if let Some(operator) = cursor.advance_if_any_match(&[TokenType::Bang, TokenType::Minus]) {
        let right = unary(cursor)?;
        return Ok(Expr::Unary {
            operator,
            right: Box::new(right),
        });
    }

    call(cursor)
}

fn call(cursor: &mut TokenCursor) -> ExprResult {
    let mut expr = primary(cursor)?;

    while cursor.advance_if_match(TokenType::LeftParen).is_some() {
        expr = finish_call(cursor, expr)?;
    }

    Ok(expr)
}

fn finish_call(cursor: &mut TokenCursor, callee: Expr) -> ExprResult {
    let mut arguments = Vec::new();
    if !cursor.check(TokenType::RightParen) {
        loop {
            if arguments.len() >= MAX_ARGUMENTS {
                let token = cursor.peek();
                cursor.report(token, "Can't have more than 255 arguments.");
            }
            arguments.push(expression(cursor)?);
            if cursor.advance_if_match(TokenType::Comma).is_none() {
                break;
            }
        }
    }

    let paren = cursor.consume(TokenType::RightParen, "Expect ')' after arguments.")?;

    Ok(Expr::Call {
        callee: Box::new(callee),
        paren,
        arguments,
    })
}

fn primary(cursor: &mut TokenCursor) -> ExprResult {
    let current = cursor.peek();

    let expr = match current.token_type {
        TokenType::False => Expr::Literal {
            value: LiteralValue::Boolean(false),
        },
        TokenType::True => Expr::Literal {
            value: LiteralValue::Boolean(true),
        },
        TokenType::Nil => Expr::Literal {
            value: LiteralValue::Nil,
        },
        TokenType::Number | TokenType::String => match &current.literal {
            Some(value) => Expr::Literal { value: value.clone() },
            None => return Err(cursor.error(current, "Expect expression.")),
        },
        TokenType::Identifier => Expr::Variable {
            id: cursor.ids.next_id(),
            name: current.clone(),
        },
        TokenType::LeftParen => {
            cursor.advance();
            let expression = expression(cursor)?;
            cursor.consume(TokenType::RightParen, "Expect ')' after expression.")?;
            return Ok(Expr::Grouping {
                expression: Box::new(expression),
            });
        }
        _ => return Err(cursor.error(current, "Expect expression.")),
    };

    cursor.advance();
    Ok(expr)
}

struct TokenCursor<'a> {
    tokens: &'a [Token],
    index: usize,
    ids: &'a mut ExprIdGenerator,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> TokenCursor<'a> {
    fn new(
        tokens: &'a [Token],
        ids: &'a mut ExprIdGenerator,
        diagnostics: &'a mut Diagnostics,
    ) -> TokenCursor<'a> {
        TokenCursor {
            tokens,
            index: 0,
            ids,
            diagnostics,
        }
    }

    fn peek(&self) -> &'a Token {
        &self.tokens[self.index]
    }

    fn previous(&self) -> &'a Token {
        &self.tokens[self.index.saturating_sub(1)]
    }

    // Never moves past the trailing Eof token.
    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.at_end() {
            self.index += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn check(&self, token_type: TokenType) -> bool {
        self.peek().token_type == token_type
    }

    fn advance_if_match(&mut self, token_type: TokenType) -> Option<Token> {
        if self.check(token_type) {
            Some(self.advance())
        } else {
            None
        }
    }

    fn advance_if_any_match(&mut self, types: &[TokenType]) -> Option<Token> {
        if types.contains(&self.peek().token_type) {
            Some(self.advance())
        } else {
            None
        }
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> Result<Token, ParseError> {
        if let Some(token) = self.advance_if_match(token_type) {
            Ok(token)
        } else {
            let current = self.peek();
            Err(self.error(current, message))
        }
    }

    /// Reports without unwinding; parsing continues from the current token.
    fn report(&mut self, token: &Token, message: &str) {
        self.diagnostics.error_at_token(token, message);
    }

    fn error(&mut self, token: &Token, message: &str) -> ParseError {
        self.report(token, message);
        ParseError
    }

    // Discard tokens until the start of the next statement.
    fn synchronize(&mut self) {
        self.advance();

        while !self.at_end() {
            if self.previous().token_type == TokenType::Semicolon {
                return;
            }

            match self.peek().token_type {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return => return,
                _ => {}
            }

            self.advance();
        }
    }
}
