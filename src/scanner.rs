use std::fmt;

use crate::error::Diagnostics;
use crate::expr::LiteralValue;

/// Scans the whole source, reporting lexical errors into `diagnostics`.
/// The returned sequence always ends with a single `Eof` token.
pub fn scan_tokens(code: &str, diagnostics: &mut Diagnostics) -> Vec<Token> {
    let tokens: Vec<Token> = Scanner::new(code, diagnostics).collect();
    tracing::debug!(count = tokens.len(), "scanned tokens");
    tokens
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub literal: Option<LiteralValue>,
    pub line: u32,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.literal {
            Some(literal) => write!(f, "{:?} {} {}", self.token_type, self.lexeme, literal),
            None => write!(f, "{:?} {}", self.token_type, self.lexeme),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // Single-character tokens.
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,
    Question,
    Colon,

    // One or two character tokens.
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Literals.
    Identifier,
    String,
    Number,

    // Keywords.
    And,
    Class,
    Else,
    False,
    Fun,
    For,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    Eof,
}

fn keyword(text: &str) -> Option<TokenType> {
    let token_type = match text {
        "and" => TokenType::And,
        "class" => TokenType::Class,
        "else" => TokenType::Else,
        "false" => TokenType::False,
        "for" => TokenType::For,
        "fun" => TokenType::Fun,
        "if" => TokenType::If,
        "nil" => TokenType::Nil,
        "or" => TokenType::Or,
        "print" => TokenType::Print,
        "return" => TokenType::Return,
        "super" => TokenType::Super,
        "this" => TokenType::This,
        "true" => TokenType::True,
        "var" => TokenType::Var,
        "while" => TokenType::While,
        _ => return None,
    };
    Some(token_type)
}

/// Lazily produces tokens; yields `Eof` once and then stops.
pub struct Scanner<'a> {
    chars: Vec<char>,
    cursor_begin: usize,
    cursor_end: usize,
    line: u32,
    finished: bool,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> Scanner<'a> {
    pub fn new(code: &str, diagnostics: &'a mut Diagnostics) -> Scanner<'a> {
        Scanner {
            chars: code.chars().collect(),
            cursor_begin: 0,
            cursor_end: 0,
            line: 1,
            finished: false,
            diagnostics,
        }
    }

    fn next_token(&mut self) -> Token {
        loop {
            if self.at_end() {
                return Token {
                    token_type: TokenType::Eof,
                    lexeme: String::new(),
                    literal: None,
                    line: self.line,
                };
            }

            self.cursor_begin = self.cursor_end;
            if let Some(token) = self.scan_token() {
                tracing::trace!(%token, line = token.line, "token");
                return token;
            }
        }
    }

    // Returns None for input that produces no token (whitespace, comments, errors).
    fn scan_token(&mut self) -> Option<Token> {
        let current = self.advance();

        let token_type = match current {
            '(' => TokenType::LeftParen,
            ')' => TokenType::RightParen,
            '{' => TokenType::LeftBrace,
            '}' => TokenType::RightBrace,
            ',' => TokenType::Comma,
            '.' => TokenType::Dot,
            '-' => TokenType::Minus,
            '+' => TokenType::Plus,
            ';' => TokenType::Semicolon,
            '*' => TokenType::Star,
            '?' => TokenType::Question,
            ':' => TokenType::Colon,
            '!' => self.either('=', TokenType::BangEqual, TokenType::Bang),
            '=' => self.either('=', TokenType::EqualEqual, TokenType::Equal),
            '<' => self.either('=', TokenType::LessEqual, TokenType::Less),
            '>' => self.either('=', TokenType::GreaterEqual, TokenType::Greater),
            '/' => {
                if self.advance_if('/') {
                    while self.peek() != Some('\n') && !self.at_end() {
                        self.advance();
                    }
                    return None;
                } else if self.advance_if('*') {
                    self.block_comment();
                    return None;
                }
                TokenType::Slash
            }
            ' ' | '\r' | '\t' => return None,
            '\n' => {
                self.line += 1;
                return None;
            }
            '"' => return self.string(),
            c if c.is_ascii_digit() => return Some(self.number()),
            c if is_alpha(c) => return Some(self.identifier()),
            _ => {
                self.diagnostics.error_at_line(self.line, "Unexpected character.");
                return None;
            }
        };

        Some(self.make_token(token_type, None))
    }

    fn block_comment(&mut self) {
        while !self.at_end() {
            if self.peek() == Some('*') && self.peek_next() == Some('/') {
                self.advance();
                self.advance();
                return;
            }
            if self.advance() == '\n' {
                self.line += 1;
            }
        }
        self.diagnostics
            .error_at_line(self.line, "Unterminated block comment.");
    }

    fn string(&mut self) -> Option<Token> {
        while self.peek() != Some('"') && !self.at_end() {
            if self.advance() == '\n' {
                self.line += 1;
            }
        }

        if self.at_end() {
            self.diagnostics.error_at_line(self.line, "Unterminated string.");
            return None;
        }

        // closing quote
        self.advance();

        let value: String = self.chars[self.cursor_begin + 1..self.cursor_end - 1]
            .iter()
            .collect();
        Some(self.make_token(TokenType::String, Some(LiteralValue::String(value))))
    }

    fn number(&mut self) -> Token {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        // a fractional part needs at least one digit after the dot
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let lexeme = self.lexeme();
        // digits with at most one inner dot always parse
        let value = lexeme.parse::<f64>().unwrap_or_default();
        Token {
            token_type: TokenType::Number,
            lexeme,
            literal: Some(LiteralValue::Number(value)),
            line: self.line,
        }
    }

    fn identifier(&mut self) -> Token {
        while self.peek().is_some_and(is_alphanumeric) {
            self.advance();
        }

        let token_type = keyword(&self.lexeme()).unwrap_or(TokenType::Identifier);
        self.make_token(token_type, None)
    }

    fn make_token(&self, token_type: TokenType, literal: Option<LiteralValue>) -> Token {
        Token {
            token_type,
            lexeme: self.lexeme(),
            literal,
            line: self.line,
        }
    }

    fn lexeme(&self) -> String {
        self.chars[self.cursor_begin..self.cursor_end].iter().collect()
    }

    fn either(&mut self, expected: char, matched: TokenType, otherwise: TokenType) -> TokenType {
        if self.advance_if(expected) {
            matched
        } else {
            otherwise
        }
    }

    fn advance(&mut self) -> char {
        let current = self.chars[self.cursor_end];
        self.cursor_end += 1;
        current
    }

    fn advance_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.cursor_end += 1;
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.cursor_end).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.cursor_end + 1).copied()
    }

    fn at_end(&self) -> bool {
        self.cursor_end >= self.chars.len()
    }
}

impl Iterator for Scanner<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }

        let token = self.next_token();
        if token.token_type == TokenType::Eof {
            self.finished = true;
        }
        Some(token)
    }
}

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_alphanumeric(c: char) -> bool {
    is_alpha(c) || c.is_ascii_digit()
}
