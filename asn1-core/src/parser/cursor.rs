//! Token-stream cursor with one-token lookahead.

use crate::error::{ParseError, ParseResult, Position};
use crate::lexer::{Token, TokenKind};

pub struct Cursor<'a> {
    tokens: &'a [Token],
    file: String,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(tokens: &'a [Token], file: impl Into<String>) -> Self {
        Self {
            tokens,
            file: file.into(),
            pos: 0,
        }
    }

    pub fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub fn peek_n(&self, n: usize) -> &Token {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    pub fn position(&self) -> Position {
        self.peek().position
    }

    pub fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    pub fn at_eof(&self) -> bool {
        self.peek().is_eof()
    }

    /// True if the next token is reserved word `word`.
    pub fn is_reserved(&self, word: &str) -> bool {
        let t = self.peek();
        matches!(t.kind, TokenKind::Reserved) && t.lexeme == word
    }

    /// True if the next token is punctuation `sym`.
    pub fn is_punct(&self, sym: &str) -> bool {
        let t = self.peek();
        matches!(t.kind, TokenKind::Punctuation) && t.lexeme == sym
    }

    pub fn eat_reserved(&mut self, word: &str) -> ParseResult<Token> {
        if self.is_reserved(word) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(word))
        }
    }

    pub fn eat_punct(&mut self, sym: &str) -> ParseResult<Token> {
        if self.is_punct(sym) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(sym))
        }
    }

    pub fn try_eat_punct(&mut self, sym: &str) -> bool {
        if self.is_punct(sym) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn try_eat_reserved(&mut self, word: &str) -> bool {
        if self.is_reserved(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn eat_type_reference(&mut self) -> ParseResult<String> {
        if matches!(self.peek().kind, TokenKind::TypeReference) {
            Ok(self.advance().lexeme)
        } else {
            Err(self.unexpected("type reference"))
        }
    }

    pub fn eat_value_reference(&mut self) -> ParseResult<String> {
        if matches!(self.peek().kind, TokenKind::ValueReference) {
            Ok(self.advance().lexeme)
        } else {
            Err(self.unexpected("value reference"))
        }
    }

    pub fn eat_integer(&mut self) -> ParseResult<i128> {
        match self.peek().kind.clone() {
            TokenKind::Integer(v) => {
                self.advance();
                Ok(v)
            }
            _ => Err(self.unexpected("integer literal")),
        }
    }

    pub fn eat_cstring(&mut self) -> ParseResult<String> {
        match self.peek().kind.clone() {
            TokenKind::CString(s) => {
                self.advance();
                Ok(s)
            }
            _ => Err(self.unexpected("character string literal")),
        }
    }

    pub fn unexpected(&self, expected: &str) -> ParseError {
        let tok = self.peek();
        ParseError::new(
            self.file.clone(),
            tok.position,
            expected,
            format!("found '{}'", tok.lexeme),
        )
    }
}
