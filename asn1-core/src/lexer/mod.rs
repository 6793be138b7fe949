//! Single-pass, longest-match tokenizer for ASN.1 module source text.
//!
//! # Position tracking
//!
//! The lexer holds the full source as a `Vec<char>` plus a cursor, the
//! same read-byte/advance-cursor shape the codec layer's BER decoder uses
//! over a byte buffer, adapted to `char`s so multi-byte UTF-8 in comments
//! and string literals does not desynchronize column counting.
//!
//! # Comments
//!
//! `--` runs to end-of-line or to a second `--`, whichever comes first.
//! `/* ... */` nests.
//!
//! # Error handling
//!
//! All failures return `LexError` carrying the offending position; the
//! lexer never panics on malformed input.

mod token;

pub use token::{Token, TokenKind, KEYWORDS};

use crate::error::{LexError, LexResult, Position};

pub struct Lexer<'a> {
    source: Vec<char>,
    file: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &str, file: &'a str) -> Self {
        Self {
            source: source.chars().collect(),
            file,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire source, returning the token stream terminated
    /// by a single `TokenKind::Eof` token.
    pub fn tokenize(mut self) -> LexResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments()?;
            let start = self.position();
            let Some(c) = self.peek() else {
                tokens.push(Token::new(TokenKind::Eof, "", start));
                break;
            };

            let token = if c == '"' {
                self.lex_cstring(start)?
            } else if c == '\'' {
                self.lex_bstring_or_hstring(start)?
            } else if c.is_ascii_digit() {
                self.lex_number(start)?
            } else if c.is_ascii_alphabetic() {
                self.lex_identifier(start)
            } else {
                self.lex_punctuation(start)?
            };
            tokens.push(token);
        }
        log::trace!("lexer '{}' produced {} tokens", self.file, tokens.len());
        Ok(tokens)
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self) -> LexResult<()> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('-') if self.peek_at(1) == Some('-') => {
                    self.skip_line_comment();
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    self.skip_block_comment()?;
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn skip_line_comment(&mut self) {
        self.advance(); // '-'
        self.advance(); // '-'
        loop {
            match self.peek() {
                None | Some('\n') => break,
                Some('-') if self.peek_at(1) == Some('-') => {
                    self.advance();
                    self.advance();
                    break;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn skip_block_comment(&mut self) -> LexResult<()> {
        let start = self.position();
        self.advance(); // '/'
        self.advance(); // '*'
        let mut depth = 1usize;
        while depth > 0 {
            match self.peek() {
                None => {
                    return Err(LexError::new(start, "unterminated block comment"));
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    self.advance();
                    self.advance();
                    depth += 1;
                }
                Some('*') if self.peek_at(1) == Some('/') => {
                    self.advance();
                    self.advance();
                    depth -= 1;
                }
                _ => {
                    self.advance();
                }
            }
        }
        Ok(())
    }

    fn lex_cstring(&mut self, start: Position) -> LexResult<Token> {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(LexError::new(start, "unterminated string literal")),
                Some('"') => {
                    self.advance();
                    if self.peek() == Some('"') {
                        // doubled quote is an escaped quote
                        value.push('"');
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
        let lexeme = value.clone();
        Ok(Token::new(TokenKind::CString(value), lexeme, start))
    }

    /// Lex `'...'B` (binary string) or `'...'H` (hex string) literals.
    fn lex_bstring_or_hstring(&mut self, start: Position) -> LexResult<Token> {
        self.advance(); // opening quote
        let mut raw = String::new();
        loop {
            match self.peek() {
                None => return Err(LexError::new(start, "unterminated bit/hex string literal")),
                Some('\'') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    if !c.is_whitespace() {
                        raw.push(c);
                    }
                    self.advance();
                }
            }
        }
        match self.peek() {
            Some('B') => {
                self.advance();
                let mut bits = Vec::with_capacity(raw.len());
                for c in raw.chars() {
                    match c {
                        '0' => bits.push(false),
                        '1' => bits.push(true),
                        other => {
                            return Err(LexError::new(
                                start,
                                format!("illegal character '{other}' in binary string literal"),
                            ))
                        }
                    }
                }
                Ok(Token::new(TokenKind::Binary(bits), raw, start))
            }
            Some('H') => {
                self.advance();
                if raw.len() % 2 != 0 {
                    return Err(LexError::new(
                        start,
                        "hex string literal must have an even number of digits",
                    ));
                }
                let mut bytes = Vec::with_capacity(raw.len() / 2);
                let digits: Vec<char> = raw.chars().collect();
                for pair in digits.chunks(2) {
                    let s: String = pair.iter().collect();
                    let byte = u8::from_str_radix(&s, 16).map_err(|_| {
                        LexError::new(start, format!("illegal hex digit in '{raw}'"))
                    })?;
                    bytes.push(byte);
                }
                Ok(Token::new(TokenKind::Hex(bytes), raw, start))
            }
            _ => Err(LexError::new(
                start,
                "bit/hex string literal must be terminated with 'B or 'H",
            )),
        }
    }

    fn lex_number(&mut self, start: Position) -> LexResult<Token> {
        let mut raw = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                raw.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let value: i128 = raw
            .parse()
            .map_err(|_| LexError::new(start, format!("integer literal '{raw}' out of range")))?;
        Ok(Token::new(TokenKind::Integer(value), raw, start))
    }

    fn lex_identifier(&mut self, start: Position) -> Token {
        let mut raw = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '-' {
                raw.push(c);
                self.advance();
            } else {
                break;
            }
        }
        // A trailing '-' is not part of an identifier per X.680 clause 11.3.
        while raw.ends_with('-') {
            raw.pop();
            self.pos -= 1;
            self.column -= 1;
        }
        let kind = if KEYWORDS.contains(&raw.as_str()) {
            TokenKind::Reserved
        } else if raw.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
            TokenKind::TypeReference
        } else {
            TokenKind::ValueReference
        };
        Token::new(kind, raw, start)
    }

    fn lex_punctuation(&mut self, start: Position) -> LexResult<Token> {
        // Longest-match multi-character punctuation first.
        for op in ["::=", "...", "..", "[[", "]]"] {
            if self.matches_literal(op) {
                for _ in 0..op.chars().count() {
                    self.advance();
                }
                return Ok(Token::new(TokenKind::Punctuation, op, start));
            }
        }
        let c = self.advance().expect("peek() returned Some above");
        match c {
            '{' | '}' | '(' | ')' | '[' | ']' | ',' | '.' | '|' | '^' | '-' | '@' | '&' | ';'
            | '<' | '>' | '!' | ':' => Ok(Token::new(TokenKind::Punctuation, c.to_string(), start)),
            other => Err(LexError::new(
                start,
                format!("illegal character '{other}'"),
            )),
        }
    }

    fn matches_literal(&self, lit: &str) -> bool {
        lit.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src, "<test>")
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokenizes_simple_assignment() {
        let toks = kinds("Foo ::= INTEGER (0..127)");
        assert_eq!(
            toks,
            vec![
                TokenKind::TypeReference,
                TokenKind::Punctuation,
                TokenKind::Reserved,
                TokenKind::Punctuation,
                TokenKind::Integer(0),
                TokenKind::Punctuation,
                TokenKind::Integer(127),
                TokenKind::Punctuation,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn skips_line_and_block_comments() {
        let toks = kinds("-- a comment\nFoo /* nested /* block */ comment */ ::= NULL");
        assert!(matches!(toks[0], TokenKind::TypeReference));
    }

    #[test]
    fn lexes_binary_and_hex_strings() {
        let toks = kinds("'0110'B '2F'H");
        match &toks[0] {
            TokenKind::Binary(bits) => assert_eq!(bits, &[false, true, true, false]),
            other => panic!("expected Binary, got {other:?}"),
        }
        match &toks[1] {
            TokenKind::Hex(bytes) => assert_eq!(bytes, &[0x2F]),
            other => panic!("expected Hex, got {other:?}"),
        }
    }

    #[test]
    fn lexes_string_literal_with_escaped_quote() {
        let toks = kinds("\"a\"\"b\"");
        match &toks[0] {
            TokenKind::CString(s) => assert_eq!(s, "a\"b"),
            other => panic!("expected CString, got {other:?}"),
        }
    }

    #[test]
    fn rejects_illegal_character() {
        let err = Lexer::new("#", "<test>").tokenize().unwrap_err();
        assert_eq!(err.message, "illegal character '#'");
    }

    #[test]
    fn rejects_unterminated_comment() {
        let err = Lexer::new("/* never closed", "<test>").tokenize().unwrap_err();
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn distinguishes_type_and_value_references() {
        let toks = kinds("Type1 value1");
        assert_eq!(toks[0], TokenKind::TypeReference);
        assert_eq!(toks[1], TokenKind::ValueReference);
    }
}
