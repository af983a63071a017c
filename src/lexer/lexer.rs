use crate::error::{Position, ReqError, Result};
use crate::lexer::token::{Token, TokenKind};

use std::iter::Iterator;

#[derive(Debug)]
pub struct Lexer {
    input: Vec<char>,
    current: usize,
    peek: usize,
    ch: Option<char>,
    line: usize,
    column: usize,
    failed: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Lexer {
        let mut lexer = Lexer {
            input: input.chars().collect(),
            current: 0,
            peek: 0,
            ch: None,
            line: 1,
            column: 0,
            failed: false,
        };

        lexer.read_char();

        lexer
    }

    fn read_char(&mut self) {
        if self.ch == Some('\n') {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        self.ch = self.input.get(self.peek).copied();
        self.current = self.peek;
        self.peek += 1;
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.peek).copied()
    }

    fn cursor(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn slice(&self, start: usize) -> String {
        self.input[start..self.current].iter().collect()
    }

    fn illegal_char(&self) -> ReqError {
        match self.ch {
            Some(ch) => ReqError::lexer_error(
                self.cursor(),
                format!("illegal character '{}'", ch.escape_debug()),
            ),
            None => ReqError::lexer_error(self.cursor(), "unexpected end of input"),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.ch {
                Some(ch) if ch.is_whitespace() => self.read_char(),
                Some(';') => {
                    while !matches!(self.ch, None | Some('\n')) {
                        self.read_char()
                    }
                }
                _ => return,
            }
        }
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        let position = self.cursor();
        let literal = self.ch.map(String::from).unwrap_or_default();
        self.read_char();

        Token::new(kind, literal, position)
    }

    fn double(&mut self, kind: TokenKind) -> Token {
        let position = self.cursor();
        let start = self.current;
        self.read_char();
        self.read_char();

        Token::new(kind, self.slice(start), position)
    }

    /// Skips the sigil under the cursor and reads the identifier behind it.
    fn read_sigil_ident(&mut self, kind: TokenKind) -> Result<Token> {
        if !self.peek_char().map_or(false, is_ident_char) {
            return Err(self.illegal_char());
        }

        let position = self.cursor();
        self.read_char();

        Ok(Token::new(kind, self.read_ident(), position))
    }

    fn read_ident(&mut self) -> String {
        let start = self.current;

        if self.ch.map_or(false, is_operator) {
            self.read_char();
        } else {
            while self.ch.map_or(false, |ch| is_ident_char(ch) && !is_operator(ch)) {
                self.read_char()
            }
        }

        self.slice(start)
    }

    fn read_number(&mut self) -> String {
        let start = self.current;
        let mut dot = false;

        if self.ch == Some('-') {
            self.read_char();
        }

        while let Some(ch) = self.ch {
            if ch == '.' {
                if dot {
                    break;
                }
                dot = true;
            } else if !is_digit(ch) {
                break;
            }

            self.read_char();
        }

        self.slice(start)
    }

    fn read_signature(&mut self) -> Result<Token> {
        let position = self.cursor();
        self.read_char();

        let starts_number = match self.ch {
            Some('-') => self.peek_char().map_or(false, is_digit),
            Some(ch) => is_digit(ch),
            None => false,
        };
        if !starts_number {
            return Err(ReqError::lexer_error(
                self.cursor(),
                "malformed signature, expected a number after '|'",
            ));
        }

        Ok(Token::new(TokenKind::Signature, self.read_number(), position))
    }

    fn read_label(&mut self) -> Result<Token> {
        if !self.peek_char().map_or(false, is_ident_char) {
            return Err(ReqError::lexer_error(
                self.cursor(),
                "malformed label, expected a name after ':'",
            ));
        }

        let position = self.cursor();
        self.read_char();
        let start = self.current;
        while self.ch.map_or(false, is_ident_char) {
            self.read_char()
        }

        Ok(Token::new(TokenKind::Label, self.slice(start), position))
    }

    fn read_string(&mut self, raw: bool) -> Result<Token> {
        let position = self.cursor();
        let quote = if raw { '`' } else { '"' };
        let mut literal = String::new();

        self.read_char();

        loop {
            match self.ch {
                None => {
                    return Err(ReqError::lexer_error(
                        position,
                        "unterminated string literal",
                    ))
                }
                Some(ch) if ch == quote => break,
                Some('\\') if !raw => {
                    self.read_char();
                    let escaped = match self.ch {
                        Some(ch @ ('\\' | '\'' | '"')) => ch,
                        Some('n') => '\n',
                        Some('f') => '\x0c',
                        Some('t') => '\t',
                        Some('0') => '\0',
                        Some('a') => '\x07',
                        Some(ch) => {
                            return Err(ReqError::lexer_error(
                                self.cursor(),
                                format!("invalid escape sequence character '{}'", ch),
                            ))
                        }
                        None => {
                            return Err(ReqError::lexer_error(
                                position,
                                "unterminated string literal",
                            ))
                        }
                    };
                    literal.push(escaped);
                }
                Some(ch) => literal.push(ch),
            }

            self.read_char();
        }

        self.read_char();

        Ok(Token::new(TokenKind::String, literal, position))
    }

    fn read_token(&mut self, ch: char) -> Result<Token> {
        let token = match ch {
            '(' => self.single(TokenKind::ParenOpen),
            ')' => self.single(TokenKind::ParenClose),
            '[' => self.single(TokenKind::BracketOpen),
            ']' => self.single(TokenKind::BracketClose),
            '!' if self.peek_char() == Some('#') => self.double(TokenKind::AssignIndex),
            '!' => self.read_sigil_ident(TokenKind::Assign)?,
            '@' if self.peek_char() == Some('#') => self.double(TokenKind::GetIndex),
            '@' => self.read_sigil_ident(TokenKind::GetValue)?,
            '$' => self.read_sigil_ident(TokenKind::Const)?,
            ':' => self.read_label()?,
            '"' => self.read_string(false)?,
            '`' => self.read_string(true)?,
            '|' => self.read_signature()?,
            '-' if self.peek_char().map_or(false, is_digit) => {
                let position = self.cursor();
                Token::new(TokenKind::Number, self.read_number(), position)
            }
            ch if is_digit(ch) => {
                let position = self.cursor();
                Token::new(TokenKind::Number, self.read_number(), position)
            }
            ch if is_ident_char(ch) => {
                let position = self.cursor();
                Token::new(TokenKind::Ident, self.read_ident(), position)
            }
            _ => return Err(self.illegal_char()),
        };

        Ok(token)
    }
}

/// Tokenizes a whole program, stopping at the first lexical error.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    Lexer::new(input).collect()
}

const SIGILS: &str = "!$@()[]";

fn is_ident_char(ch: char) -> bool {
    !ch.is_whitespace() && !ch.is_control() && !SIGILS.contains(ch)
}

/// Operator glyphs always scan as one-character identifiers.
fn is_operator(ch: char) -> bool {
    matches!(ch, '+' | '-' | '*' | '/')
}

fn is_digit(ch: char) -> bool {
    ch.is_ascii_digit()
}

impl Iterator for Lexer {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        self.skip_whitespace_and_comments();

        let token = self.read_token(self.ch?);
        self.failed = token.is_err();

        Some(token)
    }
}
