use crate::error::{Position, ReqError};

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    String,
    Number,
    Signature,

    // Sigils
    Label,
    Assign,
    AssignIndex,
    Const,
    GetValue,
    GetIndex,

    // Grouping
    ParenOpen,
    ParenClose,
    BracketOpen,
    BracketClose,

    Ident,
}

impl TokenKind {
    /// The name used for this kind in user-facing error messages.
    pub fn public_name(&self) -> &'static str {
        #[rustfmt::skip]
        let name = match self {
            TokenKind::String       => "string",
            TokenKind::Number       => "number",
            TokenKind::Signature    => "|",
            TokenKind::Label        => ":",
            TokenKind::Assign       => "!",
            TokenKind::AssignIndex  => "!#",
            TokenKind::Const        => "$",
            TokenKind::GetValue     => "@",
            TokenKind::GetIndex     => "@#",
            TokenKind::ParenOpen    => "(",
            TokenKind::ParenClose   => ")",
            TokenKind::BracketOpen  => "[",
            TokenKind::BracketClose => "]",
            TokenKind::Ident        => "identifier",
        };

        name
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new<S>(kind: TokenKind, literal: S, position: Position) -> Token
    where
        S: Into<String>,
    {
        Token {
            kind,
            literal: literal.into(),
            line: position.line,
            column: position.column,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    /// Structural error located at this token.
    pub fn structure_error<S>(&self, msg: S) -> ReqError
    where
        S: Into<String>,
    {
        ReqError::structure_error(msg).at(self.position())
    }

    /// Runtime error located at this token.
    pub fn runtime_error<S>(&self, msg: S) -> ReqError
    where
        S: Into<String>,
    {
        ReqError::runtime_error(msg).at(self.position())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{} `{}` {} {}}}",
            self.kind, self.literal, self.line, self.column
        )
    }
}
