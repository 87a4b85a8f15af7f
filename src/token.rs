use std::fmt;

/// Location of a token in the source text.
///
/// `start`/`end` are byte offsets, `line` is 1-based and `column` counts
/// characters from the start of the line, starting at 0. `end_line` differs
/// from `line` only for string literals spanning several lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Integer,
    String,
    Identifier,

    // Keywords
    Print,
    If,
    Else,
    Def,
    Return,

    // Operators
    Plus,         // +
    Minus,        // -
    Star,         // *
    Slash,        // /
    Assign,       // =
    EqualEqual,   // ==
    BangEqual,    // !=
    Less,         // <
    LessEqual,    // <=
    Greater,      // >
    GreaterEqual, // >=

    // Delimiters
    Comma,  // ,
    Colon,  // :
    LParen, // (
    RParen, // )

    Eof,
    Unknown,
}

impl TokenKind {
    pub fn keyword(ident: &str) -> Option<Self> {
        match ident {
            "print" => Some(Self::Print),
            "if" => Some(Self::If),
            "else" => Some(Self::Else),
            "def" => Some(Self::Def),
            "return" => Some(Self::Return),
            _ => None,
        }
    }

    /// Human readable name used in parse diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::String => "string",
            Self::Identifier => "identifier",
            Self::Print => "'print'",
            Self::If => "'if'",
            Self::Else => "'else'",
            Self::Def => "'def'",
            Self::Return => "'return'",
            Self::Plus => "'+'",
            Self::Minus => "'-'",
            Self::Star => "'*'",
            Self::Slash => "'/'",
            Self::Assign => "'='",
            Self::EqualEqual => "'=='",
            Self::BangEqual => "'!='",
            Self::Less => "'<'",
            Self::LessEqual => "'<='",
            Self::Greater => "'>'",
            Self::GreaterEqual => "'>='",
            Self::Comma => "','",
            Self::Colon => "':'",
            Self::LParen => "'('",
            Self::RParen => "')'",
            Self::Eof => "end of file",
            Self::Unknown => "unknown character",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }
}
