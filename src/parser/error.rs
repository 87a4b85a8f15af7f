use thiserror::Error;

/// Syntax errors. Every variant points at the offending token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Expected {expected}, found {found} at line {line}, column {column}")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: usize,
        column: usize,
    },
    #[error("Invalid integer literal '{literal}' at line {line}, column {column}")]
    InvalidIntegerLiteral {
        literal: String,
        line: usize,
        column: usize,
    },
    #[error("Expected an indented block after {construct} at line {line}, column {column}")]
    ExpectedIndentedBlock {
        construct: String,
        line: usize,
        column: usize,
    },
    #[error("Unexpected indent at line {line}, column {column}")]
    UnexpectedIndent { line: usize, column: usize },
    #[error("Duplicate parameter '{name}' in function '{function}' at line {line}, column {column}")]
    DuplicateParameter {
        name: String,
        function: String,
        line: usize,
        column: usize,
    },
}

pub type ParseResult<T> = Result<T, ParseError>;
