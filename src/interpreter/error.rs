use thiserror::Error;

/// Fatal runtime errors raised while walking the tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InterpreterError {
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("Undefined function '{name}'")]
    UndefinedFunction { name: String },
    #[error("Function '{name}' expected {expected} arguments, got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Integer overflow in '{operator}'")]
    ArithmeticOverflow { operator: &'static str },
    #[error("Return outside of function")]
    ReturnOutsideFunction,
    #[error("Failed to write program output: {message}")]
    Output { message: String },
}
