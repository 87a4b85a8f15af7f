//! Syntax tree produced by the parser and walked by the interpreter.
//!
//! Every composite node owns its children. Function declarations are the one
//! exception: they sit behind an `Rc` so the interpreter can register them in
//! a scope without copying the body.

use std::rc::Rc;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Expression {
    Integer(i64),
    String(String),
    Variable(String),
    Assign {
        name: String,
        value: Box<Expression>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    Call {
        name: String,
        args: Vec<Expression>,
    },
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UnaryOperator {
    Negate,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Statement {
    Expression(Expression),
    Print(Vec<Expression>),
    Assign {
        name: String,
        value: Expression,
    },
    If {
        condition: Expression,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
    /// Ordered statements executed in a fresh child scope.
    Block(Vec<Statement>),
    FunctionDef(Rc<FunctionDecl>),
    Return(Option<Expression>),
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub parameters: Vec<String>,
    pub body: Statement,
}
