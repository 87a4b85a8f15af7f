use std::io::Write;
use std::rc::Rc;

use crate::ast::{BinaryOperator, Expression, FunctionDecl, Statement, UnaryOperator};

mod environment;
mod error;

pub use environment::{ScopeId, Scopes};
pub use error::InterpreterError;

type Result<T> = std::result::Result<T, InterpreterError>;

/// Control-flow marker for statement execution.
///
/// `Return` travels up through blocks and branches untouched until the
/// nearest function call turns it into the call's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecResult {
    Continue,
    Return(i64),
}

/// AST-walking interpreter writing program output to `out`.
pub struct Interpreter<W: Write> {
    out: W,
    scopes: Scopes,
}

impl<W: Write> Interpreter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            scopes: Scopes::new(),
        }
    }

    /// Runs a program against a fresh global scope.
    ///
    /// A root block executes directly in the global scope, so top-level
    /// bindings stay readable through [`Interpreter::global`] afterwards.
    pub fn interpret(&mut self, root: &Statement) -> Result<()> {
        self.scopes = Scopes::new();
        let global = self.scopes.global();
        let result = match root {
            Statement::Block(statements) => self.execute_statements(statements, global),
            other => self.execute_statement(other, global),
        };
        match result? {
            ExecResult::Continue => Ok(()),
            ExecResult::Return(_) => Err(InterpreterError::ReturnOutsideFunction),
        }
    }

    pub fn global(&self, name: &str) -> Option<i64> {
        self.scopes.get(self.scopes.global(), name)
    }

    pub fn global_function(&self, name: &str) -> Option<Rc<FunctionDecl>> {
        self.scopes.get_function(self.scopes.global(), name)
    }

    pub fn scopes(&self) -> &Scopes {
        &self.scopes
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Runs `statements` in a new child scope of `parent`.
    pub fn execute_block(&mut self, statements: &[Statement], parent: ScopeId) -> Result<ExecResult> {
        let scope = self.scopes.push(parent);
        let result = self.execute_statements(statements, scope);
        self.scopes.pop(scope);
        result
    }

    fn execute_statements(&mut self, statements: &[Statement], scope: ScopeId) -> Result<ExecResult> {
        for statement in statements {
            if let ExecResult::Return(value) = self.execute_statement(statement, scope)? {
                return Ok(ExecResult::Return(value));
            }
        }
        Ok(ExecResult::Continue)
    }

    pub fn execute_statement(&mut self, statement: &Statement, scope: ScopeId) -> Result<ExecResult> {
        match statement {
            Statement::Expression(expr) => {
                self.evaluate_expr(expr, scope)?;
                Ok(ExecResult::Continue)
            }
            Statement::Print(expressions) => {
                self.print(expressions, scope)?;
                Ok(ExecResult::Continue)
            }
            Statement::Assign { name, value } => {
                let value = self.evaluate_expr(value, scope)?;
                self.scopes.define(scope, name, value);
                Ok(ExecResult::Continue)
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate_expr(condition, scope)? != 0 {
                    self.execute_statement(then_branch, scope)
                } else if let Some(else_branch) = else_branch {
                    self.execute_statement(else_branch, scope)
                } else {
                    Ok(ExecResult::Continue)
                }
            }
            Statement::Block(statements) => self.execute_block(statements, scope),
            Statement::FunctionDef(function) => {
                self.scopes.define_function(scope, Rc::clone(function));
                Ok(ExecResult::Continue)
            }
            Statement::Return(value) => {
                let value = match value {
                    Some(value) => self.evaluate_expr(value, scope)?,
                    None => 0,
                };
                Ok(ExecResult::Return(value))
            }
        }
    }

    pub fn evaluate_expr(&mut self, expr: &Expression, scope: ScopeId) -> Result<i64> {
        match expr {
            Expression::Integer(value) => Ok(*value),
            // Strings only mean something to `print`.
            Expression::String(_) => Ok(0),
            Expression::Variable(name) => {
                self.scopes
                    .get(scope, name)
                    .ok_or_else(|| InterpreterError::UndefinedVariable {
                        name: name.to_string(),
                    })
            }
            Expression::Assign { name, value } => {
                let value = self.evaluate_expr(value, scope)?;
                self.scopes.define(scope, name, value);
                Ok(value)
            }
            Expression::Unary { op, operand } => {
                let operand = self.evaluate_expr(operand, scope)?;
                match op {
                    UnaryOperator::Negate => operand
                        .checked_neg()
                        .ok_or(InterpreterError::ArithmeticOverflow { operator: "-" }),
                }
            }
            Expression::Binary { left, op, right } => {
                let left = self.evaluate_expr(left, scope)?;
                let right = self.evaluate_expr(right, scope)?;
                apply_binary(*op, left, right)
            }
            Expression::Call { name, args } => self.call_function(name, args, scope),
        }
    }

    /// Calls a function found through the caller's scope chain. The body runs
    /// in a new scope whose parent is the caller's scope.
    fn call_function(&mut self, name: &str, args: &[Expression], scope: ScopeId) -> Result<i64> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.evaluate_expr(arg, scope)?);
        }

        let function = self.scopes.get_function(scope, name).ok_or_else(|| {
            InterpreterError::UndefinedFunction {
                name: name.to_string(),
            }
        })?;
        if values.len() != function.parameters.len() {
            return Err(InterpreterError::ArityMismatch {
                name: name.to_string(),
                expected: function.parameters.len(),
                found: values.len(),
            });
        }

        let call_scope = self.scopes.push(scope);
        for (parameter, value) in function.parameters.iter().zip(values) {
            self.scopes.define(call_scope, parameter, value);
        }
        let result = self.execute_statement(&function.body, call_scope);
        self.scopes.pop(call_scope);

        match result? {
            ExecResult::Continue => Ok(0),
            ExecResult::Return(value) => Ok(value),
        }
    }

    fn print(&mut self, expressions: &[Expression], scope: ScopeId) -> Result<()> {
        let mut outputs = Vec::with_capacity(expressions.len());
        for expr in expressions {
            match expr {
                Expression::String(text) => outputs.push(text.clone()),
                other => outputs.push(self.evaluate_expr(other, scope)?.to_string()),
            }
        }
        writeln!(self.out, "{}", outputs.join(" ")).map_err(|error| InterpreterError::Output {
            message: error.to_string(),
        })
    }
}

fn apply_binary(op: BinaryOperator, left: i64, right: i64) -> Result<i64> {
    let overflow = InterpreterError::ArithmeticOverflow {
        operator: op.symbol(),
    };
    match op {
        BinaryOperator::Add => left.checked_add(right).ok_or(overflow),
        BinaryOperator::Sub => left.checked_sub(right).ok_or(overflow),
        BinaryOperator::Mul => left.checked_mul(right).ok_or(overflow),
        BinaryOperator::Div => floor_div(left, right),
        BinaryOperator::Equal => Ok(i64::from(left == right)),
        BinaryOperator::NotEqual => Ok(i64::from(left != right)),
        BinaryOperator::Less => Ok(i64::from(left < right)),
        BinaryOperator::LessEqual => Ok(i64::from(left <= right)),
        BinaryOperator::Greater => Ok(i64::from(left > right)),
        BinaryOperator::GreaterEqual => Ok(i64::from(left >= right)),
    }
}

/// Integer division rounding toward negative infinity.
pub fn floor_div(left: i64, right: i64) -> Result<i64> {
    if right == 0 {
        return Err(InterpreterError::DivisionByZero);
    }
    let quotient = left
        .checked_div(right)
        .ok_or(InterpreterError::ArithmeticOverflow { operator: "/" })?;
    if (left < 0) != (right < 0) && left % right != 0 {
        Ok(quotient - 1)
    } else {
        Ok(quotient)
    }
}
