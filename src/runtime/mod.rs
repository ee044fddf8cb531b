use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};

use tracing::{debug, trace};

use crate::ast::*;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("Cannot apply '{op}' to {lhs} and {rhs}")]
    TypeMismatch {
        op: BinaryOp,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Evaluation stack underflow")]
    StackUnderflow,
    #[error("Interpreter has already run")]
    AlreadyRun,
    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Number(if b { 1.0 } else { 0.0 })
    }
}

impl Value {
    /// Zero and the empty string are false; everything else, NaN included, is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0,
            Value::Text(s) => !s.is_empty(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "Number",
            Value::Text(_) => "Text",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Constructed,
    Running,
    Finished,
    Failed,
}

pub struct Interpreter<'a, W: Write = io::Stdout> {
    program: &'a VisualScript,
    globals: HashMap<String, Value>,
    stack: Vec<Value>,
    output: W,
    state: State,
}

impl<'a> Interpreter<'a> {
    pub fn new(program: &'a VisualScript) -> Self {
        Self::with_output(program, io::stdout())
    }
}

impl<'a, W: Write> Interpreter<'a, W> {
    pub fn with_output(program: &'a VisualScript, output: W) -> Self {
        Self {
            program,
            globals: HashMap::new(),
            stack: Vec::with_capacity(16),
            output,
            state: State::Constructed,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn globals(&self) -> &HashMap<String, Value> {
        &self.globals
    }

    pub fn get_global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Execute every node in document order, stopping at the first error.
    ///
    /// An interpreter runs once. Bindings and output produced before a
    /// failure are left in place.
    #[tracing::instrument(level = "debug", skip_all, fields(nodes = self.program.nodes.len()))]
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        if self.state != State::Constructed {
            return Err(RuntimeError::AlreadyRun);
        }
        self.state = State::Running;

        let program = self.program;
        let result = program
            .nodes
            .iter()
            .try_for_each(|node| self.exec_node(node))
            .and_then(|()| self.output.flush().map_err(RuntimeError::from));

        match result {
            Ok(()) => {
                self.state = State::Finished;
                debug!(globals = self.globals.len(), "run finished");
                Ok(())
            }
            Err(e) => {
                self.state = State::Failed;
                debug!(error = %e, "run failed");
                Err(e)
            }
        }
    }

    fn exec_node(&mut self, node: &Node) -> Result<(), RuntimeError> {
        for stmt in &node.statements {
            self.exec_statement(stmt)?;
            debug_assert!(self.stack.is_empty(), "residual values after statement");
        }
        Ok(())
    }

    // ── Statement execution ─────────────────────────────────────────────

    fn exec_statements(&mut self, stmts: &[Statement]) -> Result<(), RuntimeError> {
        for stmt in stmts {
            self.exec_statement(stmt)?;
        }
        Ok(())
    }

    pub fn exec_statement(&mut self, stmt: &Statement) -> Result<(), RuntimeError> {
        trace!(kind = stmt.kind().name(), "statement");
        match stmt {
            Statement::If { condition, body } => {
                self.eval_expr(condition)?;
                if self.pop()?.is_truthy() {
                    self.exec_statements(body)?;
                }
                Ok(())
            }
            Statement::IfElse {
                condition,
                body,
                else_body,
            } => {
                self.eval_expr(condition)?;
                if self.pop()?.is_truthy() {
                    self.exec_statements(body)
                } else {
                    self.exec_statements(else_body)
                }
            }
            Statement::SetVariable { variable, value } => {
                self.eval_expr(value)?;
                let val = self.pop()?;
                trace!(variable = %variable, value = %val, "assign");
                self.globals.insert(variable.clone(), val);
                Ok(())
            }
            Statement::Print { value } => {
                self.eval_expr(value)?;
                let val = self.pop()?;
                writeln!(self.output, "{}", val)?;
                Ok(())
            }
        }
    }

    // ── Expression evaluation ───────────────────────────────────────────

    /// Evaluate `expr`, leaving exactly one value on the stack.
    pub fn eval_expr(&mut self, expr: &Expression) -> Result<(), RuntimeError> {
        match expr {
            Expression::Constant(value) => {
                self.stack.push(value.clone());
            }
            Expression::LoadVariable(name) => {
                let val = self.lookup_var(name)?;
                self.stack.push(val);
            }
            Expression::Binary { op, lhs, rhs } => {
                self.eval_expr(lhs)?;
                self.eval_expr(rhs)?;
                let right = self.pop()?;
                let left = self.pop()?;
                self.stack.push(eval_binop(*op, left, right)?);
            }
        }
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow)
    }

    // ── Variable access ─────────────────────────────────────────────────

    fn lookup_var(&self, name: &str) -> Result<Value, RuntimeError> {
        self.globals
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.to_string(),
            })
    }
}

// ── Operators ───────────────────────────────────────────────────────────
//
// `+` concatenates as soon as either side is text. The other arithmetic
// operators are numeric only. Comparisons produce 1 or 0; `==` across kinds
// is simply false, ordering across kinds is an error.

fn eval_binop(op: BinaryOp, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => {
            let (a, b) = (*a, *b);
            match op {
                BinaryOp::Add => Ok(Value::Number(a + b)),
                BinaryOp::Sub => Ok(Value::Number(a - b)),
                BinaryOp::Mul => Ok(Value::Number(a * b)),
                BinaryOp::Div => {
                    if b == 0.0 {
                        Err(RuntimeError::DivisionByZero)
                    } else {
                        Ok(Value::Number(a / b))
                    }
                }
                BinaryOp::Lt => Ok(Value::from(a < b)),
                BinaryOp::Le => Ok(Value::from(a <= b)),
                BinaryOp::Eq => Ok(Value::from(a == b)),
                BinaryOp::Ge => Ok(Value::from(a >= b)),
                BinaryOp::Gt => Ok(Value::from(a > b)),
            }
        }
        (Value::Text(a), Value::Text(b)) => match op {
            BinaryOp::Add => Ok(Value::Text(format!("{}{}", a, b))),
            BinaryOp::Lt => Ok(Value::from(a < b)),
            BinaryOp::Le => Ok(Value::from(a <= b)),
            BinaryOp::Eq => Ok(Value::from(a == b)),
            BinaryOp::Ge => Ok(Value::from(a >= b)),
            BinaryOp::Gt => Ok(Value::from(a > b)),
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => Err(mismatch(op, &left, &right)),
        },
        _ => match op {
            BinaryOp::Add => Ok(Value::Text(format!("{}{}", left, right))),
            BinaryOp::Eq => Ok(Value::from(false)),
            _ => Err(mismatch(op, &left, &right)),
        },
    }
}

fn mismatch(op: BinaryOp, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::TypeMismatch {
        op,
        lhs: left.type_name(),
        rhs: right.type_name(),
    }
}
