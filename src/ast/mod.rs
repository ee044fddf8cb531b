//! Program model — the typed node/statement/expression graph
//!
//! A loaded program is read-only: the interpreter borrows it and never
//! mutates it. Statements and expressions (de)serialize through the loose
//! message records in [`desc`], which is where structural validation lives.

pub mod desc;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::runtime::Value;

pub use desc::{BasicType, ExpressionType, ModelError, StatementType};

/// Deepest message nesting a document may have, counting each message
/// (node, statement, expression, constant, type) as one level. Both loaders
/// enforce it, and it keeps the JSON rendering of any accepted program under
/// serde_json's recursion limit.
pub const MAX_NESTING_DEPTH: usize = 63;

// ── Program ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualScript {
    pub nodes: Vec<Node>,
}

impl VisualScript {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Total number of statements, nested bodies included.
    pub fn statement_count(&self) -> usize {
        self.nodes
            .iter()
            .flat_map(|n| n.statements.iter())
            .map(Statement::count)
            .sum()
    }

    /// Message nesting depth of the document this program renders to.
    pub fn nesting_depth(&self) -> usize {
        self.nodes
            .iter()
            .map(|n| 1 + n.statements.iter().map(Statement::depth).max().unwrap_or(0))
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    pub statements: Vec<Statement>,
}

impl Node {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }
}

// ── Statements ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "desc::StatementDesc", into = "desc::StatementDesc")]
pub enum Statement {
    If {
        condition: Expression,
        body: Vec<Statement>,
    },
    IfElse {
        condition: Expression,
        body: Vec<Statement>,
        else_body: Vec<Statement>,
    },
    SetVariable {
        variable: String,
        value: Expression,
    },
    Print {
        value: Expression,
    },
}

impl Statement {
    pub fn set_variable(variable: &str, value: Expression) -> Self {
        Statement::SetVariable {
            variable: variable.to_string(),
            value,
        }
    }

    pub fn print(value: Expression) -> Self {
        Statement::Print { value }
    }

    pub fn kind(&self) -> StatementType {
        match self {
            Statement::If { .. } => StatementType::If,
            Statement::IfElse { .. } => StatementType::IfElse,
            Statement::SetVariable { .. } => StatementType::SetVariable,
            Statement::Print { .. } => StatementType::Print,
        }
    }

    fn count(&self) -> usize {
        match self {
            Statement::If { body, .. } => 1 + body.iter().map(Statement::count).sum::<usize>(),
            Statement::IfElse {
                body, else_body, ..
            } => {
                1 + body.iter().map(Statement::count).sum::<usize>()
                    + else_body.iter().map(Statement::count).sum::<usize>()
            }
            Statement::SetVariable { .. } | Statement::Print { .. } => 1,
        }
    }

    fn depth(&self) -> usize {
        let deepest = |body: &[Statement]| body.iter().map(Statement::depth).max().unwrap_or(0);
        1 + match self {
            Statement::If { condition, body } => condition.depth().max(deepest(body)),
            Statement::IfElse {
                condition,
                body,
                else_body,
            } => condition.depth().max(deepest(body)).max(deepest(else_body)),
            Statement::SetVariable { value, .. } | Statement::Print { value } => value.depth(),
        }
    }
}

// ── Expressions ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Eq => "==",
            BinaryOp::Ge => ">=",
            BinaryOp::Gt => ">",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "desc::ExpressionDesc", into = "desc::ExpressionDesc")]
pub enum Expression {
    Constant(Value),
    LoadVariable(String),
    Binary {
        op: BinaryOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
}

impl Expression {
    pub fn number(n: f64) -> Self {
        Expression::Constant(Value::Number(n))
    }

    pub fn text(s: &str) -> Self {
        Expression::Constant(Value::Text(s.to_string()))
    }

    pub fn load(name: &str) -> Self {
        Expression::LoadVariable(name.to_string())
    }

    pub fn binary(op: BinaryOp, lhs: Expression, rhs: Expression) -> Self {
        Expression::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn kind(&self) -> ExpressionType {
        match self {
            Expression::Constant(_) => ExpressionType::Constant,
            Expression::LoadVariable(_) => ExpressionType::LoadVariable,
            Expression::Binary { op, .. } => ExpressionType::from(*op),
        }
    }

    fn depth(&self) -> usize {
        match self {
            // expression, constant, type
            Expression::Constant(_) => 3,
            Expression::LoadVariable(_) => 1,
            Expression::Binary { lhs, rhs, .. } => 1 + lhs.depth().max(rhs.depth()),
        }
    }
}
