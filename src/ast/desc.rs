//! Document records — message-shaped mirrors of the program model
//!
//! These follow the `VisualScript` document schema field for field: every
//! field is optional and enum tags are plain names. Both document loaders
//! build these records and lower them with `TryFrom`, which is the single
//! place a malformed program is rejected.

use serde::{Deserialize, Serialize};

use super::{BinaryOp, Expression, Statement};
use crate::runtime::Value;

/// A structurally invalid program graph.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("{message} has no 'type'")]
    MissingType { message: &'static str },
    #[error("{kind} {message} is missing required field '{field}'")]
    MissingField {
        message: &'static str,
        kind: &'static str,
        field: &'static str,
    },
    #[error("{op} expects 2 operands, got {found}")]
    OperandCount { op: &'static str, found: usize },
}

// ── Tags ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementType {
    If,
    IfElse,
    SetVariable,
    Print,
}

impl StatementType {
    pub fn name(self) -> &'static str {
        match self {
            StatementType::If => "IF",
            StatementType::IfElse => "IF_ELSE",
            StatementType::SetVariable => "SET_VARIABLE",
            StatementType::Print => "PRINT",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "IF" => Some(StatementType::If),
            "IF_ELSE" => Some(StatementType::IfElse),
            "SET_VARIABLE" => Some(StatementType::SetVariable),
            "PRINT" => Some(StatementType::Print),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpressionType {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    Constant,
    LoadVariable,
}

impl ExpressionType {
    pub fn name(self) -> &'static str {
        match self {
            ExpressionType::Add => "ADD",
            ExpressionType::Sub => "SUB",
            ExpressionType::Mul => "MUL",
            ExpressionType::Div => "DIV",
            ExpressionType::Lt => "LT",
            ExpressionType::Le => "LE",
            ExpressionType::Eq => "EQ",
            ExpressionType::Ge => "GE",
            ExpressionType::Gt => "GT",
            ExpressionType::Constant => "CONSTANT",
            ExpressionType::LoadVariable => "LOAD_VARIABLE",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ADD" => Some(ExpressionType::Add),
            "SUB" => Some(ExpressionType::Sub),
            "MUL" => Some(ExpressionType::Mul),
            "DIV" => Some(ExpressionType::Div),
            "LT" => Some(ExpressionType::Lt),
            "LE" => Some(ExpressionType::Le),
            "EQ" => Some(ExpressionType::Eq),
            "GE" => Some(ExpressionType::Ge),
            "GT" => Some(ExpressionType::Gt),
            "CONSTANT" => Some(ExpressionType::Constant),
            "LOAD_VARIABLE" => Some(ExpressionType::LoadVariable),
            _ => None,
        }
    }

    pub fn binary_op(self) -> Option<BinaryOp> {
        match self {
            ExpressionType::Add => Some(BinaryOp::Add),
            ExpressionType::Sub => Some(BinaryOp::Sub),
            ExpressionType::Mul => Some(BinaryOp::Mul),
            ExpressionType::Div => Some(BinaryOp::Div),
            ExpressionType::Lt => Some(BinaryOp::Lt),
            ExpressionType::Le => Some(BinaryOp::Le),
            ExpressionType::Eq => Some(BinaryOp::Eq),
            ExpressionType::Ge => Some(BinaryOp::Ge),
            ExpressionType::Gt => Some(BinaryOp::Gt),
            ExpressionType::Constant | ExpressionType::LoadVariable => None,
        }
    }
}

impl From<BinaryOp> for ExpressionType {
    fn from(op: BinaryOp) -> Self {
        match op {
            BinaryOp::Add => ExpressionType::Add,
            BinaryOp::Sub => ExpressionType::Sub,
            BinaryOp::Mul => ExpressionType::Mul,
            BinaryOp::Div => ExpressionType::Div,
            BinaryOp::Lt => ExpressionType::Lt,
            BinaryOp::Le => ExpressionType::Le,
            BinaryOp::Eq => ExpressionType::Eq,
            BinaryOp::Ge => ExpressionType::Ge,
            BinaryOp::Gt => ExpressionType::Gt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BasicType {
    Number,
    String,
}

impl BasicType {
    pub fn name(self) -> &'static str {
        match self {
            BasicType::Number => "NUMBER",
            BasicType::String => "STRING",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "NUMBER" => Some(BasicType::Number),
            "STRING" => Some(BasicType::String),
            _ => None,
        }
    }
}

// ── Records ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementDesc {
    #[serde(rename = "type")]
    pub kind: Option<StatementType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<Expression>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub statements: Vec<Statement>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub else_statements: Vec<Statement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionDesc {
    #[serde(rename = "type")]
    pub kind: Option<ExpressionType>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expressions: Vec<Expression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constant: Option<ConstantDesc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstantDesc {
    #[serde(rename = "type")]
    pub value_type: Option<TypeDesc>,
    #[serde(skip_serializing_if = "Option::is_none", with = "float_value")]
    pub float_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeDesc {
    pub basic_type: Option<BasicType>,
}

/// Names accepted for the non-finite float values, in either case.
pub fn special_float(name: &str) -> Option<f64> {
    match name.to_ascii_lowercase().as_str() {
        "inf" | "infinity" => Some(f64::INFINITY),
        "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
        "nan" => Some(f64::NAN),
        _ => None,
    }
}

/// JSON has no literal for infinity or NaN, so those travel as the strings
/// `"inf"`, `"-inf"` and `"nan"`. Finite values stay plain numbers.
mod float_value {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Named(String),
    }

    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match *value {
            None => serializer.serialize_none(),
            Some(n) if n.is_nan() => serializer.serialize_str("nan"),
            Some(n) if n == f64::INFINITY => serializer.serialize_str("inf"),
            Some(n) if n == f64::NEG_INFINITY => serializer.serialize_str("-inf"),
            Some(n) => serializer.serialize_f64(n),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        match Option::<Repr>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Repr::Number(n)) => Ok(Some(n)),
            Some(Repr::Named(name)) => super::special_float(&name)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid float_value '{}'", name))),
        }
    }
}

// ── Lowering ────────────────────────────────────────────────────────────

impl TryFrom<StatementDesc> for Statement {
    type Error = ModelError;

    fn try_from(desc: StatementDesc) -> Result<Self, ModelError> {
        let kind = desc.kind.ok_or(ModelError::MissingType {
            message: "statement",
        })?;
        let missing = |field| ModelError::MissingField {
            message: "statement",
            kind: kind.name(),
            field,
        };
        let expression = desc.expression.ok_or_else(|| missing("expression"))?;

        Ok(match kind {
            StatementType::If => Statement::If {
                condition: expression,
                body: desc.statements,
            },
            StatementType::IfElse => Statement::IfElse {
                condition: expression,
                body: desc.statements,
                else_body: desc.else_statements,
            },
            StatementType::SetVariable => Statement::SetVariable {
                variable: desc.variable.ok_or_else(|| missing("variable"))?,
                value: expression,
            },
            StatementType::Print => Statement::Print { value: expression },
        })
    }
}

impl TryFrom<ExpressionDesc> for Expression {
    type Error = ModelError;

    fn try_from(desc: ExpressionDesc) -> Result<Self, ModelError> {
        let kind = desc.kind.ok_or(ModelError::MissingType {
            message: "expression",
        })?;
        let missing = |field| ModelError::MissingField {
            message: "expression",
            kind: kind.name(),
            field,
        };

        if let Some(op) = kind.binary_op() {
            let found = desc.expressions.len();
            let mut operands = desc.expressions.into_iter();
            return match (operands.next(), operands.next(), operands.next()) {
                (Some(lhs), Some(rhs), None) => Ok(Expression::binary(op, lhs, rhs)),
                _ => Err(ModelError::OperandCount {
                    op: kind.name(),
                    found,
                }),
            };
        }

        match kind {
            ExpressionType::Constant => {
                let constant = desc.constant.ok_or_else(|| missing("constant"))?;
                let basic_type = constant
                    .value_type
                    .and_then(|t| t.basic_type)
                    .ok_or(ModelError::MissingField {
                        message: "constant",
                        kind: "CONSTANT",
                        field: "type.basic_type",
                    })?;
                let value = match basic_type {
                    BasicType::Number => Value::Number(constant.float_value.unwrap_or(0.0)),
                    BasicType::String => Value::Text(constant.string_value.unwrap_or_default()),
                };
                Ok(Expression::Constant(value))
            }
            ExpressionType::LoadVariable => Ok(Expression::LoadVariable(
                desc.variable.ok_or_else(|| missing("variable"))?,
            )),
            _ => unreachable!("binary operators are lowered above"),
        }
    }
}

// ── Raising (for serialization) ─────────────────────────────────────────

impl From<Statement> for StatementDesc {
    fn from(stmt: Statement) -> Self {
        let kind = Some(stmt.kind());
        match stmt {
            Statement::If { condition, body } => StatementDesc {
                kind,
                expression: Some(condition),
                statements: body,
                ..Default::default()
            },
            Statement::IfElse {
                condition,
                body,
                else_body,
            } => StatementDesc {
                kind,
                expression: Some(condition),
                statements: body,
                else_statements: else_body,
                ..Default::default()
            },
            Statement::SetVariable { variable, value } => StatementDesc {
                kind,
                expression: Some(value),
                variable: Some(variable),
                ..Default::default()
            },
            Statement::Print { value } => StatementDesc {
                kind,
                expression: Some(value),
                ..Default::default()
            },
        }
    }
}

impl From<Expression> for ExpressionDesc {
    fn from(expr: Expression) -> Self {
        let kind = Some(expr.kind());
        match expr {
            Expression::Constant(value) => {
                let constant = match value {
                    Value::Number(n) => ConstantDesc {
                        value_type: Some(TypeDesc {
                            basic_type: Some(BasicType::Number),
                        }),
                        float_value: Some(n),
                        string_value: None,
                    },
                    Value::Text(s) => ConstantDesc {
                        value_type: Some(TypeDesc {
                            basic_type: Some(BasicType::String),
                        }),
                        float_value: None,
                        string_value: Some(s),
                    },
                };
                ExpressionDesc {
                    kind,
                    constant: Some(constant),
                    ..Default::default()
                }
            }
            Expression::LoadVariable(name) => ExpressionDesc {
                kind,
                variable: Some(name),
                ..Default::default()
            },
            Expression::Binary { lhs, rhs, .. } => ExpressionDesc {
                kind,
                expressions: vec![*lhs, *rhs],
                ..Default::default()
            },
        }
    }
}
