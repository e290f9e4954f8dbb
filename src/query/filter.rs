//! Document filters
//!
//! A validated `where` expression is converted once into a small filter tree
//! and then evaluated against every candidate document. Field references are
//! dotted paths into the document JSON; `?` placeholders bind positional
//! `params` in order of appearance.

use super::pattern::eval_like;
use crate::core::{StoreError, StoreResult};
use serde_json::Value as JsonValue;
use sqlparser::ast as sql_ast;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Field(Vec<String>),
    Literal(JsonValue),
    Compare {
        left: Box<Filter>,
        op: CompareOp,
        right: Box<Filter>,
    },
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
    Not(Box<Filter>),
    IsNull {
        expr: Box<Filter>,
        negated: bool,
    },
    Like {
        expr: Box<Filter>,
        pattern: Box<Filter>,
        negated: bool,
        case_insensitive: bool,
    },
    InList {
        expr: Box<Filter>,
        list: Vec<Filter>,
        negated: bool,
    },
    Between {
        expr: Box<Filter>,
        low: Box<Filter>,
        high: Box<Filter>,
        negated: bool,
    },
}

/// Converts sqlparser expressions into [`Filter`] trees
struct FilterCompiler<'a> {
    params: &'a [JsonValue],
    next_placeholder: usize,
}

impl<'a> FilterCompiler<'a> {
    fn compile(&mut self, expr: sql_ast::Expr) -> StoreResult<Filter> {
        match expr {
            sql_ast::Expr::Identifier(ident) => Ok(Filter::Field(vec![ident.value])),
            sql_ast::Expr::CompoundIdentifier(idents) => Ok(Filter::Field(
                idents.into_iter().map(|i| i.value).collect(),
            )),
            sql_ast::Expr::Value(value) => self.convert_value(value.value),
            sql_ast::Expr::Nested(inner) => self.compile(*inner),
            sql_ast::Expr::UnaryOp { op, expr } => match op {
                sql_ast::UnaryOperator::Not => Ok(Filter::Not(Box::new(self.compile(*expr)?))),
                sql_ast::UnaryOperator::Minus => match self.compile(*expr)? {
                    Filter::Literal(JsonValue::Number(n)) => negate_number(&n),
                    _ => Err(StoreError::InvalidQuery(
                        "Unary minus is only supported on numeric literals".into(),
                    )),
                },
                other => Err(StoreError::InvalidQuery(format!(
                    "Unsupported unary operator: {}",
                    other
                ))),
            },
            sql_ast::Expr::BinaryOp { left, op, right } => {
                let left = Box::new(self.compile(*left)?);
                let right = Box::new(self.compile(*right)?);
                match op {
                    sql_ast::BinaryOperator::And => Ok(Filter::And(left, right)),
                    sql_ast::BinaryOperator::Or => Ok(Filter::Or(left, right)),
                    other => Ok(Filter::Compare {
                        left,
                        op: convert_compare_op(&other)?,
                        right,
                    }),
                }
            }
            sql_ast::Expr::IsNull(inner) => Ok(Filter::IsNull {
                expr: Box::new(self.compile(*inner)?),
                negated: false,
            }),
            sql_ast::Expr::IsNotNull(inner) => Ok(Filter::IsNull {
                expr: Box::new(self.compile(*inner)?),
                negated: true,
            }),
            sql_ast::Expr::Like {
                negated,
                expr,
                pattern,
                escape_char,
                ..
            } => {
                if escape_char.is_some() {
                    return Err(StoreError::InvalidQuery("LIKE ESCAPE not supported".into()));
                }
                Ok(Filter::Like {
                    expr: Box::new(self.compile(*expr)?),
                    pattern: Box::new(self.compile(*pattern)?),
                    negated,
                    case_insensitive: false,
                })
            }
            sql_ast::Expr::ILike {
                negated,
                expr,
                pattern,
                escape_char,
                ..
            } => {
                if escape_char.is_some() {
                    return Err(StoreError::InvalidQuery("ILIKE ESCAPE not supported".into()));
                }
                Ok(Filter::Like {
                    expr: Box::new(self.compile(*expr)?),
                    pattern: Box::new(self.compile(*pattern)?),
                    negated,
                    case_insensitive: true,
                })
            }
            sql_ast::Expr::InList { expr, list, negated } => {
                let expr = Box::new(self.compile(*expr)?);
                let list = list
                    .into_iter()
                    .map(|item| self.compile(item))
                    .collect::<StoreResult<Vec<_>>>()?;
                Ok(Filter::InList { expr, list, negated })
            }
            sql_ast::Expr::Between {
                expr,
                negated,
                low,
                high,
            } => Ok(Filter::Between {
                expr: Box::new(self.compile(*expr)?),
                low: Box::new(self.compile(*low)?),
                high: Box::new(self.compile(*high)?),
                negated,
            }),
            other => Err(StoreError::InvalidQuery(format!(
                "Unsupported expression in where clause: {}",
                other
            ))),
        }
    }

    fn convert_value(&mut self, value: sql_ast::Value) -> StoreResult<Filter> {
        let literal = match value {
            sql_ast::Value::Number(n, _) => {
                if let Ok(i) = n.parse::<i64>() {
                    JsonValue::from(i)
                } else {
                    n.parse::<f64>()
                        .ok()
                        .and_then(serde_json::Number::from_f64)
                        .map(JsonValue::Number)
                        .ok_or_else(|| StoreError::InvalidQuery(format!("Invalid number: {}", n)))?
                }
            }
            sql_ast::Value::SingleQuotedString(s) | sql_ast::Value::DoubleQuotedString(s) => {
                JsonValue::String(s)
            }
            sql_ast::Value::Boolean(b) => JsonValue::Bool(b),
            sql_ast::Value::Null => JsonValue::Null,
            sql_ast::Value::Placeholder(p) => self.bind_placeholder(&p)?,
            other => {
                return Err(StoreError::InvalidQuery(format!(
                    "Unsupported value: {}",
                    other
                )));
            }
        };
        Ok(Filter::Literal(literal))
    }

    /// `?` takes the next param; `?N` and `$N` are 1-based explicit positions
    fn bind_placeholder(&mut self, placeholder: &str) -> StoreResult<JsonValue> {
        let digits = placeholder.trim_start_matches(['?', '$']);

        let index = if digits.is_empty() {
            let index = self.next_placeholder;
            self.next_placeholder += 1;
            index
        } else {
            digits
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .ok_or_else(|| {
                    StoreError::InvalidQuery(format!("Invalid placeholder: {}", placeholder))
                })?
        };

        self.params.get(index).cloned().ok_or_else(|| {
            StoreError::InvalidQuery(format!(
                "No parameter bound for placeholder {} (position {})",
                placeholder,
                index + 1
            ))
        })
    }
}

fn convert_compare_op(op: &sql_ast::BinaryOperator) -> StoreResult<CompareOp> {
    use sql_ast::BinaryOperator as SqlOp;

    match op {
        SqlOp::Eq => Ok(CompareOp::Eq),
        SqlOp::NotEq => Ok(CompareOp::NotEq),
        SqlOp::Lt => Ok(CompareOp::Lt),
        SqlOp::LtEq => Ok(CompareOp::LtEq),
        SqlOp::Gt => Ok(CompareOp::Gt),
        SqlOp::GtEq => Ok(CompareOp::GtEq),
        other => Err(StoreError::InvalidQuery(format!(
            "Unsupported binary operator: {}",
            other
        ))),
    }
}

fn negate_number(n: &serde_json::Number) -> StoreResult<Filter> {
    let negated = if let Some(i) = n.as_i64() {
        // -i64::MIN only fits in a u64
        match i.checked_neg() {
            Some(neg) => JsonValue::from(neg),
            None => JsonValue::from(i.unsigned_abs()),
        }
    } else {
        n.as_f64()
            .and_then(|f| serde_json::Number::from_f64(-f))
            .map(JsonValue::Number)
            .ok_or_else(|| StoreError::InvalidQuery(format!("Invalid number: -{}", n)))?
    };
    Ok(Filter::Literal(negated))
}

impl Filter {
    /// Compile a parsed `where` expression, binding positional params
    pub fn compile(expr: sql_ast::Expr, params: &[JsonValue]) -> StoreResult<Self> {
        FilterCompiler {
            params,
            next_placeholder: 0,
        }
        .compile(expr)
    }

    /// Evaluate as a predicate; anything but `true` rejects the document
    pub fn matches(&self, document: &JsonValue) -> StoreResult<bool> {
        Ok(matches!(self.evaluate(document)?, JsonValue::Bool(true)))
    }

    fn evaluate(&self, document: &JsonValue) -> StoreResult<JsonValue> {
        match self {
            Filter::Field(path) => Ok(lookup(document, path).cloned().unwrap_or(JsonValue::Null)),
            Filter::Literal(value) => Ok(value.clone()),
            Filter::Compare { left, op, right } => {
                let left = left.evaluate(document)?;
                let right = right.evaluate(document)?;
                Ok(compare(&left, *op, &right))
            }
            Filter::And(left, right) => {
                if !left.matches(document)? {
                    return Ok(JsonValue::Bool(false));
                }
                Ok(JsonValue::Bool(right.matches(document)?))
            }
            Filter::Or(left, right) => {
                if left.matches(document)? {
                    return Ok(JsonValue::Bool(true));
                }
                Ok(JsonValue::Bool(right.matches(document)?))
            }
            Filter::Not(inner) => match inner.evaluate(document)? {
                JsonValue::Bool(b) => Ok(JsonValue::Bool(!b)),
                _ => Ok(JsonValue::Null),
            },
            Filter::IsNull { expr, negated } => {
                let is_null = expr.evaluate(document)?.is_null();
                Ok(JsonValue::Bool(is_null != *negated))
            }
            Filter::Like {
                expr,
                pattern,
                negated,
                case_insensitive,
            } => {
                let text = expr.evaluate(document)?;
                let pattern = pattern.evaluate(document)?;
                match (text.as_str(), pattern.as_str()) {
                    (Some(text), Some(pattern)) => {
                        let matched = eval_like(text, pattern, !case_insensitive)?;
                        Ok(JsonValue::Bool(matched != *negated))
                    }
                    _ => Ok(JsonValue::Null),
                }
            }
            Filter::InList {
                expr,
                list,
                negated,
            } => {
                let value = expr.evaluate(document)?;
                if value.is_null() {
                    return Ok(JsonValue::Null);
                }
                let mut found = false;
                for item in list {
                    if compare(&value, CompareOp::Eq, &item.evaluate(document)?) == JsonValue::Bool(true) {
                        found = true;
                        break;
                    }
                }
                Ok(JsonValue::Bool(found != *negated))
            }
            Filter::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let value = expr.evaluate(document)?;
                let above = compare(&value, CompareOp::GtEq, &low.evaluate(document)?);
                let below = compare(&value, CompareOp::LtEq, &high.evaluate(document)?);
                match (above, below) {
                    (JsonValue::Bool(a), JsonValue::Bool(b)) => Ok(JsonValue::Bool((a && b) != *negated)),
                    _ => Ok(JsonValue::Null),
                }
            }
        }
    }
}

/// Follow a dotted path through nested objects
pub fn lookup<'v>(document: &'v JsonValue, path: &[String]) -> Option<&'v JsonValue> {
    path.iter().try_fold(document, |node, key| node.get(key))
}

/// Order two scalars of the same family; `None` when they are not comparable
pub fn order_values(left: &JsonValue, right: &JsonValue) -> Option<Ordering> {
    match (left, right) {
        (JsonValue::Number(a), JsonValue::Number(b)) => {
            if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
                Some(a.cmp(&b))
            } else if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
                Some(a.cmp(&b))
            } else {
                a.as_f64()?.partial_cmp(&b.as_f64()?)
            }
        }
        (JsonValue::String(a), JsonValue::String(b)) => Some(a.cmp(b)),
        (JsonValue::Bool(a), JsonValue::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// SQL-style comparison: NULL or mismatched types yield NULL
fn compare(left: &JsonValue, op: CompareOp, right: &JsonValue) -> JsonValue {
    let Some(ordering) = order_values(left, right) else {
        return JsonValue::Null;
    };

    let result = match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::NotEq => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::LtEq => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::GtEq => ordering != Ordering::Less,
    };
    JsonValue::Bool(result)
}
