//! # Entity Conditions
//!
//! Conditions are evaluated against the JSON form of an entity, so any
//! serializable type can be filtered by its wire property names. Property
//! paths may descend into nested objects with dots (`endpoint.url`).

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison applied between a property and a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonOperator {
    /// Property equals the value.
    Equals,
    /// Property differs from the value (or is absent).
    NotEquals,
    /// Property is greater than the value.
    GreaterThan,
    /// Property is greater than or equal to the value.
    GreaterThanOrEqual,
    /// Property is less than the value.
    LessThan,
    /// Property is less than or equal to the value.
    LessThanOrEqual,
    /// Array property contains the value, or string property contains it as
    /// a substring.
    Includes,
}

/// A filter over entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityCondition {
    /// Compare one property.
    Comparison {
        /// Property path.
        property: String,
        /// Comparison to apply.
        operator: ComparisonOperator,
        /// Right-hand side.
        value: Value,
    },
    /// Every nested condition holds. An empty list matches everything.
    And(Vec<EntityCondition>),
    /// At least one nested condition holds. An empty list matches nothing.
    Or(Vec<EntityCondition>),
}

impl EntityCondition {
    /// `property == value`.
    pub fn equals(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, ComparisonOperator::Equals, value)
    }

    /// `property <op> value`.
    pub fn compare(
        property: impl Into<String>,
        operator: ComparisonOperator,
        value: impl Into<Value>,
    ) -> Self {
        Self::Comparison {
            property: property.into(),
            operator,
            value: value.into(),
        }
    }

    /// Combine conditions with AND, collapsing a single condition.
    ///
    /// Returns `None` when `conditions` is empty.
    pub fn all(mut conditions: Vec<EntityCondition>) -> Option<Self> {
        match conditions.len() {
            0 => None,
            1 => conditions.pop(),
            _ => Some(Self::And(conditions)),
        }
    }

    /// Evaluate against the JSON form of an entity.
    pub fn matches(&self, entity: &Value) -> bool {
        match self {
            Self::Comparison {
                property,
                operator,
                value,
            } => compare(lookup(entity, property), *operator, value),
            Self::And(conditions) => conditions.iter().all(|c| c.matches(entity)),
            Self::Or(conditions) => conditions.iter().any(|c| c.matches(entity)),
        }
    }
}

/// Resolve a dotted property path.
pub(crate) fn lookup<'a>(entity: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(entity, |current, segment| current.get(segment))
}

fn compare(actual: Option<&Value>, operator: ComparisonOperator, expected: &Value) -> bool {
    use ComparisonOperator::*;
    match operator {
        Equals => actual == Some(expected),
        NotEquals => actual != Some(expected),
        Includes => match actual {
            Some(Value::Array(items)) => items.contains(expected),
            Some(Value::String(s)) => expected.as_str().is_some_and(|e| s.contains(e)),
            _ => false,
        },
        GreaterThan | GreaterThanOrEqual | LessThan | LessThanOrEqual => {
            let Some(ordering) = actual.and_then(|a| compare_values(a, expected)) else {
                return false;
            };
            match operator {
                GreaterThan => ordering == Ordering::Greater,
                GreaterThanOrEqual => ordering != Ordering::Less,
                LessThan => ordering == Ordering::Less,
                _ => ordering != Ordering::Greater,
            }
        }
    }
}

/// Order two JSON scalars of the same kind. Mixed kinds are unordered.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}
