//! Filter normalization
//!
//! Translates user-facing filter inputs (bare scalars or single-operator
//! mappings such as `{"lte": 1000000}`) into a closed [`FilterClause`] type,
//! and AND-combines per-field clauses into a [`Predicate`] that can be rendered
//! in Pinecone's filter language or evaluated locally against stored metadata.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Number, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::error::{Result, SearchError};

/// Stored metadata of one record
pub type Metadata = Map<String, Value>;

/// Field filters as handed in by a caller, keyed by user-facing field name
pub type FieldFilters = BTreeMap<String, FilterInput>;

// ============================================================================
// Filter values
// ============================================================================

/// A literal inside a filter clause
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Number(Number),
    Text(String),
    Bool(bool),
}

impl FilterValue {
    /// Convert a JSON scalar into a filter literal
    pub fn from_json(field: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Number(n) => Ok(FilterValue::Number(n.clone())),
            Value::String(s) => Ok(FilterValue::Text(s.clone())),
            Value::Bool(b) => Ok(FilterValue::Bool(*b)),
            Value::Null => Err(invalid_value(field, "null is not a valid literal")),
            Value::Array(_) => Err(invalid_value(
                field,
                "lists are only allowed with the 'in' operator",
            )),
            Value::Object(_) => Err(invalid_value(field, "nested objects are not allowed")),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FilterValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, FilterValue::Number(_))
    }

    pub fn to_json(&self) -> Value {
        match self {
            FilterValue::Number(n) => Value::Number(n.clone()),
            FilterValue::Text(s) => Value::String(s.clone()),
            FilterValue::Bool(b) => Value::Bool(*b),
        }
    }

    /// Equality against a stored scalar; numbers compare by value (`5` == `5.0`)
    fn equals(&self, actual: &Value) -> bool {
        match (self, actual) {
            (FilterValue::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
            (FilterValue::Text(a), Value::String(b)) => a == b,
            (FilterValue::Bool(a), Value::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        FilterValue::Number(n.into())
    }
}

impl From<u64> for FilterValue {
    fn from(n: u64) -> Self {
        FilterValue::Number(n.into())
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Text(s)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        FilterValue::Bool(b)
    }
}

// ============================================================================
// Filter clauses
// ============================================================================

/// One per-field constraint; unknown operators are rejected at construction
#[derive(Debug, Clone, PartialEq)]
pub enum FilterClause {
    Equals(FilterValue),
    Lte(FilterValue),
    Gte(FilterValue),
    Lt(FilterValue),
    Gt(FilterValue),
    In(Vec<FilterValue>),
}

impl FilterClause {
    /// Build a clause from an operator key and its JSON operand
    pub fn from_operator(field: &str, operator: &str, operand: &Value) -> Result<Self> {
        let op = operator.strip_prefix('$').unwrap_or(operator);
        let clause = match op {
            "eq" => FilterClause::Equals(FilterValue::from_json(field, operand)?),
            "lte" => FilterClause::Lte(FilterValue::from_json(field, operand)?),
            "gte" => FilterClause::Gte(FilterValue::from_json(field, operand)?),
            "lt" => FilterClause::Lt(FilterValue::from_json(field, operand)?),
            "gt" => FilterClause::Gt(FilterValue::from_json(field, operand)?),
            "in" => {
                let items = operand.as_array().ok_or_else(|| {
                    invalid_value(field, "the 'in' operator requires a list of values")
                })?;
                if items.is_empty() {
                    return Err(invalid_value(field, "the 'in' list must not be empty"));
                }
                let values = items
                    .iter()
                    .map(|item| FilterValue::from_json(field, item))
                    .collect::<Result<Vec<_>>>()?;
                FilterClause::In(values)
            }
            _ => {
                return Err(SearchError::InvalidFilterOperator {
                    field: field.to_string(),
                    operator: operator.to_string(),
                })
            }
        };

        Ok(clause)
    }

    /// Bare operator name used when echoing the clause back
    pub fn operator(&self) -> &'static str {
        match self {
            FilterClause::Equals(_) => "eq",
            FilterClause::Lte(_) => "lte",
            FilterClause::Gte(_) => "gte",
            FilterClause::Lt(_) => "lt",
            FilterClause::Gt(_) => "gt",
            FilterClause::In(_) => "in",
        }
    }

    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            FilterClause::Lte(_) | FilterClause::Gte(_) | FilterClause::Lt(_) | FilterClause::Gt(_)
        )
    }

    /// All literals carried by the clause
    pub fn values(&self) -> Vec<&FilterValue> {
        match self {
            FilterClause::Equals(v)
            | FilterClause::Lte(v)
            | FilterClause::Gte(v)
            | FilterClause::Lt(v)
            | FilterClause::Gt(v) => vec![v],
            FilterClause::In(vs) => vs.iter().collect(),
        }
    }

    /// Rewrite every literal, keeping the operator
    pub fn try_map_values<F>(self, mut f: F) -> Result<Self>
    where
        F: FnMut(FilterValue) -> Result<FilterValue>,
    {
        Ok(match self {
            FilterClause::Equals(v) => FilterClause::Equals(f(v)?),
            FilterClause::Lte(v) => FilterClause::Lte(f(v)?),
            FilterClause::Gte(v) => FilterClause::Gte(f(v)?),
            FilterClause::Lt(v) => FilterClause::Lt(f(v)?),
            FilterClause::Gt(v) => FilterClause::Gt(f(v)?),
            FilterClause::In(vs) => {
                FilterClause::In(vs.into_iter().map(f).collect::<Result<Vec<_>>>()?)
            }
        })
    }

    /// Caller-facing form: equality echoes the bare literal, operators use bare keys
    pub fn to_json(&self) -> Value {
        match self {
            FilterClause::Equals(v) => v.to_json(),
            FilterClause::In(vs) => json!({ "in": vs.iter().map(FilterValue::to_json).collect::<Vec<_>>() }),
            other => {
                let mut map = Map::new();
                map.insert(other.operator().to_string(), other.values()[0].to_json());
                Value::Object(map)
            }
        }
    }

    /// Pinecone metadata filter form (`{"$lte": 1000000}`)
    pub fn to_pinecone(&self) -> Value {
        let operand = match self {
            FilterClause::In(vs) => Value::Array(vs.iter().map(FilterValue::to_json).collect()),
            other => other.values()[0].to_json(),
        };
        let mut map = Map::new();
        map.insert(format!("${}", self.operator()), operand);
        Value::Object(map)
    }

    /// Evaluate against a stored metadata value.
    ///
    /// List-valued metadata matches equality/`in` when any element matches.
    pub fn matches(&self, actual: Option<&Value>) -> bool {
        let Some(actual) = actual else {
            return false;
        };

        match self {
            FilterClause::Equals(v) => any_element(actual, |a| v.equals(a)),
            FilterClause::In(vs) => any_element(actual, |a| vs.iter().any(|v| v.equals(a))),
            FilterClause::Lte(v) => compare(actual, v).is_some_and(|o| o != Ordering::Greater),
            FilterClause::Gte(v) => compare(actual, v).is_some_and(|o| o != Ordering::Less),
            FilterClause::Lt(v) => compare(actual, v) == Some(Ordering::Less),
            FilterClause::Gt(v) => compare(actual, v) == Some(Ordering::Greater),
        }
    }
}

impl Serialize for FilterClause {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

fn any_element(actual: &Value, pred: impl Fn(&Value) -> bool) -> bool {
    match actual {
        Value::Array(items) => items.iter().any(pred),
        scalar => pred(scalar),
    }
}

fn compare(actual: &Value, literal: &FilterValue) -> Option<Ordering> {
    let a = actual.as_f64()?;
    let b = literal.as_f64()?;
    a.partial_cmp(&b)
}

fn invalid_value(field: &str, reason: &str) -> SearchError {
    SearchError::InvalidFilterValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

// ============================================================================
// Filter input + normalization
// ============================================================================

/// A caller-supplied filter for one field, either already typed or raw JSON
#[derive(Debug, Clone, PartialEq)]
pub enum FilterInput {
    Clause(FilterClause),
    Raw(Value),
}

impl From<FilterClause> for FilterInput {
    fn from(clause: FilterClause) -> Self {
        FilterInput::Clause(clause)
    }
}

impl From<Value> for FilterInput {
    fn from(value: Value) -> Self {
        FilterInput::Raw(value)
    }
}

impl<'de> Deserialize<'de> for FilterInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Value::deserialize(deserializer).map(FilterInput::Raw)
    }
}

/// Normalize one field's filter input into a clause.
///
/// `None` and JSON `null` yield no clause; a bare scalar yields equality; an
/// operator mapping must carry exactly one recognized operator.
pub fn normalize(field: &str, input: Option<&FilterInput>) -> Result<Option<FilterClause>> {
    let raw = match input {
        None => return Ok(None),
        Some(FilterInput::Clause(clause)) => return Ok(Some(clause.clone())),
        Some(FilterInput::Raw(raw)) => raw,
    };

    match raw {
        Value::Null => Ok(None),
        Value::Object(ops) => {
            let mut entries = ops.iter();
            match (entries.next(), entries.next()) {
                (Some((op, operand)), None) => {
                    FilterClause::from_operator(field, op, operand).map(Some)
                }
                (None, _) => Err(invalid_value(field, "operator mapping is empty")),
                (Some(_), Some(_)) => Err(SearchError::InvalidFilterOperator {
                    field: field.to_string(),
                    operator: ops.keys().cloned().collect::<Vec<_>>().join(","),
                }),
            }
        }
        scalar => Ok(Some(FilterClause::Equals(FilterValue::from_json(field, scalar)?))),
    }
}

// ============================================================================
// Predicate
// ============================================================================

/// A clause bound to the metadata key it constrains
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPredicate {
    pub key: String,
    pub clause: FilterClause,
}

/// Top-level AND of per-field clauses
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    clauses: Vec<FieldPredicate>,
}

impl Predicate {
    /// Combine clauses; an empty set means "no filter"
    pub fn all(clauses: Vec<FieldPredicate>) -> Option<Self> {
        if clauses.is_empty() {
            None
        } else {
            Some(Self { clauses })
        }
    }

    pub fn clauses(&self) -> &[FieldPredicate] {
        &self.clauses
    }

    /// Render in Pinecone's filter language
    pub fn to_pinecone(&self) -> Value {
        let rendered: Vec<Value> = self
            .clauses
            .iter()
            .map(|p| {
                let mut map = Map::new();
                map.insert(p.key.clone(), p.clause.to_pinecone());
                Value::Object(map)
            })
            .collect();

        if rendered.len() == 1 {
            rendered.into_iter().next().unwrap_or(Value::Null)
        } else {
            json!({ "$and": rendered })
        }
    }

    /// Evaluate against a record's stored metadata
    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.clauses
            .iter()
            .all(|p| p.clause.matches(metadata.get(&p.key)))
    }
}
