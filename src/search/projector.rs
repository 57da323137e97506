//! Result projection
//!
//! Maps raw index matches into the consumer-facing [`SearchResult`]. Pure:
//! no I/O, deterministic for a given input.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

use super::filter::{FilterClause, Metadata};
use super::index::RankedMatch;
use super::schema::{EntityKind, EntitySchema, FieldKind, ProjectedField};
use super::summary::summarize;

/// One ranked record with its metadata fields spread out
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedRecord {
    pub rank: usize,
    pub id: String,
    pub score: f64,
    #[serde(flatten)]
    pub fields: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl ProjectedRecord {
    /// Text field, empty when absent
    pub fn text(&self, key: &str) -> &str {
        self.fields.get(key).and_then(Value::as_str).unwrap_or("")
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(Value::as_f64)
    }

    /// List field as strings, empty when absent
    pub fn list(&self, key: &str) -> Vec<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// The output contract of a search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub kind: EntityKind,
    pub query: String,
    /// Count requested by the caller
    pub top_k: usize,
    /// Normalized filters, keyed by caller-facing field name
    pub filters_applied: BTreeMap<String, FilterClause>,
    pub records: Vec<ProjectedRecord>,
    pub total_found: usize,
    pub search_summary: String,
}

impl Serialize for SearchResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(6))?;
        map.serialize_entry("query", &self.query)?;
        map.serialize_entry("top_k", &self.top_k)?;
        map.serialize_entry("filters_applied", &self.filters_applied)?;
        map.serialize_entry(self.kind.plural(), &self.records)?;
        map.serialize_entry("total_found", &self.total_found)?;
        map.serialize_entry("search_summary", &self.search_summary)?;
        map.end()
    }
}

/// Project raw matches in index order into a [`SearchResult`].
///
/// Matches missing a required field are skipped; ranks stay contiguous.
pub fn project(
    schema: &EntitySchema,
    matches: &[RankedMatch],
    query: &str,
    top_k: usize,
    filters_applied: &BTreeMap<String, FilterClause>,
) -> SearchResult {
    let mut records = Vec::with_capacity(matches.len());

    for m in matches {
        let Some(fields) = project_fields(schema.fields, &m.metadata) else {
            warn!(id = %m.id, kind = schema.kind.singular(), "skipping match without required metadata");
            continue;
        };
        records.push(ProjectedRecord {
            rank: records.len() + 1,
            id: m.id.clone(),
            score: round_score(m.score),
            fields,
            reasoning: None,
        });
    }

    let search_summary = summarize(schema.kind, query, &records, filters_applied);

    SearchResult {
        kind: schema.kind,
        query: query.to_string(),
        top_k,
        filters_applied: filters_applied.clone(),
        total_found: records.len(),
        records,
        search_summary,
    }
}

fn round_score(score: f32) -> f64 {
    (score as f64 * 1000.0).round() / 1000.0
}

fn project_fields(fields: &[ProjectedField], metadata: &Metadata) -> Option<Metadata> {
    let mut out = Metadata::new();
    for field in fields {
        let raw = metadata.get(field.key).filter(|v| !v.is_null());
        let value = match raw {
            Some(v) => project_value(field.kind, v),
            None => Value::Null,
        };
        if field.required && is_blank(&value) {
            return None;
        }
        let value = if value.is_null() { default_for(field.kind) } else { value };
        out.insert(field.key.to_string(), value);
    }
    Some(out)
}

fn project_value(kind: FieldKind, value: &Value) -> Value {
    match kind {
        FieldKind::Text => match value {
            Value::String(_) => value.clone(),
            Value::Number(n) => Value::String(n.to_string()),
            Value::Bool(b) => Value::String(b.to_string()),
            _ => Value::Null,
        },
        FieldKind::Integer | FieldKind::Currency => match value.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Value::from(f as i64),
            Some(_) => value.clone(),
            None => Value::Null,
        },
        FieldKind::List => match value {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .filter(|item| !item.is_null())
                    .cloned()
                    .collect(),
            ),
            Value::String(s) => Value::Array(vec![Value::String(s.clone())]),
            _ => Value::Null,
        },
    }
}

fn default_for(kind: FieldKind) -> Value {
    match kind {
        FieldKind::Text => Value::String(String::new()),
        FieldKind::List => Value::Array(Vec::new()),
        FieldKind::Integer | FieldKind::Currency => Value::Null,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
