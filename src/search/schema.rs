//! Per-entity-type search schemas
//!
//! Property and company search run through the same engine; what differs is
//! which filter fields are recognized, which metadata key each one maps to,
//! and which metadata fields are projected into results.

use serde_json::Number;
use std::collections::BTreeMap;

use super::filter::{normalize, FieldFilters, FieldPredicate, FilterClause, FilterValue, Predicate};
use crate::catalog::parse_usd_amount;
use crate::error::{Result, SearchError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Property,
    Company,
}

impl EntityKind {
    pub fn singular(&self) -> &'static str {
        match self {
            EntityKind::Property => "property",
            EntityKind::Company => "company",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            EntityKind::Property => "properties",
            EntityKind::Company => "companies",
        }
    }

    pub fn schema(&self) -> &'static EntitySchema {
        match self {
            EntityKind::Property => &PROPERTY_SCHEMA,
            EntityKind::Company => &COMPANY_SCHEMA,
        }
    }

    /// Parse "property"/"properties"/"company"/"companies"
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "property" | "properties" => Some(EntityKind::Property),
            "company" | "companies" => Some(EntityKind::Company),
            _ => None,
        }
    }
}

/// Value type of a metadata field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    /// Whole dollars; currency strings like "$100M" are parsed in filters
    Currency,
    List,
}

impl FieldKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Integer | FieldKind::Currency)
    }
}

/// A recognized filter field
#[derive(Debug)]
pub struct FilterField {
    /// Name callers use ("price")
    pub name: &'static str,
    /// Metadata key the clause applies to ("price_usd")
    pub metadata_key: &'static str,
    pub kind: FieldKind,
}

impl FilterField {
    /// Check the clause's literals against the field type, parsing currency strings
    fn coerce(&self, clause: FilterClause) -> Result<FilterClause> {
        let field = self.name;
        let kind = self.kind;

        if clause.is_ordering() && !kind.is_numeric() {
            return Err(SearchError::InvalidFilterValue {
                field: field.to_string(),
                reason: format!(
                    "operator '{}' requires a numeric field",
                    clause.operator()
                ),
            });
        }

        clause.try_map_values(|value| match (kind, value) {
            (FieldKind::Currency, FilterValue::Text(text)) => parse_usd_amount(&text)
                .and_then(Number::from_f64)
                .map(FilterValue::Number)
                .ok_or_else(|| SearchError::InvalidFilterValue {
                    field: field.to_string(),
                    reason: format!("'{}' is not a currency amount", text),
                }),
            (k, v) if k.is_numeric() && v.is_number() => Ok(v),
            (k, v) if k.is_numeric() => Err(SearchError::InvalidFilterValue {
                field: field.to_string(),
                reason: format!("expected a numeric literal, got {}", v.to_json()),
            }),
            (_, v @ FilterValue::Text(_)) => Ok(v),
            (_, v) => Err(SearchError::InvalidFilterValue {
                field: field.to_string(),
                reason: format!("expected a text literal, got {}", v.to_json()),
            }),
        })
    }
}

/// A metadata field copied into each projected record
#[derive(Debug)]
pub struct ProjectedField {
    pub key: &'static str,
    pub kind: FieldKind,
    /// Records missing a required field are skipped, never fabricated
    pub required: bool,
}

const fn field(key: &'static str, kind: FieldKind) -> ProjectedField {
    ProjectedField {
        key,
        kind,
        required: false,
    }
}

const fn required(key: &'static str, kind: FieldKind) -> ProjectedField {
    ProjectedField {
        key,
        kind,
        required: true,
    }
}

#[derive(Debug)]
pub struct EntitySchema {
    pub kind: EntityKind,
    pub filter_fields: &'static [FilterField],
    pub fields: &'static [ProjectedField],
}

/// Filters after normalization: the echo for the caller and the index predicate
#[derive(Debug, Clone, Default)]
pub struct NormalizedFilters {
    pub applied: BTreeMap<String, FilterClause>,
    pub predicate: Option<Predicate>,
}

impl EntitySchema {
    pub fn filter_field(&self, name: &str) -> Option<&FilterField> {
        self.filter_fields.iter().find(|f| f.name == name)
    }

    pub fn filter_field_names(&self) -> Vec<&'static str> {
        self.filter_fields.iter().map(|f| f.name).collect()
    }

    /// Key of the record's display name (first required field)
    pub fn name_key(&self) -> &'static str {
        self.fields
            .iter()
            .find(|f| f.required)
            .map(|f| f.key)
            .unwrap_or("id")
    }

    /// Validate and normalize all field filters, AND-combining them.
    ///
    /// Unknown field names are rejected before any clause is examined.
    pub fn normalize_filters(&self, filters: &FieldFilters) -> Result<NormalizedFilters> {
        if let Some(unknown) = filters.keys().find(|name| self.filter_field(name).is_none()) {
            return Err(SearchError::UnknownFilterField {
                field: unknown.clone(),
                expected: self.filter_field_names().join(", "),
            });
        }

        let mut applied = BTreeMap::new();
        let mut clauses = Vec::new();

        for spec in self.filter_fields {
            let Some(clause) = normalize(spec.name, filters.get(spec.name))? else {
                continue;
            };
            let clause = spec.coerce(clause)?;
            clauses.push(FieldPredicate {
                key: spec.metadata_key.to_string(),
                clause: clause.clone(),
            });
            applied.insert(spec.name.to_string(), clause);
        }

        Ok(NormalizedFilters {
            applied,
            predicate: Predicate::all(clauses),
        })
    }
}

// ============================================================================
// Schemas
// ============================================================================

pub static PROPERTY_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Property,
    filter_fields: &[
        FilterField {
            name: "price",
            metadata_key: "price_usd",
            kind: FieldKind::Currency,
        },
        FilterField {
            name: "location",
            metadata_key: "location",
            kind: FieldKind::Text,
        },
        FilterField {
            name: "bedrooms",
            metadata_key: "bedrooms",
            kind: FieldKind::Integer,
        },
        FilterField {
            name: "size",
            metadata_key: "size_sqft",
            kind: FieldKind::Integer,
        },
        FilterField {
            name: "property_type",
            metadata_key: "property_type",
            kind: FieldKind::Text,
        },
        FilterField {
            name: "view",
            metadata_key: "view",
            kind: FieldKind::Text,
        },
    ],
    fields: &[
        required("property_name", FieldKind::Text),
        field("location", FieldKind::Text),
        field("bedrooms", FieldKind::Integer),
        field("view", FieldKind::Text),
        field("price_usd", FieldKind::Integer),
        field("size_sqft", FieldKind::Integer),
        field("description", FieldKind::Text),
        field("property_type", FieldKind::Text),
    ],
};

pub static COMPANY_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Company,
    filter_fields: &[
        FilterField {
            name: "industry",
            metadata_key: "industry",
            kind: FieldKind::Text,
        },
        FilterField {
            name: "location",
            metadata_key: "headquarters",
            kind: FieldKind::Text,
        },
        FilterField {
            name: "revenue",
            metadata_key: "revenue_usd",
            kind: FieldKind::Currency,
        },
        FilterField {
            name: "employees",
            metadata_key: "employees",
            kind: FieldKind::Integer,
        },
    ],
    fields: &[
        required("company_name", FieldKind::Text),
        field("industry", FieldKind::Text),
        field("headquarters", FieldKind::Text),
        field("revenue", FieldKind::Text),
        field("employees", FieldKind::Integer),
        field("business_model", FieldKind::Text),
        field("strategic_priorities", FieldKind::List),
        field("ideal_op_industry", FieldKind::Text),
        field("ideal_op_functional", FieldKind::List),
        field("ideal_op_leadership", FieldKind::List),
        field("description", FieldKind::Text),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::filter::FilterInput;
    use serde_json::json;

    fn filters(value: serde_json::Value) -> FieldFilters {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = PROPERTY_SCHEMA
            .normalize_filters(&filters(json!({"color": "blue"})))
            .unwrap_err();
        match err {
            SearchError::UnknownFilterField { field, expected } => {
                assert_eq!(field, "color");
                assert!(expected.contains("price"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_property_filters_map_to_metadata_keys() {
        let normalized = PROPERTY_SCHEMA
            .normalize_filters(&filters(json!({
                "price": {"lte": 1000000},
                "bedrooms": {"$gte": 3},
                "location": null
            })))
            .unwrap();

        assert_eq!(normalized.applied.len(), 2);
        assert_eq!(
            serde_json::to_value(&normalized.applied).unwrap(),
            json!({"bedrooms": {"gte": 3}, "price": {"lte": 1000000}})
        );
        let keys: Vec<_> = normalized
            .predicate
            .unwrap()
            .clauses()
            .iter()
            .map(|c| c.key.clone())
            .collect();
        assert_eq!(keys, vec!["price_usd", "bedrooms"]);
    }

    #[test]
    fn test_company_location_maps_to_headquarters() {
        let normalized = COMPANY_SCHEMA
            .normalize_filters(&filters(json!({"location": {"in": ["Austin, TX"]}})))
            .unwrap();
        assert_eq!(
            normalized.predicate.unwrap().to_pinecone(),
            json!({"headquarters": {"$in": ["Austin, TX"]}})
        );
    }

    #[test]
    fn test_revenue_currency_string_is_parsed() {
        let mut input = FieldFilters::new();
        input.insert(
            "revenue".to_string(),
            FilterInput::Clause(FilterClause::Gte("$100M".into())),
        );
        let normalized = COMPANY_SCHEMA.normalize_filters(&input).unwrap();
        let clause = &normalized.applied["revenue"];
        assert_eq!(clause.values()[0].as_f64(), Some(100_000_000.0));
    }

    #[test]
    fn test_raw_currency_string_accepted_for_revenue() {
        let normalized = COMPANY_SCHEMA
            .normalize_filters(&filters(json!({"revenue": {"gte": "$1.2B"}})))
            .unwrap();
        assert_eq!(
            normalized.applied["revenue"].values()[0].as_f64(),
            Some(1_200_000_000.0)
        );
    }

    #[test]
    fn test_ordering_requires_numeric_literal() {
        let err = COMPANY_SCHEMA
            .normalize_filters(&filters(json!({"employees": {"gte": "lots"}})))
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidFilterValue { .. }));

        let err = PROPERTY_SCHEMA
            .normalize_filters(&filters(json!({"price": {"lte": "cheap"}})))
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidFilterValue { .. }));
    }

    #[test]
    fn test_ordering_on_text_field_rejected() {
        let err = COMPANY_SCHEMA
            .normalize_filters(&filters(json!({"industry": {"gte": 3}})))
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidFilterValue { .. }));
    }

    #[test]
    fn test_text_literal_on_numeric_field_rejected() {
        let err = COMPANY_SCHEMA
            .normalize_filters(&filters(json!({"employees": {"in": ["many"]}})))
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidFilterValue { .. }));
    }

    #[test]
    fn test_empty_filters() {
        let normalized = PROPERTY_SCHEMA.normalize_filters(&FieldFilters::new()).unwrap();
        assert!(normalized.applied.is_empty());
        assert!(normalized.predicate.is_none());
    }

    #[test]
    fn test_entity_kind_parse() {
        assert_eq!(EntityKind::parse("Companies"), Some(EntityKind::Company));
        assert_eq!(EntityKind::parse("property"), Some(EntityKind::Property));
        assert_eq!(EntityKind::parse("boats"), None);
        assert_eq!(PROPERTY_SCHEMA.name_key(), "property_name");
    }
}
