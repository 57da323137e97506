//! One-line human-readable summary of a search result

use std::collections::BTreeMap;

use super::filter::FilterClause;
use super::projector::ProjectedRecord;
use super::schema::EntityKind;
use crate::catalog::{format_usd, format_usd_compact, parse_usd_amount};

const MAX_LISTED: usize = 3;

pub fn summarize(
    kind: EntityKind,
    query: &str,
    records: &[ProjectedRecord],
    filters: &BTreeMap<String, FilterClause>,
) -> String {
    if records.is_empty() {
        return format!("No {} found matching '{}'", kind.plural(), query);
    }

    let mut parts = vec![format!(
        "Found {} {} matching '{}'",
        records.len(),
        kind.plural(),
        query
    )];

    let described = match kind {
        EntityKind::Property => describe_property_filters(filters),
        EntityKind::Company => describe_company_filters(filters),
    };
    if !described.is_empty() {
        parts.push(format!("with filters: {}", described.join(", ")));
    }

    match kind {
        EntityKind::Property => {
            let prices: Vec<f64> = records.iter().filter_map(|r| r.number("price_usd")).collect();
            if let Some((min, max)) = min_max(&prices) {
                parts.push(format!("Price range: {} - {}", format_usd(min), format_usd(max)));
            }
            parts.push(format!("Locations: {}", listed(distinct(records, "location"), MAX_LISTED)));
            parts.push(format!(
                "Types: {}",
                listed(distinct(records, "property_type"), usize::MAX)
            ));
        }
        EntityKind::Company => {
            parts.push(format!("Industries: {}", listed(distinct(records, "industry"), MAX_LISTED)));
            parts.push(format!(
                "Locations: {}",
                listed(distinct(records, "headquarters"), MAX_LISTED)
            ));
            if let Some(range) = revenue_range(records) {
                parts.push(format!("Revenue range: {}", range));
            }
        }
    }

    parts.join(". ") + "."
}

fn describe_property_filters(filters: &BTreeMap<String, FilterClause>) -> Vec<String> {
    let mut out = Vec::new();
    match filters.get("price") {
        Some(FilterClause::Lte(v)) | Some(FilterClause::Lt(v)) => {
            if let Some(n) = v.as_f64() {
                out.push(format!("under {}", format_usd(n)));
            }
        }
        Some(FilterClause::Gte(v)) | Some(FilterClause::Gt(v)) => {
            if let Some(n) = v.as_f64() {
                out.push(format!("over {}", format_usd(n)));
            }
        }
        _ => {}
    }
    if let Some(FilterClause::Gte(v)) = filters.get("bedrooms") {
        out.push(format!("{}+ bedrooms", v.to_json()));
    }
    if let Some(place) = filters.get("location").and_then(first_literal) {
        out.push(format!("in {}", place));
    }
    out
}

fn describe_company_filters(filters: &BTreeMap<String, FilterClause>) -> Vec<String> {
    let mut out = Vec::new();
    for key in ["industry", "location"] {
        if let Some(value) = filters.get(key).and_then(first_literal) {
            out.push(format!("in {}", value));
        }
    }
    if let Some(FilterClause::Gte(v)) = filters.get("revenue") {
        if let Some(n) = v.as_f64() {
            out.push(format!("revenue {}+", format_usd_compact(n)));
        }
    }
    if let Some(FilterClause::Gte(v)) = filters.get("employees") {
        out.push(format!("{}+ employees", v.to_json()));
    }
    out
}

/// First literal of an equality or `in` clause, as display text
fn first_literal(clause: &FilterClause) -> Option<String> {
    let value = match clause {
        FilterClause::Equals(v) => v,
        FilterClause::In(vs) => vs.first()?,
        _ => return None,
    };
    Some(match value.to_json() {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Distinct non-empty values in rank order
fn distinct<'a>(records: &'a [ProjectedRecord], key: &str) -> Vec<&'a str> {
    let mut seen = Vec::new();
    for value in records.iter().map(|r| r.text(key)) {
        if !value.is_empty() && !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

fn listed(values: Vec<&str>, limit: usize) -> String {
    let shown: Vec<&str> = values.iter().take(limit).copied().collect();
    let suffix = if values.len() > limit { "..." } else { "" };
    format!("{}{}", shown.join(", "), suffix)
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(values.iter().fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))))
}

/// Revenue range by parsed amount, displayed in the stored notation
fn revenue_range(records: &[ProjectedRecord]) -> Option<String> {
    let mut amounts: Vec<(f64, &str)> = records
        .iter()
        .map(|r| r.text("revenue"))
        .filter_map(|text| parse_usd_amount(text).map(|n| (n, text)))
        .collect();

    if amounts.is_empty() {
        let mut raw: Vec<&str> = distinct(records, "revenue");
        raw.sort_unstable();
        return match (raw.first(), raw.last()) {
            (Some(lo), Some(hi)) => Some(format!("{} - {}", lo, hi)),
            _ => None,
        };
    }

    amounts.sort_by(|a, b| a.0.total_cmp(&b.0));
    let lo = amounts.first()?.1;
    let hi = amounts.last()?.1;
    Some(format!("{} - {}", lo, hi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(rank: usize, fields: serde_json::Value) -> ProjectedRecord {
        ProjectedRecord {
            rank,
            id: rank.to_string(),
            score: 0.5,
            fields: serde_json::from_value(fields).unwrap(),
            reasoning: None,
        }
    }

    #[test]
    fn test_empty_result_summary() {
        assert_eq!(
            summarize(EntityKind::Company, "fintech", &[], &BTreeMap::new()),
            "No companies found matching 'fintech'"
        );
    }

    #[test]
    fn test_property_summary() {
        let records = vec![
            record(1, json!({"price_usd": 950000, "location": "Austin, TX", "property_type": "Villa"})),
            record(2, json!({"price_usd": 450000, "location": "Miami, FL", "property_type": "Condo"})),
            record(3, json!({"price_usd": 700000, "location": "Austin, TX", "property_type": "Villa"})),
        ];
        let mut filters = BTreeMap::new();
        filters.insert("price".to_string(), FilterClause::Lte(1000000i64.into()));
        filters.insert("bedrooms".to_string(), FilterClause::Gte(3i64.into()));

        assert_eq!(
            summarize(EntityKind::Property, "affordable", &records, &filters),
            "Found 3 properties matching 'affordable'. with filters: under $1,000,000, 3+ bedrooms. \
             Price range: $450,000 - $950,000. Locations: Austin, TX, Miami, FL. Types: Villa, Condo."
        );
    }

    #[test]
    fn test_company_summary() {
        let records = vec![
            record(1, json!({"industry": "SaaS", "headquarters": "Austin, TX", "revenue": "$1.2B"})),
            record(2, json!({"industry": "EdTech", "headquarters": "Boston, MA", "revenue": "$85M"})),
            record(3, json!({"industry": "Fintech", "headquarters": "NYC", "revenue": "$300M"})),
            record(4, json!({"industry": "Retail", "headquarters": "NYC", "revenue": "$40M"})),
        ];
        let mut filters = BTreeMap::new();
        filters.insert(
            "industry".to_string(),
            FilterClause::In(vec!["SaaS".into(), "EdTech".into()]),
        );
        filters.insert("employees".to_string(), FilterClause::Gte(200i64.into()));

        assert_eq!(
            summarize(EntityKind::Company, "tech", &records, &filters),
            "Found 4 companies matching 'tech'. with filters: in SaaS, 200+ employees. \
             Industries: SaaS, EdTech, Fintech.... Locations: Austin, TX, Boston, MA, NYC. \
             Revenue range: $40M - $1.2B."
        );
    }

    #[test]
    fn test_company_revenue_filter_in_short_notation() {
        let records = vec![record(
            1,
            json!({"industry": "SaaS", "headquarters": "Austin, TX", "revenue": "$120M"}),
        )];
        let mut filters = BTreeMap::new();
        filters.insert("revenue".to_string(), FilterClause::Gte(100_000_000i64.into()));

        assert_eq!(
            summarize(EntityKind::Company, "saas", &records, &filters),
            "Found 1 companies matching 'saas'. with filters: revenue $100M+. \
             Industries: SaaS. Locations: Austin, TX. Revenue range: $120M - $120M."
        );
    }
}
