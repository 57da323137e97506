//! Catalog records
//!
//! Typed property listings and company profiles, the description text each
//! one is embedded from, and the metadata stored alongside its vector.

pub mod company;
pub mod property;

use lazy_static::lazy_static;
use regex::Regex;

pub use company::{BasicInfo, CompanyProfile, DealAnalysis, IdealOperatorProfile};
pub use property::PropertyListing;

use crate::search::filter::Metadata;
use crate::search::EntityKind;

/// A record that can be embedded and stored in a vector index
pub trait CatalogRecord {
    const KIND: EntityKind;

    /// Explicit identifier, if the source carries one
    fn record_id(&self) -> Option<&str>;

    /// Display name; records with a blank name are not ingested
    fn display_name(&self) -> &str;

    fn embedding_text(&self) -> String;

    fn metadata(&self) -> Metadata;
}

impl CatalogRecord for PropertyListing {
    const KIND: EntityKind = EntityKind::Property;

    fn record_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn display_name(&self) -> &str {
        &self.property_name
    }

    fn embedding_text(&self) -> String {
        PropertyListing::embedding_text(self)
    }

    fn metadata(&self) -> Metadata {
        PropertyListing::metadata(self)
    }
}

impl CatalogRecord for CompanyProfile {
    const KIND: EntityKind = EntityKind::Company;

    fn record_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn display_name(&self) -> &str {
        &self.company_name
    }

    fn embedding_text(&self) -> String {
        CompanyProfile::embedding_text(self)
    }

    fn metadata(&self) -> Metadata {
        CompanyProfile::metadata(self)
    }
}

lazy_static! {
    // "$1.2B", "$100M", "850K", "$2,500,000", "12 million"
    static ref USD_AMOUNT_RE: Regex = Regex::new(
        r"(?i)^\s*\$?\s*([0-9][0-9,]*(?:\.[0-9]+)?)\s*(thousand|million|billion|trillion|k|m|b|t)?\s*\+?\s*$"
    )
    .unwrap();
}

/// Parse a currency amount such as `$100M` into whole dollars
pub fn parse_usd_amount(text: &str) -> Option<f64> {
    let caps = USD_AMOUNT_RE.captures(text)?;
    let number: f64 = caps.get(1)?.as_str().replace(',', "").parse().ok()?;
    let multiplier = match caps.get(2).map(|m| m.as_str().to_lowercase()) {
        None => 1.0,
        Some(suffix) => match suffix.as_str() {
            "k" | "thousand" => 1e3,
            "m" | "million" => 1e6,
            "b" | "billion" => 1e9,
            "t" | "trillion" => 1e12,
            _ => return None,
        },
    };
    Some((number * multiplier).round())
}

/// Format whole dollars with thousands separators (`$1,000,000`)
pub fn format_usd(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

/// Short currency notation used for filter thresholds (`$100M`, `$1.2B`, `$850K`)
pub fn format_usd_compact(amount: f64) -> String {
    let (scaled, suffix) = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")]
        .into_iter()
        .find(|(unit, _)| amount.abs() >= *unit)
        .map(|(unit, suffix)| (amount / unit, suffix))
        .unwrap_or((amount, ""));
    let text = format!("{:.2}", scaled);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("${}{}", text, suffix)
}
