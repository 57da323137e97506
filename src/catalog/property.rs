//! Property listings

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::format_usd;
use crate::search::filter::Metadata;

/// One property listing as supplied to ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyListing {
    #[serde(default)]
    pub id: Option<String>,
    pub property_name: String,
    pub bedrooms: u32,
    #[serde(default)]
    pub view: String,
    pub location: String,
    pub size_sqft: u64,
    pub price_usd: u64,
    #[serde(default)]
    pub description: String,
}

impl PropertyListing {
    /// Property type is the first word of the name ("Penthouse #23" -> "Penthouse")
    pub fn property_type(&self) -> &str {
        self.property_name.split_whitespace().next().unwrap_or("")
    }

    /// Location with surrounding quotes removed
    pub fn clean_location(&self) -> &str {
        self.location.trim().trim_matches('"')
    }

    /// Text the listing is embedded from
    pub fn embedding_text(&self) -> String {
        format!(
            "Property: {}\nType: {}\nBedrooms: {}\nView: {}\nLocation: {}\nSize: {} square feet\nPrice: {}\nDescription: {}",
            self.property_name,
            self.property_type(),
            self.bedrooms,
            self.view,
            self.clean_location(),
            self.size_sqft,
            format_usd(self.price_usd as f64),
            self.description,
        )
    }

    /// Metadata stored next to the vector
    pub fn metadata(&self) -> Metadata {
        let value = json!({
            "property_name": self.property_name,
            "property_type": self.property_type(),
            "bedrooms": self.bedrooms,
            "view": self.view,
            "location": self.clean_location(),
            "size_sqft": self.size_sqft,
            "price_usd": self.price_usd,
            "description": self.description,
        });
        match value {
            Value::Object(map) => map,
            _ => Metadata::new(),
        }
    }
}
