//! Company profiles

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::parse_usd_amount;
use crate::search::filter::Metadata;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyProfile {
    #[serde(default)]
    pub id: Option<String>,
    pub company_name: String,
    pub basic_info: BasicInfo,
    pub deal_analysis: DealAnalysis,
    /// Pre-built description; synthesized from the structured fields when empty
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicInfo {
    pub industry: String,
    pub headquarters: String,
    /// Human-readable revenue such as "$100M"
    pub revenue: String,
    pub employees: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealAnalysis {
    pub business_model: String,
    #[serde(default)]
    pub strategic_priorities: Vec<String>,
    pub ideal_op_profile: IdealOperatorProfile,
}

/// Profile of the ideal operating partner for the company
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdealOperatorProfile {
    pub industry: String,
    #[serde(default)]
    pub functional: Vec<String>,
    #[serde(default)]
    pub leadership: Vec<String>,
}

impl CompanyProfile {
    /// Text the profile is embedded from
    pub fn embedding_text(&self) -> String {
        if let Some(desc) = self.description.as_deref().filter(|d| !d.trim().is_empty()) {
            return desc.to_string();
        }

        let info = &self.basic_info;
        let deal = &self.deal_analysis;
        format!(
            "Company: {}\nIndustry: {}\nHeadquarters: {}\nRevenue: {}\nEmployees: {}\nBusiness Model: {}\nStrategic Priorities: {}\nIdeal Operating Partner Profile:\n- Industry: {}\n- Functional Strengths: {}\n- Leadership Qualities: {}",
            self.company_name,
            info.industry,
            info.headquarters,
            info.revenue,
            info.employees,
            deal.business_model,
            deal.strategic_priorities.join(", "),
            deal.ideal_op_profile.industry,
            deal.ideal_op_profile.functional.join(", "),
            deal.ideal_op_profile.leadership.join(", "),
        )
    }

    /// Revenue as whole dollars, if the revenue string parses
    pub fn revenue_usd(&self) -> Option<f64> {
        parse_usd_amount(&self.basic_info.revenue)
    }

    /// Metadata stored next to the vector.
    ///
    /// `revenue_usd` is omitted when the revenue string does not parse, so
    /// ordering filters on revenue never match such a record.
    pub fn metadata(&self) -> Metadata {
        let info = &self.basic_info;
        let deal = &self.deal_analysis;
        let value = json!({
            "company_name": self.company_name,
            "industry": info.industry,
            "headquarters": info.headquarters,
            "revenue": info.revenue,
            "employees": info.employees,
            "business_model": deal.business_model,
            "strategic_priorities": deal.strategic_priorities,
            "ideal_op_industry": deal.ideal_op_profile.industry,
            "ideal_op_functional": deal.ideal_op_profile.functional,
            "ideal_op_leadership": deal.ideal_op_profile.leadership,
            "description": self.embedding_text(),
        });
        let mut map = match value {
            Value::Object(map) => map,
            _ => Metadata::new(),
        };
        if let Some(revenue) = self.revenue_usd() {
            map.insert("revenue_usd".to_string(), json!(revenue));
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> CompanyProfile {
        serde_json::from_value(json!({
            "company_name": "Acme Analytics",
            "basic_info": {
                "industry": "SaaS Data Analytics",
                "headquarters": "Austin, TX",
                "revenue": "$120M",
                "employees": 450
            },
            "deal_analysis": {
                "business_model": "Subscription analytics platform",
                "strategic_priorities": ["International expansion", "AI features"],
                "ideal_op_profile": {
                    "industry": "Enterprise software",
                    "functional": ["Go-to-market", "Pricing"],
                    "leadership": ["Operator mindset"]
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_embedding_text_synthesized() {
        let text = profile().embedding_text();
        assert!(text.starts_with("Company: Acme Analytics\nIndustry: SaaS Data Analytics"));
        assert!(text.contains("Strategic Priorities: International expansion, AI features"));
        assert!(text.contains("- Functional Strengths: Go-to-market, Pricing"));
    }

    #[test]
    fn test_prebuilt_description_wins() {
        let mut p = profile();
        p.description = Some("Custom description".to_string());
        assert_eq!(p.embedding_text(), "Custom description");
    }

    #[test]
    fn test_metadata_has_numeric_revenue() {
        let meta = profile().metadata();
        assert_eq!(meta["revenue"], json!("$120M"));
        assert_eq!(meta["revenue_usd"], json!(120_000_000.0));
        assert_eq!(meta["employees"], json!(450));
        assert_eq!(meta["ideal_op_leadership"], json!(["Operator mindset"]));
    }

    #[test]
    fn test_unparseable_revenue_omitted() {
        let mut p = profile();
        p.basic_info.revenue = "undisclosed".to_string();
        assert!(!p.metadata().contains_key("revenue_usd"));
    }
}
