//! Reasoning augmentation
//!
//! Annotates each ranked record with a short explanation of why it matched.
//! Companies are explained by a text-generation provider (OpenAI chat); a
//! failed call degrades to [`REASONING_FALLBACK`] for that record only.
//! Properties are explained by deterministic keyword rules.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::projector::ProjectedRecord;
use super::schema::EntityKind;
use crate::catalog::format_usd;
use crate::core::config::Config;
use crate::error::ReasoningError;

/// Reasoning used when the provider fails or is not configured
pub const REASONING_FALLBACK: &str =
    "Reasoning unavailable: selected based on semantic similarity to the query.";

const COMPANY_SYSTEM_PROMPT: &str = "You are an expert business analyst. Your task is to explain why a specific company was selected as a match for a search query.

IMPORTANT: Only use the provided company information and query. If something is not explicitly mentioned in the provided information, say \"Not found\" rather than making assumptions.

Analyze the company's characteristics against the search query and give a concise, factual explanation of why this company is a good match. Cover industry alignment, location relevance (if applicable), business model fit, strategic priorities, size and revenue, and what the semantic similarity score indicates.

Reference actual data from the company information provided.";

#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningPrompt {
    pub system: String,
    pub user: String,
}

/// Text-generation collaborator
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    async fn generate(&self, prompt: &ReasoningPrompt) -> Result<String, ReasoningError>;
}

// ============================================================================
// OpenAI chat provider
// ============================================================================

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiReasoner {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiReasoner {
    pub fn new(api_key: String, base_url: &str, model: String, max_tokens: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model,
            max_tokens,
        }
    }

    /// `None` when no OpenAI key is configured
    pub fn from_config(config: &Config) -> Option<Self> {
        let openai = &config.openai;
        let api_key = openai.api_key.clone().filter(|k| !k.is_empty())?;
        Some(Self::new(
            api_key,
            &openai.base_url,
            openai.chat_model.clone(),
            openai.max_tokens,
        ))
    }
}

#[async_trait]
impl ReasoningProvider for OpenAiReasoner {
    async fn generate(&self, prompt: &ReasoningPrompt) -> Result<String, ReasoningError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: 0.0,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ReasoningError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReasoningError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ReasoningError::Transport(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(ReasoningError::EmptyResponse)
    }
}

// ============================================================================
// Prompts
// ============================================================================

/// Prompt explaining one company match
pub fn company_prompt(query: &str, record: &ProjectedRecord) -> ReasoningPrompt {
    let info = format!(
        "Company Information:\n\
         - Name: {}\n\
         - Industry: {}\n\
         - Headquarters: {}\n\
         - Revenue: {}\n\
         - Employees: {}\n\
         - Business Model: {}\n\
         - Strategic Priorities: {}\n\
         - Ideal Operating Partner Industry: {}\n\
         - Ideal Operating Partner Functional Strengths: {}\n\
         - Ideal Operating Partner Leadership Qualities: {}\n\
         - Description: {}\n\
         - Semantic Similarity Score: {:.3}",
        record.text("company_name"),
        record.text("industry"),
        record.text("headquarters"),
        record.text("revenue"),
        record
            .number("employees")
            .map(|n| n.to_string())
            .unwrap_or_default(),
        record.text("business_model"),
        record.list("strategic_priorities").join(", "),
        record.text("ideal_op_industry"),
        record.list("ideal_op_functional").join(", "),
        record.list("ideal_op_leadership").join(", "),
        record.text("description"),
        record.score,
    );

    ReasoningPrompt {
        system: COMPANY_SYSTEM_PROMPT.to_string(),
        user: format!(
            "Search Query: \"{}\"\n\n{}\n\nExplain why this company was selected as a match for the search query. Use only the information provided above.",
            query, info
        ),
    }
}

// ============================================================================
// Property keyword rules
// ============================================================================

struct Rule {
    query_words: &'static [&'static str],
    check: fn(&ProjectedRecord) -> Option<String>,
}

fn has_word(query: &str, words: &[&str]) -> bool {
    let tokens: Vec<&str> = query
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|t| !t.is_empty())
        .collect();
    words.iter().any(|w| {
        if w.contains(' ') {
            query.contains(w)
        } else {
            tokens.contains(w)
        }
    })
}

fn type_in(record: &ProjectedRecord, types: &[&str]) -> bool {
    let t = record.text("property_type").to_lowercase();
    types.contains(&t.as_str())
}

fn view_has(record: &ProjectedRecord, words: &[&str]) -> bool {
    let view = record.text("view").to_lowercase();
    words.iter().any(|w| view.contains(w))
}

static PROPERTY_RULES: &[Rule] = &[
    Rule {
        query_words: &["penthouse", "luxury", "high-end"],
        check: |r| {
            type_in(r, &["penthouse", "villa"])
                .then(|| format!("matches luxury property type ({})", r.text("property_type")))
        },
    },
    Rule {
        query_words: &["house", "home", "family"],
        check: |r| {
            type_in(r, &["house", "townhouse"])
                .then(|| format!("matches family home type ({})", r.text("property_type")))
        },
    },
    Rule {
        query_words: &["apartment", "condo", "studio"],
        check: |r| {
            type_in(r, &["apartment", "condo", "studio"])
                .then(|| format!("matches residential type ({})", r.text("property_type")))
        },
    },
    Rule {
        query_words: &["ocean", "water", "beach"],
        check: |r| {
            view_has(r, &["ocean", "lake", "river"])
                .then(|| format!("has water view ({})", r.text("view")))
        },
    },
    Rule {
        query_words: &["mountain", "forest", "nature"],
        check: |r| {
            view_has(r, &["mountain", "forest", "garden"])
                .then(|| format!("has nature view ({})", r.text("view")))
        },
    },
    Rule {
        query_words: &["city", "urban", "skyline"],
        check: |r| {
            view_has(r, &["city", "skyline"]).then(|| format!("has urban view ({})", r.text("view")))
        },
    },
    Rule {
        query_words: &["california", "ca", "cali"],
        check: |r| {
            let loc = r.text("location").to_lowercase();
            (loc.contains("california") || loc.contains(", ca"))
                .then(|| format!("located in California ({})", r.text("location")))
        },
    },
    Rule {
        query_words: &["new york", "ny", "brooklyn", "manhattan"],
        check: |r| {
            let loc = r.text("location").to_lowercase();
            (loc.contains("new york") || loc.contains(", ny"))
                .then(|| format!("located in New York area ({})", r.text("location")))
        },
    },
];

/// Price bands, reported after the bedroom requirement
static PRICE_RULES: &[Rule] = &[
    Rule {
        query_words: &["affordable", "budget", "cheap", "low price"],
        check: |r| {
            r.number("price_usd")
                .filter(|p| *p <= 1_000_000.0)
                .map(|p| format!("affordable price ({})", format_usd(p)))
        },
    },
    Rule {
        query_words: &["luxury", "expensive", "high-end", "premium"],
        check: |r| {
            r.number("price_usd")
                .filter(|p| *p >= 2_000_000.0)
                .map(|p| format!("luxury price point ({})", format_usd(p)))
        },
    },
];

/// Minimum bedroom count the query asks for ("3 bedroom", "two br")
fn bedroom_requirement(query: &str) -> Option<u32> {
    if !has_word(query, &["bedroom", "bedrooms", "br"]) {
        return None;
    }
    [(3, "3", "three"), (2, "2", "two"), (4, "4", "four")]
        .into_iter()
        .find(|(_, digit, word)| query.contains(digit) || has_word(query, &[word]))
        .map(|(n, _, _)| n)
}

/// Explain a property match from the query's keywords
pub fn property_reasoning(query: &str, record: &ProjectedRecord) -> String {
    let query = query.to_lowercase();
    let matching = |rules: &'static [Rule]| {
        rules
            .iter()
            .filter(|rule| has_word(&query, rule.query_words))
            .filter_map(|rule| (rule.check)(record))
            .collect::<Vec<_>>()
    };
    let mut reasons = matching(PROPERTY_RULES);

    if let (Some(min), Some(bedrooms)) = (bedroom_requirement(&query), record.number("bedrooms")) {
        if bedrooms >= min as f64 {
            reasons.push(format!(
                "has {} bedrooms (meets {}+ requirement)",
                bedrooms, min
            ));
        }
    }
    reasons.extend(matching(PRICE_RULES));

    let similarity = match record.score {
        s if s >= 0.6 => "high",
        s if s >= 0.5 => "good",
        _ => "moderate",
    };
    reasons.push(format!("{} semantic similarity to query", similarity));

    format!("Selected because: {}", reasons.join(", "))
}

// ============================================================================
// Augmenter
// ============================================================================

pub struct ReasoningAugmenter {
    provider: Option<Arc<dyn ReasoningProvider>>,
    concurrency: usize,
}

impl ReasoningAugmenter {
    pub fn new(provider: Option<Arc<dyn ReasoningProvider>>, concurrency: usize) -> Self {
        Self {
            provider,
            concurrency: concurrency.max(1),
        }
    }

    /// Attach reasoning to every record, in rank order.
    ///
    /// Never fails: a provider error replaces only that record's reasoning
    /// with the fallback.
    pub async fn augment(&self, kind: EntityKind, query: &str, records: &mut [ProjectedRecord]) {
        match kind {
            EntityKind::Property => {
                for record in records.iter_mut() {
                    record.reasoning = Some(property_reasoning(query, record));
                }
            }
            EntityKind::Company => self.augment_with_provider(query, records).await,
        }
    }

    async fn augment_with_provider(&self, query: &str, records: &mut [ProjectedRecord]) {
        let Some(provider) = &self.provider else {
            warn!("no reasoning provider configured; using fallback reasoning");
            for record in records.iter_mut() {
                record.reasoning = Some(REASONING_FALLBACK.to_string());
            }
            return;
        };

        let prompts: Vec<ReasoningPrompt> =
            records.iter().map(|r| company_prompt(query, r)).collect();

        // Calls are created before streaming; a borrowing `map` closure would
        // make the search future non-Send. `buffered` keeps input order.
        let calls: Vec<_> = prompts.iter().map(|prompt| provider.generate(prompt)).collect();
        let outcomes: Vec<Result<String, ReasoningError>> = stream::iter(calls)
            .buffered(self.concurrency)
            .collect()
            .await;

        for (record, outcome) in records.iter_mut().zip(outcomes) {
            record.reasoning = Some(match outcome {
                Ok(text) => text,
                Err(e) => {
                    warn!(rank = record.rank, id = %record.id, error = %e, "reasoning failed");
                    REASONING_FALLBACK.to_string()
                }
            });
        }
        debug!(records = records.len(), "reasoning attached");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::testing::ScriptedReasoner;
    use serde_json::json;

    fn record(rank: usize, score: f64, fields: serde_json::Value) -> ProjectedRecord {
        ProjectedRecord {
            rank,
            id: format!("id-{}", rank),
            score,
            fields: serde_json::from_value(fields).unwrap(),
            reasoning: None,
        }
    }

    fn companies(n: usize) -> Vec<ProjectedRecord> {
        (1..=n)
            .map(|i| {
                record(
                    i,
                    0.8,
                    json!({"company_name": format!("Company {}", i), "industry": "SaaS",
                           "strategic_priorities": ["Growth"], "employees": 250}),
                )
            })
            .collect()
    }

    #[test]
    fn test_company_prompt_contents() {
        let r = &companies(1)[0];
        let prompt = company_prompt("saas growth", r);
        assert!(prompt.system.contains("expert business analyst"));
        assert!(prompt.user.starts_with("Search Query: \"saas growth\""));
        assert!(prompt.user.contains("- Name: Company 1"));
        assert!(prompt.user.contains("- Strategic Priorities: Growth"));
        assert!(prompt.user.contains("- Employees: 250"));
        assert!(prompt.user.contains("- Semantic Similarity Score: 0.800"));
    }

    #[tokio::test]
    async fn test_failure_degrades_single_record() {
        let reasoner = Arc::new(ScriptedReasoner::failing_for(&["Company 2"]));
        let augmenter = ReasoningAugmenter::new(Some(reasoner.clone()), 3);
        let mut records = companies(5);

        augmenter.augment(EntityKind::Company, "saas", &mut records).await;

        assert_eq!(records.len(), 5);
        assert_eq!(records[1].reasoning.as_deref(), Some(REASONING_FALLBACK));
        for i in [0, 2, 3, 4] {
            let text = records[i].reasoning.as_deref().unwrap();
            assert_eq!(text, format!("Company {} fits the query", i + 1));
        }
        assert_eq!(reasoner.calls(), 5);
    }

    #[tokio::test]
    async fn test_missing_provider_uses_fallback() {
        let augmenter = ReasoningAugmenter::new(None, 4);
        let mut records = companies(2);
        augmenter.augment(EntityKind::Company, "saas", &mut records).await;
        assert!(records
            .iter()
            .all(|r| r.reasoning.as_deref() == Some(REASONING_FALLBACK)));
    }

    #[test]
    fn test_property_reasoning_rules() {
        let r = record(
            1,
            0.62,
            json!({"property_type": "Penthouse", "view": "ocean view", "location": "Malibu, CA",
                   "price_usd": 2500000, "bedrooms": 4}),
        );
        let text = property_reasoning("Luxury penthouse with ocean view, 3 bedrooms in CA", &r);
        assert_eq!(
            text,
            "Selected because: matches luxury property type (Penthouse), has water view (ocean view), \
             located in California (Malibu, CA), has 4 bedrooms (meets 3+ requirement), \
             luxury price point ($2,500,000), high semantic similarity to query"
        );
    }

    #[test]
    fn test_property_reasoning_similarity_only() {
        let r = record(1, 0.42, json!({"property_type": "Condo", "view": "", "location": "Denver, CO"}));
        assert_eq!(
            property_reasoning("something quiet", &r),
            "Selected because: moderate semantic similarity to query"
        );
    }

    #[tokio::test]
    async fn test_property_augment_needs_no_provider() {
        let augmenter = ReasoningAugmenter::new(None, 1);
        let mut records = vec![record(1, 0.55, json!({"property_type": "Villa"}))];
        augmenter.augment(EntityKind::Property, "villa", &mut records).await;
        assert_eq!(
            records[0].reasoning.as_deref(),
            Some("Selected because: good semantic similarity to query")
        );
    }
}
