//! Search command - semantic search over a catalog

use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde_json::{json, Value};

use catalog_search::catalog::format_usd;
use catalog_search::core::config::Config;
use catalog_search::search::{open_engine, EntityKind, FieldFilters, FilterInput, SearchResult};

pub struct SearchArgs {
    pub kind: EntityKind,
    pub query: String,
    pub top_k: Option<usize>,
    pub filters: Vec<String>,
    pub reasoning: bool,
    pub json: bool,
}

pub fn run(args: SearchArgs) -> Result<()> {
    let config = Config::load();
    let filters = parse_filters(&args.filters)?;
    let top_k = args.top_k.unwrap_or(config.search.default_top_k);

    let engine = open_engine(&config, args.kind)?;
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(async {
        if args.reasoning {
            engine.search_with_reasoning(&args.query, top_k, &filters).await
        } else {
            engine.search(&args.query, top_k, &filters).await
        }
    })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    Ok(())
}

/// Parse `--filter` arguments.
///
/// `price<=1000000`, `bedrooms>=3`, `location=Austin, TX`, or a JSON operator
/// mapping after `=` such as `industry={"in": ["SaaS", "EdTech"]}`.
pub fn parse_filters(args: &[String]) -> Result<FieldFilters> {
    let mut filters = FieldFilters::new();
    for arg in args {
        let (field, value) = parse_filter(arg)?;
        if filters.insert(field.clone(), FilterInput::Raw(value)).is_some() {
            bail!("Filter on '{}' given more than once", field);
        }
    }
    Ok(filters)
}

fn parse_filter(arg: &str) -> Result<(String, Value)> {
    let split = arg
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .with_context(|| format!("Invalid filter '{}': expected <field><op><value>", arg))?;
    let (field, rest) = arg.split_at(split);
    if field.is_empty() {
        bail!("Invalid filter '{}': missing field name", arg);
    }

    let (op, literal) = ["<=", ">=", "<", ">", "="]
        .iter()
        .find_map(|op| rest.strip_prefix(op).map(|lit| (*op, lit.trim())))
        .with_context(|| format!("Invalid filter '{}': unknown operator", arg))?;

    let value = match op {
        "=" => match serde_json::from_str::<Value>(literal) {
            Ok(v @ Value::Object(_)) => v,
            _ => literal_value(literal),
        },
        "<=" => json!({ "lte": literal_value(literal) }),
        ">=" => json!({ "gte": literal_value(literal) }),
        "<" => json!({ "lt": literal_value(literal) }),
        _ => json!({ "gt": literal_value(literal) }),
    };

    Ok((field.to_string(), value))
}

/// Numbers and booleans as JSON, anything else as text
fn literal_value(literal: &str) -> Value {
    match serde_json::from_str::<Value>(literal) {
        Ok(v @ (Value::Number(_) | Value::Bool(_))) => v,
        _ => Value::String(literal.to_string()),
    }
}

fn print_result(result: &SearchResult) {
    if result.records.is_empty() {
        println!("{} {}", "→".dimmed(), result.search_summary);
        return;
    }

    println!(
        "{} {} {} for: {}",
        "→".dimmed(),
        result.total_found,
        result.kind.plural(),
        result.query.cyan()
    );
    if !result.filters_applied.is_empty() {
        let applied = serde_json::to_string(&result.filters_applied).unwrap_or_default();
        println!("  {} {}", "filters:".dimmed(), applied);
    }
    println!();

    for record in &result.records {
        let score_str = format!("{:.3}", record.score);
        let score_colored = if record.score > 0.6 {
            score_str.green()
        } else if record.score > 0.4 {
            score_str.yellow()
        } else {
            score_str.dimmed()
        };

        let name = record.text(result.kind.schema().name_key());
        println!(
            "{}. [{}] {}",
            record.rank.to_string().bold(),
            score_colored,
            name.cyan()
        );

        match result.kind {
            EntityKind::Property => {
                let price = record
                    .number("price_usd")
                    .map(format_usd)
                    .unwrap_or_default();
                let bedrooms = record
                    .number("bedrooms")
                    .map(|b| format!("{} bd", b))
                    .unwrap_or_default();
                println!("   {} | {} | {}", record.text("location"), bedrooms, price);
            }
            EntityKind::Company => {
                let employees = record
                    .number("employees")
                    .map(|n| format!("{} employees", n))
                    .unwrap_or_default();
                println!(
                    "   {} | {} | {} | {}",
                    record.text("industry"),
                    record.text("headquarters"),
                    record.text("revenue"),
                    employees
                );
            }
        }

        let description = record.text("description");
        if !description.is_empty() {
            let display = if description.chars().count() > 100 {
                format!("{}...", description.chars().take(100).collect::<String>())
            } else {
                description.to_string()
            };
            println!("   {}", display.dimmed());
        }

        if let Some(reasoning) = &record.reasoning {
            println!("   {} {}", "why:".yellow(), reasoning);
        }
        println!();
    }

    println!("{}", result.search_summary.dimmed());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(filters: &FieldFilters, key: &str) -> Value {
        match &filters[key] {
            FilterInput::Raw(v) => v.clone(),
            FilterInput::Clause(c) => c.to_json(),
        }
    }

    #[test]
    fn test_parse_operator_filters() {
        let filters = parse_filters(&[
            "price<=1000000".to_string(),
            "bedrooms>=3".to_string(),
            "revenue>$100M".to_string(),
        ])
        .unwrap();

        assert_eq!(raw(&filters, "price"), json!({"lte": 1000000}));
        assert_eq!(raw(&filters, "bedrooms"), json!({"gte": 3}));
        assert_eq!(raw(&filters, "revenue"), json!({"gt": "$100M"}));
    }

    #[test]
    fn test_parse_equality_and_json() {
        let filters = parse_filters(&[
            "location=Austin, TX".to_string(),
            r#"industry={"in": ["SaaS", "EdTech"]}"#.to_string(),
        ])
        .unwrap();

        assert_eq!(raw(&filters, "location"), json!("Austin, TX"));
        assert_eq!(raw(&filters, "industry"), json!({"in": ["SaaS", "EdTech"]}));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_filters(&["price".to_string()]).is_err());
        assert!(parse_filters(&["=3".to_string()]).is_err());
        assert!(parse_filters(&["price!3".to_string()]).is_err());
        assert!(parse_filters(&["price<=1".to_string(), "price>=0".to_string()]).is_err());
    }
}
