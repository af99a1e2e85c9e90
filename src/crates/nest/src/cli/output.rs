//! Output formatting for CLI commands
//!
//! Provides formatters for JSON, table, and plain text output.

use super::OutputFormat;
use nest_sync::{Article, ConnectionSnapshot, FeedSnapshot};
use serde_json::{json, Value};

/// Column order for article tables
const ARTICLE_COLUMNS: [&str; 5] = ["title", "source", "category", "saved", "url"];

/// Output formatter trait
pub trait OutputFormatter {
    /// Format data as output
    fn format(&self, data: &Value) -> String;
}

/// JSON formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format(&self, data: &Value) -> String {
        match serde_json::to_string_pretty(data) {
            Ok(s) => s,
            Err(e) => format!("{{\"error\": \"{}\"}}", e),
        }
    }
}

/// Table formatter
pub struct TableFormatter;

impl OutputFormatter for TableFormatter {
    fn format(&self, data: &Value) -> String {
        match data {
            Value::Array(items) => format_table(items),
            Value::Object(map) => match map.get("items") {
                Some(Value::Array(items)) => {
                    let mut output = format_table(items);
                    for (key, value) in map.iter().filter(|(k, _)| *k != "items") {
                        output.push_str(&format!("{:<20}: {}\n", key, plain_value(value)));
                    }
                    output
                }
                _ => format_object_as_table(data),
            },
            _ => plain_value(data),
        }
    }
}

/// Plain text formatter
pub struct PlainFormatter;

impl OutputFormatter for PlainFormatter {
    fn format(&self, data: &Value) -> String {
        match data {
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Object(obj) => match (obj.get("title"), obj.get("url")) {
                        (Some(title), Some(url)) => {
                            format!("{} <{}>", plain_value(title), plain_value(url))
                        }
                        _ => item.to_string(),
                    },
                    other => plain_value(other),
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Value::Object(obj) => match obj.get("items") {
                Some(items @ Value::Array(_)) => self.format(items),
                _ => obj
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, plain_value(v)))
                    .collect::<Vec<_>>()
                    .join("\n"),
            },
            other => plain_value(other),
        }
    }
}

/// Get appropriate formatter based on format type
pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Plain => Box::new(PlainFormatter),
    }
}

fn plain_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Format an array of objects as a table
fn format_table(items: &[Value]) -> String {
    if items.is_empty() {
        return "No articles to display\n".to_string();
    }

    let columns: Vec<String> = match items.first() {
        Some(Value::Object(first)) if first.contains_key("url") => ARTICLE_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .collect(),
        Some(Value::Object(first)) => first.keys().cloned().collect(),
        _ => return format!("{:?}\n", items),
    };

    let mut output = String::new();

    let header = columns
        .iter()
        .map(|col| format!("{:<20}", col))
        .collect::<Vec<_>>()
        .join("|");
    output.push_str(&header);
    output.push('\n');

    let separator = (0..columns.len())
        .map(|_| "-".repeat(20))
        .collect::<Vec<_>>()
        .join("+");
    output.push_str(&separator);
    output.push('\n');

    for item in items {
        if let Value::Object(obj) = item {
            let row = columns
                .iter()
                .map(|col| {
                    let value = obj.get(col).map(plain_value).unwrap_or_default();
                    format!("{:<20}", truncate_string(&value, 18))
                })
                .collect::<Vec<_>>()
                .join("|");
            output.push_str(row.trim_end());
            output.push('\n');
        }
    }

    output
}

/// Format a single object as a table
fn format_object_as_table(obj: &Value) -> String {
    if let Value::Object(map) = obj {
        let mut output = String::new();

        for (key, value) in map {
            output.push_str(&format!("{:<20}: {}\n", key, plain_value(value)));
        }

        output
    } else {
        obj.to_string()
    }
}

/// Truncate string to at most `max_len` characters
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        s.to_string()
    }
}

/// One article as an output row
pub fn article_row(article: &Article) -> Value {
    json!({
        "title": article.title(),
        "source": article.summary.source,
        "category": article.category(),
        "saved": article.is_saved,
        "url": article.id(),
        "published_at": article.summary.published_at,
    })
}

/// A loaded view as a list response
pub fn feed_response(snapshot: &FeedSnapshot) -> Value {
    let items = snapshot.items.iter().map(article_row).collect::<Vec<_>>();
    let total = u32::try_from(items.len()).unwrap_or(u32::MAX);
    let mut response = list_response(items, total);
    response["view"] = json!(snapshot.view.to_string());
    response["page"] = json!(snapshot.page);
    response["has_more"] = json!(snapshot.has_more);
    response
}

/// Connection state as shown by `watch`
pub fn connection_response(snapshot: &ConnectionSnapshot) -> Value {
    json!({
        "state": snapshot.state.to_string(),
        "attempt": snapshot.attempt,
        "next_delay_ms": snapshot.next_delay_ms(),
        "connection_lost": snapshot.is_degraded(),
    })
}

/// Build error response
pub fn error_response(message: &str) -> Value {
    json!({
        "error": message,
        "status": "error"
    })
}

/// Build success response
pub fn success_response(data: Value) -> Value {
    json!({
        "data": data,
        "status": "success"
    })
}

/// Build list response
pub fn list_response(items: Vec<Value>, total: u32) -> Value {
    json!({
        "items": items,
        "total": total,
        "status": "success"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nest_sync::{ArticleSummary, View};

    fn article(title: &str, saved: bool) -> Article {
        Article {
            summary: ArticleSummary {
                url: format!("https://news.example/{}", title.to_lowercase()),
                title: title.to_string(),
                source: "Wire".to_string(),
                content: None,
                published_at: None,
                category: Some("science".to_string()),
                image_url: None,
            },
            is_saved: saved,
        }
    }

    fn snapshot(items: Vec<Article>) -> FeedSnapshot {
        FeedSnapshot {
            view: View::Feed,
            page: 1,
            filter: String::new(),
            items,
            has_more: false,
            busy: false,
            stale: false,
        }
    }

    #[test]
    fn test_json_formatter() {
        let output = JsonFormatter.format(&json!({"name": "test", "value": 42}));
        assert!(output.contains("\"name\": \"test\""));
    }

    #[test]
    fn test_table_formatter_articles() {
        let response = feed_response(&snapshot(vec![article("Comets", true)]));
        let output = TableFormatter.format(&response);

        let header = output.lines().next().unwrap();
        assert!(header.starts_with("title"));
        assert!(header.contains("saved"));
        assert!(output.contains("Comets"));
        assert!(output.contains("true"));
        assert!(output.contains("has_more"));
    }

    #[test]
    fn test_table_formatter_empty_view() {
        let output = TableFormatter.format(&feed_response(&snapshot(Vec::new())));
        assert!(output.starts_with("No articles to display"));
    }

    #[test]
    fn test_plain_formatter_articles() {
        let response = feed_response(&snapshot(vec![article("Comets", false), article("Tides", false)]));
        assert_eq!(
            PlainFormatter.format(&response),
            "Comets <https://news.example/comets>\nTides <https://news.example/tides>"
        );
    }

    #[test]
    fn test_plain_formatter_scalars() {
        assert_eq!(PlainFormatter.format(&json!("hello")), "hello");
        assert_eq!(PlainFormatter.format(&json!(42)), "42");
        assert_eq!(PlainFormatter.format(&json!({"key": "value"})), "key: value");
    }

    #[test]
    fn test_get_formatter() {
        let data = json!({"test": "data"});
        assert!(get_formatter(OutputFormat::Json).format(&data).contains("\"test\""));
        assert!(get_formatter(OutputFormat::Table).format(&data).contains("test"));
        assert_eq!(get_formatter(OutputFormat::Plain).format(&data), "test: data");
    }

    #[test]
    fn test_responses() {
        let response = error_response("boom");
        assert_eq!(response["error"], "boom");
        assert_eq!(response["status"], "error");

        let response = success_response(json!({"saved": true}));
        assert_eq!(response["data"]["saved"], true);

        let response = list_response(vec![json!({"id": "1"})], 1);
        assert_eq!(response["total"], 1);
    }

    #[test]
    fn test_truncate_string() {
        let result = truncate_string("hello world", 5);
        assert_eq!(result, "he...");

        assert_eq!(truncate_string("hi", 5), "hi");
        assert_eq!(truncate_string("ééééééé", 6), "ééé...");
    }
}
