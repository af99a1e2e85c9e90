//! Article value types shared by the feed views and the push channel

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Article as announced on the push channel (no per-user state)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSummary {
    /// Canonical article URL, also the entity id
    pub url: String,

    /// Headline
    pub title: String,

    /// Publishing outlet
    #[serde(default)]
    pub source: String,

    /// Short body or summary text
    #[serde(default)]
    pub content: Option<String>,

    /// Publication time
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub published_at: Option<DateTime<Utc>>,

    /// Category assigned by the server
    #[serde(default)]
    pub category: Option<String>,

    /// Lead image
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Article as listed in a feed view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Immutable article fields
    #[serde(flatten)]
    pub summary: ArticleSummary,

    /// Whether the signed-in user has saved this article
    #[serde(default)]
    pub is_saved: bool,
}

impl Article {
    /// Entity id used for optimistic mutations
    pub fn id(&self) -> &str {
        &self.summary.url
    }

    /// Headline
    pub fn title(&self) -> &str {
        &self.summary.title
    }

    /// Category, `General` when the server did not assign one
    pub fn category(&self) -> &str {
        self.summary.category.as_deref().unwrap_or("General")
    }
}

impl From<ArticleSummary> for Article {
    fn from(summary: ArticleSummary) -> Self {
        Self {
            summary,
            is_saved: false,
        }
    }
}

/// Accepts RFC 3339 timestamps and the offset-less ISO form the server emits
/// for naive UTC datetimes.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(None);
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }

    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(serde::de::Error::custom)
}
