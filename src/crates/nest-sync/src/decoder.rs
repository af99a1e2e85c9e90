//! Push frame decoding
//!
//! Frames are JSON objects discriminated by a `kind` field. The notification
//! service also emits the same discriminator under `type`, which is accepted
//! as a fallback.

use crate::article::ArticleSummary;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Typed push notification
///
/// Serializes in the `kind`-tagged form [`decode`] reads; [`decode`] is the
/// only way in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelEvent {
    /// A single article was published
    NewArticle {
        /// The article
        article: ArticleSummary,
    },
    /// A batch of articles was ingested
    NewArticles {
        /// Number of new articles
        count: u32,
        /// Human-readable announcement
        message: Option<String>,
    },
    /// Articles matching the signed-in user's follows
    PersonalizedArticles {
        /// Up to five of the matching articles
        articles: Vec<ArticleSummary>,
        /// Total number of matches
        count: u32,
        /// Human-readable announcement
        message: Option<String>,
    },
}

impl ChannelEvent {
    /// Wire name of the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewArticle { .. } => "new_article",
            Self::NewArticles { .. } => "new_articles",
            Self::PersonalizedArticles { .. } => "personalized_articles",
        }
    }

    /// One-line text suitable for a toast
    pub fn headline(&self) -> String {
        match self {
            Self::NewArticle { article } => format!("New article: {}", article.title),
            Self::NewArticles { count, message } => message
                .clone()
                .unwrap_or_else(|| format!("{} new articles", count)),
            Self::PersonalizedArticles { count, message, .. } => message
                .clone()
                .unwrap_or_else(|| format!("You have {} new articles from your follows", count)),
        }
    }
}

/// Why a frame was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeFailure {
    /// Not JSON, or not a JSON object
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// No string `kind` (or `type`) field
    #[error("frame has no kind")]
    MissingKind,

    /// Discriminator not recognized
    #[error("unknown frame kind '{0}'")]
    UnknownKind(String),

    /// Recognized kind with a payload of the wrong shape
    #[error("invalid '{kind}' payload: {reason}")]
    InvalidPayload {
        /// Frame kind
        kind: String,
        /// Parser message
        reason: String,
    },
}

#[derive(Deserialize)]
struct NewArticlePayload {
    article: ArticleSummary,
}

#[derive(Deserialize)]
struct BatchPayload {
    #[serde(default)]
    count: u32,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct PersonalizedPayload {
    #[serde(default)]
    articles: Vec<ArticleSummary>,
    #[serde(default)]
    count: Option<u32>,
    #[serde(default)]
    message: Option<String>,
}

/// Decode one raw frame
pub fn decode(raw: &str) -> Result<ChannelEvent, DecodeFailure> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| DecodeFailure::Malformed(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| DecodeFailure::Malformed("expected a JSON object".to_string()))?;

    let kind = discriminator(object).ok_or(DecodeFailure::MissingKind)?;

    match kind {
        "new_article" | "NewArticle" => {
            let payload: NewArticlePayload = payload(kind, &value)?;
            Ok(ChannelEvent::NewArticle {
                article: payload.article,
            })
        }
        "new_articles" | "NewArticles" => {
            let payload: BatchPayload = payload(kind, &value)?;
            Ok(ChannelEvent::NewArticles {
                count: payload.count,
                message: payload.message,
            })
        }
        "personalized_articles" | "PersonalizedArticles" => {
            let payload: PersonalizedPayload = payload(kind, &value)?;
            let count = payload
                .count
                .unwrap_or_else(|| u32::try_from(payload.articles.len()).unwrap_or(u32::MAX));
            Ok(ChannelEvent::PersonalizedArticles {
                articles: payload.articles,
                count,
                message: payload.message,
            })
        }
        other => Err(DecodeFailure::UnknownKind(other.to_string())),
    }
}

fn discriminator(object: &Map<String, Value>) -> Option<&str> {
    object
        .get("kind")
        .or_else(|| object.get("type"))
        .and_then(Value::as_str)
}

fn payload<'a, T: Deserialize<'a>>(kind: &str, value: &'a Value) -> Result<T, DecodeFailure> {
    T::deserialize(value).map_err(|e| DecodeFailure::InvalidPayload {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}
