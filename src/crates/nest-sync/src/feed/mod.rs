//! Paginated feed views
//!
//! Each logical [`View`] has one [`FeedCursor`], owned by the
//! [`FeedCursorController`] and changed only through its operations.

mod controller;
mod cursor;

pub use controller::{ArticleSource, FeedCursorController, PageOutcome};
pub use cursor::{FeedCursor, FeedSnapshot, DEFAULT_PAGE_SIZE};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical article list shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    /// Main feed, filterable by category
    #[default]
    Feed,
    /// Full-text search results
    Search,
    /// The user's saved articles
    Saved,
    /// Articles from followed topics and outlets
    Personalized,
}

impl View {
    /// All views, in display order
    pub const ALL: [View; 4] = [View::Feed, View::Search, View::Saved, View::Personalized];

    /// Whether the server pages this view
    pub fn is_paginated(self) -> bool {
        matches!(self, View::Feed | View::Search)
    }

    /// Whether the view is only available to signed-in users
    pub fn requires_auth(self) -> bool {
        matches!(self, View::Saved | View::Personalized)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            View::Feed => "feed",
            View::Search => "search",
            View::Saved => "saved",
            View::Personalized => "personalized",
        };
        f.write_str(name)
    }
}
