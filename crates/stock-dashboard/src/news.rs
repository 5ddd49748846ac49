//! News items for the selected company

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    /// Publication time as the feed wrote it
    pub published: String,
    pub source: Option<String>,
}

impl NewsItem {
    /// `published` read as an RFC 2822 timestamp
    pub fn published_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc2822(self.published.trim()).ok()
    }
}

/// Newest first. Items without a readable date go last, in feed order.
pub fn sort_newest_first(items: &mut [NewsItem]) {
    items.sort_by_key(|item| Reverse(item.published_at()));
}

/// Result of a news search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsView {
    pub query: String,
    pub items: Vec<NewsItem>,
}

impl NewsView {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
