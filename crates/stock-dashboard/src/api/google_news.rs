//! Google News RSS search client

use crate::config::{DashboardConfig, NewsLocale};
use crate::error::{Result, StockError};
use crate::news::{NewsItem, sort_newest_first};
use crate::providers::NewsProvider;
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use url::Url;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const PROVIDER: &str = "Google News";
const REQUESTS_PER_MINUTE: u32 = 60;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(rename = "pubDate", default)]
    pub_date: String,
    #[serde(default)]
    source: Option<RssSource>,
}

#[derive(Debug, Deserialize)]
struct RssSource {
    #[serde(rename = "$text", default)]
    name: String,
}

/// Google News RSS client
pub struct GoogleNewsClient {
    client: Client,
    url: String,
    locale: NewsLocale,
    rate_limiter: SharedRateLimiter,
}

impl GoogleNewsClient {
    pub fn new(config: &DashboardConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.news_timeout)
            .build()?;

        let quota =
            Quota::per_minute(NonZeroU32::new(REQUESTS_PER_MINUTE).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            client,
            url: config.news_url.clone(),
            locale: config.news_locale.clone(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    fn search_url(&self, query: &str) -> Result<Url> {
        Url::parse_with_params(
            &self.url,
            &[
                ("q", query),
                ("hl", self.locale.language.as_str()),
                ("gl", self.locale.country.as_str()),
                ("ceid", self.locale.edition.as_str()),
            ],
        )
        .map_err(|e| StockError::ConfigError(format!("bad news URL '{}': {e}", self.url)))
    }
}

#[async_trait]
impl NewsProvider for GoogleNewsClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<NewsItem>> {
        self.rate_limiter.until_ready().await;

        let url = self.search_url(query)?;
        tracing::info!("Searching news for '{}'", query);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(StockError::api(PROVIDER, format!("HTTP {}", response.status())));
        }

        let mut items = parse_feed(&response.text().await?)?;
        sort_newest_first(&mut items);
        items.truncate(limit);
        Ok(items)
    }
}

/// Read the items of an RSS 2.0 feed, in feed order
pub fn parse_feed(xml: &str) -> Result<Vec<NewsItem>> {
    let rss: Rss = quick_xml::de::from_str(xml)?;
    Ok(rss
        .channel
        .items
        .into_iter()
        .map(|item| NewsItem {
            title: item.title.trim().to_string(),
            link: item.link.trim().to_string(),
            published: item.pub_date.trim().to_string(),
            source: item
                .source
                .map(|s| s.name.trim().to_string())
                .filter(|s| !s.is_empty()),
        })
        .collect())
}
