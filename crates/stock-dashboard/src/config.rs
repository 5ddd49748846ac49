//! Configuration for dashboard operations

use crate::error::{Result, StockError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for dashboard operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// KIND listing download (HTML table, EUC-KR)
    pub listing_url: String,

    /// How long a loaded company directory is reused
    pub listing_ttl: Duration,

    /// Yahoo Finance ticker suffixes tried in order (KOSPI, then KOSDAQ)
    pub price_suffixes: Vec<String>,

    /// Timeout applied to listing, price and filing calls
    pub request_timeout: Duration,

    /// Timeout applied to news searches
    pub news_timeout: Duration,

    /// Google News RSS search endpoint
    pub news_url: String,

    /// `hl`, `gl` and `ceid` query parameters for the news search
    pub news_locale: NewsLocale,

    /// Number of news items returned when the caller does not say
    pub news_limit: usize,

    /// OpenDART API key; filings are disabled without it
    pub dart_api_key: Option<String>,

    /// Requests per minute allowed against OpenDART
    pub dart_rate_limit: u32,

    /// Trailing daily returns used for the up/down probability
    pub probability_lookback: usize,

    /// Trailing common points scanned for the MA5/MA20 crossover
    pub crossover_lookback: usize,

    /// User agent sent to the HTTP providers
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsLocale {
    pub language: String,
    pub country: String,
    pub edition: String,
}

impl Default for NewsLocale {
    fn default() -> Self {
        Self {
            language: "ko".to_string(),
            country: "KR".to_string(),
            edition: "KR:ko".to_string(),
        }
    }
}

/// Smallest and largest news page sizes
pub const NEWS_LIMIT_RANGE: (usize, usize) = (5, 30);

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            listing_url:
                "http://kind.krx.co.kr/corpgeneral/corpList.do?method=download&searchType=13"
                    .to_string(),
            listing_ttl: Duration::from_secs(24 * 3600), // 1 day
            price_suffixes: vec!["KS".to_string(), "KQ".to_string()],
            request_timeout: Duration::from_secs(30),
            news_timeout: Duration::from_secs(10),
            news_url: "https://news.google.com/rss/search".to_string(),
            news_locale: NewsLocale::default(),
            news_limit: 10,
            dart_api_key: None,
            dart_rate_limit: 600,
            probability_lookback: 60,
            crossover_lookback: 90,
            user_agent: concat!("stock-dashboard/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl DashboardConfig {
    /// Create a new configuration builder
    pub fn builder() -> DashboardConfigBuilder {
        DashboardConfigBuilder::default()
    }

    /// Load the OpenDART API key from environment
    pub fn with_env_api_key(mut self) -> Self {
        if let Some(key) = read_env("DART_API_KEY") {
            self.dart_api_key = Some(key);
        }
        self
    }

    /// Apply `DASHBOARD_*` environment overrides
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(url) = read_env("DASHBOARD_LISTING_URL") {
            self.listing_url = url;
        }
        if let Some(secs) = read_env("DASHBOARD_LISTING_TTL_SECS") {
            self.listing_ttl = Duration::from_secs(parse_env_number(
                "DASHBOARD_LISTING_TTL_SECS",
                &secs,
            )?);
        }
        if let Some(secs) = read_env("DASHBOARD_REQUEST_TIMEOUT_SECS") {
            self.request_timeout =
                Duration::from_secs(parse_env_number("DASHBOARD_REQUEST_TIMEOUT_SECS", &secs)?);
        }
        if let Some(url) = read_env("DASHBOARD_NEWS_URL") {
            self.news_url = url;
        }
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.price_suffixes.is_empty() {
            return Err(StockError::ConfigError(
                "at least one price suffix is required".to_string(),
            ));
        }

        if self.request_timeout.is_zero() || self.news_timeout.is_zero() {
            return Err(StockError::ConfigError(
                "timeouts must be greater than 0".to_string(),
            ));
        }

        if self.probability_lookback == 0 || self.crossover_lookback == 0 {
            return Err(StockError::ConfigError(
                "lookback windows must be greater than 0".to_string(),
            ));
        }

        if self.dart_rate_limit == 0 {
            return Err(StockError::ConfigError(
                "dart_rate_limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Clamp a requested news page size into the supported range
    pub fn news_limit_for(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.news_limit)
            .clamp(NEWS_LIMIT_RANGE.0, NEWS_LIMIT_RANGE.1)
    }

    pub fn filings_enabled(&self) -> bool {
        self.dart_api_key.is_some()
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env_number(name: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| StockError::ConfigError(format!("{name} must be a number, got '{value}'")))
}

/// Builder for DashboardConfig
#[derive(Debug, Default)]
pub struct DashboardConfigBuilder {
    listing_url: Option<String>,
    listing_ttl: Option<Duration>,
    price_suffixes: Option<Vec<String>>,
    request_timeout: Option<Duration>,
    news_timeout: Option<Duration>,
    news_url: Option<String>,
    news_limit: Option<usize>,
    dart_api_key: Option<String>,
    probability_lookback: Option<usize>,
    crossover_lookback: Option<usize>,
}

impl DashboardConfigBuilder {
    pub fn listing_url(mut self, url: impl Into<String>) -> Self {
        self.listing_url = Some(url.into());
        self
    }

    pub fn listing_ttl(mut self, duration: Duration) -> Self {
        self.listing_ttl = Some(duration);
        self
    }

    pub fn price_suffixes(mut self, suffixes: Vec<String>) -> Self {
        self.price_suffixes = Some(suffixes);
        self
    }

    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    pub fn news_timeout(mut self, duration: Duration) -> Self {
        self.news_timeout = Some(duration);
        self
    }

    pub fn news_url(mut self, url: impl Into<String>) -> Self {
        self.news_url = Some(url.into());
        self
    }

    pub fn news_limit(mut self, limit: usize) -> Self {
        self.news_limit = Some(limit);
        self
    }

    pub fn dart_api_key(mut self, key: impl Into<String>) -> Self {
        self.dart_api_key = Some(key.into());
        self
    }

    pub fn probability_lookback(mut self, n: usize) -> Self {
        self.probability_lookback = Some(n);
        self
    }

    pub fn crossover_lookback(mut self, n: usize) -> Self {
        self.crossover_lookback = Some(n);
        self
    }

    /// Load the OpenDART API key from environment
    pub fn with_env_api_key(mut self) -> Self {
        if let Some(key) = read_env("DART_API_KEY") {
            self.dart_api_key = Some(key);
        }
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<DashboardConfig> {
        let defaults = DashboardConfig::default();

        let config = DashboardConfig {
            listing_url: self.listing_url.unwrap_or(defaults.listing_url),
            listing_ttl: self.listing_ttl.unwrap_or(defaults.listing_ttl),
            price_suffixes: self.price_suffixes.unwrap_or(defaults.price_suffixes),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            news_timeout: self.news_timeout.unwrap_or(defaults.news_timeout),
            news_url: self.news_url.unwrap_or(defaults.news_url),
            news_locale: defaults.news_locale,
            news_limit: self.news_limit.unwrap_or(defaults.news_limit),
            dart_api_key: self.dart_api_key,
            dart_rate_limit: defaults.dart_rate_limit,
            probability_lookback: self
                .probability_lookback
                .unwrap_or(defaults.probability_lookback),
            crossover_lookback: self
                .crossover_lookback
                .unwrap_or(defaults.crossover_lookback),
            user_agent: defaults.user_agent,
        };

        config.validate()?;
        Ok(config)
    }
}
