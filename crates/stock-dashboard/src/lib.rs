//! KRX stock dashboard core
//!
//! Look a Korea Exchange company up by name or 6-digit code, fetch its daily
//! price history for a date range, and derive a fixed set of analytics from
//! it. It includes:
//!
//! - Symbol resolution against the KIND company listing (cached with a TTL)
//! - Daily OHLCV history from Yahoo Finance (`.KS` / `.KQ` tickers)
//! - Period return, drawdown, volatility, moving averages and up/down odds
//! - MA5/MA20 golden and dead cross detection
//! - Financial statements from OpenDART (when `DART_API_KEY` is set)
//! - Google News search for the selected company
//! - CSV export and import of the session series
//!
//! # Architecture
//!
//! Every external source sits behind a trait in [`providers`]; the
//! [`Dashboard`] wires them together and keeps the last successful query in
//! an explicit [`Session`]. Metrics and crossover detection are pure
//! functions of a [`PriceSeries`].
//!
//! # Example
//!
//! ```rust,ignore
//! use stock_dashboard::{Dashboard, DashboardConfig, DateRange, Session};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = DashboardConfig::default().with_env_api_key();
//!     let dashboard = Dashboard::from_config(config)?;
//!
//!     let mut session = Session::new();
//!     dashboard
//!         .query(&mut session, "삼성전자", DateRange::year_to_date())
//!         .await?;
//!
//!     let overview = dashboard.overview(&session)?;
//!     println!("{}", stock_dashboard::formatter::format_overview(&overview));
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod crossover;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod filings;
pub mod formatter;
pub mod metrics;
pub mod model;
pub mod news;
pub mod providers;
pub mod resolver;
pub mod session;

// Re-export main types for convenience
pub use cache::DirectoryCache;
pub use config::DashboardConfig;
pub use crossover::{CrossoverDirection, CrossoverEvent, last_crossover};
pub use dashboard::{Dashboard, IndicatorView, Overview, QueryOutcome};
pub use error::{ErrorKind, Result, StockError};
pub use filings::{FilingRequest, FilingsView, FsDivision, ReportPeriod};
pub use metrics::{Metrics, compute_metrics};
pub use model::{CompanyDirectory, DailyBar, DateRange, PriceSeries, SecurityCode, parse_date};
pub use news::{NewsItem, NewsView};
pub use providers::{FilingProvider, ListingProvider, NewsProvider, PriceProvider};
pub use resolver::{SymbolResolver, resolve};
pub use session::{Session, Snapshot};
