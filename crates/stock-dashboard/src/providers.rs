//! Provider seams for the external data sources.
//!
//! Each source the dashboard depends on sits behind a trait so the pipeline
//! can run against the HTTP clients in [`crate::api`] or against fixed data
//! in tests.

use crate::error::{Result, StockError};
use crate::filings::{CorpInfo, ReportPeriod, StatementLine};
use crate::model::{CompanyDirectory, DateRange, PriceSeries, SecurityCode};
use crate::news::NewsItem;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Company name → security code table
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ListingProvider: Send + Sync {
    async fn fetch_listing(&self) -> Result<CompanyDirectory>;
}

/// Daily OHLCV history. An empty series means "no trading data in range".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn fetch_prices(&self, code: &SecurityCode, range: &DateRange) -> Result<PriceSeries>;
}

/// Financial statements from the disclosure system
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FilingProvider: Send + Sync {
    /// Look a company up by display name
    async fn find_corp(&self, company: &str) -> Result<Option<CorpInfo>>;

    async fn fetch_statements(
        &self,
        corp_code: &str,
        year: i32,
        period: ReportPeriod,
    ) -> Result<Vec<StatementLine>>;
}

/// Free-text news search
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NewsProvider: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<NewsItem>>;
}

/// Run a provider call under a deadline, mapping expiry to [`StockError::Timeout`]
pub async fn with_timeout<T, F>(provider: &'static str, after: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(after, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("{} timed out after {:?}", provider, after);
            Err(StockError::Timeout { provider, after })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let value = assert_ok!(with_timeout("test", Duration::from_secs(1), async { Ok(7) }).await);
        assert_eq!(value, 7);

        let err = assert_err!(
            with_timeout::<(), _>("test", Duration::from_secs(1), async {
                Err(StockError::api("test", "down"))
            })
            .await
        );
        assert!(matches!(err, StockError::Api { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_expires() {
        let result = with_timeout("slow", Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;

        assert!(matches!(
            result,
            Err(StockError::Timeout { provider: "slow", .. })
        ));
    }
}
