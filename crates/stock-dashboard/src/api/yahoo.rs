//! Yahoo Finance daily price client for KRX codes
//!
//! KOSPI codes trade as `<code>.KS` and KOSDAQ codes as `<code>.KQ`; the
//! configured suffixes are tried in order. Bar dates are taken in KST.

use crate::config::DashboardConfig;
use crate::error::{Result, StockError};
use crate::model::{DailyBar, DateRange, PriceSeries, SecurityCode};
use crate::providers::PriceProvider;
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeDelta};
use time::OffsetDateTime;
use yahoo_finance_api as yahoo;

const PROVIDER: &str = "Yahoo Finance";

/// Korea Standard Time offset from UTC
const KST_OFFSET_HOURS: i64 = 9;

/// One daily quote as returned by the API, before validation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawQuote {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl From<&yahoo::Quote> for RawQuote {
    fn from(q: &yahoo::Quote) -> Self {
        Self {
            timestamp: i64::try_from(q.timestamp).unwrap_or_default(),
            open: q.open,
            high: q.high,
            low: q.low,
            close: q.close,
            volume: q.volume,
        }
    }
}

/// Yahoo Finance price client
pub struct YahooPriceClient {
    connector: yahoo::YahooConnector,
    suffixes: Vec<String>,
}

impl YahooPriceClient {
    pub fn new(config: &DashboardConfig) -> Result<Self> {
        let connector = yahoo::YahooConnector::new()
            .map_err(|e| StockError::api(PROVIDER, e.to_string()))?;

        Ok(Self {
            connector,
            suffixes: config.price_suffixes.clone(),
        })
    }

    /// `005930` + `KS` → `005930.KS`
    pub fn ticker(code: &SecurityCode, suffix: &str) -> String {
        format!("{code}.{suffix}")
    }

    async fn fetch_ticker(&self, ticker: &str, range: &DateRange) -> Result<Vec<RawQuote>> {
        let (start, end) = request_bounds(range)?;
        let response = self
            .connector
            .get_quote_history(ticker, start, end)
            .await
            .map_err(|e| StockError::api(PROVIDER, format!("{ticker}: {e}")))?;

        match response.quotes() {
            Ok(quotes) => Ok(quotes.iter().map(RawQuote::from).collect()),
            Err(e) => {
                tracing::warn!("{} returned no usable quotes: {}", ticker, e);
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl PriceProvider for YahooPriceClient {
    async fn fetch_prices(&self, code: &SecurityCode, range: &DateRange) -> Result<PriceSeries> {
        let mut last_error = None;
        let mut answered = false;

        for suffix in &self.suffixes {
            let ticker = Self::ticker(code, suffix);
            tracing::info!("Fetching {} for {}", ticker, range);

            match self.fetch_ticker(&ticker, range).await {
                Ok(quotes) => {
                    answered = true;
                    let series = quotes_to_series(&quotes, range)?;
                    if !series.is_empty() {
                        tracing::info!("{}: {} daily bars", ticker, series.len());
                        return Ok(series);
                    }
                }
                Err(e) => {
                    tracing::debug!("{} failed: {}", ticker, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !answered => Err(e),
            _ => Ok(PriceSeries::default()),
        }
    }
}

/// Unix bounds covering `range` in KST, end day inclusive
fn request_bounds(range: &DateRange) -> Result<(OffsetDateTime, OffsetDateTime)> {
    let kst_midnight = |date: NaiveDate| {
        date.and_time(NaiveTime::MIN).and_utc().timestamp() - KST_OFFSET_HOURS * 3600
    };
    let end = range
        .end()
        .checked_add_days(Days::new(1))
        .unwrap_or(range.end());

    let to_odt = |ts: i64| {
        OffsetDateTime::from_unix_timestamp(ts)
            .map_err(|e| StockError::InvalidDateRange(format!("timestamp {ts}: {e}")))
    };
    Ok((to_odt(kst_midnight(range.start()))?, to_odt(kst_midnight(end))?))
}

/// Trading date of a quote timestamp, in KST
pub fn kst_date(timestamp: i64) -> Option<NaiveDate> {
    let utc = DateTime::from_timestamp(timestamp, 0)?;
    Some((utc + TimeDelta::hours(KST_OFFSET_HOURS)).date_naive())
}

/// Turn raw quotes into a validated series restricted to `range`.
///
/// Quotes without a positive finite close (suspended days) are dropped.
pub fn quotes_to_series(quotes: &[RawQuote], range: &DateRange) -> Result<PriceSeries> {
    let rows = quotes
        .iter()
        .filter_map(|q| {
            let date = kst_date(q.timestamp)?;
            if date < range.start() || date > range.end() {
                return None;
            }
            let prices = [q.open, q.high, q.low, q.close];
            if q.close <= 0.0 || !prices.iter().all(|p| p.is_finite()) {
                tracing::debug!("Dropping quote on {} (close {})", date, q.close);
                return None;
            }
            let bar = DailyBar {
                date,
                open: q.open,
                high: q.high,
                low: q.low,
                close: q.close,
            };
            Some((bar, Some(q.volume)))
        })
        .collect();

    PriceSeries::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::parse_date;

    fn raw(timestamp: i64, close: f64) -> RawQuote {
        RawQuote {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000,
        }
    }

    fn range(start: &str, end: &str) -> DateRange {
        DateRange::new(parse_date(start).unwrap(), parse_date(end).unwrap()).unwrap()
    }

    #[test]
    fn test_ticker() {
        let code = SecurityCode::parse("005930").unwrap();
        assert_eq!(YahooPriceClient::ticker(&code, "KS"), "005930.KS");
    }

    #[test]
    fn test_kst_date() {
        // 2024-01-02 00:00 UTC is 09:00 KST the same day
        assert_eq!(kst_date(1_704_153_600), Some(parse_date("20240102").unwrap()));
        // 2024-01-01 15:00 UTC is already 2024-01-02 in Seoul
        assert_eq!(kst_date(1_704_121_200), Some(parse_date("20240102").unwrap()));
    }

    #[test]
    fn test_request_bounds() {
        let (start, end) = request_bounds(&range("20240102", "20240105")).unwrap();
        // 2024-01-02 00:00 KST
        assert_eq!(start.unix_timestamp(), 1_704_121_200);
        // 2024-01-06 00:00 KST
        assert_eq!(end.unix_timestamp(), 1_704_466_800);
    }

    #[test]
    fn test_quotes_to_series() {
        let quotes = vec![
            raw(1_704_412_800, 103.0), // 2024-01-05
            raw(1_704_153_600, 100.0), // 2024-01-02
            raw(1_704_240_000, 0.0),   // 2024-01-03, suspended
            raw(1_704_326_400, f64::NAN),
            raw(1_704_672_000, 110.0), // 2024-01-08, outside range
        ];
        let series = quotes_to_series(&quotes, &range("20240102", "20240105")).unwrap();

        assert_eq!(series.closes(), vec![100.0, 103.0]);
        assert_eq!(series.volume(), Some(&[1_000, 1_000][..]));
    }

    #[test]
    fn test_quotes_to_series_empty() {
        let series = quotes_to_series(&[], &range("20240102", "20240105")).unwrap();
        assert!(series.is_empty());
        assert!(!series.has_volume());
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_fetch_prices() {
        let client = YahooPriceClient::new(&DashboardConfig::default()).unwrap();
        let code = SecurityCode::parse("005930").unwrap();
        let series = client
            .fetch_prices(&code, &range("20240102", "20240131"))
            .await
            .unwrap();
        assert!(series.len() > 15);
        assert!(series.has_volume());
    }
}
