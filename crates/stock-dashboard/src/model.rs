//! Core data types: security codes, the company directory, date ranges and
//! daily price series.

use crate::error::{Result, StockError};
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of a KRX security code
pub const CODE_WIDTH: usize = 6;

// ── Security code ─────────────────────────────────────────────────────────────

/// Six ASCII digits, zero padded (e.g. `005930`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SecurityCode(String);

impl SecurityCode {
    /// Accept `raw` only if it already has the canonical shape
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() == CODE_WIDTH && raw.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    /// Left-pad a listing code with zeros before validating it.
    /// "5930" → "005930"
    pub fn from_listing(raw: &str) -> Option<Self> {
        Self::parse(&format!("{:0>width$}", raw.trim(), width = CODE_WIDTH))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecurityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SecurityCode {
    type Error = StockError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
            .ok_or_else(|| StockError::Other(format!("invalid security code '{value}'")))
    }
}

impl From<SecurityCode> for String {
    fn from(code: SecurityCode) -> Self {
        code.0
    }
}

// ── Company directory ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub name: String,
    pub code: SecurityCode,
}

/// Listed companies in source order. Names may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyDirectory {
    listings: Vec<Listing>,
}

impl CompanyDirectory {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self { listings }
    }

    /// First listing whose name equals `name` exactly
    pub fn find(&self, name: &str) -> Option<&Listing> {
        self.listings.iter().find(|l| l.name == name)
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

impl FromIterator<(String, SecurityCode)> for CompanyDirectory {
    fn from_iter<I: IntoIterator<Item = (String, SecurityCode)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(name, code)| Listing { name, code })
                .collect(),
        )
    }
}

// ── Date range ────────────────────────────────────────────────────────────────

/// Inclusive trading-date window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(StockError::InvalidDateRange(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// 1 January of the current year through today
    pub fn year_to_date() -> Self {
        let today = Local::now().date_naive();
        let jan_1 = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
        Self {
            start: jan_1,
            end: today,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Provider form of the bounds: (`YYYYMMDD`, `YYYYMMDD`)
    pub fn compact(&self) -> (String, String) {
        (
            self.start.format("%Y%m%d").to_string(),
            self.end.format("%Y%m%d").to_string(),
        )
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~ {}", self.start, self.end)
    }
}

/// Parse `YYYYMMDD` or `YYYY-MM-DD`
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .map_err(|_| StockError::InvalidDateRange(format!("cannot read date '{s}'")))
}

// ── Price series ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Daily OHLC bars in ascending date order with an optional volume column.
///
/// Invariants, checked by [`PriceSeries::new`]:
/// - dates strictly increasing (so also unique)
/// - all prices finite
/// - `volume`, when present, has one entry per bar
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    bars: Vec<DailyBar>,
    volume: Option<Vec<u64>>,
}

impl PriceSeries {
    pub fn new(bars: Vec<DailyBar>, volume: Option<Vec<u64>>) -> Result<Self> {
        if let Some(pair) = bars.windows(2).find(|w| w[0].date >= w[1].date) {
            return Err(StockError::InvalidSeries(format!(
                "dates not strictly increasing at {} → {}",
                pair[0].date, pair[1].date
            )));
        }

        if let Some(bar) = bars.iter().find(|b| {
            ![b.open, b.high, b.low, b.close]
                .iter()
                .all(|v| v.is_finite())
        }) {
            return Err(StockError::InvalidSeries(format!(
                "non-finite price on {}",
                bar.date
            )));
        }

        if let Some(v) = &volume {
            if v.len() != bars.len() {
                return Err(StockError::InvalidSeries(format!(
                    "{} volume entries for {} bars",
                    v.len(),
                    bars.len()
                )));
            }
        }

        Ok(Self { bars, volume })
    }

    /// Build from rows that may be unsorted and carry per-row volume.
    ///
    /// Rows are sorted by date; later duplicates of a date replace earlier
    /// ones. The volume column is kept only if every row has one.
    pub fn from_rows(mut rows: Vec<(DailyBar, Option<u64>)>) -> Result<Self> {
        rows.sort_by_key(|(bar, _)| bar.date);
        let mut deduped: Vec<(DailyBar, Option<u64>)> = Vec::with_capacity(rows.len());
        for row in rows {
            if deduped.last().is_some_and(|last| last.0.date == row.0.date) {
                deduped.pop();
            }
            deduped.push(row);
        }

        let volume: Option<Vec<u64>> = if deduped.is_empty() {
            None
        } else {
            deduped.iter().map(|(_, v)| *v).collect()
        };
        let bars = deduped.into_iter().map(|(bar, _)| bar).collect();
        Self::new(bars, volume)
    }

    pub fn bars(&self) -> &[DailyBar] {
        &self.bars
    }

    pub fn volume(&self) -> Option<&[u64]> {
        self.volume.as_deref()
    }

    pub fn has_volume(&self) -> bool {
        self.volume.is_some()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.bars.iter().map(|b| b.date)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&DailyBar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&DailyBar> {
        self.bars.last()
    }
}
