//! Derived price metrics.
//!
//! Everything here is a pure function of a [`PriceSeries`]. Each metric checks
//! its own data requirement and comes back as `None` when the series is too
//! short for it, so one missing figure never hides the others.

use crate::error::{Result, StockError};
use crate::model::PriceSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ta::Next;
use ta::indicators::SimpleMovingAverage;

/// Moving-average windows shown on the dashboard
pub const MA_WINDOWS: [usize; 4] = [5, 20, 60, 120];

/// Trading days per year used to annualize volatility
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Default number of trailing returns behind the up/down probability
pub const DEFAULT_PROBABILITY_LOOKBACK: usize = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingAverage {
    pub window: usize,
    /// One value per bar, aligned with the series dates
    pub values: Vec<f64>,
}

impl MovingAverage {
    pub fn label(&self) -> String {
        format!("MA{}", self.window)
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    fn between(previous: f64, current: f64) -> Self {
        if current > previous {
            Self::Up
        } else if current < previous {
            Self::Down
        } else {
            Self::Flat
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            Self::Up => "▲",
            Self::Down => "▼",
            Self::Flat => "—",
        }
    }
}

/// Last close against the first close of the window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
    pub last_close: f64,
    pub change: f64,
    pub trend: Trend,
}

/// Intraday extremes over the window (High/Low columns, not closes)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceExtremes {
    pub high: f64,
    pub high_date: NaiveDate,
    pub low: f64,
    pub low_date: NaiveDate,
}

/// Up/down split of recent daily returns, in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalProbability {
    pub up: f64,
    /// `100 - up`: flat days fall on this side
    pub down: f64,
    pub sample_size: usize,
}

/// Ordering of the moving averages on the last bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaAlignment {
    /// MA5 > MA20 > MA60 > MA120
    Bullish,
    /// MA5 < MA20 < MA60 < MA120
    Bearish,
    Mixed,
}

impl MaAlignment {
    pub fn describe(self) -> &'static str {
        match self {
            Self::Bullish => "Bullish alignment (MA5 > MA20 > MA60 > MA120): uptrend dominant",
            Self::Bearish => "Bearish alignment (MA5 < MA20 < MA60 < MA120): downtrend dominant",
            Self::Mixed => "Mixed alignment: no clear trend ordering",
        }
    }
}

/// Last-day price move read together with the last-day volume move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSignal {
    pub price: Trend,
    pub volume: Trend,
}

impl VolumeSignal {
    pub fn case(self) -> String {
        let price = match self.price {
            Trend::Up => "price up",
            Trend::Down => "price down",
            Trend::Flat => "price flat",
        };
        let volume = match self.volume {
            Trend::Up => "volume rising",
            Trend::Down => "volume falling",
            Trend::Flat => "volume flat",
        };
        format!("{price} + {volume}")
    }

    pub fn reading(self) -> &'static str {
        match (self.price, self.volume) {
            (Trend::Up, Trend::Up) => {
                "The advance has conviction behind it; read as a strengthening trend."
            }
            (Trend::Up, Trend::Down) => "A weak advance; keep a short-term pullback in mind.",
            (Trend::Down, Trend::Up) => {
                "Selling pressure may be building; read as a strengthening decline."
            }
            (Trend::Down, Trend::Down) => "The decline is losing force; a base may be forming.",
            _ => "Price and volume give no clear direction; keep watching.",
        }
    }
}

/// Every figure the overview and indicator views show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Percent change from first to last close
    pub period_return: Option<f64>,
    pub high_close: Option<f64>,
    pub low_close: Option<f64>,
    /// Worst close-to-running-peak decline in percent (≤ 0)
    pub max_drawdown: Option<f64>,
    /// Annualized standard deviation of daily returns in percent
    pub volatility: Option<f64>,
    pub moving_averages: Vec<MovingAverage>,
    pub direction: Option<DirectionalProbability>,
    pub latest: Option<PriceChange>,
    pub extremes: Option<PriceExtremes>,
    pub ma_alignment: Option<MaAlignment>,
    pub volume_signal: Option<VolumeSignal>,
}

impl Metrics {
    pub fn moving_average(&self, window: usize) -> Option<&MovingAverage> {
        self.moving_averages.iter().find(|ma| ma.window == window)
    }
}

/// Compute all metrics with the default probability lookback
pub fn compute_metrics(series: &PriceSeries) -> Metrics {
    compute_metrics_with(series, DEFAULT_PROBABILITY_LOOKBACK)
}

pub fn compute_metrics_with(series: &PriceSeries, probability_lookback: usize) -> Metrics {
    let closes = series.closes();
    let returns = daily_returns(&closes);
    let moving_averages: Vec<MovingAverage> = MA_WINDOWS
        .iter()
        .filter_map(|&window| {
            Some(MovingAverage {
                window,
                values: moving_average(&closes, window).ok()?,
            })
        })
        .collect();

    Metrics {
        period_return: period_return(&closes),
        high_close: closes.iter().copied().reduce(f64::max),
        low_close: closes.iter().copied().reduce(f64::min),
        max_drawdown: max_drawdown(&closes),
        volatility: annualized_volatility(&returns),
        direction: directional_probability(&returns, probability_lookback),
        latest: price_change(&closes),
        extremes: price_extremes(series),
        ma_alignment: ma_alignment(&moving_averages),
        volume_signal: volume_signal(series),
        moving_averages,
    }
}

/// Simple moving average of `closes`, one value per close. The first
/// `window - 1` points average however many closes exist so far.
pub fn moving_average(closes: &[f64], window: usize) -> Result<Vec<f64>> {
    let mut sma = SimpleMovingAverage::new(window)
        .map_err(|e| StockError::IndicatorError(format!("MA{window}: {e}")))?;
    Ok(closes.iter().map(|&close| sma.next(close)).collect())
}

/// Simple daily returns `close[i] / close[i-1] - 1`, dropping any that are not
/// finite (a zero previous close).
pub fn daily_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .map(|w| w[1] / w[0] - 1.0)
        .filter(|r| r.is_finite())
        .collect()
}

pub fn period_return(closes: &[f64]) -> Option<f64> {
    let (first, last) = match closes {
        [first, .., last] => (*first, *last),
        _ => return None,
    };
    if first == 0.0 {
        return None;
    }
    let pct = (last - first) / first * 100.0;
    pct.is_finite().then_some(pct)
}

pub fn max_drawdown(closes: &[f64]) -> Option<f64> {
    if closes.len() < 2 {
        return None;
    }

    let mut peak = f64::NEG_INFINITY;
    let mut worst: Option<f64> = None;
    for &close in closes {
        peak = peak.max(close);
        let dd = (close / peak - 1.0) * 100.0;
        if dd.is_finite() {
            worst = Some(worst.map_or(dd, |w| w.min(dd)));
        }
    }
    worst
}

pub fn annualized_volatility(returns: &[f64]) -> Option<f64> {
    if returns.len() < 2 {
        return None;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt() * 100.0)
}

/// Share of strictly positive returns among the trailing `lookback` returns.
/// The down side is the complement, so flat days count as down.
pub fn directional_probability(returns: &[f64], lookback: usize) -> Option<DirectionalProbability> {
    let recent = &returns[returns.len().saturating_sub(lookback)..];
    if recent.is_empty() {
        return None;
    }

    let positive = recent.iter().filter(|&&r| r > 0.0).count();
    let up = positive as f64 / recent.len() as f64 * 100.0;
    Some(DirectionalProbability {
        up,
        down: 100.0 - up,
        sample_size: recent.len(),
    })
}

fn price_change(closes: &[f64]) -> Option<PriceChange> {
    let first = *closes.first()?;
    let last = *closes.last()?;
    Some(PriceChange {
        last_close: last,
        change: last - first,
        trend: Trend::between(first, last),
    })
}

fn price_extremes(series: &PriceSeries) -> Option<PriceExtremes> {
    let bars = series.bars();
    let first = bars.first()?;
    let mut extremes = PriceExtremes {
        high: first.high,
        high_date: first.date,
        low: first.low,
        low_date: first.date,
    };
    for bar in &bars[1..] {
        if bar.high > extremes.high {
            extremes.high = bar.high;
            extremes.high_date = bar.date;
        }
        if bar.low < extremes.low {
            extremes.low = bar.low;
            extremes.low_date = bar.date;
        }
    }
    Some(extremes)
}

fn ma_alignment(moving_averages: &[MovingAverage]) -> Option<MaAlignment> {
    let last: Vec<f64> = moving_averages
        .iter()
        .map(MovingAverage::last)
        .collect::<Option<_>>()?;

    if last.windows(2).all(|w| w[0] > w[1]) {
        Some(MaAlignment::Bullish)
    } else if last.windows(2).all(|w| w[0] < w[1]) {
        Some(MaAlignment::Bearish)
    } else {
        Some(MaAlignment::Mixed)
    }
}

fn volume_signal(series: &PriceSeries) -> Option<VolumeSignal> {
    let volume = series.volume()?;
    let bars = series.bars();
    let last = bars.len().checked_sub(1)?;
    let prev = last.saturating_sub(1);

    Some(VolumeSignal {
        price: Trend::between(bars[prev].close, bars[last].close),
        volume: Trend::between(volume[prev] as f64, volume[last] as f64),
    })
}
