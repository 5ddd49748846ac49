//! Golden / dead cross detection between two moving averages

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// Default number of trailing common points scanned
pub const DEFAULT_LOOKBACK: usize = 60;

/// Fewer common points than this never produce a crossover
const MIN_COMMON_POINTS: usize = 3;

/// A dated value that may be missing
pub type DatedValue = (NaiveDate, Option<f64>);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossoverDirection {
    /// Short average moved above the long one
    Golden,
    /// Short average moved below the long one
    Dead,
}

impl fmt::Display for CrossoverDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Golden => write!(f, "Golden cross"),
            Self::Dead => write!(f, "Dead cross"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossoverEvent {
    pub direction: CrossoverDirection,
    pub date: NaiveDate,
}

/// Pair a value column with its dates
pub fn dated(dates: impl IntoIterator<Item = NaiveDate>, values: &[f64]) -> Vec<DatedValue> {
    dates
        .into_iter()
        .zip(values.iter().map(|v| Some(*v)))
        .collect()
}

/// Find the most recent crossing of `short` over `long`.
///
/// Missing values are dropped and only dates present in both series are
/// compared. Within the trailing `lookback` common points, a crossing is a
/// change of sign of `short - long` between two adjacent points where neither
/// side is exactly zero. The first point of the window has no predecessor.
pub fn last_crossover(
    short: &[DatedValue],
    long: &[DatedValue],
    lookback: usize,
) -> Option<CrossoverEvent> {
    let long_by_date: HashMap<NaiveDate, f64> = long
        .iter()
        .filter_map(|(date, value)| value.map(|v| (*date, v)))
        .collect();

    let common: Vec<(NaiveDate, f64, f64)> = short
        .iter()
        .filter_map(|(date, value)| {
            let s = (*value)?;
            let l = *long_by_date.get(date)?;
            Some((*date, s, l))
        })
        .collect();

    if common.len() < MIN_COMMON_POINTS {
        return None;
    }

    let window = &common[common.len().saturating_sub(lookback)..];
    let signs: Vec<Ordering> = window
        .iter()
        .map(|(_, s, l)| s.partial_cmp(l).unwrap_or(Ordering::Equal))
        .collect();

    (1..window.len()).rev().find_map(|i| {
        let (prev, cur) = (signs[i - 1], signs[i]);
        if prev == cur || prev == Ordering::Equal || cur == Ordering::Equal {
            return None;
        }
        let direction = if cur == Ordering::Greater {
            CrossoverDirection::Golden
        } else {
            CrossoverDirection::Dead
        };
        Some(CrossoverEvent {
            direction,
            date: window[i].0,
        })
    })
}
