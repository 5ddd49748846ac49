//! Session state for the interactive dashboard

use crate::error::{Result, StockError};
use crate::model::{DateRange, PriceSeries, SecurityCode};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// The last successful query: who, which range, and the fetched series
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// What the user typed, kept for display and as the default news query
    pub label: String,
    pub code: SecurityCode,
    pub range: DateRange,
    pub series: Arc<PriceSeries>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(
        label: impl Into<String>,
        code: SecurityCode,
        range: DateRange,
        series: PriceSeries,
    ) -> Self {
        Self {
            label: label.into(),
            code,
            range,
            series: Arc::new(series),
            fetched_at: Utc::now(),
        }
    }

    /// `삼성전자 (005930)`
    pub fn title(&self) -> String {
        format!("{} ({})", self.label, self.code)
    }
}

/// One user's dashboard session. Holds at most one snapshot.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    snapshot: Option<Snapshot>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            snapshot: None,
            created_at: now,
            last_active: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Swap in a new snapshot, returning the one it replaces
    pub fn replace(&mut self, snapshot: Snapshot) -> Option<Snapshot> {
        self.update_activity();
        tracing::debug!(session = %self.id, "Session now holds {}", snapshot.title());
        self.snapshot.replace(snapshot)
    }

    pub fn current(&self) -> Result<&Snapshot> {
        self.snapshot.as_ref().ok_or(StockError::NoActiveQuery)
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn clear(&mut self) {
        self.update_activity();
        if self.snapshot.take().is_some() {
            tracing::debug!(session = %self.id, "Session cleared");
        }
    }

    pub fn update_activity(&mut self) {
        self.last_active = Utc::now();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{day, series_from_closes};

    fn snapshot(label: &str, code: &str) -> Snapshot {
        Snapshot::new(
            label,
            SecurityCode::parse(code).unwrap(),
            DateRange::new(day(0), day(10)).unwrap(),
            series_from_closes(&[1.0, 2.0]),
        )
    }

    #[test]
    fn test_new_session_is_empty() {
        let session = Session::new();
        assert!(!session.has_snapshot());
        assert!(matches!(session.current(), Err(StockError::NoActiveQuery)));
        assert_ne!(session.id(), Session::new().id());
    }

    #[test]
    fn test_replace_swaps_snapshot() {
        let mut session = Session::new();
        assert!(session.replace(snapshot("삼성전자", "005930")).is_none());

        let previous = session.replace(snapshot("카카오", "035720")).unwrap();
        assert_eq!(previous.code.as_str(), "005930");
        assert_eq!(session.current().unwrap().title(), "카카오 (035720)");
    }

    #[test]
    fn test_clear() {
        let mut session = Session::new();
        session.replace(snapshot("삼성전자", "005930"));
        session.clear();
        assert!(session.current().is_err());
        assert!(session.last_active >= session.created_at);
    }
}
