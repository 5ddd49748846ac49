//! Financial statement types and the statement view built from them.
//!
//! Statements come from the disclosure system as flat account lines. A view
//! picks one statement division (consolidated or separate), falls back to the
//! separate statements when the consolidated ones are missing, and pulls a
//! handful of headline accounts into a summary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Headline accounts shown in the summary, in display order
pub const KEY_ACCOUNTS: [&str; 6] = [
    "매출액",
    "영업이익",
    "당기순이익",
    "자산총계",
    "부채총계",
    "자본총계",
];

/// A company as registered with the disclosure system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpInfo {
    pub corp_code: String,
    pub corp_name: String,
    /// Listed companies only
    pub stock_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportPeriod {
    Annual,
    HalfYear,
    FirstQuarter,
    ThirdQuarter,
}

impl ReportPeriod {
    pub const ALL: [ReportPeriod; 4] = [
        Self::Annual,
        Self::HalfYear,
        Self::FirstQuarter,
        Self::ThirdQuarter,
    ];

    /// Report code used by the API
    pub fn code(self) -> &'static str {
        match self {
            Self::Annual => "11011",
            Self::HalfYear => "11012",
            Self::FirstQuarter => "11013",
            Self::ThirdQuarter => "11014",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.code() == code.trim())
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Annual => "Annual report",
            Self::HalfYear => "Half-year report",
            Self::FirstQuarter => "Q1 report",
            Self::ThirdQuarter => "Q3 report",
        }
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.label())
    }
}

/// Consolidated (`CFS`) or separate (`OFS`) statements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FsDivision {
    Consolidated,
    Separate,
}

impl FsDivision {
    pub fn code(self) -> &'static str {
        match self {
            Self::Consolidated => "CFS",
            Self::Separate => "OFS",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "CFS" => Some(Self::Consolidated),
            "OFS" => Some(Self::Separate),
            _ => None,
        }
    }
}

impl fmt::Display for FsDivision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Consolidated => write!(f, "CFS (consolidated)"),
            Self::Separate => write!(f, "OFS (separate)"),
        }
    }
}

/// One account line of a statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    /// Absent when the source does not split divisions
    pub division: Option<FsDivision>,
    /// `BS`, `IS`, ...
    pub statement_code: String,
    pub statement_name: String,
    pub account: String,
    pub current: Option<i64>,
    pub previous: Option<i64>,
    pub before_previous: Option<i64>,
    pub currency: Option<String>,
}

/// Read an amount as published: thousands separators, blanks and `-` are
/// common. Anything unreadable is `None`.
pub fn parse_amount(raw: &str) -> Option<i64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "-" || cleaned.eq_ignore_ascii_case("none") {
        return None;
    }

    cleaned.parse::<i64>().ok().or_else(|| {
        cleaned
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v.round() as i64)
    })
}

/// Year, report and division to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingRequest {
    pub year: i32,
    pub period: ReportPeriod,
    pub division: FsDivision,
}

impl FilingRequest {
    /// Last year's annual consolidated statements
    pub fn default_for(current_year: i32) -> Self {
        Self {
            year: current_year - 1,
            period: ReportPeriod::Annual,
            division: FsDivision::Consolidated,
        }
    }

    /// The current year and the three before it
    pub fn available_years(current_year: i32) -> [i32; 4] {
        [
            current_year,
            current_year - 1,
            current_year - 2,
            current_year - 3,
        ]
    }
}

/// Lines of one division, after any fallback
#[derive(Debug, Clone, PartialEq)]
pub struct DivisionSelection {
    pub lines: Vec<StatementLine>,
    /// Division actually shown; `None` when the lines carry no division
    pub shown: Option<FsDivision>,
    pub fell_back: bool,
}

/// Keep the requested division, or the separate statements when the
/// requested one has no lines.
pub fn select_division(lines: Vec<StatementLine>, requested: FsDivision) -> DivisionSelection {
    if lines.iter().all(|l| l.division.is_none()) {
        return DivisionSelection {
            lines,
            shown: None,
            fell_back: false,
        };
    }

    let (wanted, rest): (Vec<_>, Vec<_>) = lines
        .into_iter()
        .partition(|l| l.division == Some(requested));
    if !wanted.is_empty() {
        return DivisionSelection {
            lines: wanted,
            shown: Some(requested),
            fell_back: false,
        };
    }

    tracing::info!("No {} statements, showing separate ones", requested.code());
    DivisionSelection {
        lines: rest
            .into_iter()
            .filter(|l| l.division == Some(FsDivision::Separate))
            .collect(),
        shown: Some(FsDivision::Separate),
        fell_back: true,
    }
}

/// First current-period amount of each headline account, in line order
pub fn key_summary(lines: &[StatementLine]) -> Vec<(String, i64)> {
    let mut summary: Vec<(String, i64)> = Vec::new();
    for line in lines {
        let Some(amount) = line.current else { continue };
        if KEY_ACCOUNTS.contains(&line.account.as_str())
            && !summary.iter().any(|(account, _)| *account == line.account)
        {
            summary.push((line.account.clone(), amount));
        }
    }
    summary
}

/// Statements ready for display
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialStatements {
    pub corp: CorpInfo,
    pub request: FilingRequest,
    pub selection: DivisionSelection,
    pub summary: Vec<(String, i64)>,
}

impl FinancialStatements {
    pub fn new(corp: CorpInfo, request: FilingRequest, lines: Vec<StatementLine>) -> Self {
        let selection = select_division(lines, request.division);
        let summary = key_summary(&selection.lines);
        Self {
            corp,
            request,
            selection,
            summary,
        }
    }
}

/// What the filings panel shows
#[derive(Debug, Clone, PartialEq)]
pub enum FilingsView {
    /// No API key configured
    Disabled,
    /// The disclosure system has no company by this name
    CorpNotFound(String),
    /// The company exists but has no statements for the request
    NoData {
        corp: CorpInfo,
        request: FilingRequest,
    },
    Statements(FinancialStatements),
}

impl FilingsView {
    /// Statements for `request`, or [`FilingsView::NoData`] when no line is
    /// left to show once the division has been picked
    pub fn from_lines(corp: CorpInfo, request: FilingRequest, lines: Vec<StatementLine>) -> Self {
        let statements = FinancialStatements::new(corp, request, lines);
        if statements.selection.lines.is_empty() {
            return Self::NoData {
                corp: statements.corp,
                request: statements.request,
            };
        }
        Self::Statements(statements)
    }
}
