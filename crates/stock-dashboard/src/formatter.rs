//! Terminal rendering of the dashboard views

use crate::dashboard::{IndicatorView, Overview, QueryOutcome};
use crate::error::{ErrorKind, StockError};
use crate::filings::FilingsView;
use crate::metrics::Trend;
use crate::news::NewsView;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};

/// Placeholder for a metric the series cannot support
pub const UNAVAILABLE: &str = "-";

/// Recent rows shown under the indicator summary
const INDICATOR_TAIL_ROWS: usize = 10;

const NO_KEY_ACCOUNTS: &str =
    "Key accounts did not match directly in this report; search the table above.";

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

fn right(text: impl Into<String>) -> Cell {
    Cell::new(text.into()).set_alignment(CellAlignment::Right)
}

/// `1234567.4` → `1,234,567`
pub fn fmt_number(value: f64) -> String {
    let rounded = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3);
    for (i, ch) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0.0 && grouped != "0" {
        format!("-{grouped}")
    } else {
        grouped
    }
}

pub fn fmt_price(value: Option<f64>) -> String {
    value.map_or_else(|| UNAVAILABLE.to_string(), fmt_number)
}

/// Signed percentage with two decimals
pub fn fmt_pct(value: Option<f64>) -> String {
    value.map_or_else(|| UNAVAILABLE.to_string(), |v| format!("{v:+.2}%"))
}

/// Unsigned percentage with one decimal
fn fmt_share(value: Option<f64>) -> String {
    value.map_or_else(|| UNAVAILABLE.to_string(), |v| format!("{v:.1}%"))
}

pub fn format_outcome(outcome: &QueryOutcome) -> String {
    let mut out = String::new();
    for warning in &outcome.warnings {
        out.push_str(&format!("⚠️  {warning}\n"));
    }
    out.push_str(&format!(
        "✅ {}: {} trading days ({})",
        outcome.title, outcome.rows, outcome.range
    ));
    out
}

pub fn format_overview(overview: &Overview) -> String {
    let m = &overview.metrics;
    let mut t = table(&["Metric", "Value"]);

    let latest = m.latest.map_or_else(
        || UNAVAILABLE.to_string(),
        |c| {
            let sign = match c.trend {
                Trend::Up => "+",
                Trend::Down => "-",
                Trend::Flat => "",
            };
            format!(
                "{} ({} {}{})",
                fmt_number(c.last_close),
                c.trend.arrow(),
                sign,
                fmt_number(c.change.abs())
            )
        },
    );

    let rows: Vec<(&str, String)> = vec![
        ("Last close", latest),
        ("Period return", fmt_pct(m.period_return)),
        ("High close", fmt_price(m.high_close)),
        ("Low close", fmt_price(m.low_close)),
        ("Max drawdown", fmt_pct(m.max_drawdown)),
        ("Volatility (annualized)", fmt_share(m.volatility)),
        ("Up probability", fmt_share(m.direction.map(|d| d.up))),
        ("Down probability", fmt_share(m.direction.map(|d| d.down))),
        (
            "Intraday high",
            m.extremes.map_or_else(
                || UNAVAILABLE.to_string(),
                |e| format!("{} on {}", fmt_number(e.high), e.high_date),
            ),
        ),
        (
            "Intraday low",
            m.extremes.map_or_else(
                || UNAVAILABLE.to_string(),
                |e| format!("{} on {}", fmt_number(e.low), e.low_date),
            ),
        ),
    ];
    for (label, value) in rows {
        t.add_row(vec![Cell::new(label), right(value)]);
    }

    let sample = m.direction.map_or(String::new(), |d| {
        format!("\nProbability based on the last {} daily returns.", d.sample_size)
    });

    format!(
        "📊 {} | {} | {} trading days\n{t}{sample}",
        overview.title, overview.range, overview.rows
    )
}

pub fn format_indicators(view: &IndicatorView) -> String {
    let mut out = format!("📈 {} indicators\n", view.title);

    let mut summary = table(&["Average", "Last value"]);
    for ma in &view.moving_averages {
        summary.add_row(vec![Cell::new(ma.label()), right(fmt_price(ma.last()))]);
    }
    out.push_str(&format!("{summary}\n"));

    out.push_str(&match view.crossover {
        Some(event) => format!("Last MA5/MA20 crossover: {} on {}\n", event.direction, event.date),
        None => "No MA5/MA20 crossover in the recent window\n".to_string(),
    });
    if let Some(alignment) = view.alignment {
        out.push_str(&format!("{}\n", alignment.describe()));
    }
    out.push_str(&match view.volume_signal {
        Some(signal) => format!("Volume: {}. {}\n", signal.case(), signal.reading()),
        None => "No volume data for this series\n".to_string(),
    });

    let mut header = vec!["Date".to_string(), "Close".to_string()];
    header.extend(view.moving_averages.iter().map(|ma| ma.label()));
    let mut recent = Table::new();
    recent
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);

    let start = view.dates.len().saturating_sub(INDICATOR_TAIL_ROWS);
    for i in start..view.dates.len() {
        let mut row = vec![
            Cell::new(view.dates[i].to_string()),
            right(fmt_number(view.closes[i])),
        ];
        row.extend(
            view.moving_averages
                .iter()
                .map(|ma| right(fmt_price(ma.values.get(i).copied()))),
        );
        recent.add_row(row);
    }
    out.push_str(&recent.to_string());
    out
}

pub fn format_filings(view: &FilingsView) -> String {
    match view {
        FilingsView::Disabled => {
            "ℹ️  DART_API_KEY is not set, so financial statements are unavailable. \
             Add it to .env (e.g. DART_API_KEY=xxxxxxxx)."
                .to_string()
        }
        FilingsView::CorpNotFound(name) => {
            format!("❌ '{name}' was not found in OpenDART. The exact company name is required.")
        }
        FilingsView::NoData { corp, request } => format!(
            "ℹ️  No statements for {} ({} {}, {})",
            corp.corp_name, request.year, request.period, request.division
        ),
        FilingsView::Statements(statements) => {
            let request = &statements.request;
            let mut out = format!(
                "🧾 {} statements | {} {}\n",
                statements.corp.corp_name, request.year, request.period
            );
            if statements.selection.fell_back {
                out.push_str(&format!(
                    "ℹ️  No {} data, showing OFS (separate) instead\n",
                    request.division.code()
                ));
            }

            let mut lines = table(&[
                "Statement",
                "Account",
                "Current",
                "Previous",
                "Before previous",
            ]);
            for line in &statements.selection.lines {
                lines.add_row(vec![
                    Cell::new(&line.statement_name),
                    Cell::new(&line.account),
                    right(fmt_price(line.current.map(|v| v as f64))),
                    right(fmt_price(line.previous.map(|v| v as f64))),
                    right(fmt_price(line.before_previous.map(|v| v as f64))),
                ]);
            }
            out.push_str(&format!("{lines}\n"));

            if statements.summary.is_empty() {
                out.push_str(NO_KEY_ACCOUNTS);
            } else {
                let mut summary = table(&["Key account", "Current"]);
                for (account, amount) in &statements.summary {
                    summary.add_row(vec![Cell::new(account), right(fmt_number(*amount as f64))]);
                }
                out.push_str(&summary.to_string());
            }
            out
        }
    }
}

pub fn format_news(view: &NewsView) -> String {
    if view.is_empty() {
        return format!("ℹ️  No news found for '{}'", view.query);
    }

    let mut out = format!("📰 News for '{}'\n", view.query);
    for (i, item) in view.items.iter().enumerate() {
        out.push_str(&format!("\n{}. {}\n", i + 1, item.title));
        let meta: Vec<&str> = [item.source.as_deref(), Some(item.published.as_str())]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect();
        if !meta.is_empty() {
            out.push_str(&format!("   {}\n", meta.join(" · ")));
        }
        if !item.link.is_empty() {
            out.push_str(&format!("   {}\n", item.link));
        }
    }
    out
}

pub fn format_error(error: &StockError) -> String {
    match error.kind() {
        ErrorKind::EmptyResult | ErrorKind::Session => format!("ℹ️  {error}"),
        ErrorKind::Resolution => format!("⚠️  {error}"),
        ErrorKind::Fetch | ErrorKind::Invalid => format!("❌ Error: {error}"),
    }
}
