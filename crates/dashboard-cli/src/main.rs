//! KRX stock dashboard CLI
//!
//! # Usage
//!
//! ```bash
//! # Optional: enables financial statements
//! export DART_API_KEY="xxxxxxxx"
//!
//! # One-shot query
//! cargo run --bin stock-dash -- query 삼성전자 --from 20240101 --news
//!
//! # Interactive session
//! cargo run --bin stock-dash -- repl
//! ```

mod commands;
mod repl;

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use stock_dashboard::export::import_from_path;
use stock_dashboard::formatter::{
    format_error, format_filings, format_indicators, format_news, format_outcome, format_overview,
};
use stock_dashboard::{Dashboard, DashboardConfig, FsDivision, ReportPeriod, Session};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "stock-dash", version)]
#[command(about = "Price analytics for companies listed on the Korea Exchange", long_about = None)]
struct Cli {
    /// More log output (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Look one company up and print its dashboard
    Query(QueryArgs),
    /// Interactive session (default)
    Repl,
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Company name or 6-digit stock code
    ident: String,

    /// Start date, YYYYMMDD or YYYY-MM-DD (default: 1 January)
    #[arg(long)]
    from: Option<String>,

    /// End date (default: today)
    #[arg(long)]
    to: Option<String>,

    /// Read prices from an exported .xlsx or .csv instead of fetching them
    #[arg(long, value_name = "FILE")]
    from_file: Option<PathBuf>,

    /// Save prices and moving averages (.xlsx, or .csv by extension)
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,

    /// Also show recent news
    #[arg(long)]
    news: bool,

    /// News search keywords (default: the company)
    #[arg(long, requires = "news")]
    news_query: Option<String>,

    /// Number of news items, 5 to 30
    #[arg(long, requires = "news")]
    limit: Option<usize>,

    /// Also show financial statements (needs DART_API_KEY)
    #[arg(long)]
    filings: bool,

    /// Business year for the statements (default: last year)
    #[arg(long, requires = "filings")]
    year: Option<i32>,

    /// Report code: 11011 annual, 11012 half-year, 11013 Q1, 11014 Q3
    #[arg(long, requires = "filings", value_parser = parse_report)]
    report: Option<ReportPeriod>,

    /// CFS (consolidated) or OFS (separate)
    #[arg(long = "fs", requires = "filings", value_parser = parse_division)]
    division: Option<FsDivision>,
}

fn parse_report(raw: &str) -> Result<ReportPeriod, String> {
    ReportPeriod::from_code(raw).ok_or_else(|| format!("unknown report code '{raw}'"))
}

fn parse_division(raw: &str) -> Result<FsDivision, String> {
    FsDivision::from_code(raw).ok_or_else(|| format!("expected CFS or OFS, got '{raw}'"))
}

/// Initialize tracing; `RUST_LOG` wins over `-v`
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn,stock_dashboard=info",
        1 => "info,stock_dashboard=debug",
        _ => "debug",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run_query(dashboard: &Dashboard, args: QueryArgs) -> anyhow::Result<()> {
    let mut session = Session::new();

    let outcome = match &args.from_file {
        Some(path) => {
            let series = import_from_path(path)?;
            dashboard.load_series(&mut session, &args.ident, series).await
        }
        None => {
            let range = commands::date_range(args.from.as_deref(), args.to.as_deref())?;
            dashboard.query(&mut session, &args.ident, range).await
        }
    };

    match outcome {
        Ok(outcome) => println!("{}\n", format_outcome(&outcome)),
        Err(e) if e.is_soft() => {
            println!("{}", format_error(&e));
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    println!("{}\n", format_overview(&dashboard.overview(&session)?));
    println!("{}\n", format_indicators(&dashboard.indicators(&session)?));

    if args.filings {
        let request = commands::filing_request(args.year, args.report, args.division);
        match dashboard.filings(&session, request).await {
            Ok(view) => println!("{}\n", format_filings(&view)),
            Err(e) => eprintln!("{}\n", format_error(&e)),
        }
    }

    if args.news {
        match dashboard
            .news(&session, args.news_query.as_deref(), args.limit)
            .await
        {
            Ok(view) => println!("{}\n", format_news(&view)),
            Err(e) => eprintln!("{}\n", format_error(&e)),
        }
    }

    if let Some(path) = &args.export {
        let rows = dashboard.export_file(&session, path)?;
        println!("💾 Saved {rows} rows to {}", path.display());
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = DashboardConfig::default()
        .with_env_api_key()
        .with_env_overrides()?;
    let dashboard = Dashboard::from_config(config)?;

    match cli.command {
        Some(CliCommand::Query(args)) => run_query(&dashboard, args).await,
        Some(CliCommand::Repl) | None => repl::run(&dashboard).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_query_args() {
        let cli = Cli::try_parse_from([
            "stock-dash",
            "query",
            "삼성전자",
            "--from",
            "20240101",
            "--filings",
            "--report",
            "11014",
            "--fs",
            "ofs",
            "-v",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        let Some(CliCommand::Query(args)) = cli.command else {
            panic!("expected query");
        };
        assert_eq!(args.ident, "삼성전자");
        assert_eq!(args.report, Some(ReportPeriod::ThirdQuarter));
        assert_eq!(args.division, Some(FsDivision::Separate));
        assert!(!args.news);
    }

    #[test]
    fn test_filing_flags_require_filings() {
        let year_only = ["stock-dash", "query", "005930", "--year", "2023"];
        assert!(Cli::try_parse_from(year_only).is_err());

        let bad_report = ["stock-dash", "query", "005930", "--report", "99999", "--filings"];
        assert!(Cli::try_parse_from(bad_report).is_err());
    }

    #[test]
    fn test_default_is_repl() {
        let cli = Cli::try_parse_from(["stock-dash"]).unwrap();
        assert!(cli.command.is_none());
    }
}
