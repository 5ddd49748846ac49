//! REPL command parsing

use anyhow::{Context, Result, anyhow, bail};
use chrono::{Datelike, Local};
use stock_dashboard::{DateRange, FilingRequest, FsDivision, ReportPeriod, parse_date};

/// Parsed command from one REPL line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Look a company up and make it the session company
    Query {
        ident: String,
        from: Option<String>,
        to: Option<String>,
    },
    /// Returns, drawdown, volatility and probabilities
    Overview,
    /// Moving averages, crossover and volume reading
    Indicators,
    Filings {
        year: Option<i32>,
        period: Option<ReportPeriod>,
        division: Option<FsDivision>,
    },
    News {
        query: Option<String>,
        limit: Option<usize>,
    },
    Export { path: String },
    /// Reload the company listing on next lookup
    Refresh,
    /// Forget the session company
    Clear,
    Help,
    Exit,
}

impl Command {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let input = input.strip_prefix('/').unwrap_or(input);

        let parts: Vec<&str> = input.split_whitespace().collect();
        let Some((cmd, args)) = parts.split_first() else {
            bail!("Empty command");
        };

        match cmd.to_lowercase().as_str() {
            "query" | "q" => parse_query(args),
            "overview" | "o" => Ok(Command::Overview),
            "indicators" | "ind" | "i" => Ok(Command::Indicators),
            "filings" | "fs" | "f" => parse_filings(args),
            "news" | "n" => parse_news(args),
            "export" | "save" => {
                let path = args
                    .first()
                    .ok_or_else(|| anyhow!("Usage: export <file.xlsx | file.csv>"))?;
                Ok(Command::Export {
                    path: (*path).to_string(),
                })
            }
            "refresh" => Ok(Command::Refresh),
            "clear" => Ok(Command::Clear),
            "help" | "h" | "?" => Ok(Command::Help),
            "exit" | "quit" | "q!" => Ok(Command::Exit),
            other => bail!("Unknown command '{other}'. Type 'help' for the command list."),
        }
    }
}

const QUERY_USAGE: &str = "Usage: query <company name | 6-digit code> [from] [to]";

/// `query <name words...> [from] [to]`.
///
/// Up to two trailing tokens that read as dates are the range; everything
/// before them is the company, so names with spaces need no quoting. Quotes
/// around the name are accepted and dropped.
fn parse_query(args: &[&str]) -> Result<Command> {
    let mut dates = 0;
    while dates < 2
        && args.len() > dates + 1
        && parse_date(args[args.len() - 1 - dates]).is_ok()
    {
        dates += 1;
    }
    let (name, range) = args.split_at(args.len() - dates);

    let ident = name.join(" ");
    let ident = ident.trim_matches(|c| c == '"' || c == '\'').trim();
    if ident.is_empty() {
        bail!(QUERY_USAGE);
    }

    Ok(Command::Query {
        ident: ident.to_string(),
        from: range.first().map(|s| (*s).to_string()),
        to: range.get(1).map(|s| (*s).to_string()),
    })
}

/// `filings [year] [report code] [CFS|OFS]`, in any order
fn parse_filings(args: &[&str]) -> Result<Command> {
    let mut year = None;
    let mut period = None;
    let mut division = None;

    for arg in args {
        if let Some(p) = ReportPeriod::from_code(arg) {
            period = Some(p);
        } else if let Some(d) = FsDivision::from_code(arg) {
            division = Some(d);
        } else if let Ok(y) = arg.parse::<i32>() {
            year = Some(y);
        } else {
            bail!("Usage: filings [year] [11011|11012|11013|11014] [CFS|OFS]");
        }
    }

    Ok(Command::Filings {
        year,
        period,
        division,
    })
}

/// `news [-n N] [query words...]`
fn parse_news(args: &[&str]) -> Result<Command> {
    let mut limit = None;
    let mut words = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        if *arg == "-n" {
            let value = iter.next().ok_or_else(|| anyhow!("-n needs a number"))?;
            limit = Some(
                value
                    .parse::<usize>()
                    .with_context(|| format!("'{value}' is not a number"))?,
            );
        } else {
            words.push(*arg);
        }
    }

    Ok(Command::News {
        query: (!words.is_empty()).then(|| words.join(" ")),
        limit,
    })
}

/// Date range from optional bounds; missing bounds default to year-to-date
pub fn date_range(from: Option<&str>, to: Option<&str>) -> Result<DateRange> {
    let default = DateRange::year_to_date();
    let start = from.map(parse_date).transpose()?.unwrap_or(default.start());
    let end = to.map(parse_date).transpose()?.unwrap_or(default.end());
    Ok(DateRange::new(start, end)?)
}

/// Fill the unset parts of a filings command with the defaults
pub fn filing_request(
    year: Option<i32>,
    period: Option<ReportPeriod>,
    division: Option<FsDivision>,
) -> FilingRequest {
    let defaults = FilingRequest::default_for(Local::now().year());
    FilingRequest {
        year: year.unwrap_or(defaults.year),
        period: period.unwrap_or(defaults.period),
        division: division.unwrap_or(defaults.division),
    }
}

pub fn help() -> &'static str {
    "Commands:\n\
     \x20 query <name|code> [from] [to]  - Load a company (dates YYYYMMDD or YYYY-MM-DD)\n\
     \x20 overview                       - Returns, drawdown, volatility, probabilities\n\
     \x20 indicators                     - Moving averages, crossover, volume reading\n\
     \x20 filings [year] [report] [fs]   - Financial statements (needs DART_API_KEY)\n\
     \x20 news [-n N] [query]            - Recent news (default: the loaded company)\n\
     \x20 export <file.xlsx|file.csv>    - Save prices and moving averages\n\
     \x20 refresh                        - Reload the company listing\n\
     \x20 clear                          - Forget the loaded company\n\
     \x20 help                           - Show help\n\
     \x20 exit                           - Exit"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        assert_eq!(
            Command::parse("query 삼성전자").unwrap(),
            Command::Query {
                ident: "삼성전자".to_string(),
                from: None,
                to: None
            }
        );
        assert_eq!(
            Command::parse("/q 005930 20240101 20240630").unwrap(),
            Command::Query {
                ident: "005930".to_string(),
                from: Some("20240101".to_string()),
                to: Some("20240630".to_string())
            }
        );
        assert!(Command::parse("query").is_err());
        assert!(Command::parse("query \"\"").is_err());
    }

    #[test]
    fn test_parse_query_name_with_spaces() {
        assert_eq!(
            Command::parse("query CJ CGV").unwrap(),
            Command::Query {
                ident: "CJ CGV".to_string(),
                from: None,
                to: None
            }
        );
        assert_eq!(
            Command::parse("query \"CJ CGV\" 20240101 2024-06-30").unwrap(),
            Command::Query {
                ident: "CJ CGV".to_string(),
                from: Some("20240101".to_string()),
                to: Some("2024-06-30".to_string())
            }
        );
        assert_eq!(
            Command::parse("q 미래에셋 증권 20240101").unwrap(),
            Command::Query {
                ident: "미래에셋 증권".to_string(),
                from: Some("20240101".to_string()),
                to: None
            }
        );
    }

    #[test]
    fn test_parse_query_code_is_never_a_date() {
        assert_eq!(
            Command::parse("query 20240101").unwrap(),
            Command::Query {
                ident: "20240101".to_string(),
                from: None,
                to: None
            }
        );
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::parse("overview").unwrap(), Command::Overview);
        assert_eq!(Command::parse("  IND ").unwrap(), Command::Indicators);
        assert_eq!(Command::parse("refresh").unwrap(), Command::Refresh);
        assert_eq!(Command::parse("clear").unwrap(), Command::Clear);
        assert_eq!(Command::parse("?").unwrap(), Command::Help);
        assert_eq!(Command::parse("quit").unwrap(), Command::Exit);
        assert!(Command::parse("").is_err());
        assert!(Command::parse("dance").is_err());
    }

    #[test]
    fn test_parse_filings() {
        assert_eq!(
            Command::parse("filings").unwrap(),
            Command::Filings {
                year: None,
                period: None,
                division: None
            }
        );
        assert_eq!(
            Command::parse("filings OFS 2023 11012").unwrap(),
            Command::Filings {
                year: Some(2023),
                period: Some(ReportPeriod::HalfYear),
                division: Some(FsDivision::Separate)
            }
        );
        assert!(Command::parse("filings yearly").is_err());
    }

    #[test]
    fn test_parse_news() {
        assert_eq!(
            Command::parse("news").unwrap(),
            Command::News {
                query: None,
                limit: None
            }
        );
        assert_eq!(
            Command::parse("news -n 20 반도체 수출").unwrap(),
            Command::News {
                query: Some("반도체 수출".to_string()),
                limit: Some(20)
            }
        );
        assert!(Command::parse("news -n many").is_err());
    }

    #[test]
    fn test_parse_export() {
        assert_eq!(
            Command::parse("export out.xlsx").unwrap(),
            Command::Export {
                path: "out.xlsx".to_string()
            }
        );
        assert!(Command::parse("export").is_err());
    }

    #[test]
    fn test_date_range() {
        let range = date_range(Some("20240101"), Some("2024-03-31")).unwrap();
        assert_eq!(range.to_string(), "2024-01-01 ~ 2024-03-31");

        assert!(date_range(Some("20240301"), Some("20240101")).is_err());
        assert!(date_range(Some("yesterday"), None).is_err());

        let ytd = date_range(None, None).unwrap();
        assert_eq!(ytd, DateRange::year_to_date());
    }

    #[test]
    fn test_filing_request_defaults() {
        let request = filing_request(None, Some(ReportPeriod::FirstQuarter), None);
        assert_eq!(request.year, Local::now().year() - 1);
        assert_eq!(request.period, ReportPeriod::FirstQuarter);
        assert_eq!(request.division, FsDivision::Consolidated);
    }
}
