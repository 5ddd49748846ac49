//! Interactive dashboard session

use crate::commands::{Command, date_range, filing_request, help};
use std::io::{self, BufRead, Write};
use std::path::Path;
use stock_dashboard::formatter::{
    format_error, format_filings, format_indicators, format_news, format_outcome, format_overview,
};
use stock_dashboard::{Dashboard, Session};

/// What the loop should do after a command
enum Flow {
    Continue,
    Exit,
}

fn print_banner(dashboard: &Dashboard) {
    println!(
        r#"
╔══════════════════════════════════════════════════════════════╗
║                    KRX Stock Dashboard                       ║
║                                                              ║
║  query <company name | 6-digit code> [from] [to]             ║
║  then: overview, indicators, filings, news, export           ║
║  help for all commands, exit to leave                        ║
╚══════════════════════════════════════════════════════════════╝
"#
    );
    if !dashboard.filings_enabled() {
        println!("Financial statements are off (DART_API_KEY not set).\n");
    }
}

fn prompt(session: &Session) -> String {
    match session.current() {
        Ok(snapshot) => format!("stock-dash [{}]> ", snapshot.label),
        Err(_) => "stock-dash> ".to_string(),
    }
}

pub async fn run(dashboard: &Dashboard) -> anyhow::Result<()> {
    print_banner(dashboard);

    let mut session = Session::new();
    tracing::debug!(session = %session.id(), "REPL session started");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{}", prompt(&session));
        stdout.flush()?;

        let mut input = String::new();
        match stdin.lock().read_line(&mut input) {
            Ok(0) => {
                // EOF
                println!("\nGoodbye!");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error reading input: {e}");
                continue;
            }
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let command = match Command::parse(input) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{e}\n");
                continue;
            }
        };

        if let Flow::Exit = execute(dashboard, &mut session, command).await {
            println!("Goodbye!");
            break;
        }
    }

    session.clear();
    Ok(())
}

async fn execute(dashboard: &Dashboard, session: &mut Session, command: Command) -> Flow {
    let output = match command {
        Command::Query { ident, from, to } => match date_range(from.as_deref(), to.as_deref()) {
            Ok(range) => dashboard
                .query(session, &ident, range)
                .await
                .map(|outcome| format_outcome(&outcome)),
            Err(e) => {
                eprintln!("{e}\n");
                return Flow::Continue;
            }
        },
        Command::Overview => dashboard.overview(session).map(|o| format_overview(&o)),
        Command::Indicators => dashboard.indicators(session).map(|v| format_indicators(&v)),
        Command::Filings {
            year,
            period,
            division,
        } => dashboard
            .filings(session, filing_request(year, period, division))
            .await
            .map(|v| format_filings(&v)),
        Command::News { query, limit } => dashboard
            .news(session, query.as_deref(), limit)
            .await
            .map(|v| format_news(&v)),
        Command::Export { path } => dashboard
            .export_file(session, Path::new(&path))
            .map(|rows| format!("💾 Saved {rows} rows to {path}")),
        Command::Refresh => {
            dashboard.refresh().await;
            Ok("Company listing will be reloaded on the next name lookup".to_string())
        }
        Command::Clear => {
            session.clear();
            Ok("Session cleared".to_string())
        }
        Command::Help => Ok(help().to_string()),
        Command::Exit => return Flow::Exit,
    };

    match output {
        Ok(text) => println!("{text}\n"),
        Err(e) => eprintln!("{}\n", format_error(&e)),
    }
    Flow::Continue
}
