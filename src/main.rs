use anyhow::Context;
use clap::{Parser, Subcommand};
use daily_news::types::parse_date_param;
use daily_news::NewsAggregator;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "daily-news", about = "AI news aggregation and daily reports")]
struct Cli {
    /// Directory for the current report and the archive.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch, filter and generate a report.
    Generate {
        /// Target date (YYYY-MM-DD); defaults to today.
        #[arg(long)]
        date: Option<String>,
    },
    /// Copy the current report into the archive.
    Archive,
    /// List archived reports, newest first.
    List,
    /// Print one archived report by date or file name.
    Show { key: String },
    /// Grouped raw items for a date range, without enrichment.
    Query {
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },
    /// Rewrite an archived report's entries into standalone summaries.
    Rewrite {
        #[arg(long)]
        date: String,
    },
    /// Run the daily scheduler (generate each morning, archive each night).
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let aggregator =
        NewsAggregator::from_env(cli.data_dir).context("failed to initialize aggregator")?;

    match cli.command {
        Command::Generate { date } => {
            let date = date.as_deref().map(parse_date_param).transpose()?;
            let report = aggregator.generate_report(date).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Archive => {
            let archived = aggregator.archive_current()?;
            if archived {
                println!("current report archived");
            } else {
                println!("no current report to archive");
            }
        }
        Command::List => {
            let summaries = aggregator.archived_reports()?;
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        Command::Show { key } => {
            let report = aggregator.archived_report(&key)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Query { start, end } => {
            let start = parse_date_param(&start)?;
            let end = parse_date_param(&end)?;
            let groups = aggregator.multi_date_reports(start, end).await?;
            println!("{}", serde_json::to_string_pretty(&groups)?);
        }
        Command::Rewrite { date } => {
            let date = parse_date_param(&date)?;
            let report = aggregator.rewrite_report(date).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Run => {
            aggregator.run_scheduler().await?;
        }
    }

    Ok(())
}
