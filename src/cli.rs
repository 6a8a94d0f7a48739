use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::commands::index::{IndexOptions, IndexSource};
use crate::commands::reconcile::ReconcileOptions;
use crate::commands::search::SearchOptions;
use crate::commands::{self, CommandReport};
use crate::logging;

#[derive(Debug, Parser)]
#[command(
    name = "thortstream",
    version,
    about = "Reconcile a chat archive against its processing log and catalog, then index it"
)]
struct Cli {
    /// Print the command report as JSON.
    #[arg(long, global = true)]
    json: bool,
    /// Raise log verbosity (-v info, -vv debug). THORT_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Merge log, files and catalog; write the report, work order and relocation plan.
    Reconcile {
        /// Reconcile and report counts without writing any artifact.
        #[arg(long)]
        dry_run: bool,
    },
    /// Build the database, word index and full-text index.
    Index {
        #[arg(long, value_enum, default_value_t = IndexSource::Reconcile)]
        from: IndexSource,
    },
    /// Reconcile, write artifacts and index in one pass.
    Run,
    /// Look up chats in the written index.
    Search {
        #[arg(long)]
        query: String,
        /// Match the query as a substring of the chat text.
        #[arg(long)]
        phrase: bool,
    },
    /// Show resolved paths, effective config and environment problems.
    Status,
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let state = if report.ok { "ok" } else { "issues" };
    println!("{}: {state}", report.command);
    for detail in &report.details {
        println!("  {detail}");
    }
    for issue in &report.issues {
        println!("  issue: {issue}");
    }
    Ok(())
}

/// Parse arguments, run the chosen command and print its report.
///
/// Returns whether the report came back clean.
pub fn run() -> Result<bool> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let report = match cli.command {
        Command::Reconcile { dry_run } => commands::reconcile::run(ReconcileOptions { dry_run })?,
        Command::Index { from } => commands::index::run(IndexOptions { source: from })?,
        Command::Run => commands::run::run()?,
        Command::Search { query, phrase } => {
            commands::search::run(SearchOptions { query, phrase })?
        }
        Command::Status => commands::status::run()?,
    };

    print_report(&report, cli.json)?;
    Ok(report.ok)
}
