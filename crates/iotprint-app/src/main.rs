// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// iotprint — admin tool for the IoT print relay.
//
// Entry point. Initialises logging, opens the local stores and runs one
// maintenance command against them.

mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use iotprint_core::error::Result;
use iotprint_core::human_errors::humanize_error;
use iotprint_core::types::ReportId;

use services::app_services::AppServices;

#[derive(Parser, Debug)]
#[command(name = "iotprint")]
#[command(about = "Inspect and maintain the IoT print relay's local state")]
struct Cli {
    /// Data directory (defaults to $XDG_DATA_HOME/iotprint)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cached printer selections
    #[command(subcommand)]
    Selections(SelectionsCommand),

    /// Show the most recent dispatch outcomes
    Audit {
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },

    /// Relay configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Print a fresh idempotency token
    Token,
}

#[derive(Subcommand, Debug)]
enum SelectionsCommand {
    /// List every cached selection
    List,
    /// Forget the selection of one report so the wizard asks again
    Forget { report: i64 },
    /// Forget every selection
    Clear,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Write the effective configuration to config.json
    Init,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            let human = humanize_error(&e);
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Command::Token = cli.command {
        println!("{}", iotprint_security::generate_token()?);
        return Ok(());
    }

    let svc = AppServices::init(cli.data_dir.as_deref())?;

    match cli.command {
        Command::Selections(SelectionsCommand::List) => {
            let selections = svc.selections()?;
            if selections.is_empty() {
                println!("no cached printer selections");
            }
            for selection in selections {
                let ids: Vec<String> = selection.device_ids().iter().map(ToString::to_string).collect();
                println!("report {:>6}  printers {}", selection.report_id, ids.join(", "));
            }
        }
        Command::Selections(SelectionsCommand::Forget { report }) => {
            if svc.forget_selection(ReportId(report))? {
                println!("forgot printer selection of report {report}");
            } else {
                println!("report {report} had no cached printer selection");
            }
        }
        Command::Selections(SelectionsCommand::Clear) => {
            let removed = svc.clear_selections()?;
            println!("removed {removed} cached printer selection(s)");
        }
        Command::Audit { limit } => {
            println!("{} dispatch(es) recorded", svc.audit_count()?);
            for entry in svc.recent_audit_entries(limit)? {
                println!(
                    "{}  {:<16}  report {:>6}  {}  {}{}",
                    entry.timestamp,
                    entry.action,
                    entry.report_id,
                    entry.token,
                    entry.transport.as_deref().unwrap_or("-"),
                    entry.details.map(|d| format!("  ({d})")).unwrap_or_default(),
                );
            }
        }
        Command::Config(ConfigCommand::Show) => {
            println!("# {}", svc.config_path().display());
            println!("{}", serde_json::to_string_pretty(svc.config())?);
        }
        Command::Config(ConfigCommand::Init) => {
            let path = svc.save_config()?;
            println!("wrote {}", path.display());
        }
        Command::Token => {}
    }
    Ok(())
}
