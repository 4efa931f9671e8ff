//! Kitsu pairing CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: layered defaults, `kitsu-pairing.toml`, and
//!    `KITSU_PAIRING_*` environment variables (see [`config`]).
//! 2. **Wire observability**: `tracing-subscriber` with a pretty or JSON
//!    layer and an optional OpenTelemetry OTLP exporter (see [`observability`]).
//! 3. **Construct infrastructure**: an [`HttpPairingStore`] carrying the
//!    session token, wrapped in a [`PairingBoard`].
//! 4. **Run one command**: `list`, `derive`, `pair`, or `sync`.

mod config;
mod observability;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pairing::{
    derive, AyonProjectName, KitsuProjectId, PairingAction, PairingBoard, PairingWorkflow,
};
use pairing_store::HttpPairingStore;
use tracing::info;

use crate::config::CliConfig;

#[derive(Debug, Parser)]
#[command(
    name = "kitsu-pairing",
    version,
    about = "Pair Kitsu projects with Ayon projects and trigger synchronisation"
)]
struct Cli {
    /// Configuration file (defaults to ./kitsu-pairing.toml when present).
    #[arg(long, global = true, env = "KITSU_PAIRING_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show every Kitsu project and its Ayon pairing.
    List {
        /// Print the raw pairing list as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show the Ayon name and code that would be proposed for a Kitsu project.
    Derive {
        /// Kitsu project name.
        name: String,
        /// Kitsu project code, used as the code seed when given.
        #[arg(long)]
        code: Option<String>,
    },
    /// Pair an unpaired Kitsu project with a new Ayon project.
    Pair {
        /// Kitsu project id.
        kitsu_project_id: String,
        /// Ayon project name (defaults to the derived name).
        #[arg(long)]
        name: Option<String>,
        /// Ayon project code (defaults to the derived code).
        #[arg(long)]
        code: Option<String>,
        /// Trigger a sync once the pairing is created.
        #[arg(long)]
        sync: bool,
    },
    /// Trigger a sync for a paired Ayon project.
    Sync {
        /// Ayon project name.
        ayon_project_name: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match CliConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let telemetry = match observability::init(&config) {
        Ok(telemetry) => telemetry,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let result = run(cli.command, &config).await;
    telemetry.shutdown();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: &CliConfig) -> Result<()> {
    match command {
        Command::Derive { name, code } => {
            let derived = derive(&name, code.as_deref());
            println!("name: {}", derived.target_name);
            println!("code: {}", derived.target_code);
            Ok(())
        }
        Command::List { json } => list(config, json).await,
        Command::Pair {
            kitsu_project_id,
            name,
            code,
            sync,
        } => pair(config, &kitsu_project_id, name, code, sync).await,
        Command::Sync { ayon_project_name } => sync(config, &ayon_project_name).await,
    }
}

async fn board(config: &CliConfig) -> Result<PairingBoard<HttpPairingStore>> {
    let store = HttpPairingStore::new(config.store_config()?)?;
    let mut board = PairingBoard::new(store).with_timeout(config.timeout());
    board
        .reload()
        .await
        .context("failed to load the pairing list")?;
    Ok(board)
}

async fn list(config: &CliConfig, json: bool) -> Result<()> {
    let board = board(config).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(board.pairings())?);
        return Ok(());
    }

    for entry in board.entries() {
        let ayon = match &entry.action {
            PairingAction::Sync { project } => project.to_string(),
            PairingAction::Pair => "not paired".to_string(),
        };
        println!(
            "{}\t{}\t{}",
            entry.pairing.kitsu_project_id, entry.pairing.kitsu_project_name, ayon
        );
    }
    Ok(())
}

async fn pair(
    config: &CliConfig,
    kitsu_project_id: &str,
    name: Option<String>,
    code: Option<String>,
    sync: bool,
) -> Result<()> {
    let mut board = board(config).await?;
    let id = KitsuProjectId::new(kitsu_project_id).context("Kitsu project id is empty")?;
    let mut workflow = board
        .open(&id)
        .with_context(|| format!("Kitsu project '{id}' is not in the pairing list"))?;

    if let Some(project) = workflow.state().paired_project() {
        bail!("Kitsu project '{id}' is already paired with '{project}'; use `sync` instead");
    }

    let proposal = workflow.propose()?;
    info!(
        workflow_id = %workflow.id(),
        proposed_name = %proposal.target_name,
        proposed_code = %proposal.target_code,
        "Proposed Ayon identifiers"
    );
    workflow.edit(name, code)?;

    if let Err(err) = workflow.submit().await {
        bail!("pairing failed: {}", err.reason());
    }
    let draft = workflow.draft();
    println!(
        "paired '{}' with Ayon project '{}' (code '{}')",
        workflow.candidate().foreign_project_name,
        draft.target_name,
        draft.target_code
    );
    board.complete(&workflow).await?;

    if sync {
        trigger(&mut workflow).await?;
    }
    Ok(())
}

async fn sync(config: &CliConfig, ayon_project_name: &str) -> Result<()> {
    let board = board(config).await?;
    let name = AyonProjectName::new(ayon_project_name).context("Ayon project name is empty")?;
    let pairing = board
        .pairings()
        .iter()
        .find(|p| p.ayon_project_name.as_ref() == Some(&name))
        .with_context(|| format!("no Kitsu project is paired with '{name}'"))?;
    let mut workflow = board
        .open(&pairing.kitsu_project_id)
        .with_context(|| format!("no Kitsu project is paired with '{name}'"))?;

    trigger(&mut workflow).await
}

async fn trigger(workflow: &mut PairingWorkflow<HttpPairingStore>) -> Result<()> {
    if let Err(err) = workflow.trigger_sync().await {
        bail!("sync trigger failed: {}", err.reason());
    }
    if let Some(project) = workflow.state().paired_project() {
        println!("sync triggered for '{project}'");
    }
    Ok(())
}
