mod logging;

use anyhow::{Context, Result};
use capkit_core::{
    CapkitConfig, ConfigManager, DocumentStore, InMemoryDocumentStore, ProgramStats,
    StartupProfile,
};
use capkit_engine::InsightsEngine;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::{settings::Style, Table, Tabled};
use tracing::{info, warn};

const ADVISOR_CONTEXT_KEY: &str = "advisorContext";

#[derive(Parser)]
#[command(name = "capkit")]
#[command(about = "CapKit CLI - Startup portfolio aggregation and program analytics", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (json, pretty, table)
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Config file (defaults to ./.capkit.toml, then ~/.capkit/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// JSON snapshot backing the document store
    #[arg(long, global = true, env = "CAPKIT_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
    Table,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate startup profiles, highest readiness first
    Startups,

    /// Scan module completion across every user
    Scan {
        /// Also emit the plain-text summary handed to the program advisor
        #[arg(long)]
        context: bool,
    },

    /// Flip the favorite flag of a startup
    ToggleFavorite {
        /// Startup ID (same as the founder's user ID)
        id: String,

        /// Current value; read from the store when omitted
        #[arg(long)]
        current: Option<bool>,
    },

    /// Enable or disable a user account
    ToggleAccess {
        /// User ID
        id: String,

        /// Current value; read from the store when omitted
        #[arg(long)]
        current: Option<bool>,
    },

    /// Write a default config file
    InitConfig {
        /// Destination (defaults to ./.capkit.toml)
        path: Option<PathBuf>,
    },
}

#[derive(Tabled)]
struct StartupRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Founder")]
    founder: String,
    #[tabled(rename = "Stage")]
    stage: String,
    #[tabled(rename = "Sector")]
    sector: String,
    #[tabled(rename = "Readiness")]
    readiness: u8,
    #[tabled(rename = "Favorite")]
    favorite: bool,
}

impl From<&StartupProfile> for StartupRow {
    fn from(profile: &StartupProfile) -> Self {
        Self {
            id: profile.id.clone(),
            name: profile.name.clone(),
            founder: profile.founder_name.clone(),
            stage: profile.stage.clone(),
            sector: profile.sector.clone(),
            readiness: profile.readiness_score,
            favorite: profile.is_favorite,
        }
    }
}

#[derive(Tabled)]
struct ModuleRow {
    #[tabled(rename = "Module")]
    module: String,
    #[tabled(rename = "Users")]
    count: usize,
    #[tabled(rename = "Completion %")]
    completion_rate: u32,
}

#[derive(Serialize)]
struct ToggleResult {
    id: String,
    field: &'static str,
    value: bool,
    document: serde_json::Value,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Needs no configuration, so it also works when the current one is broken.
    if let Commands::InitConfig { path } = &cli.command {
        let output = init_config(path.as_deref())?;
        return print_output(&cli.output, &cli.command, &output);
    }

    let manager = match &cli.config {
        Some(path) => ConfigManager::from_path(path),
        None => ConfigManager::load(),
    }
    .context("Failed to load configuration")?;
    let config = manager.config().clone();

    logging::init_logging(&config.logging, cli.verbose);

    match execute_command(&cli, &config).await {
        Ok(output) => {
            print_output(&cli.output, &cli.command, &output)?;
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn init_config(path: Option<&Path>) -> Result<serde_json::Value> {
    let path = path.unwrap_or_else(|| Path::new(".capkit.toml"));
    ConfigManager::create_default_config(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(serde_json::json!({
        "config_file": path.display().to_string(),
        "status": "created",
    }))
}

/// Snapshot path from the command line, falling back to the config file.
fn snapshot_path(cli: &Cli, config: &CapkitConfig) -> Option<PathBuf> {
    cli.snapshot
        .clone()
        .or_else(|| config.store.snapshot_path.clone())
}

fn open_store(snapshot: Option<&Path>) -> Result<Arc<InMemoryDocumentStore>> {
    match snapshot {
        Some(path) => {
            let store = InMemoryDocumentStore::load_snapshot(path)
                .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("No snapshot configured, starting with an empty store");
            Ok(Arc::new(InMemoryDocumentStore::new()))
        }
    }
}

async fn execute_command(cli: &Cli, config: &CapkitConfig) -> Result<serde_json::Value> {
    let snapshot = snapshot_path(cli, config);
    let store = open_store(snapshot.as_deref())?;
    let engine = InsightsEngine::new(store.clone(), config);

    match &cli.command {
        Commands::Startups => {
            let mut profiles = engine.aggregate_startups().await;
            profiles.sort_by(|a, b| {
                b.readiness_score
                    .cmp(&a.readiness_score)
                    .then_with(|| a.name.cmp(&b.name))
            });
            Ok(serde_json::to_value(profiles)?)
        }

        Commands::Scan { context } => {
            let stats = engine.scan_program().await;
            scan_value(&stats, *context)
        }

        Commands::ToggleFavorite { id, current } => {
            let collection = &config.store.admin_collection;
            let current = match current {
                Some(value) => *value,
                None => current_flag(store.as_ref(), collection, id, "isFavorite").await?,
            };
            let value = engine
                .admin()
                .toggle_startup_favorite(id, current)
                .await
                .context("Failed to toggle favorite")?;
            let result =
                toggle_result(store.as_ref(), collection, id, "isFavorite", value).await?;
            persist(&store, snapshot.as_deref())?;
            Ok(serde_json::to_value(result)?)
        }

        Commands::ToggleAccess { id, current } => {
            let collection = &config.store.users_collection;
            let current = match current {
                Some(value) => *value,
                None => current_flag(store.as_ref(), collection, id, "isActive").await?,
            };
            let value = engine
                .admin()
                .toggle_user_access(id, current)
                .await
                .context("Failed to toggle user access")?;
            let result = toggle_result(store.as_ref(), collection, id, "isActive", value).await?;
            persist(&store, snapshot.as_deref())?;
            Ok(serde_json::to_value(result)?)
        }

        Commands::InitConfig { path } => init_config(path.as_deref()),
    }
}

async fn current_flag(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
    field: &str,
) -> Result<bool> {
    let doc = store.get_document(collection, id).await?;
    Ok(doc
        .as_ref()
        .and_then(|d| d.get(field))
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false))
}

async fn toggle_result(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
    field: &'static str,
    value: bool,
) -> Result<ToggleResult> {
    let document = store
        .get_document(collection, id)
        .await?
        .map(serde_json::Value::Object)
        .unwrap_or(serde_json::Value::Null);
    Ok(ToggleResult {
        id: id.to_string(),
        field,
        value,
        document,
    })
}

fn persist(store: &InMemoryDocumentStore, snapshot: Option<&Path>) -> Result<()> {
    match snapshot {
        Some(path) => {
            store
                .save_snapshot(path)
                .with_context(|| format!("Failed to save snapshot {}", path.display()))?;
            info!("Saved snapshot {}", path.display());
        }
        None => warn!("No snapshot configured, change is not persisted"),
    }
    Ok(())
}

fn print_output(
    format: &OutputFormat,
    command: &Commands,
    value: &serde_json::Value,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Pretty => match command {
            Commands::Startups => print_startups(value)?,
            Commands::Scan { .. } => print_scan(value)?,
            _ => print_pretty(value)?,
        },
        OutputFormat::Table => {
            print_table(command, value)?;
        }
    }
    Ok(())
}

fn print_startups(value: &serde_json::Value) -> Result<()> {
    let profiles: Vec<StartupProfile> = serde_json::from_value(value.clone())?;
    if profiles.is_empty() {
        println!("{}", "No startups found".yellow());
        return Ok(());
    }
    for profile in &profiles {
        let star = if profile.is_favorite { " *".yellow() } else { "".normal() };
        println!(
            "\n{}{} {}",
            profile.name.cyan().bold(),
            star,
            format!("({})", profile.id).dimmed()
        );
        println!("  {}: {}", "Founder".cyan(), profile.founder_name.green());
        println!(
            "  {}: {} / {}",
            "Stage".cyan(),
            profile.stage.green(),
            profile.sector.green()
        );
        println!(
            "  {}: {}",
            "Readiness".cyan(),
            profile.readiness_score.to_string().yellow()
        );
        println!("  {}: {}", "Pitch".cyan(), profile.short_description);
    }
    Ok(())
}

/// Scan result as JSON, optionally carrying the advisor context block.
fn scan_value(stats: &ProgramStats, with_context: bool) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(stats)?;
    if with_context {
        value[ADVISOR_CONTEXT_KEY] = serde_json::Value::from(stats.context_lines().join("\n"));
    }
    Ok(value)
}

fn print_scan(value: &serde_json::Value) -> Result<()> {
    let stats: ProgramStats = serde_json::from_value(value.clone())?;
    println!(
        "{}: {}",
        "Users scanned".cyan().bold(),
        stats.total_startups.to_string().yellow()
    );
    if stats.skipped_users > 0 {
        println!(
            "{}: {}",
            "Users skipped".cyan().bold(),
            stats.skipped_users.to_string().red()
        );
    }
    for module in &stats.module_stats {
        println!(
            "  {:<16} {:>4}% ({})",
            module.name,
            module.completion_rate,
            module.count
        );
    }
    println!(
        "{}: {}",
        "Top bottleneck".cyan().bold(),
        stats.top_bottleneck.red().bold()
    );
    for sample in &stats.samples {
        println!("  {}", sample.dimmed());
    }
    if let Some(context) = value.get(ADVISOR_CONTEXT_KEY).and_then(|v| v.as_str()) {
        println!("\n{}", "Advisor context".cyan().bold());
        println!("{}", context);
    }
    Ok(())
}

fn print_pretty(value: &serde_json::Value) -> Result<()> {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                let key_colored = key.cyan().bold();
                match val {
                    serde_json::Value::String(s) => {
                        println!("{}: {}", key_colored, s.green());
                    }
                    serde_json::Value::Number(n) => {
                        println!("{}: {}", key_colored, n.to_string().yellow());
                    }
                    serde_json::Value::Bool(b) => {
                        let val_colored = if *b {
                            "true".green()
                        } else {
                            "false".red()
                        };
                        println!("{}: {}", key_colored, val_colored);
                    }
                    _ => {
                        println!("{}: {}", key_colored, val);
                    }
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                println!("\n{}{}:", "Item ".cyan(), (i + 1).to_string().yellow());
                print_pretty(item)?;
            }
        }
        _ => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
    }
    Ok(())
}

fn print_table(command: &Commands, value: &serde_json::Value) -> Result<()> {
    match command {
        Commands::Startups => {
            let profiles: Vec<StartupProfile> = serde_json::from_value(value.clone())?;
            let rows: Vec<StartupRow> = profiles.iter().map(StartupRow::from).collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
        }
        Commands::Scan { .. } => {
            let stats: ProgramStats = serde_json::from_value(value.clone())?;
            let rows: Vec<ModuleRow> = stats
                .module_stats
                .iter()
                .map(|m| ModuleRow {
                    module: m.name.clone(),
                    count: m.count,
                    completion_rate: m.completion_rate,
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
            println!(
                "{}: {}",
                "Top bottleneck".cyan().bold(),
                stats.top_bottleneck.red().bold()
            );
        }
        _ => print_pretty(value)?,
    }
    Ok(())
}
