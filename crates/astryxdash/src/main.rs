//! astryxdash — Astryx sales dashboard
//!
//! Prints the sales dashboard, keeps it live with `watch`, and exposes the
//! ledger and settings through `exec` for scripting.

use astryxdash::{
    DashConfig, DashState, DashboardView, config::default_config_path, create_state, render,
};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "astryxdash")]
#[command(about = "Astryx VPS sales dashboard")]
#[command(version)]
struct Cli {
    /// Path to config file (default: ~/.astryxdash/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the metrics dashboard once
    Dashboard,

    /// Print the sales table, newest purchase first
    Sales,

    /// Keep the dashboard on screen, re-rendering when the ledger or settings change
    Watch,

    /// List the plan catalog and sale durations
    Plans,

    /// Generate a sample config file
    InitConfig {
        /// Path to write config
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory for the stored records
        #[arg(long)]
        state_path: Option<PathBuf>,
    },

    /// Execute a dashboard command and print the JSON result
    ///
    /// Examples:
    ///   astryxdash exec metrics.get
    ///   astryxdash exec sales.list
    ///   astryxdash exec sales.add --params '{"plan":"pig","customerName":"Steve","duration":"1 month","amount":10}'
    ///   astryxdash exec settings.set --params '{"vpsCost":700}'
    Exec {
        /// Command name (e.g. sales.add, settings.get, metrics.get)
        command: String,

        /// JSON parameters for the command (default: {})
        #[arg(long, default_value = "{}")]
        params: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    let config = match &cli.command {
        Commands::InitConfig { .. } => DashConfig::default(),
        _ => DashConfig::load_or_default(&config_path)?,
    };

    // Suppress tracing for exec commands to keep stdout clean JSON
    if !matches!(cli.command, Commands::Exec { .. } | Commands::InitConfig { .. }) {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.log_filter))?;
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    match cli.command {
        Commands::Dashboard => print_dashboard(&create_state(config)),
        Commands::Sales => {
            let state = create_state(config);
            print!("{}", render::sales_table(&state.sales_newest_first(), Local::now().date_naive()));
        }
        Commands::Watch => watch(create_state(config)).await?,
        Commands::Plans => print!("{}", render::plans()),
        Commands::Exec { command, params } => exec_command(config, &command, &params)?,
        Commands::InitConfig { output, state_path } => {
            init_config(output.unwrap_or(config_path), state_path)?;
        }
    }

    Ok(())
}

fn print_dashboard(state: &DashState) {
    print!("{}", state.render_dashboard(Local::now().date_naive()));
}

// ─── Watch ────────────────────────────────────────────────────────────────────

async fn watch(state: DashState) -> anyhow::Result<()> {
    info!(
        state_path = %state.config.state_path.display(),
        interval_ms = state.config.poll_interval().as_millis() as u64,
        "watching dashboard"
    );

    let mut sales_feed = state.ledger.subscribe();
    let mut settings_feed = state.settings.subscribe();
    let mut ticker = tokio::time::interval(state.config.poll_interval());
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut view = DashboardView::new();
    if let Some(panel) = view.refresh(&state, Local::now().date_naive()) {
        print!("{panel}");
    }

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = state.store.refresh() {
                    warn!(error = %e, "store refresh failed");
                }
            }
            Some(change) = sales_feed.changed() => {
                info!(key = ?change.key, "sales changed elsewhere");
            }
            Some(change) = settings_feed.changed() => {
                info!(key = ?change.key, "settings changed elsewhere");
            }
            _ = &mut shutdown => {
                info!("shutting down");
                return Ok(());
            }
        }

        if let Some(panel) = view.refresh(&state, Local::now().date_naive()) {
            println!();
            print!("{panel}");
        }
    }
}

// ─── InitConfig ───────────────────────────────────────────────────────────────

fn init_config(output: PathBuf, state_path: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = DashConfig::default();
    if let Some(path) = state_path {
        config.state_path = path;
    }
    config.save(&output)?;

    println!("Config written to {}", output.display());
    println!();
    println!("Records are stored under {}", config.state_path.join("state").display());
    println!("Run the dashboard with:");
    println!("  astryxdash --config {} dashboard", output.display());

    Ok(())
}

// ─── Exec ─────────────────────────────────────────────────────────────────────

fn exec_command(config: DashConfig, command: &str, params_str: &str) -> anyhow::Result<()> {
    use astryxdash::commands::{CommandRequest, handle_command};

    let params: serde_json::Value = serde_json::from_str(params_str)
        .map_err(|e| anyhow::anyhow!("invalid JSON params: {e}"))?;

    let state = create_state(config);

    match handle_command(&state, CommandRequest::new(command, params)) {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Err(e) => {
            let err = serde_json::json!({
                "ok": false,
                "error": e.to_string(),
                "field": e.field(),
                "command": command,
            });
            println!("{}", serde_json::to_string_pretty(&err)?);
            std::process::exit(1);
        }
    }

    Ok(())
}
