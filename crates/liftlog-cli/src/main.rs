//! LiftLog CLI - track a live workout from the terminal

mod session;

use clap::{Parser, Subcommand};
use liftlog_core::config::Config;
use liftlog_core::domain::recovery::{FileRecoveryStore, discard_stale_marker};
use liftlog_core::domain::workout::{LogSurface, SessionController, Workout, WorkoutTemplate};
use liftlog_core::storage::{JsonlWorkoutStore, WorkoutStore, persist_detached};
use session::{ReplCommand, Step};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "liftlog")]
#[command(author, version, about = "Live workout session tracking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive workout session
    Start {
        /// Session name (defaults to the template name)
        name: Option<String>,
        /// Template file (TOML) to pre-populate exercises
        #[arg(short, long)]
        template: Option<PathBuf>,
    },

    /// List saved workouts
    History {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Report and discard an unfinished session from a previous run
    Recovery,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("liftlog=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start { name, template } => cmd_start(name, template, cli.quiet).await,
        Commands::History { limit } => cmd_history(limit, cli.format, cli.quiet).await,
        Commands::Config { action } => cmd_config(action, cli.quiet),
        Commands::Recovery => cmd_recovery(cli.quiet),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_start(name: Option<String>, template: Option<PathBuf>, quiet: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate()?;
    let data_dir = config.data_dir()?;

    let controller = SessionController::builder()
        .config(&config)
        .surface(Arc::new(LogSurface))
        .recovery(Arc::new(FileRecoveryStore::in_dir(&data_dir)))
        .build()?;
    let store: Arc<dyn WorkoutStore> = Arc::new(JsonlWorkoutStore::in_dir(&data_dir));

    if let Some(marker) = controller.discarded_recovery_marker() {
        println!(
            "Discarded unfinished session '{}' from a previous run.",
            marker.name
        );
    }

    match template {
        Some(path) => {
            let mut template = WorkoutTemplate::load(&path)?;
            if let Some(name) = name {
                template.name = name;
            }
            controller.start_session_from_template(&template);
        }
        None => controller.start_session(name.unwrap_or_else(|| "Workout".to_string()), None),
    }

    if !quiet {
        println!("{}", session::render_status(&controller.projection()));
        println!("Type 'help' for commands.");
    }

    let mut alerts = controller.subscribe_alerts();
    let mut input = spawn_input_reader();

    loop {
        tokio::select! {
            line = input.recv() => {
                let Some(line) = line else {
                    debug!("Input closed");
                    if controller.is_active() {
                        if let Some(workout) = controller.end_workout() {
                            save_workout(&store, workout, quiet).await?;
                        }
                    }
                    break;
                };

                let command = match ReplCommand::parse(&line) {
                    Ok(command) => command,
                    Err(message) => {
                        println!("{}", message);
                        continue;
                    }
                };

                match session::execute(&controller, command) {
                    Step::Continue(message) => {
                        if !message.is_empty() {
                            println!("{}", message);
                        }
                    }
                    Step::Ended(Some(workout)) => {
                        save_workout(&store, workout, quiet).await?;
                        break;
                    }
                    Step::Ended(None) => break,
                    Step::Cancelled => {
                        if !quiet {
                            println!("Workout cancelled.");
                        }
                        break;
                    }
                }
            }
            alert = alerts.recv() => match alert {
                Ok(alert) => {
                    if !quiet {
                        println!("{}", session::render_alert(&alert));
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Missed session alerts"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    Ok(())
}

/// Read stdin lines on a plain thread so a pending read never holds up
/// runtime shutdown
fn spawn_input_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

async fn save_workout(
    store: &Arc<dyn WorkoutStore>,
    workout: Workout,
    quiet: bool,
) -> anyhow::Result<()> {
    if !quiet {
        println!("Workout complete: {}", session::render_workout(&workout));
    }
    persist_detached(store.clone(), workout).await?;
    Ok(())
}

async fn cmd_history(limit: usize, format: OutputFormat, quiet: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let store = JsonlWorkoutStore::in_dir(&config.data_dir()?);
    let workouts = store.list(limit).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&workouts)?);
        }
        OutputFormat::Text => {
            if workouts.is_empty() {
                if !quiet {
                    println!("No workouts saved yet.");
                }
                return Ok(());
            }
            for workout in &workouts {
                println!("{}", session::render_workout(workout));
            }
        }
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            for (key, value) in config.list()? {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn cmd_recovery(quiet: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let store = FileRecoveryStore::in_dir(&config.data_dir()?);

    match discard_stale_marker(&store) {
        Some(marker) => {
            let started = marker
                .start_time
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            println!(
                "Discarded unfinished session '{}' (started {}, on exercise {}).",
                marker.name,
                started,
                marker.current_exercise_index + 1
            );
        }
        None => {
            if !quiet {
                println!("No unfinished session found.");
            }
        }
    }
    Ok(())
}
