//! Stride Agent CLI
//!
//! Replays accelerometer traces through the step counter with interactive
//! start/stop/reset control.

use anyhow::{ensure, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use crossbeam_channel::Sender;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use stride_agent::{
    collector::{Pacing, PermissionMode, ReplaySource},
    config::Config,
    core::{Command, Event, SensorAccess, Snapshot, TrackingState},
    diagnostics::{create_shared_stats, SharedSessionStats},
    runtime::Session,
    VERSION,
};
use tracing_subscriber::EnvFilter;

/// Slowest accepted --speed multiplier.
const MIN_SPEED: f64 = 0.01;

#[derive(Parser)]
#[command(name = "stride-agent")]
#[command(version = VERSION)]
#[command(about = "Accelerometer step counter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an accelerometer trace through the step counter
    Run {
        /// CSV file with `timestamp_ms` and `z` columns
        #[arg(long, short)]
        input: PathBuf,

        /// Pace samples by their recorded timestamps
        #[arg(long)]
        realtime: bool,

        /// Speed multiplier for --realtime
        #[arg(long, default_value = "1.0")]
        speed: f64,

        /// Simulated permission model (implicit, grant, deny, fail, unsupported)
        #[arg(long, default_value = "implicit")]
        permission: PermissionMode,

        /// Start tracking without waiting for a toggle command
        #[arg(long)]
        auto_start: bool,

        /// Exit once the trace has been fully delivered
        #[arg(long)]
        exit_when_exhausted: bool,

        /// Print snapshots as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Show configuration
    Config,

    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            input,
            realtime,
            speed,
            permission,
            auto_start,
            exit_when_exhausted,
            json,
        } => cmd_run(
            &input,
            realtime,
            speed,
            permission,
            auto_start,
            exit_when_exhausted,
            json,
        ),
        Commands::Config => cmd_config(),
        Commands::InitConfig { force } => cmd_init_config(force),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_run(
    input: &Path,
    realtime: bool,
    speed: f64,
    permission: PermissionMode,
    auto_start: bool,
    exit_when_exhausted: bool,
    json: bool,
) -> Result<()> {
    ensure!(
        speed.is_finite() && speed >= MIN_SPEED,
        "--speed must be at least {MIN_SPEED}, got {speed}"
    );

    let config = Config::load().context("Could not load configuration")?;
    let exit_when_exhausted = exit_when_exhausted || config.exit_when_exhausted;

    let pacing = if realtime {
        Pacing::Realtime { speed }
    } else {
        Pacing::Immediate
    };
    let source = ReplaySource::from_csv(input, pacing, permission)
        .with_context(|| format!("Could not load trace {}", input.display()))?;

    if !json {
        println!("Stride Agent v{VERSION}");
        println!("{}", Local::now().format("%A, %B %-d, %Y | %H:%M:%S"));
        println!();
        println!("  Trace: {} ({} samples)", input.display(), source.len());
        println!(
            "  Pacing: {}",
            if realtime {
                format!("realtime x{speed}")
            } else {
                "immediate".to_string()
            }
        );
        println!("  Step length: {} m", config.step_length_m);
        println!();
        println!("Commands: [t]oggle, [r]eset, [s]tatus, [q]uit (Ctrl+C also stops)");
        println!();
    }

    let stats = create_shared_stats();
    let mut session = Session::with_stats(source, config.tracker_config(), stats.clone());

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    spawn_command_reader(session.sender(), running.clone(), stats.clone());

    if auto_start {
        let _ = session.sender().send(Event::Command(Command::Toggle));
    }

    let mut printer = SnapshotPrinter::new(json);
    let last = session.run(
        &running,
        |s| exit_when_exhausted && is_finished(s),
        |s| printer.show(s),
    );

    if !json {
        println!();
        println!(
            "Session finished: {} steps, {} km, {}",
            last.step_count, last.distance_text, last.duration_text
        );
        println!();
        println!("{}", stats.summary());
    }
    Ok(())
}

fn cmd_config() -> Result<()> {
    let config = Config::load().context("Could not load configuration")?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_init_config(force: bool) -> Result<()> {
    let path = Config::config_path();
    ensure!(
        force || !path.exists(),
        "{} already exists (use --force to overwrite)",
        path.display()
    );

    Config::default()
        .save()
        .with_context(|| format!("Could not write {}", path.display()))?;
    println!("Wrote default configuration to {path:?}");
    Ok(())
}

/// A scripted run is over when the trace is used up, or when tracking
/// cannot start at all.
fn is_finished(snapshot: &Snapshot) -> bool {
    if snapshot.source_exhausted {
        return true;
    }
    snapshot.state == TrackingState::Idle
        && !snapshot.awaiting_permission
        && matches!(
            snapshot.access,
            SensorAccess::Denied | SensorAccess::Unsupported
        )
}

/// Read control commands from stdin and forward them to the session.
fn spawn_command_reader(sender: Sender<Event>, running: Arc<AtomicBool>, stats: SharedSessionStats) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let command = match line.trim().to_lowercase().as_str() {
                "t" | "toggle" | "start" | "stop" => Command::Toggle,
                "r" | "reset" => Command::Reset,
                "s" | "status" => {
                    println!("{}", stats.summary());
                    continue;
                }
                "q" | "quit" | "exit" => {
                    running.store(false, Ordering::SeqCst);
                    break;
                }
                "" => continue,
                other => {
                    eprintln!("Unknown command '{other}' (expected t, r, s or q)");
                    continue;
                }
            };
            if sender.send(Event::Command(command)).is_err() {
                break;
            }
        }
    });
}

/// Prints a display line whenever something a user would see changes.
struct SnapshotPrinter {
    json: bool,
    last_key: Option<DisplayKey>,
}

#[derive(PartialEq)]
struct DisplayKey {
    state: TrackingState,
    access: SensorAccess,
    step_count: u64,
    duration_seconds: u64,
    status: String,
    source_exhausted: bool,
}

impl SnapshotPrinter {
    fn new(json: bool) -> Self {
        Self {
            json,
            last_key: None,
        }
    }

    fn show(&mut self, snapshot: &Snapshot) {
        let key = DisplayKey {
            state: snapshot.state,
            access: snapshot.access,
            step_count: snapshot.step_count,
            duration_seconds: snapshot.duration_seconds,
            status: snapshot.status.clone(),
            source_exhausted: snapshot.source_exhausted,
        };
        if self.last_key.as_ref() == Some(&key) {
            return;
        }
        let banner_changed = self
            .last_key
            .as_ref()
            .map_or(true, |last| last.access != key.access);
        self.last_key = Some(key);

        if self.json {
            match serde_json::to_string(snapshot) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("Could not serialize snapshot: {e}"),
            }
            return;
        }

        if banner_changed {
            if snapshot.not_supported {
                println!("!! Motion sensor not supported on this device.");
            }
            if snapshot.awaiting_permission {
                println!("!! Waiting for motion sensor permission...");
            }
        }

        println!(
            "[{}] Steps: {} | Distance: {} km | Duration: {} | {} [{}{}]",
            Local::now().format("%H:%M:%S"),
            snapshot.step_count,
            snapshot.distance_text,
            snapshot.duration_text,
            snapshot.status,
            snapshot.start_label,
            if snapshot.start_enabled { "" } else { ", disabled" }
        );
    }
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");
}
