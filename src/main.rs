//! # CanSat Ground Station
//!
//! Line-oriented console for the telemetry session engine.
//!
//! The console is a thin presentation layer: it forwards operator input to
//! the [`SessionController`] and prints every event-log line the engine
//! publishes.
//!
//! # Usage
//!
//! ```bash
//! cargo run --release -- config/ground-station.toml
//! ```
//!
//! | Input | Action |
//! |-------|--------|
//! | `start` / `stop` / `toggle` | Control sampling |
//! | `send <text>` | Record a free-text command |
//! | `cxon`, `sim-enable`, `sim-activate`, `cal`, `heatshield` | Quick commands |
//! | `export` | Write the session to `Flight_<team>.csv` |
//! | `status` | Show state, sample count and latest chart value |
//! | `quit` | Stop sampling and exit |
//!
//! Expected output:
//! ```text
//! INFO ground_station: CanSat Ground Station v0.1.0 starting...
//! Simulation started.
//! [14:05:09] Packet 1: Alt=100.25m, Temp=24.1°C
//! ```

use std::ops::ControlFlow;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use cansat_ground::command::CommandTemplate;
use cansat_ground::config::{Config, LoggingConfig};
use cansat_ground::session::{SessionController, SessionEvent, SessionState};

/// File name prefix for rolling log files
const LOG_FILE_PREFIX: &str = "ground-station.log";

/// Main entry point for the ground station console
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, defaults otherwise)
///    - Set up logging with tracing subscriber
///    - Build the session controller
///
/// 2. **Main Loop**
///    - Read operator input from stdin
///    - Print event-log lines as the engine publishes them
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Graceful Shutdown**
///    - Stop sampling
///    - Flush pending event-log lines
///
/// # Errors
///
/// Returns error if the configuration cannot be loaded or is invalid.
#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path).with_context(|| format!("loading {}", path))?,
        None => Config::default(),
    };

    let _log_guard = init_logging(&config.logging)?;

    info!("CanSat Ground Station v{} starting...", env!("CARGO_PKG_VERSION"));

    let controller = SessionController::from_config(&config)?;
    info!(
        "Team {} ready, sampling every {} ms, exports go to {}",
        controller.team_id(),
        config.session.sampling_interval_ms,
        controller.export_destination().display()
    );
    println!("Type 'help' for commands");

    let mut events = controller.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("stdin closed, shutting down...");
                    break;
                };
                if handle_input(&controller, line.trim()).is_break() {
                    break;
                }
            }

            event = events.recv() => match event {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(missed)) => warn!("Console fell behind, {} events dropped", missed),
                Err(RecvError::Closed) => break,
            },

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    controller.stop();
    loop {
        match events.try_recv() {
            Ok(event) => print_event(&event),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    info!("Total packets recorded: {}", controller.sample_count());

    Ok(())
}

/// Initialize console logging, plus a daily rolling file when configured
fn init_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level: tracing::Level = logging
        .level
        .parse()
        .with_context(|| format!("invalid log level '{}'", logging.level))?;
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let (file_layer, guard) = match &logging.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Dispatch one line of operator input
fn handle_input(controller: &SessionController, line: &str) -> ControlFlow<()> {
    let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));

    let template = match verb {
        "cxon" => Some(CommandTemplate::CxOn),
        "sim-enable" => Some(CommandTemplate::SimEnable),
        "sim-activate" => Some(CommandTemplate::SimActivate),
        "cal" => Some(CommandTemplate::Calibrate),
        "heatshield" => Some(CommandTemplate::HeatshieldOn),
        _ => None,
    };
    if let Some(template) = template {
        if let Err(e) = controller.send_template(template) {
            println!("{}", e);
        }
        return ControlFlow::Continue(());
    }

    match verb {
        "" => {}
        "start" => match controller.start() {
            Ok(true) => {}
            Ok(false) => println!("Already sampling"),
            Err(e) => println!("{}", e),
        },
        "stop" => {
            if !controller.stop() {
                println!("Already idle");
            }
        }
        "toggle" => {
            if let Err(e) = controller.toggle() {
                println!("{}", e);
            }
        }
        "send" => {
            if let Err(e) = controller.send_command(rest) {
                println!("{}", e);
            }
        }
        "export" => {
            if let Err(e) = controller.export_session() {
                println!("{}", e);
            }
        }
        "status" => print_status(controller),
        "help" => print_help(),
        "quit" | "exit" => return ControlFlow::Break(()),
        other => println!("Unknown input '{}', type 'help' for commands", other),
    }

    ControlFlow::Continue(())
}

fn print_event(event: &SessionEvent) {
    // Samples are narrated through the event log as well
    if let SessionEvent::LogAppended(entry) = event {
        println!("{}", entry.message);
    }
}

fn print_status(controller: &SessionController) {
    let state = match controller.state() {
        SessionState::Idle => "idle",
        SessionState::Sampling => "sampling",
    };
    let latest = controller
        .chart_series()
        .last()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string());
    let echo = controller
        .last_command()
        .map(|c| c.text)
        .unwrap_or_default();

    println!(
        "state={} packets={} latest={} last_command={}",
        state,
        controller.sample_count(),
        latest,
        echo
    );
}

fn print_help() {
    println!("start | stop | toggle          control sampling");
    println!("send <text>                    record a command");
    for template in CommandTemplate::ALL {
        println!("{:<30} {}", quick_verb(template), template.label());
    }
    println!("export                         write the session record");
    println!("status                         show session status");
    println!("quit                           exit");
}

fn quick_verb(template: CommandTemplate) -> &'static str {
    match template {
        CommandTemplate::CxOn => "cxon",
        CommandTemplate::SimEnable => "sim-enable",
        CommandTemplate::SimActivate => "sim-activate",
        CommandTemplate::Calibrate => "cal",
        CommandTemplate::HeatshieldOn => "heatshield",
    }
}
