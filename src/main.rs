// ChatLog - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. Configuration loading (config.toml plus CLI overrides)
// 3. Logging initialisation (debug mode support)
// 4. A stdin producer thread feeding the store, and a reconcile consumer
//    whose edit scripts drive the rendered view

use chatlog::app::compose::{self, SubmitOutcome};
use chatlog::app::reconcile::ViewUpdate;
use chatlog::app::state::AppState;
use chatlog::app::view::ChatView;
use chatlog::core::reconciler::Reconciliation;
use chatlog::platform::config::{self, PlatformPaths};
use chatlog::util;
use chatlog::util::error::{ChatLogError, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

/// ChatLog - bounded chat log with live list reconciliation.
///
/// Reads one message per line from stdin, keeps the newest 100, and prints
/// the reconciled view once input ends.
#[derive(Parser, Debug)]
#[command(name = "chatlog", version, about)]
struct Cli {
    /// Print each edit script as a JSON line instead of the final view.
    #[arg(short = 'j', long = "json")]
    json: bool,

    /// Directory containing config.toml (platform default if omitted).
    #[arg(short = 'c', long = "config-dir")]
    config_dir: Option<PathBuf>,

    /// chrono format for row time labels, overriding config.toml.
    #[arg(short = 't', long = "time-format")]
    time_format: Option<String>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();

    let paths = PlatformPaths::resolve();
    let config_dir = cli
        .config_dir
        .clone()
        .unwrap_or_else(|| paths.config_dir.clone());
    let (mut app_config, warnings) = config::load_config(&config_dir);
    app_config.resolve_log_file(&paths.data_dir);

    util::logging::init(
        cli.debug,
        app_config.log_level.as_deref(),
        app_config.log_file.as_deref(),
    );

    tracing::info!(
        version = util::constants::APP_VERSION,
        debug = cli.debug,
        config_dir = %config_dir.display(),
        "ChatLog starting"
    );
    if let Some(format) = cli.time_format {
        if let Err(e) = config::check_time_format(&format) {
            fail(&ChatLogError::Config(e));
        }
        app_config.time_format = format;
    }

    let state = AppState::new(app_config, warnings);
    for warning in &state.warnings {
        tracing::warn!(%warning, "Configuration warning");
    }
    if let Err(e) = run(&state, cli.json) {
        fail(&e);
    }
}

fn fail(error: &ChatLogError) -> ! {
    tracing::error!(error = %error, "ChatLog failed");
    eprintln!("chatlog: {error}");
    std::process::exit(1);
}

/// Feed stdin into the store and follow it with a reconcile consumer until
/// input ends and the view has caught up with the last append.
fn run(state: &AppState, json: bool) -> Result<()> {
    let mut manager = state.new_reconcile_manager();
    manager.start(&state.store);

    let producer_store = state.store.clone();
    let producer = std::thread::spawn(move || -> io::Result<usize> {
        let mut sent = 0;
        for line in io::stdin().lock().lines() {
            if let SubmitOutcome::Sent(_) = compose::submit(&producer_store, &line?) {
                sent += 1;
            }
        }
        Ok(sent)
    });

    let mut view = state.new_view();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let wait = Duration::from_millis(state.config.wait_slice_ms);

    loop {
        // Read the version after checking the producer, so the target
        // covers every append it made.
        let input_done = producer.is_finished();
        if input_done && view.version().seq >= state.store.version().seq {
            break;
        }

        let Some(update) = manager.recv_update(wait) else {
            continue;
        };
        if let ViewUpdate::Reconciled(rec) = &update {
            report(rec);
            if json {
                write_json(&mut out, rec)?;
            }
        }
        if view.handle(&update) {
            if let Some(row) = view.take_scroll_target() {
                tracing::debug!(row, "Scrolled to last row");
            }
        }
    }

    manager.shutdown();

    let sent = match producer.join() {
        Ok(result) => result.map_err(|source| ChatLogError::Io {
            operation: "reading stdin",
            source,
        })?,
        Err(_) => {
            tracing::error!("Input thread panicked");
            0
        }
    };
    tracing::info!(
        sent,
        kept = state.store.len(),
        version = %state.store.version(),
        "Input finished"
    );

    if !json {
        write_view(&mut out, &view)?;
    }
    out.flush().map_err(|source| ChatLogError::Io {
        operation: "flushing stdout",
        source,
    })
}

fn report(rec: &Reconciliation) {
    if rec.script.is_empty() {
        tracing::trace!(version = %rec.version, "No-op reconciliation");
        return;
    }
    tracing::info!(
        version = %rec.version,
        edits = %rec.script.summary(),
        scroll_to_end = rec.scroll_to_end,
        "Edit script"
    );
    for edit in &rec.script {
        tracing::debug!(edit = %ChatView::describe_edit(edit), "Edit");
    }
}

fn write_json(out: &mut impl Write, rec: &Reconciliation) -> Result<()> {
    serde_json::to_writer(&mut *out, rec).map_err(|source| ChatLogError::Json {
        operation: "writing edit script",
        source,
    })?;
    writeln!(out).map_err(|source| ChatLogError::Io {
        operation: "writing edit script",
        source,
    })
}

fn write_view(out: &mut impl Write, view: &ChatView) -> Result<()> {
    for line in view.render_lines() {
        writeln!(out, "{line}").map_err(|source| ChatLogError::Io {
            operation: "writing view",
            source,
        })?;
    }
    Ok(())
}
