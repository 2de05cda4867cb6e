// redraft: stream a proposed rewrite into a file, then review it hunk by hunk.
// Drives the session registry with a cooperative tick loop, sleeping until the
// next paced line is due.

mod cli;
mod error;
mod review;
mod settings;

use std::io::{self, Write};
use std::path::Path;
use std::thread;
use std::time::Instant;

use clap::Parser;
use redraft_core::{EditorSurface, FileId};
use redraft_diff::{diff_lines, stats};
use redraft_editor::Workspace;
use redraft_session::{SessionEvent, SessionRegistry};

use cli::Cli;
use error::AppError;
use review::ReviewOutcome;
use settings::RedraftSettings;

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let settings = settings::load_settings();
    if let Err(e) = run(&cli, settings) {
        eprintln!("redraft: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli, mut settings: RedraftSettings) -> Result<(), AppError> {
    if let Some(ms) = cli.line_delay {
        settings.patch.line_delay_ms = ms;
    }
    if cli.instant {
        settings.patch.instant = true;
    }
    if cli.save_settings {
        settings::save_settings(&settings);
    }
    let instant = settings.patch.instant;

    let proposed = std::fs::read_to_string(&cli.proposed).map_err(|source| AppError::Read {
        path: cli.proposed.clone(),
        source,
    })?;
    let mut workspace = Workspace::new();
    let file = open_target(&mut workspace, &cli.target)?;
    let original = workspace.text(&file).unwrap_or_default();
    if original.is_empty() {
        // Nothing to preserve: take the final newline from the proposal.
        workspace.set_trailing_newline(&file, proposed.ends_with('\n'));
    }

    let mut registry = SessionRegistry::new(settings.patch);
    registry.request_patch(&mut workspace, &file, &original, &proposed, instant)?;
    stream(&mut registry, &mut workspace, &file)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let outcome = if registry.state(&file).is_none() {
        log::debug!("{} needs no review", file);
        ReviewOutcome::Resolved
    } else if let Some(accept) = cli.resolve_all() {
        review::print_hunks(&mut out, &registry, &file, cli.json)?;
        registry.resolve_all(&mut workspace, &file, accept)?;
        ReviewOutcome::Resolved
    } else {
        let stdin = io::stdin();
        review::run(&mut registry, &mut workspace, &file, cli.json, stdin.lock(), &mut out)?
    };

    if outcome == ReviewOutcome::Quit {
        log::info!("review abandoned; {} left untouched", file);
        return Ok(());
    }
    if workspace.buffer(&file).is_some_and(|b| b.is_modified()) {
        workspace.persist(&file)?;
    }
    let result = workspace.text(&file).unwrap_or_default();
    print_summary(&mut out, &file, &original, &result, cli.json)
}

fn open_target(workspace: &mut Workspace, path: &Path) -> Result<FileId, AppError> {
    if !path.exists() {
        log::info!("{} does not exist; it will be created", path.display());
        return Ok(workspace.open_new(path));
    }
    workspace.open_file(path).map_err(|source| AppError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Tick the registry until `file` stops streaming.
fn stream(
    registry: &mut SessionRegistry,
    workspace: &mut Workspace,
    file: &FileId,
) -> Result<(), AppError> {
    while registry.is_streaming(file) {
        let outcome = registry.tick(workspace, Instant::now());
        for event in outcome.events {
            match event {
                SessionEvent::StreamFinished { file, state } => {
                    log::info!("{}: streaming finished ({:?})", file, state);
                }
                SessionEvent::StreamFailed { error, .. } => return Err(error.into()),
            }
        }
        if let Some(deadline) = outcome.next_deadline {
            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            }
        }
    }
    Ok(())
}

fn print_summary<W: Write>(
    out: &mut W,
    file: &FileId,
    original: &str,
    result: &str,
    json: bool,
) -> Result<(), AppError> {
    let s = stats(&diff_lines(original, result));
    if json {
        let summary = serde_json::json!({
            "file": file.to_string(),
            "added": s.added,
            "removed": s.removed,
            "unchanged": s.unchanged,
        });
        writeln!(out, "{}", summary)?;
    } else if s.has_changes() {
        writeln!(out, "{}: +{} -{}", file, s.added, s.removed)?;
    } else {
        writeln!(out, "{}: no changes", file)?;
    }
    Ok(())
}
