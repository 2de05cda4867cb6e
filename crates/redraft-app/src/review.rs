// Interactive review: line commands read from stdin resolve pending hunks.

use std::io::{BufRead, Write};

use redraft_core::FileId;
use redraft_editor::Workspace;
use redraft_session::{SessionRegistry, SessionState};
use serde::Serialize;

use crate::error::AppError;

const HELP: &str = "\
  a N   accept hunk N
  r N   reject hunk N (restore the original lines)
  A     accept every remaining hunk
  R     reject every remaining hunk
  l     list pending hunks
  q     quit without writing the file";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewCommand {
    Accept(usize),
    Reject(usize),
    AcceptAll,
    RejectAll,
    List,
    Help,
    Quit,
}

/// Parse one input line. Hunk numbers are 1-based, as listed.
pub fn parse_command(line: &str) -> Option<ReviewCommand> {
    let mut parts = line.split_whitespace();
    let cmd = parts.next()?;
    let index = match parts.next() {
        Some(n) => Some(n.parse::<usize>().ok()?),
        None => None,
    };
    if parts.next().is_some() {
        return None;
    }
    match (cmd, index) {
        ("a", Some(n)) if n > 0 => Some(ReviewCommand::Accept(n - 1)),
        ("r", Some(n)) if n > 0 => Some(ReviewCommand::Reject(n - 1)),
        ("A", None) => Some(ReviewCommand::AcceptAll),
        ("R", None) => Some(ReviewCommand::RejectAll),
        ("l", None) => Some(ReviewCommand::List),
        ("?" | "h" | "help", None) => Some(ReviewCommand::Help),
        ("q", None) => Some(ReviewCommand::Quit),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// Every hunk was resolved; the document holds the result.
    Resolved,
    /// The user quit; pending hunks were rolled back and nothing should be written.
    Quit,
}

#[derive(Serialize)]
struct HunkReport<'a> {
    index: usize,
    start_line: usize,
    removed: &'a [String],
    added: &'a [String],
}

/// Print the pending hunks of `file`, numbered from 1.
pub fn print_hunks<W: Write>(
    out: &mut W,
    registry: &SessionRegistry,
    file: &FileId,
    json: bool,
) -> Result<(), AppError> {
    let blocks = registry.session(file).map(|s| s.blocks()).unwrap_or_default();
    if json {
        let reports: Vec<HunkReport> = blocks
            .iter()
            .enumerate()
            .map(|(i, b)| HunkReport {
                index: i + 1,
                start_line: b.hunk.start_line + 1,
                removed: &b.removed,
                added: &b.added,
            })
            .collect();
        writeln!(out, "{}", serde_json::to_string(&reports)?)?;
        return Ok(());
    }

    for (i, block) in blocks.iter().enumerate() {
        writeln!(
            out,
            "@@ hunk {} at line {}: -{} +{}",
            i + 1,
            block.hunk.start_line + 1,
            block.hunk.removed_count,
            block.hunk.added_count
        )?;
        for line in &block.removed {
            writeln!(out, "-{}", line)?;
        }
        for line in &block.added {
            writeln!(out, "+{}", line)?;
        }
    }
    Ok(())
}

/// Prompt for commands until every hunk of `file` is resolved or the user quits.
/// End of input counts as quitting.
pub fn run<R: BufRead, W: Write>(
    registry: &mut SessionRegistry,
    workspace: &mut Workspace,
    file: &FileId,
    json: bool,
    mut input: R,
    out: &mut W,
) -> Result<ReviewOutcome, AppError> {
    print_hunks(out, registry, file, json)?;

    let mut line = String::new();
    while registry.state(file) == Some(SessionState::AwaitingReview) {
        let pending = registry.hunks(file).len();
        write!(out, "{} hunk(s) pending [a N, r N, A, R, l, q, ?]> ", pending)?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            registry.cancel(workspace, file);
            return Ok(ReviewOutcome::Quit);
        }

        match parse_command(&line) {
            Some(ReviewCommand::Accept(i)) => {
                if !registry.resolve_hunk(workspace, file, i, true)? {
                    writeln!(out, "no hunk {}", i + 1)?;
                }
            }
            Some(ReviewCommand::Reject(i)) => {
                if !registry.resolve_hunk(workspace, file, i, false)? {
                    writeln!(out, "no hunk {}", i + 1)?;
                }
            }
            Some(ReviewCommand::AcceptAll) => {
                registry.resolve_all(workspace, file, true)?;
            }
            Some(ReviewCommand::RejectAll) => {
                registry.resolve_all(workspace, file, false)?;
            }
            Some(ReviewCommand::List) => print_hunks(out, registry, file, json)?,
            Some(ReviewCommand::Help) => writeln!(out, "{}", HELP)?,
            Some(ReviewCommand::Quit) => {
                registry.cancel(workspace, file);
                return Ok(ReviewOutcome::Quit);
            }
            None => writeln!(out, "unknown command {:?}; type ? for help", line.trim())?,
        }
    }
    Ok(ReviewOutcome::Resolved)
}
