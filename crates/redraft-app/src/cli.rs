// Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// redraft - stream a proposed rewrite into a file and review it hunk by hunk
#[derive(Debug, Parser)]
#[command(name = "redraft")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// File to patch. Created if it does not exist.
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// File holding the full proposed content of TARGET
    #[arg(value_name = "PROPOSED")]
    pub proposed: PathBuf,

    /// Apply every line at once instead of pacing the stream
    #[arg(long)]
    pub instant: bool,

    /// Pause between streamed lines, in milliseconds (overrides settings)
    #[arg(long, value_name = "MS", env = "REDRAFT_LINE_DELAY_MS")]
    pub line_delay: Option<u64>,

    /// Accept every hunk without prompting
    #[arg(long, conflicts_with = "reject_all")]
    pub accept_all: bool,

    /// Reject every hunk without prompting
    #[arg(long)]
    pub reject_all: bool,

    /// Print hunks and the final summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Write the effective --instant/--line-delay options to the settings file
    #[arg(long)]
    pub save_settings: bool,
}

impl Cli {
    /// Whole-file decision requested on the command line, if any.
    pub fn resolve_all(&self) -> Option<bool> {
        if self.accept_all {
            Some(true)
        } else if self.reject_all {
            Some(false)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_paths_and_flags() {
        let cli = Cli::try_parse_from(["redraft", "src/lib.rs", "/tmp/new.rs", "--instant", "--json"])
            .unwrap();
        assert_eq!(cli.target, PathBuf::from("src/lib.rs"));
        assert_eq!(cli.proposed, PathBuf::from("/tmp/new.rs"));
        assert!(cli.instant && cli.json);
        assert_eq!(cli.resolve_all(), None);
    }

    #[test]
    fn accept_and_reject_conflict() {
        let err = Cli::try_parse_from(["redraft", "a", "b", "--accept-all", "--reject-all"]);
        assert!(err.is_err());
        let cli = Cli::try_parse_from(["redraft", "a", "b", "--reject-all"]).unwrap();
        assert_eq!(cli.resolve_all(), Some(false));
    }
}
