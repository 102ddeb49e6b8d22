//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! Notes:
//! - Global flags (log level, JSON output) apply to every subcommand.
//! - --debug is a shorthand for --log-level debug.

use clap::{Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

use crate::config::{Config, LogLevel};
use crate::engine::MigrationMode;

/// Rename an experiment's container file set and keep its link graph
/// consistent. CLI flags override config values (loaded from XML if present).
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Rename HDF5/NeXus experiment file sets and rewrite their external links"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(
        short = 'd',
        long,
        global = true,
        help = "Enable debug logging (shorthand for --log-level debug)"
    )]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, global = true, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    /// Emit logs in structured JSON (includes timestamp, level, and fields).
    #[arg(long, global = true, help = "Emit logs in structured JSON")]
    pub json: bool,

    /// Print where h5shift will look for the config file (or H5SHIFT_CONFIG
    /// if set), then exit.
    #[arg(
        long,
        help = "Print the config file location used by h5shift and exit"
    )]
    pub print_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Rename every file in DIRECTORY whose name starts with PREFIX, and
    /// rewrite the external links between the renamed containers.
    Rename {
        /// The directory containing the experiment file set.
        #[arg(value_hint = ValueHint::DirPath)]
        directory: PathBuf,

        /// The filename prefix to search for.
        prefix: String,

        /// The prefix the files are renamed to.
        new_prefix: String,

        /// How files reach their new names.
        #[arg(long, value_enum, default_value_t = ModeArg::InPlace)]
        mode: ModeArg,

        /// Narrow 64-bit numeric datasets to 32 bits while copying
        /// (copy/move modes only).
        #[arg(long)]
        downcast: bool,

        /// Skip the interactive confirmation prompt.
        #[arg(short = 'y', long)]
        yes: bool,

        /// Print the plan, but do not modify any file.
        #[arg(long)]
        dry_run: bool,
    },

    /// Copy one container to a new file, narrowing 64-bit numeric datasets
    /// to 32 bits.
    Recast {
        /// The source container file.
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,

        /// The destination container file to create.
        #[arg(value_hint = ValueHint::FilePath)]
        output: PathBuf,

        /// Skip the interactive confirmation prompt.
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Print the target filenames of all external links in one container.
    Links {
        /// The container file to read.
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },
}

/// Migration mode as exposed on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    /// Rename files on disk, then fix links inside the renamed containers.
    InPlace,
    /// Copy files to their new names; originals are kept.
    Copy,
    /// Copy, fix links in the copies, then discard clean originals.
    Move,
}

impl From<ModeArg> for MigrationMode {
    fn from(m: ModeArg) -> MigrationMode {
        match m {
            ModeArg::InPlace => MigrationMode::InPlace,
            ModeArg::Copy => MigrationMode::Copy,
            ModeArg::Move => MigrationMode::Move,
        }
    }
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset
    /// flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        match &self.command {
            Some(Command::Rename { yes, dry_run, .. }) => {
                if *yes {
                    cfg.assume_yes = true;
                }
                if *dry_run {
                    cfg.dry_run = true;
                }
            }
            Some(Command::Recast { yes, .. }) => {
                if *yes {
                    cfg.assume_yes = true;
                }
            }
            _ => {}
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
