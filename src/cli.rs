//! Command-line interface definitions for treehardlink.
//!
//! Flags that have a configuration counterpart are optional here; when given
//! they override the config file and environment (see [`crate::config`]).
//!
//! # Example
//!
//! ```bash
//! # Inventory three snapshots and list same-path, same-size candidates
//! treehardlink /backup/daily.0 /backup/daily.1 /backup/daily.2
//!
//! # Group by size only, above 1 MiB, as JSON
//! treehardlink --group-by size --min-size 1MiB --output json /backup/*
//!
//! # Verbose mode for debugging
//! treehardlink -v /backup/daily.0
//! ```

use std::path::PathBuf;

use clap::Parser;

use crate::duplicates::GroupingStrategy;
use crate::output::OutputFormat;
use crate::scanner::RelativePathMode;

/// Find files across snapshot trees that could be hardlinked together.
///
/// Every regular file under the given directories is statted into an inventory
/// keyed by inode. Distinct inodes that share a relative path and/or size are
/// reported as hardlink candidates. Contents are never compared.
#[derive(Debug, Parser)]
#[command(name = "treehardlink")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Snapshot directories to inventory
    #[arg(value_name = "DIR", required = true)]
    pub dirs: Vec<PathBuf>,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print errors as JSON objects on stderr
    #[arg(long)]
    pub json_errors: bool,

    /// Additional TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Inventory database file (recreated on every run)
    #[arg(long, value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Only files larger than this are candidates (e.g., 10KiB, 1MB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Attributes that must match for files to be grouped
    #[arg(long, value_enum, value_name = "KEY")]
    pub group_by: Option<GroupingStrategy>,

    /// Report format
    #[arg(short, long, value_enum, value_name = "FORMAT")]
    pub output: Option<OutputFormat>,

    /// Number of threads statting files
    #[arg(long, value_name = "N")]
    pub stat_threads: Option<usize>,

    /// How relative paths are derived from each directory
    #[arg(long, value_enum, value_name = "MODE")]
    pub relative_paths: Option<RelativePathMode>,

    /// Follow symbolic links during the walk
    ///
    /// Warning: the same inode may then be counted once per link.
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use treehardlink::cli::parse_size;
///
/// assert_eq!(parse_size("10240").unwrap(), 10_240);
/// assert_eq!(parse_size("10KiB").unwrap(), 10_240);
/// assert_eq!(parse_size("1MB").unwrap(), 1_000_000);
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok((num * multiplier as f64) as u64)
}
