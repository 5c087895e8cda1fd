//! Search for a fixed phrase in a file and replace every occurrence in
//! place.
//!
//! The file is streamed through the processing engine in aligned chunks:
//! parallel readers feed a reorder buffer, the engine scans each chunk in
//! strict file order (so matches straddling chunk boundaries are still
//! found), and parallel writers overwrite each match with the replacement
//! phrase at its absolute offset.

use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;

use fswap_lib::errors::PipelineError;
use fswap_lib::logging::format_count;
use fswap_lib::pipeline::{self, PipelineConfig, PipelineMode};
use fswap_lib::validation::{validate_file_exists, validate_phrase};

use crate::commands::command::Command;
use crate::commands::common::TransferOptions;

/// Search and replace a phrase across a file.
///
/// Scans the file for a fixed phrase of up to 16 bytes and overwrites
/// each occurrence with the replacement phrase, in place. Matches that
/// straddle chunk boundaries are found; overlapping occurrences are each
/// replaced.
#[derive(Debug, Parser)]
#[command(
    name = "swap",
    about = "Search and replace a fixed phrase across a file in place",
    long_about = r#"
Search a file for a fixed phrase and overwrite every occurrence with a
replacement phrase, in place.

Both phrases are limited to 16 bytes, the width of the engine's match
register. The file is processed in aligned chunks by parallel reader and
writer threads; chunks pass through the engine in strict file order, so
matches that straddle a chunk boundary are still found.

EXAMPLES:

  # Replace the default phrase pair
  fswap swap data.bin

  # Custom phrases, counting only
  fswap swap -s 'hello' -r 'world' --count-only data.bin

  # Fail with a distinct exit status unless exactly 42 matches are found
  fswap swap -E 42 data.bin

  # Print every match offset
  fswap swap -v data.bin
"#
)]
pub struct Swap {
    /// File to search and modify in place.
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Phrase to search for (1-16 bytes).
    #[arg(short = 's', long = "search", default_value = "GoPower8")]
    pub search: String,

    /// Phrase written over each match (1-16 bytes).
    #[arg(short = 'r', long = "replace", default_value = "Power8Go")]
    pub replace: String,

    /// Count matches without modifying the file.
    #[arg(short = 'c', long = "count-only")]
    pub count_only: bool,

    /// Fail unless exactly this many matches are found.
    #[arg(short = 'E', long = "expected")]
    pub expected: Option<u64>,

    /// Print the absolute offset of every match.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[clap(flatten)]
    pub transfer: TransferOptions,
}

impl Command for Swap {
    fn execute(&self) -> Result<()> {
        validate_file_exists(&self.input, "Input file")?;
        let needle = validate_phrase(&self.search, "search phrase")?.to_vec();
        let replacement = validate_phrase(&self.replace, "replacement phrase")?.to_vec();

        info!(
            "Swapping '{}' -> '{}' in {}",
            self.search,
            self.replace,
            self.input.display()
        );

        let config = PipelineConfig {
            input: self.input.clone(),
            output: self.input.clone(),
            mode: PipelineMode::Swap { needle, replacement, search_only: self.count_only },
            chunk_size: self.transfer.chunk_size,
            read_limit: self.transfer.limit,
            read_threads: self.transfer.read_threads,
            write_threads: self.transfer.write_threads,
            queue_depth: self.transfer.queue_depth,
            read_discard: self.transfer.read_discard,
            write_discard: self.transfer.write_discard,
            print_offsets: self.verbose > 0,
        };
        let report = pipeline::run(&config)?;

        let verb = if self.count_only { "Found" } else { "Replaced" };
        match self.expected {
            Some(expected) if expected != report.matches => {
                info!("Matches {verb}: {} (Bad!)", format_count(report.matches));
                return Err(
                    PipelineError::MatchMismatch { expected, actual: report.matches }.into()
                );
            }
            Some(_) => info!("Matches {verb}: {} (Good)", format_count(report.matches)),
            None => info!("Matches {verb}: {}", format_count(report.matches)),
        }
        report.log_summary();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_phrases() {
        let cmd = Swap::try_parse_from(["swap", "data.bin"]).unwrap();
        assert_eq!(cmd.search, "GoPower8");
        assert_eq!(cmd.replace, "Power8Go");
        assert_eq!(cmd.transfer.chunk_size, 8192);
        assert!(!cmd.count_only);
        assert_eq!(cmd.expected, None);
    }

    #[test]
    fn test_custom_arguments() {
        let cmd = Swap::try_parse_from([
            "swap", "-s", "hello", "-r", "world", "-E", "3", "-b", "64K", "-v", "data.bin",
        ])
        .unwrap();
        assert_eq!(cmd.search, "hello");
        assert_eq!(cmd.replace, "world");
        assert_eq!(cmd.expected, Some(3));
        assert_eq!(cmd.transfer.chunk_size, 64 * 1024);
        assert_eq!(cmd.verbose, 1);
    }

    #[test]
    fn test_discard_flags_conflict() {
        let result =
            Swap::try_parse_from(["swap", "--read-discard", "--write-discard", "data.bin"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_misaligned_chunk_size_rejected() {
        let result = Swap::try_parse_from(["swap", "-b", "1000", "data.bin"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_overlong_phrase_fails_execute() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        let cmd = Swap::try_parse_from(["swap", "-s", "seventeen bytes..", path]).unwrap();
        let err = cmd.execute().unwrap_err();
        assert!(err.to_string().contains("1 to 16 bytes"));
    }
}
