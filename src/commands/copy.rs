//! Copy a file through the processing engine.
//!
//! Streams the input through the same pipeline as `swap` but with the
//! engine in pass-through mode. Mostly useful for exercising the full
//! transfer path and measuring bandwidth with the discard flags.

use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;

use fswap_lib::pipeline::{self, PipelineConfig, PipelineMode};
use fswap_lib::validation::validate_file_exists;

use crate::commands::command::Command;
use crate::commands::common::TransferOptions;

/// Copy a file through the engine.
///
/// Streams INPUT to OUTPUT chunk by chunk with the engine passing each
/// buffer through unchanged. OUTPUT may equal INPUT for a self-copy.
#[derive(Debug, Parser)]
#[command(
    name = "copy",
    about = "Copy a file through the engine pipeline",
    long_about = r#"
Copy INPUT to OUTPUT through the full pipeline with the engine in
pass-through mode.

A distinct OUTPUT is truncated first; when OUTPUT equals INPUT the file
is rewritten in place. The discard flags measure stage bandwidth:
--read-discard drops buffers right after reading (engine and writers
never run), --write-discard drops them after engine completion.

EXAMPLES:

  # Plain copy
  fswap copy input.bin output.bin

  # Read-bandwidth measurement, capped at 1 GiB
  fswap copy --read-discard -l 1G input.bin output.bin
"#
)]
pub struct CopyFile {
    /// Source file.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Destination file. May equal INPUT.
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    #[clap(flatten)]
    pub transfer: TransferOptions,
}

impl Command for CopyFile {
    fn execute(&self) -> Result<()> {
        validate_file_exists(&self.input, "Input file")?;

        info!("Copying {} -> {}", self.input.display(), self.output.display());

        let config = PipelineConfig {
            input: self.input.clone(),
            output: self.output.clone(),
            mode: PipelineMode::Copy,
            chunk_size: self.transfer.chunk_size,
            read_limit: self.transfer.limit,
            read_threads: self.transfer.read_threads,
            write_threads: self.transfer.write_threads,
            queue_depth: self.transfer.queue_depth,
            read_discard: self.transfer.read_discard,
            write_discard: self.transfer.write_discard,
            print_offsets: false,
        };
        let report = pipeline::run(&config)?;
        report.log_summary();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_both_paths() {
        assert!(CopyFile::try_parse_from(["copy", "input.bin"]).is_err());
        let cmd = CopyFile::try_parse_from(["copy", "input.bin", "output.bin"]).unwrap();
        assert_eq!(cmd.input, PathBuf::from("input.bin"));
        assert_eq!(cmd.output, PathBuf::from("output.bin"));
    }

    #[test]
    fn test_copies_through_pipeline() {
        use std::io::Write;
        let mut input = tempfile::NamedTempFile::new().unwrap();
        input.write_all(&vec![0x5a; 4096]).unwrap();
        input.flush().unwrap();
        let output = tempfile::NamedTempFile::new().unwrap();

        let cmd = CopyFile::try_parse_from([
            "copy",
            input.path().to_str().unwrap(),
            output.path().to_str().unwrap(),
        ])
        .unwrap();
        cmd.execute().unwrap();
        assert_eq!(std::fs::read(output.path()).unwrap(), vec![0x5a; 4096]);
    }
}
