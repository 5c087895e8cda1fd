//! Input validation utilities
//!
//! Common validation functions for command-line parameters with
//! consistent error messages, built on the structured error types from
//! [`crate::errors`].

use std::path::Path;

use crate::chunker::{ENGINE_ALIGN, MAX_CHUNK_SIZE};
use crate::engine::software::MAX_NEEDLE_LEN;
use crate::errors::{PipelineError, Result};

/// Validate that a file exists
///
/// # Arguments
/// * `path` - Path to validate
/// * `description` - Human-readable description of the file (e.g., "Input file")
///
/// # Errors
/// Returns an error if the file does not exist
///
/// # Example
/// ```
/// use fswap_lib::validation::validate_file_exists;
///
/// let result = validate_file_exists("/nonexistent/input", "Input file");
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        return Err(PipelineError::Config {
            parameter: description.to_string(),
            reason: format!("file does not exist: {}", path_ref.display()),
        });
    }
    Ok(())
}

/// Validate a search or replacement phrase against the engine's match
/// register width.
///
/// # Errors
/// Returns an error if the phrase is empty or longer than
/// [`MAX_NEEDLE_LEN`] bytes
///
/// # Example
/// ```
/// use fswap_lib::validation::validate_phrase;
///
/// validate_phrase("GoPower8", "search phrase").unwrap();
/// assert!(validate_phrase("", "search phrase").is_err());
/// assert!(validate_phrase("seventeen bytes..", "search phrase").is_err());
/// ```
pub fn validate_phrase<'a>(phrase: &'a str, name: &str) -> Result<&'a [u8]> {
    let bytes = phrase.as_bytes();
    if bytes.is_empty() || bytes.len() > MAX_NEEDLE_LEN {
        return Err(PipelineError::Config {
            parameter: name.to_string(),
            reason: format!(
                "must be 1 to {MAX_NEEDLE_LEN} bytes, got {} bytes: '{phrase}'",
                bytes.len()
            ),
        });
    }
    Ok(bytes)
}

/// Validate a chunk size: positive, a multiple of the engine alignment,
/// and no larger than the engine's transfer ceiling.
///
/// # Errors
/// Returns an error for zero, misaligned, or oversized values
pub fn validate_chunk_size(chunk_size: usize, name: &str) -> Result<usize> {
    if chunk_size == 0 || chunk_size % ENGINE_ALIGN != 0 {
        return Err(PipelineError::Config {
            parameter: name.to_string(),
            reason: format!("must be a positive multiple of {ENGINE_ALIGN}, got: {chunk_size}"),
        });
    }
    if chunk_size > MAX_CHUNK_SIZE {
        return Err(PipelineError::Config {
            parameter: name.to_string(),
            reason: format!("must be at most {MAX_CHUNK_SIZE}, got: {chunk_size}"),
        });
    }
    Ok(chunk_size)
}

/// Parse a byte-count string with optional K/M/G suffix (binary units).
///
/// # Errors
/// Returns an error for an empty string, unknown suffix, non-numeric
/// value, or overflow
///
/// # Example
/// ```
/// use fswap_lib::validation::parse_size;
///
/// assert_eq!(parse_size("8192", "chunk-size").unwrap(), 8192);
/// assert_eq!(parse_size("64K", "chunk-size").unwrap(), 64 * 1024);
/// assert_eq!(parse_size("2g", "limit").unwrap(), 2 * 1024 * 1024 * 1024);
/// assert!(parse_size("12Q", "limit").is_err());
/// ```
pub fn parse_size(value: &str, name: &str) -> Result<u64> {
    let invalid = |reason: String| PipelineError::Config { parameter: name.to_string(), reason };

    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid("size must not be empty".to_string()));
    }

    let (digits, multiplier) = match trimmed.as_bytes()[trimmed.len() - 1].to_ascii_lowercase() {
        b'k' => (&trimmed[..trimmed.len() - 1], 1u64 << 10),
        b'm' => (&trimmed[..trimmed.len() - 1], 1u64 << 20),
        b'g' => (&trimmed[..trimmed.len() - 1], 1u64 << 30),
        b'0'..=b'9' => (trimmed, 1u64),
        other => {
            return Err(invalid(format!("unknown size suffix '{}'", char::from(other))));
        }
    };

    let base: u64 = digits
        .parse()
        .map_err(|_| invalid(format!("invalid size value: '{value}'")))?;
    base.checked_mul(multiplier)
        .ok_or_else(|| invalid(format!("size overflows 64 bits: '{value}'")))
}
