//! CLI command implementations for fswap.
//!
//! Each submodule implements one subcommand:
//!
//! - [`swap`] - Search and replace a phrase across a file in place
//! - [`copy`] - Copy a file through the engine pipeline

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unused_self,
    clippy::needless_pass_by_value,
    clippy::must_use_candidate,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

pub mod command;
pub mod common;
pub mod copy;
pub mod swap;
