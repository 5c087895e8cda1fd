#![deny(unsafe_code)]
pub mod commands;
mod version;

use anyhow::Result;
use clap::Parser;
use clap::builder::styling::{AnsiColor, Effects, Styles};

/// Custom styles for CLI help output
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());
use commands::command::Command;
use commands::copy::CopyFile;
use commands::swap::Swap;
use enum_dispatch::enum_dispatch;
use env_logger::Env;
use fswap_lib::errors::PipelineError;
use log::info;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(styles = STYLES)]
struct Args {
    #[clap(subcommand)]
    subcommand: Subcommand,
}

#[enum_dispatch(Command)]
#[derive(Parser, Debug)]
#[command(version)]
enum Subcommand {
    #[command(display_order = 1)]
    Swap(Swap),
    #[command(display_order = 2)]
    Copy(CopyFile),
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    info!("Running fswap version {}", version::VERSION);
    if let Err(err) = args.subcommand.execute() {
        log::error!("{err:#}");
        // Pipeline errors carry a class-specific exit status so scripts
        // can distinguish failure modes.
        let code = err.downcast_ref::<PipelineError>().map_or(1, PipelineError::exit_code);
        std::process::exit(code);
    }
}
