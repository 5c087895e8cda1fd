/// Version reported by `--version` and the startup log line.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
