//! Logging setup for the CLI.
//!
//! Logs go to stderr so stdout stays clean for the JSON and package text
//! the subcommands print.

use std::io::IsTerminal;
use std::sync::Once;

use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Initializes the tracing subscriber. `RUST_LOG` overrides the default
/// level. Safe to call more than once.
pub fn init(verbose: bool) {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let default_level = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
        let env_filter = EnvFilter::builder()
            .with_default_directive(default_level.into())
            .from_env_lossy();

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .with_target(false)
            .init();
    });
}
