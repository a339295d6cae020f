use clap::Parser;
use std::{env, path::PathBuf};

use crate::simulator::SimulatorOptions;

#[derive(Debug, Clone, Parser)]
#[command(name = "sim86", version, about)]
pub struct Args {
    /// Trace to simulate: one `mov`/`add`/`sub`/`cmp` per line with optional
    /// `;` expectations, optionally ending in a `Final registers:` block.
    pub script: PathBuf,

    /// Log filter (tracing-subscriber EnvFilter syntax).
    ///
    /// Falls back to `RUST_LOG`, then `info`.
    ///
    /// Environment variable: `SIM86_LOG`.
    #[arg(long, env = "SIM86_LOG")]
    pub log_level: Option<String>,

    /// Log the register dump after every executed line.
    #[arg(long)]
    pub dump_each: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub script: PathBuf,
    pub log_level: String,
    pub options: SimulatorOptions,
}

impl Config {
    pub fn load() -> Self {
        Self::from_args(Args::parse())
    }

    pub fn from_args(args: Args) -> Self {
        let log_level = args
            .log_level
            .or_else(|| env::var("RUST_LOG").ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "info".to_string());

        Self {
            script: args.script,
            log_level,
            options: SimulatorOptions {
                dump_each: args.dump_each,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_log_level_wins() {
        let args = Args::try_parse_from(["sim86", "trace.txt", "--log-level", "debug", "--dump-each"]).unwrap();
        let config = Config::from_args(args);
        assert_eq!(config.script, PathBuf::from("trace.txt"));
        assert_eq!(config.log_level, "debug");
        assert!(config.options.dump_each);
    }

    #[test]
    fn blank_log_level_is_ignored() {
        let args = Args {
            script: PathBuf::from("trace.txt"),
            log_level: Some("  ".to_string()),
            dump_each: false,
        };
        let config = Config::from_args(args);
        assert_ne!(config.log_level.trim(), "");
        assert!(!config.options.dump_each);
    }

    #[test]
    fn script_is_required() {
        assert!(Args::try_parse_from(["sim86"]).is_err());
    }
}
