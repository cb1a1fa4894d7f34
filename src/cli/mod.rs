//! CLI definitions.

use crate::config::CliOverrides;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Issue tracking REST API (`SQLite`)
#[derive(Parser, Debug)]
#[command(name = "issue-tracker", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// YAML config file (defaults to ./issues.yaml when present)
    #[arg(long, global = true, env = "ISSUES_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:8000
    #[arg(long, global = true)]
    pub bind: Option<String>,

    /// Database path or sqlite:/// URL
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Number of read-only database connections
    #[arg(long, global = true)]
    pub read_pool_size: Option<usize>,

    /// `SQLite` busy timeout in ms
    #[arg(long, global = true)]
    pub busy_timeout_ms: Option<u64>,

    /// Page size for list requests without `limit`
    #[arg(long, global = true)]
    pub default_limit: Option<usize>,

    /// Largest `limit` a list request may ask for
    #[arg(long, global = true)]
    pub max_limit: Option<usize>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,
    /// Print the `OpenAPI` document to stdout and exit
    Openapi,
}

impl Cli {
    /// Flag values as the highest-precedence config layer.
    ///
    /// `--log-json` is a switch, so only its presence overrides lower layers.
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            bind: self.bind.clone(),
            db: self.db.clone(),
            read_pool_size: self.read_pool_size,
            busy_timeout_ms: self.busy_timeout_ms,
            default_limit: self.default_limit,
            max_limit: self.max_limit,
            log_json: self.log_json.then_some(true),
        }
    }

    /// The subcommand to run, `serve` when none was given.
    #[must_use]
    pub fn selected(&self) -> Commands {
        self.command.unwrap_or(Commands::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_to_serve_with_no_overrides() {
        let cli = Cli::parse_from(["issue-tracker"]);
        assert_eq!(cli.selected(), Commands::Serve);
        let overrides = cli.overrides();
        assert!(overrides.bind.is_none());
        assert!(overrides.log_json.is_none());
    }

    #[test]
    fn flags_become_overrides() {
        let cli = Cli::parse_from([
            "issue-tracker",
            "--bind",
            "127.0.0.1:9999",
            "--db",
            "/tmp/x.db",
            "--read-pool-size",
            "2",
            "--log-json",
            "-vv",
            "openapi",
        ]);
        assert_eq!(cli.selected(), Commands::Openapi);
        assert_eq!(cli.verbose, 2);
        let overrides = cli.overrides();
        assert_eq!(overrides.bind.as_deref(), Some("127.0.0.1:9999"));
        assert_eq!(overrides.db, Some(PathBuf::from("/tmp/x.db")));
        assert_eq!(overrides.read_pool_size, Some(2));
        assert_eq!(overrides.log_json, Some(true));
    }
}
