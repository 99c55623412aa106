use clap::Parser;
use std::path::PathBuf;
use tracing::Level;

/// Sidecar for the exam results portal. Reads one JSON request per line on
/// stdin and answers on stdout.
#[derive(Debug, Clone, Parser)]
#[command(name = "examd", version, about)]
pub struct Config {
    /// Open this workspace directory on startup.
    #[arg(long, env = "EXAMD_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Log level when RUST_LOG is unset.
    #[arg(long, env = "EXAMD_LOG", default_value = "info")]
    pub log_level: Level,

    /// Emit logs as JSON lines.
    #[arg(long, env = "EXAMD_LOG_JSON", default_value_t = false)]
    pub log_json: bool,

    /// Seed the default certificate type, sections and subjects into an
    /// empty workspace.
    #[arg(long, env = "EXAMD_SEED_DEFAULTS", default_value_t = false)]
    pub seed_defaults: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_flags() {
        let cfg = Config::try_parse_from(["examd"]).expect("parse");
        assert!(cfg.workspace.is_none());
        assert_eq!(cfg.log_level, Level::INFO);
        assert!(!cfg.log_json);
        assert!(!cfg.seed_defaults);
    }

    #[test]
    fn flags_override_defaults() {
        let cfg = Config::try_parse_from([
            "examd",
            "--workspace",
            "/tmp/ws",
            "--log-level",
            "debug",
            "--log-json",
            "--seed-defaults",
        ])
        .expect("parse");
        assert_eq!(cfg.workspace, Some(PathBuf::from("/tmp/ws")));
        assert_eq!(cfg.log_level, Level::DEBUG);
        assert!(cfg.log_json);
        assert!(cfg.seed_defaults);
    }
}
