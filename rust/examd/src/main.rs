mod backup;
mod calc;
mod config;
mod db;
mod gate;
mod import;
mod ipc;
mod model;
mod sheet;
mod store;
mod telemetry;
mod text;

use clap::Parser;
use std::io::{self, BufRead, Write};

fn main() -> anyhow::Result<()> {
    let cfg = config::Config::parse();
    telemetry::init_tracing(cfg.log_json, cfg.log_level);

    let mut state = ipc::AppState::default();
    if let Some(path) = cfg.workspace.clone() {
        // A bad startup workspace is not fatal; the host can still select one.
        if let Err(e) = state.open_workspace(path.clone(), cfg.seed_defaults) {
            tracing::error!(workspace = %path.display(), error = %format!("{e:#}"), "failed to open workspace");
        }
    }
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "examd ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            // No id to reply to.
            Err(e) => ipc::err("", "bad_json", e.to_string(), None),
        };
        writeln!(stdout, "{}", resp)?;
        stdout.flush()?;
    }
    Ok(())
}
