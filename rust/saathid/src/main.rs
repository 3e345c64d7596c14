mod backup;
mod calc;
mod config;
mod db;
mod enhance;
mod insight;
mod ipc;
mod model;
mod mutate;
mod query;
mod seed;
mod session;
mod store;

use clap::Parser;
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

fn init_tracing(filter: &str) {
    // stdout carries the protocol; diagnostics go to stderr.
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

fn main() {
    let config = config::Config::parse();
    init_tracing(&config.log_filter);

    let mut state = ipc::AppState::new(config.insight_engine(), config.enhancement_wait());
    if let Some(path) = config.workspace.clone() {
        if let Err(e) = state.open_workspace(&path) {
            tracing::error!(error = %e, "failed to open start-up workspace");
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                let resp = ipc::bad_json(&e.to_string());
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    state.shutdown();
}
