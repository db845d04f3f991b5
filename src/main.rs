mod auth;
mod backup;
mod calc;
mod config;
mod db;
mod error;
mod export;
mod ipc;
mod logging;
mod model;
mod repo;
mod selfcheck;

use clap::Parser;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use auth::{Authenticator, StaticCredentials};
use config::Config;
use repo::SchoolRepository;

fn main() -> ExitCode {
    let cfg = Config::parse();
    logging::init_tracing(env!("CARGO_CRATE_NAME"), &cfg.log_level);

    if cfg.is_self_check() {
        let passed = selfcheck::run(&mut io::stdout());
        return if passed {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    let auth: Option<Box<dyn Authenticator>> = if cfg.no_login {
        None
    } else {
        Some(Box::new(StaticCredentials::new(
            cfg.admin_user.clone(),
            cfg.admin_password.clone(),
        )))
    };
    let mut state = ipc::AppState::new(auth);

    if let Some(workspace) = cfg.workspace.as_ref() {
        match SchoolRepository::open_workspace(workspace) {
            Ok(repo) => {
                state.workspace = Some(workspace.clone());
                state.repo = Some(repo);
            }
            Err(e) => {
                tracing::error!("failed to open workspace: {e:#}");
                return ExitCode::FAILURE;
            }
        }
    }

    tracing::info!(login = state.is_locked(), "session started");
    serve(&mut state);
    tracing::info!("session ended");
    ExitCode::SUCCESS
}

fn serve(state: &mut ipc::AppState) {
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
                // No id to answer to.
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() },
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        tracing::debug!(id = %req.id, method = %req.method, "request");
        let resp = ipc::handle_request(state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
