use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Serve JSON requests on stdin/stdout.
    Run,
    /// Run the built-in checks and exit.
    Test,
}

#[derive(Debug, Parser, Clone)]
#[command(name = "schoold", version, about = "School records sidecar")]
pub struct Config {
    #[arg(value_enum, default_value_t = Mode::Run)]
    pub mode: Mode,

    /// Same as the `test` mode.
    #[arg(long)]
    pub self_check: bool,

    /// Workspace to open at startup. Failing to open it aborts the process.
    #[arg(long, env = "SCHOOLD_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    #[arg(long, env = "SCHOOLD_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "SCHOOLD_ADMIN_USER", default_value = "admin")]
    pub admin_user: String,

    #[arg(long, env = "SCHOOLD_ADMIN_PASSWORD", default_value = "123", hide_env_values = true)]
    pub admin_password: String,

    /// Skip the login gate.
    #[arg(long)]
    pub no_login: bool,
}

impl Config {
    pub fn is_self_check(&self) -> bool {
        self.self_check || self.mode == Mode::Test
    }
}
