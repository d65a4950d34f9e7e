use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Args;

use crate::logging::LogFormat;
use crate::output::OutputFormat;

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ConfigArgs {
    /// Provider configuration file (YAML or JSON).
    #[arg(long, env = "SECRET_REFRESH_CONFIG")]
    pub config: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct LogArgs {
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "SECRET_REFRESH_LOG_FORMAT")]
    pub log_format: LogFormat,
}

#[derive(Debug, Args, Clone)]
pub struct ServerArgs {
    #[arg(long, default_value = "127.0.0.1:8080", env = "SECRET_REFRESH_LISTEN")]
    pub listen: SocketAddr,
    /// Upstream request timeout in milliseconds.
    #[arg(long, default_value_t = 30000)]
    pub upstream_timeout: u64,
    #[arg(long, default_value_t = 10 * 1024 * 1024)]
    pub max_request_bytes: usize,
}
