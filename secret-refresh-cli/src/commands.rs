use clap::Subcommand;

use crate::args::*;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the proxy and the provider refresh loops until interrupted.
    Serve {
        #[command(flatten)]
        config: ConfigArgs,
        #[command(flatten)]
        server: ServerArgs,
        #[command(flatten)]
        log: LogArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Validate a provider configuration file.
    Check {
        #[command(flatten)]
        config: ConfigArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Refresh one IAM provider's token once and exit.
    Refresh {
        #[command(flatten)]
        config: ConfigArgs,
        #[arg(long)]
        provider: String,
        #[command(flatten)]
        log: LogArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
}
