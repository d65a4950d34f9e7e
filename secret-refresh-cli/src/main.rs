use clap::Parser;

mod args;
mod cmd;
mod commands;
mod exit_codes;
mod logging;
mod output;

pub use args::*;
use commands::Command;

#[derive(Debug, Parser)]
#[command(name = "secret-refresh", version, about = "Secret-injecting reverse proxy")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {e}");
            std::process::exit(exit_codes::RUNTIME_ERROR);
        }
    };

    let exit_code = rt.block_on(run_command(cli.command));
    std::process::exit(exit_code);
}

async fn run_command(command: Command) -> i32 {
    match command {
        Command::Serve {
            config,
            server,
            log,
            output,
        } => cmd::serve::serve_cmd(config, server, log, output).await,
        Command::Check { config, output } => cmd::check::check_cmd(config, output),
        Command::Refresh {
            config,
            provider,
            log,
            output,
        } => cmd::refresh::refresh_cmd(config, &provider, log, output).await,
    }
}
