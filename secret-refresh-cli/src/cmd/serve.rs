use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;

use secret_refresh_exec::{
    build_providers, serve, ProviderConfigError, ProvidersFile, ProxyConfig, ProxyState,
};

use crate::exit_codes;
use crate::logging;
use crate::output::print_error;
use crate::{ConfigArgs, LogArgs, OutputArgs, ServerArgs};

/// How long refresh loops get to notice shutdown before the process exits anyway.
const LOOP_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub async fn serve_cmd(
    config: ConfigArgs,
    server: ServerArgs,
    log: LogArgs,
    output: OutputArgs,
) -> i32 {
    logging::init(log.log_format);

    let providers = match load(&config).await {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "invalid provider configuration");
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::CONFIG_INVALID;
        }
    };

    let proxy_config = ProxyConfig {
        upstream_timeout: Duration::from_millis(server.upstream_timeout),
        max_request_bytes: server.max_request_bytes,
    };
    let state = match ProxyState::new(providers.registry().clone(), proxy_config) {
        Ok(s) => s,
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::RUNTIME_ERROR;
        }
    };

    let listener = match TcpListener::bind(server.listen).await {
        Ok(l) => l,
        Err(e) => {
            let msg = format!("failed to bind {}: {e}", server.listen);
            print_error(output.format, output.quiet, &msg);
            return exit_codes::RUNTIME_ERROR;
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let loops = match providers.spawn_refresh_loops(&shutdown_rx) {
        Ok(handles) => handles,
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::RUNTIME_ERROR;
        }
    };

    tracing::info!(
        listen = %server.listen,
        providers = ?providers.registry().names().collect::<Vec<_>>(),
        refresh_loops = loops.len(),
        "secret-refresh proxy listening"
    );

    let mut server_shutdown = shutdown_rx.clone();
    let signal = async move {
        let _ = server_shutdown.wait_for(|stop| *stop).await;
    };
    let ctrl_c = {
        let tx = shutdown_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                return;
            }
            tracing::info!("shutdown requested");
            let _ = tx.send(true);
        })
    };

    let served = serve(listener, state, signal).await;

    let _ = shutdown_tx.send(true);
    ctrl_c.abort();
    for handle in loops {
        if tokio::time::timeout(LOOP_SHUTDOWN_GRACE, handle).await.is_err() {
            tracing::warn!("refresh loop did not stop in time");
        }
    }

    match served {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server error");
            print_error(output.format, output.quiet, &e.to_string());
            exit_codes::RUNTIME_ERROR
        }
    }
}

async fn load(config: &ConfigArgs) -> Result<secret_refresh_exec::Providers, ProviderConfigError> {
    let file = ProvidersFile::from_path(&config.config)?;
    build_providers(&file).await
}
