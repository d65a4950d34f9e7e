use serde::Serialize;

use secret_refresh_exec::config::ProviderConfig;
use secret_refresh_exec::{build_providers, ProvidersFile};

use crate::exit_codes;
use crate::logging;
use crate::output::{print_error, print_result, OutputFormat};
use crate::{ConfigArgs, LogArgs, OutputArgs};

#[derive(Serialize)]
struct RefreshResult {
    provider: String,
    path: String,
    refreshed: bool,
}

pub async fn refresh_cmd(
    config: ConfigArgs,
    provider: &str,
    log: LogArgs,
    output: OutputArgs,
) -> i32 {
    logging::init(log.log_format);

    let file = match ProvidersFile::from_path(&config.config) {
        Ok(f) => f,
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::CONFIG_INVALID;
        }
    };
    match file.providers.get(provider) {
        Some(ProviderConfig::AwsIamAuthRds(_)) => {}
        Some(other) => {
            let msg = format!(
                "provider {provider} has type {}, only aws_iam_auth_rds providers can be refreshed",
                other.kind()
            );
            print_error(output.format, output.quiet, &msg);
            return exit_codes::CONFIG_INVALID;
        }
        None => {
            let msg = format!("provider {provider} is not declared in the config");
            print_error(output.format, output.quiet, &msg);
            return exit_codes::CONFIG_INVALID;
        }
    }

    let providers = match build_providers(&file).await {
        Ok(p) => p,
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::CONFIG_INVALID;
        }
    };
    let Some(iam) = providers.iam_provider(provider) else {
        let msg = format!("provider {provider} is not an IAM provider");
        print_error(output.format, output.quiet, &msg);
        return exit_codes::CONFIG_INVALID;
    };

    if let Err(e) = iam.refresh().await {
        tracing::error!(provider, error = %e, "on-demand refresh failed");
        print_error(output.format, output.quiet, &e.to_string());
        return exit_codes::REFRESH_FAILED;
    }

    let result = RefreshResult {
        provider: provider.to_string(),
        path: iam.cache_path().display().to_string(),
        refreshed: true,
    };
    if output.format == OutputFormat::Text && !output.quiet {
        println!("refreshed {} -> {}", result.provider, result.path);
    } else {
        print_result(output.format, output.quiet, &result);
    }
    exit_codes::SUCCESS
}
