use serde::Serialize;

use secret_refresh_exec::ProvidersFile;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::{ConfigArgs, OutputArgs};

#[derive(Serialize)]
struct ProviderSummary {
    name: String,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct CheckResult {
    config: String,
    valid: bool,
    providers: Vec<ProviderSummary>,
}

pub fn check_cmd(config: ConfigArgs, output: OutputArgs) -> i32 {
    let file = match ProvidersFile::from_path(&config.config) {
        Ok(f) => f,
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::CONFIG_INVALID;
        }
    };
    if let Err(e) = file.validate() {
        print_error(output.format, output.quiet, &e.to_string());
        return exit_codes::CONFIG_INVALID;
    }

    let result = CheckResult {
        config: config.config.display().to_string(),
        valid: true,
        providers: file
            .providers
            .iter()
            .map(|(name, p)| ProviderSummary {
                name: name.clone(),
                kind: p.kind(),
            })
            .collect(),
    };

    if output.format == OutputFormat::Text && !output.quiet {
        println!("{}: ok", result.config);
        for p in &result.providers {
            println!("  {} ({})", p.name, p.kind);
        }
    } else {
        print_result(output.format, output.quiet, &result);
    }
    exit_codes::SUCCESS
}
