//! Provider configuration file and the factory that turns it into a registry.
//!
//! ```yaml
//! providers:
//!   rds:
//!     type: aws_iam_auth_rds
//!     region: us-east-1
//!     db_host: mydb.example.us-east-1.rds.amazonaws.com
//!     db_port: 5432
//!     db_user: app
//!     db_name: app
//!     path: /var/run/secret-refresh/rds-token
//!   dev:
//!     type: static
//!     secrets:
//!       s1: tok123
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::iam::{
    IamConfigError, IamTokenConfig, IamTokenProvider, PostgresVerifier, RefreshError, TokenMinter,
    DEFAULT_MINT_TIMEOUT, DEFAULT_REFRESH_INTERVAL, DEFAULT_TOKEN_TTL, DEFAULT_VERIFY_TIMEOUT,
};
use crate::registry::{ProviderRegistry, RegistryError};
use crate::secrets::{
    EnvSecretsProvider, FileSecretsProvider, SecretsProvider, StaticSecretsProvider,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidersFile {
    pub providers: BTreeMap<String, ProviderConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    AwsIamAuthRds(AwsIamAuthRdsConfig),
    Env(EnvProviderConfig),
    File(FileProviderConfig),
    Static(StaticProviderConfig),
}

impl ProviderConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AwsIamAuthRds(_) => "aws_iam_auth_rds",
            Self::Env(_) => "env",
            Self::File(_) => "file",
            Self::Static(_) => "static",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AwsIamAuthRdsConfig {
    pub region: String,
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_name: String,
    /// Cache file for the latest verified token.
    pub path: PathBuf,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    #[serde(default = "default_mint_timeout_secs")]
    pub mint_timeout_secs: u64,
    #[serde(default = "default_verify_timeout_secs")]
    pub verify_timeout_secs: u64,
}

impl AwsIamAuthRdsConfig {
    pub fn to_iam_config(&self) -> IamTokenConfig {
        IamTokenConfig::new(
            self.region.clone(),
            self.db_host.clone(),
            self.db_port,
            self.db_user.clone(),
            self.db_name.clone(),
            self.path.clone(),
        )
        .with_refresh_interval(Duration::from_secs(self.refresh_interval_secs))
        .with_token_ttl(Duration::from_secs(self.token_ttl_secs))
        .with_timeouts(
            Duration::from_secs(self.mint_timeout_secs),
            Duration::from_secs(self.verify_timeout_secs),
        )
    }
}

fn default_refresh_interval_secs() -> u64 {
    DEFAULT_REFRESH_INTERVAL.as_secs()
}

fn default_token_ttl_secs() -> u64 {
    DEFAULT_TOKEN_TTL.as_secs()
}

fn default_mint_timeout_secs() -> u64 {
    DEFAULT_MINT_TIMEOUT.as_secs()
}

fn default_verify_timeout_secs() -> u64 {
    DEFAULT_VERIFY_TIMEOUT.as_secs()
}

/// Only variables starting with `prefix` are reachable; an empty prefix is
/// rejected by [`ProvidersFile::validate`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvProviderConfig {
    #[serde(default)]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileProviderConfig {
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticProviderConfig {
    #[serde(default)]
    pub secrets: BTreeMap<String, SecretString>,
}

impl ProvidersFile {
    pub fn from_path(path: &Path) -> Result<Self, ProviderConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ProviderConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str_auto(&content)
    }

    /// Parse JSON or YAML, whichever the content is.
    pub fn from_str_auto(content: &str) -> Result<Self, ProviderConfigError> {
        if content.trim_start().starts_with('{') {
            return serde_json::from_str(content)
                .map_err(|e| ProviderConfigError::Parse(e.to_string()));
        }
        serde_yaml::from_str(content).map_err(|e| ProviderConfigError::Parse(e.to_string()))
    }

    pub fn has_iam_providers(&self) -> bool {
        self.providers
            .values()
            .any(|p| matches!(p, ProviderConfig::AwsIamAuthRds(_)))
    }

    /// Check every provider before anything is constructed.
    pub fn validate(&self) -> Result<(), ProviderConfigError> {
        if self.providers.is_empty() {
            return Err(ProviderConfigError::NoProviders);
        }

        let mut cache_paths: BTreeMap<&Path, &str> = BTreeMap::new();
        for (name, provider) in &self.providers {
            if name.trim().is_empty() {
                return Err(RegistryError::EmptyName.into());
            }
            match provider {
                ProviderConfig::AwsIamAuthRds(c) => {
                    c.to_iam_config()
                        .validate()
                        .map_err(|source| ProviderConfigError::Iam {
                            name: name.clone(),
                            source,
                        })?;
                    if let Some(first) = cache_paths.insert(&c.path, name) {
                        return Err(ProviderConfigError::SharedCachePath {
                            path: c.path.clone(),
                            first: first.to_string(),
                            second: name.clone(),
                        });
                    }
                }
                ProviderConfig::File(c) if c.base_dir.as_os_str().is_empty() => {
                    return Err(ProviderConfigError::Invalid {
                        name: name.clone(),
                        message: "base_dir must not be empty".to_string(),
                    });
                }
                ProviderConfig::Env(c)
                    if c.prefix.as_deref().map_or(true, |p| p.trim().is_empty()) =>
                {
                    return Err(ProviderConfigError::Invalid {
                        name: name.clone(),
                        message: "prefix must not be empty".to_string(),
                    });
                }
                ProviderConfig::File(_) | ProviderConfig::Env(_) | ProviderConfig::Static(_) => {}
            }
        }
        Ok(())
    }
}

/// Providers built from a [`ProvidersFile`].
pub struct Providers {
    registry: ProviderRegistry,
    iam: BTreeMap<String, Arc<IamTokenProvider>>,
}

impl Providers {
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn iam_provider(&self, name: &str) -> Option<&Arc<IamTokenProvider>> {
        self.iam.get(name)
    }

    pub fn iam_providers(&self) -> impl Iterator<Item = &Arc<IamTokenProvider>> {
        self.iam.values()
    }

    /// Start one refresh loop per IAM provider.
    pub fn spawn_refresh_loops(
        &self,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<Vec<JoinHandle<()>>, RefreshError> {
        self.iam
            .values()
            .map(|p| p.spawn(shutdown.clone()))
            .collect()
    }
}

/// Validate `file` and build every provider, using the default identity
/// service client for IAM providers.
pub async fn build_providers(file: &ProvidersFile) -> Result<Providers, ProviderConfigError> {
    file.validate()?;
    let minter = if file.has_iam_providers() {
        Some(default_minter(file).await?)
    } else {
        None
    };
    assemble_providers(file, minter)
}

/// Build every provider with an explicit identity service client.
pub fn assemble_providers(
    file: &ProvidersFile,
    minter: Option<Arc<dyn TokenMinter>>,
) -> Result<Providers, ProviderConfigError> {
    file.validate()?;

    let mut builder = ProviderRegistry::builder();
    let mut iam = BTreeMap::new();
    for (name, config) in &file.providers {
        let provider: Arc<dyn SecretsProvider> = match config {
            ProviderConfig::AwsIamAuthRds(c) => {
                let minter = minter
                    .clone()
                    .ok_or_else(|| ProviderConfigError::NoMinter { name: name.clone() })?;
                let iam_config = c.to_iam_config();
                let verifier = Arc::new(PostgresVerifier::from_config(&iam_config));
                let provider = IamTokenProvider::new(name.clone(), iam_config, minter, verifier)
                    .map_err(|source| ProviderConfigError::Iam {
                        name: name.clone(),
                        source,
                    })?;
                let provider = Arc::new(provider);
                iam.insert(name.clone(), Arc::clone(&provider));
                provider
            }
            ProviderConfig::Env(c) => Arc::new(EnvSecretsProvider {
                env_prefix: c.prefix.clone(),
            }),
            ProviderConfig::File(c) => Arc::new(FileSecretsProvider::new(c.base_dir.clone())),
            ProviderConfig::Static(c) => Arc::new(c.secrets.iter().fold(
                StaticSecretsProvider::new(),
                |p, (id, value)| p.with_secret(id.clone(), value.expose_secret()),
            )),
        };
        builder = builder.register(name.clone(), provider)?;
        tracing::debug!(provider = %name, kind = config.kind(), "registered provider");
    }

    Ok(Providers {
        registry: builder.build(),
        iam,
    })
}

#[cfg(feature = "aws-iam")]
async fn default_minter(
    _file: &ProvidersFile,
) -> Result<Arc<dyn TokenMinter>, ProviderConfigError> {
    Ok(Arc::new(crate::iam::RdsAuthTokenMinter::from_env().await))
}

#[cfg(not(feature = "aws-iam"))]
async fn default_minter(
    file: &ProvidersFile,
) -> Result<Arc<dyn TokenMinter>, ProviderConfigError> {
    let name = file
        .providers
        .iter()
        .find(|(_, p)| matches!(p, ProviderConfig::AwsIamAuthRds(_)))
        .map(|(n, _)| n.clone())
        .unwrap_or_default();
    Err(ProviderConfigError::FeatureDisabled {
        name,
        kind: "aws_iam_auth_rds",
        feature: "aws-iam",
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("config declares no providers")]
    NoProviders,
    #[error("provider {name}: {source}")]
    Iam {
        name: String,
        #[source]
        source: IamConfigError,
    },
    #[error("provider {name}: {message}")]
    Invalid { name: String, message: String },
    #[error("providers {first} and {second} share the cache path {}", .path.display())]
    SharedCachePath {
        path: PathBuf,
        first: String,
        second: String,
    },
    #[error("provider {name} needs an identity service client")]
    NoMinter { name: String },
    #[error("provider {name} has type {kind}, which requires the `{feature}` feature")]
    FeatureDisabled {
        name: String,
        kind: &'static str,
        feature: &'static str,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
