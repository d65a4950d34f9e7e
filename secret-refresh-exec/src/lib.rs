#![forbid(unsafe_code)]

//! Runtime side of the secret-refresh proxy: credential providers, the
//! IAM-token refresh loop, request rewriting and the HTTP forwarder.

pub mod config;
pub mod iam;
pub mod proxy;
pub mod registry;
pub mod rewrite;
pub mod secrets;

pub use crate::config::{
    assemble_providers, build_providers, ProviderConfig, ProviderConfigError, Providers,
    ProvidersFile,
};
pub use crate::iam::{IamTokenConfig, IamTokenProvider, RefreshError};
pub use crate::proxy::{router, serve, ProxyConfig, ProxyError, ProxyState};
pub use crate::registry::{ProviderRegistry, RegistryBuilder, RegistryError};
pub use crate::rewrite::{rewrite_request, strip_reserved_headers, RewriteDecision, RewriteError};
pub use crate::secrets::{SecretError, SecretValue, SecretsProvider};
