//! IAM-token credential provider.
//!
//! A provider instance mints short-lived database auth tokens from an identity
//! service, verifies each one against the target database and publishes it to
//! a lock-protected, file-backed slot. Request handling only ever reads the
//! slot through [`SecretsProvider::get`](crate::secrets::SecretsProvider::get).

mod config;
mod minter;
mod provider;
mod slot;
mod verifier;

#[cfg(feature = "aws-iam")]
mod aws;

pub use config::{
    IamConfigError, IamTokenConfig, DEFAULT_MINT_TIMEOUT, DEFAULT_REFRESH_INTERVAL,
    DEFAULT_TOKEN_TTL, DEFAULT_VERIFY_TIMEOUT, MAX_TOKEN_TTL,
};
pub use minter::{MintError, TokenMinter, TokenTarget};
pub use provider::{IamTokenProvider, RefreshError};
pub use slot::TokenSlot;
pub use verifier::{PostgresVerifier, TokenVerifier, VerifyError};

#[cfg(feature = "aws-iam")]
pub use aws::RdsAuthTokenMinter;
