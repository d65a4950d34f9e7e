//! RDS IAM auth token minting.
//!
//! Enabled via the `aws-iam` feature. Credentials come from the default AWS
//! provider chain (env vars, profile, instance metadata, etc.).

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_rds::auth_token::{AuthTokenGenerator, Config as AuthTokenConfig};

use crate::iam::{MintError, TokenMinter, TokenTarget};
use crate::secrets::SecretValue;

pub struct RdsAuthTokenMinter {
    sdk_config: aws_config::SdkConfig,
}

impl RdsAuthTokenMinter {
    /// Create from an existing SDK config.
    pub fn new(sdk_config: aws_config::SdkConfig) -> Self {
        Self { sdk_config }
    }

    /// Create with default AWS config (env vars, instance metadata, etc.).
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(config)
    }
}

#[async_trait]
impl TokenMinter for RdsAuthTokenMinter {
    async fn mint(&self, target: &TokenTarget, ttl: Duration) -> Result<SecretValue, MintError> {
        let config = AuthTokenConfig::builder()
            .hostname(target.host.clone())
            .port(u64::from(target.port))
            .username(target.user.clone())
            .region(aws_config::Region::new(target.region.clone()))
            .expires_in(ttl.as_secs())
            .build()
            .map_err(|e| MintError::Config(e.to_string()))?;

        let token = AuthTokenGenerator::new(config)
            .auth_token(&self.sdk_config)
            .await
            .map_err(|e| MintError::Identity(e.to_string()))?;

        Ok(SecretValue::from_string(token.as_str().to_string()))
    }
}
