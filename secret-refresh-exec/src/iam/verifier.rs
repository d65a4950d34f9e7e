use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgSslMode};
use sqlx::Connection;

use crate::iam::IamTokenConfig;
use crate::secrets::SecretValue;

/// Proves a freshly minted token is accepted before it is published.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &SecretValue) -> Result<(), VerifyError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum VerifyError {
    #[error("token is not valid UTF-8")]
    NotUtf8,
    #[error("failed to connect with the generated token: {0}")]
    Connect(String),
    #[error("failed to ping the database with the generated token: {0}")]
    Ping(String),
}

/// Opens a one-off Postgres connection using the token as the password.
#[derive(Debug, Clone)]
pub struct PostgresVerifier {
    host: String,
    port: u16,
    user: String,
    database: String,
}

impl PostgresVerifier {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            database: database.into(),
        }
    }

    pub fn from_config(config: &IamTokenConfig) -> Self {
        Self::new(
            config.db_host.clone(),
            config.db_port,
            config.db_user.clone(),
            config.db_name.clone(),
        )
    }
}

#[async_trait]
impl TokenVerifier for PostgresVerifier {
    async fn verify(&self, token: &SecretValue) -> Result<(), VerifyError> {
        let password = token.expose_str().ok_or(VerifyError::NotUtf8)?;
        // IAM auth is only accepted over TLS.
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(password)
            .database(&self.database)
            .ssl_mode(PgSslMode::Require);

        let mut conn = PgConnection::connect_with(&options)
            .await
            .map_err(|e| VerifyError::Connect(e.to_string()))?;
        conn.ping()
            .await
            .map_err(|e| VerifyError::Ping(e.to_string()))?;
        if let Err(e) = conn.close().await {
            tracing::debug!(error = %e, "closing verification connection failed");
        }
        Ok(())
    }
}
