use std::path::PathBuf;
use std::time::Duration;

use crate::iam::TokenTarget;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(300);
/// RDS IAM auth tokens are valid for at most 15 minutes.
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_TOKEN_TTL: Duration = MAX_TOKEN_TTL;
pub const DEFAULT_MINT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IamTokenConfig {
    pub region: String,
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_name: String,
    /// File holding the latest verified token.
    pub cache_path: PathBuf,
    pub refresh_interval: Duration,
    /// How long a minted token is accepted by the database.
    pub token_ttl: Duration,
    pub mint_timeout: Duration,
    pub verify_timeout: Duration,
}

impl IamTokenConfig {
    pub fn new(
        region: impl Into<String>,
        db_host: impl Into<String>,
        db_port: u16,
        db_user: impl Into<String>,
        db_name: impl Into<String>,
        cache_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            region: region.into(),
            db_host: db_host.into(),
            db_port,
            db_user: db_user.into(),
            db_name: db_name.into(),
            cache_path: cache_path.into(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            token_ttl: DEFAULT_TOKEN_TTL,
            mint_timeout: DEFAULT_MINT_TIMEOUT,
            verify_timeout: DEFAULT_VERIFY_TIMEOUT,
        }
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    pub fn with_timeouts(mut self, mint: Duration, verify: Duration) -> Self {
        self.mint_timeout = mint;
        self.verify_timeout = verify;
        self
    }

    pub fn target(&self) -> TokenTarget {
        TokenTarget {
            region: self.region.clone(),
            host: self.db_host.clone(),
            port: self.db_port,
            user: self.db_user.clone(),
        }
    }

    /// Reject configurations that could never produce a usable token.
    ///
    /// The refresh interval must be strictly shorter than the token lifetime,
    /// otherwise the cached token would expire between refreshes.
    pub fn validate(&self) -> Result<(), IamConfigError> {
        for (field, value) in [
            ("region", &self.region),
            ("db_host", &self.db_host),
            ("db_user", &self.db_user),
            ("db_name", &self.db_name),
        ] {
            if value.trim().is_empty() {
                return Err(IamConfigError::EmptyField(field));
            }
        }
        if self.cache_path.as_os_str().is_empty() {
            return Err(IamConfigError::EmptyField("path"));
        }
        if self.db_port == 0 {
            return Err(IamConfigError::ZeroPort);
        }
        for (field, value) in [
            ("refresh_interval", self.refresh_interval),
            ("token_ttl", self.token_ttl),
            ("mint_timeout", self.mint_timeout),
            ("verify_timeout", self.verify_timeout),
        ] {
            if value.is_zero() {
                return Err(IamConfigError::ZeroDuration(field));
            }
        }
        if self.token_ttl > MAX_TOKEN_TTL {
            return Err(IamConfigError::TtlTooLong {
                ttl: self.token_ttl,
                max: MAX_TOKEN_TTL,
            });
        }
        if self.refresh_interval >= self.token_ttl {
            return Err(IamConfigError::IntervalNotShorterThanTtl {
                interval: self.refresh_interval,
                ttl: self.token_ttl,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IamConfigError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("db_port must not be 0")]
    ZeroPort,
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("token_ttl {ttl:?} exceeds the identity service maximum of {max:?}")]
    TtlTooLong { ttl: Duration, max: Duration },
    #[error("refresh interval {interval:?} must be shorter than the token ttl {ttl:?}")]
    IntervalNotShorterThanTtl { interval: Duration, ttl: Duration },
}
