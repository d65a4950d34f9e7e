use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::iam::{
    IamConfigError, IamTokenConfig, MintError, TokenMinter, TokenSlot, TokenVerifier, VerifyError,
};
use crate::secrets::{SecretError, SecretValue, SecretsProvider};

/// Credential provider backed by continuously refreshed IAM auth tokens.
///
/// The token is a single secret, so the id passed to [`SecretsProvider::get`]
/// is ignored.
pub struct IamTokenProvider {
    name: String,
    config: IamTokenConfig,
    minter: Arc<dyn TokenMinter>,
    verifier: Arc<dyn TokenVerifier>,
    slot: TokenSlot,
    started: AtomicBool,
}

impl IamTokenProvider {
    pub fn new(
        name: impl Into<String>,
        config: IamTokenConfig,
        minter: Arc<dyn TokenMinter>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Result<Self, IamConfigError> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            slot: TokenSlot::new(config.cache_path.clone()),
            config,
            minter,
            verifier,
            started: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &IamTokenConfig {
        &self.config
    }

    pub fn cache_path(&self) -> &Path {
        self.slot.path()
    }

    /// Run one mint → verify → publish cycle.
    ///
    /// The slot is only written once the token has been verified, so a failure
    /// at any step leaves the previously cached token in place.
    pub async fn refresh(&self) -> Result<(), RefreshError> {
        let target = self.config.target();
        let minted_at = Instant::now();

        let token = tokio::time::timeout(
            self.config.mint_timeout,
            self.minter.mint(&target, self.config.token_ttl),
        )
        .await
        .map_err(|_| RefreshError::MintTimeout(self.config.mint_timeout))??;
        if token.is_empty() {
            return Err(RefreshError::EmptyToken);
        }

        tokio::time::timeout(self.config.verify_timeout, self.verifier.verify(&token))
            .await
            .map_err(|_| RefreshError::VerifyTimeout(self.config.verify_timeout))??;

        let stored = self
            .slot
            .store(token, minted_at)
            .await
            .map_err(|source| RefreshError::Write {
                path: self.slot.path().to_path_buf(),
                source,
            })?;
        if !stored {
            debug!(provider = %self.name, "a newer token is already cached, dropping this one");
        }
        Ok(())
    }

    /// Start the background refresh loop.
    ///
    /// Only one loop may run per instance. The loop stops once `shutdown`
    /// becomes `true` or its sender is dropped.
    pub fn spawn(
        self: &Arc<Self>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<JoinHandle<()>, RefreshError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(RefreshError::AlreadyStarted(self.name.clone()));
        }
        let this = Arc::clone(self);
        Ok(tokio::spawn(async move { this.run(shutdown).await }))
    }

    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if let Err(e) = self.slot.initialize().await {
            error!(
                provider = %self.name,
                path = %self.slot.path().display(),
                error = %e,
                "failed to initialize token cache file"
            );
        }

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.refresh().await {
                Ok(()) => info!(
                    provider = %self.name,
                    path = %self.slot.path().display(),
                    next_refresh_secs = self.config.refresh_interval.as_secs(),
                    "refreshed IAM token"
                ),
                Err(e) => warn!(
                    provider = %self.name,
                    error = %e,
                    retry_in_secs = self.config.refresh_interval.as_secs(),
                    "IAM token refresh failed, keeping the previous token"
                ),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.refresh_interval) => {}
                _ = stop_requested(&mut shutdown) => break,
            }
        }

        info!(provider = %self.name, "IAM token refresh loop stopped");
    }
}

/// Resolves once shutdown is requested or the sender is gone.
pub(crate) async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

#[async_trait]
impl SecretsProvider for IamTokenProvider {
    async fn get(&self, _secret_id: &str) -> Result<SecretValue, SecretError> {
        let cached = self
            .slot
            .load()
            .await
            .ok_or_else(|| SecretError::CacheEmpty {
                provider: self.name.clone(),
            })?;

        let age = cached.minted_at.elapsed();
        if age >= self.config.token_ttl {
            return Err(SecretError::Expired {
                provider: self.name.clone(),
                age_secs: age.as_secs(),
                ttl_secs: self.config.token_ttl.as_secs(),
            });
        }
        Ok(cached.value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("failed to mint IAM token: {0}")]
    Mint(#[from] MintError),
    #[error("minting IAM token timed out after {0:?}")]
    MintTimeout(Duration),
    #[error("identity service returned an empty token")]
    EmptyToken,
    #[error("generated token failed verification: {0}")]
    Verify(#[from] VerifyError),
    #[error("token verification timed out after {0:?}")]
    VerifyTimeout(Duration),
    #[error("failed to write token to {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("refresh loop for provider {0} is already running")]
    AlreadyStarted(String),
}
