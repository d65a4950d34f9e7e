use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::secrets::SecretValue;

#[derive(Debug, Clone)]
pub(crate) struct CachedToken {
    pub(crate) value: SecretValue,
    pub(crate) minted_at: Instant,
}

/// The single current-value store of one provider instance.
///
/// The file at `path` is the durable, inspectable copy; the in-memory mirror is
/// what readers get. Writers are serialized on `writer` and the mirror is only
/// updated once the file write succeeded. Readers only wait for the swap, never
/// for the file write.
#[derive(Debug)]
pub struct TokenSlot {
    path: PathBuf,
    writer: Mutex<()>,
    current: Mutex<Option<CachedToken>>,
}

impl TokenSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
            current: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Make sure the file exists. When nothing has been cached yet it is
    /// truncated so a token left over from an earlier process is not served.
    pub async fn initialize(&self) -> io::Result<()> {
        let _writer = self.writer.lock().await;
        let cached = self.load().await;
        let bytes = cached.as_ref().map(|c| c.value.expose_bytes()).unwrap_or_default();
        write_atomic(&self.path, bytes).await
    }

    /// Publish `value`. Returns `false` without touching the file when a token
    /// minted later is already cached.
    pub(crate) async fn store(&self, value: SecretValue, minted_at: Instant) -> io::Result<bool> {
        let _writer = self.writer.lock().await;
        let newer_cached = self
            .current
            .lock()
            .await
            .as_ref()
            .is_some_and(|cached| cached.minted_at > minted_at);
        if newer_cached {
            return Ok(false);
        }

        write_atomic(&self.path, value.expose_bytes()).await?;
        *self.current.lock().await = Some(CachedToken { value, minted_at });
        Ok(true)
    }

    pub(crate) async fn load(&self) -> Option<CachedToken> {
        self.current.lock().await.clone()
    }
}

/// Write through a uniquely named sibling and rename it over `path`, so
/// concurrent writers (in this process or another) never share a temp file.
async fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = tmp_path(path);
    let result = write_file(&tmp, bytes).await;
    let result = match result {
        Ok(()) => tokio::fs::rename(&tmp, path).await,
        Err(e) => Err(e),
    };
    if result.is_err() {
        let _ = tokio::fs::remove_file(&tmp).await;
    }
    result
}

async fn write_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
    path.with_file_name(name)
}
