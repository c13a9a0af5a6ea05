// src/fetch/diagnostics.rs
//! Post-mortem artifacts for failed fetches (page screenshots, raw HTML).
//! Written for humans; nothing reads them back.

use std::path::PathBuf;

use crate::core::sanitize::file_stem;
use crate::fetch::Target;
use crate::model::timestamp_now;

#[derive(Clone, Debug)]
pub struct Diagnostics {
    dir: PathBuf,
}

impl Diagnostics {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// `<dir>/<target>-<timestamp>.<ext>`
    pub fn path_for(&self, target: Target, timestamp: &str, ext: &str) -> PathBuf {
        self.dir.join(join!(target.as_str(), "-", &file_stem(timestamp), ".", ext))
    }

    /// Best-effort write; failures are logged and swallowed.
    pub async fn capture(&self, target: Target, ext: &str, bytes: &[u8]) -> Option<PathBuf> {
        let path = self.path_for(target, &timestamp_now(), ext);
        let write = async {
            tokio::fs::create_dir_all(&self.dir).await?;
            tokio::fs::write(&path, bytes).await
        };
        match write.await {
            Ok(()) => {
                tracing::warn!(%target, path = %path.display(), "saved diagnostics artifact");
                Some(path)
            }
            Err(e) => {
                tracing::warn!(%target, error = %e, "could not save diagnostics artifact");
                None
            }
        }
    }
}
