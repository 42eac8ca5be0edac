//! Per-request build workspaces.
//!
//! Each request builds in `<workspace_root>/<uuid>/`, so concurrent requests
//! never share a source file or an IR artifact. [`BuildWorkspace::cleanup`]
//! removes the directory unless it was created with `keep = true`; a
//! workspace dropped without cleanup is removed on the blocking pool.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{BridgeError, Result};

/// An isolated build directory owned by one request.
#[derive(Debug)]
pub struct BuildWorkspace {
    id: Uuid,
    dir: PathBuf,
    created_at: DateTime<Utc>,
    keep: bool,
    released: bool,
}

impl BuildWorkspace {
    /// Create a fresh workspace under `root`, creating `root` if needed.
    pub async fn create(root: &Path, keep: bool) -> Result<Self> {
        let id = Uuid::new_v4();
        let dir = root.join(id.to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| BridgeError::Workspace {
                path: dir.clone(),
                source,
            })?;
        let dir = tokio::fs::canonicalize(&dir)
            .await
            .map_err(|source| BridgeError::Workspace {
                path: dir.clone(),
                source,
            })?;
        debug!(workspace_id = %id, dir = %dir.display(), "workspace created");
        Ok(Self {
            id,
            dir,
            created_at: Utc::now(),
            keep,
            released: false,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Absolute path of the workspace directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Path of `file_name` inside the workspace.
    pub fn path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Write `code` verbatim to `file_name`, replacing any prior content.
    pub async fn write_source(&self, file_name: &str, code: &str) -> Result<PathBuf> {
        let path = self.path(file_name);
        tokio::fs::write(&path, code)
            .await
            .map_err(|source| BridgeError::WriteSource {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }

    /// Remove the workspace directory unless it is kept.
    pub async fn cleanup(mut self) {
        self.released = true;
        if self.keep {
            debug!(workspace_id = %self.id, dir = %self.dir.display(), "workspace kept");
            return;
        }
        if let Err(e) = tokio::fs::remove_dir_all(&self.dir).await {
            warn!(workspace_id = %self.id, error = %e, "failed to remove workspace");
        }
    }
}

impl Drop for BuildWorkspace {
    fn drop(&mut self) {
        if self.keep || self.released {
            return;
        }
        let id = self.id;
        let dir = std::mem::take(&mut self.dir);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || remove_dir(id, &dir));
            }
            Err(_) => remove_dir(id, &dir),
        }
    }
}

fn remove_dir(id: Uuid, dir: &Path) {
    if let Err(e) = std::fs::remove_dir_all(dir) {
        warn!(workspace_id = %id, error = %e, "failed to remove workspace");
    }
}

/// SHA-256 hex digest of submitted source, used to correlate log lines.
pub fn source_digest(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}
