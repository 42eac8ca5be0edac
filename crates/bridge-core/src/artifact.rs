//! Reader for the IR file the toolchain writes as a build side effect.

use std::path::Path;

use tracing::debug;

use crate::extraction::Extraction;

/// Read the generated IR file verbatim.
///
/// Any failure (missing file, permissions, invalid UTF-8) is a soft miss.
pub async fn read_artifact(path: &Path) -> Extraction {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Extraction::Found(text),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "IR artifact unavailable");
            Extraction::NotFound
        }
    }
}
