use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("Failed to access mirror file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode or decode mirror file: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Loads a whole collection from disk. A missing file is an empty
/// collection, not an error.
pub(super) async fn load_collection<T: DeserializeOwned>(
    path: &Path,
) -> Result<Vec<T>, MirrorError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(err.into()),
    }
}

/// Rewrites a collection wholesale. The file is written to a sibling temp
/// path and renamed over the target so readers never observe a half-written
/// file.
pub(super) async fn persist_collection<T: Serialize>(
    path: &Path,
    records: &[T],
) -> Result<(), MirrorError> {
    let encoded = serde_json::to_vec_pretty(records)?;
    let tmp = tmp_path(path);
    fs::write(&tmp, &encoded).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
