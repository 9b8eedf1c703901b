use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::PipelineError;

/// Snapshot a fetched payload under `dest_dir` as
/// `<dataset>_<YYYYMMDDTHHMMSSZ>.csv`, bytes untouched.
/// Returns the full path of the saved file.
pub async fn save_raw(
    dest_dir: impl AsRef<Path>,
    dataset: &str,
    fetched_at: DateTime<Utc>,
    bytes: &[u8],
) -> Result<PathBuf, PipelineError> {
    let dest_dir = dest_dir.as_ref();
    let filename = format!("{}_{}.csv", dataset, fetched_at.format("%Y%m%dT%H%M%SZ"));
    let dest_path = dest_dir.join(filename);

    let io_err = |source| PipelineError::Io {
        path: dest_path.clone(),
        source,
    };
    fs::create_dir_all(dest_dir).await.map_err(io_err)?;
    fs::write(&dest_path, bytes).await.map_err(io_err)?;

    debug!(path = %dest_path.display(), bytes = bytes.len(), "raw payload saved");
    Ok(dest_path)
}
