//! Files kept on disk next to database rows: invoices, contracts, terms.

use std::path::{Path, PathBuf};

use chrono::Utc;

/// Write `bytes` under `dir` as `<timestamp>_<name>`, through a temp file.
///
/// The timestamp keeps an earlier file with the same name intact until the
/// row pointing at it is replaced.
pub async fn store_file(dir: &Path, name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    let name = format!(
        "{}_{}",
        Utc::now().format("%Y%m%d%H%M%S%3f"),
        sanitize_file_name(name)
    );
    let path = dir.join(&name);
    let tmp_path = path.with_extension("part");
    tokio::fs::write(&tmp_path, bytes).await?;
    tokio::fs::rename(&tmp_path, &path).await?;

    tracing::debug!("Stored file at {}", path.display());
    Ok(path)
}

/// Remove a file whose row was never committed.
pub async fn discard_file(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!("Failed to remove {}: {}", path.display(), e);
    }
}

/// Keep the final path component, with anything but `[A-Za-z0-9._-]` replaced.
pub fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let clean: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if clean.is_empty() {
        "file".to_string()
    } else {
        clean
    }
}
