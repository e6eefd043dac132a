use std::{io::ErrorKind, path::Path};

use anyhow::{Context as _, Result};

/// Point `link` at `target`, removing whatever is at `link` first.
pub async fn replace(link: &Path, target: &Path) -> Result<()> {
    remove(link).await?;

    tokio::fs::symlink(target, link)
        .await
        .with_context(|| format!("Failed to create symlink {link:?} -> {target:?}"))
}

/// Remove `link` if present, including dangling links.
pub async fn remove(link: &Path) -> Result<()> {
    match tokio::fs::symlink_metadata(link).await {
        Ok(_) => tokio::fs::remove_file(link)
            .await
            .with_context(|| format!("Failed to remove {link:?}")),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to inspect {link:?}")),
    }
}
