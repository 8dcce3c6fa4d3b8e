use std::path::{Path, PathBuf};

use anyhow::{Context, Error};
use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::BufReader;
use tracing::{debug, warn};

use super::{Disposition, InboundStream, StreamSource};

pub const PROCESSED_DIR: &str = "processed";
pub const FAILED_DIR: &str = "failed";

/// Directory-backed stream source. Files dropped directly under the
/// root (regular files, or symlinks to them) are pending streams,
/// scanned in lexicographic name order. Retiring a stream moves its
/// file into the `processed/` or `failed/` subdirectory, so a file is
/// handed out at most once. A pending entry that cannot be opened is
/// retired to `failed/` on the spot, so one bad file cannot starve the
/// files behind it. Dotfiles are skipped, letting uploads be staged
/// under a hidden name and renamed in once complete.
pub struct SpoolSource {
    root: PathBuf,
}

impl SpoolSource {
    pub async fn new(root: impl AsRef<Path>) -> Result<Self, Error> {
        let root = root.as_ref();
        tokio::fs::create_dir_all(root.join(PROCESSED_DIR))
            .await
            .context("creating processed directory")?;
        tokio::fs::create_dir_all(root.join(FAILED_DIR))
            .await
            .context("creating failed directory")?;
        let root = tokio::fs::canonicalize(root).await?;
        Ok(Self { root })
    }

    async fn pending(&self) -> Result<Vec<String>, Error> {
        let mut names = vec![];
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if !file_type.is_file() && !file_type.is_symlink() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    async fn open_pending(path: &Path) -> Result<(File, u64), std::io::Error> {
        let file = File::open(path).await?;
        let size = file.metadata().await?.len();
        Ok((file, size))
    }
}

#[async_trait]
impl StreamSource for SpoolSource {
    async fn next_stream(&self) -> Result<Option<InboundStream>, Error> {
        for name in self.pending().await? {
            let path = self.root.join(&name);
            let (file, size) = match Self::open_pending(&path).await {
                Ok(opened) => opened,
                Err(err) => {
                    // An unopenable entry must not block the files behind it
                    warn!("failed to open {} from spool, retiring it: {:?}", name, err);
                    if let Err(err) = self.retire(&name, Disposition::Failed).await {
                        warn!("failed to retire unreadable {}: {:?}", name, err);
                    }
                    continue;
                }
            };
            debug!("picked up {} ({} bytes) from spool", name, size);
            return Ok(Some(InboundStream {
                name,
                size,
                reader: Box::pin(BufReader::new(file)),
            }));
        }
        Ok(None)
    }

    async fn retire(&self, name: &str, disposition: Disposition) -> Result<(), Error> {
        let subdir = match disposition {
            Disposition::Processed => PROCESSED_DIR,
            Disposition::Failed => FAILED_DIR,
        };
        let from = self.root.join(name);
        let to = self.root.join(subdir).join(name);
        tokio::fs::rename(&from, &to)
            .await
            .with_context(|| format!("retiring {name} to {subdir}"))?;
        debug!("retired {} to {}", name, subdir);
        Ok(())
    }
}
