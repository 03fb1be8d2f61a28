// Fetches finished artifacts and hands them to a save primitive.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;

use crate::api::WatermarkService;
use crate::error::RetrievalError;
use crate::notify::{Level, Notifier};

/// Host save-to-disk primitive.
pub trait ArtifactSink: Send + Sync {
    /// Persist `bytes` under (a sanitised form of) `suggested_name` and
    /// return where they ended up.
    fn save(&self, bytes: &[u8], suggested_name: &str) -> io::Result<PathBuf>;
}

/// Saves artifacts into one directory.
///
/// Bytes are written to a temporary file inside the directory and renamed
/// into place, so a failed save never leaves a partial file behind.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `WATERMARK_SAVE_DIR`, else the user's download directory, else home,
    /// else the working directory.
    pub fn from_env() -> Self {
        let dir = std::env::var_os("WATERMARK_SAVE_DIR")
            .map(PathBuf::from)
            .or_else(dirs::download_dir)
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactSink for DirectorySink {
    fn save(&self, bytes: &[u8], suggested_name: &str) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let target = self.dir.join(sanitize_file_name(suggested_name));

        // Removed on drop unless persisted.
        let mut temp = NamedTempFile::new_in(&self.dir)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&target).map_err(|err| err.error)?;
        Ok(target)
    }
}

/// Strip directory components and characters that are unsafe in file names.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "processed.pdf".to_string()
    } else {
        cleaned
    }
}

pub struct ArtifactRetriever {
    service: Arc<dyn WatermarkService>,
    sink: Arc<dyn ArtifactSink>,
    notifier: Arc<dyn Notifier>,
}

impl ArtifactRetriever {
    pub fn new(
        service: Arc<dyn WatermarkService>,
        sink: Arc<dyn ArtifactSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            service,
            sink,
            notifier,
        }
    }

    /// Fetch the artifact at `locator` and save it as `suggested_name`.
    /// Can be repeated freely; it never touches job state.
    pub async fn download(
        &self,
        locator: &str,
        suggested_name: &str,
    ) -> Result<PathBuf, RetrievalError> {
        match self.fetch_and_save(locator, suggested_name).await {
            Ok(path) => {
                log::info!("Saved {} to {}", locator, path.display());
                self.notifier
                    .notify(Level::Success, "File downloaded successfully!");
                Ok(path)
            }
            Err(err) => {
                log::error!("Download of {} failed: {}", locator, err);
                self.notifier
                    .notify(Level::Error, &format!("Failed to download file: {}", err));
                Err(err)
            }
        }
    }

    async fn fetch_and_save(
        &self,
        locator: &str,
        suggested_name: &str,
    ) -> Result<PathBuf, RetrievalError> {
        let bytes = self.service.fetch_artifact(locator).await?;
        log::debug!("Fetched {} bytes from {}", bytes.len(), locator);

        // Saving touches the disk; keep it off the event loop.
        let sink = self.sink.clone();
        let name = suggested_name.to_string();
        let saved = tokio::task::spawn_blocking(move || sink.save(&bytes, &name))
            .await
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        Ok(saved?)
    }
}
