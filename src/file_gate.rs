// Input selection: validates candidate files and holds the accepted one.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::ValidationError;
use crate::notify::{Level, Notifier};

/// The only media type the service accepts.
pub const ACCEPTED_MEDIA_TYPE: &str = "application/pdf";

/// A file offered by the user, not yet validated.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    pub media_type: String,
    pub bytes: Bytes,
}

impl Candidate {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a candidate from disk, declaring its media type from the file
    /// extension.
    pub async fn from_path(path: &Path) -> Result<Self, ValidationError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ValidationError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("document.pdf")
            .to_string();
        Ok(Self::new(name, media_type_for(path), bytes))
    }
}

fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("pdf") => ACCEPTED_MEDIA_TYPE,
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("txt") => "text/plain",
        Some("html") | Some("htm") => "text/html",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// An accepted input. Only [`FileGate`] creates these, so the media type is
/// always [`ACCEPTED_MEDIA_TYPE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
    bytes: Bytes,
}

impl SelectedFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn media_type(&self) -> &'static str {
        ACCEPTED_MEDIA_TYPE
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }
}

/// Gets told whenever a new file replaces the held selection.
pub trait SelectionObserver: Send + Sync {
    fn selection_changed(&self, file: &SelectedFile);
}

/// Holds at most one accepted file.
pub struct FileGate {
    current: Option<SelectedFile>,
    notifier: Arc<dyn Notifier>,
    observers: Vec<Arc<dyn SelectionObserver>>,
}

impl FileGate {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            current: None,
            notifier,
            observers: Vec::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SelectionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn current(&self) -> Option<&SelectedFile> {
        self.current.as_ref()
    }

    /// Validate `candidate` and, if it is a PDF, make it the held file.
    /// A rejected candidate leaves the previous selection in place.
    pub fn select(&mut self, candidate: Candidate) -> Result<SelectedFile, ValidationError> {
        if candidate.media_type != ACCEPTED_MEDIA_TYPE {
            log::warn!(
                "Rejected {} with media type {}",
                candidate.name,
                candidate.media_type
            );
            self.notifier.notify(Level::Error, "Please select a PDF file");
            return Err(ValidationError::UnsupportedType {
                media_type: candidate.media_type,
            });
        }

        let file = SelectedFile {
            name: candidate.name,
            bytes: candidate.bytes,
        };
        log::info!("Selected {} ({} bytes)", file.name(), file.size());
        self.current = Some(file.clone());
        for observer in &self.observers {
            observer.selection_changed(&file);
        }
        self.notifier
            .notify(Level::Success, "PDF file selected successfully!");
        Ok(file)
    }

    /// Picker surfaces may yield nothing (dialog cancelled, empty drop);
    /// that is not an error and changes nothing.
    pub fn offer(
        &mut self,
        candidate: Option<Candidate>,
    ) -> Option<Result<SelectedFile, ValidationError>> {
        candidate.map(|c| self.select(c))
    }
}
