// Error types for the upload → process → download workflow.
//
// Each operation has its own enum so callers can tell a local validation
// problem apart from a failed job or a failed download.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Reason shown to the user when the service gives no structured detail.
pub const FALLBACK_REASON: &str = "An error occurred while processing the file";

/// Problems with a candidate input file.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The declared media type is not `application/pdf`.
    #[error("Unsupported file type: {media_type}")]
    UnsupportedType { media_type: String },

    /// The candidate could not be read from disk.
    #[error("Could not read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures of a single submission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("No file selected")]
    NoFileSelected,

    /// A job is already in flight on this controller.
    #[error("A job is already being processed")]
    AlreadySubmitting,

    /// The service could not be reached.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered with a non-2xx status.
    #[error("Service rejected the request ({status}): {}", .detail.as_deref().unwrap_or(FALLBACK_REASON))]
    ServiceRejected { status: u16, detail: Option<String> },

    /// A 2xx response whose body was not a result document.
    #[error("Invalid response from service: {0}")]
    InvalidResponse(String),
}

impl JobError {
    /// Human-readable reason stored in `JobState::Failed`.
    ///
    /// Only a structured `detail` from the service is shown verbatim;
    /// everything else collapses to [`FALLBACK_REASON`].
    pub fn reason(&self) -> String {
        match self {
            JobError::ServiceRejected {
                detail: Some(detail),
                ..
            } => detail.clone(),
            JobError::NoFileSelected => "Please select a PDF file first".to_string(),
            JobError::AlreadySubmitting => self.to_string(),
            _ => FALLBACK_REASON.to_string(),
        }
    }
}

/// Failures fetching or saving a finished artifact.
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Download failed: {0}")]
    Transport(String),

    #[error("Download failed with status {0}")]
    Status(u16),

    #[error("Could not save artifact: {0}")]
    Save(#[from] io::Error),

    /// There is no finished job with a downloadable artifact.
    #[error("No processed file is available for download")]
    NoArtifact,
}
