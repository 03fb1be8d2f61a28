// Library root
// -----------
// This crate drives one PDF through the watermark-removal service: pick a
// file, submit it, watch progress, download the processed result. The
// binary (`main.rs`) puts an interactive menu on top of it.
//
// Module responsibilities:
// - `file_gate`: validates candidate files and holds the accepted PDF.
// - `progress`: synthetic progress ticker for the outstanding request.
// - `job`: the submit → terminal state machine and the result types.
// - `retriever`: downloads finished artifacts and saves them to disk.
// - `api`: HTTP client for the service plus the trait the core uses.
// - `session`: wires the pieces above around one client.
// - `notify`, `logging`, `error`: user messages, log setup, error types.
// - `ui`: terminal menu flows.
pub mod api;
pub mod error;
pub mod file_gate;
pub mod job;
pub mod logging;
pub mod notify;
pub mod progress;
pub mod retriever;
pub mod session;
pub mod ui;

pub use api::{ApiClient, ServiceConfig, WatermarkService};
pub use error::{JobError, RetrievalError, ValidationError};
pub use file_gate::{Candidate, FileGate, SelectedFile};
pub use job::{JobController, JobDetails, JobResult, JobState};
pub use notify::{Level, Notifier};
pub use progress::{ProgressHandle, ProgressSimulator};
pub use retriever::{ArtifactRetriever, ArtifactSink, DirectorySink};
pub use session::Session;
