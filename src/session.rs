// Wires the selection gate, the job controller and the retriever together
// around one service client.

use std::path::PathBuf;
use std::sync::Arc;

use crate::api::WatermarkService;
use crate::error::{JobError, RetrievalError, ValidationError};
use crate::file_gate::{Candidate, FileGate, SelectedFile};
use crate::job::{JobController, JobResult, JobState};
use crate::notify::{Level, Notifier};
use crate::progress::ProgressSimulator;
use crate::retriever::{ArtifactRetriever, ArtifactSink};

pub struct Session {
    gate: FileGate,
    controller: Arc<JobController>,
    retriever: ArtifactRetriever,
    notifier: Arc<dyn Notifier>,
}

impl Session {
    pub fn new(
        service: Arc<dyn WatermarkService>,
        sink: Arc<dyn ArtifactSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_simulator(service, sink, notifier, ProgressSimulator::default())
    }

    pub fn with_simulator(
        service: Arc<dyn WatermarkService>,
        sink: Arc<dyn ArtifactSink>,
        notifier: Arc<dyn Notifier>,
        simulator: ProgressSimulator,
    ) -> Self {
        let controller = Arc::new(
            JobController::new(service.clone(), notifier.clone()).with_simulator(simulator),
        );
        let gate = FileGate::new(notifier.clone()).with_observer(controller.clone());
        let retriever = ArtifactRetriever::new(service, sink, notifier.clone());
        Self {
            gate,
            controller,
            retriever,
            notifier,
        }
    }

    pub fn controller(&self) -> &Arc<JobController> {
        &self.controller
    }

    pub fn selected(&self) -> Option<&SelectedFile> {
        self.gate.current()
    }

    pub fn state(&self) -> JobState {
        self.controller.state()
    }

    pub fn select(&mut self, candidate: Candidate) -> Result<SelectedFile, ValidationError> {
        self.gate.select(candidate)
    }

    /// Submit the held file, if any.
    pub async fn submit(&self) -> Result<JobResult, JobError> {
        self.controller.submit(self.gate.current().cloned()).await
    }

    pub async fn download(
        &self,
        locator: &str,
        suggested_name: &str,
    ) -> Result<PathBuf, RetrievalError> {
        self.retriever.download(locator, suggested_name).await
    }

    /// Download the artifact of the current successful job.
    pub async fn download_latest(&self) -> Result<PathBuf, RetrievalError> {
        let state = self.controller.state();
        let Some((locator, name)) = state.result().and_then(JobResult::artifact) else {
            log::warn!("Download requested with no artifact available");
            self.notifier
                .notify(Level::Error, &RetrievalError::NoArtifact.to_string());
            return Err(RetrievalError::NoArtifact);
        };
        self.retriever.download(locator, &name).await
    }
}
