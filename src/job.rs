// Job lifecycle: submit a selected file, track synthetic progress while the
// service works, and settle into exactly one terminal state.
//
//   Idle ──submit──▶ Submitting ──resolve──▶ Succeeded | Failed
//    ▲                                            │
//    └──────── new selection clears result ───────┘

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Deserialize;
use tokio::sync::watch;

use crate::api::WatermarkService;
use crate::error::{JobError, FALLBACK_REASON};
use crate::file_gate::{SelectedFile, SelectionObserver};
use crate::notify::{Level, Notifier};
use crate::progress::ProgressSimulator;

/// Counts reported for one processed document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JobDetails {
    #[serde(default)]
    pub total_removed: u64,
    #[serde(default)]
    pub images_removed: u64,
    #[serde(default)]
    pub links_removed: u64,
    /// Absent when nothing was written.
    #[serde(default)]
    pub output_filename: Option<String>,
}

/// Body of a successful `remove-watermark` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobResult {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: JobDetails,
    /// Locator of the produced artifact.
    #[serde(default)]
    pub download_url: Option<String>,
}

impl JobResult {
    /// Locator and suggested save name, when the job produced an artifact.
    pub fn artifact(&self) -> Option<(&str, String)> {
        let locator = self.download_url.as_deref()?;
        let name = self
            .details
            .output_filename
            .clone()
            .or_else(|| {
                locator
                    .rsplit('/')
                    .next()
                    .filter(|segment| !segment.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "processed.pdf".to_string());
        Some((locator, name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Idle,
    /// Request outstanding; the value is approximate user feedback only.
    Submitting(f64),
    Succeeded(JobResult),
    Failed(String),
}

impl JobState {
    pub fn is_submitting(&self) -> bool {
        matches!(self, JobState::Submitting(_))
    }

    pub fn result(&self) -> Option<&JobResult> {
        match self {
            JobState::Succeeded(result) => Some(result),
            _ => None,
        }
    }
}

/// Runs at most one job at a time. Shared behind an `Arc`; every method
/// takes `&self` so a second `submit` can be rejected instead of queued.
pub struct JobController {
    service: Arc<dyn WatermarkService>,
    notifier: Arc<dyn Notifier>,
    simulator: ProgressSimulator,
    state: Mutex<JobState>,
    progress: watch::Sender<f64>,
}

impl JobController {
    pub fn new(service: Arc<dyn WatermarkService>, notifier: Arc<dyn Notifier>) -> Self {
        let (progress, _) = watch::channel(0.0);
        Self {
            service,
            notifier,
            simulator: ProgressSimulator::default(),
            state: Mutex::new(JobState::Idle),
            progress,
        }
    }

    pub fn with_simulator(mut self, simulator: ProgressSimulator) -> Self {
        self.simulator = simulator;
        self
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> JobState {
        self.lock_state().clone()
    }

    pub fn progress_updates(&self) -> watch::Receiver<f64> {
        self.progress.subscribe()
    }

    /// Drop a finished result so the next run starts from `Idle`. A job in
    /// flight is left alone.
    pub fn clear_result(&self) {
        let mut state = self.lock_state();
        if !state.is_submitting() {
            *state = JobState::Idle;
            self.progress.send_replace(0.0);
        }
    }

    /// Upload `file` and wait for the outcome. Suspends only while the
    /// service works; simulated progress is published in the meantime.
    pub async fn submit(&self, file: Option<SelectedFile>) -> Result<JobResult, JobError> {
        let Some(file) = file else {
            log::warn!("Submit requested with no file selected");
            self.notifier
                .notify(Level::Error, &JobError::NoFileSelected.reason());
            return Err(JobError::NoFileSelected);
        };

        let submission = self.begin()?;
        log::info!("Submitting {} ({} bytes)", file.name(), file.size());

        let ticker = self.simulator.start();
        let mut ticks = ticker.subscribe();
        let request = self.service.remove_watermark(&file);
        tokio::pin!(request);

        let outcome = loop {
            tokio::select! {
                biased;
                outcome = &mut request => break outcome,
                changed = ticks.changed() => match changed {
                    Ok(()) => {
                        let value = *ticks.borrow_and_update();
                        self.publish_progress(value);
                    }
                    Err(_) => break (&mut request).await,
                },
            }
        };
        ticker.stop();

        match outcome {
            Ok(result) => {
                submission.succeed(result.clone());
                Ok(result)
            }
            Err(err) => {
                submission.fail(&err);
                Err(err)
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> Result<Submission<'_>, JobError> {
        let mut state = self.lock_state();
        if state.is_submitting() {
            log::warn!("Submit rejected: a job is already in flight");
            return Err(JobError::AlreadySubmitting);
        }
        *state = JobState::Submitting(0.0);
        self.progress.send_replace(0.0);
        Ok(Submission {
            controller: self,
            settled: false,
        })
    }

    fn publish_progress(&self, value: f64) {
        let mut state = self.lock_state();
        if let JobState::Submitting(progress) = &mut *state {
            *progress = value;
            self.progress.send_replace(value);
            log::trace!("Progress {:.1}", value);
        }
    }

    fn succeed(&self, result: JobResult) {
        let removed = result.details.total_removed;
        if !result.success {
            log::warn!("Service reported success=false: {}", result.message);
        }
        {
            let mut state = self.lock_state();
            *state = JobState::Succeeded(result);
            self.progress.send_replace(100.0);
        }
        log::info!("Job succeeded, {} elements removed", removed);

        if removed > 0 {
            self.notifier.notify(
                Level::Success,
                &format!("Successfully removed {} watermark elements!", removed),
            );
        } else {
            self.notifier
                .notify(Level::Info, "No watermarks found to remove");
        }
    }

    fn fail(&self, err: &JobError) {
        let reason = err.reason();
        {
            let mut state = self.lock_state();
            *state = JobState::Failed(reason.clone());
            self.progress.send_replace(0.0);
        }
        log::error!("Job failed: {}", err);
        self.notifier.notify(Level::Error, &reason);
    }

    /// The submit future went away before the service answered.
    fn abandon(&self) {
        {
            let mut state = self.lock_state();
            if !state.is_submitting() {
                return;
            }
            *state = JobState::Failed(FALLBACK_REASON.to_string());
            self.progress.send_replace(0.0);
        }
        log::warn!("Submission dropped before the service answered");
        self.notifier.notify(Level::Error, FALLBACK_REASON);
    }
}

/// The `Submitting` state owned by one `submit` call. If the call is
/// dropped before settling, the controller moves to `Failed` so it can be
/// submitted again.
struct Submission<'a> {
    controller: &'a JobController,
    settled: bool,
}

impl Submission<'_> {
    fn succeed(mut self, result: JobResult) {
        self.settled = true;
        self.controller.succeed(result);
    }

    fn fail(mut self, err: &JobError) {
        self.settled = true;
        self.controller.fail(err);
    }
}

impl Drop for Submission<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.controller.abandon();
        }
    }
}

impl SelectionObserver for JobController {
    fn selection_changed(&self, _file: &SelectedFile) {
        self.clear_result();
    }
}
