//! The booth's state machine.
//!
//! `Idle` (no photo) -> `Ready` (photo, nothing in flight) -> `Running` (one
//! describe or edit call in flight) -> back to `Ready`. While `Running`, every
//! mutating transition except [`Controller::reset`] is refused, which is what
//! keeps a second request from ever being sent.
//!
//! Submitting is split in three so a controller shared behind a mutex is never
//! locked across the network call: [`Controller::begin_edit`] /
//! [`Controller::begin_analyze`] hand out a [`PendingRun`], the caller awaits
//! [`PendingRun::execute`] and feeds the [`RunOutcome`] back through
//! [`Controller::finish`]. [`Controller::submit_edit`] and
//! [`Controller::submit_analyze`] do all three for single-owner use.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encoder::{self, UploadedImage};
use crate::error::BoothError;
use crate::gemini::{GeneratedResult, ImageService};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Edit,
    Analyze,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Ready,
    Running,
}

/// A transition that was refused. The controller is left exactly as it was.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("A request is already in progress.")]
    Busy,
    #[error("Upload an image first.")]
    NoImage,
    #[error("Enter a prompt first.")]
    BlankPrompt,
}

#[derive(Debug, Default)]
pub struct Controller {
    image: Option<UploadedImage>,
    upload_seq: u64,
    mode: Mode,
    prompt: String,
    result: Option<GeneratedResult>,
    error: Option<String>,
    in_flight: Option<u64>,
    /// Run dropped by `reset` whose request is still with Gemini. New runs wait
    /// for its outcome so two requests are never out at once.
    abandoned: Option<u64>,
    run_seq: u64,
}

#[derive(Debug, Clone)]
enum Job {
    Analyze,
    Edit { prompt: String },
}

/// Everything one pipeline run needs, detached from the controller.
#[derive(Debug, Clone)]
pub struct PendingRun {
    run_id: u64,
    image: UploadedImage,
    job: Job,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    run_id: u64,
    result: Result<GeneratedResult, BoothError>,
}

impl RunOutcome {
    pub fn result(&self) -> &Result<GeneratedResult, BoothError> {
        &self.result
    }
}

impl PendingRun {
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// Encode, build, call, normalize. Never panics on service failure; the
    /// error travels in the outcome.
    pub async fn execute(self, service: &ImageService) -> RunOutcome {
        let result = self.run(service).await;
        RunOutcome {
            run_id: self.run_id,
            result,
        }
    }

    async fn run(&self, service: &ImageService) -> Result<GeneratedResult, BoothError> {
        let encoded = encoder::encode(&self.image)?;
        match &self.job {
            Job::Analyze => service
                .describe(&encoded)
                .await
                .map(|data| GeneratedResult::Text { data }),
            Job::Edit { prompt } => service
                .transform(&encoded, prompt)
                .await
                .map(GeneratedResult::from),
        }
    }
}

/// Read-only view handed to the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    pub phase: Phase,
    pub mode: Mode,
    pub prompt: String,
    pub loading: bool,
    pub image: Option<ImageSummary>,
    pub result: Option<GeneratedResult>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSummary {
    /// Changes on every upload; the page uses it to refetch the preview.
    pub preview_id: u64,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub size_bytes: usize,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        if self.in_flight.is_some() {
            Phase::Running
        } else if self.image.is_some() {
            Phase::Ready
        } else {
            Phase::Idle
        }
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn image(&self) -> Option<&UploadedImage> {
        self.image.as_ref()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn result(&self) -> Option<&GeneratedResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn ensure_idle(&self) -> Result<(), Rejection> {
        if self.in_flight.is_some() {
            Err(Rejection::Busy)
        } else {
            Ok(())
        }
    }

    /// Replaces the photo and forgets the previous prompt, result and error.
    /// The mode is kept.
    pub fn upload(&mut self, image: UploadedImage) -> Result<(), Rejection> {
        self.ensure_idle()?;
        tracing::info!(
            file_name = image.file_name().unwrap_or("<unnamed>"),
            bytes = image.len(),
            "image uploaded"
        );
        self.image = Some(image);
        self.upload_seq += 1;
        self.prompt.clear();
        self.result = None;
        self.error = None;
        Ok(())
    }

    pub fn select_mode(&mut self, mode: Mode) -> Result<(), Rejection> {
        self.ensure_idle()?;
        self.mode = mode;
        Ok(())
    }

    pub fn edit_prompt(&mut self, text: impl Into<String>) -> Result<(), Rejection> {
        self.ensure_idle()?;
        self.prompt = text.into();
        Ok(())
    }

    /// Enters `Running` for an edit with `prompt`, which need not be the stored
    /// prompt (the page's preset buttons send their own).
    pub fn begin_edit(&mut self, prompt: &str) -> Result<PendingRun, Rejection> {
        self.ensure_idle()?;
        if prompt.trim().is_empty() {
            return Err(Rejection::BlankPrompt);
        }
        self.start(Job::Edit {
            prompt: prompt.to_string(),
        })
    }

    pub fn begin_analyze(&mut self) -> Result<PendingRun, Rejection> {
        self.ensure_idle()?;
        self.start(Job::Analyze)
    }

    fn start(&mut self, job: Job) -> Result<PendingRun, Rejection> {
        if let Some(run_id) = self.abandoned {
            tracing::debug!(run_id, "refusing new run until the abandoned one returns");
            return Err(Rejection::Busy);
        }
        let image = self.image.clone().ok_or(Rejection::NoImage)?;
        self.run_seq += 1;
        self.in_flight = Some(self.run_seq);
        self.result = None;
        self.error = None;
        tracing::debug!(run_id = self.run_seq, ?job, "run started");
        Ok(PendingRun {
            run_id: self.run_seq,
            image,
            job,
        })
    }

    /// Leaves `Running` with exactly one of result or error set. Returns false
    /// for an outcome whose run was abandoned by [`Controller::reset`]; its
    /// result is dropped and new runs are allowed again.
    pub fn finish(&mut self, outcome: RunOutcome) -> bool {
        if self.abandoned == Some(outcome.run_id) {
            self.abandoned = None;
        }
        if self.in_flight != Some(outcome.run_id) {
            tracing::debug!(run_id = outcome.run_id, "discarding outcome of abandoned run");
            return false;
        }
        self.in_flight = None;
        match outcome.result {
            Ok(result) => {
                tracing::info!(run_id = outcome.run_id, "run succeeded");
                self.result = Some(result);
                self.error = None;
            }
            Err(err) => {
                tracing::warn!(run_id = outcome.run_id, error = %err, "run failed");
                self.result = None;
                self.error = Some(err.to_string());
            }
        }
        true
    }

    pub async fn submit_edit(
        &mut self,
        service: &ImageService,
        prompt: &str,
    ) -> Result<(), Rejection> {
        let run = self.begin_edit(prompt)?;
        let outcome = run.execute(service).await;
        self.finish(outcome);
        Ok(())
    }

    pub async fn submit_analyze(&mut self, service: &ImageService) -> Result<(), Rejection> {
        let run = self.begin_analyze()?;
        let outcome = run.execute(service).await;
        self.finish(outcome);
        Ok(())
    }

    /// Back to `Idle` from anywhere. A run still in flight is abandoned: its
    /// outcome will be ignored, and submissions stay refused until it arrives.
    pub fn reset(&mut self) {
        if let Some(run_id) = self.in_flight.take() {
            tracing::info!(run_id, "reset while a run was in flight");
            self.abandoned = Some(run_id);
        }
        self.image = None;
        self.prompt.clear();
        self.mode = Mode::Edit;
        self.result = None;
        self.error = None;
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            phase: self.phase(),
            mode: self.mode,
            prompt: self.prompt.clone(),
            loading: self.is_loading(),
            image: self.image.as_ref().map(|image| {
                let dimensions = image.dimensions();
                ImageSummary {
                    preview_id: self.upload_seq,
                    file_name: image.file_name().map(str::to_string),
                    mime_type: image.mime_type(),
                    size_bytes: image.len(),
                    width: dimensions.map(|(w, _)| w),
                    height: dimensions.map(|(_, h)| h),
                }
            }),
            result: self.result.clone(),
            error: self.error.clone(),
        }
    }
}
