use std::fmt;

use crate::view_model::AppViewModel;

/// Status line shown once a run has processed every channel.
pub const DONE_STATUS: &str = "DONE!";
/// Status line shown when a run stopped early on request.
pub const CANCELLED_STATUS: &str = "CANCELLED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    Extracting,
    Downloading,
    Done,
}

/// Pipeline stage as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extracting,
    Scanning,
    Downloading,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed {
        downloaded: usize,
        skipped: usize,
        failed: usize,
        bytes: u64,
    },
    Cancelled {
        downloaded: usize,
    },
}

impl RunOutcome {
    pub fn status_line(&self) -> &'static str {
        match self {
            RunOutcome::Completed { .. } => DONE_STATUS,
            RunOutcome::Cancelled { .. } => CANCELLED_STATUS,
        }
    }

    /// One-line tally shown after the run ends.
    pub fn summary_line(&self) -> String {
        match self {
            RunOutcome::Completed {
                downloaded,
                skipped,
                failed,
                bytes,
            } => format!(
                "Downloaded {downloaded} file(s), {bytes} bytes; {skipped} skipped, {failed} failed"
            ),
            RunOutcome::Cancelled { downloaded } => {
                format!("Cancelled after {downloaded} file(s)")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    MissingArchive,
    NotAZipArchive,
    MissingDestination,
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::MissingArchive => write!(f, "select a Slack export file first"),
            InputError::NotAZipArchive => write!(f, "the Slack export must be a .zip file"),
            InputError::MissingDestination => {
                write!(f, "select a photo download destination first")
            }
        }
    }
}

/// Checks the two user inputs the way the "Download Photos" button gates them.
pub fn validate_inputs(archive_path: &str, destination: &str) -> Result<(), InputError> {
    let archive_path = archive_path.trim();
    if archive_path.is_empty() {
        return Err(InputError::MissingArchive);
    }
    let has_zip_extension = archive_path
        .rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case("zip"));
    if !has_zip_extension {
        return Err(InputError::NotAZipArchive);
    }
    if destination.trim().is_empty() {
        return Err(InputError::MissingDestination);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    archive_path: String,
    destination: String,
    phase: RunPhase,
    status: Option<String>,
    outcome: Option<RunOutcome>,
    cancel_requested: bool,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            phase: self.phase,
            busy: self.is_busy(),
            can_start: self.can_start(),
            archive_path: self.archive_path.clone(),
            destination: self.destination.clone(),
            status: self.status.clone(),
            outcome: self.outcome.clone(),
            cancel_requested: self.cancel_requested,
            dirty: self.dirty,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.phase, RunPhase::Extracting | RunPhase::Downloading)
    }

    pub fn can_start(&self) -> bool {
        !self.is_busy() && validate_inputs(&self.archive_path, &self.destination).is_ok()
    }

    /// Returns whether the state changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_archive_path(&mut self, path: String) {
        self.archive_path = path;
        self.mark_dirty();
    }

    pub(crate) fn set_destination(&mut self, path: String) {
        self.destination = path;
        self.mark_dirty();
    }

    pub(crate) fn inputs(&self) -> (&str, &str) {
        (&self.archive_path, &self.destination)
    }

    pub(crate) fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
        self.mark_dirty();
    }

    pub(crate) fn start_run(&mut self) {
        self.phase = RunPhase::Extracting;
        self.outcome = None;
        self.cancel_requested = false;
        self.set_status("Extracting archive file...");
    }

    pub(crate) fn request_cancel(&mut self) -> bool {
        if !self.is_busy() || self.cancel_requested {
            return false;
        }
        self.cancel_requested = true;
        self.mark_dirty();
        true
    }

    pub(crate) fn enter_stage(&mut self, stage: Stage) {
        if !self.is_busy() {
            return;
        }
        let next = match stage {
            Stage::Extracting => RunPhase::Extracting,
            Stage::Scanning | Stage::Downloading => RunPhase::Downloading,
        };
        if next != self.phase {
            self.phase = next;
            self.mark_dirty();
        }
    }

    pub(crate) fn finish_run(&mut self, outcome: RunOutcome) {
        self.phase = RunPhase::Done;
        self.set_status(outcome.status_line());
        self.outcome = Some(outcome);
        self.cancel_requested = false;
    }

    pub(crate) fn fail_run(&mut self, reason: &str) {
        self.phase = RunPhase::Idle;
        self.outcome = None;
        self.cancel_requested = false;
        self.set_status(format!("FAILED: {reason}"));
    }
}
