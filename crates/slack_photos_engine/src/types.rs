use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Final status line of a run that processed every channel log.
pub const DONE_STATUS: &str = "DONE!";
/// Final status line of a run that stopped early on request.
pub const CANCELLED_STATUS: &str = "CANCELLED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extracting,
    Scanning,
    Downloading,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadProgress {
    pub url: String,
    pub bytes: u64,
    /// Content length reported by the server, if any.
    pub total: Option<u64>,
}

impl DownloadProgress {
    pub fn status_line(&self) -> String {
        match self.total {
            Some(total) => format!("Downloading {}... {} of {}", self.url, self.bytes, total),
            None => format!("Downloading {}... {} of unknown", self.url, self.bytes),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Human-readable status line for the presentation layer.
    Status(String),
    StageChanged(Stage),
    Progress(DownloadProgress),
    /// A start command arrived while another run was active.
    Rejected { reason: String },
    RunFinished(Result<RunSummary, RunFailure>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub extraction_root: PathBuf,
    pub photos_root: PathBuf,
    pub channel_logs: usize,
    pub logs_skipped: usize,
    pub downloaded: usize,
    pub attachments_skipped: usize,
    pub failed: usize,
    pub bytes_downloaded: u64,
    pub cancelled: bool,
}

/// Fatal outcome of a run. Everything recoverable is counted in [`RunSummary`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunFailure {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("archive error: {0}")]
    Archive(String),
    #[error("download aborted the run: {0}")]
    Download(DownloadError),
    #[error("engine worker unavailable: {0}")]
    WorkerUnavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct DownloadError {
    pub kind: DownloadFailureKind,
    pub message: String,
}

impl DownloadError {
    pub(crate) fn new(kind: DownloadFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == DownloadFailureKind::Cancelled
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadFailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    Network,
    Io,
    Cancelled,
}

impl DownloadFailureKind {
    /// Failures worth another attempt when retries are enabled.
    pub fn is_transient(&self) -> bool {
        match self {
            DownloadFailureKind::Timeout | DownloadFailureKind::Network => true,
            DownloadFailureKind::HttpStatus(code) => *code >= 500,
            _ => false,
        }
    }
}

impl fmt::Display for DownloadFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadFailureKind::InvalidUrl => write!(f, "invalid url"),
            DownloadFailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            DownloadFailureKind::Timeout => write!(f, "timeout"),
            DownloadFailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            DownloadFailureKind::Network => write!(f, "network error"),
            DownloadFailureKind::Io => write!(f, "io error"),
            DownloadFailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}
