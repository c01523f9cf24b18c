use std::path::PathBuf;
use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::{
    AtomicFileWriter, DownloadError, DownloadFailureKind, DownloadProgress, DownloadTarget,
    EngineEvent, PersistError,
};

#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub connect_timeout: Duration,
    /// Longest silence tolerated while waiting for response headers or body bytes.
    pub read_timeout: Duration,
    /// Optional cap on one whole transfer, body included. Unset by default.
    pub total_timeout: Option<Duration>,
    pub redirect_limit: usize,
    /// Attempts per attachment; `1` disables retries.
    pub max_attempts: u32,
    /// Delay before the second attempt, doubled for each further one.
    pub retry_backoff: Duration,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(60),
            total_timeout: None,
            redirect_limit: 5,
            max_attempts: 1,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);

    fn status(&self, line: String) {
        self.emit(EngineEvent::Status(line));
    }
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub path: PathBuf,
    pub bytes: u64,
}

#[async_trait::async_trait]
pub trait Downloader: Send + Sync {
    /// Fetches `target.url` into `target.path()`, replacing any existing file.
    async fn download(
        &self,
        target: &DownloadTarget,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome, DownloadError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestDownloader {
    settings: DownloadSettings,
    client: reqwest::Client,
}

impl ReqwestDownloader {
    pub fn new(settings: DownloadSettings) -> Result<Self, DownloadError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .read_timeout(settings.read_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit));
        if let Some(total) = settings.total_timeout {
            builder = builder.timeout(total);
        }
        let client = builder
            .build()
            .map_err(|err| DownloadError::new(DownloadFailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    async fn download_once(
        &self,
        target: &DownloadTarget,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome, DownloadError> {
        let url = reqwest::Url::parse(&target.url)
            .map_err(|err| DownloadError::new(DownloadFailureKind::InvalidUrl, err.to_string()))?;

        // Created before the request so a missing or read-only channel directory
        // fails without touching the network.
        let mut pending = AtomicFileWriter::new(target.channel_dir.clone())
            .begin(&target.file_name)
            .map_err(map_persist_error)?;

        sink.status(format!("Downloading {}...", target.url));
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(cancelled()),
            response = self.client.get(url).send() => response.map_err(map_reqwest_error)?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::new(
                DownloadFailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let total = response.content_length();
        sink.emit(EngineEvent::Progress(DownloadProgress {
            url: target.url.clone(),
            bytes: 0,
            total,
        }));

        let mut stream = response.bytes_stream();
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return Err(cancelled()),
                next = stream.next() => next,
            };
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk.map_err(map_reqwest_error)?;
            pending.write_chunk(&chunk).map_err(map_persist_error)?;
            sink.emit(EngineEvent::Progress(DownloadProgress {
                url: target.url.clone(),
                bytes: pending.written(),
                total,
            }));
        }

        let bytes = pending.written();
        let path = pending.commit().map_err(map_persist_error)?;
        engine_debug!("Downloaded {} ({} bytes) to {:?}", target.url, bytes, path);
        Ok(DownloadOutcome { path, bytes })
    }
}

#[async_trait::async_trait]
impl Downloader for ReqwestDownloader {
    async fn download(
        &self,
        target: &DownloadTarget,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome, DownloadError> {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.download_once(target, sink, cancel).await {
                Err(err)
                    if attempt < max_attempts
                        && err.kind.is_transient()
                        && !cancel.is_cancelled() =>
                {
                    engine_warn!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt,
                        max_attempts,
                        target.url,
                        err
                    );
                    let delay = self.settings.retry_backoff * 2u32.saturating_pow(attempt - 1);
                    attempt += 1;
                    sink.status(format!(
                        "Retrying {} (attempt {}/{})...",
                        target.url, attempt, max_attempts
                    ));
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(cancelled()),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                result => return result,
            }
        }
    }
}

fn cancelled() -> DownloadError {
    DownloadError::new(DownloadFailureKind::Cancelled, "download cancelled")
}

fn map_persist_error(err: PersistError) -> DownloadError {
    DownloadError::new(DownloadFailureKind::Io, err.to_string())
}

fn map_reqwest_error(err: reqwest::Error) -> DownloadError {
    if err.is_timeout() {
        return DownloadError::new(DownloadFailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return DownloadError::new(DownloadFailureKind::RedirectLimitExceeded, err.to_string());
    }
    DownloadError::new(DownloadFailureKind::Network, err.to_string())
}
