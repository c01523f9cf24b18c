use std::collections::HashSet;
use std::path::{Path, PathBuf};

use engine_logging::{engine_error, engine_info, engine_warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    ensure_output_dir, extract_archive, filter_eligible, photos_root, scan_export, ArchiveError,
    DownloadSettings,
    DownloadTarget, Downloader, EngineEvent, ProgressSink, RunFailure, RunSummary, Stage,
    CANCELLED_STATUS, DONE_STATUS,
};

/// What to do when a single attachment fails to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Report the failure, count it, and move on to the next attachment.
    #[default]
    ContinueOnError,
    /// Abort the whole run on the first failed download.
    AbortOnFirstError,
}

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub download: DownloadSettings,
    pub failure_policy: FailurePolicy,
}

/// One archive/destination pair to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub archive_path: PathBuf,
    pub destination: PathBuf,
}

impl RunRequest {
    pub fn new(archive_path: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            archive_path: archive_path.into(),
            destination: destination.into(),
        }
    }

    /// Checks both inputs against the file system before any work starts.
    pub fn validate(&self) -> Result<(), RunFailure> {
        let invalid =
            |reason: String| -> Result<(), RunFailure> { Err(RunFailure::InvalidRequest(reason)) };
        let has_zip_extension = self
            .archive_path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
        if !has_zip_extension {
            return invalid(format!(
                "{} is not a .zip export",
                self.archive_path.display()
            ));
        }
        if !self.archive_path.is_file() {
            return invalid(format!("{} does not exist", self.archive_path.display()));
        }
        if !self.destination.is_dir() {
            return invalid(format!(
                "{} is not an existing directory",
                self.destination.display()
            ));
        }
        if let Err(err) = ensure_output_dir(&self.destination) {
            return invalid(format!(
                "{} is not writable: {err}",
                self.destination.display()
            ));
        }
        Ok(())
    }
}

impl From<ArchiveError> for RunFailure {
    fn from(err: ArchiveError) -> Self {
        RunFailure::Archive(err.to_string())
    }
}

/// Runs extract → scan → filter → download for one request.
///
/// Recoverable problems (unparseable logs, skipped attachments, failed
/// downloads under [`FailurePolicy::ContinueOnError`]) are reported through
/// `sink` and counted in the returned summary. Cancellation stops issuing new
/// work and still returns `Ok` with `cancelled` set.
pub async fn run_pipeline(
    request: &RunRequest,
    policy: FailurePolicy,
    downloader: &dyn Downloader,
    sink: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<RunSummary, RunFailure> {
    request.validate()?;
    let photos_root = photos_root(&request.destination, &request.archive_path).ok_or_else(|| {
        RunFailure::InvalidRequest(format!(
            "{} has no file name",
            request.archive_path.display()
        ))
    })?;

    engine_info!(
        "Run started: archive={:?} destination={:?}",
        request.archive_path,
        request.destination
    );
    sink.emit(EngineEvent::StageChanged(Stage::Extracting));
    sink.status("Extracting archive file...".to_string());

    let mut summary = RunSummary {
        photos_root,
        ..RunSummary::default()
    };

    let extraction_root = match extract_on_blocking_pool(&request.archive_path, sink, cancel).await {
        Ok(root) => root,
        Err(ArchiveError::Cancelled) => return Ok(finish_cancelled(summary, sink)),
        Err(err) => {
            engine_error!("Extraction of {:?} failed: {}", request.archive_path, err);
            return Err(err.into());
        }
    };
    summary.extraction_root = extraction_root;

    sink.emit(EngineEvent::StageChanged(Stage::Scanning));
    let mut downloading = false;
    let mut seen_channels = HashSet::new();

    for scanned in scan_export(&summary.extraction_root) {
        if cancel.is_cancelled() {
            return Ok(finish_cancelled(summary, sink));
        }
        let log = match scanned {
            Ok(log) => log,
            Err(err) => {
                engine_warn!("Skipping channel log: {}", err);
                sink.status(format!("Skipping unreadable message log: {err}"));
                summary.logs_skipped += 1;
                continue;
            }
        };
        summary.channel_logs += 1;

        for message in &log.messages {
            for attachment in filter_eligible(message) {
                let target = match DownloadTarget::new(&summary.photos_root, &log.channel, attachment)
                {
                    Ok(target) => target,
                    Err(skip) => {
                        engine_warn!("Skipping attachment in {:?}: {}", log.path, skip);
                        sink.status(format!("Skipping {skip}"));
                        summary.attachments_skipped += 1;
                        continue;
                    }
                };

                if cancel.is_cancelled() {
                    return Ok(finish_cancelled(summary, sink));
                }
                if !downloading {
                    downloading = true;
                    sink.emit(EngineEvent::StageChanged(Stage::Downloading));
                }
                if seen_channels.insert(log.channel.clone()) {
                    engine_info!("Saving channel {} into {:?}", log.channel, target.channel_dir);
                }

                match downloader.download(&target, sink, cancel).await {
                    Ok(outcome) => {
                        summary.downloaded += 1;
                        summary.bytes_downloaded += outcome.bytes;
                    }
                    Err(err) if err.is_cancelled() => {
                        return Ok(finish_cancelled(summary, sink));
                    }
                    Err(err) => {
                        engine_warn!("Download of {} failed: {}", target.url, err);
                        sink.status(format!("Failed to download {}: {err}", target.url));
                        summary.failed += 1;
                        if policy == FailurePolicy::AbortOnFirstError {
                            return Err(RunFailure::Download(err));
                        }
                    }
                }
            }
        }
    }

    engine_info!(
        "Run finished: {} downloaded, {} failed, {} attachments skipped, {} logs skipped",
        summary.downloaded,
        summary.failed,
        summary.attachments_skipped,
        summary.logs_skipped
    );
    sink.status(DONE_STATUS.to_string());
    Ok(summary)
}

/// Runs [`extract_archive`] on tokio's blocking pool, relaying its events to `sink` as they arrive.
async fn extract_on_blocking_pool(
    archive_path: &Path,
    sink: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<PathBuf, ArchiveError> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let archive_path = archive_path.to_path_buf();
    let cancel = cancel.clone();
    let mut task = tokio::task::spawn_blocking(move || {
        extract_archive(&archive_path, &RelaySink(tx), &cancel)
    });

    loop {
        tokio::select! {
            Some(event) = rx.recv() => sink.emit(event),
            joined = &mut task => {
                while let Ok(event) = rx.try_recv() {
                    sink.emit(event);
                }
                return joined.map_err(|err| ArchiveError::Task(err.to_string()))?;
            }
        }
    }
}

struct RelaySink(mpsc::UnboundedSender<EngineEvent>);

impl ProgressSink for RelaySink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.0.send(event);
    }
}

fn finish_cancelled(mut summary: RunSummary, sink: &dyn ProgressSink) -> RunSummary {
    engine_info!("Run cancelled after {} downloads", summary.downloaded);
    summary.cancelled = true;
    sink.status(CANCELLED_STATUS.to_string());
    summary
}
