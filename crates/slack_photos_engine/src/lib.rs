//! Slack photos engine: extract → scan → filter → download pipeline and its worker.
mod download;
mod engine;
mod extract;
mod filter;
mod persist;
mod pipeline;
mod scan;
mod target;
mod types;

pub use download::{
    ChannelProgressSink, DownloadOutcome, DownloadSettings, Downloader, ProgressSink,
    ReqwestDownloader,
};
pub use engine::EngineHandle;
pub use extract::{archive_base_name, extract_archive, extraction_root, ArchiveError};
pub use filter::{filter_eligible, is_eligible_mimetype, Attachment};
pub use persist::{ensure_output_dir, AtomicFileWriter, PendingFile, PersistError};
pub use pipeline::{run_pipeline, EngineConfig, FailurePolicy, RunRequest};
pub use scan::{channel_name, scan_export, ChannelLog, ExportScan, Message, ParseError, NO_CHANNEL};
pub use target::{photos_root, AttachmentSkip, DownloadTarget, PHOTOS_DIR_SUFFIX};
pub use types::{
    DownloadError, DownloadFailureKind, DownloadProgress, EngineEvent, RunFailure, RunSummary,
    Stage, CANCELLED_STATUS, DONE_STATUS,
};
