use std::path::PathBuf;

use clap::Parser;
use engine_logging::LogDestination;
use log::LevelFilter;
use slack_photos_engine::{DownloadSettings, EngineConfig, FailurePolicy};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Download every photo and video attached in a Slack export",
    long_about = None
)]
pub struct Cli {
    /// Slack export archive (.zip)
    pub archive: PathBuf,
    /// Existing directory that receives "<export> - Photos"
    pub destination: PathBuf,
    /// Stop at the first failed download instead of moving on
    #[arg(long)]
    pub strict: bool,
    /// Extra attempts for timeouts, network errors and 5xx responses
    #[arg(long, default_value_t = 0)]
    pub retries: u32,
    /// Also write the log to this file
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,
    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            download: DownloadSettings {
                max_attempts: self.retries.saturating_add(1),
                ..DownloadSettings::default()
            },
            failure_policy: if self.strict {
                FailurePolicy::AbortOnFirstError
            } else {
                FailurePolicy::ContinueOnError
            },
        }
    }

    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        }
    }
}
