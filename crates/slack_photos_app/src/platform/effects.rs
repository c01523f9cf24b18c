use std::time::Duration;

use engine_logging::{engine_info, engine_warn};
use slack_photos_core::{Effect, Msg, RunOutcome, Stage};
use slack_photos_engine::{EngineConfig, EngineEvent, EngineHandle, RunRequest, RunSummary};

/// Executes core effects against the engine and turns engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            engine: EngineHandle::new(config),
        }
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartRun {
                    archive_path,
                    destination,
                } => {
                    engine_info!("StartRun archive={} destination={}", archive_path, destination);
                    self.engine
                        .start(RunRequest::new(archive_path, destination));
                }
                Effect::CancelRun => self.engine.cancel(),
            }
        }
    }

    /// Waits up to `timeout` for the next engine event.
    pub fn next_msg(&self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).map(map_event)
    }
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Status(line) => Msg::Status(line),
        EngineEvent::StageChanged(stage) => Msg::StageChanged(map_stage(stage)),
        EngineEvent::Progress(progress) => Msg::Status(progress.status_line()),
        EngineEvent::Rejected { reason } => {
            engine_warn!("Engine rejected start: {}", reason);
            Msg::NoOp
        }
        EngineEvent::RunFinished(Ok(summary)) => Msg::RunFinished(map_summary(&summary)),
        EngineEvent::RunFinished(Err(failure)) => {
            engine_warn!("Run failed: {}", failure);
            Msg::RunFailed {
                reason: failure.to_string(),
            }
        }
    }
}

fn map_summary(summary: &RunSummary) -> RunOutcome {
    engine_info!(
        "Run summary: {} channel logs ({} unreadable) extracted to {:?}, photos in {:?}",
        summary.channel_logs,
        summary.logs_skipped,
        summary.extraction_root,
        summary.photos_root
    );
    if summary.cancelled {
        RunOutcome::Cancelled {
            downloaded: summary.downloaded,
        }
    } else {
        RunOutcome::Completed {
            downloaded: summary.downloaded,
            skipped: summary.attachments_skipped,
            failed: summary.failed,
            bytes: summary.bytes_downloaded,
        }
    }
}

fn map_stage(stage: slack_photos_engine::Stage) -> Stage {
    match stage {
        slack_photos_engine::Stage::Extracting => Stage::Extracting,
        slack_photos_engine::Stage::Scanning => Stage::Scanning,
        slack_photos_engine::Stage::Downloading => Stage::Downloading,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use slack_photos_engine::{DownloadProgress, RunFailure};

    fn summary(cancelled: bool) -> RunSummary {
        RunSummary {
            downloaded: 3,
            attachments_skipped: 1,
            failed: 2,
            bytes_downloaded: 4096,
            cancelled,
            ..RunSummary::default()
        }
    }

    #[test]
    fn progress_becomes_a_status_line() {
        let msg = map_event(EngineEvent::Progress(DownloadProgress {
            url: "https://files.example/cat.png".to_string(),
            bytes: 10,
            total: Some(40),
        }));
        assert_eq!(
            msg,
            Msg::Status("Downloading https://files.example/cat.png... 10 of 40".to_string())
        );
    }

    #[test]
    fn finished_runs_map_to_outcomes() {
        assert_eq!(
            map_event(EngineEvent::RunFinished(Ok(summary(false)))),
            Msg::RunFinished(RunOutcome::Completed {
                downloaded: 3,
                skipped: 1,
                failed: 2,
                bytes: 4096,
            })
        );
        assert_eq!(
            map_event(EngineEvent::RunFinished(Ok(summary(true)))),
            Msg::RunFinished(RunOutcome::Cancelled { downloaded: 3 })
        );
    }

    #[test]
    fn fatal_failure_carries_reason() {
        let failure = RunFailure::InvalidRequest("destination is not a directory".to_string());
        assert_eq!(
            map_event(EngineEvent::RunFinished(Err(failure.clone()))),
            Msg::RunFailed {
                reason: failure.to_string()
            }
        );
    }

    #[test]
    fn stages_map_one_to_one() {
        assert_eq!(
            map_event(EngineEvent::StageChanged(
                slack_photos_engine::Stage::Scanning
            )),
            Msg::StageChanged(Stage::Scanning)
        );
        assert_eq!(
            map_event(EngineEvent::Rejected {
                reason: "busy".to_string()
            }),
            Msg::NoOp
        );
    }
}
