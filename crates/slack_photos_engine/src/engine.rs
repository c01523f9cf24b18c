use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use engine_logging::{engine_error, engine_info, engine_warn};
use tokio_util::sync::CancellationToken;

use crate::download::{ChannelProgressSink, ReqwestDownloader};
use crate::pipeline::{run_pipeline, EngineConfig, RunRequest};
use crate::{EngineEvent, RunFailure, RunSummary};

enum EngineCommand {
    Start(RunRequest),
    Cancel,
}

/// Background worker that runs one pipeline at a time off the caller's thread.
///
/// Commands go in through [`EngineHandle::start`] and [`EngineHandle::cancel`];
/// everything the pipeline reports comes back as [`EngineEvent`]s, ending with
/// exactly one `RunFinished` per accepted start.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    busy: Arc<AtomicBool>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let busy = Arc::new(AtomicBool::new(false));
        let worker_busy = busy.clone();

        thread::spawn(move || worker_loop(config, cmd_rx, event_tx, worker_busy));

        Self {
            cmd_tx,
            event_rx,
            busy,
        }
    }

    pub fn start(&self, request: RunRequest) {
        let _ = self.cmd_tx.send(EngineCommand::Start(request));
    }

    pub fn cancel(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel);
    }

    /// True from the moment a start is accepted until its `RunFinished` is sent.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

fn worker_loop(
    config: EngineConfig,
    cmd_rx: mpsc::Receiver<EngineCommand>,
    event_tx: mpsc::Sender<EngineEvent>,
    busy: Arc<AtomicBool>,
) {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            engine_error!("Failed to start engine runtime: {}", err);
            while let Ok(command) = cmd_rx.recv() {
                if let EngineCommand::Start(_) = command {
                    let _ = event_tx.send(EngineEvent::RunFinished(Err(
                        RunFailure::WorkerUnavailable(err.to_string()),
                    )));
                }
            }
            return;
        }
    };

    let mut active: Option<CancellationToken> = None;
    while let Ok(command) = cmd_rx.recv() {
        match command {
            EngineCommand::Start(request) => {
                if busy.swap(true, Ordering::SeqCst) {
                    engine_warn!("Rejected start for {:?}: run in progress", request.archive_path);
                    let _ = event_tx.send(EngineEvent::Rejected {
                        reason: "a run is already in progress".to_string(),
                    });
                    continue;
                }
                let token = CancellationToken::new();
                active = Some(token.clone());
                let config = config.clone();
                let event_tx = event_tx.clone();
                let busy = busy.clone();
                runtime.spawn(async move {
                    let result = execute_run(&request, &config, event_tx.clone(), &token).await;
                    busy.store(false, Ordering::SeqCst);
                    let _ = event_tx.send(EngineEvent::RunFinished(result));
                });
            }
            EngineCommand::Cancel => match &active {
                Some(token) if busy.load(Ordering::SeqCst) => {
                    engine_info!("Cancellation requested");
                    token.cancel();
                }
                _ => engine_info!("Cancel ignored: no active run"),
            },
        }
    }
}

async fn execute_run(
    request: &RunRequest,
    config: &EngineConfig,
    event_tx: mpsc::Sender<EngineEvent>,
    cancel: &CancellationToken,
) -> Result<RunSummary, RunFailure> {
    let downloader = ReqwestDownloader::new(config.download.clone()).map_err(|err| {
        engine_error!("Failed to build HTTP client: {}", err);
        RunFailure::WorkerUnavailable(err.to_string())
    })?;
    let sink = ChannelProgressSink::new(event_tx);
    run_pipeline(request, config.failure_policy, &downloader, &sink, cancel).await
}
