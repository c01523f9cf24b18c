use std::io::{self, BufRead, IsTerminal, Write};
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use engine_logging::engine_debug;
use slack_photos_core::{update, AppState, AppViewModel, Msg, RunOutcome};

use super::effects::EffectRunner;
use crate::cli::Cli;

const POLL_INTERVAL: Duration = Duration::from_millis(75);

/// Runs one export through the core state machine and the engine, printing status lines.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    let runner = EffectRunner::new(cli.engine_config());
    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let mut console = Console::default();
    let mut state = AppState::new();

    let selections = [
        Msg::ArchiveSelected(cli.archive.display().to_string()),
        Msg::DestinationSelected(cli.destination.display().to_string()),
        Msg::StartClicked,
    ];
    for msg in selections {
        state = dispatch(state, msg, &runner, &mut console);
    }
    if !state.is_busy() {
        // Inputs were rejected; the reason is already on screen.
        return Ok(ExitCode::from(2));
    }

    if io::stdin().is_terminal() {
        spawn_cancel_listener(msg_tx)?;
        console.line("(press Enter to cancel)");
    }

    while state.is_busy() {
        while let Ok(msg) = msg_rx.try_recv() {
            state = dispatch(state, msg, &runner, &mut console);
        }
        let msg = runner.next_msg(POLL_INTERVAL).unwrap_or(Msg::Tick);
        state = dispatch(state, msg, &runner, &mut console);
    }
    console.finish();

    let view = state.view();
    if let Some(outcome) = &view.outcome {
        console.line(&outcome.summary_line());
    }
    Ok(exit_code(&view))
}

fn dispatch(state: AppState, msg: Msg, runner: &EffectRunner, console: &mut Console) -> AppState {
    let (mut state, effects) = update(state, msg);
    runner.enqueue(effects);
    if state.consume_dirty() {
        if let Some(status) = state.view().status {
            console.status(&status);
        }
    }
    state
}

fn spawn_cancel_listener(msg_tx: mpsc::Sender<Msg>) -> anyhow::Result<()> {
    thread::Builder::new()
        .name("cancel-listener".to_string())
        .spawn(move || {
            let mut line = String::new();
            // EOF or a read error leaves the run alone.
            if let Ok(read) = io::stdin().lock().read_line(&mut line) {
                if read > 0 {
                    engine_debug!("Cancel requested from terminal");
                    let _ = msg_tx.send(Msg::CancelClicked);
                }
            }
        })
        .context("failed to start the cancel listener")?;
    Ok(())
}

fn exit_code(view: &AppViewModel) -> ExitCode {
    match &view.outcome {
        Some(RunOutcome::Completed { failed: 0, .. }) => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}

/// Prints status lines, rewriting progress for the same download in place.
#[derive(Default)]
struct Console {
    last: Option<String>,
    in_place: bool,
}

impl Console {
    fn status(&mut self, status: &str) {
        if self.last.as_deref() == Some(status) {
            return;
        }
        let same_download = self
            .last
            .as_deref()
            .and_then(download_prefix)
            .is_some_and(|prefix| download_prefix(status) == Some(prefix));

        let mut out = io::stdout().lock();
        if same_download {
            let _ = write!(out, "\r{status}");
            self.in_place = true;
        } else {
            if self.in_place {
                let _ = writeln!(out);
            }
            let _ = write!(out, "{status}");
            self.in_place = download_prefix(status).is_some();
            if !self.in_place {
                let _ = writeln!(out);
            }
        }
        let _ = out.flush();
        self.last = Some(status.to_string());
    }

    fn line(&mut self, text: &str) {
        self.finish();
        println!("{text}");
    }

    fn finish(&mut self) {
        if std::mem::take(&mut self.in_place) {
            println!();
        }
    }
}

/// `Downloading <url>...` part of a download status line.
fn download_prefix(status: &str) -> Option<&str> {
    if !status.starts_with("Downloading ") {
        return None;
    }
    status
        .find("...")
        .map(|end| &status[..end + "...".len()])
}
