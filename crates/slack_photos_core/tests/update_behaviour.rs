use std::sync::Once;

use pretty_assertions::assert_eq;
use slack_photos_core::{
    update, validate_inputs, AppState, Effect, InputError, Msg, RunOutcome, RunPhase, Stage,
    CANCELLED_STATUS, DONE_STATUS,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn select_inputs(state: AppState, archive: &str, destination: &str) -> AppState {
    let (state, _) = update(state, Msg::ArchiveSelected(archive.to_string()));
    let (state, _) = update(state, Msg::DestinationSelected(destination.to_string()));
    state
}

fn running_state() -> AppState {
    let state = select_inputs(AppState::new(), "/exports/acme.zip", "/photos");
    let (state, effects) = update(state, Msg::StartClicked);
    assert_eq!(effects.len(), 1);
    state
}

#[test]
fn start_emits_run_effect_and_sets_busy() {
    init_logging();
    let state = select_inputs(AppState::new(), "/exports/acme.zip", "/photos");
    assert!(state.view().can_start);

    let (next, effects) = update(state, Msg::StartClicked);
    let view = next.view();

    assert_eq!(
        effects,
        vec![Effect::StartRun {
            archive_path: "/exports/acme.zip".to_string(),
            destination: "/photos".to_string(),
        }]
    );
    assert_eq!(view.phase, RunPhase::Extracting);
    assert!(view.busy);
    assert!(!view.can_start);
    assert_eq!(view.status.as_deref(), Some("Extracting archive file..."));
}

#[test]
fn start_rejected_without_inputs() {
    init_logging();
    let (next, effects) = update(AppState::new(), Msg::StartClicked);

    assert!(effects.is_empty());
    assert_eq!(next.phase(), RunPhase::Idle);
    assert!(!next.view().busy);
    assert!(next
        .view()
        .status
        .unwrap()
        .starts_with("Cannot start:"));
}

#[test]
fn start_rejected_for_non_zip_archive() {
    init_logging();
    let state = select_inputs(AppState::new(), "/exports/acme.tar.gz", "/photos");
    assert!(!state.view().can_start);

    let (next, effects) = update(state, Msg::StartClicked);
    assert!(effects.is_empty());
    assert_eq!(next.phase(), RunPhase::Idle);
}

#[test]
fn start_ignored_while_busy() {
    init_logging();
    let mut state = running_state();
    assert!(state.consume_dirty());

    let (mut next, effects) = update(state, Msg::StartClicked);
    assert!(effects.is_empty());
    assert_eq!(next.phase(), RunPhase::Extracting);
    assert!(!next.consume_dirty());
}

#[test]
fn pickers_locked_while_busy() {
    init_logging();
    let state = running_state();
    let (state, _) = update(state, Msg::ArchiveSelected("/other.zip".to_string()));
    let (state, _) = update(state, Msg::DestinationSelected("/elsewhere".to_string()));

    let view = state.view();
    assert_eq!(view.archive_path, "/exports/acme.zip");
    assert_eq!(view.destination, "/photos");
}

#[test]
fn stage_and_status_follow_engine() {
    init_logging();
    let state = running_state();
    let (state, _) = update(state, Msg::StageChanged(Stage::Scanning));
    assert_eq!(state.phase(), RunPhase::Downloading);

    let line = "Downloading https://files.example/cat.png... 10 of 20".to_string();
    let (state, _) = update(state, Msg::Status(line.clone()));
    assert_eq!(state.view().status, Some(line));
}

#[test]
fn finish_moves_to_done_and_allows_restart() {
    init_logging();
    let state = running_state();
    let outcome = RunOutcome::Completed {
        downloaded: 3,
        skipped: 1,
        failed: 0,
        bytes: 2048,
    };
    let (state, _) = update(state, Msg::RunFinished(outcome.clone()));
    let view = state.view();

    assert_eq!(view.phase, RunPhase::Done);
    assert!(!view.busy);
    assert!(view.can_start);
    assert_eq!(view.status.as_deref(), Some(DONE_STATUS));
    assert_eq!(view.outcome, Some(outcome.clone()));
    assert_eq!(
        outcome.summary_line(),
        "Downloaded 3 file(s), 2048 bytes; 1 skipped, 0 failed"
    );

    // Late status lines from a finished run do not overwrite the completion marker.
    let (state, _) = update(state, Msg::Status("stray".to_string()));
    assert_eq!(state.view().status.as_deref(), Some(DONE_STATUS));

    let (state, effects) = update(state, Msg::StartClicked);
    assert_eq!(effects.len(), 1);
    assert_eq!(state.phase(), RunPhase::Extracting);
    assert_eq!(state.view().outcome, None);
}

#[test]
fn failure_returns_to_idle_with_distinct_status() {
    init_logging();
    let state = running_state();
    let (state, _) = update(
        state,
        Msg::RunFailed {
            reason: "archive error: invalid Zip archive".to_string(),
        },
    );
    let view = state.view();

    assert_eq!(view.phase, RunPhase::Idle);
    assert!(!view.busy);
    assert_eq!(
        view.status.as_deref(),
        Some("FAILED: archive error: invalid Zip archive")
    );
    assert_ne!(view.status.as_deref(), Some(DONE_STATUS));
}

#[test]
fn cancel_emits_effect_once() {
    init_logging();
    let state = running_state();
    let (state, effects) = update(state, Msg::CancelClicked);
    assert_eq!(effects, vec![Effect::CancelRun]);
    assert!(state.view().cancel_requested);

    let (state, effects) = update(state, Msg::CancelClicked);
    assert!(effects.is_empty());

    let outcome = RunOutcome::Cancelled { downloaded: 1 };
    assert_eq!(outcome.summary_line(), "Cancelled after 1 file(s)");
    let (state, _) = update(state, Msg::RunFinished(outcome));
    assert_eq!(state.view().status.as_deref(), Some(CANCELLED_STATUS));
    assert!(!state.view().cancel_requested);
}

#[test]
fn cancel_ignored_when_idle() {
    init_logging();
    let (_, effects) = update(AppState::new(), Msg::CancelClicked);
    assert!(effects.is_empty());
}

#[test]
fn validate_inputs_reports_first_problem() {
    assert_eq!(validate_inputs("", "/d"), Err(InputError::MissingArchive));
    assert_eq!(validate_inputs("export", "/d"), Err(InputError::NotAZipArchive));
    assert_eq!(validate_inputs(".zip", "/d"), Err(InputError::NotAZipArchive));
    assert_eq!(validate_inputs("a.ZIP", "  "), Err(InputError::MissingDestination));
    assert_eq!(validate_inputs("a.zip", "/d"), Ok(()));
}
