use crate::{validate_inputs, AppState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::ArchiveSelected(path) => {
            // Pickers are disabled while a run is active.
            if !state.is_busy() {
                state.set_archive_path(path);
            }
            Vec::new()
        }
        Msg::DestinationSelected(path) => {
            if !state.is_busy() {
                state.set_destination(path);
            }
            Vec::new()
        }
        Msg::StartClicked => {
            if state.is_busy() {
                return (state, Vec::new());
            }
            let (archive_path, destination) = state.inputs();
            if let Err(err) = validate_inputs(archive_path, destination) {
                state.set_status(format!("Cannot start: {err}"));
                return (state, Vec::new());
            }
            let effect = Effect::StartRun {
                archive_path: archive_path.trim().to_string(),
                destination: destination.trim().to_string(),
            };
            state.start_run();
            vec![effect]
        }
        Msg::CancelClicked => {
            if state.request_cancel() {
                state.set_status("Cancelling...");
                vec![Effect::CancelRun]
            } else {
                Vec::new()
            }
        }
        Msg::Status(line) => {
            if state.is_busy() {
                state.set_status(line);
            }
            Vec::new()
        }
        Msg::StageChanged(stage) => {
            state.enter_stage(stage);
            Vec::new()
        }
        Msg::RunFinished(outcome) => {
            if state.is_busy() {
                state.finish_run(outcome);
            }
            Vec::new()
        }
        Msg::RunFailed { reason } => {
            if state.is_busy() {
                state.fail_run(&reason);
            }
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
