use crate::{RunOutcome, RunPhase};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub phase: RunPhase,
    /// Spinner visible, pickers and the start button disabled.
    pub busy: bool,
    pub can_start: bool,
    pub archive_path: String,
    pub destination: String,
    pub status: Option<String>,
    pub outcome: Option<RunOutcome>,
    pub cancel_requested: bool,
    pub dirty: bool,
}
