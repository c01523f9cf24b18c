#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User picked the export archive.
    ArchiveSelected(String),
    /// User picked the download destination directory.
    DestinationSelected(String),
    /// User clicked "Download Photos".
    StartClicked,
    /// User asked to stop the active run.
    CancelClicked,
    /// Engine status line for the active run.
    Status(String),
    /// Engine moved to another pipeline stage.
    StageChanged(crate::Stage),
    /// Engine finished the run (successfully or after cancellation).
    RunFinished(crate::RunOutcome),
    /// Engine aborted the run.
    RunFailed { reason: String },
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
