#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start one extract → scan → download run on the engine.
    StartRun {
        archive_path: String,
        destination: String,
    },
    /// Stop issuing new work for the active run.
    CancelRun,
}
