//! Slack photos core: pure run state machine and view-model helpers.
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use state::{
    validate_inputs, AppState, InputError, RunOutcome, RunPhase, Stage, CANCELLED_STATUS,
    DONE_STATUS,
};
pub use update::update;
pub use view_model::AppViewModel;
