//! Flow orchestration: the view state machine and the coordinator that
//! drives session, statistics and narrative against it.

pub mod orchestrator;
pub mod state;

pub use orchestrator::{ready_to_render, Orchestrator};
pub use state::{FlowError, FlowEvent, ViewState};
