pub mod session;
pub mod state;

pub use session::{
    spawn, Command, ResetReason, SessionClosed, SessionEvent, SessionHandle,
};
pub use state::{ReviewCycle, ReviewError, ReviewState};
