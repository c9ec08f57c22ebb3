//! Session state
//!
//! Lifecycle state, session id, sequence tracking and resume credentials.

mod session;
mod state;

pub use session::{ResumeInfo, Session, SharedSession};
pub use state::SessionState;
