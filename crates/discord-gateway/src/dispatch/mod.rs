//! Event dispatch
//!
//! Typed handler registration and the router that fans dispatch frames out to
//! handlers through an [`Executor`].

mod executor;
mod registry;
mod router;

pub use executor::{Executor, TokioExecutor};
pub use registry::EventRegistry;
pub use router::{DispatchRouter, EventSink, RouteOutcome};
