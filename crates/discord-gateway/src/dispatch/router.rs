//! Dispatch router

use std::any::TypeId;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use super::registry::AnyEvent;
use super::{EventRegistry, Executor};
use crate::events::EventType;

/// Receives dispatch frames from the shard
pub trait EventSink: Send + Sync + 'static {
    /// Handle one dispatch; must not block on handler completion
    fn dispatch(&self, event_name: &str, payload: Option<Value>);
}

/// What the router did with a dispatch frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Event name not known to this client
    Unknown,
    /// Known event with no registered handlers
    Unhandled,
    /// Payload did not match the event's type
    DecodeFailed,
    /// This many handlers were started
    Dispatched(usize),
}

/// Fans dispatch frames out to the handlers registered for them
pub struct DispatchRouter<C> {
    registry: Arc<EventRegistry<C>>,
    context: C,
    executor: Arc<dyn Executor>,
}

impl<C> DispatchRouter<C>
where
    C: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(registry: Arc<EventRegistry<C>>, context: C, executor: Arc<dyn Executor>) -> Self {
        Self {
            registry,
            context,
            executor,
        }
    }

    /// Decode `payload` once per event type and start every handler in
    /// registration order
    ///
    /// Handler errors are logged per handler and never reach the caller.
    pub fn route(&self, event_name: &str, payload: Option<Value>) -> RouteOutcome {
        let Some(event) = EventType::from_str(event_name) else {
            debug!(event = %event_name, "Dropping unknown dispatch event");
            return RouteOutcome::Unknown;
        };

        let handlers = self.registry.handlers(event);
        if handlers.is_empty() {
            trace!(event = %event, "No handlers registered");
            return RouteOutcome::Unhandled;
        }

        // Payload-less dispatches (RESUMED) decode from an empty object
        let payload = payload.unwrap_or_else(|| Value::Object(Map::new()));
        let mut decoded: Vec<(TypeId, AnyEvent)> = Vec::with_capacity(1);
        let mut started = 0;

        for (index, entry) in handlers.iter().enumerate() {
            let value = match decoded.iter().find(|(id, _)| *id == entry.type_id) {
                Some((_, value)) => Arc::clone(value),
                None => match (entry.decode)(payload.clone()) {
                    Ok(value) => {
                        decoded.push((entry.type_id, Arc::clone(&value)));
                        value
                    }
                    Err(e) => {
                        warn!(
                            event = %event,
                            target_type = entry.type_name,
                            error = %e,
                            "Failed to decode dispatch payload"
                        );
                        continue;
                    }
                },
            };

            let Some(task) = entry.call(self.context.clone(), value) else {
                continue;
            };

            self.executor.spawn(Box::pin(async move {
                if let Err(e) = task.await {
                    let error = format!("{e:#}");
                    warn!(event = %event, handler = index, error = %error, "Event handler failed");
                }
            }));
            started += 1;
        }

        if started == 0 {
            RouteOutcome::DecodeFailed
        } else {
            RouteOutcome::Dispatched(started)
        }
    }
}

impl<C> EventSink for DispatchRouter<C>
where
    C: Clone + Send + Sync + 'static,
{
    fn dispatch(&self, event_name: &str, payload: Option<Value>) {
        self.route(event_name, payload);
    }
}

impl<C> std::fmt::Debug for DispatchRouter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchRouter")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
