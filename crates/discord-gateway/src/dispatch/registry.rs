//! Typed event handler registry

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::events::{DispatchEvent, EventType};

pub(crate) type AnyEvent = Arc<dyn Any + Send + Sync>;
pub(crate) type DecodeFn = fn(Value) -> Result<AnyEvent, serde_json::Error>;
type ErasedHandler<C> =
    Arc<dyn Fn(C, AnyEvent) -> Option<BoxFuture<'static, anyhow::Result<()>>> + Send + Sync>;

/// A registered handler with the decoder for its event type
pub(crate) struct HandlerEntry<C> {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) decode: DecodeFn,
    handler: ErasedHandler<C>,
}

impl<C> HandlerEntry<C> {
    /// Start the handler; `None` if `event` is not the handler's type
    pub(crate) fn call(
        &self,
        context: C,
        event: AnyEvent,
    ) -> Option<BoxFuture<'static, anyhow::Result<()>>> {
        (self.handler)(context, event)
    }
}

impl<C> Clone for HandlerEntry<C> {
    fn clone(&self) -> Self {
        Self {
            type_id: self.type_id,
            type_name: self.type_name,
            decode: self.decode,
            handler: Arc::clone(&self.handler),
        }
    }
}

/// Handlers per event type, kept in registration order
///
/// Built once at setup time; the shard only reads it.
pub struct EventRegistry<C> {
    handlers: HashMap<EventType, Vec<HandlerEntry<C>>>,
}

impl<C> EventRegistry<C>
where
    C: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for event `E`
    ///
    /// ```ignore
    /// registry.on(|ctx: Context, msg: Arc<MessageCreateEvent>| async move {
    ///     println!("{}", msg.content);
    ///     Ok(())
    /// });
    /// ```
    pub fn on<E, F, Fut>(&mut self, handler: F) -> &mut Self
    where
        E: DispatchEvent,
        F: Fn(C, Arc<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let erased: ErasedHandler<C> = Arc::new(move |context: C, event: AnyEvent| {
            let event = event.downcast::<E>().ok()?;
            let fut: BoxFuture<'static, anyhow::Result<()>> = Box::pin(handler(context, event));
            Some(fut)
        });

        self.handlers.entry(E::TYPE).or_default().push(HandlerEntry {
            type_id: TypeId::of::<E>(),
            type_name: std::any::type_name::<E>(),
            decode: decode_event::<E>,
            handler: erased,
        });
        self
    }

    /// Number of handlers registered for `event`
    pub fn handler_count(&self, event: EventType) -> usize {
        self.handlers.get(&event).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.values().all(Vec::is_empty)
    }

    pub(crate) fn handlers(&self, event: EventType) -> &[HandlerEntry<C>] {
        self.handlers.get(&event).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl<C> Default for EventRegistry<C>
where
    C: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for EventRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<&str, usize> = self
            .handlers
            .iter()
            .map(|(event, handlers)| (event.as_str(), handlers.len()))
            .collect();
        f.debug_struct("EventRegistry")
            .field("handlers", &counts)
            .finish()
    }
}

fn decode_event<E: DispatchEvent>(payload: Value) -> Result<AnyEvent, serde_json::Error> {
    let event: E = serde_json::from_value(payload)?;
    Ok(Arc::new(event))
}
