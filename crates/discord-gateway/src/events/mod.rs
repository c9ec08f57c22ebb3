//! Dispatch events
//!
//! Event names carried in the `t` field and the typed payloads they decode into.

mod event_types;
mod payloads;

pub use event_types::{DispatchEvent, EventType};
pub use payloads::{
    ChannelCreateEvent, ChannelDeleteEvent, ChannelUpdateEvent, GuildCreateEvent,
    GuildDeleteEvent, GuildUpdateEvent, InteractionCreateEvent, MessageCreateEvent,
    MessageDeleteEvent, MessageUpdateEvent, PartialUser, PresenceUpdateEvent, ReadyEvent,
    ResumedEvent, TypingStartEvent,
};
