//! Event payload definitions

use serde::{Deserialize, Serialize};

use discord_core::{
    Activity, Application, Channel, Guild, Interaction, Member, Message, Snowflake, Status,
    UnavailableGuild, User,
};

use super::{DispatchEvent, EventType};

/// Events whose payload is a full model object
macro_rules! model_event {
    ($(#[$meta:meta])* $name:ident($inner:ty) => $kind:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl std::ops::Deref for $name {
            type Target = $inner;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl DispatchEvent for $name {
            const TYPE: EventType = EventType::$kind;
        }
    };
}

// === Connection Events ===

/// READY event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyEvent {
    /// Gateway protocol version
    pub v: u8,
    /// The current user
    pub user: User,
    /// Guilds the user is in; each arrives later as GUILD_CREATE
    pub guilds: Vec<UnavailableGuild>,
    pub session_id: String,
    /// Gateway URL to use when resuming this session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_gateway_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard: Option<[u32; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<Application>,
}

impl DispatchEvent for ReadyEvent {
    const TYPE: EventType = EventType::Ready;
}

/// RESUMED event payload (carries no data)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumedEvent {}

impl DispatchEvent for ResumedEvent {
    const TYPE: EventType = EventType::Resumed;
}

// === Guild Events ===

model_event!(
    /// Guild became available, was joined, or was created
    GuildCreateEvent(Guild) => GuildCreate
);
model_event!(
    /// Guild settings changed
    GuildUpdateEvent(Guild) => GuildUpdate
);
model_event!(
    /// Guild left or became unavailable (`unavailable` is false when the user was removed)
    GuildDeleteEvent(UnavailableGuild) => GuildDelete
);

// === Channel Events ===

model_event!(ChannelCreateEvent(Channel) => ChannelCreate);
model_event!(ChannelUpdateEvent(Channel) => ChannelUpdate);
model_event!(ChannelDeleteEvent(Channel) => ChannelDelete);

// === Message Events ===

model_event!(
    /// New message
    MessageCreateEvent(Message) => MessageCreate
);

/// MESSAGE_UPDATE payload
///
/// Edits can be partial, so only the identifying fields are guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageUpdateEvent {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

impl DispatchEvent for MessageUpdateEvent {
    const TYPE: EventType = EventType::MessageUpdate;
}

/// MESSAGE_DELETE payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDeleteEvent {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
}

impl DispatchEvent for MessageDeleteEvent {
    const TYPE: EventType = EventType::MessageDelete;
}

// === Interactions ===

model_event!(
    /// Slash command, component or modal interaction
    InteractionCreateEvent(Interaction) => InteractionCreate
);

// === Presence and typing ===

/// TYPING_START payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingStartEvent {
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub user_id: Snowflake,
    /// Unix time in seconds
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<Member>,
}

impl DispatchEvent for TypingStartEvent {
    const TYPE: EventType = EventType::TypingStart;
}

/// User object in presence updates; only `id` is guaranteed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialUser {
    pub id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// PRESENCE_UPDATE payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUpdateEvent {
    pub user: PartialUser,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub status: Status,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

impl DispatchEvent for PresenceUpdateEvent {
    const TYPE: EventType = EventType::PresenceUpdate;
}
