//! Handler context

use std::sync::Arc;
use std::time::Duration;

use discord_core::{Activity, Message, Snowflake, Status};
use discord_gateway::{PresenceUpdatePayload, ShardHandle};
use discord_http::{CreateMessage, Http, HttpResult};

/// Passed to every event handler
///
/// Cheap to clone; gives access to REST and to the running shard.
#[derive(Debug, Clone)]
pub struct Context {
    http: Arc<Http>,
    shard: ShardHandle,
}

impl Context {
    #[must_use]
    pub fn new(http: Arc<Http>, shard: ShardHandle) -> Self {
        Self { http, shard }
    }

    pub fn http(&self) -> &Http {
        &self.http
    }

    pub fn shard(&self) -> &ShardHandle {
        &self.shard
    }

    /// Latest gateway latency
    pub fn latency(&self) -> Option<Duration> {
        self.shard.latency()
    }

    /// Replace the bot's presence
    ///
    /// Also used for the next Identify. Returns false once the shard has stopped.
    pub fn change_presence(&self, activities: Vec<Activity>, status: Status, afk: bool) -> bool {
        let mut presence = PresenceUpdatePayload::new(status);
        presence.activities = activities;
        if afk {
            presence = presence.with_afk(chrono::Utc::now().timestamp_millis());
        }
        self.shard.update_presence(presence)
    }

    pub async fn send_message(
        &self,
        channel_id: Snowflake,
        content: impl Into<String>,
    ) -> HttpResult<Message> {
        self.http
            .create_message(channel_id, &CreateMessage::new(content))
            .await
    }

    /// Reply to `message` in its channel
    pub async fn reply(&self, message: &Message, content: impl Into<String>) -> HttpResult<Message> {
        let reply = CreateMessage::new(content).reply_to(message.channel_id, message.id);
        self.http.create_message(message.channel_id, &reply).await
    }
}
