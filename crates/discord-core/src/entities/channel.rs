//! Channel model

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// A guild or private channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Snowflake,
    /// Channel type (0 = guild text, 1 = DM, 2 = voice, 4 = category, ...)
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Snowflake>,
}

impl Channel {
    pub const GUILD_TEXT: u8 = 0;
    pub const DM: u8 = 1;

    /// Check if this is a direct message channel
    #[inline]
    pub fn is_private(&self) -> bool {
        self.kind == Self::DM
    }
}
