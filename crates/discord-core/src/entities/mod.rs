//! API models - the objects carried by gateway events and REST responses
//!
//! Only the fields the SDK reads are modelled; unknown fields are ignored on decode.

mod application;
mod channel;
mod guild;
mod interaction;
mod message;
mod presence;
mod user;

pub use application::{Application, ApplicationCommand, CommandOption, CommandOptionType};
pub use channel::Channel;
pub use guild::{Guild, UnavailableGuild};
pub use interaction::{CommandDataOption, Interaction, InteractionData, InteractionType};
pub use message::{Message, MessageReference};
pub use presence::{Activity, ActivityType, Status};
pub use user::{Member, User};
