//! Gateway protocol definitions
//!
//! Op codes, the frame envelope and its codec, close codes, and the payloads
//! the client sends.

mod close_codes;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::{CloseAction, CloseCode};
pub use messages::{CodecError, GatewayFrame};
pub use opcodes::OpCode;
pub use payloads::{
    HelloPayload, IdentifyPayload, IdentifyProperties, PresenceUpdatePayload, ResumePayload,
};
