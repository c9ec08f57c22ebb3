//! Gateway frame envelope and codec

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};

use super::{IdentifyPayload, OpCode, PresenceUpdatePayload, ResumePayload};

/// Codec errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Text was not a JSON object with an integer `op`
    #[error("malformed gateway frame: {0}")]
    MalformedFrame(String),
}

/// A single gateway frame
///
/// `s` and `t` are only set on Dispatch frames.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayFrame {
    pub op: OpCode,
    pub d: Option<Value>,
    pub s: Option<u64>,
    pub t: Option<String>,
}

impl GatewayFrame {
    /// Create a frame with only an op code and payload
    #[must_use]
    pub fn new(op: OpCode, d: Option<Value>) -> Self {
        Self {
            op,
            d,
            s: None,
            t: None,
        }
    }

    /// Create a Dispatch frame (op=0)
    #[must_use]
    pub fn dispatch(event: impl Into<String>, sequence: u64, data: Value) -> Self {
        Self {
            op: OpCode::Dispatch,
            d: Some(data),
            s: Some(sequence),
            t: Some(event.into()),
        }
    }

    /// Create a Heartbeat frame (op=1) echoing the last sequence
    #[must_use]
    pub fn heartbeat(sequence: Option<u64>) -> Self {
        Self::new(OpCode::Heartbeat, sequence.map(Value::from))
    }

    /// Create an Identify frame (op=2)
    #[must_use]
    pub fn identify(payload: &IdentifyPayload) -> Self {
        Self::new(OpCode::Identify, Some(to_value(payload)))
    }

    /// Create a Presence Update frame (op=3)
    #[must_use]
    pub fn presence_update(payload: &PresenceUpdatePayload) -> Self {
        Self::new(OpCode::PresenceUpdate, Some(to_value(payload)))
    }

    /// Create a Resume frame (op=6)
    #[must_use]
    pub fn resume(payload: &ResumePayload) -> Self {
        Self::new(OpCode::Resume, Some(to_value(payload)))
    }

    /// Encode to JSON text
    ///
    /// `op` and `d` are always present; `d` is `null` when there is no payload.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut envelope = Map::new();
        envelope.insert("op".to_string(), Value::from(self.op.as_u8()));
        envelope.insert("d".to_string(), self.d.clone().unwrap_or(Value::Null));
        if let Some(s) = self.s {
            envelope.insert("s".to_string(), Value::from(s));
        }
        if let Some(t) = &self.t {
            envelope.insert("t".to_string(), Value::from(t.as_str()));
        }
        Value::Object(envelope).to_string()
    }

    /// Decode from JSON text
    ///
    /// # Errors
    /// Returns `CodecError::MalformedFrame` if the text is not a JSON object with
    /// an integer `op`, or `s`/`t` have the wrong type.
    pub fn decode(text: &str) -> Result<Self, CodecError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| CodecError::MalformedFrame(format!("invalid JSON: {e}")))?;

        let Value::Object(mut envelope) = value else {
            return Err(CodecError::MalformedFrame("not a JSON object".to_string()));
        };

        let op = envelope
            .get("op")
            .and_then(Value::as_u64)
            .ok_or_else(|| CodecError::MalformedFrame("missing or non-integer op".to_string()))?;
        let op = u8::try_from(op)
            .map(OpCode::from_u8)
            .map_err(|_| CodecError::MalformedFrame(format!("op out of range: {op}")))?;

        let s = match envelope.remove("s") {
            None | Some(Value::Null) => None,
            Some(v) => Some(v.as_u64().ok_or_else(|| {
                CodecError::MalformedFrame(format!("non-integer sequence: {v}"))
            })?),
        };

        let t = match envelope.remove("t") {
            None | Some(Value::Null) => None,
            Some(Value::String(t)) => Some(t),
            Some(v) => {
                return Err(CodecError::MalformedFrame(format!("non-string event name: {v}")))
            }
        };

        let d = match envelope.remove("d") {
            None | Some(Value::Null) => None,
            Some(d) => Some(d),
        };

        Ok(Self { op, d, s, t })
    }

    /// Deserialize the payload into `T`
    ///
    /// # Errors
    /// Returns the `serde_json` error if the payload is missing or has the wrong shape.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.d.clone().unwrap_or(Value::Null))
    }
}

impl std::fmt::Display for GatewayFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(t) = &self.t {
            write!(f, "GatewayFrame(op={}, t={}", self.op, t)?;
            if let Some(s) = self.s {
                write!(f, ", s={s}")?;
            }
            write!(f, ")")
        } else {
            write!(f, "GatewayFrame(op={})", self.op)
        }
    }
}

// Payload structs contain only strings, integers and plain enums
fn to_value<T: Serialize>(payload: &T) -> Value {
    serde_json::to_value(payload).unwrap_or_else(|_| json!({}))
}
