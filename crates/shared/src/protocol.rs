use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, ApiException, ErrorCode};

/// Command message sent by the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEnvelope {
    #[serde(rename = "cmd", alias = "command")]
    pub command: String,
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(default)]
    pub payload: Value,
}

impl InboundEnvelope {
    pub fn new(command: impl Into<String>, request_id: impl Into<String>, payload: Value) -> Self {
        Self {
            command: command.into(),
            request_id: request_id.into(),
            payload,
        }
    }
}

/// Response to a single inbound envelope.
///
/// Either `error` is set, or the envelope is a success whose `payload` may be
/// absent when the handler had nothing to return. The constructors are the
/// only way to build one, so both fields are never set together. Decoding
/// rejects envelopes that carry both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawOutboundEnvelope")]
pub struct OutboundEnvelope {
    #[serde(rename = "requestId")]
    request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<Value>,
}

#[derive(Deserialize)]
struct RawOutboundEnvelope {
    #[serde(rename = "requestId")]
    request_id: String,
    #[serde(default)]
    payload: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl TryFrom<RawOutboundEnvelope> for OutboundEnvelope {
    type Error = String;

    fn try_from(raw: RawOutboundEnvelope) -> Result<Self, Self::Error> {
        match (raw.payload, raw.error) {
            (Some(_), Some(_)) => Err(format!(
                "envelope '{}' carries both payload and error",
                raw.request_id
            )),
            (_, Some(error)) => Ok(Self::failure(raw.request_id, error)),
            (payload, None) => Ok(Self::success(raw.request_id, payload)),
        }
    }
}

impl OutboundEnvelope {
    pub fn success(request_id: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            request_id: request_id.into(),
            payload,
            error: None,
        }
    }

    pub fn failure(request_id: impl Into<String>, error: Value) -> Self {
        Self {
            request_id: request_id.into(),
            payload: None,
            error: Some(error),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn error(&self) -> Option<&Value> {
        self.error.as_ref()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Converts the envelope into the result the UI side would observe.
    pub fn into_result(self) -> Result<Option<Value>, ApiException> {
        match self.error {
            Some(error) => {
                let api_error = serde_json::from_value::<ApiError>(error.clone())
                    .unwrap_or_else(|_| ApiError::new(ErrorCode::Internal, error.to_string()));
                Err(api_error.into())
            }
            None => Ok(self.payload),
        }
    }
}

/// Uncorrelated message pushed to the UI outside the request/response flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiNotice {
    #[serde(rename = "cmd")]
    pub command: String,
    pub error: String,
}

impl UiNotice {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            command: "error".to_string(),
            error: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UiMessage {
    Response(OutboundEnvelope),
    Notice(UiNotice),
}

impl UiMessage {
    pub fn as_response(&self) -> Option<&OutboundEnvelope> {
        match self {
            Self::Response(envelope) => Some(envelope),
            Self::Notice(_) => None,
        }
    }
}

impl From<OutboundEnvelope> for UiMessage {
    fn from(value: OutboundEnvelope) -> Self {
        Self::Response(value)
    }
}

impl From<UiNotice> for UiMessage {
    fn from(value: UiNotice) -> Self {
        Self::Notice(value)
    }
}
