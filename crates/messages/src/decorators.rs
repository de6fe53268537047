//! `~thread`, `~trace` and `~attach` decorators plus the common header.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MessageError;
use crate::message_type::MessageType;

pub const JSON_MIME_TYPE: &str = "application/json";

/// Trace target used when tracing is enabled for an exchange.
pub const TRACE_TARGET_LOG: &str = "log";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadDecorator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pthid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceDecorator {
    pub target: String,
    #[serde(default)]
    pub full_thread: bool,
}

impl Default for TraceDecorator {
    fn default() -> Self {
        TraceDecorator {
            target: TRACE_TARGET_LOG.to_string(),
            full_thread: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachData {
    pub base64: String,
}

/// An embedded attachment carrying a base64-encoded JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachDecorator {
    #[serde(rename = "@id")]
    pub ident: String,
    #[serde(rename = "mime-type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub data: AttachData,
}

impl AttachDecorator {
    pub fn from_json(ident: &str, value: &Value) -> Self {
        AttachDecorator {
            ident: ident.to_string(),
            mime_type: Some(JSON_MIME_TYPE.to_string()),
            data: AttachData {
                base64: STANDARD.encode(value.to_string()),
            },
        }
    }

    pub fn decode_json(&self) -> Result<Value, MessageError> {
        let bytes = STANDARD
            .decode(self.data.base64.as_bytes())
            .map_err(|e| MessageError::Attachment(format!("{}: {}", self.ident, e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| MessageError::Attachment(format!("{}: {}", self.ident, e)))
    }
}

/// Decode the attachment at `index` of an `~attach` list.
pub(crate) fn decode_attachment(
    attachments: &[AttachDecorator],
    field: &str,
    index: usize,
) -> Result<Value, MessageError> {
    attachments
        .get(index)
        .ok_or_else(|| MessageError::MissingField {
            field: format!("{}[{}]", field, index),
        })?
        .decode_json()
}

/// Fields every agent message carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    #[serde(rename = "@type")]
    pub msg_type: MessageType,
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "~thread", default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<ThreadDecorator>,
    #[serde(rename = "~trace", default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceDecorator>,
}

impl MessageHeader {
    pub fn new(msg_type: MessageType) -> Self {
        MessageHeader {
            msg_type,
            id: uuid::Uuid::new_v4().to_string(),
            thread: None,
            trace: None,
        }
    }

    /// The thread this message belongs to: `~thread.thid`, else its own `@id`.
    pub fn thread_id(&self) -> &str {
        self.thread
            .as_ref()
            .and_then(|t| t.thid.as_deref())
            .unwrap_or(&self.id)
    }

    pub fn parent_thread_id(&self) -> Option<&str> {
        self.thread.as_ref().and_then(|t| t.pthid.as_deref())
    }

    pub fn assign_thread_id(&mut self, thid: &str, pthid: Option<&str>) {
        self.thread = Some(ThreadDecorator {
            thid: Some(thid.to_string()),
            pthid: pthid.map(str::to_string),
        });
    }

    pub fn assign_trace(&mut self, enabled: bool) {
        self.trace = enabled.then(TraceDecorator::default);
    }
}
