use std::fmt;

/// Errors raised while parsing or validating agent messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    /// The `@type` URI could not be parsed.
    MalformedType(String),
    /// The `@type` names a protocol family or message this agent does not handle.
    UnknownType(String),
    /// The protocol family is known but the version is not supported.
    UnsupportedVersion {
        family: String,
        version: String,
        supported: String,
    },
    /// The message is missing a required field.
    MissingField { field: String },
    /// A field is present but its value is not acceptable.
    Invalid { field: String, message: String },
    /// An attachment could not be decoded.
    Attachment(String),
    /// The message body is not valid JSON for its type.
    Json(String),
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::MalformedType(t) => write!(f, "malformed message type '{}'", t),
            MessageError::UnknownType(t) => write!(f, "unknown message type '{}'", t),
            MessageError::UnsupportedVersion {
                family,
                version,
                supported,
            } => write!(
                f,
                "unsupported version {} of protocol '{}' (supported: {})",
                version, family, supported
            ),
            MessageError::MissingField { field } => {
                write!(f, "message missing required field: '{}'", field)
            }
            MessageError::Invalid { field, message } => {
                write!(f, "invalid '{}': {}", field, message)
            }
            MessageError::Attachment(msg) => write!(f, "attachment error: {}", msg),
            MessageError::Json(msg) => write!(f, "invalid message JSON: {}", msg),
        }
    }
}

impl std::error::Error for MessageError {}

impl From<serde_json::Error> for MessageError {
    fn from(e: serde_json::Error) -> Self {
        MessageError::Json(e.to_string())
    }
}
