//! Registered protocol families and version negotiation.

use crate::error::MessageError;
use crate::message_type::{MessageType, ProtocolVersion};

/// One protocol family this agent understands.
///
/// Inbound messages with the same major version and a minor version of at
/// least `minimum_minor` are accepted, including minor versions newer than
/// `current_minor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolDefinition {
    pub family: &'static str,
    pub major: u32,
    pub minimum_minor: u32,
    pub current_minor: u32,
    pub messages: &'static [&'static str],
}

impl ProtocolDefinition {
    pub fn current_version(&self) -> ProtocolVersion {
        ProtocolVersion::new(self.major, self.current_minor)
    }

    /// Outbound message type for `name` at the current version.
    pub fn message_type(&self, name: &str) -> MessageType {
        MessageType::new(self.family, self.current_version(), name)
    }

    pub fn accepts(&self, version: ProtocolVersion) -> bool {
        version.major == self.major && version.minor >= self.minimum_minor
    }
}

pub const ISSUE_CREDENTIAL: ProtocolDefinition = ProtocolDefinition {
    family: "issue-credential",
    major: 1,
    minimum_minor: 0,
    current_minor: 0,
    messages: &[
        "propose-credential",
        "offer-credential",
        "request-credential",
        "issue-credential",
        "ack",
        "problem-report",
    ],
};

pub const PRESENT_PROOF: ProtocolDefinition = ProtocolDefinition {
    family: "present-proof",
    major: 1,
    minimum_minor: 0,
    current_minor: 0,
    messages: &[
        "propose-presentation",
        "request-presentation",
        "presentation",
        "ack",
        "problem-report",
    ],
};

pub const NOTIFICATION: ProtocolDefinition = ProtocolDefinition {
    family: "notification",
    major: 1,
    minimum_minor: 0,
    current_minor: 0,
    messages: &["problem-report"],
};

/// The set of protocol families an agent dispatches.
#[derive(Debug, Clone, Default)]
pub struct ProtocolRegistry {
    protocols: Vec<ProtocolDefinition>,
}

impl ProtocolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with issue-credential, present-proof and notification.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ISSUE_CREDENTIAL);
        registry.register(PRESENT_PROOF);
        registry.register(NOTIFICATION);
        registry
    }

    /// Register a protocol family, replacing any earlier definition for the
    /// same family and major version.
    pub fn register(&mut self, definition: ProtocolDefinition) {
        self.protocols
            .retain(|p| !(p.family == definition.family && p.major == definition.major));
        self.protocols.push(definition);
    }

    pub fn protocols(&self) -> &[ProtocolDefinition] {
        &self.protocols
    }

    /// Find the definition that accepts `msg_type`.
    pub fn resolve(&self, msg_type: &MessageType) -> Result<&ProtocolDefinition, MessageError> {
        let candidates: Vec<&ProtocolDefinition> = self
            .protocols
            .iter()
            .filter(|p| p.family == msg_type.family)
            .collect();
        if candidates.is_empty() {
            return Err(MessageError::UnknownType(msg_type.uri()));
        }
        let definition = candidates
            .iter()
            .find(|p| p.accepts(msg_type.version))
            .ok_or_else(|| MessageError::UnsupportedVersion {
                family: msg_type.family.clone(),
                version: msg_type.version.to_string(),
                supported: candidates
                    .iter()
                    .map(|p| format!("{}.{}+", p.major, p.minimum_minor))
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;
        if !definition.messages.contains(&msg_type.name.as_str()) {
            return Err(MessageError::UnknownType(msg_type.uri()));
        }
        Ok(definition)
    }
}
