//! Typed inbound/outbound agent messages.

use serde::Serialize;
use serde_json::Value;

use crate::credential::{
    CredentialAck, CredentialIssue, CredentialOffer, CredentialProposal, CredentialRequest,
    CREDENTIAL_ACK, CREDENTIAL_ISSUE, CREDENTIAL_OFFER, CREDENTIAL_PROPOSAL, CREDENTIAL_REQUEST,
};
use crate::decorators::MessageHeader;
use crate::error::MessageError;
use crate::message_type::MessageType;
use crate::presentation::{
    Presentation, PresentationAck, PresentationProposal, PresentationRequest, PRESENTATION,
    PRESENTATION_ACK, PRESENTATION_PROPOSAL, PRESENTATION_REQUEST,
};
use crate::problem_report::{ProblemReport, PROBLEM_REPORT};
use crate::protocol::{ProtocolRegistry, ISSUE_CREDENTIAL, PRESENT_PROOF};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Message {
    CredentialProposal(CredentialProposal),
    CredentialOffer(CredentialOffer),
    CredentialRequest(CredentialRequest),
    CredentialIssue(CredentialIssue),
    CredentialAck(CredentialAck),
    PresentationProposal(PresentationProposal),
    PresentationRequest(PresentationRequest),
    Presentation(Presentation),
    PresentationAck(PresentationAck),
    ProblemReport(ProblemReport),
}

impl Message {
    pub fn header(&self) -> &MessageHeader {
        match self {
            Message::CredentialProposal(m) => &m.header,
            Message::CredentialOffer(m) => &m.header,
            Message::CredentialRequest(m) => &m.header,
            Message::CredentialIssue(m) => &m.header,
            Message::CredentialAck(m) => &m.header,
            Message::PresentationProposal(m) => &m.header,
            Message::PresentationRequest(m) => &m.header,
            Message::Presentation(m) => &m.header,
            Message::PresentationAck(m) => &m.header,
            Message::ProblemReport(m) => &m.header,
        }
    }

    pub fn header_mut(&mut self) -> &mut MessageHeader {
        match self {
            Message::CredentialProposal(m) => &mut m.header,
            Message::CredentialOffer(m) => &mut m.header,
            Message::CredentialRequest(m) => &mut m.header,
            Message::CredentialIssue(m) => &mut m.header,
            Message::CredentialAck(m) => &mut m.header,
            Message::PresentationProposal(m) => &mut m.header,
            Message::PresentationRequest(m) => &mut m.header,
            Message::Presentation(m) => &mut m.header,
            Message::PresentationAck(m) => &mut m.header,
            Message::ProblemReport(m) => &mut m.header,
        }
    }

    pub fn message_type(&self) -> &MessageType {
        &self.header().msg_type
    }

    pub fn thread_id(&self) -> &str {
        self.header().thread_id()
    }

    pub fn to_json(&self) -> Result<Value, MessageError> {
        Ok(serde_json::to_value(self)?)
    }
}

macro_rules! impl_from_message {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Message {
                fn from(m: $variant) -> Self {
                    Message::$variant(m)
                }
            }
        )*
    };
}

impl_from_message!(
    CredentialProposal,
    CredentialOffer,
    CredentialRequest,
    CredentialIssue,
    CredentialAck,
    PresentationProposal,
    PresentationRequest,
    Presentation,
    PresentationAck,
    ProblemReport,
);

impl ProtocolRegistry {
    /// Parse a raw inbound message.
    ///
    /// The `@type` must resolve against this registry; problem reports of
    /// any registered family map onto [`ProblemReport`].
    pub fn parse_message(&self, value: &Value) -> Result<Message, MessageError> {
        let raw_type = value
            .get("@type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| MessageError::MissingField {
                field: "@type".to_string(),
            })?;
        let msg_type = MessageType::parse(raw_type)?;
        let definition = self.resolve(&msg_type)?;

        let body = value.clone();
        let message = match (definition.family, msg_type.name.as_str()) {
            (_, PROBLEM_REPORT) => Message::ProblemReport(serde_json::from_value(body)?),
            (f, CREDENTIAL_PROPOSAL) if f == ISSUE_CREDENTIAL.family => {
                Message::CredentialProposal(serde_json::from_value(body)?)
            }
            (f, CREDENTIAL_OFFER) if f == ISSUE_CREDENTIAL.family => {
                Message::CredentialOffer(serde_json::from_value(body)?)
            }
            (f, CREDENTIAL_REQUEST) if f == ISSUE_CREDENTIAL.family => {
                Message::CredentialRequest(serde_json::from_value(body)?)
            }
            (f, CREDENTIAL_ISSUE) if f == ISSUE_CREDENTIAL.family => {
                Message::CredentialIssue(serde_json::from_value(body)?)
            }
            (f, CREDENTIAL_ACK) if f == ISSUE_CREDENTIAL.family => {
                Message::CredentialAck(serde_json::from_value(body)?)
            }
            (f, PRESENTATION_PROPOSAL) if f == PRESENT_PROOF.family => {
                Message::PresentationProposal(serde_json::from_value(body)?)
            }
            (f, PRESENTATION_REQUEST) if f == PRESENT_PROOF.family => {
                Message::PresentationRequest(serde_json::from_value(body)?)
            }
            (f, PRESENTATION) if f == PRESENT_PROOF.family => {
                Message::Presentation(serde_json::from_value(body)?)
            }
            (f, PRESENTATION_ACK) if f == PRESENT_PROOF.family => {
                Message::PresentationAck(serde_json::from_value(body)?)
            }
            _ => return Err(MessageError::UnknownType(raw_type.to_string())),
        };
        Ok(message)
    }
}
