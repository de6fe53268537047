//! aries-messages: DIDComm wire models for the exchange engine.
//!
//! Covers `@type` parsing and version negotiation, the `~thread`,
//! `~trace` and `~attach` decorators, issue-credential 1.0,
//! present-proof 1.0 and notification problem reports, and the Indy
//! proof request carried by presentation requests.

pub mod credential;
pub mod decorators;
pub mod error;
pub mod message;
pub mod message_type;
pub mod presentation;
pub mod problem_report;
pub mod proof_request;
pub mod protocol;

pub use credential::{
    CredAttrSpec, CredentialAck, CredentialIssue, CredentialOffer, CredentialPreview,
    CredentialProposal, CredentialRequest,
};
pub use decorators::{AttachDecorator, MessageHeader, ThreadDecorator, TraceDecorator};
pub use error::MessageError;
pub use message::Message;
pub use message_type::{MessageType, Prefix, ProtocolVersion};
pub use presentation::{
    PresAttrSpec, PresPredSpec, Presentation, PresentationAck, PresentationPreview,
    PresentationProposal, PresentationRequest,
};
pub use problem_report::ProblemReport;
pub use proof_request::{AttrSpec, IndyProofRequest, NonRevoked, PredSpec, Restriction};
pub use protocol::{ProtocolDefinition, ProtocolRegistry};
