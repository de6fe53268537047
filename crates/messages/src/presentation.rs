//! present-proof 1.0 messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decorators::{decode_attachment, AttachDecorator, MessageHeader};
use crate::error::MessageError;
use crate::proof_request::{AttrSpec, IndyProofRequest, PredSpec, Restriction};
use crate::protocol::PRESENT_PROOF;

pub const PRESENTATION_PROPOSAL: &str = "propose-presentation";
pub const PRESENTATION_REQUEST: &str = "request-presentation";
pub const PRESENTATION: &str = "presentation";
pub const PRESENTATION_ACK: &str = "ack";
pub const PRESENTATION_PREVIEW: &str = "presentation-preview";

pub const ATTACH_PRESENTATION_REQUEST: &str = "libindy-request-presentation-0";
pub const ATTACH_PRESENTATION: &str = "libindy-presentation-0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresAttrSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_def_id: Option<String>,
    #[serde(rename = "mime-type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresPredSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_def_id: Option<String>,
    pub predicate: String,
    pub threshold: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationPreview {
    #[serde(rename = "@type")]
    pub preview_type: String,
    pub attributes: Vec<PresAttrSpec>,
    #[serde(default)]
    pub predicates: Vec<PresPredSpec>,
}

impl PresentationPreview {
    pub fn new(attributes: Vec<PresAttrSpec>, predicates: Vec<PresPredSpec>) -> Self {
        PresentationPreview {
            preview_type: PRESENT_PROOF.message_type(PRESENTATION_PREVIEW).uri(),
            attributes,
            predicates,
        }
    }

    /// Build the proof request a verifier sends in answer to this preview.
    ///
    /// Attribute referents are `{index}_{name}_uuid`; predicate referents are
    /// `{index}_{name}_GE_uuid` style, keyed by the predicate symbol.
    pub fn indy_proof_request(&self, name: &str, version: &str, nonce: &str) -> IndyProofRequest {
        let restrict = |cred_def_id: &Option<String>| match cred_def_id {
            Some(id) => vec![Restriction {
                cred_def_id: Some(id.clone()),
                ..Restriction::default()
            }],
            None => Vec::new(),
        };

        let mut request = IndyProofRequest::new(name, version);
        request.nonce = Some(nonce.to_string());
        for (i, attr) in self.attributes.iter().enumerate() {
            request.requested_attributes.insert(
                format!("{}_{}_uuid", i, attr.name),
                AttrSpec {
                    name: attr.name.clone(),
                    restrictions: restrict(&attr.cred_def_id),
                    non_revoked: None,
                },
            );
        }
        for (i, pred) in self.predicates.iter().enumerate() {
            request.requested_predicates.insert(
                format!("{}_{}_{}_uuid", i, pred.name, predicate_label(&pred.predicate)),
                PredSpec {
                    name: pred.name.clone(),
                    p_type: pred.predicate.clone(),
                    p_value: pred.threshold,
                    restrictions: restrict(&pred.cred_def_id),
                    non_revoked: None,
                },
            );
        }
        request
    }
}

fn predicate_label(predicate: &str) -> &'static str {
    match predicate {
        "<" => "LT",
        "<=" => "LE",
        ">" => "GT",
        _ => "GE",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationProposal {
    #[serde(flatten)]
    pub header: MessageHeader,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub presentation_proposal: PresentationPreview,
}

impl PresentationProposal {
    pub fn new(comment: Option<String>, preview: PresentationPreview) -> Self {
        PresentationProposal {
            header: MessageHeader::new(PRESENT_PROOF.message_type(PRESENTATION_PROPOSAL)),
            comment,
            presentation_proposal: preview,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationRequest {
    #[serde(flatten)]
    pub header: MessageHeader,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(rename = "request_presentations~attach")]
    pub request_presentations_attach: Vec<AttachDecorator>,
}

impl PresentationRequest {
    pub fn new(comment: Option<String>, proof_request: &IndyProofRequest) -> Result<Self, MessageError> {
        let value = serde_json::to_value(proof_request)?;
        Ok(PresentationRequest {
            header: MessageHeader::new(PRESENT_PROOF.message_type(PRESENTATION_REQUEST)),
            comment,
            request_presentations_attach: vec![AttachDecorator::from_json(
                ATTACH_PRESENTATION_REQUEST,
                &value,
            )],
        })
    }

    pub fn indy_proof_request(&self, index: usize) -> Result<IndyProofRequest, MessageError> {
        let value = decode_attachment(
            &self.request_presentations_attach,
            "request_presentations~attach",
            index,
        )?;
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presentation {
    #[serde(flatten)]
    pub header: MessageHeader,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(rename = "presentations~attach")]
    pub presentations_attach: Vec<AttachDecorator>,
}

impl Presentation {
    pub fn new(comment: Option<String>, proof: &Value) -> Self {
        Presentation {
            header: MessageHeader::new(PRESENT_PROOF.message_type(PRESENTATION)),
            comment,
            presentations_attach: vec![AttachDecorator::from_json(ATTACH_PRESENTATION, proof)],
        }
    }

    pub fn indy_proof(&self, index: usize) -> Result<Value, MessageError> {
        decode_attachment(&self.presentations_attach, "presentations~attach", index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationAck {
    #[serde(flatten)]
    pub header: MessageHeader,
    pub status: String,
}

impl PresentationAck {
    pub fn new() -> Self {
        PresentationAck {
            header: MessageHeader::new(PRESENT_PROOF.message_type(PRESENTATION_ACK)),
            status: "OK".to_string(),
        }
    }
}

impl Default for PresentationAck {
    fn default() -> Self {
        Self::new()
    }
}
