//! issue-credential 1.0 messages.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decorators::{decode_attachment, AttachDecorator, MessageHeader};
use crate::error::MessageError;
use crate::protocol::ISSUE_CREDENTIAL;

pub const CREDENTIAL_PROPOSAL: &str = "propose-credential";
pub const CREDENTIAL_OFFER: &str = "offer-credential";
pub const CREDENTIAL_REQUEST: &str = "request-credential";
pub const CREDENTIAL_ISSUE: &str = "issue-credential";
pub const CREDENTIAL_ACK: &str = "ack";
pub const CREDENTIAL_PREVIEW: &str = "credential-preview";

pub const ATTACH_CRED_OFFER: &str = "libindy-cred-offer-0";
pub const ATTACH_CRED_REQUEST: &str = "libindy-cred-request-0";
pub const ATTACH_CRED: &str = "libindy-cred-0";

/// Proposal fields that identify a credential definition. Any subset may be
/// present; each maps onto a tag of the issuer's cred-def-sent records.
pub const CRED_DEF_TAGS: [&str; 6] = [
    "schema_id",
    "schema_issuer_did",
    "schema_name",
    "schema_version",
    "issuer_did",
    "cred_def_id",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredAttrSpec {
    pub name: String,
    #[serde(rename = "mime-type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub value: String,
}

impl CredAttrSpec {
    pub fn new(name: &str, value: &str) -> Self {
        CredAttrSpec {
            name: name.to_string(),
            mime_type: None,
            value: value.to_string(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: &str) -> Self {
        self.mime_type = Some(mime_type.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPreview {
    #[serde(rename = "@type")]
    pub preview_type: String,
    pub attributes: Vec<CredAttrSpec>,
}

impl CredentialPreview {
    pub fn new(attributes: Vec<CredAttrSpec>) -> Self {
        CredentialPreview {
            preview_type: ISSUE_CREDENTIAL.message_type(CREDENTIAL_PREVIEW).uri(),
            attributes,
        }
    }

    /// Attribute name to value.
    pub fn attr_dict(&self) -> BTreeMap<String, String> {
        self.attributes
            .iter()
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect()
    }

    pub fn attr_names(&self) -> BTreeSet<String> {
        self.attributes.iter().map(|a| a.name.clone()).collect()
    }

    /// Attribute name to MIME type, for attributes that declare one.
    pub fn mime_types(&self) -> Option<BTreeMap<String, String>> {
        let types: BTreeMap<String, String> = self
            .attributes
            .iter()
            .filter_map(|a| a.mime_type.as_ref().map(|m| (a.name.clone(), m.clone())))
            .collect();
        (!types.is_empty()).then_some(types)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialProposal {
    #[serde(flatten)]
    pub header: MessageHeader,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_proposal: Option<CredentialPreview>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_issuer_did: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_def_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_did: Option<String>,
}

impl CredentialProposal {
    pub fn new(comment: Option<String>, preview: Option<CredentialPreview>) -> Self {
        CredentialProposal {
            header: MessageHeader::new(ISSUE_CREDENTIAL.message_type(CREDENTIAL_PROPOSAL)),
            comment,
            credential_proposal: preview,
            schema_id: None,
            schema_issuer_did: None,
            schema_name: None,
            schema_version: None,
            cred_def_id: None,
            issuer_did: None,
        }
    }

    /// Tag filter over cred-def-sent records built from whichever
    /// identifying fields this proposal carries.
    pub fn cred_def_filter(&self) -> BTreeMap<String, String> {
        let fields = [
            &self.schema_id,
            &self.schema_issuer_did,
            &self.schema_name,
            &self.schema_version,
            &self.issuer_did,
            &self.cred_def_id,
        ];
        CRED_DEF_TAGS
            .iter()
            .zip(fields)
            .filter_map(|(tag, value)| {
                value
                    .as_ref()
                    .filter(|v| !v.is_empty())
                    .map(|v| (tag.to_string(), v.clone()))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialOffer {
    #[serde(flatten)]
    pub header: MessageHeader,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub credential_preview: CredentialPreview,
    #[serde(rename = "offers~attach")]
    pub offers_attach: Vec<AttachDecorator>,
}

impl CredentialOffer {
    pub fn new(comment: Option<String>, preview: CredentialPreview, offer: &Value) -> Self {
        CredentialOffer {
            header: MessageHeader::new(ISSUE_CREDENTIAL.message_type(CREDENTIAL_OFFER)),
            comment,
            credential_preview: preview,
            offers_attach: vec![AttachDecorator::from_json(ATTACH_CRED_OFFER, offer)],
        }
    }

    pub fn indy_offer(&self, index: usize) -> Result<Value, MessageError> {
        decode_attachment(&self.offers_attach, "offers~attach", index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRequest {
    #[serde(flatten)]
    pub header: MessageHeader,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(rename = "requests~attach")]
    pub requests_attach: Vec<AttachDecorator>,
}

impl CredentialRequest {
    pub fn new(comment: Option<String>, request: &Value) -> Self {
        CredentialRequest {
            header: MessageHeader::new(ISSUE_CREDENTIAL.message_type(CREDENTIAL_REQUEST)),
            comment,
            requests_attach: vec![AttachDecorator::from_json(ATTACH_CRED_REQUEST, request)],
        }
    }

    pub fn indy_cred_req(&self, index: usize) -> Result<Value, MessageError> {
        decode_attachment(&self.requests_attach, "requests~attach", index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialIssue {
    #[serde(flatten)]
    pub header: MessageHeader,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(rename = "credentials~attach")]
    pub credentials_attach: Vec<AttachDecorator>,
}

impl CredentialIssue {
    pub fn new(comment: Option<String>, credential: &Value) -> Self {
        CredentialIssue {
            header: MessageHeader::new(ISSUE_CREDENTIAL.message_type(CREDENTIAL_ISSUE)),
            comment,
            credentials_attach: vec![AttachDecorator::from_json(ATTACH_CRED, credential)],
        }
    }

    pub fn indy_credential(&self, index: usize) -> Result<Value, MessageError> {
        decode_attachment(&self.credentials_attach, "credentials~attach", index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialAck {
    #[serde(flatten)]
    pub header: MessageHeader,
    pub status: String,
}

impl CredentialAck {
    pub fn new() -> Self {
        CredentialAck {
            header: MessageHeader::new(ISSUE_CREDENTIAL.message_type(CREDENTIAL_ACK)),
            status: "OK".to_string(),
        }
    }
}

impl Default for CredentialAck {
    fn default() -> Self {
        Self::new()
    }
}
