//! Indy proof request structures carried inside `request-presentation`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::MessageError;

pub const PREDICATE_TYPES: [&str; 4] = ["<", "<=", ">=", ">"];

/// Non-revocation interval in epoch seconds. At least one end is required.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonRevoked {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<u64>,
}

impl NonRevoked {
    pub fn validate(&self, field: &str) -> Result<(), MessageError> {
        if self.from.is_none() && self.to.is_none() {
            return Err(MessageError::Invalid {
                field: field.to_string(),
                message: "non-revocation interval must have at least one end".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restriction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_issuer_did: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_did: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_def_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restrictions: Vec<Restriction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<NonRevoked>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredSpec {
    pub name: String,
    pub p_type: String,
    pub p_value: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restrictions: Vec<Restriction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<NonRevoked>,
}

fn default_name() -> String {
    "Proof request".to_string()
}

fn default_version() -> String {
    "1.0".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndyProofRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    pub requested_attributes: BTreeMap<String, AttrSpec>,
    pub requested_predicates: BTreeMap<String, PredSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<NonRevoked>,
}

impl IndyProofRequest {
    pub fn new(name: &str, version: &str) -> Self {
        IndyProofRequest {
            nonce: None,
            name: name.to_string(),
            version: version.to_string(),
            requested_attributes: BTreeMap::new(),
            requested_predicates: BTreeMap::new(),
            non_revoked: None,
        }
    }

    /// Check every non-revocation interval and predicate type.
    pub fn validate(&self) -> Result<(), MessageError> {
        if let Some(nr) = &self.non_revoked {
            nr.validate("non_revoked")?;
        }
        for (referent, spec) in &self.requested_attributes {
            if let Some(nr) = &spec.non_revoked {
                nr.validate(&format!("requested_attributes.{}.non_revoked", referent))?;
            }
        }
        for (referent, spec) in &self.requested_predicates {
            if let Some(nr) = &spec.non_revoked {
                nr.validate(&format!("requested_predicates.{}.non_revoked", referent))?;
            }
            if !PREDICATE_TYPES.contains(&spec.p_type.as_str()) {
                return Err(MessageError::Invalid {
                    field: format!("requested_predicates.{}.p_type", referent),
                    message: format!("'{}' is not one of <, <=, >=, >", spec.p_type),
                });
            }
        }
        Ok(())
    }

    /// The interval that applies to `referent`: its own if present, else
    /// the request-level one.
    pub fn interval_for(&self, referent: &str) -> Option<NonRevoked> {
        self.requested_attributes
            .get(referent)
            .and_then(|s| s.non_revoked)
            .or_else(|| {
                self.requested_predicates
                    .get(referent)
                    .and_then(|s| s.non_revoked)
            })
            .or(self.non_revoked)
    }
}
