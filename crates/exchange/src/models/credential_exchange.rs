//! Credential exchange record and its state machine.

use std::collections::BTreeMap;
use std::fmt;

use aries_messages::CredentialProposal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{put_tag, Initiator, RecordMeta, RecordModel};
use crate::error::ExchangeError;
use crate::util::new_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialRole {
    Issuer,
    Holder,
}

impl CredentialRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialRole::Issuer => "issuer",
            CredentialRole::Holder => "holder",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialExchangeState {
    ProposalSent,
    ProposalReceived,
    OfferSent,
    OfferReceived,
    RequestSent,
    RequestReceived,
    #[serde(rename = "credential_issued")]
    Issued,
    CredentialReceived,
    #[serde(rename = "credential_acked")]
    Acked,
}

impl CredentialExchangeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProposalSent => "proposal_sent",
            Self::ProposalReceived => "proposal_received",
            Self::OfferSent => "offer_sent",
            Self::OfferReceived => "offer_received",
            Self::RequestSent => "request_sent",
            Self::RequestReceived => "request_received",
            Self::Issued => "credential_issued",
            Self::CredentialReceived => "credential_received",
            Self::Acked => "credential_acked",
        }
    }

    /// Legal edges. `None` is a record that has not entered the protocol
    /// yet (free offers, unsolicited offers).
    pub fn can_transition(from: Option<Self>, to: Self) -> bool {
        use CredentialExchangeState::*;
        matches!(
            (from, to),
            (None, ProposalSent)
                | (None, ProposalReceived)
                | (None, OfferSent)
                | (None, OfferReceived)
                | (Some(ProposalSent), OfferReceived)
                | (Some(ProposalReceived), OfferSent)
                | (Some(OfferReceived), RequestSent)
                | (Some(OfferSent), RequestReceived)
                | (Some(RequestReceived), Issued)
                | (Some(RequestSent), CredentialReceived)
                | (Some(CredentialReceived), Acked)
                | (Some(Issued), Acked)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Acked)
    }
}

impl fmt::Display for CredentialExchangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialExchangeRecord {
    pub credential_exchange_id: String,
    #[serde(default)]
    pub connection_id: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub parent_thread_id: Option<String>,
    pub initiator: Initiator,
    pub role: CredentialRole,
    #[serde(default)]
    pub state: Option<CredentialExchangeState>,
    #[serde(default)]
    pub credential_definition_id: Option<String>,
    #[serde(default)]
    pub schema_id: Option<String>,
    #[serde(default)]
    pub credential_proposal_dict: Option<CredentialProposal>,
    #[serde(default)]
    pub credential_offer: Option<Value>,
    #[serde(default)]
    pub credential_request: Option<Value>,
    #[serde(default)]
    pub credential_request_metadata: Option<Value>,
    #[serde(default)]
    pub credential_id: Option<String>,
    #[serde(default)]
    pub raw_credential: Option<Value>,
    #[serde(default)]
    pub credential: Option<Value>,
    #[serde(default)]
    pub revoc_reg_id: Option<String>,
    #[serde(default)]
    pub revocation_id: Option<String>,
    #[serde(default)]
    pub auto_offer: bool,
    #[serde(default)]
    pub auto_issue: bool,
    #[serde(default)]
    pub auto_remove: bool,
    #[serde(default)]
    pub trace: bool,
    #[serde(default)]
    pub error_state: Option<String>,
    #[serde(flatten)]
    pub meta: RecordMeta,
}

impl CredentialExchangeRecord {
    pub fn new(
        role: CredentialRole,
        initiator: Initiator,
        connection_id: Option<String>,
        state: Option<CredentialExchangeState>,
    ) -> Self {
        CredentialExchangeRecord {
            credential_exchange_id: new_id(),
            connection_id,
            thread_id: None,
            parent_thread_id: None,
            initiator,
            role,
            state,
            credential_definition_id: None,
            schema_id: None,
            credential_proposal_dict: None,
            credential_offer: None,
            credential_request: None,
            credential_request_metadata: None,
            credential_id: None,
            raw_credential: None,
            credential: None,
            revoc_reg_id: None,
            revocation_id: None,
            auto_offer: false,
            auto_issue: false,
            auto_remove: false,
            trace: false,
            error_state: None,
            meta: RecordMeta::default(),
        }
    }

    pub fn state_label(&self) -> &'static str {
        self.state.map(|s| s.as_str()).unwrap_or("none")
    }

    /// Check that `action` may move this record to `to`. Runs before any
    /// side effect so a rejected step leaves the record untouched.
    pub fn ensure_transition(
        &self,
        to: CredentialExchangeState,
        action: &'static str,
    ) -> Result<(), ExchangeError> {
        if CredentialExchangeState::can_transition(self.state, to) {
            Ok(())
        } else {
            Err(ExchangeError::InvalidState {
                record_type: "credential exchange",
                id: self.credential_exchange_id.clone(),
                state: self.state_label().to_string(),
                action,
            })
        }
    }

    /// Check that the record is in `expected` before `action`.
    pub fn ensure_state(
        &self,
        expected: &[CredentialExchangeState],
        action: &'static str,
    ) -> Result<(), ExchangeError> {
        match self.state {
            Some(s) if expected.contains(&s) => Ok(()),
            _ => Err(ExchangeError::InvalidState {
                record_type: "credential exchange",
                id: self.credential_exchange_id.clone(),
                state: self.state_label().to_string(),
                action,
            }),
        }
    }

    pub fn advance(
        &mut self,
        to: CredentialExchangeState,
        action: &'static str,
    ) -> Result<(), ExchangeError> {
        self.ensure_transition(to, action)?;
        debug!(
            exchange_id = %self.credential_exchange_id,
            from = self.state_label(),
            to = to.as_str(),
            action,
            "credential exchange transition"
        );
        self.state = Some(to);
        Ok(())
    }
}

impl RecordModel for CredentialExchangeRecord {
    const RECORD_TYPE: &'static str = "credential_exchange_v10";

    fn id(&self) -> &str {
        &self.credential_exchange_id
    }

    fn tags(&self) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();
        put_tag(&mut tags, "connection_id", self.connection_id.as_deref());
        put_tag(&mut tags, "thread_id", self.thread_id.as_deref());
        put_tag(&mut tags, "initiator", Some(self.initiator.as_str()));
        put_tag(&mut tags, "role", Some(self.role.as_str()));
        put_tag(&mut tags, "state", self.state.map(|s| s.as_str()));
        put_tag(
            &mut tags,
            "credential_definition_id",
            self.credential_definition_id.as_deref(),
        );
        tags
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }
}
