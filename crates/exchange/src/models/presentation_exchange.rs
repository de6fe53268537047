//! Presentation exchange record and its state machine.

use std::collections::BTreeMap;
use std::fmt;

use aries_messages::{IndyProofRequest, PresentationProposal};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{put_tag, Initiator, RecordMeta, RecordModel};
use crate::error::ExchangeError;
use crate::util::new_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentationRole {
    Prover,
    Verifier,
}

impl PresentationRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresentationRole::Prover => "prover",
            PresentationRole::Verifier => "verifier",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationExchangeState {
    ProposalSent,
    ProposalReceived,
    RequestSent,
    RequestReceived,
    PresentationSent,
    PresentationReceived,
    Verified,
    PresentationAcked,
}

impl PresentationExchangeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProposalSent => "proposal_sent",
            Self::ProposalReceived => "proposal_received",
            Self::RequestSent => "request_sent",
            Self::RequestReceived => "request_received",
            Self::PresentationSent => "presentation_sent",
            Self::PresentationReceived => "presentation_received",
            Self::Verified => "verified",
            Self::PresentationAcked => "presentation_acked",
        }
    }

    pub fn can_transition(from: Option<Self>, to: Self) -> bool {
        use PresentationExchangeState::*;
        matches!(
            (from, to),
            (None, ProposalSent)
                | (None, ProposalReceived)
                | (None, RequestSent)
                | (None, RequestReceived)
                | (Some(ProposalSent), RequestReceived)
                | (Some(ProposalReceived), RequestSent)
                | (Some(RequestReceived), PresentationSent)
                | (Some(RequestSent), PresentationReceived)
                | (Some(PresentationReceived), Verified)
                | (Some(PresentationSent), PresentationAcked)
        )
    }
}

impl fmt::Display for PresentationExchangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationExchangeRecord {
    pub presentation_exchange_id: String,
    #[serde(default)]
    pub connection_id: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
    pub initiator: Initiator,
    pub role: PresentationRole,
    #[serde(default)]
    pub state: Option<PresentationExchangeState>,
    #[serde(default)]
    pub presentation_proposal_dict: Option<PresentationProposal>,
    #[serde(default)]
    pub presentation_request: Option<IndyProofRequest>,
    #[serde(default)]
    pub presentation: Option<Value>,
    /// `"true"` or `"false"` once verified.
    #[serde(default)]
    pub verified: Option<String>,
    #[serde(default)]
    pub auto_present: bool,
    #[serde(default)]
    pub auto_remove: bool,
    #[serde(default)]
    pub trace: bool,
    #[serde(default)]
    pub error_state: Option<String>,
    #[serde(flatten)]
    pub meta: RecordMeta,
}

impl PresentationExchangeRecord {
    pub fn new(
        role: PresentationRole,
        initiator: Initiator,
        connection_id: Option<String>,
        state: Option<PresentationExchangeState>,
    ) -> Self {
        PresentationExchangeRecord {
            presentation_exchange_id: new_id(),
            connection_id,
            thread_id: None,
            initiator,
            role,
            state,
            presentation_proposal_dict: None,
            presentation_request: None,
            presentation: None,
            verified: None,
            auto_present: false,
            auto_remove: false,
            trace: false,
            error_state: None,
            meta: RecordMeta::default(),
        }
    }

    pub fn state_label(&self) -> &'static str {
        self.state.map(|s| s.as_str()).unwrap_or("none")
    }

    fn invalid(&self, action: &'static str) -> ExchangeError {
        ExchangeError::InvalidState {
            record_type: "presentation exchange",
            id: self.presentation_exchange_id.clone(),
            state: self.state_label().to_string(),
            action,
        }
    }

    pub fn ensure_transition(
        &self,
        to: PresentationExchangeState,
        action: &'static str,
    ) -> Result<(), ExchangeError> {
        if PresentationExchangeState::can_transition(self.state, to) {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    pub fn advance(
        &mut self,
        to: PresentationExchangeState,
        action: &'static str,
    ) -> Result<(), ExchangeError> {
        self.ensure_transition(to, action)?;
        debug!(
            exchange_id = %self.presentation_exchange_id,
            from = self.state_label(),
            to = to.as_str(),
            action,
            "presentation exchange transition"
        );
        self.state = Some(to);
        Ok(())
    }
}

impl RecordModel for PresentationExchangeRecord {
    const RECORD_TYPE: &'static str = "presentation_exchange";

    fn id(&self) -> &str {
        &self.presentation_exchange_id
    }

    fn tags(&self) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();
        put_tag(&mut tags, "connection_id", self.connection_id.as_deref());
        put_tag(&mut tags, "thread_id", self.thread_id.as_deref());
        put_tag(&mut tags, "initiator", Some(self.initiator.as_str()));
        put_tag(&mut tags, "role", Some(self.role.as_str()));
        put_tag(&mut tags, "state", self.state.map(|s| s.as_str()));
        tags
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }
}
