//! Connection records, as far as the exchange engine needs them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{put_tag, RecordMeta, RecordModel};
use crate::util::new_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Init,
    Invitation,
    Request,
    Response,
    Active,
    Error,
    Inactive,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Init => "init",
            ConnectionState::Invitation => "invitation",
            ConnectionState::Request => "request",
            ConnectionState::Response => "response",
            ConnectionState::Active => "active",
            ConnectionState::Error => "error",
            ConnectionState::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub connection_id: String,
    pub state: ConnectionState,
    #[serde(default)]
    pub their_did: Option<String>,
    #[serde(default)]
    pub their_label: Option<String>,
    #[serde(flatten)]
    pub meta: RecordMeta,
}

impl ConnectionRecord {
    pub fn new(state: ConnectionState) -> Self {
        ConnectionRecord {
            connection_id: new_id(),
            state,
            their_did: None,
            their_label: None,
            meta: RecordMeta::default(),
        }
    }

    /// Credential and presentation messages are only accepted once the
    /// peer has responded.
    pub fn is_ready(&self) -> bool {
        matches!(
            self.state,
            ConnectionState::Active | ConnectionState::Response
        )
    }
}

impl RecordModel for ConnectionRecord {
    const RECORD_TYPE: &'static str = "connection";

    fn id(&self) -> &str {
        &self.connection_id
    }

    fn tags(&self) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();
        put_tag(&mut tags, "state", Some(self.state.as_str()));
        put_tag(&mut tags, "their_did", self.their_did.as_deref());
        tags
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }
}
