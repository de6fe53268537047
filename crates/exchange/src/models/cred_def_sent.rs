//! Local note of a credential definition this agent published.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{put_tag, RecordMeta, RecordModel};
use crate::util::{epoch_now, new_id};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredDefSentRecord {
    pub record_id: String,
    pub schema_id: String,
    pub schema_issuer_did: String,
    pub schema_name: String,
    pub schema_version: String,
    pub issuer_did: String,
    pub cred_def_id: String,
    /// Seconds since the epoch when the definition was sent.
    pub epoch: u64,
    #[serde(flatten)]
    pub meta: RecordMeta,
}

impl CredDefSentRecord {
    /// `schema_id` is `{issuer_did}:2:{name}:{version}`.
    pub fn new(schema_id: &str, issuer_did: &str, cred_def_id: &str) -> Self {
        let parts: Vec<&str> = schema_id.split(':').collect();
        let part = |i: usize| parts.get(i).copied().unwrap_or_default().to_string();
        CredDefSentRecord {
            record_id: new_id(),
            schema_id: schema_id.to_string(),
            schema_issuer_did: part(0),
            schema_name: part(2),
            schema_version: part(3),
            issuer_did: issuer_did.to_string(),
            cred_def_id: cred_def_id.to_string(),
            epoch: epoch_now(),
            meta: RecordMeta::default(),
        }
    }
}

impl RecordModel for CredDefSentRecord {
    const RECORD_TYPE: &'static str = "cred_def_sent";

    fn id(&self) -> &str {
        &self.record_id
    }

    fn tags(&self) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();
        put_tag(&mut tags, "schema_id", Some(&self.schema_id));
        put_tag(&mut tags, "schema_issuer_did", Some(&self.schema_issuer_did));
        put_tag(&mut tags, "schema_name", Some(&self.schema_name));
        put_tag(&mut tags, "schema_version", Some(&self.schema_version));
        put_tag(&mut tags, "issuer_did", Some(&self.issuer_did));
        put_tag(&mut tags, "cred_def_id", Some(&self.cred_def_id));
        put_tag(&mut tags, "epoch", Some(&self.epoch.to_string()));
        tags
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }
}
