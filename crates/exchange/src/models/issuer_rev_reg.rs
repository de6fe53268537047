//! Issuer-side revocation registry record.
//!
//! Life-cycle: `init -> generated -> published -> active -> full`. The
//! steps that talk to the issuer or the ledger live on
//! [`RevocationCoordinator`](crate::revocation::RevocationCoordinator);
//! this module holds the record and its local bookkeeping.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::{put_tag, RecordMeta, RecordModel};
use crate::error::ExchangeError;
use crate::util::new_id;

pub const DEFAULT_REGISTRY_SIZE: u32 = 100;
pub const REVOC_DEF_TYPE_CL: &str = "CL_ACCUM";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevRegState {
    Init,
    Generated,
    Published,
    Active,
    Full,
}

impl RevRegState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevRegState::Init => "init",
            RevRegState::Generated => "generated",
            RevRegState::Published => "published",
            RevRegState::Active => "active",
            RevRegState::Full => "full",
        }
    }
}

impl fmt::Display for RevRegState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssuanceType {
    #[serde(rename = "ISSUANCE_BY_DEFAULT")]
    ByDefault,
    #[serde(rename = "ISSUANCE_ON_DEMAND")]
    OnDemand,
}

impl IssuanceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssuanceType::ByDefault => "ISSUANCE_BY_DEFAULT",
            IssuanceType::OnDemand => "ISSUANCE_ON_DEMAND",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuerRevRegRecord {
    pub record_id: String,
    pub state: RevRegState,
    pub cred_def_id: String,
    pub issuer_did: String,
    pub issuance_type: IssuanceType,
    pub max_cred_num: u32,
    pub revoc_def_type: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub revoc_reg_id: Option<String>,
    #[serde(default)]
    pub revoc_reg_def: Option<Value>,
    #[serde(default)]
    pub revoc_reg_entry: Option<Value>,
    #[serde(default)]
    pub tails_hash: Option<String>,
    #[serde(default)]
    pub tails_local_path: Option<String>,
    #[serde(default)]
    pub tails_public_uri: Option<String>,
    /// Revocation indices revoked locally but not yet written to the ledger.
    #[serde(default)]
    pub pending_pub: Vec<String>,
    #[serde(default)]
    pub error_msg: Option<String>,
    #[serde(flatten)]
    pub meta: RecordMeta,
}

impl IssuerRevRegRecord {
    pub fn new(
        cred_def_id: &str,
        issuer_did: &str,
        issuance_type: IssuanceType,
        max_cred_num: Option<u32>,
        revoc_def_type: Option<&str>,
        tag: Option<&str>,
    ) -> Self {
        IssuerRevRegRecord {
            record_id: new_id(),
            state: RevRegState::Init,
            cred_def_id: cred_def_id.to_string(),
            issuer_did: issuer_did.to_string(),
            issuance_type,
            max_cred_num: max_cred_num.unwrap_or(DEFAULT_REGISTRY_SIZE),
            revoc_def_type: revoc_def_type.unwrap_or(REVOC_DEF_TYPE_CL).to_string(),
            tag: tag.map(str::to_string),
            revoc_reg_id: None,
            revoc_reg_def: None,
            revoc_reg_entry: None,
            tails_hash: None,
            tails_local_path: None,
            tails_public_uri: None,
            pending_pub: Vec::new(),
            error_msg: None,
            meta: RecordMeta::default(),
        }
    }

    pub fn ensure_state(
        &self,
        allowed: &[RevRegState],
        action: &'static str,
    ) -> Result<(), ExchangeError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ExchangeError::Revocation(format!(
                "registry {} in state {}: cannot {}",
                self.record_id, self.state, action
            )))
        }
    }

    /// Revocation registry id, which only exists once generated.
    pub fn registry_id(&self) -> Result<&str, ExchangeError> {
        self.revoc_reg_id.as_deref().ok_or_else(|| {
            ExchangeError::Revocation(format!(
                "registry {} has not been generated",
                self.record_id
            ))
        })
    }

    /// Point the definition at a public tails location. The definition must
    /// already name a local tails location.
    pub fn set_tails_file_public_uri(&mut self, uri: &str) -> Result<(), ExchangeError> {
        let location = self
            .revoc_reg_def
            .as_mut()
            .and_then(|d| d.get_mut("value"))
            .and_then(|v| v.as_object_mut())
            .filter(|v| v.contains_key("tailsLocation"))
            .ok_or_else(|| {
                ExchangeError::Revocation("revocation registry undefined".to_string())
            })?;
        check_url(uri)?;
        location.insert("tailsLocation".to_string(), Value::String(uri.to_string()));
        self.tails_public_uri = Some(uri.to_string());
        Ok(())
    }

    /// Add `cred_rev_id` to the pending set. Returns false if it was
    /// already pending.
    pub fn add_pending(&mut self, cred_rev_id: &str) -> bool {
        if self.pending_pub.iter().any(|p| p == cred_rev_id) {
            return false;
        }
        self.pending_pub.push(cred_rev_id.to_string());
        self.pending_pub.sort_by(|a, b| index_order(a, b));
        true
    }

    /// Drop `published` from the pending set; everything else stays.
    pub fn remove_pending(&mut self, published: &[String]) -> bool {
        let before = self.pending_pub.len();
        self.pending_pub.retain(|p| !published.contains(p));
        before != self.pending_pub.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending_pub.is_empty()
    }
}

/// Numeric order for index strings, falling back to text order.
fn index_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// A tails URI needs a scheme, a host and a path.
pub fn check_url(uri: &str) -> Result<(), ExchangeError> {
    let parsed = Url::parse(uri)
        .map_err(|e| ExchangeError::Revocation(format!("URI {} is not a valid URL: {}", uri, e)))?;
    let has_path = !parsed.path().trim_start_matches('/').is_empty();
    if parsed.scheme().is_empty() || parsed.host_str().is_none() || !has_path {
        return Err(ExchangeError::Revocation(format!(
            "URI {} is not a valid URL",
            uri
        )));
    }
    Ok(())
}

impl RecordModel for IssuerRevRegRecord {
    const RECORD_TYPE: &'static str = "issuer_rev_reg";

    fn id(&self) -> &str {
        &self.record_id
    }

    fn tags(&self) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();
        put_tag(&mut tags, "cred_def_id", Some(&self.cred_def_id));
        put_tag(&mut tags, "issuance_type", Some(self.issuance_type.as_str()));
        put_tag(&mut tags, "issuer_did", Some(&self.issuer_did));
        put_tag(&mut tags, "revoc_def_type", Some(&self.revoc_def_type));
        put_tag(&mut tags, "revoc_reg_id", self.revoc_reg_id.as_deref());
        put_tag(&mut tags, "state", Some(self.state.as_str()));
        tags
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }
}
