use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifierError {
    #[error("verifier error: {0}")]
    Failed(String),
}

/// Ledger material resolved for verifying one presentation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerificationInputs {
    pub schemas: BTreeMap<String, Value>,
    pub cred_defs: BTreeMap<String, Value>,
    pub rev_reg_defs: BTreeMap<String, Value>,
    /// registry id -> ledger timestamp -> registry entry
    pub rev_reg_entries: BTreeMap<String, BTreeMap<u64, Value>>,
}

#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify_presentation(
        &self,
        proof_request: &Value,
        presentation: &Value,
        inputs: &VerificationInputs,
    ) -> Result<bool, VerifierError>;
}
