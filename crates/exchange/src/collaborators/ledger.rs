use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger object not found: {0}")]
    NotFound(String),
    #[error("ledger request rejected: {0}")]
    Rejected(String),
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// A DID ledger. Reads and writes happen through a session borrowed for a
/// batch of calls; the session is released when dropped.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn LedgerSession>, LedgerError>;
}

#[async_trait]
pub trait LedgerSession: Send + Sync {
    async fn get_schema(&self, schema_id: &str) -> Result<Value, LedgerError>;

    async fn get_credential_definition(&self, cred_def_id: &str) -> Result<Value, LedgerError>;

    async fn credential_definition_id2schema_id(
        &self,
        cred_def_id: &str,
    ) -> Result<String, LedgerError>;

    async fn get_revoc_reg_def(&self, revoc_reg_id: &str) -> Result<Value, LedgerError>;

    /// Revocation registry entry as of `timestamp`, with the ledger
    /// timestamp the entry was actually found at.
    async fn get_revoc_reg_entry(
        &self,
        revoc_reg_id: &str,
        timestamp: u64,
    ) -> Result<(Value, u64), LedgerError>;

    /// Revocation registry delta over `[from, to]`, with the ledger
    /// timestamp of the delta.
    async fn get_revoc_reg_delta(
        &self,
        revoc_reg_id: &str,
        from: Option<u64>,
        to: u64,
    ) -> Result<(Value, u64), LedgerError>;

    async fn send_revoc_reg_def(
        &self,
        revoc_reg_def: &Value,
        issuer_did: &str,
    ) -> Result<(), LedgerError>;

    async fn send_revoc_reg_entry(
        &self,
        revoc_reg_id: &str,
        revoc_def_type: &str,
        revoc_reg_entry: &Value,
        issuer_did: &str,
    ) -> Result<(), LedgerError>;
}
