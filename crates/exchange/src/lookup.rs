//! Cached ledger reads.
//!
//! Schemas, credential definitions and registry definitions are immutable
//! once written, so they are cached without expiry.

use std::sync::Arc;

use serde_json::Value;

use crate::cache::{get_or_create, Cache};
use crate::collaborators::Ledger;
use crate::error::ExchangeError;

#[derive(Clone)]
pub struct LedgerLookup {
    ledger: Arc<dyn Ledger>,
    cache: Arc<dyn Cache>,
}

impl LedgerLookup {
    pub fn new(ledger: Arc<dyn Ledger>, cache: Arc<dyn Cache>) -> Self {
        LedgerLookup { ledger, cache }
    }

    pub fn ledger(&self) -> &dyn Ledger {
        self.ledger.as_ref()
    }

    pub async fn schema(&self, schema_id: &str) -> Result<Value, ExchangeError> {
        get_or_create(self.cache.as_ref(), &format!("schema::{}", schema_id), None, || async {
            let session = self.ledger.open_session().await?;
            Ok(session.get_schema(schema_id).await?)
        })
        .await
    }

    pub async fn credential_definition(&self, cred_def_id: &str) -> Result<Value, ExchangeError> {
        get_or_create(
            self.cache.as_ref(),
            &format!("cred_def::{}", cred_def_id),
            None,
            || async {
                let session = self.ledger.open_session().await?;
                Ok(session.get_credential_definition(cred_def_id).await?)
            },
        )
        .await
    }

    pub async fn schema_id_for_cred_def(&self, cred_def_id: &str) -> Result<String, ExchangeError> {
        let value = get_or_create(
            self.cache.as_ref(),
            &format!("cred_def_schema_id::{}", cred_def_id),
            None,
            || async {
                let session = self.ledger.open_session().await?;
                let schema_id = session.credential_definition_id2schema_id(cred_def_id).await?;
                Ok::<_, ExchangeError>(Value::String(schema_id))
            },
        )
        .await?;
        value.as_str().map(str::to_string).ok_or_else(|| {
            ExchangeError::manager(format!("no schema id for credential definition {}", cred_def_id))
        })
    }

    pub async fn revoc_reg_def(&self, revoc_reg_id: &str) -> Result<Value, ExchangeError> {
        get_or_create(
            self.cache.as_ref(),
            &format!("revoc_reg_def::{}", revoc_reg_id),
            None,
            || async {
                let session = self.ledger.open_session().await?;
                Ok(session.get_revoc_reg_def(revoc_reg_id).await?)
            },
        )
        .await
    }
}
