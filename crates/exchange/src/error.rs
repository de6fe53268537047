use aries_messages::MessageError;
use aries_storage::StorageError;

use crate::cache::CacheError;
use crate::collaborators::{
    HolderError, IssuerError, LedgerError, TailsError, TransportError, VerifierError,
};

/// Every error a manager, the revocation coordinator or the dispatcher can
/// return.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// Protocol or business-rule violation.
    #[error("{0}")]
    Manager(String),

    /// The record is not in a state that allows the requested step.
    #[error("{record_type} {id} in state {state}: cannot {action}")]
    InvalidState {
        record_type: &'static str,
        id: String,
        state: String,
        action: &'static str,
    },

    /// No matching exchange, registry or connection record.
    #[error("not found: {0}")]
    NotFound(String),

    /// The issuer's revocation registry has no free indices.
    #[error("revocation registry {registry_id} is full")]
    RegistryFull { registry_id: String },

    #[error("revocation not supported: {0}")]
    RevocationNotSupported(String),

    #[error("revocation error: {0}")]
    Revocation(String),

    #[error("connection not ready: {0}")]
    ConnectionNotReady(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Issuer(IssuerError),

    #[error(transparent)]
    Holder(#[from] HolderError),

    #[error(transparent)]
    Verifier(#[from] VerifierError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Tails(#[from] TailsError),

    #[error("storage error: {0}")]
    Storage(StorageError),

    #[error("message error: {0}")]
    Message(#[from] MessageError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExchangeError {
    pub fn manager(msg: impl Into<String>) -> Self {
        ExchangeError::Manager(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ExchangeError::NotFound(_))
    }

    /// Short machine-readable code used in outbound problem reports.
    pub fn problem_code(&self) -> &'static str {
        match self {
            ExchangeError::Manager(_) | ExchangeError::InvalidState { .. } => "protocol-error",
            ExchangeError::NotFound(_) => "not-found",
            ExchangeError::RegistryFull { .. }
            | ExchangeError::RevocationNotSupported(_)
            | ExchangeError::Revocation(_) => "revocation-error",
            ExchangeError::ConnectionNotReady(_) => "connection-not-ready",
            ExchangeError::Message(_) => "message-parse-failure",
            _ => "internal-error",
        }
    }
}

/// Missing records become `NotFound`; everything else is a storage fault.
impl From<StorageError> for ExchangeError {
    fn from(e: StorageError) -> Self {
        if e.is_not_found() {
            ExchangeError::NotFound(e.to_string())
        } else {
            ExchangeError::Storage(e)
        }
    }
}

/// A full registry surfaces as its own variant so callers can rotate.
impl From<IssuerError> for ExchangeError {
    fn from(e: IssuerError) -> Self {
        match e {
            IssuerError::RegistryFull { registry_id } => ExchangeError::RegistryFull { registry_id },
            other => ExchangeError::Issuer(other),
        }
    }
}
