//! aries-exchange: credential and presentation exchange state engine.
//!
//! Drives issue-credential 1.0 and present-proof 1.0 exchanges between
//! agents, keeps issuer revocation registries and their pending
//! revocations, and routes inbound messages to the right exchange.
//!
//! # Public API
//!
//! - [`CredentialManager`] -- issuer and holder side of issue-credential
//! - [`PresentationManager`] -- prover and verifier side of present-proof
//! - [`RevocationCoordinator`] -- registry life-cycle and publication
//! - [`Dispatcher`] -- inbound parsing, connection checks and automation
//! - [`AgentSettings`] -- TOML/env configuration
//!
//! Ledger, wallet crypto and transport are reached through the traits in
//! [`collaborators`].

pub mod cache;
pub mod collaborators;
pub mod config;
pub mod credential_manager;
pub mod dispatcher;
pub mod error;
pub mod lookup;
pub mod models;
pub mod presentation_manager;
pub mod revocation;
pub mod util;

// ── Convenience re-exports ───────────────────────────────────────────

pub use cache::{Cache, CacheError, InMemoryCache};
pub use config::AgentSettings;
pub use credential_manager::{CredentialManager, ExchangeOptions};
pub use dispatcher::{DispatchOutcome, Dispatcher, MessageReceipt};
pub use error::ExchangeError;
pub use lookup::LedgerLookup;
pub use models::{
    ConnectionRecord, ConnectionState, CredDefSentRecord, CredentialExchangeRecord,
    CredentialExchangeState, Initiator, IssuanceType, IssuerRevRegRecord,
    PresentationExchangeRecord, PresentationExchangeState, RecordRepository, RevRegState,
};
pub use presentation_manager::{PresentationManager, PresentationOptions};
pub use revocation::{RegistryCache, RevocationCoordinator, RevocationRegistry};
