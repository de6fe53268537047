//! Contracts for the services the exchange engine depends on.
//!
//! Each collaborator is an `async_trait` object passed into the managers
//! at construction time. Implementations own their own timeouts; errors
//! propagate unchanged through [`ExchangeError`](crate::ExchangeError).

mod holder;
mod issuer;
mod ledger;
mod transport;
mod verifier;

pub use holder::{CredentialRequestResult, Holder, HolderError, PresentationInputs, StoreCredential};
pub use issuer::{CreatedRegistry, IssuedCredential, Issuer, IssuerError, RegistrySpec};
pub use ledger::{Ledger, LedgerError, LedgerSession};
pub use transport::{OutboundTarget, OutboundTransport, TailsError, TailsFetcher, TransportError};
pub use verifier::{VerificationInputs, Verifier, VerifierError};
