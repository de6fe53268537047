//! Tagged record storage for agent exchange state.
//!
//! Records are opaque JSON values keyed by `(record_type, id)` with a set
//! of string tags that can be matched exactly. Every update is a
//! compare-and-swap on the record version.

mod error;
mod memory;
mod record;
mod traits;

pub mod conformance;

pub use error::StorageError;
pub use memory::InMemoryStorage;
pub use record::{StorageRecord, TagFilter};
pub use traits::AgentStorage;
