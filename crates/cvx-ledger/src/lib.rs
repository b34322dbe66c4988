//! Append-only request ledger for Civilytix.
//!
//! This crate owns every piece of persisted state:
//! - `EntitlementStore` — read-only view of each user's payment state
//! - `LedgerWriter` / `LedgerReader` — append and query a user's history
//! - `AccountRegistry` — administrative provisioning
//! - `InMemoryLedger` — lock-guarded backend with optional JSON snapshots
//!
//! Appends for one user are serialized by the backend; the history is never
//! rewritten, truncated or reordered.

pub mod config;
pub mod error;
pub mod memory;
pub mod traits;

pub use config::StorageConfig;
pub use error::{LedgerError, LedgerResult};
pub use memory::InMemoryLedger;
pub use traits::{AccountRegistry, EntitlementStore, LedgerReader, LedgerStore, LedgerWriter};
