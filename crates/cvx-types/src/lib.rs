//! Foundation types for Civilytix.
//!
//! Every other Civilytix crate depends on `cvx-types`. The types here carry
//! no storage or transport concerns; they describe what a paying user asked
//! for and where the result will appear.
//!
//! # Key Types
//!
//! - [`UserId`] — Opaque, externally assigned user identity
//! - [`RequestId`] — Ticket minted for every accepted request (`req_<uuid>`)
//! - [`Entitlement`] — Payment state gating extraction (`paid` / `unpaid`)
//! - [`EndpointKind`] — Which extraction operation was invoked
//! - [`RequestParams`] — Caller payload, stored verbatim
//! - [`ArtifactFormat`] / [`ResultRef`] — Deterministic artifact location
//! - [`RequestRecord`] — Immutable ledger entry
//! - [`UserAccount`] — Per-user aggregate: entitlement plus history

pub mod artifact;
pub mod entitlement;
pub mod error;
pub mod identity;
pub mod record;
pub mod ticket;

pub use artifact::{ArtifactFormat, ResultRef, DEFAULT_VECTOR_DATA_TYPES};
pub use entitlement::Entitlement;
pub use error::TypeError;
pub use identity::UserId;
pub use record::{EndpointKind, RequestEntry, RequestParams, RequestRecord, UserAccount};
pub use ticket::{RequestId, TicketMinter, UuidMinter, REQUEST_ID_PREFIX};
