use async_trait::async_trait;
use cvx_types::{Entitlement, RequestEntry, RequestId, RequestRecord, UserAccount, UserId};

use crate::error::LedgerResult;

/// Read boundary for payment entitlements.
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    /// Current entitlement of `user`.
    ///
    /// An unknown user is `Unpaid`, not an error. `Err` is reserved for
    /// storage faults.
    async fn entitlement(&self, user: &UserId) -> LedgerResult<Entitlement>;
}

/// Write boundary for request history.
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    /// Create `user` if absent, then append `entry` to the end of their
    /// history as one atomic step.
    ///
    /// Concurrent appends for the same user are serialized by the backend;
    /// none may be lost. The returned record carries the timestamp the
    /// ledger assigned, which never precedes the previous record's.
    async fn append_request(&self, user: &UserId, entry: RequestEntry)
        -> LedgerResult<RequestRecord>;
}

/// Read boundary for request history.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Full history in insertion order. `UserNotFound` for unknown users.
    async fn read_all(&self, user: &UserId) -> LedgerResult<Vec<RequestRecord>>;

    /// One history entry by ticket.
    ///
    /// Fails with `UserNotFound` or `RequestNotFound`; callers that must not
    /// reveal which users exist should treat both alike.
    async fn read_one(&self, user: &UserId, request_id: &RequestId)
        -> LedgerResult<RequestRecord>;

    /// Number of records held for `user` (0 if unknown).
    async fn history_len(&self, user: &UserId) -> LedgerResult<usize>;
}

/// Administrative account management.
#[async_trait]
pub trait AccountRegistry: Send + Sync {
    /// Create a new account. Fails with `UserExists` if already present.
    async fn provision_user(
        &self,
        user: UserId,
        email: Option<String>,
        entitlement: Entitlement,
    ) -> LedgerResult<UserAccount>;

    /// Replace the entitlement of an existing account.
    ///
    /// Returns `None` when the user is unknown; no account is created.
    async fn set_entitlement(
        &self,
        user: &UserId,
        entitlement: Entitlement,
    ) -> LedgerResult<Option<UserAccount>>;

    async fn account(&self, user: &UserId) -> LedgerResult<Option<UserAccount>>;
}

/// A complete storage handle with an explicit lifecycle.
///
/// Opened once at process start and shared across request handlers; closed
/// at shutdown, after which every operation fails with `Closed`.
#[async_trait]
pub trait LedgerStore: EntitlementStore + LedgerWriter + LedgerReader + AccountRegistry {
    /// Persist outstanding state and release the handle.
    async fn close(&self) -> LedgerResult<()>;
}
