use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use cvx_types::{Entitlement, RequestEntry, RequestId, RequestRecord, UserAccount, UserId};
use serde::{Deserialize, Serialize};

use crate::config::StorageConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::traits::{AccountRegistry, EntitlementStore, LedgerReader, LedgerStore, LedgerWriter};

const SNAPSHOT_VERSION: u32 = 1;

/// In-memory ledger for tests, local deployments, and embedding.
///
/// A single `RwLock` guards all accounts, so every append is serialized
/// against every other. State can optionally be persisted to a JSON snapshot
/// that is loaded on [`InMemoryLedger::open`]. When a snapshot path is
/// configured, every mutation rewrites the snapshot under the write lock
/// before it reports success; a mutation whose snapshot fails is undone.
pub struct InMemoryLedger {
    snapshot_path: Option<PathBuf>,
    inner: RwLock<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<UserId, UserAccount>,
    request_index: HashMap<RequestId, UserId>,
    closed: bool,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    accounts: Vec<UserAccount>,
}

impl InMemoryLedger {
    /// A fresh, purely in-memory ledger.
    pub fn new() -> Self {
        Self {
            snapshot_path: None,
            inner: RwLock::new(LedgerState::default()),
        }
    }

    /// Open a ledger according to `config`, loading the snapshot if one
    /// exists at the configured path.
    pub fn open(config: &StorageConfig) -> LedgerResult<Self> {
        let Some(path) = config.snapshot_path.clone() else {
            return Ok(Self::new());
        };

        let state = if path.exists() {
            let state = load_snapshot(&path)?;
            tracing::info!(
                path = %path.display(),
                accounts = state.accounts.len(),
                "loaded ledger snapshot"
            );
            state
        } else {
            LedgerState::default()
        };

        Ok(Self {
            snapshot_path: Some(path),
            inner: RwLock::new(state),
        })
    }

    /// Write the current state to the snapshot path, if configured.
    ///
    /// The snapshot is written to a temporary file in the same directory and
    /// renamed into place, so a crash never leaves a torn file behind.
    pub fn flush(&self) -> LedgerResult<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let state = self.read_state()?;
        write_snapshot(path, &state)
    }

    /// Number of known accounts.
    pub fn account_count(&self) -> LedgerResult<usize> {
        Ok(self.read_state()?.accounts.len())
    }

    fn read_state(&self) -> LedgerResult<RwLockReadGuard<'_, LedgerState>> {
        let state = self
            .inner
            .read()
            .map_err(|_| LedgerError::Storage("ledger read lock poisoned".into()))?;
        if state.closed {
            return Err(LedgerError::Closed);
        }
        Ok(state)
    }

    fn write_state(&self) -> LedgerResult<RwLockWriteGuard<'_, LedgerState>> {
        let state = self
            .inner
            .write()
            .map_err(|_| LedgerError::Storage("ledger write lock poisoned".into()))?;
        if state.closed {
            return Err(LedgerError::Closed);
        }
        Ok(state)
    }

    fn append_sync(&self, user: &UserId, entry: RequestEntry) -> LedgerResult<RequestRecord> {
        let mut state = self.write_state()?;

        if state.request_index.contains_key(&entry.request_id) {
            return Err(LedgerError::DuplicateRequest(entry.request_id));
        }

        let existed = state.accounts.contains_key(user);
        let account = state
            .accounts
            .entry(user.clone())
            .or_insert_with(|| UserAccount::implicit(user.clone()));

        let timestamp = match account.request_history.last() {
            Some(last) if last.timestamp > entry.submitted_at => last.timestamp,
            _ => entry.submitted_at,
        };
        let record = RequestRecord::seal(entry, timestamp);
        account.request_history.push(record.clone());
        let position = account.request_history.len();

        state
            .request_index
            .insert(record.request_id.clone(), user.clone());

        if let Err(e) = self.persist(&state) {
            state.request_index.remove(&record.request_id);
            if let Some(account) = state.accounts.get_mut(user) {
                account.request_history.pop();
            }
            if !existed {
                state.accounts.remove(user);
            }
            return Err(e);
        }

        tracing::debug!(
            user = %user,
            request_id = %record.request_id,
            position,
            "appended request record"
        );
        Ok(record)
    }

    fn read_all_sync(&self, user: &UserId) -> LedgerResult<Vec<RequestRecord>> {
        let state = self.read_state()?;
        state
            .accounts
            .get(user)
            .map(|account| account.request_history.clone())
            .ok_or_else(|| LedgerError::UserNotFound(user.clone()))
    }

    fn read_one_sync(&self, user: &UserId, request_id: &RequestId) -> LedgerResult<RequestRecord> {
        let state = self.read_state()?;
        let account = state
            .accounts
            .get(user)
            .ok_or_else(|| LedgerError::UserNotFound(user.clone()))?;
        account
            .find_request(request_id)
            .cloned()
            .ok_or_else(|| LedgerError::RequestNotFound {
                user: user.clone(),
                request_id: request_id.clone(),
            })
    }

    fn provision_sync(
        &self,
        user: UserId,
        email: Option<String>,
        entitlement: Entitlement,
    ) -> LedgerResult<UserAccount> {
        let mut state = self.write_state()?;
        if state.accounts.contains_key(&user) {
            return Err(LedgerError::UserExists(user));
        }
        let account = UserAccount::new(user.clone(), email, entitlement);
        state.accounts.insert(user.clone(), account.clone());
        if let Err(e) = self.persist(&state) {
            state.accounts.remove(&user);
            return Err(e);
        }
        tracing::info!(user = %user, entitlement = %entitlement, "provisioned user");
        Ok(account)
    }

    fn set_entitlement_sync(
        &self,
        user: &UserId,
        entitlement: Entitlement,
    ) -> LedgerResult<Option<UserAccount>> {
        let mut state = self.write_state()?;
        let Some(account) = state.accounts.get_mut(user) else {
            return Ok(None);
        };
        let previous = std::mem::replace(&mut account.payment_status, entitlement);
        let account = account.clone();
        if let Err(e) = self.persist(&state) {
            if let Some(account) = state.accounts.get_mut(user) {
                account.payment_status = previous;
            }
            return Err(e);
        }
        tracing::info!(user = %user, entitlement = %entitlement, "updated entitlement");
        Ok(Some(account))
    }

    fn persist(&self, state: &LedgerState) -> LedgerResult<()> {
        match &self.snapshot_path {
            Some(path) => write_snapshot(path, state),
            None => Ok(()),
        }
    }

    fn close_sync(&self) -> LedgerResult<()> {
        let mut state = self
            .inner
            .write()
            .map_err(|_| LedgerError::Storage("ledger write lock poisoned".into()))?;
        if state.closed {
            return Ok(());
        }
        if let Some(path) = &self.snapshot_path {
            write_snapshot(path, &state)?;
        }
        state.closed = true;
        tracing::info!("ledger closed");
        Ok(())
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLedger")
            .field("snapshot_path", &self.snapshot_path)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EntitlementStore for InMemoryLedger {
    async fn entitlement(&self, user: &UserId) -> LedgerResult<Entitlement> {
        let state = self.read_state()?;
        Ok(state
            .accounts
            .get(user)
            .map(|a| a.payment_status)
            .unwrap_or_default())
    }
}

#[async_trait]
impl LedgerWriter for InMemoryLedger {
    async fn append_request(
        &self,
        user: &UserId,
        entry: RequestEntry,
    ) -> LedgerResult<RequestRecord> {
        self.append_sync(user, entry)
    }
}

#[async_trait]
impl LedgerReader for InMemoryLedger {
    async fn read_all(&self, user: &UserId) -> LedgerResult<Vec<RequestRecord>> {
        let records = self.read_all_sync(user)?;
        tracing::debug!(user = %user, count = records.len(), "read request history");
        Ok(records)
    }

    async fn read_one(
        &self,
        user: &UserId,
        request_id: &RequestId,
    ) -> LedgerResult<RequestRecord> {
        self.read_one_sync(user, request_id)
    }

    async fn history_len(&self, user: &UserId) -> LedgerResult<usize> {
        let state = self.read_state()?;
        Ok(state
            .accounts
            .get(user)
            .map(|a| a.request_history.len())
            .unwrap_or(0))
    }
}

#[async_trait]
impl AccountRegistry for InMemoryLedger {
    async fn provision_user(
        &self,
        user: UserId,
        email: Option<String>,
        entitlement: Entitlement,
    ) -> LedgerResult<UserAccount> {
        self.provision_sync(user, email, entitlement)
    }

    async fn set_entitlement(
        &self,
        user: &UserId,
        entitlement: Entitlement,
    ) -> LedgerResult<Option<UserAccount>> {
        self.set_entitlement_sync(user, entitlement)
    }

    async fn account(&self, user: &UserId) -> LedgerResult<Option<UserAccount>> {
        let state = self.read_state()?;
        Ok(state.accounts.get(user).cloned())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn close(&self) -> LedgerResult<()> {
        self.close_sync()
    }
}

fn load_snapshot(path: &Path) -> LedgerResult<LedgerState> {
    let bytes = fs::read(path)?;
    let snapshot: Snapshot =
        serde_json::from_slice(&bytes).map_err(|e| LedgerError::Serialization(e.to_string()))?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(LedgerError::Serialization(format!(
            "unsupported snapshot version {}",
            snapshot.version
        )));
    }

    let mut state = LedgerState::default();
    for account in snapshot.accounts {
        for record in &account.request_history {
            if state
                .request_index
                .insert(record.request_id.clone(), account.user_id.clone())
                .is_some()
            {
                return Err(LedgerError::DuplicateRequest(record.request_id.clone()));
            }
        }
        if state.accounts.contains_key(&account.user_id) {
            return Err(LedgerError::UserExists(account.user_id));
        }
        state.accounts.insert(account.user_id.clone(), account);
    }
    Ok(state)
}

fn write_snapshot(path: &Path, state: &LedgerState) -> LedgerResult<()> {
    // Sorted so that identical state always produces identical bytes.
    let ordered: BTreeMap<&UserId, &UserAccount> = state.accounts.iter().collect();
    let snapshot = Snapshot {
        version: SNAPSHOT_VERSION,
        accounts: ordered.into_values().cloned().collect(),
    };
    let encoded = serde_json::to_vec_pretty(&snapshot)
        .map_err(|e| LedgerError::Serialization(e.to_string()))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&encoded)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| LedgerError::Io(e.error.to_string()))?;

    tracing::debug!(path = %path.display(), accounts = snapshot.accounts.len(), "wrote ledger snapshot");
    Ok(())
}
