//! # LedgerDB: Persistent Storage Engine
//!
//! Persistence for the ledger, built on sled's embedded key-value store.
//!
//! ## Tree Layout
//!
//! Every field of the state schema is independently addressable: one key
//! per global field, one key per map entry.
//!
//! | Tree       | Key                          | Value                    |
//! |------------|------------------------------|--------------------------|
//! | `global`   | field name (UTF-8)           | u128 BE / bool / address |
//! | `balances` | address (20B)                | u128 BE                  |
//! | `deposits` | address (20B)                | u128 BE                  |
//! | `native`   | address (20B) or `custody`   | u128 BE                  |
//! | `events`   | sequence (8B BE)             | `bincode(LedgerEvent)`   |
//! | `proxy`    | metadata key (UTF-8)         | small scalar             |
//!
//! Sequence numbers are big-endian so that sled's lexicographic order is
//! the numeric order and range scans over the event log work naturally.
//!
//! ## Atomicity
//!
//! A commit writes the state, the native bank, the new events and
//! (optionally) the proxy metadata in a single multi-tree transaction.
//! Either the whole operation lands on disk or none of it does.

use sha2::{Digest, Sha256};
use sled::transaction::{TransactionError, TransactionResult};
use sled::{Db, Transactional, Tree};
use std::path::Path;

use super::state::{AccountMap, LedgerState};
use crate::address::{Address, ADDRESS_LENGTH};
use crate::event::{LedgerEvent, RecordedEvent};
use crate::native::NativeBank;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupt record in tree '{tree}': {detail}")]
    Corrupt { tree: &'static str, detail: String },

    #[error("commit aborted")]
    Aborted,
}

pub type DbResult<T> = Result<T, DbError>;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

const KEY_TOTAL_SUPPLY: &[u8] = b"total_supply";
const KEY_MAX_SUPPLY: &[u8] = b"max_supply";
const KEY_PAUSED: &[u8] = b"paused";
const KEY_OWNER: &[u8] = b"owner";

const KEY_CUSTODY: &[u8] = b"custody";

const KEY_ADMIN: &[u8] = b"admin";
const KEY_LOGIC_VERSION: &[u8] = b"logic_version";
const KEY_SCHEMA_VERSION: &[u8] = b"schema_version";
const KEY_INITIALIZED: &[u8] = b"initialized";

// ---------------------------------------------------------------------------
// Proxy metadata
// ---------------------------------------------------------------------------

/// Deployment metadata kept beside the ledger state, never inside it: who
/// may upgrade, which logic runs, which schema the data was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyRecord {
    /// Account allowed to replace the logic.
    pub admin: Address,
    /// Logic version currently bound to the state.
    pub logic_version: u32,
    /// Schema version the state was written with.
    pub schema_version: u32,
    /// Whether `initialize` has run against this state.
    pub initialized: bool,
}

/// One operation's effects, written atomically by [`LedgerDB::commit`].
#[derive(Debug, Clone, Copy)]
pub struct Commit<'a> {
    pub state: &'a LedgerState,
    pub bank: &'a NativeBank,
    pub events: &'a [LedgerEvent],
    pub proxy: Option<&'a ProxyRecord>,
}

// ---------------------------------------------------------------------------
// LedgerDB
// ---------------------------------------------------------------------------

/// Persistent storage engine for the ledger.
///
/// Wraps a sled `Db` and exposes typed accessors for the state schema, the
/// native bank, the event log and the proxy metadata.
///
/// # Thread Safety
///
/// sled trees support concurrent reads and serialized writes, so `LedgerDB`
/// can be shared via `Arc<LedgerDB>`. Event sequence numbers are assigned
/// from the current log tail, so commits must be serialized by the caller
/// (the node does this behind its ledger lock).
#[derive(Debug, Clone)]
pub struct LedgerDB {
    db: Db,
    global: Tree,
    balances: Tree,
    deposits: Tree,
    native: Tree,
    events: Tree,
    proxy: Tree,
}

impl LedgerDB {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that is removed when dropped. Intended
    /// for tests.
    pub fn open_temporary() -> DbResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        let global = db.open_tree("global")?;
        let balances = db.open_tree("balances")?;
        let deposits = db.open_tree("deposits")?;
        let native = db.open_tree("native")?;
        let events = db.open_tree("events")?;
        let proxy = db.open_tree("proxy")?;

        Ok(Self {
            db,
            global,
            balances,
            deposits,
            native,
            events,
            proxy,
        })
    }

    // -- State ---------------------------------------------------------------

    /// Loads the ledger state. An empty database yields
    /// `LedgerState::default()`.
    pub fn load_state(&self) -> DbResult<LedgerState> {
        let total_supply = match self.global.get(KEY_TOTAL_SUPPLY)? {
            Some(bytes) => decode_u128("global", &bytes)?,
            None => 0,
        };
        let max_supply = match self.global.get(KEY_MAX_SUPPLY)? {
            Some(bytes) => decode_u128("global", &bytes)?,
            None => 0,
        };
        let paused = match self.global.get(KEY_PAUSED)? {
            Some(bytes) => decode_bool("global", &bytes)?,
            None => false,
        };
        let owner = match self.global.get(KEY_OWNER)? {
            Some(bytes) => decode_address("global", &bytes)?,
            None => Address::ZERO,
        };

        Ok(LedgerState {
            total_supply,
            max_supply,
            paused,
            owner,
            balances: load_account_map(&self.balances, "balances")?,
            deposits: load_account_map(&self.deposits, "deposits")?,
        })
    }

    /// Loads the native bank.
    pub fn load_bank(&self) -> DbResult<NativeBank> {
        let mut accounts = AccountMap::new();
        let mut custody = 0u128;
        for entry in self.native.iter() {
            let (key, value) = entry?;
            if key.as_ref() == KEY_CUSTODY {
                custody = decode_u128("native", &value)?;
            } else {
                accounts.set(
                    decode_address("native", &key)?,
                    decode_u128("native", &value)?,
                );
            }
        }
        Ok(NativeBank::from_parts(accounts, custody))
    }

    // -- Proxy metadata ------------------------------------------------------

    /// Loads the proxy metadata, or `None` if nothing was ever deployed here.
    pub fn load_proxy(&self) -> DbResult<Option<ProxyRecord>> {
        let admin = match self.proxy.get(KEY_ADMIN)? {
            Some(bytes) => decode_address("proxy", &bytes)?,
            None => return Ok(None),
        };
        let logic_version = match self.proxy.get(KEY_LOGIC_VERSION)? {
            Some(bytes) => decode_u32("proxy", &bytes)?,
            None => 0,
        };
        let schema_version = match self.proxy.get(KEY_SCHEMA_VERSION)? {
            Some(bytes) => decode_u32("proxy", &bytes)?,
            None => 0,
        };
        let initialized = match self.proxy.get(KEY_INITIALIZED)? {
            Some(bytes) => decode_bool("proxy", &bytes)?,
            None => false,
        };

        Ok(Some(ProxyRecord {
            admin,
            logic_version,
            schema_version,
            initialized,
        }))
    }

    /// Overwrites the proxy metadata. Ledger trees are not touched.
    pub fn put_proxy(&self, record: &ProxyRecord) -> DbResult<()> {
        let mut batch = sled::Batch::default();
        for (key, value) in proxy_writes(record) {
            batch.insert(key, value);
        }
        self.proxy.apply_batch(batch)?;
        self.db.flush()?;
        Ok(())
    }

    // -- Commit --------------------------------------------------------------

    /// Persists one operation's effects atomically and returns the events
    /// with their assigned sequence numbers.
    pub fn commit(&self, commit: Commit<'_>) -> DbResult<Vec<RecordedEvent>> {
        let state = commit.state;

        let global_writes: Vec<(&[u8], Vec<u8>)> = vec![
            (KEY_TOTAL_SUPPLY, state.total_supply.to_be_bytes().to_vec()),
            (KEY_MAX_SUPPLY, state.max_supply.to_be_bytes().to_vec()),
            (KEY_PAUSED, vec![state.paused as u8]),
            (KEY_OWNER, state.owner.as_bytes().to_vec()),
        ];
        let balance_writes = account_writes(&state.balances);
        let deposit_writes = account_writes(&state.deposits);

        let mut native_writes = account_writes(commit.bank.accounts());
        native_writes.push((KEY_CUSTODY.to_vec(), commit.bank.custody().to_be_bytes().to_vec()));

        let mut next_seq = self.next_event_seq()?;
        let mut recorded = Vec::with_capacity(commit.events.len());
        let mut event_writes = Vec::with_capacity(commit.events.len());
        for event in commit.events {
            let bytes =
                bincode::serialize(event).map_err(|e| DbError::Serialization(e.to_string()))?;
            event_writes.push((next_seq.to_be_bytes(), bytes));
            recorded.push(RecordedEvent {
                seq: next_seq,
                event: event.clone(),
            });
            next_seq += 1;
        }

        let proxy_writes = commit.proxy.map(proxy_writes).unwrap_or_default();

        let result: TransactionResult<(), ()> = (
            &self.global,
            &self.balances,
            &self.deposits,
            &self.native,
            &self.events,
            &self.proxy,
        )
            .transaction(|(global, balances, deposits, native, events, proxy)| {
                for (key, value) in &global_writes {
                    global.insert(*key, value.as_slice())?;
                }
                for (key, value) in &balance_writes {
                    balances.insert(key.as_slice(), value.as_slice())?;
                }
                for (key, value) in &deposit_writes {
                    deposits.insert(key.as_slice(), value.as_slice())?;
                }
                for (key, value) in &native_writes {
                    native.insert(key.as_slice(), value.as_slice())?;
                }
                for (key, value) in &event_writes {
                    events.insert(&key[..], value.as_slice())?;
                }
                for (key, value) in &proxy_writes {
                    proxy.insert(*key, value.as_slice())?;
                }
                Ok(())
            });

        result.map_err(|e| match e {
            TransactionError::Storage(err) => DbError::Sled(err),
            TransactionError::Abort(()) => DbError::Aborted,
        })?;

        self.db.flush()?;
        Ok(recorded)
    }

    // -- Events --------------------------------------------------------------

    /// Returns up to `limit` events with `seq >= from`, in order.
    pub fn events_since(&self, from: u64, limit: usize) -> DbResult<Vec<RecordedEvent>> {
        let mut out = Vec::new();
        for entry in self.events.range(from.to_be_bytes()..).take(limit) {
            let (key, value) = entry?;
            let seq = decode_u64("events", &key)?;
            let event: LedgerEvent = bincode::deserialize(&value)
                .map_err(|e| DbError::Serialization(e.to_string()))?;
            out.push(RecordedEvent { seq, event });
        }
        Ok(out)
    }

    /// Number of events in the log.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    fn next_event_seq(&self) -> DbResult<u64> {
        match self.events.last()? {
            Some((key, _)) => Ok(decode_u64("events", &key)? + 1),
            None => Ok(0),
        }
    }

    // -- Utility -------------------------------------------------------------

    /// SHA-256 over the `global`, `balances` and `deposits` trees in key
    /// order. Identical digests mean bit-identical ledger state; upgrades
    /// must leave it unchanged.
    pub fn state_digest(&self) -> DbResult<[u8; 32]> {
        let mut hasher = Sha256::new();
        for (name, tree) in [
            ("global", &self.global),
            ("balances", &self.balances),
            ("deposits", &self.deposits),
        ] {
            hasher.update(name.as_bytes());
            for entry in tree.iter() {
                let (key, value) = entry?;
                hasher.update((key.len() as u32).to_be_bytes());
                hasher.update(&key);
                hasher.update((value.len() as u32).to_be_bytes());
                hasher.update(&value);
            }
        }
        Ok(hasher.finalize().into())
    }

    /// Force a flush of all pending writes to disk.
    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Encoding helpers
// ---------------------------------------------------------------------------

fn account_writes(map: &AccountMap) -> Vec<(Vec<u8>, Vec<u8>)> {
    map.iter()
        .map(|(addr, amount)| (addr.as_bytes().to_vec(), amount.to_be_bytes().to_vec()))
        .collect()
}

fn proxy_writes(record: &ProxyRecord) -> Vec<(&'static [u8], Vec<u8>)> {
    vec![
        (KEY_ADMIN, record.admin.as_bytes().to_vec()),
        (KEY_LOGIC_VERSION, record.logic_version.to_be_bytes().to_vec()),
        (KEY_SCHEMA_VERSION, record.schema_version.to_be_bytes().to_vec()),
        (KEY_INITIALIZED, vec![record.initialized as u8]),
    ]
}

fn load_account_map(tree: &Tree, name: &'static str) -> DbResult<AccountMap> {
    let mut map = AccountMap::new();
    for entry in tree.iter() {
        let (key, value) = entry?;
        map.set(decode_address(name, &key)?, decode_u128(name, &value)?);
    }
    Ok(map)
}

fn corrupt(tree: &'static str, detail: String) -> DbError {
    DbError::Corrupt { tree, detail }
}

fn decode_u128(tree: &'static str, bytes: &[u8]) -> DbResult<u128> {
    let array: [u8; 16] = bytes
        .try_into()
        .map_err(|_| corrupt(tree, format!("expected 16-byte amount, got {}", bytes.len())))?;
    Ok(u128::from_be_bytes(array))
}

fn decode_u64(tree: &'static str, bytes: &[u8]) -> DbResult<u64> {
    let array: [u8; 8] = bytes
        .try_into()
        .map_err(|_| corrupt(tree, format!("expected 8-byte sequence, got {}", bytes.len())))?;
    Ok(u64::from_be_bytes(array))
}

fn decode_u32(tree: &'static str, bytes: &[u8]) -> DbResult<u32> {
    let array: [u8; 4] = bytes
        .try_into()
        .map_err(|_| corrupt(tree, format!("expected 4-byte version, got {}", bytes.len())))?;
    Ok(u32::from_be_bytes(array))
}

fn decode_bool(tree: &'static str, bytes: &[u8]) -> DbResult<bool> {
    match bytes {
        [0] => Ok(false),
        [1] => Ok(true),
        other => Err(corrupt(tree, format!("invalid flag bytes {:?}", other))),
    }
}

fn decode_address(tree: &'static str, bytes: &[u8]) -> DbResult<Address> {
    if bytes.len() != ADDRESS_LENGTH {
        return Err(corrupt(
            tree,
            format!("expected {}-byte address, got {}", ADDRESS_LENGTH, bytes.len()),
        ));
    }
    Address::from_slice(bytes).map_err(|e| corrupt(tree, e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
