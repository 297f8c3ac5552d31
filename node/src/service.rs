//! # Ledger Service
//!
//! The host side of the ledger: one [`Ledger`] behind one lock, persisted
//! to sled after every committed operation and observed through a
//! broadcast channel and Prometheus.
//!
//! Every call locks, runs the operation to completion, commits, and
//! unlocks. Nothing is held across an `.await`, so the HTTP handlers can
//! call straight in from async code. If the commit fails, the in-memory
//! ledger is rolled back to what it was before the call, so memory and disk
//! never disagree.

use parking_lot::Mutex;
use serde::Serialize;
use std::time::Instant;
use tokio::sync::broadcast;

use luigi_contracts::{
    logic_version, supports_schema, InvariantViolation, Ledger, LedgerError, LedgerParams,
};
use luigi_protocol::config::{EVENT_CHANNEL_CAPACITY, MAX_EVENTS_PER_QUERY, SCHEMA_VERSION};
use luigi_protocol::storage::{Commit, DbError, LedgerDB, ProxyRecord};
use luigi_protocol::units::amount_string;
use luigi_protocol::{Address, NativeBank, RecordedEvent, ValueError};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Rejections of a logic upgrade.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpgradeError {
    #[error("{0} is not the upgrade admin")]
    NotAdmin(Address),

    #[error("logic version {requested} is not newer than deployed version {current}")]
    NotNewer { current: u32, requested: u32 },

    #[error("this logic cannot run on schema version {0}")]
    IncompatibleSchema(u32),

    #[error("nothing is deployed")]
    NotDeployed,
}

/// Everything a service call can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The ledger rejected the operation. Nothing changed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("storage error: {0}")]
    Storage(#[from] DbError),

    #[error("native value error: {0}")]
    Value(#[from] ValueError),

    #[error("upgrade rejected: {0}")]
    Upgrade(#[from] UpgradeError),

    #[error("ledger is not deployed")]
    NotDeployed,

    #[error("ledger is already deployed (logic version {0})")]
    AlreadyDeployed(u32),
}

impl ServiceError {
    /// Stable name for metrics labels and JSON-RPC error data.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Ledger(err) => err.kind(),
            ServiceError::Storage(_) => "Storage",
            ServiceError::Value(_) => "Value",
            ServiceError::Upgrade(UpgradeError::NotAdmin(_)) => "NotAdmin",
            ServiceError::Upgrade(UpgradeError::NotNewer { .. }) => "NotNewer",
            ServiceError::Upgrade(UpgradeError::IncompatibleSchema(_)) => "IncompatibleSchema",
            ServiceError::Upgrade(UpgradeError::NotDeployed) | ServiceError::NotDeployed => {
                "NotDeployed"
            }
            ServiceError::AlreadyDeployed(_) => "AlreadyDeployed",
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Events committed by one operation, with their log positions.
#[derive(Debug, Clone, Default)]
pub struct Receipt {
    pub events: Vec<RecordedEvent>,
}

/// Point-in-time summary of the deployment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub deployed: bool,
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
    #[serde(with = "amount_string")]
    pub total_supply: u128,
    #[serde(with = "amount_string")]
    pub max_supply: u128,
    pub paused: bool,
    pub owner: Address,
    #[serde(with = "amount_string")]
    pub custody_balance: u128,
    pub admin: Option<Address>,
    pub logic_version: Option<u32>,
    pub schema_version: Option<u32>,
    pub event_count: usize,
    pub state_digest: String,
    /// `None` when every invariant holds.
    pub audit_failure: Option<String>,
}

/// One account as seen by the ledger and the native bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub address: Address,
    #[serde(with = "amount_string")]
    pub balance: u128,
    #[serde(with = "amount_string")]
    pub ether_deposits: u128,
    #[serde(with = "amount_string")]
    pub native_balance: u128,
}

/// Outcome of a logic upgrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeReport {
    pub from_version: u32,
    pub to_version: u32,
    pub digest_before: String,
    pub digest_after: String,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

struct Inner {
    ledger: Ledger<NativeBank>,
    proxy: Option<ProxyRecord>,
}

/// Serialized, persisted access to the ledger.
pub struct LedgerService {
    db: LedgerDB,
    inner: Mutex<Inner>,
    events: broadcast::Sender<RecordedEvent>,
    metrics: SharedMetrics,
}

impl LedgerService {
    /// Loads the ledger from `db`. An empty database gives an undeployed
    /// service that only accepts `deploy` and `fund`.
    pub fn open(db: LedgerDB, metrics: SharedMetrics) -> ServiceResult<Self> {
        let proxy = db.load_proxy()?;
        if let Some(record) = &proxy {
            if !supports_schema(record.schema_version) {
                return Err(UpgradeError::IncompatibleSchema(record.schema_version).into());
            }
        }

        let state = db.load_state()?;
        let bank = db.load_bank()?;
        let initialized = proxy.map_or(false, |record| record.initialized);
        let ledger = Ledger::from_parts(state, bank, initialized);

        metrics.observe_ledger(
            ledger.total_supply(),
            ledger.custody_balance(),
            ledger.paused(),
        );
        match &proxy {
            Some(record) => tracing::info!(
                logic_version = record.logic_version,
                schema_version = record.schema_version,
                owner = %ledger.owner(),
                "ledger loaded"
            ),
            None => tracing::info!("no deployment found"),
        }

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            db,
            inner: Mutex::new(Inner { ledger, proxy }),
            events,
            metrics,
        })
    }

    /// Live feed of committed events.
    pub fn subscribe(&self) -> broadcast::Receiver<RecordedEvent> {
        self.events.subscribe()
    }

    /// Initializes the ledger and records `deployer` as upgrade admin.
    pub fn deploy(
        &self,
        deployer: Address,
        owner: Address,
        params: LedgerParams,
    ) -> ServiceResult<(ProxyRecord, Receipt)> {
        let mut inner = self.inner.lock();
        if let Some(record) = inner.proxy {
            return Err(ServiceError::AlreadyDeployed(record.logic_version));
        }

        let record = ProxyRecord {
            admin: deployer,
            logic_version: logic_version(),
            schema_version: SCHEMA_VERSION,
            initialized: true,
        };
        let receipt = self.apply(&mut inner, "initialize", Some(record), |ledger| {
            ledger.initialize_with(deployer, owner, params)
        })?;
        tracing::info!(%deployer, %owner, logic_version = record.logic_version, "ledger deployed");
        Ok((record, receipt))
    }

    pub fn mint(&self, caller: Address, to: Address, amount: u128) -> ServiceResult<Receipt> {
        self.execute("mint", |ledger| ledger.mint(caller, to, amount))
    }

    pub fn transfer(&self, caller: Address, to: Address, amount: u128) -> ServiceResult<Receipt> {
        self.execute("transfer", |ledger| ledger.transfer(caller, to, amount))
    }

    pub fn pause(&self, caller: Address) -> ServiceResult<Receipt> {
        self.execute("pause", |ledger| ledger.pause(caller))
    }

    pub fn unpause(&self, caller: Address) -> ServiceResult<Receipt> {
        self.execute("unpause", |ledger| ledger.unpause(caller))
    }

    pub fn renounce_ownership(&self, caller: Address) -> ServiceResult<Receipt> {
        self.execute("renounce_ownership", |ledger| ledger.renounce_ownership(caller))
    }

    pub fn transfer_ownership(&self, caller: Address, new_owner: Address) -> ServiceResult<Receipt> {
        self.execute("transfer_ownership", |ledger| {
            ledger.transfer_ownership(caller, new_owner)
        })
    }

    pub fn deposit_ether(&self, caller: Address, value: u128) -> ServiceResult<Receipt> {
        self.execute("deposit_ether", |ledger| ledger.deposit_ether(caller, value))
    }

    pub fn withdraw_ether(&self, caller: Address, amount: u128) -> ServiceResult<Receipt> {
        self.execute("withdraw_ether", |ledger| ledger.withdraw_ether(caller, amount))
    }

    /// Development faucet: credits native value to `account` and returns
    /// its new native balance. Ledger state is not touched.
    pub fn fund(&self, account: Address, value: u128) -> ServiceResult<u128> {
        let mut inner = self.inner.lock();
        let mut bank = inner.ledger.host().clone();
        bank.fund(account, value)?;

        self.db.commit(Commit {
            state: inner.ledger.state(),
            bank: &bank,
            events: &[],
            proxy: None,
        })?;

        let balance = bank.balance_of(&account);
        *inner.ledger.host_mut() = bank;
        tracing::info!(%account, value, balance, "account funded");
        Ok(balance)
    }

    /// Moves the deployment to logic version `to_version`.
    ///
    /// Only the proxy metadata is rewritten. The ledger state is handed from
    /// the old logic binding to the new one untouched, and the state digest
    /// is taken on both sides to prove it.
    pub fn upgrade(&self, admin: Address, to_version: u32) -> ServiceResult<UpgradeReport> {
        let mut inner = self.inner.lock();
        let current = inner.proxy.ok_or(UpgradeError::NotDeployed)?;
        if admin != current.admin {
            tracing::warn!(%admin, expected = %current.admin, "upgrade by non-admin");
            return Err(UpgradeError::NotAdmin(admin).into());
        }
        if to_version <= current.logic_version {
            return Err(UpgradeError::NotNewer {
                current: current.logic_version,
                requested: to_version,
            }
            .into());
        }
        if !supports_schema(current.schema_version) {
            return Err(UpgradeError::IncompatibleSchema(current.schema_version).into());
        }

        let digest_before = self.db.state_digest()?;
        let record = ProxyRecord {
            logic_version: to_version,
            ..current
        };
        self.db.put_proxy(&record)?;

        let old = std::mem::replace(&mut inner.ledger, Ledger::new(NativeBank::new()));
        let (state, bank, initialized) = old.into_parts();
        inner.ledger = Ledger::from_parts(state, bank, initialized);
        inner.proxy = Some(record);

        let digest_after = self.db.state_digest()?;
        if digest_after != digest_before {
            tracing::error!(
                before = %hex::encode(digest_before),
                after = %hex::encode(digest_after),
                "state digest changed across upgrade"
            );
        }
        tracing::info!(
            from = current.logic_version,
            to = to_version,
            digest = %hex::encode(digest_after),
            "logic upgraded"
        );

        Ok(UpgradeReport {
            from_version: current.logic_version,
            to_version,
            digest_before: hex::encode(digest_before),
            digest_after: hex::encode(digest_after),
        })
    }

    // -- Reads ---------------------------------------------------------------

    /// Runs `f` against the ledger under the lock.
    pub fn read<T>(&self, f: impl FnOnce(&Ledger<NativeBank>) -> T) -> T {
        let inner = self.inner.lock();
        f(&inner.ledger)
    }

    pub fn proxy(&self) -> Option<ProxyRecord> {
        self.inner.lock().proxy
    }

    pub fn account(&self, address: Address) -> AccountView {
        self.read(|ledger| AccountView {
            address,
            balance: ledger.balance_of(&address),
            ether_deposits: ledger.ether_deposits(&address),
            native_balance: ledger.host().balance_of(&address),
        })
    }

    pub fn audit(&self) -> Result<(), InvariantViolation> {
        self.read(|ledger| ledger.audit())
    }

    pub fn snapshot(&self) -> ServiceResult<LedgerSnapshot> {
        let inner = self.inner.lock();
        let ledger = &inner.ledger;
        let proxy = inner.proxy;
        Ok(LedgerSnapshot {
            deployed: proxy.is_some(),
            name: ledger.name(),
            symbol: ledger.symbol(),
            decimals: ledger.decimals(),
            total_supply: ledger.total_supply(),
            max_supply: ledger.max_supply(),
            paused: ledger.paused(),
            owner: ledger.owner(),
            custody_balance: ledger.custody_balance(),
            admin: proxy.map(|p| p.admin),
            logic_version: proxy.map(|p| p.logic_version),
            schema_version: proxy.map(|p| p.schema_version),
            event_count: self.db.event_count(),
            state_digest: hex::encode(self.db.state_digest()?),
            audit_failure: ledger.audit().err().map(|v| v.to_string()),
        })
    }

    /// Up to `limit` logged events from `from` on, capped at
    /// `MAX_EVENTS_PER_QUERY`.
    pub fn events_since(&self, from: u64, limit: usize) -> ServiceResult<Vec<RecordedEvent>> {
        Ok(self.db.events_since(from, limit.min(MAX_EVENTS_PER_QUERY))?)
    }

    // -- Internals -----------------------------------------------------------

    fn execute(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut Ledger<NativeBank>) -> Result<(), LedgerError>,
    ) -> ServiceResult<Receipt> {
        let mut inner = self.inner.lock();
        if inner.proxy.is_none() {
            return Err(ServiceError::NotDeployed);
        }
        self.apply(&mut inner, op, None, f)
    }

    /// Runs one ledger operation, commits its effects, publishes its
    /// events. On a ledger rejection nothing is written; on a storage
    /// failure the in-memory ledger is put back as it was.
    fn apply(
        &self,
        inner: &mut Inner,
        op: &'static str,
        proxy: Option<ProxyRecord>,
        f: impl FnOnce(&mut Ledger<NativeBank>) -> Result<(), LedgerError>,
    ) -> ServiceResult<Receipt> {
        let started = Instant::now();
        let state_before = inner.ledger.state().clone();
        let bank_before = inner.ledger.host().clone();
        let initialized_before = inner.ledger.is_initialized();

        if let Err(err) = f(&mut inner.ledger) {
            self.metrics.record_rejection(err.kind(), started.elapsed());
            tracing::info!(op, kind = err.kind(), reason = %err, "operation rejected");
            return Err(err.into());
        }

        let events = inner.ledger.drain_events();
        let committed = self.db.commit(Commit {
            state: inner.ledger.state(),
            bank: inner.ledger.host(),
            events: &events,
            proxy: proxy.as_ref(),
        });
        let recorded = match committed {
            Ok(recorded) => recorded,
            Err(err) => {
                tracing::error!(op, error = %err, "commit failed, rolling back");
                inner.ledger = Ledger::from_parts(state_before, bank_before, initialized_before);
                return Err(err.into());
            }
        };
        if proxy.is_some() {
            inner.proxy = proxy;
        }

        for event in &recorded {
            // No subscribers is not an error.
            let _ = self.events.send(event.clone());
        }
        let ledger = &inner.ledger;
        self.metrics.record_success(op, started.elapsed());
        self.metrics
            .observe_ledger(ledger.total_supply(), ledger.custody_balance(), ledger.paused());
        tracing::debug!(op, events = recorded.len(), "operation committed");

        Ok(Receipt { events: recorded })
    }
}
