#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use befs_backend::{
    cache::QueryCache,
    config::Config,
    dashboard::Dashboard,
    error::{DashboardError, Result},
    oracle::PriceFeed,
    refresh::{RefreshCoordinator, RefreshHandle},
    sui::{
        BoxFuture, CoinObject, Effects, ExecutionResult, ExecutionStatus, LedgerRpc, MoveContent,
        ObjectData,
    },
    AppState,
};
use rust_decimal_macros::dec;
use serde_json::json;

pub const OWNER: &str = "0xa11ce";
pub const VAULT_ID: &str = "0xbeef01";
pub const SCORE_ID: &str = "0x5c0de";

pub const UNIT: u64 = 1_000_000_000;

/// In-memory ledger that counts every read it serves.
#[derive(Default)]
pub struct FakeLedger {
    coins: Mutex<HashMap<(String, String), Vec<CoinObject>>>,
    objects: Mutex<HashMap<String, ObjectData>>,
    owned: Mutex<HashMap<(String, String), Vec<ObjectData>>>,
    abort_with: Mutex<Option<String>>,
    reads: AtomicUsize,
    executed: AtomicUsize,
}

impl FakeLedger {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }

    pub fn set_coins(&self, owner: &str, coin_type: &str, balances: &[u64]) {
        let coins = balances
            .iter()
            .enumerate()
            .map(|(i, balance)| CoinObject {
                coin_type: coin_type.to_string(),
                coin_object_id: format!("0xc0{i}"),
                balance: *balance,
            })
            .collect();
        self.coins
            .lock()
            .unwrap()
            .insert((owner.to_string(), coin_type.to_string()), coins);
    }

    pub fn set_object(&self, object: ObjectData) {
        self.objects
            .lock()
            .unwrap()
            .insert(object.object_id.clone(), object);
    }

    pub fn set_owned(&self, owner: &str, struct_type: &str, objects: Vec<ObjectData>) {
        self.owned
            .lock()
            .unwrap()
            .insert((owner.to_string(), struct_type.to_string()), objects);
    }

    pub fn abort_next_submission(&self, reason: &str) {
        *self.abort_with.lock().unwrap() = Some(reason.to_string());
    }
}

impl LedgerRpc for FakeLedger {
    fn get_coins<'a>(
        &'a self,
        owner: &'a str,
        coin_type: &'a str,
    ) -> BoxFuture<'a, Result<Vec<CoinObject>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let coins = self
            .coins
            .lock()
            .unwrap()
            .get(&(owner.to_string(), coin_type.to_string()))
            .cloned()
            .unwrap_or_default();
        Box::pin(async move { Ok(coins) })
    }

    fn get_object<'a>(&'a self, object_id: &'a str) -> BoxFuture<'a, Result<ObjectData>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let object = self
            .objects
            .lock()
            .unwrap()
            .get(object_id)
            .cloned()
            .ok_or_else(|| DashboardError::ObjectNotFound(object_id.to_string()));
        Box::pin(async move { object })
    }

    fn get_owned_objects<'a>(
        &'a self,
        owner: &'a str,
        struct_type: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ObjectData>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let objects = self
            .owned
            .lock()
            .unwrap()
            .get(&(owner.to_string(), struct_type.to_string()))
            .cloned()
            .unwrap_or_default();
        Box::pin(async move { Ok(objects) })
    }

    fn execute_transaction<'a>(
        &'a self,
        _tx_bytes: &'a str,
        _signatures: &'a [String],
    ) -> BoxFuture<'a, Result<ExecutionResult>> {
        let n = self.executed.fetch_add(1, Ordering::SeqCst);
        let status = match self.abort_with.lock().unwrap().take() {
            Some(reason) => ExecutionStatus {
                status: "failure".into(),
                error: Some(reason),
            },
            None => ExecutionStatus {
                status: "success".into(),
                error: None,
            },
        };
        Box::pin(async move {
            Ok(ExecutionResult {
                digest: format!("Digest{n}"),
                effects: Some(Effects { status }),
            })
        })
    }
}

pub fn move_object(object_id: &str, type_tag: &str, fields: serde_json::Value) -> ObjectData {
    ObjectData {
        object_id: object_id.to_string(),
        type_: Some(type_tag.to_string()),
        content: Some(MoveContent {
            data_type: "moveObject".into(),
            type_: Some(type_tag.to_string()),
            fields,
        }),
    }
}

pub fn pool_object(
    config: &Config,
    cash: u64,
    staked: u64,
    reward: u64,
    lp_supply: u64,
) -> ObjectData {
    move_object(
        &config.deployment.lending_pool_id,
        &format!("{}::emergency_fund::LendingPool", config.deployment.package_id),
        json!({
            "buck_reserve": cash.to_string(),
            "susdb_balance": staked.to_string(),
            "reward_reserve": reward.to_string(),
            "waqf_reserve": "40000000",
            "maintenance_reserve": "20000000",
            "total_sui_locked": (25 * UNIT).to_string(),
            "total_lp_supply": lp_supply.to_string(),
        }),
    )
}

pub fn vault_object(
    config: &Config,
    collateral: u64,
    principal: u64,
    fee: u64,
    deadline_ms: u64,
) -> ObjectData {
    move_object(
        VAULT_ID,
        &config.deployment.vault_struct_type(),
        json!({
            "collateral_balance": collateral.to_string(),
            "principal_debt": principal.to_string(),
            "fee_debt": fee.to_string(),
            "deadline": deadline_ms.to_string(),
        }),
    )
}

pub fn score_object(config: &Config, score: u64, tier: u8) -> ObjectData {
    move_object(
        SCORE_ID,
        &config.deployment.credit_score_struct_type(),
        json!({ "score": score.to_string(), "tier": tier }),
    )
}

/// Ledger seeded with a 10 SUI wallet, 50 BUCK, 1000 BUCK of pool liquidity
/// and one open vault.
pub fn seeded_ledger(config: &Config) -> Arc<FakeLedger> {
    let ledger = Arc::new(FakeLedger::default());
    let d = &config.deployment;
    ledger.set_coins(OWNER, d.base_coin_type(), &[6 * UNIT, 4 * UNIT]);
    ledger.set_coins(OWNER, &d.buck_coin_type(), &[50 * UNIT]);
    ledger.set_coins(OWNER, &d.lp_coin_type(), &[10 * UNIT]);
    ledger.set_object(pool_object(config, 600 * UNIT, 400 * UNIT, 100 * UNIT, 1100 * UNIT));
    ledger.set_owned(
        OWNER,
        &d.vault_struct_type(),
        vec![vault_object(config, 10 * UNIT, 2 * UNIT, UNIT / 5, 0)],
    );
    ledger
}

pub struct Harness {
    pub ledger: Arc<FakeLedger>,
    pub cache: Arc<QueryCache>,
    pub refresh: RefreshHandle,
    pub price: Arc<PriceFeed>,
    pub dashboard: Arc<Dashboard>,
}

impl Harness {
    pub fn state(&self) -> AppState {
        AppState {
            dashboard: self.dashboard.clone(),
        }
    }
}

/// Wires a dashboard over `ledger` at the fallback price of 0.70. The pool
/// poller is pushed out of the way so tests control every fetch.
pub fn harness(config: Config, ledger: Arc<FakeLedger>) -> Harness {
    let config = Arc::new(config);
    let rpc: Arc<dyn LedgerRpc> = ledger.clone();
    let cache = Arc::new(QueryCache::new(rpc.clone()));
    let refresh = RefreshCoordinator::new(
        cache.clone(),
        &config.deployment.lending_pool_id,
        Duration::from_secs(3600),
        config.service.settle_delay,
    )
    .spawn();
    let price = Arc::new(PriceFeed::new(dec!(0.70)));
    let dashboard = Arc::new(Dashboard::new(
        config,
        rpc,
        cache.clone(),
        price.clone(),
        refresh.clone(),
    ));
    Harness {
        ledger,
        cache,
        refresh,
        price,
        dashboard,
    }
}
