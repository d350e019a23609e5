use std::{env, str::FromStr, time::Duration};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::{DashboardError, Result};

pub const SUI_NETWORK: &str = "testnet";
pub const RPC_URL: &str = "https://fullnode.testnet.sui.io:443";
pub const ORACLE_URL: &str =
    "https://api.coingecko.com/api/v3/simple/price?ids=sui&vs_currencies=usd";
pub const ORACLE_PRICE_POINTER: &str = "/sui/usd";
pub const BIND_ADDR: &str = "0.0.0.0:3000";

// Re-pinned on every redeploy of the Move package.
pub const PACKAGE_ID: &str = "0xd73c1e7d96e8a887f45f1765e2c1a65ae7fcba594b707084b2a60d7d281f2282";
pub const LENDING_POOL_ID: &str =
    "0xe1f0ff0e05c9846bb82f2e4034f6dbb69520316938ce7972e77da94d1aeab333";
pub const BUCK_TREASURY_ID: &str =
    "0x9be89704a521764e9d30f21b1fa8382fbd6a5fe8dee62c879378a7f8b50a0bfc";
pub const MAINTENANCE_CAP_ID: &str =
    "0xc0ef29f3461fb9acd26e0ce6413408d9e015935bc0c399b89660458403b32e98";
pub const CLOCK_ID: &str = "0x6";
pub const SUI_COIN_TYPE: &str = "0x2::sui::SUI";

pub const MODULE_EMERGENCY_FUND: &str = "emergency_fund";
pub const MODULE_BUCKET_MOCK: &str = "bucket_mock";
pub const MODULE_CREDIT_SCORE: &str = "credit_score";

pub const POOL_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const SETTLE_DELAY: Duration = Duration::from_millis(1500);
pub const ORACLE_POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const CACHE_MAX_ENTRIES: usize = 4096;
pub const CACHE_IDLE_TTL: Duration = Duration::from_secs(300);

/// Which price values collateral when computing borrowing capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceMode {
    /// Always the fixed floor price. The protocol advertises this floor.
    Floor,
    /// Last good oracle price, the floor when the feed has never answered.
    /// Opt-in only.
    Oracle,
}

impl FromStr for PriceMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "floor" => Ok(PriceMode::Floor),
            "oracle" => Ok(PriceMode::Oracle),
            other => Err(format!("unknown price mode `{other}`")),
        }
    }
}

/// Arithmetic constants shared by every derived quantity.
#[derive(Debug, Clone)]
pub struct ProtocolParams {
    pub price_floor: Decimal,
    pub price_mode: PriceMode,
    pub min_collateral_ratio: Decimal,
    pub service_fee_rate: Decimal,
    /// Divide capacity by `1 + service_fee_rate` as well as the ratio.
    pub reserve_fee_in_capacity: bool,
    pub base_unit_decimals: u32,
    pub lp_fee_share: Decimal,
    pub waqf_fee_share: Decimal,
    pub healthy_ratio: Decimal,
    pub warning_ratio: Decimal,
    pub auto_fill_fraction: Decimal,
    /// Base asset kept back from a pledge split off the gas coin.
    pub gas_reserve: Decimal,
    pub min_term_months: u64,
    pub max_term_months: u64,
    pub default_term_months: u64,
    pub default_credit_score: u64,
    pub default_credit_tier: u8,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            price_floor: dec!(0.70),
            price_mode: PriceMode::Floor,
            min_collateral_ratio: dec!(1.5),
            service_fee_rate: dec!(0.10),
            reserve_fee_in_capacity: false,
            base_unit_decimals: 9,
            lp_fee_share: dec!(0.40),
            waqf_fee_share: dec!(0.40),
            healthy_ratio: dec!(2.0),
            warning_ratio: dec!(1.5),
            auto_fill_fraction: dec!(0.9),
            gas_reserve: dec!(0.05),
            min_term_months: 1,
            max_term_months: 24,
            default_term_months: 6,
            default_credit_score: 500,
            default_credit_tier: 3,
        }
    }
}

impl ProtocolParams {
    /// Multiplier applied to the collateral ratio when sizing capacity.
    pub fn capacity_fee_multiplier(&self) -> Decimal {
        if self.reserve_fee_in_capacity {
            Decimal::ONE + self.service_fee_rate
        } else {
            Decimal::ONE
        }
    }

    pub fn base_unit(&self) -> Decimal {
        Decimal::from(10u64.pow(self.base_unit_decimals))
    }
}

/// Object ids and type tags of the published Move package.
#[derive(Debug, Clone)]
pub struct Deployment {
    pub package_id: String,
    pub lending_pool_id: String,
    pub buck_treasury_id: String,
    pub maintenance_cap_id: String,
    pub clock_id: String,
}

impl Default for Deployment {
    fn default() -> Self {
        Self {
            package_id: PACKAGE_ID.to_string(),
            lending_pool_id: LENDING_POOL_ID.to_string(),
            buck_treasury_id: BUCK_TREASURY_ID.to_string(),
            maintenance_cap_id: MAINTENANCE_CAP_ID.to_string(),
            clock_id: CLOCK_ID.to_string(),
        }
    }
}

impl Deployment {
    pub fn target(&self, module: &str, function: &str) -> String {
        format!("{}::{}::{}", self.package_id, module, function)
    }

    pub fn base_coin_type(&self) -> &'static str {
        SUI_COIN_TYPE
    }

    pub fn buck_coin_type(&self) -> String {
        format!("{}::{}::BUCKET_MOCK", self.package_id, MODULE_BUCKET_MOCK)
    }

    pub fn lp_coin_type(&self) -> String {
        format!("{}::{}::EMERGENCY_FUND", self.package_id, MODULE_EMERGENCY_FUND)
    }

    pub fn vault_struct_type(&self) -> String {
        format!("{}::{}::UserVault", self.package_id, MODULE_EMERGENCY_FUND)
    }

    pub fn credit_score_struct_type(&self) -> String {
        format!("{}::{}::CreditScore", self.package_id, MODULE_CREDIT_SCORE)
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub rpc_url: String,
    pub oracle_url: String,
    pub oracle_price_pointer: String,
    pub bind_addr: String,
    pub pool_poll_interval: Duration,
    pub settle_delay: Duration,
    pub oracle_poll_interval: Duration,
    pub cache_max_entries: usize,
    pub cache_idle_ttl: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            rpc_url: RPC_URL.to_string(),
            oracle_url: ORACLE_URL.to_string(),
            oracle_price_pointer: ORACLE_PRICE_POINTER.to_string(),
            bind_addr: BIND_ADDR.to_string(),
            pool_poll_interval: POOL_POLL_INTERVAL,
            settle_delay: SETTLE_DELAY,
            oracle_poll_interval: ORACLE_POLL_INTERVAL,
            cache_max_entries: CACHE_MAX_ENTRIES,
            cache_idle_ttl: CACHE_IDLE_TTL,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub params: ProtocolParams,
    pub deployment: Deployment,
    pub service: ServiceConfig,
}

impl Config {
    /// Compiled-in defaults with `BEFS_*` environment overrides applied.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        override_string("BEFS_RPC_URL", &mut config.service.rpc_url);
        override_string("BEFS_ORACLE_URL", &mut config.service.oracle_url);
        override_string("BEFS_ORACLE_POINTER", &mut config.service.oracle_price_pointer);
        override_string("BEFS_BIND_ADDR", &mut config.service.bind_addr);
        override_string("BEFS_PACKAGE_ID", &mut config.deployment.package_id);
        override_string("BEFS_POOL_ID", &mut config.deployment.lending_pool_id);
        override_string("BEFS_TREASURY_ID", &mut config.deployment.buck_treasury_id);
        override_string("BEFS_MAINTENANCE_CAP_ID", &mut config.deployment.maintenance_cap_id);

        if let Some(secs) = parse_env::<u64>("BEFS_POOL_POLL_SECS")? {
            config.service.pool_poll_interval = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_env::<u64>("BEFS_SETTLE_DELAY_MS")? {
            config.service.settle_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_env::<u64>("BEFS_ORACLE_POLL_SECS")? {
            config.service.oracle_poll_interval = Duration::from_secs(secs);
        }
        if let Some(entries) = parse_env::<usize>("BEFS_CACHE_MAX_ENTRIES")? {
            config.service.cache_max_entries = entries;
        }
        if let Some(secs) = parse_env::<u64>("BEFS_CACHE_IDLE_SECS")? {
            config.service.cache_idle_ttl = Duration::from_secs(secs);
        }
        if let Some(reserve) = parse_env::<Decimal>("BEFS_GAS_RESERVE")? {
            config.params.gas_reserve = reserve;
        }
        if let Some(mode) = parse_env::<PriceMode>("BEFS_PRICE_MODE")? {
            config.params.price_mode = mode;
        }
        if let Some(floor) = parse_env::<Decimal>("BEFS_PRICE_FLOOR")? {
            config.params.price_floor = floor;
        }
        if let Some(reserve) = parse_env::<bool>("BEFS_RESERVE_FEE_IN_CAPACITY")? {
            config.params.reserve_fee_in_capacity = reserve;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.params;
        if p.price_floor <= Decimal::ZERO {
            return Err(DashboardError::Config {
                key: "price_floor",
                reason: "must be positive".into(),
            });
        }
        if p.min_collateral_ratio < Decimal::ONE {
            return Err(DashboardError::Config {
                key: "min_collateral_ratio",
                reason: "must be at least 1".into(),
            });
        }
        if p.service_fee_rate < Decimal::ZERO {
            return Err(DashboardError::Config {
                key: "service_fee_rate",
                reason: "must not be negative".into(),
            });
        }
        if p.lp_fee_share + p.waqf_fee_share > Decimal::ONE {
            return Err(DashboardError::Config {
                key: "fee_split",
                reason: "LP and waqf shares exceed the whole fee".into(),
            });
        }
        if p.gas_reserve < Decimal::ZERO {
            return Err(DashboardError::Config {
                key: "gas_reserve",
                reason: "must not be negative".into(),
            });
        }
        if self.service.cache_max_entries == 0 {
            return Err(DashboardError::Config {
                key: "cache_max_entries",
                reason: "must be at least 1".into(),
            });
        }
        if p.min_term_months == 0 || p.min_term_months > p.max_term_months {
            return Err(DashboardError::Config {
                key: "term_months",
                reason: "invalid term bounds".into(),
            });
        }
        Ok(())
    }
}

fn override_string(key: &str, slot: &mut String) {
    if let Ok(value) = env::var(key) {
        if !value.trim().is_empty() {
            *slot = value.trim().to_string();
        }
    }
}

fn parse_env<T>(key: &'static str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| DashboardError::Config {
                key,
                reason: e.to_string(),
            }),
        _ => Ok(None),
    }
}
