use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A `UserVault` as published by the emergency fund module. Amounts are base units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Position {
    pub object_id: String,
    pub collateral: u64,
    pub principal_debt: u64,
    pub fee_debt: u64,
    pub deadline: Option<DateTime<Utc>>,
}

impl Position {
    pub fn total_debt(&self) -> u64 {
        self.principal_debt.saturating_add(self.fee_debt)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreditProfile {
    pub object_id: Option<String>,
    pub score: u64,
    pub tier: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CreditTier {
    Fair,
    Shalih,
    Muttaqin,
}

impl CreditTier {
    pub fn from_level(tier: u8) -> Self {
        match tier {
            t if t >= 5 => CreditTier::Muttaqin,
            4 => CreditTier::Shalih,
            _ => CreditTier::Fair,
        }
    }
}

/// The shared `LendingPool` object. Amounts are base units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LiquidityPool {
    pub cash_reserve: u64,
    pub staked_reserve: u64,
    pub reward_reserve: u64,
    pub waqf_reserve: u64,
    pub maintenance_reserve: u64,
    pub total_collateral_locked: u64,
    pub total_lp_supply: u64,
}

impl LiquidityPool {
    /// Funds a new borrow can draw on.
    pub fn available_liquidity(&self) -> u64 {
        self.cash_reserve.saturating_add(self.staked_reserve)
    }

    /// Reserves LP shares redeem against.
    pub fn redeemable_reserves(&self) -> u64 {
        self.available_liquidity().saturating_add(self.reward_reserve)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WalletBalances {
    pub base: u64,
    pub buck: u64,
    pub lp: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BorrowForm {
    pub owner: String,
    pub collateral: Option<Decimal>,
    pub amount: Option<Decimal>,
    pub term_months: Option<u64>,
    #[serde(default)]
    pub agreed: bool,
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub owner: String,
    pub vault_id: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct BorrowRequest {
    pub owner: String,
    pub vault_id: String,
    pub amount: Decimal,
    pub term_months: Option<u64>,
    pub credit_score_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RepayRequest {
    pub owner: String,
    pub vault_id: String,
    pub amount: Decimal,
    pub credit_score_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub owner: String,
    pub vault_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LiquidityRequest {
    pub owner: String,
    pub amount: Decimal,
    /// Mint the deposit from the test treasury instead of spending wallet BUCK.
    #[serde(default)]
    pub use_faucet: bool,
}

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub owner: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignedTransaction {
    pub tx_bytes: String,
    pub signatures: Vec<String>,
    pub sender: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub digest: String,
    pub status: &'static str,
}
