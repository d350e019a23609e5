//! Typed decoders for the emergency fund's published objects.
//!
//! Each schema is decoded once at the RPC boundary. A missing or malformed
//! field is an error, never a zero.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    error::{DashboardError, Result},
    models::{CreditProfile, LiquidityPool, Position},
    sui::{u64_string, CoinObject, ObjectData},
};

#[derive(Debug, Deserialize)]
struct PoolFields {
    #[serde(deserialize_with = "u64_string")]
    buck_reserve: u64,
    #[serde(deserialize_with = "u64_string")]
    susdb_balance: u64,
    #[serde(deserialize_with = "u64_string")]
    reward_reserve: u64,
    #[serde(deserialize_with = "u64_string")]
    waqf_reserve: u64,
    #[serde(deserialize_with = "u64_string")]
    maintenance_reserve: u64,
    #[serde(deserialize_with = "u64_string")]
    total_sui_locked: u64,
    #[serde(deserialize_with = "u64_string")]
    total_lp_supply: u64,
}

#[derive(Debug, Deserialize)]
struct VaultFields {
    #[serde(deserialize_with = "u64_string")]
    collateral_balance: u64,
    #[serde(deserialize_with = "u64_string")]
    principal_debt: u64,
    #[serde(deserialize_with = "u64_string")]
    fee_debt: u64,
    #[serde(deserialize_with = "u64_string")]
    deadline: u64,
}

#[derive(Debug, Deserialize)]
struct CreditScoreFields {
    #[serde(deserialize_with = "u64_string")]
    score: u64,
    #[serde(deserialize_with = "small_int")]
    tier: u8,
}

/// Sui renders integers narrower than u64 as JSON numbers. A string form is
/// accepted too.
fn small_int<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    let value = match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n,
        Raw::Text(s) => s.trim().parse::<u64>().map_err(serde::de::Error::custom)?,
    };
    u8::try_from(value)
        .map_err(|_| serde::de::Error::custom(format!("{value} out of range for u8")))
}

fn move_fields<T: DeserializeOwned>(
    object: &ObjectData,
    schema: &'static str,
    type_suffix: &str,
) -> Result<T> {
    let content = object
        .content
        .as_ref()
        .ok_or_else(|| DashboardError::decode(schema, "object has no content"))?;
    if content.data_type != "moveObject" {
        return Err(DashboardError::decode(
            schema,
            format!("expected a move object, got `{}`", content.data_type),
        ));
    }
    if let Some(type_tag) = content.type_.as_ref().or(object.type_.as_ref()) {
        if !type_tag.ends_with(type_suffix) {
            return Err(DashboardError::decode(
                schema,
                format!("unexpected type `{type_tag}`"),
            ));
        }
    }
    serde_json::from_value(content.fields.clone())
        .map_err(|e| DashboardError::decode(schema, e.to_string()))
}

pub fn decode_pool(object: &ObjectData) -> Result<LiquidityPool> {
    let fields: PoolFields = move_fields(object, "LendingPool", "::emergency_fund::LendingPool")?;
    Ok(LiquidityPool {
        cash_reserve: fields.buck_reserve,
        staked_reserve: fields.susdb_balance,
        reward_reserve: fields.reward_reserve,
        waqf_reserve: fields.waqf_reserve,
        maintenance_reserve: fields.maintenance_reserve,
        total_collateral_locked: fields.total_sui_locked,
        total_lp_supply: fields.total_lp_supply,
    })
}

pub fn decode_position(object: &ObjectData) -> Result<Position> {
    let fields: VaultFields = move_fields(object, "UserVault", "::emergency_fund::UserVault")?;
    let deadline = match fields.deadline {
        0 => None,
        ms => {
            let millis = i64::try_from(ms)
                .map_err(|_| DashboardError::decode("UserVault", "deadline out of range"))?;
            Some(
                DateTime::<Utc>::from_timestamp_millis(millis)
                    .ok_or_else(|| DashboardError::decode("UserVault", "deadline out of range"))?,
            )
        }
    };
    Ok(Position {
        object_id: object.object_id.clone(),
        collateral: fields.collateral_balance,
        principal_debt: fields.principal_debt,
        fee_debt: fields.fee_debt,
        deadline,
    })
}

pub fn decode_credit_profile(object: &ObjectData) -> Result<CreditProfile> {
    let fields: CreditScoreFields =
        move_fields(object, "CreditScore", "::credit_score::CreditScore")?;
    if fields.score > 1000 {
        return Err(DashboardError::decode(
            "CreditScore",
            format!("score {} outside 0..=1000", fields.score),
        ));
    }
    Ok(CreditProfile {
        object_id: Some(object.object_id.clone()),
        score: fields.score,
        tier: fields.tier,
    })
}

/// Total balance across every coin object, saturating at `u64::MAX`.
pub fn total_balance(coins: &[CoinObject]) -> u64 {
    let sum: u128 = coins.iter().map(|c| u128::from(c.balance)).sum();
    u64::try_from(sum).unwrap_or(u64::MAX)
}
