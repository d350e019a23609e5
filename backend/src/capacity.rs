//! Client-side derived quantities: borrowing capacity, service fee, fee
//! split, collateral health and LP redemption. All arithmetic is decimal,
//! so no input combination produces NaN or infinity.

use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::Serialize;

use crate::{
    config::{PriceMode, ProtocolParams},
    error::{DashboardError, Result},
    models::LiquidityPool,
    oracle::PriceQuote,
};

/// Maximum principal `collateral` can back:
/// `(collateral * price) / (min_ratio * fee_multiplier)`.
///
/// Non-positive collateral or price yields zero. A non-positive denominator
/// also yields zero rather than dividing.
pub fn max_borrowable(
    collateral: Decimal,
    price: Decimal,
    min_ratio: Decimal,
    fee_multiplier: Decimal,
) -> Decimal {
    if collateral <= Decimal::ZERO || price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let denominator = min_ratio.saturating_mul(fee_multiplier);
    if denominator <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    collateral
        .saturating_mul(price)
        .checked_div(denominator)
        .unwrap_or(Decimal::MAX)
}

/// `max_borrowable` with the ratio and fee multiplier taken from `params`.
pub fn capacity(collateral: Decimal, price: Decimal, params: &ProtocolParams) -> Decimal {
    max_borrowable(
        collateral,
        price,
        params.min_collateral_ratio,
        params.capacity_fee_multiplier(),
    )
}

/// Price used to value collateral.
pub fn valuation_price(params: &ProtocolParams, quote: &PriceQuote) -> Decimal {
    match params.price_mode {
        PriceMode::Floor => params.price_floor,
        PriceMode::Oracle if quote.price > Decimal::ZERO => quote.price,
        PriceMode::Oracle => params.price_floor,
    }
}

/// The most a borrow may request: the lesser of capacity and pool liquidity.
pub fn borrow_limit(capacity: Decimal, liquidity: Decimal) -> Decimal {
    capacity.min(liquidity.max(Decimal::ZERO))
}

/// Submit guard for a borrow. `requested == limit` passes.
pub fn check_borrow(requested: Decimal, capacity: Decimal, liquidity: Decimal) -> Result<()> {
    if requested <= Decimal::ZERO {
        return Err(DashboardError::InvalidAmount(
            "borrow amount must be greater than zero".into(),
        ));
    }
    if requested > capacity {
        return Err(DashboardError::ExceedsCapacity {
            requested,
            capacity,
        });
    }
    if requested > liquidity {
        return Err(DashboardError::ExceedsLiquidity {
            requested,
            liquidity,
        });
    }
    Ok(())
}

pub fn service_fee(amount: Decimal, fee_rate: Decimal) -> Decimal {
    amount.saturating_mul(fee_rate)
}

pub fn total_obligation(amount: Decimal, fee_rate: Decimal) -> Decimal {
    amount.saturating_add(service_fee(amount, fee_rate))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeSplit {
    pub liquidity_providers: Decimal,
    pub waqf: Decimal,
    pub maintenance: Decimal,
}

/// Splits a collected fee; maintenance takes the remainder so the parts sum
/// to `fee` exactly.
pub fn fee_split(fee: Decimal, params: &ProtocolParams) -> FeeSplit {
    let liquidity_providers = fee.saturating_mul(params.lp_fee_share);
    let waqf = fee.saturating_mul(params.waqf_fee_share);
    FeeSplit {
        liquidity_providers,
        waqf,
        maintenance: fee - liquidity_providers - waqf,
    }
}

/// Collateral value over total debt. `None` when nothing is owed.
pub fn collateral_ratio(collateral_value: Decimal, debt: Decimal) -> Option<Decimal> {
    if debt <= Decimal::ZERO {
        return None;
    }
    collateral_value.checked_div(debt)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthBand {
    Healthy,
    Warning,
    AtRisk,
}

pub fn health_band(ratio: Option<Decimal>, params: &ProtocolParams) -> HealthBand {
    match ratio {
        None => HealthBand::Healthy,
        Some(r) if r > params.healthy_ratio => HealthBand::Healthy,
        Some(r) if r > params.warning_ratio => HealthBand::Warning,
        Some(_) => HealthBand::AtRisk,
    }
}

/// Pro-rata share of the pool's redeemable reserves, in base units.
pub fn lp_redemption(shares: u64, pool: &LiquidityPool) -> u64 {
    if pool.total_lp_supply == 0 {
        return 0;
    }
    let value = u128::from(shares) * u128::from(pool.redeemable_reserves())
        / u128::from(pool.total_lp_supply);
    u64::try_from(value).unwrap_or(u64::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AutoFill {
    pub collateral: Decimal,
    pub amount: Decimal,
}

/// Wallet collateral that can be pledged while leaving the gas reserve.
pub fn spendable_collateral(wallet_collateral: Decimal, params: &ProtocolParams) -> Decimal {
    (wallet_collateral - params.gas_reserve).max(Decimal::ZERO)
}

/// Initial form values: a fraction of the wallet's collateral and the
/// largest borrow it supports. `None` while either side is empty.
pub fn auto_fill(
    wallet_collateral: Decimal,
    price: Decimal,
    liquidity: Decimal,
    params: &ProtocolParams,
) -> Option<AutoFill> {
    if wallet_collateral <= Decimal::ZERO || liquidity <= Decimal::ZERO {
        return None;
    }
    let collateral = wallet_collateral
        .saturating_mul(params.auto_fill_fraction)
        .min(spendable_collateral(wallet_collateral, params))
        .round_dp_with_strategy(3, RoundingStrategy::ToZero);
    if collateral <= Decimal::ZERO {
        return None;
    }
    let amount = borrow_limit(capacity(collateral, price, params), liquidity)
        .round_dp_with_strategy(2, RoundingStrategy::ToZero);
    Some(AutoFill { collateral, amount })
}

/// Display amount to on-chain base units, truncating sub-unit dust.
pub fn to_base_units(amount: Decimal, params: &ProtocolParams) -> Result<u64> {
    if amount.is_sign_negative() {
        return Err(DashboardError::InvalidAmount(format!(
            "{amount} is negative"
        )));
    }
    amount
        .checked_mul(params.base_unit())
        .and_then(|units| units.trunc().to_u64())
        .ok_or_else(|| DashboardError::InvalidAmount(format!("{amount} is out of range")))
}

pub fn from_base_units(units: u64, params: &ProtocolParams) -> Decimal {
    Decimal::from(units) / params.base_unit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn params() -> ProtocolParams {
        ProtocolParams::default()
    }

    #[test]
    fn zero_collateral_has_zero_capacity() {
        assert_eq!(max_borrowable(dec!(0), dec!(0.7), dec!(1.5), dec!(1.1)), Decimal::ZERO);
    }

    #[test]
    fn fee_reservation_shrinks_capacity() {
        let without = max_borrowable(dec!(11), dec!(1), dec!(1), dec!(1));
        let with = max_borrowable(dec!(11), dec!(1), dec!(1), dec!(1.1));
        assert_eq!(without, dec!(11));
        assert_eq!(with, dec!(10));
    }

    #[test]
    fn fee_and_obligation() {
        assert_eq!(service_fee(dec!(100), dec!(0.10)), dec!(10));
        assert_eq!(total_obligation(dec!(100), dec!(0.10)), dec!(110));
    }

    #[test]
    fn fee_split_sums_to_fee() {
        let split = fee_split(dec!(10.01), &params());
        assert_eq!(split.liquidity_providers, dec!(4.004));
        assert_eq!(split.waqf, dec!(4.004));
        assert_eq!(
            split.liquidity_providers + split.waqf + split.maintenance,
            dec!(10.01)
        );
    }

    #[test]
    fn limit_is_lesser_of_capacity_and_liquidity() {
        assert_eq!(borrow_limit(dec!(5), dec!(3)), dec!(3));
        assert_eq!(borrow_limit(dec!(2), dec!(3)), dec!(2));
        assert_eq!(borrow_limit(dec!(2), dec!(-1)), dec!(0));
    }

    #[test]
    fn guard_names_the_binding_constraint() {
        assert!(matches!(
            check_borrow(dec!(3), dec!(2), dec!(10)),
            Err(DashboardError::ExceedsCapacity { .. })
        ));
        assert!(matches!(
            check_borrow(dec!(3), dec!(10), dec!(2)),
            Err(DashboardError::ExceedsLiquidity { .. })
        ));
        assert!(matches!(
            check_borrow(dec!(0), dec!(10), dec!(10)),
            Err(DashboardError::InvalidAmount(_))
        ));
    }

    #[test]
    fn health_bands() {
        let p = params();
        assert_eq!(health_band(None, &p), HealthBand::Healthy);
        assert_eq!(health_band(Some(dec!(2.5)), &p), HealthBand::Healthy);
        assert_eq!(health_band(Some(dec!(2.0)), &p), HealthBand::Warning);
        assert_eq!(health_band(Some(dec!(1.5)), &p), HealthBand::AtRisk);
        assert_eq!(collateral_ratio(dec!(3), dec!(0)), None);
        assert_eq!(collateral_ratio(dec!(3), dec!(2)), Some(dec!(1.5)));
    }

    #[test]
    fn lp_redemption_is_pro_rata() {
        let pool = LiquidityPool {
            cash_reserve: 600,
            staked_reserve: 300,
            reward_reserve: 100,
            total_lp_supply: 500,
            ..LiquidityPool::default()
        };
        assert_eq!(lp_redemption(50, &pool), 100);
        assert_eq!(lp_redemption(500, &pool), 1000);
        assert_eq!(lp_redemption(10, &LiquidityPool::default()), 0);
    }

    #[test]
    fn auto_fill_uses_ninety_percent_of_wallet() {
        let fill = auto_fill(dec!(10), dec!(0.70), dec!(1000), &params()).unwrap();
        assert_eq!(fill.collateral, dec!(9.000));
        assert_eq!(fill.amount, dec!(4.20));

        let capped = auto_fill(dec!(10), dec!(0.70), dec!(1.5), &params()).unwrap();
        assert_eq!(capped.amount, dec!(1.50));

        assert!(auto_fill(dec!(10), dec!(0.70), dec!(0), &params()).is_none());
        assert!(auto_fill(dec!(0), dec!(0.70), dec!(10), &params()).is_none());
    }

    #[test]
    fn auto_fill_leaves_gas_in_small_wallets() {
        let fill = auto_fill(dec!(0.3), dec!(0.70), dec!(1000), &params()).unwrap();
        assert_eq!(fill.collateral, dec!(0.25));
        assert!(auto_fill(dec!(0.04), dec!(0.70), dec!(1000), &params()).is_none());
        assert_eq!(spendable_collateral(dec!(0.04), &params()), Decimal::ZERO);
    }

    #[test]
    fn base_unit_conversion_truncates() {
        let p = params();
        assert_eq!(to_base_units(dec!(1.5), &p).unwrap(), 1_500_000_000);
        assert_eq!(to_base_units(dec!(0.0000000019), &p).unwrap(), 1);
        assert!(to_base_units(dec!(-1), &p).is_err());
        assert!(to_base_units(dec!(100000000000), &p).is_err());
        assert_eq!(from_base_units(2_500_000_000, &p), dec!(2.5));
    }

    #[test]
    fn valuation_follows_price_mode() {
        let mut p = params();
        let quote = PriceQuote::live(dec!(3.2));
        assert_eq!(valuation_price(&p, &quote), dec!(0.70));
        p.price_mode = PriceMode::Oracle;
        assert_eq!(valuation_price(&p, &quote), dec!(3.2));
    }
}
