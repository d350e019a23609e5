#![no_main]
use arbitrary::Arbitrary;
use befs_backend::{
    capacity::{borrow_limit, check_borrow, fee_split, max_borrowable, service_fee},
    config::ProtocolParams,
};
use libfuzzer_sys::fuzz_target;
use rust_decimal::Decimal;

#[derive(Arbitrary, Debug)]
struct BorrowInput {
    collateral_milli: u64,
    extra_collateral_milli: u32,
    price_milli: u32,
    ratio_bump_milli: u16,
    liquidity_milli: u64,
    requested_milli: u64,
    reserve_fee: bool,
}

fn milli(v: u64) -> Decimal {
    Decimal::new(v as i64 & i64::MAX, 3)
}

fuzz_target!(|input: BorrowInput| {
    let params = ProtocolParams {
        reserve_fee_in_capacity: input.reserve_fee,
        ..ProtocolParams::default()
    };
    let fee = params.capacity_fee_multiplier();
    let ratio = params.min_collateral_ratio + milli(u64::from(input.ratio_bump_milli));
    let price = milli(u64::from(input.price_milli));
    let collateral = milli(input.collateral_milli);
    let more = collateral + milli(u64::from(input.extra_collateral_milli));

    let cap = max_borrowable(collateral, price, ratio, fee);
    let cap_more = max_borrowable(more, price, ratio, fee);
    let cap_stricter = max_borrowable(collateral, price, ratio + Decimal::ONE, fee);

    // Invariants
    assert!(cap >= Decimal::ZERO);
    assert!(cap <= cap_more);
    assert!(cap_stricter <= cap);

    let liquidity = milli(input.liquidity_milli);
    let requested = milli(input.requested_milli);
    let limit = borrow_limit(cap, liquidity);
    match check_borrow(requested, cap, liquidity) {
        Ok(()) => assert!(requested > Decimal::ZERO && requested <= limit),
        Err(_) => assert!(requested == Decimal::ZERO || requested > limit),
    }

    let fee_amount = service_fee(requested, params.service_fee_rate);
    let split = fee_split(fee_amount, &params);
    assert_eq!(split.liquidity_providers + split.waqf + split.maintenance, fee_amount);
});

// Run with: cargo fuzz run capacity -- -runs=1000000
