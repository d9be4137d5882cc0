use super::*;
use crate::errors::RouterError;
use crate::pools::pool::tests::{token, weighted_pool};
use crate::pools::{Pool, PoolId, PoolKind, PoolToken, SwapType};
use crate::utils::constants::{NATIVE, WETH};
use alloy_primitives::Address;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const DAI: u8 = 0xda;
const USDC: u8 = 0xc0;
const HOP: u8 = 0x77;

fn addr(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

fn pair_pool(id: u8, first: (u8, Decimal, u32), second: (u8, Decimal, u32)) -> Pool {
    let half = Some(dec!(0.5));
    weighted_pool(id, dec!(0.003), vec![token(first.0, first.1, first.2, half), token(second.0, second.1, second.2, half)])
}

// DAI/USDC pools about 8.9:1 in depth, the shallow one quoting a hair better.
fn dai_usdc_snapshot() -> Vec<Pool> {
    vec![
        pair_pool(0x01, (DAI, dec!(8.988228), 18), (USDC, dec!(9.173834), 6)),
        pair_pool(0x02, (DAI, dec!(1.011772), 18), (USDC, dec!(1.032665), 6)),
    ]
}

fn ten_to_one_snapshot() -> Vec<Pool> {
    vec![
        pair_pool(0x0a, (DAI, dec!(10000), 18), (USDC, dec!(10000), 18)),
        pair_pool(0x0b, (DAI, dec!(1000), 18), (USDC, dec!(1000), 18)),
    ]
}

fn mixed_snapshot() -> Vec<Pool> {
    vec![
        pair_pool(0x21, (DAI, dec!(5000), 18), (USDC, dec!(5000), 6)),
        pair_pool(0x22, (DAI, dec!(3000), 18), (HOP, dec!(6000), 8)),
        pair_pool(0x23, (HOP, dec!(8000), 8), (USDC, dec!(4000), 6)),
        pair_pool(0x24, (DAI, dec!(800), 18), (USDC, dec!(790), 6)),
    ]
}

fn route(pools: &[Pool], swap_type: SwapType, amount: Decimal, options: &SwapOptions) -> Result<RouteResult, RouterError> {
    Router::default().route(addr(DAI), addr(USDC), swap_type, amount, pools, options)
}

#[test]
fn test_dai_usdc_split() -> eyre::Result<()> {
    let pools = dai_usdc_snapshot();
    let result = route(&pools, SwapType::ExactIn, dec!(0.1), &SwapOptions::default())?;

    assert_eq!(result.path_count(), 2);
    assert_eq!(result.return_amount, dec!(0.100754));
    assert_eq!(result.total_path_amount(), dec!(0.1));

    let amount_through = |pool: &Pool| {
        result.swaps.iter().flatten().find(|step| step.pool_id == pool.id).map(|step| step.swap_amount)
    };
    let deep = amount_through(&pools[0]).unwrap_or_default();
    let shallow = amount_through(&pools[1]).unwrap_or_default();
    assert!((deep - dec!(0.089882)).abs() < dec!(0.000001), "deep pool takes {}", deep);
    assert!((shallow - dec!(0.010118)).abs() < dec!(0.000001), "shallow pool takes {}", shallow);
    assert!((result.market_spot_price - dec!(1.01758796)).abs() < dec!(0.00000001), "{}", result.market_spot_price);
    Ok(())
}

#[test]
fn test_deep_pools_route_without_overflow() -> eyre::Result<()> {
    let pools = vec![
        pair_pool(0x31, (DAI, dec!(400000000000000), 18), (USDC, dec!(400000000000000), 6)),
        pair_pool(0x32, (DAI, dec!(300000000000000), 18), (USDC, dec!(300000000000000), 6)),
    ];
    let result = route(&pools, SwapType::ExactIn, dec!(1000000), &SwapOptions::default())?;

    assert_eq!(result.path_count(), 2);
    assert_eq!(result.total_path_amount(), dec!(1000000));
    assert!(result.return_amount > dec!(996990) && result.return_amount < dec!(997000), "{}", result.return_amount);
    Ok(())
}

#[test]
fn test_drained_stable_pool_is_skipped() -> eyre::Result<()> {
    let pool = Pool {
        id: PoolId::Address(addr(0x51)),
        address: addr(0x51),
        swap_fee: dec!(0.0004),
        total_shares: dec!(20000000000),
        tokens: vec![
            token(DAI, dec!(10000000000), 18, None),
            token(USDC, dec!(10000000000), 6, None),
            token(HOP, dec!(0.000000001), 18, None),
        ],
        kind: PoolKind::Stable { amp: dec!(200) },
    };
    let result = route(&[pool], SwapType::ExactIn, dec!(1000), &SwapOptions::default())?;
    assert!(result.is_empty());
    assert_eq!(result.return_amount, Decimal::ZERO);
    Ok(())
}

#[test]
fn test_path_count_follows_execution_cost() -> eyre::Result<()> {
    let pools = ten_to_one_snapshot();
    let options = SwapOptions::default().with_execution_cost(dec!(0.1));

    // splitting 1 DAI gains far less than the cost of a second path
    let small = route(&pools, SwapType::ExactIn, dec!(1), &options)?;
    assert_eq!(small.path_count(), 1);
    assert_eq!(small.swaps[0][0].pool_id, pools[0].id);
    assert_eq!(small.return_amount_considering_fees, small.return_amount - dec!(0.1));

    // 250 DAI is still below the small pool's limit but slips enough to pay for the split
    let large = route(&pools, SwapType::ExactIn, dec!(250), &options)?;
    assert_eq!(large.path_count(), 2);
    let single = route(&pools, SwapType::ExactIn, dec!(250), &options.clone().with_max_pools(1))?;
    assert!(large.return_amount - single.return_amount > dec!(0.1));
    assert_eq!(large.return_amount_considering_fees, large.return_amount - dec!(0.2));

    let free = route(&pools, SwapType::ExactIn, dec!(1), &SwapOptions::default())?;
    assert_eq!(free.path_count(), 2);
    Ok(())
}

#[test]
fn test_insufficient_liquidity() {
    let pools = ten_to_one_snapshot();
    let err = route(&pools, SwapType::ExactIn, dec!(4000), &SwapOptions::default()).unwrap_err();
    assert_eq!(
        err,
        RouterError::InsufficientLiquidity {
            token_in: addr(DAI),
            token_out: addr(USDC),
            requested: dec!(4000),
            available: dec!(3300),
        }
    );
    assert!(route(&pools, SwapType::ExactIn, dec!(3300), &SwapOptions::default()).is_ok());
}

#[test]
fn test_identical_requests_serialize_identically() -> eyre::Result<()> {
    let pools = mixed_snapshot();
    for swap_type in [SwapType::ExactIn, SwapType::ExactOut] {
        let first = route(&pools, swap_type, dec!(750), &SwapOptions::default())?;
        let second = route(&pools, swap_type, dec!(750), &SwapOptions::default())?;
        assert_eq!(serde_json::to_vec(&first)?, serde_json::to_vec(&second)?);
    }
    Ok(())
}

#[test]
fn test_allocation_is_conserved_and_within_limits() -> eyre::Result<()> {
    let pools = mixed_snapshot();
    let router = Router::default();
    let options = SwapOptions::default();
    for (swap_type, amount) in [(SwapType::ExactIn, dec!(1234.5678)), (SwapType::ExactOut, dec!(987.654321))] {
        let result = router.route(addr(DAI), addr(USDC), swap_type, amount, &pools, &options)?;
        assert!(result.path_count() > 1);
        assert_eq!(result.total_path_amount(), amount);

        let limits = router.prepare_paths(&pools, addr(DAI), addr(USDC), swap_type, &options)?;
        for steps in &result.swaps {
            let pool_ids: Vec<PoolId> = steps.iter().map(|s| s.pool_id).collect();
            let path = limits.iter().find(|p| p.pool_ids() == pool_ids).unwrap();
            let origin = match swap_type {
                SwapType::ExactIn => steps[0].swap_amount,
                SwapType::ExactOut => steps[steps.len() - 1].swap_amount,
            };
            assert!(origin <= path.limit, "{} over limit {}", origin, path.limit);
        }
    }
    Ok(())
}

#[test]
fn test_amount_below_token_precision_is_conserved_to_one_unit() -> eyre::Result<()> {
    let pools = mixed_snapshot();
    // USDC has 6 decimals, the request carries more
    let result = route(&pools, SwapType::ExactOut, dec!(100.12345678), &SwapOptions::default())?;
    let placed = result.total_path_amount();
    assert!(dec!(100.12345678) - placed < dec!(0.000001));
    assert!(placed <= dec!(100.12345678));
    Ok(())
}

#[test]
fn test_exact_out_buys_back_exact_in_return() -> eyre::Result<()> {
    let pools = mixed_snapshot();
    let exact_in = route(&pools, SwapType::ExactIn, dec!(500), &SwapOptions::default())?;
    let exact_out = route(&pools, SwapType::ExactOut, exact_in.return_amount, &SwapOptions::default())?;
    // buying back what 500 DAI returns never needs much more or less than 500 DAI
    assert!((exact_out.return_amount - dec!(500)).abs() < dec!(0.5), "{}", exact_out.return_amount);
    Ok(())
}

#[test]
fn test_no_route_and_trivial_requests() -> eyre::Result<()> {
    let pools = mixed_snapshot();
    let router = Router::default();
    let options = SwapOptions::default();

    let unknown = router.route(addr(DAI), addr(0x99), SwapType::ExactIn, dec!(1), &pools, &options)?;
    assert!(unknown.is_empty());
    assert_eq!(unknown.return_amount, Decimal::ZERO);

    let same = router.route(addr(DAI), addr(DAI), SwapType::ExactIn, dec!(1), &pools, &options)?;
    assert!(same.is_empty());

    for amount in [Decimal::ZERO, dec!(-1)] {
        let result = route(&pools, SwapType::ExactIn, amount, &options)?;
        assert!(result.is_empty());
        assert_eq!(result.swap_amount, amount);
    }

    assert_eq!(route(&[], SwapType::ExactIn, dec!(1), &options).unwrap_err(), RouterError::EmptyPoolSet);
    Ok(())
}

#[test]
fn test_disabled_and_filtered_tokens() -> eyre::Result<()> {
    let pools = mixed_snapshot();
    let without_hop = SwapOptions::default().with_disabled_token(addr(HOP));
    let result = route(&pools, SwapType::ExactIn, dec!(1000), &without_hop)?;
    assert!(result.swaps.iter().all(|steps| steps.len() == 1));

    let without_out = SwapOptions::default().with_disabled_token(addr(USDC));
    assert!(route(&pools, SwapType::ExactIn, dec!(1000), &without_out)?.is_empty());

    let only_stable = SwapOptions::default().with_filter(PoolFilter::Stable);
    assert!(route(&pools, SwapType::ExactIn, dec!(1000), &only_stable)?.is_empty());
    Ok(())
}

#[test]
fn test_native_input_routes_through_wrapped_token() -> eyre::Result<()> {
    let mut pool = pair_pool(0x31, (HOP, dec!(100), 18), (USDC, dec!(200000), 6));
    pool.tokens[0].address = WETH;
    let pools = vec![pool];
    let router = Router::default();
    let result = router.route(NATIVE, addr(USDC), SwapType::ExactIn, dec!(1), &pools, &SwapOptions::default())?;
    assert_eq!(result.path_count(), 1);
    assert_eq!(result.token_in, NATIVE);
    assert_eq!(result.swaps[0][0].token_in, NATIVE);
    assert!(result.return_amount > dec!(1900));

    let wrapped = router.route(WETH, addr(USDC), SwapType::ExactIn, dec!(1), &pools, &SwapOptions::default())?;
    assert_eq!(wrapped.return_amount, result.return_amount);
    assert_eq!(wrapped.swaps[0][0].token_in, WETH);
    Ok(())
}

fn element_pool(expiry_time: u64) -> Pool {
    Pool {
        id: PoolId::Address(addr(0xe1)),
        address: addr(0xe1),
        swap_fee: dec!(0.1),
        total_shares: dec!(1000),
        tokens: vec![token(HOP, dec!(2000), 18, None), token(DAI, dec!(2500), 18, None)],
        kind: PoolKind::Element {
            expiry_time,
            unit_seconds: 1_000_000_000,
            principal_token: addr(HOP),
            base_token: addr(DAI),
        },
    }
}

#[test]
fn test_element_quotes_decay_to_expiry() -> eyre::Result<()> {
    let expiry = 1_700_000_000;
    let pools = vec![element_pool(expiry)];
    let router = Router::default();
    let quote = |timestamp: u64| {
        let options = SwapOptions::default().with_timestamp(timestamp);
        router.route(addr(DAI), addr(HOP), SwapType::ExactIn, dec!(100), &pools, &options)
    };
    let at_expiry = quote(expiry)?;
    let early = quote(expiry - 100_000_000)?;
    // at expiry principal trades one to one before fees
    assert_eq!(at_expiry.return_amount, dec!(90));
    assert_eq!(at_expiry.market_spot_price, dec!(0.9));
    assert!((early.return_amount - at_expiry.return_amount).abs() > dec!(0.5));

    // a full time unit before expiry the curve is degenerate and the pool is skipped
    assert!(quote(expiry - 1_000_000_000)?.is_empty());
    Ok(())
}

// Main token -> linear pool share -> stable pool holding that share.
fn boosted_snapshot() -> Vec<Pool> {
    let linear = Pool {
        id: PoolId::Address(addr(0x61)),
        address: addr(0x61),
        swap_fee: dec!(0.0001),
        total_shares: dec!(900),
        tokens: vec![
            token(DAI, dec!(500), 18, None),
            PoolToken { address: addr(0x62), balance: dec!(400), decimals: 18, weight: None, price_rate: Some(dec!(1.02)) },
        ],
        kind: PoolKind::Linear { wrapped_index: 1, lower_target: dec!(100), upper_target: dec!(1000) },
    };
    let stable = Pool {
        id: PoolId::Address(addr(0x63)),
        address: addr(0x63),
        swap_fee: dec!(0.0001),
        total_shares: dec!(1800),
        tokens: vec![token(0x61, dec!(900), 18, None), token(USDC, dec!(900), 6, None)],
        kind: PoolKind::Stable { amp: dec!(200) },
    };
    vec![linear, stable]
}

#[test]
fn test_route_through_share_token() -> eyre::Result<()> {
    let pools = boosted_snapshot();
    let exact_in = route(&pools, SwapType::ExactIn, dec!(10), &SwapOptions::default())?;
    assert_eq!(exact_in.path_count(), 1);
    let steps = &exact_in.swaps[0];
    assert_eq!(steps[0].token_out, addr(0x61));
    assert_eq!(steps[1].token_in, addr(0x61));
    assert!(exact_in.return_amount > dec!(9.8) && exact_in.return_amount < dec!(10));

    let exact_out = route(&pools, SwapType::ExactOut, exact_in.return_amount, &SwapOptions::default())?;
    assert!((exact_out.return_amount - dec!(10)).abs() < dec!(0.001), "{}", exact_out.return_amount);
    Ok(())
}

#[test]
fn test_prepared_paths_give_the_same_route() -> eyre::Result<()> {
    let pools = mixed_snapshot();
    let router = Router::default();
    let options = router.default_options();
    let paths = router.prepare_paths(&pools, addr(DAI), addr(USDC), SwapType::ExactIn, &options)?;
    let prepared = router.route_prepared(addr(DAI), addr(USDC), SwapType::ExactIn, dec!(300), &pools, &paths, &options)?;
    let direct = router.route(addr(DAI), addr(USDC), SwapType::ExactIn, dec!(300), &pools, &options)?;
    assert_eq!(prepared, direct);
    Ok(())
}
