// Property-based tests over randomized fill streams. these pin the
// structural invariants of the fold: exact amount recurrence, the
// realized/unrealized decomposition, determinism, and checkpoint splitting.

use pnl_core::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const MINUTE: i64 = 60_000;

fn fill_at(minute: i64, side: Side, amount: Decimal, price: Decimal) -> Fill {
    Fill {
        time: Timestamp::from_millis(minute * MINUTE + 1_000),
        instrument: "BTCUSD".into(),
        side,
        amount,
        price,
    }
}

fn quote_at(minute: i64, bid: Decimal, ask: Decimal) -> MarketQuote {
    MarketQuote {
        time: Timestamp::from_millis(minute * MINUTE),
        instrument: "BTCUSD".into(),
        bid: Price::new_unchecked(bid),
        ask: Price::new_unchecked(ask),
    }
}

// small positive decimals with two fractional digits
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000).prop_map(|v| Decimal::new(v, 2))
}

fn price_strategy() -> impl Strategy<Value = Decimal> {
    (50_00i64..500_00).prop_map(|v| Decimal::new(v, 2))
}

// one fill per minute bucket, random side/amount/price
fn fills_strategy(max_len: usize) -> impl Strategy<Value = Vec<Fill>> {
    prop::collection::vec((any::<bool>(), amount_strategy(), price_strategy()), 1..max_len)
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (is_buy, amount, price))| {
                    let side = if is_buy { Side::Buy } else { Side::Sell };
                    fill_at(i as i64, side, amount, price)
                })
                .collect()
        })
}

fn run(fills: &[Fill]) -> InstrumentRun {
    let engine = Engine::new(EngineConfig::default(), ConversionMap::new());
    let board = QuoteBoard::from_quotes(&[quote_at(0, dec!(100), dec!(101))], MINUTE);
    engine
        .run_instrument(&"BTCUSD".into(), fills, &board, None)
        .unwrap()
}

proptest! {
    // cum_amt is exactly the running net of accepted fills, no drift
    #[test]
    fn amount_recurrence_is_exact(fills in fills_strategy(20)) {
        let result = run(&fills);

        let expected: Decimal = fills
            .iter()
            .map(|f| f.side.sign() * f.amount)
            .sum();
        let checkpoint = result.checkpoint.as_ref().unwrap();
        prop_assert_eq!(checkpoint.state.cum_amt.value(), expected);

        // per-record recurrence too
        let mut prev = Decimal::ZERO;
        for record in &result.records {
            prop_assert_eq!(record.cum_amt, prev + record.amt_signed);
            prev = record.cum_amt;
        }
    }

    // every record decomposes total into cumulative realized + unrealized
    #[test]
    fn total_decomposes_exactly(fills in fills_strategy(20)) {
        for record in run(&fills).records {
            prop_assert_eq!(
                record.total_usd,
                record.cum_realized_usd + record.unrealized_usd
            );
        }
    }

    // a position taken and fully closed realizes everything: no pnl is lost
    // in the unrealized leg once flat
    #[test]
    fn flat_position_has_zero_unrealized(fills in fills_strategy(20)) {
        let result = run(&fills);
        for record in &result.records {
            if record.cum_amt.is_zero() {
                prop_assert_eq!(record.unrealized_usd, Decimal::ZERO);
                prop_assert!(record.avg_cost_usd.is_none());
            }
        }
    }

    // same inputs, same outputs, independent of the run
    #[test]
    fn runs_are_deterministic(fills in fills_strategy(15)) {
        let a = run(&fills);
        let b = run(&fills);
        prop_assert_eq!(a.records, b.records);
        prop_assert_eq!(a.checkpoint, b.checkpoint);
    }

    // splitting a window at any bucket boundary and seeding the second half
    // from the first half's checkpoint reproduces the unbroken run
    #[test]
    fn checkpoint_split_equals_unbroken_run(
        fills in fills_strategy(16),
        split_frac in 0.0f64..1.0,
    ) {
        // split at a bucket boundary, keeping at least one fill in the head
        // so the tail starts strictly after the head's checkpoint
        let split = 1 + (((fills.len() - 1) as f64) * split_frac) as usize;
        let (head, tail) = fills.split_at(split.min(fills.len()));

        let whole = run(&fills);
        let first = run(head);
        let engine = Engine::new(EngineConfig::default(), ConversionMap::new());
        let board = QuoteBoard::from_quotes(&[quote_at(0, dec!(100), dec!(101))], MINUTE);
        let second = engine
            .run_instrument(&"BTCUSD".into(), tail, &board, first.checkpoint)
            .unwrap();

        prop_assert_eq!(
            second.checkpoint.unwrap().state,
            whole.checkpoint.unwrap().state
        );
    }

    // classification agrees with the arithmetic it summarizes
    #[test]
    fn transition_matches_amounts(
        prev in -10_000i64..10_000,
        delta in -10_000i64..10_000,
    ) {
        let prev = SignedAmount::new(Decimal::new(prev, 2));
        let curr = prev.add(Decimal::new(delta, 2));

        match classify(prev, curr) {
            PositionTransition::Opened => prop_assert!(prev.is_zero()),
            PositionTransition::ClosedOrFlipped => {
                prop_assert!(!prev.is_zero());
                prop_assert!(curr.is_zero() || !prev.same_sign(curr));
            }
            PositionTransition::Reduced => {
                prop_assert!(prev.same_sign(curr));
                prop_assert!(curr.abs() < prev.abs());
            }
            PositionTransition::Increased => {
                prop_assert!(!prev.is_zero());
                prop_assert!(prev.same_sign(curr));
                prop_assert!(curr.abs() >= prev.abs());
            }
        }
    }

    // a direct rate r and an inverted rate 1/r describe the same market;
    // conversion through either agrees within decimal division precision
    #[test]
    fn inverted_rate_mirrors_direct(
        native in 1i64..1_000_000,
        rate in 20i64..500,
    ) {
        let native = Decimal::new(native, 2);
        let rate = Decimal::new(rate, 2);

        let direct = RateView { bid: rate, ask: rate, inverted: false };
        let reciprocal = RateView {
            bid: Decimal::ONE / rate,
            ask: Decimal::ONE / rate,
            inverted: true,
        };

        let diff = (direct.buy_to_usd(native) - reciprocal.buy_to_usd(native)).abs();
        prop_assert!(diff <= dec!(0.0001) * native.max(Decimal::ONE));
    }

    // converting a signed native value never lands outside the bid/ask band
    #[test]
    fn signed_conversion_is_conservative(
        native in -100_000i64..100_000,
        bid in 50i64..150,
        spread in 0i64..10,
    ) {
        let native = Decimal::new(native, 2);
        let rate = RateView {
            bid: Decimal::new(bid, 2),
            ask: Decimal::new(bid + spread, 2),
            inverted: false,
        };

        let signed = rate.signed_to_usd(native);
        let lo = (native * rate.bid).min(native * rate.ask);
        let hi = (native * rate.bid).max(native * rate.ask);
        prop_assert!(signed >= lo && signed <= hi);
        // positive value converts low, negative converts high (in magnitude)
        if native > Decimal::ZERO {
            prop_assert_eq!(signed, native * rate.bid);
        } else {
            prop_assert_eq!(signed, native * rate.ask);
        }
    }
}
