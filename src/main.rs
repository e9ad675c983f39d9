//! Position & PnL Accounting Simulation.
//!
//! Drives the accounting engine through representative windows: single
//! currency round trips, foreign-currency conversion, quote gaps, and
//! checkpointed multi-window continuation.

use pnl_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("Position & PnL Accounting Engine Simulation");
    println!(
        "Fixed 1-Minute Buckets, USD Settlement (run started at t={})\n",
        Timestamp::now()
    );

    scenario_1_round_trip();
    scenario_2_foreign_currency();
    scenario_3_reduce_and_flip();
    scenario_4_quote_gaps();
    scenario_5_checkpointed_windows();
    scenario_6_parallel_batch();

    println!("\nAll simulations completed successfully.");
}

const MINUTE: i64 = 60_000;

fn fill(ms: i64, instrument: &str, side: Side, amount: Decimal, price: Decimal) -> Fill {
    Fill {
        time: Timestamp::from_millis(ms),
        instrument: instrument.into(),
        side,
        amount,
        price,
    }
}

fn quote(ms: i64, instrument: &str, bid: Decimal, ask: Decimal) -> MarketQuote {
    MarketQuote {
        time: Timestamp::from_millis(ms),
        instrument: instrument.into(),
        bid: Price::new_unchecked(bid),
        ask: Price::new_unchecked(ask),
    }
}

fn print_records(records: &[PnLRecord]) {
    for r in records {
        println!(
            "  t={:>7} amt={:>6} pos={:>6} realized={:>8} unrealized={:>8} total={:>8}",
            r.ts, r.amt_signed, r.cum_amt, r.realized_usd, r.unrealized_usd, r.total_usd
        );
    }
}

/// Buy, hold through a re-mark, then sell everything.
fn scenario_1_round_trip() {
    println!("Scenario 1: Round Trip on a USD Instrument\n");

    let engine = Engine::new(EngineConfig::default(), ConversionMap::new());
    let fills = vec![
        fill(5_000, "BTCUSD", Side::Buy, dec!(2), dec!(50000)),
        fill(2 * MINUTE, "BTCUSD", Side::Sell, dec!(2), dec!(50500)),
    ];
    let board = QuoteBoard::from_quotes(
        &[
            quote(0, "BTCUSD", dec!(50000), dec!(50010)),
            quote(MINUTE, "BTCUSD", dec!(50200), dec!(50210)),
            quote(2 * MINUTE, "BTCUSD", dec!(50500), dec!(50510)),
        ],
        MINUTE,
    );

    let run = engine
        .run_instrument(&"BTCUSD".into(), &fills, &board, None)
        .unwrap();

    println!("  Buy 2 BTC @ 50,000, sell 2 BTC @ 50,500 two minutes later");
    print_records(&run.records);
    let checkpoint = run.checkpoint.unwrap();
    println!("  Final position flat: {}\n", checkpoint.state.is_flat());
}

/// EUR- and GBP-quoted instruments converted through their rate pairs.
fn scenario_2_foreign_currency() {
    println!("Scenario 2: Foreign Currency Conversion\n");

    let conversion = ConversionMap::from_rows(vec![
        ConversionRow {
            instrument: "ETHEUR".into(),
            usd_instrument: Some("EURUSD".into()),
            inverted: false,
            base_instrument: None,
            quote_instrument: None,
        },
        ConversionRow {
            instrument: "ADAGBP".into(),
            usd_instrument: Some("USDGBP".into()),
            inverted: true,
            base_instrument: None,
            quote_instrument: None,
        },
    ]);
    let engine = Engine::new(EngineConfig::default(), conversion);

    let board = QuoteBoard::from_quotes(
        &[
            quote(0, "ETHEUR", dec!(3000), dec!(3002)),
            quote(0, "EURUSD", dec!(1.10), dec!(1.11)),
            quote(0, "ADAGBP", dec!(0.50), dec!(0.52)),
            quote(0, "USDGBP", dec!(0.80), dec!(0.81)),
        ],
        MINUTE,
    );

    let eth = engine
        .run_instrument(
            &"ETHEUR".into(),
            &[fill(0, "ETHEUR", Side::Buy, dec!(1), dec!(3000))],
            &board,
            None,
        )
        .unwrap();
    let ada = engine
        .run_instrument(
            &"ADAGBP".into(),
            &[fill(0, "ADAGBP", Side::Sell, dec!(1000), dec!(0.51))],
            &board,
            None,
        )
        .unwrap();

    println!("  Long 1 ETHEUR via EURUSD (direct):");
    print_records(&eth.records);
    println!("  Short 1000 ADAGBP via USDGBP (inverted):");
    print_records(&ada.records);
    println!();
}

/// Reduction keeps the average cost; a flip re-bases it.
fn scenario_3_reduce_and_flip() {
    println!("Scenario 3: Reduce, Then Flip\n");

    let engine = Engine::new(EngineConfig::default(), ConversionMap::new());
    let fills = vec![
        fill(0, "SOLUSD", Side::Buy, dec!(10), dec!(100)),
        fill(MINUTE, "SOLUSD", Side::Sell, dec!(4), dec!(105)),
        fill(2 * MINUTE, "SOLUSD", Side::Sell, dec!(11), dec!(110)),
    ];
    let board = QuoteBoard::from_quotes(
        &[
            quote(0, "SOLUSD", dec!(100), dec!(101)),
            quote(MINUTE, "SOLUSD", dec!(105), dec!(106)),
            quote(2 * MINUTE, "SOLUSD", dec!(110), dec!(111)),
        ],
        MINUTE,
    );

    let run = engine
        .run_instrument(&"SOLUSD".into(), &fills, &board, None)
        .unwrap();

    println!("  +10 @ 100, -4 @ 105 (reduce), -11 @ 110 (flip short 5)");
    print_records(&run.records);
    let final_state = run.checkpoint.unwrap().state;
    println!(
        "  Final position: {} @ avg {}\n",
        final_state.cum_amt,
        final_state.avg_cost_usd().unwrap_or(Decimal::ZERO)
    );
}

/// Carry-forward across quote gaps, and a deferred fill-free bucket.
fn scenario_4_quote_gaps() {
    println!("Scenario 4: Quote Gaps and Carry-Forward\n");

    let conversion = ConversionMap::from_rows(vec![ConversionRow {
        instrument: "ETHEUR".into(),
        usd_instrument: Some("EURUSD".into()),
        inverted: false,
        base_instrument: None,
        quote_instrument: None,
    }]);
    let engine = Engine::new(EngineConfig::default(), conversion);

    // EURUSD only quotes in the first bucket; later buckets carry it forward
    let board = QuoteBoard::from_quotes(
        &[
            quote(0, "ETHEUR", dec!(3000), dec!(3002)),
            quote(0, "EURUSD", dec!(1.10), dec!(1.11)),
            quote(3 * MINUTE, "ETHEUR", dec!(3050), dec!(3052)),
        ],
        MINUTE,
    );

    let run = engine
        .run_instrument(
            &"ETHEUR".into(),
            &[fill(0, "ETHEUR", Side::Buy, dec!(2), dec!(3000))],
            &board,
            None,
        )
        .unwrap();

    println!("  EURUSD quoted once, ETHEUR re-quoted three minutes later");
    print_records(&run.records);
    println!("  Deferred buckets: {}\n", run.deferred_buckets);
}

/// Second window seeded from the first window's checkpoint.
fn scenario_5_checkpointed_windows() {
    println!("Scenario 5: Checkpointed Windows\n");

    let engine = Engine::new(EngineConfig::default(), ConversionMap::new());
    let store = InMemoryCheckpointStore::new();

    // window 1: open the position
    let board1 = QuoteBoard::from_quotes(&[quote(0, "BTCUSD", dec!(100), dec!(101))], MINUTE);
    let windows1 = vec![InstrumentWindow {
        instrument: "BTCUSD".into(),
        fills: vec![fill(0, "BTCUSD", Side::Buy, dec!(1), dec!(100))],
    }];
    let outcomes1 = engine.run_batch(&windows1, &board1, &store);
    println!("  Window 1 ok: {}", outcomes1[0].is_ok());

    // window 2: close it, seeded from the stored checkpoint
    let board2 = QuoteBoard::from_quotes(
        &[quote(10 * MINUTE, "BTCUSD", dec!(108), dec!(109))],
        MINUTE,
    );
    let windows2 = vec![InstrumentWindow {
        instrument: "BTCUSD".into(),
        fills: vec![fill(10 * MINUTE, "BTCUSD", Side::Sell, dec!(1), dec!(108))],
    }];
    let outcomes2 = engine.run_batch(&windows2, &board2, &store);

    if let Ok(run) = &outcomes2[0].result {
        print_records(&run.records);
        if let Some(checkpoint) = &run.checkpoint {
            println!(
                "  Cumulative realized after both windows: {}\n",
                checkpoint.state.cum_realized_usd
            );
        }
    }
}

/// Instruments run in parallel; one bad instrument does not poison the rest.
fn scenario_6_parallel_batch() {
    println!("Scenario 6: Parallel Batch With an Isolated Failure\n");

    let conversion = ConversionMap::from_rows(vec![ConversionRow {
        instrument: "ETHEUR".into(),
        usd_instrument: Some("EURUSD".into()),
        inverted: false,
        base_instrument: None,
        quote_instrument: None,
    }]);
    let engine = Engine::new(EngineConfig::default(), conversion);
    let store = InMemoryCheckpointStore::new();

    let windows = vec![
        InstrumentWindow {
            instrument: "BTCUSD".into(),
            fills: vec![fill(0, "BTCUSD", Side::Buy, dec!(1), dec!(50000))],
        },
        InstrumentWindow {
            instrument: "SOLUSD".into(),
            fills: vec![fill(0, "SOLUSD", Side::Sell, dec!(100), dec!(150))],
        },
        InstrumentWindow {
            // no EURUSD quotes anywhere: this instrument aborts
            instrument: "ETHEUR".into(),
            fills: vec![fill(0, "ETHEUR", Side::Buy, dec!(1), dec!(3000))],
        },
    ];
    let board = QuoteBoard::from_quotes(
        &[
            quote(0, "BTCUSD", dec!(50000), dec!(50010)),
            quote(0, "SOLUSD", dec!(150), dec!(151)),
            quote(0, "ETHEUR", dec!(3000), dec!(3002)),
        ],
        MINUTE,
    );

    let outcomes = engine.run_batch(&windows, &board, &store);
    for outcome in &outcomes {
        match &outcome.result {
            Ok(run) => println!(
                "  {}: {} records, checkpoint committed",
                outcome.instrument,
                run.records.len()
            ),
            Err(err) => println!("  {}: aborted ({err})", outcome.instrument),
        }
    }
    println!("  Checkpoints persisted: {}", store.len());
}
