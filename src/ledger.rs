// 6.0: position ledger. per-instrument sequential fold over buckets, each
// step strictly depending on the previous. seeded from the prior run's
// checkpoint, never implicitly from zero.
//
// cost basis follows the average-cost method: increases accrue at the fill
// price, reductions release cost at the previous average (average cost is
// unchanged by a reduction), a flip re-bases at the flipping side's price.

use crate::fill::BucketFill;
use crate::quote::RateView;
use crate::realization::{
    classify, intrabucket_matched_usd, realized_on_transition, PositionTransition,
};
use crate::types::{SignedAmount, Usd};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// 6.1: everything that must survive from one bucket (and one run) to the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionState {
    pub cum_amt: SignedAmount,
    pub cum_cost_usd: Decimal,
    pub cum_cost_native: Decimal,
    pub cum_realized_usd: Usd,
    pub cum_volume_usd: Usd,
    pub cum_deals: u64,
}

impl Default for PositionState {
    fn default() -> Self {
        Self::flat()
    }
}

impl PositionState {
    pub fn flat() -> Self {
        Self {
            cum_amt: SignedAmount::zero(),
            cum_cost_usd: Decimal::ZERO,
            cum_cost_native: Decimal::ZERO,
            cum_realized_usd: Usd::zero(),
            cum_volume_usd: Usd::zero(),
            cum_deals: 0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.cum_amt.is_zero()
    }

    // undefined on a flat position: never a division by zero
    pub fn avg_cost_usd(&self) -> Option<Decimal> {
        if self.is_flat() {
            None
        } else {
            Some(self.cum_cost_usd / self.cum_amt.value())
        }
    }

    pub fn avg_cost_native(&self) -> Option<Decimal> {
        if self.is_flat() {
            None
        } else {
            Some(self.cum_cost_native / self.cum_amt.value())
        }
    }
}

// What one fold step produced, alongside the new state.
#[derive(Debug, Clone)]
pub struct BucketDelta {
    pub transition: PositionTransition,
    pub net_amt: Decimal,
    pub realized_usd: Usd,
    pub volume_usd: Usd,
    pub num_deals: u32,
}

// per-side fill prices for one bucket, pre-converted
#[derive(Debug, Clone, Copy, Default)]
struct SidePx {
    buy_usd: Option<Decimal>,
    sell_usd: Option<Decimal>,
    buy_native: Option<Decimal>,
    sell_native: Option<Decimal>,
}

impl SidePx {
    fn from_fill(fill: &BucketFill, rate: &RateView) -> Self {
        Self {
            buy_usd: fill.buy_vwap.map(|p| rate.buy_to_usd(p.value())),
            sell_usd: fill.sell_vwap.map(|p| rate.sell_to_usd(p.value())),
            buy_native: fill.buy_vwap.map(|p| p.value()),
            sell_native: fill.sell_vwap.map(|p| p.value()),
        }
    }

    // price for flow in the given direction; the side is guaranteed present
    // whenever the flow is non-zero (a net buy implies buy fills)
    fn for_flow(&self, flow: Decimal, usd: bool) -> Decimal {
        let px = if flow > Decimal::ZERO {
            if usd {
                self.buy_usd
            } else {
                self.buy_native
            }
        } else if usd {
            self.sell_usd
        } else {
            self.sell_native
        };
        debug_assert!(flow.is_zero() || px.is_some(), "flow without a priced side");
        px.unwrap_or(Decimal::ZERO)
    }
}

// 6.2: one fold step.
//
// mark_usd is the instrument's (bid_usd, ask_usd) for the bucket when
// resolvable; realization falls back to the reducing side's own fill price
// otherwise (the actual closing price), so a live reduction is never blocked
// on a stale valuation quote.
pub fn apply_bucket(
    prev: &PositionState,
    fill: Option<&BucketFill>,
    rate: &RateView,
    mark_usd: Option<(Decimal, Decimal)>,
) -> (PositionState, BucketDelta) {
    let (net, matched, side_px, volume_native, num_deals) = match fill {
        Some(f) => (
            f.net_amt(),
            intrabucket_matched_usd(f, rate),
            SidePx::from_fill(f, rate),
            f.buy_amt * f.buy_vwap.map(|p| p.value()).unwrap_or(Decimal::ZERO)
                + f.sell_amt * f.sell_vwap.map(|p| p.value()).unwrap_or(Decimal::ZERO),
            f.num_deals,
        ),
        None => (
            Decimal::ZERO,
            Usd::zero(),
            SidePx::default(),
            Decimal::ZERO,
            0,
        ),
    };

    let curr_amt = prev.cum_amt.add(net);
    let transition = classify(prev.cum_amt, curr_amt);

    // conservative close-out for the previous position, or the reducing
    // side's fill price when no quote resolves. only reductions and
    // closes/flips ever read the mark.
    let needs_mark = matches!(
        transition,
        PositionTransition::Reduced | PositionTransition::ClosedOrFlipped
    );
    let mark_px_usd = match (mark_usd, needs_mark) {
        (Some((bid, ask)), _) => {
            if prev.cum_amt.is_long() {
                bid
            } else {
                ask
            }
        }
        (None, false) => Decimal::ZERO,
        // a long reduces by selling, a short by buying
        (None, true) => side_px.for_flow(
            if prev.cum_amt.is_long() {
                -Decimal::ONE
            } else {
                Decimal::ONE
            },
            true,
        ),
    };

    let realized = intrabucket_plus_transition(
        matched,
        transition,
        prev,
        curr_amt,
        mark_px_usd,
    );

    // 6.3: cost-basis recurrence, USD and native legs in lockstep
    let (cum_cost_usd, cum_cost_native) = match transition {
        PositionTransition::Opened => (
            curr_amt.value() * side_px.for_flow(curr_amt.value(), true),
            curr_amt.value() * side_px.for_flow(curr_amt.value(), false),
        ),
        PositionTransition::Increased => (
            prev.cum_cost_usd + net * side_px.for_flow(net, true),
            prev.cum_cost_native + net * side_px.for_flow(net, false),
        ),
        PositionTransition::Reduced => (
            prev.cum_cost_usd + net * prev.avg_cost_usd().unwrap_or(Decimal::ZERO),
            prev.cum_cost_native + net * prev.avg_cost_native().unwrap_or(Decimal::ZERO),
        ),
        PositionTransition::ClosedOrFlipped => {
            if curr_amt.is_zero() {
                (Decimal::ZERO, Decimal::ZERO)
            } else {
                (
                    curr_amt.value() * side_px.for_flow(curr_amt.value(), true),
                    curr_amt.value() * side_px.for_flow(curr_amt.value(), false),
                )
            }
        }
    };

    let volume_usd = Usd::new(rate.mid_to_usd(volume_native));

    let state = PositionState {
        cum_amt: curr_amt,
        cum_cost_usd,
        cum_cost_native,
        cum_realized_usd: prev.cum_realized_usd.add(realized),
        cum_volume_usd: prev.cum_volume_usd.add(volume_usd),
        cum_deals: prev.cum_deals + num_deals as u64,
    };

    let delta = BucketDelta {
        transition,
        net_amt: net,
        realized_usd: realized,
        volume_usd,
        num_deals,
    };

    (state, delta)
}

fn intrabucket_plus_transition(
    matched: Usd,
    transition: PositionTransition,
    prev: &PositionState,
    curr_amt: SignedAmount,
    mark_px_usd: Decimal,
) -> Usd {
    let on_transition = realized_on_transition(
        transition,
        prev.cum_amt,
        curr_amt,
        prev.avg_cost_usd(),
        mark_px_usd,
    );
    matched.add(on_transition)
}
