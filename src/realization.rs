// 5.0: realization engine. one tagged transition per (instrument, bucket),
// dispatched by exhaustive match. realized pnl is only ever recognized
// against the portion of the position that shrinks, closes or flips.

use crate::fill::BucketFill;
use crate::quote::RateView;
use crate::types::{SignedAmount, Usd};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// 5.1: how the bucket moved the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionTransition {
    // previous position flat (or first-ever bucket)
    Opened,
    // same sign, |curr| >= |prev|. covers unchanged buckets too
    Increased,
    // same sign, |curr| < |prev|
    Reduced,
    // curr flat, or sign changed
    ClosedOrFlipped,
}

// 5.2: classification. exactly one arm matches, so the overlapping-mask bugs
// of boolean-select pipelines cannot occur.
pub fn classify(prev: SignedAmount, curr: SignedAmount) -> PositionTransition {
    if prev.is_zero() {
        PositionTransition::Opened
    } else if curr.is_zero() || !prev.same_sign(curr) {
        PositionTransition::ClosedOrFlipped
    } else if curr.abs() < prev.abs() {
        PositionTransition::Reduced
    } else {
        PositionTransition::Increased
    }
}

// 5.3: matched pnl inside a single bucket: both sides present, the overlap
// is bought and sold within the window. prices already in USD.
pub fn intrabucket_matched_usd(fill: &BucketFill, rate: &RateView) -> Usd {
    match (fill.buy_vwap, fill.sell_vwap) {
        (Some(buy), Some(sell)) => {
            let matched = fill.matched_amt();
            // the spread is captured in the native quote currency, then
            // converted on the conservative side
            let native = (sell.value() - buy.value()) * matched;
            Usd::new(rate.signed_to_usd(native))
        }
        _ => Usd::zero(),
    }
}

// 5.4: realization against the shrinking part of the position.
// avg_cost_usd is the previous bucket's cost basis per unit; mark_px_usd is
// the conservative close-out price for the previous position's side.
// returns only the transition component; intrabucket matched pnl is added by
// the caller so the two sources stay separately auditable.
pub fn realized_on_transition(
    transition: PositionTransition,
    prev_amt: SignedAmount,
    curr_amt: SignedAmount,
    avg_cost_usd: Option<Decimal>,
    mark_px_usd: Decimal,
) -> Usd {
    match transition {
        PositionTransition::Opened | PositionTransition::Increased => Usd::zero(),
        PositionTransition::ClosedOrFlipped => {
            // realize the entire previous position
            match avg_cost_usd {
                Some(avg) => Usd::new(prev_amt.value() * (mark_px_usd - avg)),
                None => Usd::zero(),
            }
        }
        PositionTransition::Reduced => match avg_cost_usd {
            Some(avg) => {
                let closed = prev_amt.value() - curr_amt.value();
                Usd::new(closed * (mark_px_usd - avg))
            }
            None => Usd::zero(),
        },
    }
}
