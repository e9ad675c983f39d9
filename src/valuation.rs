// 7.0: mark-to-market valuator. the open position marked at the price it
// could actually be closed: bid for longs, ask for shorts, never mid.

use crate::ledger::PositionState;
use crate::quote::ResolvedQuote;
use crate::types::Usd;

// flat position values to exactly zero, with no division on the way
pub fn unrealized_usd(state: &PositionState, quote: &ResolvedQuote) -> Usd {
    let avg = match state.avg_cost_usd() {
        Some(avg) => avg,
        None => return Usd::zero(),
    };

    let mark = if state.cum_amt.is_long() {
        quote.bid_usd
    } else {
        quote.ask_usd
    };

    Usd::new(state.cum_amt.value() * (mark - avg))
}
