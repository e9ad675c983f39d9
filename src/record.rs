// 8.0: output emitter. assembles the per-bucket, per-instrument record.
// total is realized plus unrealized by construction; the decomposition is
// pinned end to end by the property suite.

use crate::ledger::{BucketDelta, PositionState};
use crate::types::{Instrument, Timestamp, Usd};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// Row shape written to the analytics store. downstream reporting consumes it
// read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PnLRecord {
    pub ts: Timestamp,
    pub instrument: Instrument,
    pub amt_signed: Decimal,
    pub cum_amt: Decimal,
    // None while flat: the quantity is undefined, not zero
    pub avg_cost_usd: Option<Decimal>,
    pub realized_usd: Decimal,
    pub cum_realized_usd: Decimal,
    pub unrealized_usd: Decimal,
    pub total_usd: Decimal,
    pub volume_usd: Decimal,
    pub cum_volume_usd: Decimal,
    pub num_deals: u32,
}

pub fn emit(
    ts: Timestamp,
    instrument: &Instrument,
    state: &PositionState,
    delta: &BucketDelta,
    unrealized: Usd,
) -> PnLRecord {
    let total = state.cum_realized_usd.add(unrealized);

    PnLRecord {
        ts,
        instrument: instrument.clone(),
        amt_signed: delta.net_amt,
        cum_amt: state.cum_amt.value(),
        avg_cost_usd: state.avg_cost_usd(),
        realized_usd: delta.realized_usd.value(),
        cum_realized_usd: state.cum_realized_usd.value(),
        unrealized_usd: unrealized.value(),
        total_usd: total.value(),
        volume_usd: delta.volume_usd.value(),
        cum_volume_usd: state.cum_volume_usd.value(),
        num_deals: delta.num_deals,
    }
}
