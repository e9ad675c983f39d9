// 2.0: fill aggregator. buckets raw executions into fixed windows with
// per-side volume-weighted prices. a bad row is dropped, never the batch.

use crate::types::{Instrument, Price, Side, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

// Raw execution row from the upstream deals store. amount/price are
// unvalidated here; the aggregator rejects non-positive values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub time: Timestamp,
    pub instrument: Instrument,
    pub side: Side,
    pub amount: Decimal,
    pub price: Decimal,
}

// 2.1: one bucket's worth of executions, collapsed per side.
// a one-sided bucket leaves the other side's vwap as None; it must not be
// folded into any downstream average.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketFill {
    pub bucket: Timestamp,
    pub buy_amt: Decimal,
    pub buy_vwap: Option<Price>,
    pub sell_amt: Decimal,
    pub sell_vwap: Option<Price>,
    pub num_deals: u32,
}

impl BucketFill {
    fn empty(bucket: Timestamp) -> Self {
        Self {
            bucket,
            buy_amt: Decimal::ZERO,
            buy_vwap: None,
            sell_amt: Decimal::ZERO,
            sell_vwap: None,
            num_deals: 0,
        }
    }

    pub fn net_amt(&self) -> Decimal {
        self.buy_amt - self.sell_amt
    }

    pub fn matched_amt(&self) -> Decimal {
        self.buy_amt.min(self.sell_amt)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Aggregated {
    pub buckets: BTreeMap<i64, BucketFill>,
    // count of rows rejected as malformed
    pub rejected: usize,
}

// running vwap accumulator per side
#[derive(Debug, Default)]
struct SideAcc {
    amt: Decimal,
    notional: Decimal,
    count: u32,
}

impl SideAcc {
    fn push(&mut self, amount: Decimal, price: Decimal) {
        self.amt += amount;
        self.notional += amount * price;
        self.count += 1;
    }

    fn vwap(&self) -> Option<Price> {
        if self.amt > Decimal::ZERO {
            Price::new(self.notional / self.amt)
        } else {
            None
        }
    }
}

// 2.2: the aggregation fold. equivalent of the upstream 1m SAMPLE BY per side.
pub fn aggregate(fills: &[Fill], bucket_width_ms: i64) -> Aggregated {
    let mut acc: BTreeMap<i64, (SideAcc, SideAcc)> = BTreeMap::new();
    let mut rejected = 0usize;

    for fill in fills {
        if fill.amount <= Decimal::ZERO || fill.price <= Decimal::ZERO {
            warn!(
                instrument = %fill.instrument,
                time = fill.time.as_millis(),
                amount = %fill.amount,
                price = %fill.price,
                "rejecting malformed fill"
            );
            rejected += 1;
            continue;
        }

        let bucket = fill.time.bucket(bucket_width_ms).as_millis();
        let (buys, sells) = acc.entry(bucket).or_default();
        match fill.side {
            Side::Buy => buys.push(fill.amount, fill.price),
            Side::Sell => sells.push(fill.amount, fill.price),
        }
    }

    let buckets = acc
        .into_iter()
        .map(|(bucket, (buys, sells))| {
            let mut bf = BucketFill::empty(Timestamp::from_millis(bucket));
            bf.buy_amt = buys.amt;
            bf.buy_vwap = buys.vwap();
            bf.sell_amt = sells.amt;
            bf.sell_vwap = sells.vwap();
            bf.num_deals = buys.count + sells.count;
            (bucket, bf)
        })
        .collect();

    Aggregated { buckets, rejected }
}
