// 10.2: the per-instrument fold and the batch runner.
//
// one instrument is one strictly ordered fold over the union of its fill
// buckets and quote buckets. instruments are independent, so the batch runs
// them in parallel; a failure aborts its own instrument and nothing else.
//
// missing-data policy, in order of severity:
//   - no conversion rate and the bucket has fills: abort the instrument run
//     (the fills cannot be priced, and every later figure depends on them)
//   - no conversion rate and no fills: skip the bucket (deferred)
//   - rate fine but no instrument quote: the position still moves; the
//     record is emitted only if the position ends flat, otherwise deferred

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::conversion::ConversionMap;
use crate::fill::{self, Fill};
use crate::ledger::{apply_bucket, PositionState};
use crate::quote::QuoteBoard;
use crate::record::{emit, PnLRecord};
use crate::types::{Instrument, Timestamp, Usd};
use crate::valuation::unrealized_usd;
use rayon::prelude::*;
use std::collections::BTreeSet;
use tracing::{debug, warn};

use super::config::EngineConfig;
use super::results::{EngineError, InstrumentOutcome, InstrumentRun};

// One instrument's slice of the processing window.
#[derive(Debug, Clone)]
pub struct InstrumentWindow {
    pub instrument: Instrument,
    pub fills: Vec<Fill>,
}

#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    conversion: ConversionMap,
}

impl Engine {
    pub fn new(config: EngineConfig, conversion: ConversionMap) -> Self {
        Self { config, conversion }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // 10.2.1: one instrument, start to finish. pure given its inputs; the
    // checkpoint in the result is NOT persisted here.
    pub fn run_instrument(
        &self,
        instrument: &Instrument,
        fills: &[Fill],
        board: &QuoteBoard,
        seed: Option<Checkpoint>,
    ) -> Result<InstrumentRun, EngineError> {
        if self.config.fail_on_unmapped && !self.conversion.is_mapped(instrument) {
            return Err(EngineError::UnmappedConversion(instrument.clone()));
        }
        let descriptor = self.conversion.resolve(instrument);

        let agg = fill::aggregate(fills, self.config.bucket_width_ms);

        // fold axis: every bucket with fills, plus every bucket with a fresh
        // quote (so a fill-free position is still re-marked as prices move)
        let seed_ts = seed.as_ref().map(|cp| cp.ts.as_millis());
        let axis: BTreeSet<i64> = agg
            .buckets
            .keys()
            .copied()
            .chain(board.buckets(instrument))
            .filter(|b| seed_ts.map_or(true, |ts| *b > ts))
            .collect();

        let mut state = seed
            .as_ref()
            .map(|cp| cp.state.clone())
            .unwrap_or_else(PositionState::flat);
        let mut last_ts: Option<Timestamp> = None;
        let mut records: Vec<PnLRecord> = Vec::with_capacity(axis.len());
        let mut deferred = 0usize;

        for bucket in axis {
            let ts = Timestamp::from_millis(bucket);
            let bucket_fill = agg.buckets.get(&bucket);

            let rate = match board.resolve_rate(&descriptor, ts) {
                Ok(rate) => rate,
                Err(err) => {
                    if bucket_fill.is_some() {
                        // fills that cannot be priced poison everything after
                        return Err(err.into());
                    }
                    warn!(%instrument, bucket, "no conversion rate, deferring fill-free bucket");
                    deferred += 1;
                    continue;
                }
            };

            let usd_quote = board.resolve_usd(instrument, &descriptor, ts).ok();
            let mark = usd_quote.as_ref().map(|q| (q.bid_usd, q.ask_usd));

            let (next, delta) = apply_bucket(&state, bucket_fill, &rate, mark);
            state = next;
            last_ts = Some(ts);

            match usd_quote {
                Some(quote) => {
                    records.push(emit(
                        ts,
                        instrument,
                        &state,
                        &delta,
                        unrealized_usd(&state, &quote),
                    ));
                }
                // flat carries nothing to mark: the record is exact anyway
                None if state.is_flat() => {
                    records.push(emit(ts, instrument, &state, &delta, Usd::zero()));
                }
                None => {
                    warn!(%instrument, bucket, "open position with no USD mark, deferring record");
                    deferred += 1;
                }
            }
        }

        debug!(
            %instrument,
            records = records.len(),
            deferred,
            rejected = agg.rejected,
            "instrument run complete"
        );

        // a run that touched nothing and had no seed leaves no checkpoint:
        // a manufactured timestamp would filter a later window's earliest
        // buckets out of the fold
        let checkpoint = match (last_ts, seed) {
            (Some(ts), _) => Some(Checkpoint { ts, state }),
            (None, carried) => carried,
        };

        Ok(InstrumentRun {
            instrument: instrument.clone(),
            records,
            checkpoint,
            rejected_fills: agg.rejected,
            deferred_buckets: deferred,
        })
    }

    // 10.2.2: the batch. checkpoint load is fail-closed: a store error is an
    // instrument failure, never a silent flat seed. the checkpoint is
    // persisted only after the run succeeds, so a crashed run replays
    // cleanly from the previous one.
    pub fn run_batch(
        &self,
        windows: &[InstrumentWindow],
        board: &QuoteBoard,
        store: &dyn CheckpointStore,
    ) -> Vec<InstrumentOutcome> {
        windows
            .par_iter()
            .map(|window| {
                let result = store
                    .load(&window.instrument)
                    .map_err(EngineError::from)
                    .and_then(|seed| {
                        self.run_instrument(&window.instrument, &window.fills, board, seed)
                    })
                    .and_then(|run| {
                        if let Some(checkpoint) = &run.checkpoint {
                            store.persist(&window.instrument, checkpoint)?;
                        }
                        Ok(run)
                    });
                InstrumentOutcome {
                    instrument: window.instrument.clone(),
                    result,
                }
            })
            .collect()
    }
}
