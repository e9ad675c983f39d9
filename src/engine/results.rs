// 10.3: run outcomes. one instrument's run either yields a full record
// series plus the checkpoint to persist, or a single error for the whole
// instrument. errors never cross instrument boundaries.

use crate::checkpoint::{Checkpoint, CheckpointError};
use crate::quote::QuoteError;
use crate::record::PnLRecord;
use crate::types::Instrument;

// A completed per-instrument run.
#[derive(Debug, Clone)]
pub struct InstrumentRun {
    pub instrument: Instrument,
    pub records: Vec<PnLRecord>,
    // final state of the fold; persisted only after the run succeeds.
    // None when the run processed no buckets and had no seed, so an empty
    // window never manufactures a checkpoint timestamp
    pub checkpoint: Option<Checkpoint>,
    pub rejected_fills: usize,
    // fill-free buckets skipped because no USD valuation resolved
    pub deferred_buckets: usize,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Quote(#[from] QuoteError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error("no conversion mapping for {0} and strict mode is on")]
    UnmappedConversion(Instrument),
}

// Batch element: the run, or why it was abandoned.
#[derive(Debug, Clone)]
pub struct InstrumentOutcome {
    pub instrument: Instrument,
    pub result: Result<InstrumentRun, EngineError>,
}

impl InstrumentOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}
