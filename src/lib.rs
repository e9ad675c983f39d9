// pnl-core: position and PnL accounting engine.
// accounting-first architecture: every figure is a deterministic fold over
// time-ordered buckets. all computation is pure with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Instrument, Side, SignedAmount, Price, Usd, Timestamp
//   2.x  fill.rs: fill aggregation into fixed buckets, per-side VWAPs
//   3.x  conversion.rs: instrument -> USD conversion descriptors
//   4.x  quote.rs: bucketed quote board, carry-forward, USD rate resolution
//   5.x  realization.rs: position transitions, realized PnL components
//   6.x  ledger.rs: position state fold, average-cost basis
//   7.x  valuation.rs: conservative mark-to-market of the open position
//   8.x  record.rs: per-bucket output record assembly
//   9.x  checkpoint.rs: run seeding and the checkpoint store trait
//   10.x engine/: per-instrument runs and the parallel batch driver

// accounting pipeline
pub mod conversion;
pub mod fill;
pub mod ledger;
pub mod quote;
pub mod realization;
pub mod record;
pub mod types;
pub mod valuation;

// run orchestration
pub mod checkpoint;
pub mod engine;

// re exports for convenience
pub use checkpoint::*;
pub use conversion::*;
pub use engine::*;
pub use fill::*;
pub use ledger::*;
pub use quote::*;
pub use realization::*;
pub use record::*;
pub use types::*;
pub use valuation::*;
