// 10.0: the accounting engine. per-instrument sequential folds, an
// embarrassingly parallel batch runner, and the checkpoint commit boundary.
// deterministic and pure given its inputs, with no I/O inside the fold.

mod config;
mod core;
mod results;

pub use config::{ConfigError, EngineConfig};
pub use core::{Engine, InstrumentWindow};
pub use results::{EngineError, InstrumentOutcome, InstrumentRun};
