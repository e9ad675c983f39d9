// 9.0: checkpoint store. the prior window's final PositionState seeds the
// next run's fold. loading distinguishes "never ran before" (seed flat) from
// a failed load, which is fatal for that instrument: a silently zero-seeded
// ledger would misstate every subsequent realized figure.

use crate::ledger::PositionState;
use crate::types::{Instrument, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

// The persisted tail of a processing window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub ts: Timestamp,
    pub state: PositionState,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint load failed for {instrument}: {reason}")]
    LoadFailed {
        instrument: Instrument,
        reason: String,
    },

    #[error("checkpoint persist failed for {instrument}: {reason}")]
    PersistFailed {
        instrument: Instrument,
        reason: String,
    },
}

// Backend trait. implementations are expected to be shared across the
// per-instrument worker pool, hence Send + Sync.
pub trait CheckpointStore: Send + Sync {
    // Ok(None) means no checkpoint exists (a true first run)
    fn load(&self, instrument: &Instrument) -> Result<Option<Checkpoint>, CheckpointError>;

    // called only after a run completes successfully (commit boundary)
    fn persist(
        &self,
        instrument: &Instrument,
        checkpoint: &Checkpoint,
    ) -> Result<(), CheckpointError>;
}

// In-memory backend for tests and simulation.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    checkpoints: RwLock<HashMap<Instrument, Checkpoint>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, instrument: Instrument, checkpoint: Checkpoint) {
        if let Ok(mut map) = self.checkpoints.write() {
            map.insert(instrument, checkpoint);
        }
    }

    pub fn len(&self) -> usize {
        self.checkpoints.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn load(&self, instrument: &Instrument) -> Result<Option<Checkpoint>, CheckpointError> {
        let map = self
            .checkpoints
            .read()
            .map_err(|e| CheckpointError::LoadFailed {
                instrument: instrument.clone(),
                reason: e.to_string(),
            })?;
        Ok(map.get(instrument).cloned())
    }

    fn persist(
        &self,
        instrument: &Instrument,
        checkpoint: &Checkpoint,
    ) -> Result<(), CheckpointError> {
        let mut map = self
            .checkpoints
            .write()
            .map_err(|e| CheckpointError::PersistFailed {
                instrument: instrument.clone(),
                reason: e.to_string(),
            })?;
        map.insert(instrument.clone(), checkpoint.clone());
        Ok(())
    }
}

// Test double that always fails to load: exercises the fail-closed path.
#[derive(Debug, Default)]
pub struct FailingCheckpointStore;

impl CheckpointStore for FailingCheckpointStore {
    fn load(&self, instrument: &Instrument) -> Result<Option<Checkpoint>, CheckpointError> {
        Err(CheckpointError::LoadFailed {
            instrument: instrument.clone(),
            reason: "backend unavailable".to_string(),
        })
    }

    fn persist(
        &self,
        instrument: &Instrument,
        _checkpoint: &Checkpoint,
    ) -> Result<(), CheckpointError> {
        Err(CheckpointError::PersistFailed {
            instrument: instrument.clone(),
            reason: "backend unavailable".to_string(),
        })
    }
}
