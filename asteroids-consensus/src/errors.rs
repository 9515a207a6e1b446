use thiserror::Error;

use asteroids_core::errors::{RafError, RegionError};

use crate::annotation_set::ConsensusState;

#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error("Annotations have different region counts ({0} vs {1})")]
    RegionCountMismatch(usize, usize),

    #[error("No annotations accepted for chain {0}")]
    EmptyAnnotationSet(String),

    #[error("Identifier alphabet exhausted for chain {chain}: {count} domains")]
    SidAlphabetExhausted { chain: String, count: usize },

    #[error("Cannot {operation} while the annotation set is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: ConsensusState,
    },

    #[error("Candidate {0} was never loaded from the evidence store")]
    UnloadedCandidate(String),

    #[error("No alignment record for chain {0}")]
    MissingRecord(String),

    #[error(transparent)]
    Raf(#[from] RafError),

    #[error(transparent)]
    Region(#[from] RegionError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type ConsensusResult<T> = std::result::Result<T, ConsensusError>;
