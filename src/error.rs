//! Contains the error type shared by the conformation engine, the search
//! algorithms, and the exporters.

use serde::{Deserialize, Serialize};
use std::error;
use std::fmt;

use crate::lattice::Move;

/// An error surfacing from the conformation engine or anything built on top
/// of it. Engine errors are returned to the caller immediately; the search
/// algorithms propagate them and never swallow them. The only condition
/// recovered internally is an invalid move tried during enumeration, which
/// is skipped without ever constructing an error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FoldError {
    /// The input cannot form a valid problem instance: an empty sequence, a
    /// dimension below 2, a symbol without a bond table entry, a malformed
    /// dataset, or an export request the format cannot express.
    InvalidInput(String),
    /// A move that cannot be applied to the current conformation: stepping
    /// outside the lattice dimension, reversing onto the previous residue,
    /// colliding with an occupied position, extending a fully placed chain,
    /// or removing the last remaining residue.
    IllegalMove {
        /// The move that was attempted, `0` for operations without one
        attempted: Move,
        /// Why the move could not be applied
        reason: String,
    },
    /// A checkpoint file that does not belong to the current
    /// `(sequence, dim, bond_values)`, cannot be parsed, or cannot be
    /// read or written. Callers may delete the file and retry.
    CheckpointCorrupt(String),
}

impl FoldError {
    /// Create a new [`FoldError::InvalidInput`]
    pub fn invalid_input(message: impl std::string::ToString) -> Self {
        Self::InvalidInput(message.to_string())
    }

    /// Create a new [`FoldError::IllegalMove`]
    pub fn illegal_move(attempted: Move, reason: impl std::string::ToString) -> Self {
        Self::IllegalMove {
            attempted,
            reason: reason.to_string(),
        }
    }

    /// Create a new [`FoldError::CheckpointCorrupt`]
    pub fn checkpoint_corrupt(message: impl std::string::ToString) -> Self {
        Self::CheckpointCorrupt(message.to_string())
    }
}

impl fmt::Display for FoldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::IllegalMove { attempted, reason } => {
                write!(f, "illegal move {attempted}: {reason}")
            }
            Self::CheckpointCorrupt(message) => write!(f, "corrupt checkpoint: {message}"),
        }
    }
}

impl error::Error for FoldError {}
