//! Resumable search state for long branch-and-bound runs.
//!
//! A checkpoint lives at `<cache_dir>/<algorithm>/<sequence>.checkpoint` and
//! captures everything needed to resume the search where it left off: the
//! problem identity (sequence, dimension, bond table), the best conformation
//! so far, the diagnostic counters, and a resume cursor. Writes go through a
//! temporary file and a rename so a crash can never leave a half-written
//! file, and the serialisation is deterministic: two runs reaching the same
//! final state produce byte-identical files.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::FoldError;
use crate::lattice::Move;
use crate::model::BondTable;
use crate::protein::Protein;

/// The environment variable naming the cache directory used when no
/// explicit directory is configured
pub const CACHE_DIR_ENV: &str = "LATFOLD_CACHE_DIR";

/// The cache directory taken from the environment, if any
pub fn default_cache_dir() -> Option<PathBuf> {
    std::env::var_os(CACHE_DIR_ENV).map(PathBuf::from)
}

/// Where a search run stands, stored inside its checkpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cursor {
    /// The run completed, the stored best is the final answer
    Finished,
    /// The serial engine's depth-first position: the move stack at the last
    /// improvement
    Stack(Vec<Move>),
    /// The parallel engine's progress: every subtree below this index of the
    /// split-depth work list is fully explored
    Subtree(usize),
}

/// The full persisted state of a branch-and-bound run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// The algorithm that wrote this file
    pub algorithm: String,
    /// The sequence of the problem, as one letter codes
    pub sequence: String,
    /// The lattice dimension of the problem
    pub dim: usize,
    /// The energy model of the problem
    pub bond_values: BondTable,
    /// The best score found so far
    pub best_score: i32,
    /// The move list realising the best score
    pub best_hash: Vec<Move>,
    /// Complete conformations evaluated so far
    pub solutions_checked: u64,
    /// Tracked placements so far
    pub aminos_placed: u64,
    /// Where to pick the search back up
    pub cursor: Cursor,
}

impl Checkpoint {
    /// Capture the current state of a search over the given engine
    pub fn for_state(
        algorithm: &str,
        protein: &Protein,
        best_score: i32,
        best_hash: Vec<Move>,
        cursor: Cursor,
    ) -> Self {
        Self {
            algorithm: algorithm.to_string(),
            sequence: protein.sequence_string(),
            dim: protein.dim(),
            bond_values: protein.bond_values().clone(),
            best_score,
            best_hash,
            solutions_checked: protein.solutions_checked(),
            aminos_placed: protein.aminos_placed(),
            cursor,
        }
    }

    /// The checkpoint location for an algorithm run over the given engine
    pub fn path_for(cache_dir: &Path, algorithm: &str, protein: &Protein) -> PathBuf {
        cache_dir
            .join(algorithm)
            .join(format!("{}.checkpoint", protein.sequence_string()))
    }

    /// Read and parse a checkpoint file.
    /// # Errors
    /// [`FoldError::CheckpointCorrupt`] when the file cannot be read or does
    /// not parse as a checkpoint.
    pub fn load(path: &Path) -> Result<Self, FoldError> {
        let bytes = fs::read(path).map_err(|err| {
            FoldError::checkpoint_corrupt(format!("could not read {}: {err}", path.display()))
        })?;
        bincode::deserialize(&bytes).map_err(|err| {
            FoldError::checkpoint_corrupt(format!("could not parse {}: {err}", path.display()))
        })
    }

    /// Check that this checkpoint belongs to the given algorithm and problem.
    /// # Errors
    /// [`FoldError::CheckpointCorrupt`] naming the first mismatch.
    pub fn validate(&self, algorithm: &str, protein: &Protein) -> Result<(), FoldError> {
        if self.algorithm != algorithm {
            return Err(FoldError::checkpoint_corrupt(format!(
                "written by {}, expected {algorithm}",
                self.algorithm
            )));
        }
        if self.sequence != protein.sequence_string() {
            return Err(FoldError::checkpoint_corrupt(format!(
                "sequence mismatch: {} stored, {} requested",
                self.sequence,
                protein.sequence_string()
            )));
        }
        if self.dim != protein.dim() {
            return Err(FoldError::checkpoint_corrupt(format!(
                "dimension mismatch: {} stored, {} requested",
                self.dim,
                protein.dim()
            )));
        }
        if &self.bond_values != protein.bond_values() {
            return Err(FoldError::checkpoint_corrupt("bond table mismatch"));
        }
        Ok(())
    }

    /// Atomically persist this checkpoint, creating the directory on demand.
    /// # Errors
    /// [`FoldError::CheckpointCorrupt`] when the file cannot be written.
    pub fn store(&self, path: &Path) -> Result<(), FoldError> {
        let io_error = |err: std::io::Error| {
            FoldError::checkpoint_corrupt(format!("could not write {}: {err}", path.display()))
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let bytes = bincode::serialize(self).map_err(|err| {
            FoldError::checkpoint_corrupt(format!("could not encode checkpoint: {err}"))
        })?;
        let temporary = path.with_extension("checkpoint.tmp");
        fs::write(&temporary, bytes).map_err(io_error)?;
        fs::rename(&temporary, path).map_err(io_error)?;
        debug!("stored checkpoint at {}", path.display());
        Ok(())
    }
}
