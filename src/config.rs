//! The configuration surface: every option a caller can set, plus the
//! dispatcher running the selected algorithm over a freshly built engine.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::checkpoint::default_cache_dir;
use crate::error::FoldError;
use crate::model::{BondTable, Model};
use crate::protein::Protein;
use crate::search::{
    beam_search, depth_first, depth_first_bnb_parallel_with_cache, depth_first_bnb_with_cache,
    PruneMode,
};

/// All recognised options. Only the sequence is required; everything else
/// has the documented default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FoldConfig {
    /// The residue sequence over the alphabet, e.g. `"HPPHPPHH"`
    pub sequence: String,
    /// The lattice dimension, default 2
    pub dim: usize,
    /// The bond table preset, default [`Model::HP`]
    pub model: Model,
    /// An explicit bond table overriding the preset
    pub bond_values: Option<BondTable>,
    /// The beam width for beam search; zero or below means unbounded
    pub beam_width: i32,
    /// The pruning bound for the branch-and-bound searches
    pub bnb_mode: PruneMode,
    /// The checkpoint directory; falls back to the
    /// [`LATFOLD_CACHE_DIR`](crate::checkpoint::CACHE_DIR_ENV) environment
    /// variable when unset
    pub cache_dir: Option<PathBuf>,
    /// The worker pool size for the parallel search; the global pool when
    /// unset
    pub workers: Option<usize>,
}

impl FoldConfig {
    /// A configuration with every option at its default
    pub fn new(sequence: impl std::string::ToString) -> Self {
        Self {
            sequence: sequence.to_string(),
            dim: 2,
            model: Model::HP,
            bond_values: None,
            beam_width: -1,
            bnb_mode: PruneMode::Naive,
            cache_dir: None,
            workers: None,
        }
    }

    /// Set the lattice dimension
    #[must_use]
    pub fn with_dim(mut self, dim: usize) -> Self {
        self.dim = dim;
        self
    }

    /// Set the bond table preset
    #[must_use]
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Override the preset with an explicit bond table
    #[must_use]
    pub fn with_bond_values(mut self, bond_values: BondTable) -> Self {
        self.bond_values = Some(bond_values);
        self
    }

    /// Set the beam width
    #[must_use]
    pub fn with_beam_width(mut self, beam_width: i32) -> Self {
        self.beam_width = beam_width;
        self
    }

    /// Set the branch-and-bound pruning mode
    #[must_use]
    pub fn with_bnb_mode(mut self, bnb_mode: PruneMode) -> Self {
        self.bnb_mode = bnb_mode;
        self
    }

    /// Set the checkpoint directory
    #[must_use]
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(cache_dir.into());
        self
    }

    /// Set the worker pool size
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// The bond table this configuration selects
    pub fn bond_table(&self) -> BondTable {
        self.bond_values
            .clone()
            .unwrap_or_else(|| self.model.bond_table())
    }

    /// Build the conformation engine for this configuration
    /// # Errors
    /// [`FoldError::InvalidInput`] for a malformed sequence or dimension.
    pub fn protein(&self) -> Result<Protein, FoldError> {
        Protein::new(&self.sequence, self.dim, self.bond_table())
    }
}

/// The search algorithms a configuration can be dispatched to
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    /// Exhaustive depth-first enumeration
    DepthFirst,
    /// Serial depth-first branch-and-bound
    DepthFirstBnb,
    /// Parallel depth-first branch-and-bound
    DepthFirstBnbParallel,
    /// Level-synchronous beam search
    BeamSearch,
}

impl FromStr for Algorithm {
    type Err = FoldError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "depth_first" => Ok(Self::DepthFirst),
            "depth_first_bnb" => Ok(Self::DepthFirstBnb),
            "depth_first_bnb_parallel" => Ok(Self::DepthFirstBnbParallel),
            "beam_search" => Ok(Self::BeamSearch),
            _ => Err(FoldError::invalid_input(format!("unknown algorithm: {s}"))),
        }
    }
}

/// Build an engine from the configuration, run the selected algorithm, and
/// return the engine folded into the best conformation found.
/// # Errors
/// Configuration, engine, and checkpoint errors are propagated.
pub fn fold(config: &FoldConfig, algorithm: Algorithm) -> Result<Protein, FoldError> {
    let mut protein = config.protein()?;
    let cache_dir = config.cache_dir.clone().or_else(default_cache_dir);
    match algorithm {
        Algorithm::DepthFirst => {
            depth_first(&mut protein)?;
        }
        Algorithm::DepthFirstBnb => {
            depth_first_bnb_with_cache(&mut protein, config.bnb_mode, cache_dir.as_deref())?;
        }
        Algorithm::DepthFirstBnbParallel => {
            depth_first_bnb_parallel_with_cache(
                &mut protein,
                config.bnb_mode,
                config.workers,
                cache_dir.as_deref(),
            )?;
        }
        Algorithm::BeamSearch => {
            beam_search(&mut protein, config.beam_width)?;
        }
    }
    Ok(protein)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = FoldConfig::new("HPPHPPHH");
        assert_eq!(config.dim, 2);
        assert_eq!(config.model, Model::HP);
        assert_eq!(config.beam_width, -1);
        assert_eq!(config.bnb_mode, PruneMode::Naive);
        assert_eq!(config.bond_table(), BondTable::hp());
    }

    #[test]
    fn dispatch() {
        let config = FoldConfig::new("PHPHPHPPH");
        let exhaustive = fold(&config, Algorithm::DepthFirst).unwrap();
        assert_eq!(exhaustive.score(), -3);
        let pruned = fold(&config, Algorithm::DepthFirstBnb).unwrap();
        assert_eq!(pruned.score(), -3);
        let beam = fold(&config, Algorithm::BeamSearch).unwrap();
        assert_eq!(beam.score(), -3);
    }

    #[test]
    fn dispatch_3d_parallel() {
        let config = FoldConfig::new("HPPHPPHH")
            .with_dim(3)
            .with_bnb_mode(PruneMode::ReachPrune)
            .with_workers(2);
        let protein = fold(&config, Algorithm::DepthFirstBnbParallel).unwrap();
        assert_eq!(protein.score(), -3);
    }

    #[test]
    fn algorithm_names() {
        assert_eq!(
            "depth_first_bnb".parse::<Algorithm>().unwrap(),
            Algorithm::DepthFirstBnb
        );
        assert!("dijkstra".parse::<Algorithm>().is_err());
    }

    #[test]
    fn invalid_configurations_surface() {
        assert!(fold(&FoldConfig::new(""), Algorithm::DepthFirst).is_err());
        assert!(fold(
            &FoldConfig::new("HPPH").with_dim(1),
            Algorithm::DepthFirst
        )
        .is_err());
    }
}
