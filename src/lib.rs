#![doc = include_str!("../README.md")]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, missing_docs)]
#![allow(
    clippy::must_use_candidate,
    clippy::missing_panics_doc,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::module_name_repetitions
)]

mod amino_acid;
pub mod checkpoint;
mod config;
pub mod datasets;
mod error;
pub mod helpers;
pub mod lattice;
mod model;
pub mod pdb;
mod protein;
pub mod search;

pub use amino_acid::{parse_sequence, AminoAcid};
pub use config::{fold, Algorithm, FoldConfig};
pub use error::FoldError;
pub use model::{BondTable, Model};
pub use protein::Protein;
pub use search::{
    beam_search, depth_first, depth_first_bnb, depth_first_bnb_parallel,
    depth_first_bnb_parallel_with_cache, depth_first_bnb_with_cache, PruneMode,
};
