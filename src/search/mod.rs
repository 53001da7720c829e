//! The search algorithms over the conformation engine.
//!
//! All serial searches enumerate the same symmetry reduced tree: residue 1
//! is always reached by move `1` (quotienting the axial reflections) and
//! residue 2 only explores positive axes (quotienting the rotations around
//! the first axis). Deeper residues try every non-reverse move in canonical
//! ascending order, so results are deterministic up to strict improvement.

mod beam;
mod depth_first;
mod depth_first_bnb;
mod parallel;

pub use beam::beam_search;
pub use depth_first::depth_first;
pub use depth_first_bnb::{depth_first_bnb, depth_first_bnb_with_cache};
pub use parallel::{depth_first_bnb_parallel, depth_first_bnb_parallel_with_cache};

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FoldError;
use crate::lattice::{manhattan, moves_ascending, moves_positive, Move};
use crate::protein::Protein;

/// How depth-first branch-and-bound bounds the score still achievable in a
/// subtree
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PruneMode {
    /// Bound from the sequence alone: every unplaced residue may still bond
    /// with every eligible partner
    #[default]
    Naive,
    /// Additionally discount placed partners that are geometrically out of
    /// reach of the remaining chain
    ReachPrune,
}

impl PruneMode {
    /// The identifier used in configurations and checkpoints
    pub const fn name(self) -> &'static str {
        match self {
            Self::Naive => "naive",
            Self::ReachPrune => "reach_prune",
        }
    }
}

impl FromStr for PruneMode {
    type Err = FoldError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "naive" => Ok(Self::Naive),
            "reach_prune" => Ok(Self::ReachPrune),
            _ => Err(FoldError::invalid_input(format!(
                "unknown branch-and-bound mode: {s}"
            ))),
        }
    }
}

/// The moves to try for the residue placed at the given chain length, in
/// canonical order. The list is reversed so callers can pop from the end.
pub(crate) fn remaining_moves(dim: usize, cur_len: usize) -> Vec<Move> {
    let mut moves = if cur_len == 2 {
        moves_positive(dim)
    } else {
        moves_ascending(dim)
    };
    moves.reverse();
    moves
}

/// The canonical moves ordered after `taken` at the given chain length,
/// reversed for popping. Used to rebuild the search stack from a checkpoint.
pub(crate) fn remaining_moves_after(
    dim: usize,
    cur_len: usize,
    taken: Move,
) -> Result<Vec<Move>, FoldError> {
    let mut moves = remaining_moves(dim, cur_len);
    // the reversed list ends with the first canonical move
    match moves.iter().rposition(|m| *m == taken) {
        Some(index) => {
            moves.truncate(index);
            Ok(moves)
        }
        None => Err(FoldError::checkpoint_corrupt(format!(
            "move {taken} is not part of the enumeration at chain length {cur_len}"
        ))),
    }
}

/// An upper bound on the negative score the unplaced suffix can still
/// contribute, as a non-negative magnitude. For every unplaced residue the
/// potential partners earlier in the chain (|i - j| >= 2, negative bond
/// entry) are counted and capped at 2 * dim - 1, the largest number of bonds a
/// single placement can create; the count is weighted by the residue's worst
/// bond magnitude. Charging every pair to its later residue mirrors the
/// incremental scoring, so the bound is exact on the pair level.
///
/// In reach-prune mode an already placed partner is only counted while the
/// head can still bring the unplaced residue next to it: the Manhattan
/// distance from the head to the partner may not exceed the remaining chain
/// steps plus one (triangle inequality).
pub(crate) fn remaining_bound(protein: &Protein, mode: PruneMode) -> i32 {
    let sequence = protein.sequence();
    let bond_values = protein.bond_values();
    let cur_len = protein.cur_len();
    let cap = 2 * protein.dim() as i32 - 1;
    let head = protein.last_pos();

    let mut total = 0;
    for k in cur_len..sequence.len() {
        let worst = bond_values.max_negative_bond(sequence[k]);
        if worst == 0 {
            continue;
        }
        let steps = (k + 1 - cur_len) as i32;
        let mut partners = 0;
        for j in 0..k.saturating_sub(1) {
            if bond_values.bond(sequence[j], sequence[k]) >= 0 {
                continue;
            }
            if mode == PruneMode::ReachPrune
                && j < cur_len
                && manhattan(head, protein.position(j)) > steps + 1
            {
                continue;
            }
            partners += 1;
        }
        total += partners.min(cap) * worst;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_move_frames() {
        assert_eq!(remaining_moves(2, 2), vec![2, 1]);
        assert_eq!(remaining_moves(2, 3), vec![2, 1, -1, -2]);
        assert_eq!(remaining_moves(3, 5), vec![3, 2, 1, -1, -2, -3]);
    }

    #[test]
    fn frames_after_a_taken_move() {
        assert_eq!(remaining_moves_after(2, 3, -2).unwrap(), vec![2, 1, -1]);
        assert_eq!(remaining_moves_after(2, 3, 2).unwrap(), Vec::<Move>::new());
        assert_eq!(remaining_moves_after(2, 2, 1).unwrap(), vec![2]);
        assert!(remaining_moves_after(2, 2, -1).is_err());
    }

    #[test]
    fn naive_bound_counts_later_partners() {
        let protein = Protein::hp("PHPHPHPPH", 2).unwrap();
        // partners per unplaced H: index 3 sees H1; 5 sees H1, H3; 8 sees
        // H1, H3, H5 capped at 3
        assert_eq!(remaining_bound(&protein, PruneMode::Naive), 6);
    }

    #[test]
    fn reach_bound_is_never_looser() {
        let mut protein = Protein::hp("PHPHPHPPH", 2).unwrap();
        for m in [1, 1, 1, 1] {
            protein.place_amino(m, false).unwrap();
        }
        assert!(
            remaining_bound(&protein, PruneMode::ReachPrune)
                <= remaining_bound(&protein, PruneMode::Naive)
        );
    }

    #[test]
    fn prune_mode_names() {
        assert_eq!("naive".parse::<PruneMode>().unwrap(), PruneMode::Naive);
        assert_eq!(
            "reach_prune".parse::<PruneMode>().unwrap(),
            PruneMode::ReachPrune
        );
        assert!("greedy".parse::<PruneMode>().is_err());
        assert_eq!(PruneMode::ReachPrune.name(), "reach_prune");
    }
}
