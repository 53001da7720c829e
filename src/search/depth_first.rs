use log::debug;

use super::remaining_moves;
use crate::error::FoldError;
use crate::lattice::Move;
use crate::protein::Protein;

/// Exhaustively enumerate every symmetry reduced self-avoiding walk of the
/// chain and leave the engine folded into the best conformation found.
/// Returns the best score. Every complete conformation counts towards
/// `solutions_checked`; every search placement is tracked.
/// # Errors
/// Only engine errors are propagated, an invalid enumerated move is skipped.
pub fn depth_first(protein: &mut Protein) -> Result<i32, FoldError> {
    let n = protein.sequence().len();
    while protein.cur_len() > 1 {
        protein.remove_amino()?;
    }
    if n == 1 {
        return Ok(0);
    }

    let mut best = i32::MAX;
    let mut best_hash: Vec<Move> = Vec::new();

    protein.place_amino(1, true)?;
    if protein.cur_len() == n {
        protein.count_solution();
        best = protein.score();
        best_hash = protein.hash_fold();
    }

    let mut frames: Vec<Vec<Move>> = if protein.cur_len() < n {
        vec![remaining_moves(protein.dim(), protein.cur_len())]
    } else {
        Vec::new()
    };

    while !frames.is_empty() {
        let Some(m) = frames.last_mut().and_then(Vec::pop) else {
            frames.pop();
            if protein.cur_len() > 2 {
                protein.remove_amino()?;
            }
            continue;
        };
        if !protein.is_valid(m) {
            continue;
        }
        protein.place_amino(m, true)?;
        if protein.cur_len() == n {
            protein.count_solution();
            if protein.score() < best {
                best = protein.score();
                best_hash = protein.hash_fold();
                debug!(
                    "depth_first improved to {best} after {} conformations",
                    protein.solutions_checked()
                );
            }
            protein.remove_amino()?;
        } else {
            frames.push(remaining_moves(protein.dim(), protein.cur_len()));
        }
    }

    protein.set_hash(&best_hash, false)?;
    protein.record_best(best_hash);
    Ok(best)
}
