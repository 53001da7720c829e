use itertools::Itertools;
use log::debug;

use super::{remaining_bound, PruneMode};
use crate::error::FoldError;
use crate::lattice::{moves_negative_first, Move};
use crate::protein::Protein;

/// Level-synchronous beam search: the frontier holds at most `width` partial
/// conformations per depth, each expanding into every valid child. Children
/// are ranked ascending by `(score, score - reach bound)`, the reach-prune
/// lower bound on what the partial conformation can still achieve, under a
/// stable sort so ties keep their generation order. A `width` of zero or
/// below means unbounded, reducing the search to exhaustive breadth-first.
///
/// The frontier replays move prefixes on the engine with untracked
/// placements; only the fixed first move and the final adoption of the best
/// conformation are tracked. `solutions_checked` ends at 1: exactly one
/// complete conformation is evaluated and returned.
/// # Errors
/// Only engine errors are propagated.
pub fn beam_search(protein: &mut Protein, width: i32) -> Result<i32, FoldError> {
    let n = protein.sequence().len();
    while protein.cur_len() > 1 {
        protein.remove_amino()?;
    }
    if n == 1 {
        return Ok(0);
    }

    let order = moves_negative_first(protein.dim());
    protein.place_amino(1, true)?;
    let mut frontier: Vec<Vec<Move>> = vec![vec![1]];

    for _ in 1..n - 1 {
        let mut children: Vec<(i32, i32, Vec<Move>)> = Vec::new();
        for prefix in &frontier {
            protein.set_hash(prefix, false)?;
            for m in &order {
                if !protein.is_valid(*m) {
                    continue;
                }
                protein.place_amino(*m, false)?;
                let score = protein.score();
                let bound = score - remaining_bound(protein, PruneMode::ReachPrune);
                protein.remove_amino()?;
                let mut child = prefix.clone();
                child.push(*m);
                children.push((score, bound, child));
            }
        }
        let mut ranked: Vec<_> = children
            .into_iter()
            .sorted_by_key(|(score, bound, _)| (*score, *bound))
            .collect();
        if width > 0 {
            ranked.truncate(width as usize);
        }
        frontier = ranked.into_iter().map(|(_, _, child)| child).collect();
        if frontier.is_empty() {
            // every partial conformation ran into a dead end
            break;
        }
    }

    let best = frontier
        .first()
        .cloned()
        .unwrap_or_else(|| protein.hash_fold());
    protein.set_hash(&best, true)?;
    protein.count_solution();
    protein.record_best(best);
    debug!(
        "beam_search (width {width}) settled at {}",
        protein.score()
    );
    Ok(protein.score())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn unbounded_finds_the_optimum() {
        let mut protein = Protein::hp("PHPHPHPPH", 2).unwrap();
        assert_eq!(beam_search(&mut protein, 0).unwrap(), -3);
        assert_eq!(protein.solutions_checked(), 1);
        assert_eq!(protein.aminos_placed(), 10);
    }

    #[test]
    fn negative_width_means_unbounded() {
        let mut protein = Protein::hp("PHPHPHPPH", 2).unwrap();
        assert_eq!(beam_search(&mut protein, -1).unwrap(), -3);
        assert_eq!(protein.solutions_checked(), 1);
        assert_eq!(protein.aminos_placed(), 10);
    }

    #[test]
    fn oversized_width_behaves_like_unbounded() {
        let mut protein = Protein::hp("PHPHPHPPH", 2).unwrap();
        assert_eq!(beam_search(&mut protein, 99).unwrap(), -3);
        assert_eq!(protein.aminos_placed(), 10);
    }

    #[test]
    fn narrow_beams_trade_quality() {
        let mut protein = Protein::hp("PHPHPHPPH", 2).unwrap();
        assert_eq!(beam_search(&mut protein, 40).unwrap(), -2);
        assert_eq!(protein.solutions_checked(), 1);
        assert_eq!(protein.aminos_placed(), 10);
    }

    #[test]
    fn widths_in_3d() {
        for (width, expected) in [(99, -4), (10, -4), (5, -3)] {
            let mut protein = Protein::hp("HPPHPHPHPH", 3).unwrap();
            assert_eq!(beam_search(&mut protein, width).unwrap(), expected);
            assert_eq!(protein.solutions_checked(), 1);
            assert_eq!(protein.aminos_placed(), 11);
        }
    }

    #[test]
    fn trivial_chains() {
        let mut single = Protein::hp("P", 2).unwrap();
        assert_eq!(beam_search(&mut single, 5).unwrap(), 0);
        let mut pair = Protein::hp("HH", 2).unwrap();
        assert_eq!(beam_search(&mut pair, 5).unwrap(), 0);
        assert_eq!(pair.hash_fold(), vec![1]);
    }

    #[test]
    fn resulting_hash_matches_the_score() {
        let mut protein = Protein::hp("HPPHPPHH", 2).unwrap();
        let score = beam_search(&mut protein, 10).unwrap();
        let hash = protein.hash_fold();
        let mut replay = Protein::hp("HPPHPPHH", 2).unwrap();
        replay.set_hash(&hash, false).unwrap();
        assert_eq!(replay.score(), score);
    }
}
