//! Helper functions emitting conformation geometry in canonical order, used
//! by the exporters and by downstream visualisation.

use indexmap::IndexMap;

use crate::amino_acid::AminoAcid;
use crate::lattice::{inverse, step, Move, Position};
use crate::protein::Protein;

/// Collect every placed residue that could contribute to the score,
/// conservatively taken as every residue whose best achievable bond value is
/// negative. Maps the position onto the (incoming, outgoing) moves of the
/// residue: the move that placed it there and the move leading on to the
/// next residue. Residue 0 has incoming 0, the head has outgoing 0. Entries
/// are emitted in placement order.
pub fn get_scoring_aminos(protein: &Protein) -> IndexMap<Position, (Move, Move)> {
    let mut aminos = IndexMap::new();
    let mut pos = vec![0; protein.dim()];
    loop {
        let occupied = *protein
            .occupied(&pos)
            .expect("walking the chain only visits occupied positions");
        if protein
            .bond_values()
            .is_scoring(protein.sequence()[occupied.index])
        {
            aminos.insert(pos.clone(), (occupied.incoming, occupied.outgoing));
        }
        if occupied.outgoing == 0 {
            break;
        }
        pos = step(&pos, occupied.outgoing);
    }
    aminos
}

/// All currently realised scoring pairs as position pairs, where the second
/// position is one positive unit step from the first along an axis not used
/// by the chain bonds there. The chain bonds at a residue run towards its
/// previous neighbour (the inverse of the incoming move) and towards its
/// next neighbour (the outgoing move). Scans residues in placement order and
/// axes in ascending order.
pub fn get_scoring_pairs(protein: &Protein) -> Vec<(Position, Position)> {
    let aminos = get_scoring_aminos(protein);
    let mut pairs = Vec::new();
    for (pos, (incoming, outgoing)) in &aminos {
        for m in 1..=protein.dim() as Move {
            if inverse(*incoming) != m && *outgoing != m {
                let other = step(pos, m);
                if aminos.contains_key(&other) {
                    pairs.push((pos.clone(), other));
                }
            }
        }
    }
    pairs
}

/// The positions of the placed chain prefix in placement order, paired with
/// their residues
pub fn ordered_positions(protein: &Protein) -> Vec<(Position, AminoAcid)> {
    let mut positions = Vec::with_capacity(protein.cur_len());
    let mut pos = vec![0; protein.dim()];
    positions.push((pos.clone(), protein.sequence()[0]));
    for (m, amino) in protein
        .hash_fold()
        .iter()
        .zip(protein.sequence().iter().skip(1))
    {
        pos = step(&pos, *m);
        positions.push((pos.clone(), *amino));
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folded() -> Protein {
        let mut protein = Protein::hp("HPPHPPHH", 2).unwrap();
        protein.set_hash(&[1, 2, -1, -1, -2], true).unwrap();
        protein
    }

    #[test]
    fn scoring_aminos_walk_the_chain() {
        let protein = folded();
        let moves = protein.hash_fold();
        let aminos = get_scoring_aminos(&protein);
        // H residues at indices 0, 3 and the placed prefix ends at index 5
        assert_eq!(aminos.len(), 2);
        let entries: Vec<_> = aminos.iter().collect();
        // residue 0 starts the chain: no incoming move, leaves by the first
        // move of the stack
        assert_eq!(entries[0], (&vec![0, 0], &(0, moves[0])));
        // residue 3 was placed by the literal third stack move and leaves by
        // the fourth, both -1, not their reverses
        assert_eq!(entries[1], (&vec![0, 1], &(moves[2], moves[3])));
        assert_eq!(entries[1].1, &(-1, -1));
    }

    #[test]
    fn scoring_pairs_scan_positive_axes() {
        let pairs = get_scoring_pairs(&folded());
        assert_eq!(pairs, vec![(vec![0, 0], vec![0, 1])]);
    }

    #[test]
    fn positions_in_placement_order() {
        let positions = ordered_positions(&folded());
        assert_eq!(positions.len(), 6);
        assert_eq!(positions[0].0, vec![0, 0]);
        assert_eq!(positions[1].0, vec![1, 0]);
        assert_eq!(positions[2].0, vec![1, 1]);
        assert_eq!(positions[3].0, vec![0, 1]);
        assert_eq!(positions[4].0, vec![-1, 1]);
        assert_eq!(positions[5].0, vec![-1, 0]);
        assert_eq!(positions[0].1, AminoAcid::Hydrophobic);
        assert_eq!(positions[3].1, AminoAcid::Hydrophobic);
    }
}
