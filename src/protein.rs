use std::collections::HashMap;
use std::fmt::Display;

use itertools::Itertools;

use crate::amino_acid::{parse_sequence, AminoAcid};
use crate::error::FoldError;
use crate::lattice::{inverse, is_valid_move, step, Move, Position};
use crate::model::BondTable;

/// A single occupied lattice cell: which residue sits there and the moves
/// entering and leaving it, so chain geometry can be reconstructed without
/// re-walking the move stack. The cell borrows nothing, it indexes into the
/// sequence and the move stack owned by the engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Occupied {
    /// The index of the residue in the sequence
    pub index: usize,
    /// The move that placed this residue here, 0 for residue 0; stepping
    /// from the previous residue with this move reaches this position
    pub incoming: Move,
    /// The move leading on to the next residue, 0 while this is the head
    pub outgoing: Move,
}

/// A partially or fully placed conformation of an amino acid chain on the
/// integer lattice ℤ^d.
///
/// Residue 0 always sits at the origin. The engine is mutated exclusively
/// through [`Self::place_amino`], [`Self::remove_amino`], [`Self::set_hash`]
/// and [`Self::reset`]; the move stack is the unique history reproducing the
/// occupancy, and the score is maintained incrementally in O(2 * dim) per
/// mutation instead of rescanning the chain.
#[derive(Clone, Debug, PartialEq)]
pub struct Protein {
    sequence: Vec<AminoAcid>,
    dim: usize,
    bond_values: BondTable,
    occupancy: HashMap<Position, Occupied>,
    move_stack: Vec<Move>,
    positions: Vec<Position>,
    score: i32,
    solutions_checked: u64,
    aminos_placed: u64,
    best_hash: Option<Vec<Move>>,
}

impl Protein {
    /// Create a new conformation with residue 0 placed at the origin.
    /// # Errors
    /// [`FoldError::InvalidInput`] when the sequence is empty or contains an
    /// unknown symbol, the dimension is below 2, or the bond table misses an
    /// entry for a symbol of the sequence.
    pub fn new(sequence: &str, dim: usize, bond_values: BondTable) -> Result<Self, FoldError> {
        let sequence = parse_sequence(sequence)?;
        if sequence.is_empty() {
            return Err(FoldError::invalid_input("the sequence cannot be empty"));
        }
        if dim < 2 {
            return Err(FoldError::invalid_input(format!(
                "the lattice dimension has to be at least 2, got {dim}"
            )));
        }
        for amino in AminoAcid::ALL {
            if sequence.contains(&amino) && !bond_values.covers(amino) {
                return Err(FoldError::invalid_input(format!(
                    "the bond table has no entries for amino acid {amino}"
                )));
            }
        }
        let origin = vec![0; dim];
        let mut occupancy = HashMap::new();
        occupancy.insert(
            origin.clone(),
            Occupied {
                index: 0,
                incoming: 0,
                outgoing: 0,
            },
        );
        Ok(Self {
            sequence,
            dim,
            bond_values,
            occupancy,
            move_stack: Vec::new(),
            positions: vec![origin],
            score: 0,
            solutions_checked: 0,
            aminos_placed: 1,
            best_hash: None,
        })
    }

    /// Create a new conformation with the default HP bond table
    /// # Errors
    /// See [`Self::new`].
    pub fn hp(sequence: &str, dim: usize) -> Result<Self, FoldError> {
        Self::new(sequence, dim, BondTable::hp())
    }

    /// The full residue sequence
    pub fn sequence(&self) -> &[AminoAcid] {
        &self.sequence
    }

    /// The sequence rendered as one letter codes
    pub fn sequence_string(&self) -> String {
        self.sequence.iter().map(|a| a.char()).collect()
    }

    /// The lattice dimension
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// The energy model of this conformation
    pub const fn bond_values(&self) -> &BondTable {
        &self.bond_values
    }

    /// The number of residues currently placed, at least 1
    pub fn cur_len(&self) -> usize {
        self.positions.len()
    }

    /// The sum of the bond values over all currently realised scoring pairs
    pub const fn score(&self) -> i32 {
        self.score
    }

    /// The number of complete conformations evaluated by searches so far
    pub const fn solutions_checked(&self) -> u64 {
        self.solutions_checked
    }

    /// The number of tracked placements so far, starts at 1 for residue 0
    pub const fn aminos_placed(&self) -> u64 {
        self.aminos_placed
    }

    /// The last applied move, 0 when only residue 0 is placed
    pub fn last_move(&self) -> Move {
        self.move_stack.last().copied().unwrap_or(0)
    }

    /// The position of the most recently placed residue
    pub fn last_pos(&self) -> &Position {
        self.positions
            .last()
            .expect("a conformation always has residue 0 placed")
    }

    /// The move list of the best conformation a search has recorded so far
    pub fn best_hash(&self) -> Option<&[Move]> {
        self.best_hash.as_deref()
    }

    /// A copy of the move stack realising the current conformation
    pub fn hash_fold(&self) -> Vec<Move> {
        self.move_stack.clone()
    }

    /// The position of an already placed residue
    pub(crate) fn position(&self, index: usize) -> &Position {
        &self.positions[index]
    }

    /// The occupancy entry at a position, if any residue sits there
    pub(crate) fn occupied(&self, pos: &Position) -> Option<&Occupied> {
        self.occupancy.get(pos)
    }

    /// Whether applying the move at the current head is legal: the move is
    /// expressible in this dimension, does not reverse onto the previous
    /// residue, and leads to an unoccupied position.
    pub fn is_valid(&self, m: Move) -> bool {
        is_valid_move(m, self.dim)
            && m != inverse(self.last_move())
            && !self.occupancy.contains_key(&step(self.last_pos(), m))
    }

    /// The score gained by the residue at `pos` against all placed lattice
    /// neighbours except the chain predecessor at `previous`.
    fn contact_score(&self, amino: AminoAcid, pos: &Position, previous: &Position) -> i32 {
        let mut total = 0;
        for ax in 0..self.dim {
            for sign in [1, -1] {
                let mut neighbour = pos.clone();
                neighbour[ax] += sign;
                if neighbour == *previous {
                    continue;
                }
                if let Some(occupied) = self.occupancy.get(&neighbour) {
                    total += self.bond_values.bond(amino, self.sequence[occupied.index]);
                }
            }
        }
        total
    }

    /// Place the next residue of the sequence by applying a move at the
    /// current head. Updates the score by the bonds the new residue makes
    /// with its placed non-chain neighbours. Tracked placements count
    /// towards [`Self::aminos_placed`]; lookahead placements inside bound or
    /// ordering computations pass `track = false`.
    /// # Errors
    /// [`FoldError::IllegalMove`] when the chain is already fully placed or
    /// the move is invalid at the current head.
    pub fn place_amino(&mut self, m: Move, track: bool) -> Result<(), FoldError> {
        if self.cur_len() == self.sequence.len() {
            return Err(FoldError::illegal_move(m, "the chain is fully placed"));
        }
        if !is_valid_move(m, self.dim) {
            return Err(FoldError::illegal_move(
                m,
                format!("not a move of a {} dimensional lattice", self.dim),
            ));
        }
        if m == inverse(self.last_move()) {
            return Err(FoldError::illegal_move(
                m,
                "cannot reverse onto the previous residue",
            ));
        }
        let head = self.last_pos().clone();
        let next = step(&head, m);
        if self.occupancy.contains_key(&next) {
            return Err(FoldError::illegal_move(m, "position already occupied"));
        }

        let index = self.cur_len();
        self.score += self.contact_score(self.sequence[index], &next, &head);
        self.occupancy
            .get_mut(&head)
            .expect("the head position is always occupied")
            .outgoing = m;
        self.occupancy.insert(
            next.clone(),
            Occupied {
                index,
                incoming: m,
                outgoing: 0,
            },
        );
        self.positions.push(next);
        self.move_stack.push(m);
        if track {
            self.aminos_placed += 1;
        }
        Ok(())
    }

    /// Remove the most recently placed residue, reversing the incremental
    /// score update. A place followed by a remove restores the engine to a
    /// bit-identical state.
    /// # Errors
    /// [`FoldError::IllegalMove`] when only residue 0 is placed.
    pub fn remove_amino(&mut self) -> Result<(), FoldError> {
        if self.cur_len() < 2 {
            return Err(FoldError::illegal_move(
                0,
                "cannot remove residue 0 from the origin",
            ));
        }
        let removed = self
            .positions
            .pop()
            .expect("the position stack cannot be empty");
        let occupied = self
            .occupancy
            .remove(&removed)
            .expect("every stacked position is occupied");
        self.move_stack.pop();
        let head = self.last_pos().clone();
        self.score -= self.contact_score(self.sequence[occupied.index], &removed, &head);
        self.occupancy
            .get_mut(&head)
            .expect("the head position is always occupied")
            .outgoing = 0;
        Ok(())
    }

    /// Rewind to residue 0 only, then apply the given moves in order.
    /// # Errors
    /// [`FoldError::IllegalMove`] at the first infeasible move; the already
    /// applied prefix stays in place.
    pub fn set_hash(&mut self, moves: &[Move], track: bool) -> Result<(), FoldError> {
        while self.cur_len() > 1 {
            self.remove_amino()?;
        }
        for m in moves {
            self.place_amino(*m, track)?;
        }
        Ok(())
    }

    /// Rewind to residue 0 only and clear the counters and the recorded
    /// best conformation
    pub fn reset(&mut self) {
        while self.cur_len() > 1 {
            self.remove_amino()
                .expect("rewinding a non-trivial conformation cannot fail");
        }
        self.solutions_checked = 0;
        self.aminos_placed = 1;
        self.best_hash = None;
    }

    /// The ordered list of currently realised scoring pairs as indices into
    /// the sequence: every pair of non-adjacent residues at unit lattice
    /// distance, whatever its bond table entry. Ascending by smaller then
    /// larger index; every pair is emitted twice, once as (i, j) and once as
    /// (j, i), for callers that iterate from either endpoint.
    pub fn get_bonds(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (k, pos) in self.positions.iter().enumerate() {
            for ax in 0..self.dim {
                for sign in [1, -1] {
                    let mut neighbour = pos.clone();
                    neighbour[ax] += sign;
                    if let Some(occupied) = self.occupancy.get(&neighbour) {
                        if occupied.index + 1 < k {
                            pairs.push((occupied.index, k));
                        }
                    }
                }
            }
        }
        pairs
            .into_iter()
            .sorted_unstable()
            .flat_map(|(i, j)| [(i, j), (j, i)])
            .collect()
    }

    /// Record a complete conformation as evaluated
    pub(crate) fn count_solution(&mut self) {
        self.solutions_checked += 1;
    }

    /// Record the move list of the best conformation seen so far
    pub(crate) fn record_best(&mut self, hash: Vec<Move>) {
        self.best_hash = Some(hash);
    }

    /// Overwrite both counters, used when restoring from a checkpoint and
    /// when merging worker counters after a parallel run
    pub(crate) fn set_counters(&mut self, solutions_checked: u64, aminos_placed: u64) {
        self.solutions_checked = solutions_checked;
        self.aminos_placed = aminos_placed;
    }
}

impl Display for Protein {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}D, {}/{} placed, score {})",
            self.sequence_string(),
            self.dim,
            self.cur_len(),
            self.sequence.len(),
            self.score
        )
    }
}
