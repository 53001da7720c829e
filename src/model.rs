//! The energy model: a symmetric bond table over the amino acid alphabet
//! plus the named presets recognised in configurations.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::amino_acid::AminoAcid;
use crate::error::FoldError;

/// A symmetric mapping from unordered amino acid pairs to their energy
/// contribution. Pairs are stored under a canonical key so that two tables
/// with the same entries are equal and serialise to the same bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondTable {
    values: BTreeMap<(AminoAcid, AminoAcid), i32>,
}

impl BondTable {
    /// Create a bond table from explicit pair entries. Entries are
    /// canonicalised, a pair given twice keeps the last value.
    pub fn new(entries: impl IntoIterator<Item = ((AminoAcid, AminoAcid), i32)>) -> Self {
        Self {
            values: entries
                .into_iter()
                .map(|((a, b), value)| ((a.min(b), a.max(b)), value))
                .collect(),
        }
    }

    /// The default HP model table: bond(H, H) = -1, all other pairs 0
    pub fn hp() -> Self {
        Self::new([
            ((AminoAcid::Hydrophobic, AminoAcid::Hydrophobic), -1),
            ((AminoAcid::Hydrophobic, AminoAcid::Polar), 0),
            ((AminoAcid::Polar, AminoAcid::Polar), 0),
        ])
    }

    /// The energy contribution of an unordered pair, 0 when not listed
    pub fn bond(&self, a: AminoAcid, b: AminoAcid) -> i32 {
        self.values
            .get(&(a.min(b), a.max(b)))
            .copied()
            .unwrap_or(0)
    }

    /// Whether the table has an entry for every pair this class occurs in
    pub fn covers(&self, amino: AminoAcid) -> bool {
        AminoAcid::ALL
            .iter()
            .all(|other| self.values.contains_key(&(amino.min(*other), amino.max(*other))))
    }

    /// The magnitude of the best (most negative) bond this class can make
    /// with any partner, 0 when it can only make neutral or positive bonds
    pub fn max_negative_bond(&self, amino: AminoAcid) -> i32 {
        AminoAcid::ALL
            .iter()
            .map(|other| -self.bond(amino, *other))
            .max()
            .unwrap_or(0)
            .max(0)
    }

    /// Whether this class can contribute negatively to the score at all
    pub fn is_scoring(&self, amino: AminoAcid) -> bool {
        self.max_negative_bond(amino) > 0
    }
}

impl Default for BondTable {
    fn default() -> Self {
        Self::hp()
    }
}

/// A named bond table preset
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Model {
    /// The hydrophobic-polar model: H-H contacts score -1, everything else 0
    #[default]
    HP,
}

impl Model {
    /// The bond table realising this preset
    pub fn bond_table(self) -> BondTable {
        match self {
            Self::HP => BondTable::hp(),
        }
    }
}

impl Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HP => write!(f, "HP"),
        }
    }
}

impl FromStr for Model {
    type Err = FoldError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HP" => Ok(Self::HP),
            _ => Err(FoldError::invalid_input(format!(
                "unknown model preset: {s}"
            ))),
        }
    }
}
