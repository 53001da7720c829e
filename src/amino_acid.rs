use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::error::FoldError;

/// An amino acid class of the HP model. The alphabet only distinguishes
/// hydrophobic and polar residues; the energy contribution of any pair is
/// defined by the [`BondTable`](crate::BondTable) of the conformation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AminoAcid {
    /// `H`, forms stabilising contacts with other hydrophobic residues
    Hydrophobic,
    /// `P`, does not contribute to the energy in the default model
    Polar,
}

impl AminoAcid {
    /// All classes of the alphabet
    pub const ALL: [Self; 2] = [Self::Hydrophobic, Self::Polar];

    /// The one letter code for this amino acid class
    pub const fn char(self) -> char {
        match self {
            Self::Hydrophobic => 'H',
            Self::Polar => 'P',
        }
    }
}

impl TryFrom<char> for AminoAcid {
    type Error = ();
    fn try_from(value: char) -> Result<Self, Self::Error> {
        match value {
            'H' => Ok(Self::Hydrophobic),
            'P' => Ok(Self::Polar),
            _ => Err(()),
        }
    }
}

impl TryFrom<u8> for AminoAcid {
    type Error = ();
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            b'H' => Ok(Self::Hydrophobic),
            b'P' => Ok(Self::Polar),
            _ => Err(()),
        }
    }
}

impl Display for AminoAcid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.char())
    }
}

/// Parse a residue sequence from its one letter codes
/// # Errors
/// When the sequence contains a character outside the alphabet.
pub fn parse_sequence(sequence: &str) -> Result<Vec<AminoAcid>, FoldError> {
    sequence
        .chars()
        .map(|c| {
            AminoAcid::try_from(c).map_err(|()| {
                FoldError::invalid_input(format!("unknown amino acid symbol: {c}"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        assert_eq!(
            parse_sequence("HPPH").unwrap(),
            vec![
                AminoAcid::Hydrophobic,
                AminoAcid::Polar,
                AminoAcid::Polar,
                AminoAcid::Hydrophobic
            ]
        );
        assert!(parse_sequence("HPX").is_err());
    }

    #[test]
    fn round_trip() {
        for amino in AminoAcid::ALL {
            assert_eq!(AminoAcid::try_from(amino.char()), Ok(amino));
        }
    }
}
