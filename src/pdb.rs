//! Export folded conformations as PDB Cα traces for downstream viewers.
//!
//! Each placed residue becomes one Cα atom on a 3.8 Å lattice spacing,
//! hydrophobic residues as `ALA` and polar residues as `SER`, with CONECT
//! records tying consecutive residues together. Coordinates are shifted by a
//! non-negative offset so every emitted coordinate is at least zero.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::amino_acid::AminoAcid;
use crate::error::FoldError;
use crate::helpers::ordered_positions;
use crate::protein::Protein;

/// The Cα-Cα distance of consecutive residues, in Ångström
const CA_SPACING: f64 = 3.8;

/// Render the placed chain prefix as the contents of a PDB file.
/// # Errors
/// [`FoldError::InvalidInput`] for conformations that are not 2 or 3
/// dimensional, the only ones the format can express.
pub fn to_pdb(protein: &Protein) -> Result<String, FoldError> {
    if protein.dim() != 2 && protein.dim() != 3 {
        return Err(FoldError::invalid_input(format!(
            "PDB export is only defined for 2D and 3D structures, got {}D",
            protein.dim()
        )));
    }
    let positions = ordered_positions(protein);
    let offsets: Vec<i32> = (0..protein.dim())
        .map(|ax| -positions.iter().map(|(pos, _)| pos[ax]).min().unwrap_or(0))
        .map(|shift| shift.max(0))
        .collect();

    let mut output = String::new();
    output.push_str("HEADER    HP-protein folding structure\n");
    let _ = writeln!(output, "TITLE     Sequence: {}", protein.sequence_string());
    output.push_str("REMARK    Generated using latfold\n");
    for (serial, (pos, amino)) in positions.iter().enumerate() {
        let serial = serial + 1;
        let name = match amino {
            AminoAcid::Hydrophobic => "ALA",
            AminoAcid::Polar => "SER",
        };
        let coordinate = |ax: usize| {
            if ax < protein.dim() {
                f64::from(pos[ax] + offsets[ax]) * CA_SPACING
            } else {
                0.0
            }
        };
        let _ = writeln!(
            output,
            "ATOM  {serial:5}  CA  {name:>3} A{serial:4}    {:8.3}{:8.3}{:8.3}  1.00  0.00           C",
            coordinate(0),
            coordinate(1),
            coordinate(2),
        );
    }
    let total = positions.len();
    if total > 1 {
        let _ = writeln!(output, "CONECT {:>4} {:>4}", 1, 2);
    }
    for serial in 2..total {
        let _ = writeln!(output, "CONECT {:>4} {:>4} {:>4}", serial, serial - 1, serial + 1);
    }
    output.push_str("END\n");
    Ok(output)
}

/// Write the placed chain prefix to a PDB file.
/// # Errors
/// [`FoldError::InvalidInput`] when the conformation is not 2D or 3D, the
/// path does not end in `.pdb`, or the file cannot be written.
pub fn save_pdb(protein: &Protein, path: &Path) -> Result<(), FoldError> {
    if path.extension().and_then(|e| e.to_str()) != Some("pdb") {
        return Err(FoldError::invalid_input(format!(
            "PDB files must end in .pdb: {}",
            path.display()
        )));
    }
    let content = to_pdb(protein)?;
    fs::write(path, content).map_err(|err| {
        FoldError::invalid_input(format!("could not write {}: {err}", path.display()))
    })
}
