//! Load tabular sequence datasets: CSV files with an `id,sequence` header,
//! one record per line.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::amino_acid::parse_sequence;
use crate::error::FoldError;

/// One dataset record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRecord {
    /// The identifier of the sequence within its dataset
    pub id: String,
    /// The residue sequence as one letter codes
    pub sequence: String,
}

/// Parse dataset contents.
/// # Errors
/// [`FoldError::InvalidInput`] when the header is missing, a line has no
/// separator, or a sequence contains a symbol outside the alphabet.
pub fn parse_dataset(content: &str) -> Result<Vec<DatasetRecord>, FoldError> {
    let mut lines = content.lines().enumerate();
    match lines.next() {
        Some((_, "id,sequence")) => (),
        Some((_, header)) => {
            return Err(FoldError::invalid_input(format!(
                "expected the header 'id,sequence', got '{header}'"
            )))
        }
        None => return Err(FoldError::invalid_input("the dataset is empty")),
    }
    let mut records = Vec::new();
    for (index, line) in lines {
        if line.is_empty() {
            continue;
        }
        let (id, sequence) = line.split_once(',').ok_or_else(|| {
            FoldError::invalid_input(format!("line {} has no separator", index + 1))
        })?;
        parse_sequence(sequence)?;
        records.push(DatasetRecord {
            id: id.to_string(),
            sequence: sequence.to_string(),
        });
    }
    Ok(records)
}

/// Load a dataset from disk.
/// # Errors
/// [`FoldError::InvalidInput`] when the file cannot be read or its contents
/// are malformed, see [`parse_dataset`].
pub fn load_dataset(path: &Path) -> Result<Vec<DatasetRecord>, FoldError> {
    let content = fs::read_to_string(path).map_err(|err| {
        FoldError::invalid_input(format!("could not read {}: {err}", path.display()))
    })?;
    parse_dataset(&content)
}
