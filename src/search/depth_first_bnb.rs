use std::path::{Path, PathBuf};

use log::debug;

use super::{remaining_bound, remaining_moves, remaining_moves_after, PruneMode};
use crate::checkpoint::{default_cache_dir, Checkpoint, Cursor};
use crate::error::FoldError;
use crate::lattice::Move;
use crate::protein::Protein;

/// The checkpoint identifier of the serial branch-and-bound engine
pub(crate) const ALGORITHM: &str = "depth_first_bnb";

/// Depth-first branch-and-bound over the same enumeration as
/// [`depth_first`](super::depth_first), pruning every subtree that cannot
/// strictly improve on the best score found so far. Checkpointing is enabled
/// when the cache directory environment variable is set, see
/// [`depth_first_bnb_with_cache`].
/// # Errors
/// Engine errors and checkpoint failures are propagated.
pub fn depth_first_bnb(protein: &mut Protein, mode: PruneMode) -> Result<i32, FoldError> {
    depth_first_bnb_with_cache(protein, mode, default_cache_dir().as_deref())
}

/// [`depth_first_bnb`] with an explicit checkpoint location. With a cache
/// directory the search periodically persists its state to
/// `<cache_dir>/depth_first_bnb/<sequence>.checkpoint` (on every improvement
/// and at completion) and resumes from that file when it already exists.
/// # Errors
/// Engine errors are propagated; an existing checkpoint that does not match
/// the current problem or cannot be parsed is [`FoldError::CheckpointCorrupt`].
pub fn depth_first_bnb_with_cache(
    protein: &mut Protein,
    mode: PruneMode,
    cache_dir: Option<&Path>,
) -> Result<i32, FoldError> {
    let n = protein.sequence().len();
    while protein.cur_len() > 1 {
        protein.remove_amino()?;
    }
    if n == 1 {
        return Ok(0);
    }
    let checkpoint_path: Option<PathBuf> =
        cache_dir.map(|dir| Checkpoint::path_for(dir, ALGORITHM, protein));

    let mut best = i32::MAX;
    let mut best_hash: Vec<Move> = Vec::new();
    let mut frames: Vec<Vec<Move>> = Vec::new();
    let mut resumed = false;

    if let Some(path) = &checkpoint_path {
        if path.exists() {
            let checkpoint = Checkpoint::load(path)?;
            checkpoint.validate(ALGORITHM, protein)?;
            best = checkpoint.best_score;
            best_hash.clone_from(&checkpoint.best_hash);
            protein.set_counters(checkpoint.solutions_checked, checkpoint.aminos_placed);
            match checkpoint.cursor {
                Cursor::Finished => {
                    protein.set_hash(&best_hash, false)?;
                    protein.record_best(best_hash);
                    return Ok(best);
                }
                Cursor::Stack(stack) => {
                    debug!(
                        "resuming {ALGORITHM} for {} from a depth {} cursor",
                        protein.sequence_string(),
                        stack.len()
                    );
                    protein.set_hash(&stack, false).map_err(|err| {
                        FoldError::checkpoint_corrupt(format!(
                            "the stored cursor is not replayable: {err}"
                        ))
                    })?;
                    for (i, taken) in stack.iter().enumerate().skip(1) {
                        frames.push(remaining_moves_after(protein.dim(), i + 1, *taken)?);
                    }
                    // step back from the checkpointed leaf and continue with
                    // its next sibling
                    protein.remove_amino()?;
                    resumed = true;
                }
                Cursor::Subtree(_) => {
                    return Err(FoldError::checkpoint_corrupt(
                        "a subtree cursor belongs to the parallel engine",
                    ));
                }
            }
        }
    }

    if !resumed {
        protein.place_amino(1, true)?;
        if protein.cur_len() == n {
            protein.count_solution();
            best = protein.score();
            best_hash = protein.hash_fold();
            write_improvement(checkpoint_path.as_deref(), protein, best, &best_hash)?;
        } else {
            frames.push(remaining_moves(protein.dim(), protein.cur_len()));
        }
    }

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
            if protein.score() < best {
                protein.count_solution();
                best = protein.score();
                best_hash = protein.hash_fold();
                debug!(
                    "{ALGORITHM} ({}) improved to {best}",
                    mode.name()
                );
                write_improvement(checkpoint_path.as_deref(), protein, best, &best_hash)?;
            }
            protein.remove_amino()?;
        } else if protein.score() - remaining_bound(protein, mode) >= best {
            protein.remove_amino()?;
        } else {
            frames.push(remaining_moves(protein.dim(), protein.cur_len()));
        }
    }

    protein.set_hash(&best_hash, false)?;
    protein.record_best(best_hash.clone());
    if let Some(path) = &checkpoint_path {
        Checkpoint::for_state(ALGORITHM, protein, best, best_hash, Cursor::Finished)
            .store(path)?;
    }
    Ok(best)
}

/// Persist an improvement with the current search position as the cursor
fn write_improvement(
    path: Option<&Path>,
    protein: &Protein,
    best: i32,
    best_hash: &[Move],
) -> Result<(), FoldError> {
    if let Some(path) = path {
        Checkpoint::for_state(
            ALGORITHM,
            protein,
            best,
            best_hash.to_vec(),
            Cursor::Stack(protein.hash_fold()),
        )
        .store(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::depth_first;
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("latfold-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test_log::test]
    fn naive_2d() {
        let mut protein = Protein::hp("PHPHPHPPH", 2).unwrap();
        assert_eq!(
            depth_first_bnb_with_cache(&mut protein, PruneMode::Naive, None).unwrap(),
            -3
        );
        assert_eq!(protein.score(), -3);
        assert_eq!(protein.solutions_checked(), 4);
        assert_eq!(protein.aminos_placed(), 137);
    }

    #[test]
    fn reach_2d() {
        let mut protein = Protein::hp("PHPHPHPPH", 2).unwrap();
        assert_eq!(
            depth_first_bnb_with_cache(&mut protein, PruneMode::ReachPrune, None).unwrap(),
            -3
        );
        assert_eq!(protein.solutions_checked(), 4);
        assert_eq!(protein.aminos_placed(), 103);
    }

    #[test]
    fn naive_3d() {
        let mut protein = Protein::hp("HPPHPHPHPH", 3).unwrap();
        assert_eq!(
            depth_first_bnb_with_cache(&mut protein, PruneMode::Naive, None).unwrap(),
            -4
        );
        assert_eq!(protein.solutions_checked(), 5);
        assert_eq!(protein.aminos_placed(), 135_194);
    }

    #[test]
    fn reach_3d() {
        let mut protein = Protein::hp("HPPHPHPHPH", 3).unwrap();
        assert_eq!(
            depth_first_bnb_with_cache(&mut protein, PruneMode::ReachPrune, None).unwrap(),
            -4
        );
        assert_eq!(protein.solutions_checked(), 5);
        assert_eq!(protein.aminos_placed(), 17_201);
    }

    #[test]
    fn reach_prune_does_less_work() {
        let mut naive = Protein::hp("PHPHPHPPH", 2).unwrap();
        let mut reach = Protein::hp("PHPHPHPPH", 2).unwrap();
        depth_first_bnb_with_cache(&mut naive, PruneMode::Naive, None).unwrap();
        depth_first_bnb_with_cache(&mut reach, PruneMode::ReachPrune, None).unwrap();
        assert!(reach.aminos_placed() < naive.aminos_placed());
    }

    #[test]
    fn agrees_with_exhaustive_search() {
        for (sequence, dim) in [("HPPHPPHH", 2), ("PHPHPHPPH", 2), ("HPPHPPHH", 3)] {
            let mut exhaustive = Protein::hp(sequence, dim).unwrap();
            let reference = depth_first(&mut exhaustive).unwrap();
            for mode in [PruneMode::Naive, PruneMode::ReachPrune] {
                let mut pruned = Protein::hp(sequence, dim).unwrap();
                assert_eq!(
                    depth_first_bnb_with_cache(&mut pruned, mode, None).unwrap(),
                    reference
                );
            }
        }
    }

    #[test]
    fn no_checkpoint_without_cache_dir() {
        let dir = scratch_dir("bnb-nocache");
        let mut protein = Protein::hp("PHPHPHPPH", 2).unwrap();
        depth_first_bnb_with_cache(&mut protein, PruneMode::Naive, None).unwrap();
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn checkpoints_are_deterministic() {
        let dir = scratch_dir("bnb-deterministic");
        let path = dir
            .join(ALGORITHM)
            .join("PHPHPHPPH.checkpoint");

        let mut protein = Protein::hp("PHPHPHPPH", 2).unwrap();
        depth_first_bnb_with_cache(&mut protein, PruneMode::Naive, Some(&dir)).unwrap();
        assert!(path.exists());
        let first = fs::read(&path).unwrap();

        fs::remove_file(&path).unwrap();
        let mut protein = Protein::hp("PHPHPHPPH", 2).unwrap();
        depth_first_bnb_with_cache(&mut protein, PruneMode::Naive, Some(&dir)).unwrap();
        assert_eq!(fs::read(&path).unwrap(), first);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn finished_checkpoint_restores_the_run() {
        let dir = scratch_dir("bnb-restore");
        let mut protein = Protein::hp("PHPHPHPPH", 2).unwrap();
        depth_first_bnb_with_cache(&mut protein, PruneMode::Naive, Some(&dir)).unwrap();
        let counters = (protein.solutions_checked(), protein.aminos_placed());

        let mut rerun = Protein::hp("PHPHPHPPH", 2).unwrap();
        let score =
            depth_first_bnb_with_cache(&mut rerun, PruneMode::Naive, Some(&dir)).unwrap();
        assert_eq!(score, -3);
        assert_eq!(rerun.score(), -3);
        assert_eq!((rerun.solutions_checked(), rerun.aminos_placed()), counters);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn resume_from_a_mid_run_cursor() {
        let dir = scratch_dir("bnb-resume");
        // full reference run
        let mut reference = Protein::hp("PHPHPHPPH", 2).unwrap();
        depth_first_bnb_with_cache(&mut reference, PruneMode::Naive, Some(&dir)).unwrap();
        let path = dir.join(ALGORITHM).join("PHPHPHPPH.checkpoint");
        let finished = fs::read(&path).unwrap();
        fs::remove_file(&path).unwrap();

        // the state written at the first improvement: the first enumerated
        // leaf (two fixed moves, then the most negative axis all the way)
        let first_leaf = vec![1, 1, -2, -2, -2, -2, -2, -2];
        let probe = Protein::hp("PHPHPHPPH", 2).unwrap();
        let mut mid = Checkpoint::for_state(
            ALGORITHM,
            &probe,
            0,
            first_leaf.clone(),
            Cursor::Stack(first_leaf),
        );
        mid.solutions_checked = 1;
        mid.aminos_placed = 9;
        mid.store(&path).unwrap();

        let mut resumed = Protein::hp("PHPHPHPPH", 2).unwrap();
        let score =
            depth_first_bnb_with_cache(&mut resumed, PruneMode::Naive, Some(&dir)).unwrap();
        assert_eq!(score, -3);
        assert_eq!(resumed.solutions_checked(), 4);
        assert_eq!(resumed.aminos_placed(), 137);
        assert_eq!(fs::read(&path).unwrap(), finished);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn foreign_checkpoints_are_rejected() {
        let dir = scratch_dir("bnb-foreign");
        let mut other = Protein::hp("PHPHPHPPH", 3).unwrap();
        depth_first_bnb_with_cache(&mut other, PruneMode::Naive, Some(&dir)).unwrap();
        // same sequence, different dimension
        let mut protein = Protein::hp("PHPHPHPPH", 2).unwrap();
        assert!(matches!(
            depth_first_bnb_with_cache(&mut protein, PruneMode::Naive, Some(&dir)),
            Err(FoldError::CheckpointCorrupt(_))
        ));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unparseable_checkpoints_are_rejected() {
        let dir = scratch_dir("bnb-garbage");
        let path = dir.join(ALGORITHM).join("PHPHPHPPH.checkpoint");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"not a checkpoint").unwrap();
        let mut protein = Protein::hp("PHPHPHPPH", 2).unwrap();
        assert!(matches!(
            depth_first_bnb_with_cache(&mut protein, PruneMode::Naive, Some(&dir)),
            Err(FoldError::CheckpointCorrupt(_))
        ));
        fs::remove_dir_all(&dir).unwrap();
    }
}
