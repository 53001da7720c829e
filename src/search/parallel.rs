use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::Mutex;

use log::debug;
use rayon::prelude::*;

use super::{remaining_bound, remaining_moves, PruneMode};
use crate::checkpoint::{default_cache_dir, Checkpoint, Cursor};
use crate::error::FoldError;
use crate::lattice::{moves_ascending, moves_positive, Move};
use crate::protein::Protein;

/// The checkpoint identifier of the parallel branch-and-bound engine
pub(crate) const ALGORITHM: &str = "depth_first_bnb_parallel";

/// How many moves deep the enumeration is split into worker subtrees
const SPLIT_MOVES: usize = 4;

/// Everything the workers share: the scalar bound, the best conformation,
/// the summed counters, and the checkpoint progress. Workers never exchange
/// partial conformations, they only exchange the bound; the move list is
/// only touched under the lock when publishing an improvement.
struct Shared {
    best: AtomicI32,
    best_hash: Mutex<Vec<Move>>,
    solutions_checked: AtomicU64,
    aminos_placed: AtomicU64,
    progress: Mutex<Progress>,
}

struct Progress {
    completed: BTreeSet<usize>,
    watermark: usize,
}

/// Branch-and-bound with the subtrees below the split depth distributed
/// over a rayon fork/join pool. `workers` selects the pool size, the global
/// pool is used when unset. The best score equals the serial result on the
/// same inputs; the retained conformation may be any of the tied optima and
/// the diagnostic counters depend on worker timing.
/// # Errors
/// Engine errors and checkpoint failures are propagated.
pub fn depth_first_bnb_parallel(
    protein: &mut Protein,
    mode: PruneMode,
    workers: Option<usize>,
) -> Result<i32, FoldError> {
    depth_first_bnb_parallel_with_cache(protein, mode, workers, default_cache_dir().as_deref())
}

/// [`depth_first_bnb_parallel`] with an explicit checkpoint location. The
/// checkpoint cursor is the contiguous completed-subtree watermark: on
/// resume every subtree below it is skipped.
/// # Errors
/// See [`depth_first_bnb_parallel`].
pub fn depth_first_bnb_parallel_with_cache(
    protein: &mut Protein,
    mode: PruneMode,
    workers: Option<usize>,
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

    let mut start_index = 0;
    let mut initial_best = i32::MAX;
    let mut initial_hash: Vec<Move> = Vec::new();
    let mut base_counters = (0, 0);

    if let Some(path) = &checkpoint_path {
        if path.exists() {
            let checkpoint = Checkpoint::load(path)?;
            checkpoint.validate(ALGORITHM, protein)?;
            match checkpoint.cursor {
                Cursor::Finished => {
                    protein.set_counters(checkpoint.solutions_checked, checkpoint.aminos_placed);
                    protein.set_hash(&checkpoint.best_hash, false)?;
                    protein.record_best(checkpoint.best_hash);
                    return Ok(checkpoint.best_score);
                }
                Cursor::Subtree(watermark) => {
                    debug!(
                        "resuming {ALGORITHM} for {} at subtree {watermark}",
                        protein.sequence_string()
                    );
                    start_index = watermark;
                    initial_best = checkpoint.best_score;
                    initial_hash = checkpoint.best_hash;
                    base_counters = (checkpoint.solutions_checked, checkpoint.aminos_placed);
                }
                Cursor::Stack(_) => {
                    return Err(FoldError::checkpoint_corrupt(
                        "a stack cursor belongs to the serial engine",
                    ));
                }
            }
        }
    }

    let prefixes = collect_prefixes(protein)?;
    if start_index > prefixes.len() {
        return Err(FoldError::checkpoint_corrupt(format!(
            "subtree cursor {start_index} is beyond the {} element work list",
            prefixes.len()
        )));
    }
    let shared = Shared {
        best: AtomicI32::new(initial_best),
        best_hash: Mutex::new(initial_hash),
        solutions_checked: AtomicU64::new(0),
        aminos_placed: AtomicU64::new(0),
        progress: Mutex::new(Progress {
            completed: BTreeSet::new(),
            watermark: start_index,
        }),
    };

    let mut base = protein.clone();
    base.set_counters(0, 0);
    let run = || {
        prefixes[start_index..]
            .par_iter()
            .enumerate()
            .try_for_each(|(offset, prefix)| {
                let mut local = base.clone();
                solve_subtree(&mut local, prefix, mode, &shared)?;
                shared
                    .solutions_checked
                    .fetch_add(local.solutions_checked(), Ordering::Relaxed);
                shared
                    .aminos_placed
                    .fetch_add(local.aminos_placed(), Ordering::Relaxed);
                finish_subtree(
                    start_index + offset,
                    &shared,
                    checkpoint_path.as_deref(),
                    &local,
                )
            })
    };
    match workers {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|err| {
                FoldError::invalid_input(format!("could not build the worker pool: {err}"))
            })?
            .install(run),
        None => run(),
    }?;

    let best = shared.best.load(Ordering::SeqCst);
    let best_hash = shared
        .best_hash
        .into_inner()
        .expect("a worker panicked while publishing an improvement");
    protein.set_counters(
        base_counters.0 + shared.solutions_checked.into_inner(),
        1 + base_counters.1 + shared.aminos_placed.into_inner(),
    );
    protein.set_hash(&best_hash, false)?;
    protein.record_best(best_hash.clone());
    if let Some(path) = &checkpoint_path {
        Checkpoint::for_state(ALGORITHM, protein, best, best_hash, Cursor::Finished)
            .store(path)?;
    }
    Ok(best)
}

/// All partial conformations at the split depth, in canonical enumeration
/// order. Enumerated with untracked placements on the caller's engine, which
/// is rewound afterwards.
fn collect_prefixes(protein: &mut Protein) -> Result<Vec<Vec<Move>>, FoldError> {
    fn recurse(
        protein: &mut Protein,
        split: usize,
        out: &mut Vec<Vec<Move>>,
    ) -> Result<(), FoldError> {
        if protein.cur_len() == split + 1 {
            out.push(protein.hash_fold());
            return Ok(());
        }
        let moves = match protein.cur_len() {
            1 => vec![1],
            2 => moves_positive(protein.dim()),
            _ => moves_ascending(protein.dim()),
        };
        for m in moves {
            if protein.is_valid(m) {
                protein.place_amino(m, false)?;
                recurse(protein, split, out)?;
                protein.remove_amino()?;
            }
        }
        Ok(())
    }

    let split = SPLIT_MOVES.min(protein.sequence().len() - 1);
    let mut prefixes = Vec::new();
    recurse(protein, split, &mut prefixes)?;
    Ok(prefixes)
}

/// Run the serial pruned search below one work-list prefix, reading the
/// shared bound on every check and publishing strict improvements.
fn solve_subtree(
    protein: &mut Protein,
    prefix: &[Move],
    mode: PruneMode,
    shared: &Shared,
) -> Result<(), FoldError> {
    let n = protein.sequence().len();
    protein.set_hash(prefix, true)?;

    if protein.cur_len() == n {
        publish_improvement(protein, shared);
        return Ok(());
    }
    // a subtree that cannot improve any more is skipped as a whole
    if protein.score() - remaining_bound(protein, mode) >= shared.best.load(Ordering::Relaxed) {
        return Ok(());
    }

    let root_len = protein.cur_len();
    let mut frames = vec![remaining_moves(protein.dim(), protein.cur_len())];
    while !frames.is_empty() {
        let Some(m) = frames.last_mut().and_then(Vec::pop) else {
            frames.pop();
            if protein.cur_len() > root_len {
                protein.remove_amino()?;
            }
            continue;
        };
        if !protein.is_valid(m) {
            continue;
        }
        protein.place_amino(m, true)?;
        if protein.cur_len() == n {
            publish_improvement(protein, shared);
            protein.remove_amino()?;
        } else if protein.score() - remaining_bound(protein, mode)
            >= shared.best.load(Ordering::Relaxed)
        {
            protein.remove_amino()?;
        } else {
            frames.push(remaining_moves(protein.dim(), protein.cur_len()));
        }
    }
    Ok(())
}

/// Publish a strict improvement: the (score, hash) pair is written under the
/// lock so the two always stay consistent, while pure bound readers only
/// load the atomic and never contend on the lock
fn publish_improvement(protein: &mut Protein, shared: &Shared) {
    let score = protein.score();
    // cheap pre-check outside the lock, the bound only ever decreases
    if score >= shared.best.load(Ordering::Relaxed) {
        return;
    }
    let mut hash = shared
        .best_hash
        .lock()
        .expect("a worker panicked while publishing an improvement");
    if shared
        .best
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
            (score < current).then_some(score)
        })
        .is_ok()
    {
        *hash = protein.hash_fold();
        protein.count_solution();
        debug!("{ALGORITHM} improved to {score}");
    }
}

/// Mark a subtree as fully explored and move the contiguous watermark,
/// checkpointing the progress when enabled
fn finish_subtree(
    index: usize,
    shared: &Shared,
    checkpoint_path: Option<&Path>,
    local: &Protein,
) -> Result<(), FoldError> {
    let mut progress = shared
        .progress
        .lock()
        .expect("a worker panicked while recording progress");
    progress.completed.insert(index);
    loop {
        let watermark = progress.watermark;
        if !progress.completed.remove(&watermark) {
            break;
        }
        progress.watermark += 1;
    }
    if let Some(path) = checkpoint_path {
        let mut state = Checkpoint::for_state(
            ALGORITHM,
            local,
            shared.best.load(Ordering::SeqCst),
            shared
                .best_hash
                .lock()
                .expect("a worker panicked while publishing an improvement")
                .clone(),
            Cursor::Subtree(progress.watermark),
        );
        state.solutions_checked = shared.solutions_checked.load(Ordering::Relaxed);
        state.aminos_placed = shared.aminos_placed.load(Ordering::Relaxed);
        state.store(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::{depth_first_bnb_with_cache, PruneMode};
    use super::*;
    use std::fs;

    #[test_log::test]
    fn matches_the_serial_result_2d() {
        let mut serial = Protein::hp("PHPHPHPPH", 2).unwrap();
        let reference =
            depth_first_bnb_with_cache(&mut serial, PruneMode::Naive, None).unwrap();
        for workers in [None, Some(2), Some(4)] {
            let mut protein = Protein::hp("PHPHPHPPH", 2).unwrap();
            let score = depth_first_bnb_parallel_with_cache(
                &mut protein,
                PruneMode::Naive,
                workers,
                None,
            )
            .unwrap();
            assert_eq!(score, reference);
            assert_eq!(protein.score(), reference);
            assert!(protein.solutions_checked() >= 1);
        }
    }

    #[test]
    fn matches_the_serial_result_3d() {
        let mut serial = Protein::hp("HPPHPPHH", 3).unwrap();
        let reference =
            depth_first_bnb_with_cache(&mut serial, PruneMode::ReachPrune, None).unwrap();
        let mut protein = Protein::hp("HPPHPPHH", 3).unwrap();
        let score = depth_first_bnb_parallel_with_cache(
            &mut protein,
            PruneMode::ReachPrune,
            Some(3),
            None,
        )
        .unwrap();
        assert_eq!(score, reference);
    }

    #[test]
    fn short_chains_split_into_leaf_subtrees() {
        let mut protein = Protein::hp("HPPH", 2).unwrap();
        let score =
            depth_first_bnb_parallel_with_cache(&mut protein, PruneMode::Naive, Some(2), None)
                .unwrap();
        assert_eq!(score, -1);
        assert_eq!(protein.score(), -1);
    }

    #[test]
    fn work_list_enumerates_the_reduced_tree() {
        let mut protein = Protein::hp("PHPHPHPPH", 2).unwrap();
        let prefixes = collect_prefixes(&mut protein).unwrap();
        assert_eq!(protein.cur_len(), 1);
        assert!(prefixes.iter().all(|p| p.len() == 4));
        assert!(prefixes.iter().all(|p| p[0] == 1 && p[1] > 0));
        // canonical order is deterministic
        let again = collect_prefixes(&mut protein).unwrap();
        assert_eq!(prefixes, again);
    }

    #[test]
    fn finished_checkpoint_restores_the_run() {
        let dir = std::env::temp_dir().join(format!("latfold-par-restore-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let mut protein = Protein::hp("PHPHPHPPH", 2).unwrap();
        let score = depth_first_bnb_parallel_with_cache(
            &mut protein,
            PruneMode::Naive,
            Some(2),
            Some(&dir),
        )
        .unwrap();
        let counters = (protein.solutions_checked(), protein.aminos_placed());

        let mut rerun = Protein::hp("PHPHPHPPH", 2).unwrap();
        let rerun_score = depth_first_bnb_parallel_with_cache(
            &mut rerun,
            PruneMode::Naive,
            Some(2),
            Some(&dir),
        )
        .unwrap();
        assert_eq!(rerun_score, score);
        assert_eq!((rerun.solutions_checked(), rerun.aminos_placed()), counters);
        fs::remove_dir_all(&dir).unwrap();
    }
}
