//! Parallel scoring of corpus groups.
//!
//! The corpus is cut into partitions of `partition_size` candidates, and each
//! partition into contiguous groups of `chunk_size`. Partitions form a task
//! queue drained by a fixed number of scoped worker threads: each worker claims
//! the next partition index from an atomic counter, scores its groups and sends
//! them back over a channel. The caller gets the groups back in corpus order
//! once every partition has been scored, so the result does not depend on which
//! worker finished first.

use std::{
    ops::Range,
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc,
    },
    thread,
};

use crate::{
    score::{ScoreSet, Scorer},
    stats::{Candidate, Stats},
};

/// A group of corpus positions and its score.
#[derive(Debug, Clone)]
pub(crate) struct ScoredGroup {
    pub(crate) range: Range<usize>,
    pub(crate) score: ScoreSet,
}

/// Splits `0..len` into consecutive ranges of at most `size` elements.
pub(crate) fn split_ranges(range: Range<usize>, size: usize) -> Vec<Range<usize>> {
    assert!(size > 0);
    range
        .clone()
        .step_by(size)
        .map(|start| start..usize::min(start + size, range.end))
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PoolParams {
    pub(crate) partition_size: usize,
    pub(crate) chunk_size: usize,
    pub(crate) workers: usize,
}

/// Scores every group of `corpus` against `acc`.
///
/// Blocks until all groups are scored. Groups are returned in corpus order.
pub(crate) fn score_groups(
    scorer: &Scorer,
    acc: &Stats,
    corpus: &[Candidate],
    params: PoolParams,
) -> Vec<ScoredGroup> {
    let partitions = split_ranges(0..corpus.len(), params.partition_size);
    let workers = params.workers.clamp(1, partitions.len().max(1));
    let next = AtomicUsize::new(0);
    let mut results: Vec<Option<Vec<ScoredGroup>>> = vec![None; partitions.len()];

    thread::scope(|s| {
        let (tx, rx) = mpsc::channel();
        for _ in 0..workers {
            let tx = tx.clone();
            let partitions = &partitions;
            let next = &next;
            s.spawn(move || {
                loop {
                    let i = next.fetch_add(1, Ordering::Relaxed);
                    let Some(partition) = partitions.get(i) else {
                        break;
                    };
                    let groups = split_ranges(partition.clone(), params.chunk_size)
                        .into_iter()
                        .map(|range| {
                            let score = scorer.score(acc, &corpus[range.clone()]);
                            ScoredGroup { range, score }
                        })
                        .collect::<Vec<_>>();
                    if tx.send((i, groups)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);
        for (i, groups) in rx {
            results[i] = Some(groups);
        }
    });

    results
        .into_iter()
        .flat_map(|groups| groups.expect("every partition should be scored"))
        .collect()
}

/// Number of scoring threads to use when none is configured.
pub(crate) fn default_workers() -> usize {
    thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}
