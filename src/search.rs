//! Exhaustive scoring of candidate grids, sequentially or on a worker pool.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use log::debug;
use num_traits::float::FloatCore;

use crate::Float;
use crate::error::{Result, SearchError};
use crate::geometry::PointSet;
use crate::nearest::NearestNeighbors;
use crate::transform::{PointTransform, transform_points};

/// The best candidate of a search together with its score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchResult<F: Float> {
    /// Transform to apply to the moving points.
    pub transform: PointTransform<F>,
    /// Mean distance from the transformed moving points to their nearest fixed point.
    pub score: F,
}

fn validate_inputs<F: Float>(
    grid: &[Vec<PointTransform<F>>],
    fixed: &PointSet<F>,
    moving: &PointSet<F>,
) -> Result<()> {
    fixed.validate("fixed")?;
    moving.validate("moving")?;
    if grid.iter().all(Vec::is_empty) {
        return Err(SearchError::invalid_input(
            "grid contains no candidate transforms",
        ));
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_owned()
    }
}

#[cfg(test)]
thread_local! {
    static PANIC_IN_CHUNK: std::cell::Cell<Option<usize>> = const { std::cell::Cell::new(None) };
}

/// Score every candidate of one chunk and keep the first one with the lowest score.
fn score_chunk<F: Float>(
    index: usize,
    chunk: &[PointTransform<F>],
    nearest: &NearestNeighbors<F>,
    moving: &PointSet<F>,
) -> Result<Option<SearchResult<F>>> {
    #[cfg(test)]
    if PANIC_IN_CHUNK.with(|c| c.get()) == Some(index) {
        panic!("scoring chunk {index} failed");
    }

    let mut best: Option<SearchResult<F>> = None;

    for transform in chunk {
        let moved = transform_points(moving, transform);
        if moved
            .iter()
            .any(|p| !(FloatCore::is_finite(p.x) && FloatCore::is_finite(p.y)))
        {
            return Err(SearchError::worker_failure(
                index,
                format!("{transform:?} produces non-finite points"),
            ));
        }

        let score = nearest.mean_distance(&moved)?;
        if !FloatCore::is_finite(score) {
            return Err(SearchError::worker_failure(
                index,
                format!("{transform:?} has non-finite score {score:?}"),
            ));
        }
        if best.as_ref().is_none_or(|b| score < b.score) {
            best = Some(SearchResult {
                transform: *transform,
                score,
            });
        }
    }

    Ok(best)
}

/// Evaluate one chunk, turning a panic into a [`SearchError::WorkerFailure`].
fn evaluate_chunk<F: Float>(
    index: usize,
    chunk: &[PointTransform<F>],
    nearest: &NearestNeighbors<F>,
    moving: &PointSet<F>,
) -> Result<Option<SearchResult<F>>> {
    panic::catch_unwind(AssertUnwindSafe(|| {
        score_chunk(index, chunk, nearest, moving)
    }))
    .unwrap_or_else(|payload| {
        Err(SearchError::worker_failure(
            index,
            panic_message(payload.as_ref()),
        ))
    })
}

/// Reduce per-chunk results in chunk order. On equal scores the earlier chunk wins.
fn reduce<F: Float>(results: Vec<Option<SearchResult<F>>>) -> Result<SearchResult<F>> {
    let best = results
        .into_iter()
        .flatten()
        .reduce(|best, r| if r.score < best.score { r } else { best })
        .ok_or_else(|| SearchError::invalid_input("grid contains no candidate transforms"))?;
    debug!(
        "Best candidate {:?} with score {:?}.",
        best.transform, best.score
    );
    Ok(best)
}

/// Find the candidate of `grid` that brings `moving` closest to `fixed`, chunk by chunk.
///
/// Returns the same result as [`parallel_grid_search_point_transform`] without a worker pool.
pub fn grid_search_point_transform<F: Float>(
    grid: &[Vec<PointTransform<F>>],
    fixed: &PointSet<F>,
    moving: &PointSet<F>,
) -> Result<SearchResult<F>> {
    validate_inputs(grid, fixed, moving)?;
    let nearest = NearestNeighbors::new(fixed)?;

    let results = grid
        .iter()
        .enumerate()
        .map(|(i, chunk)| evaluate_chunk(i, chunk, &nearest, moving))
        .collect::<Result<Vec<_>>>()?;
    reduce(results)
}

#[cfg(feature = "parallel")]
pub use parallel::*;

#[cfg(feature = "parallel")]
mod parallel {
    use super::*;
    use rayon::prelude::*;
    use rayon::{ThreadPool, ThreadPoolBuilder};

    /// Create a worker pool with `threads` workers, or as many as the system offers.
    pub fn build_pool(threads: Option<usize>) -> Result<ThreadPool> {
        let mut builder = ThreadPoolBuilder::new();
        if let Some(threads) = threads {
            builder = builder.num_threads(threads);
        }
        builder
            .build()
            .map_err(|e| SearchError::ResourceExhaustion(e.to_string()))
    }

    /// Find the candidate of `grid` that brings `moving` closest to `fixed`, one task per chunk.
    ///
    /// Every chunk is scored on `pool` against a kd-tree of `fixed` shared by all tasks.
    /// Local results are kept in chunk order before reduction, so the outcome does not
    /// depend on scheduling. The first failing chunk aborts the search.
    pub fn parallel_grid_search_point_transform<F: Float>(
        pool: &ThreadPool,
        grid: &[Vec<PointTransform<F>>],
        fixed: &PointSet<F>,
        moving: &PointSet<F>,
    ) -> Result<SearchResult<F>> {
        validate_inputs(grid, fixed, moving)?;
        let nearest = NearestNeighbors::new(fixed)?;

        let results = pool.install(|| {
            grid.par_iter()
                .enumerate()
                .map(|(i, chunk)| evaluate_chunk(i, chunk, &nearest, moving))
                .collect::<Result<Vec<_>>>()
        })?;
        reduce(results)
    }
}
