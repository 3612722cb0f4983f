//! Hierarchical search drivers and their configuration.

use std::num::NonZeroUsize;
use std::thread;

use log::{debug, info};

use crate::Float;
use crate::error::{Result, SearchError};
use crate::geometry::{Point, PointSet};
use crate::grid::{Grid, get_angle_grids, get_transform_grids};
use crate::search::{SearchResult, grid_search_point_transform};
use crate::transform::{combine_transforms, transform_points};

/// The central struct of this library.
///
/// Holds the two point sets and every search parameter.
/// For more details, check the module-level documentation of the crate.
#[derive(Clone, Debug)]
pub struct GridSearch<F: Float> {
    /// Reference points. Never transformed.
    fixed: PointSet<F>,
    /// Points to align onto `fixed`.
    moving: PointSet<F>,
    /// Coarsest translation level.
    top_level: i32,
    /// Translation levels stop above this one.
    bot_level: i32,
    /// Extent of the translation grid in units of its step, as a power of two.
    min_size_exp: u32,
    /// Number of chunks every grid is split into.
    chunk_count: usize,
    /// Number of workers of the pool, `None` for the system default.
    threads: Option<usize>,
    /// Minimum number of non-negative angles tried, rounded up to fill every chunk.
    angle_steps: usize,
    /// Angle between two tried rotations, in degrees.
    angle_step: F,
    /// Center of the tried rotations.
    rotation_origin: Point<F>,
}

impl<F: Float> GridSearch<F> {
    /// Create a new instance using default options.
    /// Use `with_` functions to set parameters.
    pub fn new<P>(fixed: P, moving: P) -> Self
    where
        P: Into<PointSet<F>>,
    {
        Self {
            fixed: fixed.into(),
            moving: moving.into(),
            top_level: 5,
            bot_level: -1,
            min_size_exp: 1,
            chunk_count: thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            threads: None,
            angle_steps: 30,
            angle_step: F::one(),
            rotation_origin: Point::origin(),
        }
    }

    /// Set the coarsest and the (exclusive) finest translation level.
    ///
    /// The grid step at level `size` is `2^size`, so `bot_level = -1` ends with a step of one.
    pub fn with_levels(mut self, top_level: i32, bot_level: i32) -> Self {
        self.top_level = top_level;
        self.bot_level = bot_level;
        self
    }

    /// Set the extent exponent of the translation grids.
    pub fn with_min_size_exp(mut self, min_size_exp: u32) -> Self {
        self.min_size_exp = min_size_exp;
        self
    }

    /// Set the number of chunks every grid is split into.
    pub fn with_chunk_count(mut self, chunk_count: usize) -> Self {
        self.chunk_count = chunk_count;
        self
    }

    /// Set the number of workers of the pool used by the parallel searches.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Set the number of angles and the angle step (degrees) of the rotation search.
    pub fn with_angle_steps(mut self, angle_steps: usize, angle_step: F) -> Self {
        self.angle_steps = angle_steps;
        self.angle_step = angle_step;
        self
    }

    /// Set the center of rotation of the rotation search.
    pub fn with_rotation_origin(mut self, x: F, y: F) -> Self {
        self.rotation_origin = Point::new(x, y);
        self
    }

    fn validate_common(&self) -> Result<()> {
        self.fixed.validate("fixed")?;
        self.moving.validate("moving")?;
        if self.chunk_count == 0 {
            return Err(SearchError::invalid_input("chunk count must be positive"));
        }
        Ok(())
    }

    /// Grid sizes of the translation levels, coarsest first.
    fn translation_sizes(&self) -> Result<Vec<u32>> {
        self.validate_common()?;
        if self.bot_level >= self.top_level {
            return Err(SearchError::invalid_input(format!(
                "bot_level {} must be below top_level {}",
                self.bot_level, self.top_level
            )));
        }
        if self.bot_level < -1 {
            return Err(SearchError::invalid_input(format!(
                "bot_level {} must be at least -1",
                self.bot_level
            )));
        }
        ((self.bot_level + 1)..=self.top_level)
            .rev()
            .map(|size| {
                u32::try_from(size)
                    .map_err(|_| SearchError::invalid_input(format!("invalid level {size}")))
            })
            .collect()
    }

    fn angle_grid(&self) -> Result<Grid<F>> {
        self.validate_common()?;
        get_angle_grids(
            self.angle_steps,
            self.angle_step,
            self.rotation_origin.x,
            self.rotation_origin.y,
            self.chunk_count,
        )
    }

    /// Run the coarse-to-fine translation search with `evaluate` scoring each level.
    fn search_translation<E>(&self, sizes: Vec<u32>, mut evaluate: E) -> Result<SearchResult<F>>
    where
        E: FnMut(&Grid<F>, &PointSet<F>) -> Result<SearchResult<F>>,
    {
        let mut moving = self.moving.clone();
        let mut transforms = Vec::with_capacity(sizes.len());
        let mut score = None;

        for size in sizes {
            info!(
                "Searching translations with step {} at level {}.",
                1u64 << size,
                size
            );
            let grid = get_transform_grids(size, self.min_size_exp, self.chunk_count)?;
            let result = evaluate(&grid, &moving)?;
            debug!(
                "Level {} moves by ({:?}, {:?}), score {:?}.",
                size, result.transform.dx, result.transform.dy, result.score
            );

            moving = transform_points(&moving, &result.transform);
            transforms.push(result.transform);
            score = Some(result.score);
        }

        let score = score.ok_or_else(|| SearchError::invalid_input("no translation levels"))?;
        let transform = combine_transforms(&transforms);
        info!("Calculated translation {:?}.", transform);
        Ok(SearchResult { transform, score })
    }

    /// Find the translation minimizing the mean nearest-neighbor distance, level by level.
    ///
    /// Each level searches a grid twice as fine as the previous one around the points
    /// moved by all previous levels. The returned transform combines every level and its
    /// score is the one of the finest level.
    pub fn find_translation(&self) -> Result<SearchResult<F>> {
        let sizes = self.translation_sizes()?;
        self.search_translation(sizes, |grid, moving| {
            grid_search_point_transform(grid, &self.fixed, moving)
        })
    }

    /// Find the rotation about the configured origin minimizing the mean nearest-neighbor distance.
    ///
    /// Tries every angle `k * angle_step` and its negation for `k` in `0..chunk_count * chunk_size`,
    /// where `chunk_size = ceil(angle_steps / chunk_count)`.
    pub fn find_rotation(&self) -> Result<SearchResult<F>> {
        let grid = self.angle_grid()?;
        info!(
            "Searching {} rotations about {:?}.",
            grid.iter().map(Vec::len).sum::<usize>(),
            self.rotation_origin
        );
        grid_search_point_transform(&grid, &self.fixed, &self.moving)
    }
}

/// Sequential counterpart of [`hierarchical_parallel_grid_search_translation`].
pub fn hierarchical_grid_search_translation<F: Float>(
    fixed: &PointSet<F>,
    moving: &PointSet<F>,
    top_level: i32,
    bot_level: i32,
    min_size_exp: u32,
    chunk_count: usize,
) -> Result<SearchResult<F>> {
    GridSearch::new(fixed.clone(), moving.clone())
        .with_levels(top_level, bot_level)
        .with_min_size_exp(min_size_exp)
        .with_chunk_count(chunk_count)
        .find_translation()
}

/// Sequential counterpart of [`hierarchical_parallel_grid_search_rotation`].
pub fn hierarchical_grid_search_rotation<F: Float>(
    fixed: &PointSet<F>,
    moving: &PointSet<F>,
    number_of_angle_steps: usize,
    angle_step: F,
    rotation_origin_x: F,
    rotation_origin_y: F,
    chunk_count: usize,
) -> Result<SearchResult<F>> {
    GridSearch::new(fixed.clone(), moving.clone())
        .with_angle_steps(number_of_angle_steps, angle_step)
        .with_rotation_origin(rotation_origin_x, rotation_origin_y)
        .with_chunk_count(chunk_count)
        .find_rotation()
}

#[cfg(feature = "parallel")]
pub use parallel::*;

#[cfg(feature = "parallel")]
mod parallel {
    use super::*;
    use crate::search::{build_pool, parallel_grid_search_point_transform};

    impl<F: Float> GridSearch<F> {
        /// Find the translation level by level, scoring every grid on a worker pool.
        ///
        /// Also see [`find_translation`](GridSearch::find_translation()) for more details.
        /// The pool lives for the duration of this call.
        pub fn find_translation_par(&self) -> Result<SearchResult<F>> {
            let sizes = self.translation_sizes()?;
            let pool = build_pool(self.threads)?;
            debug!("Scoring on {} workers.", pool.current_num_threads());
            self.search_translation(sizes, |grid, moving| {
                parallel_grid_search_point_transform(&pool, grid, &self.fixed, moving)
            })
        }

        /// Find the rotation, scoring the angle grid on a worker pool.
        ///
        /// Also see [`find_rotation`](GridSearch::find_rotation()) for more details.
        pub fn find_rotation_par(&self) -> Result<SearchResult<F>> {
            let grid = self.angle_grid()?;
            let pool = build_pool(self.threads)?;
            info!(
                "Searching {} rotations about {:?} on {} workers.",
                grid.iter().map(Vec::len).sum::<usize>(),
                self.rotation_origin,
                pool.current_num_threads()
            );
            parallel_grid_search_point_transform(&pool, &grid, &self.fixed, &self.moving)
        }
    }

    /// Find the translation aligning `moving` to `fixed` by coarse-to-fine parallel grid search.
    ///
    /// Levels run from `top_level` down to `bot_level + 1`, with grid step `2^size` and
    /// extent `±2^(min_size_exp + size)`. Every grid is split into `chunk_count` chunks.
    pub fn hierarchical_parallel_grid_search_translation<F: Float>(
        fixed: &PointSet<F>,
        moving: &PointSet<F>,
        top_level: i32,
        bot_level: i32,
        min_size_exp: u32,
        chunk_count: usize,
    ) -> Result<SearchResult<F>> {
        GridSearch::new(fixed.clone(), moving.clone())
            .with_levels(top_level, bot_level)
            .with_min_size_exp(min_size_exp)
            .with_chunk_count(chunk_count)
            .find_translation_par()
    }

    /// Find the rotation about `(rotation_origin_x, rotation_origin_y)` aligning `moving` to `fixed`.
    ///
    /// Single-level search over `±k * angle_step` (degrees), see [`get_angle_grids`](crate::get_angle_grids) for the range of `k`.
    pub fn hierarchical_parallel_grid_search_rotation<F: Float>(
        fixed: &PointSet<F>,
        moving: &PointSet<F>,
        number_of_angle_steps: usize,
        angle_step: F,
        rotation_origin_x: F,
        rotation_origin_y: F,
        chunk_count: usize,
    ) -> Result<SearchResult<F>> {
        GridSearch::new(fixed.clone(), moving.clone())
            .with_angle_steps(number_of_angle_steps, angle_step)
            .with_rotation_origin(rotation_origin_x, rotation_origin_y)
            .with_chunk_count(chunk_count)
            .find_rotation_par()
    }
}
