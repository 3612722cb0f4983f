#![warn(missing_docs)]

//! Rigid registration of two sets of 2D points by exhaustive grid search. \
//! Given a set of fixed and a set of moving points, find the translation or rotation that
//! minimizes the mean distance from each moving point to its nearest fixed point.
//! The search is brute force and derivative-free: every candidate transform of a grid is
//! scored, and translations are refined coarse-to-fine over several levels.
//!
//! ## Interface
//! The central struct of this library is [`GridSearch`]. It holds both point sets and all
//! search parameters, which are set via `GridSearch::with_*()` functions.
//!
//! Example:
//! ```rust
//! # use gridreg::{GridSearch, PointSet};
//! let fixed: PointSet<f64> = vec![[0., 0.], [10., 0.], [0., 10.]].into();
//! let moving: PointSet<f64> = vec![[3., 1.], [13., 1.], [3., 11.]].into();
//! let result = GridSearch::new(fixed, moving)
//!     .with_levels(2, -1)
//!     .with_min_size_exp(1)
//!     .with_chunk_count(2)
//!     .find_translation()
//!     .unwrap();
//! assert_eq!((result.transform.dx, result.transform.dy), (-3., -1.));
//! ```
//!
//! After constructing the struct, there are two searches:
//! - [`find_translation`](GridSearch::find_translation()): coarse-to-fine translation search.
//! - [`find_rotation`](GridSearch::find_rotation()): single-level search over rotation angles.
//!
//! Both can also be executed on a worker pool (`*_par`), with identical results.
//! The free functions [`hierarchical_parallel_grid_search_translation`] and
//! [`hierarchical_parallel_grid_search_rotation`] wrap these for one-off calls, and the
//! building blocks ([`get_transform_grids`], [`get_angle_grids`],
//! [`parallel_grid_search_point_transform`]) are public as well.
//!
//! ## Parameters
//! - `top_level`, `bot_level`: Levels of the translation search. Level `size` uses a grid
//!     step of `2^size`; levels run from `top_level` down to `bot_level + 1`.
//! - `min_size_exp`: The translation grid at level `size` spans `±2^(min_size_exp + size)`.
//! - `chunk_count`: Number of chunks every grid is split into. Each chunk is one task on the pool.
//!     It may exceed the number of workers.
//! - `threads`: Number of workers of the pool. By default, the system decides.
//! - `angle_steps`, `angle_step`: The rotation search tries `±k * angle_step` degrees. `k` runs over at least
//!     `0..angle_steps`, rounded up so that every chunk holds `ceil(angle_steps / chunk_count)` angles.
//! - `rotation_origin`: Center of the tried rotations.
//!
//! ## Transforms
//! A [`PointTransform`] rotates about its origin first (counter-clockwise, in degrees), then translates.
//! Transforms of successive levels are folded into one with [`combine_transforms`].

pub mod error;
pub(crate) mod geometry;
pub mod grid;
pub(crate) mod nearest;
pub(crate) mod registration;
pub mod search;
pub(crate) mod transform;

pub use error::{Result, SearchError};
pub use geometry::{Point, PointSet};
pub use grid::{Grid, get_angle_grids, get_transform_grids};
pub use nearest::NearestNeighbors;
pub use registration::*;
pub use search::{SearchResult, grid_search_point_transform};
#[cfg(feature = "parallel")]
pub use search::{build_pool, parallel_grid_search_point_transform};
pub use transform::{PointTransform, combine_transforms, transform_points};

/// A generic float trait such that the search is generic over `f32`/`f64`.
///
/// This trait is automatically implemented for all types implementing the supertraits.
/// Particularly, this includes `f32` and `f64`.
/// [`num_traits::float::FloatCore`] is needed by the kd-tree; where it shares a method name with
/// [`nalgebra::RealField`], the call is spelled out with the trait.
pub trait Float:
    Copy + Default + nalgebra::RealField + num_traits::FromPrimitive + num_traits::float::FloatCore
{
}

impl<F> Float for F where
    F: Copy
        + Default
        + nalgebra::RealField
        + num_traits::FromPrimitive
        + num_traits::float::FloatCore
{
}
