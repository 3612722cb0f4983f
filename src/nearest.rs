//! Nearest-neighbor queries against the fixed point set, and the score built from them.

use std::cmp::Ordering;
use std::panic::{self, AssertUnwindSafe};

use itertools::Itertools;
use kiddo::float::{distance::SquaredEuclidean, kdtree::KdTree};
use num_traits::float::FloatCore;

use crate::Float;
use crate::error::{Result, SearchError};
use crate::geometry::{Point, PointSet};

/// Kd-tree over the fixed points.
///
/// Built once per evaluation and shared read-only by every chunk.
/// Coincident fixed points are indexed once; they cannot change any nearest distance.
pub struct NearestNeighbors<F: Float> {
    tree: KdTree<F, usize, 2, 32, u32>,
    len: usize,
}

fn lexicographic<F: Float>(a: &Point<F>, b: &Point<F>) -> Ordering {
    a.x.partial_cmp(&b.x)
        .unwrap_or(Ordering::Equal)
        .then(a.y.partial_cmp(&b.y).unwrap_or(Ordering::Equal))
}

impl<F: Float> NearestNeighbors<F> {
    /// Index the distinct points of `fixed`.
    ///
    /// Fails with [`SearchError::InvalidInput`] if `fixed` is empty or the tree cannot be built.
    pub fn new(fixed: &PointSet<F>) -> Result<Self> {
        if fixed.is_empty() {
            return Err(SearchError::invalid_input("cannot index an empty point set"));
        }
        let unique = fixed
            .iter()
            .sorted_by(|a, b| lexicographic(a, b))
            .dedup()
            .collect_vec();

        let tree = panic::catch_unwind(AssertUnwindSafe(|| {
            unique
                .iter()
                .enumerate()
                .map(|(i, p)| ([p.x, p.y], i))
                .collect::<KdTree<F, usize, 2, 32, u32>>()
        }))
        .map_err(|_| SearchError::invalid_input("fixed points cannot be indexed"))?;

        Ok(Self {
            tree,
            len: unique.len(),
        })
    }

    /// Number of indexed, distinct points. Never zero.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no points are indexed. Always `false` for a successfully built index.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Euclidean distance from `point` to the closest indexed point.
    ///
    /// When several points are equally close, the distance is the same whichever is picked.
    pub fn nearest_distance(&self, point: &Point<F>) -> F {
        self.tree
            .nearest_one::<SquaredEuclidean>(&[point.x, point.y])
            .distance
            .sqrt()
    }

    /// Mean distance from each of `points` to its closest indexed point.
    ///
    /// This is the score minimized by the grid search. `points` must not be empty.
    pub fn mean_distance(&self, points: &PointSet<F>) -> Result<F> {
        if points.is_empty() {
            return Err(SearchError::invalid_input(
                "mean distance of an empty point set",
            ));
        }
        let sum = points
            .iter()
            .fold(F::zero(), |acc, p| acc + self.nearest_distance(p));
        let n = F::from_usize(points.len()).unwrap_or_else(FloatCore::max_value);
        Ok(sum / n)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use rand::prelude::*;

    use super::*;

    fn brute_force_mean(fixed: &PointSet<f64>, moving: &PointSet<f64>) -> f64 {
        moving
            .iter()
            .map(|m| {
                fixed
                    .iter()
                    .map(|f| (m - f).norm())
                    .fold(f64::INFINITY, f64::min)
            })
            .sum::<f64>()
            / moving.len() as f64
    }

    #[test]
    fn nearest_distance() {
        let fixed: PointSet<f64> = vec![[0., 0.], [10., 0.], [0., 10.]].into();
        let nn = NearestNeighbors::new(&fixed).unwrap();

        assert_eq!(nn.len(), 3);
        assert_abs_diff_eq!(nn.nearest_distance(&Point::new(3., 4.)), 5.);
        assert_abs_diff_eq!(nn.nearest_distance(&Point::new(10., 0.)), 0.);
    }

    #[test]
    fn identical_sets_score_zero() {
        let fixed: PointSet<f64> = vec![[0., 0.], [10., 0.], [0., 10.]].into();
        let nn = NearestNeighbors::new(&fixed).unwrap();

        assert_eq!(nn.mean_distance(&fixed).unwrap(), 0.);
    }

    #[test]
    fn matches_brute_force() {
        let mut rng = rand::rng();
        let random_set = |rng: &mut ThreadRng, n: usize| -> PointSet<f64> {
            (0..n)
                .map(|_| Point::new(rng.random_range(0.0..100.0), rng.random_range(0.0..100.0)))
                .collect()
        };
        let fixed = random_set(&mut rng, 200);
        let moving = random_set(&mut rng, 50);

        let nn = NearestNeighbors::new(&fixed).unwrap();
        assert_abs_diff_eq!(
            nn.mean_distance(&moving).unwrap(),
            brute_force_mean(&fixed, &moving),
            epsilon = 1e-9
        );
    }

    #[test]
    fn coincident_points_indexed_once() {
        let mut fixed: PointSet<f64> = vec![[1., 1.]; 100].into();
        let nn = NearestNeighbors::new(&fixed).unwrap();
        assert_eq!(nn.len(), 1);
        assert_eq!(nn.mean_distance(&fixed).unwrap(), 0.);

        fixed = fixed.into_iter().chain(vec![Point::new(4., 5.); 40]).collect();
        let nn = NearestNeighbors::new(&fixed).unwrap();
        assert_eq!(nn.len(), 2);
        assert_abs_diff_eq!(nn.nearest_distance(&Point::new(4., 1.)), 3.);
    }

    #[test]
    fn empty_sets_rejected() {
        assert!(matches!(
            NearestNeighbors::<f64>::new(&PointSet::default()),
            Err(SearchError::InvalidInput(_))
        ));

        let single: PointSet<f64> = vec![[0., 0.]].into();
        let nn = NearestNeighbors::new(&single).unwrap();
        assert!(matches!(
            nn.mean_distance(&PointSet::default()),
            Err(SearchError::InvalidInput(_))
        ));
    }
}
