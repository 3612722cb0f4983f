//! Points, point sets and the elementary rotation.

use std::ops::Deref;

use nalgebra::{Point2, Rotation2};
use ndarray::{Array2, ArrayView2};
use num_traits::float::FloatCore;

use crate::Float;
use crate::error::{Result, SearchError};

/// A point in the plane.
pub type Point<F> = Point2<F>;

/// An ordered, immutable collection of points.
///
/// The order carries no meaning for the score, but it is preserved so that
/// searches are reproducible.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointSet<F: Float> {
    points: Vec<Point<F>>,
}

impl<F: Float> PointSet<F> {
    /// Create a point set from a list of points.
    pub fn new(points: Vec<Point<F>>) -> Self {
        Self { points }
    }

    /// Create a point set from a matrix of shape `(n_points, 2)`.
    pub fn from_array(array: ArrayView2<F>) -> Result<Self> {
        if array.ncols() != 2 {
            return Err(SearchError::invalid_input(format!(
                "expected point array of shape (n, 2), got {:?}",
                array.shape()
            )));
        }
        Ok(array
            .rows()
            .into_iter()
            .map(|r| Point::new(r[0], r[1]))
            .collect())
    }

    /// Convert into a matrix of shape `(n_points, 2)`.
    pub fn to_array(&self) -> Array2<F> {
        Array2::from_shape_fn((self.points.len(), 2), |(i, j)| self.points[i][j])
    }

    /// Check that the set can be scored: it must be non-empty and every coordinate finite.
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.points.is_empty() {
            return Err(SearchError::invalid_input(format!(
                "{name} point set is empty"
            )));
        }
        if let Some(i) = self
            .points
            .iter()
            .position(|p| !(FloatCore::is_finite(p.x) && FloatCore::is_finite(p.y)))
        {
            return Err(SearchError::invalid_input(format!(
                "{name} point {i} has a non-finite coordinate"
            )));
        }
        Ok(())
    }

    /// The underlying points.
    pub fn points(&self) -> &[Point<F>] {
        &self.points
    }

    /// Consume the set and return the points.
    pub fn into_points(self) -> Vec<Point<F>> {
        self.points
    }
}

impl<F: Float> Deref for PointSet<F> {
    type Target = [Point<F>];

    fn deref(&self) -> &Self::Target {
        &self.points
    }
}

impl<F: Float> From<Vec<Point<F>>> for PointSet<F> {
    fn from(points: Vec<Point<F>>) -> Self {
        Self::new(points)
    }
}

impl<F: Float> From<Vec<[F; 2]>> for PointSet<F> {
    fn from(coords: Vec<[F; 2]>) -> Self {
        coords.into_iter().map(|[x, y]| Point::new(x, y)).collect()
    }
}

impl<F: Float> FromIterator<Point<F>> for PointSet<F> {
    fn from_iter<I: IntoIterator<Item = Point<F>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<F: Float> IntoIterator for PointSet<F> {
    type Item = Point<F>;
    type IntoIter = std::vec::IntoIter<Point<F>>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

impl<'a, F: Float> IntoIterator for &'a PointSet<F> {
    type Item = &'a Point<F>;
    type IntoIter = std::slice::Iter<'a, Point<F>>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Rotate `point` around `pivot` by `angle` (radians, counter-clockwise).
pub(crate) fn rotation<F: Float>(point: &Point<F>, pivot: &Point<F>, angle: F) -> Point<F> {
    let rot = Rotation2::new(angle);
    pivot + rot * (point - pivot)
}
