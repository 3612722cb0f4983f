//! Rigid transforms, their application to point sets and their composition.

use nalgebra::{Matrix3, Rotation2, Vector2};
use num_traits::float::FloatCore;

use crate::Float;
use crate::geometry::{Point, PointSet, rotation};

/// A rigid transform of the plane.
///
/// Applying it first rotates a point by `angle` degrees (counter-clockwise) about `origin`,
/// then translates it by `(dx, dy)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointTransform<F: Float> {
    /// Translation along x.
    pub dx: F,
    /// Translation along y.
    pub dy: F,
    /// Rotation angle in degrees.
    pub angle: F,
    /// Center of the rotation.
    pub origin: Point<F>,
}

impl<F: Float> PointTransform<F> {
    /// Create a new instance.
    pub fn new(dx: F, dy: F, angle: F, origin: Point<F>) -> Self {
        Self {
            dx,
            dy,
            angle,
            origin,
        }
    }

    /// The transform leaving every point in place.
    pub fn identity() -> Self {
        Self::translation(F::zero(), F::zero())
    }

    /// A pure translation.
    pub fn translation(dx: F, dy: F) -> Self {
        Self::new(dx, dy, F::zero(), Point::origin())
    }

    /// A pure rotation by `angle` degrees about `origin`.
    pub fn rotation(angle: F, origin: Point<F>) -> Self {
        Self::new(F::zero(), F::zero(), angle, origin)
    }

    fn radians(&self) -> F {
        FloatCore::to_radians(self.angle)
    }

    /// Transform a single point.
    pub fn apply(&self, point: &Point<F>) -> Point<F> {
        rotation(point, &self.origin, self.radians()) + Vector2::new(self.dx, self.dy)
    }

    /// Homogeneous 3x3 matrix `T` with `T * (x, y, 1)^T` equal to the transformed point.
    pub fn matrix(&self) -> Matrix3<F> {
        let rot = Rotation2::new(self.radians());
        let t = self.origin.coords - rot * self.origin.coords + Vector2::new(self.dx, self.dy);
        let r = rot.matrix();
        Matrix3::new(
            r[(0, 0)],
            r[(0, 1)],
            t.x,
            r[(1, 0)],
            r[(1, 1)],
            t.y,
            F::zero(),
            F::zero(),
            F::one(),
        )
    }

    /// Express the rigid map `p -> R(angle) p + offset` as a rotation about `origin`.
    fn from_offset(angle: F, origin: Point<F>, offset: Vector2<F>) -> Self {
        let rot = Rotation2::new(FloatCore::to_radians(angle));
        let d = offset - (origin.coords - rot * origin.coords);
        Self::new(d.x, d.y, angle, origin)
    }

    /// The transform undoing this one, about the same origin.
    pub fn inverse(&self) -> Self {
        let rot = Rotation2::new(-self.radians());
        let d = -(rot * Vector2::new(self.dx, self.dy));
        Self::new(d.x, d.y, -self.angle, self.origin)
    }

    /// Apply `self`, then `next`, expressed as one transform about the origin of `self`.
    pub fn then(&self, next: &Self) -> Self {
        combine_transforms(&[*self, *next])
    }
}

impl<F: Float> Default for PointTransform<F> {
    fn default() -> Self {
        Self::identity()
    }
}

/// Apply `transform` to every point of `points`, returning a new set.
pub fn transform_points<F: Float>(points: &PointSet<F>, transform: &PointTransform<F>) -> PointSet<F> {
    points.iter().map(|p| transform.apply(p)).collect()
}

/// Fold transforms found by successive search stages into one.
///
/// Each transform is taken relative to the set produced by all previous ones,
/// so applying the result to the original set equals applying them in order.
/// The composition of rigid maps is rigid, so a single transform always exists;
/// it is expressed about the origin of the first transform.
/// An empty sequence yields the identity.
pub fn combine_transforms<F: Float>(transforms: &[PointTransform<F>]) -> PointTransform<F> {
    let Some(first) = transforms.first() else {
        return PointTransform::identity();
    };

    let angle = transforms
        .iter()
        .fold(F::zero(), |acc, t| acc + t.angle);
    let mat = transforms
        .iter()
        .fold(Matrix3::identity(), |acc, t| t.matrix() * acc);

    PointTransform::from_offset(angle, first.origin, Vector2::new(mat[(0, 2)], mat[(1, 2)]))
}
