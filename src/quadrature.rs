//! Integration rules as plain data.
//!
//! Rule construction belongs to the quadrature collaborator; the crate only
//! consumes a list of weighted reference points per element batch.

use crate::Real;
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

/// A weighted integration point on a reference element.
///
/// Coordinates beyond the reference dimension are zero (boundary elements use
/// `x` and `y` only).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntegrationPoint<T: Real> {
    pub x: T,
    pub y: T,
    pub z: T,
    pub weight: T,
}

impl<T: Real> IntegrationPoint<T> {
    pub fn new(x: T, y: T, z: T, weight: T) -> Self {
        Self { x, y, z, weight }
    }

    /// Reference coordinates on a boundary element.
    pub fn face_point(&self) -> Point2<T> {
        Point2::new(self.x, self.y)
    }

    /// Reference coordinates on a domain element.
    pub fn volume_point(&self) -> Point3<T> {
        Point3::new(self.x, self.y, self.z)
    }
}

/// An integration rule for one reference geometry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IntegrationRule<T: Real> {
    points: Vec<IntegrationPoint<T>>,
}

impl<T: Real> IntegrationRule<T> {
    pub fn from_points(points: Vec<IntegrationPoint<T>>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[IntegrationPoint<T>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Default integration order for a trial/test basis pair.
///
/// The sum of the basis orders integrates the mass-type product exactly on
/// affine elements; `extra` accounts for geometric nonlinearity or coefficient
/// variation.
pub fn default_integration_order(trial_order: usize, test_order: usize, extra: usize) -> usize {
    trial_order + test_order + extra
}
