//! Coefficient evaluation at integration points.
//!
//! A coefficient is a pure function of an element transformation and an
//! integration point, producing a scalar, vector or matrix value. Evaluation is
//! side-effect-free and safe to run concurrently across elements; any scratch
//! state lives on the stack of the call.
//!
//! Concrete evaluators live in [`boundary`] (field- and material-dependent
//! quantities on domain elements and possibly two-sided boundary faces) and
//! [`algebra`] (constants, sums, broadcasts and projections that compose other
//! coefficients).

use crate::mesh::ElementTransformation;
use crate::quadrature::IntegrationPoint;
use crate::Real;
use nalgebra::{Matrix3, Vector3};
use num::Zero;
use serde::{Deserialize, Serialize};

pub mod algebra;
pub mod boundary;
pub mod neighbors;

pub use neighbors::{FaceAdjacency, FaceNeighborResolver, SideEvaluation};

/// Runtime shape of a coefficient value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueShape {
    Scalar,
    Vector,
    Matrix,
}

impl ValueShape {
    /// Number of scalar entries in a packed value of this shape.
    pub fn packed_len(&self) -> usize {
        match self {
            ValueShape::Scalar => 1,
            ValueShape::Vector => 3,
            ValueShape::Matrix => 9,
        }
    }
}

/// Value produced by a coefficient: a scalar, a fixed-size vector or a
/// fixed-size matrix over the spatial dimension.
pub trait CoefficientValue<T: Real>: Zero + Clone + PartialEq + 'static {
    const SHAPE: ValueShape;

    /// Pack the value into a flat slice of `SHAPE.packed_len()` entries
    /// (column-major for matrices).
    fn write_to(&self, output: &mut [T]);
}

impl<T: Real> CoefficientValue<T> for T {
    const SHAPE: ValueShape = ValueShape::Scalar;

    fn write_to(&self, output: &mut [T]) {
        output[0] = *self;
    }
}

impl<T: Real> CoefficientValue<T> for Vector3<T> {
    const SHAPE: ValueShape = ValueShape::Vector;

    fn write_to(&self, output: &mut [T]) {
        output[..3].copy_from_slice(self.as_slice());
    }
}

impl<T: Real> CoefficientValue<T> for Matrix3<T> {
    const SHAPE: ValueShape = ValueShape::Matrix;

    fn write_to(&self, output: &mut [T]) {
        output[..9].copy_from_slice(self.as_slice());
    }
}

/// A spatially varying quantity evaluable at an element/integration-point pair.
///
/// Evaluation must be idempotent and free of observable side effects, and a
/// single instance must be evaluable from concurrent calls. Coefficients borrow
/// session-lived state (material table, mesh topology, fields) and are cheap to
/// construct.
pub trait Coefficient<T: Real> {
    type Value: CoefficientValue<T>;

    /// Set the evaluation time for time-dependent sources.
    ///
    /// Wrappers forward this to every held child coefficient.
    fn set_time(&mut self, _time: T) {}

    /// The value if this coefficient is a true constant, independent of element
    /// and point.
    ///
    /// The tag is fixed at construction; returning `Some` opts a scalar
    /// coefficient into the specialized constant kernels during assembly.
    fn constant_value(&self) -> Option<Self::Value> {
        None
    }

    fn eval(
        &self,
        transformation: &ElementTransformation<T>,
        point: &IntegrationPoint<T>,
    ) -> Self::Value;
}
