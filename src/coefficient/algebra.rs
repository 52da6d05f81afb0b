//! Wrapper coefficients that compose others while preserving the evaluation
//! contract.
//!
//! Wrappers are generic over the coefficient value type, so the dimension
//! agreement between an aggregate and its components is enforced by the type
//! system at attach time. Every wrapper forwards `set_time` to its children.

use crate::coefficient::{Coefficient, CoefficientValue};
use crate::mesh::{AttributeMask, ElementKind, ElementTransformation};
use crate::quadrature::IntegrationPoint;
use crate::Real;
use nalgebra::{Matrix3, Vector3};
use num::Zero;

/// A coefficient with the same value everywhere.
#[derive(Debug, Clone)]
pub struct ConstantCoefficient<V> {
    value: V,
}

impl<V> ConstantCoefficient<V> {
    pub fn new(value: V) -> Self {
        Self { value }
    }
}

impl<T, V> Coefficient<T> for ConstantCoefficient<V>
where
    T: Real,
    V: CoefficientValue<T>,
{
    type Value = V;

    fn constant_value(&self) -> Option<V> {
        Some(self.value.clone())
    }

    fn eval(&self, _: &ElementTransformation<T>, _: &IntegrationPoint<T>) -> V {
        self.value.clone()
    }
}

/// Presents a scalar coefficient as a vector with identical components.
#[derive(Debug, Clone)]
pub struct VectorBroadcastCoefficient<C> {
    inner: C,
}

impl<C> VectorBroadcastCoefficient<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<T, C> Coefficient<T> for VectorBroadcastCoefficient<C>
where
    T: Real,
    C: Coefficient<T, Value = T>,
{
    type Value = Vector3<T>;

    fn set_time(&mut self, time: T) {
        self.inner.set_time(time);
    }

    fn constant_value(&self) -> Option<Vector3<T>> {
        self.inner.constant_value().map(Vector3::from_element)
    }

    fn eval(
        &self,
        transformation: &ElementTransformation<T>,
        point: &IntegrationPoint<T>,
    ) -> Vector3<T> {
        Vector3::from_element(self.inner.eval(transformation, point))
    }
}

/// Presents a scalar coefficient as a diagonal matrix.
#[derive(Debug, Clone)]
pub struct DiagonalBroadcastCoefficient<C> {
    inner: C,
}

impl<C> DiagonalBroadcastCoefficient<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<T, C> Coefficient<T> for DiagonalBroadcastCoefficient<C>
where
    T: Real,
    C: Coefficient<T, Value = T>,
{
    type Value = Matrix3<T>;

    fn set_time(&mut self, time: T) {
        self.inner.set_time(time);
    }

    fn constant_value(&self) -> Option<Matrix3<T>> {
        self.inner
            .constant_value()
            .map(Matrix3::from_diagonal_element)
    }

    fn eval(
        &self,
        transformation: &ElementTransformation<T>,
        point: &IntegrationPoint<T>,
    ) -> Matrix3<T> {
        Matrix3::from_diagonal_element(self.inner.eval(transformation, point))
    }
}

/// Scalar `nᵀ M n` of a matrix coefficient at the boundary face normal.
///
/// The wrapped coefficient's dimension equals the embedding spatial dimension
/// by construction of the value types; evaluation on a non-boundary
/// transformation is a contract violation (no normal exists there).
#[derive(Debug, Clone)]
pub struct NormalProjectedCoefficient<C> {
    inner: C,
}

impl<C> NormalProjectedCoefficient<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<T, C> Coefficient<T> for NormalProjectedCoefficient<C>
where
    T: Real,
    C: Coefficient<T, Value = Matrix3<T>>,
{
    type Value = T;

    fn set_time(&mut self, time: T) {
        self.inner.set_time(time);
    }

    fn eval(&self, transformation: &ElementTransformation<T>, point: &IntegrationPoint<T>) -> T {
        assert_eq!(
            transformation.kind(),
            ElementKind::Boundary,
            "NormalProjectedCoefficient requires a boundary element transformation"
        );
        let matrix = self.inner.eval(transformation, point);
        let normal = transformation.normal();
        (matrix * normal).dot(&normal)
    }
}

/// Sum of coefficients of a common value type, each optionally restricted to a
/// set of mesh attributes.
///
/// An empty sum is valid and evaluates to the additive identity everywhere.
pub struct SumCoefficient<'a, T: Real, V> {
    components: Vec<(Box<dyn Coefficient<T, Value = V> + 'a>, Option<AttributeMask>)>,
}

impl<'a, T: Real, V> Default for SumCoefficient<'a, T, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T: Real, V> SumCoefficient<'a, T, V> {
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Add a component contributing on every element.
    pub fn add(&mut self, coefficient: impl Coefficient<T, Value = V> + 'a) {
        self.components.push((Box::new(coefficient), None));
    }

    /// Add a component contributing only on elements whose attribute is in the
    /// mask.
    pub fn add_masked(&mut self, coefficient: impl Coefficient<T, Value = V> + 'a, mask: AttributeMask) {
        self.components.push((Box::new(coefficient), Some(mask)));
    }
}

impl<'a, T: Real> SumCoefficient<'a, T, Vector3<T>> {
    /// Add a scalar component, broadcast to a uniform vector.
    pub fn add_broadcast(&mut self, coefficient: impl Coefficient<T, Value = T> + 'a) {
        self.add(VectorBroadcastCoefficient::new(coefficient));
    }

    pub fn add_broadcast_masked(
        &mut self,
        coefficient: impl Coefficient<T, Value = T> + 'a,
        mask: AttributeMask,
    ) {
        self.add_masked(VectorBroadcastCoefficient::new(coefficient), mask);
    }
}

impl<'a, T: Real> SumCoefficient<'a, T, Matrix3<T>> {
    /// Add a scalar component, broadcast to a diagonal matrix.
    pub fn add_broadcast(&mut self, coefficient: impl Coefficient<T, Value = T> + 'a) {
        self.add(DiagonalBroadcastCoefficient::new(coefficient));
    }

    pub fn add_broadcast_masked(
        &mut self,
        coefficient: impl Coefficient<T, Value = T> + 'a,
        mask: AttributeMask,
    ) {
        self.add_masked(DiagonalBroadcastCoefficient::new(coefficient), mask);
    }
}

impl<'a, T, V> Coefficient<T> for SumCoefficient<'a, T, V>
where
    T: Real,
    V: CoefficientValue<T>,
{
    type Value = V;

    fn set_time(&mut self, time: T) {
        for (coefficient, _) in &mut self.components {
            coefficient.set_time(time);
        }
    }

    fn eval(&self, transformation: &ElementTransformation<T>, point: &IntegrationPoint<T>) -> V {
        let mut sum = V::zero();
        for (coefficient, mask) in &self.components {
            if mask
                .as_ref()
                .map_or(true, |mask| mask.contains(transformation.attribute()))
            {
                sum = sum + coefficient.eval(transformation, point);
            }
        }
        sum
    }
}
