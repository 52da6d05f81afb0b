//! Boundary linear forms and coefficient integration.
//!
//! Right-hand-side contributions from boundary excitations are driven by the
//! same coefficient contract as operator assembly: the coefficient is
//! evaluated once per quadrature point per boundary element and contracted
//! against the tabulated basis.

use crate::assembly::kernels::{covariant_factor, volume_measure};
use crate::coefficient::Coefficient;
use crate::mesh::MeshGeometry;
use crate::quadrature::IntegrationRule;
use crate::space::{mode_components, EvalMode, FiniteElementSpace, SpaceKind};
use crate::Real;
use eyre::Result;
use nalgebra::{DMatrix, DVector, Vector3};

/// Accumulate `∫ c φᵢ` over a batch of boundary elements into the global
/// right-hand side.
///
/// # Panics
///
/// Panics if the space is not scalar-valued or the output dimension does not
/// match the space.
pub fn assemble_boundary_source<T, Space, Geometry, C>(
    space: &Space,
    geometry: &Geometry,
    rule: &IntegrationRule<T>,
    elements: &[usize],
    coefficient: &C,
    output: &mut DVector<T>,
) -> Result<()>
where
    T: Real,
    Space: FiniteElementSpace<T> + ?Sized,
    Geometry: MeshGeometry<T> + ?Sized,
    C: Coefficient<T, Value = T>,
{
    assert_eq!(
        mode_components(space.kind(), EvalMode::Value, 2),
        1,
        "scalar boundary sources require a scalar-valued space"
    );
    assert_eq!(output.len(), space.num_dofs(), "output dimension mismatch");

    let ndof = space.element_dof_count(true);
    let nq = rule.len();
    let mut basis = DMatrix::zeros(nq, ndof);
    space.tabulate(true, EvalMode::Value, rule, &mut basis)?;

    let mut dofs = vec![0usize; ndof];
    for &element in elements {
        space.populate_element_dofs(true, element, &mut dofs);
        for (point_index, point) in rule.points().iter().enumerate() {
            let transformation = geometry.element_transformation(true, element, point);
            let vol = volume_measure(transformation.jacobian(), 2)?;
            let value = point.weight * vol * coefficient.eval(&transformation, point);
            for (local, &dof) in dofs.iter().enumerate() {
                output[dof] += value * basis[(point_index, local)];
            }
        }
    }
    Ok(())
}

/// Accumulate `∫ f · φᵢ` for a vector-valued (H(curl)) space over a batch of
/// boundary elements.
///
/// The physical source is pulled back onto the reference element through the
/// covariant factor before contraction with the reference basis components.
pub fn assemble_boundary_vector_source<T, Space, Geometry, C>(
    space: &Space,
    geometry: &Geometry,
    rule: &IntegrationRule<T>,
    elements: &[usize],
    coefficient: &C,
    output: &mut DVector<T>,
) -> Result<()>
where
    T: Real,
    Space: FiniteElementSpace<T> + ?Sized,
    Geometry: MeshGeometry<T> + ?Sized,
    C: Coefficient<T, Value = Vector3<T>>,
{
    assert_eq!(
        space.kind(),
        SpaceKind::HCurl,
        "vector boundary sources require an H(curl) space"
    );
    assert_eq!(output.len(), space.num_dofs(), "output dimension mismatch");

    let components = mode_components(space.kind(), EvalMode::Value, 2);
    let ndof = space.element_dof_count(true);
    let nq = rule.len();
    let mut basis = DMatrix::zeros(nq * components, ndof);
    space.tabulate(true, EvalMode::Value, rule, &mut basis)?;

    let mut dofs = vec![0usize; ndof];
    for &element in elements {
        space.populate_element_dofs(true, element, &mut dofs);
        for (point_index, point) in rule.points().iter().enumerate() {
            let transformation = geometry.element_transformation(true, element, point);
            let vol = volume_measure(transformation.jacobian(), 2)?;
            let factor = covariant_factor(transformation.jacobian(), 2)?;
            let pulled_back =
                factor * coefficient.eval(&transformation, point) * (point.weight * vol);
            for (local, &dof) in dofs.iter().enumerate() {
                let mut entry = T::zero();
                for c in 0..components {
                    entry += pulled_back[c] * basis[(point_index * components + c, local)];
                }
                output[dof] += entry;
            }
        }
    }
    Ok(())
}

/// Integrate a scalar coefficient over a batch of boundary elements.
///
/// This is the consumer of the interface-energy and flux coefficients during
/// postprocessing.
pub fn integrate_boundary<T, Geometry, C>(
    geometry: &Geometry,
    rule: &IntegrationRule<T>,
    elements: &[usize],
    coefficient: &C,
) -> Result<T>
where
    T: Real,
    Geometry: MeshGeometry<T> + ?Sized,
    C: Coefficient<T, Value = T>,
{
    let mut integral = T::zero();
    for &element in elements {
        for point in rule.points() {
            let transformation = geometry.element_transformation(true, element, point);
            let vol = volume_measure(transformation.jacobian(), 2)?;
            integral += point.weight * vol * coefficient.eval(&transformation, point);
        }
    }
    Ok(integral)
}
