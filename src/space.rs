//! Finite element space collaborator trait.

use crate::quadrature::IntegrationRule;
use crate::Real;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Conformity of a finite element space, determining which evaluation modes are
/// meaningful and how basis functions transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpaceKind {
    H1,
    HCurl,
    HDiv,
    L2,
}

/// Basis evaluation modes understood by the kernel dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvalMode {
    Value,
    Gradient,
    Curl,
    Divergence,
}

/// Components per basis function for an evaluation mode at the given effective
/// dimension.
///
/// # Panics
///
/// Panics for (space, mode) combinations that have no meaning, which is a
/// dispatch contract violation.
pub fn mode_components(kind: SpaceKind, mode: EvalMode, dim: usize) -> usize {
    match (kind, mode) {
        (SpaceKind::H1 | SpaceKind::L2, EvalMode::Value) => 1,
        (SpaceKind::H1, EvalMode::Gradient) => dim,
        (SpaceKind::HCurl, EvalMode::Value) => dim,
        (SpaceKind::HCurl, EvalMode::Curl) => {
            if dim == 3 {
                3
            } else {
                1
            }
        }
        (SpaceKind::HDiv, EvalMode::Value) => dim,
        (SpaceKind::HDiv, EvalMode::Divergence) => 1,
        _ => panic!("evaluation mode {mode:?} is not supported for {kind:?} spaces"),
    }
}

/// Degree-of-freedom maps and reference basis tabulation for a finite element
/// space.
///
/// Element batches handed to the assembler are uniform: every element of a
/// batch shares the reference geometry, dof count and tabulated basis, with
/// per-element orientation absorbed into the dof map by the implementor.
pub trait FiniteElementSpace<T: Real> {
    fn kind(&self) -> SpaceKind;

    /// Total number of (true) degrees of freedom.
    fn num_dofs(&self) -> usize;

    /// Degrees of freedom per element, for domain elements or boundary faces.
    fn element_dof_count(&self, boundary: bool) -> usize;

    fn populate_element_dofs(&self, boundary: bool, element: usize, dofs: &mut [usize]);

    /// Tabulate the requested evaluation mode at the rule's points.
    ///
    /// `output` has one row block of `mode_components` rows per integration
    /// point and one column per element dof.
    fn tabulate(
        &self,
        boundary: bool,
        mode: EvalMode,
        rule: &IntegrationRule<T>,
        output: &mut DMatrix<T>,
    ) -> eyre::Result<()>;
}
