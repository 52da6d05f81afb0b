//! Operator kinds and the batch assembly entry point.

use crate::assembly::kernels::{CoefficientShape, KernelFamily, KernelKey, KernelRegistry};
use crate::assembly::operator::{LocalOperator, LocalOperatorDescriptor};
use crate::coefficient::{Coefficient, CoefficientValue, ValueShape};
use crate::mesh::MeshGeometry;
use crate::quadrature::IntegrationRule;
use crate::space::{mode_components, EvalMode, FiniteElementSpace, SpaceKind};
use crate::Real;
use eyre::Result;
use log::debug;
use nalgebra::DMatrix;
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
use rayon::slice::ParallelSliceMut;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

use crate::assembly::kernels::BuildInputs;

/// Differential operator kinds understood by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorKind {
    /// `(c u, v)`
    Mass,
    /// `(c ∇u, ∇v)`
    Diffusion,
    /// `(c ∇×u, ∇×v)`
    CurlCurl,
    /// `(c ∇·u, ∇·v)`
    DivDiv,
    /// `(c ∇u, v)` for an H1/H(curl) trial/test pair (either order).
    MixedVectorGradient,
    /// `-(c u, ∇v)`, defined as the negative of the mixed gradient form.
    MixedVectorWeakDivergence,
}

impl OperatorKind {
    /// Trial/test evaluation modes and the kernel family for the given space
    /// pair at the given effective dimension.
    ///
    /// # Panics
    ///
    /// Panics for unsupported space combinations; requesting one is a
    /// construction error, not a runtime state.
    pub fn select(&self, trial: SpaceKind, test: SpaceKind, dim: usize) -> (EvalMode, EvalMode, KernelFamily) {
        match self {
            OperatorKind::Mass => {
                assert_eq!(trial, test, "mass forms require identical trial and test spaces");
                let family = match trial {
                    SpaceKind::H1 | SpaceKind::L2 => KernelFamily::Interp,
                    SpaceKind::HCurl => KernelFamily::CovariantPiola,
                    SpaceKind::HDiv => KernelFamily::ContravariantPiola,
                };
                (EvalMode::Value, EvalMode::Value, family)
            }
            OperatorKind::Diffusion => {
                assert!(
                    trial == SpaceKind::H1 && test == SpaceKind::H1,
                    "diffusion forms require H1 trial and test spaces"
                );
                (EvalMode::Gradient, EvalMode::Gradient, KernelFamily::CovariantPiola)
            }
            OperatorKind::CurlCurl => {
                assert!(
                    trial == SpaceKind::HCurl && test == SpaceKind::HCurl,
                    "curl-curl forms require H(curl) trial and test spaces"
                );
                let family = if dim == 3 {
                    KernelFamily::ContravariantPiola
                } else {
                    KernelFamily::ScalarDeriv
                };
                (EvalMode::Curl, EvalMode::Curl, family)
            }
            OperatorKind::DivDiv => {
                assert!(
                    trial == SpaceKind::HDiv && test == SpaceKind::HDiv,
                    "div-div forms require H(div) trial and test spaces"
                );
                (EvalMode::Divergence, EvalMode::Divergence, KernelFamily::ScalarDeriv)
            }
            OperatorKind::MixedVectorGradient | OperatorKind::MixedVectorWeakDivergence => {
                match (trial, test) {
                    (SpaceKind::H1, SpaceKind::HCurl) => {
                        (EvalMode::Gradient, EvalMode::Value, KernelFamily::CovariantPiola)
                    }
                    (SpaceKind::HCurl, SpaceKind::H1) => {
                        (EvalMode::Value, EvalMode::Gradient, KernelFamily::CovariantPiola)
                    }
                    _ => panic!(
                        "mixed vector gradient forms require exactly one H1/H(curl) pair, got {trial:?}/{test:?}"
                    ),
                }
            }
        }
    }

    /// The form is defined with a sign flip relative to its base form.
    pub fn negated(&self) -> bool {
        matches!(self, OperatorKind::MixedVectorWeakDivergence)
    }

    /// The assembled form is self-adjoint, so transposed apply may forward to
    /// apply.
    pub fn self_adjoint(&self) -> bool {
        !matches!(
            self,
            OperatorKind::MixedVectorGradient | OperatorKind::MixedVectorWeakDivergence
        )
    }
}

/// Assembles matrix-free local operators over batches of elements.
///
/// Borrows the trial/test spaces, mesh geometry and kernel registry for the
/// session; each `assemble` call produces one [`LocalOperator`] per element
/// batch, plus a transpose handle for non-self-adjoint kinds.
#[derive(Debug)]
pub struct OperatorAssembler<'a, T, Trial: ?Sized, Test: ?Sized, Geometry: ?Sized, Registry: ?Sized> {
    trial: &'a Trial,
    test: &'a Test,
    geometry: &'a Geometry,
    registry: &'a Registry,
    marker: PhantomData<T>,
}

impl<'a, T, Trial, Test, Geometry, Registry>
    OperatorAssembler<'a, T, Trial, Test, Geometry, Registry>
where
    T: Real,
    Trial: FiniteElementSpace<T> + ?Sized,
    Test: FiniteElementSpace<T> + ?Sized,
    Geometry: MeshGeometry<T> + ?Sized,
    Registry: KernelRegistry<T> + ?Sized,
{
    pub fn new(
        trial: &'a Trial,
        test: &'a Test,
        geometry: &'a Geometry,
        registry: &'a Registry,
    ) -> Self {
        Self {
            trial,
            test,
            geometry,
            registry,
            marker: PhantomData,
        }
    }

    /// Assemble a domain integral over the given element batch.
    pub fn assemble<C>(
        &self,
        kind: OperatorKind,
        rule: &IntegrationRule<T>,
        elements: &[usize],
        coefficient: &C,
    ) -> Result<(LocalOperator<T>, Option<LocalOperator<T>>)>
    where
        T: Send + Sync,
        C: Coefficient<T> + Sync,
        Geometry: Sync,
    {
        self.assemble_impl(kind, false, rule, elements, coefficient)
    }

    /// Assemble a boundary integral over the given boundary element batch. The
    /// effective integration dimension is reduced by one.
    pub fn assemble_boundary<C>(
        &self,
        kind: OperatorKind,
        rule: &IntegrationRule<T>,
        elements: &[usize],
        coefficient: &C,
    ) -> Result<(LocalOperator<T>, Option<LocalOperator<T>>)>
    where
        T: Send + Sync,
        C: Coefficient<T> + Sync,
        Geometry: Sync,
    {
        self.assemble_impl(kind, true, rule, elements, coefficient)
    }

    fn assemble_impl<C>(
        &self,
        kind: OperatorKind,
        boundary: bool,
        rule: &IntegrationRule<T>,
        elements: &[usize],
        coefficient: &C,
    ) -> Result<(LocalOperator<T>, Option<LocalOperator<T>>)>
    where
        T: Send + Sync,
        C: Coefficient<T> + Sync,
        Geometry: Sync,
    {
        let dim = if boundary { 2 } else { 3 };
        let (trial_mode, test_mode, family) = kind.select(self.trial.kind(), self.test.kind(), dim);

        let constant = coefficient.constant_value();
        let shape = match (C::Value::SHAPE, &constant) {
            (ValueShape::Scalar, Some(_)) => CoefficientShape::ConstantScalar,
            (ValueShape::Scalar, None) => CoefficientShape::Scalar,
            (ValueShape::Vector, _) => CoefficientShape::Vector,
            (ValueShape::Matrix, _) => CoefficientShape::Matrix,
        };
        let key = KernelKey { dim, family, shape };
        let kernels = self
            .registry
            .lookup(&key)
            .unwrap_or_else(|| panic!("no kernel registered for {key:?}"));

        debug!(
            "assembling {:?} over {} elements ({} quadrature points, {:?} coefficient)",
            kind,
            elements.len(),
            rule.len(),
            shape
        );

        let trial_components = mode_components(self.trial.kind(), trial_mode, dim);
        let test_components = mode_components(self.test.kind(), test_mode, dim);
        let ndof_trial = self.trial.element_dof_count(boundary);
        let ndof_test = self.test.element_dof_count(boundary);
        let nq = rule.len();

        let mut trial_basis = DMatrix::zeros(nq * trial_components, ndof_trial);
        self.trial.tabulate(boundary, trial_mode, rule, &mut trial_basis)?;
        let mut test_basis = DMatrix::zeros(nq * test_components, ndof_test);
        self.test.tabulate(boundary, test_mode, rule, &mut test_basis)?;

        let mut trial_dofs = vec![0usize; elements.len() * ndof_trial];
        for (i, &element) in elements.iter().enumerate() {
            self.trial
                .populate_element_dofs(boundary, element, &mut trial_dofs[i * ndof_trial..][..ndof_trial]);
        }
        let mut test_dofs = vec![0usize; elements.len() * ndof_test];
        for (i, &element) in elements.iter().enumerate() {
            self.test
                .populate_element_dofs(boundary, element, &mut test_dofs[i * ndof_test..][..ndof_test]);
        }

        // Constant scalars are evaluated once here; everything else is
        // evaluated per point inside the build loop.
        let constant_scalar = match (shape, &constant) {
            (CoefficientShape::ConstantScalar, Some(value)) => {
                let mut packed = [T::zero(); 1];
                value.write_to(&mut packed);
                Some(packed[0])
            }
            _ => None,
        };
        let value_len = C::Value::SHAPE.packed_len();

        let mut qdata = vec![T::zero(); elements.len() * nq * kernels.qdata_size];
        let geometry = self.geometry;
        let build = kernels.build;
        let qdata_size = kernels.qdata_size;
        elements
            .par_iter()
            .zip(qdata.par_chunks_mut(nq * qdata_size))
            .map(|(&element, element_qdata)| {
                let mut packed = [T::zero(); 9];
                for (point, block) in rule.points().iter().zip(element_qdata.chunks_mut(qdata_size))
                {
                    let transformation = geometry.element_transformation(boundary, element, point);
                    let packed_len = match constant_scalar {
                        Some(value) => {
                            packed[0] = value;
                            1
                        }
                        None => {
                            coefficient
                                .eval(&transformation, point)
                                .write_to(&mut packed[..value_len]);
                            value_len
                        }
                    };
                    let inputs = BuildInputs {
                        weight: point.weight,
                        jacobian: transformation.jacobian(),
                        dim,
                        coefficient: &packed[..packed_len],
                    };
                    (build)(&inputs, block)?;
                }
                Ok(())
            })
            .collect::<Result<()>>()?;

        // Negated forms negate the scalar context value and every per-point
        // entry after the shared build step, rather than using separate
        // kernels.
        let mut scale = constant_scalar.unwrap_or_else(T::one);
        if kind.negated() {
            scale = -scale;
            for value in &mut qdata {
                *value = -*value;
            }
        }

        let descriptor = LocalOperatorDescriptor {
            trial_mode,
            test_mode,
            trial_components,
            test_components,
            qdata_size,
            scale,
            apply: kernels.apply,
        };

        let operator = LocalOperator::from_parts(
            descriptor,
            elements.to_vec(),
            trial_dofs,
            test_dofs,
            ndof_trial,
            ndof_test,
            trial_basis,
            test_basis,
            qdata,
            nq,
            self.test.num_dofs(),
            self.trial.num_dofs(),
        );
        let transpose = (!kind.self_adjoint()).then(|| operator.transposed());
        Ok((operator, transpose))
    }
}
