//! Build/apply kernel pairs and the kernel registry.
//!
//! A build kernel folds the quadrature weight, the element geometry and the
//! coefficient value at one integration point into a compact per-point data
//! block; an apply kernel contracts that block against basis-function
//! components. Matrix-valued data is symmetric and stored packed
//! (upper triangle, row-major).

use crate::Real;
use eyre::{eyre, Result};
use nalgebra::{Matrix2, Matrix3, Vector3};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Geometric transform family shared by a group of differential operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KernelFamily {
    /// Identity-mapped (H1/L2) basis values: data is `w·vol·c`.
    Interp,
    /// Covariant Piola transform (H(curl) values, H1 gradients):
    /// `w·vol·J⁻¹ C J⁻ᵀ`, with the pseudo-inverse on boundary faces.
    CovariantPiola,
    /// Contravariant Piola transform (H(div) values, 3-D curls):
    /// `w/vol·Jᵀ C J`.
    ContravariantPiola,
    /// Scalar derivative scaling (divergences, 2-D curls): `w/vol·c`.
    ScalarDeriv,
}

/// Runtime shape of the coefficient fed to a kernel.
///
/// `ConstantScalar` is an explicit constructed-kind tag: true scalar constants
/// skip per-point coefficient evaluation during the build phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoefficientShape {
    ConstantScalar,
    Scalar,
    Vector,
    Matrix,
}

/// Key identifying a build/apply kernel pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KernelKey {
    /// Effective integration dimension: the mesh dimension, reduced by one for
    /// boundary integrals.
    pub dim: usize,
    pub family: KernelFamily,
    pub shape: CoefficientShape,
}

/// Inputs to a build kernel at a single integration point.
#[derive(Debug)]
pub struct BuildInputs<'a, T: Real> {
    pub weight: T,
    /// Jacobian columns of the element map, padded to 3×3 (`dim` leading
    /// columns are meaningful).
    pub jacobian: &'a Matrix3<T>,
    pub dim: usize,
    /// Coefficient value packed by shape: 1, 3 or 9 entries (column-major for
    /// matrices).
    pub coefficient: &'a [T],
}

pub type BuildKernel<T> = fn(&BuildInputs<'_, T>, &mut [T]) -> Result<()>;

/// Contracts one per-point data block against trial components `u`, writing
/// test components `v`.
pub type ApplyKernel<T> = fn(&[T], &[T], &mut [T]);

/// A build/apply kernel pair plus the per-point data size it writes and
/// consumes.
#[derive(Debug, Clone, Copy)]
pub struct KernelPair<T: Real> {
    pub build: BuildKernel<T>,
    pub apply: ApplyKernel<T>,
    pub qdata_size: usize,
}

/// Registry mapping kernel keys to build/apply pairs.
pub trait KernelRegistry<T: Real> {
    fn lookup(&self, key: &KernelKey) -> Option<KernelPair<T>>;
}

/// Packed size of a symmetric `dim`×`dim` per-point data block.
pub fn symmetric_qdata_size(dim: usize) -> usize {
    dim * (dim + 1) / 2
}

/// Registry of the standard kernel families for boundary (2-D) and domain
/// (3-D) integrals.
#[derive(Debug)]
pub struct StandardKernelRegistry<T: Real> {
    kernels: FxHashMap<KernelKey, KernelPair<T>>,
}

impl<T: Real> Default for StandardKernelRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Real> StandardKernelRegistry<T> {
    pub fn new() -> Self {
        let mut registry = Self {
            kernels: FxHashMap::default(),
        };

        for dim in [2usize, 3] {
            let apply_sym: ApplyKernel<T> = if dim == 3 {
                apply_symmetric3
            } else {
                apply_symmetric2
            };
            let sym = symmetric_qdata_size(dim);

            // Scalar constants reuse the quadrature-scalar build kernels; the
            // specialization is that the assembler evaluates the coefficient
            // once instead of per point.
            for shape in [CoefficientShape::ConstantScalar, CoefficientShape::Scalar] {
                registry.insert(
                    KernelKey {
                        dim,
                        family: KernelFamily::Interp,
                        shape,
                    },
                    KernelPair {
                        build: build_interp_scalar,
                        apply: apply_point_scalar,
                        qdata_size: 1,
                    },
                );
                registry.insert(
                    KernelKey {
                        dim,
                        family: KernelFamily::ScalarDeriv,
                        shape,
                    },
                    KernelPair {
                        build: build_deriv_scalar,
                        apply: apply_point_scalar,
                        qdata_size: 1,
                    },
                );
                registry.insert(
                    KernelKey {
                        dim,
                        family: KernelFamily::CovariantPiola,
                        shape,
                    },
                    KernelPair {
                        build: build_covariant_scalar,
                        apply: apply_sym,
                        qdata_size: sym,
                    },
                );
                registry.insert(
                    KernelKey {
                        dim,
                        family: KernelFamily::ContravariantPiola,
                        shape,
                    },
                    KernelPair {
                        build: build_contravariant_scalar,
                        apply: apply_sym,
                        qdata_size: sym,
                    },
                );
            }

            registry.insert(
                KernelKey {
                    dim,
                    family: KernelFamily::CovariantPiola,
                    shape: CoefficientShape::Vector,
                },
                KernelPair {
                    build: build_covariant_vector,
                    apply: apply_sym,
                    qdata_size: sym,
                },
            );
            registry.insert(
                KernelKey {
                    dim,
                    family: KernelFamily::CovariantPiola,
                    shape: CoefficientShape::Matrix,
                },
                KernelPair {
                    build: build_covariant_matrix,
                    apply: apply_sym,
                    qdata_size: sym,
                },
            );
            registry.insert(
                KernelKey {
                    dim,
                    family: KernelFamily::ContravariantPiola,
                    shape: CoefficientShape::Vector,
                },
                KernelPair {
                    build: build_contravariant_vector,
                    apply: apply_sym,
                    qdata_size: sym,
                },
            );
            registry.insert(
                KernelKey {
                    dim,
                    family: KernelFamily::ContravariantPiola,
                    shape: CoefficientShape::Matrix,
                },
                KernelPair {
                    build: build_contravariant_matrix,
                    apply: apply_sym,
                    qdata_size: sym,
                },
            );
        }

        registry
    }

    /// Register or replace a kernel pair, e.g. a backend-specific
    /// specialization.
    pub fn insert(&mut self, key: KernelKey, pair: KernelPair<T>) {
        self.kernels.insert(key, pair);
    }
}

impl<T: Real> KernelRegistry<T> for StandardKernelRegistry<T> {
    fn lookup(&self, key: &KernelKey) -> Option<KernelPair<T>> {
        self.kernels.get(key).copied()
    }
}

/// Volume measure of the element map: `|det J|` for square Jacobians, the Gram
/// determinant square root for boundary faces.
pub(crate) fn volume_measure<T: Real>(jacobian: &Matrix3<T>, dim: usize) -> Result<T> {
    match dim {
        3 => Ok(jacobian.determinant().abs()),
        2 => {
            let j = jacobian.fixed_columns::<2>(0);
            let gram: Matrix2<T> = j.tr_mul(&j);
            Ok(gram.determinant().max(T::zero()).sqrt())
        }
        _ => Err(eyre!("unsupported integration dimension {dim}")),
    }
}

/// Covariant transform factor: `J⁻¹` for square Jacobians, the pseudo-inverse
/// `(JᵀJ)⁻¹Jᵀ` for boundary faces, padded to 3×3 (`dim` leading rows).
pub(crate) fn covariant_factor<T: Real>(jacobian: &Matrix3<T>, dim: usize) -> Result<Matrix3<T>> {
    match dim {
        3 => jacobian
            .try_inverse()
            .ok_or_else(|| eyre!("singular element Jacobian in build kernel")),
        2 => {
            let j = jacobian.fixed_columns::<2>(0).clone_owned();
            let gram: Matrix2<T> = j.tr_mul(&j);
            let gram_inv = gram
                .try_inverse()
                .ok_or_else(|| eyre!("degenerate boundary face Jacobian in build kernel"))?;
            let pseudo = gram_inv * j.transpose();
            let mut padded = Matrix3::zeros();
            padded.fixed_rows_mut::<2>(0).copy_from(&pseudo);
            Ok(padded)
        }
        _ => Err(eyre!("unsupported integration dimension {dim}")),
    }
}

fn pack_symmetric<T: Real>(matrix: &Matrix3<T>, dim: usize, scale: T, output: &mut [T]) {
    let half = nalgebra::convert::<f64, T>(0.5);
    let mut k = 0;
    for i in 0..dim {
        for j in i..dim {
            output[k] = scale * half * (matrix[(i, j)] + matrix[(j, i)]);
            k += 1;
        }
    }
}

fn build_interp_scalar<T: Real>(inputs: &BuildInputs<'_, T>, qdata: &mut [T]) -> Result<()> {
    let vol = volume_measure(inputs.jacobian, inputs.dim)?;
    qdata[0] = inputs.weight * vol * inputs.coefficient[0];
    Ok(())
}

fn build_deriv_scalar<T: Real>(inputs: &BuildInputs<'_, T>, qdata: &mut [T]) -> Result<()> {
    let vol = volume_measure(inputs.jacobian, inputs.dim)?;
    if vol == T::zero() {
        return Err(eyre!("singular element Jacobian in build kernel"));
    }
    qdata[0] = inputs.weight / vol * inputs.coefficient[0];
    Ok(())
}

fn build_covariant<T: Real>(
    inputs: &BuildInputs<'_, T>,
    coefficient: &Matrix3<T>,
    qdata: &mut [T],
) -> Result<()> {
    let vol = volume_measure(inputs.jacobian, inputs.dim)?;
    let factor = covariant_factor(inputs.jacobian, inputs.dim)?;
    let transformed = factor * coefficient * factor.transpose();
    pack_symmetric(&transformed, inputs.dim, inputs.weight * vol, qdata);
    Ok(())
}

fn build_contravariant<T: Real>(
    inputs: &BuildInputs<'_, T>,
    coefficient: &Matrix3<T>,
    qdata: &mut [T],
) -> Result<()> {
    let vol = volume_measure(inputs.jacobian, inputs.dim)?;
    if vol == T::zero() {
        return Err(eyre!("singular element Jacobian in build kernel"));
    }
    let transformed = inputs.jacobian.tr_mul(&(coefficient * inputs.jacobian));
    pack_symmetric(&transformed, inputs.dim, inputs.weight / vol, qdata);
    Ok(())
}

fn build_covariant_scalar<T: Real>(inputs: &BuildInputs<'_, T>, qdata: &mut [T]) -> Result<()> {
    let coefficient = Matrix3::from_diagonal_element(inputs.coefficient[0]);
    build_covariant(inputs, &coefficient, qdata)
}

fn build_covariant_vector<T: Real>(inputs: &BuildInputs<'_, T>, qdata: &mut [T]) -> Result<()> {
    let diagonal = Vector3::new(
        inputs.coefficient[0],
        inputs.coefficient[1],
        inputs.coefficient[2],
    );
    build_covariant(inputs, &Matrix3::from_diagonal(&diagonal), qdata)
}

fn build_covariant_matrix<T: Real>(inputs: &BuildInputs<'_, T>, qdata: &mut [T]) -> Result<()> {
    let coefficient = Matrix3::from_column_slice(inputs.coefficient);
    build_covariant(inputs, &coefficient, qdata)
}

fn build_contravariant_scalar<T: Real>(inputs: &BuildInputs<'_, T>, qdata: &mut [T]) -> Result<()> {
    let coefficient = Matrix3::from_diagonal_element(inputs.coefficient[0]);
    build_contravariant(inputs, &coefficient, qdata)
}

fn build_contravariant_vector<T: Real>(inputs: &BuildInputs<'_, T>, qdata: &mut [T]) -> Result<()> {
    let diagonal = Vector3::new(
        inputs.coefficient[0],
        inputs.coefficient[1],
        inputs.coefficient[2],
    );
    build_contravariant(inputs, &Matrix3::from_diagonal(&diagonal), qdata)
}

fn build_contravariant_matrix<T: Real>(inputs: &BuildInputs<'_, T>, qdata: &mut [T]) -> Result<()> {
    let coefficient = Matrix3::from_column_slice(inputs.coefficient);
    build_contravariant(inputs, &coefficient, qdata)
}

fn apply_point_scalar<T: Real>(qdata: &[T], u: &[T], v: &mut [T]) {
    v[0] = qdata[0] * u[0];
}

fn apply_symmetric2<T: Real>(qdata: &[T], u: &[T], v: &mut [T]) {
    v[0] = qdata[0] * u[0] + qdata[1] * u[1];
    v[1] = qdata[1] * u[0] + qdata[2] * u[1];
}

fn apply_symmetric3<T: Real>(qdata: &[T], u: &[T], v: &mut [T]) {
    v[0] = qdata[0] * u[0] + qdata[1] * u[1] + qdata[2] * u[2];
    v[1] = qdata[1] * u[0] + qdata[3] * u[1] + qdata[4] * u[2];
    v[2] = qdata[2] * u[0] + qdata[4] * u[1] + qdata[5] * u[2];
}
