//! Matrix-free local and assembled operators.

use crate::assembly::kernels::ApplyKernel;
use crate::space::EvalMode;
use crate::Real;
use davenport::{define_thread_local_workspace, with_thread_local_workspace};
use itertools::izip;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CsrMatrix};

/// Kernel selection and per-point data layout of a local operator.
#[derive(Debug, Clone, Copy)]
pub struct LocalOperatorDescriptor<T: Real> {
    pub trial_mode: EvalMode,
    pub test_mode: EvalMode,
    /// Components per trial basis function at each integration point.
    pub trial_components: usize,
    /// Components per test basis function at each integration point.
    pub test_components: usize,
    /// Entries of the per-point data block (triangular for symmetric data).
    pub qdata_size: usize,
    /// Constant-coefficient context value. Already folded into the per-point
    /// data; negated together with it for negated forms.
    pub scale: T,
    pub apply: ApplyKernel<T>,
}

#[derive(Debug)]
struct ApplyWorkspace<T: Real> {
    x_local: DVector<T>,
    u: DVector<T>,
    v: DVector<T>,
    y_local: DVector<T>,
    element_matrix: DMatrix<T>,
}

impl<T: Real> Default for ApplyWorkspace<T> {
    fn default() -> Self {
        Self {
            x_local: DVector::zeros(0),
            u: DVector::zeros(0),
            v: DVector::zeros(0),
            y_local: DVector::zeros(0),
            element_matrix: DMatrix::zeros(0, 0),
        }
    }
}

define_thread_local_workspace!(WORKSPACE);

/// A matrix-free local operator over one batch of elements sharing a kernel,
/// reference geometry and tabulated basis.
///
/// The per-point data buffer is written once at construction; `apply_add` is a
/// pure function of it and never re-evaluates the coefficient. Scratch buffers
/// for gather/apply/scatter live in thread-local workspaces, so a single
/// instance may be applied from concurrent callers.
#[derive(Debug)]
pub struct LocalOperator<T: Real> {
    descriptor: LocalOperatorDescriptor<T>,
    elements: Vec<usize>,
    trial_dofs: Vec<usize>,
    test_dofs: Vec<usize>,
    ndof_trial: usize,
    ndof_test: usize,
    trial_basis: DMatrix<T>,
    test_basis: DMatrix<T>,
    qdata: Vec<T>,
    num_points: usize,
    height: usize,
    width: usize,
}

impl<T: Real> LocalOperator<T> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        descriptor: LocalOperatorDescriptor<T>,
        elements: Vec<usize>,
        trial_dofs: Vec<usize>,
        test_dofs: Vec<usize>,
        ndof_trial: usize,
        ndof_test: usize,
        trial_basis: DMatrix<T>,
        test_basis: DMatrix<T>,
        qdata: Vec<T>,
        num_points: usize,
        height: usize,
        width: usize,
    ) -> Self {
        assert_eq!(trial_dofs.len(), elements.len() * ndof_trial);
        assert_eq!(test_dofs.len(), elements.len() * ndof_test);
        assert_eq!(
            qdata.len(),
            elements.len() * num_points * descriptor.qdata_size
        );
        assert_eq!(
            trial_basis.shape(),
            (num_points * descriptor.trial_components, ndof_trial)
        );
        assert_eq!(
            test_basis.shape(),
            (num_points * descriptor.test_components, ndof_test)
        );
        Self {
            descriptor,
            elements,
            trial_dofs,
            test_dofs,
            ndof_trial,
            ndof_test,
            trial_basis,
            test_basis,
            qdata,
            num_points,
            height,
            width,
        }
    }

    pub fn descriptor(&self) -> &LocalOperatorDescriptor<T> {
        &self.descriptor
    }

    pub fn elements(&self) -> &[usize] {
        &self.elements
    }

    /// Per-point data buffer, for diagnostics.
    pub fn qdata(&self) -> &[T] {
        &self.qdata
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// Test space dimension.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Trial space dimension.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The transposed operator, sharing the symmetric per-point data with
    /// trial/test roles swapped.
    pub(crate) fn transposed(&self) -> LocalOperator<T> {
        let descriptor = LocalOperatorDescriptor {
            trial_mode: self.descriptor.test_mode,
            test_mode: self.descriptor.trial_mode,
            trial_components: self.descriptor.test_components,
            test_components: self.descriptor.trial_components,
            qdata_size: self.descriptor.qdata_size,
            scale: self.descriptor.scale,
            apply: self.descriptor.apply,
        };
        LocalOperator {
            descriptor,
            elements: self.elements.clone(),
            trial_dofs: self.test_dofs.clone(),
            test_dofs: self.trial_dofs.clone(),
            ndof_trial: self.ndof_test,
            ndof_test: self.ndof_trial,
            trial_basis: self.test_basis.clone(),
            test_basis: self.trial_basis.clone(),
            qdata: self.qdata.clone(),
            num_points: self.num_points,
            height: self.width,
            width: self.height,
        }
    }

    /// `y += A x` through element-local gather, per-point apply and scatter.
    pub fn apply_add(&self, x: &DVector<T>, y: &mut DVector<T>) {
        assert_eq!(x.len(), self.width, "input dimension mismatch");
        assert_eq!(y.len(), self.height, "output dimension mismatch");

        let d = &self.descriptor;
        let nq = self.num_points;

        with_thread_local_workspace(&WORKSPACE, |ws: &mut ApplyWorkspace<T>| {
            ws.x_local.resize_vertically_mut(self.ndof_trial, T::zero());
            ws.y_local.resize_vertically_mut(self.ndof_test, T::zero());
            ws.u.resize_vertically_mut(nq * d.trial_components, T::zero());
            ws.v.resize_vertically_mut(nq * d.test_components, T::zero());

            let element_iter = izip!(
                self.trial_dofs.chunks_exact(self.ndof_trial),
                self.test_dofs.chunks_exact(self.ndof_test),
                self.qdata.chunks_exact(nq * d.qdata_size)
            );
            for (trial_dofs, test_dofs, qdata) in element_iter {
                for (local, &dof) in trial_dofs.iter().enumerate() {
                    ws.x_local[local] = x[dof];
                }
                ws.u.gemv(T::one(), &self.trial_basis, &ws.x_local, T::zero());
                for point in 0..nq {
                    let block = &qdata[point * d.qdata_size..][..d.qdata_size];
                    let u = &ws.u.as_slice()[point * d.trial_components..][..d.trial_components];
                    let v =
                        &mut ws.v.as_mut_slice()[point * d.test_components..][..d.test_components];
                    (d.apply)(block, u, v);
                }
                ws.y_local.gemv_tr(T::one(), &self.test_basis, &ws.v, T::zero());
                for (local, &dof) in test_dofs.iter().enumerate() {
                    y[dof] += ws.y_local[local];
                }
            }
        });
    }

    /// Accumulate the operator diagonal through the closed-form contraction of
    /// the test basis with the per-point data.
    ///
    /// # Panics
    ///
    /// Panics unless trial and test layouts coincide; diagonal extraction has
    /// no meaning for rectangular local operators.
    pub fn diagonal_add(&self, diagonal: &mut DVector<T>) {
        assert!(
            self.ndof_trial == self.ndof_test && self.trial_dofs == self.test_dofs,
            "diagonal extraction requires identical trial and test layouts"
        );
        assert_eq!(diagonal.len(), self.height, "output dimension mismatch");

        let d = &self.descriptor;
        let nq = self.num_points;
        let mut u = [T::zero(); 3];
        let mut v = [T::zero(); 3];

        let element_iter = izip!(
            self.test_dofs.chunks_exact(self.ndof_test),
            self.qdata.chunks_exact(nq * d.qdata_size)
        );
        for (test_dofs, qdata) in element_iter {
            for (local, &dof) in test_dofs.iter().enumerate() {
                let mut entry = T::zero();
                for point in 0..nq {
                    for c in 0..d.trial_components {
                        u[c] = self.trial_basis[(point * d.trial_components + c, local)];
                    }
                    (d.apply)(
                        &qdata[point * d.qdata_size..][..d.qdata_size],
                        &u[..d.trial_components],
                        &mut v[..d.test_components],
                    );
                    for c in 0..d.test_components {
                        entry += self.test_basis[(point * d.test_components + c, local)] * v[c];
                    }
                }
                diagonal[dof] += entry;
            }
        }
    }

    fn element_matrix_into(&self, qdata: &[T], output: &mut DMatrix<T>) {
        let d = &self.descriptor;
        let nq = self.num_points;
        let mut u = [T::zero(); 3];
        let mut v = [T::zero(); 3];

        output.fill(T::zero());
        for point in 0..nq {
            let block = &qdata[point * d.qdata_size..][..d.qdata_size];
            for j in 0..self.ndof_trial {
                for c in 0..d.trial_components {
                    u[c] = self.trial_basis[(point * d.trial_components + c, j)];
                }
                (d.apply)(block, &u[..d.trial_components], &mut v[..d.test_components]);
                for i in 0..self.ndof_test {
                    let mut entry = T::zero();
                    for c in 0..d.test_components {
                        entry += self.test_basis[(point * d.test_components + c, i)] * v[c];
                    }
                    output[(i, j)] += entry;
                }
            }
        }
    }

    fn accumulate_triplets(&self, coo: &mut CooMatrix<T>) {
        let nq = self.num_points;
        with_thread_local_workspace(&WORKSPACE, |ws: &mut ApplyWorkspace<T>| {
            ws.element_matrix
                .resize_mut(self.ndof_test, self.ndof_trial, T::zero());
            let element_iter = izip!(
                self.trial_dofs.chunks_exact(self.ndof_trial),
                self.test_dofs.chunks_exact(self.ndof_test),
                self.qdata.chunks_exact(nq * self.descriptor.qdata_size)
            );
            for (trial_dofs, test_dofs, qdata) in element_iter {
                self.element_matrix_into(qdata, &mut ws.element_matrix);
                for (j, &col) in trial_dofs.iter().enumerate() {
                    for (i, &row) in test_dofs.iter().enumerate() {
                        let value = ws.element_matrix[(i, j)];
                        if value != T::zero() {
                            coo.push(row, col, value);
                        }
                    }
                }
            }
        });
    }
}

/// A linear operator assembled from matrix-free local operators, one per
/// disjoint element batch.
///
/// `apply` sums the restriction-based local contributions without extra
/// scaling; the injected DOF multiplicity is used only to average the
/// assembled diagonal across subdomains.
#[derive(Debug)]
pub struct AssembledOperator<T: Real> {
    height: usize,
    width: usize,
    operators: Vec<LocalOperator<T>>,
    transposes: Vec<Option<LocalOperator<T>>>,
    dof_multiplicity: Option<DVector<T>>,
}

impl<T: Real> AssembledOperator<T> {
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            operators: Vec::new(),
            transposes: Vec::new(),
            dof_multiplicity: None,
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn num_local_operators(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Add a local operator, with its transpose for non-self-adjoint forms.
    pub fn push(&mut self, operator: LocalOperator<T>, transpose: Option<LocalOperator<T>>) {
        assert_eq!(operator.height(), self.height, "local operator height mismatch");
        assert_eq!(operator.width(), self.width, "local operator width mismatch");
        if let Some(transpose) = &transpose {
            assert_eq!(transpose.height(), self.width, "transpose height mismatch");
            assert_eq!(transpose.width(), self.height, "transpose width mismatch");
        }
        self.operators.push(operator);
        self.transposes.push(transpose);
    }

    /// Inject the per-dof multiplicity used to average shared contributions
    /// during diagonal assembly.
    pub fn set_dof_multiplicity(&mut self, multiplicity: DVector<T>) {
        assert_eq!(multiplicity.len(), self.height, "multiplicity dimension mismatch");
        self.dof_multiplicity = Some(multiplicity);
    }

    /// `y = A x`.
    pub fn apply(&self, x: &DVector<T>, y: &mut DVector<T>) {
        y.fill(T::zero());
        self.apply_add(x, y);
    }

    /// `y += A x`, accumulating across local operators that share dofs.
    pub fn apply_add(&self, x: &DVector<T>, y: &mut DVector<T>) {
        assert_eq!(x.len(), self.width, "input dimension mismatch");
        assert_eq!(y.len(), self.height, "output dimension mismatch");
        for operator in &self.operators {
            operator.apply_add(x, y);
        }
    }

    /// `y = Aᵀ x`.
    ///
    /// # Panics
    ///
    /// Panics if any local operator lacks a transpose handle; self-adjoint
    /// forms should be wrapped in [`SymmetricOperator`] instead.
    pub fn apply_transpose(&self, x: &DVector<T>, y: &mut DVector<T>) {
        y.fill(T::zero());
        self.apply_transpose_add(x, y);
    }

    /// `y += Aᵀ x`.
    pub fn apply_transpose_add(&self, x: &DVector<T>, y: &mut DVector<T>) {
        assert_eq!(x.len(), self.height, "input dimension mismatch");
        assert_eq!(y.len(), self.width, "output dimension mismatch");
        for transpose in &self.transposes {
            let transpose = transpose
                .as_ref()
                .expect("transposed apply requires transpose kernels for every local operator");
            transpose.apply_add(x, y);
        }
    }

    /// Assemble the operator diagonal, averaged by the DOF multiplicity when
    /// one was injected.
    pub fn assemble_diagonal(&self, diagonal: &mut DVector<T>) {
        assert_eq!(self.height, self.width, "diagonal requires a square operator");
        assert_eq!(diagonal.len(), self.height, "output dimension mismatch");
        diagonal.fill(T::zero());
        for operator in &self.operators {
            operator.diagonal_add(diagonal);
        }
        if let Some(multiplicity) = &self.dof_multiplicity {
            for (entry, count) in izip!(diagonal.iter_mut(), multiplicity.iter()) {
                *entry /= *count;
            }
        }
    }

    /// Explicit sparse assembly, strictly for diagnostics and direct solves;
    /// the default compute path is `apply`.
    pub fn to_csr(&self) -> CsrMatrix<T> {
        let mut coo = CooMatrix::new(self.height, self.width);
        for operator in &self.operators {
            operator.accumulate_triplets(&mut coo);
        }
        CsrMatrix::from(&coo)
    }
}

/// An assembled operator whose underlying form is self-adjoint: transposed
/// apply forwards to apply.
///
/// Wrapping a non-self-adjoint form is a usage error that silently produces
/// wrong transposed products; the assembler only offers this wrapper for kinds
/// documented as self-adjoint.
#[derive(Debug)]
pub struct SymmetricOperator<T: Real> {
    inner: AssembledOperator<T>,
}

impl<T: Real> SymmetricOperator<T> {
    pub fn new(inner: AssembledOperator<T>) -> Self {
        assert_eq!(
            inner.height(),
            inner.width(),
            "symmetric operators must be square"
        );
        Self { inner }
    }

    pub fn inner(&self) -> &AssembledOperator<T> {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut AssembledOperator<T> {
        &mut self.inner
    }

    pub fn into_inner(self) -> AssembledOperator<T> {
        self.inner
    }

    pub fn apply(&self, x: &DVector<T>, y: &mut DVector<T>) {
        self.inner.apply(x, y);
    }

    pub fn apply_add(&self, x: &DVector<T>, y: &mut DVector<T>) {
        self.inner.apply_add(x, y);
    }

    pub fn apply_transpose(&self, x: &DVector<T>, y: &mut DVector<T>) {
        self.inner.apply(x, y);
    }

    pub fn apply_transpose_add(&self, x: &DVector<T>, y: &mut DVector<T>) {
        self.inner.apply_add(x, y);
    }

    pub fn assemble_diagonal(&self, diagonal: &mut DVector<T>) {
        self.inner.assemble_diagonal(diagonal);
    }

    pub fn to_csr(&self) -> CsrMatrix<T> {
        self.inner.to_csr()
    }
}
