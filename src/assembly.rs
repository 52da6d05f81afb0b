//! Matrix-free operator assembly.
//!
//! Assembly proceeds in two phases. The *build* phase evaluates a coefficient
//! once per quadrature point per element and writes a compact per-point data
//! buffer through a build kernel. The *apply* phase is a pure function of that
//! buffer and the tabulated basis, reusable for repeated operator applications
//! without re-evaluating the coefficient.

pub mod integrator;
pub mod kernels;
pub mod operator;
pub mod source;

pub use integrator::{OperatorAssembler, OperatorKind};
pub use kernels::{
    CoefficientShape, KernelFamily, KernelKey, KernelPair, KernelRegistry, StandardKernelRegistry,
};
pub use operator::{AssembledOperator, LocalOperator, LocalOperatorDescriptor, SymmetricOperator};
