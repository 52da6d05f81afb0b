//! Coefficient evaluation and matrix-free operator assembly for electromagnetic
//! finite element analysis.
//!
//! The crate has two halves. The [`coefficient`] module evaluates material- and
//! field-dependent quantities at integration points, including on interior
//! boundary faces where the underlying field is two-sided and possibly
//! discontinuous. The [`assembly`] module turns a differential-operator kind and
//! an evaluated coefficient into matrix-free operators that can be applied,
//! transposed and diagonally extracted without forming a global sparse matrix.
//!
//! Mesh topology, basis tabulation and quadrature-rule construction are
//! collaborator concerns, expressed as traits in [`mesh`], [`space`] and
//! [`quadrature`]; the crate borrows them for the duration of a simulation
//! session and never mutates them.

use nalgebra::RealField;

pub mod assembly;
pub mod coefficient;
pub mod field;
pub mod material;
pub mod mesh;
pub mod quadrature;
pub mod space;

pub extern crate nalgebra;

/// Scalar type used throughout the crate.
///
/// Trait alias for real field types that are cheap to copy.
pub trait Real: RealField + Copy {}

impl<T> Real for T where T: RealField + Copy {}
