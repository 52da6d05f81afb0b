//! Discrete field collaborator traits.
//!
//! Fields are finite element solution functions owned by the session. The only
//! capability the crate needs is point evaluation on a volumetric element,
//! including ghost elements whose data a prior parallel exchange made available
//! locally; evaluating on a `Ghost` element without that exchange is a
//! precondition violation on the caller's side.

use crate::mesh::ElementRef;
use crate::Real;
use nalgebra::{Point3, Vector3};

/// A discrete vector-valued field evaluable at a reference point of a
/// volumetric element.
pub trait VectorFieldFunction<T: Real> {
    fn vector_value(&self, element: ElementRef, point: &Point3<T>) -> Vector3<T>;
}

/// A discrete scalar-valued field evaluable at a reference point of a
/// volumetric element.
pub trait ScalarFieldFunction<T: Real> {
    fn value(&self, element: ElementRef, point: &Point3<T>) -> T;
}

impl<T, F> VectorFieldFunction<T> for F
where
    T: Real,
    F: Fn(ElementRef, &Point3<T>) -> Vector3<T>,
{
    fn vector_value(&self, element: ElementRef, point: &Point3<T>) -> Vector3<T> {
        self(element, point)
    }
}

impl<T, F> ScalarFieldFunction<T> for F
where
    T: Real,
    F: Fn(ElementRef, &Point3<T>) -> T,
{
    fn value(&self, element: ElementRef, point: &Point3<T>) -> T {
        self(element, point)
    }
}
