//! Resolution of the volumetric elements adjacent to a boundary face.
//!
//! Every two-sided evaluator goes through [`FaceNeighborResolver`] instead of
//! reimplementing adjacency and orientation handling. Exterior boundaries,
//! faces interior to the subdomain and faces shared with another subdomain are
//! indistinguishable to the caller apart from the presence and kind of the
//! second side.

use crate::material::MaterialPropertyTable;
use crate::mesh::{ElementKind, ElementRef, ElementTransformation, FaceSide, InterfaceTopology};
use crate::quadrature::IntegrationPoint;
use crate::Real;
use nalgebra::{Point2, Point3, Vector3};
use std::marker::PhantomData;

/// One side of a resolved boundary face: the adjacent volumetric element, its
/// attribute and the evaluation point mapped into its reference coordinates.
#[derive(Debug, Clone)]
pub struct SideEvaluation<T: Real> {
    pub element: ElementRef,
    pub attribute: i32,
    pub point: Point3<T>,
}

/// The volumetric neighbors of a boundary face at one integration point.
///
/// `side2` is `None` for true exterior boundaries. When both sides exist they
/// map to the same physical point on the shared face.
#[derive(Debug, Clone)]
pub struct FaceAdjacency<T: Real> {
    pub side1: SideEvaluation<T>,
    pub side2: Option<SideEvaluation<T>>,
}

impl<T: Real> FaceAdjacency<T> {
    /// The side with the higher wave speed, i.e. the vacuum side of a material
    /// interface. Falls back to side 1 when single-sided or when the bounds do
    /// not strictly separate the sides.
    ///
    /// Deterministic regardless of which rank owns which side: the decision
    /// depends only on the two attributes.
    pub fn higher_wave_speed_side(&self, materials: &MaterialPropertyTable<T>) -> &SideEvaluation<T> {
        match &self.side2 {
            Some(side2)
                if materials.wave_speed_min(side2.attribute)
                    > materials.wave_speed_max(self.side1.attribute) =>
            {
                side2
            }
            _ => &self.side1,
        }
    }

    /// The side with the larger material property magnitude (lower wave speed),
    /// i.e. the physical, non-vacuum side. Falls back to side 1 when
    /// single-sided or when the bounds do not strictly separate the sides.
    pub fn larger_property_side(&self, materials: &MaterialPropertyTable<T>) -> &SideEvaluation<T> {
        match &self.side2 {
            Some(side2)
                if materials.wave_speed_max(side2.attribute)
                    < materials.wave_speed_min(self.side1.attribute) =>
            {
                side2
            }
            _ => &self.side1,
        }
    }

    /// The side selected by an explicit direction vector: side 2 when the
    /// inward vector opposes `direction`, side 1 otherwise.
    pub fn directed_side(&self, inward: &Vector3<T>, direction: &Vector3<T>) -> &SideEvaluation<T> {
        match &self.side2 {
            Some(side2) if inward.dot(direction) < T::zero() => side2,
            _ => &self.side1,
        }
    }
}

/// Resolves boundary elements to their adjacent volumetric elements.
///
/// Side 1 always exists. For faces shared with another subdomain the resolver
/// requires that neighbor data was exchanged beforehand; it does not perform or
/// await that exchange. The boundary-to-face integration-point remap is applied
/// by the topology before either side is evaluated.
#[derive(Debug)]
pub struct FaceNeighborResolver<'a, T, Topology: ?Sized> {
    topology: &'a Topology,
    marker: PhantomData<T>,
}

impl<'a, T, Topology: ?Sized> FaceNeighborResolver<'a, T, Topology> {
    pub fn new(topology: &'a Topology) -> Self {
        Self {
            topology,
            marker: PhantomData,
        }
    }
}

impl<'a, T, Topology> FaceNeighborResolver<'a, T, Topology>
where
    T: Real,
    Topology: InterfaceTopology<T> + ?Sized,
{
    /// Resolve the elements on both sides of the boundary element's face.
    ///
    /// # Panics
    ///
    /// Panics if `transformation` is not a boundary transformation.
    pub fn resolve(
        &self,
        transformation: &ElementTransformation<T>,
        point: &IntegrationPoint<T>,
    ) -> FaceAdjacency<T> {
        assert_eq!(
            transformation.kind(),
            ElementKind::Boundary,
            "face neighbor resolution requires a boundary element transformation"
        );
        let (face, orientation) = self.topology.boundary_element_face(transformation.index());
        let (element1, second) = self.topology.face_elements(face);
        let face_point = point.face_point();

        let side1 = self.side(face, orientation, ElementRef::Local(element1), &face_point);
        let side2 = match second {
            FaceSide::Exterior => None,
            FaceSide::Local(element) => {
                Some(self.side(face, orientation, ElementRef::Local(element), &face_point))
            }
            FaceSide::Shared(ghost) => {
                Some(self.side(face, orientation, ElementRef::Ghost(ghost), &face_point))
            }
        };

        FaceAdjacency { side1, side2 }
    }

    /// Like [`resolve`](Self::resolve), additionally returning the vector from
    /// the face centroid to element 1's centroid.
    ///
    /// The vector is independent of the integration point and is meant for sign
    /// disambiguation only, not as a per-point normal.
    pub fn resolve_with_inward(
        &self,
        transformation: &ElementTransformation<T>,
        point: &IntegrationPoint<T>,
    ) -> (FaceAdjacency<T>, Vector3<T>) {
        let adjacency = self.resolve(transformation, point);
        let (face, _) = self.topology.boundary_element_face(transformation.index());
        let inward = self.topology.element_centroid(adjacency.side1.element)
            - self.topology.face_centroid(face);
        (adjacency, inward)
    }

    fn side(
        &self,
        face: usize,
        orientation: i32,
        element: ElementRef,
        face_point: &Point2<T>,
    ) -> SideEvaluation<T> {
        SideEvaluation {
            element,
            attribute: self.topology.element_attribute(element),
            point: self
                .topology
                .face_point_in_element(face, orientation, element, face_point),
        }
    }
}
