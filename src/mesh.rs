//! Mesh-facing data types and collaborator traits.
//!
//! The crate does not own mesh storage. Element transformations are produced by
//! the mesh collaborator and borrowed per evaluation, and all topology queries
//! go through [`InterfaceTopology`].

use crate::quadrature::IntegrationPoint;
use crate::Real;
use nalgebra::{Matrix3, Matrix3x2, Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Reference to a volumetric mesh element.
///
/// `Ghost` identifies an element owned by a neighboring subdomain whose field
/// and attribute data have been made available locally by a prior exchange. The
/// crate never performs or awaits that exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementRef {
    Local(usize),
    Ghost(usize),
}

/// Classification of the second side of a mesh face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaceSide {
    /// True one-sided exterior boundary.
    Exterior,
    /// Second element owned by this subdomain.
    Local(usize),
    /// Second element owned by a neighboring subdomain, identified by its index
    /// into the locally available ghost data.
    Shared(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    Domain,
    Boundary,
}

/// Geometric state of a mesh element or boundary face at a single integration
/// point: index, attribute, Jacobian of the reference-to-physical map and the
/// mapped physical coordinates.
///
/// The Jacobian occupies the leading columns of a 3×3 matrix: three columns for
/// domain elements, two for boundary faces. Handles are cheap to construct and
/// borrowed per call; the crate never stores them.
#[derive(Debug, Clone)]
pub struct ElementTransformation<T: Real> {
    kind: ElementKind,
    index: usize,
    attribute: i32,
    jacobian: Matrix3<T>,
    dim: usize,
    point: Point3<T>,
}

impl<T: Real> ElementTransformation<T> {
    pub fn domain(index: usize, attribute: i32, jacobian: Matrix3<T>, point: Point3<T>) -> Self {
        Self {
            kind: ElementKind::Domain,
            index,
            attribute,
            jacobian,
            dim: 3,
            point,
        }
    }

    pub fn boundary(index: usize, attribute: i32, jacobian: Matrix3x2<T>, point: Point3<T>) -> Self {
        let mut full = Matrix3::zeros();
        full.fixed_columns_mut::<2>(0).copy_from(&jacobian);
        Self {
            kind: ElementKind::Boundary,
            index,
            attribute,
            jacobian: full,
            dim: 2,
            point,
        }
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn attribute(&self) -> i32 {
        self.attribute
    }

    /// Reference dimension of the element: 3 for domain elements, 2 for boundary faces.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Jacobian columns of the reference-to-physical map, padded to 3×3.
    pub fn jacobian(&self) -> &Matrix3<T> {
        &self.jacobian
    }

    /// Physical coordinates of the current integration point.
    pub fn point(&self) -> &Point3<T> {
        &self.point
    }

    /// Unit normal of a boundary face at the current integration point.
    ///
    /// The orientation is that of the face parametrization; callers that need a
    /// particular sign must correct it themselves (e.g. against an
    /// inward-direction vector).
    ///
    /// # Panics
    ///
    /// Panics if the transformation is not a boundary transformation, or if the
    /// face Jacobian is degenerate.
    pub fn normal(&self) -> Vector3<T> {
        assert_eq!(
            self.kind,
            ElementKind::Boundary,
            "face normals require a boundary element transformation"
        );
        let normal = self.jacobian.column(0).cross(&self.jacobian.column(1));
        let norm = normal.norm();
        assert!(norm > T::zero(), "degenerate boundary face Jacobian");
        normal / norm
    }
}

/// Topology and geometry queries required to resolve the volumetric neighbors
/// of boundary elements.
///
/// Implementations back onto the session's (possibly distributed) mesh. For
/// faces shared with another subdomain, every query involving the `Shared` side
/// has the precondition that neighbor data was exchanged beforehand.
pub trait InterfaceTopology<T: Real> {
    /// Face index and boundary-element-to-face orientation for a boundary element.
    fn boundary_element_face(&self, boundary_element: usize) -> (usize, i32);

    /// The element on side 1 of a face and the classification of the second side.
    fn face_elements(&self, face: usize) -> (usize, FaceSide);

    fn element_attribute(&self, element: ElementRef) -> i32;

    /// Map an integration point on a boundary element to the reference
    /// coordinates of an adjacent element, applying the boundary-to-face
    /// orientation remap.
    fn face_point_in_element(
        &self,
        face: usize,
        orientation: i32,
        element: ElementRef,
        point: &Point2<T>,
    ) -> Point3<T>;

    fn face_centroid(&self, face: usize) -> Point3<T>;

    fn element_centroid(&self, element: ElementRef) -> Point3<T>;
}

/// Geometry queries used by the assembly build phase.
pub trait MeshGeometry<T: Real> {
    /// Element transformation configured at the given integration point.
    ///
    /// `boundary` selects between domain elements and boundary faces; `element`
    /// indexes into the respective element list.
    fn element_transformation(
        &self,
        boundary: bool,
        element: usize,
        point: &IntegrationPoint<T>,
    ) -> ElementTransformation<T>;
}

/// Membership mask over 1-based mesh attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMask {
    marked: Vec<bool>,
}

impl AttributeMask {
    pub fn from_attributes(attributes: impl IntoIterator<Item = i32>) -> Self {
        let mut marked = Vec::new();
        for attribute in attributes {
            assert!(attribute >= 1, "mesh attributes are 1-based");
            let index = (attribute - 1) as usize;
            if index >= marked.len() {
                marked.resize(index + 1, false);
            }
            marked[index] = true;
        }
        Self { marked }
    }

    pub fn contains(&self, attribute: i32) -> bool {
        assert!(attribute >= 1, "mesh attributes are 1-based");
        self.marked.get((attribute - 1) as usize).copied().unwrap_or(false)
    }
}
