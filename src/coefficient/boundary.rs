//! Material- and field-dependent coefficients on domain elements and boundary
//! faces.
//!
//! All two-sided evaluators resolve neighbors through
//! [`FaceNeighborResolver`] and differ only in how the two sides are combined:
//! surface current and charge subtract side 2 from side 1 and sign-correct
//! against the inward direction, flux averages the sides and sign-corrects
//! against a caller-supplied direction, and the energy/passthrough evaluators
//! select a single side by policy.

use crate::coefficient::neighbors::FaceNeighborResolver;
use crate::coefficient::Coefficient;
use crate::field::{ScalarFieldFunction, VectorFieldFunction};
use crate::material::{MaterialPropertyTable, PropertyKind};
use crate::mesh::{ElementKind, ElementRef, ElementTransformation, FaceSide, InterfaceTopology};
use crate::quadrature::IntegrationPoint;
use crate::Real;
use nalgebra::{convert, Matrix3, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Material property tensor looked up by the attribute of the current domain
/// element, optionally scaled by a constant.
#[derive(Debug, Clone)]
pub struct DomainPropertyCoefficient<'a, T: Real> {
    materials: &'a MaterialPropertyTable<T>,
    property: PropertyKind,
    scale: T,
}

impl<'a, T: Real> DomainPropertyCoefficient<'a, T> {
    pub fn new(materials: &'a MaterialPropertyTable<T>, property: PropertyKind) -> Self {
        Self::scaled(materials, property, T::one())
    }

    pub fn scaled(materials: &'a MaterialPropertyTable<T>, property: PropertyKind, scale: T) -> Self {
        Self {
            materials,
            property,
            scale,
        }
    }
}

impl<'a, T: Real> Coefficient<T> for DomainPropertyCoefficient<'a, T> {
    type Value = Matrix3<T>;

    fn eval(
        &self,
        transformation: &ElementTransformation<T>,
        _point: &IntegrationPoint<T>,
    ) -> Matrix3<T> {
        assert_eq!(
            transformation.kind(),
            ElementKind::Domain,
            "DomainPropertyCoefficient requires a domain element transformation"
        );
        self.materials.property(self.property, transformation.attribute()) * self.scale
    }
}

/// Material property tensor for boundary elements, looked up by the attribute
/// of the adjacent volumetric element.
///
/// The face must be a true exterior boundary; many property coefficients are
/// attached to exterior surfaces by construction, so an unexpectedly two-sided
/// face is a usage error.
#[derive(Debug, Clone)]
pub struct BoundaryPropertyCoefficient<'a, T: Real, Topology: ?Sized> {
    materials: &'a MaterialPropertyTable<T>,
    topology: &'a Topology,
    property: PropertyKind,
    scale: T,
}

impl<'a, T: Real, Topology: ?Sized> BoundaryPropertyCoefficient<'a, T, Topology> {
    pub fn new(
        materials: &'a MaterialPropertyTable<T>,
        topology: &'a Topology,
        property: PropertyKind,
    ) -> Self {
        Self::scaled(materials, topology, property, T::one())
    }

    pub fn scaled(
        materials: &'a MaterialPropertyTable<T>,
        topology: &'a Topology,
        property: PropertyKind,
        scale: T,
    ) -> Self {
        Self {
            materials,
            topology,
            property,
            scale,
        }
    }
}

impl<'a, T, Topology> Coefficient<T> for BoundaryPropertyCoefficient<'a, T, Topology>
where
    T: Real,
    Topology: InterfaceTopology<T> + ?Sized,
{
    type Value = Matrix3<T>;

    fn eval(
        &self,
        transformation: &ElementTransformation<T>,
        _point: &IntegrationPoint<T>,
    ) -> Matrix3<T> {
        assert_eq!(
            transformation.kind(),
            ElementKind::Boundary,
            "BoundaryPropertyCoefficient requires a boundary element transformation"
        );
        let (face, _) = self.topology.boundary_element_face(transformation.index());
        let (element1, second) = self.topology.face_elements(face);
        assert!(
            matches!(second, FaceSide::Exterior),
            "BoundaryPropertyCoefficient requires an exterior (single-sided) boundary face"
        );
        let attribute = self.topology.element_attribute(ElementRef::Local(element1));
        self.materials.property(self.property, attribute) * self.scale
    }
}

/// Surface current density `J_s = n × H` on boundary faces, with the normal
/// oriented into element 1, computed from the magnetic flux density `B` via the
/// inverse permeability.
///
/// On two-sided faces the side-2 contribution is subtracted, yielding the net
/// current carried by the interface; a missing second side is the ordinary
/// exterior-boundary branch.
#[derive(Debug)]
pub struct SurfaceCurrentCoefficient<'a, T: Real, Topology: ?Sized, F> {
    flux_density: &'a F,
    materials: &'a MaterialPropertyTable<T>,
    resolver: FaceNeighborResolver<'a, T, Topology>,
}

impl<'a, T: Real, Topology: ?Sized, F> SurfaceCurrentCoefficient<'a, T, Topology, F> {
    pub fn new(
        flux_density: &'a F,
        materials: &'a MaterialPropertyTable<T>,
        topology: &'a Topology,
    ) -> Self {
        Self {
            flux_density,
            materials,
            resolver: FaceNeighborResolver::new(topology),
        }
    }
}

impl<'a, T, Topology, F> Coefficient<T> for SurfaceCurrentCoefficient<'a, T, Topology, F>
where
    T: Real,
    Topology: InterfaceTopology<T> + ?Sized,
    F: VectorFieldFunction<T>,
{
    type Value = Vector3<T>;

    fn eval(
        &self,
        transformation: &ElementTransformation<T>,
        point: &IntegrationPoint<T>,
    ) -> Vector3<T> {
        let (adjacency, inward) = self.resolver.resolve_with_inward(transformation, point);

        let side1 = &adjacency.side1;
        let mut h = self.materials.inv_permeability(side1.attribute)
            * self.flux_density.vector_value(side1.element, &side1.point);
        if let Some(side2) = &adjacency.side2 {
            h -= self.materials.inv_permeability(side2.attribute)
                * self.flux_density.vector_value(side2.element, &side2.point);
        }

        // Orient the face normal into element 1 before taking n × H.
        let mut normal = transformation.normal();
        if inward.dot(&normal) < T::zero() {
            normal = -normal;
        }
        normal.cross(&h)
    }
}

/// Surface charge density `ρ_s = D · n` on boundary faces, computed from the
/// electric field `E` via the real permittivity, sign-corrected so the result
/// is single-valued across the face.
#[derive(Debug)]
pub struct SurfaceChargeCoefficient<'a, T: Real, Topology: ?Sized, F> {
    field: &'a F,
    materials: &'a MaterialPropertyTable<T>,
    resolver: FaceNeighborResolver<'a, T, Topology>,
}

impl<'a, T: Real, Topology: ?Sized, F> SurfaceChargeCoefficient<'a, T, Topology, F> {
    pub fn new(
        field: &'a F,
        materials: &'a MaterialPropertyTable<T>,
        topology: &'a Topology,
    ) -> Self {
        Self {
            field,
            materials,
            resolver: FaceNeighborResolver::new(topology),
        }
    }
}

impl<'a, T, Topology, F> Coefficient<T> for SurfaceChargeCoefficient<'a, T, Topology, F>
where
    T: Real,
    Topology: InterfaceTopology<T> + ?Sized,
    F: VectorFieldFunction<T>,
{
    type Value = T;

    fn eval(&self, transformation: &ElementTransformation<T>, point: &IntegrationPoint<T>) -> T {
        let (adjacency, inward) = self.resolver.resolve_with_inward(transformation, point);

        let side1 = &adjacency.side1;
        let mut d = self.materials.permittivity_real(side1.attribute)
            * self.field.vector_value(side1.element, &side1.point);
        if let Some(side2) = &adjacency.side2 {
            d -= self.materials.permittivity_real(side2.attribute)
                * self.field.vector_value(side2.element, &side2.point);
        }

        let mut normal = transformation.normal();
        if inward.dot(&normal) < T::zero() {
            normal = -normal;
        }
        d.dot(&normal)
    }
}

/// Normal flux `Φ = B · n` on boundary faces, oriented against a caller-supplied
/// global direction.
///
/// Two-sided values are averaged rather than subtracted: the projection is used
/// for the continuous (normal) field component, so averaging out the
/// discontinuous part is intended.
#[derive(Debug)]
pub struct SurfaceFluxCoefficient<'a, T: Real, Topology: ?Sized, F> {
    field: &'a F,
    direction: Vector3<T>,
    resolver: FaceNeighborResolver<'a, T, Topology>,
}

impl<'a, T: Real, Topology: ?Sized, F> SurfaceFluxCoefficient<'a, T, Topology, F> {
    pub fn new(field: &'a F, direction: Vector3<T>, topology: &'a Topology) -> Self {
        Self {
            field,
            direction,
            resolver: FaceNeighborResolver::new(topology),
        }
    }
}

impl<'a, T, Topology, F> Coefficient<T> for SurfaceFluxCoefficient<'a, T, Topology, F>
where
    T: Real,
    Topology: InterfaceTopology<T> + ?Sized,
    F: VectorFieldFunction<T>,
{
    type Value = T;

    fn eval(&self, transformation: &ElementTransformation<T>, point: &IntegrationPoint<T>) -> T {
        let adjacency = self.resolver.resolve(transformation, point);

        let side1 = &adjacency.side1;
        let mut value = self.field.vector_value(side1.element, &side1.point);
        if let Some(side2) = &adjacency.side2 {
            value = (value + self.field.vector_value(side2.element, &side2.point))
                * convert::<f64, T>(0.5);
        }

        let normal = transformation.normal();
        let flux = value.dot(&normal);
        if self.direction.dot(&normal) < T::zero() {
            -flux
        } else {
            flux
        }
    }
}

/// Interface variants of the thin-layer dielectric energy density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterfaceKind {
    /// No specific interface structure: `½ t ε |E|²`.
    Generic,
    /// Metal-air: `½ (t/ε) |E·n|²`.
    MetalAir,
    /// Metal-substrate: `½ t ε_S²/ε |E·n|²` with `ε_S` the normal-projected
    /// permittivity of the selected side.
    MetalSubstrate,
    /// Substrate-air: `½ t (ε |E_t|² + |E·n|²/ε)`.
    SubstrateAir,
}

/// Thin-layer dielectric interface energy density on boundary faces.
///
/// The field is single-sided by construction: on two-sided faces one side is
/// selected either by an explicit direction vector or, absent one, by the
/// higher-wave-speed policy (prefer the vacuum side).
#[derive(Debug)]
pub struct InterfaceEnergyCoefficient<'a, T: Real, Topology: ?Sized, F> {
    field: &'a F,
    materials: &'a MaterialPropertyTable<T>,
    resolver: FaceNeighborResolver<'a, T, Topology>,
    kind: InterfaceKind,
    thickness: T,
    permittivity: T,
    side: Option<Vector3<T>>,
}

impl<'a, T: Real, Topology: ?Sized, F> InterfaceEnergyCoefficient<'a, T, Topology, F> {
    pub fn new(
        kind: InterfaceKind,
        field: &'a F,
        materials: &'a MaterialPropertyTable<T>,
        topology: &'a Topology,
        thickness: T,
        permittivity: T,
    ) -> Self {
        Self {
            field,
            materials,
            resolver: FaceNeighborResolver::new(topology),
            kind,
            thickness,
            permittivity,
            side: None,
        }
    }

    /// Select the interface side by an explicit direction instead of the
    /// wave-speed policy.
    pub fn with_side(mut self, direction: Vector3<T>) -> Self {
        self.side = Some(direction);
        self
    }
}

impl<'a, T, Topology, F> InterfaceEnergyCoefficient<'a, T, Topology, F>
where
    T: Real,
    Topology: InterfaceTopology<T> + ?Sized,
    F: VectorFieldFunction<T>,
{
    fn single_sided_field(
        &self,
        transformation: &ElementTransformation<T>,
        point: &IntegrationPoint<T>,
    ) -> (Vector3<T>, i32) {
        let (adjacency, inward) = self.resolver.resolve_with_inward(transformation, point);
        let side = match (&adjacency.side2, &self.side) {
            (None, _) => &adjacency.side1,
            (Some(_), Some(direction)) => adjacency.directed_side(&inward, direction),
            (Some(_), None) => adjacency.higher_wave_speed_side(self.materials),
        };
        (
            self.field.vector_value(side.element, &side.point),
            side.attribute,
        )
    }
}

impl<'a, T, Topology, F> Coefficient<T> for InterfaceEnergyCoefficient<'a, T, Topology, F>
where
    T: Real,
    Topology: InterfaceTopology<T> + ?Sized,
    F: VectorFieldFunction<T>,
{
    type Value = T;

    fn eval(&self, transformation: &ElementTransformation<T>, point: &IntegrationPoint<T>) -> T {
        let (field, attribute) = self.single_sided_field(transformation, point);
        let half = convert::<f64, T>(0.5);
        match self.kind {
            InterfaceKind::Generic => {
                half * self.thickness * self.permittivity * field.norm_squared()
            }
            InterfaceKind::MetalAir => {
                let normal_component = field.dot(&transformation.normal());
                half * self.thickness / self.permittivity * normal_component * normal_component
            }
            InterfaceKind::MetalSubstrate => {
                let normal = transformation.normal();
                let normal_component = field.dot(&normal);
                let projected = (self.materials.permittivity_real(attribute) * normal).dot(&normal);
                half * self.thickness * projected * projected / self.permittivity
                    * normal_component
                    * normal_component
            }
            InterfaceKind::SubstrateAir => {
                let normal = transformation.normal();
                let normal_component = field.dot(&normal);
                let tangential = field - normal * normal_component;
                half * self.thickness
                    * (self.permittivity * tangential.norm_squared()
                        + normal_component * normal_component / self.permittivity)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnergyDensityType {
    Electric,
    Magnetic,
}

/// Volumetric energy density `½ Re(D*·E)` or `½ Re(B*·H)`.
///
/// Only the real part of a lossy material tensor contributes; the imaginary
/// part cancels in the conjugate inner product by symmetry. Complex-valued
/// fields supply their real and imaginary parts as two real fields whose
/// contractions are summed.
///
/// On boundary elements the value is taken from the side with the larger
/// material property magnitude, i.e. the physical, non-vacuum side.
pub struct EnergyDensityCoefficient<'a, T: Real, Topology: ?Sized, F> {
    real: &'a F,
    imag: Option<&'a F>,
    materials: &'a MaterialPropertyTable<T>,
    resolver: FaceNeighborResolver<'a, T, Topology>,
    property: fn(&MaterialPropertyTable<T>, i32) -> &Matrix3<T>,
}

impl<'a, T: Real, Topology: ?Sized, F> EnergyDensityCoefficient<'a, T, Topology, F> {
    pub fn new(
        kind: EnergyDensityType,
        field: &'a F,
        materials: &'a MaterialPropertyTable<T>,
        topology: &'a Topology,
    ) -> Self {
        Self {
            real: field,
            imag: None,
            materials,
            resolver: FaceNeighborResolver::new(topology),
            property: Self::property_accessor(kind),
        }
    }

    pub fn new_complex(
        kind: EnergyDensityType,
        real: &'a F,
        imag: &'a F,
        materials: &'a MaterialPropertyTable<T>,
        topology: &'a Topology,
    ) -> Self {
        Self {
            real,
            imag: Some(imag),
            materials,
            resolver: FaceNeighborResolver::new(topology),
            property: Self::property_accessor(kind),
        }
    }

    // The material accessor is resolved once at construction.
    fn property_accessor(
        kind: EnergyDensityType,
    ) -> fn(&MaterialPropertyTable<T>, i32) -> &Matrix3<T> {
        match kind {
            EnergyDensityType::Electric => MaterialPropertyTable::permittivity_real,
            EnergyDensityType::Magnetic => MaterialPropertyTable::inv_permeability,
        }
    }
}

impl<'a, T, Topology, F> EnergyDensityCoefficient<'a, T, Topology, F>
where
    T: Real,
    Topology: InterfaceTopology<T> + ?Sized,
    F: VectorFieldFunction<T>,
{
    fn local_density(&self, element: ElementRef, point: &Point3<T>, attribute: i32) -> T {
        let tensor = (self.property)(self.materials, attribute);
        let value = self.real.vector_value(element, point);
        let mut density = (tensor * value).dot(&value);
        if let Some(imag) = self.imag {
            let value = imag.vector_value(element, point);
            density += (tensor * value).dot(&value);
        }
        convert::<f64, T>(0.5) * density
    }
}

impl<'a, T, Topology, F> Coefficient<T> for EnergyDensityCoefficient<'a, T, Topology, F>
where
    T: Real,
    Topology: InterfaceTopology<T> + ?Sized,
    F: VectorFieldFunction<T>,
{
    type Value = T;

    fn eval(&self, transformation: &ElementTransformation<T>, point: &IntegrationPoint<T>) -> T {
        match transformation.kind() {
            ElementKind::Domain => self.local_density(
                ElementRef::Local(transformation.index()),
                &point.volume_point(),
                transformation.attribute(),
            ),
            ElementKind::Boundary => {
                let adjacency = self.resolver.resolve(transformation, point);
                let side = adjacency.larger_property_side(self.materials);
                self.local_density(side.element, &side.point, side.attribute)
            }
        }
    }
}

/// Raw vector field value on a boundary element, taken from the side with the
/// larger material property magnitude. Used for visualization and probing.
#[derive(Debug)]
pub struct BoundaryFieldVectorCoefficient<'a, T: Real, Topology: ?Sized, F> {
    field: &'a F,
    materials: &'a MaterialPropertyTable<T>,
    resolver: FaceNeighborResolver<'a, T, Topology>,
}

impl<'a, T: Real, Topology: ?Sized, F> BoundaryFieldVectorCoefficient<'a, T, Topology, F> {
    pub fn new(
        field: &'a F,
        materials: &'a MaterialPropertyTable<T>,
        topology: &'a Topology,
    ) -> Self {
        Self {
            field,
            materials,
            resolver: FaceNeighborResolver::new(topology),
        }
    }
}

impl<'a, T, Topology, F> Coefficient<T> for BoundaryFieldVectorCoefficient<'a, T, Topology, F>
where
    T: Real,
    Topology: InterfaceTopology<T> + ?Sized,
    F: VectorFieldFunction<T>,
{
    type Value = Vector3<T>;

    fn eval(
        &self,
        transformation: &ElementTransformation<T>,
        point: &IntegrationPoint<T>,
    ) -> Vector3<T> {
        let adjacency = self.resolver.resolve(transformation, point);
        let side = adjacency.larger_property_side(self.materials);
        self.field.vector_value(side.element, &side.point)
    }
}

/// Raw scalar field value on a boundary element, taken from the side with the
/// larger material property magnitude.
#[derive(Debug)]
pub struct BoundaryFieldScalarCoefficient<'a, T: Real, Topology: ?Sized, F> {
    field: &'a F,
    materials: &'a MaterialPropertyTable<T>,
    resolver: FaceNeighborResolver<'a, T, Topology>,
}

impl<'a, T: Real, Topology: ?Sized, F> BoundaryFieldScalarCoefficient<'a, T, Topology, F> {
    pub fn new(
        field: &'a F,
        materials: &'a MaterialPropertyTable<T>,
        topology: &'a Topology,
    ) -> Self {
        Self {
            field,
            materials,
            resolver: FaceNeighborResolver::new(topology),
        }
    }
}

impl<'a, T, Topology, F> Coefficient<T> for BoundaryFieldScalarCoefficient<'a, T, Topology, F>
where
    T: Real,
    Topology: InterfaceTopology<T> + ?Sized,
    F: ScalarFieldFunction<T>,
{
    type Value = T;

    fn eval(&self, transformation: &ElementTransformation<T>, point: &IntegrationPoint<T>) -> T {
        let adjacency = self.resolver.resolve(transformation, point);
        let side = adjacency.larger_property_side(self.materials);
        self.field.value(side.element, &side.point)
    }
}
