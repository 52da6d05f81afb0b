use super::common::{
    midpoint, per_element_field, shared_face_transformation, uniform_vacuum_materials,
    vacuum_substrate_materials, x_normal_face_transformation, TwoElementMock,
};
use faraday::coefficient::algebra::{ConstantCoefficient, NormalProjectedCoefficient};
use faraday::coefficient::boundary::{
    BoundaryFieldScalarCoefficient, BoundaryFieldVectorCoefficient, BoundaryPropertyCoefficient,
    DomainPropertyCoefficient, EnergyDensityCoefficient, EnergyDensityType,
    InterfaceEnergyCoefficient, InterfaceKind, SurfaceChargeCoefficient,
    SurfaceCurrentCoefficient, SurfaceFluxCoefficient,
};
use faraday::coefficient::Coefficient;
use faraday::mesh::{ElementRef, ElementTransformation};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{Matrix3, Point3, Vector3};

fn constant_field(value: Vector3<f64>) -> impl Fn(ElementRef, &Point3<f64>) -> Vector3<f64> {
    move |_, _| value
}

#[test]
fn surface_current_single_sided_is_the_one_sided_formula() {
    let topology = TwoElementMock::exterior();
    let materials = uniform_vacuum_materials();
    let field = constant_field(Vector3::new(0.0, 1.0, 0.0));
    let coefficient = SurfaceCurrentCoefficient::new(&field, &materials, &topology);

    let value = coefficient.eval(&shared_face_transformation(), &midpoint());
    // Normal oriented into element 1 is -z, and (-z) × ŷ = x̂.
    assert_eq!(value, Vector3::new(1.0, 0.0, 0.0));
}

#[test]
fn surface_current_subtracts_the_second_side() {
    let topology = TwoElementMock::interior();
    let materials = uniform_vacuum_materials();
    let field = per_element_field(Vector3::new(1.0, 2.0, 3.0), Vector3::new(4.0, 5.0, 6.0));
    let coefficient = SurfaceCurrentCoefficient::new(&field, &materials, &topology);

    let value = coefficient.eval(&shared_face_transformation(), &midpoint());
    // H = B1 - B2 = (-3, -3, -3); J = (-z) × H.
    assert_eq!(value, Vector3::new(-3.0, 3.0, 0.0));
}

#[test]
fn surface_current_is_invariant_under_side_order_swap() {
    let materials = vacuum_substrate_materials();
    let field = per_element_field(Vector3::new(1.0, 2.0, 3.0), Vector3::new(-1.0, 0.5, 2.0));
    let transformation = shared_face_transformation();

    let topology = TwoElementMock::interior();
    let forward =
        SurfaceCurrentCoefficient::new(&field, &materials, &topology).eval(&transformation, &midpoint());

    let swapped_topology = TwoElementMock::interior_swapped();
    let swapped = SurfaceCurrentCoefficient::new(&field, &materials, &swapped_topology)
        .eval(&transformation, &midpoint());

    assert_eq!(forward, swapped);
}

#[test]
fn surface_charge_single_sided_is_the_one_sided_formula() {
    let topology = TwoElementMock::exterior();
    let materials = vacuum_substrate_materials();
    let field = constant_field(Vector3::new(0.0, 0.0, 2.0));
    let coefficient = SurfaceChargeCoefficient::new(&field, &materials, &topology);

    // D = ε₁ E = (0, 0, 8); the normal oriented into element 1 is -z.
    let value = coefficient.eval(&shared_face_transformation(), &midpoint());
    assert_eq!(value, -8.0);
}

#[test]
fn surface_charge_is_invariant_under_side_order_swap() {
    let materials = vacuum_substrate_materials();
    let field = per_element_field(Vector3::new(0.0, 0.0, 2.0), Vector3::new(0.0, 0.0, 1.0));
    let transformation = shared_face_transformation();

    let topology = TwoElementMock::interior();
    let forward =
        SurfaceChargeCoefficient::new(&field, &materials, &topology).eval(&transformation, &midpoint());
    assert_eq!(forward, -7.0);

    let swapped_topology = TwoElementMock::interior_swapped();
    let swapped = SurfaceChargeCoefficient::new(&field, &materials, &swapped_topology)
        .eval(&transformation, &midpoint());
    assert_eq!(forward, swapped);
}

#[test]
fn flux_with_equal_side_values_matches_the_single_sided_value() {
    let field = constant_field(Vector3::new(1.0, 1.0, 2.0));
    let transformation = shared_face_transformation();

    for direction in [Vector3::new(0.0, 0.0, 1.0), Vector3::new(0.0, 0.0, -1.0)] {
        let interior = TwoElementMock::interior();
        let two_sided = SurfaceFluxCoefficient::new(&field, direction, &interior)
            .eval(&transformation, &midpoint());

        let exterior = TwoElementMock::exterior();
        let one_sided = SurfaceFluxCoefficient::new(&field, direction, &exterior)
            .eval(&transformation, &midpoint());

        assert_eq!(two_sided, one_sided);
    }
}

#[test]
fn flux_orients_against_the_caller_direction() {
    let topology = TwoElementMock::exterior();
    let field = constant_field(Vector3::new(0.0, 0.0, 2.0));
    let transformation = shared_face_transformation();

    let up = SurfaceFluxCoefficient::new(&field, Vector3::new(0.0, 0.0, 1.0), &topology)
        .eval(&transformation, &midpoint());
    let down = SurfaceFluxCoefficient::new(&field, Vector3::new(0.0, 0.0, -1.0), &topology)
        .eval(&transformation, &midpoint());
    assert_eq!(up, 2.0);
    assert_eq!(down, -2.0);
}

#[test]
fn interface_energy_closed_forms_at_unit_inputs() {
    // t = 1, ε = 1, E = (1, 0, 0) and n = (1, 0, 0): every variant gives 1/2.
    let topology = TwoElementMock::exterior();
    let materials = uniform_vacuum_materials();
    let field = constant_field(Vector3::new(1.0, 0.0, 0.0));
    let transformation = x_normal_face_transformation();

    for kind in [
        InterfaceKind::Generic,
        InterfaceKind::MetalAir,
        InterfaceKind::MetalSubstrate,
        InterfaceKind::SubstrateAir,
    ] {
        let coefficient =
            InterfaceEnergyCoefficient::new(kind, &field, &materials, &topology, 1.0, 1.0);
        let value = coefficient.eval(&transformation, &midpoint());
        assert_eq!(value, 0.5, "unexpected energy for {kind:?}");
    }
}

#[test]
fn substrate_air_energy_recombines_tangential_and_normal_parts() {
    // With ε = 1 the tangential and normal terms recombine to ½|E|².
    let topology = TwoElementMock::exterior();
    let materials = uniform_vacuum_materials();
    let field = constant_field(Vector3::new(1.0, 2.0, 2.0));
    let coefficient = InterfaceEnergyCoefficient::new(
        InterfaceKind::SubstrateAir,
        &field,
        &materials,
        &topology,
        1.0,
        1.0,
    );

    let value = coefficient.eval(&x_normal_face_transformation(), &midpoint());
    assert_scalar_eq!(value, 4.5, comp = abs, tol = 1e-14);
}

#[test]
fn interface_energy_prefers_the_higher_wave_speed_side() {
    let topology = TwoElementMock::interior();
    let materials = vacuum_substrate_materials();
    let field = per_element_field(Vector3::new(3.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
    let coefficient = InterfaceEnergyCoefficient::new(
        InterfaceKind::Generic,
        &field,
        &materials,
        &topology,
        2.0,
        3.0,
    );

    // The vacuum side (element 1) is faster, so its field value is used.
    let value = coefficient.eval(&shared_face_transformation(), &midpoint());
    assert_scalar_eq!(value, 0.5 * 2.0 * 3.0 * 1.0, comp = abs, tol = 1e-14);
}

#[test]
fn interface_energy_side_override_selects_by_direction() {
    let topology = TwoElementMock::interior();
    let materials = vacuum_substrate_materials();
    let field = per_element_field(Vector3::new(3.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
    let transformation = shared_face_transformation();

    // The inward vector points toward element 1 (-z): a -z side direction keeps
    // side 1, a +z direction selects side 2.
    let side1 = InterfaceEnergyCoefficient::new(
        InterfaceKind::Generic,
        &field,
        &materials,
        &topology,
        1.0,
        1.0,
    )
    .with_side(Vector3::new(0.0, 0.0, -1.0))
    .eval(&transformation, &midpoint());
    assert_scalar_eq!(side1, 4.5, comp = abs, tol = 1e-14);

    let side2 = InterfaceEnergyCoefficient::new(
        InterfaceKind::Generic,
        &field,
        &materials,
        &topology,
        1.0,
        1.0,
    )
    .with_side(Vector3::new(0.0, 0.0, 1.0))
    .eval(&transformation, &midpoint());
    assert_scalar_eq!(side2, 0.5, comp = abs, tol = 1e-14);
}

#[test]
fn electric_energy_density_on_domain_elements() {
    let topology = TwoElementMock::interior();
    let materials = vacuum_substrate_materials();
    let field = constant_field(Vector3::new(1.0, 0.0, 1.0));
    let coefficient =
        EnergyDensityCoefficient::new(EnergyDensityType::Electric, &field, &materials, &topology);

    let transformation =
        ElementTransformation::domain(0, 1, Matrix3::identity(), Point3::origin());
    let value = coefficient.eval(&transformation, &midpoint());
    assert_eq!(value, 4.0);
}

#[test]
fn energy_density_on_boundary_takes_the_non_vacuum_side() {
    let topology = TwoElementMock::interior();
    let materials = vacuum_substrate_materials();
    let field = per_element_field(Vector3::new(1.0, 0.0, 0.0), Vector3::new(10.0, 0.0, 0.0));
    let coefficient =
        EnergyDensityCoefficient::new(EnergyDensityType::Electric, &field, &materials, &topology);

    // Element 0 carries the larger permittivity; its field value is used.
    let value = coefficient.eval(&shared_face_transformation(), &midpoint());
    assert_eq!(value, 0.5 * 4.0);
}

#[test]
fn complex_energy_density_sums_real_and_imaginary_contractions() {
    let topology = TwoElementMock::interior();
    let materials = vacuum_substrate_materials();
    let real = constant_field(Vector3::new(1.0, 0.0, 0.0));
    let imag = constant_field(Vector3::new(0.0, 2.0, 0.0));
    let coefficient = EnergyDensityCoefficient::new_complex(
        EnergyDensityType::Electric,
        &real,
        &imag,
        &materials,
        &topology,
    );

    let transformation =
        ElementTransformation::domain(0, 1, Matrix3::identity(), Point3::origin());
    let value = coefficient.eval(&transformation, &midpoint());
    assert_eq!(value, 0.5 * (4.0 + 16.0));
}

#[test]
fn magnetic_energy_density_uses_the_inverse_permeability() {
    let topology = TwoElementMock::interior();
    let materials = vacuum_substrate_materials();
    let field = constant_field(Vector3::new(0.0, 3.0, 0.0));
    let coefficient =
        EnergyDensityCoefficient::new(EnergyDensityType::Magnetic, &field, &materials, &topology);

    let transformation =
        ElementTransformation::domain(0, 1, Matrix3::identity(), Point3::origin());
    let value = coefficient.eval(&transformation, &midpoint());
    assert_eq!(value, 4.5);
}

#[test]
fn boundary_field_passthrough_selects_the_material_side() {
    let topology = TwoElementMock::interior();
    let materials = vacuum_substrate_materials();
    let transformation = shared_face_transformation();

    let vector_field =
        per_element_field(Vector3::new(1.0, 2.0, 3.0), Vector3::new(9.0, 9.0, 9.0));
    let vector =
        BoundaryFieldVectorCoefficient::new(&vector_field, &materials, &topology)
            .eval(&transformation, &midpoint());
    assert_eq!(vector, Vector3::new(1.0, 2.0, 3.0));

    let scalar_field = |element: ElementRef, _: &Point3<f64>| {
        if matches!(element, ElementRef::Local(0)) {
            7.0
        } else {
            3.0
        }
    };
    let scalar = BoundaryFieldScalarCoefficient::new(&scalar_field, &materials, &topology)
        .eval(&transformation, &midpoint());
    assert_eq!(scalar, 7.0);
}

#[test]
fn shared_and_local_interior_faces_evaluate_identically() {
    let materials = vacuum_substrate_materials();
    let field = per_element_field(Vector3::new(0.0, 0.0, 2.0), Vector3::new(0.0, 0.0, 1.0));
    let transformation = shared_face_transformation();

    let local = TwoElementMock::interior();
    let shared = TwoElementMock::shared();
    let from_local = SurfaceChargeCoefficient::new(&field, &materials, &local)
        .eval(&transformation, &midpoint());
    let from_shared = SurfaceChargeCoefficient::new(&field, &materials, &shared)
        .eval(&transformation, &midpoint());
    assert_eq!(from_local, from_shared);
}

#[test]
fn domain_property_lookup_scales_the_tensor() {
    let materials = vacuum_substrate_materials();
    let transformation =
        ElementTransformation::domain(0, 1, Matrix3::identity(), Point3::origin());

    use faraday::material::PropertyKind;
    let plain = DomainPropertyCoefficient::new(&materials, PropertyKind::PermittivityReal)
        .eval(&transformation, &midpoint());
    assert_matrix_eq!(plain, Matrix3::from_diagonal_element(4.0));

    let scaled =
        DomainPropertyCoefficient::scaled(&materials, PropertyKind::PermittivityReal, 2.0)
            .eval(&transformation, &midpoint());
    assert_matrix_eq!(scaled, Matrix3::from_diagonal_element(8.0));
}

#[test]
fn boundary_property_lookup_uses_the_neighbor_attribute() {
    let materials = vacuum_substrate_materials();
    let topology = TwoElementMock::exterior();

    use faraday::material::PropertyKind;
    let value =
        BoundaryPropertyCoefficient::new(&materials, &topology, PropertyKind::PermittivityReal)
            .eval(&shared_face_transformation(), &midpoint());
    assert_matrix_eq!(value, Matrix3::from_diagonal_element(4.0));
}

#[test]
fn composite_property_combines_inverse_permeability_and_wave_speed() {
    let materials = vacuum_substrate_materials();
    let transformation =
        ElementTransformation::domain(0, 1, Matrix3::identity(), Point3::origin());

    use faraday::material::PropertyKind;
    let value =
        DomainPropertyCoefficient::new(&materials, PropertyKind::InvPermeabilityWaveSpeed)
            .eval(&transformation, &midpoint());
    assert_matrix_eq!(
        value,
        Matrix3::from_diagonal_element(0.5),
        comp = abs,
        tol = 1e-12
    );
}

#[test]
#[should_panic(expected = "exterior")]
fn boundary_property_rejects_two_sided_faces() {
    let materials = vacuum_substrate_materials();
    let topology = TwoElementMock::interior();

    use faraday::material::PropertyKind;
    BoundaryPropertyCoefficient::new(&materials, &topology, PropertyKind::PermittivityReal)
        .eval(&shared_face_transformation(), &midpoint());
}

#[test]
#[should_panic(expected = "domain element transformation")]
fn domain_property_rejects_boundary_transformations() {
    let materials = vacuum_substrate_materials();
    use faraday::material::PropertyKind;
    DomainPropertyCoefficient::new(&materials, PropertyKind::PermittivityReal)
        .eval(&shared_face_transformation(), &midpoint());
}

#[test]
fn normal_projection_of_an_isotropic_matrix_is_direction_independent() {
    let coefficient = NormalProjectedCoefficient::new(ConstantCoefficient::new(
        Matrix3::from_diagonal_element(2.5),
    ));

    let along_z = coefficient.eval(&shared_face_transformation(), &midpoint());
    let along_x = coefficient.eval(&x_normal_face_transformation(), &midpoint());
    assert_eq!(along_z, 2.5);
    assert_eq!(along_x, 2.5);
}
