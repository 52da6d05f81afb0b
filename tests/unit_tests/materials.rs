use faraday::material::{AttributeMaterial, MaterialPropertyTable, PropertyKind};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::Matrix3;

fn substrate_vacuum() -> MaterialPropertyTable<f64> {
    MaterialPropertyTable::from_materials(&[
        AttributeMaterial::isotropic(4.0, 1.0),
        AttributeMaterial::vacuum(),
    ])
    .unwrap()
}

#[test]
fn wave_speed_bounds_for_isotropic_materials() {
    let table = substrate_vacuum();
    assert_scalar_eq!(table.wave_speed_min(1), 0.5, comp = abs, tol = 1e-12);
    assert_scalar_eq!(table.wave_speed_max(1), 0.5, comp = abs, tol = 1e-12);
    assert_scalar_eq!(table.wave_speed_min(2), 1.0, comp = abs, tol = 1e-12);
    assert_scalar_eq!(table.wave_speed_max(2), 1.0, comp = abs, tol = 1e-12);
}

#[test]
fn inverse_impedance_for_isotropic_materials() {
    let table = substrate_vacuum();
    // 1/Z = sqrt(ε/μ) = 2 for the substrate.
    assert_matrix_eq!(
        *table.inv_impedance(1),
        Matrix3::from_diagonal_element(2.0),
        comp = abs,
        tol = 1e-12
    );
}

#[test]
fn permittivity_magnitude_combines_real_and_imaginary_parts() {
    let material = AttributeMaterial::isotropic(3.0, 1.0)
        .with_loss(Matrix3::from_diagonal_element(4.0));
    let table = MaterialPropertyTable::from_materials(&[material]).unwrap();
    assert_matrix_eq!(
        *table.permittivity_abs(1),
        Matrix3::from_diagonal_element(5.0),
        comp = abs,
        tol = 1e-12
    );
}

#[test]
fn london_depth_scales_the_inverse_permeability() {
    let material = AttributeMaterial::vacuum().with_london_depth(2.0);
    let table = MaterialPropertyTable::from_materials(&[material]).unwrap();
    assert_matrix_eq!(
        *table.inv_london_depth(1),
        Matrix3::from_diagonal_element(0.25),
        comp = abs,
        tol = 1e-12
    );
    // Without a depth, the tensor is zero.
    let table: MaterialPropertyTable<f64> =
        MaterialPropertyTable::from_materials(&[AttributeMaterial::vacuum()]).unwrap();
    assert_matrix_eq!(*table.inv_london_depth(1), Matrix3::zeros());
}

#[test]
fn composite_property_is_formed_on_the_fly() {
    let table = substrate_vacuum();
    assert_matrix_eq!(
        table.property(PropertyKind::InvPermeabilityWaveSpeed, 1),
        Matrix3::from_diagonal_element(0.5),
        comp = abs,
        tol = 1e-12
    );
}

#[test]
fn singular_permeability_is_rejected() {
    let mut material: AttributeMaterial<f64> = AttributeMaterial::vacuum();
    material.permeability = Matrix3::zeros();
    assert!(MaterialPropertyTable::from_materials(&[material]).is_err());
}

#[test]
fn indefinite_permittivity_is_rejected() {
    let mut material = AttributeMaterial::vacuum();
    material.permittivity_real = Matrix3::from_diagonal_element(-1.0);
    assert!(MaterialPropertyTable::from_materials(&[material]).is_err());
}

#[test]
#[should_panic(expected = "outside the material table")]
fn out_of_range_attribute_lookup_is_a_contract_violation() {
    let table = substrate_vacuum();
    table.permittivity_real(3);
}
