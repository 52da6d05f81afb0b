use super::common::{
    midpoint, shared_face_transformation, vacuum_substrate_materials, TwoElementMock,
};
use faraday::coefficient::FaceNeighborResolver;
use faraday::mesh::ElementRef;
use faraday::quadrature::IntegrationPoint;
use nalgebra::{Point3, Vector3};

#[test]
fn resolves_both_sides_of_an_interior_face() {
    let topology = TwoElementMock::interior();
    let resolver = FaceNeighborResolver::new(&topology);
    let point = IntegrationPoint::new(0.25, 0.75, 0.0, 1.0);

    let (adjacency, inward) =
        resolver.resolve_with_inward(&shared_face_transformation(), &point);

    assert_eq!(adjacency.side1.element, ElementRef::Local(0));
    assert_eq!(adjacency.side1.attribute, 1);
    assert_eq!(adjacency.side1.point, Point3::new(0.25, 0.75, 1.0));

    let side2 = adjacency.side2.expect("interior face must have two sides");
    assert_eq!(side2.element, ElementRef::Local(1));
    assert_eq!(side2.attribute, 2);
    assert_eq!(side2.point, Point3::new(0.25, 0.75, 0.0));

    assert_eq!(inward, Vector3::new(0.0, 0.0, -0.5));
}

#[test]
fn exterior_face_has_no_second_side() {
    let topology = TwoElementMock::exterior();
    let resolver = FaceNeighborResolver::new(&topology);

    let adjacency = resolver.resolve(&shared_face_transformation(), &midpoint());
    assert_eq!(adjacency.side1.element, ElementRef::Local(0));
    assert!(adjacency.side2.is_none());
}

#[test]
fn shared_face_resolves_to_ghost_neighbor() {
    let topology = TwoElementMock::shared();
    let resolver = FaceNeighborResolver::new(&topology);

    let adjacency = resolver.resolve(&shared_face_transformation(), &midpoint());
    let side2 = adjacency.side2.expect("shared face must have two sides");
    assert_eq!(side2.element, ElementRef::Ghost(1));
    assert_eq!(side2.attribute, 2);
    assert_eq!(side2.point, Point3::new(0.5, 0.5, 0.0));
}

#[test]
fn swapping_side_order_negates_the_inward_vector() {
    let topology = TwoElementMock::interior_swapped();
    let resolver = FaceNeighborResolver::new(&topology);

    let (adjacency, inward) =
        resolver.resolve_with_inward(&shared_face_transformation(), &midpoint());
    assert_eq!(adjacency.side1.element, ElementRef::Local(1));
    assert_eq!(adjacency.side2.unwrap().element, ElementRef::Local(0));
    assert_eq!(inward, Vector3::new(0.0, 0.0, 0.5));
}

#[test]
fn side_policies_select_the_documented_sides() {
    let topology = TwoElementMock::interior();
    let resolver = FaceNeighborResolver::new(&topology);
    let materials = vacuum_substrate_materials();

    let (adjacency, inward) =
        resolver.resolve_with_inward(&shared_face_transformation(), &midpoint());

    // Attribute 1 is the substrate (slower), attribute 2 the vacuum.
    assert_eq!(adjacency.higher_wave_speed_side(&materials).attribute, 2);
    assert_eq!(adjacency.larger_property_side(&materials).attribute, 1);

    // The inward vector points toward element 1 (-z here), so a +z direction
    // opposes it and selects side 2.
    assert_eq!(
        adjacency
            .directed_side(&inward, &Vector3::new(0.0, 0.0, 1.0))
            .attribute,
        2
    );
    assert_eq!(
        adjacency
            .directed_side(&inward, &Vector3::new(0.0, 0.0, -1.0))
            .attribute,
        1
    );
}

#[test]
fn single_sided_face_ignores_side_policies() {
    let topology = TwoElementMock::exterior();
    let resolver = FaceNeighborResolver::new(&topology);
    let materials = vacuum_substrate_materials();

    let adjacency = resolver.resolve(&shared_face_transformation(), &midpoint());
    assert_eq!(adjacency.higher_wave_speed_side(&materials).attribute, 1);
    assert_eq!(adjacency.larger_property_side(&materials).attribute, 1);
}

#[test]
#[should_panic(expected = "boundary element transformation")]
fn resolving_a_domain_transformation_is_a_contract_violation() {
    use faraday::mesh::ElementTransformation;
    use nalgebra::Matrix3;

    let topology = TwoElementMock::interior();
    let resolver = FaceNeighborResolver::new(&topology);
    let transformation =
        ElementTransformation::domain(0, 1, Matrix3::identity(), Point3::origin());
    resolver.resolve(&transformation, &midpoint());
}
