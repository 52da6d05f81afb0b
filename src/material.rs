//! Attribute-keyed material property storage.
//!
//! A [`MaterialPropertyTable`] is constructed once at session start from
//! per-attribute material records and is read-only for its entire lifetime;
//! coefficients and assemblers look properties up but never write them.

use crate::Real;
use eyre::{eyre, Result};
use nalgebra::{convert, Matrix3};
use serde::{Deserialize, Serialize};

/// Named categories of tensor-valued material data exposed to coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    InvPermeability,
    PermittivityReal,
    PermittivityImag,
    PermittivityAbs,
    Conductivity,
    InvLondonDepth,
    InvImpedance,
    /// Composite inverse permeability scaled by the wave-speed tensor.
    InvPermeabilityWaveSpeed,
}

/// Material record for a single mesh attribute.
///
/// Tensors are given in the frame of the mesh; the table derives inverse and
/// composite quantities at construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeMaterial<T: Real> {
    pub permittivity_real: Matrix3<T>,
    pub permittivity_imag: Matrix3<T>,
    pub permeability: Matrix3<T>,
    pub conductivity: Matrix3<T>,
    /// London penetration depth for superconducting domains.
    pub london_depth: Option<T>,
}

impl<T: Real> AttributeMaterial<T> {
    pub fn isotropic(permittivity: T, permeability: T) -> Self {
        Self {
            permittivity_real: Matrix3::from_diagonal_element(permittivity),
            permittivity_imag: Matrix3::zeros(),
            permeability: Matrix3::from_diagonal_element(permeability),
            conductivity: Matrix3::zeros(),
            london_depth: None,
        }
    }

    pub fn vacuum() -> Self {
        Self::isotropic(T::one(), T::one())
    }

    pub fn with_conductivity(mut self, conductivity: Matrix3<T>) -> Self {
        self.conductivity = conductivity;
        self
    }

    pub fn with_loss(mut self, permittivity_imag: Matrix3<T>) -> Self {
        self.permittivity_imag = permittivity_imag;
        self
    }

    pub fn with_london_depth(mut self, depth: T) -> Self {
        self.london_depth = Some(depth);
        self
    }
}

/// Immutable per-attribute lookup of material property tensors.
///
/// Attributes are 1-based, matching the mesh convention. The table outlives
/// every coefficient built on it within a simulation session.
#[derive(Debug, Clone)]
pub struct MaterialPropertyTable<T: Real> {
    inv_permeability: Vec<Matrix3<T>>,
    permittivity_real: Vec<Matrix3<T>>,
    permittivity_imag: Vec<Matrix3<T>>,
    permittivity_abs: Vec<Matrix3<T>>,
    conductivity: Vec<Matrix3<T>>,
    inv_london_depth: Vec<Matrix3<T>>,
    inv_impedance: Vec<Matrix3<T>>,
    wave_speed: Vec<Matrix3<T>>,
    wave_speed_min: Vec<T>,
    wave_speed_max: Vec<T>,
}

impl<T: Real> MaterialPropertyTable<T> {
    /// Builds the table from one material record per attribute, in attribute order
    /// (index 0 corresponds to attribute 1).
    ///
    /// Fails if a permeability tensor is singular or a permittivity-permeability
    /// product is not positive definite.
    pub fn from_materials(materials: &[AttributeMaterial<T>]) -> Result<Self> {
        let mut table = Self {
            inv_permeability: Vec::with_capacity(materials.len()),
            permittivity_real: Vec::with_capacity(materials.len()),
            permittivity_imag: Vec::with_capacity(materials.len()),
            permittivity_abs: Vec::with_capacity(materials.len()),
            conductivity: Vec::with_capacity(materials.len()),
            inv_london_depth: Vec::with_capacity(materials.len()),
            inv_impedance: Vec::with_capacity(materials.len()),
            wave_speed: Vec::with_capacity(materials.len()),
            wave_speed_min: Vec::with_capacity(materials.len()),
            wave_speed_max: Vec::with_capacity(materials.len()),
        };

        for (index, material) in materials.iter().enumerate() {
            let attribute = index + 1;
            let inv_permeability = material
                .permeability
                .try_inverse()
                .ok_or_else(|| eyre!("singular permeability tensor for attribute {attribute}"))?;

            // Wave speeds derive from the eigenvalues of ε μ; the bounds are the
            // extremal speeds over propagation directions.
            let eps_mu = symmetrize(&(material.permittivity_real * material.permeability));
            let eigenvalues = eps_mu.symmetric_eigenvalues();
            let mut lambda_min = eigenvalues[0];
            let mut lambda_max = eigenvalues[0];
            for i in 1..3 {
                lambda_min = lambda_min.min(eigenvalues[i]);
                lambda_max = lambda_max.max(eigenvalues[i]);
            }
            if lambda_min <= T::zero() {
                return Err(eyre!(
                    "permittivity-permeability product for attribute {attribute} is not positive definite"
                ));
            }
            let wave_speed = inv_sqrt_spd(&eps_mu)?;

            let eps_inv_mu = symmetrize(&(material.permittivity_real * inv_permeability));
            let inv_impedance = sqrt_spd(&eps_inv_mu)?;

            let inv_london_depth = match material.london_depth {
                Some(depth) => {
                    if depth <= T::zero() {
                        return Err(eyre!("nonpositive London depth for attribute {attribute}"));
                    }
                    inv_permeability / (depth * depth)
                }
                None => Matrix3::zeros(),
            };

            table.inv_permeability.push(inv_permeability);
            table.permittivity_real.push(material.permittivity_real);
            table.permittivity_imag.push(material.permittivity_imag);
            table.permittivity_abs.push(
                material
                    .permittivity_real
                    .zip_map(&material.permittivity_imag, |re, im| (re * re + im * im).sqrt()),
            );
            table.conductivity.push(material.conductivity);
            table.inv_london_depth.push(inv_london_depth);
            table.inv_impedance.push(inv_impedance);
            table.wave_speed.push(wave_speed);
            table.wave_speed_min.push(T::one() / lambda_max.sqrt());
            table.wave_speed_max.push(T::one() / lambda_min.sqrt());
        }

        Ok(table)
    }

    pub fn num_attributes(&self) -> usize {
        self.permittivity_real.len()
    }

    fn index(&self, attribute: i32) -> usize {
        assert!(
            attribute >= 1 && (attribute as usize) <= self.num_attributes(),
            "attribute {} outside the material table (1..={})",
            attribute,
            self.num_attributes()
        );
        (attribute - 1) as usize
    }

    pub fn inv_permeability(&self, attribute: i32) -> &Matrix3<T> {
        &self.inv_permeability[self.index(attribute)]
    }

    pub fn permittivity_real(&self, attribute: i32) -> &Matrix3<T> {
        &self.permittivity_real[self.index(attribute)]
    }

    pub fn permittivity_imag(&self, attribute: i32) -> &Matrix3<T> {
        &self.permittivity_imag[self.index(attribute)]
    }

    pub fn permittivity_abs(&self, attribute: i32) -> &Matrix3<T> {
        &self.permittivity_abs[self.index(attribute)]
    }

    pub fn conductivity(&self, attribute: i32) -> &Matrix3<T> {
        &self.conductivity[self.index(attribute)]
    }

    pub fn inv_london_depth(&self, attribute: i32) -> &Matrix3<T> {
        &self.inv_london_depth[self.index(attribute)]
    }

    pub fn inv_impedance(&self, attribute: i32) -> &Matrix3<T> {
        &self.inv_impedance[self.index(attribute)]
    }

    pub fn wave_speed(&self, attribute: i32) -> &Matrix3<T> {
        &self.wave_speed[self.index(attribute)]
    }

    /// Lower wave-speed bound over propagation directions for the attribute.
    pub fn wave_speed_min(&self, attribute: i32) -> T {
        self.wave_speed_min[self.index(attribute)]
    }

    /// Upper wave-speed bound over propagation directions for the attribute.
    pub fn wave_speed_max(&self, attribute: i32) -> T {
        self.wave_speed_max[self.index(attribute)]
    }

    /// Property tensor for the given kind and attribute.
    ///
    /// Composite kinds are formed from the stored tensors on the fly.
    pub fn property(&self, kind: PropertyKind, attribute: i32) -> Matrix3<T> {
        match kind {
            PropertyKind::InvPermeability => *self.inv_permeability(attribute),
            PropertyKind::PermittivityReal => *self.permittivity_real(attribute),
            PropertyKind::PermittivityImag => *self.permittivity_imag(attribute),
            PropertyKind::PermittivityAbs => *self.permittivity_abs(attribute),
            PropertyKind::Conductivity => *self.conductivity(attribute),
            PropertyKind::InvLondonDepth => *self.inv_london_depth(attribute),
            PropertyKind::InvImpedance => *self.inv_impedance(attribute),
            PropertyKind::InvPermeabilityWaveSpeed => {
                self.inv_permeability(attribute) * self.wave_speed(attribute)
            }
        }
    }
}

fn symmetrize<T: Real>(matrix: &Matrix3<T>) -> Matrix3<T> {
    (matrix + matrix.transpose()) * convert::<f64, T>(0.5)
}

fn sqrt_spd<T: Real>(matrix: &Matrix3<T>) -> Result<Matrix3<T>> {
    map_spd_eigenvalues(matrix, |lambda| lambda.sqrt())
}

fn inv_sqrt_spd<T: Real>(matrix: &Matrix3<T>) -> Result<Matrix3<T>> {
    map_spd_eigenvalues(matrix, |lambda| T::one() / lambda.sqrt())
}

fn map_spd_eigenvalues<T: Real>(matrix: &Matrix3<T>, f: impl Fn(T) -> T) -> Result<Matrix3<T>> {
    let eigen = matrix.symmetric_eigen();
    let mut diagonal = Matrix3::zeros();
    for i in 0..3 {
        let lambda = eigen.eigenvalues[i];
        if lambda <= T::zero() {
            return Err(eyre!("material tensor is not positive definite"));
        }
        diagonal[(i, i)] = f(lambda);
    }
    Ok(eigen.eigenvectors * diagonal * eigen.eigenvectors.transpose())
}
