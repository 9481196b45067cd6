//! Collision shapes and mass properties.
//!
//! Shapes are expressed in body space relative to the body origin. They serve
//! two purposes: computing mass properties from geometry and density at scene
//! setup, and providing the points tested against the terrain every frame.

use nalgebra::{Matrix3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A collision shape attached to a body.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Shape {
    /// Solid sphere.
    Sphere {
        /// Centre in body space.
        center: Vector3<f64>,
        /// Radius (m).
        radius: f64,
    },
    /// Solid axis-aligned box (in body space).
    Cuboid {
        /// Centre in body space.
        center: Vector3<f64>,
        /// Half extents along body x/y/z (m).
        half_extents: Vector3<f64>,
    },
}

impl Shape {
    /// Sphere centred at `center`.
    #[must_use]
    pub const fn sphere(center: Vector3<f64>, radius: f64) -> Self {
        Self::Sphere { center, radius }
    }

    /// Box centred at `center`.
    #[must_use]
    pub const fn cuboid(center: Vector3<f64>, half_extents: Vector3<f64>) -> Self {
        Self::Cuboid {
            center,
            half_extents,
        }
    }

    /// Centre in body space.
    #[must_use]
    pub fn center(&self) -> Vector3<f64> {
        match *self {
            Self::Sphere { center, .. } | Self::Cuboid { center, .. } => center,
        }
    }

    /// Volume (m³).
    #[must_use]
    pub fn volume(&self) -> f64 {
        match *self {
            Self::Sphere { radius, .. } => 4.0 / 3.0 * std::f64::consts::PI * radius.powi(3),
            Self::Cuboid { half_extents, .. } => {
                8.0 * half_extents.x * half_extents.y * half_extents.z
            }
        }
    }

    /// Inertia tensor about the shape's own centre for the given mass.
    ///
    /// - sphere: `I = (2/5) m r²`
    /// - box: `Ixx = (1/12) m (y² + z²)` with full edge lengths
    #[must_use]
    pub fn inertia(&self, mass: f64) -> Matrix3<f64> {
        match *self {
            Self::Sphere { radius, .. } => {
                let i = 0.4 * mass * radius * radius;
                Matrix3::from_diagonal_element(i)
            }
            Self::Cuboid { half_extents, .. } => {
                let x2 = 4.0 * half_extents.x * half_extents.x;
                let y2 = 4.0 * half_extents.y * half_extents.y;
                let z2 = 4.0 * half_extents.z * half_extents.z;
                Matrix3::from_diagonal(&Vector3::new(
                    mass * (y2 + z2) / 12.0,
                    mass * (x2 + z2) / 12.0,
                    mass * (x2 + y2) / 12.0,
                ))
            }
        }
    }

    /// Radius swept around the contact candidates (zero for boxes).
    #[must_use]
    pub fn radius(&self) -> f64 {
        match *self {
            Self::Sphere { radius, .. } => radius,
            Self::Cuboid { .. } => 0.0,
        }
    }

    /// Body-space points tested against the terrain.
    ///
    /// Spheres test their centre (the radius is subtracted from the signed
    /// distance); boxes test their eight corners.
    #[must_use]
    pub fn contact_candidates(&self) -> ContactCandidates {
        match *self {
            Self::Sphere { center, .. } => ContactCandidates {
                points: [center; 8],
                len: 1,
            },
            Self::Cuboid {
                center,
                half_extents: e,
            } => {
                let mut points = [center; 8];
                for (i, p) in points.iter_mut().enumerate() {
                    let sx = if i & 1 == 0 { -1.0 } else { 1.0 };
                    let sy = if i & 2 == 0 { -1.0 } else { 1.0 };
                    let sz = if i & 4 == 0 { -1.0 } else { 1.0 };
                    *p += Vector3::new(sx * e.x, sy * e.y, sz * e.z);
                }
                ContactCandidates { points, len: 8 }
            }
        }
    }
}

/// Fixed-size list of body-space contact candidate points.
#[derive(Debug, Clone, Copy)]
pub struct ContactCandidates {
    points: [Vector3<f64>; 8],
    len: usize,
}

impl ContactCandidates {
    /// The candidate points.
    #[must_use]
    pub fn as_slice(&self) -> &[Vector3<f64>] {
        &self.points[..self.len]
    }
}

/// Mass properties of a rigid body.
///
/// Contains mass, centre of mass offset, and inertia tensor.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MassProperties {
    /// Total mass in kg.
    pub mass: f64,
    /// Centre of mass offset from body origin in local coordinates.
    pub center_of_mass: Vector3<f64>,
    /// Inertia tensor about centre of mass in local coordinates (kg·m²).
    pub inertia: Matrix3<f64>,
}

impl MassProperties {
    /// Create mass properties with given values.
    #[must_use]
    pub const fn new(mass: f64, center_of_mass: Vector3<f64>, inertia: Matrix3<f64>) -> Self {
        Self {
            mass,
            center_of_mass,
            inertia,
        }
    }

    /// Mass properties of a static (immovable) body.
    #[must_use]
    pub fn infinite() -> Self {
        Self {
            mass: 0.0,
            center_of_mass: Vector3::zeros(),
            inertia: Matrix3::zeros(),
        }
    }

    /// Uniform sphere centred at the origin.
    #[must_use]
    pub fn sphere(mass: f64, radius: f64) -> Self {
        let shape = Shape::sphere(Vector3::zeros(), radius);
        Self::new(mass, Vector3::zeros(), shape.inertia(mass))
    }

    /// Uniform box centred at the origin.
    #[must_use]
    pub fn cuboid(mass: f64, half_extents: Vector3<f64>) -> Self {
        let shape = Shape::cuboid(Vector3::zeros(), half_extents);
        Self::new(mass, Vector3::zeros(), shape.inertia(mass))
    }

    /// Combine shapes of uniform `density` into one body.
    ///
    /// Sums masses, takes the mass-weighted centroid and shifts every shape's
    /// inertia to that centroid with the parallel-axis theorem.
    #[must_use]
    pub fn from_shapes(shapes: &[Shape], density: f64) -> Self {
        let mut mass = 0.0;
        let mut weighted = Vector3::zeros();
        for shape in shapes {
            let m = density * shape.volume();
            mass += m;
            weighted += shape.center() * m;
        }
        if mass <= 0.0 {
            return Self::infinite();
        }
        let center_of_mass = weighted / mass;

        let mut inertia = Matrix3::zeros();
        for shape in shapes {
            let m = density * shape.volume();
            let d = shape.center() - center_of_mass;
            let shift = (Matrix3::identity() * d.norm_squared() - d * d.transpose()) * m;
            inertia += shape.inertia(m) + shift;
        }

        Self {
            mass,
            center_of_mass,
            inertia,
        }
    }

    /// Inverse mass (0 for static bodies).
    #[must_use]
    pub fn inverse_mass(&self) -> f64 {
        if self.is_static() {
            0.0
        } else {
            1.0 / self.mass
        }
    }

    /// Inverse inertia tensor (zero for static bodies or singular inertia).
    #[must_use]
    pub fn inverse_inertia(&self) -> Matrix3<f64> {
        if self.is_static() {
            return Matrix3::zeros();
        }
        self.inertia.try_inverse().unwrap_or_else(Matrix3::zeros)
    }

    /// Check if this represents a static (immovable) body.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.mass <= 0.0 || self.mass.is_infinite()
    }

    /// Validate that the mass properties are physically valid.
    pub fn validate(&self) -> crate::Result<()> {
        if self.mass < 0.0 {
            return Err(crate::SimError::invalid_mass("mass cannot be negative"));
        }

        if self.mass.is_nan() {
            return Err(crate::SimError::invalid_mass(
                "mass must be finite or infinity (static)",
            ));
        }

        if !self.center_of_mass.iter().all(|x| x.is_finite()) {
            return Err(crate::SimError::invalid_mass(
                "center of mass must be finite",
            ));
        }

        let eigenvalues = self.inertia.symmetric_eigenvalues();
        if eigenvalues.iter().any(|&e| e < -1e-10) {
            return Err(crate::SimError::invalid_mass(
                "inertia tensor must be positive semi-definite",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sphere_inertia() {
        let props = MassProperties::sphere(1.0, 1.0);
        assert_relative_eq!(props.inertia[(0, 0)], 0.4, epsilon = 1e-10);
        assert_relative_eq!(props.inertia[(2, 2)], 0.4, epsilon = 1e-10);
    }

    #[test]
    fn test_box_inertia() {
        let props = MassProperties::cuboid(12.0, Vector3::new(0.5, 0.5, 0.5));
        // 1x1x1 box with mass 12: I = (1/12) * 12 * (1 + 1) = 2
        assert_relative_eq!(props.inertia[(0, 0)], 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_from_shapes_single_box() {
        let shape = Shape::cuboid(Vector3::new(0.0, 0.0, 0.25), Vector3::new(1.0, 2.0, 0.5));
        let props = MassProperties::from_shapes(&[shape], 100.0);

        assert_relative_eq!(props.mass, 100.0 * 8.0, epsilon = 1e-9);
        assert_relative_eq!(props.center_of_mass, Vector3::new(0.0, 0.0, 0.25), epsilon = 1e-12);
        assert_relative_eq!(props.inertia, shape.inertia(props.mass), epsilon = 1e-9);
    }

    #[test]
    fn test_from_shapes_parallel_axis() {
        let shapes = [
            Shape::sphere(Vector3::new(-1.0, 0.0, 0.0), 0.5),
            Shape::sphere(Vector3::new(1.0, 0.0, 0.0), 0.5),
        ];
        let props = MassProperties::from_shapes(&shapes, 1.0);
        let m = shapes[0].volume();

        assert_relative_eq!(props.center_of_mass, Vector3::zeros(), epsilon = 1e-12);
        // About x: no offset contribution. About y and z: 2 * m * 1².
        let own = 0.4 * m * 0.25;
        assert_relative_eq!(props.inertia[(0, 0)], 2.0 * own, epsilon = 1e-12);
        assert_relative_eq!(props.inertia[(1, 1)], 2.0 * (own + m), epsilon = 1e-12);
        assert_relative_eq!(props.inertia[(2, 2)], 2.0 * (own + m), epsilon = 1e-12);
    }

    #[test]
    fn test_static_mass() {
        let props = MassProperties::infinite();
        assert!(props.is_static());
        assert_eq!(props.inverse_mass(), 0.0);
        assert_eq!(props.inverse_inertia(), Matrix3::zeros());

        let props = MassProperties::sphere(4.0, 1.0);
        assert_relative_eq!(props.inverse_mass(), 0.25);
    }

    #[test]
    fn test_validation() {
        assert!(MassProperties::sphere(1.0, 1.0).validate().is_ok());
        let negative = MassProperties::new(-1.0, Vector3::zeros(), Matrix3::identity());
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_box_candidates_are_corners() {
        let shape = Shape::cuboid(Vector3::zeros(), Vector3::new(1.0, 2.0, 3.0));
        let candidates = shape.contact_candidates();
        assert_eq!(candidates.as_slice().len(), 8);
        for p in candidates.as_slice() {
            assert_relative_eq!(p.x.abs(), 1.0);
            assert_relative_eq!(p.y.abs(), 2.0);
            assert_relative_eq!(p.z.abs(), 3.0);
        }

        let sphere = Shape::sphere(Vector3::new(0.0, 1.0, 0.0), 0.3);
        assert_eq!(sphere.contact_candidates().as_slice(), &[Vector3::new(0.0, 1.0, 0.0)]);
    }
}
