//! Crystal orientations from Bunge Euler angles.

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

/// A proper rotation matrix describing one crystal orientation.
pub type OrientationMatrix = Matrix3<f64>;

/// Unit in which a scan stores its Euler angles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleUnit {
    #[default]
    Degrees,
    Radians,
}

impl AngleUnit {
    /// Convert a value expressed in this unit to radians. NaN stays NaN.
    #[inline]
    pub fn to_radians(self, value: f64) -> f64 {
        match self {
            AngleUnit::Degrees => value.to_radians(),
            AngleUnit::Radians => value,
        }
    }
}

/// Bunge Euler triple `(phi1, Phi, phi2)`, always held in radians.
///
/// Unmeasured pixels carry NaN components; use [`EulerAngles::is_measured`]
/// before converting to a matrix.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EulerAngles {
    pub phi1: f64,
    pub phi: f64,
    pub phi2: f64,
}

impl EulerAngles {
    pub fn new(phi1: f64, phi: f64, phi2: f64) -> Self {
        Self { phi1, phi, phi2 }
    }

    pub fn from_degrees(phi1: f64, phi: f64, phi2: f64) -> Self {
        Self::from_unit(AngleUnit::Degrees, phi1, phi, phi2)
    }

    pub fn from_unit(unit: AngleUnit, phi1: f64, phi: f64, phi2: f64) -> Self {
        Self {
            phi1: unit.to_radians(phi1),
            phi: unit.to_radians(phi),
            phi2: unit.to_radians(phi2),
        }
    }

    /// `false` when any component is NaN.
    #[inline]
    pub fn is_measured(&self) -> bool {
        !(self.phi1.is_nan() || self.phi.is_nan() || self.phi2.is_nan())
    }

    /// Rotation matrix for a measured orientation, `None` for NaN components.
    pub fn to_matrix(&self) -> Option<OrientationMatrix> {
        self.is_measured()
            .then(|| orientation_matrix(self.phi1, self.phi, self.phi2))
    }
}

/// Bunge (z-x-z) rotation matrix for Euler angles given in radians.
///
/// Inputs must not be NaN; callers filter unmeasured pixels first.
pub fn orientation_matrix(phi1: f64, phi: f64, phi2: f64) -> OrientationMatrix {
    let (s1, c1) = phi1.sin_cos();
    let (s, c) = phi.sin_cos();
    let (s2, c2) = phi2.sin_cos();

    Matrix3::new(
        c1 * c2 - s1 * s2 * c,
        -c1 * s2 - s1 * c2 * c,
        s1 * s,
        s1 * c2 + c1 * s2 * c,
        -s1 * s2 + c1 * c2 * c,
        -c1 * s,
        s2 * s,
        c2 * s,
        c,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn matrices_are_proper_rotations() {
        let steps = [-2.0 * PI, -1.3, 0.0, 0.4, FRAC_PI_2, 2.5, PI, 5.9, 9.7];
        for &a in &steps {
            for &b in &steps {
                for &c in &steps {
                    let g = orientation_matrix(a, b, c);
                    let gtg = g.transpose() * g;
                    assert_relative_eq!(gtg, Matrix3::<f64>::identity(), epsilon = 1e-12);
                    assert_relative_eq!(g.determinant(), 1.0, epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn zero_angles_give_identity() {
        assert_relative_eq!(
            orientation_matrix(0.0, 0.0, 0.0),
            Matrix3::<f64>::identity(),
            epsilon = 1e-15
        );
    }

    #[test]
    fn phi1_alone_rotates_about_z() {
        let g = orientation_matrix(FRAC_PI_2, 0.0, 0.0);
        let expected = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(g, expected, epsilon = 1e-12);
    }

    #[test]
    fn degrees_are_converted_once() {
        let e = EulerAngles::from_degrees(90.0, 45.0, 180.0);
        assert_relative_eq!(e.phi1, FRAC_PI_2, epsilon = 1e-15);
        assert_relative_eq!(e.phi, PI / 4.0, epsilon = 1e-15);
        assert_relative_eq!(e.phi2, PI, epsilon = 1e-15);

        let r = EulerAngles::from_unit(AngleUnit::Radians, 1.0, 2.0, 3.0);
        assert_eq!(r, EulerAngles::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn nan_components_are_unmeasured() {
        let e = EulerAngles::from_degrees(10.0, f64::NAN, 3.0);
        assert!(!e.is_measured());
        assert!(e.to_matrix().is_none());
        assert!(EulerAngles::new(0.1, 0.2, 0.3).to_matrix().is_some());
    }
}
