//! Symmetry-reduced misorientation angle.

use crate::OrientationMatrix;

/// Rotation angle of a proper rotation matrix, in degrees within `[0, 180]`.
///
/// The cosine is clamped to `[-1, 1]` so round-off never yields NaN.
#[inline]
pub fn rotation_angle_deg(delta: &OrientationMatrix) -> f64 {
    let cos = ((delta.trace() - 1.0) / 2.0).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Minimum rotation angle between two orientations over `sym_ops`.
///
/// For every operator `s` the candidate rotation is `g_target · s · g_ref⁻¹`.
/// All operators are scanned; the result lies in `[0, 180]` degrees.
pub fn misorientation_deg(
    g_ref: &OrientationMatrix,
    g_target: &OrientationMatrix,
    sym_ops: &[OrientationMatrix],
) -> f64 {
    // g_ref is orthonormal, so its inverse is its transpose.
    let g_ref_inv = g_ref.transpose();
    sym_ops
        .iter()
        .map(|s| rotation_angle_deg(&(g_target * s * g_ref_inv)))
        .fold(180.0_f64, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{orientation_matrix, CrystalSystem, SymmetryGroup};
    use approx::assert_relative_eq;
    use nalgebra::Matrix3;

    fn sample_orientations() -> Vec<OrientationMatrix> {
        vec![
            orientation_matrix(0.0, 0.0, 0.0),
            orientation_matrix(0.3, 1.1, 2.4),
            orientation_matrix(4.0, 0.2, 5.5),
            orientation_matrix(1.9, 2.8, 0.7),
        ]
    }

    #[test]
    fn self_misorientation_is_zero() {
        for system in CrystalSystem::ALL {
            let group = SymmetryGroup::new(system);
            for g in sample_orientations() {
                let angle = misorientation_deg(&g, &g, group.operators());
                assert!(angle.abs() < 1e-5, "{system}: {angle}");
            }
        }
    }

    #[test]
    fn symmetry_equivalent_reference_gives_same_angle() {
        let g_target = orientation_matrix(0.9, 0.6, 1.7);
        for system in CrystalSystem::ALL {
            let group = SymmetryGroup::new(system);
            for g_ref in sample_orientations() {
                let base = misorientation_deg(&g_ref, &g_target, group.operators());
                for s in group.operators() {
                    let equivalent = g_ref * s;
                    let angle = misorientation_deg(&equivalent, &g_target, group.operators());
                    assert_relative_eq!(angle, base, epsilon = 1e-6);
                }
            }
        }
    }

    #[test]
    fn swapping_arguments_keeps_angle() {
        let group = SymmetryGroup::new(CrystalSystem::Hexagonal);
        let a = orientation_matrix(0.2, 0.9, 1.3);
        let b = orientation_matrix(2.2, 0.4, 0.1);
        assert_relative_eq!(
            misorientation_deg(&a, &b, group.operators()),
            misorientation_deg(&b, &a, group.operators()),
            epsilon = 1e-9
        );
    }

    #[test]
    fn quarter_turn_is_invisible_only_to_cubic() {
        let g_ref = orientation_matrix(0.4, 0.8, 1.2);
        let quarter = orientation_matrix(std::f64::consts::FRAC_PI_2, 0.0, 0.0);
        let g_target = g_ref * quarter;

        let cubic = SymmetryGroup::new(CrystalSystem::Cubic);
        let triclinic = SymmetryGroup::new(CrystalSystem::Triclinic);
        assert!(misorientation_deg(&g_ref, &g_target, cubic.operators()) < 1e-5);
        assert_relative_eq!(
            misorientation_deg(&g_ref, &g_target, triclinic.operators()),
            90.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn angle_stays_in_range() {
        let group = SymmetryGroup::new(CrystalSystem::Triclinic);
        let half_turn = Matrix3::new(1.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, -1.0);
        let angle = misorientation_deg(&Matrix3::identity(), &half_turn, group.operators());
        assert_relative_eq!(angle, 180.0, epsilon = 1e-9);

        // Slightly non-orthonormal input pushes the cosine past 1.
        let noisy = Matrix3::<f64>::identity() * (1.0 + 1e-12);
        let angle = misorientation_deg(&Matrix3::identity(), &noisy, group.operators());
        assert!(angle.is_finite());
        assert!((0.0..=180.0).contains(&angle));
    }
}
