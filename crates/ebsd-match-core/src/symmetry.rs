//! Proper-rotation symmetry operators for the seven crystal systems.
//!
//! Each system maps to the rotation subgroup of its Laue class:
//!
//! | system        | group | operators |
//! |---------------|-------|-----------|
//! | cubic         | O     | 24        |
//! | hexagonal     | D6    | 12        |
//! | tetragonal    | D4    | 8         |
//! | orthorhombic  | D2    | 4         |
//! | trigonal      | D3    | 6         |
//! | monoclinic    | C2    | 2         |
//! | triclinic     | C1    | 1         |
//!
//! The principal axis is z. Dihedral two-fold axes lie in the xy-plane at
//! angles `k·π/n`. The identity is always the first operator.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use crate::OrientationMatrix;

/// Errors produced while resolving a symmetry group.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SymmetryError {
    #[error("unsupported crystal symmetry '{label}'")]
    Unsupported { label: String },
}

/// One of the seven crystal systems.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrystalSystem {
    Cubic,
    Hexagonal,
    Tetragonal,
    Orthorhombic,
    Trigonal,
    Monoclinic,
    Triclinic,
}

impl CrystalSystem {
    pub const ALL: [CrystalSystem; 7] = [
        CrystalSystem::Cubic,
        CrystalSystem::Hexagonal,
        CrystalSystem::Tetragonal,
        CrystalSystem::Orthorhombic,
        CrystalSystem::Trigonal,
        CrystalSystem::Monoclinic,
        CrystalSystem::Triclinic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CrystalSystem::Cubic => "cubic",
            CrystalSystem::Hexagonal => "hexagonal",
            CrystalSystem::Tetragonal => "tetragonal",
            CrystalSystem::Orthorhombic => "orthorhombic",
            CrystalSystem::Trigonal => "trigonal",
            CrystalSystem::Monoclinic => "monoclinic",
            CrystalSystem::Triclinic => "triclinic",
        }
    }

    /// Schoenflies symbol of the proper rotation group.
    pub fn point_group(self) -> &'static str {
        match self {
            CrystalSystem::Cubic => "O",
            CrystalSystem::Hexagonal => "D6",
            CrystalSystem::Tetragonal => "D4",
            CrystalSystem::Orthorhombic => "D2",
            CrystalSystem::Trigonal => "D3",
            CrystalSystem::Monoclinic => "C2",
            CrystalSystem::Triclinic => "C1",
        }
    }

    pub fn operator_count(self) -> usize {
        match self {
            CrystalSystem::Cubic => 24,
            CrystalSystem::Hexagonal => 12,
            CrystalSystem::Tetragonal => 8,
            CrystalSystem::Orthorhombic => 4,
            CrystalSystem::Trigonal => 6,
            CrystalSystem::Monoclinic => 2,
            CrystalSystem::Triclinic => 1,
        }
    }
}

impl fmt::Display for CrystalSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CrystalSystem {
    type Err = SymmetryError;

    /// Accepts system names and group symbols, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        CrystalSystem::ALL
            .into_iter()
            .find(|sys| key == sys.name() || key == sys.point_group().to_ascii_lowercase())
            .ok_or_else(|| SymmetryError::Unsupported {
                label: s.to_string(),
            })
    }
}

/// Ordered, non-empty set of proper rotations for one crystal system.
#[derive(Clone, Debug, PartialEq)]
pub struct SymmetryGroup {
    system: CrystalSystem,
    operators: Vec<OrientationMatrix>,
}

impl SymmetryGroup {
    pub fn new(system: CrystalSystem) -> Self {
        let operators = match system {
            CrystalSystem::Cubic => octahedral(),
            CrystalSystem::Hexagonal => dihedral(6),
            CrystalSystem::Tetragonal => dihedral(4),
            CrystalSystem::Orthorhombic => dihedral(2),
            CrystalSystem::Trigonal => dihedral(3),
            CrystalSystem::Monoclinic => cyclic(2),
            CrystalSystem::Triclinic => cyclic(1),
        };
        debug_assert_eq!(operators.len(), system.operator_count());
        Self { system, operators }
    }

    #[inline]
    pub fn system(&self) -> CrystalSystem {
        self.system
    }

    #[inline]
    pub fn operators(&self) -> &[OrientationMatrix] {
        &self.operators
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    /// Always `false`; every group contains the identity.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

/// Resolve a crystal-system label (name or group symbol) into its operators.
pub fn symmetry_group(label: &str) -> Result<SymmetryGroup, SymmetryError> {
    let system = label.parse::<CrystalSystem>()?;
    Ok(SymmetryGroup::new(system))
}

fn rot_z(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0)
}

/// Half-turn about the in-plane axis `(cos a, sin a, 0)`.
fn half_turn_in_plane(a: f64) -> Matrix3<f64> {
    let (s, c) = (2.0 * a).sin_cos();
    Matrix3::new(c, s, 0.0, s, -c, 0.0, 0.0, 0.0, -1.0)
}

fn cyclic(n: usize) -> Vec<Matrix3<f64>> {
    (0..n)
        .map(|k| rot_z(2.0 * PI * k as f64 / n as f64))
        .collect()
}

fn dihedral(n: usize) -> Vec<Matrix3<f64>> {
    let mut ops = cyclic(n);
    ops.extend((0..n).map(|k| half_turn_in_plane(PI * k as f64 / n as f64)));
    ops
}

/// The 24 signed permutation matrices with determinant +1.
fn octahedral() -> Vec<Matrix3<f64>> {
    const PERMS: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];
    let mut ops = Vec::with_capacity(24);
    for perm in PERMS {
        for signs in 0..8u8 {
            let mut m = Matrix3::<f64>::zeros();
            for (row, &col) in perm.iter().enumerate() {
                m[(row, col)] = if signs & (1 << row) == 0 { 1.0 } else { -1.0 };
            }
            if m.determinant() > 0.0 {
                ops.push(m);
            }
        }
    }
    ops
}
