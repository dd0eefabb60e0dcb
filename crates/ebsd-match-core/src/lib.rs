//! Core geometry for matching EBSD orientation maps.
//!
//! This crate is intentionally small and purely numeric. It knows how to turn
//! Bunge Euler angles into rotation matrices, which proper rotations make up
//! each crystal system, how far apart two orientations are once symmetry is
//! taken into account, and how row-major scan grids are indexed. It does *not*
//! know anything about files, listings or reports.

mod grid;
mod logger;
mod misorientation;
mod orientation;
mod symmetry;

pub use grid::{Grid, GridCoords, GridError, GridShape};
pub use misorientation::{misorientation_deg, rotation_angle_deg};
pub use orientation::{orientation_matrix, AngleUnit, EulerAngles, OrientationMatrix};
pub use symmetry::{symmetry_group, CrystalSystem, SymmetryError, SymmetryGroup};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_env, init_with_level, LOG_ENV};
