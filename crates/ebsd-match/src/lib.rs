//! Facade crate for the `ebsd-match-*` workspace.
//!
//! Re-exports the geometry primitives and the matching engine under one
//! name, and ships the `ebsd-match` command-line tool (feature `cli`).
//!
//! ## Quickstart
//!
//! ```
//! use ebsd_match::core::{misorientation_deg, orientation_matrix, symmetry_group};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cubic = symmetry_group("cubic")?;
//! let a = orientation_matrix(0.0, 0.0, 0.0);
//! let b = orientation_matrix(std::f64::consts::FRAC_PI_2, 0.0, 0.0);
//! assert!(misorientation_deg(&a, &b, cubic.operators()) < 1e-6);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `ebsd_match::core`: Euler angles, symmetry groups, misorientation, grids.
//! - `ebsd_match::engine`: point sets, listings, matching, reports and I/O.
//!
//! ## Features
//! - `cli` (default): the `ebsd-match` binary.
//! - `rayon`: match targets of a phase in parallel.
//! - `tracing`: spans around the matching entry points and
//!   `core::init_tracing`.

pub use ebsd_match_core as core;
pub use ebsd_match_engine as engine;

pub use ebsd_match_core::{CrystalSystem, SymmetryGroup};
pub use ebsd_match_engine::{
    match_all, run_matching, Match, MatchError, MatchParams, MatchReport, MatchRunConfig,
    PhaseSymmetry,
};
