//! Symmetry-aware matching of a deformed EBSD scan against its reference.
//!
//! ## Quickstart
//!
//! ```
//! use ebsd_match_core::{AngleUnit, Grid, GridShape};
//! use ebsd_match_engine::{
//!     run_matching, EulerGrids, MatchParams, PhaseSymmetry, ReferenceListing, ScanMaps,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let shape = GridShape::new(1, 2);
//! let grid = |v: Vec<f64>| Grid::from_vec(shape, v);
//! let euler = EulerGrids::new(
//!     grid(vec![10.0, 80.0])?,
//!     grid(vec![20.0, 20.0])?,
//!     grid(vec![30.0, 30.0])?,
//!     AngleUnit::Degrees,
//! )?;
//! let scan = ScanMaps::new(euler, grid(vec![1.0, 2.0])?, None)?;
//!
//! let listing = ReferenceListing::new(["pattern_1.tif,1", "pattern_2.tif,2"]);
//! let report = run_matching(
//!     &scan,
//!     &scan,
//!     &listing,
//!     &PhaseSymmetry::uniform("cubic"),
//!     &MatchParams::default(),
//! )?;
//! assert_eq!(report.matched_count(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! Pipeline:
//! 1. Flatten each scan row-major into [`OrientationPoint`]s (1-based
//!    `source_index`).
//! 2. Parse the `name.tif,index` listing and resolve each entry to a
//!    [`TargetPoint`] of the deformed scan. Bad entries are logged and skipped.
//! 3. Resolve the crystal symmetry of every target phase up front.
//! 4. For each target, compare against every measured reference point of the
//!    same phase, keep those within the angle threshold and pick the one with
//!    the highest image quality.
//! 5. Name the chosen reference pixel physically (`0th_x{..}y{..}.tif`), sort
//!    by filename in natural order and list the unmatched targets.

mod assemble;
mod error;
mod io;
mod listing;
mod matcher;
mod params;
mod points;
mod project;
mod remap;
mod run;

pub use assemble::{natural_cmp, sort_matches, unmatched_filenames, MatchReport, PhaseSummary};
pub use error::{ListingError, MatchError};
pub use io::{load_scan_json, MatchRunConfig, RunIoError, ScanDocument};
pub use listing::{parse_listing_entry, ListingEntry, ReferenceListing};
pub use matcher::{match_all, Match, MisorientationMatcher, ReferenceSet};
pub use params::{percentile, MatchParams, PhaseSymmetry, PhysicalNaming, ResolvedSymmetry};
pub use points::{
    extract_targets, flatten_grid, EulerGrids, OrientationPoint, ScanMaps, TargetExtraction,
    TargetPoint,
};
pub use project::{ProjectDetails, ProjectDetailsError};
pub use remap::{parse_physical_coords, physical_name, PhysicalFileIndex};
pub use run::run_matching;
