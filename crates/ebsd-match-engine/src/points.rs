//! Flattening scan grids into point records and resolving listed targets.

use ebsd_match_core::{AngleUnit, EulerAngles, Grid, GridCoords, GridError, GridShape};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::listing::parse_listing_entry;
use crate::ListingError;

/// One measurement location of a scan.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrientationPoint {
    pub coords: GridCoords,
    /// Radians. NaN components mark an unmeasured pixel.
    pub euler: EulerAngles,
    pub image_quality: f64,
    /// `None` when the scan has no phase map.
    pub phase_id: Option<i32>,
    /// 1-based row-major position in the scan.
    pub source_index: usize,
}

/// A listed point of the deformed scan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetPoint {
    pub point: OrientationPoint,
    pub deformed_filename: String,
    pub deformed_index: usize,
}

/// The three Euler-angle grids of a scan, all of one shape.
#[derive(Clone, Debug, PartialEq)]
pub struct EulerGrids {
    pub phi1: Grid<f64>,
    pub phi: Grid<f64>,
    pub phi2: Grid<f64>,
    pub unit: AngleUnit,
}

impl EulerGrids {
    pub fn new(
        phi1: Grid<f64>,
        phi: Grid<f64>,
        phi2: Grid<f64>,
        unit: AngleUnit,
    ) -> Result<Self, GridError> {
        let shape = phi1.shape();
        shape.ensure_matches("euler_phi", phi.shape())?;
        shape.ensure_matches("euler_phi2", phi2.shape())?;
        Ok(Self {
            phi1,
            phi,
            phi2,
            unit,
        })
    }

    #[inline]
    pub fn shape(&self) -> GridShape {
        self.phi1.shape()
    }

    /// Euler triple at a 0-based flat index, converted to radians.
    fn angles_at(&self, index: usize) -> Option<EulerAngles> {
        Some(EulerAngles::from_unit(
            self.unit,
            *self.phi1.get_flat(index)?,
            *self.phi.get_flat(index)?,
            *self.phi2.get_flat(index)?,
        ))
    }
}

/// All per-pixel maps of one scan.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanMaps {
    euler: EulerGrids,
    image_quality: Grid<f64>,
    phase: Option<Grid<i32>>,
    phase_names: Vec<String>,
}

impl ScanMaps {
    pub fn new(
        euler: EulerGrids,
        image_quality: Grid<f64>,
        phase: Option<Grid<i32>>,
    ) -> Result<Self, GridError> {
        let shape = euler.shape();
        shape.ensure_matches("image_quality", image_quality.shape())?;
        if let Some(phase) = &phase {
            shape.ensure_matches("phase_index", phase.shape())?;
        }
        Ok(Self {
            euler,
            image_quality,
            phase,
            phase_names: Vec::new(),
        })
    }

    /// Names of the phases, indexed by phase id.
    pub fn with_phase_names(mut self, names: Vec<String>) -> Self {
        self.phase_names = names;
        self
    }

    #[inline]
    pub fn shape(&self) -> GridShape {
        self.euler.shape()
    }

    #[inline]
    pub fn euler(&self) -> &EulerGrids {
        &self.euler
    }

    #[inline]
    pub fn image_quality(&self) -> &Grid<f64> {
        &self.image_quality
    }

    #[inline]
    pub fn has_phases(&self) -> bool {
        self.phase.is_some()
    }

    pub fn phase_name(&self, phase_id: i32) -> Option<&str> {
        usize::try_from(phase_id)
            .ok()
            .and_then(|i| self.phase_names.get(i))
            .map(String::as_str)
    }

    /// Point at a 0-based flat index.
    fn point_at(&self, index: usize) -> Option<OrientationPoint> {
        let shape = self.shape();
        Some(OrientationPoint {
            coords: shape.coords_of(index)?,
            euler: self.euler.angles_at(index)?,
            image_quality: *self.image_quality.get_flat(index)?,
            phase_id: match &self.phase {
                Some(phase) => Some(*phase.get_flat(index)?),
                None => None,
            },
            source_index: index + 1,
        })
    }

    /// Every pixel in row-major order.
    pub fn points(&self) -> Vec<OrientationPoint> {
        (0..self.shape().len())
            .filter_map(|i| self.point_at(i))
            .collect()
    }
}

/// Flatten the grids of a scan row-major into one point per pixel.
///
/// Nothing is filtered: unmeasured pixels keep their NaN angles.
pub fn flatten_grid(
    euler: &EulerGrids,
    image_quality: &Grid<f64>,
    phase: Option<&Grid<i32>>,
) -> Result<Vec<OrientationPoint>, GridError> {
    let scan = ScanMaps::new(euler.clone(), image_quality.clone(), phase.cloned())?;
    Ok(scan.points())
}

/// Targets resolved from a listing together with what went wrong on the way.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TargetExtraction {
    /// Resolved targets in listing order.
    pub targets: Vec<TargetPoint>,
    /// File names of every well-formed entry, in listing order.
    pub listed_filenames: Vec<String>,
    /// Skipped entries.
    pub issues: Vec<ListingError>,
}

/// Resolve each `name.tif,index` entry against the deformed scan.
///
/// Malformed entries and indices outside the scan are logged and skipped.
/// Entries with a valid index but outside the scan still count as listed.
pub fn extract_targets<S: AsRef<str>>(entries: &[S], scan: &ScanMaps) -> TargetExtraction {
    let shape = scan.shape();
    let mut out = TargetExtraction::default();

    for line in entries {
        let entry = match parse_listing_entry(line.as_ref()) {
            Ok(entry) => entry,
            Err(err) => {
                warn!("{err}");
                out.issues.push(err);
                continue;
            }
        };
        out.listed_filenames.push(entry.filename.clone());

        let point = entry
            .index
            .checked_sub(1)
            .and_then(|i| scan.point_at(i));
        match point {
            Some(point) => out.targets.push(TargetPoint {
                point,
                deformed_filename: entry.filename,
                deformed_index: entry.index,
            }),
            None => {
                let err = ListingError::IndexOutOfRange {
                    filename: entry.filename,
                    index: entry.index,
                    shape,
                };
                warn!("{err}");
                out.issues.push(err);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid(rows: Vec<Vec<f64>>) -> Grid<f64> {
        Grid::from_rows("test", rows).unwrap()
    }

    fn scan() -> ScanMaps {
        let euler = EulerGrids::new(
            grid(vec![vec![0.0, 90.0, 180.0], vec![f64::NAN, 45.0, 30.0]]),
            grid(vec![vec![0.0; 3]; 2]),
            grid(vec![vec![0.0; 3]; 2]),
            AngleUnit::Degrees,
        )
        .unwrap();
        let iq = grid(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        let phase = Grid::from_rows("phase", vec![vec![1, 1, 2], vec![2, 1, 2]]).unwrap();
        ScanMaps::new(euler, iq, Some(phase)).unwrap()
    }

    #[test]
    fn flatten_is_row_major_with_one_based_index() {
        let points = scan().points();
        assert_eq!(points.len(), 6);
        for (i, p) in points.iter().enumerate() {
            assert_eq!(p.source_index, i + 1);
            assert_eq!(p.source_index - 1, p.coords.row * 3 + p.coords.col);
        }
        assert_eq!(points[4].coords, GridCoords { row: 1, col: 1 });
        assert_eq!(points[4].image_quality, 5.0);
        assert_eq!(points[4].phase_id, Some(1));
        assert_relative_eq!(points[1].euler.phi1, std::f64::consts::FRAC_PI_2);
        // unmeasured pixels are not filtered here
        assert!(!points[3].euler.is_measured());
    }

    #[test]
    fn flatten_without_phase_map() {
        let s = scan();
        let points = flatten_grid(&s.euler, &s.image_quality, None).unwrap();
        assert!(points.iter().all(|p| p.phase_id.is_none()));
    }

    #[test]
    fn mismatched_shapes_are_fatal() {
        let s = scan();
        let small_iq = grid(vec![vec![1.0, 2.0, 3.0]]);
        let err = ScanMaps::new(s.euler.clone(), small_iq, None).unwrap_err();
        assert!(matches!(err, GridError::ShapeMismatch { ref name, .. } if name == "image_quality"));

        let err = EulerGrids::new(
            grid(vec![vec![0.0; 3]; 2]),
            grid(vec![vec![0.0; 2]; 3]),
            grid(vec![vec![0.0; 3]; 2]),
            AngleUnit::Radians,
        )
        .unwrap_err();
        assert!(matches!(err, GridError::ShapeMismatch { .. }));
    }

    #[test]
    fn targets_keep_listing_order_and_skip_bad_entries() {
        let lines = ["b.tif,6", "garbage", "a.tif,2", "far.tif,99", "zero.tif,0"];
        let ex = extract_targets(&lines, &scan());

        let names: Vec<_> = ex
            .targets
            .iter()
            .map(|t| t.deformed_filename.as_str())
            .collect();
        assert_eq!(names, ["b.tif", "a.tif"]);
        assert_eq!(ex.targets[0].point.coords, GridCoords { row: 1, col: 2 });
        assert_eq!(ex.targets[0].deformed_index, 6);
        assert_eq!(ex.targets[0].point.phase_id, Some(2));
        assert_eq!(
            ex.listed_filenames,
            ["b.tif", "a.tif", "far.tif", "zero.tif"]
        );
        assert_eq!(ex.issues.len(), 3);
        assert!(matches!(ex.issues[0], ListingError::Malformed { .. }));
        assert!(matches!(
            ex.issues[1],
            ListingError::IndexOutOfRange { index: 99, .. }
        ));
    }

    #[test]
    fn phase_names_are_indexed_by_id() {
        let s = scan().with_phase_names(vec!["unindexed".into(), "Ferrite".into()]);
        assert_eq!(s.phase_name(1), Some("Ferrite"));
        assert_eq!(s.phase_name(2), None);
        assert_eq!(s.phase_name(-1), None);
    }
}
