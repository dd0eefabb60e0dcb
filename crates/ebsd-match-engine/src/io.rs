//! JSON configuration, scan documents and report writers.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use ebsd_match_core::{AngleUnit, Grid, GridError};
use serde::{Deserialize, Serialize};

use crate::params::percentile;
use crate::{
    EulerGrids, MatchParams, MatchReport, PhaseSymmetry, PhysicalNaming, ProjectDetails,
    ProjectDetailsError, ScanMaps,
};

#[derive(thiserror::Error, Debug)]
pub enum RunIoError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Per-pixel maps of one scan as stored on disk.
///
/// Every map is a list of rows; `null` marks an unmeasured cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanDocument {
    pub euler_phi1: Vec<Vec<Option<f64>>>,
    pub euler_phi: Vec<Vec<Option<f64>>>,
    pub euler_phi2: Vec<Vec<Option<f64>>>,
    pub image_quality: Vec<Vec<Option<f64>>>,
    #[serde(default)]
    pub phase_index: Option<Vec<Vec<i32>>>,
    #[serde(default)]
    pub phase_names: Vec<String>,
    #[serde(default)]
    pub angle_unit: AngleUnit,
}

fn nan_grid(name: &str, rows: Vec<Vec<Option<f64>>>) -> Result<Grid<f64>, GridError> {
    let rows = rows
        .into_iter()
        .map(|row| row.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
        .collect();
    Grid::from_rows(name, rows)
}

impl ScanDocument {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, RunIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Validate shapes and build the in-memory scan.
    pub fn into_maps(self) -> Result<ScanMaps, GridError> {
        let euler = EulerGrids::new(
            nan_grid("euler_phi1", self.euler_phi1)?,
            nan_grid("euler_phi", self.euler_phi)?,
            nan_grid("euler_phi2", self.euler_phi2)?,
            self.angle_unit,
        )?;
        let image_quality = nan_grid("image_quality", self.image_quality)?;
        let phase = self
            .phase_index
            .map(|rows| Grid::from_rows("phase_index", rows))
            .transpose()?;
        Ok(ScanMaps::new(euler, image_quality, phase)?.with_phase_names(self.phase_names))
    }
}

/// Load and validate a scan document.
pub fn load_scan_json(path: impl AsRef<Path>) -> Result<ScanMaps, RunIoError> {
    Ok(ScanDocument::load_json(path)?.into_maps()?)
}

fn default_angle_threshold() -> f64 {
    5.0
}

fn default_scale_factor() -> f64 {
    100.0
}

/// Configuration of one matching run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRunConfig {
    pub reference_scan: String,
    pub target_scan: String,
    pub project_details: String,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub report_json_path: Option<String>,
    #[serde(default = "default_angle_threshold")]
    pub angle_threshold_deg: f64,
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
    /// Overrides the step read from the project details.
    #[serde(default)]
    pub x_step: Option<f64>,
    #[serde(default)]
    pub y_step: Option<f64>,
    #[serde(default)]
    pub symmetry: PhaseSymmetry,
    /// Drop reference pixels below this image-quality percentile (0..=100).
    #[serde(default)]
    pub reference_quality_percentile: Option<f64>,
}

impl MatchRunConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, RunIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), RunIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the output CSV path.
    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("match_report.csv"))
    }

    /// Matching parameters for this run.
    ///
    /// Steps come from the project details unless overridden; the quality
    /// floor, when configured, is a percentile of the reference scan.
    pub fn build_params(
        &self,
        details: &ProjectDetails,
        reference: &ScanMaps,
    ) -> Result<MatchParams, ProjectDetailsError> {
        let x_step = match self.x_step {
            Some(step) => step,
            None => details.x_step()?,
        };
        let y_step = match self.y_step {
            Some(step) => step,
            None => details.y_step()?,
        };
        let min_reference_quality = self.reference_quality_percentile.and_then(|p| {
            percentile(reference.image_quality().as_slice().iter().copied(), p)
        });

        Ok(MatchParams {
            angle_threshold_deg: self.angle_threshold_deg,
            naming: PhysicalNaming {
                x_step,
                y_step,
                scale_factor: self.scale_factor,
            },
            min_reference_quality,
        })
    }
}

const REPORT_COLUMNS: [&str; 7] = [
    "Deformed_Filename",
    "Matched_0th_Filename",
    "Deformed_Index",
    "Matched_0th_Index",
    "Matched_0th_IQ",
    "Misorientation (deg)",
    "phase",
];

#[derive(Serialize)]
struct ReportRow<'a> {
    deformed_filename: &'a str,
    matched_filename: &'a str,
    deformed_index: usize,
    matched_index: usize,
    matched_quality: f64,
    misorientation_deg: f64,
    phase: String,
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

impl MatchReport {
    /// Write the CSV report: `#` header lines, then one row per match.
    pub fn write_csv_to<W: Write>(&self, mut out: W) -> Result<(), RunIoError> {
        writeln!(out, "# angle_threshold: {:?}", self.angle_threshold_deg)?;
        writeln!(out, "# number_of_references: {}", self.number_of_references)?;
        writeln!(out, "# number_of_matched_patterns: {}", self.matched_count())?;
        writeln!(out, "# no_matched_patterns: \"{}\"", self.unmatched.join(" "))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut out);
        writer.write_record(REPORT_COLUMNS)?;
        for m in &self.matches {
            writer.serialize(ReportRow {
                deformed_filename: &m.deformed_filename,
                matched_filename: &m.matched_physical_name,
                deformed_index: m.deformed_index,
                matched_index: m.matched_reference_index,
                matched_quality: m.matched_reference_quality,
                misorientation_deg: round_one_decimal(m.matched_angle_deg),
                phase: self
                    .phase_label(m.phase_id)
                    .unwrap_or_else(|| "-".to_string()),
            })?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), RunIoError> {
        let mut file = BufWriter::new(File::create(path)?);
        self.write_csv_to(&mut file)?;
        file.flush()?;
        Ok(())
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), RunIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, RunIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Match, PhaseSummary};
    use ebsd_match_core::{CrystalSystem, GridCoords};

    fn report() -> MatchReport {
        let m = |name: &str, angle: f64| Match {
            deformed_filename: name.to_string(),
            deformed_index: 4,
            phase_id: Some(1),
            matched_reference_index: 7,
            matched_reference_coords: GridCoords { row: 1, col: 2 },
            matched_reference_quality: 812.5,
            matched_angle_deg: angle,
            matched_physical_name: "0th_x100y50.tif".to_string(),
        };
        MatchReport::assemble(
            5.0,
            &["p2.tif", "p1.tif", "p3.tif", "p10.tif"],
            vec![m("p10.tif", 1.26), m("p2.tif", 0.04)],
            vec![PhaseSummary {
                phase_id: Some(1),
                phase_name: Some("Iron bcc".to_string()),
                symmetry: CrystalSystem::Cubic,
                targets: 3,
                matched: 2,
            }],
        )
    }

    #[test]
    fn csv_report_has_header_block_and_rows() {
        let mut out = Vec::new();
        report().write_csv_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "# angle_threshold: 5.0",
                "# number_of_references: 4",
                "# number_of_matched_patterns: 2",
                "# no_matched_patterns: \"p1.tif p3.tif\"",
                "Deformed_Filename,Matched_0th_Filename,Deformed_Index,Matched_0th_Index,Matched_0th_IQ,Misorientation (deg),phase",
                "p2.tif,0th_x100y50.tif,4,7,812.5,0.0,Iron bcc",
                "p10.tif,0th_x100y50.tif,4,7,812.5,1.3,Iron bcc",
            ]
        );
    }

    #[test]
    fn json_report_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = report();
        report.write_json(&path).unwrap();
        assert_eq!(MatchReport::load_json(&path).unwrap(), report);
    }

    #[test]
    fn scan_document_maps_nulls_to_nan() {
        let json = r#"{
            "euler_phi1": [[0.0, null], [1.0, 2.0]],
            "euler_phi":  [[0.0, 0.0], [0.0, 0.0]],
            "euler_phi2": [[0.0, 0.0], [0.0, 0.0]],
            "image_quality": [[1.0, 2.0], [3.0, null]],
            "phase_index": [[1, 1], [2, 2]],
            "phase_names": ["none", "a", "b"],
            "angle_unit": "radians"
        }"#;
        let doc: ScanDocument = serde_json::from_str(json).unwrap();
        let scan = doc.into_maps().unwrap();
        let points = scan.points();
        assert!(!points[1].euler.is_measured());
        assert_eq!(points[2].euler.phi1, 1.0);
        assert!(points[3].image_quality.is_nan());
        assert_eq!(scan.phase_name(2), Some("b"));
    }

    #[test]
    fn scan_document_rejects_mismatched_maps() {
        let json = r#"{
            "euler_phi1": [[0.0, 0.0]],
            "euler_phi":  [[0.0, 0.0]],
            "euler_phi2": [[0.0, 0.0]],
            "image_quality": [[1.0], [2.0]]
        }"#;
        let doc: ScanDocument = serde_json::from_str(json).unwrap();
        assert!(matches!(
            doc.into_maps(),
            Err(GridError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn config_defaults_and_params() {
        let json = r#"{
            "reference_scan": "ref.json",
            "target_scan": "def.json",
            "project_details": "details.csv",
            "y_step": 2.0,
            "symmetry": { "default": "cubic" }
        }"#;
        let config: MatchRunConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.angle_threshold_deg, 5.0);
        assert_eq!(config.scale_factor, 100.0);
        assert_eq!(config.output_path(), PathBuf::from("match_report.csv"));

        let details = ProjectDetails::from_reader("x_step,0.5\ny_step,0.5\n".as_bytes()).unwrap();
        let doc: ScanDocument = serde_json::from_str(
            r#"{"euler_phi1": [[0.0]], "euler_phi": [[0.0]], "euler_phi2": [[0.0]], "image_quality": [[1.0]]}"#,
        )
        .unwrap();
        let params = config.build_params(&details, &doc.into_maps().unwrap()).unwrap();
        assert_eq!(params.naming.x_step, 0.5);
        assert_eq!(params.naming.y_step, 2.0);
        assert_eq!(params.min_reference_quality, None);
    }
}
