//! "Project Details" metadata sheet exported as a two-column CSV.
//!
//! Column 0 holds labels, column 1 values. Labels are looked up loosely:
//! case, whitespace and underscores are ignored and the wanted label only has
//! to appear somewhere inside the cell.

use std::fs::File;
use std::io;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum ProjectDetailsError {
    #[error("label '{label}' not found in project details")]
    MissingLabel { label: String },
    #[error("project details value for '{label}' is not valid: '{value}'")]
    InvalidValue { label: String, value: String },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

const X_STEP: &str = "x_step";
const Y_STEP: &str = "y_step";
const NUMBER_OF_REFERENCES: &str = "Number of References";

#[derive(Clone, Debug, PartialEq, Eq)]
struct Row {
    label: String,
    value: Option<String>,
}

/// Parsed project-details sheet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProjectDetails {
    rows: Vec<Row>,
}

fn normalize(label: &str) -> String {
    label
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

impl ProjectDetails {
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, ProjectDetailsError> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        let mut rows = Vec::new();
        for record in csv.records() {
            let record = record?;
            let label = record.get(0).unwrap_or("").to_string();
            let value = record
                .get(1)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string);
            rows.push(Row { label, value });
        }
        Ok(Self { rows })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ProjectDetailsError> {
        Self::from_reader(File::open(path)?)
    }

    fn position_of(&self, label: &str) -> Result<usize, ProjectDetailsError> {
        let wanted = normalize(label);
        self.rows
            .iter()
            .position(|row| normalize(&row.label).contains(&wanted))
            .ok_or_else(|| ProjectDetailsError::MissingLabel {
                label: label.to_string(),
            })
    }

    /// Value next to the first label cell that loosely contains `label`.
    /// `None` when that cell is blank.
    pub fn value_by_label(&self, label: &str) -> Result<Option<&str>, ProjectDetailsError> {
        let pos = self.position_of(label)?;
        Ok(self.rows[pos].value.as_deref())
    }

    fn number_by_label(&self, label: &str) -> Result<f64, ProjectDetailsError> {
        let raw = self.value_by_label(label)?.unwrap_or("");
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ProjectDetailsError::InvalidValue {
                label: label.to_string(),
                value: raw.to_string(),
            })
    }

    pub fn x_step(&self) -> Result<f64, ProjectDetailsError> {
        self.number_by_label(X_STEP)
    }

    pub fn y_step(&self) -> Result<f64, ProjectDetailsError> {
        self.number_by_label(Y_STEP)
    }

    /// Declared number of listing entries. Spreadsheet exports may write it
    /// as a float (`12.0`).
    pub fn reference_count(&self) -> Result<usize, ProjectDetailsError> {
        let n = self.number_by_label(NUMBER_OF_REFERENCES)?;
        if n < 0.0 || n.fract() != 0.0 {
            return Err(ProjectDetailsError::InvalidValue {
                label: NUMBER_OF_REFERENCES.to_string(),
                value: n.to_string(),
            });
        }
        Ok(n as usize)
    }

    /// Non-blank value cells of the `reference_count` rows following the
    /// "Number of References" row.
    pub fn reference_entries(&self) -> Result<Vec<String>, ProjectDetailsError> {
        let start = self.position_of(NUMBER_OF_REFERENCES)? + 1;
        let count = self.reference_count()?;
        Ok(self
            .rows
            .iter()
            .skip(start)
            .take(count)
            .filter_map(|row| row.value.clone())
            .collect())
    }
}
