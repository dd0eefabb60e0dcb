//! Reference listing: which target-scan pixels are points of interest.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::project::{ProjectDetails, ProjectDetailsError};
use crate::ListingError;

/// One parsed `name.tif,index` entry. `index` is 1-based.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub filename: String,
    pub index: usize,
}

/// Parse a `name.tif,index` line.
///
/// The split happens at the last comma, so file names may contain commas.
/// Surrounding whitespace is ignored.
pub fn parse_listing_entry(line: &str) -> Result<ListingEntry, ListingError> {
    let malformed = || ListingError::Malformed {
        line: line.to_string(),
    };
    let trimmed = line.trim();
    let (filename, index) = trimmed.rsplit_once(',').ok_or_else(malformed)?;

    let has_stem = filename.len() > ".tif".len();
    if !has_stem || !filename.ends_with(".tif") {
        return Err(malformed());
    }
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let index = index.parse().map_err(|_| malformed())?;

    Ok(ListingEntry {
        filename: filename.to_string(),
        index,
    })
}

/// Raw listing lines plus the entry count the metadata declares.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReferenceListing {
    lines: Vec<String>,
    declared_count: Option<usize>,
}

impl ReferenceListing {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            declared_count: None,
        }
    }

    pub fn with_declared_count(mut self, count: usize) -> Self {
        self.declared_count = Some(count);
        self
    }

    /// Listing read from the "Number of References" block of a project
    /// details sheet.
    pub fn from_project_details(details: &ProjectDetails) -> Result<Self, ProjectDetailsError> {
        let count = details.reference_count()?;
        let lines = details.reference_entries()?;
        if lines.len() != count {
            warn!(
                "project details declare {count} references but {} entries are present",
                lines.len()
            );
        }
        Ok(Self::new(lines).with_declared_count(count))
    }

    #[inline]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    #[inline]
    pub fn declared_count(&self) -> Option<usize> {
        self.declared_count
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
