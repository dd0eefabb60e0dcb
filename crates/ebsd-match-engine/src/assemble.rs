//! Deterministic ordering of matches and the final report.

use std::cmp::Ordering;
use std::collections::HashSet;

use ebsd_match_core::CrystalSystem;
use serde::{Deserialize, Serialize};

use crate::Match;

#[derive(Debug, PartialEq, Eq)]
enum Part<'a> {
    Text(String),
    Number(&'a str),
}

/// Alternating text/digit runs; always starts with a (possibly empty) text
/// run and ends with one when the name ends in digits.
fn natural_parts(s: &str) -> Vec<Part<'_>> {
    let mut parts = Vec::new();
    let mut rest = s;
    loop {
        let text_len = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        parts.push(Part::Text(rest[..text_len].to_lowercase()));
        rest = &rest[text_len..];
        if rest.is_empty() {
            break;
        }
        let num_len = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        parts.push(Part::Number(&rest[..num_len]));
        rest = &rest[num_len..];
        if rest.is_empty() {
            parts.push(Part::Text(String::new()));
            break;
        }
    }
    parts
}

fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Numeric-aware, case-insensitive ordering: `a2.tif < a10.tif`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let pa = natural_parts(a);
    let pb = natural_parts(b);
    for (x, y) in pa.iter().zip(&pb) {
        let ord = match (x, y) {
            (Part::Text(x), Part::Text(y)) => x.cmp(y),
            (Part::Number(x), Part::Number(y)) => cmp_digits(x, y),
            // Runs alternate from a text start, so kinds always line up.
            (Part::Text(_), Part::Number(_)) => Ordering::Less,
            (Part::Number(_), Part::Text(_)) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    pa.len().cmp(&pb.len())
}

/// Sort matches by deformed filename in natural order. Stable.
pub fn sort_matches(matches: &mut [Match]) {
    matches.sort_by(|a, b| natural_cmp(&a.deformed_filename, &b.deformed_filename));
}

/// Listed filenames that received no match, deduplicated, in natural order.
pub fn unmatched_filenames<S: AsRef<str>>(listed: &[S], matches: &[Match]) -> Vec<String> {
    let matched: HashSet<&str> = matches
        .iter()
        .map(|m| m.deformed_filename.as_str())
        .collect();
    let mut seen = HashSet::new();
    let mut unmatched: Vec<String> = listed
        .iter()
        .map(|s| AsRef::<str>::as_ref(s))
        .filter(|name| !matched.contains(name) && seen.insert(*name))
        .map(str::to_string)
        .collect();
    unmatched.sort_by(|a, b| natural_cmp(a, b));
    unmatched
}

/// Per-phase counts of one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseSummary {
    pub phase_id: Option<i32>,
    pub phase_name: Option<String>,
    pub symmetry: CrystalSystem,
    pub targets: usize,
    pub matched: usize,
}

impl PhaseSummary {
    /// Phase name, or the id when the scan carries no names.
    pub fn label(&self) -> String {
        match (&self.phase_name, self.phase_id) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => id.to_string(),
            (None, None) => "-".to_string(),
        }
    }
}

/// Everything a completed run produces.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub angle_threshold_deg: f64,
    /// Well-formed listing entries, including ones outside the scan.
    pub number_of_references: usize,
    pub matches: Vec<Match>,
    pub unmatched: Vec<String>,
    #[serde(default)]
    pub phases: Vec<PhaseSummary>,
}

impl MatchReport {
    /// Sort the per-phase results and derive the unmatched set.
    pub fn assemble<S: AsRef<str>>(
        angle_threshold_deg: f64,
        listed: &[S],
        mut matches: Vec<Match>,
        phases: Vec<PhaseSummary>,
    ) -> Self {
        sort_matches(&mut matches);
        let unmatched = unmatched_filenames(listed, &matches);
        Self {
            angle_threshold_deg,
            number_of_references: listed.len(),
            matches,
            unmatched,
            phases,
        }
    }

    pub fn matched_count(&self) -> usize {
        self.matches.len()
    }

    pub fn unmatched_count(&self) -> usize {
        self.unmatched.len()
    }

    pub fn phase_label(&self, phase_id: Option<i32>) -> Option<String> {
        self.phases
            .iter()
            .find(|p| p.phase_id == phase_id)
            .map(PhaseSummary::label)
    }
}
