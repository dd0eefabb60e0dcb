use std::collections::BTreeMap;

use ebsd_match_core::{symmetry_group, GridCoords, SymmetryGroup};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::remap::physical_name;
use crate::MatchError;

/// Physical naming of reference pixels: per-axis step sizes and the
/// multiplier used by the file-naming scheme.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicalNaming {
    pub x_step: f64,
    pub y_step: f64,
    pub scale_factor: f64,
}

impl Default for PhysicalNaming {
    fn default() -> Self {
        Self {
            x_step: 1.0,
            y_step: 1.0,
            scale_factor: 100.0,
        }
    }
}

impl PhysicalNaming {
    /// File name of the reference pixel at `coords`.
    #[inline]
    pub fn name_for(&self, coords: GridCoords) -> String {
        physical_name(
            coords.row,
            coords.col,
            self.x_step,
            self.y_step,
            self.scale_factor,
        )
    }
}

/// Parameters of the matching engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchParams {
    /// Maximum accepted misorientation (degrees, inclusive).
    pub angle_threshold_deg: f64,
    #[serde(default)]
    pub naming: PhysicalNaming,
    /// Reference points with lower image quality are never candidates.
    #[serde(default)]
    pub min_reference_quality: Option<f64>,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            angle_threshold_deg: 5.0,
            naming: PhysicalNaming::default(),
            min_reference_quality: None,
        }
    }
}

impl MatchParams {
    pub fn with_threshold(angle_threshold_deg: f64) -> Self {
        Self {
            angle_threshold_deg,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if !self.angle_threshold_deg.is_finite() || self.angle_threshold_deg < 0.0 {
            return Err(MatchError::InvalidParams(format!(
                "angle threshold must be a non-negative number of degrees, got {}",
                self.angle_threshold_deg
            )));
        }
        let n = &self.naming;
        for (what, value) in [
            ("x_step", n.x_step),
            ("y_step", n.y_step),
            ("scale_factor", n.scale_factor),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(MatchError::InvalidParams(format!(
                    "{what} must be positive, got {value}"
                )));
            }
        }
        if let Some(q) = self.min_reference_quality {
            if q.is_nan() {
                return Err(MatchError::InvalidParams(
                    "minimum reference quality is NaN".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Crystal-system label per phase id.
///
/// `default` covers phases without an explicit entry and scans that carry no
/// phase map at all.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSymmetry {
    #[serde(default)]
    pub phases: BTreeMap<i32, String>,
    #[serde(default)]
    pub default: Option<String>,
}

impl PhaseSymmetry {
    /// Same crystal system for every phase.
    pub fn uniform(label: impl Into<String>) -> Self {
        Self {
            phases: BTreeMap::new(),
            default: Some(label.into()),
        }
    }

    pub fn with_phase(mut self, phase: i32, label: impl Into<String>) -> Self {
        self.phases.insert(phase, label.into());
        self
    }

    pub fn label_for(&self, phase: Option<i32>) -> Option<&str> {
        phase
            .and_then(|p| self.phases.get(&p))
            .or(self.default.as_ref())
            .map(String::as_str)
    }

    /// Resolve the operator sets for every phase in `phases`.
    ///
    /// Runs before any comparison so that an unknown label or a phase with no
    /// label aborts the run up front. Callers pass only the phases they will
    /// actually search.
    pub fn resolve(
        &self,
        phases: impl IntoIterator<Item = Option<i32>>,
    ) -> Result<ResolvedSymmetry, MatchError> {
        let mut groups = BTreeMap::new();
        for phase in phases {
            if groups.contains_key(&phase) {
                continue;
            }
            let label = self
                .label_for(phase)
                .ok_or(MatchError::MissingSymmetry { phase })?;
            let group = symmetry_group(label)?;
            debug!(
                "phase {:?}: {} ({} operators)",
                phase,
                group.system(),
                group.len()
            );
            groups.insert(phase, group);
        }
        Ok(ResolvedSymmetry { groups })
    }
}

/// Symmetry groups resolved once per run, shared read-only by all targets.
#[derive(Clone, Debug, Default)]
pub struct ResolvedSymmetry {
    groups: BTreeMap<Option<i32>, SymmetryGroup>,
}

impl ResolvedSymmetry {
    #[inline]
    pub fn get(&self, phase: Option<i32>) -> Option<&SymmetryGroup> {
        self.groups.get(&phase)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Option<i32>, &SymmetryGroup)> {
        self.groups.iter().map(|(p, g)| (*p, g))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// `p`-th percentile (0..=100) of the finite values, linearly interpolated
/// between closest ranks. `None` when there is no finite value.
pub fn percentile(values: impl IntoIterator<Item = f64>, p: f64) -> Option<f64> {
    let mut finite: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    finite.sort_by(f64::total_cmp);
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (finite.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(finite[lo] + (finite[hi] - finite[lo]) * frac)
}
