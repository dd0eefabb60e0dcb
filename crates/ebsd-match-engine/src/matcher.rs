use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::ops::Range;

use ebsd_match_core::{misorientation_deg, GridCoords, OrientationMatrix, SymmetryGroup};
use log::debug;
use serde::{Deserialize, Serialize};

#[cfg(feature = "rayon")]
use rayon::prelude::*;
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::assemble::sort_matches;
use crate::{MatchError, MatchParams, OrientationPoint, PhaseSymmetry, TargetPoint};

/// Best reference pixel found for one target.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub deformed_filename: String,
    pub deformed_index: usize,
    pub phase_id: Option<i32>,
    /// 1-based index into the reference scan.
    pub matched_reference_index: usize,
    pub matched_reference_coords: GridCoords,
    pub matched_reference_quality: f64,
    pub matched_angle_deg: f64,
    pub matched_physical_name: String,
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    point: OrientationPoint,
    matrix: OrientationMatrix,
}

/// NaN quality ranks below every measured value.
#[inline]
fn quality_rank(q: f64) -> f64 {
    if q.is_nan() {
        f64::NEG_INFINITY
    } else {
        q
    }
}

/// `a` beats `b` on image quality; equal quality goes to the earlier pixel.
#[inline]
fn outranks(a: &OrientationPoint, b: &OrientationPoint) -> bool {
    let (qa, qb) = (quality_rank(a.image_quality), quality_rank(b.image_quality));
    qa > qb || (qa == qb && a.source_index < b.source_index)
}

/// Measured reference points with precomputed matrices, grouped by phase.
#[derive(Clone, Debug, Default)]
pub struct ReferenceSet {
    candidates: Vec<Candidate>,
    /// `None` when the reference scan has no phase map.
    phases: Option<BTreeMap<i32, Range<usize>>>,
}

impl ReferenceSet {
    /// Drop unmeasured pixels and pixels below `min_quality`, then group the
    /// rest by phase.
    pub fn new(points: &[OrientationPoint], min_quality: Option<f64>) -> Self {
        let mut candidates: Vec<Candidate> = points
            .iter()
            .filter(|p| min_quality.is_none_or(|floor| p.image_quality >= floor))
            .filter_map(|p| {
                p.euler.to_matrix().map(|matrix| Candidate {
                    point: *p,
                    matrix,
                })
            })
            .collect();

        let partitioned = points.iter().any(|p| p.phase_id.is_some());
        let phases = partitioned.then(|| {
            candidates.sort_by_key(|c| c.point.phase_id);
            let mut ranges: BTreeMap<i32, Range<usize>> = BTreeMap::new();
            for (i, c) in candidates.iter().enumerate() {
                if let Some(phase) = c.point.phase_id {
                    ranges
                        .entry(phase)
                        .and_modify(|r| r.end = i + 1)
                        .or_insert(i..i + 1);
                }
            }
            ranges
        });

        debug!(
            "reference set: {} of {} points usable",
            candidates.len(),
            points.len()
        );
        Self { candidates, phases }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    #[inline]
    pub fn is_partitioned(&self) -> bool {
        self.phases.is_some()
    }

    /// Phase ids present among the usable reference points.
    pub fn phase_ids(&self) -> Vec<i32> {
        self.phases
            .as_ref()
            .map(|p| p.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Whether a target of `phase` has any reference point to compare with.
    ///
    /// Always true for an unpartitioned reference or a target without a
    /// phase; otherwise the phase must occur among the usable points.
    pub fn searches(&self, phase: Option<i32>) -> bool {
        match (&self.phases, phase) {
            (Some(ranges), Some(p)) => ranges.contains_key(&p),
            _ => !self.candidates.is_empty(),
        }
    }

    /// Points a target of `phase` may be compared against.
    ///
    /// Without a reference phase map, or for a target without a phase, this
    /// is every usable point.
    fn candidates(&self, phase: Option<i32>) -> &[Candidate] {
        match (&self.phases, phase) {
            (Some(ranges), Some(p)) => ranges
                .get(&p)
                .map_or(&[][..], |r| &self.candidates[r.clone()]),
            _ => &self.candidates,
        }
    }
}

/// Exhaustive misorientation search against one reference scan.
#[derive(Clone, Debug)]
pub struct MisorientationMatcher {
    reference: ReferenceSet,
    params: MatchParams,
}

impl MisorientationMatcher {
    pub fn new(
        reference_points: &[OrientationPoint],
        params: MatchParams,
    ) -> Result<Self, MatchError> {
        params.validate()?;
        let reference = ReferenceSet::new(reference_points, params.min_reference_quality);
        Ok(Self { reference, params })
    }

    #[inline]
    pub fn params(&self) -> &MatchParams {
        &self.params
    }

    #[inline]
    pub fn reference(&self) -> &ReferenceSet {
        &self.reference
    }

    /// Best reference pixel for `target` within the angle threshold.
    ///
    /// Among all candidates within tolerance the highest image quality wins,
    /// whatever its angle. `None` for unmeasured targets and when nothing is
    /// within tolerance.
    pub fn match_target(&self, target: &TargetPoint, group: &SymmetryGroup) -> Option<Match> {
        let g_target = target.point.euler.to_matrix()?;
        let threshold = self.params.angle_threshold_deg;
        let ops = group.operators();

        let (best, angle) = self
            .reference
            .candidates(target.point.phase_id)
            .iter()
            .map(|c| (c, misorientation_deg(&c.matrix, &g_target, ops)))
            .filter(|&(_, angle)| angle <= threshold)
            .fold(None, |best: Option<(&Candidate, f64)>, cur| match best {
                Some(b) if !outranks(&cur.0.point, &b.0.point) => Some(b),
                _ => Some(cur),
            })?;

        if angle > threshold {
            return None;
        }

        let r = &best.point;
        Some(Match {
            deformed_filename: target.deformed_filename.clone(),
            deformed_index: target.deformed_index,
            phase_id: target.point.phase_id,
            matched_reference_index: r.source_index,
            matched_reference_coords: r.coords,
            matched_reference_quality: r.image_quality,
            matched_angle_deg: angle,
            matched_physical_name: self.params.naming.name_for(r.coords),
        })
    }

    /// Match every target of one phase. Output follows `targets` order.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, targets, group), fields(targets = targets.len(), ops = group.len()))
    )]
    pub fn match_phase<T>(
        &self,
        phase: Option<i32>,
        targets: &[T],
        group: &SymmetryGroup,
    ) -> Vec<Match>
    where
        T: Borrow<TargetPoint> + Sync,
    {
        debug!(
            "phase {:?}: {} targets against {} reference points",
            phase,
            targets.len(),
            self.reference.candidates(phase).len()
        );

        #[cfg(feature = "rayon")]
        let matches = targets
            .par_iter()
            .filter_map(|t| self.match_target(t.borrow(), group))
            .collect();
        #[cfg(not(feature = "rayon"))]
        let matches = targets
            .iter()
            .filter_map(|t| self.match_target(t.borrow(), group))
            .collect();

        matches
    }
}

/// Targets grouped by phase id; listing order is kept within a phase.
pub(crate) fn targets_by_phase(
    targets: &[TargetPoint],
) -> BTreeMap<Option<i32>, Vec<&TargetPoint>> {
    let mut by_phase: BTreeMap<Option<i32>, Vec<&TargetPoint>> = BTreeMap::new();
    for t in targets {
        by_phase.entry(t.point.phase_id).or_default().push(t);
    }
    by_phase
}

/// Match every target against the reference points and return the matches
/// in natural filename order.
///
/// Symmetry groups are resolved before the first comparison for every target
/// phase the reference can serve; a missing or unknown crystal system fails
/// the whole call. Targets of other phases are left unmatched.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(reference = reference_points.len(), targets = target_points.len()))
)]
pub fn match_all(
    reference_points: &[OrientationPoint],
    target_points: &[TargetPoint],
    symmetry: &PhaseSymmetry,
    params: &MatchParams,
) -> Result<Vec<Match>, MatchError> {
    let matcher = MisorientationMatcher::new(reference_points, params.clone())?;
    let by_phase = targets_by_phase(target_points);
    let groups = symmetry.resolve(
        by_phase
            .keys()
            .copied()
            .filter(|&p| matcher.reference().searches(p)),
    )?;

    let mut matches = Vec::new();
    for (phase, targets) in &by_phase {
        let Some(group) = groups.get(*phase) else {
            continue;
        };
        matches.extend(matcher.match_phase(*phase, targets, group));
    }
    sort_matches(&mut matches);
    Ok(matches)
}
