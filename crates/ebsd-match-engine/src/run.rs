//! One complete matching run over already loaded scans.

use log::{info, warn};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::matcher::targets_by_phase;
use crate::{
    extract_targets, MatchError, MatchParams, MatchReport, MisorientationMatcher, PhaseSummary,
    PhaseSymmetry, ReferenceListing, ScanMaps,
};

/// Match the listed points of `target` against every pixel of `reference`.
///
/// Bad listing entries are skipped with a warning. Crystal systems for all
/// target phases present in the reference are resolved before the first
/// comparison, so an unknown or missing label fails the run without partial
/// output. Targets whose phase the reference lacks end up unmatched.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(entries = listing.len(), threshold = params.angle_threshold_deg))
)]
pub fn run_matching(
    reference: &ScanMaps,
    target: &ScanMaps,
    listing: &ReferenceListing,
    symmetry: &PhaseSymmetry,
    params: &MatchParams,
) -> Result<MatchReport, MatchError> {
    params.validate()?;

    let extraction = extract_targets(listing.lines(), target);
    if !extraction.issues.is_empty() {
        warn!(
            "{} of {} listing entries skipped",
            extraction.issues.len(),
            listing.len()
        );
    }

    let reference_points = reference.points();
    let matcher = MisorientationMatcher::new(&reference_points, params.clone())?;

    let by_phase = targets_by_phase(&extraction.targets);
    let groups = symmetry.resolve(
        by_phase
            .keys()
            .copied()
            .filter(|&p| matcher.reference().searches(p)),
    )?;
    info!(
        "{} usable reference points, {} targets, threshold {} deg",
        matcher.reference().len(),
        extraction.targets.len(),
        params.angle_threshold_deg
    );

    let mut matches = Vec::new();
    let mut phases = Vec::with_capacity(by_phase.len());
    for (&phase, targets) in &by_phase {
        let Some(group) = groups.get(phase) else {
            info!(
                "phase {:?}: {} targets, no reference points to compare with",
                phase,
                targets.len()
            );
            continue;
        };
        let phase_matches = matcher.match_phase(phase, targets, group);
        let summary = PhaseSummary {
            phase_id: phase,
            phase_name: phase
                .and_then(|id| reference.phase_name(id))
                .map(str::to_string),
            symmetry: group.system(),
            targets: targets.len(),
            matched: phase_matches.len(),
        };
        info!(
            "phase {} ({}): {}/{} targets matched",
            summary.label(),
            summary.symmetry,
            summary.matched,
            summary.targets
        );
        phases.push(summary);
        matches.extend(phase_matches);
    }

    let report = MatchReport::assemble(
        params.angle_threshold_deg,
        &extraction.listed_filenames,
        matches,
        phases,
    );
    info!(
        "matched {} of {} listed patterns, {} unmatched",
        report.matched_count(),
        report.number_of_references,
        report.unmatched_count()
    );
    Ok(report)
}
