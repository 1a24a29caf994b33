//! Resolve milestone sample indices to times

use crate::error::{MalformedImport, MilestoneIssue};
use crate::models::{MilestoneIndices, MilestoneSet};
use crate::types::Milestone;

/// Look up each recorded milestone in `timex`.
///
/// Unset milestones stay `None`; nothing is interpolated. Out-of-range
/// indices and out-of-order milestones produce a [`MalformedImport`] whose
/// `partial` set is exactly what was recorded, never reordered.
pub fn resolve(timex: &[f64], indices: &MilestoneIndices) -> Result<MilestoneSet, MalformedImport> {
    let mut milestones = MilestoneSet::default();
    let mut issues = Vec::new();

    for milestone in Milestone::ALL {
        let Some(index) = indices.get(milestone) else {
            continue;
        };
        match timex.get(index) {
            Some(&seconds) => milestones.set(milestone, Some(seconds)),
            None => issues.push(MilestoneIssue::IndexOutOfRange {
                milestone,
                index,
                len: timex.len(),
            }),
        }
    }

    issues.extend(order_violations(&milestones));

    if issues.is_empty() {
        Ok(milestones)
    } else {
        Err(MalformedImport {
            issues,
            partial: milestones,
        })
    }
}

/// Resolve, keeping whatever could be resolved when the import is malformed
pub fn resolve_lenient(timex: &[f64], indices: &MilestoneIndices) -> (MilestoneSet, Option<MalformedImport>) {
    match resolve(timex, indices) {
        Ok(milestones) => (milestones, None),
        Err(malformed) => (malformed.partial, Some(malformed)),
    }
}

/// Each present milestone must not precede the present one before it
pub fn order_violations(milestones: &MilestoneSet) -> Vec<MilestoneIssue> {
    milestones
        .present()
        .windows(2)
        .filter_map(|pair| {
            let (earlier, earlier_seconds) = pair[0];
            let (later, later_seconds) = pair[1];
            (later_seconds < earlier_seconds).then_some(MilestoneIssue::OrderViolation {
                earlier,
                earlier_seconds,
                later,
                later_seconds,
            })
        })
        .collect()
}

/// Rebuild milestone indices from per-sample point flags
pub fn indices_from_flags<I>(flags: I) -> MilestoneIndices
where
    I: IntoIterator<Item = crate::models::MilestoneFlags>,
{
    let mut indices = MilestoneIndices::default();
    for (i, row) in flags.into_iter().enumerate() {
        for milestone in Milestone::ALL {
            if row.point(milestone) && indices.get(milestone).is_none() {
                indices.set(milestone, Some(i));
            }
        }
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MilestoneFlags;

    fn series(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64 * 10.0).collect()
    }

    #[test]
    fn test_resolve_present_and_missing() {
        let indices = MilestoneIndices {
            charge: Some(0),
            dry_end: Some(1),
            fc_start: Some(3),
            drop: Some(5),
            cool: Some(6),
            ..Default::default()
        };
        let timex = [0.0, 30.0, 60.0, 90.0, 120.0, 150.0, 180.0];
        let set = resolve(&timex, &indices).unwrap();
        assert_eq!(set.charge, Some(0.0));
        assert_eq!(set.dry_end, Some(30.0));
        assert_eq!(set.fc_start, Some(90.0));
        assert_eq!(set.fc_end, None);
        assert_eq!(set.sc_start, None);
        assert_eq!(set.sc_end, None);
        assert_eq!(set.drop, Some(150.0));
        assert_eq!(set.cool, Some(180.0));
    }

    #[test]
    fn test_resolve_nothing_recorded() {
        let set = resolve(&series(5), &MilestoneIndices::default()).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_out_of_order_is_malformed_not_reordered() {
        let indices = MilestoneIndices {
            charge: Some(5),
            dry_end: Some(2),
            fc_start: Some(9),
            ..Default::default()
        };
        let err = resolve(&series(12), &indices).unwrap_err();
        assert_eq!(
            err.issues,
            vec![MilestoneIssue::OrderViolation {
                earlier: Milestone::Charge,
                earlier_seconds: 50.0,
                later: Milestone::DryEnd,
                later_seconds: 20.0,
            }]
        );
        assert_eq!(err.partial.charge, Some(50.0));
        assert_eq!(err.partial.dry_end, Some(20.0));
        assert_eq!(err.partial.fc_start, Some(90.0));
    }

    #[test]
    fn test_out_of_range_index_is_malformed() {
        let indices = MilestoneIndices {
            charge: Some(0),
            drop: Some(40),
            ..Default::default()
        };
        let err = resolve(&series(10), &indices).unwrap_err();
        assert_eq!(
            err.issues,
            vec![MilestoneIssue::IndexOutOfRange {
                milestone: Milestone::Drop,
                index: 40,
                len: 10,
            }]
        );
        assert_eq!(err.partial.charge, Some(0.0));
        assert_eq!(err.partial.drop, None);
    }

    #[test]
    fn test_equal_times_are_allowed() {
        let indices = MilestoneIndices {
            fc_start: Some(4),
            fc_end: Some(4),
            ..Default::default()
        };
        assert!(resolve(&series(6), &indices).is_ok());
    }

    #[test]
    fn test_resolve_lenient_keeps_partial() {
        let indices = MilestoneIndices {
            charge: Some(3),
            dry_end: Some(1),
            ..Default::default()
        };
        let (set, malformed) = resolve_lenient(&series(5), &indices);
        assert!(malformed.is_some());
        assert_eq!(set.charge, Some(30.0));
        assert_eq!(set.dry_end, Some(10.0));
    }

    #[test]
    fn test_indices_from_flags_takes_first_flag() {
        let mut rows = vec![MilestoneFlags::default(); 6];
        rows[0].set_point(Milestone::Charge);
        rows[2].set_point(Milestone::DryEnd);
        rows[3].set_point(Milestone::DryEnd);
        rows[5].set_point(Milestone::Drop);
        let indices = indices_from_flags(rows);
        assert_eq!(indices.charge, Some(0));
        assert_eq!(indices.dry_end, Some(2));
        assert_eq!(indices.fc_start, None);
        assert_eq!(indices.drop, Some(5));
    }
}
