//! Phase percentages of total roast time

use crate::models::{MilestoneSet, PhaseSet, RoastDuration, TotalTimeSource};

impl RoastDuration {
    /// `drop - charge` when both are recorded, otherwise the last sample
    /// time minus charge (or zero when charge is unset)
    pub fn from_series(milestones: &MilestoneSet, timex: &[f64]) -> Self {
        match (milestones.charge, milestones.drop) {
            (Some(charge), Some(drop)) => RoastDuration {
                seconds: drop - charge,
                source: TotalTimeSource::Milestones,
            },
            _ => {
                let last = timex.last().copied().unwrap_or(0.0);
                RoastDuration {
                    seconds: last - milestones.charge.unwrap_or(0.0),
                    source: TotalTimeSource::SeriesFallback,
                }
            }
        }
    }
}

/// Percentage of `total` covered by `start..end`; 0 when either is missing
pub fn span_percent(start: Option<f64>, end: Option<f64>, total: f64) -> f64 {
    match (start, end) {
        (Some(start), Some(end)) if total > 0.0 => (end - start) / total * 100.0,
        _ => 0.0,
    }
}

/// Derive phase percentages.
///
/// A missing boundary contributes 0, and values are not clamped, so a
/// malformed import can report negative or >100 percentages.
pub fn compute(milestones: &MilestoneSet, total: RoastDuration) -> PhaseSet {
    PhaseSet {
        drying_percent: span_percent(milestones.charge, milestones.dry_end, total.seconds),
        maillard_percent: span_percent(milestones.dry_end, milestones.fc_start, total.seconds),
        development_percent: span_percent(milestones.fc_start, milestones.drop, total.seconds),
        total_time_seconds: total.seconds,
        total_time_source: total.source,
    }
}

/// Compute phases using the series fallback for total time
pub fn compute_from_series(milestones: &MilestoneSet, timex: &[f64]) -> PhaseSet {
    compute(milestones, RoastDuration::from_series(milestones, timex))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_reference_roast() {
        let milestones = MilestoneSet {
            charge: Some(0.0),
            dry_end: Some(30.0),
            fc_start: Some(90.0),
            drop: Some(150.0),
            cool: Some(180.0),
            ..Default::default()
        };
        let timex = [0.0, 30.0, 60.0, 90.0, 120.0, 150.0, 180.0];
        let phases = compute_from_series(&milestones, &timex);
        assert!(approx(phases.total_time_seconds, 150.0));
        assert_eq!(phases.total_time_source, TotalTimeSource::Milestones);
        assert!(approx(phases.drying_percent, 20.0));
        assert!(approx(phases.maillard_percent, 40.0));
        assert!(approx(phases.development_percent, 40.0));
    }

    #[test]
    fn test_missing_dry_end_reports_zero() {
        let milestones = MilestoneSet {
            charge: Some(10.0),
            fc_start: Some(400.0),
            drop: Some(610.0),
            ..Default::default()
        };
        let phases = compute_from_series(&milestones, &[0.0, 700.0]);
        assert_eq!(phases.drying_percent, 0.0);
        assert_eq!(phases.maillard_percent, 0.0);
        assert!(approx(phases.total_time_seconds, 600.0));
        assert!(approx(phases.development_percent, 35.0));
    }

    #[test]
    fn test_fallback_total_without_drop() {
        let milestones = MilestoneSet {
            charge: Some(15.0),
            dry_end: Some(255.0),
            ..Default::default()
        };
        let total = RoastDuration::from_series(&milestones, &[0.0, 300.0, 615.0]);
        assert_eq!(total.source, TotalTimeSource::SeriesFallback);
        assert!(approx(total.seconds, 600.0));
        let phases = compute(&milestones, total);
        assert!(approx(phases.drying_percent, 40.0));
        assert_eq!(phases.development_percent, 0.0);
    }

    #[test]
    fn test_fallback_total_without_charge() {
        let milestones = MilestoneSet {
            drop: Some(500.0),
            ..Default::default()
        };
        let total = RoastDuration::from_series(&milestones, &[0.0, 250.0, 540.0]);
        assert!(approx(total.seconds, 540.0));
        assert_eq!(total.source, TotalTimeSource::SeriesFallback);
    }

    #[test]
    fn test_zero_total_does_not_divide() {
        let milestones = MilestoneSet {
            charge: Some(100.0),
            dry_end: Some(200.0),
            drop: Some(100.0),
            ..Default::default()
        };
        let phases = compute_from_series(&milestones, &[]);
        assert_eq!(phases.total_time_seconds, 0.0);
        assert_eq!(phases.drying_percent, 0.0);
    }

    #[test]
    fn test_nonsense_milestones_are_not_clamped() {
        let milestones = MilestoneSet {
            charge: Some(0.0),
            dry_end: Some(300.0),
            fc_start: Some(100.0),
            drop: Some(200.0),
            ..Default::default()
        };
        let phases = compute_from_series(&milestones, &[]);
        assert!(approx(phases.drying_percent, 150.0));
        assert!(approx(phases.maillard_percent, -100.0));
    }

    /// Eight strictly increasing milestone times
    fn ordered_milestones() -> impl Strategy<Value = MilestoneSet> {
        (0.0f64..120.0, prop::collection::vec(1.0f64..300.0, 7)).prop_map(|(charge, gaps)| {
            let mut t = charge;
            let mut next = |gap: f64| {
                t += gap;
                Some(t)
            };
            MilestoneSet {
                charge: Some(charge),
                dry_end: next(gaps[0]),
                fc_start: next(gaps[1]),
                fc_end: next(gaps[2]),
                sc_start: next(gaps[3]),
                sc_end: next(gaps[4]),
                drop: next(gaps[5]),
                cool: next(gaps[6]),
            }
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Complete ordered milestones give non-negative phases and drop - charge
        #[test]
        fn prop_complete_milestones(milestones in ordered_milestones()) {
            let phases = compute_from_series(&milestones, &[]);
            prop_assert!(phases.drying_percent >= 0.0);
            prop_assert!(phases.maillard_percent >= 0.0);
            prop_assert!(phases.development_percent >= 0.0);
            let expected = milestones.drop.unwrap() - milestones.charge.unwrap();
            prop_assert!(approx(phases.total_time_seconds, expected));
            prop_assert_eq!(phases.total_time_source, TotalTimeSource::Milestones);
            let sum = phases.drying_percent + phases.maillard_percent + phases.development_percent;
            prop_assert!((sum - 100.0).abs() < 1e-6);
        }

        /// Without dry end, drying reports zero while total time is unaffected
        #[test]
        fn prop_missing_dry_end(milestones in ordered_milestones()) {
            let mut milestones = milestones;
            milestones.dry_end = None;
            let phases = compute_from_series(&milestones, &[]);
            prop_assert_eq!(phases.drying_percent, 0.0);
            prop_assert_eq!(phases.maillard_percent, 0.0);
            let expected = milestones.drop.unwrap() - milestones.charge.unwrap();
            prop_assert!(approx(phases.total_time_seconds, expected));
        }
    }
}
