//! Fan one import out into profile, log, event, phase and device rows

use crate::error::MalformedImport;
use crate::models::{
    confidence, AuxChannel, DecomposedImport, DerivedFields, ExtraDeviceRow, MilestoneFlags,
    MilestoneSet, PhaseSet, ProfileSummary, ReadingQuality, RoastEventRow, RoastImport,
    RoastPhaseRow, SensorType, SpecialEvent, TemperatureLogRow, CONTROL_CATEGORY,
    ROAST_PHASE_CATEGORY,
};
use crate::pipeline::temperature::{self, NormalizedTemperatures, MISSING_READING_SENTINEL};
use crate::types::{ControlKind, Milestone, RoastPhase, TemperatureUnit};

/// Unit recorded for fan and heat channels
pub const PERCENT_UNIT: &str = "%";

/// Log row state flags that are not phases: (flag, opened by, closed by)
const ROLLING_STATES: [(RollingState, Milestone, &[Milestone]); 3] = [
    (
        RollingState::FirstCrack,
        Milestone::FcStart,
        &[Milestone::FcEnd, Milestone::ScStart, Milestone::Drop],
    ),
    (
        RollingState::SecondCrack,
        Milestone::ScStart,
        &[Milestone::ScEnd, Milestone::Drop],
    ),
    (RollingState::Cooling, Milestone::Drop, &[Milestone::Cool]),
];

#[derive(Debug, Clone, Copy)]
enum RollingState {
    FirstCrack,
    SecondCrack,
    Cooling,
}

/// How a state span ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closure {
    Canonical,
    Fallback,
    SeriesEnd,
}

/// Samples `start..end` covered by a state, with its boundary times
#[derive(Debug, Clone, Copy)]
struct StateSpan {
    start: usize,
    end: usize,
    start_seconds: f64,
    end_seconds: f64,
    closure: Closure,
}

/// Build every row for one import. Pure: no I/O, no logging.
pub fn decompose(
    import: &RoastImport,
    temps: &NormalizedTemperatures,
    milestones: &MilestoneSet,
    phases: &PhaseSet,
    malformed: Option<&MalformedImport>,
) -> DecomposedImport {
    DecomposedImport {
        profile: build_profile(import, temps, milestones, phases),
        log_rows: build_log_rows(&import.timex, temps, milestones, &import.special_events),
        event_rows: build_event_rows(&import.timex, temps, milestones, &import.special_events),
        phase_rows: build_phase_rows(&import.timex, milestones, phases, malformed.is_some()),
        device_rows: build_device_rows(&import.aux_channels, import.unit, temps.unit),
    }
}

/// First sample recorded at or after `seconds`
pub fn first_sample_at_or_after(timex: &[f64], seconds: f64) -> Option<usize> {
    timex.iter().position(|&t| t >= seconds)
}

fn state_span(
    timex: &[f64],
    milestones: &MilestoneSet,
    open: Milestone,
    closers: &[Milestone],
) -> Option<StateSpan> {
    let start_seconds = milestones.get(open)?;
    let start = first_sample_at_or_after(timex, start_seconds)?;

    let closer = closers
        .iter()
        .enumerate()
        .find_map(|(rank, m)| milestones.get(*m).map(|t| (rank, t)));

    let (end, end_seconds, closure) = match closer {
        Some((rank, seconds)) => (
            first_sample_at_or_after(timex, seconds).unwrap_or(timex.len()),
            seconds,
            if rank == 0 {
                Closure::Canonical
            } else {
                Closure::Fallback
            },
        ),
        None => (
            timex.len(),
            timex.last().copied().unwrap_or(start_seconds),
            Closure::SeriesEnd,
        ),
    };

    Some(StateSpan {
        start,
        end: end.max(start),
        start_seconds,
        end_seconds,
        closure,
    })
}

/// Carry the last Air and Burner settings forward across samples
fn control_settings(len: usize, events: &[SpecialEvent]) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let mut sorted: Vec<&SpecialEvent> = events.iter().collect();
    sorted.sort_by_key(|e| e.sample_index);
    let mut pending = sorted.into_iter().peekable();

    let mut fan = Vec::with_capacity(len);
    let mut heat = Vec::with_capacity(len);
    let (mut current_fan, mut current_heat) = (None, None);

    for i in 0..len {
        while let Some(event) = pending.next_if(|e| e.sample_index <= i) {
            match event.kind {
                ControlKind::Air => current_fan = Some(event.value),
                ControlKind::Burner => current_heat = Some(event.value),
                _ => {}
            }
        }
        fan.push(current_fan);
        heat.push(current_heat);
    }

    (fan, heat)
}

fn build_log_rows(
    timex: &[f64],
    temps: &NormalizedTemperatures,
    milestones: &MilestoneSet,
    events: &[SpecialEvent],
) -> Vec<TemperatureLogRow> {
    let (fan, heat) = control_settings(timex.len(), events);

    let mut rows: Vec<TemperatureLogRow> = timex
        .iter()
        .enumerate()
        .map(|(i, &time_seconds)| TemperatureLogRow {
            time_seconds,
            bean_temp: temps.bean_temps.get(i).copied().flatten(),
            env_temp: temps.env_temps.get(i).copied().flatten(),
            fan_setting: fan[i],
            heat_setting: heat[i],
            flags: MilestoneFlags::default(),
        })
        .collect();

    for (milestone, seconds) in milestones.present() {
        if let Some(i) = first_sample_at_or_after(timex, seconds) {
            rows[i].flags.set_point(milestone);
        }
    }

    for phase in RoastPhase::ALL {
        if let Some(span) = state_span(timex, milestones, phase.opened_by(), phase.closed_by()) {
            for row in &mut rows[span.start..span.end] {
                match phase {
                    RoastPhase::Drying => row.flags.drying = true,
                    RoastPhase::Maillard => row.flags.maillard = true,
                    RoastPhase::Development => row.flags.development = true,
                }
            }
        }
    }

    for (state, open, closers) in ROLLING_STATES {
        if let Some(span) = state_span(timex, milestones, open, closers) {
            for row in &mut rows[span.start..span.end] {
                match state {
                    RollingState::FirstCrack => row.flags.fc_rolling = true,
                    RollingState::SecondCrack => row.flags.sc_rolling = true,
                    RollingState::Cooling => row.flags.cooling = true,
                }
            }
        }
    }

    rows
}

fn build_event_rows(
    timex: &[f64],
    temps: &NormalizedTemperatures,
    milestones: &MilestoneSet,
    events: &[SpecialEvent],
) -> Vec<RoastEventRow> {
    let mut rows: Vec<RoastEventRow> = milestones
        .present()
        .into_iter()
        .map(|(milestone, seconds)| RoastEventRow {
            time_seconds: seconds,
            event_type: milestone.event_code().to_string(),
            label: milestone.label().to_string(),
            category: ROAST_PHASE_CATEGORY.to_string(),
            subcategory: Some(milestone.as_str().to_string()),
            value: first_sample_at_or_after(timex, seconds)
                .and_then(|i| temps.bean_temps.get(i).copied().flatten()),
            user_generated: false,
        })
        .collect();

    rows.extend(events.iter().filter_map(|event| {
        Some(RoastEventRow {
            time_seconds: *timex.get(event.sample_index)?,
            event_type: event.kind.event_code().to_string(),
            label: event
                .label
                .clone()
                .unwrap_or_else(|| format!("{} {}", event.kind.label(), event.value)),
            category: CONTROL_CATEGORY.to_string(),
            subcategory: Some(event.kind.as_str().to_string()),
            value: Some(event.value),
            user_generated: true,
        })
    }));

    rows.sort_by(|a, b| a.time_seconds.total_cmp(&b.time_seconds));
    rows
}

fn build_phase_rows(
    timex: &[f64],
    milestones: &MilestoneSet,
    phases: &PhaseSet,
    malformed: bool,
) -> Vec<RoastPhaseRow> {
    RoastPhase::ALL
        .into_iter()
        .filter_map(|phase| {
            let span = state_span(timex, milestones, phase.opened_by(), phase.closed_by())?;
            let duration_seconds = span.end_seconds - span.start_seconds;
            let percent = if phases.total_time_seconds > 0.0 {
                duration_seconds / phases.total_time_seconds * 100.0
            } else {
                0.0
            };
            let confidence = match (malformed, span.closure) {
                (true, _) => confidence::MALFORMED,
                (false, Closure::Canonical) => confidence::MILESTONE_DERIVED,
                (false, Closure::Fallback | Closure::SeriesEnd) => confidence::FALLBACK,
            };

            Some(RoastPhaseRow {
                phase,
                start_seconds: span.start_seconds,
                end_seconds: span.end_seconds,
                duration_seconds,
                percent,
                confidence,
            })
        })
        .collect()
}

fn build_device_rows(
    channels: &[AuxChannel],
    source: TemperatureUnit,
    target: TemperatureUnit,
) -> Vec<ExtraDeviceRow> {
    channels
        .iter()
        .flat_map(|channel| {
            channel
                .timex
                .iter()
                .zip(&channel.values)
                .map(move |(&time_seconds, raw)| {
                    let (value, unit) = match channel.sensor_type {
                        SensorType::Temperature => (
                            temperature::sanitize(*raw, source)
                                .map(|v| temperature::convert(v, source, target)),
                            target.as_str(),
                        ),
                        SensorType::Fan | SensorType::Heat => (
                            (*raw).filter(|v| v.is_finite() && *v != MISSING_READING_SENTINEL),
                            PERCENT_UNIT,
                        ),
                    };

                    ExtraDeviceRow {
                        device_id: channel.device_id,
                        device_name: channel.device_name.clone(),
                        sensor_type: channel.sensor_type,
                        time_seconds,
                        value,
                        unit: unit.to_string(),
                        quality: if value.is_some() {
                            ReadingQuality::Good
                        } else {
                            ReadingQuality::Missing
                        },
                    }
                })
        })
        .collect()
}

fn build_profile(
    import: &RoastImport,
    temps: &NormalizedTemperatures,
    milestones: &MilestoneSet,
    phases: &PhaseSet,
) -> ProfileSummary {
    let bean_temp_at = |milestone: Milestone| {
        milestones
            .get(milestone)
            .and_then(|t| first_sample_at_or_after(&import.timex, t))
            .and_then(|i| temps.bean_temps.get(i).copied().flatten())
    };

    ProfileSummary {
        title: import.title.clone(),
        roaster_type: import.roaster_type.clone(),
        roaster_size: import.roaster_size,
        temperature_unit: temps.unit,
        weight_in: import.weight.as_ref().map(|w| w.green),
        weight_out: import.weight.as_ref().and_then(|w| w.roasted),
        weight_unit: import.weight.as_ref().map(|w| w.unit.clone()),
        weight_loss_percent: import.weight.as_ref().and_then(|w| w.weight_loss_percent()),
        beans: import.beans.clone(),
        notes: import.notes.clone(),
        roast_date: import.roast_date,
        sample_count: import.sample_count(),
        charge_bean_temp: bean_temp_at(Milestone::Charge),
        drop_bean_temp: bean_temp_at(Milestone::Drop),
        milestone_indices: import.milestones,
        derived: DerivedFields {
            milestones: *milestones,
            phases: *phases,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MilestoneIndices;
    use crate::pipeline::{milestones::resolve, phases::compute_from_series, temperature::normalize};

    fn import_with(timex: Vec<f64>, indices: MilestoneIndices) -> RoastImport {
        let n = timex.len();
        RoastImport {
            title: "Test".to_string(),
            roaster_type: None,
            roaster_size: None,
            unit: TemperatureUnit::Fahrenheit,
            temp1: vec![Some(300.0); n],
            temp2: (0..n).map(|i| Some(150.0 + i as f64 * 10.0)).collect(),
            timex,
            milestones: indices,
            aux_channels: Vec::new(),
            special_events: Vec::new(),
            weight: None,
            beans: None,
            notes: None,
            roast_date: None,
        }
    }

    fn run(import: &RoastImport) -> DecomposedImport {
        let temps = normalize(&import.temp1, &import.temp2, import.unit, import.unit);
        let (milestones, malformed) = match resolve(&import.timex, &import.milestones) {
            Ok(m) => (m, None),
            Err(e) => (e.partial, Some(e)),
        };
        let phases = compute_from_series(&milestones, &import.timex);
        decompose(import, &temps, &milestones, &phases, malformed.as_ref())
    }

    #[test]
    fn test_dry_end_and_drop_only() {
        let timex: Vec<f64> = (0..10).map(|i| i as f64 * 30.0).collect();
        let import = import_with(
            timex,
            MilestoneIndices {
                dry_end: Some(2),
                drop: Some(7),
                ..Default::default()
            },
        );
        let out = run(&import);

        assert_eq!(out.phase_rows.len(), 1);
        let row = &out.phase_rows[0];
        assert_eq!(row.phase, RoastPhase::Maillard);
        assert_eq!(row.start_seconds, 60.0);
        assert_eq!(row.end_seconds, 210.0);
        assert_eq!(row.duration_seconds, 150.0);
        assert_eq!(row.confidence, confidence::FALLBACK);

        for (i, log) in out.log_rows.iter().enumerate() {
            assert_eq!(log.flags.maillard, (2..=6).contains(&i), "row {}", i);
            assert!(!log.flags.drying);
            assert!(!log.flags.development);
            assert_eq!(log.flags.cooling, i >= 7, "row {}", i);
        }
        assert!(out.log_rows[2].flags.dry_end);
        assert!(out.log_rows[7].flags.drop);

        assert_eq!(out.event_rows.len(), 2);
        assert!(out.event_rows.iter().all(|e| !e.user_generated));
        assert!(out.device_rows.is_empty());
    }

    #[test]
    fn test_reference_roast_rows() {
        let import = import_with(
            vec![0.0, 30.0, 60.0, 90.0, 120.0, 150.0, 180.0],
            MilestoneIndices {
                charge: Some(0),
                dry_end: Some(1),
                fc_start: Some(3),
                drop: Some(5),
                cool: Some(6),
                ..Default::default()
            },
        );
        let out = run(&import);

        assert_eq!(out.log_rows.len(), 7);
        assert_eq!(out.event_rows.len(), 5);
        assert_eq!(out.phase_rows.len(), 3);
        let percents: Vec<f64> = out.phase_rows.iter().map(|r| r.percent).collect();
        assert!((percents[0] - 20.0).abs() < 1e-9);
        assert!((percents[1] - 40.0).abs() < 1e-9);
        assert!((percents[2] - 40.0).abs() < 1e-9);
        assert!(out
            .phase_rows
            .iter()
            .all(|r| r.confidence == confidence::MILESTONE_DERIVED));

        let drying: Vec<bool> = out.log_rows.iter().map(|r| r.flags.drying).collect();
        assert_eq!(drying, vec![true, false, false, false, false, false, false]);
        let development: Vec<bool> = out.log_rows.iter().map(|r| r.flags.development).collect();
        assert_eq!(development, vec![false, false, false, true, true, false, false]);
        // no fc_end or sc_start, so first crack rolls until drop
        let fc_rolling: Vec<bool> = out.log_rows.iter().map(|r| r.flags.fc_rolling).collect();
        assert_eq!(fc_rolling, development);

        assert_eq!(out.profile.charge_bean_temp, Some(150.0));
        assert_eq!(out.profile.drop_bean_temp, Some(200.0));
        assert_eq!(out.profile.sample_count, 7);
        assert_eq!(out.event_rows[0].event_type, "CHARGE");
        assert_eq!(out.event_rows[0].category, ROAST_PHASE_CATEGORY);
        assert_eq!(out.event_rows[4].event_type, "COOL");
    }

    #[test]
    fn test_malformed_import_degrades_confidence() {
        let timex: Vec<f64> = (0..12).map(|i| i as f64 * 10.0).collect();
        let import = import_with(
            timex,
            MilestoneIndices {
                charge: Some(0),
                dry_end: Some(6),
                fc_start: Some(4),
                drop: Some(10),
                ..Default::default()
            },
        );
        let out = run(&import);
        assert!(!out.phase_rows.is_empty());
        assert!(out
            .phase_rows
            .iter()
            .all(|r| r.confidence == confidence::MALFORMED));
        // maillard runs backwards and covers no samples
        assert!(out.log_rows.iter().all(|r| !r.flags.maillard));
    }

    #[test]
    fn test_control_settings_carry_forward() {
        let mut import = import_with(
            (0..6).map(|i| i as f64).collect(),
            MilestoneIndices::default(),
        );
        import.special_events = vec![
            SpecialEvent {
                sample_index: 3,
                kind: ControlKind::Burner,
                value: 80.0,
                label: None,
            },
            SpecialEvent {
                sample_index: 1,
                kind: ControlKind::Air,
                value: 30.0,
                label: Some("Fan up".to_string()),
            },
            SpecialEvent {
                sample_index: 4,
                kind: ControlKind::Damper,
                value: 10.0,
                label: None,
            },
        ];
        let out = run(&import);
        let fan: Vec<Option<f64>> = out.log_rows.iter().map(|r| r.fan_setting).collect();
        let heat: Vec<Option<f64>> = out.log_rows.iter().map(|r| r.heat_setting).collect();
        assert_eq!(fan, vec![None, Some(30.0), Some(30.0), Some(30.0), Some(30.0), Some(30.0)]);
        assert_eq!(heat, vec![None, None, None, Some(80.0), Some(80.0), Some(80.0)]);

        assert_eq!(out.event_rows.len(), 3);
        assert!(out.event_rows.iter().all(|e| e.user_generated));
        assert_eq!(out.event_rows[0].label, "Fan up");
        assert_eq!(out.event_rows[1].label, "Burner 80");
        assert_eq!(out.event_rows[2].subcategory.as_deref(), Some("damper"));
        assert!(out.phase_rows.is_empty());
    }

    #[test]
    fn test_device_rows_per_sample() {
        let mut import = import_with(vec![0.0, 1.0, 2.0], MilestoneIndices::default());
        import.aux_channels = vec![
            AuxChannel {
                device_id: 25,
                device_name: "Fan".to_string(),
                sensor_type: SensorType::Fan,
                timex: vec![0.0, 1.0, 2.0],
                values: vec![Some(40.0), Some(-1.0), Some(60.0)],
            },
            AuxChannel {
                device_id: 25,
                device_name: "Exhaust".to_string(),
                sensor_type: SensorType::Temperature,
                timex: vec![0.0, 1.0, 2.0],
                values: vec![Some(212.0), None, Some(2000.0)],
            },
        ];
        let temps = normalize(&import.temp1, &import.temp2, import.unit, TemperatureUnit::Celsius);
        let milestones = MilestoneSet::default();
        let phases = compute_from_series(&milestones, &import.timex);
        let out = decompose(&import, &temps, &milestones, &phases, None);

        assert_eq!(out.device_rows.len(), 6);
        assert_eq!(out.device_rows[0].unit, PERCENT_UNIT);
        assert_eq!(out.device_rows[1].quality, ReadingQuality::Missing);
        assert_eq!(out.device_rows[3].unit, "C");
        assert!((out.device_rows[3].value.unwrap() - 100.0).abs() < 1e-9);
        assert_eq!(out.device_rows[5].value, None);
        assert_eq!(out.missing_device_readings(), 3);
        assert_eq!(out.profile.temperature_unit, TemperatureUnit::Celsius);
    }

    #[test]
    fn test_series_end_closes_open_phase() {
        let import = import_with(
            (0..5).map(|i| i as f64 * 60.0).collect(),
            MilestoneIndices {
                charge: Some(0),
                ..Default::default()
            },
        );
        let out = run(&import);
        assert_eq!(out.phase_rows.len(), 1);
        assert_eq!(out.phase_rows[0].phase, RoastPhase::Drying);
        assert_eq!(out.phase_rows[0].end_seconds, 240.0);
        assert_eq!(out.phase_rows[0].confidence, confidence::FALLBACK);
        assert!(out.log_rows.iter().all(|r| r.flags.drying));
    }
}
