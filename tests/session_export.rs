//! End-to-end: drive a seeded session, export it, read it back.

use std::time::{Duration, Instant};

use ev_battery_twin::controller::{
    SessionConfig, SessionController, StopOutcome, StopReason, Thresholds,
};
use ev_battery_twin::export::CsvExporter;
use ev_battery_twin::report::{load_session_csv, ReportSummary};
use ev_battery_twin::simulation::{BatteryParams, CommandHandle};

fn controller(dir: &std::path::Path, commands: &CommandHandle) -> SessionController {
    SessionController::new(
        SessionConfig {
            random_seed: Some(2024),
            ..Default::default()
        },
        BatteryParams::default(),
        Thresholds::default(),
        commands.clone(),
        Box::new(CsvExporter::new(dir)),
    )
}

#[test]
fn test_drive_brake_session_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let commands = CommandHandle::default();
    let mut ctl = controller(dir.path(), &commands);

    let t0 = Instant::now();
    ctl.start(t0).unwrap();

    let mut now = t0;
    for i in 1..=625u64 {
        match i {
            1 => {
                commands.update(|c| c.throttle = 80.0);
            }
            400 => {
                commands.update(|c| {
                    c.throttle = 0.0;
                    c.is_braking = true;
                    c.regen_level = 100.0;
                });
            }
            _ => {}
        }
        now = t0 + Duration::from_millis(i * 16);
        ctl.tick(now);
    }

    let live = ctl.log().samples().to_vec();
    let outcome = ctl.stop(StopReason::Requested, now);
    let StopOutcome::Exported { path, samples } = outcome else {
        panic!("expected an export, got {outcome:?}");
    };
    assert_eq!(samples, live.len());

    let parsed = load_session_csv(&path).unwrap();
    assert_eq!(parsed.len(), live.len());
    for (read, written) in parsed.iter().zip(&live) {
        assert!((read.time_s - written.time_s).abs() <= 5e-4);
        assert!((read.current_a - written.current_a).abs() <= 5e-4);
        assert!((read.soc_actual - written.soc_actual).abs() <= 5e-5);
    }

    let summary = ReportSummary::from_samples(&parsed).unwrap();
    // Driving draws current, braking at speed pushes it back up.
    assert!(summary.current_a.min < -100.0);
    assert!(parsed.last().unwrap().current_a > summary.current_a.min);
    assert!(summary.final_soc < 80.0);
    assert!(summary.final_soh <= 100.0);
    assert!(summary.mean_soc_error.abs() <= 1.5);
    assert_eq!(summary.soh_axis.1, 100.1);
    assert!(summary.soh_axis.0 >= 99.0);
}

#[test]
fn test_charged_and_discharged_totals_never_decrease() {
    let dir = tempfile::tempdir().unwrap();
    let commands = CommandHandle::default();
    let mut ctl = controller(dir.path(), &commands);

    let t0 = Instant::now();
    ctl.start(t0).unwrap();

    let mut last = *ctl.state();
    for i in 1..=500u64 {
        if i % 100 == 0 {
            commands.update(|c| {
                c.is_braking = !c.is_braking;
                c.throttle = if c.is_braking { 0.0 } else { 70.0 };
            });
        }
        ctl.tick(t0 + Duration::from_millis(i * 16));
        let state = *ctl.state();
        assert!(state.charged_ah >= last.charged_ah);
        assert!(state.discharged_ah >= last.discharged_ah);
        assert!(state.soh <= last.soh);
        last = state;
    }
}
