//! End-to-end load → resample → sync flow through the public API

use chrono::Duration;
use pretty_assertions::assert_eq;

use imu_sync::config::PipelineConfig;
use imu_sync::schema::parse_timestamp;
use imu_sync::{
    ingest, load_recording, resample, AnchorState, RecomputeOutcome, RecordingSession, SampleRow,
    SampleSource, SyncModel, Vector3,
};

const START: &str = "2025/12/05 22:20:06.510";

fn source(name: &str, offsets_ms: &[i64]) -> SampleSource {
    let base = parse_timestamp(START).unwrap();
    let rows = offsets_ms
        .iter()
        .map(|&ms| {
            SampleRow::new(
                base + Duration::milliseconds(ms),
                Vector3::new(0.0, 0.0, 1.0),
                Vector3::new(ms as f64, -(ms as f64), 0.5),
            )
        })
        .collect();
    SampleSource::new(name, rows)
}

#[test]
fn three_sample_recording_at_50hz() {
    let recording =
        load_recording(&[source("swing.csv", &[0, 500, 1000])], &PipelineConfig::default())
            .unwrap();
    let series = &recording.series;

    assert_eq!(series.len(), 51);
    assert_eq!(series.raw_count(), 3);
    assert_eq!(series.expected_count(), 51);
    assert!((series.missing_ratio() - 48.0 / 51.0).abs() < 1e-12);
    for point in series.points() {
        assert_eq!(point.accel, Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(point.accel_mag, 1.0);
    }
    assert_eq!(recording.stats.duration_hms(), "00:00:01");
}

#[test]
fn duplicate_timestamps_collapse_across_sources() {
    let sources = [source("a.csv", &[0, 10, 20]), source("b.csv", &[20, 30])];
    let series = ingest(&sources).unwrap();
    assert_eq!(series.len(), 4);
}

#[test]
fn irregular_input_lands_on_a_regular_grid() {
    let series = ingest(&[source("a.csv", &[0, 13, 37, 40, 95])]).unwrap();
    let grid = resample(&series, 50);

    let offsets: Vec<f64> = grid.points().iter().map(|p| p.offset_ms).collect();
    assert_eq!(offsets, vec![0.0, 20.0, 40.0, 60.0, 80.0]);

    for point in grid.points() {
        assert!(point.accel.is_finite() && point.gyro.is_finite());
        assert!(point.accel_mag.is_finite() && point.gyro_mag.is_finite());
    }

    // 40 ms is a raw instant
    assert_eq!(grid.points()[2].gyro, Vector3::new(40.0, -40.0, 0.5));
    // gyro.x tracks time linearly, so interpolation reproduces it
    assert!((grid.points()[1].gyro.x - 20.0).abs() < 1e-9);
    assert!((grid.points()[4].gyro.x - 80.0).abs() < 1e-9);

    // input untouched
    assert_eq!(series.len(), 5);
}

#[test]
fn blank_cell_is_bridged_by_interpolation() {
    let mut ble = source("ble.csv", &[0, 20, 40, 60, 80]);
    ble.rows[2].gyro_x = None;

    let recording = load_recording(&[ble], &PipelineConfig::default()).unwrap();
    let series = &recording.series;

    assert!(recording.skipped.is_empty());
    assert_eq!(series.raw_count(), 4);
    assert_eq!(series.len(), 5);
    assert!((series.points()[2].gyro.x - 40.0).abs() < 1e-9);
}

#[test]
fn session_keeps_cursors_aligned() {
    let recording =
        load_recording(&[source("a.csv", &[0, 1000, 2000])], &PipelineConfig::default()).unwrap();
    let mut session = RecordingSession::new(recording);

    assert_eq!(session.anchor_start(0.0, 1000.0), RecomputeOutcome::Updated);
    assert_eq!(session.anchor_end(2000.0, 5000.0), RecomputeOutcome::Updated);
    assert_eq!(session.sync().state(), AnchorState::DualAnchor);
    assert_eq!(session.sync().scale(), 2.0);
    assert_eq!(session.foreign_position(1000.0), 3000.0);

    let point = session.point_at_foreign(3000.0).unwrap().unwrap();
    assert_eq!(point.offset_ms, 1000.0);
}

#[test]
fn coincident_anchor_times_leave_mapping_unchanged() {
    let mut model = SyncModel::new();
    model.set_start_anchor(10.0, 10.0);
    let before = model.params();

    assert_eq!(
        model.set_end_anchor(10.0, 50.0),
        RecomputeOutcome::CoincidentAnchors
    );
    assert_eq!(model.params(), before);
    assert_eq!(model.scale(), 1.0);
    assert_eq!(model.offset_ms(), 0.0);
}

#[test]
fn saved_model_round_trips_through_json() {
    let mut model = SyncModel::new();
    model.set_start_anchor(100.0, 1100.0);
    model.set_end_anchor(1100.0, 3100.0);

    let restored: SyncModel = serde_json::from_str(&serde_json::to_string(&model).unwrap()).unwrap();
    assert_eq!(restored, model);
    assert_eq!(restored.to_local(3100.0).unwrap(), 1100.0);
}
