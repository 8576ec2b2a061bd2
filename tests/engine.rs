use qtrack_mot::{
    BBox, Detection, Engine, PredictorConfig, ScriptedDetector, TrackId, Tracker, TrackerConfig,
};

fn person(x: f64, conf: f64) -> Detection {
    Detection::new(BBox::ltrb(x, 50.0, x + 20.0, 110.0), conf, 0, "person").unwrap()
}

fn walking_script(frames: usize) -> ScriptedDetector {
    ScriptedDetector::from_frames(
        "replay",
        (0..frames).map(|i| {
            let x = 10.0 + i as f64 * 2.0;
            vec![person(x, 0.8), person(x + 200.0, 0.6)]
        }),
    )
}

#[test]
fn engine_reports_tracks_and_metrics() {
    let mut engine = Engine::new(walking_script(5), Tracker::default());

    let mut last = None;
    for frame in 0..5u64 {
        last = Some(engine.process(&frame).unwrap());
    }

    let out = last.unwrap();
    assert_eq!(out.metrics.frame_index, 4);
    assert_eq!(out.metrics.total_detections, 2);
    assert_eq!(out.metrics.track_count, 2);
    assert_eq!(out.metrics.object_count, 2);
    assert!((out.metrics.avg_confidence - 0.7).abs() < 1e-12);

    let ids: Vec<_> = out.tracks.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![TrackId(1), TrackId(2)]);
    assert!(out.tracks.iter().all(|t| t.trajectory.len() == 5));

    let summary = engine.performance().summary();
    assert!((summary.avg_detections - 2.0).abs() < 1e-12);
}

#[test]
fn engine_output_serializes_for_transport() {
    let mut engine = Engine::new(walking_script(3), Tracker::default());
    let mut out = None;
    for frame in 0..3u64 {
        out = Some(engine.process(&frame).unwrap());
    }

    let json = serde_json::to_value(out.unwrap()).unwrap();
    let track = &json["tracks"][0];

    assert_eq!(track["id"], 1);
    assert_eq!(track["class_name"], "person");
    assert_eq!(track["trajectory"].as_array().unwrap().len(), 3);
    assert_eq!(track["predictions"]["weights"].as_array().unwrap().len(), 3);
}

#[test]
fn engine_reset_starts_a_new_session() {
    let mut engine = Engine::new(walking_script(4), Tracker::default());
    for frame in 0..4u64 {
        engine.process(&frame).unwrap();
    }

    engine.reset();
    assert_eq!(engine.frame_index(), 0);
    assert!(engine.tracker().is_empty());

    let out = engine.process(&0).unwrap();
    assert_eq!(out.metrics.frame_index, 0);
    assert!(engine.tracker().get(TrackId(1)).is_some());
}

fn short_horizon_tracker() -> Tracker {
    Tracker::new(TrackerConfig {
        predictor: PredictorConfig {
            horizon: 5,
            ..PredictorConfig::default()
        },
        ..TrackerConfig::default()
    })
    .unwrap()
}

#[test]
fn engine_scores_predictions_against_realized_paths() {
    let mut engine = Engine::new(walking_script(12), short_horizon_tracker());

    for frame in 0..3u64 {
        engine.process(&frame).unwrap();
    }
    assert_eq!(engine.performance().scored_predictions(), 0);

    for frame in 3..12u64 {
        engine.process(&frame).unwrap();
    }

    let scored = engine.performance().scored_predictions();
    assert!(scored >= 2);

    let summary = engine.performance().summary();
    assert!(summary.avg_ade.is_finite());
    assert!(summary.avg_ade < 10.0);
    assert!(summary.avg_fde < 20.0);

    engine.reset();
    assert_eq!(engine.performance().scored_predictions(), 0);
}

#[test]
fn vanished_track_scores_the_part_it_walked() {
    let mut script = ScriptedDetector::new("replay");
    for frame in 0..5u64 {
        let x = 10.0 + frame as f64 * 2.0;
        script.insert(frame, vec![person(x, 0.8)]);
    }
    for frame in 5..8u64 {
        script.insert(frame, Vec::new());
    }

    let mut engine = Engine::new(script, short_horizon_tracker());
    for frame in 0..5u64 {
        engine.process(&frame).unwrap();
    }
    assert_eq!(engine.performance().scored_predictions(), 0);

    engine.process(&5).unwrap();
    assert_eq!(engine.performance().scored_predictions(), 1);
    assert!(engine.performance().summary().avg_fde.is_finite());
}
