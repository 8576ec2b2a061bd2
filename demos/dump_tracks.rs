//! Replays a detections dump through the tracker and prints the confirmed
//! tracks of every frame as one JSON line.
//!
//! Input lines look like `<frame>:<json array of detections>`, e.g.
//! `0:[{"bbox":[100,100,140,140],"p":0.9,"c":2,"n":"car"}]`.

use std::io::BufRead;

use anyhow::{bail, Context};
use qtrack_mot::{Detection, Engine, ScriptedDetector, Tracker, TrackerConfig};

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let in_file_name = match args.next() {
        Some(name) => name,
        None => bail!("expected detections file name"),
    };

    let config = match args.next() {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {}", path))?;
            serde_json::from_str::<TrackerConfig>(&raw)?
        }
        None => TrackerConfig::default(),
    };

    let dets_file = std::fs::File::open(&in_file_name)
        .with_context(|| format!("opening {}", in_file_name))?;

    let mut script = ScriptedDetector::new(in_file_name.clone());
    let mut last_frame = 0;

    for (line_no, line) in std::io::BufReader::new(dets_file).lines().enumerate() {
        let line = line?;

        let (frame, vector) = match line.split_once(':') {
            Some(x) => x,
            None => {
                log::warn!("line {}: wrong file format, expected `:`", line_no + 1);
                continue;
            }
        };

        match (frame.trim().parse::<u64>(), serde_json::from_str::<Vec<Detection>>(vector)) {
            (Ok(frame), Ok(dets)) => {
                last_frame = last_frame.max(frame);
                script.insert(frame, dets);
            }
            (Err(err), _) => log::warn!("line {}: bad frame index: {}", line_no + 1, err),
            (_, Err(err)) => log::warn!("line {}: bad detections: {}", line_no + 1, err),
        }
    }

    let mut engine = Engine::new(script, Tracker::new(config)?);

    for frame in 0..=last_frame {
        let out = engine.process(&frame)?;
        println!("{}", serde_json::to_string(&out)?);
    }

    let summary = engine.performance().summary();
    log::info!(
        "{} frames, {:.1} fps, {:.2} detections per frame, ade {:.2} fde {:.2} over {} paths",
        engine.frame_index(),
        summary.fps,
        summary.avg_detections,
        summary.avg_ade,
        summary.avg_fde,
        engine.performance().scored_predictions()
    );

    Ok(())
}
