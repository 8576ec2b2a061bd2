use std::collections::BTreeMap;
use std::time::Instant;

use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::detector::Detector;
use crate::error::Result;
use crate::metrics::{FrameMetrics, PerformanceMetrics};
use crate::track::TrackId;
use crate::tracker::{ConfirmedTrack, Tracker};
use crate::Tracking;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FrameOutput {
    pub metrics: FrameMetrics,
    pub tracks: Vec<ConfirmedTrack>,
}

/// Primary path issued for a track, waiting for the realized one.
struct PendingPrediction {
    path: Vec<na::Point2<f64>>,
    /// Trajectory length when the path was issued
    issued_at: usize,
    realized: Vec<na::Point2<f64>>,
}

/// Drives one session: detector, tracker and metrics for a single stream.
///
/// The primary predicted path of every confirmed track is held until the track
/// has walked as many points as were predicted, or is no longer reported, and
/// then scored into the ADE/FDE metrics.
pub struct Engine<D: Detector, T: Tracking = Tracker> {
    detector: D,
    tracker: T,
    performance: PerformanceMetrics,
    pending: BTreeMap<TrackId, PendingPrediction>,
    frame_index: u64,
}

impl<D: Detector, T: Tracking> Engine<D, T> {
    pub fn new(detector: D, tracker: T) -> Self {
        Self {
            detector,
            tracker,
            performance: PerformanceMetrics::new(),
            pending: BTreeMap::new(),
            frame_index: 0,
        }
    }

    /// Detects and tracks one frame. A detector failure is returned as is and
    /// leaves the tracker state untouched.
    pub fn process(&mut self, input: &D::Input) -> Result<FrameOutput> {
        let started = Instant::now();

        let detections = self.detector.detect(input)?;
        let tracks = self.tracker.advance(&detections);

        let metrics = FrameMetrics::new(
            self.frame_index,
            &detections,
            tracks.len(),
            self.tracker.live_tracks(),
        );

        self.score_predictions(&tracks);
        self.performance.record_frame(started.elapsed(), detections.len());
        self.frame_index += 1;

        Ok(FrameOutput { metrics, tracks })
    }

    fn score_predictions(&mut self, tracks: &[ConfirmedTrack]) {
        let reported: BTreeMap<TrackId, &ConfirmedTrack> =
            tracks.iter().map(|t| (t.id, t)).collect();

        let performance = &mut self.performance;
        self.pending.retain(|id, pending| match reported.get(id) {
            Some(track) => {
                pending.realized = track
                    .trajectory
                    .get(pending.issued_at..)
                    .unwrap_or_default()
                    .to_vec();

                if pending.realized.len() < pending.path.len() {
                    return true;
                }

                performance.record_prediction(&pending.path, &pending.realized);
                false
            }
            None => {
                performance.record_prediction(&pending.path, &pending.realized);
                false
            }
        });

        for track in tracks {
            if self.pending.contains_key(&track.id) {
                continue;
            }

            if let Some(path) = track.predictions.primary() {
                self.pending.insert(
                    track.id,
                    PendingPrediction {
                        path: path.to_vec(),
                        issued_at: track.trajectory.len(),
                        realized: Vec::new(),
                    },
                );
            }
        }
    }

    pub fn reset(&mut self) {
        self.tracker.reset();
        self.performance.clear();
        self.pending.clear();
        self.frame_index = 0;
    }

    #[inline]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    #[inline]
    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    #[inline]
    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance
    }
}
