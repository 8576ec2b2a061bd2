use std::time::Duration;

use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::detection::Detection;
use crate::rolling_avg::RollingAvg;

const ROLLING_WINDOW: usize = 30;

/// Counters for one processed frame.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FrameMetrics {
    pub frame_index: u64,
    /// Confirmed tracks reported this frame
    pub object_count: usize,
    pub total_detections: usize,
    pub avg_confidence: f64,
    /// Live tracks of any state
    pub track_count: usize,
}

impl FrameMetrics {
    pub fn new(
        frame_index: u64,
        detections: &[Detection],
        object_count: usize,
        track_count: usize,
    ) -> Self {
        let avg_confidence = if detections.is_empty() {
            0.0
        } else {
            detections.iter().map(|d| d.confidence).sum::<f64>() / detections.len() as f64
        };

        Self {
            frame_index,
            object_count,
            total_detections: detections.len(),
            avg_confidence,
            track_count,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PerformanceSummary {
    pub fps: f64,
    pub avg_processing_ms: f64,
    pub avg_detections: f64,
    pub avg_ade: f64,
    pub avg_fde: f64,
}

/// Average and final displacement error between a predicted path and the
/// realized one, over their common prefix.
pub fn displacement_errors(
    predicted: &[na::Point2<f64>],
    actual: &[na::Point2<f64>],
) -> Option<(f64, f64)> {
    let n = predicted.len().min(actual.len());
    if n == 0 {
        return None;
    }

    let dists: Vec<f64> = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| na::distance(p, a))
        .collect();

    let ade = dists.iter().sum::<f64>() / n as f64;
    let fde = dists[n - 1];

    Some((ade, fde))
}

#[derive(Debug, Clone)]
pub struct PerformanceMetrics {
    processing: RollingAvg,
    detections: RollingAvg,
    ade: Vec<f64>,
    fde: Vec<f64>,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self {
            processing: RollingAvg::new(ROLLING_WINDOW),
            detections: RollingAvg::new(ROLLING_WINDOW),
            ade: Vec::new(),
            fde: Vec::new(),
        }
    }

    pub fn record_frame(&mut self, elapsed: Duration, detections: usize) {
        self.processing.push(elapsed.as_secs_f64());
        self.detections.push(detections as f64);
    }

    /// Scores a prediction against the path that was actually taken.
    pub fn record_prediction(
        &mut self,
        predicted: &[na::Point2<f64>],
        actual: &[na::Point2<f64>],
    ) {
        if let Some((ade, fde)) = displacement_errors(predicted, actual) {
            self.ade.push(ade);
            self.fde.push(fde);
        }
    }

    /// Number of predictions scored so far.
    #[inline]
    pub fn scored_predictions(&self) -> usize {
        self.ade.len()
    }

    pub fn clear(&mut self) {
        self.processing.clear();
        self.detections.clear();
        self.ade.clear();
        self.fde.clear();
    }

    pub fn summary(&self) -> PerformanceSummary {
        let mean = |v: &[f64]| {
            if v.is_empty() {
                0.0
            } else {
                v.iter().sum::<f64>() / v.len() as f64
            }
        };

        let avg_secs = self.processing.mean().unwrap_or(0.0);

        PerformanceSummary {
            fps: if avg_secs > 0.0 { 1.0 / avg_secs } else { 0.0 },
            avg_processing_ms: avg_secs * 1000.0,
            avg_detections: self.detections.mean().unwrap_or(0.0),
            avg_ade: mean(&self.ade),
            avg_fde: mean(&self.fde),
        }
    }
}
