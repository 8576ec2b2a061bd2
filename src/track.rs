use std::fmt;

use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::detection::Detection;
use crate::error::{Error, Result};
use crate::kalman::{FilterConfig, MotionFilter};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Tentative,
    Confirmed,
    Coasting,
    Deleted,
}

#[derive(Debug, Clone)]
pub struct Track {
    pub id: TrackId,
    pub age: u32,
    pub hits: u32,
    pub time_since_update: u32,
    filter: MotionFilter,
    detections: Vec<Detection>,
    trajectory: Vec<na::Point2<f64>>,
    confirmed_once: bool,
}

impl Track {
    pub fn new(id: TrackId, det: Detection, config: &FilterConfig) -> Self {
        let center = det.center();

        Self {
            id,
            age: 0,
            hits: 1,
            time_since_update: 0,
            filter: MotionFilter::new(center, config),
            detections: vec![det],
            trajectory: vec![center],
            confirmed_once: false,
        }
    }

    #[inline]
    pub fn predict(&mut self) -> na::Point2<f64> {
        self.filter.predict()
    }

    /// Records a matched detection. The history is extended even when the
    /// filter correction fails, in which case the predicted state is kept and
    /// the error is returned for the caller to report.
    pub fn update(&mut self, det: Detection) -> Result<()> {
        let center = det.center();

        self.detections.push(det);
        self.trajectory.push(center);
        self.hits += 1;
        self.time_since_update = 0;
        self.age += 1;

        let id = self.id;
        self.filter.update(center).map(|_| ()).map_err(|err| match err {
            Error::SingularCovariance { .. } => Error::SingularCovariance { track: Some(id) },
            other => other,
        })
    }

    pub fn mark_missed(&mut self) {
        self.time_since_update += 1;
        self.age += 1;
    }

    pub fn state(&self, min_hits: u32, max_age: u32) -> TrackState {
        if self.time_since_update > max_age {
            TrackState::Deleted
        } else if self.hits >= min_hits && self.time_since_update == 0 {
            TrackState::Confirmed
        } else if self.confirmed_once && self.time_since_update > 0 {
            TrackState::Coasting
        } else {
            TrackState::Tentative
        }
    }

    #[inline]
    pub fn is_confirmed(&self, min_hits: u32) -> bool {
        self.hits >= min_hits && self.time_since_update == 0
    }

    /// Latches the first confirmation, returns `true` on that transition.
    pub(crate) fn latch_confirmed(&mut self, min_hits: u32) -> bool {
        if !self.confirmed_once && self.is_confirmed(min_hits) {
            self.confirmed_once = true;
            return true;
        }

        false
    }

    #[inline]
    pub fn last_detection(&self) -> &Detection {
        // never empty: seeded with the creating detection
        &self.detections[self.detections.len() - 1]
    }

    #[inline]
    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    #[inline]
    pub fn trajectory(&self) -> &[na::Point2<f64>] {
        &self.trajectory
    }

    #[inline]
    pub fn filter(&self) -> &MotionFilter {
        &self.filter
    }

    #[inline]
    pub fn velocity(&self) -> na::Vector2<f64> {
        self.filter.velocity()
    }

    /// Mean confidence over the matched history.
    pub fn confidence(&self) -> f64 {
        let sum: f64 = self.detections.iter().map(|d| d.confidence).sum();

        sum / self.detections.len() as f64
    }
}
