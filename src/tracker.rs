use std::collections::BTreeMap;

use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::assignment::{AssociationStrategy, Associator};
use crate::bbox::{BBox, Ltrb};
use crate::detection::Detection;
use crate::error::{Error, Result};
use crate::kalman::FilterConfig;
use crate::predictor::{PredictorConfig, TrajectoryPrediction, TrajectoryPredictor};
use crate::track::{Track, TrackId};

const FIRST_TRACK_ID: u64 = 1;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Frames a track may go unmatched before eviction
    pub max_age: u32,
    /// Matches required before a track is reported
    pub min_hits: u32,
    pub iou_threshold: f64,
    pub strategy: AssociationStrategy,
    pub filter: FilterConfig,
    pub predictor: PredictorConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_age: 30,
            min_hits: 3,
            iou_threshold: 0.3,
            strategy: AssociationStrategy::Optimal,
            filter: FilterConfig::default(),
            predictor: PredictorConfig::default(),
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(Error::InvalidConfig(format!(
                "iou_threshold {} out of [0, 1]",
                self.iou_threshold
            )));
        }

        if self.min_hits == 0 {
            return Err(Error::InvalidConfig("min_hits must be at least 1".into()));
        }

        self.filter.validate()?;
        self.predictor.validate()
    }
}

/// Externally visible view of a confirmed track.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConfirmedTrack {
    pub id: TrackId,
    pub class_id: i32,
    pub class_name: String,
    pub confidence: f64,
    pub current_bbox: BBox<Ltrb>,
    pub velocity: na::Vector2<f64>,
    pub trajectory: Vec<na::Point2<f64>>,
    pub predictions: TrajectoryPrediction,
}

/// Frame-at-a-time multi-object tracker. Owns the live track set of one
/// session; independent streams need independent instances.
#[derive(Debug, Clone)]
pub struct Tracker {
    config: TrackerConfig,
    tracks: BTreeMap<TrackId, Track>,
    associator: Associator,
    predictor: TrajectoryPredictor,
    next_id: u64,
    frame_count: u64,
}

impl Default for Tracker {
    fn default() -> Self {
        Self::from_valid_config(TrackerConfig::default())
    }
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: TrackerConfig) -> Self {
        Self {
            associator: Associator::new(config.strategy, config.iou_threshold),
            predictor: TrajectoryPredictor::new(config.predictor.clone()),
            tracks: BTreeMap::new(),
            next_id: FIRST_TRACK_ID,
            frame_count: 0,
            config,
        }
    }

    /// Advances the session by one frame and returns the confirmed tracks.
    pub fn advance(&mut self, detections: &[Detection]) -> Vec<ConfirmedTrack> {
        self.frame_count += 1;

        let detections: Vec<&Detection> = detections
            .iter()
            .filter(|det| match det.validate() {
                Ok(()) => true,
                Err(err) => {
                    log::warn!("frame {}: {}, skipped", self.frame_count, err);
                    false
                }
            })
            .collect();

        for track in self.tracks.values_mut() {
            track.predict();
        }

        let ids: Vec<TrackId> = self.tracks.keys().copied().collect();
        let track_boxes: Vec<BBox<Ltrb>> = self
            .tracks
            .values()
            .map(|t| t.last_detection().bbox)
            .collect();
        let det_boxes: Vec<BBox<Ltrb>> = detections.iter().map(|d| d.bbox).collect();

        let assignment = self.associator.associate(&det_boxes, &track_boxes);

        log::trace!(
            "frame {}: {} detections, {} tracks, {} matched",
            self.frame_count,
            det_boxes.len(),
            ids.len(),
            assignment.matches.len()
        );

        for &(d, t, _) in &assignment.matches {
            if let Some(track) = self.tracks.get_mut(&ids[t]) {
                if let Err(err) = track.update(detections[d].clone()) {
                    log::warn!("frame {}: {}, keeping predicted state", self.frame_count, err);
                }
            }
        }

        for &d in &assignment.unmatched_detections {
            self.spawn(detections[d].clone());
        }

        for &t in &assignment.unmatched_tracks {
            if let Some(track) = self.tracks.get_mut(&ids[t]) {
                track.mark_missed();
            }
        }

        let max_age = self.config.max_age;
        self.tracks.retain(|id, track| {
            let alive = track.time_since_update <= max_age;
            if !alive {
                log::debug!("track {} evicted after {} missed frames", id, track.time_since_update);
            }

            alive
        });

        let min_hits = self.config.min_hits;
        for track in self.tracks.values_mut() {
            if track.latch_confirmed(min_hits) {
                log::debug!("track {} confirmed", track.id);
            }
        }

        self.confirmed()
    }

    fn spawn(&mut self, det: Detection) {
        let id = TrackId(self.next_id);
        self.next_id += 1;

        log::debug!("track {} created at {:?}", id, det.center());

        self.tracks.insert(id, Track::new(id, det, &self.config.filter));
    }

    /// Confirmed tracks of the last frame, without advancing.
    pub fn confirmed(&self) -> Vec<ConfirmedTrack> {
        self.tracks
            .values()
            .filter(|t| t.is_confirmed(self.config.min_hits))
            .map(|t| {
                let last = t.last_detection();

                ConfirmedTrack {
                    id: t.id,
                    class_id: last.class_id,
                    class_name: last.class_name.clone(),
                    confidence: t.confidence(),
                    current_bbox: last.bbox,
                    velocity: t.velocity(),
                    trajectory: t.trajectory().to_vec(),
                    predictions: self.predictor.predict_track(t),
                }
            })
            .collect()
    }

    /// Drops every track and restarts ids. A solver fallback stays in effect.
    pub fn reset(&mut self) {
        log::debug!("tracker reset, dropping {} tracks", self.tracks.len());

        self.tracks.clear();
        self.next_id = FIRST_TRACK_ID;
        self.frame_count = 0;
    }

    /// All live tracks, whatever their state.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    #[inline]
    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    pub fn is_degraded(&self) -> bool {
        self.associator.is_degraded()
    }

    #[inline]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}

impl crate::Tracking for Tracker {
    #[inline]
    fn advance(&mut self, detections: &[Detection]) -> Vec<ConfirmedTrack> {
        Tracker::advance(self, detections)
    }

    #[inline]
    fn reset(&mut self) {
        Tracker::reset(self)
    }

    #[inline]
    fn live_tracks(&self) -> usize {
        self.len()
    }
}
