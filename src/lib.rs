pub mod assignment;
pub mod bbox;
pub mod detection;
pub mod detector;
pub mod engine;
pub mod error;
pub mod kalman;
pub mod math;
pub mod metrics;
pub mod predictor;
pub mod rolling_avg;
pub mod track;
pub mod tracker;

mod circular_queue;

pub use assignment::AssociationStrategy;
pub use bbox::BBox;
pub use detection::Detection;
pub use detector::{Detector, ScriptedDetector};
pub use engine::{Engine, FrameOutput};
pub use error::{Error, Result};
pub use predictor::{PredictorConfig, TrajectoryPrediction};
pub use track::{Track, TrackId, TrackState};
pub use tracker::{ConfirmedTrack, Tracker, TrackerConfig};

/// Per-frame tracking interface driven by the surrounding video loop.
pub trait Tracking {
    fn advance(&mut self, detections: &[Detection]) -> Vec<ConfirmedTrack>;
    fn reset(&mut self);
    fn live_tracks(&self) -> usize;
}
