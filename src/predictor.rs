use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::math::{finite_difference, mode_angle, rotate_around};
use crate::track::Track;

const MIN_HISTORY: usize = 3;
const PRIMARY_PRIOR: f64 = 0.6;
const FIRST_ALT_PRIOR: f64 = 0.25;
const ALT_PRIOR_DECAY: f64 = 0.6;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PredictorConfig {
    /// Future frames per path
    pub horizon: usize,
    pub num_modes: usize,
    /// Heading offset between neighbouring modes, degrees
    pub angle_step_deg: f64,
    /// Points used by the finite-difference velocity fallback
    pub history_window: usize,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            horizon: 30,
            num_modes: 3,
            angle_step_deg: 15.0,
            history_window: 10,
        }
    }
}

impl PredictorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(Error::InvalidConfig("horizon must be at least 1".into()));
        }

        if self.num_modes == 0 {
            return Err(Error::InvalidConfig("num_modes must be at least 1".into()));
        }

        if self.history_window < 2 {
            return Err(Error::InvalidConfig(
                "history_window must be at least 2".into(),
            ));
        }

        if !self.angle_step_deg.is_finite() {
            return Err(Error::InvalidConfig("angle_step_deg must be finite".into()));
        }

        Ok(())
    }
}

/// Candidate future paths of one track with a weight per path; weights sum to 1.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct TrajectoryPrediction {
    pub paths: Vec<Vec<na::Point2<f64>>>,
    pub weights: Vec<f64>,
}

impl TrajectoryPrediction {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// The straight-line extrapolation, when present.
    #[inline]
    pub fn primary(&self) -> Option<&[na::Point2<f64>]> {
        self.paths.first().map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[na::Point2<f64>], f64)> {
        self.paths
            .iter()
            .map(Vec::as_slice)
            .zip(self.weights.iter().copied())
    }
}

/// Prior weight per mode: the straight path first, then geometrically
/// decaying weights for the heading perturbations, normalized to 1.
pub fn mode_weights(num_modes: usize) -> Vec<f64> {
    let priors: Vec<f64> = (0..num_modes)
        .map(|k| match k {
            0 => PRIMARY_PRIOR,
            k => FIRST_ALT_PRIOR * ALT_PRIOR_DECAY.powi(k as i32 - 1),
        })
        .collect();

    let sum: f64 = priors.iter().sum();

    priors.into_iter().map(|p| p / sum).collect()
}

#[derive(Debug, Clone)]
pub struct TrajectoryPredictor {
    config: PredictorConfig,
    weights: Vec<f64>,
}

impl Default for TrajectoryPredictor {
    fn default() -> Self {
        Self::new(PredictorConfig::default())
    }
}

impl TrajectoryPredictor {
    pub fn new(config: PredictorConfig) -> Self {
        let weights = mode_weights(config.num_modes);

        Self { config, weights }
    }

    #[inline]
    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn predict_track(&self, track: &Track) -> TrajectoryPrediction {
        self.predict(track.trajectory(), Some(track.velocity()))
    }

    /// Extrapolates from the last realized point. `velocity` is per frame;
    /// without it (or if it is not finite) the velocity is estimated from the
    /// recent trajectory.
    pub fn predict(
        &self,
        trajectory: &[na::Point2<f64>],
        velocity: Option<na::Vector2<f64>>,
    ) -> TrajectoryPrediction {
        if trajectory.len() < MIN_HISTORY {
            return TrajectoryPrediction::default();
        }

        let velocity = velocity
            .filter(|v| v.iter().all(|c| c.is_finite()))
            .or_else(|| finite_difference(trajectory, self.config.history_window))
            .unwrap_or_else(na::Vector2::zeros);

        let origin = trajectory[trajectory.len() - 1];
        let primary: Vec<_> = (1..=self.config.horizon)
            .map(|t| origin + velocity * t as f64)
            .collect();

        let mut paths = Vec::with_capacity(self.config.num_modes);

        for k in 1..self.config.num_modes {
            let angle = mode_angle(k, self.config.angle_step_deg).unwrap_or(0.0);

            paths.push(
                primary
                    .iter()
                    .map(|&p| rotate_around(p, origin, angle))
                    .collect(),
            );
        }

        paths.insert(0, primary);

        TrajectoryPrediction {
            paths,
            weights: self.weights.clone(),
        }
    }
}
