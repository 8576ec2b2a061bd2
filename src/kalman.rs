//! Constant-acceleration Kalman filter over the image plane.
//!
//! State vector is `[x, y, vx, vy, ax, ay]`, one frame is one unit of time.
//! Only the position `(x, y)` is measured.

use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Diagonal scale factors for Q, R and the initial P.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FilterConfig {
    pub process_noise: f64,
    pub measurement_noise: f64,
    pub initial_covariance: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            process_noise: 0.1,
            measurement_noise: 1.0,
            initial_covariance: 100.0,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<()> {
        let scales = [
            ("process_noise", self.process_noise),
            ("measurement_noise", self.measurement_noise),
            ("initial_covariance", self.initial_covariance),
        ];

        for (name, value) in scales {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionState {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub ax: f64,
    pub ay: f64,
}

impl From<&na::Vector6<f64>> for MotionState {
    fn from(v: &na::Vector6<f64>) -> Self {
        Self {
            x: v[0],
            y: v[1],
            vx: v[2],
            vy: v[3],
            ax: v[4],
            ay: v[5],
        }
    }
}

#[derive(Debug, Clone)]
pub struct MotionFilter {
    x: na::Vector6<f64>,
    p: na::Matrix6<f64>,
    f: na::Matrix6<f64>,
    h: na::Matrix2x6<f64>,
    q: na::Matrix6<f64>,
    r: na::Matrix2<f64>,
}

impl MotionFilter {
    /// Starts at `pos` with zero velocity and acceleration.
    pub fn new(pos: na::Point2<f64>, config: &FilterConfig) -> Self {
        let dt = 1.0;
        let half_dt2 = 0.5 * dt * dt;

        #[rustfmt::skip]
        let f = na::Matrix6::new(
            1.0, 0.0, dt,  0.0, half_dt2, 0.0,
            0.0, 1.0, 0.0, dt,  0.0,      half_dt2,
            0.0, 0.0, 1.0, 0.0, dt,       0.0,
            0.0, 0.0, 0.0, 1.0, 0.0,      dt,
            0.0, 0.0, 0.0, 0.0, 1.0,      0.0,
            0.0, 0.0, 0.0, 0.0, 0.0,      1.0,
        );

        #[rustfmt::skip]
        let h = na::Matrix2x6::new(
            1.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0, 0.0, 0.0,
        );

        Self {
            x: na::Vector6::new(pos.x, pos.y, 0.0, 0.0, 0.0, 0.0),
            p: na::Matrix6::identity() * config.initial_covariance,
            f,
            h,
            q: na::Matrix6::identity() * config.process_noise,
            r: na::Matrix2::identity() * config.measurement_noise,
        }
    }

    pub fn predict(&mut self) -> na::Point2<f64> {
        self.x = self.f * self.x;
        self.p = self.f * self.p * self.f.transpose() + self.q;

        self.position()
    }

    /// Corrects the state against a measured position. On a singular innovation
    /// covariance the state is left untouched.
    pub fn update(&mut self, z: na::Point2<f64>) -> Result<na::Point2<f64>> {
        let y = z.coords - self.h * self.x;
        let ht = self.h.transpose();
        let s = self.h * self.p * ht + self.r;

        let s_inv = s
            .try_inverse()
            .ok_or(Error::SingularCovariance { track: None })?;

        let k = self.p * ht * s_inv;
        let x = self.x + k * y;
        let p = (na::Matrix6::identity() - k * self.h) * self.p;

        if !(x.iter().all(|v| v.is_finite()) && p.iter().all(|v| v.is_finite())) {
            return Err(Error::SingularCovariance { track: None });
        }

        self.x = x;
        self.p = p;

        Ok(self.position())
    }

    #[inline]
    pub fn position(&self) -> na::Point2<f64> {
        na::Point2::new(self.x[0], self.x[1])
    }

    #[inline]
    pub fn velocity(&self) -> na::Vector2<f64> {
        na::Vector2::new(self.x[2], self.x[3])
    }

    #[inline]
    pub fn state(&self) -> MotionState {
        (&self.x).into()
    }

    #[inline]
    pub fn covariance(&self) -> &na::Matrix6<f64> {
        &self.p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn starts_at_rest() {
        let kf = MotionFilter::new(na::Point2::new(120.0, 80.0), &FilterConfig::default());
        let state = kf.state();

        assert_eq!((state.x, state.y), (120.0, 80.0));
        assert_eq!((state.vx, state.vy, state.ax, state.ay), (0.0, 0.0, 0.0, 0.0));
        assert_abs_diff_eq!(kf.covariance().trace(), 600.0);
    }

    #[test]
    fn predict_applies_constant_acceleration() {
        let mut kf = MotionFilter::new(na::Point2::new(0.0, 0.0), &FilterConfig::default());
        kf.x = na::Vector6::new(0.0, 0.0, 2.0, -1.0, 1.0, 0.5);

        let pos = kf.predict();
        assert_abs_diff_eq!(pos.x, 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(pos.y, -0.75, epsilon = 1e-12);

        let state = kf.state();
        assert_abs_diff_eq!(state.vx, 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(state.vy, -0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(state.ax, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn update_at_predicted_position_does_not_grow_covariance() {
        let mut kf = MotionFilter::new(na::Point2::new(10.0, 10.0), &FilterConfig::default());

        for i in 1..5 {
            kf.predict();
            kf.update(na::Point2::new(10.0 + i as f64 * 2.0, 10.0)).unwrap();
        }

        let predicted = kf.predict();
        let before = kf.covariance().trace();
        let after_pos = kf.update(predicted).unwrap();

        assert!(kf.covariance().trace() <= before);
        assert_abs_diff_eq!(after_pos.x, predicted.x, epsilon = 1e-9);
        assert_abs_diff_eq!(after_pos.y, predicted.y, epsilon = 1e-9);
    }

    #[test]
    fn tracks_constant_velocity() {
        let mut kf = MotionFilter::new(na::Point2::new(0.0, 0.0), &FilterConfig::default());

        for i in 1..40 {
            kf.predict();
            kf.update(na::Point2::new(i as f64 * 4.0, i as f64 * -2.0)).unwrap();
        }

        let v = kf.velocity();
        assert_abs_diff_eq!(v.x, 4.0, epsilon = 0.1);
        assert_abs_diff_eq!(v.y, -2.0, epsilon = 0.1);
    }

    #[test]
    fn singular_innovation_keeps_predicted_state() {
        let config = FilterConfig {
            initial_covariance: 1.0,
            ..FilterConfig::default()
        };
        let mut kf = MotionFilter::new(na::Point2::new(5.0, 5.0), &config);
        kf.p = na::Matrix6::zeros();
        kf.r = na::Matrix2::zeros();

        let before = kf.state();
        let res = kf.update(na::Point2::new(7.0, 7.0));

        assert!(matches!(res, Err(Error::SingularCovariance { .. })));
        assert_eq!(kf.state(), before);
    }

    #[test]
    fn config_rejects_non_positive_noise() {
        let config = FilterConfig {
            measurement_noise: 0.0,
            ..FilterConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(FilterConfig::default().validate().is_ok());
    }
}
