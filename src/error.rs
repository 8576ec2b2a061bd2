use thiserror::Error;

use crate::track::TrackId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("innovation covariance is singular (track {track:?})")]
    SingularCovariance { track: Option<TrackId> },

    #[error("invalid detection: {0}")]
    InvalidDetection(String),

    #[error("association solver unavailable: {0}")]
    AssociationSolverUnavailable(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("detector error: {0}")]
    Detector(String),
}

pub type Result<T> = std::result::Result<T, Error>;
