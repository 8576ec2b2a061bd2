use std::collections::HashMap;

use crate::detection::Detection;
use crate::error::{Error, Result};

/// Boundary to whatever produces per-frame detections. The tracking core
/// depends only on this trait, never on a concrete model.
pub trait Detector {
    type Input;

    fn detect(&mut self, input: &Self::Input) -> Result<Vec<Detection>>;

    fn name(&self) -> &str;
}

/// Replays pre-recorded detections keyed by frame index. Frames without a
/// recording produce no detections.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDetector {
    name: String,
    frames: HashMap<u64, Vec<Detection>>,
    strict: bool,
}

impl ScriptedDetector {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frames: HashMap::new(),
            strict: false,
        }
    }

    /// Builds a script where frame `i` replays `frames[i]`.
    pub fn from_frames<I>(name: impl Into<String>, frames: I) -> Self
    where
        I: IntoIterator<Item = Vec<Detection>>,
    {
        let mut det = Self::new(name);
        for (idx, dets) in frames.into_iter().enumerate() {
            det.frames.insert(idx as u64, dets);
        }

        det
    }

    /// Unrecorded frames become an error instead of an empty frame.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn insert(&mut self, frame: u64, detections: Vec<Detection>) {
        self.frames.insert(frame, detections);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl Detector for ScriptedDetector {
    type Input = u64;

    fn detect(&mut self, frame: &u64) -> Result<Vec<Detection>> {
        match self.frames.get(frame) {
            Some(dets) => Ok(dets.clone()),
            None if self.strict => Err(Error::Detector(format!(
                "{}: no recording for frame {}",
                self.name, frame
            ))),
            None => Ok(Vec::new()),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BBox;

    #[test]
    fn replays_by_index() {
        let d = Detection::new(BBox::ltrb(0.0, 0.0, 4.0, 4.0), 0.7, 0, "person").unwrap();
        let mut script = ScriptedDetector::from_frames("replay", vec![vec![d.clone()], vec![]]);

        assert_eq!(script.detect(&0).unwrap(), vec![d]);
        assert!(script.detect(&1).unwrap().is_empty());
        assert!(script.detect(&7).unwrap().is_empty());
        assert_eq!(script.name(), "replay");
    }

    #[test]
    fn strict_script_reports_missing_frames() {
        let mut script = ScriptedDetector::new("replay").strict();
        assert!(matches!(script.detect(&3), Err(Error::Detector(_))));
    }
}
