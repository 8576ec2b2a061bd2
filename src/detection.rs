use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};
use crate::error::{Error, Result};

/// One observed object in one frame, bbox in pixel coordinates (x1, y1, x2, y2)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: BBox<Ltrb>,
    #[serde(rename = "p")]
    pub confidence: f64,
    #[serde(rename = "c")]
    pub class_id: i32,
    #[serde(rename = "n", default)]
    pub class_name: String,
}

impl Detection {
    pub fn new(
        bbox: BBox<Ltrb>,
        confidence: f64,
        class_id: i32,
        class_name: impl Into<String>,
    ) -> Result<Self> {
        let det = Self {
            bbox,
            confidence,
            class_id,
            class_name: class_name.into(),
        };

        det.validate()?;

        Ok(det)
    }

    /// Checks `x1 < x2`, `y1 < y2`, a finite area and center, and
    /// `confidence ∈ [0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if !self.bbox.is_valid() {
            return Err(Error::InvalidDetection(format!(
                "malformed bbox {:?}",
                self.bbox.as_slice()
            )));
        }

        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(Error::InvalidDetection(format!(
                "confidence {} out of [0, 1]",
                self.confidence
            )));
        }

        Ok(())
    }

    #[inline(always)]
    pub fn center(&self) -> na::Point2<f64> {
        self.bbox.center()
    }

    #[inline(always)]
    pub fn area(&self) -> f64 {
        self.bbox.area()
    }

    #[inline]
    pub fn iou(&self, other: &Detection) -> f64 {
        self.bbox.iou(&other.bbox)
    }
}
