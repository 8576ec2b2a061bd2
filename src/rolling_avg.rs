use crate::circular_queue::CircularQueue;

/// Mean over the last `window` samples.
#[derive(Debug, Clone)]
pub struct RollingAvg {
    history: CircularQueue<f64>,
}

impl RollingAvg {
    pub fn new(window: usize) -> Self {
        Self {
            history: CircularQueue::with_capacity(window),
        }
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub fn push(&mut self, value: f64) {
        self.history.push(value);
    }

    /// `None` until the first sample arrives.
    pub fn mean(&self) -> Option<f64> {
        if self.history.is_empty() {
            return None;
        }

        let sum: f64 = self.history.iter().sum();
        Some(sum / self.history.len() as f64)
    }

    #[inline]
    pub fn last(&self) -> Option<f64> {
        self.history.iter().next().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
