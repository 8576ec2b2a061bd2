//! Detection-to-track association over an `1 - IoU` cost matrix.
//!
//! The optimal path solves the rectangular assignment problem with the
//! Munkres algorithm (cargo feature `optimal`). The greedy path claims, for
//! each detection in input order, the best still-free track. Under contention
//! the greedy path may hand out different identities than the optimum would;
//! that divergence is an accepted property of the approximation.

use ndarray::Array2;
use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};
use crate::error::{Error, Result};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssociationStrategy {
    #[default]
    Optimal,
    Greedy,
}

/// Signature of the optimal solver: IoU matrix and acceptance threshold in,
/// accepted matches out.
pub type OptimalSolver = fn(&Array2<f64>, f64) -> Result<Assignment>;

/// Outcome of one association round. Indices refer to the detection and
/// track slices passed in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assignment {
    /// `(detection, track, iou)`
    pub matches: Vec<(usize, usize, f64)>,
    pub unmatched_detections: Vec<usize>,
    pub unmatched_tracks: Vec<usize>,
}

impl Assignment {
    fn unmatched(n_dets: usize, n_tracks: usize) -> Self {
        Self {
            matches: Vec::new(),
            unmatched_detections: (0..n_dets).collect(),
            unmatched_tracks: (0..n_tracks).collect(),
        }
    }

    fn from_matches(matches: Vec<(usize, usize, f64)>, n_dets: usize, n_tracks: usize) -> Self {
        let mut det_used = vec![false; n_dets];
        let mut track_used = vec![false; n_tracks];

        for &(d, t, _) in &matches {
            det_used[d] = true;
            track_used[t] = true;
        }

        Self {
            matches,
            unmatched_detections: (0..n_dets).filter(|&d| !det_used[d]).collect(),
            unmatched_tracks: (0..n_tracks).filter(|&t| !track_used[t]).collect(),
        }
    }
}

/// IoU matrix, rows are detections and columns are tracks.
pub fn iou_matrix(dets: &[BBox<Ltrb>], tracks: &[BBox<Ltrb>]) -> Array2<f64> {
    Array2::from_shape_fn((dets.len(), tracks.len()), |(r, c)| dets[r].iou(&tracks[c]))
}

#[cfg(feature = "optimal")]
pub fn solve_optimal(iou: &Array2<f64>, threshold: f64) -> Result<Assignment> {
    use munkres::{solve_assignment, WeightMatrix};

    let (rows, cols) = iou.dim();
    if rows == 0 || cols == 0 {
        return Ok(Assignment::unmatched(rows, cols));
    }

    let n = rows.max(cols);

    // padding costs as much as a zero-overlap pair
    let mut weights = WeightMatrix::from_fn(n, |(r, c)| {
        if r < rows && c < cols {
            1.0 - iou[[r, c]]
        } else {
            1.0
        }
    });

    let positions = solve_assignment(&mut weights)
        .map_err(|err| Error::AssociationSolverUnavailable(format!("{:?}", err)))?;

    let matches = positions
        .into_iter()
        .filter(|p| p.row < rows && p.column < cols)
        .map(|p| (p.row, p.column, iou[[p.row, p.column]]))
        .filter(|&(_, _, score)| score >= threshold)
        .collect();

    Ok(Assignment::from_matches(matches, rows, cols))
}

#[cfg(not(feature = "optimal"))]
pub fn solve_optimal(_iou: &Array2<f64>, _threshold: f64) -> Result<Assignment> {
    Err(Error::AssociationSolverUnavailable(
        "built without the `optimal` feature".to_string(),
    ))
}

pub fn solve_greedy(iou: &Array2<f64>, threshold: f64) -> Assignment {
    let (rows, cols) = iou.dim();
    let mut claimed = vec![false; cols];
    let mut matches = Vec::new();

    for r in 0..rows {
        let mut best: Option<(usize, f64)> = None;

        for c in (0..cols).filter(|&c| !claimed[c]) {
            let score = iou[[r, c]];
            if score < threshold {
                continue;
            }

            if best.map_or(true, |(_, b)| score > b) {
                best = Some((c, score));
            }
        }

        if let Some((c, score)) = best {
            claimed[c] = true;
            matches.push((r, c, score));
        }
    }

    Assignment::from_matches(matches, rows, cols)
}

#[inline]
pub const fn optimal_available() -> bool {
    cfg!(feature = "optimal")
}

/// Holds the association strategy for one tracking session. A failure of
/// the optimal solver switches the session to greedy matching for good.
#[derive(Clone)]
pub struct Associator {
    strategy: AssociationStrategy,
    threshold: f64,
    degraded: bool,
    solver: OptimalSolver,
}

impl std::fmt::Debug for Associator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Associator")
            .field("strategy", &self.strategy)
            .field("threshold", &self.threshold)
            .field("degraded", &self.degraded)
            .finish()
    }
}

impl Associator {
    pub fn new(strategy: AssociationStrategy, threshold: f64) -> Self {
        let mut associator = Self::with_solver(strategy, threshold, solve_optimal);

        if strategy == AssociationStrategy::Optimal && !optimal_available() {
            associator.degrade(&Error::AssociationSolverUnavailable(
                "built without the `optimal` feature".to_string(),
            ));
        }

        associator
    }

    /// Same as [`Associator::new`] with a caller-provided optimal solver.
    pub fn with_solver(
        strategy: AssociationStrategy,
        threshold: f64,
        solver: OptimalSolver,
    ) -> Self {
        Self {
            strategy,
            threshold,
            degraded: false,
            solver,
        }
    }

    #[inline]
    pub fn strategy(&self) -> AssociationStrategy {
        self.strategy
    }

    #[inline]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// `true` once the session fell back from optimal to greedy matching.
    #[inline]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    fn degrade(&mut self, err: &Error) {
        log::warn!("{}; falling back to greedy IoU matching", err);

        self.strategy = AssociationStrategy::Greedy;
        self.degraded = true;
    }

    pub fn associate(&mut self, dets: &[BBox<Ltrb>], tracks: &[BBox<Ltrb>]) -> Assignment {
        if dets.is_empty() || tracks.is_empty() {
            return Assignment::unmatched(dets.len(), tracks.len());
        }

        let iou = iou_matrix(dets, tracks);

        if self.strategy == AssociationStrategy::Optimal {
            match (self.solver)(&iou, self.threshold) {
                Ok(assignment) => return assignment,
                Err(err) => self.degrade(&err),
            }
        }

        solve_greedy(&iou, self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn boxes(xs: &[f64]) -> Vec<BBox<Ltrb>> {
        xs.iter()
            .map(|&x| BBox::ltrb(x, 0.0, x + 10.0, 10.0))
            .collect()
    }

    #[test]
    fn empty_sides_are_all_unmatched() {
        let mut assoc = Associator::new(AssociationStrategy::Optimal, 0.3);

        let res = assoc.associate(&boxes(&[0.0, 50.0]), &[]);
        assert!(res.matches.is_empty());
        assert_eq!(res.unmatched_detections, vec![0, 1]);

        let res = assoc.associate(&[], &boxes(&[0.0]));
        assert_eq!(res.unmatched_tracks, vec![0]);
    }

    #[test]
    fn greedy_claims_best_free_track() {
        let iou = array![[0.5, 0.9], [0.0, 0.8]];
        let res = solve_greedy(&iou, 0.3);

        assert_eq!(res.matches, vec![(0, 1, 0.9)]);
        assert_eq!(res.unmatched_detections, vec![1]);
        assert_eq!(res.unmatched_tracks, vec![0]);
    }

    #[test]
    fn greedy_respects_threshold() {
        let iou = array![[0.29, 0.1]];
        let res = solve_greedy(&iou, 0.3);

        assert!(res.matches.is_empty());
        assert_eq!(res.unmatched_tracks, vec![0, 1]);
    }

    #[cfg(feature = "optimal")]
    #[test]
    fn optimal_beats_greedy_under_contention() {
        let iou = array![[0.5, 0.9], [0.0, 0.8]];
        let res = solve_optimal(&iou, 0.3).unwrap();

        let mut matches = res.matches.clone();
        matches.sort_by_key(|m| m.0);
        assert_eq!(matches, vec![(0, 0, 0.5), (1, 1, 0.8)]);
        assert_eq!(solve_greedy(&iou, 0.3).matches.len(), 1);
        assert!(res.unmatched_detections.is_empty());
    }

    #[cfg(feature = "optimal")]
    #[test]
    fn optimal_rejects_low_overlap_pairs() {
        // the optimum pairs (1, 0) at 0.1 but that pair is under threshold
        let iou = array![[0.0, 0.9], [0.1, 0.0]];
        let res = solve_optimal(&iou, 0.3).unwrap();

        assert_eq!(res.matches, vec![(0, 1, 0.9)]);
        assert_eq!(res.unmatched_detections, vec![1]);
        assert_eq!(res.unmatched_tracks, vec![0]);
    }

    #[cfg(feature = "optimal")]
    #[test]
    fn optimal_handles_rectangular_input() {
        let dets = boxes(&[0.0, 100.0, 200.0]);
        let tracks = boxes(&[201.0, 1.0]);
        let res = solve_optimal(&iou_matrix(&dets, &tracks), 0.3).unwrap();

        let mut matches: Vec<_> = res.matches.iter().map(|&(d, t, _)| (d, t)).collect();
        matches.sort();
        assert_eq!(matches, vec![(0, 1), (2, 0)]);
        assert_eq!(res.unmatched_detections, vec![1]);
        assert!(res.unmatched_tracks.is_empty());
    }

    fn broken_solver(_iou: &Array2<f64>, _threshold: f64) -> Result<Assignment> {
        Err(Error::AssociationSolverUnavailable("solver crashed".to_string()))
    }

    #[test]
    fn solver_failure_resolves_greedily_and_stays_greedy() {
        let mut assoc = Associator::with_solver(AssociationStrategy::Optimal, 0.3, broken_solver);
        assert!(!assoc.is_degraded());

        let dets = boxes(&[0.0, 100.0, 3.0]);
        let tracks = boxes(&[1.0, 99.0]);
        let expected = solve_greedy(&iou_matrix(&dets, &tracks), 0.3);

        let res = assoc.associate(&dets, &tracks);
        assert_eq!(res, expected);
        assert_eq!(res.unmatched_detections, vec![2]);
        assert!(assoc.is_degraded());
        assert_eq!(assoc.strategy(), AssociationStrategy::Greedy);

        let res = assoc.associate(&dets, &tracks);
        assert_eq!(res, expected);
        assert!(assoc.is_degraded());
    }

    #[test]
    fn strategy_is_fixed_at_construction() {
        let assoc = Associator::new(AssociationStrategy::Greedy, 0.3);
        assert_eq!(assoc.strategy(), AssociationStrategy::Greedy);
        assert!(!assoc.is_degraded());

        let assoc = Associator::new(AssociationStrategy::Optimal, 0.3);
        assert_eq!(assoc.is_degraded(), !optimal_available());
    }
}
