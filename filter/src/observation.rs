//! The data-association-marginalizing detection likelihood: given a frame's
//! detections and the landmark table, computes an unnormalized per-cell `p(D | pose)`.

use std::collections::HashMap;

use common::message::Detection;
use statrs::distribution::{Continuous, Normal};

use crate::geometry::{GRID_H, GRID_THETA, GRID_W};
use crate::grid::Grid3;
use crate::landmark::LandmarkSet;

/// Shared standard deviation (pixels) of the four independent Gaussian box-parameter
/// observations.
const SIGMA: f64 = 25.0;

/// `p(detection is spurious)^4` per component, i.e. the "all detections are unmatched to any
/// landmark" baseline: `0.05 * 0.01^4`.
const PROB_RANDOM: f64 = 0.05 * 0.01 * 0.01 * 0.01 * 0.01;

/// `ln_pdf` of the standard normal, used to evaluate `N(x; mu, SIGMA)` analytically as
/// `ln_pdf((x - mu) / SIGMA) - ln(SIGMA)` rather than constructing a per-cell `Normal`.
fn standard_normal() -> Normal {
    Normal::new(0.0, 1.0).expect("standard normal parameters are always valid")
}

/// Computes the grid-normalized likelihood `p(d | Lj, pose)` of detection `d` against
/// landmark `Lj`'s predicted box: the four box parameters are modelled as
/// independent Gaussian observations with shared `sigma`, accumulated in log space, then
/// normalized over the whole grid by subtracting the log-sum-exp (so the result sums to 1
/// over the grid — a grid-normalized likelihood, not a raw density). Zero everywhere if the
/// detection's class doesn't match the landmark's.
fn box_likelihood_grid(
    detection: &Detection,
    landmark: &crate::landmark::LandmarkPrediction,
) -> Grid3 {
    if detection.class_id != landmark.class_id {
        return Grid3::new_filled(GRID_H, GRID_W, GRID_THETA, 0.0);
    }

    let std_normal = standard_normal();
    let ln_sigma = SIGMA.ln();
    let ln_term = |x: f64, mu: f64| std_normal.ln_pdf((x - mu) / SIGMA) - ln_sigma;

    let boxes = &landmark.boxes;
    let log_prob = Grid3::from_fn(GRID_H, GRID_W, GRID_THETA, |iy, ix, it| {
        ln_term(detection.bbox.cx, boxes.centre_u.get(iy, ix, it))
            + ln_term(detection.bbox.cy, boxes.centre_v.get(iy, ix, it))
            + ln_term(detection.bbox.w, boxes.width.get(iy, ix, it))
            + ln_term(detection.bbox.h, boxes.height.get(iy, ix, it))
    });

    let log_norm = common::math::log_sum_exp(log_prob.data());
    log_prob.map(|v| (v - log_norm).exp())
}

/// `p(D | A, pose)`: the probability of detections `D` given that exactly the landmarks in
/// `remaining_landmark_indices` (a subset of the full landmark table, indices into
/// `landmarks.landmarks`) were detected. Recurses over which detection each landmark in the
/// subset produced, testing membership in `remaining_landmark_indices` directly rather than
/// comparing an index against a boolean.
///
/// `detections` carries each detection's *original* global index alongside the value, so the
/// `cache` lookup stays correct no matter how many levels of filtering the recursion has gone
/// through — a local position in whatever slice got passed to a given call is not the same
/// thing as the detection's index in the cache's key space.
fn association_marginal(
    detections: &[(usize, &Detection)],
    remaining_landmark_indices: &[usize],
    cache: &HashMap<(usize, usize), Grid3>,
) -> Grid3 {
    let Some((&landmark_idx, rest)) = remaining_landmark_indices.split_first() else {
        let prob = PROB_RANDOM.powi(detections.len() as i32);
        return Grid3::new_filled(GRID_H, GRID_W, GRID_THETA, prob);
    };

    let n = detections.len();
    let mut total = Grid3::new_filled(GRID_H, GRID_W, GRID_THETA, 0.0);
    for assign_pos in 0..n {
        let (detection_idx, _) = detections[assign_pos];
        let remaining_detections: Vec<(usize, &Detection)> = detections
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != assign_pos)
            .map(|(_, d)| *d)
            .collect();

        let box_likelihood = &cache[&(detection_idx, landmark_idx)];
        let remainder = association_marginal(&remaining_detections, rest, cache);
        let contribution = box_likelihood.mul(&remainder).scale(1.0 / n as f64);
        total = total.add(&contribution);
    }
    total
}

/// `p(D | pose)`, unnormalized: marginalizes over every subset `A` of landmarks that could
/// have been the ones actually detectable from that pose.
pub fn observation_likelihood(detections: &[Detection], landmarks: &LandmarkSet) -> Grid3 {
    let m = landmarks.landmarks.len();

    let mut cache = HashMap::with_capacity(detections.len() * m);
    for (di, d) in detections.iter().enumerate() {
        for (lj, landmark) in landmarks.landmarks.iter().enumerate() {
            cache.insert((di, lj), box_likelihood_grid(d, landmark));
        }
    }
    let detection_refs: Vec<(usize, &Detection)> = detections.iter().enumerate().collect();

    let mut total = Grid3::new_filled(GRID_H, GRID_W, GRID_THETA, 0.0);
    for subset_mask in 0u32..(1 << m) {
        let included: Vec<usize> = (0..m).filter(|j| (subset_mask >> j) & 1 == 1).collect();

        let mut p_subset = Grid3::new_filled(GRID_H, GRID_W, GRID_THETA, 1.0);
        for (j, landmark) in landmarks.landmarks.iter().enumerate() {
            let factor = if (subset_mask >> j) & 1 == 1 {
                landmark.detectability.clone()
            } else {
                landmark.detectability.map(|v| 1.0 - v)
            };
            p_subset = p_subset.mul(&factor);
        }

        let p_detections_given_subset = association_marginal(&detection_refs, &included, &cache);
        total = total.add(&p_subset.mul(&p_detections_given_subset));
    }
    total
}
