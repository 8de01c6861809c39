//! Motion update: shifts and rotates a world-frame position kernel per yaw
//! slice, convolves it against the prior belief, then circularly shifts the whole belief along
//! the yaw axis by the heading change.

use std::f64::consts::PI;

use common::robot::Odometry;

use crate::geometry::{CELL_SIZE, GRID_H, GRID_THETA, GRID_W};
use crate::grid::{Grid2, Grid3};
use crate::interp::{rotate2, shift2};

/// Side length of the position kernel used to spread probability mass during a motion update.
const KERNEL_SIZE: usize = 11;

/// Below this, position and yaw deltas are treated as noise rather than motion (the
/// "moving" predicate).
const MOVING_EPS: f64 = 1e-3;

/// The outcome of a motion update: the predicted belief and whether the robot actually moved
/// between the two odometry samples.
pub struct MotionUpdate {
    pub belief: Grid3,
    pub moving: bool,
}

/// A single unit mass at the centre of an `11x11` grid, the position kernel's initial state
/// before any per-slice shift/rotate.
fn centred_kernel() -> Grid2 {
    let mut k = Grid2::new_filled(KERNEL_SIZE, KERNEL_SIZE, 0.0);
    let c = KERNEL_SIZE / 2;
    k.set(c, c, 1.0);
    k
}

/// Computes the motion-predicted belief from `prior` given the previous and current odometry
/// samples.
pub fn motion_update(prior: &Grid3, last: Odometry, current: Odometry) -> MotionUpdate {
    let delta_pos = current.position - last.position;
    let delta_forward = delta_pos.x * current.yaw.cos() + delta_pos.y * current.yaw.sin();
    let delta_yaw = current.yaw - last.yaw;

    let moving = delta_pos.norm() > MOVING_EPS || delta_yaw.abs() > MOVING_EPS;

    let base_kernel = shift2(&centred_kernel(), 0.0, -delta_forward / CELL_SIZE);

    let mut belief = Grid3::new_filled(GRID_H, GRID_W, GRID_THETA, 0.0);
    for it in 0..GRID_THETA {
        let angle = 2.0 * PI * it as f64 / GRID_THETA as f64;
        let rotated_kernel = rotate2(&base_kernel, angle);
        let slice = prior.theta_slice(it).cross_correlate_same(&rotated_kernel);
        belief.set_theta_slice(it, &slice);
    }

    let yaw_shift_cells = delta_yaw * GRID_THETA as f64 / (2.0 * PI);
    let belief = belief.shift_circular_theta(yaw_shift_cells);

    MotionUpdate { belief, moving }
}
