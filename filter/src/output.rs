//! Output projection: reduces the 3D belief to a 2D occupancy grid for display
//! and an MLE pose estimate for downstream consumers.

use nalgebra::Vector2;

use common::message::{OccupancyGridMessage, PoseStampedMessage};

use crate::geometry::{CELL_SIZE, GRID_H, GRID_THETA, GRID_W, ORIGIN_X, ORIGIN_Y, WORLD_GRID_LENGTH};
use crate::grid::{Grid2, Grid3};

/// Marginalizes yaw, smooths with a 3x3 box blur, and formats the result as an occupancy grid
/// in `[0, 100]`, flipped vertically so row 0 is the world-y-minimum (the external convention,
/// the opposite of the belief grid's own row-0-is-maximum-y internal convention).
pub fn occupancy_grid(belief: &Grid3, frame_id: &str) -> OccupancyGridMessage {
    let marginal = belief.sum_axis_theta();
    let blur = Grid2::new_filled(3, 3, 1.0);
    let smoothed = marginal.cross_correlate_same(&blur);

    let max = smoothed.max();
    let scale = if max > 0.0 { 100.0 / max } else { 0.0 };

    let height = smoothed.height();
    let width = smoothed.width();
    let mut data = vec![0i8; height * width];
    for iy in 0..height {
        let flipped_row = height - 1 - iy;
        for ix in 0..width {
            let value = (smoothed.get(iy, ix) * scale).round().clamp(0.0, 100.0);
            data[flipped_row * width + ix] = value as i8;
        }
    }

    OccupancyGridMessage {
        width,
        height,
        resolution: CELL_SIZE,
        origin: Vector2::new(ORIGIN_X, ORIGIN_Y),
        frame_id: frame_id.to_string(),
        data,
    }
}

/// Extracts the maximum-likelihood pose from `belief`: the first `(iy, ix)` maximizing the
/// yaw-marginalized belief, and independently the yaw index maximizing `belief[iy, ix, :]`.
pub fn mle_pose(belief: &Grid3) -> PoseStampedMessage {
    let marginal = belief.sum_axis_theta();
    let (iy, ix) = marginal.argmax();
    let it = belief.argmax_theta_at(iy, ix);

    let world_x = ORIGIN_X + ix as f64 * CELL_SIZE;
    let world_y = ORIGIN_Y + WORLD_GRID_LENGTH - iy as f64 * CELL_SIZE;
    let world_yaw = (it as f64 / GRID_THETA as f64) * 2.0 * std::f64::consts::PI;

    PoseStampedMessage::from_xy_yaw(world_x, world_y, world_yaw)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use common::message::yaw_from_quaternion;

    fn delta_belief(iy: usize, ix: usize, it: usize) -> Grid3 {
        let mut g = Grid3::new_filled(GRID_H, GRID_W, GRID_THETA, 0.0);
        g.set(iy, ix, it, 1.0);
        g
    }

    #[test]
    fn occupancy_grid_is_bounded_and_peaks_near_the_delta() {
        let belief = delta_belief(20, 60, 5);
        let grid = occupancy_grid(&belief, "map");
        assert!(grid.data.iter().all(|&v| (0..=100).contains(&v)));
        assert_eq!(grid.width, GRID_W);
        assert_eq!(grid.height, GRID_H);

        // row 20 (internal convention) should appear flipped to row `GRID_H - 1 - 20`.
        let flipped_row = GRID_H - 1 - 20;
        let value = grid.data[flipped_row * GRID_W + 60];
        assert_eq!(value, 100);
    }

    #[test]
    fn mle_pose_recovers_delta_location() {
        let (iy, ix, it) = (30, 70, 10);
        let belief = delta_belief(iy, ix, it);
        let pose = mle_pose(&belief);

        let expected_x = ORIGIN_X + ix as f64 * CELL_SIZE;
        let expected_y = ORIGIN_Y + WORLD_GRID_LENGTH - iy as f64 * CELL_SIZE;
        let expected_yaw = (it as f64 / GRID_THETA as f64) * 2.0 * std::f64::consts::PI;

        assert_relative_eq!(pose.position.x, expected_x, epsilon = 1e-9);
        assert_relative_eq!(pose.position.y, expected_y, epsilon = 1e-9);
        assert_relative_eq!(yaw_from_quaternion(pose.orientation), expected_yaw, epsilon = 1e-9);
    }
}
