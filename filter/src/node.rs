//! The recursive filter loop: holds the current belief, fuses motion and observation updates on
//! each odometry tick, and emits outputs. Wired to the messaging layer by
//! [`PoseEstimatorNode`]/[`PoseEstimatorNodeConfig`], implementing the `Node`/`NodeConfig`
//! pairing used throughout this workspace's messaging layer.

use std::sync::Arc;

use common::message::{
    yaw_from_quaternion, DetectionArray, OccupancyGridMessage, OdometryMessage,
    PoseStampedMessage,
};
use common::node::{Node, NodeConfig};
use common::robot::Odometry;
use pubsub::{Publisher, Subscription};
use serde::Deserialize;

use crate::geometry::{GRID_H, GRID_THETA, GRID_W};
use crate::grid::Grid3;
use crate::landmark::LandmarkSet;
use crate::motion::motion_update;
use crate::observation::observation_likelihood;
use crate::output::{mle_pose, occupancy_grid};

/// Whether the filter has just replanted its belief on a fresh detection (and so should fuse
/// the next stationary observation) or has already consumed one for this stationary episode.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FilterMode {
    Fresh,
    Aligned,
}

/// The pose-belief filter, independent of any messaging transport: pure state plus pure update
/// functions, so it can be driven directly in tests without a [`pubsub::PubSub`].
pub struct PoseEstimatorFilter {
    landmarks: LandmarkSet,
    belief: Grid3,
    last_odom: Option<Odometry>,
    last_detections: Option<DetectionArray>,
    mode: FilterMode,
}

impl PoseEstimatorFilter {
    pub fn new(landmarks: LandmarkSet) -> Self {
        let uniform = 1.0 / (GRID_H * GRID_W * GRID_THETA) as f64;
        Self {
            landmarks,
            belief: Grid3::new_filled(GRID_H, GRID_W, GRID_THETA, uniform),
            last_odom: None,
            last_detections: None,
            mode: FilterMode::Fresh,
        }
    }

    pub fn belief(&self) -> &Grid3 {
        &self.belief
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Records the latest detections; consumed lazily on the next odometry tick (stale-but-latest
    /// semantics — detections don't trigger an update on their own).
    pub fn on_detections(&mut self, detections: DetectionArray) {
        self.last_detections = Some(detections);
    }

    /// Advances the filter on a new odometry sample, per the state machine: no detections yet
    /// means nothing to fuse; the first odometry sample after detections arrive replants the
    /// belief directly on the observation likelihood; subsequent samples predict via motion and
    /// fuse an observation once per stationary episode.
    pub fn on_odometry(&mut self, current: Odometry) {
        let Some(detections) = self.last_detections.clone() else {
            return;
        };

        let l_obs = observation_likelihood(&detections.detections, &self.landmarks);

        let Some(last) = self.last_odom else {
            self.belief = l_obs;
            self.last_odom = Some(current);
            self.mode = FilterMode::Fresh;
            self.finalize_belief();
            return;
        };

        let update = motion_update(&self.belief, last, current);
        self.last_odom = Some(current);

        if update.moving {
            tracing::debug!("moving, predicting belief from odometry");
            self.belief = update.belief;
            self.mode = FilterMode::Fresh;
        } else if self.mode == FilterMode::Fresh {
            tracing::debug!("stationary, fusing observation into belief");
            self.belief = update.belief.mul(&l_obs);
            self.mode = FilterMode::Aligned;
        }
        // mode == Aligned and not moving: belief left unchanged, matching the "fuse an
        // observation once per stationary episode" rule.

        self.finalize_belief();
    }

    /// Clamps negatives to zero and renormalizes to sum 1, falling back to a uniform belief if
    /// the grid collapsed to all-zero (e.g. a detection wildly inconsistent with every pose).
    fn finalize_belief(&mut self) {
        self.belief.clamp_non_negative();
        let total = self.belief.sum();
        if total <= 0.0 {
            tracing::warn!("belief collapsed to zero mass, resetting to uniform");
            let uniform = 1.0 / (GRID_H * GRID_W * GRID_THETA) as f64;
            self.belief = Grid3::new_filled(GRID_H, GRID_W, GRID_THETA, uniform);
        } else {
            self.belief.scale_in_place(1.0 / total);
        }
    }

    pub fn occupancy_grid(&self, frame_id: &str) -> OccupancyGridMessage {
        occupancy_grid(&self.belief, frame_id)
    }

    pub fn mle_pose(&self) -> PoseStampedMessage {
        mle_pose(&self.belief)
    }
}

fn odometry_from_message(msg: &OdometryMessage) -> Odometry {
    Odometry {
        position: msg.position,
        yaw: yaw_from_quaternion(msg.orientation),
    }
}

pub struct PoseEstimatorNode {
    sub_detections: Subscription<DetectionArray>,
    sub_odometry: Subscription<OdometryMessage>,
    pub_occupancy: Publisher<OccupancyGridMessage>,
    pub_pose: Publisher<PoseStampedMessage>,
    frame_id: String,
    filter: PoseEstimatorFilter,
}

#[derive(Deserialize, Clone)]
pub struct PoseEstimatorNodeConfig {
    topic_detections: String,
    topic_odometry: String,
    topic_occupancy_grid: String,
    topic_pose: String,
    #[serde(default = "default_frame_id")]
    frame_id: String,
}

fn default_frame_id() -> String {
    "map".to_string()
}

impl NodeConfig for PoseEstimatorNodeConfig {
    fn instantiate(&self, pubsub: &mut pubsub::PubSub) -> Box<dyn Node> {
        Box::new(PoseEstimatorNode {
            sub_detections: pubsub.subscribe(&self.topic_detections),
            sub_odometry: pubsub.subscribe(&self.topic_odometry),
            pub_occupancy: pubsub.publish(&self.topic_occupancy_grid),
            pub_pose: pubsub.publish(&self.topic_pose),
            frame_id: self.frame_id.clone(),
            filter: PoseEstimatorFilter::new(LandmarkSet::standard()),
        })
    }
}

impl Node for PoseEstimatorNode {
    fn update(&mut self) {
        if let Some(detections) = self.sub_detections.try_recv() {
            self.filter.on_detections((*detections).clone());
        }

        if let Some(odom) = self.sub_odometry.try_recv() {
            self.filter.on_odometry(odometry_from_message(&odom));

            self.pub_pose.publish(Arc::new(self.filter.mle_pose()));
            self.pub_occupancy
                .publish(Arc::new(self.filter.occupancy_grid(&self.frame_id)));
        }
    }
}
