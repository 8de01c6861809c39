//! The external message shapes shared across the system boundary. These are the only contract between the
//! core filter and its out-of-scope collaborators (messaging transport, object detector,
//! image-annotation publisher, CLI/lifecycle glue): transport-agnostic, serde-serializable
//! plain data, matching the wire-struct discipline of a dedicated message crate.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// A single 2D object detection in image-pixel units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: String,
    pub bbox: BoundingBox2D,
}

/// An axis-aligned image-space bounding box, centre + size, in pixels.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox2D {
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
}

/// A frame's worth of detections, as received from the (out-of-scope) object detector.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionArray {
    pub detections: Vec<Detection>,
}

/// A raw RGB8 annotated image, as received from the (out-of-scope) overlay publisher.
/// The core filter never reads the pixel data; it exists only so the message contract is
/// complete.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedImageMessage {
    pub width: u32,
    pub height: u32,
    pub rgb8: Vec<u8>,
}

/// A raw odometry sample as received over the transport: world-frame position (z ignored)
/// plus orientation as a quaternion. Yaw is extracted via [`yaw_from_quaternion`].
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OdometryMessage {
    pub position: Vector2<f64>,
    pub orientation: Quaternion,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

/// Extracts yaw (rotation about the world z axis) from a quaternion, following the standard
/// quaternion-to-Euler (ZYX) formula used by `tf_transformations.euler_from_quaternion`.
pub fn yaw_from_quaternion(q: Quaternion) -> f64 {
    let siny_cosp = 2.0 * (q.w * q.z + q.x * q.y);
    let cosy_cosp = 1.0 - 2.0 * (q.y * q.y + q.z * q.z);
    siny_cosp.atan2(cosy_cosp)
}

/// Builds a yaw-only quaternion, the inverse of [`yaw_from_quaternion`], for publishing poses.
pub fn quaternion_from_yaw(yaw: f64) -> Quaternion {
    Quaternion {
        x: 0.0,
        y: 0.0,
        z: (yaw / 2.0).sin(),
        w: (yaw / 2.0).cos(),
    }
}

/// 101x101 int8 occupancy grid, row-major, row 0 = world-y-minimum, column 0 = world-x-minimum.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OccupancyGridMessage {
    pub width: usize,
    pub height: usize,
    pub resolution: f64,
    pub origin: Vector2<f64>,
    pub frame_id: String,
    /// Row-major cell occupancy values, each in `[0, 100]`.
    pub data: Vec<i8>,
}

/// A stamped planar pose: world-frame position plus yaw-only orientation.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseStampedMessage {
    pub position: Vector2<f64>,
    pub orientation: Quaternion,
}

impl PoseStampedMessage {
    pub fn from_xy_yaw(x: f64, y: f64, yaw: f64) -> Self {
        Self {
            position: Vector2::new(x, y),
            orientation: quaternion_from_yaw(yaw),
        }
    }
}
