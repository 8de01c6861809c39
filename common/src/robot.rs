use nalgebra::Vector2;

/// The pose of the robot in the 2D plane: world-frame position plus yaw.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Pose {
    /// The x position of the robot, in metres, world frame.
    pub x: f64,

    /// The y position of the robot, in metres, world frame.
    pub y: f64,

    /// The heading of the robot, in radians, counter-clockwise from the world +x axis
    /// (viewed from above).
    pub theta: f64,
}

impl From<Pose> for (f64, f64) {
    fn from(val: Pose) -> Self {
        (val.x, val.y)
    }
}

/// A single odometry sample: the robot's estimated position and yaw in the world frame.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Odometry {
    pub position: Vector2<f64>,
    pub yaw: f64,
}

impl Odometry {
    pub fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self {
            position: Vector2::new(x, y),
            yaw,
        }
    }
}
