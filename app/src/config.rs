use std::fs;

use anyhow::anyhow;
use common::node::{Node, NodeConfig};
use filter::PoseEstimatorNodeConfig;
use pubsub::PubSub;
use serde::Deserialize;

/// Top-level configuration document: which nodes to instantiate and a handful of process-wide
/// settings.
#[derive(Deserialize, Default)]
pub struct Config {
    pub settings: Settings,
    pub nodes: Vec<NodeEnum>,
}

#[derive(Deserialize)]
pub struct Settings {
    /// Event-loop tick rate, in hertz. Odometry/detections arriving faster than this are still
    /// queued by `pubsub` and drained on the next tick; this only bounds how often nodes are
    /// polled when nothing is pending.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
        }
    }
}

fn default_tick_hz() -> f64 {
    30.0
}

/// The set of nodes this binary knows how to instantiate. Only one variant today, since the
/// detector/transport/annotation collaborators of spec.md §1 are out of scope for this repo;
/// an external process publishes onto the topics this node subscribes to.
#[derive(Deserialize)]
pub enum NodeEnum {
    PoseEstimator(PoseEstimatorNodeConfig),
}

impl NodeEnum {
    fn instantiate(&self, pubsub: &mut PubSub) -> Box<dyn Node> {
        use NodeEnum::*;
        match self {
            PoseEstimator(c) => c.instantiate(pubsub),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        serde_yaml::from_str(&contents).map_err(|e| anyhow!(e))
    }

    pub fn instantiate_nodes(&self, pubsub: &mut PubSub) -> Vec<Box<dyn Node>> {
        self.nodes
            .iter()
            .map(|config| config.instantiate(pubsub))
            .collect()
    }
}
