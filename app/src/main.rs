//! Lifecycle glue for the pose estimator: loads a YAML node configuration, builds a `PubSub`,
//! instantiates the configured nodes, and drives a single-threaded cooperative event loop.
//! The messaging transport that feeds detections/odometry onto these topics, and the object
//! detector that produces the detections, are handled by an external process that publishes
//! onto the same `pubsub` topics this binary's nodes subscribe to.

mod config;

use std::time::Duration;

use config::Config;
use pubsub::PubSub;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args();
    let config = if args.len() >= 2 {
        Config::from_file(&args.nth(1).unwrap())?
    } else {
        Config::default()
    };

    let mut pubsub = PubSub::new();
    let mut nodes = config.instantiate_nodes(&mut pubsub);

    let tick_period = Duration::from_secs_f64(1.0 / config.settings.tick_hz);

    tracing::info!(
        node_count = nodes.len(),
        tick_hz = config.settings.tick_hz,
        "starting event loop"
    );

    loop {
        for node in nodes.iter_mut() {
            node.update();
        }
        pubsub.tick();
        std::thread::sleep(tick_period);
    }
}
