use pubsub::PubSub;

/// A Node is an entity that reacts to subscribed messages and publishes results of its own.
///
/// Unlike a UI-facing `Node`, this one does not draw anything: the estimator
/// runs headless, so the only lifecycle hooks are `update` (called once per event-loop tick)
/// and `terminate`.
pub trait Node {
    /// Allows the Node to consume any pending subscribed messages and publish new ones.
    /// Called once per tick of the event loop; must return promptly, since no other Node runs
    /// concurrently with it.
    fn update(&mut self) {}

    /// Called when the Node should terminate. Nothing to clean up for the pose estimator
    /// itself (no threads, no file handles), but kept for parity with nodes that do.
    fn terminate(&mut self) {}
}

pub trait NodeConfig {
    /// Constructs a new Node object. This should also subscribe or request permission to
    /// publish via the Publish/Subscribe mechanism.
    fn instantiate(&self, pubsub: &mut PubSub) -> Box<dyn Node>;
}
