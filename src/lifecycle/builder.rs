use std::sync::Arc;

use super::controller::Lifecycle;
use crate::{
    config::LifecycleConfig,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for a [`Lifecycle`] with optional event subscribers.
pub struct LifecycleBuilder {
    cfg: LifecycleConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl LifecycleBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: LifecycleConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers.
    ///
    /// Each subscriber gets a dedicated worker with a bounded queue.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the lifecycle.
    ///
    /// With subscribers configured this spawns their workers and the bus
    /// listener, so it must be called from within a Tokio runtime. The listener
    /// is aborted when the lifecycle is dropped.
    pub fn build(self) -> Arc<Lifecycle> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());

        let listener = if self.subscribers.is_empty() {
            None
        } else {
            let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
            Some(subs.listen())
        };

        Arc::new(Lifecycle::new_internal(self.cfg, bus, listener))
    }
}

impl Lifecycle {
    /// Returns a builder for a lifecycle with subscribers.
    pub fn builder(cfg: LifecycleConfig) -> LifecycleBuilder {
        LifecycleBuilder::new(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, EventKind};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        kinds: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.kinds.lock().await.push(ev.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[tokio::test]
    async fn test_subscribers_observe_lifecycle_events() {
        let recorder = Arc::new(Recorder::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![recorder.clone()];
        let lc = Lifecycle::builder(LifecycleConfig::default())
            .with_subscribers(subs)
            .build();
        tokio::task::yield_now().await;

        lc.shutdown();
        for _ in 0..200 {
            if recorder.kinds.lock().await.len() == 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(
            *recorder.kinds.lock().await,
            vec![EventKind::ShutdownRequested, EventKind::Terminated]
        );
    }
}
