use std::sync::Arc;

use super::config::SupervisorConfig;
use super::supervisor::Supervisor;
use crate::events::Bus;
use crate::ioc::Container;
use crate::subscribers::{LogWriter, Subscribe};

/// Builder for constructing a [`Supervisor`].
pub struct SupervisorBuilder {
    container: Arc<Container>,
    cfg: SupervisorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    /// Creates a builder over `container` with the default configuration.
    pub fn new(container: Arc<Container>) -> Self {
        Self {
            container,
            cfg: SupervisorConfig::default(),
            subscribers: Vec::new(),
        }
    }

    /// Replaces the runtime configuration.
    pub fn with_config(mut self, cfg: SupervisorConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets additional event subscribers.
    ///
    /// Subscribers receive lifecycle events through dedicated workers with
    /// bounded queues. A [`LogWriter`] is always installed first.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the supervisor: event bus sized from the configuration, log
    /// writer plus the configured subscribers.
    pub fn build(self) -> Supervisor {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let mut subscribers: Vec<Arc<dyn Subscribe>> = Vec::with_capacity(self.subscribers.len() + 1);
        subscribers.push(Arc::new(LogWriter::new()));
        subscribers.extend(self.subscribers);

        Supervisor::new_internal(self.cfg, self.container, bus, subscribers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::config::ConfigStore;
    use crate::core::State;
    use crate::ioc::Registry;

    #[test]
    fn test_build_applies_config() {
        let registry = Registry::with_builtins(Vec::new()).unwrap();
        let container = Container::new(registry, Arc::new(ConfigStore::new()));
        let sup = SupervisorBuilder::new(container)
            .with_config(SupervisorConfig {
                grace: Duration::from_millis(250),
                bus_capacity: 0,
                ..SupervisorConfig::default()
            })
            .build();

        assert_eq!(sup.config().grace, Duration::from_millis(250));
        assert_eq!(*sup.state().borrow(), State::Init);
    }
}
