//! Plugin attachment model.
//!
//! Optional behavior (annotation placement, gesture handling, host layer
//! styling) plugs into the control as [`Plugin`]s. A plugin arrives either
//! already constructed or as a construct-on-attach factory; the
//! [`PluginSpec`] tagged union is resolved exactly once, at attachment time.

use crate::control::RoutingContext;
use std::sync::Arc;

/// Lifecycle hooks for a control plugin.
///
/// Both hooks run on the interactive context, inside a tokio runtime
/// context (plugins may spawn background tasks from them).
pub trait Plugin: Send {
    fn on_add(&mut self, ctx: &Arc<RoutingContext>);
    fn on_remove(&mut self, ctx: &Arc<RoutingContext>);
}

/// A plugin that is either pre-built or constructed on attach.
pub enum PluginSpec {
    Instance(Box<dyn Plugin>),
    Factory(Box<dyn FnOnce() -> Box<dyn Plugin> + Send>),
}

impl PluginSpec {
    pub fn instance(plugin: impl Plugin + 'static) -> Self {
        Self::Instance(Box::new(plugin))
    }

    pub fn factory(build: impl FnOnce() -> Box<dyn Plugin> + Send + 'static) -> Self {
        Self::Factory(Box::new(build))
    }

    pub(crate) fn resolve(self) -> Box<dyn Plugin> {
        match self {
            Self::Instance(plugin) => plugin,
            Self::Factory(build) => build(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe {
        added: usize,
        removed: usize,
    }

    impl Plugin for Probe {
        fn on_add(&mut self, _ctx: &Arc<RoutingContext>) {
            self.added += 1;
        }

        fn on_remove(&mut self, _ctx: &Arc<RoutingContext>) {
            self.removed += 1;
        }
    }

    #[test]
    fn test_factory_is_resolved_lazily() {
        let spec = PluginSpec::factory(|| {
            Box::new(Probe {
                added: 0,
                removed: 0,
            })
        });
        // Resolution constructs the plugin; nothing ran before.
        let _plugin = spec.resolve();
    }

    #[test]
    fn test_instance_passes_through() {
        let spec = PluginSpec::instance(Probe {
            added: 0,
            removed: 0,
        });
        let _plugin = spec.resolve();
    }
}
