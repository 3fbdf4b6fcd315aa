use std::sync::Arc;

use tracing::{debug, error, warn};

use super::{BoxedModule, Module, ModuleDescriptor, SetupContext};
use crate::error::{ModuleError, ModuleResult};

/// The modules installed on one supervisor, in installation order.
///
/// Installing a descriptor installs its dependencies first. A tag can be
/// installed once; a second explicit install is rejected and the first
/// module is kept.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<BoxedModule>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `descriptor` and, before it, any dependency not yet present.
    pub fn install(&mut self, descriptor: &'static ModuleDescriptor) -> ModuleResult {
        if self.contains(descriptor.tag) {
            warn!(module = descriptor.tag, "Module already installed, keeping the first");
            return Err(ModuleError::Duplicate {
                tag: descriptor.tag,
            });
        }
        let mut in_progress = Vec::new();
        self.install_with_dependencies(descriptor, &mut in_progress);
        Ok(())
    }

    fn install_with_dependencies(
        &mut self,
        descriptor: &'static ModuleDescriptor,
        in_progress: &mut Vec<&'static str>,
    ) {
        in_progress.push(descriptor.tag);

        for dependency in descriptor.depends_on {
            if dependency.tag == descriptor.tag || self.contains(dependency.tag) {
                continue;
            }
            if in_progress.contains(&dependency.tag) {
                warn!(
                    module = descriptor.tag,
                    dependency = dependency.tag,
                    "Dependency cycle, skipping edge"
                );
                continue;
            }
            debug!(module = descriptor.tag, dependency = dependency.tag, "Installing dependency");
            self.install_with_dependencies(dependency, in_progress);
        }

        in_progress.pop();

        // A cycle can install this tag while its dependencies were resolved.
        if self.contains(descriptor.tag) {
            return;
        }

        let module = descriptor.instantiate(self);
        if module.tag() != descriptor.tag {
            warn!(
                module = descriptor.tag,
                reported = module.tag(),
                "Module reports a different tag than its descriptor"
            );
        }
        debug!(module = descriptor.tag, "Installed module");
        self.modules.push(module);
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.modules.iter().any(|module| module.tag() == tag)
    }

    pub fn get(&self, tag: &str) -> Option<&BoxedModule> {
        self.modules.iter().find(|module| module.tag() == tag)
    }

    /// Looks up `tag` and downcasts it to `T`.
    pub fn get_as<T: Module>(&self, tag: &str) -> Option<Arc<T>> {
        self.get(tag)?.clone().as_any().downcast::<T>().ok()
    }

    /// Returns the first installed module of type `T`.
    pub fn find<T: Module>(&self) -> Option<Arc<T>> {
        self.modules
            .iter()
            .find_map(|module| module.clone().as_any().downcast::<T>().ok())
    }

    /// Installed tags, in installation order.
    pub fn tags(&self) -> Vec<&'static str> {
        self.modules.iter().map(|module| module.tag()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoxedModule> {
        self.modules.iter()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Runs every module's setup in installation order.
    ///
    /// A failing module is logged and skipped; the rest still run. Returns
    /// the number of failures.
    pub fn setup_all(&self, ctx: &SetupContext) -> usize {
        let identity = ctx.host().identity();
        let mut failures = 0;
        for module in &self.modules {
            match module.setup(ctx) {
                Ok(()) => debug!(identity = %identity, module = module.tag(), "Module set up"),
                Err(err) => {
                    failures += 1;
                    error!(identity = %identity, module = module.tag(), error = %err, "Module setup failed");
                }
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use parking_lot::Mutex;
    use tokio::sync::broadcast;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::host::testing::RecordingHost;

    static SETUP_LOG: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

    struct Stub {
        tag: &'static str,
        fail: bool,
    }

    impl Module for Stub {
        fn tag(&self) -> &'static str {
            self.tag
        }

        fn setup(&self, _ctx: &SetupContext) -> ModuleResult {
            SETUP_LOG.lock().push(self.tag);
            if self.fail {
                return Err(ModuleError::setup(self.tag, "boom"));
            }
            Ok(())
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    fn stub(tag: &'static str) -> BoxedModule {
        Arc::new(Stub { tag, fail: false })
    }

    static BASE: ModuleDescriptor = ModuleDescriptor::new("base", |_| stub("base"));

    static BROKEN: ModuleDescriptor = ModuleDescriptor::new("broken", |_| {
        Arc::new(Stub {
            tag: "broken",
            fail: true,
        })
    });

    static MIDDLE: ModuleDescriptor = ModuleDescriptor {
        tag: "middle",
        depends_on: &[&BASE],
        create: |registry| {
            assert!(registry.contains("base"));
            stub("middle")
        },
    };

    static TOP: ModuleDescriptor = ModuleDescriptor {
        tag: "top",
        depends_on: &[&MIDDLE, &BASE, &TOP],
        create: |_| stub("top"),
    };

    static PING: ModuleDescriptor = ModuleDescriptor {
        tag: "ping",
        depends_on: &[&PONG],
        create: |_| stub("ping"),
    };

    static PONG: ModuleDescriptor = ModuleDescriptor {
        tag: "pong",
        depends_on: &[&PING],
        create: |_| stub("pong"),
    };

    #[test]
    fn test_dependencies_installed_first() {
        let mut registry = ModuleRegistry::new();
        registry.install(&TOP).unwrap();
        assert_eq!(registry.tags(), vec!["base", "middle", "top"]);
    }

    #[test]
    fn test_present_dependency_skipped() {
        let mut registry = ModuleRegistry::new();
        registry.install(&BASE).unwrap();
        registry.install(&MIDDLE).unwrap();
        assert_eq!(registry.tags(), vec!["base", "middle"]);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = ModuleRegistry::new();
        registry.install(&BASE).unwrap();
        let err = registry.install(&BASE).unwrap_err();
        assert!(matches!(err, ModuleError::Duplicate { tag: "base" }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_cycle_terminates() {
        let mut registry = ModuleRegistry::new();
        registry.install(&PING).unwrap();
        assert_eq!(registry.tags(), vec!["pong", "ping"]);
    }

    #[test]
    fn test_typed_lookup() {
        let mut registry = ModuleRegistry::new();
        registry.install(&MIDDLE).unwrap();
        let stub = registry.get_as::<Stub>("middle").unwrap();
        assert_eq!(stub.tag, "middle");
        assert!(registry.get_as::<Stub>("missing").is_none());
        assert_eq!(registry.find::<Stub>().map(|p| p.tag), Some("base"));
    }

    #[tokio::test]
    async fn test_setup_failure_isolated() {
        let mut registry = ModuleRegistry::new();
        registry.install(&BROKEN).unwrap();
        registry.install(&BASE).unwrap();

        let (tx, _rx) = broadcast::channel(4);
        let ctx = SetupContext::new(RecordingHost::allowing(&[]), tx, CancellationToken::new());

        SETUP_LOG.lock().clear();
        assert_eq!(registry.setup_all(&ctx), 1);
        assert_eq!(*SETUP_LOG.lock(), vec!["broken", "base"]);
    }
}
