//! Module descriptor, the static `Copy` handle to a module.

use super::{BoxedModule, ModuleRegistry};

/// Factory that builds a module. It receives the registry so it can look up
/// the dependencies installed before it.
pub type ModuleFactory = fn(&ModuleRegistry) -> BoxedModule;

/// A static description of a module and how to build it.
///
/// ```rust,ignore
/// pub static GREETER: ModuleDescriptor = ModuleDescriptor {
///     tag: "greeter",
///     depends_on: &[&COMMANDER],
///     create: |_| Arc::new(Greeter),
/// };
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ModuleDescriptor {
    /// Unique tag, used as the registry key and in logs.
    pub tag: &'static str,

    /// Modules that must be installed first.
    pub depends_on: &'static [&'static ModuleDescriptor],

    pub create: ModuleFactory,
}

impl ModuleDescriptor {
    /// A descriptor without dependencies.
    pub const fn new(tag: &'static str, create: ModuleFactory) -> Self {
        Self {
            tag,
            depends_on: &[],
            create,
        }
    }

    #[inline]
    pub fn instantiate(&self, registry: &ModuleRegistry) -> BoxedModule {
        (self.create)(registry)
    }
}
