use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::{error::ModuleError, traits::Module, types::ModuleResult};
use crate::config::status::ModuleConfig;

/// Builds a module from its configuration entry.
pub type ModuleFactory = fn(&ModuleConfig) -> ModuleResult<Box<dyn Module>>;

/// Catalog entry submitted by every built-in module at compile time.
pub struct ModuleMeta {
    pub name: &'static str,
    pub factory: ModuleFactory,
}

inventory::collect!(ModuleMeta);

/// Startup-time table mapping a module name to its constructor.
pub struct ModuleCatalog {
    factories: HashMap<&'static str, ModuleFactory>,
}

impl ModuleCatalog {
    /// Collects every submitted `ModuleMeta`.
    pub fn new() -> Self {
        let factories = inventory::iter::<ModuleMeta>
            .into_iter()
            .map(|meta| (meta.name, meta.factory))
            .collect();

        ModuleCatalog { factories }
    }

    /// Constructs the module named by `config.name`.
    ///
    /// # Errors
    ///
    /// `ModuleNotFound` for unknown names, otherwise whatever the module's
    /// factory reports.
    pub fn build(&self, config: &ModuleConfig) -> ModuleResult<Box<dyn Module>> {
        let factory = self
            .factories
            .get(config.name.as_str())
            .ok_or_else(|| ModuleError::ModuleNotFound(config.name.clone()))?;

        factory(config)
    }

    pub fn get(&self, name: &str) -> Option<ModuleFactory> {
        self.factories.get(name).copied()
    }

    /// Registered names, sorted.
    pub fn list_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Returns a reference to the global catalog, built on first use.
    pub fn global() -> &'static ModuleCatalog {
        &GLOBAL_CATALOG
    }
}

impl Default for ModuleCatalog {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_CATALOG: Lazy<ModuleCatalog> = Lazy::new(ModuleCatalog::new);

/// Facade over the global catalog.
pub struct Modules;

impl Modules {
    /// Factory registered under `name`, if any.
    pub fn get(name: &str) -> Option<ModuleFactory> {
        ModuleCatalog::global().get(name)
    }

    pub fn build(config: &ModuleConfig) -> ModuleResult<Box<dyn Module>> {
        ModuleCatalog::global().build(config)
    }

    pub fn list() -> Vec<&'static str> {
        ModuleCatalog::global().list_names()
    }

    pub fn exists(name: &str) -> bool {
        ModuleCatalog::global().contains(name)
    }

    pub fn count() -> usize {
        ModuleCatalog::global().len()
    }
}

/// Registers a module type under a name in the global catalog.
///
/// The type must implement `Module` and `FromConfig`.
#[macro_export]
macro_rules! register_module {
    ($module_type:ty, $name:expr) => {
        inventory::submit! {
            $crate::core::modules::catalog::ModuleMeta {
                name: $name,
                factory: |config| {
                    let module = <$module_type as $crate::core::modules::traits::FromConfig>::from_config(config)?;
                    Ok(Box::new(module) as Box<dyn $crate::core::modules::traits::Module>)
                },
            }
        }
    };
}
