//! Ordered registry of module output slots.
//!
//! Slots are appended while the engine is being built, in activation order.
//! Once the registry is shared (behind an `Arc`) it can no longer be mutated,
//! so traversal needs no lock on the registry itself; only each slot's own
//! lock is taken, one at a time.

use std::sync::Arc;

use super::{
    error::{EngineError, EngineResult},
    slot::OutputSlot,
};

/// Insertion-ordered, append-only list of output slots.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    slots: Vec<Arc<OutputSlot>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new hidden slot and returns a handle to it.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::DuplicateModule` if a slot with the same name is
    /// already registered; names are the JSON keys of the output and must be
    /// unique.
    pub fn register(&mut self, name: &str, capacity: usize) -> EngineResult<Arc<OutputSlot>> {
        if self.contains(name) {
            return Err(EngineError::DuplicateModule(name.to_string()));
        }

        let slot = Arc::new(OutputSlot::new(name, capacity));
        self.slots.push(Arc::clone(&slot));
        Ok(slot)
    }

    /// Visits every slot in registration order. Slot references live as long
    /// as the registry borrow.
    pub fn for_each<'a>(&'a self, mut visitor: impl FnMut(&'a OutputSlot)) {
        for slot in &self.slots {
            visitor(slot);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.iter().any(|s| s.name() == name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_registration_order() {
        let mut registry = ModuleRegistry::new();
        for name in ["sysinfo", "df", "clock"] {
            registry.register(name, 32).unwrap();
        }

        assert_eq!(registry.names(), vec!["sysinfo", "df", "clock"]);

        let mut visited = Vec::new();
        registry.for_each(|slot| visited.push(slot.name().to_string()));
        assert_eq!(visited, vec!["sysinfo", "df", "clock"]);
    }

    #[test]
    fn visited_slots_outlive_the_visitor() {
        let mut registry = ModuleRegistry::new();
        registry.register("battery", 32).unwrap();
        registry.register("clock", 32).unwrap();

        let mut slots: Vec<&OutputSlot> = Vec::new();
        registry.for_each(|slot| slots.push(slot));

        let names: Vec<&str> = slots.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["battery", "clock"]);
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut registry = ModuleRegistry::new();
        registry.register("clock", 32).unwrap();

        let result = registry.register("clock", 32);
        assert!(matches!(result, Err(EngineError::DuplicateModule(name)) if name == "clock"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn returned_slot_is_the_registered_one() {
        let mut registry = ModuleRegistry::new();
        let slot = registry.register("df", 16).unwrap();
        slot.write("💾 50%", true);

        let mut seen = None;
        registry.for_each(|s| seen = Some(s.snapshot()));
        assert_eq!(seen.unwrap().text, "💾 50%");
    }

    #[test]
    fn empty_registry() {
        let registry = ModuleRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }
}
