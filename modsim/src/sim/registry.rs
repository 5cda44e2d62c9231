use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::SimError;
use crate::sim::slave::{Section, Slave};
use crate::types::SlaveId;

/// Insertion-ordered collection of the simulated slaves
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlaveRegistry {
    slaves: Vec<Slave>,
}

impl SlaveRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a slave and declare its sections in order
    ///
    /// If any section cannot be added the registry is left unchanged.
    pub fn add_slave(&mut self, id: SlaveId, sections: &[Section]) -> Result<&mut Slave, SimError> {
        // the broadcast id always counts as taken
        if id.is_broadcast() || self.contains(id) {
            return Err(SimError::DuplicateSlave(id));
        }

        let mut slave = Slave::new(id);
        for section in sections {
            slave.add_block(
                &section.label,
                section.register_type,
                section.start_address,
                section.count,
            )?;
        }

        tracing::info!("added slave {} with {} section(s)", id, sections.len());
        self.slaves.push(slave);
        let index = self.slaves.len() - 1;
        Ok(&mut self.slaves[index])
    }

    /// Remove a slave and all of its blocks
    pub fn remove_slave(&mut self, id: SlaveId) -> Result<Slave, SimError> {
        let index = self.index_of(id)?;
        Ok(self.slaves.remove(index))
    }

    /// Look up a slave
    pub fn get_slave(&self, id: SlaveId) -> Result<&Slave, SimError> {
        self.slaves
            .iter()
            .find(|s| s.id() == id)
            .ok_or(SimError::SlaveNotFound(id))
    }

    /// Look up a slave for modification
    pub fn get_slave_mut(&mut self, id: SlaveId) -> Result<&mut Slave, SimError> {
        self.slaves
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or(SimError::SlaveNotFound(id))
    }

    /// Returns true if a slave with this id exists
    pub fn contains(&self, id: SlaveId) -> bool {
        self.slaves.iter().any(|s| s.id() == id)
    }

    /// Ids of every slave in insertion order
    pub fn list_slave_ids(&self) -> Vec<SlaveId> {
        self.slaves.iter().map(Slave::id).collect()
    }

    /// Slaves in insertion order
    pub fn slaves(&self) -> impl Iterator<Item = &Slave> {
        self.slaves.iter()
    }

    pub(crate) fn slaves_mut(&mut self) -> impl Iterator<Item = &mut Slave> {
        self.slaves.iter_mut()
    }

    /// Remove every slave
    pub fn clear(&mut self) {
        self.slaves.clear();
    }

    /// Number of slaves
    pub fn len(&self) -> usize {
        self.slaves.len()
    }

    /// Returns true if there are no slaves
    pub fn is_empty(&self) -> bool {
        self.slaves.is_empty()
    }

    fn index_of(&self, id: SlaveId) -> Result<usize, SimError> {
        self.slaves
            .iter()
            .position(|s| s.id() == id)
            .ok_or(SimError::SlaveNotFound(id))
    }
}

/// Registry shared between serving loops and management callers
#[derive(Clone, Debug, Default)]
pub struct SharedRegistry {
    inner: Arc<Mutex<SlaveRegistry>>,
}

impl SharedRegistry {
    /// Wrap a registry for sharing
    pub fn new(registry: SlaveRegistry) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    /// Acquire the registry lock
    ///
    /// A poisoned lock is recovered: blocks validate before they mutate, so a
    /// panicking holder cannot leave a half-applied register write behind.
    pub fn lock(&self) -> MutexGuard<'_, SlaveRegistry> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl From<SlaveRegistry> for SharedRegistry {
    fn from(registry: SlaveRegistry) -> Self {
        Self::new(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RegisterType;

    fn sections() -> Vec<Section> {
        vec![
            Section::new("holding", RegisterType::HoldingRegister, 40001, 10),
            Section::new("input", RegisterType::InputRegister, 30001, 10),
        ]
    }

    #[test]
    fn lists_slaves_in_insertion_order() {
        let mut registry = SlaveRegistry::new();
        for id in [7, 2, 9] {
            registry.add_slave(SlaveId::new(id), &sections()).unwrap();
        }
        assert_eq!(
            registry.list_slave_ids(),
            vec![SlaveId::new(7), SlaveId::new(2), SlaveId::new(9)]
        );
    }

    #[test]
    fn rejects_duplicate_and_broadcast_ids() {
        let mut registry = SlaveRegistry::new();
        registry.add_slave(SlaveId::new(1), &[]).unwrap();
        assert_eq!(
            registry.add_slave(SlaveId::new(1), &[]).err(),
            Some(SimError::DuplicateSlave(SlaveId::new(1)))
        );
        assert_eq!(
            registry.add_slave(SlaveId::broadcast(), &[]).err(),
            Some(SimError::DuplicateSlave(SlaveId::broadcast()))
        );
    }

    #[test]
    fn failed_section_leaves_registry_unchanged() {
        let mut registry = SlaveRegistry::new();
        let bad = vec![
            Section::new("a", RegisterType::HoldingRegister, 0, 10),
            Section::new("a", RegisterType::InputRegister, 0, 10),
        ];
        assert!(registry.add_slave(SlaveId::new(3), &bad).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_and_lookup_unknown_slaves() {
        let mut registry = SlaveRegistry::new();
        registry.add_slave(SlaveId::new(4), &sections()).unwrap();
        registry.remove_slave(SlaveId::new(4)).unwrap();
        assert_eq!(
            registry.get_slave(SlaveId::new(4)).err(),
            Some(SimError::SlaveNotFound(SlaveId::new(4)))
        );
        assert!(registry.remove_slave(SlaveId::new(4)).is_err());
    }

    #[test]
    fn shared_registry_sees_changes_from_clones() {
        let shared = SharedRegistry::default();
        let other = shared.clone();
        shared.lock().add_slave(SlaveId::new(1), &[]).unwrap();
        assert_eq!(other.lock().len(), 1);
    }
}
