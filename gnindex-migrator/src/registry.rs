use std::collections::BTreeMap;

use gnindex_store::MigrationId;

use crate::{
    error::{MigrateError, Result},
    unit::MigrationUnit,
};

/// Migration units keyed, and therefore ordered, by id.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    units: BTreeMap<MigrationId, MigrationUnit>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry, failing on the first duplicate id.
    pub fn from_units<I>(units: I) -> Result<Self>
    where
        I: IntoIterator<Item = MigrationUnit>,
    {
        let mut registry = Self::new();

        for unit in units {
            registry.register(unit)?;
        }

        Ok(registry)
    }

    pub fn register(&mut self, unit: MigrationUnit) -> Result<()> {
        if self.units.contains_key(&unit.id) {
            return Err(MigrateError::DuplicateId(unit.id));
        }

        self.units.insert(unit.id, unit);

        Ok(())
    }

    /// Units ascending by id.
    pub fn ordered(&self) -> impl DoubleEndedIterator<Item = &MigrationUnit> {
        self.units.values()
    }

    pub fn get(&self, id: MigrationId) -> Result<&MigrationUnit> {
        self.units.get(&id).ok_or(MigrateError::NotFound(id))
    }

    pub fn contains(&self, id: MigrationId) -> bool {
        self.units.contains_key(&id)
    }

    pub fn ids(&self) -> Vec<MigrationId> {
        self.units.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use gnindex_schema::Operation;

    use super::*;

    fn unit(id: i64) -> MigrationUnit {
        MigrationUnit::new(MigrationId(id), format!("unit {id}"), Operation::new())
    }

    #[test]
    fn ordered_by_id_not_by_registration() {
        let registry = Registry::from_units([unit(1003), unit(1001), unit(1002)]).unwrap();

        assert_eq!(
            registry.ordered().map(|u| u.id).collect::<Vec<_>>(),
            vec![MigrationId(1001), MigrationId(1002), MigrationId(1003)]
        );
        assert_eq!(registry.ids(), registry.ordered().map(|u| u.id).collect::<Vec<_>>());
    }

    #[test]
    fn duplicate_id() {
        let mut registry = Registry::new();
        registry.register(unit(1001)).unwrap();

        assert!(matches!(
            registry.register(unit(1001)),
            Err(MigrateError::DuplicateId(MigrationId(1001)))
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn missing_unit() {
        let registry = Registry::new();

        assert!(registry.is_empty());
        assert!(matches!(
            registry.get(MigrationId(42)),
            Err(MigrateError::NotFound(MigrationId(42)))
        ));
    }
}
