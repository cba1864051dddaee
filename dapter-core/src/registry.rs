//! Keyed plugin registries.
//!
//! [`KeyedRegistry`] is the one registry algorithm in the workspace: validate
//! the plugin's key, store it last-write-wins, resolve it or fail with
//! `AdapterNotFoundError`. Format adapters, async format adapters and the
//! migration plugin families all instantiate it.
//!
//! [`RegistryTable`] scopes registries per record type, keyed by `TypeId`,
//! with explicit lineage for types that should resolve through another
//! type's registrations.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{AdapterError, AdapterResult};
use crate::record::Record;

/// A plugin family that can be stored in a [`KeyedRegistry`].
///
/// Implemented on the trait-object type of each family, e.g. `dyn Adapter`.
pub trait Registrable: Send + Sync {
    /// Capitalized label used in diagnostics, e.g. "Migration adapter".
    const LABEL: &'static str;
    /// Name of the identifying attribute, e.g. "obj_key".
    const KEY_NAME: &'static str;

    fn registry_key(&self) -> &str;

    fn plugin_name(&self) -> &str;
}

/// Identifier → plugin map with last-write-wins registration.
pub struct KeyedRegistry<P: ?Sized + Registrable> {
    entries: HashMap<String, Arc<P>>,
}

impl<P: ?Sized + Registrable> KeyedRegistry<P> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Check that a plugin carries a usable key.
    pub fn validate(plugin: &P) -> AdapterResult<()> {
        if plugin.registry_key().trim().is_empty() {
            return Err(AdapterError::configuration(format!(
                "{} must define '{}'",
                P::LABEL,
                P::KEY_NAME
            ))
            .with("adapter", plugin.plugin_name()));
        }
        Ok(())
    }

    /// Store `plugin` under its key, replacing any previous registration.
    pub fn register(&mut self, plugin: Arc<P>) -> AdapterResult<()> {
        Self::validate(&plugin)?;
        let key = plugin.registry_key().to_owned();
        let name = plugin.plugin_name().to_owned();
        match self.entries.insert(key.clone(), plugin) {
            Some(previous) => debug!(
                key = %key,
                previous = previous.plugin_name(),
                replacement = %name,
                "{} re-registered",
                P::LABEL
            ),
            None => debug!(key = %key, plugin = %name, "{} registered", P::LABEL),
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> AdapterResult<Arc<P>> {
        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| Self::not_found(key, self.keys()))
    }

    pub(crate) fn not_found(key: &str, available: Vec<String>) -> AdapterError {
        AdapterError::not_found(format!(
            "No {} registered for '{key}'",
            P::LABEL.to_lowercase()
        ))
        .with(P::KEY_NAME, key)
        .with("available", available)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<P>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<P: ?Sized + Registrable> Default for KeyedRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ?Sized + Registrable> Clone for KeyedRegistry<P> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<P: ?Sized + Registrable> fmt::Debug for KeyedRegistry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedRegistry")
            .field("label", &P::LABEL)
            .field("keys", &self.keys())
            .finish()
    }
}

/// Per-record-type registries.
///
/// Owned by whatever context initializes the application; registration
/// takes `&mut self`, so it completes before the table is shared for
/// dispatch.
pub struct RegistryTable<P: ?Sized + Registrable> {
    registries: HashMap<TypeId, KeyedRegistry<P>>,
    parents: HashMap<TypeId, TypeId>,
}

impl<P: ?Sized + Registrable> RegistryTable<P> {
    pub fn new() -> Self {
        Self {
            registries: HashMap::new(),
            parents: HashMap::new(),
        }
    }

    /// Let `Child` resolve through `Parent`'s registrations.
    ///
    /// `Child` sees `Parent`'s plugins until it registers one of its own; at
    /// that point it receives a snapshot of what it could resolve and diverges
    /// from `Parent` from then on. `Parent` is never modified through `Child`.
    pub fn inherit<Child: Record, Parent: Record>(&mut self) -> AdapterResult<()> {
        let child = TypeId::of::<Child>();
        let parent = TypeId::of::<Parent>();
        if self.lineage(parent).any(|id| id == child) {
            return Err(AdapterError::configuration(format!(
                "{} cannot inherit registrations from {}: lineage would form a cycle",
                Child::record_name(),
                Parent::record_name()
            ))
            .with("record_type", Child::record_name())
            .with("parent", Parent::record_name()));
        }
        self.parents.insert(child, parent);
        debug!(
            record_type = Child::record_name(),
            parent = Parent::record_name(),
            "record type inherits registrations"
        );
        Ok(())
    }

    fn lineage(&self, start: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        std::iter::successors(Some(start), move |id| self.parents.get(id).copied())
    }

    fn resolve(&self, id: TypeId) -> Option<&KeyedRegistry<P>> {
        self.lineage(id).find_map(|id| self.registries.get(&id))
    }

    /// The registry `T` resolves through: its own, or the nearest ancestor's.
    pub fn registry<T: Record>(&self) -> Option<&KeyedRegistry<P>> {
        self.resolve(TypeId::of::<T>())
    }

    pub fn register<T: Record>(&mut self, plugin: Arc<P>) -> AdapterResult<()> {
        KeyedRegistry::<P>::validate(&plugin)?;
        let id = TypeId::of::<T>();
        if !self.registries.contains_key(&id) {
            let inherited = self.resolve(id).cloned().unwrap_or_default();
            if !inherited.is_empty() {
                debug!(
                    record_type = T::record_name(),
                    inherited = inherited.len(),
                    "copying inherited registrations"
                );
            }
            self.registries.insert(id, inherited);
        }
        self.registries.entry(id).or_default().register(plugin)
    }

    pub fn get<T: Record>(&self, key: &str) -> AdapterResult<Arc<P>> {
        let found = match self.registry::<T>() {
            Some(registry) => registry.get(key),
            None => Err(KeyedRegistry::<P>::not_found(key, Vec::new())),
        };
        found.map_err(|e| e.with("record_type", T::record_name()))
    }

    /// Keys `T` can resolve, sorted.
    pub fn keys<T: Record>(&self) -> Vec<String> {
        self.registry::<T>().map(KeyedRegistry::keys).unwrap_or_default()
    }

    /// Drop `T`'s own registrations and lineage.
    pub fn remove<T: Record>(&mut self) -> Option<KeyedRegistry<P>> {
        let id = TypeId::of::<T>();
        self.parents.remove(&id);
        self.registries.remove(&id)
    }

    pub fn clear(&mut self) {
        self.registries.clear();
        self.parents.clear();
    }
}

impl<P: ?Sized + Registrable> Default for RegistryTable<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ?Sized + Registrable> fmt::Debug for RegistryTable<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryTable")
            .field("label", &P::LABEL)
            .field("record_types", &self.registries.len())
            .field("lineage", &self.parents.len())
            .finish()
    }
}
