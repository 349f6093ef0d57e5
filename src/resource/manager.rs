//! Suite-scoped resource table.

use std::any::{Any, type_name};

use tracing::{debug, warn};

use crate::{SuiteError, SuiteResult};

use super::spec::{ResourceKey, ResourceSpec};

/// Type-erased view of a registered spec plus its live value.
trait Slot {
    fn create(&mut self) -> anyhow::Result<()>;
    fn release(&mut self) -> anyhow::Result<()>;
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

struct TypedSlot<T> {
    spec: ResourceSpec<T>,
    value: Option<T>,
}

impl<T: 'static> Slot for TypedSlot<T> {
    fn create(&mut self) -> anyhow::Result<()> {
        self.value = match self.spec.create_value() {
            Some(value) => Some(value?),
            None => None,
        };
        Ok(())
    }

    fn release(&mut self) -> anyhow::Result<()> {
        let value = self.value.take();
        self.spec.release_value(value)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

struct Entry {
    name: String,
    dependencies: Vec<String>,
    slot: Box<dyn Slot>,
}

/// Owns every registered resource of one suite instance.
///
/// Two orders are tracked: registration order, which drives `create_many`,
/// and creation order, a stack unwound by `delete_all`. Whenever a resource is
/// created, every resource in its dependency closure is created as well.
#[derive(Default)]
pub struct ResourceManager {
    entries: Vec<Entry>,
    created: Vec<String>,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_of(&self, name: &str) -> SuiteResult<usize> {
        self.entries
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| SuiteError::UnknownResource(name.to_string()))
    }

    fn created_contains(&self, name: &str) -> bool {
        self.created.iter().any(|n| n == name)
    }

    /// Register a resource. Names are unique within the manager.
    pub fn register<T: 'static>(&mut self, spec: ResourceSpec<T>) -> SuiteResult<ResourceKey<T>> {
        if self.entries.iter().any(|e| e.name == spec.name()) {
            return Err(SuiteError::DuplicateResource(spec.name().to_string()));
        }
        let key = ResourceKey::new(spec.name());
        debug!(resource = spec.name(), dependencies = ?spec.dependencies(), "registered resource");
        self.entries.push(Entry {
            name: spec.name().to_string(),
            dependencies: spec.dependencies().to_vec(),
            slot: Box::new(TypedSlot { spec, value: None }),
        });
        Ok(key)
    }

    /// Remove a resource that is not currently created and hand its spec back.
    pub fn remove<T: 'static>(&mut self, key: &ResourceKey<T>) -> SuiteResult<ResourceSpec<T>> {
        let index = self.index_of(key.name())?;
        if self.created_contains(key.name()) {
            return Err(SuiteError::ResourceInUse {
                names: vec![key.name().to_string()],
            });
        }
        if !self.entries[index].slot.as_any().is::<TypedSlot<T>>() {
            return Err(SuiteError::ResourceTypeMismatch {
                name: key.name().to_string(),
                expected: type_name::<T>(),
            });
        }
        let entry = self.entries.remove(index);
        debug!(resource = key.name(), "removed resource");
        entry
            .slot
            .into_any()
            .downcast::<TypedSlot<T>>()
            .map(|slot| slot.spec)
            .map_err(|_| SuiteError::ResourceTypeMismatch {
                name: key.name().to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Remove every registered resource, newest registration first.
    pub fn remove_all(&mut self) -> SuiteResult<()> {
        if !self.created.is_empty() {
            return Err(SuiteError::ResourceInUse {
                names: self.created.clone(),
            });
        }
        while let Some(entry) = self.entries.pop() {
            debug!(resource = %entry.name, "removed resource");
        }
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn is_created(&self, name: &str) -> SuiteResult<bool> {
        self.index_of(name)?;
        Ok(self.created_contains(name))
    }

    /// The live value if created, else the default value.
    pub fn get<T: 'static>(&self, key: &ResourceKey<T>) -> SuiteResult<&T> {
        let name = key.name();
        let index = self.index_of(name)?;
        let slot = self.entries[index]
            .slot
            .as_any()
            .downcast_ref::<TypedSlot<T>>()
            .ok_or_else(|| SuiteError::ResourceTypeMismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
            })?;

        let created = self.created_contains(name);
        if created {
            if let Some(value) = slot.value.as_ref() {
                return Ok(value);
            }
        }
        match slot.spec.default_value() {
            Some(value) => Ok(value),
            None if created => Err(SuiteError::NoValue(name.to_string())),
            None => Err(SuiteError::ResourceNotCreated(name.to_string())),
        }
    }

    /// Create a resource after its dependencies. Dependencies that already
    /// exist are left untouched.
    pub fn create(&mut self, name: &str, throw_if_exists: bool) -> SuiteResult<()> {
        if self.is_created(name)? {
            if throw_if_exists {
                return Err(SuiteError::AlreadyCreated(name.to_string()));
            }
            return Ok(());
        }
        self.check_cycle(name, &mut Vec::new())?;
        self.create_after_dependencies(name)
    }

    /// Walk the not yet created part of the dependency graph below `name`.
    /// Keeps no state, so a factory that panics cannot leave a stale path.
    fn check_cycle<'a>(&'a self, name: &'a str, path: &mut Vec<&'a str>) -> SuiteResult<()> {
        if path.contains(&name) {
            return Err(SuiteError::DependencyCycle(name.to_string()));
        }
        let Some(entry) = self.entries.iter().find(|e| e.name == name) else {
            return Ok(());
        };
        if self.created_contains(name) {
            return Ok(());
        }
        path.push(name);
        for dependency in &entry.dependencies {
            self.check_cycle(dependency, path)?;
        }
        path.pop();
        Ok(())
    }

    fn create_after_dependencies(&mut self, name: &str) -> SuiteResult<()> {
        let dependencies = self.entries[self.index_of(name)?].dependencies.clone();
        for dependency in &dependencies {
            if !self.is_created(dependency)? {
                self.create_after_dependencies(dependency)?;
            }
        }

        let index = self.index_of(name)?;
        self.entries[index].slot.create()?;
        self.created.push(name.to_string());
        debug!(resource = name, "created resource");
        Ok(())
    }

    /// Create several resources in registration order, whatever order the
    /// names are given in. Nothing is created if any name is unknown.
    pub fn create_many<S: AsRef<str>>(&mut self, names: &[S], throw_if_exists: bool) -> SuiteResult<()> {
        for name in names {
            self.index_of(name.as_ref())?;
        }
        let ordered: Vec<String> = self
            .entries
            .iter()
            .filter(|e| names.iter().any(|n| n.as_ref() == e.name))
            .map(|e| e.name.clone())
            .collect();
        for name in &ordered {
            self.create(name, throw_if_exists)?;
        }
        Ok(())
    }

    /// Delete a created resource. A failing release callback still leaves the
    /// resource deleted.
    ///
    /// Refused with `ResourceInUse` while a created resource depends on it, so
    /// every created resource keeps its dependencies alive. Delete the
    /// dependents first, or use `delete_all`, which unwinds creation order.
    pub fn delete(&mut self, name: &str) -> SuiteResult<()> {
        let index = self.index_of(name)?;
        if !self.created_contains(name) {
            return Err(SuiteError::ResourceNotCreated(name.to_string()));
        }

        let dependents: Vec<String> = self
            .created
            .iter()
            .filter(|c| {
                self.entries
                    .iter()
                    .any(|e| &e.name == *c && e.dependencies.iter().any(|d| d == name))
            })
            .cloned()
            .collect();
        if !dependents.is_empty() {
            return Err(SuiteError::ResourceInUse { names: dependents });
        }

        self.created.retain(|n| n != name);
        debug!(resource = name, "deleted resource");
        self.entries[index].slot.release()?;
        Ok(())
    }

    /// Delete every created resource, most recently created first. All
    /// resources are deleted even if some release callbacks fail; the first
    /// failure is returned.
    pub fn delete_all(&mut self) -> SuiteResult<()> {
        let order: Vec<String> = self.created.iter().rev().cloned().collect();
        let mut first_error = None;
        for name in order {
            if let Err(e) = self.delete(&name) {
                warn!(resource = %name, error = %e, "failed to delete resource");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Created names in creation order.
    pub fn created(&self) -> &[String] {
        &self.created
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
