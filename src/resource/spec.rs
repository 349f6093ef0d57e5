//! Resource definitions and typed handles.

use std::fmt;
use std::marker::PhantomData;

/// Produces the live value of a resource.
pub type Factory<T> = Box<dyn FnMut() -> anyhow::Result<T>>;

/// Cleanup invoked on deletion. Receives the live value, or `None` for a
/// resource registered without a factory.
pub type Release<T> = Box<dyn FnMut(Option<T>) -> anyhow::Result<()>>;

/// A registered fixture definition.
pub struct ResourceSpec<T> {
    name: String,
    dependencies: Vec<String>,
    default_value: Option<T>,
    create: Option<Factory<T>>,
    release: Option<Release<T>>,
}

impl<T> ResourceSpec<T> {
    /// Create a marker resource: no value, no dependencies, no cleanup.
    pub fn new(name: impl Into<String>) -> Self {
        ResourceSpec {
            name: name.into(),
            dependencies: Vec::new(),
            default_value: None,
            create: None,
            release: None,
        }
    }

    /// Add a resource that must be created before this one.
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.dependencies.contains(&name) {
            self.dependencies.push(name);
        }
        self
    }

    /// Add several dependencies, keeping their order.
    pub fn with_dependencies<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().fold(self, |spec, name| spec.depends_on(name))
    }

    /// Value returned by `get` while the resource is not created.
    pub fn with_default(mut self, value: T) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Set the factory producing the live value.
    pub fn with_create<F>(mut self, create: F) -> Self
    where
        F: FnMut() -> anyhow::Result<T> + 'static,
    {
        self.create = Some(Box::new(create));
        self
    }

    /// Set the cleanup callback run on deletion.
    pub fn with_release<F>(mut self, release: F) -> Self
    where
        F: FnMut(Option<T>) -> anyhow::Result<()> + 'static,
    {
        self.release = Some(Box::new(release));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn default_value(&self) -> Option<&T> {
        self.default_value.as_ref()
    }

    pub fn has_create(&self) -> bool {
        self.create.is_some()
    }

    pub fn has_release(&self) -> bool {
        self.release.is_some()
    }

    /// Run the factory outside of any manager, e.g. after the spec was
    /// removed. Returns `None` for marker resources.
    pub fn create_value(&mut self) -> Option<anyhow::Result<T>> {
        self.create.as_mut().map(|create| create())
    }

    /// Run the cleanup callback outside of any manager.
    pub fn release_value(&mut self, value: Option<T>) -> anyhow::Result<()> {
        match self.release.as_mut() {
            Some(release) => release(value),
            None => Ok(()),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ResourceSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSpec")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("default_value", &self.default_value)
            .field("create", &self.create.is_some())
            .field("release", &self.release.is_some())
            .finish()
    }
}

/// Typed handle returned by `ResourceManager::register`, used to read the
/// value back without casts at the call site.
pub struct ResourceKey<T> {
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ResourceKey<T> {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        ResourceKey {
            name: name.into(),
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Clone for ResourceKey<T> {
    fn clone(&self) -> Self {
        ResourceKey::new(self.name.clone())
    }
}

impl<T> fmt::Debug for ResourceKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourceKey").field(&self.name).finish()
    }
}

impl<T> AsRef<str> for ResourceKey<T> {
    fn as_ref(&self) -> &str {
        &self.name
    }
}
