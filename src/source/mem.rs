use super::{DefinitionSource, Resource, ResourceStore};
use crate::definition::RawDefinition;
use crate::error::{Error, Result};

use async_trait::async_trait;
use parking_lot::RwLock;

use std::collections::HashMap;

/// A source that keeps all definitions and resources in memory.
///
/// Entries are split into the backing data and a load cache. Replacing a
/// backing entry has no effect until the cached copy is invalidated, the
/// same way editing a file on disk has no effect on an already loaded
/// module.
#[derive(Debug)]
pub struct MemorySource {
    definitions: RwLock<HashMap<String, RawDefinition>>,
    resources: RwLock<HashMap<String, String>>,
    definition_cache: RwLock<HashMap<String, RawDefinition>>,
    resource_cache: RwLock<HashMap<String, Resource>>,
    marker: String,
}

impl MemorySource {
    pub fn new<T>(marker: T) -> Self
    where
        T: ToString,
    {
        Self {
            definitions: RwLock::default(),
            resources: RwLock::default(),
            definition_cache: RwLock::default(),
            resource_cache: RwLock::default(),
            marker: marker.to_string(),
        }
    }

    /// Inserts or replaces the backing definition at `locator`.
    pub fn insert_definition<T>(&self, locator: T, def: RawDefinition)
    where
        T: ToString,
    {
        self.definitions.write().insert(locator.to_string(), def);
    }

    /// Inserts or replaces the backing resource at `locator`.
    pub fn insert_resource<L, C>(&self, locator: L, content: C)
    where
        L: ToString,
        C: ToString,
    {
        self.resources
            .write()
            .insert(locator.to_string(), content.to_string());
    }

    pub fn remove_resource(&self, locator: &str) {
        self.resources.write().remove(locator);
    }

    pub fn is_cached(&self, locator: &str) -> bool {
        self.definition_cache.read().contains_key(locator)
    }

    pub fn is_resource_cached(&self, locator: &str) -> bool {
        self.resource_cache.read().contains_key(locator)
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new("#!delete")
    }
}

#[async_trait]
impl DefinitionSource for MemorySource {
    async fn fetch(&self, locator: &str) -> Result<RawDefinition> {
        let cached = self.definition_cache.read().get(locator).cloned();
        if let Some(def) = cached {
            return Ok(def);
        }

        let mut def = self
            .definitions
            .read()
            .get(locator)
            .cloned()
            .ok_or_else(|| Error::NotFound(locator.to_owned()))?;
        def.source = Some(locator.to_owned());

        self.definition_cache
            .write()
            .insert(locator.to_owned(), def.clone());

        Ok(def)
    }

    fn invalidate(&self, locator: &str) {
        self.definition_cache.write().remove(locator);
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut locators: Vec<String> = self.definitions.read().keys().cloned().collect();
        locators.sort();

        Ok(locators)
    }
}

#[async_trait]
impl ResourceStore for MemorySource {
    async fn exists(&self, locator: &str) -> bool {
        self.resources.read().contains_key(locator)
    }

    async fn fetch(&self, locator: &str) -> Result<Resource> {
        let cached = self.resource_cache.read().get(locator).cloned();
        if let Some(resource) = cached {
            return Ok(resource);
        }

        let content = self
            .resources
            .read()
            .get(locator)
            .cloned()
            .ok_or_else(|| Error::NotFound(locator.to_owned()))?;

        let resource = Resource::new(locator, content, &self.marker);
        self.resource_cache
            .write()
            .insert(locator.to_owned(), resource.clone());

        Ok(resource)
    }

    fn invalidate(&self, locator: &str) {
        self.resource_cache.write().remove(locator);
    }

    async fn list_resources(&self, owner: &str) -> Result<Option<Vec<String>>> {
        let prefix = format!("{}/", owner);

        let mut locators: Vec<String> = self
            .resources
            .read()
            .keys()
            .filter(|locator| locator.starts_with(&prefix))
            .cloned()
            .collect();

        if locators.is_empty() {
            return Ok(None);
        }

        locators.sort();
        Ok(Some(locators))
    }
}
