use crate::core::catalog::{CustomizeProxy, TypeCatalog, TypeDefinition, TypeEntry};
use crate::core::model::{Model, ModelDefinition};
use crate::domain::model::ModelSpec;
use crate::domain::ports::StoreClient;
use crate::utils::error::{KeeperError, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Catalog of storage types and named models.
///
/// Registration takes `&mut self`, so writers are serialized by construction.
/// Once populated the registry can be shared (e.g. behind an `Arc`) and read
/// concurrently; definitions are immutable after insertion.
pub struct ModelRegistry {
    client: Option<Arc<dyn StoreClient>>,
    partition: Option<String>,
    types: TypeCatalog,
    models: HashMap<String, Arc<ModelDefinition>>,
}

impl ModelRegistry {
    /// A registry with the built-in types and no store client yet.
    pub fn new() -> Self {
        Self {
            client: None,
            partition: None,
            types: TypeCatalog::builtin(),
            models: HashMap::new(),
        }
    }

    pub fn with_client(client: Arc<dyn StoreClient>) -> Self {
        let mut registry = Self::new();
        registry.client = Some(client);
        registry
    }

    /// Prefix every key pattern registered from now on with `<partition>:`.
    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    pub fn set_client(&mut self, client: Arc<dyn StoreClient>) {
        self.client = Some(client);
    }

    pub fn client(&self) -> Option<&Arc<dyn StoreClient>> {
        self.client.as_ref()
    }

    pub fn partition(&self) -> Option<&str> {
        self.partition.as_deref()
    }

    /// Register a storage type. The name is normalized (`sortedSet` becomes
    /// `SORTED_SET`) and the generic commands are prepended to `commands`.
    ///
    /// Redefining an existing name replaces it for every model created
    /// afterwards; models already created keep the entry they were built from.
    pub fn define_type<S: AsRef<str>>(
        &mut self,
        name: &str,
        commands: &[S],
        hook: Option<CustomizeProxy>,
    ) -> &TypeEntry {
        let (entry, replaced) = self.types.define(TypeEntry::new(name, commands, hook));
        if replaced {
            tracing::warn!("type {} redefined", entry.name());
        } else {
            tracing::debug!("type {} defined with {} commands", entry.name(), entry.commands().len());
        }
        entry
    }

    /// Register several types in order and return their canonical names.
    pub fn define_types<I>(&mut self, definitions: I) -> Vec<String>
    where
        I: IntoIterator<Item = TypeDefinition>,
    {
        definitions
            .into_iter()
            .map(|def| {
                self.define_type(&def.name, def.commands.as_slice(), def.hook)
                    .name()
                    .to_string()
            })
            .collect()
    }

    pub fn model_type(&self, name: &str) -> Option<&TypeEntry> {
        self.types.get(name)
    }

    pub fn model_types(&self) -> Vec<&str> {
        self.types.names()
    }

    /// Register a named model.
    ///
    /// Fails with `DuplicateModelName` if the name is taken (the existing
    /// model is untouched) and with `UnknownModelType` if the type was never
    /// defined.
    pub fn create_model(&mut self, name: &str, spec: ModelSpec) -> Result<Arc<ModelDefinition>> {
        if self.models.contains_key(name) {
            return Err(KeeperError::DuplicateModelName {
                name: name.to_string(),
            });
        }

        let entry = self
            .types
            .get(&spec.model_type)
            .ok_or_else(|| KeeperError::UnknownModelType {
                name: name.to_string(),
                type_name: spec.model_type.clone(),
            })?;

        let pattern = match &self.partition {
            Some(partition) => format!("{}:{}", partition, spec.key),
            None => spec.key.clone(),
        };

        let definition = Arc::new(ModelDefinition::build(name, entry, &pattern, spec)?);
        tracing::debug!(
            "model {} registered: type={}, key={}, {} commands",
            name,
            definition.model_type(),
            definition.template().raw(),
            definition.commands().len()
        );

        self.models.insert(name.to_string(), Arc::clone(&definition));
        Ok(definition)
    }

    /// Register models in iteration order. Stops at the first failure;
    /// models registered before it stay registered.
    pub fn create_models<I, N>(&mut self, definitions: I) -> Result<Vec<Arc<ModelDefinition>>>
    where
        I: IntoIterator<Item = (N, ModelSpec)>,
        N: AsRef<str>,
    {
        definitions
            .into_iter()
            .map(|(name, spec)| self.create_model(name.as_ref(), spec))
            .collect()
    }

    pub fn definition(&self, name: &str) -> Option<&Arc<ModelDefinition>> {
        self.models.get(name)
    }

    /// Look up a model paired with the current store client.
    pub fn model(&self, name: &str) -> Option<Model> {
        self.models
            .get(name)
            .map(|definition| Model::new(Arc::clone(definition), self.client.clone()))
    }

    pub fn model_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.models.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("client", &self.client.is_some())
            .field("partition", &self.partition)
            .field("types", &self.types.names())
            .field("models", &self.model_names())
            .finish()
    }
}
