use crate::core::catalog::TypeEntry;
use crate::core::command_set::CommandSet;
use crate::core::key_template::KeyTemplate;
use crate::core::proxy::{Accessor, KeyState, Proxy, ProxyBuilder};
use crate::domain::model::{KeyParams, ModelSpec, ModelType};
use crate::domain::ports::StoreClient;
use crate::utils::error::{KeyError, Result};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// A registered model: type, key template, effective commands and the
/// accessor descriptor built for it. Immutable once created.
#[derive(Debug)]
pub struct ModelDefinition {
    name: String,
    model_type: ModelType,
    template: KeyTemplate,
    commands: CommandSet,
    spec: ModelSpec,
    proxy: Arc<Proxy>,
}

impl ModelDefinition {
    /// Build a definition from a type entry. `pattern` is the key pattern to
    /// parse, which may differ from `spec.key` when a partition is applied.
    pub fn build(name: &str, entry: &TypeEntry, pattern: &str, spec: ModelSpec) -> Result<Self> {
        let template = KeyTemplate::parse(pattern);
        let commands = CommandSet::compute(
            entry.commands(),
            spec.allowed_commands.as_deref(),
            spec.disabled_commands.as_deref(),
        );

        let mut builder = ProxyBuilder::new(name, &commands);
        if let Some(hook) = entry.hook() {
            hook(&spec, &mut builder)?;
        }

        Ok(Self {
            name: name.to_string(),
            model_type: entry.model_type().clone(),
            template,
            commands,
            spec,
            proxy: Arc::new(builder.build()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model_type(&self) -> &ModelType {
        &self.model_type
    }

    pub fn template(&self) -> &KeyTemplate {
        &self.template
    }

    pub fn commands(&self) -> &CommandSet {
        &self.commands
    }

    /// The definition exactly as it was registered.
    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.spec.metadata
    }

    pub fn proxy(&self) -> &Arc<Proxy> {
        &self.proxy
    }

    pub fn key(&self, params: impl Into<KeyParams>) -> std::result::Result<String, KeyError> {
        self.template.render(&params.into())
    }

    /// Bind an accessor. Never fails: a key that cannot be rendered is kept
    /// on the accessor and reported by its first command.
    pub fn bind(&self, client: Option<Arc<dyn StoreClient>>, params: impl Into<KeyParams>) -> Accessor {
        let state = match self.template.render(&params.into()) {
            Ok(key) => KeyState::Ready(key),
            Err(err) => {
                tracing::debug!("{}: deferring key error: {}", self.name, err);
                KeyState::Failed(err)
            }
        };
        Accessor::new(Arc::clone(&self.proxy), client, state)
    }
}

/// A registered model paired with the registry's store client.
#[derive(Clone)]
pub struct Model {
    definition: Arc<ModelDefinition>,
    client: Option<Arc<dyn StoreClient>>,
}

impl Model {
    pub fn new(definition: Arc<ModelDefinition>, client: Option<Arc<dyn StoreClient>>) -> Self {
        Self { definition, client }
    }

    pub fn definition(&self) -> &ModelDefinition {
        &self.definition
    }

    pub fn key(&self, params: impl Into<KeyParams>) -> std::result::Result<String, KeyError> {
        self.definition.key(params)
    }

    pub fn get(&self, params: impl Into<KeyParams>) -> Accessor {
        self.definition.bind(self.client.clone(), params)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("definition", &self.definition.name())
            .field("client", &self.client.is_some())
            .finish()
    }
}
