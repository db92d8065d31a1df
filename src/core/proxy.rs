use crate::core::command_set::CommandSet;
use crate::domain::ports::StoreClient;
use crate::utils::error::{KeeperError, KeyError, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// In-progress accessor descriptor handed to a type's customization hook.
#[derive(Debug)]
pub struct ProxyBuilder {
    model: String,
    commands: Vec<String>,
    fields: Option<Map<String, Value>>,
    attributes: Map<String, Value>,
}

impl ProxyBuilder {
    pub fn new(model: impl Into<String>, commands: &CommandSet) -> Self {
        Self {
            model: model.into(),
            commands: commands.commands().to_vec(),
            fields: None,
            attributes: Map::new(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Field-name map exposed on every accessor (used by HASH models).
    pub fn set_fields(&mut self, fields: Map<String, Value>) -> &mut Self {
        self.fields = Some(fields);
        self
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn build(self) -> Proxy {
        let mut methods = HashMap::with_capacity(self.commands.len() * 2);
        let mut commands = Vec::with_capacity(self.commands.len());
        for command in self.commands {
            let handle: Arc<str> = Arc::from(command.as_str());
            methods.insert(command.to_ascii_uppercase(), Arc::clone(&handle));
            methods.insert(command, Arc::clone(&handle));
            commands.push(handle);
        }

        Proxy {
            model: self.model,
            commands,
            methods,
            fields: self.fields,
            attributes: self.attributes,
        }
    }
}

/// The accessor "class" of a model: the method table every bound accessor
/// dispatches through. Each command is reachable by its lowercase name and
/// an uppercase alias, both pointing at the same entry.
#[derive(Debug)]
pub struct Proxy {
    model: String,
    commands: Vec<Arc<str>>,
    methods: HashMap<String, Arc<str>>,
    fields: Option<Map<String, Value>>,
    attributes: Map<String, Value>,
}

impl Proxy {
    pub fn model_name(&self) -> &str {
        &self.model
    }

    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(|c| c.as_ref())
    }

    /// Look up a command by name, ignoring ASCII case like
    /// [`CommandSet::contains`].
    pub fn resolve(&self, method: &str) -> Option<&Arc<str>> {
        self.methods
            .get(method)
            .or_else(|| self.methods.get(&method.to_ascii_lowercase()))
    }

    pub fn responds_to(&self, method: &str) -> bool {
        self.resolve(method).is_some()
    }

    pub fn fields(&self) -> Option<&Map<String, Value>> {
        self.fields.as_ref()
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

/// Key state of a bound accessor. A failed resolution is kept, not raised,
/// and handed to the first command issued.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyState {
    Ready(String),
    Failed(KeyError),
}

/// A model bound to one resolved key.
#[derive(Clone)]
pub struct Accessor {
    proxy: Arc<Proxy>,
    client: Option<Arc<dyn StoreClient>>,
    state: KeyState,
}

impl Accessor {
    pub fn new(proxy: Arc<Proxy>, client: Option<Arc<dyn StoreClient>>, state: KeyState) -> Self {
        Self {
            proxy,
            client,
            state,
        }
    }

    pub fn key(&self) -> std::result::Result<&str, &KeyError> {
        match &self.state {
            KeyState::Ready(key) => Ok(key),
            KeyState::Failed(err) => Err(err),
        }
    }

    pub fn state(&self) -> &KeyState {
        &self.state
    }

    pub fn model_name(&self) -> &str {
        self.proxy.model_name()
    }

    pub fn proxy(&self) -> &Proxy {
        &self.proxy
    }

    pub fn fields(&self) -> Option<&Map<String, Value>> {
        self.proxy.fields()
    }

    pub fn responds_to(&self, command: &str) -> bool {
        self.proxy.responds_to(command)
    }

    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.proxy.commands()
    }

    fn prepare(&self, command: &str) -> Result<(Arc<str>, String, Arc<dyn StoreClient>)> {
        let name = self
            .proxy
            .resolve(command)
            .ok_or_else(|| KeeperError::CommandNotPermitted {
                model: self.proxy.model_name().to_string(),
                command: command.to_string(),
            })?;

        let key = match &self.state {
            KeyState::Ready(key) => key.clone(),
            KeyState::Failed(err) => return Err(err.clone().into()),
        };

        let client = self
            .client
            .as_ref()
            .ok_or_else(|| KeeperError::ClientNotConfigured {
                model: self.proxy.model_name().to_string(),
            })?;

        Ok((Arc::clone(name), key, Arc::clone(client)))
    }

    /// Issue `command` against the resolved key and wait for the reply.
    pub async fn call(&self, command: &str, args: Vec<Value>) -> Result<Value> {
        let (name, key, client) = self.prepare(command)?;
        tracing::debug!("{}: {} {} ({} args)", self.model_name(), name, key, args.len());
        client.command(&name, &key, args).await
    }

    /// Callback form of [`Accessor::call`]. Returns the accessor so calls can
    /// be chained.
    ///
    /// `callback` runs exactly once. It runs before `send` returns when the
    /// command cannot be issued (deferred key error, command not permitted,
    /// no client, no runtime); otherwise it runs on the current tokio runtime
    /// once the store replies.
    pub fn send<F>(&self, command: &str, args: Vec<Value>, callback: F) -> &Self
    where
        F: FnOnce(Result<Value>) + Send + 'static,
    {
        let (name, key, client) = match self.prepare(command) {
            Ok(prepared) => prepared,
            Err(err) => {
                tracing::warn!("{}: {} not issued: {}", self.model_name(), command, err);
                callback(Err(err));
                return self;
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!("{}: {} {} ({} args)", self.model_name(), name, key, args.len());
                handle.spawn(async move {
                    let result = client.command(&name, &key, args).await;
                    callback(result);
                });
            }
            Err(_) => callback(Err(KeeperError::NoRuntime)),
        }
        self
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("model", &self.proxy.model_name())
            .field("state", &self.state)
            .field("client", &self.client.is_some())
            .finish()
    }
}
