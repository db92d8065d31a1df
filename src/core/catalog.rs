use crate::core::proxy::ProxyBuilder;
use crate::domain::model::{ModelSpec, ModelType};
use crate::utils::error::{KeeperError, Result};
use serde_json::Value;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Hook run while a model's accessor descriptor is being built.
pub type CustomizeProxy = Arc<dyn Fn(&ModelSpec, &mut ProxyBuilder) -> Result<()> + Send + Sync>;

/// Key-level commands every type starts from.
pub const GENERIC_COMMANDS: &[&str] = &[
    "del", "dump", "exists", "expire", "expireat", "keys", "migrate", "move", "object",
    "persist", "pexpire", "pexpireat", "pttl", "randomkey", "rename", "renamenx", "restore",
    "get", "ttl", "type",
];

pub const STRING_COMMANDS: &[&str] = &[
    "append", "bitcount", "bitop", "decr", "decrby", "get", "getbit", "getrange", "getset",
    "incr", "incrby", "incrbyfloat", "mget", "mset", "msetnx", "psetex", "set", "setbit",
    "setex", "setnx", "setrange", "strlen",
];

pub const HASH_COMMANDS: &[&str] = &[
    "hdel", "hexists", "hget", "hgetall", "hincrby", "hincrbyfloat", "hkeys", "hlen", "hmget",
    "hmset", "hset", "hsetnx", "hvals",
];

pub const LIST_COMMANDS: &[&str] = &[
    "blpop", "brpop", "brpoplpush", "lindex", "linsert", "llen", "lpop", "lpush", "lpushx",
    "lrange", "lrem", "lset", "ltrim", "rpop", "rpoplpush", "rpush", "rpushx",
];

pub const SET_COMMANDS: &[&str] = &[
    "sadd", "scard", "sdiff", "sdiffstore", "sinter", "sinterstore", "sismember", "smembers",
    "smove", "spop", "srandmember", "srem", "sunion", "sunionstore",
];

pub const SORTED_SET_COMMANDS: &[&str] = &[
    "zadd", "zcard", "zcount", "zincrby", "zinterstore", "zrange", "zrangebyscore", "zrank",
    "zrem", "zremrangebyrank", "zremrangebyscore", "zrevrange", "zrevrangebyscore", "zrevrank",
    "zscore", "zunionstore",
];

/// A registered storage type: its full command vocabulary (generic commands
/// first, then the type's own) and an optional customization hook.
#[derive(Clone)]
pub struct TypeEntry {
    model_type: ModelType,
    commands: Vec<String>,
    hook: Option<CustomizeProxy>,
}

impl TypeEntry {
    pub fn new<S: AsRef<str>>(name: &str, commands: &[S], hook: Option<CustomizeProxy>) -> Self {
        let mut all: Vec<String> = Vec::with_capacity(GENERIC_COMMANDS.len() + commands.len());
        let extra = commands.iter().map(|c| c.as_ref());
        for command in GENERIC_COMMANDS.iter().copied().chain(extra) {
            let command = command.to_ascii_lowercase();
            if !all.contains(&command) {
                all.push(command);
            }
        }

        Self {
            model_type: ModelType::from_name(name),
            commands: all,
            hook,
        }
    }

    pub fn name(&self) -> &str {
        self.model_type.as_str()
    }

    pub fn model_type(&self) -> &ModelType {
        &self.model_type
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn hook(&self) -> Option<&CustomizeProxy> {
        self.hook.as_ref()
    }
}

impl fmt::Debug for TypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeEntry")
            .field("type", &self.model_type)
            .field("commands", &self.commands.len())
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

/// Input for bulk type registration.
#[derive(Clone)]
pub struct TypeDefinition {
    pub name: String,
    pub commands: Vec<String>,
    pub hook: Option<CustomizeProxy>,
}

impl TypeDefinition {
    pub fn new<I, S>(name: impl Into<String>, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            commands: commands.into_iter().map(Into::into).collect(),
            hook: None,
        }
    }

    pub fn with_hook(mut self, hook: CustomizeProxy) -> Self {
        self.hook = Some(hook);
        self
    }
}

/// Type name to entry. Redefining a name replaces the entry.
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    entries: HashMap<String, TypeEntry>,
}

impl TypeCatalog {
    pub fn builtin() -> Self {
        let mut catalog = Self::default();
        let empty: &[&str] = &[];
        catalog.define(TypeEntry::new("GENERIC", empty, None));
        catalog.define(TypeEntry::new("STRING", STRING_COMMANDS, None));
        let hash_hook: CustomizeProxy = Arc::new(attach_hash_fields);
        catalog.define(TypeEntry::new("HASH", HASH_COMMANDS, Some(hash_hook)));
        catalog.define(TypeEntry::new("LIST", LIST_COMMANDS, None));
        catalog.define(TypeEntry::new("SET", SET_COMMANDS, None));
        catalog.define(TypeEntry::new("SORTED_SET", SORTED_SET_COMMANDS, None));
        catalog
    }

    /// Insert `entry` under its canonical name. The flag is true when an
    /// existing entry was replaced.
    pub fn define(&mut self, entry: TypeEntry) -> (&TypeEntry, bool) {
        match self.entries.entry(entry.name().to_string()) {
            Entry::Occupied(mut slot) => {
                slot.insert(entry);
                let stored: &TypeEntry = slot.into_mut();
                (stored, true)
            }
            Entry::Vacant(slot) => {
                let stored: &TypeEntry = slot.insert(entry);
                (stored, false)
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&TypeEntry> {
        self.entries
            .get(name)
            .or_else(|| self.entries.get(&ModelType::normalize(name)))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// HASH hook: expose the `fields` metadata object on the accessors.
fn attach_hash_fields(spec: &ModelSpec, proxy: &mut ProxyBuilder) -> Result<()> {
    match spec.metadata.get("fields") {
        None => Ok(()),
        Some(Value::Object(fields)) => {
            proxy.set_fields(fields.clone());
            Ok(())
        }
        Some(other) => Err(KeeperError::InvalidDefinition {
            name: proxy.model_name().to_string(),
            reason: format!("`fields` must be a table of field names, got {}", other),
        }),
    }
}
