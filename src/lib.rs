pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliCommand, CliConfig};
pub use config::KeeperConfig;

pub use adapters::MemoryStore;
pub use crate::core::{
    catalog::{CustomizeProxy, TypeDefinition, TypeEntry},
    command_set::CommandSet,
    key_template::KeyTemplate,
    model::{Model, ModelDefinition},
    proxy::{Accessor, KeyState, Proxy, ProxyBuilder},
    registry::ModelRegistry,
};
pub use domain::model::{KeyParams, ModelSpec, ModelType};
pub use domain::ports::StoreClient;
pub use utils::error::{KeeperError, KeyError, Result};
