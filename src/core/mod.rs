pub mod catalog;
pub mod command_set;
pub mod key_template;
pub mod model;
pub mod proxy;
pub mod registry;

pub use crate::domain::model::{KeyParams, ModelSpec, ModelType};
pub use crate::domain::ports::StoreClient;
pub use crate::utils::error::Result;
