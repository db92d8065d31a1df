use crate::core::catalog::TypeDefinition;
use crate::core::registry::ModelRegistry;
use crate::domain::model::ModelSpec;
use crate::domain::ports::StoreClient;
use crate::utils::error::{KeeperError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, OnceLock};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeeperConfig {
    pub store: Option<StoreConfig>,
    #[serde(default)]
    pub types: Vec<TypeConfig>,
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Prefix applied to every model key as `<partition>:`.
    pub partition: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeConfig {
    pub name: String,
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    #[serde(flatten)]
    pub spec: ModelSpec,
}

impl KeeperConfig {
    /// Load the configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(KeeperError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parse the configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| KeeperError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replace `${VAR}` with the environment value. Unset variables are left as is.
    fn substitute_env_vars(content: &str) -> String {
        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn partition(&self) -> Option<&str> {
        self.store.as_ref().and_then(|s| s.partition.as_deref())
    }

    /// Check the configuration before building a registry.
    pub fn validate_config(&self) -> Result<()> {
        if let Some(partition) = self.partition() {
            validation::validate_non_empty_string("store.partition", partition)?;
            validation::validate_balanced_braces("store.partition", partition)?;
        }

        for (index, ty) in self.types.iter().enumerate() {
            validation::validate_non_empty_string(&format!("types[{}].name", index), &ty.name)?;
            validation::validate_command_names(&format!("types[{}].commands", index), &ty.commands)?;
        }

        let mut seen: Vec<&str> = Vec::with_capacity(self.models.len());
        for (index, model) in self.models.iter().enumerate() {
            let field = |name: &str| format!("models[{}].{}", index, name);

            validation::validate_non_empty_string(&field("name"), &model.name)?;
            validation::validate_non_empty_string(&field("type"), &model.spec.model_type)?;
            validation::validate_non_empty_string(&field("key"), &model.spec.key)?;
            validation::validate_balanced_braces(&field("key"), &model.spec.key)?;
            if let Some(allowed) = &model.spec.allowed_commands {
                validation::validate_command_names(&field("allowed_commands"), allowed)?;
            }
            if let Some(disabled) = &model.spec.disabled_commands {
                validation::validate_command_names(&field("disabled_commands"), disabled)?;
            }

            if seen.contains(&model.name.as_str()) {
                return Err(KeeperError::InvalidConfigValueError {
                    field: field("name"),
                    value: model.name.clone(),
                    reason: "Model name is declared more than once".to_string(),
                });
            }
            seen.push(&model.name);
        }

        Ok(())
    }

    /// Build a registry: partition first, then custom types, then models in
    /// file order.
    pub fn build_registry(&self, client: Option<Arc<dyn StoreClient>>) -> Result<ModelRegistry> {
        let mut registry = ModelRegistry::new();
        if let Some(client) = client {
            registry.set_client(client);
        }
        if let Some(partition) = self.partition() {
            registry = registry.with_partition(partition);
        }

        registry.define_types(
            self.types
                .iter()
                .map(|ty| TypeDefinition::new(ty.name.clone(), ty.commands.iter().cloned())),
        );
        registry.create_models(
            self.models
                .iter()
                .map(|model| (model.name.as_str(), model.spec.clone())),
        )?;

        tracing::info!(
            "registry ready: {} types, {} models",
            registry.model_types().len(),
            registry.len()
        );
        Ok(registry)
    }
}

impl Validate for KeeperConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[store]
partition = "h"

[[types]]
name = "counter"
commands = ["incr", "incrby"]

[[models]]
name = "post"
type = "HASH"
key = "post:{postId}"
fields = { count = { like = "like:count", comment = "comments:count" } }

[[models]]
name = "postCommentsIndex"
type = "STRING"
key = "post:{postId}:comments:index"
disabled_commands = ["decr"]

[[models]]
name = "hits"
type = "COUNTER"
key = "hits:{day}"
allowedCommands = ["incr", "get"]
"#;

    #[test]
    fn test_parse_basic_config() {
        let config = KeeperConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.partition(), Some("h"));
        assert_eq!(config.types.len(), 1);
        assert_eq!(config.models.len(), 3);
        assert_eq!(config.models[0].name, "post");
        assert_eq!(
            config.models[0].spec.metadata["fields"]["count"]["like"],
            json!("like:count")
        );
        assert_eq!(
            config.models[1].spec.disabled_commands,
            Some(vec!["decr".to_string()])
        );
        assert_eq!(
            config.models[2].spec.allowed_commands,
            Some(vec!["incr".to_string(), "get".to_string()])
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_build_registry() {
        let config = KeeperConfig::from_toml_str(BASIC).unwrap();
        let registry = config.build_registry(None).unwrap();

        assert_eq!(registry.model_names(), vec!["hits", "post", "postCommentsIndex"]);
        let hits = registry.definition("hits").unwrap();
        assert_eq!(hits.commands().commands(), &["get", "incr"]);
        assert_eq!(hits.key("monday").unwrap(), "h:hits:monday");

        let index = registry.definition("postCommentsIndex").unwrap();
        assert!(!index.commands().contains("decr"));
        assert!(index.commands().contains("incr"));
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("KV_KEEPER_TEST_PARTITION", "tenant1");

        let config = KeeperConfig::from_toml_str(
            r#"
[store]
partition = "${KV_KEEPER_TEST_PARTITION}"
"#,
        )
        .unwrap();
        assert_eq!(config.partition(), Some("tenant1"));

        std::env::remove_var("KV_KEEPER_TEST_PARTITION");
    }

    #[test]
    fn test_config_validation() {
        let config = KeeperConfig::from_toml_str(
            r#"
[[models]]
name = "broken"
type = "STRING"
key = "post:{postId"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = KeeperConfig::from_toml_str(
            r#"
[[models]]
name = "a"
type = "STRING"
key = "a"

[[models]]
name = "a"
type = "STRING"
key = "b"
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(KeeperError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_unknown_type_fails_registry() {
        let config = KeeperConfig::from_toml_str(
            r#"
[[models]]
name = "geo"
type = "GEO"
key = "geo"
"#,
        )
        .unwrap();
        assert!(matches!(
            config.build_registry(None),
            Err(KeeperError::UnknownModelType { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = KeeperConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.models[0].name, "post");
    }
}
