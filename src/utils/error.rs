use thiserror::Error;

/// Key-resolution failures. Carried on accessors and reported on the first
/// command invocation rather than when the accessor is built.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KeyError {
    #[error("invalid value for placeholder `{placeholder}`: expected a number or a non-empty string, got {value}")]
    InvalidParamType { placeholder: String, value: String },

    #[error(
        "the params do not match all the placeholders [{}]: missing [{}] ({} supplied)",
        .expected.join(", "),
        .missing.join(", "),
        .supplied
    )]
    ParamCountMismatch {
        expected: Vec<String>,
        missing: Vec<String>,
        supplied: usize,
    },
}

#[derive(Error, Debug)]
pub enum KeeperError {
    #[error("model type is invalid. name={name}, type={type_name}")]
    UnknownModelType { name: String, type_name: String },

    #[error("model has been registered already. name={name}")]
    DuplicateModelName { name: String },

    #[error("invalid definition for model `{name}`: {reason}")]
    InvalidDefinition { name: String, reason: String },

    #[error("key resolution failed: {0}")]
    Key(#[from] KeyError),

    #[error("command `{command}` is not available on model `{model}`")]
    CommandNotPermitted { model: String, command: String },

    #[error("no store client configured for model `{model}`")]
    ClientNotConfigured { model: String },

    #[error("callback commands require a running tokio runtime")]
    NoRuntime,

    #[error("store command `{command}` failed: {message}")]
    Store { command: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in `{field}`: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value `{value}` for `{field}`: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration `{field}`")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Registration,
    KeyResolution,
    Command,
    Store,
    Configuration,
}

impl KeeperError {
    pub fn store(command: &str, message: impl Into<String>) -> Self {
        KeeperError::Store {
            command: command.to_string(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            KeeperError::UnknownModelType { .. }
            | KeeperError::DuplicateModelName { .. }
            | KeeperError::InvalidDefinition { .. } => ErrorCategory::Registration,
            KeeperError::Key(_) => ErrorCategory::KeyResolution,
            KeeperError::CommandNotPermitted { .. }
            | KeeperError::ClientNotConfigured { .. }
            | KeeperError::NoRuntime => ErrorCategory::Command,
            KeeperError::Store { .. } => ErrorCategory::Store,
            KeeperError::IoError(_)
            | KeeperError::SerializationError(_)
            | KeeperError::ConfigError { .. }
            | KeeperError::ConfigValidationError { .. }
            | KeeperError::InvalidConfigValueError { .. }
            | KeeperError::MissingConfigError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Registration => {
                "Check the model type and make sure each model name is registered once"
            }
            ErrorCategory::KeyResolution => {
                "Pass one number or non-empty string for every placeholder in the key"
            }
            ErrorCategory::Command => {
                "Check allowed_commands/disabled_commands and that a store client is set"
            }
            ErrorCategory::Store => "Inspect the store client; the command reached it and failed",
            ErrorCategory::Configuration => "Fix the configuration file and try again",
        }
    }
}

pub type Result<T> = std::result::Result<T, KeeperError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_count_mismatch_lists_missing_names() {
        let err = KeyError::ParamCountMismatch {
            expected: vec!["a".into(), "b".into(), "c".into()],
            missing: vec!["b".into(), "c".into()],
            supplied: 1,
        };
        assert_eq!(
            err.to_string(),
            "the params do not match all the placeholders [a, b, c]: missing [b, c] (1 supplied)"
        );
    }

    #[test]
    fn test_categories() {
        let err = KeeperError::from(KeyError::InvalidParamType {
            placeholder: "id".into(),
            value: "\"\"".into(),
        });
        assert_eq!(err.category(), ErrorCategory::KeyResolution);

        let err = KeeperError::DuplicateModelName { name: "post".into() };
        assert_eq!(err.category(), ErrorCategory::Registration);
        assert!(err.to_string().contains("name=post"));
    }
}
