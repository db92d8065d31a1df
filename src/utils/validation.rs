use crate::utils::error::{KeeperError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(KeeperError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// Every `{` must be closed by a `}` before the next `{`.
pub fn validate_balanced_braces(field_name: &str, pattern: &str) -> Result<()> {
    let mut open = false;
    for ch in pattern.chars() {
        match ch {
            '{' if open => return Err(unbalanced(field_name, pattern)),
            '{' => open = true,
            '}' if !open => return Err(unbalanced(field_name, pattern)),
            '}' => open = false,
            _ => {}
        }
    }
    if open {
        return Err(unbalanced(field_name, pattern));
    }
    Ok(())
}

fn unbalanced(field_name: &str, pattern: &str) -> KeeperError {
    KeeperError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: pattern.to_string(),
        reason: "Unbalanced braces in key pattern".to_string(),
    }
}

pub fn validate_command_names(field_name: &str, commands: &[String]) -> Result<()> {
    for command in commands {
        if command.is_empty() || !command.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(KeeperError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: command.clone(),
                reason: "Command names must be non-empty and alphanumeric".to_string(),
            });
        }
    }
    Ok(())
}
