//! Form validation for message and user editing.
//!
//! Synchronous rules (required, length bounds, username sanity) live here. The
//! asynchronous "is this username free" lookup is in [`unique`].

use crate::config::ValidationConfig;

pub mod unique;

pub use unique::{NameCheck, UniqueNameCheck};

/// A field-level validation failure, displayed next to the offending input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("This field is required")]
    Required,

    #[error("You must enter at least {required} characters")]
    MinLength { required: usize },

    #[error("You cannot enter more than {required} characters")]
    MaxLength { required: usize },

    #[error("This username is already taken")]
    UniqueName,

    #[error("Username cannot start or end with whitespace")]
    InvalidWhitespace,

    #[error("Username contains invalid characters: {chars}")]
    InvalidCharacters { chars: String },
}

/// Length bounds for one field, counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthRule {
    pub min: usize,
    pub max: usize,
}

impl LengthRule {
    pub fn check(&self, value: &str) -> Result<(), FieldError> {
        if value.trim().is_empty() {
            return Err(FieldError::Required);
        }
        let len = value.chars().count();
        if len < self.min {
            return Err(FieldError::MinLength { required: self.min });
        }
        if len > self.max {
            return Err(FieldError::MaxLength { required: self.max });
        }
        Ok(())
    }
}

/// Limits for the forms, built from `[validation]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormRules {
    pub username: LengthRule,
    pub message: LengthRule,
}

impl From<&ValidationConfig> for FormRules {
    fn from(cfg: &ValidationConfig) -> Self {
        Self {
            username: LengthRule {
                min: cfg.username_min,
                max: cfg.username_max,
            },
            message: LengthRule {
                min: cfg.message_min,
                max: cfg.message_max,
            },
        }
    }
}

impl Default for FormRules {
    fn default() -> Self {
        FormRules::from(&ValidationConfig::default())
    }
}

impl FormRules {
    /// Validate a message body before it is posted or saved.
    pub fn validate_message(&self, content: &str) -> Result<(), FieldError> {
        self.message.check(content)
    }

    /// Validate a username locally. Uniqueness is checked separately.
    pub fn validate_username(&self, username: &str) -> Result<(), FieldError> {
        self.username.check(username)?;

        if username.trim() != username {
            return Err(FieldError::InvalidWhitespace);
        }

        if username.chars().any(|c| c.is_control()) {
            let chars = username
                .chars()
                .filter(|c| c.is_control())
                .map(|c| format!("\\u{{{:04x}}}", c as u32))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(FieldError::InvalidCharacters { chars });
        }

        Ok(())
    }
}
