//! # Entity Model Error Types
//!
//! Errors raised while loading an entity model or answering metadata lookups.
//!
//! Lookup misses (`UnknownEntity`, `UnknownProperty`, `UnknownNavigation`) are
//! fatal for the query being translated; the translator converts them into
//! [`TranslationError`](crate::render_plan::errors::TranslationError) with the
//! navigation path at fault attached.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EntityModelError {
    #[error("No entity type named `{entity}`")]
    UnknownEntity { entity: String },
    #[error("Entity `{entity}` has no property `{property}`")]
    UnknownProperty { entity: String, property: String },
    #[error("Entity `{entity}` has no navigation property `{navigation}`")]
    UnknownNavigation { entity: String, navigation: String },
    #[error("Failed to read entity model file: {error}")]
    ConfigRead { error: String },
    #[error("Failed to parse entity model: {error}")]
    ConfigParse { error: String },
    #[error("Invalid entity model: {message}")]
    InvalidConfig { message: String },
}

impl EntityModelError {
    /// Create an InvalidConfig error naming the entity being validated
    pub fn invalid_with_context(message: impl Into<String>, entity: impl Into<String>) -> Self {
        EntityModelError::InvalidConfig {
            message: format!("{}\n  Context: entity `{}`", message.into(), entity.into()),
        }
    }
}
