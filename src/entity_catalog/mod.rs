//! Entity model metadata.
//!
//! Supplies table, column and navigation information for entity types. The
//! translator only talks to the [`EntityMetadata`] trait; [`EntityModel`] is
//! the in-memory implementation, loadable from YAML via [`config`].

pub mod config;
pub mod entity_model;
pub mod errors;

pub use config::{load_entity_model, EntityModelConfig};
pub use entity_model::{
    ColumnInfo, EntityMetadata, EntityModel, EntitySchema, NavigationInfo, NavigationSchema,
    PropertySchema,
};
pub use errors::EntityModelError;
