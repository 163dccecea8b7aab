use super::entity_model::{EntityModel, EntitySchema, NavigationSchema, PropertySchema};
use super::errors::EntityModelError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Entity models are defined in YAML with the following structure:
///
/// ```yaml
/// name: blogging
/// entities:
///   - name: Post
///     table: Posts
///     key: PostId
///     properties:
///       - PostId
///       - Content
///       - { name: Title, column: post_title }
///     navigations:
///       - name: User
///         target: User
///         source_column: UserId
///         target_column: UserId
///         required: true
///       - name: Comments
///         target: Comment
///         source_column: PostId
///         target_column: PostId
///         collection: true
/// ```
///
/// Properties given as a bare string map to a column of the same name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityModelConfig {
    /// Optional model name, only used in log output
    #[serde(default)]
    pub name: Option<String>,
    pub entities: Vec<EntityDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub name: String,
    pub table: String,
    pub key: String,
    pub properties: Vec<PropertyDefinition>,
    #[serde(default)]
    pub navigations: Vec<NavigationSchema>,
}

/// Property definition supporting both the short and the mapped form
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PropertyDefinition {
    Simple(String),
    Mapped { name: String, column: String },
}

impl PropertyDefinition {
    fn to_schema(&self) -> PropertySchema {
        match self {
            PropertyDefinition::Simple(name) => PropertySchema {
                name: name.clone(),
                column: name.clone(),
            },
            PropertyDefinition::Mapped { name, column } => PropertySchema {
                name: name.clone(),
                column: column.clone(),
            },
        }
    }
}

impl EntityModelConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, EntityModelError> {
        serde_yaml::from_str(yaml).map_err(|e| EntityModelError::ConfigParse {
            error: e.to_string(),
        })
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, EntityModelError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| EntityModelError::ConfigRead {
            error: format!("{}: {}", path.as_ref().display(), e),
        })?;
        Self::from_yaml_str(&content)
    }

    /// Build and validate the in-memory model.
    pub fn to_entity_model(&self) -> Result<EntityModel, EntityModelError> {
        let mut model = EntityModel::new();
        for def in &self.entities {
            if model.get_entity(&def.name).is_ok() {
                return Err(EntityModelError::invalid_with_context(
                    "entity declared twice",
                    &def.name,
                ));
            }
            model.insert_entity(EntitySchema {
                name: def.name.clone(),
                table_name: def.table.clone(),
                key_column: def.key.clone(),
                properties: def.properties.iter().map(|p| p.to_schema()).collect(),
                navigations: def.navigations.clone(),
            });
        }
        model.validate()?;
        log::info!(
            "Loaded entity model '{}' with {} entities",
            self.name.as_deref().unwrap_or("unnamed"),
            self.entities.len()
        );
        Ok(model)
    }
}

/// Load an entity model from a YAML file.
pub fn load_entity_model<P: AsRef<Path>>(path: P) -> Result<EntityModel, EntityModelError> {
    EntityModelConfig::from_yaml_file(path)?.to_entity_model()
}
