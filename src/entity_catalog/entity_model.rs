use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::errors::EntityModelError;

/// Lookup interface the translator uses to learn about entities.
///
/// Implementations must be cheap and side-effect free: the translator calls
/// them repeatedly while walking expressions and never caches across queries.
pub trait EntityMetadata {
    /// Backing table of an entity type.
    fn table_of(&self, entity: &str) -> Result<String, EntityModelError>;

    /// Table and column backing a scalar property.
    fn column_of(&self, entity: &str, property: &str) -> Result<ColumnInfo, EntityModelError>;

    /// Target and key pairing of a navigation property.
    fn navigation_of(
        &self,
        entity: &str,
        navigation: &str,
    ) -> Result<NavigationInfo, EntityModelError>;

    /// Primary key column of an entity type.
    fn key_column_of(&self, entity: &str) -> Result<String, EntityModelError>;

    /// All columns of an entity type, in declaration order.
    fn columns_of(&self, entity: &str) -> Result<Vec<String>, EntityModelError>;

    /// Whether `name` is a navigation property of `entity`.
    fn is_navigation(&self, entity: &str, name: &str) -> bool {
        self.navigation_of(entity, name).is_ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationInfo {
    pub target_entity: String,
    /// Column on the source entity's table used in the join condition
    pub source_column: String,
    /// Column on the target entity's table used in the join condition
    pub target_column: String,
    /// Non-nullable foreign key held by the source side
    pub required: bool,
    pub collection: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PropertySchema {
    pub name: String,
    pub column: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NavigationSchema {
    pub name: String,
    pub target: String,
    pub source_column: String,
    pub target_column: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub collection: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EntitySchema {
    pub name: String,
    pub table_name: String,
    pub key_column: String,
    pub properties: Vec<PropertySchema>,
    #[serde(default)]
    pub navigations: Vec<NavigationSchema>,
}

impl EntitySchema {
    pub fn new(name: &str, table_name: &str, key_column: &str) -> Self {
        EntitySchema {
            name: name.to_string(),
            table_name: table_name.to_string(),
            key_column: key_column.to_string(),
            properties: vec![],
            navigations: vec![],
        }
    }

    /// Add a property whose column has the same name.
    pub fn with_property(mut self, name: &str) -> Self {
        self.properties.push(PropertySchema {
            name: name.to_string(),
            column: name.to_string(),
        });
        self
    }

    pub fn with_mapped_property(mut self, name: &str, column: &str) -> Self {
        self.properties.push(PropertySchema {
            name: name.to_string(),
            column: column.to_string(),
        });
        self
    }

    /// Add a single-valued navigation. `required` marks a non-nullable
    /// foreign key on this entity's side.
    pub fn with_reference(
        mut self,
        name: &str,
        target: &str,
        source_column: &str,
        target_column: &str,
        required: bool,
    ) -> Self {
        self.navigations.push(NavigationSchema {
            name: name.to_string(),
            target: target.to_string(),
            source_column: source_column.to_string(),
            target_column: target_column.to_string(),
            required,
            collection: false,
        });
        self
    }

    pub fn with_collection(
        mut self,
        name: &str,
        target: &str,
        source_column: &str,
        target_column: &str,
    ) -> Self {
        self.navigations.push(NavigationSchema {
            name: name.to_string(),
            target: target.to_string(),
            source_column: source_column.to_string(),
            target_column: target_column.to_string(),
            required: false,
            collection: true,
        });
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertySchema> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn navigation(&self, name: &str) -> Option<&NavigationSchema> {
        self.navigations.iter().find(|n| n.name == name)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.properties.iter().any(|p| p.column == column)
    }
}

/// In-memory entity model keyed by entity type name.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct EntityModel {
    entities: HashMap<String, EntitySchema>,
}

impl EntityModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_entity(&mut self, entity: EntitySchema) {
        self.entities.insert(entity.name.clone(), entity);
    }

    pub fn with_entity(mut self, entity: EntitySchema) -> Self {
        self.insert_entity(entity);
        self
    }

    pub fn get_entity(&self, name: &str) -> Result<&EntitySchema, EntityModelError> {
        self.entities
            .get(name)
            .ok_or_else(|| EntityModelError::UnknownEntity {
                entity: name.to_string(),
            })
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntitySchema> {
        self.entities.values()
    }

    /// Check that keys and navigation pairings refer to declared columns and
    /// that every navigation target exists.
    pub fn validate(&self) -> Result<(), EntityModelError> {
        let mut names: Vec<&String> = self.entities.keys().collect();
        names.sort();

        for name in names {
            let entity = &self.entities[name];
            if !entity.has_column(&entity.key_column) {
                return Err(EntityModelError::invalid_with_context(
                    format!("key column '{}' is not a declared property column", entity.key_column),
                    name,
                ));
            }
            for nav in &entity.navigations {
                let target = self.entities.get(&nav.target).ok_or_else(|| {
                    EntityModelError::invalid_with_context(
                        format!("navigation '{}' targets unknown entity '{}'", nav.name, nav.target),
                        name,
                    )
                })?;
                if !entity.has_column(&nav.source_column) {
                    return Err(EntityModelError::invalid_with_context(
                        format!(
                            "navigation '{}' uses unknown source column '{}'",
                            nav.name, nav.source_column
                        ),
                        name,
                    ));
                }
                if !target.has_column(&nav.target_column) {
                    return Err(EntityModelError::invalid_with_context(
                        format!(
                            "navigation '{}' uses unknown target column '{}' on '{}'",
                            nav.name, nav.target_column, nav.target
                        ),
                        name,
                    ));
                }
                if nav.collection && nav.required {
                    return Err(EntityModelError::invalid_with_context(
                        format!("collection navigation '{}' cannot be required", nav.name),
                        name,
                    ));
                }
            }
        }
        Ok(())
    }
}

impl EntityMetadata for EntityModel {
    fn table_of(&self, entity: &str) -> Result<String, EntityModelError> {
        Ok(self.get_entity(entity)?.table_name.clone())
    }

    fn column_of(&self, entity: &str, property: &str) -> Result<ColumnInfo, EntityModelError> {
        let schema = self.get_entity(entity)?;
        let prop = schema
            .property(property)
            .ok_or_else(|| EntityModelError::UnknownProperty {
                entity: entity.to_string(),
                property: property.to_string(),
            })?;
        Ok(ColumnInfo {
            table: schema.table_name.clone(),
            column: prop.column.clone(),
        })
    }

    fn navigation_of(
        &self,
        entity: &str,
        navigation: &str,
    ) -> Result<NavigationInfo, EntityModelError> {
        let schema = self.get_entity(entity)?;
        let nav = schema
            .navigation(navigation)
            .ok_or_else(|| EntityModelError::UnknownNavigation {
                entity: entity.to_string(),
                navigation: navigation.to_string(),
            })?;
        Ok(NavigationInfo {
            target_entity: nav.target.clone(),
            source_column: nav.source_column.clone(),
            target_column: nav.target_column.clone(),
            required: nav.required,
            collection: nav.collection,
        })
    }

    fn key_column_of(&self, entity: &str) -> Result<String, EntityModelError> {
        Ok(self.get_entity(entity)?.key_column.clone())
    }

    fn columns_of(&self, entity: &str) -> Result<Vec<String>, EntityModelError> {
        Ok(self
            .get_entity(entity)?
            .properties
            .iter()
            .map(|p| p.column.clone())
            .collect())
    }
}

impl fmt::Display for EntityModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.entities.keys().collect();
        names.sort();
        for name in names {
            let e = &self.entities[name];
            writeln!(f, "{} ({}, key {})", e.name, e.table_name, e.key_column)?;
            for nav in &e.navigations {
                writeln!(
                    f,
                    "  {} -> {}{} on {} = {}{}",
                    nav.name,
                    nav.target,
                    if nav.collection { "[]" } else { "" },
                    nav.source_column,
                    nav.target_column,
                    if nav.required { " (required)" } else { "" }
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blog_model() -> EntityModel {
        EntityModel::new()
            .with_entity(
                EntitySchema::new("Blog", "Blogs", "BlogId")
                    .with_property("BlogId")
                    .with_property("Url")
                    .with_property("UserId")
                    .with_collection("Posts", "Post", "BlogId", "BlogId"),
            )
            .with_entity(
                EntitySchema::new("Post", "Posts", "PostId")
                    .with_property("PostId")
                    .with_property("BlogId")
                    .with_reference("Blog", "Blog", "BlogId", "BlogId", false),
            )
    }

    #[test]
    fn test_column_lookup_uses_mapping() {
        let model = EntityModel::new().with_entity(
            EntitySchema::new("User", "Users", "UserId")
                .with_property("UserId")
                .with_mapped_property("UserName", "user_name"),
        );
        let info = model.column_of("User", "UserName").unwrap();
        assert_eq!(info.table, "Users");
        assert_eq!(info.column, "user_name");
    }

    #[test]
    fn test_unknown_lookups() {
        let model = blog_model();
        assert!(matches!(
            model.column_of("Blog", "Title"),
            Err(EntityModelError::UnknownProperty { .. })
        ));
        assert!(matches!(
            model.navigation_of("Blog", "Owner"),
            Err(EntityModelError::UnknownNavigation { .. })
        ));
        assert!(matches!(
            model.table_of("Comment"),
            Err(EntityModelError::UnknownEntity { .. })
        ));
        assert!(model.is_navigation("Post", "Blog"));
        assert!(!model.is_navigation("Post", "BlogId"));
    }

    #[test]
    fn test_validate_rejects_dangling_target() {
        let model = blog_model().with_entity(
            EntitySchema::new("Tag", "Tags", "TagId")
                .with_property("TagId")
                .with_reference("Owner", "User", "TagId", "UserId", true),
        );
        let err = model.validate().unwrap_err();
        assert!(err.to_string().contains("unknown entity 'User'"));
    }

    #[test]
    fn test_validate_accepts_consistent_model() {
        assert_eq!(blog_model().validate(), Ok(()));
    }
}
