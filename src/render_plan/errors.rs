use thiserror::Error;

use crate::entity_catalog::EntityModelError;
use crate::query_planner::logical_plan::errors::LogicalPlanError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TranslationError {
    #[error("Entity `{entity}` has no property `{property}` (in `{path}`)")]
    UnknownProperty {
        entity: String,
        property: String,
        path: String,
    },

    #[error("Entity `{entity}` has no navigation `{navigation}` (in `{path}`)")]
    UnknownNavigation {
        entity: String,
        navigation: String,
        path: String,
    },

    #[error("No entity type named `{0}`")]
    UnknownEntity(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Only the group key and aggregates are addressable after GroupBy: {0}")]
    InvalidProjectionAfterGroupBy(String),

    #[error("Output name `{0}` is produced more than once")]
    AmbiguousOutputName(String),

    #[error("Unbound variable `{0}`")]
    UnboundVariable(String),

    #[error("Entity model error: {0}")]
    Model(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] LogicalPlanError),
}

impl TranslationError {
    /// Attach the expression being resolved to a metadata lookup failure.
    pub fn from_lookup(err: EntityModelError, path: impl Into<String>) -> Self {
        let path = path.into();
        match err {
            EntityModelError::UnknownEntity { entity } => TranslationError::UnknownEntity(entity),
            EntityModelError::UnknownProperty { entity, property } => {
                TranslationError::UnknownProperty {
                    entity,
                    property,
                    path,
                }
            }
            EntityModelError::UnknownNavigation { entity, navigation } => {
                TranslationError::UnknownNavigation {
                    entity,
                    navigation,
                    path,
                }
            }
            other => TranslationError::Model(other.to_string()),
        }
    }
}

impl From<EntityModelError> for TranslationError {
    fn from(err: EntityModelError) -> Self {
        TranslationError::from_lookup(err, "")
    }
}

/// Outcome of applying an operator against the current scope.
///
/// `Wrap` means the operator cannot be expressed against the current scope
/// and must be retried once the scope has been frozen into a subquery. It
/// never leaves the translator.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Flow {
    Wrap,
    Failed(TranslationError),
}

pub(crate) type FlowResult<T> = Result<T, Flow>;

impl From<TranslationError> for Flow {
    fn from(err: TranslationError) -> Self {
        Flow::Failed(err)
    }
}

impl From<EntityModelError> for Flow {
    fn from(err: EntityModelError) -> Self {
        Flow::Failed(err.into())
    }
}

impl Flow {
    /// Resolve a flow outcome where wrapping is not possible.
    pub(crate) fn into_error(self, context: &str) -> TranslationError {
        match self {
            Flow::Failed(err) => err,
            Flow::Wrap => TranslationError::UnsupportedOperator(format!(
                "{} cannot be expressed without an additional subquery",
                context
            )),
        }
    }
}
