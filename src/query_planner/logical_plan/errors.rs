use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LogicalPlanError {
    #[error("Failed to parse query chain: {0}")]
    Parse(String),
    #[error("Record projection has no items")]
    EmptyRecord,
    #[error("Lambda parameter `{0}` shadows a parameter of the same operator")]
    DuplicateParameter(String),
}
