//! Error types for the editor

use crate::commands::CommandError;
use crate::registry::SchemaError;
use thiserror::Error;

/// Precondition failures reported by the [`Engine`](crate::Engine).
///
/// Every variant except `Command` is raised before any state is touched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Block type '{0}' is already registered")]
    DuplicateTypeRegistration(String),

    #[error("Block type '{0}' is not registered")]
    BlockTypeNotRegistered(String),

    #[error("Preset at index {index} not found for block type '{block_type}'")]
    PresetNotFound { block_type: String, index: usize },

    #[error("Parent block not found: {0}")]
    ParentNotFound(String),

    #[error("Block not found: {0}")]
    BlockNotFound(String),

    #[error("Block type '{child}' cannot be a child of '{parent}'")]
    InvalidChildType { child: String, parent: String },

    #[error("Block '{0}' cannot be moved into itself or one of its descendants")]
    CycleDetected(String),

    #[error("Block '{0}' is static and cannot be moved or removed")]
    StaticBlock(String),

    #[error("Command failed: {0}")]
    Command(#[from] CommandError),
}

impl From<SchemaError> for EngineError {
    fn from(e: SchemaError) -> Self {
        match e {
            SchemaError::DuplicateType(block_type) => EngineError::DuplicateTypeRegistration(block_type),
        }
    }
}
