//! Identifier generation for newly created records.

use uuid::Uuid;

use crate::error::CoreError;

/// Produces unique identifiers for new rules and report configs.
pub trait IdProvider: Send + Sync {
    fn id(&self) -> Result<String, CoreError>;
}

/// Random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidProvider;

impl IdProvider for UuidProvider {
    fn id(&self) -> Result<String, CoreError> {
        Ok(Uuid::new_v4().to_string())
    }
}
