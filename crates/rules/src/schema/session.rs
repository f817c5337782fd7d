use serde::{Deserialize, Serialize};

/// Caller identity for CRUD operations. Every operation is scoped to
/// `domain_id`; entities of other domains look like they do not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub domain_id: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>, domain_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            domain_id: domain_id.into(),
        }
    }
}
