//! Request-scoped identity

use serde::{Deserialize, Serialize};
use solveby_db::DbAgent;
use uuid::Uuid;

/// The agent a request was authenticated as, stored in request extensions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedAgent {
    pub id: Uuid,
    pub name: String,
}

impl From<&DbAgent> for AuthenticatedAgent {
    fn from(agent: &DbAgent) -> Self {
        Self {
            id: agent.id,
            name: agent.name.clone(),
        }
    }
}
