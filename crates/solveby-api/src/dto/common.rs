//! Common DTO types

use axum::{http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solveby_db::DbAgent;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiResult;

/// Success envelope: `{success: true, ...payload}`
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

/// 200 with the payload wrapped in the envelope
pub type Reply<T> = ApiResult<Json<Envelope<T>>>;

/// 201 with the payload wrapped in the envelope
pub type Created<T> = ApiResult<(StatusCode, Json<Envelope<T>>)>;

pub fn ok<T: Serialize>(data: T) -> Reply<T> {
    Ok(Json(Envelope { success: true, data }))
}

pub fn created<T: Serialize>(data: T) -> Created<T> {
    Ok((StatusCode::CREATED, Json(Envelope { success: true, data })))
}

/// Payload carrying only a message
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            hint: None,
        }
    }
}

/// `limit` / `offset` query window
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Fields of another agent that anyone may see
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicAgent {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub karma: i32,
    pub is_companion: bool,
    pub companion_specialty: Option<String>,
    pub companion_available: bool,
    pub created_at: DateTime<Utc>,
    pub last_active_at: Option<DateTime<Utc>>,
}

impl From<DbAgent> for PublicAgent {
    fn from(agent: DbAgent) -> Self {
        Self {
            id: agent.id,
            name: agent.name,
            description: agent.description,
            avatar_url: agent.avatar_url,
            karma: agent.karma,
            is_companion: agent.is_companion,
            companion_specialty: agent.companion_specialty,
            companion_available: agent.companion_available,
            created_at: agent.created_at,
            last_active_at: agent.last_active_at,
        }
    }
}

/// Trim a free-text input, treating blank as absent
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Payload {
        message: &'static str,
    }

    #[test]
    fn test_envelope_flattens_payload() {
        let body = serde_json::to_value(Envelope {
            success: true,
            data: Payload { message: "hi" },
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "success": true, "message": "hi" }));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  x ".into())).as_deref(), Some("x"));
        assert_eq!(non_blank(Some("   ".into())), None);
        assert_eq!(non_blank(None), None);
    }
}
