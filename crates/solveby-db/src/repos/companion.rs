//! Companion session repository

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::error::on_unique;
use crate::{CompanionStore, Database, DbCompanionSession, DbError, DbResult};

#[async_trait]
impl CompanionStore for Database {
    async fn start_session(&self, companion_id: Uuid, client_id: Uuid) -> DbResult<DbCompanionSession> {
        let session = sqlx::query_as::<_, DbCompanionSession>(
            r#"
            INSERT INTO companion_sessions (companion_id, client_id)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(companion_id)
        .bind(client_id)
        .fetch_one(&self.pg)
        .await
        .map_err(on_unique(
            "companion_sessions_one_active",
            "You already have an active session with this companion",
        ))?;

        info!(session_id = %session.id, %companion_id, %client_id, "Companion session started");
        Ok(session)
    }

    async fn find_active_session(&self, companion_id: Uuid, client_id: Uuid) -> DbResult<Option<DbCompanionSession>> {
        let session = sqlx::query_as::<_, DbCompanionSession>(
            r#"
            SELECT * FROM companion_sessions
            WHERE companion_id = $1 AND client_id = $2 AND status = 'active'
            "#,
        )
        .bind(companion_id)
        .bind(client_id)
        .fetch_optional(&self.pg)
        .await?;

        Ok(session)
    }

    async fn end_session(&self, companion_id: Uuid, client_id: Uuid) -> DbResult<DbCompanionSession> {
        let session = sqlx::query_as::<_, DbCompanionSession>(
            r#"
            UPDATE companion_sessions SET status = 'ended', ended_at = NOW()
            WHERE companion_id = $1 AND client_id = $2 AND status = 'active'
            RETURNING *
            "#,
        )
        .bind(companion_id)
        .bind(client_id)
        .fetch_optional(&self.pg)
        .await?
        .ok_or_else(|| DbError::InvalidState("No active session with this companion".to_string()))?;

        info!(session_id = %session.id, "Companion session ended");
        Ok(session)
    }
}
