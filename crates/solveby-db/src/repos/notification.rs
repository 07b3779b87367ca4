//! Notification repository

use async_trait::async_trait;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    Database, DbNotification, DbResult, MarkRead, NewNotification, NotificationFilter,
    NotificationPage, NotificationStore,
};

/// Insert a notification on an existing connection, usually inside the
/// transaction of the event that caused it
pub(crate) async fn insert_notification(
    conn: &mut PgConnection,
    notification: &NewNotification,
) -> DbResult<DbNotification> {
    let row = sqlx::query_as::<_, DbNotification>(
        r#"
        INSERT INTO notifications (agent_id, kind, subtype, title, message, data)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(notification.agent_id)
    .bind(notification.kind)
    .bind(notification.subtype)
    .bind(&notification.title)
    .bind(&notification.message)
    .bind(&notification.data)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

#[async_trait]
impl NotificationStore for Database {
    async fn notify(&self, notification: NewNotification) -> DbResult<DbNotification> {
        let mut conn = self.pg.acquire().await?;
        insert_notification(&mut *conn, &notification).await
    }

    async fn list_notifications(&self, filter: NotificationFilter) -> DbResult<NotificationPage> {
        let items = sqlx::query_as::<_, DbNotification>(
            r#"
            SELECT * FROM notifications
            WHERE agent_id = $1
              AND (NOT $2 OR NOT is_read)
              AND ($3::text IS NULL OR kind = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.agent_id)
        .bind(filter.unread_only)
        .bind(&filter.kind)
        .bind(filter.page.limit)
        .bind(filter.page.offset)
        .fetch_all(&self.pg)
        .await?;

        let (total, unread): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COUNT(*) FILTER (WHERE NOT is_read)
            FROM notifications
            WHERE agent_id = $1
            "#,
        )
        .bind(filter.agent_id)
        .fetch_one(&self.pg)
        .await?;

        Ok(NotificationPage { items, total, unread })
    }

    async fn mark_notifications(&self, agent_id: Uuid, mark: MarkRead) -> DbResult<u64> {
        let result = match mark {
            MarkRead::All => {
                sqlx::query("UPDATE notifications SET is_read = TRUE WHERE agent_id = $1 AND NOT is_read")
                    .bind(agent_id)
                    .execute(&self.pg)
                    .await?
            }
            MarkRead::Ids(ids) => {
                sqlx::query(
                    r#"
                    UPDATE notifications SET is_read = TRUE
                    WHERE agent_id = $1 AND id = ANY($2) AND NOT is_read
                    "#,
                )
                .bind(agent_id)
                .bind(&ids)
                .execute(&self.pg)
                .await?
            }
        };

        Ok(result.rows_affected())
    }
}
