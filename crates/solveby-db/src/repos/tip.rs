//! Tips and audit trail repository

use async_trait::async_trait;
use rust_decimal::Decimal;
use solveby_types::BalanceReason;
use tracing::info;
use uuid::Uuid;

use crate::ledger::{adjust_balance, lock_agents};
use crate::repos::insert_notification;
use crate::{
    Database, DbResult, DbTip, DbTransaction, LedgerStore, NewNotification, NewTip, TipDirection,
    TipListing, TipReceipt,
};

#[async_trait]
impl LedgerStore for Database {
    async fn send_tip(&self, tip: NewTip) -> DbResult<TipReceipt> {
        let mut tx = self.pg.begin().await?;

        lock_agents(&mut *tx, &[tip.from_agent_id, tip.to_agent_id]).await?;

        let row = sqlx::query_as::<_, DbTip>(
            r#"
            INSERT INTO tips (from_agent_id, to_agent_id, amount, message, job_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(tip.from_agent_id)
        .bind(tip.to_agent_id)
        .bind(tip.amount)
        .bind(&tip.message)
        .bind(tip.job_id)
        .fetch_one(&mut *tx)
        .await?;

        let debit = adjust_balance(
            &mut *tx,
            tip.from_agent_id,
            -tip.amount,
            BalanceReason::TipSent,
            Some(("tip", row.id)),
            tip.message.as_deref(),
        )
        .await?;

        adjust_balance(
            &mut *tx,
            tip.to_agent_id,
            tip.amount,
            BalanceReason::TipReceived,
            Some(("tip", row.id)),
            tip.message.as_deref(),
        )
        .await?;

        insert_notification(
            &mut *tx,
            &NewNotification::tip_received(tip.to_agent_id, &tip.from_agent_name, tip.amount, row.id),
        )
        .await?;

        tx.commit().await?;

        info!(tip_id = %row.id, from = %tip.from_agent_id, to = %tip.to_agent_id, amount = %tip.amount, "Tip sent");
        Ok(TipReceipt {
            tip: row,
            sender_balance: debit.balance_after,
        })
    }

    async fn list_tips(&self, agent_id: Uuid, direction: TipDirection, limit: i64) -> DbResult<Vec<TipListing>> {
        let column = match direction {
            TipDirection::Received => "t.to_agent_id",
            TipDirection::Given => "t.from_agent_id",
        };

        let sql = format!(
            r#"
            SELECT t.*, f.name AS from_agent_name, r.name AS to_agent_name
            FROM tips t
            JOIN agents f ON f.id = t.from_agent_id
            JOIN agents r ON r.id = t.to_agent_id
            WHERE {} = $1
            ORDER BY t.created_at DESC
            LIMIT $2
            "#,
            column
        );

        let tips = sqlx::query_as::<_, TipListing>(&sql)
            .bind(agent_id)
            .bind(limit)
            .fetch_all(&self.pg)
            .await?;

        Ok(tips)
    }

    async fn list_transactions(&self, agent_id: Uuid, limit: i64) -> DbResult<Vec<DbTransaction>> {
        let rows = sqlx::query_as::<_, DbTransaction>(
            r#"
            SELECT * FROM crust_transactions
            WHERE agent_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(agent_id)
        .bind(limit)
        .fetch_all(&self.pg)
        .await?;

        Ok(rows)
    }

    async fn escrow_total(&self, agent_id: Uuid) -> DbResult<Decimal> {
        let total: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(price), 0) FROM jobs
            WHERE client_id = $1 AND status IN ('in_progress', 'delivered')
            "#,
        )
        .bind(agent_id)
        .fetch_one(&self.pg)
        .await?;

        Ok(total)
    }
}
