//! External wallet repository

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::error::on_unique;
use crate::{Database, DbError, DbResult, DbWallet, NewWallet, WalletStore};

#[async_trait]
impl WalletStore for Database {
    async fn list_wallets(&self, agent_id: Uuid) -> DbResult<Vec<DbWallet>> {
        let wallets = sqlx::query_as::<_, DbWallet>(
            r#"
            SELECT * FROM wallets
            WHERE agent_id = $1
            ORDER BY is_primary DESC, created_at ASC
            "#,
        )
        .bind(agent_id)
        .fetch_all(&self.pg)
        .await?;

        Ok(wallets)
    }

    async fn connect_wallet(&self, new: NewWallet) -> DbResult<DbWallet> {
        let mut tx = self.pg.begin().await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM wallets WHERE agent_id = $1")
            .bind(new.agent_id)
            .fetch_one(&mut *tx)
            .await?;

        // The first wallet always becomes primary
        let primary = new.set_primary || existing == 0;
        if primary {
            sqlx::query("UPDATE wallets SET is_primary = FALSE WHERE agent_id = $1 AND is_primary")
                .bind(new.agent_id)
                .execute(&mut *tx)
                .await?;
        }

        let wallet = sqlx::query_as::<_, DbWallet>(
            r#"
            INSERT INTO wallets (agent_id, wallet_address, chain, is_primary)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(new.agent_id)
        .bind(&new.wallet_address)
        .bind(new.chain.as_str())
        .bind(primary)
        .fetch_one(&mut *tx)
        .await
        .map_err(on_unique("wallets_agent_address_key", "This wallet is already connected"))?;

        if primary {
            sqlx::query("UPDATE agents SET primary_wallet = $2, updated_at = NOW() WHERE id = $1")
                .bind(new.agent_id)
                .bind(&new.wallet_address)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!(agent_id = %new.agent_id, chain = %new.chain, primary, "Wallet connected");
        Ok(wallet)
    }

    async fn disconnect_wallet(&self, agent_id: Uuid, wallet_id: Uuid) -> DbResult<()> {
        let mut tx = self.pg.begin().await?;

        let was_primary: bool = sqlx::query_scalar(
            "DELETE FROM wallets WHERE id = $1 AND agent_id = $2 RETURNING is_primary",
        )
        .bind(wallet_id)
        .bind(agent_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::NotFound("Wallet not found".to_string()))?;

        if was_primary {
            sqlx::query("UPDATE agents SET primary_wallet = NULL, updated_at = NOW() WHERE id = $1")
                .bind(agent_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(())
    }
}
