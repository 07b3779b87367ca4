//! Agent repository

use async_trait::async_trait;
use rust_decimal::Decimal;
use solveby_types::BalanceReason;
use tracing::info;
use uuid::Uuid;

use crate::error::on_unique;
use crate::ledger::adjust_balance;
use crate::{
    AgentActivity, AgentStore, AgentUpdate, CompanionFilter, Database, DbAgent, DbError, DbResult,
    NewAgent,
};

#[async_trait]
impl AgentStore for Database {
    async fn register_agent(&self, new: NewAgent) -> DbResult<DbAgent> {
        let mut tx = self.pg.begin().await?;

        let agent_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO agents (name, description, api_key_hash)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.api_key_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(on_unique("agents_name_key", "Name already taken"))?;

        if new.starting_balance > Decimal::ZERO {
            adjust_balance(
                &mut *tx,
                agent_id,
                new.starting_balance,
                BalanceReason::RegistrationBonus,
                Some(("agent", agent_id)),
                Some("Welcome bonus"),
            )
            .await?;
        }

        if let Some(address) = &new.wallet_address {
            sqlx::query(
                r#"
                INSERT INTO wallets (agent_id, wallet_address, chain, is_primary)
                VALUES ($1, $2, 'solana', TRUE)
                "#,
            )
            .bind(agent_id)
            .bind(address)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE agents SET primary_wallet = $2 WHERE id = $1")
                .bind(agent_id)
                .bind(address)
                .execute(&mut *tx)
                .await?;
        }

        let agent = sqlx::query_as::<_, DbAgent>("SELECT * FROM agents WHERE id = $1")
            .bind(agent_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(agent_id = %agent.id, name = %agent.name, "Agent registered");
        Ok(agent)
    }

    async fn find_agent(&self, id: Uuid) -> DbResult<Option<DbAgent>> {
        let agent = sqlx::query_as::<_, DbAgent>("SELECT * FROM agents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pg)
            .await?;

        Ok(agent)
    }

    async fn find_agent_by_name(&self, name: &str) -> DbResult<Option<DbAgent>> {
        let agent = sqlx::query_as::<_, DbAgent>("SELECT * FROM agents WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pg)
            .await?;

        Ok(agent)
    }

    async fn find_agent_by_key_hash(&self, key_hash: &str) -> DbResult<Option<DbAgent>> {
        let agent = sqlx::query_as::<_, DbAgent>("SELECT * FROM agents WHERE api_key_hash = $1")
            .bind(key_hash)
            .fetch_optional(&self.pg)
            .await?;

        Ok(agent)
    }

    async fn touch_agent(&self, id: Uuid) -> DbResult<()> {
        sqlx::query("UPDATE agents SET last_active_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pg)
            .await?;

        Ok(())
    }

    async fn update_agent(&self, id: Uuid, update: AgentUpdate) -> DbResult<DbAgent> {
        let agent = sqlx::query_as::<_, DbAgent>(
            r#"
            UPDATE agents SET
                description = COALESCE($2, description),
                avatar_url = COALESCE($3, avatar_url),
                is_companion = COALESCE($4, is_companion),
                companion_specialty = COALESCE($5, companion_specialty),
                companion_available = COALESCE($6, companion_available),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.description)
        .bind(&update.avatar_url)
        .bind(update.is_companion)
        .bind(&update.companion_specialty)
        .bind(update.companion_available)
        .fetch_optional(&self.pg)
        .await?
        .ok_or_else(|| DbError::NotFound("Agent not found".to_string()))?;

        Ok(agent)
    }

    async fn agent_activity(&self, id: Uuid) -> DbResult<AgentActivity> {
        let counts: (i64, i64, i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM services WHERE agent_id = $1 AND deleted_at IS NULL),
                (SELECT COUNT(*) FROM services WHERE agent_id = $1 AND deleted_at IS NULL AND active),
                (SELECT COUNT(*) FROM requests WHERE agent_id = $1),
                (SELECT COUNT(*) FROM jobs WHERE client_id = $1),
                (SELECT COUNT(*) FROM jobs WHERE provider_id = $1),
                (SELECT COUNT(*) FROM jobs WHERE client_id = $1 AND status = 'completed'),
                (SELECT COUNT(*) FROM jobs WHERE provider_id = $1 AND status = 'completed')
            "#,
        )
        .bind(id)
        .fetch_one(&self.pg)
        .await?;

        let ratings: Vec<(i16, i64)> = sqlx::query_as(
            "SELECT rating, COUNT(*) FROM reviews WHERE reviewee_id = $1 GROUP BY rating",
        )
        .bind(id)
        .fetch_all(&self.pg)
        .await?;

        let mut rating_distribution = [0i64; 5];
        for (rating, count) in ratings {
            if (1..=5).contains(&rating) {
                rating_distribution[(rating - 1) as usize] = count;
            }
        }

        Ok(AgentActivity {
            services_count: counts.0,
            active_services: counts.1,
            requests_count: counts.2,
            jobs_as_client: counts.3,
            jobs_as_provider: counts.4,
            completed_as_client: counts.5,
            completed_as_provider: counts.6,
            rating_distribution,
        })
    }

    async fn leaderboard(&self, limit: i64) -> DbResult<Vec<DbAgent>> {
        let agents = sqlx::query_as::<_, DbAgent>(
            "SELECT * FROM agents ORDER BY karma DESC, created_at ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pg)
        .await?;

        Ok(agents)
    }

    async fn karma_rank(&self, id: Uuid) -> DbResult<i64> {
        let rank: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) + 1 FROM agents
            WHERE karma > (SELECT karma FROM agents WHERE id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&self.pg)
        .await?;

        Ok(rank.unwrap_or(1))
    }

    async fn list_companions(&self, filter: CompanionFilter) -> DbResult<Vec<DbAgent>> {
        let agents = sqlx::query_as::<_, DbAgent>(
            r#"
            SELECT * FROM agents
            WHERE is_companion
              AND ($1::bool IS NULL OR companion_available = $1)
              AND ($2::text IS NULL OR companion_specialty = $2)
            ORDER BY karma DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.available)
        .bind(&filter.specialty)
        .bind(filter.page.limit)
        .bind(filter.page.offset)
        .fetch_all(&self.pg)
        .await?;

        Ok(agents)
    }
}
