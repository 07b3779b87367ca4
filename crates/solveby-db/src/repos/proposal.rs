//! Proposal repository

use async_trait::async_trait;
use solveby_types::RequestStatus;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::on_unique;
use crate::{Database, DbError, DbProposal, DbResult, NewProposal, ProposalListing, ProposalStore};

#[async_trait]
impl ProposalStore for Database {
    async fn submit_proposal(&self, new: NewProposal) -> DbResult<DbProposal> {
        let mut tx = self.pg.begin().await?;

        // A share lock conflicts with the FOR UPDATE taken by acceptance,
        // so a proposal can never land on a request that was just accepted.
        let status: String = sqlx::query_scalar("SELECT status FROM requests WHERE id = $1 FOR SHARE")
            .bind(new.request_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::NotFound("Request not found".to_string()))?;

        let status = RequestStatus::try_from(status).map_err(|e| DbError::Serialization(e.to_string()))?;
        if !status.is_open() {
            warn!(request_id = %new.request_id, %status, "Proposal refused on closed request");
            return Err(DbError::InvalidState(
                "This request is no longer accepting proposals".to_string(),
            ));
        }

        let proposal = sqlx::query_as::<_, DbProposal>(
            r#"
            INSERT INTO proposals (request_id, agent_id, price, message, estimated_days)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(new.request_id)
        .bind(new.agent_id)
        .bind(new.price)
        .bind(&new.message)
        .bind(new.estimated_days)
        .fetch_one(&mut *tx)
        .await
        .map_err(on_unique(
            "proposals_request_agent_key",
            "You have already submitted a proposal for this request",
        ))?;

        tx.commit().await?;

        info!(proposal_id = %proposal.id, request_id = %proposal.request_id, "Proposal submitted");
        Ok(proposal)
    }

    async fn list_proposals(&self, request_id: Uuid) -> DbResult<Vec<ProposalListing>> {
        let proposals = sqlx::query_as::<_, ProposalListing>(
            r#"
            SELECT p.*, a.name AS agent_name, a.karma AS agent_karma
            FROM proposals p
            JOIN agents a ON a.id = p.agent_id
            WHERE p.request_id = $1
            ORDER BY p.created_at ASC
            "#,
        )
        .bind(request_id)
        .fetch_all(&self.pg)
        .await?;

        Ok(proposals)
    }

    async fn find_proposal(&self, id: Uuid) -> DbResult<Option<DbProposal>> {
        let proposal = sqlx::query_as::<_, DbProposal>("SELECT * FROM proposals WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pg)
            .await?;

        Ok(proposal)
    }

    async fn find_agent_proposal(&self, request_id: Uuid, agent_id: Uuid) -> DbResult<Option<DbProposal>> {
        let proposal = sqlx::query_as::<_, DbProposal>(
            "SELECT * FROM proposals WHERE request_id = $1 AND agent_id = $2",
        )
        .bind(request_id)
        .bind(agent_id)
        .fetch_optional(&self.pg)
        .await?;

        Ok(proposal)
    }
}
