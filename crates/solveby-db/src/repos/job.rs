//! Job repository: acceptance, direct hire, delivery, completion, messages, reviews

use async_trait::async_trait;
use solveby_types::{
    BalanceReason, JobStatus, ProposalStatus, RequestStatus, COMPLETION_KARMA,
    DELIVERY_MESSAGE_PREFIX,
};
use sqlx::PgConnection;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::on_unique;
use crate::ledger::adjust_balance;
use crate::repos::insert_notification;
use crate::{
    AcceptProposal, Database, DbError, DbJob, DbMessage, DbProposal, DbRequest, DbResult, DbReview,
    JobFilter, JobListing, JobStore, MessageListing, NewHire, NewNotification, NewReview,
    ReviewListing,
};

/// Explain why a conditional status update matched nothing
async fn missed_transition(conn: &mut PgConnection, id: Uuid, expected: &str) -> DbError {
    let status: Result<Option<String>, sqlx::Error> =
        sqlx::query_scalar("SELECT status FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await;

    match status {
        Ok(Some(status)) => {
            warn!(job_id = %id, %status, expected, "Job transition refused");
            DbError::InvalidState(format!("Job must be {} (current status: {})", expected, status))
        }
        Ok(None) => DbError::NotFound("Job not found".to_string()),
        Err(e) => DbError::Query(e),
    }
}

async fn lock_job(conn: &mut PgConnection, id: Uuid) -> DbResult<DbJob> {
    sqlx::query_as::<_, DbJob>("SELECT * FROM jobs WHERE id = $1 FOR SHARE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::NotFound("Job not found".to_string()))
}

#[async_trait]
impl JobStore for Database {
    async fn accept_proposal(&self, accept: AcceptProposal) -> DbResult<DbJob> {
        let mut tx = self.pg.begin().await?;

        let request_id: Uuid = sqlx::query_scalar("SELECT request_id FROM proposals WHERE id = $1")
            .bind(accept.proposal_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::NotFound("Proposal not found".to_string()))?;

        // Request first, then proposals: the same order submission uses
        let request = sqlx::query_as::<_, DbRequest>("SELECT * FROM requests WHERE id = $1 FOR UPDATE")
            .bind(request_id)
            .fetch_one(&mut *tx)
            .await?;

        let proposal = sqlx::query_as::<_, DbProposal>("SELECT * FROM proposals WHERE id = $1 FOR UPDATE")
            .bind(accept.proposal_id)
            .fetch_one(&mut *tx)
            .await?;

        if request.agent_id != accept.client_id {
            return Err(DbError::Forbidden(
                "You can only accept proposals on your own requests".to_string(),
            ));
        }
        if request.status != RequestStatus::Open {
            warn!(request_id = %request.id, status = %request.status, "Acceptance refused");
            return Err(DbError::InvalidState("This request is no longer open".to_string()));
        }
        if proposal.status != ProposalStatus::Pending {
            return Err(DbError::InvalidState("This proposal is no longer pending".to_string()));
        }

        let job = sqlx::query_as::<_, DbJob>(
            r#"
            INSERT INTO jobs (request_id, proposal_id, client_id, provider_id, title, price, deadline)
            VALUES ($1, $2, $3, $4, $5, $6, NOW() + make_interval(days => $7))
            RETURNING *
            "#,
        )
        .bind(request.id)
        .bind(proposal.id)
        .bind(accept.client_id)
        .bind(proposal.agent_id)
        .bind(&request.title)
        .bind(proposal.price)
        .bind(proposal.estimated_days)
        .fetch_one(&mut *tx)
        .await?;

        adjust_balance(
            &mut *tx,
            accept.client_id,
            -proposal.price,
            BalanceReason::JobPayment,
            Some(("job", job.id)),
            Some(request.title.as_str()),
        )
        .await?;

        sqlx::query("UPDATE proposals SET status = 'accepted', updated_at = NOW() WHERE id = $1")
            .bind(proposal.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE proposals SET status = 'rejected', updated_at = NOW()
            WHERE request_id = $1 AND id <> $2 AND status = 'pending'
            "#,
        )
        .bind(request.id)
        .bind(proposal.id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE requests SET status = 'in_progress', updated_at = NOW() WHERE id = $1")
            .bind(request.id)
            .execute(&mut *tx)
            .await?;

        insert_notification(&mut *tx, &NewNotification::proposal_accepted(&job, &accept.client_name)).await?;

        tx.commit().await?;

        info!(job_id = %job.id, request_id = %request.id, price = %job.price, "Proposal accepted");
        Ok(job)
    }

    async fn hire_service(&self, hire: NewHire) -> DbResult<DbJob> {
        let mut tx = self.pg.begin().await?;

        let active: bool = sqlx::query_scalar(
            "SELECT active FROM services WHERE id = $1 AND deleted_at IS NULL FOR SHARE",
        )
        .bind(hire.service_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::NotFound("Service not found".to_string()))?;

        if !active {
            return Err(DbError::InvalidState(
                "This service is not currently available".to_string(),
            ));
        }

        let job = sqlx::query_as::<_, DbJob>(
            r#"
            INSERT INTO jobs
                (service_id, client_id, provider_id, title, price, package_tier, addons,
                 requirements, max_revisions, deadline)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(hire.service_id)
        .bind(hire.client_id)
        .bind(hire.provider_id)
        .bind(&hire.title)
        .bind(hire.quote.price)
        .bind(hire.quote.tier.map(|t| t.as_str()))
        .bind(&hire.addons)
        .bind(&hire.requirements)
        .bind(hire.quote.revisions)
        .bind(hire.deadline)
        .fetch_one(&mut *tx)
        .await?;

        adjust_balance(
            &mut *tx,
            hire.client_id,
            -job.price,
            BalanceReason::JobPayment,
            Some(("job", job.id)),
            Some(hire.title.as_str()),
        )
        .await?;

        sqlx::query("UPDATE services SET orders_count = orders_count + 1 WHERE id = $1")
            .bind(hire.service_id)
            .execute(&mut *tx)
            .await?;

        insert_notification(&mut *tx, &NewNotification::order_received(&job, &hire.client_name)).await?;

        tx.commit().await?;

        info!(job_id = %job.id, service_id = %hire.service_id, price = %job.price, "Service hired");
        Ok(job)
    }

    async fn find_job(&self, id: Uuid) -> DbResult<Option<DbJob>> {
        let job = sqlx::query_as::<_, DbJob>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pg)
            .await?;

        Ok(job)
    }

    async fn list_jobs(&self, filter: JobFilter) -> DbResult<Vec<JobListing>> {
        let jobs = sqlx::query_as::<_, JobListing>(
            r#"
            SELECT j.*, c.name AS client_name, p.name AS provider_name
            FROM jobs j
            JOIN agents c ON c.id = j.client_id
            JOIN agents p ON p.id = j.provider_id
            WHERE CASE $2::text
                    WHEN 'client' THEN j.client_id = $1
                    WHEN 'provider' THEN j.provider_id = $1
                    ELSE j.client_id = $1 OR j.provider_id = $1
                  END
              AND ($3::text IS NULL OR j.status = $3)
            ORDER BY j.created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.agent_id)
        .bind(filter.role.map(|r| r.as_str()))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.page.limit)
        .bind(filter.page.offset)
        .fetch_all(&self.pg)
        .await?;

        Ok(jobs)
    }

    async fn deliver_job(&self, id: Uuid, message: Option<String>) -> DbResult<DbJob> {
        let mut tx = self.pg.begin().await?;

        let delivered = sqlx::query_as::<_, DbJob>(
            r#"
            UPDATE jobs SET status = 'delivered', delivered_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = 'in_progress'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let job = match delivered {
            Some(job) => job,
            None => return Err(missed_transition(&mut *tx, id, JobStatus::InProgress.as_str()).await),
        };

        if let Some(note) = message.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            sqlx::query("INSERT INTO job_messages (job_id, sender_id, content) VALUES ($1, $2, $3)")
                .bind(job.id)
                .bind(job.provider_id)
                .bind(format!("{}{}", DELIVERY_MESSAGE_PREFIX, note))
                .execute(&mut *tx)
                .await?;
        }

        insert_notification(&mut *tx, &NewNotification::job_delivered(&job)).await?;

        tx.commit().await?;

        info!(job_id = %job.id, "Job delivered");
        Ok(job)
    }

    async fn complete_job(&self, id: Uuid) -> DbResult<DbJob> {
        let mut tx = self.pg.begin().await?;

        // Only one caller can move the row out of 'delivered', so the
        // provider is credited at most once however often this is retried.
        let completed = sqlx::query_as::<_, DbJob>(
            r#"
            UPDATE jobs SET status = 'completed', completed_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = 'delivered'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let job = match completed {
            Some(job) => job,
            None => return Err(missed_transition(&mut *tx, id, JobStatus::Delivered.as_str()).await),
        };

        adjust_balance(
            &mut *tx,
            job.provider_id,
            job.price,
            BalanceReason::JobEarning,
            Some(("job", job.id)),
            Some(job.title.as_str()),
        )
        .await?;

        sqlx::query("UPDATE agents SET karma = karma + $2, updated_at = NOW() WHERE id = $1")
            .bind(job.provider_id)
            .bind(COMPLETION_KARMA)
            .execute(&mut *tx)
            .await?;

        if let Some(request_id) = job.request_id {
            sqlx::query(
                r#"
                UPDATE requests SET status = 'completed', updated_at = NOW()
                WHERE id = $1 AND status = 'in_progress'
                "#,
            )
            .bind(request_id)
            .execute(&mut *tx)
            .await?;
        }

        insert_notification(&mut *tx, &NewNotification::job_completed(&job)).await?;

        tx.commit().await?;

        info!(job_id = %job.id, provider_id = %job.provider_id, amount = %job.price, "Job completed");
        Ok(job)
    }

    async fn post_message(&self, job_id: Uuid, sender_id: Uuid, content: String) -> DbResult<DbMessage> {
        let mut tx = self.pg.begin().await?;

        let job = lock_job(&mut *tx, job_id).await?;
        if job.status.is_closed() {
            return Err(DbError::InvalidState("Cannot send messages to a closed job".to_string()));
        }

        let message = sqlx::query_as::<_, DbMessage>(
            r#"
            INSERT INTO job_messages (job_id, sender_id, content)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(sender_id)
        .bind(&content)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(message)
    }

    async fn list_messages(&self, job_id: Uuid) -> DbResult<Vec<MessageListing>> {
        let messages = sqlx::query_as::<_, MessageListing>(
            r#"
            SELECT m.*, a.name AS sender_name
            FROM job_messages m
            JOIN agents a ON a.id = m.sender_id
            WHERE m.job_id = $1
            ORDER BY m.created_at ASC
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pg)
        .await?;

        Ok(messages)
    }

    async fn submit_review(&self, new: NewReview) -> DbResult<DbReview> {
        let mut tx = self.pg.begin().await?;

        let job = lock_job(&mut *tx, new.job_id).await?;
        if job.status != JobStatus::Completed {
            return Err(DbError::InvalidState("You can only review completed jobs".to_string()));
        }

        let review = sqlx::query_as::<_, DbReview>(
            r#"
            INSERT INTO reviews (job_id, reviewer_id, reviewee_id, rating, content)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(new.job_id)
        .bind(new.reviewer_id)
        .bind(new.reviewee_id)
        .bind(new.rating.value())
        .bind(&new.content)
        .fetch_one(&mut *tx)
        .await
        .map_err(on_unique("reviews_job_reviewer_key", "You have already reviewed this job"))?;

        let delta = new.rating.karma_delta();
        if delta != 0 {
            sqlx::query("UPDATE agents SET karma = karma + $2, updated_at = NOW() WHERE id = $1")
                .bind(new.reviewee_id)
                .bind(delta)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(service_id) = job.service_id.filter(|_| new.reviewee_id == job.provider_id) {
            sqlx::query(
                r#"
                UPDATE services SET avg_rating = (
                    SELECT ROUND(AVG(r.rating)::numeric, 2)
                    FROM reviews r
                    JOIN jobs j ON j.id = r.job_id
                    WHERE j.service_id = $1 AND r.reviewee_id = j.provider_id
                )
                WHERE id = $1
                "#,
            )
            .bind(service_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(job_id = %new.job_id, rating = review.rating, karma_delta = delta, "Review submitted");
        Ok(review)
    }

    async fn list_job_reviews(&self, job_id: Uuid) -> DbResult<Vec<ReviewListing>> {
        let reviews = sqlx::query_as::<_, ReviewListing>(
            r#"
            SELECT r.*, a.name AS reviewer_name
            FROM reviews r
            JOIN agents a ON a.id = r.reviewer_id
            WHERE r.job_id = $1
            ORDER BY r.created_at ASC
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pg)
        .await?;

        Ok(reviews)
    }

    async fn list_agent_reviews(&self, agent_id: Uuid, limit: i64) -> DbResult<Vec<ReviewListing>> {
        let reviews = sqlx::query_as::<_, ReviewListing>(
            r#"
            SELECT r.*, a.name AS reviewer_name
            FROM reviews r
            JOIN agents a ON a.id = r.reviewer_id
            WHERE r.reviewee_id = $1
            ORDER BY r.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(agent_id)
        .bind(limit)
        .fetch_all(&self.pg)
        .await?;

        Ok(reviews)
    }
}
