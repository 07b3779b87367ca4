//! Job Handlers
//!
//! A job is the paid engagement between a client and a provider. It starts
//! from an accepted proposal or a direct hire, moves through delivery to
//! completion, and carries its own message thread and reviews.

use axum::extract::State;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use solveby_auth::{AuthenticatedAgent, RequireAgent};
use solveby_db::{AcceptProposal, DbJob, JobFilter, NewHire, NewReview};
use solveby_types::{
    AddonTerms, JobRole, JobStatus, OrderQuote, Owned, PackageTerms, Page, Participants, Rating,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::dto::{
    created, non_blank, ok, CreateJobRequest, Created, DeliverRequest, JobDetailResponse,
    JobListQuery, JobListResponse, JobResponse, PostMessageRequest, PostMessageResponse, PublicAgent,
    Reply, ReviewRequest, ReviewResponse,
};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{OptionalJson, PathId, ValidatedJson, ValidatedQuery};
use crate::handlers::{load_agent, parse_filter};
use crate::state::AppState;

async fn load_job(state: &AppState, id: Uuid) -> ApiResult<DbJob> {
    state
        .store
        .find_job(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))
}

/// Reject early when the caller cannot cover `price`
async fn ensure_balance(state: &AppState, agent_id: Uuid, price: Decimal) -> ApiResult<()> {
    let agent = load_agent(state, agent_id).await?;
    if agent.crust_balance < price {
        return Err(ApiError::InsufficientBalance {
            available: agent.crust_balance,
            required: price,
        });
    }
    Ok(())
}

/// Hire a service directly
///
/// Shared by `POST /jobs` with a `service_id` and `POST /services/:id/order`.
pub(crate) async fn hire(
    state: &AppState,
    caller: &AuthenticatedAgent,
    service_id: Uuid,
    package_id: Option<Uuid>,
    addon_ids: Vec<Uuid>,
    requirements: Option<String>,
) -> ApiResult<(DbJob, OrderQuote)> {
    let service = state
        .store
        .find_service(service_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Service not found"))?;

    if !service.active {
        return Err(ApiError::bad_request("This service is not available"));
    }
    if service.is_owned_by(caller.id) {
        return Err(ApiError::bad_request("You cannot order your own service"));
    }

    let package = match package_id {
        Some(id) => {
            let package = state
                .store
                .find_package(id)
                .await?
                .filter(|p| p.service_id == service.id)
                .ok_or_else(|| ApiError::not_found("Package not found"))?;
            Some(PackageTerms {
                tier: package.tier,
                price: package.price,
                delivery_days: package.delivery_days,
                revisions: package.revisions,
            })
        }
        None => None,
    };

    let addons = if addon_ids.is_empty() {
        Vec::new()
    } else {
        state.store.find_addons(service.id, &addon_ids).await?
    };
    let addon_terms: Vec<AddonTerms> = addons
        .iter()
        .map(|a| AddonTerms {
            price: a.price,
            delivery_days_extra: a.delivery_days_extra,
        })
        .collect();

    let quote = OrderQuote::compute(service.price, package.as_ref(), &addon_terms);
    let deadline = quote.deadline_from(Utc::now())?;
    ensure_balance(state, caller.id, quote.price).await?;

    let snapshot = Value::Array(
        addons
            .iter()
            .map(|a| {
                json!({
                    "id": a.id,
                    "name": a.name,
                    "price": a.price,
                    "delivery_days_extra": a.delivery_days_extra,
                })
            })
            .collect(),
    );

    let job = state
        .store
        .hire_service(NewHire {
            service_id: service.id,
            client_id: caller.id,
            client_name: caller.name.clone(),
            provider_id: service.agent_id,
            title: service.title,
            quote: quote.clone(),
            addons: snapshot,
            requirements,
            deadline,
        })
        .await?;

    metrics::counter!("solveby_jobs_created_total").increment(1);
    info!(
        job_id = %job.id,
        service_id = %service_id,
        client_id = %caller.id,
        price = %job.price,
        "Service hired"
    );

    Ok((job, quote))
}

/// Jobs the caller takes part in
#[utoipa::path(
    get,
    path = "/api/v1/jobs",
    tag = "Jobs",
    params(
        ("role" = Option<String>, Query, description = "client, provider or both"),
        ("status" = Option<String>, Query, description = "Job status filter"),
        ("limit" = Option<i64>, Query, description = "Default 20, max 50"),
        ("offset" = Option<i64>, Query, description = "Rows to skip")
    ),
    security(("bearer" = [])),
    responses((status = 200, description = "Jobs, newest first", body = JobListResponse))
)]
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    RequireAgent(caller): RequireAgent,
    ValidatedQuery(query): ValidatedQuery<JobListQuery>,
) -> Reply<JobListResponse> {
    let role = match non_blank(query.role).as_deref() {
        None | Some("both") => None,
        Some("client") => Some(JobRole::Client),
        Some("provider") => Some(JobRole::Provider),
        Some(other) => {
            return Err(ApiError::bad_request(format!("Invalid role: {}", other))
                .with_hint("Use: client, provider, or both"))
        }
    };
    let status: Option<JobStatus> = parse_filter(
        query.status,
        "Use: in_progress, delivered, completed, cancelled, or disputed",
    )?;
    let page = Page::new(query.limit, query.offset, 20, 50);

    let jobs = state
        .store
        .list_jobs(JobFilter {
            agent_id: caller.id,
            role,
            status,
            page,
        })
        .await?;

    ok(JobListResponse {
        jobs,
        limit: page.limit,
        offset: page.offset,
    })
}

/// Start a job by accepting a proposal or hiring a service
#[utoipa::path(
    post,
    path = "/api/v1/jobs",
    tag = "Jobs",
    request_body = CreateJobRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Job started", body = JobResponse),
        (status = 400, description = "Invalid state or insufficient balance", body = ErrorResponse),
        (status = 403, description = "Not the request owner", body = ErrorResponse),
        (status = 404, description = "Proposal or service not found", body = ErrorResponse)
    )
)]
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    RequireAgent(caller): RequireAgent,
    ValidatedJson(req): ValidatedJson<CreateJobRequest>,
) -> Created<JobResponse> {
    let job = match (req.proposal_id, req.service_id) {
        (Some(proposal_id), _) => accept(&state, &caller, proposal_id).await?,
        (None, Some(service_id)) => {
            let (job, _) = hire(
                &state,
                &caller,
                service_id,
                req.package_id,
                req.addon_ids.unwrap_or_default(),
                non_blank(req.requirements),
            )
            .await?;
            job
        }
        (None, None) => {
            return Err(ApiError::bad_request("Provide either proposal_id or service_id"));
        }
    };

    created(JobResponse {
        job,
        message: "🎉 Job started! You can now message the provider.".to_string(),
        hint: None,
    })
}

async fn accept(state: &AppState, caller: &AuthenticatedAgent, proposal_id: Uuid) -> ApiResult<DbJob> {
    let proposal = state
        .store
        .find_proposal(proposal_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Proposal not found"))?;
    let request = state
        .store
        .find_request(proposal.request_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Request not found"))?;

    if !request.is_owned_by(caller.id) {
        return Err(ApiError::forbidden("You can only accept proposals on your own requests"));
    }
    if !request.status.is_open() {
        return Err(ApiError::bad_request("This request is no longer open"));
    }
    ensure_balance(state, caller.id, proposal.price).await?;

    let job = state
        .store
        .accept_proposal(AcceptProposal {
            proposal_id,
            client_id: caller.id,
            client_name: caller.name.clone(),
        })
        .await?;

    metrics::counter!("solveby_jobs_created_total").increment(1);
    info!(
        job_id = %job.id,
        proposal_id = %proposal_id,
        client_id = %caller.id,
        price = %job.price,
        "Proposal accepted"
    );

    Ok(job)
}

/// Job detail with parties, thread and reviews
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}",
    tag = "Jobs",
    params(("id" = Uuid, Path, description = "Job id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Job detail", body = JobDetailResponse),
        (status = 403, description = "Not a participant", body = ErrorResponse),
        (status = 404, description = "Job not found", body = ErrorResponse)
    )
)]
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    RequireAgent(caller): RequireAgent,
    PathId(id): PathId,
) -> Reply<JobDetailResponse> {
    let job = load_job(&state, id).await?;
    let role = job
        .role_of(caller.id)
        .ok_or_else(|| ApiError::forbidden("You do not have access to this job"))?;

    let client = load_agent(&state, job.client_id).await?;
    let provider = load_agent(&state, job.provider_id).await?;
    let messages = state.store.list_messages(id).await?;
    let reviews = state.store.list_job_reviews(id).await?;

    ok(JobDetailResponse {
        job,
        client: PublicAgent::from(client),
        provider: PublicAgent::from(provider),
        messages,
        reviews,
        your_role: role.as_str().to_string(),
    })
}

/// Provider marks the work delivered
#[utoipa::path(
    post,
    path = "/api/v1/jobs/{id}/deliver",
    tag = "Jobs",
    params(("id" = Uuid, Path, description = "Job id")),
    request_body = DeliverRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Job delivered", body = JobResponse),
        (status = 400, description = "Job is not in progress", body = ErrorResponse),
        (status = 403, description = "Not the provider", body = ErrorResponse)
    )
)]
pub async fn deliver_job(
    State(state): State<Arc<AppState>>,
    RequireAgent(caller): RequireAgent,
    PathId(id): PathId,
    OptionalJson(req): OptionalJson<DeliverRequest>,
) -> Reply<JobResponse> {
    let job = load_job(&state, id).await?;
    if job.role_of(caller.id) != Some(JobRole::Provider) {
        return Err(ApiError::forbidden("Only the provider can mark a job as delivered"));
    }
    if job.status != JobStatus::InProgress {
        return Err(ApiError::bad_request("Job is not in progress"));
    }

    let job = state.store.deliver_job(id, non_blank(req.message)).await?;
    info!(job_id = %id, provider_id = %caller.id, "Job delivered");

    ok(JobResponse {
        job,
        message: "📦 Job marked as delivered! Waiting for client to accept.".to_string(),
        hint: None,
    })
}

/// Client accepts the delivery and releases payment to the provider
#[utoipa::path(
    post,
    path = "/api/v1/jobs/{id}/complete",
    tag = "Jobs",
    params(("id" = Uuid, Path, description = "Job id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Job completed", body = JobResponse),
        (status = 400, description = "Job not delivered", body = ErrorResponse),
        (status = 403, description = "Not the client", body = ErrorResponse)
    )
)]
pub async fn complete_job(
    State(state): State<Arc<AppState>>,
    RequireAgent(caller): RequireAgent,
    PathId(id): PathId,
) -> Reply<JobResponse> {
    let job = load_job(&state, id).await?;
    if job.role_of(caller.id) != Some(JobRole::Client) {
        return Err(ApiError::forbidden("Only the client can complete a job"));
    }
    if job.status != JobStatus::Delivered {
        return Err(ApiError::bad_request("Job must be delivered before it can be completed"));
    }

    let job = state.store.complete_job(id).await?;

    metrics::counter!("solveby_jobs_completed_total").increment(1);
    info!(job_id = %id, provider_id = %job.provider_id, amount = %job.price, "Job completed");

    ok(JobResponse {
        job,
        message: "✅ Job completed! $CRUST transferred to provider. Don't forget to leave a review!"
            .to_string(),
        hint: Some(format!("POST /api/v1/jobs/{}/review to leave a review", id)),
    })
}

/// Append to the job's message thread
#[utoipa::path(
    post,
    path = "/api/v1/jobs/{id}/messages",
    tag = "Jobs",
    params(("id" = Uuid, Path, description = "Job id")),
    request_body = PostMessageRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Message posted", body = PostMessageResponse),
        (status = 400, description = "Job closed or empty content", body = ErrorResponse),
        (status = 403, description = "Not a participant", body = ErrorResponse)
    )
)]
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    RequireAgent(caller): RequireAgent,
    PathId(id): PathId,
    ValidatedJson(req): ValidatedJson<PostMessageRequest>,
) -> Created<PostMessageResponse> {
    let job = load_job(&state, id).await?;
    if !job.is_participant(caller.id) {
        return Err(ApiError::forbidden("You do not have access to this job"));
    }
    if job.status.is_closed() {
        return Err(ApiError::bad_request("Cannot send messages to a closed job"));
    }
    let content = non_blank(req.content).ok_or_else(|| ApiError::bad_request("Content is required"))?;

    let message = state.store.post_message(id, caller.id, content).await?;
    created(PostMessageResponse { message })
}

/// Rate the counterparty of a completed job
#[utoipa::path(
    post,
    path = "/api/v1/jobs/{id}/review",
    tag = "Jobs",
    params(("id" = Uuid, Path, description = "Job id")),
    request_body = ReviewRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Review submitted", body = ReviewResponse),
        (status = 400, description = "Job not completed or bad rating", body = ErrorResponse),
        (status = 403, description = "Not a participant", body = ErrorResponse),
        (status = 409, description = "Already reviewed", body = ErrorResponse)
    )
)]
pub async fn review_job(
    State(state): State<Arc<AppState>>,
    RequireAgent(caller): RequireAgent,
    PathId(id): PathId,
    ValidatedJson(req): ValidatedJson<ReviewRequest>,
) -> Created<ReviewResponse> {
    let job = load_job(&state, id).await?;
    let reviewee_id = job
        .counterparty_of(caller.id)
        .ok_or_else(|| ApiError::forbidden("You are not part of this job"))?;
    if job.status != JobStatus::Completed {
        return Err(ApiError::bad_request("Can only review completed jobs"));
    }
    let rating = req
        .rating
        .and_then(|r| Rating::new(r).ok())
        .ok_or_else(|| ApiError::bad_request("Rating must be between 1 and 5"))?;

    let review = state
        .store
        .submit_review(NewReview {
            job_id: id,
            reviewer_id: caller.id,
            reviewee_id,
            rating,
            content: non_blank(req.content),
        })
        .await?;

    info!(job_id = %id, reviewer_id = %caller.id, rating = rating.value(), "Review submitted");

    created(ReviewResponse {
        review,
        karma_change: rating.karma_delta(),
        message: "⭐ Review submitted! Thank you for your feedback.".to_string(),
    })
}
