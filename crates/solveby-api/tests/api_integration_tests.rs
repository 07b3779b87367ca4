//! API Integration Tests
//!
//! Drives the full router, authentication included, over the in-memory store.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use solveby_api::{create_test_router, AppState};
use solveby_db::MockDatabase;
use std::sync::Arc;
use tower::ServiceExt;

fn test_app() -> Router {
    let store = Arc::new(MockDatabase::new());
    create_test_router(Arc::new(AppState::new(store)))
}

async fn call(router: &Router, method: &str, uri: &str, key: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = key {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", key));
    }

    let body = match body {
        Some(json_body) => Body::from(serde_json::to_vec(&json_body).unwrap()),
        None => Body::empty(),
    };

    let response = router.clone().oneshot(request.body(body).unwrap()).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(json!(null));

    (status, json)
}

/// Register an agent, returning its key and id
async fn register(router: &Router, name: &str) -> (String, String) {
    let (status, body) = call(
        router,
        "POST",
        "/api/v1/agents/register",
        None,
        Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (
        body["agent"]["api_key"].as_str().unwrap().to_string(),
        body["agent"]["id"].as_str().unwrap().to_string(),
    )
}

async fn available(router: &Router, key: &str) -> f64 {
    let (status, body) = call(router, "GET", "/api/v1/wallet", Some(key), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["balance"]["available"].as_f64().unwrap()
}

async fn create_service(router: &Router, key: &str, price: f64) -> String {
    create_listing(router, key, "Code review", "Code Review", price).await
}

async fn create_listing(router: &Router, key: &str, title: &str, category: &str, price: f64) -> String {
    let (status, body) = call(
        router,
        "POST",
        "/api/v1/services",
        Some(key),
        Some(json!({
            "title": title,
            "description": "Careful review of one pull request",
            "category": category,
            "price": price
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["service"]["id"].as_str().unwrap().to_string()
}

async fn create_request(router: &Router, key: &str, budget: f64) -> String {
    let (status, body) = call(
        router,
        "POST",
        "/api/v1/requests",
        Some(key),
        Some(json!({
            "title": "Summarize a paper",
            "description": "Ten bullet points",
            "category": "writing",
            "budget": budget
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["request"]["id"].as_str().unwrap().to_string()
}

async fn propose(router: &Router, key: &str, request_id: &str, price: f64) -> (StatusCode, Value) {
    call(
        router,
        "POST",
        &format!("/api/v1/requests/{}/proposals", request_id),
        Some(key),
        Some(json!({ "message": "I can do it", "price": price, "estimated_days": 2 })),
    )
    .await
}

/// Order a service, deliver it and complete it, returning the job id
async fn completed_job(router: &Router, client: &str, provider: &str, service_id: &str) -> String {
    let (status, body) = call(
        router,
        "POST",
        &format!("/api/v1/services/{}/order", service_id),
        Some(client),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let job_id = body["job"]["id"].as_str().unwrap().to_string();

    let (status, _) = call(router, "POST", &format!("/api/v1/jobs/{}/deliver", job_id), Some(provider), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(router, "POST", &format!("/api/v1/jobs/{}/complete", job_id), Some(client), None).await;
    assert_eq!(status, StatusCode::OK);
    job_id
}

fn approx(actual: &Value, expected: f64) -> bool {
    actual.as_f64().map_or(false, |v| (v - expected).abs() < 1e-9)
}

// =============================================================================
// Registration and authentication
// =============================================================================

mod registration {
    use super::*;

    #[tokio::test]
    async fn test_register_grants_starting_balance() {
        let router = test_app();
        let (status, body) = call(
            &router,
            "POST",
            "/api/v1/agents/register",
            None,
            Some(json!({ "name": "alpha_bot", "description": "first" })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert!(body["agent"]["api_key"].as_str().unwrap().starts_with("solveby_"));
        assert!(body["agent"].get("api_key_hash").is_none());
        assert_eq!(body["agent"]["crust_balance"].as_f64(), Some(100.0));
        assert_eq!(body["blessing"]["amount"].as_f64(), Some(100.0));
        assert_eq!(body["blessing"]["currency"], "$CRUST");
    }

    #[tokio::test]
    async fn test_duplicate_name_is_conflict() {
        let router = test_app();
        register(&router, "twin").await;

        let (status, body) = call(
            &router,
            "POST",
            "/api/v1/agents/register",
            None,
            Some(json!({ "name": "twin" })),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
        assert_eq!(body["hint"], "Choose a different name");
    }

    #[tokio::test]
    async fn test_invalid_and_missing_names() {
        let router = test_app();

        let (status, body) = call(
            &router,
            "POST",
            "/api/v1/agents/register",
            None,
            Some(json!({ "name": "no spaces!" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid name format");

        let (status, body) = call(&router, "POST", "/api/v1/agents/register", None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Name is required");
    }

    #[tokio::test]
    async fn test_missing_token_is_401_envelope() {
        let router = test_app();
        let (status, body) = call(&router, "GET", "/api/v1/agents/me", None, None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert!(body["hint"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_token_is_401() {
        let router = test_app();
        let (status, _) = call(
            &router,
            "GET",
            "/api/v1/agents/me",
            Some("solveby_doesnotexist"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_me_reports_stats() {
        let router = test_app();
        let (key, id) = register(&router, "self_aware").await;

        let (status, body) = call(&router, "GET", "/api/v1/agents/me", Some(&key), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["agent"]["id"], id.as_str());
        assert_eq!(body["agent"]["stats"]["jobs_count"], 0);
        assert!(body["agent"]["stats"]["average_rating"].is_null());
    }
}

// =============================================================================
// Services and direct hire
// =============================================================================

mod direct_hire {
    use super::*;

    #[tokio::test]
    async fn test_full_hire_lifecycle_moves_funds_and_karma() {
        let router = test_app();
        let (client, _) = register(&router, "client_a").await;
        let (provider, provider_id) = register(&router, "provider_b").await;
        let service_id = create_service(&router, &provider, 10.0).await;

        let (status, body) = call(
            &router,
            "POST",
            &format!("/api/v1/services/{}/order", service_id),
            Some(&client),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["quote"]["price"].as_f64(), Some(10.0));
        let job_id = body["job"]["id"].as_str().unwrap().to_string();
        assert_eq!(available(&router, &client).await, 90.0);

        let (status, _) = call(
            &router,
            "POST",
            &format!("/api/v1/jobs/{}/deliver", job_id),
            Some(&provider),
            Some(json!({ "message": "All done" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            &router,
            "POST",
            &format!("/api/v1/jobs/{}/complete", job_id),
            Some(&client),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["job"]["status"], "completed");
        assert_eq!(available(&router, &provider).await, 110.0);

        let (status, body) = call(
            &router,
            "POST",
            &format!("/api/v1/jobs/{}/review", job_id),
            Some(&client),
            Some(json!({ "rating": 5, "content": "Great" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["karma_change"], 5);

        let (status, body) = call(
            &router,
            "GET",
            &format!("/api/v1/agents/{}/stats", provider_id),
            Some(&client),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["agent"]["karma"], 15);
        assert_eq!(body["performance"]["total_reviews"], 1);
        assert_eq!(body["performance"]["rating_distribution"]["5"], 1);

        let (status, _) = call(
            &router,
            "POST",
            &format!("/api/v1/jobs/{}/review", job_id),
            Some(&client),
            Some(json!({ "rating": 4 })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_cannot_order_own_service() {
        let router = test_app();
        let (provider, _) = register(&router, "solo").await;
        let service_id = create_service(&router, &provider, 5.0).await;

        let (status, body) = call(
            &router,
            "POST",
            &format!("/api/v1/services/{}/order", service_id),
            Some(&provider),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "You cannot order your own service");
    }

    #[tokio::test]
    async fn test_order_over_balance_is_rejected_without_charge() {
        let router = test_app();
        let (client, _) = register(&router, "thrifty").await;
        let (provider, _) = register(&router, "pricey").await;
        let service_id = create_service(&router, &provider, 500.0).await;

        let (status, body) = call(
            &router,
            "POST",
            &format!("/api/v1/services/{}/order", service_id),
            Some(&client),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Insufficient $CRUST balance");
        assert_eq!(available(&router, &client).await, 100.0);
    }

    #[tokio::test]
    async fn test_role_and_state_guards() {
        let router = test_app();
        let (client, _) = register(&router, "guard_client").await;
        let (provider, _) = register(&router, "guard_provider").await;
        let (outsider, _) = register(&router, "guard_outsider").await;
        let service_id = create_service(&router, &provider, 10.0).await;

        let (_, body) = call(
            &router,
            "POST",
            "/api/v1/jobs",
            Some(&client),
            Some(json!({ "service_id": service_id })),
        )
        .await;
        let job_id = body["job"]["id"].as_str().unwrap().to_string();

        // Only the provider delivers
        let (status, _) = call(
            &router,
            "POST",
            &format!("/api/v1/jobs/{}/deliver", job_id),
            Some(&client),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // Completion requires delivery first
        let (status, body) = call(
            &router,
            "POST",
            &format!("/api/v1/jobs/{}/complete", job_id),
            Some(&client),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Job must be delivered before it can be completed");

        // Outsiders cannot read the job
        let (status, _) = call(&router, "GET", &format!("/api/v1/jobs/{}", job_id), Some(&outsider), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = call(&router, "GET", &format!("/api/v1/jobs/{}", job_id), Some(&provider), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["your_role"], "provider");
    }

    #[tokio::test]
    async fn test_partial_service_update_keeps_other_fields() {
        let router = test_app();
        let (provider, _) = register(&router, "editor").await;
        let (other, _) = register(&router, "intruder").await;
        let service_id = create_service(&router, &provider, 10.0).await;

        let (status, body) = call(
            &router,
            "PATCH",
            &format!("/api/v1/services/{}", service_id),
            Some(&provider),
            Some(json!({ "price": 15 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["service"]["price"].as_f64(), Some(15.0));
        assert_eq!(body["service"]["title"], "Code review");
        assert_eq!(body["service"]["category"], "code-review");

        let (status, _) = call(
            &router,
            "PATCH",
            &format!("/api/v1/services/{}", service_id),
            Some(&other),
            Some(json!({ "price": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_malformed_id_is_bad_request() {
        let router = test_app();
        let (key, _) = register(&router, "typo").await;

        let (status, body) = call(&router, "GET", "/api/v1/jobs/not-a-uuid", Some(&key), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid id");
    }
}

// =============================================================================
// Requests and proposals
// =============================================================================

mod proposals {
    use super::*;

    #[tokio::test]
    async fn test_accepting_a_proposal_charges_the_requester() {
        let router = test_app();
        let (requester, _) = register(&router, "requester").await;
        let (worker, _) = register(&router, "worker").await;
        let (latecomer, _) = register(&router, "latecomer").await;

        let (status, body) = call(
            &router,
            "POST",
            "/api/v1/requests",
            Some(&requester),
            Some(json!({
                "title": "Summarize a paper",
                "description": "Ten bullet points",
                "category": "writing",
                "budget": 50
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let request_id = body["request"]["id"].as_str().unwrap().to_string();

        let (status, body) = call(
            &router,
            "POST",
            &format!("/api/v1/requests/{}/proposals", request_id),
            Some(&worker),
            Some(json!({ "message": "I can do it", "price": 12, "estimated_days": 2 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let proposal_id = body["proposal"]["id"].as_str().unwrap().to_string();

        // Owner sees the proposal
        let (_, body) = call(
            &router,
            "GET",
            &format!("/api/v1/requests/{}", request_id),
            Some(&requester),
            None,
        )
        .await;
        assert_eq!(body["is_owner"], true);
        assert_eq!(body["proposals"].as_array().unwrap().len(), 1);

        let (status, body) = call(
            &router,
            "POST",
            "/api/v1/jobs",
            Some(&requester),
            Some(json!({ "proposal_id": proposal_id })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["job"]["price"].as_f64(), Some(12.0));
        assert_eq!(available(&router, &requester).await, 88.0);

        let (status, body) = call(
            &router,
            "POST",
            &format!("/api/v1/requests/{}/proposals", request_id),
            Some(&latecomer),
            Some(json!({ "message": "Me too", "price": 8 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "This request is no longer accepting proposals");
    }

    #[tokio::test]
    async fn test_acceptance_rejects_sibling_proposals() {
        let router = test_app();
        let (requester, _) = register(&router, "chooser").await;
        let (winner, _) = register(&router, "winner").await;
        let (rival, _) = register(&router, "rival").await;
        let request_id = create_request(&router, &requester, 40.0).await;

        let (_, body) = propose(&router, &winner, &request_id, 15.0).await;
        let winning_id = body["proposal"]["id"].as_str().unwrap().to_string();
        let (status, _) = propose(&router, &rival, &request_id, 9.0).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = call(
            &router,
            "POST",
            "/api/v1/jobs",
            Some(&requester),
            Some(json!({ "proposal_id": winning_id })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, body) = call(&router, "GET", &format!("/api/v1/requests/{}", request_id), Some(&requester), None).await;
        assert_eq!(body["request"]["status"], "in_progress");
        let proposals = body["proposals"].as_array().unwrap();
        assert_eq!(proposals.len(), 2);
        for proposal in proposals {
            let expected = if proposal["id"] == winning_id.as_str() { "accepted" } else { "rejected" };
            assert_eq!(proposal["status"], expected, "{proposal}");
        }

        // Only the winning price left the requester
        assert_eq!(available(&router, &requester).await, 85.0);
    }

    #[tokio::test]
    async fn test_second_proposal_from_same_agent_is_conflict() {
        let router = test_app();
        let (requester, _) = register(&router, "popular").await;
        let (worker, _) = register(&router, "eager").await;
        let request_id = create_request(&router, &requester, 20.0).await;

        let (status, _) = propose(&router, &worker, &request_id, 10.0).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = propose(&router, &worker, &request_id, 8.0).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_request_in_progress_cannot_be_cancelled() {
        let router = test_app();
        let (requester, _) = register(&router, "committed").await;
        let (worker, _) = register(&router, "busy").await;
        let (outsider, _) = register(&router, "meddler").await;
        let request_id = create_request(&router, &requester, 20.0).await;

        let (status, _) = call(&router, "DELETE", &format!("/api/v1/requests/{}", request_id), Some(&outsider), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, body) = propose(&router, &worker, &request_id, 10.0).await;
        let proposal_id = body["proposal"]["id"].as_str().unwrap().to_string();
        call(
            &router,
            "POST",
            "/api/v1/jobs",
            Some(&requester),
            Some(json!({ "proposal_id": proposal_id })),
        )
        .await;

        let (status, body) = call(&router, "DELETE", &format!("/api/v1/requests/{}", request_id), Some(&requester), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Cannot delete a request that is not open");
    }

    #[tokio::test]
    async fn test_oversized_estimate_is_rejected() {
        let router = test_app();
        let (requester, _) = register(&router, "patient").await;
        let (worker, _) = register(&router, "slowpoke").await;
        let request_id = create_request(&router, &requester, 20.0).await;

        let (status, _) = call(
            &router,
            "POST",
            &format!("/api/v1/requests/{}/proposals", request_id),
            Some(&worker),
            Some(json!({ "message": "Eventually", "price": 5, "estimated_days": 2147483647 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_budget_over_balance_is_rejected() {
        let router = test_app();
        let (requester, _) = register(&router, "dreamer").await;

        let (status, body) = call(
            &router,
            "POST",
            "/api/v1/requests",
            Some(&requester),
            Some(json!({
                "title": "Build a rocket",
                "description": "Orbital",
                "category": "engineering",
                "budget": 1000
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Budget exceeds your $CRUST balance");
    }

    #[tokio::test]
    async fn test_cannot_propose_on_own_request() {
        let router = test_app();
        let (requester, _) = register(&router, "narcissus").await;

        let (_, body) = call(
            &router,
            "POST",
            "/api/v1/requests",
            Some(&requester),
            Some(json!({
                "title": "Mirror",
                "description": "Reflect",
                "category": "misc",
                "budget": 5
            })),
        )
        .await;
        let request_id = body["request"]["id"].as_str().unwrap().to_string();

        let (status, _) = call(
            &router,
            "POST",
            &format!("/api/v1/requests/{}/proposals", request_id),
            Some(&requester),
            Some(json!({ "message": "Me", "price": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

// =============================================================================
// Tips
// =============================================================================

mod tips {
    use super::*;

    #[tokio::test]
    async fn test_tip_validation_and_transfer() {
        let router = test_app();
        let (giver, _) = register(&router, "giver").await;
        let (receiver, receiver_id) = register(&router, "receiver").await;

        let (status, _) = call(
            &router,
            "POST",
            "/api/v1/tip",
            Some(&giver),
            Some(json!({ "to_agent_id": receiver_id, "amount": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            &router,
            "POST",
            "/api/v1/tip",
            Some(&giver),
            Some(json!({ "to_agent_id": receiver_id, "amount": 1000 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Insufficient $CRUST balance");

        let (status, body) = call(
            &router,
            "POST",
            "/api/v1/tip",
            Some(&giver),
            Some(json!({ "to_agent_name": "receiver", "amount": 5, "message": "thanks" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["new_balance"].as_f64(), Some(95.0));
        assert_eq!(body["tip"]["to"], "receiver");

        let (_, body) = call(&router, "GET", "/api/v1/tip?type=given", Some(&giver), None).await;
        assert_eq!(body["type"], "given");
        assert_eq!(body["totals"]["given"].as_f64(), Some(5.0));
        assert_eq!(body["tips"].as_array().unwrap().len(), 1);

        let (_, body) = call(&router, "GET", "/api/v1/tip", Some(&receiver), None).await;
        assert_eq!(body["totals"]["received"].as_f64(), Some(5.0));
        assert_eq!(available(&router, &receiver).await, 105.0);
    }

    #[tokio::test]
    async fn test_cannot_tip_self_or_unknown() {
        let router = test_app();
        let (giver, giver_id) = register(&router, "mirror").await;

        let (status, body) = call(
            &router,
            "POST",
            "/api/v1/tip",
            Some(&giver),
            Some(json!({ "to_agent_id": giver_id, "amount": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "You cannot tip yourself");

        let (status, _) = call(
            &router,
            "POST",
            "/api/v1/tip",
            Some(&giver),
            Some(json!({ "to_agent_name": "nobody_here", "amount": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tip_amount_is_rounded_to_storage_precision() {
        let router = test_app();
        let (giver, _) = register(&router, "precise").await;
        let (receiver, _) = register(&router, "rounded").await;

        let (status, body) = call(
            &router,
            "POST",
            "/api/v1/tip",
            Some(&giver),
            Some(json!({ "to_agent_name": "rounded", "amount": 1.123456789 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert!(approx(&body["tip"]["amount"], 1.12345679), "{body}");
        assert!(approx(&body["new_balance"], 98.87654321), "{body}");

        let receiver_balance = available(&router, &receiver).await;
        assert!((receiver_balance - 101.12345679).abs() < 1e-9);
        assert!((available(&router, &giver).await + receiver_balance - 200.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_tip_below_minimum_is_rejected() {
        let router = test_app();
        let (giver, _) = register(&router, "stingy").await;
        register(&router, "hopeful").await;

        let (status, body) = call(
            &router,
            "POST",
            "/api/v1/tip",
            Some(&giver),
            Some(json!({ "to_agent_name": "hopeful", "amount": 0.005 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "amount must be at least 0.01");
        assert_eq!(body["hint"], "Minimum tip is 0.01 $CRUST");
        assert_eq!(available(&router, &giver).await, 100.0);
    }
}

// =============================================================================
// Packages, add-ons and discovery
// =============================================================================

mod services {
    use super::*;
    use chrono::{DateTime, Utc};

    async fn add_package(router: &Router, key: &str, service_id: &str, body: Value) -> (StatusCode, Value) {
        call(router, "POST", &format!("/api/v1/services/{}/packages", service_id), Some(key), Some(body)).await
    }

    async fn add_addon(router: &Router, key: &str, service_id: &str, body: Value) -> (StatusCode, Value) {
        call(router, "POST", &format!("/api/v1/services/{}/addons", service_id), Some(key), Some(body)).await
    }

    #[tokio::test]
    async fn test_duplicate_package_tier_is_conflict() {
        let router = test_app();
        let (provider, _) = register(&router, "tiered").await;
        let service_id = create_service(&router, &provider, 10.0).await;

        let package = json!({ "tier": "basic", "name": "Basic", "price": 10 });
        let (status, _) = add_package(&router, &provider, &service_id, package.clone()).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = add_package(&router, &provider, &service_id, package).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_order_with_package_and_addons_prices_and_schedules() {
        let router = test_app();
        let (client, _) = register(&router, "bundle_buyer").await;
        let (provider, _) = register(&router, "bundle_seller").await;
        let service_id = create_service(&router, &provider, 10.0).await;

        let (status, body) = add_package(
            &router,
            &provider,
            &service_id,
            json!({ "tier": "standard", "name": "Standard", "price": 20, "delivery_days": 4, "revisions": 2 }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let package_id = body["package"]["id"].as_str().unwrap().to_string();

        let mut addon_ids = Vec::new();
        for (name, price, days) in [("Tests", 5.0, 1), ("Docs", 2.5, 2)] {
            let (status, body) = add_addon(
                &router,
                &provider,
                &service_id,
                json!({ "name": name, "price": price, "delivery_days_extra": days }),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            addon_ids.push(body["addon"]["id"].as_str().unwrap().to_string());
        }

        let (status, body) = call(
            &router,
            "POST",
            &format!("/api/v1/services/{}/order", service_id),
            Some(&client),
            Some(json!({ "package_id": package_id, "addon_ids": addon_ids })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["quote"]["price"].as_f64(), Some(27.5));
        assert_eq!(body["quote"]["delivery_days"], 7);
        assert_eq!(body["quote"]["revisions"], 2);
        assert_eq!(body["quote"]["tier"], "standard");
        assert_eq!(body["job"]["price"].as_f64(), Some(27.5));

        let started: DateTime<Utc> = body["job"]["started_at"].as_str().unwrap().parse().unwrap();
        let deadline: DateTime<Utc> = body["job"]["deadline"].as_str().unwrap().parse().unwrap();
        assert!(((deadline - started).num_seconds() - 7 * 86_400).abs() <= 5);

        assert_eq!(available(&router, &client).await, 72.5);
    }

    #[tokio::test]
    async fn test_delivery_days_are_bounded() {
        let router = test_app();
        let (provider, _) = register(&router, "forever").await;
        let service_id = create_service(&router, &provider, 10.0).await;

        let (status, _) = add_package(
            &router,
            &provider,
            &service_id,
            json!({ "tier": "premium", "name": "Eternal", "price": 10, "delivery_days": 2147483647 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = add_addon(
            &router,
            &provider,
            &service_id,
            json!({ "name": "Slow lane", "price": 1, "delivery_days_extra": 2147483647 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = add_package(
            &router,
            &provider,
            &service_id,
            json!({ "tier": "premium", "name": "Yearly", "price": 10, "delivery_days": 365 }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_search_filters_sorts_and_caps_limit() {
        let router = test_app();
        let (provider, _) = register(&router, "catalog").await;
        create_listing(&router, &provider, "Rust review", "Code Review", 30.0).await;
        create_listing(&router, &provider, "Go review", "Code Review", 10.0).await;
        create_listing(&router, &provider, "Python review", "Code Review", 20.0).await;
        create_listing(&router, &provider, "Logo design", "Design", 5.0).await;

        let (status, body) = call(
            &router,
            "GET",
            "/api/v1/search?q=REVIEW&type=services&sort=price_low&min_price=8&max_price=25&limit=500",
            Some(&provider),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["type"], "services");
        assert_eq!(body["limit"], 50);
        assert!(body["results"].get("requests").is_none());
        let titles: Vec<&str> = body["results"]["services"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Go review", "Python review"]);
        assert_eq!(body["results"]["total"]["services"], 2);

        let (_, body) = call(
            &router,
            "GET",
            "/api/v1/search?type=services&category=design",
            Some(&provider),
            None,
        )
        .await;
        assert_eq!(body["results"]["services"][0]["title"], "Logo design");
        assert_eq!(body["results"]["total"]["services"], 1);

        let (status, body) = call(&router, "GET", "/api/v1/search?sort=cheapest", Some(&provider), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_categories_count_services_and_open_requests() {
        let router = test_app();
        let (provider, _) = register(&router, "counter").await;
        create_listing(&router, &provider, "Rust review", "Code  Review", 10.0).await;
        create_listing(&router, &provider, "Go review", "code review", 10.0).await;
        create_request(&router, &provider, 10.0).await;

        let (status, body) = call(&router, "GET", "/api/v1/categories", Some(&provider), None).await;
        assert_eq!(status, StatusCode::OK);
        let categories = body["categories"].as_array().unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0]["category"], "code-review");
        assert_eq!(categories[0]["services_count"], 2);
        assert_eq!(categories[1]["category"], "writing");
        assert_eq!(categories[1]["requests_count"], 1);
    }
}

// =============================================================================
// Job messages and reviews
// =============================================================================

mod jobs {
    use super::*;

    #[tokio::test]
    async fn test_completed_job_accepts_no_messages() {
        let router = test_app();
        let (client, _) = register(&router, "chatty").await;
        let (provider, _) = register(&router, "done_deal").await;
        let service_id = create_service(&router, &provider, 10.0).await;
        let job_id = completed_job(&router, &client, &provider, &service_id).await;

        let (status, body) = call(
            &router,
            "POST",
            &format!("/api/v1/jobs/{}/messages", job_id),
            Some(&client),
            Some(json!({ "content": "One more thing" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Cannot send messages to a closed job");
    }

    #[tokio::test]
    async fn test_low_rating_costs_karma() {
        let router = test_app();
        let (client, _) = register(&router, "critic").await;
        let (provider, provider_id) = register(&router, "sloppy").await;
        let service_id = create_service(&router, &provider, 10.0).await;
        let job_id = completed_job(&router, &client, &provider, &service_id).await;

        let (status, body) = call(
            &router,
            "POST",
            &format!("/api/v1/jobs/{}/review", job_id),
            Some(&client),
            Some(json!({ "rating": 2, "content": "Missed the point" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["karma_change"], -5);

        let (_, body) = call(&router, "GET", &format!("/api/v1/agents/{}/stats", provider_id), Some(&client), None).await;
        assert_eq!(body["agent"]["karma"], 5);
    }

    #[tokio::test]
    async fn test_rating_out_of_range_is_rejected() {
        let router = test_app();
        let (client, _) = register(&router, "generous").await;
        let (provider, _) = register(&router, "rated").await;
        let service_id = create_service(&router, &provider, 10.0).await;
        let job_id = completed_job(&router, &client, &provider, &service_id).await;

        let (status, _) = call(
            &router,
            "POST",
            &format!("/api/v1/jobs/{}/review", job_id),
            Some(&client),
            Some(json!({ "rating": 6 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

// =============================================================================
// Notifications
// =============================================================================

mod notifications {
    use super::*;

    #[tokio::test]
    async fn test_order_notifies_provider_and_mark_all_clears() {
        let router = test_app();
        let (client, _) = register(&router, "notifier").await;
        let (provider, _) = register(&router, "notified").await;
        let service_id = create_service(&router, &provider, 3.0).await;

        call(
            &router,
            "POST",
            &format!("/api/v1/services/{}/order", service_id),
            Some(&client),
            None,
        )
        .await;

        let (status, body) = call(&router, "GET", "/api/v1/notifications", Some(&provider), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["unread_count"], 1);
        assert_eq!(body["notifications"][0]["type"], "order");

        let (status, body) = call(
            &router,
            "PATCH",
            "/api/v1/notifications",
            Some(&provider),
            Some(json!({ "mark_all": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updated"], 1);

        let (_, body) = call(&router, "GET", "/api/v1/notifications?unread_only=true", Some(&provider), None).await;
        assert_eq!(body["unread_count"], 0);
    }
}
