//! Axum REST API handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::bidding::BidEvaluator;
use crate::errors::{MarketError, Result};
use crate::models::{Bid, Buyer, Project, Seller};
use crate::projects::SharedProjectStore;

#[derive(Clone)]
pub struct ApiState {
    pub projects: SharedProjectStore,
    pub bids: BidEvaluator,
}

impl ApiState {
    pub fn new(projects: SharedProjectStore) -> Self {
        Self {
            bids: BidEvaluator::new(projects.clone()),
            projects,
        }
    }
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/create-project", post(create_project))
        .route("/create-seller", post(create_seller))
        .route("/create-buyer", post(create_buyer))
        .route("/update-bid", put(update_bid))
        .route("/get-projects", get(get_projects))
        .route("/compute-bid", post(compute_bid))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

/// `?projectID=` query string. Absent means the empty identifier.
#[derive(Debug, Deserialize)]
pub struct ProjectQuery {
    #[serde(rename = "projectID", default)]
    pub project_id: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for MarketError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {self}");
        } else {
            warn!("Rejected request: {self}");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

fn decode<T: DeserializeOwned>(body: &Bytes) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| MarketError::Decode(e.to_string()))
}

fn created() -> Response {
    (StatusCode::CREATED, Json(Value::Null)).into_response()
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /create-project`
pub async fn create_project(State(state): State<Arc<ApiState>>, body: Bytes) -> Result<Response> {
    let project: Project = decode(&body)?;
    state.projects.create_project(project).await?;
    Ok(created())
}

/// `POST /create-seller`
pub async fn create_seller(State(state): State<Arc<ApiState>>, body: Bytes) -> Result<Response> {
    let seller: Seller = decode(&body)?;
    state.projects.create_seller(seller).await?;
    Ok(created())
}

/// `POST /create-buyer`
pub async fn create_buyer(State(state): State<Arc<ApiState>>, body: Bytes) -> Result<Response> {
    let buyer: Buyer = decode(&body)?;
    state.projects.create_buyer(buyer).await?;
    Ok(created())
}

/// `PUT /update-bid?projectID=<id>`
///
/// The body is the bid; it is merged into the project's bid map by id.
pub async fn update_bid(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ProjectQuery>,
    body: Bytes,
) -> Result<Response> {
    let bid: Bid = decode(&body)?;
    state.bids.place_bid(&query.project_id, bid).await?;
    Ok(created())
}

/// `GET /get-projects`
pub async fn get_projects(State(state): State<Arc<ApiState>>) -> Result<Json<Vec<Project>>> {
    Ok(Json(state.projects.get_projects().await?))
}

/// `POST /compute-bid?projectID=<id>`
///
/// Returns the buyer holding the lowest bid on the project.
pub async fn compute_bid(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<Buyer>> {
    Ok(Json(state.bids.compute_winner(&query.project_id).await?))
}

#[cfg(test)]
mod tests {
    use reqwest::Client;
    use serde_json::json;

    use super::*;
    use crate::projects::in_memory_manager;

    /// Serve the API on an ephemeral port and return its base URL.
    async fn spawn_app() -> String {
        let state = Arc::new(ApiState::new(Arc::new(in_memory_manager())));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn post_json(client: &Client, url: String, body: Value) -> reqwest::Response {
        client.post(url).json(&body).send().await.unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let base = spawn_app().await;
        let body: Value = reqwest::get(format!("{base}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn lowest_bid_wins_end_to_end() {
        let base = spawn_app().await;
        let client = Client::new();

        for (id, name) in [("buyer1", "Ann"), ("buyer2", "Bea")] {
            let res = post_json(
                &client,
                format!("{base}/create-buyer"),
                json!({ "id": id, "buyer_id": id, "buyer_name": name }),
            )
            .await;
            assert_eq!(res.status(), StatusCode::CREATED);
        }
        let res = post_json(
            &client,
            format!("{base}/create-seller"),
            json!({ "id": "seller1", "seller_name": "Sam" }),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = post_json(
            &client,
            format!("{base}/create-project"),
            json!({ "id": "P1", "details": ["roof repair"], "seller_id": "seller1" }),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);

        for bid in [
            json!({ "id": "b1", "seller_id": "seller1", "buyer_id": "buyer1", "amount": 200 }),
            json!({ "id": "b2", "seller_id": "seller1", "buyer_id": "buyer2", "ammount": 100 }),
        ] {
            let res = client
                .put(format!("{base}/update-bid?projectID=P1"))
                .json(&bid)
                .send()
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::CREATED);
        }

        let res = client
            .post(format!("{base}/compute-bid?projectID=P1"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let winner: Buyer = res.json().await.unwrap();
        assert_eq!(winner.id, "buyer2");
        assert_eq!(winner.buyer_name, "Bea");

        let projects: Vec<Project> = reqwest::get(format!("{base}/get-projects"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].bid_count(), 2);
    }

    #[tokio::test]
    async fn project_without_bids_cannot_be_computed() {
        let base = spawn_app().await;
        let client = Client::new();

        post_json(&client, format!("{base}/create-project"), json!({ "id": "P2" })).await;

        let res = client
            .post(format!("{base}/compute-bid?projectID=P2"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = res.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("no bids"));
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let base = spawn_app().await;
        let client = Client::new();

        let res = client
            .post(format!("{base}/create-buyer"))
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = client
            .put(format!("{base}/update-bid?projectID=P1"))
            .json(&json!({ "id": "b1", "amount": "cheap" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bid_on_unknown_project_is_server_error() {
        let base = spawn_app().await;
        let res = Client::new()
            .put(format!("{base}/update-bid"))
            .json(&json!({ "id": "b1", "buyer_id": "buyer1", "amount": 5 }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn empty_listing_is_an_empty_array() {
        let base = spawn_app().await;
        let res = reqwest::get(format!("{base}/get-projects")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let projects: Vec<Value> = res.json().await.unwrap();
        assert!(projects.is_empty());
    }
}
