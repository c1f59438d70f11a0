// Practice Console - API Server
// Serves the console/portal CRUD surface plus the two accounting-platform
// proxy operations: OAuth token exchange and report retrieval.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use practice_console::{
    accept_invitation, delete_client, get_all_clients, get_client, get_connection,
    get_tasks_for_client, insert_client, insert_task, issue_invitation, setup_database,
    summarize_profit_and_loss, update_client, upsert_connection, ClientBusiness, InviteStatus,
    PnlSummary, RefreshLocks, Task, TenantConnection, UpstreamClient, UpstreamConfig,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    upstream: Arc<UpstreamClient>,
    refresh_locks: RefreshLocks,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message.into()),
        }
    }
}

/// 500 with the raw error message in the JSON body.
fn internal_error(context: &str, err: anyhow::Error) -> axum::response::Response {
    eprintln!("Error {}: {:#}", context, err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::err(format!("{:#}", err))),
    )
        .into_response()
}

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Deserialize)]
struct CreateClientRequest {
    name: String,
    industry: Option<String>,
}

#[derive(Deserialize)]
struct UpdateClientRequest {
    name: Option<String>,
    industry: Option<String>,
    tenant_id: Option<String>,
}

#[derive(Deserialize)]
struct CreateTaskRequest {
    title: String,
    due_date: Option<String>,
}

#[derive(Deserialize)]
struct CreateInvitationRequest {
    email: String,
    client_id: String,
    role: String,
}

#[derive(Serialize)]
struct InvitationIssued {
    token: String,
}

#[derive(Deserialize)]
struct ExchangeRequest {
    code: String,
    tenant_id: String,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/clients - List all client businesses
async fn list_clients(State(state): State<AppState>) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match get_all_clients(&conn) {
        Ok(clients) => (StatusCode::OK, Json(ApiResponse::ok(clients))).into_response(),
        Err(e) => internal_error("listing clients", e),
    }
}

/// POST /api/clients - Create a client business
async fn create_client(
    State(state): State<AppState>,
    Json(body): Json<CreateClientRequest>,
) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    let mut client = ClientBusiness::new(body.name);
    client.industry = body.industry;

    match insert_client(&conn, &client) {
        Ok(()) => (StatusCode::CREATED, Json(ApiResponse::ok(client))).into_response(),
        Err(e) => internal_error("creating client", e),
    }
}

/// GET /api/clients/:id - Fetch one client
async fn show_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match get_client(&conn, &id) {
        Ok(Some(client)) => (StatusCode::OK, Json(ApiResponse::ok(client))).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err("Client not found")),
        )
            .into_response(),
        Err(e) => internal_error("fetching client", e),
    }
}

/// PUT /api/clients/:id - Update a client
async fn edit_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateClientRequest>,
) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    let mut client = match get_client(&conn, &id) {
        Ok(Some(client)) => client,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::err("Client not found")),
            )
                .into_response()
        }
        Err(e) => return internal_error("fetching client", e),
    };

    if let Some(name) = body.name {
        client.name = name;
    }
    if body.industry.is_some() {
        client.industry = body.industry;
    }
    if body.tenant_id.is_some() {
        client.tenant_id = body.tenant_id;
    }

    match update_client(&conn, &client) {
        Ok(_) => (StatusCode::OK, Json(ApiResponse::ok(client))).into_response(),
        Err(e) => internal_error("updating client", e),
    }
}

/// DELETE /api/clients/:id - Delete a client
async fn remove_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match delete_client(&conn, &id) {
        Ok(true) => (StatusCode::OK, Json(ApiResponse::ok("deleted"))).into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err("Client not found")),
        )
            .into_response(),
        Err(e) => internal_error("deleting client", e),
    }
}

/// GET /api/clients/:id/tasks - Tasks for one client
async fn list_tasks(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match get_tasks_for_client(&conn, &id) {
        Ok(tasks) => (StatusCode::OK, Json(ApiResponse::ok(tasks))).into_response(),
        Err(e) => internal_error("listing tasks", e),
    }
}

/// POST /api/clients/:id/tasks - Create a task for a client
async fn create_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<CreateTaskRequest>,
) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    let mut task = Task::new(&id, body.title);
    task.due_date = body.due_date;

    match insert_task(&conn, &task) {
        Ok(()) => (StatusCode::CREATED, Json(ApiResponse::ok(task))).into_response(),
        Err(e) => internal_error("creating task", e),
    }
}

/// POST /api/invitations - Issue an invitation
async fn create_invitation(
    State(state): State<AppState>,
    Json(body): Json<CreateInvitationRequest>,
) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match issue_invitation(
        &conn,
        &body.email,
        &body.client_id,
        &body.role,
        chrono::Duration::days(7),
    ) {
        Ok(token) => (
            StatusCode::CREATED,
            Json(ApiResponse::ok(InvitationIssued { token })),
        )
            .into_response(),
        Err(e) => internal_error("issuing invitation", e),
    }
}

/// POST /api/invitations/:token/accept - Accept an invitation
async fn accept_invitation_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match accept_invitation(&conn, &token) {
        Ok(InviteStatus::Valid(invitation)) => {
            (StatusCode::OK, Json(ApiResponse::ok(invitation))).into_response()
        }
        Ok(InviteStatus::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err("Invitation not found")),
        )
            .into_response(),
        Ok(InviteStatus::Expired) => (
            StatusCode::GONE,
            Json(ApiResponse::err("Invitation expired")),
        )
            .into_response(),
        Ok(InviteStatus::AlreadyAccepted) => (
            StatusCode::CONFLICT,
            Json(ApiResponse::err("Invitation already accepted")),
        )
            .into_response(),
        Err(e) => internal_error("accepting invitation", e),
    }
}

/// POST /api/oauth/exchange - Exchange an authorization code and persist the
/// tenant's token pair
async fn oauth_exchange(
    State(state): State<AppState>,
    Json(body): Json<ExchangeRequest>,
) -> impl IntoResponse {
    let token = match state.upstream.exchange_code(&body.code).await {
        Ok(token) => token,
        Err(e) => return internal_error("exchanging code", e),
    };

    let connection = TenantConnection::new(
        &body.tenant_id,
        &token.access_token,
        &token.refresh_token,
        token.expires_in,
    );

    let conn = state.db.lock().unwrap();
    match upsert_connection(&conn, &connection) {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::ok(body.tenant_id))).into_response(),
        Err(e) => internal_error("storing tenant connection", e),
    }
}

/// GET /api/reports/:tenant_id - Fetch and normalize this month's P&L
///
/// Refreshes the stored token first if expired, holding the tenant's refresh
/// lock so concurrent requests don't double-refresh and invalidate each
/// other's rotated refresh token.
async fn tenant_report(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> impl IntoResponse {
    let access_token = match ensure_fresh_token(&state, &tenant_id).await {
        Ok(Some(token)) => token,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::err("Tenant is not connected")),
            )
                .into_response()
        }
        Err(e) => return internal_error("refreshing token", e),
    };

    let doc = match state
        .upstream
        .fetch_report(&access_token, &tenant_id, "ProfitAndLoss", None, None)
        .await
    {
        Ok(doc) => doc,
        Err(e) => return internal_error("fetching report", e),
    };

    let summary: PnlSummary = summarize_profit_and_loss(&doc);
    (StatusCode::OK, Json(ApiResponse::ok(summary))).into_response()
}

/// Return a currently-valid access token for the tenant, refreshing (and
/// persisting the rotated pair) if needed. `None` means the tenant has no
/// stored connection.
async fn ensure_fresh_token(
    state: &AppState,
    tenant_id: &str,
) -> anyhow::Result<Option<String>> {
    let stored = {
        let conn = state.db.lock().unwrap();
        get_connection(&conn, tenant_id)?
    };
    let stored = match stored {
        Some(connection) => connection,
        None => return Ok(None),
    };

    if !stored.is_expired(Utc::now()) {
        return Ok(Some(stored.access_token));
    }

    // Serialize refresh per tenant. A request that waited here re-reads the
    // row: the winner already refreshed, and refreshing again with the old
    // (rotated-out) refresh token would invalidate the new pair.
    let lock = state.refresh_locks.for_tenant(tenant_id);
    let _guard = lock.lock().await;

    let stored = {
        let conn = state.db.lock().unwrap();
        get_connection(&conn, tenant_id)?
    };
    let stored = match stored {
        Some(connection) => connection,
        None => return Ok(None),
    };
    if !stored.is_expired(Utc::now()) {
        return Ok(Some(stored.access_token));
    }

    let token = state.upstream.refresh_token(&stored.refresh_token).await?;
    let refreshed = TenantConnection::new(
        tenant_id,
        &token.access_token,
        &token.refresh_token,
        token.expires_in,
    );

    let conn = state.db.lock().unwrap();
    upsert_connection(&conn, &refreshed)?;

    Ok(Some(refreshed.access_token))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    println!("Practice Console - API Server");

    let db_path = std::env::var("CONSOLE_DB_PATH").unwrap_or_else(|_| "console.db".to_string());
    let conn = Connection::open(&db_path).expect("Failed to open database");
    setup_database(&conn).expect("Failed to set up database");
    println!("✓ Database opened: {}", db_path);

    let config = UpstreamConfig::from_env().expect("Missing accounting platform configuration");

    // Create shared state
    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
        upstream: Arc::new(UpstreamClient::new(config)),
        refresh_locks: RefreshLocks::new(),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/clients", get(list_clients).post(create_client))
        .route(
            "/clients/:id",
            get(show_client).put(edit_client).delete(remove_client),
        )
        .route("/clients/:id/tasks", get(list_tasks).post(create_task))
        .route("/invitations", post(create_invitation))
        .route("/invitations/:token/accept", post(accept_invitation_handler))
        .route("/oauth/exchange", post(oauth_exchange))
        .route("/reports/:tenant_id", get(tenant_report))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    // Start server
    let addr = "0.0.0.0:3000";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    println!("✓ Server running on http://localhost:3000");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
