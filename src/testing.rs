//! Test helpers: token factory, scripted auth backend, event counter and an
//! in-process fake of the banking backend served by axum on 127.0.0.1:0.

use crate::api::types::{LoginResponse, RegisterRequest};
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::http::{AuthEvent, AuthEventListener};
use crate::session::AuthBackend;
use async_trait::async_trait;
use axum::extract::{Path, Query, Request, State};
use axum::http::{header::AUTHORIZATION, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// JWT-shaped token expiring at `exp` (epoch seconds)
pub fn make_token(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({ "sub": "test", "exp": exp }).to_string());
    format!("{}.{}.signature", header, payload)
}

fn login_response(username: &str, role: &str, user_id: i64) -> LoginResponse {
    LoginResponse {
        username: username.to_string(),
        roles: vec![role.to_string()],
        user_id,
        jwt_token: make_token(chrono::Utc::now().timestamp() + 3600),
    }
}

// =============================================================================
// Scripted auth backend
// =============================================================================

/// Answer given by `ScriptedBackend::validate`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidateOutcome {
    Valid,
    Rejected,
    Unreachable,
}

/// In-memory `AuthBackend` with a switchable validation answer.
///
/// Users: `alice`/`secret` (CLIENT, id 1), `agent`/`secret`
/// (AGENT_GUICHET, id 2).
pub struct ScriptedBackend {
    validate: Mutex<ValidateOutcome>,
    validate_calls: AtomicUsize,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            validate: Mutex::new(ValidateOutcome::Valid),
            validate_calls: AtomicUsize::new(0),
            gate: Mutex::new(None),
        }
    }

    /// Make `validate` wait until the returned gate is notified
    pub fn hold_validate(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn set_validate(&self, outcome: ValidateOutcome) {
        *self.validate.lock().unwrap() = outcome;
    }

    pub fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthBackend for ScriptedBackend {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        match (username, password) {
            ("alice", "secret") => Ok(login_response("alice", "CLIENT", 1)),
            ("agent", "secret") => Ok(login_response("agent", "AGENT_GUICHET", 2)),
            _ => Err(Error::Backend {
                status: 401,
                message: Some("Bad credentials".to_string()),
            }),
        }
    }

    async fn register(&self, request: &RegisterRequest, role: Option<&str>) -> Result<LoginResponse> {
        Ok(login_response(&request.username, role.unwrap_or("CLIENT"), 10))
    }

    async fn validate(&self) -> Result<bool> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let outcome = *self.validate.lock().unwrap();
        match outcome {
            ValidateOutcome::Valid => Ok(true),
            ValidateOutcome::Rejected => Ok(false),
            ValidateOutcome::Unreachable => Err(Error::Network("connection refused".to_string())),
        }
    }
}

// =============================================================================
// Event listener
// =============================================================================

/// Listener that only counts events
#[derive(Debug, Default)]
pub struct EventCounter {
    unauthorized: AtomicUsize,
}

impl EventCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unauthorized(&self) -> usize {
        self.unauthorized.load(Ordering::SeqCst)
    }
}

impl AuthEventListener for EventCounter {
    fn on_auth_event(&self, event: &AuthEvent) {
        match event {
            AuthEvent::Unauthorized { .. } => {
                self.unauthorized.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}

// =============================================================================
// Fake HTTP backend
// =============================================================================

/// Shared state of the fake backend
pub struct BackendState {
    last_authorization: Mutex<Option<String>>,
    requests: Mutex<Vec<String>>,
    failing_reads: Mutex<Vec<String>>,
    validate_calls: AtomicUsize,
    validate_status: AtomicU16,
    next_id: AtomicI64,
    customers: Mutex<Vec<Value>>,
    accounts: Mutex<Vec<Value>>,
    transactions: Mutex<Vec<Value>>,
}

impl BackendState {
    fn new() -> Self {
        let customers = vec![
            json!({"id": 1, "userId": 1, "firstname": "Alice", "lastname": "Durand",
                   "birthdate": "1990-05-04", "email": "alice@example.com",
                   "rib": "FR7600000000001", "hasBankAccount": false}),
            json!({"id": 2, "userId": 3, "firstname": "Bernard", "lastname": "Martin",
                   "birthdate": "1978-11-20", "hasBankAccount": true}),
            json!({"id": 3, "userId": 4, "firstname": "Chloe", "lastname": "Petit",
                   "birthdate": "2001-01-15", "hasBankAccount": true}),
        ];
        let accounts = vec![
            json!({"id": 10, "rib": "FR7600000000001", "amount": 500.0,
                   "createdAt": "2024-01-10T10:00:00", "accountStatus": "OPENED", "customerId": 1}),
            json!({"id": 11, "rib": "FR7600000000002", "amount": 20.0,
                   "createdAt": "2024-02-10T10:00:00", "accountStatus": "SUSPENDED", "customerId": 1}),
        ];
        let transactions = vec![
            json!({"id": 1, "rib": "FR7600000000001", "transactionType": "CREDIT", "amount": 250.0,
                   "description": "Salaire", "transactionDate": "2024-03-01T09:00:00"}),
            json!({"id": 2, "rib": "FR7600000000001", "type": "DEBIT", "amount": 50.0,
                   "motif": "Courses", "createdAt": "2024-03-02T12:30:00"}),
        ];

        Self {
            last_authorization: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            failing_reads: Mutex::new(Vec::new()),
            validate_calls: AtomicUsize::new(0),
            validate_status: AtomicU16::new(200),
            next_id: AtomicI64::new(100),
            customers: Mutex::new(customers),
            accounts: Mutex::new(accounts),
            transactions: Mutex::new(transactions),
        }
    }

    /// `Authorization` header of the most recent request
    pub fn last_authorization(&self) -> Option<String> {
        self.last_authorization.lock().unwrap().clone()
    }

    /// Every request seen, as `"METHOD /path?query"`
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    /// Answer 500 to every GET whose path starts with `prefix`
    pub fn fail_reads(&self, prefix: &str) {
        self.failing_reads.lock().unwrap().push(prefix.to_string());
    }

    fn read_fails(&self, method: &axum::http::Method, path: &str) -> bool {
        *method == axum::http::Method::GET
            && self
                .failing_reads
                .lock()
                .unwrap()
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Status `/auth/validate` answers with (default 200)
    pub fn set_validate_status(&self, status: u16) {
        self.validate_status.store(status, Ordering::SeqCst);
    }

    pub fn account_balance(&self, rib: &str) -> Option<f64> {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a["rib"] == rib)
            .and_then(|a| a["amount"].as_f64())
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

/// Fake backend listening on an ephemeral port; stopped on drop
pub struct FakeBackend {
    pub addr: SocketAddr,
    pub state: Arc<BackendState>,
    handle: JoinHandle<()>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state = Arc::new(BackendState::new());
        let app = Router::new()
            .nest("/api", api_routes())
            .layer(middleware::from_fn_with_state(state.clone(), record))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state, handle }
    }

    /// Client configuration pointing at this backend
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: Some(format!("http://{}/api", self.addr)),
            timeout_secs: 5,
            ..Default::default()
        }
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

type Shared = State<Arc<BackendState>>;

fn api_routes() -> Router<Arc<BackendState>> {
    Router::new()
        .route("/echo-auth", get(echo_auth))
        .route("/always-401", get(always_401))
        .route("/always-400", get(always_400))
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/register/:role", post(register_with_role))
        .route("/auth/validate", get(validate))
        .route("/auth/change-password", post(change_password))
        .route("/auth/users/:username", delete(no_content))
        .route("/clients", get(list_customers))
        .route("/clients/clients", get(paginated_customers))
        .route("/clients/create-client", post(create_client))
        .route("/clients/:id", get(customer_by_id))
        .route(
            "/clients/user/:user_id",
            get(customer_by_user_id).delete(no_content),
        )
        .route("/clients/user/:user_id/details", get(user_details))
        .route("/accounts", get(list_accounts).post(create_account))
        .route("/accounts/:id", get(account_by_id).delete(delete_account))
        .route("/accounts/:id/status", patch(update_status))
        .route("/accounts/rib/:rib", get(account_by_rib))
        .route("/accounts/customer/:customer_id", get(accounts_by_customer))
        .route("/transactions/account/:id", get(transactions_by_account))
        .route("/transactions/rib/:rib", get(transactions_by_rib))
        .route("/transactions/transfer", post(transfer))
}

async fn record(State(state): Shared, request: Request, next: Next) -> Response {
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let line = format!(
        "{} {}",
        request.method(),
        request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
    );
    *state.last_authorization.lock().unwrap() = authorization;
    state.requests.lock().unwrap().push(line);
    if state.read_fails(request.method(), request.uri().path()) {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Service unavailable");
    }
    next.run(request).await
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn page_params(query: &HashMap<String, String>) -> (usize, usize) {
    let page = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(0);
    let size = query.get("size").and_then(|s| s.parse().ok()).unwrap_or(10);
    (page, size.max(1))
}

fn envelope(items: Vec<Value>, page: usize, size: usize) -> Value {
    let total = items.len();
    let content: Vec<Value> = items.into_iter().skip(page * size).take(size).collect();
    json!({
        "content": content,
        "totalElements": total,
        "totalPages": total.div_ceil(size),
        "pageable": { "pageNumber": page, "pageSize": size },
    })
}

async fn echo_auth() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn always_401() -> Response {
    error(StatusCode::UNAUTHORIZED, "Token expired")
}

async fn always_400() -> Response {
    error(StatusCode::BAD_REQUEST, "Invalid request")
}

async fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}

// -- auth ---------------------------------------------------------------------

async fn login(Json(body): Json<Value>) -> Response {
    let username = body["username"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    match (username, password) {
        ("alice", "secret") => Json(login_response("alice", "CLIENT", 1)).into_response(),
        ("agent", "secret") => Json(login_response("agent", "AGENT_GUICHET", 2)).into_response(),
        _ => error(StatusCode::UNAUTHORIZED, "Bad credentials"),
    }
}

fn registered(body: &Value, role: &str) -> Response {
    let username = body["username"].as_str().unwrap_or_default();
    if username == "alice" || username == "agent" {
        return error(StatusCode::BAD_REQUEST, "Username already exists");
    }
    Json(login_response(username, role, 10)).into_response()
}

async fn register(Json(body): Json<Value>) -> Response {
    registered(&body, "CLIENT")
}

async fn register_with_role(Path(role): Path<String>, Json(body): Json<Value>) -> Response {
    registered(&body, &role)
}

async fn validate(State(state): Shared) -> Response {
    state.validate_calls.fetch_add(1, Ordering::SeqCst);
    match state.validate_status.load(Ordering::SeqCst) {
        200 => Json(json!({ "valid": true })).into_response(),
        401 => error(StatusCode::UNAUTHORIZED, "Token expired"),
        other => {
            let status = StatusCode::from_u16(other).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            if status.is_success() {
                status.into_response()
            } else {
                error(status, "Validation unavailable")
            }
        }
    }
}

async fn change_password(Json(body): Json<Value>) -> Response {
    if body["currentPassword"] != "secret" {
        return error(StatusCode::BAD_REQUEST, "Current password is incorrect");
    }
    Json(json!({ "message": "Password changed", "success": true })).into_response()
}

// -- clients ------------------------------------------------------------------

async fn list_customers(State(state): Shared) -> Json<Value> {
    Json(Value::Array(state.customers.lock().unwrap().clone()))
}

async fn paginated_customers(
    State(state): Shared,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let (page, size) = page_params(&query);
    let sort_by = query.get("sortBy").cloned().unwrap_or_else(|| "id".to_string());
    let descending = query.get("sortDir").map(|d| d == "DESC").unwrap_or(false);

    let mut customers = state.customers.lock().unwrap().clone();
    customers.sort_by(|a, b| {
        let ordering = match sort_by.as_str() {
            "firstname" | "lastname" => a[&sort_by]
                .as_str()
                .unwrap_or_default()
                .cmp(b[&sort_by].as_str().unwrap_or_default()),
            _ => a["id"].as_i64().cmp(&b["id"].as_i64()),
        };
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
    Json(envelope(customers, page, size))
}

async fn create_client(State(state): Shared, Json(body): Json<Value>) -> Response {
    if body["role"] != "CLIENT" {
        return error(StatusCode::BAD_REQUEST, "Role must be CLIENT");
    }
    let customer = json!({
        "id": state.next_id(),
        "userId": state.next_id(),
        "firstname": body["firstname"],
        "lastname": body["lastname"],
        "birthdate": body["birthdate"],
        "postalAddress": body["postalAddress"],
        "identityRef": body["identityRef"],
        "email": body["email"],
        "hasBankAccount": false,
    });
    state.customers.lock().unwrap().push(customer.clone());
    Json(json!({
        "username": body["username"],
        "customer": customer,
        "message": "Client created",
    }))
    .into_response()
}

fn find(items: &Mutex<Vec<Value>>, field: &str, value: &Value) -> Option<Value> {
    items.lock().unwrap().iter().find(|item| &item[field] == value).cloned()
}

async fn customer_by_id(State(state): Shared, Path(id): Path<i64>) -> Response {
    match find(&state.customers, "id", &json!(id)) {
        Some(customer) => Json(customer).into_response(),
        None => error(StatusCode::NOT_FOUND, "Customer not found"),
    }
}

async fn customer_by_user_id(State(state): Shared, Path(user_id): Path<i64>) -> Response {
    match find(&state.customers, "userId", &json!(user_id)) {
        Some(customer) => Json(customer).into_response(),
        None => error(StatusCode::NOT_FOUND, "Customer not found"),
    }
}

async fn user_details(State(state): Shared, Path(user_id): Path<i64>) -> Response {
    match find(&state.customers, "userId", &json!(user_id)) {
        Some(customer) => Json(json!({
            "userId": user_id,
            "username": if user_id == 1 { "alice" } else { "user" },
            "email": customer["email"],
            "customerId": customer["id"],
            "firstname": customer["firstname"],
            "lastname": customer["lastname"],
            "birthdate": customer["birthdate"],
        }))
        .into_response(),
        None => error(StatusCode::NOT_FOUND, "User not found"),
    }
}

// -- accounts -----------------------------------------------------------------

async fn list_accounts(State(state): Shared) -> Json<Value> {
    Json(Value::Array(state.accounts.lock().unwrap().clone()))
}

async fn create_account(State(state): Shared, Json(body): Json<Value>) -> Response {
    if body["rib"].as_str().unwrap_or_default().is_empty() {
        return error(StatusCode::BAD_REQUEST, "RIB is required");
    }
    if find(&state.accounts, "rib", &body["rib"]).is_some() {
        return error(StatusCode::CONFLICT, "RIB already exists");
    }
    let account = json!({
        "id": state.next_id(),
        "rib": body["rib"],
        "amount": body["amount"],
        "createdAt": "2024-04-01T10:00:00",
        "accountStatus": "OPENED",
        "customerId": body["customerId"],
    });
    state.accounts.lock().unwrap().push(account.clone());
    Json(account).into_response()
}

async fn account_by_id(State(state): Shared, Path(id): Path<i64>) -> Response {
    match find(&state.accounts, "id", &json!(id)) {
        Some(account) => Json(account).into_response(),
        None => error(StatusCode::NOT_FOUND, "Account not found"),
    }
}

async fn account_by_rib(State(state): Shared, Path(rib): Path<String>) -> Response {
    match find(&state.accounts, "rib", &json!(rib)) {
        Some(account) => Json(account).into_response(),
        None => error(StatusCode::NOT_FOUND, "Account not found"),
    }
}

async fn delete_account(State(state): Shared, Path(id): Path<i64>) -> StatusCode {
    state
        .accounts
        .lock()
        .unwrap()
        .retain(|account| account["id"] != json!(id));
    StatusCode::NO_CONTENT
}

async fn update_status(
    State(state): Shared,
    Path(id): Path<i64>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let Some(status) = query.get("status") else {
        return error(StatusCode::BAD_REQUEST, "Missing status");
    };
    let mut accounts = state.accounts.lock().unwrap();
    match accounts.iter_mut().find(|account| account["id"] == json!(id)) {
        Some(account) => {
            account["accountStatus"] = json!(status);
            Json(account.clone()).into_response()
        }
        None => error(StatusCode::NOT_FOUND, "Account not found"),
    }
}

/// Customer 3's listing always fails
async fn accounts_by_customer(
    State(state): Shared,
    Path(customer_id): Path<i64>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if customer_id == 3 {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Account service unavailable");
    }
    let (page, size) = page_params(&query);
    let accounts: Vec<Value> = state
        .accounts
        .lock()
        .unwrap()
        .iter()
        .filter(|account| account["customerId"] == json!(customer_id))
        .cloned()
        .collect();
    Json(envelope(accounts, page, size)).into_response()
}

// -- transactions -------------------------------------------------------------

fn history(state: &BackendState, rib: &str, query: &HashMap<String, String>) -> Json<Value> {
    let (page, size) = page_params(query);
    let transactions: Vec<Value> = state
        .transactions
        .lock()
        .unwrap()
        .iter()
        .filter(|tx| tx["rib"] == rib)
        .cloned()
        .collect();
    Json(envelope(transactions, page, size))
}

async fn transactions_by_rib(
    State(state): Shared,
    Path(rib): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    history(&state, &rib, &query)
}

async fn transactions_by_account(
    State(state): Shared,
    Path(id): Path<i64>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let rib = find(&state.accounts, "id", &json!(id))
        .and_then(|account| account["rib"].as_str().map(str::to_string))
        .unwrap_or_default();
    history(&state, &rib, &query)
}

async fn transfer(State(state): Shared, Json(body): Json<Value>) -> Response {
    let amount = body["amount"].as_f64().unwrap_or_default();
    let source = body["sourceRib"].as_str().unwrap_or_default().to_string();
    let destination = body["destinationRib"].as_str().unwrap_or_default().to_string();

    let new_balance = {
        let mut accounts = state.accounts.lock().unwrap();
        let Some(account) = accounts.iter_mut().find(|a| a["rib"] == source.as_str()) else {
            return error(StatusCode::NOT_FOUND, "Account not found");
        };
        if account["accountStatus"] != "OPENED" {
            return error(StatusCode::BAD_REQUEST, "Compte inactif");
        }
        let balance = account["amount"].as_f64().unwrap_or_default();
        if amount > balance {
            return error(StatusCode::BAD_REQUEST, "Solde insuffisant");
        }
        account["amount"] = json!(balance - amount);

        if let Some(target) = accounts.iter_mut().find(|a| a["rib"] == destination.as_str()) {
            let current = target["amount"].as_f64().unwrap_or_default();
            target["amount"] = json!(current + amount);
        }
        balance - amount
    };

    let debit = json!({
        "id": state.next_id(),
        "rib": source,
        "transactionType": "DEBIT",
        "amount": amount,
        "motif": body["motif"],
        "relatedRib": destination,
        "transactionDate": "2024-04-02T10:00:00",
    });
    state.transactions.lock().unwrap().insert(0, debit.clone());

    Json(json!({
        "message": "Transfer completed",
        "debitTransaction": debit,
        "newSourceBalance": new_balance,
    }))
    .into_response()
}
