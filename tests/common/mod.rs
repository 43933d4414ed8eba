//! In-process stand-in for the marketplace REST API.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use advosia::client::utils::session_store::{MemoryStorage, SessionStorage};
use advosia::client::views::ViewContext;
use advosia::common::config::{ClientConfig, SessionBackend};
use advosia::common::models::{Bid, BidStatus, Case, CaseStatus, Role, UserId, UserRecord, UserStatus};
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::Notify;

/// One request as the backend saw it.
#[derive(Debug, Clone)]
pub struct Hit {
    pub method: String,
    pub path: String,
    pub bearer: Option<String>,
}

/// Parks the next `GET /api/cases` until released.
#[derive(Clone)]
pub struct Hold {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[derive(Default)]
struct Db {
    users: Vec<UserRecord>,
    passwords: HashMap<UserId, String>,
    tokens: HashMap<String, UserId>,
    cases: Vec<Case>,
    bids: Vec<Bid>,
    next_id: i64,
    issued: u64,
}

impl Db {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn stamp(&self, id: i64) -> DateTime<Utc> {
        // strictly increasing so "newest first" is deterministic
        Utc::now() - Duration::days(1) + Duration::seconds(id)
    }

    fn issue_token(&mut self, user: UserId) -> String {
        self.issued += 1;
        let token = format!("tok-{}-{}", user, self.issued);
        self.tokens.insert(token.clone(), user);
        token
    }

    fn user(&self, id: UserId) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.id == id)
    }
}

#[derive(Clone, Default)]
struct App {
    db: Arc<Mutex<Db>>,
    hits: Arc<Mutex<Vec<Hit>>>,
    hold: Arc<Mutex<Option<Hold>>>,
}

fn fail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

impl App {
    fn caller(&self, headers: &HeaderMap) -> Result<UserRecord, Response> {
        let db = self.db.lock();
        bearer(headers)
            .and_then(|t| db.tokens.get(&t).copied())
            .and_then(|id| db.user(id).cloned())
            .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Token is not valid"))
    }

    fn admin(&self, headers: &HeaderMap) -> Result<UserRecord, Response> {
        let user = self.caller(headers)?;
        if user.role != Role::Admin {
            return Err(fail(StatusCode::FORBIDDEN, "Admin access required"));
        }
        Ok(user)
    }
}

async fn record(State(app): State<App>, req: Request, next: Next) -> Response {
    app.hits.lock().push(Hit {
        method: req.method().to_string(),
        path: req.uri().path().to_string(),
        bearer: bearer(req.headers()),
    });
    next.run(req).await
}

fn str_field(body: &Value, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).map(str::to_string)
}

async fn register(State(app): State<App>, Json(body): Json<Value>) -> Response {
    let (Some(name), Some(email), Some(password)) =
        (str_field(&body, "name"), str_field(&body, "email"), str_field(&body, "password"))
    else {
        return fail(StatusCode::BAD_REQUEST, "name, email and password are required");
    };
    let role: Role = match body.get("role").cloned().map(serde_json::from_value) {
        Some(Ok(r)) => r,
        None => Role::Client,
        Some(Err(_)) => return fail(StatusCode::BAD_REQUEST, "invalid role"),
    };
    let mut db = app.db.lock();
    if db.users.iter().any(|u| u.email == email) {
        return fail(StatusCode::BAD_REQUEST, "User already exists");
    }
    let id = db.next_id();
    let status = if role == Role::Lawyer { UserStatus::Pending } else { UserStatus::Active };
    let user = UserRecord {
        id,
        name,
        email,
        role,
        status,
        verified: status == UserStatus::Active,
        specialization: None,
        created_at: Some(db.stamp(id)),
    };
    db.users.push(user.clone());
    db.passwords.insert(id, password);
    let token = db.issue_token(id);
    (StatusCode::CREATED, Json(json!({ "token": token, "user": user.summary() }))).into_response()
}

async fn login(State(app): State<App>, Json(body): Json<Value>) -> Response {
    let email = str_field(&body, "email").unwrap_or_default();
    let password = str_field(&body, "password").unwrap_or_default();
    let mut db = app.db.lock();
    let Some(user) = db.users.iter().find(|u| u.email == email).cloned() else {
        return fail(StatusCode::UNAUTHORIZED, "Invalid credentials");
    };
    if db.passwords.get(&user.id) != Some(&password) {
        return fail(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }
    let token = db.issue_token(user.id);
    Json(json!({ "token": token, "user": user.summary() })).into_response()
}

async fn me(State(app): State<App>, headers: HeaderMap) -> Response {
    match app.caller(&headers) {
        Ok(user) => Json(json!({ "user": user.summary() })).into_response(),
        Err(r) => r,
    }
}

fn list_cases_now(app: &App, headers: &HeaderMap, q: &HashMap<String, String>) -> Response {
    if let Err(r) = app.caller(headers) {
        return r;
    }
    let db = app.db.lock();
    let cases: Vec<Case> = db
        .cases
        .iter()
        .filter(|c| q.get("status").map_or(true, |s| c.status.as_str() == s))
        .filter(|c| q.get("category").map_or(true, |s| &c.category == s))
        .filter(|c| q.get("user_id").map_or(true, |s| c.user_id.to_string() == *s))
        .cloned()
        .collect();
    Json(cases).into_response()
}

async fn list_cases(State(app): State<App>, headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> Response {
    let hold = app.hold.lock().take();
    if let Some(hold) = hold {
        hold.entered.notify_one();
        hold.release.notified().await;
    }
    list_cases_now(&app, &headers, &q)
}

async fn get_case(State(app): State<App>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if let Err(r) = app.caller(&headers) {
        return r;
    }
    match app.db.lock().cases.iter().find(|c| c.id == id) {
        Some(c) => Json(c.clone()).into_response(),
        None => fail(StatusCode::NOT_FOUND, "Case not found"),
    }
}

async fn create_case(State(app): State<App>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let user = match app.caller(&headers) {
        Ok(u) => u,
        Err(r) => return r,
    };
    if user.role != Role::Client {
        return fail(StatusCode::FORBIDDEN, "Only clients can create cases");
    }
    let Some(title) = str_field(&body, "title").filter(|t| !t.is_empty()) else {
        return fail(StatusCode::BAD_REQUEST, "Title is required");
    };
    let mut db = app.db.lock();
    let id = db.next_id();
    let now = db.stamp(id);
    let case = Case {
        id,
        title,
        description: str_field(&body, "description").unwrap_or_default(),
        category: str_field(&body, "category").unwrap_or_default(),
        status: CaseStatus::Open,
        budget: body.get("budget").and_then(Value::as_f64),
        currency: str_field(&body, "currency").unwrap_or_else(|| "USD".into()),
        user_id: user.id,
        created_at: now,
        updated_at: now,
    };
    db.cases.push(case.clone());
    (StatusCode::CREATED, Json(case)).into_response()
}

fn may_manage(user: &UserRecord, case: &Case) -> bool {
    user.role == Role::Admin || case.user_id == user.id
}

async fn update_case(
    State(app): State<App>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let user = match app.caller(&headers) {
        Ok(u) => u,
        Err(r) => return r,
    };
    let mut db = app.db.lock();
    let Some(case) = db.cases.iter_mut().find(|c| c.id == id) else {
        return fail(StatusCode::NOT_FOUND, "Case not found");
    };
    if !may_manage(&user, case) {
        return fail(StatusCode::FORBIDDEN, "Not authorized");
    }
    if let Some(v) = str_field(&body, "title") {
        case.title = v;
    }
    if let Some(v) = str_field(&body, "description") {
        case.description = v;
    }
    if let Some(v) = str_field(&body, "category") {
        case.category = v;
    }
    if let Some(v) = str_field(&body, "currency") {
        case.currency = v;
    }
    if let Some(v) = body.get("budget").and_then(Value::as_f64) {
        case.budget = Some(v);
    }
    case.updated_at = Utc::now();
    Json(case.clone()).into_response()
}

async fn delete_case(State(app): State<App>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    let user = match app.caller(&headers) {
        Ok(u) => u,
        Err(r) => return r,
    };
    let mut db = app.db.lock();
    let Some(case) = db.cases.iter().find(|c| c.id == id) else {
        return fail(StatusCode::NOT_FOUND, "Case not found");
    };
    if !may_manage(&user, case) {
        return fail(StatusCode::FORBIDDEN, "Not authorized");
    }
    db.cases.retain(|c| c.id != id);
    db.bids.retain(|b| b.case_id != id);
    Json(json!({ "message": "Case removed" })).into_response()
}

async fn case_status(
    State(app): State<App>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let user = match app.caller(&headers) {
        Ok(u) => u,
        Err(r) => return r,
    };
    let Some(Ok(next)) = body.get("status").cloned().map(serde_json::from_value::<CaseStatus>) else {
        return fail(StatusCode::BAD_REQUEST, "invalid status");
    };
    let mut db = app.db.lock();
    let Some(case) = db.cases.iter_mut().find(|c| c.id == id) else {
        return fail(StatusCode::NOT_FOUND, "Case not found");
    };
    if !may_manage(&user, case) {
        return fail(StatusCode::FORBIDDEN, "Not authorized");
    }
    if !case.status.can_transition_to(next) {
        return fail(StatusCode::BAD_REQUEST, "Invalid status transition");
    }
    case.status = next;
    case.updated_at = Utc::now();
    Json(case.clone()).into_response()
}

async fn create_bid(State(app): State<App>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let user = match app.caller(&headers) {
        Ok(u) => u,
        Err(r) => return r,
    };
    if user.role != Role::Lawyer {
        return fail(StatusCode::FORBIDDEN, "Only lawyers can bid");
    }
    let case_id = body.get("case_id").and_then(Value::as_i64).unwrap_or_default();
    let mut db = app.db.lock();
    let Some(case) = db.cases.iter().find(|c| c.id == case_id).cloned() else {
        return fail(StatusCode::NOT_FOUND, "Case not found");
    };
    if case.status != CaseStatus::Open {
        return fail(StatusCode::BAD_REQUEST, "Case is not open for bids");
    }
    let id = db.next_id();
    let bid = Bid {
        id,
        case_id,
        lawyer_name: user.name.clone(),
        lawyer_email: user.email.clone(),
        amount: body.get("amount").and_then(Value::as_f64).unwrap_or_default(),
        currency: case.currency.clone(),
        message: str_field(&body, "message").unwrap_or_default(),
        status: BidStatus::Pending,
        case_title: None,
        created_at: Some(db.stamp(id)),
    };
    db.bids.push(bid.clone());
    (StatusCode::CREATED, Json(bid)).into_response()
}

async fn case_bids(State(app): State<App>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if let Err(r) = app.caller(&headers) {
        return r;
    }
    let bids: Vec<Bid> = app.db.lock().bids.iter().filter(|b| b.case_id == id).cloned().collect();
    // this listing is wrapped, unlike /cases
    Json(json!({ "data": bids })).into_response()
}

async fn list_bids(State(app): State<App>, headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> Response {
    if let Err(r) = app.admin(&headers) {
        return r;
    }
    let db = app.db.lock();
    let bids: Vec<Bid> = db
        .bids
        .iter()
        .filter(|b| q.get("status").map_or(true, |s| b.status.as_str() == s))
        .map(|b| {
            let mut b = b.clone();
            b.case_title = db.cases.iter().find(|c| c.id == b.case_id).map(|c| c.title.clone());
            b
        })
        .collect();
    Json(bids).into_response()
}

async fn bid_status(
    State(app): State<App>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let user = match app.caller(&headers) {
        Ok(u) => u,
        Err(r) => return r,
    };
    let Some(Ok(next)) = body.get("status").cloned().map(serde_json::from_value::<BidStatus>) else {
        return fail(StatusCode::BAD_REQUEST, "invalid status");
    };
    let mut db = app.db.lock();
    let Some(case_id) = db.bids.iter().find(|b| b.id == id).map(|b| b.case_id) else {
        return fail(StatusCode::NOT_FOUND, "Bid not found");
    };
    let allowed = db.cases.iter().find(|c| c.id == case_id).is_some_and(|c| may_manage(&user, c));
    if !allowed {
        return fail(StatusCode::FORBIDDEN, "Not authorized");
    }
    let Some(bid) = db.bids.iter_mut().find(|b| b.id == id) else {
        return fail(StatusCode::NOT_FOUND, "Bid not found");
    };
    if !bid.status.can_transition_to(next) {
        return fail(StatusCode::BAD_REQUEST, "Bid already decided");
    }
    bid.status = next;
    Json(bid.clone()).into_response()
}

async fn list_users(State(app): State<App>, headers: HeaderMap) -> Response {
    if let Err(r) = app.admin(&headers) {
        return r;
    }
    Json(app.db.lock().users.clone()).into_response()
}

async fn get_user(State(app): State<App>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    let caller = match app.caller(&headers) {
        Ok(u) => u,
        Err(r) => return r,
    };
    if caller.role != Role::Admin && caller.id != id {
        return fail(StatusCode::FORBIDDEN, "Not authorized");
    }
    match app.db.lock().user(id) {
        Some(u) => Json(u.clone()).into_response(),
        None => fail(StatusCode::NOT_FOUND, "User not found"),
    }
}

async fn update_user(
    State(app): State<App>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let caller = match app.caller(&headers) {
        Ok(u) => u,
        Err(r) => return r,
    };
    if caller.role != Role::Admin && caller.id != id {
        return fail(StatusCode::FORBIDDEN, "Not authorized");
    }
    let mut db = app.db.lock();
    if let Some(new) = str_field(&body, "new_password") {
        if str_field(&body, "current_password").as_ref() != db.passwords.get(&id) {
            return fail(StatusCode::BAD_REQUEST, "Current password is incorrect");
        }
        db.passwords.insert(id, new);
    }
    let Some(user) = db.users.iter_mut().find(|u| u.id == id) else {
        return fail(StatusCode::NOT_FOUND, "User not found");
    };
    if let Some(v) = str_field(&body, "name") {
        user.name = v;
    }
    if let Some(v) = str_field(&body, "email") {
        user.email = v;
    }
    Json(user.clone()).into_response()
}

async fn delete_user(State(app): State<App>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if let Err(r) = app.admin(&headers) {
        return r;
    }
    let mut db = app.db.lock();
    if db.user(id).is_none() {
        return fail(StatusCode::NOT_FOUND, "User not found");
    }
    db.users.retain(|u| u.id != id);
    db.tokens.retain(|_, u| *u != id);
    StatusCode::NO_CONTENT.into_response()
}

async fn user_status(
    State(app): State<App>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(r) = app.admin(&headers) {
        return r;
    }
    let Some(Ok(next)) = body.get("status").cloned().map(serde_json::from_value::<UserStatus>) else {
        return fail(StatusCode::BAD_REQUEST, "invalid status");
    };
    let mut db = app.db.lock();
    let Some(user) = db.users.iter_mut().find(|u| u.id == id) else {
        return fail(StatusCode::NOT_FOUND, "User not found");
    };
    user.status = next;
    user.verified = user.verified || next == UserStatus::Active;
    Json(user.clone()).into_response()
}

pub struct Backend {
    pub url: String,
    app: App,
}

impl Backend {
    pub async fn start() -> Backend {
        let app = App::default();
        let router = Router::new()
            .route("/api/auth/register", post(register))
            .route("/api/auth/login", post(login))
            .route("/api/auth/me", get(me))
            .route("/api/cases", get(list_cases).post(create_case))
            .route("/api/cases/{id}", get(get_case).put(update_case).delete(delete_case))
            .route("/api/cases/{id}/status", put(case_status))
            .route("/api/bids", get(list_bids).post(create_bid))
            .route("/api/bids/case/{id}", get(case_bids))
            .route("/api/bids/{id}/status", put(bid_status))
            .route("/api/users", get(list_users))
            .route("/api/users/{id}", get(get_user).put(update_user).delete(delete_user))
            .route("/api/users/{id}/status", put(user_status))
            .layer(middleware::from_fn_with_state(app.clone(), record))
            .with_state(app.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind fake backend");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move { axum::serve(listener, router).await.expect("serve fake backend") });
        Backend { url: format!("http://{}/api", addr), app }
    }

    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::default().with_api_url(self.url.clone());
        config.session_backend = SessionBackend::Memory;
        config
    }

    /// A fresh client with nothing stored.
    pub fn context(&self) -> ViewContext {
        self.context_with(Arc::new(MemoryStorage::default()))
    }

    pub fn context_with(&self, storage: Arc<dyn SessionStorage>) -> ViewContext {
        ViewContext::bootstrap(&self.config(), storage).expect("bootstrap client")
    }

    /// A client already logged in as `email`.
    pub async fn logged_in(&self, email: &str, password: &str) -> ViewContext {
        let ctx = self.context();
        ctx.store().login(email, password).await.expect("login");
        ctx
    }

    pub fn seed_user(&self, name: &str, email: &str, password: &str, role: Role) -> UserRecord {
        let mut db = self.app.db.lock();
        let id = db.next_id();
        let user = UserRecord {
            id,
            name: name.into(),
            email: email.into(),
            role,
            status: UserStatus::Active,
            verified: true,
            specialization: None,
            created_at: Some(db.stamp(id)),
        };
        db.users.push(user.clone());
        db.passwords.insert(id, password.into());
        user
    }

    pub fn seed_pending_lawyer(&self, name: &str, email: &str) -> UserRecord {
        let mut user = self.seed_user(name, email, "secret1", Role::Lawyer);
        let mut db = self.app.db.lock();
        if let Some(u) = db.users.iter_mut().find(|u| u.id == user.id) {
            u.status = UserStatus::Pending;
            u.verified = false;
            user = u.clone();
        }
        user
    }

    pub fn seed_case(&self, owner: UserId, title: &str, status: CaseStatus) -> Case {
        let mut db = self.app.db.lock();
        let id = db.next_id();
        let now = db.stamp(id);
        let case = Case {
            id,
            title: title.into(),
            description: format!("{} details", title),
            category: "Family".into(),
            status,
            budget: Some(1000.0),
            currency: "USD".into(),
            user_id: owner,
            created_at: now,
            updated_at: now,
        };
        db.cases.push(case.clone());
        case
    }

    pub fn seed_bid(&self, case_id: i64, lawyer: &UserRecord, amount: f64) -> Bid {
        let mut db = self.app.db.lock();
        let id = db.next_id();
        let bid = Bid {
            id,
            case_id,
            lawyer_name: lawyer.name.clone(),
            lawyer_email: lawyer.email.clone(),
            amount,
            currency: "USD".into(),
            message: format!("offer from {}", lawyer.name),
            status: BidStatus::Pending,
            case_title: None,
            created_at: Some(db.stamp(id)),
        };
        db.bids.push(bid.clone());
        bid
    }

    pub fn case(&self, id: i64) -> Option<Case> {
        self.app.db.lock().cases.iter().find(|c| c.id == id).cloned()
    }

    pub fn bids(&self) -> Vec<Bid> {
        self.app.db.lock().bids.clone()
    }

    pub fn user(&self, id: UserId) -> Option<UserRecord> {
        self.app.db.lock().user(id).cloned()
    }

    /// Every issued token stops working, as after a server-side expiry.
    pub fn revoke_tokens(&self) {
        self.app.db.lock().tokens.clear();
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.app.hits.lock().clone()
    }

    pub fn hit_count(&self) -> usize {
        self.app.hits.lock().len()
    }

    pub fn hold_next_case_list(&self) -> Hold {
        let hold = Hold { entered: Arc::new(Notify::new()), release: Arc::new(Notify::new()) };
        *self.app.hold.lock() = Some(hold.clone());
        hold
    }
}
