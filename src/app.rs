use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    middleware::from_fn,
    response::{IntoResponse, Json},
    routing::{get, patch, post},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{PasswordHasher, Sha256Hasher};
use crate::config::AppConfig;
use crate::database::Executor;
use crate::handlers::{auth, companies, jobs, users};
use crate::middleware::{authenticate_jwt, ensure_admin, ensure_correct_user_or_admin, ensure_logged_in};

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Executor>,
    pub hasher: Arc<dyn PasswordHasher>,
}

impl AppState {
    /// Uses the configured password hash work factor.
    pub fn new(db: impl Executor + 'static) -> Self {
        Self::with_hasher(db, Sha256Hasher::from_config())
    }

    pub fn with_hasher(db: impl Executor + 'static, hasher: impl PasswordHasher + 'static) -> Self {
        Self {
            db: Arc::new(db),
            hasher: Arc::new(hasher),
        }
    }
}

/// Build the router with the global config.
pub fn app(state: AppState) -> Router {
    app_with(state, crate::config::config())
}

pub fn app_with(state: AppState, config: &AppConfig) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_routes())
        .merge(company_routes())
        .merge(job_routes())
        .merge(user_routes())
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
                .layer(from_fn(authenticate_jwt)),
        );

    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security.cors_origins));
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/token", post(auth::token))
        .route("/auth/register", post(auth::register))
        .route("/auth/whoami", get(auth::whoami).route_layer(from_fn(ensure_logged_in)))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            get(users::list).post(users::create).route_layer(from_fn(ensure_admin)),
        )
        .route(
            "/users/:username",
            get(users::get)
                .patch(users::update)
                .delete(users::remove)
                .route_layer(from_fn(ensure_correct_user_or_admin)),
        )
        .route(
            "/users/:username/job/:id",
            post(users::apply).route_layer(from_fn(ensure_correct_user_or_admin)),
        )
}

fn company_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/companies",
            get(companies::list).merge(post(companies::create).route_layer(from_fn(ensure_admin))),
        )
        .route(
            "/companies/:handle",
            get(companies::get).merge(
                patch(companies::update)
                    .delete(companies::remove)
                    .route_layer(from_fn(ensure_admin)),
            ),
        )
}

fn job_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/jobs",
            get(jobs::list).merge(post(jobs::create).route_layer(from_fn(ensure_admin))),
        )
        .route(
            "/jobs/:title",
            get(jobs::get).merge(patch(jobs::update).delete(jobs::remove).route_layer(from_fn(ensure_admin))),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    if allowed.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Jobly API",
            "version": version,
            "endpoints": {
                "companies": "/companies[/:handle] (GET public, writes admin)",
                "jobs": "/jobs[/:title] (GET public, writes admin)",
                "users": "/users[/:username[/job/:id]] (admin, or the same user)",
                "auth": "/auth/token, /auth/register (public), /auth/whoami (logged in)",
                "health": "/health (public)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.db.fetch_all("SELECT 1 AS ok", &[]).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{create_token, Claims};
    use crate::testing::RecordingExecutor;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use serde_json::json;
    use tower::ServiceExt;

    fn c1() -> Value {
        json!({
            "handle": "c1",
            "name": "C1",
            "description": "Desc1",
            "numEmployees": 1,
            "logoUrl": "http://c1.img"
        })
    }

    fn bearer(username: &str, is_admin: bool) -> String {
        let token = create_token(&Claims::new(username, is_admin)).unwrap();
        format!("Bearer {}", token)
    }

    fn request(method: Method, uri: &str, auth: Option<String>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(db: RecordingExecutor, req: Request<Body>) -> (StatusCode, Value) {
        let response = app(AppState::new(db)).oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn lists_companies_anonymously() {
        let db = RecordingExecutor::new().respond(vec![c1()]);

        let (status, body) = send(db, request(Method::GET, "/companies?minEmployees=1", None, None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"][0]["handle"], json!("c1"));
    }

    #[tokio::test]
    async fn rejects_unknown_filter_keys() {
        let (status, body) =
            send(RecordingExecutor::new(), request(Method::GET, "/companies?colour=red", None, None)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!(true));
    }

    #[tokio::test]
    async fn inverted_range_is_bad_request() {
        let (status, _) = send(
            RecordingExecutor::new(),
            request(Method::GET, "/companies?minEmployees=3&maxEmployees=1", None, None),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_requires_admin() {
        let payload = json!({"handle": "new", "name": "New", "description": "D"});

        let (anon, _) = send(
            RecordingExecutor::new(),
            request(Method::POST, "/companies", None, Some(payload.clone())),
        )
        .await;
        let (user, _) = send(
            RecordingExecutor::new(),
            request(Method::POST, "/companies", Some(bearer("u1", false)), Some(payload)),
        )
        .await;

        assert_eq!(anon, StatusCode::UNAUTHORIZED);
        assert_eq!(user, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_creates_company() {
        let db = RecordingExecutor::new().respond_empty().respond(vec![c1()]);
        let payload = json!({
            "handle": "c1",
            "name": "C1",
            "description": "Desc1",
            "numEmployees": 1,
            "logoUrl": "http://c1.img"
        });

        let (status, body) = send(
            db,
            request(Method::POST, "/companies", Some(bearer("admin", true)), Some(payload.clone())),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"], payload);
    }

    #[tokio::test]
    async fn invalid_company_reports_fields() {
        let payload = json!({"handle": "c1", "name": "C1", "description": "D", "logoUrl": "not-a-url"});

        let (status, body) = send(
            RecordingExecutor::new(),
            request(Method::POST, "/companies", Some(bearer("admin", true)), Some(payload)),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], json!("VALIDATION_ERROR"));
        assert!(body["field_errors"]["logoUrl"].is_string());
    }

    #[tokio::test]
    async fn malformed_json_is_invalid_json() {
        let req = Request::builder()
            .method(Method::PATCH)
            .uri("/jobs/j1")
            .header(header::AUTHORIZATION, bearer("admin", true))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"salary\": "))
            .unwrap();

        let (status, body) = send(RecordingExecutor::new(), req).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], json!("INVALID_JSON"));
    }

    #[tokio::test]
    async fn patch_with_unknown_field_is_bad_request() {
        let (status, body) = send(
            RecordingExecutor::new(),
            request(
                Method::PATCH,
                "/companies/c1",
                Some(bearer("admin", true)),
                Some(json!({"handle": "c1-new"})),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("handle"));
    }

    #[tokio::test]
    async fn missing_job_is_not_found() {
        let (status, body) = send(RecordingExecutor::new(), request(Method::GET, "/jobs/nope", None, None)).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], json!("NOT_FOUND"));
    }

    #[tokio::test]
    async fn delete_reports_key() {
        let db = RecordingExecutor::new().respond(vec![json!({"title": "j1"})]);

        let (status, body) = send(db, request(Method::DELETE, "/jobs/j1", Some(bearer("admin", true)), None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!({"deleted": "j1"}));
    }

    #[tokio::test]
    async fn whoami_needs_a_token() {
        let (anon, _) = send(RecordingExecutor::new(), request(Method::GET, "/auth/whoami", None, None)).await;
        let (status, body) = send(
            RecordingExecutor::new(),
            request(Method::GET, "/auth/whoami", Some(bearer("u1", false)), None),
        )
        .await;

        assert_eq!(anon, StatusCode::UNAUTHORIZED);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!({"username": "u1", "isAdmin": false}));
    }

    #[tokio::test]
    async fn bad_token_is_anonymous() {
        let db = RecordingExecutor::new().respond_empty();

        let (status, _) = send(db, request(Method::GET, "/jobs", Some("Bearer nonsense".to_string()), None)).await;

        assert_eq!(status, StatusCode::OK);
    }

    fn u1() -> Value {
        json!({
            "username": "u1",
            "firstName": "U1F",
            "lastName": "U1L",
            "email": "user1@user.com",
            "isAdmin": false
        })
    }

    #[tokio::test]
    async fn listing_users_is_admin_only() {
        let (anon, _) = send(RecordingExecutor::new(), request(Method::GET, "/users", None, None)).await;
        let (user, _) = send(
            RecordingExecutor::new(),
            request(Method::GET, "/users", Some(bearer("u1", false)), None),
        )
        .await;
        let (admin, body) = send(
            RecordingExecutor::new().respond(vec![u1()]),
            request(Method::GET, "/users", Some(bearer("u3", true)), None),
        )
        .await;

        assert_eq!(anon, StatusCode::UNAUTHORIZED);
        assert_eq!(user, StatusCode::UNAUTHORIZED);
        assert_eq!(admin, StatusCode::OK);
        assert_eq!(body["data"][0]["username"], json!("u1"));
    }

    #[tokio::test]
    async fn users_see_only_themselves() {
        let (other, _) = send(
            RecordingExecutor::new(),
            request(Method::GET, "/users/u2", Some(bearer("u1", false)), None),
        )
        .await;
        let (own, body) = send(
            RecordingExecutor::new().respond(vec![u1()]).respond_empty(),
            request(Method::GET, "/users/u1", Some(bearer("u1", false)), None),
        )
        .await;

        assert_eq!(other, StatusCode::UNAUTHORIZED);
        assert_eq!(own, StatusCode::OK);
        assert_eq!(body["data"], u1());
    }

    #[tokio::test]
    async fn admin_sees_applications() {
        let db = RecordingExecutor::new()
            .respond(vec![json!({
                "username": "u2",
                "firstName": "U2F",
                "lastName": "U2L",
                "email": "user2@user.com",
                "isAdmin": false
            })])
            .respond(vec![json!({"job_id": 4})]);

        let (status, body) = send(db, request(Method::GET, "/users/u2", Some(bearer("u3", true)), None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["jobs"], json!([4]));
    }

    #[tokio::test]
    async fn only_admins_grant_admin() {
        let (status, _) = send(
            RecordingExecutor::new(),
            request(Method::PATCH, "/users/u1", Some(bearer("u1", false)), Some(json!({"isAdmin": true}))),
        )
        .await;
        let (anon, _) = send(
            RecordingExecutor::new(),
            request(Method::PATCH, "/users/u1", None, Some(json!({"firstName": "New"}))),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(anon, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn user_applies_to_job() {
        let db = RecordingExecutor::new()
            .respond(vec![json!({"id": 4})])
            .respond(vec![json!({"username": "u1"})])
            .respond(vec![json!({"job_id": 4})]);

        let (status, body) = send(db, request(Method::POST, "/users/u1/job/4", Some(bearer("u1", false)), None)).await;
        let (other, _) = send(
            RecordingExecutor::new(),
            request(Method::POST, "/users/u2/job/4", Some(bearer("u1", false)), None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!({"applied": 4}));
        assert_eq!(other, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_creates_user_with_token() {
        let db = RecordingExecutor::new().respond_empty().respond(vec![json!({
            "username": "u-new",
            "firstName": "First-new",
            "lastName": "Last-newL",
            "email": "new@email.com",
            "isAdmin": true
        })]);
        let payload = json!({
            "username": "u-new",
            "firstName": "First-new",
            "lastName": "Last-newL",
            "password": "password-new",
            "email": "new@email.com",
            "isAdmin": true
        });

        let (status, body) = send(db, request(Method::POST, "/users", Some(bearer("u3", true)), Some(payload))).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["user"]["isAdmin"], json!(true));
        assert!(body["data"].get("password").is_none());
        let token = body["data"]["token"].as_str().unwrap();
        assert!(crate::auth::decode_token(token).unwrap().is_admin);
    }

    #[tokio::test]
    async fn invalid_user_payloads_are_bad_requests() {
        let (missing, _) = send(
            RecordingExecutor::new(),
            request(Method::POST, "/users", Some(bearer("u3", true)), Some(json!({"username": "u-new"}))),
        )
        .await;
        let (bad_email, body) = send(
            RecordingExecutor::new(),
            request(
                Method::POST,
                "/users",
                Some(bearer("u3", true)),
                Some(json!({
                    "username": "u-new",
                    "firstName": "First-new",
                    "lastName": "Last-newL",
                    "password": "password-new",
                    "email": "not-an-email"
                })),
            ),
        )
        .await;

        assert_eq!(missing, StatusCode::BAD_REQUEST);
        assert_eq!(bad_email, StatusCode::BAD_REQUEST);
        assert!(body["field_errors"]["email"].is_string());
    }

    #[tokio::test]
    async fn wrong_password_gets_no_token() {
        let (status, body) = send(
            RecordingExecutor::new(),
            request(Method::POST, "/auth/token", None, Some(json!({"username": "u1", "password": "nope"}))),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], json!("UNAUTHORIZED"));
    }

    #[tokio::test]
    async fn health_pings_database() {
        let db = RecordingExecutor::new().respond(vec![json!({"ok": 1})]);

        let (status, body) = send(db, request(Method::GET, "/health", None, None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["database"], json!("ok"));
    }
}
