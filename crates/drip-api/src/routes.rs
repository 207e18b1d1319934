//! API routes

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use drip_common::config::ApiConfig;
use drip_storage::models::{
    Campaign, CampaignCustomer, Customer, EmailLog, EmailTemplate, Stage, Step,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::auth::{require_admin, require_user, AppState};
use crate::handlers::crud::{self, Resource};
use crate::handlers::{auth, health, send, settings, users};

/// Standard CRUD routes for one entity
fn resource_routes<T: Resource>() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(crud::list::<T>).post(crud::create::<T>))
        .route(
            "/:id",
            get(crud::get::<T>)
                .put(crud::update::<T>)
                .delete(crud::delete::<T>),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>, config: &ApiConfig) -> Router {
    // Health check routes (no auth required)
    let health_routes = Router::new()
        .route("/", get(health::health))
        .route("/live", get(health::liveness))
        .route("/ready", get(health::readiness));

    // Email log routes (read only)
    let email_log_routes = Router::new()
        .route("/", get(crud::list::<EmailLog>))
        .route("/:id", get(crud::get::<EmailLog>));

    // Routes open to any signed-in user
    let user_routes = Router::new()
        .nest("/campaigns", resource_routes::<Campaign>())
        .nest("/stages", resource_routes::<Stage>())
        .nest("/steps", resource_routes::<Step>())
        .nest("/customers", resource_routes::<Customer>())
        .nest("/campaign-customers", resource_routes::<CampaignCustomer>())
        .nest("/templates", resource_routes::<EmailTemplate>())
        .nest("/email-logs", email_log_routes)
        .route(
            "/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        .route("/send-email", post(send::send_email))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    // User administration routes
    let admin_routes = Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let api_v1 = Router::new()
        .route("/login", post(auth::login))
        .merge(user_routes)
        .merge(admin_routes);

    Router::new()
        .nest("/health", health_routes)
        .nest("/api/v1", api_v1)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.cors_origins)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::http::{HeaderName, StatusCode};
    use axum_test::TestServer;
    use chrono::Duration;
    use drip_common::config::AuthConfig;
    use drip_core::bootstrap::{ensure_admin, ensure_settings};
    use drip_core::{Mailer, MailerError, OutgoingEmail, SenderAccount, TokenIssuer};
    use drip_storage::Store;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// Mailer that records deliveries, or fails every send
    #[derive(Default)]
    struct FakeMailer {
        fail: bool,
        sent: Mutex<Vec<(SenderAccount, OutgoingEmail)>>,
    }

    #[async_trait]
    impl Mailer for FakeMailer {
        async fn send(
            &self,
            sender: &SenderAccount,
            email: &OutgoingEmail,
        ) -> Result<(), MailerError> {
            if self.fail {
                return Err(MailerError::Transport("connection refused".to_string()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((sender.clone(), email.clone()));
            Ok(())
        }
    }

    struct TestApp {
        server: TestServer,
        admin_token: String,
    }

    fn auth_header(token: &str) -> (HeaderName, HeaderValue) {
        (
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        )
    }

    async fn setup_with(mailer: Arc<FakeMailer>) -> TestApp {
        let store = Store::memory();
        ensure_admin(&store, &AuthConfig::default()).await.unwrap();
        ensure_settings(&store).await.unwrap();

        let state = Arc::new(AppState {
            store,
            tokens: TokenIssuer::new("test-secret", Duration::hours(1)),
            mailer,
        });
        let server = TestServer::new(create_router(state, &ApiConfig::default())).unwrap();
        let admin_token = login(&server, "admin", "password").await;

        TestApp {
            server,
            admin_token,
        }
    }

    async fn setup() -> TestApp {
        setup_with(Arc::new(FakeMailer::default())).await
    }

    async fn login(server: &TestServer, email: &str, password: &str) -> String {
        let response = server
            .post("/api/v1/login")
            .json(&json!({"email": email, "password": password}))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        response.json::<Value>()["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    impl TestApp {
        async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
            let (name, value) = auth_header(&self.admin_token);
            let response = self
                .server
                .post(path)
                .add_header(name, value)
                .json(&body)
                .await;
            (response.status_code(), response.json())
        }

        async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
            let (name, value) = auth_header(&self.admin_token);
            let response = self
                .server
                .put(path)
                .add_header(name, value)
                .json(&body)
                .await;
            (response.status_code(), response.json())
        }

        async fn get(&self, path: &str) -> (StatusCode, Value) {
            let (name, value) = auth_header(&self.admin_token);
            let response = self.server.get(path).add_header(name, value).await;
            (response.status_code(), response.json())
        }

        async fn delete(&self, path: &str) -> (StatusCode, Value) {
            let (name, value) = auth_header(&self.admin_token);
            let response = self.server.delete(path).add_header(name, value).await;
            (response.status_code(), response.json())
        }
    }

    #[tokio::test]
    async fn test_health_needs_no_token() {
        let app = setup().await;

        let response = app.server.get("/health").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>()["backend"], "memory");

        assert_eq!(
            app.server.get("/health/ready").await.status_code(),
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_login_failures_share_one_message() {
        let app = setup().await;

        let wrong_password = app
            .server
            .post("/api/v1/login")
            .json(&json!({"email": "admin", "password": "nope"}))
            .await;
        let unknown_email = app
            .server
            .post("/api/v1/login")
            .json(&json!({"email": "ghost@example.com", "password": "password"}))
            .await;

        assert_eq!(wrong_password.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_email.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            wrong_password.json::<Value>(),
            json!({"error": "Invalid email or password"})
        );
        assert_eq!(wrong_password.json::<Value>(), unknown_email.json::<Value>());
    }

    #[tokio::test]
    async fn test_login_token_carries_role() {
        let app = setup().await;
        let tokens = TokenIssuer::new("test-secret", Duration::hours(1));

        let claims = tokens.validate(&app.admin_token).unwrap();
        assert_eq!(claims.role, drip_common::Role::Admin);
        assert_eq!(claims.email, "admin");
    }

    #[tokio::test]
    async fn test_role_gate() {
        let app = setup().await;

        let missing = app.server.get("/api/v1/campaigns").await;
        assert_eq!(missing.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            missing.json::<Value>(),
            json!({"error": "Authorization header required"})
        );

        let (name, value) = auth_header("");
        let empty_bearer = app
            .server
            .get("/api/v1/campaigns")
            .add_header(name, value)
            .await;
        assert_eq!(empty_bearer.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            empty_bearer.json::<Value>(),
            json!({"error": "Authorization header required"})
        );

        let (name, value) = auth_header("garbage");
        let invalid = app
            .server
            .get("/api/v1/campaigns")
            .add_header(name, value)
            .await;
        assert_eq!(invalid.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            invalid.json::<Value>(),
            json!({"error": "Invalid or expired token"})
        );

        let (status, _) = app
            .post(
                "/api/v1/users",
                json!({"email": "jane@example.com", "password": "secret", "role": "user"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let user_token = login(&app.server, "jane@example.com", "secret").await;

        let (name, value) = auth_header(&user_token);
        let allowed = app
            .server
            .get("/api/v1/campaigns")
            .add_header(name, value)
            .await;
        assert_eq!(allowed.status_code(), StatusCode::OK);

        let (name, value) = auth_header(&user_token);
        let forbidden = app
            .server
            .get("/api/v1/users")
            .add_header(name, value)
            .await;
        assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            forbidden.json::<Value>(),
            json!({"error": "Insufficient permissions"})
        );

        let bare = app
            .server
            .get("/api/v1/users")
            .add_header(
                header::AUTHORIZATION,
                HeaderValue::from_str(&app.admin_token).unwrap(),
            )
            .await;
        assert_eq!(bare.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_campaign_round_trip() {
        let app = setup().await;

        let (status, created) = app
            .post(
                "/api/v1/campaigns",
                json!({
                    "name": "Welcome",
                    "description": "Onboarding",
                    "status": "draft",
                    "start_date": "2024-01-01T00:00:00Z",
                    "end_date": "2024-02-01T00:00:00Z"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["id"], 1);
        assert!(created["created_at"].is_string());

        let (status, fetched) = app.get("/api/v1/campaigns/1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], "Welcome");
        assert_eq!(fetched["description"], "Onboarding");
        assert_eq!(fetched["start_date"], "2024-01-01T00:00:00Z");
        assert_eq!(fetched["end_date"], "2024-02-01T00:00:00Z");

        let (_, second) = app
            .post("/api/v1/campaigns", json!({"name": "Winback"}))
            .await;
        assert_eq!(second["id"], 2);

        let (_, listed) = app.get("/api/v1/campaigns").await;
        assert_eq!(listed.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_partial_update_preserves_fields() {
        let app = setup().await;
        app.post(
            "/api/v1/templates",
            json!({"name": "Intro", "subject": "Hello", "body": "Hi there", "content_type": "text/html"}),
        )
        .await;

        let (status, updated) = app
            .put("/api/v1/templates/1", json!({"subject": "Welcome!"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["subject"], "Welcome!");
        assert_eq!(updated["name"], "Intro");
        assert_eq!(updated["body"], "Hi there");
        assert_eq!(updated["content_type"], "text/html");
        assert_eq!(updated["id"], 1);

        let (status, _) = app
            .put("/api/v1/templates/1", json!({"content_type": "application/pdf"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app.put("/api/v1/templates/9", json!({"name": "x"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Email template not found"}));
    }

    #[tokio::test]
    async fn test_delete_hides_row() {
        let app = setup().await;
        app.post("/api/v1/campaigns", json!({"name": "Welcome"})).await;

        let (status, body) = app.delete("/api/v1/campaigns/1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Campaign deleted successfully"}));

        let (status, body) = app.get("/api/v1/campaigns/1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Campaign not found"}));

        let (status, _) = app.delete("/api/v1/campaigns/1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, listed) = app.get("/api/v1/campaigns").await;
        assert_eq!(listed, json!([]));
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_not_found() {
        let app = setup().await;
        let (status, body) = app.get("/api/v1/customers/abc").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Customer not found"}));
    }

    #[tokio::test]
    async fn test_step_preloads_missing_template_as_null() {
        let app = setup().await;

        let (status, campaign) = app
            .post(
                "/api/v1/campaigns",
                json!({"name": "Welcome", "start_date": "2024-01-01T00:00:00Z", "end_date": "2024-02-01T00:00:00Z"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(campaign["id"], 1);

        let (status, stage) = app
            .post("/api/v1/stages", json!({"campaign_id": 1, "order": 1}))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, step) = app
            .post(
                "/api/v1/steps",
                json!({"stage_id": stage["id"], "wait_time": 24}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, fetched) = app
            .get(&format!("/api/v1/steps/{}", step["id"]))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["wait_time"], 24);
        assert!(fetched.get("email_template").is_some());
        assert!(fetched["email_template"].is_null());
    }

    #[tokio::test]
    async fn test_step_preloads_template() {
        let app = setup().await;
        app.post("/api/v1/campaigns", json!({"name": "Welcome"})).await;
        app.post("/api/v1/stages", json!({"campaign_id": 1})).await;
        app.post("/api/v1/templates", json!({"name": "Intro", "subject": "Hello"}))
            .await;
        let (status, _) = app
            .post(
                "/api/v1/steps",
                json!({"stage_id": 1, "email_template_id": 1}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, steps) = app.get("/api/v1/steps").await;
        assert_eq!(steps[0]["email_template"]["subject"], "Hello");
    }

    #[tokio::test]
    async fn test_missing_parent_is_rejected() {
        let app = setup().await;
        let missing = json!({"error": "Referenced record does not exist"});

        let (status, body) = app
            .post("/api/v1/stages", json!({"campaign_id": 99}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, missing);

        app.post("/api/v1/campaigns", json!({"name": "Welcome"})).await;
        app.post("/api/v1/stages", json!({"campaign_id": 1})).await;

        let (status, body) = app
            .post(
                "/api/v1/steps",
                json!({"stage_id": 1, "email_template_id": 5}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, missing);

        let (status, body) = app
            .post(
                "/api/v1/campaign-customers",
                json!({"campaign_id": 1, "customer_id": 7}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, missing);

        let (status, body) = app
            .put("/api/v1/stages/1", json!({"campaign_id": 42}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, missing);

        let (_, stage) = app.get("/api/v1/stages/1").await;
        assert_eq!(stage["campaign_id"], 1);
    }

    #[tokio::test]
    async fn test_deleted_parent_is_rejected() {
        let app = setup().await;
        app.post("/api/v1/campaigns", json!({"name": "Welcome"})).await;
        app.post(
            "/api/v1/customers",
            json!({"email": "jane@example.com", "first_name": "Jane", "last_name": "Doe"}),
        )
        .await;

        let (status, _) = app
            .post(
                "/api/v1/campaign-customers",
                json!({"campaign_id": 1, "customer_id": 1}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        app.delete("/api/v1/campaigns/1").await;

        let (status, body) = app
            .post("/api/v1/stages", json!({"campaign_id": 1}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Referenced record does not exist"}));

        let (status, _) = app
            .put("/api/v1/campaign-customers/1", json!({"status": "paused"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_customer_validation() {
        let app = setup().await;

        let (status, body) = app
            .post("/api/v1/customers", json!({"email": "jane@example.com", "last_name": "Doe"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "First name is required"}));

        let (status, created) = app
            .post(
                "/api/v1/customers",
                json!({"email": "jane@example.com", "first_name": "Jane", "last_name": "Doe", "company": "Acme"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["company"], "Acme");
        assert!(created["phone"].is_null());
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let app = setup().await;
        let (name, value) = auth_header(&app.admin_token);

        let response = app
            .server
            .post("/api/v1/campaigns")
            .add_header(name, value)
            .text("{not json")
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>(),
            json!({"error": "Invalid request payload"})
        );

        let (status, _) = app
            .post("/api/v1/stages", json!({"campaign_id": "one"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_settings_singleton() {
        let app = setup().await;

        let (status, settings) = app.get("/api/v1/settings").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(settings["email_polling_seconds"], 0);

        let (status, updated) = app
            .put(
                "/api/v1/settings",
                json!({"smtp_email": "sender@example.com", "email_polling_seconds": 60}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["smtp_email"], "sender@example.com");
        assert_eq!(updated["email_polling_seconds"], 60);
        assert_eq!(updated["id"], settings["id"]);
    }

    #[tokio::test]
    async fn test_smtp_password_is_write_only() {
        let mailer = Arc::new(FakeMailer::default());
        let app = setup_with(mailer.clone()).await;

        let (status, updated) = app
            .put(
                "/api/v1/settings",
                json!({"smtp_email": "sender@example.com", "smtp_password": "app-password"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(updated.get("smtp_password").is_none());

        let (_, fetched) = app.get("/api/v1/settings").await;
        assert!(fetched.get("smtp_password").is_none());
        assert_eq!(fetched["smtp_email"], "sender@example.com");

        let (status, _) = app
            .put("/api/v1/settings", json!({"email_polling_seconds": 30}))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app
            .post(
                "/api/v1/send-email",
                json!({"to": "jane@example.com", "subject": "Hello", "body": "Welcome"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(mailer.sent.lock().unwrap()[0].0.password, "app-password");
    }

    #[tokio::test]
    async fn test_send_email_records_log() {
        let mailer = Arc::new(FakeMailer::default());
        let app = setup_with(mailer.clone()).await;
        app.put(
            "/api/v1/settings",
            json!({"smtp_email": "sender@example.com", "smtp_password": "app-password"}),
        )
        .await;

        let (status, body) = app
            .post(
                "/api/v1/send-email",
                json!({"to": "jane@example.com", "subject": "Hello", "body": "Welcome"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Email sent successfully"}));

        let sent = mailer.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0.email, "sender@example.com");
        assert_eq!(sent[0].0.password, "app-password");
        assert_eq!(sent[0].1.to, "jane@example.com");

        let (_, logs) = app.get("/api/v1/email-logs").await;
        assert_eq!(logs.as_array().unwrap().len(), 1);
        assert_eq!(logs[0]["status"], "sent");
        assert_eq!(logs[0]["recipient"], "jane@example.com");
    }

    #[tokio::test]
    async fn test_failed_send_leaves_no_log() {
        let mailer = Arc::new(FakeMailer {
            fail: true,
            ..Default::default()
        });
        let app = setup_with(mailer).await;

        let (status, body) = app
            .post(
                "/api/v1/send-email",
                json!({"to": "jane@example.com", "subject": "Hello", "body": "Welcome"}),
            )
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Failed to send email"}));

        let (_, logs) = app.get("/api/v1/email-logs").await;
        assert_eq!(logs, json!([]));
    }

    #[tokio::test]
    async fn test_user_administration() {
        let app = setup().await;

        let (status, created) = app
            .post(
                "/api/v1/users",
                json!({"email": "jane@example.com", "password": "secret"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["role"], "user");
        assert!(created.get("password_hash").is_none());

        let (status, _) = app
            .post(
                "/api/v1/users",
                json!({"email": "jane@example.com", "password": "other"}),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let id = created["id"].as_i64().unwrap();
        let (status, updated) = app
            .put(
                &format!("/api/v1/users/{}", id),
                json!({"password": "changed", "role": "admin"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["role"], "admin");
        assert_eq!(updated["email"], "jane@example.com");

        let token = login(&app.server, "jane@example.com", "changed").await;
        assert!(!token.is_empty());

        let (status, _) = app.delete(&format!("/api/v1/users/{}", id)).await;
        assert_eq!(status, StatusCode::OK);

        let response = app
            .server
            .post("/api/v1/login")
            .json(&json!({"email": "jane@example.com", "password": "changed"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }
}
