/// End-to-end tests for the report, moderation and audit endpoints
///
/// Each test drives the real router over an in-memory database.
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Duration;
use folio::{
    admin::Role,
    auth::issue_token,
    config::ServerConfig,
    content::{NewUser, PostKind, PostStore, SqlitePostStore, SqliteUserStore, UserStore},
    db::connect_in_memory,
    server::build_router,
    AppContext,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::ServiceExt;

const SECRET: &str = "integration-secret-0123456789abcdef";

struct TestApp {
    router: Router,
    db: SqlitePool,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_config(ServerConfig::for_testing(SECRET)).await
    }

    async fn with_config(config: ServerConfig) -> Self {
        let db = connect_in_memory().await.unwrap();
        seed(&db).await;

        let ctx = AppContext::from_pool(config, db.clone()).unwrap();
        Self {
            router: build_router(ctx),
            db,
        }
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            let token = issue_token(user, SECRET, Duration::hours(1)).unwrap();
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder = builder.header("x-forwarded-for", "203.0.113.50, 10.0.0.1");

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, value)
    }

    async fn file_report(&self, reporter: &str, target_type: &str, target_id: &str) -> i64 {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/reports",
                Some(reporter),
                Some(json!({
                    "reason": "spam",
                    "description": "Selling knock-offs",
                    "targetType": target_type,
                    "targetId": target_id,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    async fn audit_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM audit_records")
            .fetch_one(&self.db)
            .await
            .unwrap()
    }

    async fn post_hidden(&self, id: &str) -> bool {
        SqlitePostStore::new(self.db.clone())
            .get_post(id)
            .await
            .unwrap()
            .unwrap()
            .hidden
    }
}

async fn seed(db: &SqlitePool) {
    let users = SqliteUserStore::new(db.clone());
    let fixtures = [
        ("A1", "root", "Root Admin", Role::Admin),
        ("M1", "modsquad", "Mod Squad", Role::Moderator),
        ("R1", "reporter", "Rita Reporter", Role::User),
        ("U1", "author", "Andy Author", Role::User),
        ("S1", "suspended", "Sam Suspended", Role::User),
    ];
    for (id, username, display_name, role) in fixtures {
        users
            .create_user(NewUser {
                id: Some(id.to_string()),
                username: username.to_string(),
                display_name: display_name.to_string(),
                email: None,
                role,
            })
            .await
            .unwrap();
    }
    users.set_suspended("S1", true).await.unwrap();

    let posts = SqlitePostStore::new(db.clone());
    posts
        .create_post(Some("P1"), "U1", "Cheap watches", PostKind::Text)
        .await
        .unwrap();
    posts
        .create_post(Some("P2"), "U1", "My holiday", PostKind::Image)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_resolve_with_hide_content() {
    let app = TestApp::new().await;
    let report_id = app.file_report("R1", "post", "P1").await;

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/reports/{}", report_id),
            Some("M1"),
            Some(json!({
                "status": "resolved",
                "actionTaken": "hide_content",
                "moderationNotes": "Spam confirmed",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "resolved");
    assert_eq!(body["actionTaken"], "hide_content");
    assert_eq!(body["reviewedBy"], "M1");
    assert_eq!(body["target"], json!({"type": "post", "id": "P1"}));

    assert!(app.post_hidden("P1").await);

    let (status, body) = app
        .call(Method::GET, "/api/admin/audits", Some("A1"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let audits = body["audits"].as_array().unwrap();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0]["action"], "post_hidden");
    assert_eq!(audits[0]["targetType"], "post");
    assert_eq!(audits[0]["targetId"], "P1");
    assert_eq!(audits[0]["ipAddress"], "203.0.113.50");
    assert_eq!(audits[0]["admin"]["displayName"], "Mod Squad");
    assert_eq!(audits[0]["details"]["reportId"], report_id);
}

#[tokio::test]
async fn test_page_past_the_end() {
    let app = TestApp::new().await;
    for _ in 0..3 {
        app.file_report("R1", "post", "P1").await;
    }

    let (status, body) = app
        .call(Method::GET, "/api/reports?page=5&limit=20", Some("M1"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reports"], json!([]));
    assert_eq!(
        body["pagination"],
        json!({"page": 5, "limit": 20, "total": 3, "pages": 1})
    );
}

#[tokio::test]
async fn test_limit_is_clamped_and_filters_combine() {
    let app = TestApp::new().await;
    app.file_report("R1", "post", "P1").await;
    app.file_report("R1", "user", "U1").await;
    app.file_report("R1", "post", "P2").await;

    let (status, body) = app
        .call(
            Method::GET,
            "/api/reports?limit=1000&targetType=post&status=pending&reason=",
            Some("M1"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["limit"], 100);
    assert_eq!(body["pagination"]["total"], 2);
    let reports = body["reports"].as_array().unwrap();
    assert_eq!(reports[0]["target"]["id"], "P2");
    assert_eq!(reports[1]["target"]["id"], "P1");

    let (status, body) = app
        .call(Method::GET, "/api/reports?status=closed", Some("M1"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidRequest");
}

#[tokio::test]
async fn test_dismiss_pending_report() {
    let app = TestApp::new().await;
    let report_id = app.file_report("R1", "post", "P1").await;

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/reports/{}", report_id),
            Some("M1"),
            Some(json!({"status": "dismissed"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "dismissed");
    assert_eq!(body["actionTaken"], "none");
    assert!(!app.post_hidden("P1").await);

    let (_, body) = app
        .call(Method::GET, "/api/admin/audits", Some("M1"), None)
        .await;
    let audits = body["audits"].as_array().unwrap();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0]["action"], "report_dismissed");
    assert_eq!(audits[0]["targetType"], "report");
    assert_eq!(audits[0]["targetId"], report_id.to_string());
}

#[tokio::test]
async fn test_terminal_report_conflicts() {
    let app = TestApp::new().await;
    let report_id = app.file_report("R1", "post", "P1").await;
    let uri = format!("/api/reports/{}", report_id);

    let (status, _) = app
        .call(Method::PUT, &uri, Some("M1"), Some(json!({"status": "resolved"})))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call(
            Method::PUT,
            &uri,
            Some("A1"),
            Some(json!({"status": "dismissed", "actionTaken": "hide_content"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict");
    assert_eq!(app.audit_count().await, 1);
    assert!(!app.post_hidden("P1").await);

    let (_, body) = app.call(Method::GET, &uri, Some("M1"), None).await;
    assert_eq!(body["status"], "resolved");
}

#[tokio::test]
async fn test_rejected_callers_write_nothing() {
    let app = TestApp::new().await;
    let report_id = app.file_report("R1", "post", "P1").await;
    let uri = format!("/api/reports/{}", report_id);
    let resolve = json!({"status": "resolved", "actionTaken": "hide_content"});

    let (status, body) = app
        .call(Method::PUT, &uri, None, Some(resolve.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "AuthenticationRequired");

    let (status, _) = app
        .call(Method::PUT, &uri, Some("ghost"), Some(resolve.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(Method::PUT, &uri, Some("R1"), Some(resolve.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(Method::GET, "/api/reports", Some("U1"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/reports",
            Some("S1"),
            Some(json!({"reason": "spam", "targetType": "post", "targetId": "P2"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(app.audit_count().await, 0);
    assert!(!app.post_hidden("P1").await);
}

#[tokio::test]
async fn test_report_intake_validation() {
    let app = TestApp::new().await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/reports",
            Some("R1"),
            Some(json!({"reason": "spam", "targetType": "post", "targetId": "nope"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/reports",
            Some("R1"),
            Some(json!({"reason": "rude", "targetType": "post", "targetId": "P1"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/reports",
            Some("R1"),
            Some(json!({"reason": "other", "targetType": "user", "targetId": "R1"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(Method::POST, "/api/reports", Some("R1"), Some(json!({"reason": 7})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidRequest");
}

#[tokio::test]
async fn test_report_description_length() {
    let app = TestApp::new().await;
    let report = |description: String| {
        json!({
            "reason": "spam",
            "description": description,
            "targetType": "post",
            "targetId": "P1",
        })
    };

    let (status, body) = app
        .call(Method::POST, "/api/reports", Some("R1"), Some(report("x".repeat(1001))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidRequest");

    let (status, _) = app
        .call(Method::POST, "/api/reports", Some("R1"), Some(report("x".repeat(1000))))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_moderator_cannot_suspend_admin() {
    let app = TestApp::new().await;

    let (status, body) = app
        .call(
            Method::PUT,
            "/api/admin/users/A1/suspend",
            Some("M1"),
            Some(json!({"suspended": true})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");
    assert_eq!(app.audit_count().await, 0);

    let (status, _) = app
        .call(Method::GET, "/api/reports", Some("A1"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_report_stats() {
    let app = TestApp::new().await;
    let first = app.file_report("R1", "post", "P1").await;
    app.file_report("R1", "post", "P2").await;
    app.call(
        Method::PUT,
        &format!("/api/reports/{}", first),
        Some("M1"),
        Some(json!({"status": "reviewing"})),
    )
    .await;

    let (status, body) = app
        .call(Method::GET, "/api/reports/stats", Some("M1"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recentReports"], 2);
    assert_eq!(
        body["statusStats"],
        json!([{"_id": "pending", "count": 1}, {"_id": "reviewing", "count": 1}])
    );
}

#[tokio::test]
async fn test_quick_actions_and_admin_filter() {
    let app = TestApp::new().await;

    let (status, body) = app
        .call(
            Method::PUT,
            "/api/admin/posts/P2/hidden",
            Some("A1"),
            Some(json!({"hidden": true, "reason": "NSFW"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hidden"], true);

    let (status, body) = app
        .call(
            Method::PUT,
            "/api/admin/users/U1/suspend",
            Some("M1"),
            Some(json!({"suspended": true})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suspended"], true);

    let (status, body) = app
        .call(Method::GET, "/api/admin/audits?admin=squad", Some("A1"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["audits"][0]["action"], "user_suspended");

    let (_, body) = app
        .call(
            Method::GET,
            "/api/admin/audits?targetType=post&action=post_hidden",
            Some("A1"),
            None,
        )
        .await;
    assert_eq!(body["audits"][0]["reason"], "NSFW");
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_admin_only_actions() {
    let app = TestApp::new().await;

    let (status, _) = app
        .call(
            Method::PUT,
            "/api/admin/users/U1/role",
            Some("M1"),
            Some(json!({"role": "moderator"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(
            Method::PUT,
            "/api/admin/users/U1/role",
            Some("A1"),
            Some(json!({"role": "moderator"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "moderator");

    let (status, _) = app
        .call(Method::DELETE, "/api/admin/users/U1", Some("M1"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(Method::DELETE, "/api/admin/users/U1", Some("A1"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = app
        .call(Method::DELETE, "/api/admin/users/A1", Some("A1"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(Method::DELETE, "/api/admin/posts/P1", Some("M1"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert_eq!(app.audit_count().await, 3);
}

#[tokio::test]
async fn test_configured_admin_ids_grant_admin() {
    let mut config = ServerConfig::for_testing(SECRET);
    config.authentication.admin_user_ids = vec!["R1".to_string()];
    let app = TestApp::with_config(config).await;

    let (status, _) = app
        .call(
            Method::PUT,
            "/api/admin/users/U1/role",
            Some("R1"),
            Some(json!({"role": "moderator"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health_and_metrics() {
    let app = TestApp::new().await;

    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.call(Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");

    let (status, _) = app.call(Method::GET, "/metrics", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.call(Method::GET, "/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}
