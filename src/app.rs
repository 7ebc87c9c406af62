use std::net::SocketAddr;

use axum::{middleware, routing::get, Router};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{auth, error, state::AppState, todos};

/// Layer order, outermost first: trace, CORS, panic translator, request gate, routes.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(todos::router()),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::gate::authenticate,
        ))
        .layer(CatchPanicLayer::custom(error::panic_response))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{claims::CallerIdentity, jwt::JwtKeys, repo_types::Role};
    use crate::config::JwtConfig;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use time::{Duration, OffsetDateTime};
    use tower::ServiceExt;

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        send_raw(app, method, uri, token, body.map(|b| b.to_string())).await
    }

    async fn send_raw(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<String>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn register(app: &Router, email: &str) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "email": email, "password": "password123", "user_name": "tester" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    fn error_code(body: &Value) -> &str {
        body["error"]["code"].as_str().unwrap_or_default()
    }

    #[tokio::test]
    async fn root_is_open() {
        let app = build_app(AppState::fake());
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn register_login_and_use_token() {
        let state = AppState::fake();
        let app = build_app(state.clone());

        register(&app, "a@x.com").await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "A@x.com ", "password": "password123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "a@x.com");
        assert_eq!(body["role"], "COMMON");
        let token = body["token"].as_str().unwrap().to_string();

        let (status, body) = send(&app, "GET", "/api/todos", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["todos"], json!([]));

        let (status, body) = send(&app, "GET", "/api/todos", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(&body), "MISSING_TOKEN");

        let who = CallerIdentity::from(state.tokens.verify(&token).unwrap());
        let stale = state
            .tokens
            .issue_at(&who, OffsetDateTime::now_utc() - Duration::hours(1))
            .unwrap();
        let (status, body) = send(&app, "GET", "/api/todos", Some(&stale), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(&body), "EXPIRED_TOKEN");
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let app = build_app(AppState::fake());
        register(&app, "a@x.com").await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "nope-nope-nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(&body), "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let app = build_app(AppState::fake());
        register(&app, "a@x.com").await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "email": "a@x.com", "password": "password123", "user_name": "again" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error_code(&body), "EMAIL_TAKEN");

        let (status, body) = send(&app, "GET", "/api/auth/check?email=a@x.com", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["taken"], true);
    }

    #[tokio::test]
    async fn carve_outs_require_a_token() {
        let app = build_app(AppState::fake());

        let (status, body) = send(
            &app,
            "PUT",
            "/api/auth/promote",
            None,
            Some(json!({ "email": "a@x.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(&body), "MISSING_TOKEN");

        let (status, body) = send(&app, "GET", "/api/auth/load-profile", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(&body), "MISSING_TOKEN");

        let (status, body) =
            send(&app, "GET", "/api/auth/load-profile", Some("not-a-jwt"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(&body), "MALFORMED_TOKEN");

        let foreign = JwtKeys::from_config(&JwtConfig {
            secret: "some-other-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
            leeway_seconds: 0,
        })
        .issue(&CallerIdentity {
            user_id: uuid::Uuid::new_v4(),
            email: "root@x.com".into(),
            role: Role::Admin,
        })
        .unwrap();
        let (status, body) = send(
            &app,
            "PUT",
            "/api/auth/promote",
            Some(&foreign),
            Some(json!({ "email": "a@x.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(&body), "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn open_routes_ignore_bad_tokens() {
        let app = build_app(AppState::fake());
        let (status, body) = send(
            &app,
            "GET",
            "/api/auth/check?email=nobody@x.com",
            Some("garbage"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["taken"], false);
    }

    #[tokio::test]
    async fn load_profile_returns_caller() {
        let app = build_app(AppState::fake());
        let token = register(&app, "a@x.com").await;

        let (status, body) = send(
            &app,
            "PUT",
            "/api/users/me/profile-image",
            Some(&token),
            Some(json!({ "profile_image": "avatars/a.png" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["profile_image"], "avatars/a.png");

        let (status, body) = send(&app, "GET", "/api/auth/load-profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "a@x.com");
        assert_eq!(body["profile_image"], "avatars/a.png");
        assert!(body.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn only_admins_promote() {
        let app = build_app(AppState::fake());
        let admin = register(&app, "root@x.com").await;
        let bob = register(&app, "bob@x.com").await;

        let promote = json!({ "email": "bob@x.com" });
        let (status, body) =
            send(&app, "PUT", "/api/auth/promote", Some(&bob), Some(promote.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(error_code(&body), "FORBIDDEN");

        let (status, body) =
            send(&app, "PUT", "/api/auth/promote", Some(&admin), Some(promote)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "ADMIN");

        let (status, _) = send(
            &app,
            "PUT",
            "/api/auth/promote",
            Some(&admin),
            Some(json!({ "email": "ghost@x.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn todo_crud_over_http() {
        let app = build_app(AppState::fake());
        let token = register(&app, "a@x.com").await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/todos",
            Some(&token),
            Some(json!({ "title": "buy milk" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["todos"].as_array().unwrap().len(), 1);
        assert_eq!(body["todos"][0]["title"], "buy milk");
        assert_eq!(body["todos"][0]["done"], false);
        let id = body["todos"][0]["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            "PATCH",
            "/api/todos",
            Some(&token),
            Some(json!({ "id": id, "done": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["todos"][0]["done"], true);

        let unknown = uuid::Uuid::new_v4();
        let (status, body) =
            send(&app, "DELETE", &format!("/api/todos/{unknown}"), Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error_code(&body), "NOT_FOUND");

        let (_, body) = send(&app, "GET", "/api/todos", Some(&token), None).await;
        assert_eq!(body["todos"].as_array().unwrap().len(), 1);

        let (status, body) =
            send(&app, "DELETE", &format!("/api/todos/{id}"), Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["todos"], json!([]));
    }

    #[tokio::test]
    async fn extractor_rejections_are_json_errors() {
        let app = build_app(AppState::fake());
        let token = register(&app, "a@x.com").await;

        let (status, body) =
            send(&app, "DELETE", "/api/todos/not-a-uuid", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "INVALID_PATH");

        let (status, body) = send_raw(
            &app,
            "POST",
            "/api/todos",
            Some(&token),
            Some("{nope".into()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "INVALID_BODY");

        let (status, body) =
            send(&app, "POST", "/api/auth/register", None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "INVALID_BODY");
        assert!(!body["error"]["message"].as_str().unwrap().is_empty());

        let (status, body) = send(&app, "GET", "/api/auth/check", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "INVALID_QUERY");
    }

    async fn boom() -> &'static str {
        panic!("boom")
    }

    #[tokio::test]
    async fn panics_become_json_errors() {
        let app: Router = Router::new()
            .route("/boom", get(boom))
            .layer(CatchPanicLayer::custom(error::panic_response));
        let (status, body) = send(&app, "GET", "/boom", None, None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error_code(&body), "INTERNAL");
    }
}
