use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth, state::AppState};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router(state.clone()))
        .route("/health", get(|| async { "ok" }))
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

pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn signup_body() -> Value {
        json!({ "email": "a@b.com", "name": "A", "password": "Abcdef1!" })
    }

    #[tokio::test]
    async fn signup_then_validate() {
        let app = build_app(AppState::fake());

        let (status, body) = call(&app, Method::POST, "/auth/signup", None, Some(signup_body())).await;
        assert_eq!(status, StatusCode::CREATED);
        let token = body["access_token"].as_str().expect("access_token").to_owned();
        assert_eq!(body.as_object().unwrap().len(), 1);

        let (status, body) = call(&app, Method::GET, "/auth/auth-validate", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "message": "Authenticated" }));

        let (status, _) = call(&app, Method::GET, "/auth/auth-validate", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&app, Method::GET, "/auth/auth-validate", Some("forged"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn signin_wrong_password_and_unknown_email_look_the_same() {
        let app = build_app(AppState::fake());
        call(&app, Method::POST, "/auth/signup", None, Some(signup_body())).await;

        let (status, wrong) = call(
            &app,
            Method::POST,
            "/auth/signin",
            None,
            Some(json!({ "email": "a@b.com", "password": "Wrong123!" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong, json!({ "error": "Invalid credentials" }));

        let (status, unknown) = call(
            &app,
            Method::POST,
            "/auth/signin",
            None,
            Some(json!({ "email": "nobody@b.com", "password": "Wrong123!" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong, unknown);
    }

    #[tokio::test]
    async fn signin_ok_returns_only_token() {
        let app = build_app(AppState::fake());
        call(&app, Method::POST, "/auth/signup", None, Some(signup_body())).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/auth/signin",
            None,
            Some(json!({ "email": "A@B.COM", "password": "Abcdef1!" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let obj = body.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert!(obj["access_token"].is_string());
    }

    #[tokio::test]
    async fn duplicate_signup_is_bad_request() {
        let app = build_app(AppState::fake());
        call(&app, Method::POST, "/auth/signup", None, Some(signup_body())).await;
        let (status, body) = call(&app, Method::POST, "/auth/signup", None, Some(signup_body())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "message": "Email already exists" }));
    }

    #[tokio::test]
    async fn boundary_validation_rejects_weak_input() {
        let app = build_app(AppState::fake());
        let (status, body) = call(
            &app,
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({ "email": "a@b.com", "name": "A", "password": "abcdefgh" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().starts_with("Password must"));

        let (status, _) = call(
            &app,
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({ "email": "not-an-email", "name": "A", "password": "Abcdef1!" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &app,
            Method::POST,
            "/auth/signin",
            None,
            Some(json!({ "email": "a@b.com", "password": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    async fn call_raw(app: &Router, uri: &str, content_type: &str, body: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body.to_owned()))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn missing_fields_are_bad_request_with_message() {
        let app = build_app(AppState::fake());

        let (status, body) = call(
            &app,
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({ "name": "A", "password": "Abcdef1!" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "message": "Missing or invalid fields" }));

        let (status, body) = call(
            &app,
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({ "email": "a@b.com", "password": "Abcdef1!" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "message": "Missing or invalid fields" }));

        let (status, body) = call(
            &app,
            Method::POST,
            "/auth/signin",
            None,
            Some(json!({ "password": "Abcdef1!" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "message": "Missing or invalid fields" }));
    }

    #[tokio::test]
    async fn non_json_bodies_are_bad_request_with_message() {
        let app = build_app(AppState::fake());

        let (status, body) = call_raw(&app, "/auth/signup", "text/plain", "email=a@b.com").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "message": "Expected a JSON body" }));

        let (status, body) = call_raw(&app, "/auth/signup", "application/json", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "message": "Malformed JSON body" }));
    }

    #[tokio::test]
    async fn expired_token_is_rejected_by_gate() {
        let state = AppState::fake();
        let keys = state.keys.clone();
        let app = build_app(state);

        let claims = crate::auth::claims::SessionClaims {
            sub: uuid::Uuid::new_v4(),
            email: "a@b.com".into(),
        };
        let issued = time::OffsetDateTime::now_utc() - keys.ttl() - std::time::Duration::from_secs(120);
        let token = keys.issue_at(&claims, issued).unwrap();

        let (status, body) = call(&app, Method::GET, "/auth/auth-validate", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "message": "Unauthorized" }));
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_app(AppState::fake());
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
