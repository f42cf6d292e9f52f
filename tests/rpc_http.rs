//! HTTP-level tests for the RPC gateway.
//!
//! The axum application is driven in-process with `tower::ServiceExt::oneshot`
//! against in-memory collaborators, so no database is needed.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{
        HeaderMap, HeaderValue, Method, Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
    },
};
use rpcgate::{
    api::{ApiState, app},
    auth::{AuthServices, Credentials, MemoryUserDirectory},
    rpc::{ContextBuilder, ErrorNormalizer, Router},
    session::{
        MemorySessionStore, SessionConfig, SessionId, SessionManager, SessionRecord,
        SessionStore, StoreError,
    },
};
use serde_json::{Value, json};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tower::ServiceExt;

struct PlainCredentials;

#[async_trait]
impl Credentials for PlainCredentials {
    async fn hash(&self, password: &str) -> Result<String> {
        Ok(format!("plain:{password}"))
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        Ok(hash == format!("plain:{password}"))
    }
}

/// Memory store whose reads can be switched to fail.
#[derive(Default)]
struct FlakyStore {
    inner: MemorySessionStore,
    down: AtomicBool,
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn put(
        &self,
        id: &SessionId,
        record: &SessionRecord,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.inner.put(id, record, ttl).await
    }

    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>, StoreError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        self.inner.get(id).await
    }

    async fn delete(&self, id: &SessionId) -> Result<(), StoreError> {
        self.inner.delete(id).await
    }

    async fn touch(&self, id: &SessionId, ttl: Duration) -> Result<(), StoreError> {
        self.inner.touch(id, ttl).await
    }
}

struct Gateway {
    app: axum::Router,
    store: Arc<FlakyStore>,
}

impl Gateway {
    fn new(production: bool) -> Self {
        let store = Arc::new(FlakyStore::default());
        let sessions = Arc::new(SessionManager::new(
            store.clone(),
            SessionConfig::default().with_secure_cookie(production),
        ));
        let services = AuthServices::new(
            sessions.clone(),
            Arc::new(MemoryUserDirectory::new()),
            Arc::new(PlainCredentials),
        );
        let router = services.register(Router::new(ErrorNormalizer::new(production)));
        let state = Arc::new(ApiState::new(router, ContextBuilder::new(sessions)));
        Self {
            app: app(state, None),
            store,
        }
    }

    async fn send(&self, request: Request<Body>) -> Result<Reply> {
        let response = self.app.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok(Reply {
            status,
            headers,
            body,
        })
    }

    async fn mutation(&self, path: &str, input: &Value, cookie: Option<&str>) -> Result<Reply> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(format!("/rpc/{path}"))
            .header(CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(Body::from(input.to_string()))?).await
    }

    async fn query(&self, path: &str, cookie: Option<&str>) -> Result<Reply> {
        let mut builder = Request::builder()
            .method(Method::GET)
            .uri(format!("/rpc/{path}"));
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(Body::empty())?).await
    }

    async fn sign_up(&self) -> Result<()> {
        let reply = self
            .mutation(
                "auth.signUp",
                &json!({
                    "name": "Ada Lovelace",
                    "email": "ada@example.com",
                    "password": "analytical"
                }),
                None,
            )
            .await?;
        if reply.status != StatusCode::OK {
            return Err(anyhow!("sign-up failed: {}", reply.body));
        }
        Ok(())
    }

    /// Sign in and return the `name=value` pair to send back as a cookie.
    async fn sign_in(&self) -> Result<String> {
        let reply = self
            .mutation(
                "auth.signIn",
                &json!({ "email": "ada@example.com", "password": "analytical" }),
                None,
            )
            .await?;
        reply
            .set_cookies()
            .first()
            .and_then(|cookie| cookie.split(';').next())
            .map(ToString::to_string)
            .context("sign-in did not set a session cookie")
    }
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl Reply {
    fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(ToString::to_string)
            .collect()
    }

    fn error_code(&self) -> Option<&str> {
        self.body["error"]["code"].as_str()
    }
}

#[tokio::test]
async fn sign_in_sets_hardened_session_cookie() -> Result<()> {
    let gateway = Gateway::new(true);
    gateway.sign_up().await?;

    let reply = gateway
        .mutation(
            "auth.signIn",
            &json!({ "email": "ada@example.com", "password": "analytical" }),
            None,
        )
        .await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.body,
        json!({ "result": { "data": { "name": "Ada Lovelace", "email": "ada@example.com" } } })
    );

    let cookies = reply.set_cookies();
    assert_eq!(cookies.len(), 1);
    let cookie = &cookies[0];
    assert!(cookie.starts_with("sessionId="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("Max-Age=3600"));
    assert!(cookie.contains("Secure"));
    Ok(())
}

#[tokio::test]
async fn protected_query_requires_a_session() -> Result<()> {
    let gateway = Gateway::new(true);
    gateway.sign_up().await?;

    let anonymous = gateway.query("user.getProfile", None).await?;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        anonymous.body,
        json!({
            "error": {
                "code": "UNAUTHENTICATED",
                "message": "You must be logged in to access this resource"
            }
        })
    );

    let cookie = gateway.sign_in().await?;
    let profile = gateway.query("user.getProfile", Some(&cookie)).await?;
    assert_eq!(profile.status, StatusCode::OK);
    assert_eq!(profile.body["result"]["data"]["email"], "ada@example.com");
    assert!(profile.body["result"]["data"]["userId"].is_string());
    Ok(())
}

#[tokio::test]
async fn get_session_is_public() -> Result<()> {
    let gateway = Gateway::new(true);
    gateway.sign_up().await?;

    let anonymous = gateway.query("auth.getSession", None).await?;
    assert_eq!(anonymous.status, StatusCode::OK);
    assert_eq!(
        anonymous.body,
        json!({ "result": { "data": { "userId": null, "data": null } } })
    );

    let cookie = gateway.sign_in().await?;
    let reply = gateway.query("auth.getSession", Some(&cookie)).await?;
    assert_eq!(
        reply.body["result"]["data"]["data"],
        json!({ "name": "Ada Lovelace", "email": "ada@example.com" })
    );
    Ok(())
}

#[tokio::test]
async fn sign_in_failures_do_not_reveal_registered_emails() -> Result<()> {
    let gateway = Gateway::new(true);
    gateway.sign_up().await?;

    let wrong_password = gateway
        .mutation(
            "auth.signIn",
            &json!({ "email": "ada@example.com", "password": "not-the-one" }),
            None,
        )
        .await?;
    let unknown_email = gateway
        .mutation(
            "auth.signIn",
            &json!({ "email": "nobody@example.com", "password": "analytical" }),
            None,
        )
        .await?;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.status, unknown_email.status);
    assert_eq!(wrong_password.body, unknown_email.body);
    assert_eq!(wrong_password.error_code(), Some("INVALID_CREDENTIALS"));
    assert_eq!(
        wrong_password.body["error"]["message"],
        "Invalid email or password"
    );

    for reply in [&wrong_password, &unknown_email] {
        let cookies = reply.set_cookies();
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].contains("Max-Age=0"));
    }
    Ok(())
}

#[tokio::test]
async fn sign_out_revokes_the_session() -> Result<()> {
    let gateway = Gateway::new(true);
    gateway.sign_up().await?;
    let cookie = gateway.sign_in().await?;

    let reply = gateway
        .mutation("auth.signOut", &Value::Null, Some(&cookie))
        .await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({ "result": { "data": { "success": true } } }));
    let cleared = reply.set_cookies();
    assert_eq!(cleared.len(), 1);
    assert!(cleared[0].starts_with("sessionId=;"));
    assert!(cleared[0].contains("Max-Age=0"));

    // The old token is dead even if the client keeps sending it.
    let after = gateway.query("user.getProfile", Some(&cookie)).await?;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    assert_eq!(after.error_code(), Some("UNAUTHENTICATED"));

    let again = gateway
        .mutation("auth.signOut", &Value::Null, Some(&cookie))
        .await?;
    assert_eq!(again.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn store_outage_is_internal_not_unauthenticated() -> Result<()> {
    let gateway = Gateway::new(true);
    gateway.sign_up().await?;
    let cookie = gateway.sign_in().await?;

    gateway.store.down.store(true, Ordering::SeqCst);
    let reply = gateway.query("user.getProfile", Some(&cookie)).await?;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        reply.body,
        json!({ "error": { "code": "INTERNAL", "message": "Internal server error" } })
    );
    Ok(())
}

#[tokio::test]
async fn development_mode_attaches_stack() -> Result<()> {
    let gateway = Gateway::new(false);
    gateway.sign_up().await?;
    let cookie = gateway.sign_in().await?;

    gateway.store.down.store(true, Ordering::SeqCst);
    let reply = gateway.query("auth.getSession", Some(&cookie)).await?;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.body["error"]["message"], "Internal server error");
    assert!(reply.body["error"]["data"]["stack"].is_string());
    Ok(())
}

#[tokio::test]
async fn development_cookie_is_not_secure() -> Result<()> {
    let gateway = Gateway::new(false);
    gateway.sign_up().await?;
    let cookie = gateway
        .mutation(
            "auth.signIn",
            &json!({ "email": "ada@example.com", "password": "analytical" }),
            None,
        )
        .await?
        .set_cookies();
    assert_eq!(cookie.len(), 1);
    assert!(!cookie[0].contains("Secure"));
    Ok(())
}

#[tokio::test]
async fn unknown_procedure_and_wrong_method() -> Result<()> {
    let gateway = Gateway::new(true);

    let missing = gateway.query("auth.nope", None).await?;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.error_code(), Some("NOT_FOUND"));

    let as_query = gateway.query("auth.signOut", None).await?;
    assert_eq!(as_query.status, StatusCode::BAD_REQUEST);
    assert_eq!(as_query.error_code(), Some("BAD_REQUEST"));
    Ok(())
}

#[tokio::test]
async fn malformed_body_is_bad_request() -> Result<()> {
    let gateway = Gateway::new(true);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/rpc/auth.signIn")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))?;

    let reply = gateway.send(request).await?;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.error_code(), Some("BAD_REQUEST"));
    Ok(())
}

#[tokio::test]
async fn duplicate_sign_up_conflicts() -> Result<()> {
    let gateway = Gateway::new(true);
    gateway.sign_up().await?;

    let reply = gateway
        .mutation(
            "auth.signUp",
            &json!({
                "name": "Ada Again",
                "email": "ADA@example.com",
                "password": "analytical"
            }),
            None,
        )
        .await?;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.error_code(), Some("CONFLICT"));
    Ok(())
}

#[tokio::test]
async fn request_id_is_assigned_and_propagated() -> Result<()> {
    let gateway = Gateway::new(true);

    let generated = gateway.query("auth.getSession", None).await?;
    assert!(generated.headers.contains_key("x-request-id"));

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .header("x-request-id", "req-123")
        .body(Body::empty())?;
    let reply = gateway.send(request).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.headers.get("x-request-id"),
        Some(&HeaderValue::from_static("req-123"))
    );
    assert_eq!(reply.body["name"], "rpcgate");
    Ok(())
}
