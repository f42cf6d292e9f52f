//! Per-request context and the builder that resolves it from request headers.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::Span;

use crate::session::{Session, SessionCookie, SessionManager, StoreError};

/// Append-only sink for headers the procedure wants on the response.
#[derive(Debug, Default)]
pub struct ResponseHeaders {
    headers: Mutex<HeaderMap>,
}

impl ResponseHeaders {
    pub fn append(&self, name: HeaderName, value: HeaderValue) {
        self.headers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .append(name, value);
    }

    #[must_use]
    pub fn into_inner(self) -> HeaderMap {
        self.headers
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Environment of a single RPC invocation.
///
/// The session is copied out of the store when the context is built and never
/// changes afterwards; a context is owned by one request and dropped with it.
#[derive(Debug)]
pub struct RequestContext {
    session: Option<Session>,
    response_headers: ResponseHeaders,
    logger: Span,
}

impl RequestContext {
    #[must_use]
    pub fn new(session: Option<Session>, logger: Span) -> Self {
        Self {
            session,
            response_headers: ResponseHeaders::default(),
            logger,
        }
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn response_headers(&self) -> &ResponseHeaders {
        &self.response_headers
    }

    /// Request span borrowed from the HTTP layer.
    #[must_use]
    pub fn logger(&self) -> &Span {
        &self.logger
    }

    #[must_use]
    pub fn into_response_headers(self) -> HeaderMap {
        self.response_headers.into_inner()
    }
}

/// Builds a [`RequestContext`] with at most one session store lookup.
#[derive(Clone)]
pub struct ContextBuilder {
    sessions: Arc<SessionManager>,
}

impl ContextBuilder {
    #[must_use]
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }

    /// Resolve the session cookie (if any) and assemble the context.
    ///
    /// # Errors
    /// A store failure is propagated rather than degraded to an anonymous
    /// context, so protected procedures never mistake an outage for a
    /// signed-out user.
    pub async fn build(
        &self,
        headers: &HeaderMap,
        logger: Span,
    ) -> Result<RequestContext, StoreError> {
        let session = match SessionCookie::extract(headers) {
            Some(id) => self.sessions.resolve(&id).await?,
            None => None,
        };
        Ok(RequestContext::new(session, logger))
    }
}
