//! Interceptor chain wrapped around every procedure.
//!
//! Flow Overview: the pipeline for a procedure is fixed when it is registered.
//! Logging is always outermost; protected procedures get the authorization
//! gate immediately inside it. Interceptors never translate errors, they only
//! observe and forward them.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, error, info, warn};
use ulid::Ulid;

use super::{Access, Call, DynProcedure, ErrorKind, RequestContext, RpcError};

const REDACTED: &str = "[redacted]";
const SENSITIVE_KEYS: [&str; 1] = ["password"];

/// Cross-cutting wrapper around a procedure call.
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn intercept(
        &self,
        ctx: &RequestContext,
        call: &Call,
        next: Next<'_>,
    ) -> Result<Value, RpcError>;
}

/// Continuation into the rest of the chain, ending at the procedure.
pub struct Next<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    procedure: &'a dyn DynProcedure,
}

impl Next<'_> {
    pub async fn run(self, ctx: &RequestContext, call: &Call) -> Result<Value, RpcError> {
        match self.interceptors.split_first() {
            Some((head, rest)) => {
                let next = Next {
                    interceptors: rest,
                    procedure: self.procedure,
                };
                head.intercept(ctx, call, next).await
            }
            None => self.procedure.invoke(ctx, call.input.clone()).await,
        }
    }
}

/// Ordered list of interceptors, outermost first.
#[derive(Clone)]
pub struct Pipeline {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl Pipeline {
    #[must_use]
    pub fn new(interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        Self { interceptors }
    }

    /// Logging for every procedure, plus the authorization gate for protected ones.
    #[must_use]
    pub fn for_access(access: Access) -> Self {
        let mut interceptors: Vec<Arc<dyn Interceptor>> = vec![Arc::new(LoggingInterceptor)];
        if access == Access::Protected {
            interceptors.push(Arc::new(AuthorizationInterceptor));
        }
        Self::new(interceptors)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub async fn run(
        &self,
        ctx: &RequestContext,
        call: &Call,
        procedure: &dyn DynProcedure,
    ) -> Result<Value, RpcError> {
        let next = Next {
            interceptors: &self.interceptors,
            procedure,
        };
        next.run(ctx, call).await
    }
}

/// Records one start and one end event per call under a fresh correlation id.
///
/// The correlation id only appears in logs; it is never sent to the client.
pub struct LoggingInterceptor;

#[async_trait]
impl Interceptor for LoggingInterceptor {
    async fn intercept(
        &self,
        ctx: &RequestContext,
        call: &Call,
        next: Next<'_>,
    ) -> Result<Value, RpcError> {
        let correlation_id = Ulid::new().to_string();
        let path = call.path.as_str();
        let kind = call.kind;

        async move {
            info!(
                %correlation_id,
                path,
                %kind,
                input = %redact_input(&call.input),
                "rpc call started"
            );
            let started = Instant::now();

            let result = next.run(ctx, call).await;

            let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            match &result {
                Ok(_) => info!(
                    %correlation_id,
                    path,
                    %kind,
                    duration_ms,
                    outcome = "success",
                    "rpc call completed"
                ),
                Err(err) if err.kind() == ErrorKind::Internal => error!(
                    %correlation_id,
                    path,
                    %kind,
                    duration_ms,
                    outcome = "failure",
                    error_kind = %err.kind(),
                    "rpc call failed"
                ),
                Err(err) => warn!(
                    %correlation_id,
                    path,
                    %kind,
                    duration_ms,
                    outcome = "failure",
                    error_kind = %err.kind(),
                    error = %err,
                    "rpc call failed"
                ),
            }
            result
        }
        .instrument(ctx.logger().clone())
        .await
    }
}

/// Rejects calls without a resolved session before the procedure runs.
pub struct AuthorizationInterceptor;

#[async_trait]
impl Interceptor for AuthorizationInterceptor {
    async fn intercept(
        &self,
        ctx: &RequestContext,
        call: &Call,
        next: Next<'_>,
    ) -> Result<Value, RpcError> {
        if ctx.session().is_none() {
            debug!(path = %call.path, "rejecting unauthenticated call");
            return Err(RpcError::unauthenticated());
        }
        next.run(ctx, call).await
    }
}

/// Copy of `input` with sensitive fields masked, for logging only.
fn redact_input(input: &Value) -> Value {
    match input {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    let value = if SENSITIVE_KEYS.contains(&key.to_lowercase().as_str()) {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact_input(value)
                    };
                    (key.clone(), value)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_input).collect()),
        other => other.clone(),
    }
}
