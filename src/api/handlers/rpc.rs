//! HTTP binding for RPC calls.
//!
//! - `GET /rpc/{path}?input=<json>` runs a query.
//! - `POST /rpc/{path}` with a JSON body runs a mutation.
//!
//! A missing input (no `input` parameter, empty body) is passed as `null`.

use axum::{
    Extension,
    body::Bytes,
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::Span;

use crate::api::ApiState;
use crate::rpc::{CallKind, ClientError, RpcError};

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    input: Option<String>,
}

#[derive(Serialize)]
struct ResultBody {
    data: Value,
}

#[derive(Serialize)]
struct SuccessEnvelope {
    result: ResultBody,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ClientError,
}

pub async fn query(
    Extension(state): Extension<Arc<ApiState>>,
    Path(path): Path<String>,
    Query(params): Query<QueryParams>,
    headers: HeaderMap,
) -> Response {
    let input = match params.input.as_deref() {
        None | Some("") => Ok(Value::Null),
        Some(raw) => serde_json::from_str(raw),
    };
    dispatch(&state, &path, CallKind::Query, input, &headers).await
}

pub async fn mutation(
    Extension(state): Extension<Arc<ApiState>>,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let input = if body.is_empty() {
        Ok(Value::Null)
    } else {
        serde_json::from_slice(&body)
    };
    dispatch(&state, &path, CallKind::Mutation, input, &headers).await
}

async fn dispatch(
    state: &ApiState,
    path: &str,
    kind: CallKind,
    input: Result<Value, serde_json::Error>,
    headers: &HeaderMap,
) -> Response {
    let span = Span::current();
    let normalizer = state.router().normalizer();

    let input = match input {
        Ok(input) => input,
        Err(err) => {
            let error = RpcError::bad_request(format!("invalid input: {err}"));
            return error_response(normalizer.normalize(error, &span), HeaderMap::new());
        }
    };

    let ctx = match state.contexts().build(headers, span.clone()).await {
        Ok(ctx) => ctx,
        Err(err) => {
            return error_response(normalizer.normalize(err.into(), &span), HeaderMap::new());
        }
    };

    let result = state.router().call(&ctx, path, kind, input).await;
    let response_headers = ctx.into_response_headers();

    match result {
        Ok(data) => (
            StatusCode::OK,
            response_headers,
            Json(SuccessEnvelope {
                result: ResultBody { data },
            }),
        )
            .into_response(),
        Err(error) => error_response(error, response_headers),
    }
}

fn error_response(error: ClientError, headers: HeaderMap) -> Response {
    (error.code.status(), headers, Json(ErrorEnvelope { error })).into_response()
}
