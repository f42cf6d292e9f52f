//! Typed procedures and their JSON-erased form used by the router.

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::fmt;

use super::{RequestContext, RpcError};

/// Whether a call reads (`query`, HTTP GET) or changes state (`mutation`, HTTP POST).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Query,
    Mutation,
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => f.write_str("query"),
            Self::Mutation => f.write_str("mutation"),
        }
    }
}

/// Whether a procedure needs a resolved session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Public,
    Protected,
}

/// One incoming invocation as seen by interceptors.
#[derive(Clone, Debug)]
pub struct Call {
    pub path: String,
    pub kind: CallKind,
    pub input: Value,
}

/// Business logic behind one RPC path.
#[async_trait]
pub trait Procedure: Send + Sync + 'static {
    type Input: DeserializeOwned + Send + 'static;
    type Output: Serialize + Send + 'static;

    async fn call(&self, ctx: &RequestContext, input: Self::Input)
    -> Result<Self::Output, RpcError>;
}

/// Object-safe procedure over raw JSON values.
#[async_trait]
pub trait DynProcedure: Send + Sync {
    async fn invoke(&self, ctx: &RequestContext, input: Value) -> Result<Value, RpcError>;
}

#[async_trait]
impl<P: Procedure> DynProcedure for P {
    async fn invoke(&self, ctx: &RequestContext, input: Value) -> Result<Value, RpcError> {
        let input = serde_json::from_value::<P::Input>(input)
            .map_err(|err| RpcError::bad_request(format!("invalid input: {err}")))?;
        let output = self.call(ctx, input).await?;
        serde_json::to_value(output).map_err(|err| RpcError::Internal(err.into()))
    }
}
