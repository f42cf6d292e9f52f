//! Procedure registry: maps RPC paths onto procedures and their pipelines.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::{
    Access, Call, CallKind, ClientError, DynProcedure, ErrorNormalizer, Pipeline, Procedure,
    RequestContext, RpcError,
};

struct Route {
    kind: CallKind,
    access: Access,
    procedure: Arc<dyn DynProcedure>,
    pipeline: Pipeline,
}

pub struct Router {
    routes: HashMap<String, Route>,
    normalizer: ErrorNormalizer,
}

impl Router {
    #[must_use]
    pub fn new(normalizer: ErrorNormalizer) -> Self {
        Self {
            routes: HashMap::new(),
            normalizer,
        }
    }

    #[must_use]
    pub fn query<P: Procedure>(self, path: &str, procedure: P) -> Self {
        self.register(path, CallKind::Query, Access::Public, procedure)
    }

    #[must_use]
    pub fn mutation<P: Procedure>(self, path: &str, procedure: P) -> Self {
        self.register(path, CallKind::Mutation, Access::Public, procedure)
    }

    #[must_use]
    pub fn protected_query<P: Procedure>(self, path: &str, procedure: P) -> Self {
        self.register(path, CallKind::Query, Access::Protected, procedure)
    }

    #[must_use]
    pub fn protected_mutation<P: Procedure>(self, path: &str, procedure: P) -> Self {
        self.register(path, CallKind::Mutation, Access::Protected, procedure)
    }

    fn register<P: Procedure>(
        mut self,
        path: &str,
        kind: CallKind,
        access: Access,
        procedure: P,
    ) -> Self {
        self.routes.insert(
            path.to_string(),
            Route {
                kind,
                access,
                procedure: Arc::new(procedure),
                pipeline: Pipeline::for_access(access),
            },
        );
        self
    }

    #[must_use]
    pub fn normalizer(&self) -> &ErrorNormalizer {
        &self.normalizer
    }

    /// Registered kind and access level for `path`.
    #[cfg(test)]
    pub(crate) fn describe(&self, path: &str) -> Option<(CallKind, Access)> {
        self.routes.get(path).map(|route| (route.kind, route.access))
    }

    /// Run `path` through its pipeline and normalize any failure exactly once.
    ///
    /// # Errors
    /// Returns the client-facing error for unknown paths, kind mismatches and
    /// every failure raised inside the pipeline.
    pub async fn call(
        &self,
        ctx: &RequestContext,
        path: &str,
        kind: CallKind,
        input: Value,
    ) -> Result<Value, ClientError> {
        self.dispatch(ctx, path, kind, input)
            .await
            .map_err(|err| self.normalizer.normalize(err, ctx.logger()))
    }

    async fn dispatch(
        &self,
        ctx: &RequestContext,
        path: &str,
        kind: CallKind,
        input: Value,
    ) -> Result<Value, RpcError> {
        let Some(route) = self.routes.get(path) else {
            return Err(RpcError::not_found(format!(
                "No procedure found on path \"{path}\""
            )));
        };
        if route.kind != kind {
            return Err(RpcError::bad_request(format!(
                "Procedure \"{path}\" is a {}, not a {kind}",
                route.kind
            )));
        }

        let call = Call {
            path: path.to_string(),
            kind,
            input,
        };
        route
            .pipeline
            .run(ctx, &call, route.procedure.as_ref())
            .await
    }
}
