//! RPC core: request context, procedures, interceptors and error handling.

mod context;
mod error;
mod middleware;
mod procedure;
mod router;

pub use context::{ContextBuilder, RequestContext, ResponseHeaders};
pub use error::{
    ClientError, ErrorData, ErrorKind, ErrorNormalizer, INTERNAL_MESSAGE,
    INVALID_CREDENTIALS_MESSAGE, RpcError, UNAUTHENTICATED_MESSAGE,
};
pub use middleware::{AuthorizationInterceptor, Interceptor, LoggingInterceptor, Next, Pipeline};
pub use procedure::{Access, Call, CallKind, DynProcedure, Procedure};
pub use router::Router;
