//! Tool handler trait.

use super::{BoxError, ToolArguments};
use futures::future::BoxFuture;
use serde_json::Value;
use std::future::Future;

/// Future returned by a tool handler.
pub type HandlerFuture = BoxFuture<'static, Result<Value, BoxError>>;

/// The executable half of a tool.
///
/// This is the boundary between the model loop and side effects. Handlers
/// receive validated arguments and must be safe to call concurrently; any
/// error they return is reported to the model as a `ToolExecutionError`.
///
/// Async closures taking [`ToolArguments`] implement this trait directly.
pub trait ToolHandler: Send + Sync {
    fn call(&self, args: ToolArguments) -> HandlerFuture;
}

impl<F, Fut> ToolHandler for F
where
    F: Fn(ToolArguments) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
{
    fn call(&self, args: ToolArguments) -> HandlerFuture {
        Box::pin(self(args))
    }
}
