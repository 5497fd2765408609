//! Tool registry, schemas, and invocation.

pub mod errors;
mod handler;
mod invoker;
mod registry;
mod schema;
pub mod types;

pub use errors::{RegistryError, ToolError, ToolErrorKind};
pub use handler::{HandlerFuture, ToolHandler};
pub use invoker::ToolInvoker;
pub use registry::{ToolRegistry, ToolSpec};
pub use schema::{InputSchema, Param, ParamType};
pub use types::{BoxError, ToolArguments, ToolCallResult, ToolFailure, ToolOutcome};
