//! Tool invocation with validation and timeouts.

use super::{ToolArguments, ToolCallResult, ToolError, ToolRegistry};
use crate::model::ToolCallRequest;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Runs tool calls against a registry.
///
/// Each call is resolved, validated, and executed on its own task under its
/// own time budget. Every failure, including a handler panic, comes back as
/// an error result rather than an `Err`. Calls are never retried here.
#[derive(Debug, Clone)]
pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
}

impl ToolInvoker {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Invoke one tool call.
    pub async fn invoke(&self, request: &ToolCallRequest, timeout: Duration) -> ToolCallResult {
        let call_id = request.call_id.as_str();
        let spec = match self.registry.resolve(&request.tool_name) {
            Ok(spec) => spec,
            Err(_) => {
                warn!(call_id, tool = %request.tool_name, "model requested unknown tool");
                return ToolCallResult::error(
                    call_id,
                    ToolError::UnknownTool(request.tool_name.clone()),
                );
            }
        };

        if let Err(message) = spec.input_schema.validate(&request.arguments) {
            warn!(call_id, tool = %spec.name, %message, "rejected tool arguments");
            return ToolCallResult::error(call_id, ToolError::InvalidArguments(message));
        }

        let mut arguments = request.arguments.clone();
        spec.input_schema.apply_defaults(&mut arguments);

        debug!(call_id, tool = %spec.name, "executing tool");
        let mut task = tokio::spawn(spec.handler().call(ToolArguments(arguments)));

        let error = match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(Ok(payload))) => {
                debug!(call_id, tool = %spec.name, "tool succeeded");
                return ToolCallResult::ok(call_id, payload);
            }
            Ok(Ok(Err(e))) => ToolError::Execution(e.to_string()),
            Ok(Err(join_error)) if join_error.is_panic() => {
                ToolError::Execution(panic_message(join_error.into_panic()))
            }
            Ok(Err(join_error)) => ToolError::Execution(join_error.to_string()),
            Err(_) => {
                task.abort();
                ToolError::Timeout(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX))
            }
        };

        warn!(call_id, tool = %spec.name, %error, "tool failed");
        ToolCallResult::error(call_id, error)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("tool panicked: {detail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{
        BoxError, InputSchema, Param, ParamType, ToolErrorKind, ToolOutcome, ToolSpec,
    };
    use serde_json::{Map, Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request(tool: &str, arguments: Value) -> ToolCallRequest {
        let Value::Object(arguments) = arguments else {
            unreachable!()
        };
        ToolCallRequest::new("call-1", tool, arguments)
    }

    fn invoker_with(spec: ToolSpec) -> ToolInvoker {
        let mut registry = ToolRegistry::new();
        registry.register(spec).unwrap();
        ToolInvoker::new(Arc::new(registry))
    }

    fn top_n_schema() -> InputSchema {
        InputSchema::new().param(
            Param::optional("n", ParamType::Integer)
                .range(1.0, 20.0)
                .default_value(10),
        )
    }

    const BUDGET: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn success_returns_payload_with_defaults_applied() {
        let invoker = invoker_with(ToolSpec::new(
            "echo",
            "Echo arguments",
            top_n_schema(),
            |args: ToolArguments| async move { Ok::<_, BoxError>(Value::Object(args.0)) },
        ));

        let result = invoker.invoke(&request("echo", json!({})), BUDGET).await;
        assert_eq!(result.call_id, "call-1");
        assert_eq!(result.outcome, ToolOutcome::Ok { payload: json!({ "n": 10 }) });
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error_result() {
        let invoker = ToolInvoker::new(Arc::new(ToolRegistry::new()));
        let result = invoker.invoke(&request("missing", json!({})), BUDGET).await;
        assert_eq!(result.error_kind(), Some(ToolErrorKind::UnknownTool));
    }

    #[tokio::test]
    async fn invalid_arguments_never_reach_the_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let invoker = invoker_with(ToolSpec::new(
            "count",
            "Counts invocations",
            top_n_schema(),
            move |_args: ToolArguments| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, BoxError>(Value::Null) }
            },
        ));

        for bad in [json!({ "n": "five" }), json!({ "n": 99 }), json!({ "extra": true })] {
            let result = invoker.invoke(&request("count", bad), BUDGET).await;
            assert_eq!(result.error_kind(), Some(ToolErrorKind::InvalidArguments));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn handler_failure_is_execution_error() {
        let invoker = invoker_with(ToolSpec::new(
            "flaky",
            "Always fails",
            InputSchema::new(),
            |_args: ToolArguments| async { Err::<Value, BoxError>("upstream 503".into()) },
        ));

        let result = invoker.invoke(&request("flaky", json!({})), BUDGET).await;
        let ToolOutcome::Error { error } = result.outcome else {
            panic!("expected error");
        };
        assert_eq!(error.kind, ToolErrorKind::ToolExecutionError);
        assert_eq!(error.message, "upstream 503");
    }

    #[tokio::test]
    async fn handler_panic_is_contained() {
        let invoker = invoker_with(ToolSpec::new(
            "boom",
            "Panics",
            InputSchema::new(),
            |_args: ToolArguments| async {
                if true {
                    panic!("kaboom");
                }
                Ok::<Value, BoxError>(Value::Null)
            },
        ));

        let result = invoker.invoke(&request("boom", json!({})), BUDGET).await;
        let ToolOutcome::Error { error } = result.outcome else {
            panic!("expected error");
        };
        assert_eq!(error.kind, ToolErrorKind::ToolExecutionError);
        assert!(error.message.contains("kaboom"));
    }

    #[tokio::test]
    async fn slow_handler_times_out() {
        let invoker = invoker_with(ToolSpec::new(
            "slow",
            "Sleeps",
            InputSchema::new(),
            |_args: ToolArguments| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<Value, BoxError>(Value::Null)
            },
        ));

        let result = invoker
            .invoke(&request("slow", json!({})), Duration::from_millis(20))
            .await;
        assert_eq!(result.error_kind(), Some(ToolErrorKind::Timeout));
    }

    #[tokio::test]
    async fn arguments_are_passed_through() {
        let invoker = invoker_with(ToolSpec::new(
            "greet",
            "Greets",
            InputSchema::new().param(Param::required("name", ParamType::String)),
            |args: ToolArguments| async move {
                let name = args.str("name").unwrap_or_default().to_string();
                Ok::<_, BoxError>(json!(format!("hello {name}")))
            },
        ));

        let mut arguments = Map::new();
        arguments.insert("name".into(), json!("Saka"));
        let result = invoker
            .invoke(&ToolCallRequest::new("g", "greet", arguments), BUDGET)
            .await;
        assert_eq!(result.content(), "hello Saka");
    }
}
