//! The reasoning-action loop.
//!
//! One exchange moves through these phases:
//!
//! ```text
//!   Thinking --Answer--> Done
//!      |  ^
//!  CallTools \
//!      v      \
//!   Acting --> Observing
//! ```
//!
//! Any phase boundary can also lead to `Aborted`: the model failed twice in a
//! row, the step limit was reached, or the caller cancelled.

use crate::conversation::ConversationState;
use crate::model::{Decision, Gateway, ModelError, ModelRequest, ToolCallRequest, ToolChoice, Turn};
use crate::tools::{ToolCallResult, ToolError, ToolInvoker};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Appended to the request (never the transcript) when the step limit is hit.
const WRAP_UP_PROMPT: &str = "You have reached the limit of tool calls for this question. \
No further tools are available. Answer now using only the information already gathered, \
and say so if it is incomplete.";

/// Limits for one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopConfig {
    /// Maximum number of model steps (Thinking entries) per exchange.
    pub max_steps: u32,
    /// Time budget for each individual tool call.
    pub tool_timeout: Duration,
    /// Delay before retrying a failed model call.
    pub retry_backoff: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_steps: 8,
            tool_timeout: Duration::from_secs(30),
            retry_backoff: Duration::from_millis(500),
        }
    }
}

/// Why an exchange ended without a final answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The model failed on a call and on its retry.
    ModelUnavailable(String),
    /// The model kept requesting tools past the step limit.
    StepLimitExceeded,
    /// The caller cancelled the exchange.
    Cancelled,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ModelUnavailable(error) => write!(f, "model unavailable: {error}"),
            Self::StepLimitExceeded => write!(f, "step limit exceeded"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Terminal outcome of an exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    FinalAnswer(String),
    Aborted(AbortReason),
}

enum Phase {
    Thinking,
    Acting(Vec<ToolCallRequest>),
    Observing(Vec<ToolCallResult>),
    Done(String),
    Aborted(AbortReason),
}

/// Drives one exchange over a conversation.
pub(crate) struct Orchestrator<'a, G> {
    gateway: &'a G,
    invoker: &'a ToolInvoker,
    config: &'a LoopConfig,
}

impl<'a, G: Gateway> Orchestrator<'a, G> {
    pub(crate) fn new(gateway: &'a G, invoker: &'a ToolInvoker, config: &'a LoopConfig) -> Self {
        Self {
            gateway,
            invoker,
            config,
        }
    }

    /// Run until an answer or an abort, returning the outcome and the number
    /// of model steps taken.
    pub(crate) async fn run(
        &self,
        state: &mut ConversationState,
        cancel: &CancellationToken,
    ) -> (Outcome, u32) {
        let mut steps = 0u32;
        let mut phase = Phase::Thinking;

        loop {
            phase = match phase {
                Phase::Thinking if cancel.is_cancelled() => Phase::Aborted(AbortReason::Cancelled),
                Phase::Thinking if steps >= self.config.max_steps => {
                    Phase::Aborted(self.wrap_up(state, cancel).await)
                }
                Phase::Thinking => {
                    steps += 1;
                    debug!(step = steps, turns = state.turns().len(), "thinking");
                    let decision = self.think(state.turns(), cancel).await;
                    match decision {
                        Ok(Decision::Answer(text)) => {
                            state.push(Turn::assistant(text.clone()));
                            Phase::Done(text)
                        }
                        Ok(Decision::CallTools(calls)) => {
                            debug!(step = steps, calls = calls.len(), "model requested tools");
                            state.push(Turn::tool_calls(calls.clone()));
                            Phase::Acting(calls)
                        }
                        Err(reason) => Phase::Aborted(reason),
                    }
                }
                Phase::Acting(_) if cancel.is_cancelled() => Phase::Aborted(AbortReason::Cancelled),
                Phase::Acting(calls) => match self.act(&calls, cancel).await {
                    Some(results) => Phase::Observing(results),
                    None => Phase::Aborted(AbortReason::Cancelled),
                },
                Phase::Observing(results) => {
                    for result in results {
                        state.push(Turn::Tool(result));
                    }
                    Phase::Thinking
                }
                Phase::Done(text) => return (Outcome::FinalAnswer(text), steps),
                Phase::Aborted(reason) => {
                    warn!(%reason, steps, "exchange aborted");
                    return (Outcome::Aborted(reason), steps);
                }
            };
        }
    }

    /// One model step: a call plus at most one retry.
    async fn think(
        &self,
        turns: &[Turn],
        cancel: &CancellationToken,
    ) -> Result<Decision, AbortReason> {
        let request = ModelRequest {
            turns,
            tools: self.invoker.registry().descriptors(),
            tool_choice: ToolChoice::Auto,
        };

        let error = match self.ask(request, cancel).await {
            None => return Err(AbortReason::Cancelled),
            Some(Ok(decision)) => return Ok(decision),
            Some(Err(error)) => error,
        };

        let backoff = self.config.retry_backoff;
        warn!(%error, backoff_ms = backoff.as_millis() as u64, "model call failed, retrying");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AbortReason::Cancelled),
            _ = tokio::time::sleep(backoff) => {}
        }

        match self.ask(request, cancel).await {
            None => Err(AbortReason::Cancelled),
            Some(Ok(decision)) => Ok(decision),
            Some(Err(error)) => {
                warn!(%error, "model call failed again");
                Err(AbortReason::ModelUnavailable(error.to_string()))
            }
        }
    }

    /// Call the gateway and validate its decision. `None` means cancelled.
    async fn ask(
        &self,
        request: ModelRequest<'_>,
        cancel: &CancellationToken,
    ) -> Option<Result<Decision, ModelError>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            decision = self.gateway.decide(request) => Some(decision.and_then(Decision::validate)),
        }
    }

    /// Run a batch of calls concurrently, returning results in request order.
    /// `None` means cancelled; calls already running finish detached.
    async fn act(
        &self,
        calls: &[ToolCallRequest],
        cancel: &CancellationToken,
    ) -> Option<Vec<ToolCallResult>> {
        let timeout = self.config.tool_timeout;
        let mut in_flight: FuturesUnordered<_> = calls
            .iter()
            .map(|call| self.invoker.invoke(call, timeout))
            .collect();

        let collect = async move {
            let mut by_id = HashMap::with_capacity(calls.len());
            while let Some(result) = in_flight.next().await {
                by_id.insert(result.call_id.clone(), result);
            }
            by_id
        };

        let mut by_id: HashMap<String, ToolCallResult> = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            by_id = collect => by_id,
        };

        let results = calls
            .iter()
            .map(|call| {
                by_id.remove(&call.call_id).unwrap_or_else(|| {
                    ToolCallResult::error(
                        &call.call_id,
                        ToolError::Execution("no result was produced".into()),
                    )
                })
            })
            .collect();
        Some(results)
    }

    /// Ask once more with tools disabled, then abort.
    async fn wrap_up(
        &self,
        state: &mut ConversationState,
        cancel: &CancellationToken,
    ) -> AbortReason {
        warn!(
            max_steps = self.config.max_steps,
            "step limit reached, asking for a best-effort answer"
        );

        let mut turns = state.turns().to_vec();
        turns.push(Turn::user(WRAP_UP_PROMPT));
        let request = ModelRequest {
            turns: &turns,
            tools: self.invoker.registry().descriptors(),
            tool_choice: ToolChoice::None,
        };

        match self.ask(request, cancel).await {
            None => return AbortReason::Cancelled,
            Some(Ok(Decision::Answer(text))) => state.push(Turn::assistant(text)),
            Some(Ok(Decision::CallTools(calls))) => {
                warn!(calls = calls.len(), "model still requested tools after the step limit");
            }
            Some(Err(error)) => warn!(%error, "best-effort answer failed"),
        }
        AbortReason::StepLimitExceeded
    }
}
