//! Exchange runner.

use crate::Result;
use crate::conversation::ConversationState;
use crate::model::{Gateway, Turn, replayable_turns};
use crate::orchestrator::{LoopConfig, Orchestrator, Outcome};
use crate::tools::{ToolInvoker, ToolRegistry};
use crate::transcript::Transcripts;
use std::sync::Arc;
use storage::SessionKey;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Result of one exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopResult {
    pub outcome: Outcome,
    /// Turns appended by this exchange, starting with the user's message.
    pub turns: Vec<Turn>,
    /// Number of model steps taken.
    pub steps: u32,
}

impl LoopResult {
    /// The final answer, if the exchange produced one.
    pub fn answer(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::FinalAnswer(text) => Some(text),
            Outcome::Aborted(_) => None,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.outcome, Outcome::Aborted(_))
    }
}

/// Runs exchanges against a model, a tool registry, and a transcript store.
///
/// An agent holds no per-session state: every exchange loads its history,
/// runs the loop over a private copy, and appends the new turns once at the
/// end, so exchanges for different sessions can run concurrently.
pub struct Agent<G, T> {
    gateway: G,
    invoker: ToolInvoker,
    transcripts: T,
    config: LoopConfig,
}

impl<G: Gateway, T: Transcripts> Agent<G, T> {
    pub fn new(gateway: G, registry: Arc<ToolRegistry>, transcripts: T) -> Self {
        Self {
            gateway,
            invoker: ToolInvoker::new(registry),
            transcripts,
            config: LoopConfig::default(),
        }
    }

    /// Override the loop limits.
    pub fn with_config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.invoker.registry()
    }

    pub fn transcripts(&self) -> &T {
        &self.transcripts
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Send a user message and run the loop to an answer or an abort.
    ///
    /// The exchange's turns are persisted whatever the outcome. Tool calls
    /// left unanswered by an earlier cancelled exchange stay in storage but
    /// are not sent to the model. `Err` is
    /// returned only when history cannot be loaded or the turns cannot be
    /// written.
    pub async fn run_exchange(
        &self,
        session: &SessionKey,
        user_text: &str,
        cancel: &CancellationToken,
    ) -> Result<LoopResult> {
        let history = self.transcripts.load_history(session)?;
        info!(%session, history = history.len(), "starting exchange");

        let mut state = ConversationState::new(replayable_turns(&history));
        state.push(Turn::user(user_text));

        let orchestrator = Orchestrator::new(&self.gateway, &self.invoker, &self.config);
        let (outcome, steps) = orchestrator.run(&mut state, cancel).await;

        let turns = state.into_appended();
        self.transcripts.append_turns(session, &turns)?;

        info!(
            %session,
            steps,
            appended = turns.len(),
            aborted = matches!(outcome, Outcome::Aborted(_)),
            "exchange finished"
        );
        Ok(LoopResult {
            outcome,
            turns,
            steps,
        })
    }
}
