//! End-to-end exchange tests against a scripted model.

use runtime::{
    AbortReason, Agent, BoxError, Decision, Gateway, InputSchema, LoopConfig, ModelError,
    ModelRequest, Outcome, Param, ParamType, ToolArguments, ToolCallRequest, ToolCallResult,
    ToolChoice, ToolErrorKind, ToolRegistry, ToolSpec, Transcripts, Turn,
};
use serde_json::{Map, Value, json};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storage::{SessionKey, TranscriptStore};
use tokio_util::sync::CancellationToken;

// ─────────────────────────────────────────────────────────────────────────────
// Test doubles
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct SeenRequest {
    turns: Vec<Turn>,
    tool_choice: ToolChoice,
    tool_count: usize,
}

/// Replays canned decisions in order and records every request.
#[derive(Default)]
struct ScriptedGateway {
    script: Mutex<VecDeque<Result<Decision, ModelError>>>,
    seen: Mutex<Vec<SeenRequest>>,
    delay: Duration,
}

impl ScriptedGateway {
    fn new(script: impl IntoIterator<Item = Result<Decision, ModelError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Self::default()
        })
    }

    fn slow(
        delay: Duration,
        script: impl IntoIterator<Item = Result<Decision, ModelError>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            delay,
            ..Self::default()
        })
    }

    fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

impl Gateway for ScriptedGateway {
    async fn decide(&self, request: ModelRequest<'_>) -> Result<Decision, ModelError> {
        self.seen.lock().unwrap().push(SeenRequest {
            turns: request.turns.to_vec(),
            tool_choice: request.tool_choice,
            tool_count: request.tools.len(),
        });
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(ModelError::Api("script exhausted".into())))
    }
}

fn call(id: &str, tool: &str, arguments: Value) -> ToolCallRequest {
    let Value::Object(arguments) = arguments else {
        panic!("arguments must be an object");
    };
    ToolCallRequest::new(id, tool, arguments)
}

fn tools(calls: Vec<ToolCallRequest>) -> Result<Decision, ModelError> {
    Ok(Decision::CallTools(calls))
}

fn answer(text: &str) -> Result<Decision, ModelError> {
    Ok(Decision::Answer(text.to_string()))
}

fn outage() -> Result<Decision, ModelError> {
    Err(ModelError::Network("connection reset".into()))
}

fn form_table() -> ToolSpec {
    ToolSpec::new(
        "get_top_players_by_form",
        "Top players by current form",
        InputSchema::new().param(
            Param::optional("top_n", ParamType::Integer)
                .range(1.0, 50.0)
                .default_value(10),
        ),
        |args: ToolArguments| async move {
            let n = args.i64("top_n").unwrap_or(10) as usize;
            let players = ["Palmer", "Salah", "Saka", "Isak", "Haaland", "Watkins"];
            Ok::<_, BoxError>(json!(players.iter().take(n).collect::<Vec<_>>()))
        },
    )
}

fn sleeper(name: &str, delay: Duration) -> ToolSpec {
    ToolSpec::new(
        name,
        "Sleeps, then reports its name",
        InputSchema::new(),
        move |_args: ToolArguments| async move {
            tokio::time::sleep(delay).await;
            Ok::<_, BoxError>(json!(format!("slept {}ms", delay.as_millis())))
        },
    )
}

fn failing() -> ToolSpec {
    ToolSpec::new(
        "get_fixtures_for_gameweek",
        "Always fails",
        InputSchema::new(),
        |_args: ToolArguments| async { Err::<Value, BoxError>("FPL API returned 503".into()) },
    )
}

fn registry(specs: impl IntoIterator<Item = ToolSpec>) -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    for spec in specs {
        registry.register(spec).unwrap();
    }
    Arc::new(registry)
}

fn no_tools() -> Vec<ToolSpec> {
    Vec::new()
}

fn fast_config() -> LoopConfig {
    LoopConfig {
        max_steps: 8,
        tool_timeout: Duration::from_secs(5),
        retry_backoff: Duration::from_millis(1),
    }
}

fn agent(
    gateway: &Arc<ScriptedGateway>,
    specs: impl IntoIterator<Item = ToolSpec>,
) -> (Agent<Arc<ScriptedGateway>, Arc<TranscriptStore>>, Arc<TranscriptStore>) {
    let store = Arc::new(TranscriptStore::in_memory().unwrap());
    let agent = Agent::new(Arc::clone(gateway), registry(specs), Arc::clone(&store))
        .with_config(fast_config());
    (agent, store)
}

fn tool_results(turns: &[Turn]) -> Vec<&ToolCallResult> {
    turns
        .iter()
        .filter_map(|turn| match turn {
            Turn::Tool(result) => Some(result),
            _ => None,
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenarios
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn single_tool_round_then_answer() {
    let gateway = ScriptedGateway::new([
        tools(vec![call("c1", "get_top_players_by_form", json!({ "top_n": 5 }))]),
        answer("Palmer leads the form table."),
    ]);
    let (agent, store) = agent(&gateway, [form_table()]);
    let session = SessionKey::from("alice");

    let result = agent
        .run_exchange(&session, "top 5 by form", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        result.outcome,
        Outcome::FinalAnswer("Palmer leads the form table.".into())
    );
    assert_eq!(result.steps, 2);
    assert_eq!(
        result.turns,
        vec![
            Turn::user("top 5 by form"),
            Turn::tool_calls(vec![call("c1", "get_top_players_by_form", json!({ "top_n": 5 }))]),
            Turn::Tool(ToolCallResult::ok(
                "c1",
                json!(["Palmer", "Salah", "Saka", "Isak", "Haaland"])
            )),
            Turn::assistant("Palmer leads the form table."),
        ]
    );

    let seen = gateway.seen();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].tool_count, 1);
    assert_eq!(seen[1].turns, result.turns[..3].to_vec());

    assert_eq!(store.load_history(&session).unwrap(), result.turns);
}

#[tokio::test]
async fn gateway_failing_twice_aborts_without_tool_turns() {
    let gateway = ScriptedGateway::new([outage(), outage()]);
    let (agent, store) = agent(&gateway, [form_table()]);
    let session = SessionKey::from("bob");

    let result = agent
        .run_exchange(&session, "who to captain?", &CancellationToken::new())
        .await
        .unwrap();

    let Outcome::Aborted(AbortReason::ModelUnavailable(message)) = &result.outcome else {
        panic!("expected ModelUnavailable, got {:?}", result.outcome);
    };
    assert!(message.contains("connection reset"));
    assert_eq!(gateway.seen().len(), 2);
    assert_eq!(result.turns, vec![Turn::user("who to captain?")]);
    assert!(tool_results(&result.turns).is_empty());
    assert_eq!(store.load_history(&session).unwrap(), result.turns);
}

#[tokio::test]
async fn single_gateway_failure_is_retried() {
    let gateway = ScriptedGateway::new([outage(), answer("Captain Salah.")]);
    let (agent, _store) = agent(&gateway, no_tools());

    let result = agent
        .run_exchange(&SessionKey::from("s"), "captain?", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.answer(), Some("Captain Salah."));
    assert_eq!(result.steps, 1);
    assert_eq!(gateway.seen().len(), 2);
}

#[tokio::test]
async fn malformed_decision_counts_as_failure() {
    let gateway = ScriptedGateway::new([
        tools(vec![
            call("dup", "get_top_players_by_form", json!({})),
            call("dup", "get_top_players_by_form", json!({})),
        ]),
        tools(vec![]),
    ]);
    let (agent, _store) = agent(&gateway, [form_table()]);

    let result = agent
        .run_exchange(&SessionKey::from("s"), "form?", &CancellationToken::new())
        .await
        .unwrap();

    assert!(matches!(
        result.outcome,
        Outcome::Aborted(AbortReason::ModelUnavailable(_))
    ));
    assert!(tool_results(&result.turns).is_empty());
}

#[tokio::test]
async fn tool_error_is_fed_back_and_loop_continues() {
    let gateway = ScriptedGateway::new([
        tools(vec![call("f1", "get_fixtures_for_gameweek", json!({}))]),
        answer("Fixtures are unavailable right now."),
    ]);
    let (agent, _store) = agent(&gateway, [failing()]);

    let result = agent
        .run_exchange(&SessionKey::from("s"), "gw 7 fixtures", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.answer(), Some("Fixtures are unavailable right now."));
    let results = tool_results(&result.turns);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].error_kind(), Some(ToolErrorKind::ToolExecutionError));

    let seen = gateway.seen();
    assert_eq!(seen.len(), 2);
    assert!(matches!(seen[1].turns.last(), Some(Turn::Tool(r)) if r.is_error()));
}

#[tokio::test]
async fn unknown_tool_is_reported_to_the_model() {
    let gateway = ScriptedGateway::new([
        tools(vec![call("u1", "get_weather", json!({}))]),
        answer("I can only help with FPL."),
    ]);
    let (agent, _store) = agent(&gateway, [form_table()]);

    let result = agent
        .run_exchange(&SessionKey::from("s"), "weather?", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.answer(), Some("I can only help with FPL."));
    let results = tool_results(&result.turns);
    assert_eq!(results[0].call_id, "u1");
    assert_eq!(results[0].error_kind(), Some(ToolErrorKind::UnknownTool));
}

#[tokio::test]
async fn invalid_arguments_are_reported_without_running_the_tool() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let counted = ToolSpec::new(
        "get_player_details",
        "Player lookup",
        InputSchema::new().param(Param::required("player_name", ParamType::String)),
        move |_args: ToolArguments| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, BoxError>(json!({})) }
        },
    );
    let gateway = ScriptedGateway::new([
        tools(vec![call("p1", "get_player_details", json!({ "player_name": 7 }))]),
        answer("Which player?"),
    ]);
    let (agent, _store) = agent(&gateway, [counted]);

    let result = agent
        .run_exchange(&SessionKey::from("s"), "details", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        tool_results(&result.turns)[0].error_kind(),
        Some(ToolErrorKind::InvalidArguments)
    );
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn results_follow_request_order_not_completion_order() {
    let gateway = ScriptedGateway::new([
        tools(vec![
            call("a", "slow", json!({})),
            call("b", "fast", json!({})),
            call("c", "medium", json!({})),
        ]),
        answer("done"),
    ]);
    let (agent, _store) = agent(
        &gateway,
        [
            sleeper("slow", Duration::from_millis(150)),
            sleeper("fast", Duration::ZERO),
            sleeper("medium", Duration::from_millis(150)),
        ],
    );

    let started = std::time::Instant::now();
    let result = agent
        .run_exchange(&SessionKey::from("s"), "go", &CancellationToken::new())
        .await
        .unwrap();

    let ids: Vec<&str> = tool_results(&result.turns)
        .iter()
        .map(|r| r.call_id.as_str())
        .collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    // Calls in a batch run concurrently.
    assert!(started.elapsed() < Duration::from_millis(280));
}

#[tokio::test]
async fn slow_tool_times_out_individually() {
    let gateway = ScriptedGateway::new([
        tools(vec![call("s", "slow", json!({})), call("f", "fast", json!({}))]),
        answer("partial data"),
    ]);
    let store = Arc::new(TranscriptStore::in_memory().unwrap());
    let agent = Agent::new(
        Arc::clone(&gateway),
        registry([
            sleeper("slow", Duration::from_secs(10)),
            sleeper("fast", Duration::ZERO),
        ]),
        store,
    )
    .with_config(LoopConfig {
        tool_timeout: Duration::from_millis(50),
        ..fast_config()
    });

    let result = agent
        .run_exchange(&SessionKey::from("s"), "go", &CancellationToken::new())
        .await
        .unwrap();

    let results = tool_results(&result.turns);
    assert_eq!(results[0].error_kind(), Some(ToolErrorKind::Timeout));
    assert!(!results[1].is_error());
    assert_eq!(result.answer(), Some("partial data"));
}

#[tokio::test]
async fn answer_on_the_last_allowed_step_is_final() {
    let gateway = ScriptedGateway::new([
        tools(vec![call("c1", "get_top_players_by_form", json!({}))]),
        answer("Palmer."),
    ]);
    let store = Arc::new(TranscriptStore::in_memory().unwrap());
    let agent = Agent::new(Arc::clone(&gateway), registry([form_table()]), store).with_config(
        LoopConfig {
            max_steps: 2,
            ..fast_config()
        },
    );

    let result = agent
        .run_exchange(&SessionKey::from("s"), "form", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.outcome, Outcome::FinalAnswer("Palmer.".into()));
    assert_eq!(result.steps, 2);
}

#[tokio::test]
async fn step_limit_aborts_after_a_best_effort_answer() {
    let gateway = ScriptedGateway::new([
        tools(vec![call("c1", "get_top_players_by_form", json!({}))]),
        tools(vec![call("c2", "get_top_players_by_form", json!({}))]),
        answer("Based on form so far: Palmer."),
    ]);
    let store = Arc::new(TranscriptStore::in_memory().unwrap());
    let agent = Agent::new(Arc::clone(&gateway), registry([form_table()]), Arc::clone(&store))
        .with_config(LoopConfig {
            max_steps: 2,
            ..fast_config()
        });
    let session = SessionKey::from("s");

    let result = agent
        .run_exchange(&session, "keep digging", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        result.outcome,
        Outcome::Aborted(AbortReason::StepLimitExceeded)
    );
    assert_eq!(result.steps, 2);
    assert_eq!(tool_results(&result.turns).len(), 2);
    assert_eq!(
        result.turns.last(),
        Some(&Turn::assistant("Based on form so far: Palmer."))
    );

    let seen = gateway.seen();
    assert_eq!(seen.len(), 3);
    let wrap_up = &seen[2];
    assert_eq!(wrap_up.tool_choice, ToolChoice::None);
    assert!(matches!(wrap_up.turns.last(), Some(Turn::User { .. })));

    // The wrap-up prompt is never persisted.
    let history = store.load_history(&session).unwrap();
    assert_eq!(history, result.turns);
    let user_turns = history
        .iter()
        .filter(|t| matches!(t, Turn::User { .. }))
        .count();
    assert_eq!(user_turns, 1);
}

#[tokio::test]
async fn step_limit_without_best_effort_answer_still_aborts() {
    let gateway = ScriptedGateway::new([
        tools(vec![call("c1", "get_top_players_by_form", json!({}))]),
        tools(vec![call("c2", "get_top_players_by_form", json!({}))]),
    ]);
    let store = Arc::new(TranscriptStore::in_memory().unwrap());
    let agent = Agent::new(Arc::clone(&gateway), registry([form_table()]), store).with_config(
        LoopConfig {
            max_steps: 1,
            ..fast_config()
        },
    );

    let result = agent
        .run_exchange(&SessionKey::from("s"), "go", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        result.outcome,
        Outcome::Aborted(AbortReason::StepLimitExceeded)
    );
    assert_eq!(result.steps, 1);
    assert!(matches!(result.turns.last(), Some(Turn::Tool(_))));
}

#[tokio::test]
async fn cancellation_during_tools_aborts_and_persists() {
    let gateway = ScriptedGateway::new([
        tools(vec![call("s", "slow", json!({}))]),
        answer("never reached"),
    ]);
    let (agent, store) = agent(&gateway, [sleeper("slow", Duration::from_secs(10))]);
    let session = SessionKey::from("s");

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let result = agent.run_exchange(&session, "go", &cancel).await.unwrap();

    assert_eq!(result.outcome, Outcome::Aborted(AbortReason::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(result.turns.len(), 2);
    assert!(tool_results(&result.turns).is_empty());
    assert_eq!(gateway.seen().len(), 1);
    assert_eq!(store.load_history(&session).unwrap(), result.turns);
}

#[tokio::test]
async fn exchange_after_cancelled_tools_skips_unanswered_calls() {
    let gateway = ScriptedGateway::new([
        tools(vec![call("s", "slow", json!({}))]),
        answer("Back again."),
    ]);
    let (agent, store) = agent(&gateway, [sleeper("slow", Duration::from_secs(10))]);
    let session = SessionKey::from("s");

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });
    let first = agent.run_exchange(&session, "go", &cancel).await.unwrap();
    assert_eq!(first.outcome, Outcome::Aborted(AbortReason::Cancelled));

    let second = agent
        .run_exchange(&session, "try again", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(second.outcome, Outcome::FinalAnswer("Back again.".into()));

    let seen = gateway.seen();
    assert_eq!(
        seen[1].turns,
        vec![Turn::user("go"), Turn::user("try again")]
    );

    // Storage still holds the cancelled batch.
    let history = store.load_history(&session).unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[1], Turn::tool_calls(vec![call("s", "slow", json!({}))]));
}

#[tokio::test]
async fn cancellation_during_model_call() {
    let gateway = ScriptedGateway::slow(Duration::from_secs(10), [answer("too late")]);
    let (agent, _store) = agent(&gateway, no_tools());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let result = agent
        .run_exchange(&SessionKey::from("s"), "go", &cancel)
        .await
        .unwrap();
    assert_eq!(result.outcome, Outcome::Aborted(AbortReason::Cancelled));
    assert_eq!(result.turns, vec![Turn::user("go")]);
}

#[tokio::test]
async fn cancelled_before_start_never_calls_the_model() {
    let gateway = ScriptedGateway::new([answer("unused")]);
    let (agent, _store) = agent(&gateway, no_tools());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = agent
        .run_exchange(&SessionKey::from("s"), "go", &cancel)
        .await
        .unwrap();

    assert_eq!(result.outcome, Outcome::Aborted(AbortReason::Cancelled));
    assert_eq!(result.steps, 0);
    assert!(gateway.seen().is_empty());
}

#[tokio::test]
async fn history_is_replayed_on_the_next_exchange() {
    let gateway = ScriptedGateway::new([
        tools(vec![call("c1", "get_top_players_by_form", json!({ "top_n": 2 }))]),
        answer("Palmer and Salah."),
        answer("Palmer is cheaper."),
    ]);
    let (agent, store) = agent(&gateway, [form_table()]);
    let session = SessionKey::from("carol");
    let cancel = CancellationToken::new();

    let first = agent
        .run_exchange(&session, "top 2 by form", &cancel)
        .await
        .unwrap();
    let second = agent
        .run_exchange(&session, "which is cheaper?", &cancel)
        .await
        .unwrap();

    let seen = gateway.seen();
    let replayed = &seen[2].turns;
    assert_eq!(replayed[..first.turns.len()], first.turns[..]);
    assert_eq!(replayed.last(), Some(&Turn::user("which is cheaper?")));

    let mut expected = first.turns.clone();
    expected.extend(second.turns.clone());
    assert_eq!(store.load_history(&session).unwrap(), expected);
}

#[tokio::test]
async fn same_history_and_script_give_the_same_turns() {
    let history = vec![
        Turn::user("who is in form?"),
        Turn::tool_calls(vec![call("h1", "get_top_players_by_form", json!({ "top_n": 1 }))]),
        Turn::Tool(ToolCallResult::ok("h1", json!(["Palmer"]))),
        Turn::assistant("Palmer."),
    ];
    let script = || {
        [
            tools(vec![
                call("c1", "get_top_players_by_form", json!({ "top_n": 3 })),
                call("c2", "get_top_players_by_form", json!({})),
            ]),
            answer("Palmer, Salah and Saka."),
        ]
    };
    let session = SessionKey::from("replay");
    let cancel = CancellationToken::new();

    let mut runs = Vec::new();
    for _ in 0..2 {
        let gateway = ScriptedGateway::new(script());
        let (agent, store) = agent(&gateway, [form_table()]);
        store.append_turns(&session, &history).unwrap();

        let result = agent
            .run_exchange(&session, "top 3 by form", &cancel)
            .await
            .unwrap();
        runs.push((result, store.load_history(&session).unwrap(), gateway.seen()));
    }

    let (first, first_stored, first_seen) = &runs[0];
    let (second, second_stored, second_seen) = &runs[1];
    assert_eq!(first.outcome, Outcome::FinalAnswer("Palmer, Salah and Saka.".into()));
    assert_eq!(first.turns.len(), 4);
    assert_eq!(first.turns, second.turns);
    assert_eq!(first_stored, second_stored);
    assert_eq!(first_stored.len(), history.len() + first.turns.len());
    let first_requests: Vec<_> = first_seen.iter().map(|seen| &seen.turns).collect();
    let second_requests: Vec<_> = second_seen.iter().map(|seen| &seen.turns).collect();
    assert_eq!(first_requests, second_requests);
}

#[tokio::test]
async fn sessions_do_not_share_history() {
    let gateway = ScriptedGateway::new([answer("one"), answer("two")]);
    let (agent, store) = agent(&gateway, no_tools());
    let cancel = CancellationToken::new();

    agent
        .run_exchange(&SessionKey::from("a"), "hi from a", &cancel)
        .await
        .unwrap();
    agent
        .run_exchange(&SessionKey::from("b"), "hi from b", &cancel)
        .await
        .unwrap();

    assert_eq!(gateway.seen()[1].turns, vec![Turn::user("hi from b")]);
    assert_eq!(store.load_history(&SessionKey::from("a")).unwrap().len(), 2);
    assert_eq!(store.load_history(&SessionKey::from("b")).unwrap().len(), 2);
}

#[tokio::test]
async fn arguments_reach_the_handler_with_defaults() {
    let seen_args = Arc::new(Mutex::new(Vec::<Map<String, Value>>::new()));
    let sink = Arc::clone(&seen_args);
    let spec = ToolSpec::new(
        "get_best_value_players",
        "Value picks",
        InputSchema::new()
            .param(
                Param::optional("position", ParamType::String)
                    .one_of(["GKP", "DEF", "MID", "FWD"])
                    .default_value("MID"),
            )
            .param(Param::optional("top_n", ParamType::Integer).default_value(10)),
        move |args: ToolArguments| {
            sink.lock().unwrap().push(args.0.clone());
            async { Ok::<_, BoxError>(json!([])) }
        },
    );
    let gateway = ScriptedGateway::new([
        tools(vec![call("v", "get_best_value_players", json!({ "position": "DEF" }))]),
        answer("ok"),
    ]);
    let (agent, _store) = agent(&gateway, [spec]);

    agent
        .run_exchange(&SessionKey::from("s"), "value defenders", &CancellationToken::new())
        .await
        .unwrap();

    let args = seen_args.lock().unwrap();
    assert_eq!(args.len(), 1);
    assert_eq!(args[0]["position"], json!("DEF"));
    assert_eq!(args[0]["top_n"], json!(10));
}
