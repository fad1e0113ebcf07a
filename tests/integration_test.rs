//! End-to-end tests for the execution loop.
//!
//! Every test drives the real registry and built-in tools with a scripted
//! reasoning service, so nothing here touches the network.

use acton_tools_agent::agent::{
    AgentConfig, ExecutionLoop, LoopState, BUDGET_EXCEEDED, CANCELLED,
};
use acton_tools_agent::llm::{
    Decision, LLMError, ReasoningContext, ReasoningService, ScriptedReasoner,
};
use acton_tools_agent::messages::MessageRole;
use acton_tools_agent::tools::builtins::CodeExecutionTool;
use acton_tools_agent::tools::sandbox::SandboxPolicy;
use acton_tools_agent::tools::ToolRegistry;
use async_trait::async_trait;
use futures::future::AbortHandle;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn registry() -> Arc<ToolRegistry> {
    Arc::new(ToolRegistry::builtins().unwrap())
}

fn agent(reasoner: Arc<ScriptedReasoner>, max_iterations: usize) -> ExecutionLoop {
    let config = AgentConfig::default().with_max_iterations(max_iterations);
    ExecutionLoop::new(config, reasoner, registry()).unwrap()
}

fn python_available() -> bool {
    std::process::Command::new("python3")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

#[tokio::test]
async fn chained_calculation_reaches_final_answer() -> anyhow::Result<()> {
    let reasoner = Arc::new(ScriptedReasoner::new([
        Decision::tool_call("calculator", json!({"operation": "divide", "a": 15, "b": 3}))
            .with_rationale("First divide 15 by 3."),
        Decision::tool_call("calculator", json!({"operation": "multiply", "a": 5, "b": 4}))
            .with_rationale("Now multiply the result by 4."),
        Decision::final_answer("20"),
    ]));
    let mut agent = agent(Arc::clone(&reasoner), 5);

    let result = agent.run("Divide 15 by 3, then multiply the result by 4", false).await;

    assert_eq!(result.response(), Some("20"));
    let steps = result.steps();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].observation.to_value()["result"].as_f64(), Some(5.0));
    assert_eq!(steps[1].observation.to_value()["result"].as_f64(), Some(20.0));

    // The second decision saw the first observation.
    let contexts = reasoner.contexts();
    assert_eq!(contexts.len(), 3);
    let last_turn = contexts[1].memory.last().unwrap();
    assert_eq!(last_turn.role, MessageRole::Tool);
    assert!(last_turn.content.contains('5'));

    let value = result.to_value();
    assert_eq!(value["result"]["final_output"]["response"], "20");
    assert_eq!(value["result"]["final_output"]["confidence"], 1.0);
    assert_eq!(value["result"]["steps"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn tool_failure_becomes_an_observation() {
    let reasoner = Arc::new(ScriptedReasoner::new([
        Decision::tool_call("calculator", json!({"operation": "divide", "a": 1, "b": 0})),
        Decision::final_answer("Division by zero is undefined."),
    ]));
    let mut agent = agent(Arc::clone(&reasoner), 5);

    let result = agent.run("What is 1 divided by 0?", false).await;

    assert!(!result.is_error());
    let output = result.steps()[0].observation.to_value();
    assert_eq!(output["error"], "Division by zero");
    assert_eq!(result.response(), Some("Division by zero is undefined."));
}

#[tokio::test]
async fn unknown_tool_is_reported_to_the_reasoner() {
    let reasoner = Arc::new(ScriptedReasoner::new([
        Decision::tool_call("teleport", json!({"to": "mars"})),
        Decision::final_answer("I cannot do that."),
    ]));
    let mut agent = agent(Arc::clone(&reasoner), 5);

    let result = agent.run("Go to mars", false).await;

    let output = result.steps()[0].observation.to_value();
    assert_eq!(output["kind"], "unknown_tool");
    assert!(output["error"].as_str().unwrap().contains("teleport"));
    assert_eq!(agent.registry().metrics().snapshot().unknown, 1);
}

#[tokio::test]
async fn budget_exhaustion_abandons_with_partial_result() {
    let reasoner = Arc::new(ScriptedReasoner::from_fn(|_| {
        Ok(
            Decision::tool_call("calculator", json!({"operation": "add", "a": 1, "b": 1}))
                .with_rationale("Keep adding."),
        )
    }));
    let mut agent = agent(Arc::clone(&reasoner), 3);

    let result = agent.run("Add forever", false).await;

    assert!(!result.is_error());
    assert_eq!(result.steps().len(), 3);
    assert_eq!(reasoner.calls(), 3);
    assert_eq!(result.response(), Some("Keep adding."));
    assert_eq!(result.to_value()["abandoned"], BUDGET_EXCEEDED);
    assert_eq!(agent.state(), &LoopState::Abandoned(BUDGET_EXCEEDED.to_string()));
}

#[tokio::test]
async fn reasoning_failure_yields_error_result() {
    let reasoner = Arc::new(ScriptedReasoner::with_results([Err(LLMError::network(
        "connection refused",
    ))]));
    let mut agent = agent(reasoner, 5);

    let result = agent.run("What is 2 + 2?", false).await;

    assert!(result.is_error());
    let value = result.to_value();
    assert_eq!(value.as_object().map(|o| o.len()), Some(1));
    assert!(value["error"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn memory_persists_across_runs_until_reset() {
    let reasoner = Arc::new(ScriptedReasoner::new([
        Decision::final_answer("Hello, Ada."),
        Decision::final_answer("Your name is Ada."),
        Decision::final_answer("I don't know your name."),
    ]));
    let mut agent = agent(Arc::clone(&reasoner), 5);

    agent.run("My name is Ada.", false).await;
    agent.run("What is my name?", false).await;
    let contexts = reasoner.contexts();
    assert_eq!(contexts[1].memory.len(), 3);
    assert_eq!(contexts[1].memory[0].content, "My name is Ada.");

    agent.reset();
    assert!(agent.memory().is_empty());
    agent.run("What is my name?", false).await;
    let contexts = reasoner.contexts();
    assert_eq!(contexts[2].memory.len(), 1);
}

#[tokio::test]
async fn debug_mode_includes_rationale_and_raw_steps() {
    let reasoner = Arc::new(ScriptedReasoner::new([
        Decision::tool_call("calculator", json!({"operation": "add", "a": 2, "b": 3}))
            .with_rationale("Add the numbers."),
        Decision::final_answer("5").with_rationale("The sum is 5."),
    ]));
    let mut agent = agent(reasoner, 5);

    let value = agent.run("What is 2 + 3?", true).await.to_value();

    assert_eq!(value["result"]["steps"][0]["thought"], "Add the numbers.");
    assert!(value["result"]["steps"][0]["raw_log"].is_string());
    assert_eq!(value["debug"]["final_thought"], "The sum is 5.");
    assert_eq!(value["debug"]["total_steps"], 1);
    assert_eq!(value["debug"]["raw_steps"][0]["action"], "calculator");
}

#[tokio::test]
async fn concurrent_sessions_share_only_the_registry() {
    let shared = registry();
    let reasoner_a = Arc::new(ScriptedReasoner::new([
        Decision::tool_call("calculator", json!({"operation": "add", "a": 1, "b": 2})),
        Decision::final_answer("3"),
    ]));
    let reasoner_b = Arc::new(ScriptedReasoner::new([
        Decision::tool_call("calculator", json!({"operation": "multiply", "a": 6, "b": 7})),
        Decision::final_answer("42"),
    ]));

    let mut a = ExecutionLoop::new(AgentConfig::default(), reasoner_a, Arc::clone(&shared)).unwrap();
    let mut b = ExecutionLoop::new(AgentConfig::default(), reasoner_b, Arc::clone(&shared)).unwrap();

    let (ra, rb) = tokio::join!(a.run("1 + 2", false), b.run("6 * 7", false));

    assert_eq!(ra.response(), Some("3"));
    assert_eq!(rb.response(), Some("42"));
    assert_eq!(a.memory().len(), 4);
    assert_eq!(b.memory().len(), 4);
    assert_eq!(shared.metrics().snapshot().dispatched, 2);
}

#[derive(Debug)]
struct StallingReasoner;

#[async_trait]
impl ReasoningService for StallingReasoner {
    async fn next_action(&self, _context: &ReasoningContext<'_>) -> Result<Decision, LLMError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Decision::final_answer("too late"))
    }

    fn provider_name(&self) -> &'static str {
        "stalling"
    }
}

#[tokio::test]
async fn abort_handle_cancels_a_run() {
    let mut agent =
        ExecutionLoop::new(AgentConfig::default(), Arc::new(StallingReasoner), registry()).unwrap();
    let (handle, registration) = AbortHandle::new_pair();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();
    });

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        agent.run_abortable("wait", registration),
    )
    .await
    .expect("abort did not take effect");

    assert!(outcome.is_err());
    assert_eq!(agent.state(), &LoopState::Abandoned(CANCELLED.to_string()));
    assert_eq!(agent.memory().len(), 1);
}

#[tokio::test]
async fn code_execution_runs_python() {
    if !python_available() {
        eprintln!("python3 not available, skipping");
        return;
    }

    let reasoner = Arc::new(ScriptedReasoner::new([
        Decision::tool_call("code_execution", json!({"code": "print('hi')"})),
        Decision::final_answer("It printed hi."),
    ]));
    let mut agent = agent(reasoner, 5);

    let result = agent.run("Run print('hi')", false).await;

    let output = result.steps()[0].observation.to_value();
    assert_eq!(output["stdout"], "hi");
}

#[tokio::test]
async fn code_execution_rejects_disallowed_import() {
    let reasoner = Arc::new(ScriptedReasoner::new([
        Decision::tool_call("code_execution", json!({"code": "import os\nos.listdir('/')"})),
        Decision::final_answer("Not allowed."),
    ]));
    let mut agent = agent(reasoner, 5);

    let result = agent.run("List the root directory", false).await;

    let output = result.steps()[0].observation.to_value();
    assert_eq!(output["kind"], "unauthorized_import");
    assert_eq!(output["modules"], json!(["os"]));
}

#[tokio::test]
async fn aborting_during_code_execution_stops_the_interpreter() -> anyhow::Result<()> {
    if !python_available() {
        eprintln!("python3 not available, skipping");
        return Ok(());
    }

    let tool = Arc::new(CodeExecutionTool::new(SandboxPolicy::default())?);
    let metrics = Arc::clone(tool.metrics());
    let registry = Arc::new(ToolRegistry::builder().register(tool)?.build());
    let reasoner = Arc::new(ScriptedReasoner::new([Decision::tool_call(
        "code_execution",
        json!({"code": "import time\ntime.sleep(20)", "timeout": 30}),
    )]));
    let mut agent = ExecutionLoop::new(AgentConfig::default(), reasoner, registry)?;
    let (handle, registration) = AbortHandle::new_pair();

    let watcher = Arc::clone(&metrics);
    tokio::spawn(async move {
        for _ in 0..250 {
            if watcher.snapshot().active > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();
    });

    let started = std::time::Instant::now();
    let outcome = agent.run_abortable("Sleep for a while", registration).await;

    assert!(outcome.is_err());
    assert!(started.elapsed() < Duration::from_secs(15));
    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.spawned, 1);
    assert_eq!(snapshot.active, 0);
    assert_eq!(snapshot.timed_out, 0);
    Ok(())
}
