//! The execution loop.
//!
//! Drives the decide, invoke, observe cycle:
//!
//! ```text
//! Running --query--> FinalAnswer ------------------------> Finished(answer)
//!    ^                ToolCall --dispatch--> Step --+
//!    +----------------------------------------------+
//! Running --(steps == max_iterations)--> Abandoned("iteration budget exceeded")
//! ```
//!
//! Tool calls are strictly sequential: each decision is conditioned on every
//! earlier observation. The loop suspends only while querying the reasoning
//! service and while a tool runs.

use crate::agent::config::AgentConfig;
use crate::agent::memory::ConversationMemory;
use crate::agent::result::{DebugBundle, RunReport, RunResult, DEFAULT_CONFIDENCE};
use crate::agent::state::{LoopState, BUDGET_EXCEEDED, CANCELLED};
use crate::agent::step::{Action, Step, Task};
use crate::error::AgentError;
use crate::llm::{Decision, ReasoningContext, ReasoningService};
use crate::tools::ToolRegistry;
use crate::types::RunId;
use chrono::Utc;
use futures::future::{AbortRegistration, Abortable, Aborted};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::Instrument;

/// One conversation session: a reasoning service, a shared registry and the
/// memory they build up together.
///
/// Independent sessions each get their own `ExecutionLoop`; only the
/// `Arc<ToolRegistry>` is shared between them.
#[derive(Debug)]
pub struct ExecutionLoop {
    config: AgentConfig,
    reasoner: Arc<dyn ReasoningService>,
    registry: Arc<ToolRegistry>,
    memory: ConversationMemory,
    state: LoopState,
}

impl ExecutionLoop {
    /// Creates a loop with empty memory.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` does not validate.
    pub fn new(
        config: AgentConfig,
        reasoner: Arc<dyn ReasoningService>,
        registry: Arc<ToolRegistry>,
    ) -> Result<Self, AgentError> {
        config.validate()?;
        Ok(Self {
            config,
            reasoner,
            registry,
            memory: ConversationMemory::new(),
            state: LoopState::default(),
        })
    }

    /// Returns the loop configuration.
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Returns the tool registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Returns the conversation so far.
    #[must_use]
    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Returns the state the last run ended in, or `Running` during a run.
    #[must_use]
    pub fn state(&self) -> &LoopState {
        &self.state
    }

    /// Clears the conversation memory. Idempotent and always succeeds.
    pub fn reset(&mut self) {
        tracing::debug!(turns = self.memory.len(), "conversation memory reset");
        self.memory.reset();
        self.state = LoopState::default();
    }

    /// Runs `text` to completion.
    ///
    /// Never fails: faults outside any tool come back as
    /// [`RunResult::Failed`].
    pub async fn run(&mut self, text: &str, debug: bool) -> RunResult {
        self.run_task(Task::new(text).with_debug(debug)).await
    }

    /// Runs a prepared [`Task`] to completion.
    pub async fn run_task(&mut self, task: Task) -> RunResult {
        let run_id = RunId::new();
        let span = tracing::info_span!("run", run_id = %run_id);
        self.drive(task, run_id).instrument(span).await
    }

    /// Runs `task` until it completes or `registration`'s handle aborts it.
    ///
    /// Aborting drops the in-flight reasoning query or tool dispatch; a
    /// running sandbox process is killed with it.
    ///
    /// # Errors
    ///
    /// Returns [`Aborted`] if the run was cancelled; the loop is then left
    /// in [`LoopState::Abandoned`] with reason [`CANCELLED`].
    pub async fn run_abortable(
        &mut self,
        task: impl Into<Task>,
        registration: AbortRegistration,
    ) -> Result<RunResult, Aborted> {
        let outcome = Abortable::new(self.run_task(task.into()), registration).await;
        if outcome.is_err() {
            tracing::warn!("run {CANCELLED}");
            self.state = LoopState::Abandoned(CANCELLED.to_string());
        }
        outcome
    }

    async fn drive(&mut self, task: Task, run_id: RunId) -> RunResult {
        let debug = task.debug || self.config.debug;
        let max_iterations = self.config.max_iterations;
        let mut steps: Vec<Step> = Vec::new();

        self.state = LoopState::Running;
        self.memory.push_user(task.text.as_str());
        tracing::info!(
            max_iterations,
            tools = self.registry.len(),
            reasoner = self.reasoner.provider_name(),
            "run started"
        );

        loop {
            if steps.len() >= max_iterations {
                let partial = steps
                    .iter()
                    .rev()
                    .find_map(|step| step.action.rationale.clone())
                    .unwrap_or_default();
                tracing::warn!(steps = steps.len(), "run abandoned: {BUDGET_EXCEEDED}");
                self.state = LoopState::Abandoned(BUDGET_EXCEEDED.to_string());

                let total_steps = steps.len();
                return RunResult::Completed(RunReport {
                    run_id,
                    confidence: DEFAULT_CONFIDENCE,
                    steps,
                    debug: debug.then(|| DebugBundle {
                        final_thought: partial.clone(),
                        total_steps,
                    }),
                    response: partial,
                    abandoned: Some(BUDGET_EXCEEDED.to_string()),
                });
            }

            let decision = match self.decide(&task).await {
                Ok(decision) => decision,
                Err(error) => {
                    tracing::error!(error = %error, steps = steps.len(), "run failed");
                    self.state = LoopState::Abandoned(error.to_string());
                    return RunResult::Failed { error };
                }
            };

            match decision {
                Decision::FinalAnswer { answer, rationale } => {
                    tracing::info!(steps = steps.len(), "run finished");
                    self.memory.push_assistant(answer.as_str());
                    self.state = LoopState::Finished(answer.clone());

                    let total_steps = steps.len();
                    return RunResult::Completed(RunReport {
                        run_id,
                        response: answer,
                        confidence: DEFAULT_CONFIDENCE,
                        steps,
                        debug: debug.then(|| DebugBundle {
                            final_thought: rationale.unwrap_or_default(),
                            total_steps,
                        }),
                        abandoned: None,
                    });
                }
                Decision::ToolCall { call, rationale } => {
                    let id = if call.id.is_empty() {
                        format!("call_{}", self.memory.len())
                    } else {
                        call.id
                    };
                    let action = Action {
                        id,
                        tool: call.name,
                        input: call.arguments,
                        rationale,
                        timestamp: Utc::now(),
                    };

                    tracing::debug!(step = steps.len(), tool = %action.tool, "dispatching tool");
                    let observation = self
                        .registry
                        .dispatch(&action.tool, action.input.clone())
                        .await;

                    let step = Step {
                        action,
                        observation,
                    };
                    self.memory.record_step(&step);
                    steps.push(step);
                }
            }
        }
    }

    /// Queries the reasoning service once, bounded by the reasoning deadline.
    async fn decide(&self, task: &Task) -> Result<Decision, AgentError> {
        let context = ReasoningContext {
            system_message: &self.config.system_message,
            task: &task.text,
            memory: self.memory.turns(),
            catalog: self.registry.catalog(),
            temperature: self.config.temperature,
        };

        let deadline = self.config.reasoning_timeout();
        let query = AssertUnwindSafe(self.reasoner.next_action(&context)).catch_unwind();

        match tokio::time::timeout(deadline, query).await {
            Err(_) => Err(AgentError::reasoning_timeout(deadline)),
            Ok(Err(_)) => Err(AgentError::reasoning_panicked()),
            Ok(Ok(result)) => result.map_err(AgentError::reasoning_failure),
        }
    }
}
