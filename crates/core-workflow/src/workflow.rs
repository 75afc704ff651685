// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use core_llm::{CompletionOptions, LlmGateway};
use core_tools::{ToolCall, ToolRegistry};

use crate::error::WorkflowError;
use crate::planner::{ComplexityAnalyzer, ComplexityDecision, ParameterGenerator, Planner};
use crate::task::{Task, TaskId, TaskStatus, WorkflowState, WorkflowStatus};

const DEFAULT_MAX_DEPTH: u32 = 4;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Shared, read-only dependencies every node needs; owned by the caller
/// that drives the engine (handed down from `core-bootstrap`'s wiring).
pub struct WorkflowContext<'a> {
    pub gateway: &'a LlmGateway,
    pub tools: &'a ToolRegistry,
    pub complexity_analyzer: &'a dyn ComplexityAnalyzer,
    pub planner_model: String,
    pub classifier_model: String,
    pub max_depth: u32,
    pub max_attempts: u32,
    pub cancel: &'a (dyn Fn() -> bool + Sync),
}

/// §4.7: nodes report an explicit outcome instead of raising, so the
/// driving loop stays a single flat `match` rather than a web of
/// exception handlers.
#[derive(Debug)]
pub enum NodeOutcome {
    Continue,
    NeedsReplan,
    NeedsDecomposition,
    Fatal(WorkflowError),
}

pub struct WorkflowEngine;

impl WorkflowEngine {
    /// The single loop dispatching to the right node based on
    /// `state.status` / `state.current_task_id`, checking `ctx.cancel`
    /// at each node boundary (§5 Cancellation & timeouts).
    pub async fn drive(state: &mut WorkflowState, ctx: &WorkflowContext<'_>) -> Result<(), WorkflowError> {
        // Tracks whether `initial_planner` has run for the current plan,
        // distinct from `state.tasks.is_empty()`: a planner that legitimately
        // returns zero tasks must not be re-invoked forever just because the
        // map stayed empty. Set back to `false` on `NeedsReplan`.
        let mut planned = !state.tasks.is_empty();

        loop {
            if (ctx.cancel)() {
                state.status = WorkflowStatus::Failed;
                state.failure_reason = Some("Cancelled".to_string());
                return Err(WorkflowError::Cancelled);
            }

            let outcome = if state.status == WorkflowStatus::Completed {
                finalizer(state, ctx).await
            } else if !planned {
                planned = true;
                initial_planner(state, ctx).await
            } else if state.current_task_id.is_none() {
                match task_planner(state) {
                    Some(_) => classifier(state, ctx).await,
                    None => goal_validator(state, ctx).await,
                }
            } else {
                classifier(state, ctx).await
            };

            match outcome {
                NodeOutcome::Continue => {
                    if state.status == WorkflowStatus::Completed && state.final_response.is_some() {
                        return Ok(());
                    }
                    if state.status == WorkflowStatus::Failed {
                        return Err(WorkflowError::Cancelled);
                    }
                }
                NodeOutcome::NeedsReplan => {
                    state.tasks.clear();
                    state.current_task_id = None;
                    state.replan_attempts += 1;
                    state.status = WorkflowStatus::Running;
                    planned = false;
                }
                NodeOutcome::NeedsDecomposition => {
                    // classifier already routed to spawn_subagent; looping
                    // re-enters at task_planner with the decomposition applied.
                }
                NodeOutcome::Fatal(err) => {
                    state.status = WorkflowStatus::Failed;
                    state.failure_reason = Some(err.to_string());
                    return Err(err);
                }
            }
        }
    }
}

/// precondition: status=running, tasks empty.
pub async fn initial_planner(state: &mut WorkflowState, ctx: &WorkflowContext<'_>) -> NodeOutcome {
    let catalog: Vec<String> = ctx.tools.list().into_iter().map(|d| d.name.clone()).collect();
    let planner = Planner::new(ctx.gateway, &ctx.planner_model);
    match planner.plan(&state.original_goal, &catalog).await {
        Ok(stubs) => {
            for (index, stub) in stubs.into_iter().enumerate() {
                let mut task = Task::new(
                    TaskId::root(index as u32 + 1),
                    stub.description,
                    stub.tool_name,
                );
                task.compound = stub.compound;
                state.insert_task(task);
            }
            NodeOutcome::Continue
        }
        Err(err) => NodeOutcome::Fatal(err),
    }
}

/// precondition: tasks non-empty, no current. Picks the highest-priority
/// ready task and sets `current_task_id`; returns `None` if nothing is
/// ready right now (caller routes to `goal_validator`).
pub fn task_planner(state: &mut WorkflowState) -> Option<TaskId> {
    let id = state.next_ready_task(Instant::now())?;
    state.current_task_id = Some(id.clone());
    if let Some(task) = state.tasks.get_mut(&id) {
        task.status = TaskStatus::InProgress;
    }
    Some(id)
}

/// precondition: current set. Routes to the executor or the spawner.
pub async fn classifier(state: &mut WorkflowState, ctx: &WorkflowContext<'_>) -> NodeOutcome {
    let Some(id) = state.current_task_id.clone() else {
        return NodeOutcome::Continue;
    };
    let needed_decomposition_before = state
        .tasks
        .get(&id)
        .map(|t| t.error.as_deref() == Some("NeedsDecomposition"))
        .unwrap_or(false);
    let decision = {
        let Some(task) = state.tasks.get(&id) else {
            return NodeOutcome::Continue;
        };
        ctx.complexity_analyzer.analyze(task, needed_decomposition_before)
    };

    match decision {
        ComplexityDecision::Execute => {
            let outcome = parameter_generator(state, ctx, &id).await;
            if !matches!(outcome, NodeOutcome::Continue) {
                return outcome;
            }
            let outcome = task_executor(state, ctx, &id).await;
            if matches!(outcome, NodeOutcome::Continue) {
                context_synthesizer(state, &id);
            }
            outcome
        }
        ComplexityDecision::Spawn => spawn_subagent(state, ctx, &id),
    }
}

/// precondition: routed to executor. On schema failure, routes to
/// `error_fallback` by reporting it on the task and returning Continue
/// (the next loop iteration's `classifier`/`task_executor` pair treats
/// an attempts-exhausted task via `error_fallback`).
async fn parameter_generator(state: &mut WorkflowState, ctx: &WorkflowContext<'_>, id: &TaskId) -> NodeOutcome {
    let scratchpad = state.scratchpad.clone();
    let goal = state.original_goal.clone();
    let Some(task) = state.tasks.get(id).cloned() else {
        return NodeOutcome::Continue;
    };
    let Some(descriptor) = ctx.tools.get(&task.tool_name) else {
        return error_fallback(state, ctx, id, "tool no longer registered".to_string());
    };

    let generator = ParameterGenerator::new(ctx.gateway, &ctx.planner_model);
    match generator.generate(&task, &descriptor.arg_schema, &scratchpad, &goal).await {
        Ok(params) => {
            if let Some(task) = state.tasks.get_mut(id) {
                task.params = Some(params);
            }
            NodeOutcome::Continue
        }
        Err(err) => error_fallback(state, ctx, id, err.to_string()),
    }
}

/// precondition: params set.
async fn task_executor(state: &mut WorkflowState, ctx: &WorkflowContext<'_>, id: &TaskId) -> NodeOutcome {
    let Some(task) = state.tasks.get(id).cloned() else {
        return NodeOutcome::Continue;
    };
    let args = task.params.clone().unwrap_or(serde_json::Value::Null);

    let call = ToolCall {
        id: Uuid::new_v4().to_string(),
        name: task.tool_name.clone(),
        args,
    };

    if let Some(task) = state.tasks.get_mut(id) {
        task.attempts += 1;
    }

    match ctx.tools.invoke(call).await {
        Ok(output) if !output.is_error => {
            if let Some(task) = state.tasks.get_mut(id) {
                task.status = TaskStatus::Succeeded;
                task.result = Some(output.content);
            }
            settle_ancestors(state, id);
            state.current_task_id = None;
            NodeOutcome::Continue
        }
        Ok(output) => error_fallback(state, ctx, id, output.content),
        Err(err) => error_fallback(state, ctx, id, err.to_string()),
    }
}

/// A task spawned via `spawn_subagent` leaves its parent `InProgress`
/// forever unless something walks back up once the child settles.
/// Called after `id` reaches `Succeeded` or exhausted-retry `Failed`:
/// promotes `id`'s parent to `Succeeded` once every one of its children
/// is settled (`WorkflowState::children_settled`), or to `Failed` if
/// `id` itself failed, then recurses upward for nested sub-agent chains.
fn settle_ancestors(state: &mut WorkflowState, id: &TaskId) {
    let Some(parent_id) = state.tasks.get(id).and_then(|t| t.parent_id.clone()) else {
        return;
    };
    let still_in_progress = matches!(
        state.tasks.get(&parent_id).map(|t| t.status),
        Some(TaskStatus::InProgress)
    );
    if !still_in_progress {
        return;
    }
    let child_failed = matches!(state.tasks.get(id).map(|t| t.status), Some(TaskStatus::Failed));

    if child_failed {
        if let Some(parent) = state.tasks.get_mut(&parent_id) {
            parent.status = TaskStatus::Failed;
            parent.error = Some(format!("sub-agent task {id} failed"));
        }
        settle_ancestors(state, &parent_id);
    } else if state.children_settled(&parent_id) {
        if let Some(parent) = state.tasks.get_mut(&parent_id) {
            parent.status = TaskStatus::Succeeded;
        }
        settle_ancestors(state, &parent_id);
    }
}

/// precondition: routed to spawn. Inserts a child sub-plan under `id`,
/// bounded by `ctx.max_depth`; past the cap, falls through to
/// `error_fallback` with the "retry" policy (§4.7 scheduling rule).
fn spawn_subagent(state: &mut WorkflowState, ctx: &WorkflowContext<'_>, id: &TaskId) -> NodeOutcome {
    let Some(task) = state.tasks.get(id).cloned() else {
        return NodeOutcome::Continue;
    };
    if task.depth + 1 > ctx.max_depth {
        return error_fallback(state, ctx, id, "depth cap exceeded".to_string());
    }

    let child_id = task.id.child(1);
    let mut child = Task::new(child_id.clone(), task.description.clone(), task.tool_name.clone());
    child.parent_id = Some(task.id.clone());
    state.insert_task(child);

    if let Some(task) = state.tasks.get_mut(id) {
        task.children_ids.push(child_id);
    }
    state.current_task_id = None;
    NodeOutcome::NeedsDecomposition
}

/// precondition: executor succeeded. Folds a short summary of the
/// result into the rolling scratchpad used by later parameter
/// generation.
fn context_synthesizer(state: &mut WorkflowState, id: &TaskId) {
    if let Some(task) = state.tasks.get(id) {
        if let Some(result) = &task.result {
            let summary: String = result.chars().take(400).collect();
            state.scratchpad.push_str(&format!("\n[{}] {}", task.id, summary));
        }
    }
}

/// precondition: no more pending tasks. Asks the LLM whether the
/// original goal is satisfied.
pub async fn goal_validator(state: &mut WorkflowState, ctx: &WorkflowContext<'_>) -> NodeOutcome {
    if !state.all_tasks_settled() {
        return NodeOutcome::Continue;
    }
    let prompt = format!(
        "Goal: {}\nResults so far: {}\nIs the goal satisfied? Respond with JSON {{\"satisfied\": bool}}.",
        state.original_goal, state.scratchpad
    );
    let opts = CompletionOptions::new(&ctx.classifier_model);
    match ctx.gateway.complete_json(prompt, &opts).await {
        Ok(value) => {
            let satisfied = value.get("satisfied").and_then(serde_json::Value::as_bool).unwrap_or(true);
            if satisfied {
                state.status = WorkflowStatus::Completed;
            } else {
                return NodeOutcome::NeedsReplan;
            }
            NodeOutcome::Continue
        }
        Err(err) => NodeOutcome::Fatal(WorkflowError::PlannerFailed(err)),
    }
}

/// precondition: `current.attempts >= max_attempts`, or an earlier node
/// reported a non-retryable problem for the current task. Policy: retry
/// with backoff, else mark failed and escalate to the parent.
fn error_fallback(state: &mut WorkflowState, ctx: &WorkflowContext<'_>, id: &TaskId, message: String) -> NodeOutcome {
    let exhausted = state
        .tasks
        .get(id)
        .map(|t| t.attempts >= ctx.max_attempts)
        .unwrap_or(true);

    if let Some(task) = state.tasks.get_mut(id) {
        task.error = Some(message);
        if exhausted {
            task.status = TaskStatus::Failed;
        } else {
            task.status = TaskStatus::Pending;
            task.next_attempt_at = Some(Instant::now() + RETRY_BACKOFF);
        }
    }
    if exhausted {
        settle_ancestors(state, id);
    }
    state.current_task_id = None;
    NodeOutcome::Continue
}

/// precondition: status=Completed.
async fn finalizer(state: &mut WorkflowState, ctx: &WorkflowContext<'_>) -> NodeOutcome {
    if state.final_response.is_some() {
        return NodeOutcome::Continue;
    }
    let prompt = format!(
        "Original goal: {}\nGathered results: {}\nWrite the final answer for the user.",
        state.original_goal, state.scratchpad
    );
    let opts = CompletionOptions::new(&ctx.classifier_model);
    match ctx.gateway.complete(prompt, &opts).await {
        Ok(text) => {
            state.final_response = Some(text);
            NodeOutcome::Continue
        }
        Err(err) => NodeOutcome::Fatal(WorkflowError::PlannerFailed(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::DefaultComplexityAnalyzer;
    use core_llm::MockProvider;
    use core_tools::builtin::ReadFileTool;

    fn cancel_false() -> bool {
        false
    }

    fn test_registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new(Duration::from_secs(5));
        registry.register(Arc::new(ReadFileTool)).unwrap();
        registry.freeze();
        registry
    }

    #[tokio::test]
    async fn drive_completes_with_a_scripted_plan_and_finalizer() {
        let cloud = MockProvider::new("mock", r#"{"tasks":[]}"#);
        let local = MockProvider::new("mock", "final answer");
        let gateway = LlmGateway::from_providers(Box::new(cloud), Box::new(local), 30);
        let registry = test_registry();
        let analyzer = DefaultComplexityAnalyzer::default();
        let ctx = WorkflowContext {
            gateway: &gateway,
            tools: &registry,
            complexity_analyzer: &analyzer,
            planner_model: "gpt".to_string(),
            classifier_model: "gpt".to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            cancel: &cancel_false,
        };
        let mut state = WorkflowState::new("say hi", "assistant");

        let result = WorkflowEngine::drive(&mut state, &ctx).await;
        assert!(result.is_ok());
        assert_eq!(state.status, WorkflowStatus::Completed);
    }

    #[test]
    fn task_planner_picks_lowest_ready_id() {
        let mut state = WorkflowState::new("goal", "assistant");
        state.insert_task(Task::new(TaskId::from("2"), "b", "noop"));
        state.insert_task(Task::new(TaskId::from("1"), "a", "noop"));
        let picked = task_planner(&mut state);
        assert_eq!(picked, Some(TaskId::from("1")));
        assert_eq!(state.tasks[&TaskId::from("1")].status, TaskStatus::InProgress);
    }

    #[test]
    fn error_fallback_retries_then_fails_after_max_attempts() {
        let mut state = WorkflowState::new("goal", "assistant");
        let mut task = Task::new(TaskId::from("1"), "t", "tool");
        task.attempts = 1;
        state.insert_task(task);
        state.current_task_id = Some(TaskId::from("1"));

        let analyzer = DefaultComplexityAnalyzer::default();
        let cloud = MockProvider::new("mock", "{}");
        let local = MockProvider::new("mock", "{}");
        let gateway = LlmGateway::from_providers(Box::new(cloud), Box::new(local), 30);
        let registry = test_registry();
        let ctx = WorkflowContext {
            gateway: &gateway,
            tools: &registry,
            complexity_analyzer: &analyzer,
            planner_model: "gpt".to_string(),
            classifier_model: "gpt".to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_attempts: 2,
            cancel: &cancel_false,
        };

        error_fallback(&mut state, &ctx, &TaskId::from("1"), "boom".to_string());
        assert_eq!(state.tasks[&TaskId::from("1")].status, TaskStatus::Pending);

        state.tasks.get_mut(&TaskId::from("1")).unwrap().attempts = 2;
        error_fallback(&mut state, &ctx, &TaskId::from("1"), "boom again".to_string());
        assert_eq!(state.tasks[&TaskId::from("1")].status, TaskStatus::Failed);
    }

    #[test]
    fn spawn_subagent_rejects_past_depth_cap() {
        let mut state = WorkflowState::new("goal", "assistant");
        let mut task = Task::new(TaskId::from("1"), "t", "tool");
        task.depth = 4;
        state.insert_task(task);
        state.current_task_id = Some(TaskId::from("1"));

        let analyzer = DefaultComplexityAnalyzer::default();
        let cloud = MockProvider::new("mock", "{}");
        let local = MockProvider::new("mock", "{}");
        let gateway = LlmGateway::from_providers(Box::new(cloud), Box::new(local), 30);
        let registry = test_registry();
        let ctx = WorkflowContext {
            gateway: &gateway,
            tools: &registry,
            complexity_analyzer: &analyzer,
            planner_model: "gpt".to_string(),
            classifier_model: "gpt".to_string(),
            max_depth: 4,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            cancel: &cancel_false,
        };

        let outcome = spawn_subagent(&mut state, &ctx, &TaskId::from("1"));
        assert!(matches!(outcome, NodeOutcome::Continue));
        assert_eq!(state.tasks[&TaskId::from("1")].status, TaskStatus::Failed);
    }

    #[test]
    fn settling_a_child_promotes_its_stuck_in_progress_parent() {
        let mut state = WorkflowState::new("goal", "assistant");
        let parent_id = TaskId::from("1");
        let mut parent = Task::new(parent_id.clone(), "parent", "noop");
        parent.status = TaskStatus::InProgress;
        let child_id = parent_id.child(1);
        parent.children_ids.push(child_id.clone());
        state.insert_task(parent);

        let mut child = Task::new(child_id.clone(), "child", "noop");
        child.parent_id = Some(parent_id.clone());
        child.status = TaskStatus::Succeeded;
        state.insert_task(child);

        assert!(!state.all_tasks_settled());
        settle_ancestors(&mut state, &child_id);
        assert_eq!(state.tasks[&parent_id].status, TaskStatus::Succeeded);
        assert!(state.all_tasks_settled());
    }

    #[test]
    fn settling_a_failed_child_fails_its_stuck_in_progress_parent() {
        let mut state = WorkflowState::new("goal", "assistant");
        let parent_id = TaskId::from("1");
        let mut parent = Task::new(parent_id.clone(), "parent", "noop");
        parent.status = TaskStatus::InProgress;
        let child_id = parent_id.child(1);
        parent.children_ids.push(child_id.clone());
        state.insert_task(parent);

        let mut child = Task::new(child_id.clone(), "child", "noop");
        child.parent_id = Some(parent_id.clone());
        child.status = TaskStatus::Failed;
        state.insert_task(child);

        settle_ancestors(&mut state, &child_id);
        assert_eq!(state.tasks[&parent_id].status, TaskStatus::Failed);
        assert!(state.all_tasks_settled());
    }
}
