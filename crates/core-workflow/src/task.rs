// SPDX-License-Identifier: Apache-2.0
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use serde_json::Value;

/// A hierarchical path such as `"1.2.3"`, compared segment-wise and
/// numerically so `"2" < "10" < "10.1"` (§4.7 scheduling rule: lexical
/// string comparison would wrongly sort `"10"` before `"2"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(String);

impl TaskId {
    pub fn root(segment: u32) -> Self {
        Self(segment.to_string())
    }

    pub fn child(&self, segment: u32) -> Self {
        Self(format!("{}.{}", self.0, segment))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn depth(&self) -> u32 {
        self.0.matches('.').count() as u32
    }

    pub fn parent(&self) -> Option<TaskId> {
        self.0.rsplit_once('.').map(|(parent, _)| TaskId(parent.to_string()))
    }

    fn segments(&self) -> Vec<u64> {
        self.0.split('.').filter_map(|segment| segment.parse().ok()).collect()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        TaskId(value.to_string())
    }
}

impl PartialOrd for TaskId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TaskId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments().cmp(&other.segments())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Succeeded,
    Failed,
    Superseded,
}

/// §3 `Task`. `next_attempt_at` uses `Instant` rather than a wall-clock
/// timestamp since it only ever feeds a monotonic "is the cooldown over"
/// comparison within the same process run.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub parent_id: Option<TaskId>,
    pub depth: u32,
    pub description: String,
    pub tool_name: String,
    pub params: Option<Value>,
    pub status: TaskStatus,
    pub result: Option<String>,
    pub error: Option<String>,
    pub attempts: u32,
    pub next_attempt_at: Option<Instant>,
    pub children_ids: Vec<TaskId>,
    pub compound: bool,
}

impl Task {
    pub fn new(id: TaskId, description: impl Into<String>, tool_name: impl Into<String>) -> Self {
        let depth = id.depth();
        Self {
            id,
            parent_id: None,
            depth,
            description: description.into(),
            tool_name: tool_name.into(),
            params: None,
            status: TaskStatus::Pending,
            result: None,
            error: None,
            attempts: 0,
            next_attempt_at: None,
            children_ids: Vec::new(),
            compound: false,
        }
    }

    pub fn is_ready(&self, now: Instant) -> bool {
        self.status == TaskStatus::Pending && self.next_attempt_at.map_or(true, |at| at <= now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStatus {
    Running,
    NeedsReplan,
    Completed,
    Failed,
}

/// §3 `WorkflowState`: lives for one `/agent` invocation.
///
/// Traversal order is never stored independently of `tasks`: `BTreeMap`
/// already keys on `TaskId`'s segment-wise `Ord`, so iterating `tasks`
/// yields tasks in the correct numeric order with no separate list to
/// keep in sync.
#[derive(Debug, Clone)]
pub struct WorkflowState {
    pub original_goal: String,
    pub tasks: BTreeMap<TaskId, Task>,
    pub current_task_id: Option<TaskId>,
    pub status: WorkflowStatus,
    pub persona: String,
    pub final_response: Option<String>,
    pub scratchpad: String,
    pub replan_attempts: u32,
    pub failure_reason: Option<String>,
}

impl WorkflowState {
    pub fn new(original_goal: impl Into<String>, persona: impl Into<String>) -> Self {
        Self {
            original_goal: original_goal.into(),
            tasks: BTreeMap::new(),
            current_task_id: None,
            status: WorkflowStatus::Running,
            persona: persona.into(),
            final_response: None,
            scratchpad: String::new(),
            replan_attempts: 0,
            failure_reason: None,
        }
    }

    pub fn insert_task(&mut self, task: Task) {
        self.tasks.insert(task.id.clone(), task);
    }

    /// A parent may only become `Succeeded` once every child is
    /// `Succeeded` or `Superseded` (§3 invariant).
    pub fn children_settled(&self, id: &TaskId) -> bool {
        let Some(task) = self.tasks.get(id) else {
            return true;
        };
        task.children_ids.iter().all(|child_id| {
            self.tasks
                .get(child_id)
                .map(|child| matches!(child.status, TaskStatus::Succeeded | TaskStatus::Superseded))
                .unwrap_or(true)
        })
    }

    /// Lowest-`TaskId` pending task whose cooldown has elapsed (§4.7
    /// task-id ordering rule). `tasks` iterates in `TaskId` order
    /// already, so the first ready entry found is the answer.
    pub fn next_ready_task(&self, now: Instant) -> Option<TaskId> {
        self.tasks
            .iter()
            .find(|(_, task)| task.is_ready(now))
            .map(|(id, _)| id.clone())
    }

    pub fn all_tasks_settled(&self) -> bool {
        self.tasks
            .values()
            .all(|task| matches!(task.status, TaskStatus::Succeeded | TaskStatus::Superseded | TaskStatus::Failed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_orders_numerically_not_lexically() {
        let mut ids = vec![TaskId::from("10"), TaskId::from("2"), TaskId::from("1")];
        ids.sort();
        assert_eq!(ids, vec![TaskId::from("1"), TaskId::from("2"), TaskId::from("10")]);
    }

    #[test]
    fn task_id_orders_nested_segments() {
        let mut ids = vec![TaskId::from("10.1"), TaskId::from("2.9"), TaskId::from("2.10")];
        ids.sort();
        assert_eq!(
            ids,
            vec![TaskId::from("2.9"), TaskId::from("2.10"), TaskId::from("10.1")]
        );
    }

    #[test]
    fn task_id_depth_counts_dots() {
        assert_eq!(TaskId::from("1").depth(), 0);
        assert_eq!(TaskId::from("1.2.3").depth(), 2);
    }

    #[test]
    fn child_id_appends_segment() {
        let parent = TaskId::from("1.2");
        assert_eq!(parent.child(3).as_str(), "1.2.3");
    }

    #[test]
    fn parent_not_succeeded_until_children_settled() {
        let mut state = WorkflowState::new("goal", "assistant");
        let mut parent = Task::new(TaskId::from("1"), "parent", "noop");
        parent.children_ids = vec![TaskId::from("1.1")];
        state.insert_task(parent);
        let mut child = Task::new(TaskId::from("1.1"), "child", "noop");
        child.parent_id = Some(TaskId::from("1"));
        state.insert_task(child);

        assert!(!state.children_settled(&TaskId::from("1")));

        state.tasks.get_mut(&TaskId::from("1.1")).unwrap().status = TaskStatus::Succeeded;
        assert!(state.children_settled(&TaskId::from("1")));
    }

    #[test]
    fn next_ready_task_skips_cooldown_and_picks_lowest_id() {
        let now = Instant::now();
        let mut state = WorkflowState::new("goal", "assistant");
        let mut cooling = Task::new(TaskId::from("1"), "cooling", "noop");
        cooling.next_attempt_at = Some(now + std::time::Duration::from_secs(60));
        state.insert_task(cooling);
        state.insert_task(Task::new(TaskId::from("2"), "ready", "noop"));

        assert_eq!(state.next_ready_task(now), Some(TaskId::from("2")));
    }
}
