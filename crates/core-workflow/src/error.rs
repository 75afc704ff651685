// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("planner produced an unknown tool `{tool}` after {attempts} attempts")]
    UnknownToolInPlan { tool: String, attempts: u32 },

    #[error("planner call failed: {0}")]
    PlannerFailed(#[from] core_llm::LlmError),

    #[error("parameter generation for task `{task_id}` failed schema validation twice: {message}")]
    ParameterSchemaViolation { task_id: String, message: String },

    #[error("tool dispatch failed for task `{task_id}`: {source}")]
    ToolDispatchFailed {
        task_id: String,
        #[source]
        source: core_tools::ToolError,
    },

    #[error("workflow cancelled")]
    Cancelled,

    #[error("depth cap exceeded while spawning sub-agent for task `{task_id}`")]
    DepthCapExceeded { task_id: String },
}
