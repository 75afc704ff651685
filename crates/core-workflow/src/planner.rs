// SPDX-License-Identifier: Apache-2.0
use serde::Deserialize;
use serde_json::{json, Value};

use core_llm::{CompletionOptions, LlmGateway};
use core_tools::ArgSchema;

use crate::error::WorkflowError;
use crate::task::Task;

const MAX_PLAN_ATTEMPTS: u32 = 3;
const COMPOUND_DESCRIPTION_LEN: usize = 240;

/// §4.6 Planner output element, before it becomes a [`Task`].
#[derive(Debug, Clone, Deserialize)]
pub struct TaskStub {
    pub description: String,
    pub tool_name: String,
    #[serde(default)]
    pub estimated_depth: u32,
    #[serde(default)]
    pub compound: bool,
}

#[derive(Debug, Deserialize)]
struct PlanResponse {
    tasks: Vec<TaskStub>,
}

fn plan_schema_hint() -> Value {
    json!({
        "type": "object",
        "properties": {
            "tasks": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "description": { "type": "string" },
                        "tool_name": { "type": "string" },
                        "estimated_depth": { "type": "integer" },
                        "compound": { "type": "boolean" }
                    },
                    "required": ["description", "tool_name"]
                }
            }
        },
        "required": ["tasks"]
    })
}

/// Calls `complete_json` with the planning prompt, re-invoking with an
/// error hint (up to [`MAX_PLAN_ATTEMPTS`]) whenever a returned
/// `tool_name` doesn't exist in `tool_catalog` (§4.6).
pub struct Planner<'a> {
    gateway: &'a LlmGateway,
    model: String,
}

impl<'a> Planner<'a> {
    pub fn new(gateway: &'a LlmGateway, model: impl Into<String>) -> Self {
        Self {
            gateway,
            model: model.into(),
        }
    }

    pub async fn plan(&self, goal: &str, tool_catalog: &[String]) -> Result<Vec<TaskStub>, WorkflowError> {
        let mut hint = String::new();
        for attempt in 1..=MAX_PLAN_ATTEMPTS {
            let prompt = format!(
                "Goal: {goal}\nAvailable tools: {}\nSchema: {}\n{hint}\nRespond with JSON matching the schema.",
                tool_catalog.join(", "),
                plan_schema_hint(),
            );
            let opts = CompletionOptions::new(&self.model);
            let value = self.gateway.complete_json(prompt, &opts).await?;
            let parsed: PlanResponse = serde_json::from_value(value).map_err(|e| {
                WorkflowError::ParameterSchemaViolation {
                    task_id: "<plan>".to_string(),
                    message: e.to_string(),
                }
            })?;

            match parsed.tasks.iter().find(|stub| !tool_catalog.contains(&stub.tool_name)) {
                Some(bad) => {
                    hint = format!(
                        "Your previous plan referenced unknown tool `{}`. Only use tools from the available list.",
                        bad.tool_name
                    );
                    if attempt == MAX_PLAN_ATTEMPTS {
                        return Err(WorkflowError::UnknownToolInPlan {
                            tool: bad.tool_name.clone(),
                            attempts: attempt,
                        });
                    }
                }
                None => return Ok(parsed.tasks),
            }
        }
        unreachable!("loop always returns by the final attempt")
    }
}

/// §4.6: invoked just-in-time, immediately before a task executes.
pub struct ParameterGenerator<'a> {
    gateway: &'a LlmGateway,
    model: String,
}

impl<'a> ParameterGenerator<'a> {
    pub fn new(gateway: &'a LlmGateway, model: impl Into<String>) -> Self {
        Self {
            gateway,
            model: model.into(),
        }
    }

    pub async fn generate(
        &self,
        task: &Task,
        arg_schema: &ArgSchema,
        scratchpad: &str,
        goal: &str,
    ) -> Result<Value, WorkflowError> {
        let opts = CompletionOptions::new(&self.model);
        let base_prompt = format!(
            "Original goal: {goal}\nTask: {}\nArgument schema: {:?}\nContext so far: {scratchpad}\nRespond with a JSON object of arguments only.",
            task.description, arg_schema
        );

        let first = self.gateway.complete_json(base_prompt.clone(), &opts).await?;
        if arg_schema_is_satisfied(arg_schema, &first) {
            return Ok(first);
        }

        let repair_prompt = format!(
            "{base_prompt}\nYour previous answer did not satisfy the schema: {first}. Correct it and respond with JSON only."
        );
        let repaired = self.gateway.complete_json(repair_prompt, &opts).await?;
        if arg_schema_is_satisfied(arg_schema, &repaired) {
            Ok(repaired)
        } else {
            Err(WorkflowError::ParameterSchemaViolation {
                task_id: task.id.to_string(),
                message: "schema violation persisted after one repair retry".to_string(),
            })
        }
    }
}

fn arg_schema_is_satisfied(schema: &ArgSchema, value: &Value) -> bool {
    matches!(core_tools::validate(schema, value), core_tools::Either::Left(_))
}

/// §4.6: `{execute | spawn}` decision, a pure function of the task so it
/// can be swapped for an alternate policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplexityDecision {
    Execute,
    Spawn,
}

pub trait ComplexityAnalyzer: Send + Sync {
    fn analyze(&self, task: &Task, previously_needed_decomposition: bool) -> ComplexityDecision;
}

pub struct DefaultComplexityAnalyzer {
    pub description_len_threshold: usize,
}

impl Default for DefaultComplexityAnalyzer {
    fn default() -> Self {
        Self {
            description_len_threshold: COMPOUND_DESCRIPTION_LEN,
        }
    }
}

impl ComplexityAnalyzer for DefaultComplexityAnalyzer {
    fn analyze(&self, task: &Task, previously_needed_decomposition: bool) -> ComplexityDecision {
        if task.compound
            || task.description.len() > self.description_len_threshold
            || previously_needed_decomposition
        {
            ComplexityDecision::Spawn
        } else {
            ComplexityDecision::Execute
        }
    }
}
