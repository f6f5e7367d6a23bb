//! Goal decomposition - turns goal text into unscheduled task drafts.
//!
//! The LLM is asked for a JSON object `{tasks: [...], reasoning}`. Models
//! often wrap that object in Markdown fences or a sentence of prose, so the
//! payload is cut down to the outermost `{...}` before parsing. Individual
//! fields are normalized leniently; only a missing task list or an untitled
//! task is a format error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::llm::{ChatMessage, ChatOptions, LlmClient, LlmError};
use crate::task::{Priority, TaskDraft};
use crate::util::truncate_chars;

const DEFAULT_REASONING: &str = "Task breakdown generated based on goal analysis";

const SYSTEM_PROMPT: &str = "You are an expert project planner that breaks down goals into actionable tasks. Always respond with valid JSON only.";

/// Result of decomposing one goal.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    pub tasks: Vec<TaskDraft>,
    pub reasoning: String,
}

#[derive(Debug, Error)]
pub enum DecomposeError {
    #[error(transparent)]
    Provider(#[from] LlmError),

    #[error("Provider returned an unusable task breakdown: {0}")]
    Format(String),
}

/// Anything that can break a goal into tasks.
#[async_trait]
pub trait Decomposer: Send + Sync {
    /// Human-readable provider description for logs and health output.
    fn describe(&self) -> String;

    async fn decompose(&self, goal_text: &str) -> Result<Decomposition, DecomposeError>;
}

/// Decomposer backed by a chat-completion model.
pub struct LlmDecomposer {
    client: Arc<dyn LlmClient>,
    model: String,
    timeout: Duration,
    description: String,
}

impl LlmDecomposer {
    pub fn new(
        client: Arc<dyn LlmClient>,
        model: impl Into<String>,
        timeout: Duration,
        description: impl Into<String>,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            timeout,
            description: description.into(),
        }
    }
}

#[async_trait]
impl Decomposer for LlmDecomposer {
    fn describe(&self) -> String {
        self.description.clone()
    }

    async fn decompose(&self, goal_text: &str) -> Result<Decomposition, DecomposeError> {
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_prompt(goal_text)),
        ];
        let options = ChatOptions {
            temperature: Some(0.7),
            max_tokens: Some(2000),
        };

        tracing::info!(model = %self.model, "Requesting task breakdown");
        let response = tokio::time::timeout(
            self.timeout,
            self.client.chat_completion(&self.model, &messages, options),
        )
        .await
        .map_err(|_| LlmError::timeout(self.timeout))??;

        let content = response
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| DecomposeError::Format("empty response".to_string()))?;

        let decomposition = parse_decomposition(&content)?;
        tracing::info!(
            tasks = decomposition.tasks.len(),
            finish_reason = response.finish_reason.as_deref().unwrap_or("unknown"),
            "Received task breakdown"
        );
        Ok(decomposition)
    }
}

/// Prompt asking for the `{tasks, reasoning}` JSON shape.
pub fn build_prompt(goal_text: &str) -> String {
    format!(
        r#"You are a professional project planner. Break down the following goal into actionable tasks with suggested deadlines and dependencies.

Goal: "{goal_text}"

Please provide a detailed task breakdown in JSON format with the following structure:
{{
  "tasks": [
    {{
      "title": "Task name",
      "description": "Detailed description of what needs to be done",
      "estimated_days": number of days needed,
      "priority": "low" | "medium" | "high",
      "dependencies": [array of task titles this task depends on, empty array if none],
      "task_order": order number (1, 2, 3, etc.)
    }}
  ],
  "reasoning": "Brief explanation of the breakdown strategy and timeline logic"
}}

Important guidelines:
- Break down the goal into specific, actionable tasks
- Give every task a unique title; dependencies must use those exact titles
- Consider realistic timelines based on the goal complexity
- Identify dependencies between tasks (which tasks must be completed before others)
- Never create circular dependencies
- Prioritize tasks appropriately
- Return ONLY valid JSON, no additional text or markdown formatting"#
    )
}

/// Remove Markdown code fences and surrounding prose.
pub fn strip_formatting(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the info string ("json", "JSON", ...); it may run straight into the body.
        text = rest
            .trim_start_matches(|c: char| c.is_ascii_alphanumeric())
            .trim();
        text = text.strip_suffix("```").unwrap_or(text).trim();
    }
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

#[derive(Debug, Deserialize)]
struct RawDecomposition {
    tasks: Option<Vec<RawTask>>,
    #[serde(default)]
    reasoning: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawTask {
    #[serde(default)]
    title: Option<Value>,
    #[serde(default)]
    description: Option<Value>,
    #[serde(default)]
    estimated_days: Option<Value>,
    #[serde(default)]
    priority: Option<Value>,
    #[serde(default)]
    dependencies: Option<Value>,
    #[serde(default)]
    task_order: Option<Value>,
}

fn as_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn normalize_days(value: Option<&Value>) -> i64 {
    match as_number(value) {
        Some(days) if days.is_finite() && days >= 1.0 => days.ceil().min(i64::MAX as f64) as i64,
        _ => 1,
    }
}

fn normalize_dependencies(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| as_text(Some(item)))
            .filter(|title| !title.is_empty())
            .collect(),
        Some(Value::String(single)) if !single.trim().is_empty() => vec![single.trim().to_string()],
        _ => Vec::new(),
    }
}

/// Parse provider output into a decomposition.
pub fn parse_decomposition(raw: &str) -> Result<Decomposition, DecomposeError> {
    let payload = strip_formatting(raw);
    let parsed: RawDecomposition = serde_json::from_str(payload).map_err(|e| {
        DecomposeError::Format(format!(
            "{} (payload starts with: {:?})",
            e,
            truncate_chars(payload, 120)
        ))
    })?;

    let raw_tasks = parsed
        .tasks
        .filter(|tasks| !tasks.is_empty())
        .ok_or_else(|| DecomposeError::Format("no tasks in response".to_string()))?;

    let mut tasks = Vec::with_capacity(raw_tasks.len());
    for (position, raw_task) in raw_tasks.into_iter().enumerate() {
        let title = as_text(raw_task.title.as_ref())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| DecomposeError::Format(format!("task #{} has no title", position + 1)))?;

        let task_order = as_number(raw_task.task_order.as_ref())
            .filter(|n| n.is_finite())
            .map(|n| n as i64)
            .unwrap_or(0);

        tasks.push(TaskDraft {
            title,
            description: as_text(raw_task.description.as_ref()).unwrap_or_default(),
            estimated_days: normalize_days(raw_task.estimated_days.as_ref()),
            priority: as_text(raw_task.priority.as_ref())
                .map(|p| Priority::from_str_lossy(&p))
                .unwrap_or_default(),
            dependencies: normalize_dependencies(raw_task.dependencies.as_ref()),
            task_order,
        });
    }

    let reasoning = as_text(parsed.reasoning.as_ref())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| DEFAULT_REASONING.to_string());

    Ok(Decomposition { tasks, reasoning })
}
