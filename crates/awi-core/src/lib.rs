pub mod record;
pub mod status;
pub mod value;

pub use record::TaskRecord;
pub use status::{
    AgentStatus, LogBucket, RecordStatus, RunStatus, StepStatus, TaskStatus, TodoStatus,
    WorkLogKind, WorkLogStatus,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use value::{coerce_f64, coerce_str, coerce_timestamp};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Main,
    Sub,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Agent {
    pub agent_id: String,
    pub agent_name: String,
    pub kind: AgentKind,
    pub status: AgentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_run_id: Option<String>,
    pub last_active_at: DateTime<Utc>,
}

impl Agent {
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let agent_id = object
            .get("agent_id")
            .or_else(|| object.get("id"))
            .and_then(coerce_str)?;
        let parent_agent_id = object.get("parent_agent_id").and_then(coerce_str);
        Some(Self {
            agent_name: object
                .get("agent_name")
                .or_else(|| object.get("name"))
                .and_then(coerce_str)
                .unwrap_or_else(|| agent_id.clone()),
            kind: if parent_agent_id.is_some() {
                AgentKind::Sub
            } else {
                AgentKind::Main
            },
            status: object
                .get("status")
                .and_then(coerce_str)
                .map(|s| AgentStatus::parse(&s))
                .unwrap_or(AgentStatus::Idle),
            parent_agent_id,
            current_run_id: object.get("current_run_id").and_then(coerce_str),
            last_active_at: object
                .get("last_active_at")
                .or_else(|| object.get("updated_at"))
                .and_then(coerce_timestamp)
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            agent_id,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentSession {
    pub session_id: String,
    pub owner_agent: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl AgentSession {
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let session_id = object
            .get("session_id")
            .or_else(|| object.get("id"))
            .and_then(coerce_str)?;
        let created_at = object
            .get("created_at")
            .and_then(coerce_timestamp)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let updated_at = object
            .get("updated_at")
            .and_then(coerce_timestamp)
            .unwrap_or(created_at);
        Some(Self {
            session_id,
            owner_agent: object
                .get("owner_agent")
                .or_else(|| object.get("agent_id"))
                .and_then(coerce_str)
                .unwrap_or_default(),
            title: object.get("title").and_then(coerce_str).unwrap_or_default(),
            summary: object.get("summary").and_then(coerce_str),
            status: object
                .get("status")
                .and_then(coerce_str)
                .unwrap_or_else(|| "active".to_string()),
            created_at,
            updated_at,
            last_activity_at: object
                .get("last_activity_at")
                .and_then(coerce_timestamp)
                .unwrap_or(updated_at),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSummary {
    pub step_count: usize,
    pub task_count: usize,
    pub log_count: usize,
    pub todo_count: usize,
    pub sub_agent_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Run {
    pub run_id: String,
    pub agent_id: String,
    pub trigger_event: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<i64>,
    pub current_step_index: usize,
    pub summary: RunSummary,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepLogCounts {
    pub message: usize,
    pub function_call: usize,
    pub action: usize,
    pub sub_agent: usize,
}

impl StepLogCounts {
    pub fn bump(&mut self, bucket: LogBucket) {
        match bucket {
            LogBucket::Message => self.message += 1,
            LogBucket::FunctionCall => self.function_call += 1,
            LogBucket::Action => self.action += 1,
            LogBucket::SubAgent => self.sub_agent += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.message + self.function_call + self.action + self.sub_agent
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Step {
    pub step_id: String,
    pub step_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub status: StepStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<i64>,
    pub task_count: usize,
    pub log_counts: StepLogCounts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_snapshot: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub task_id: String,
    pub step_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<String>,
    pub status: TaskStatus,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_out: Option<i64>,
    pub prompt_preview: String,
    pub result_preview: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkLogEntry {
    pub log_id: String,
    pub kind: WorkLogKind,
    pub agent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    pub status: WorkLogStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl WorkLogEntry {
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let log_id = object
            .get("log_id")
            .or_else(|| object.get("id"))
            .and_then(coerce_str)?;
        let kind = object
            .get("type")
            .or_else(|| object.get("kind"))
            .and_then(coerce_str)
            .and_then(|s| WorkLogKind::parse(&s))?;
        Some(Self {
            log_id,
            kind,
            agent_id: object
                .get("agent_id")
                .and_then(coerce_str)
                .unwrap_or_default(),
            related_agent_id: object.get("related_agent_id").and_then(coerce_str),
            step_id: object.get("step_id").and_then(coerce_str),
            status: object
                .get("status")
                .and_then(coerce_str)
                .map(|s| WorkLogStatus::parse(&s))
                .unwrap_or(WorkLogStatus::Info),
            timestamp: object
                .get("timestamp")
                .or_else(|| object.get("ts"))
                .and_then(coerce_timestamp)?,
            duration_secs: object
                .get("duration")
                .or_else(|| object.get("duration_secs"))
                .and_then(coerce_f64),
            summary: object
                .get("summary")
                .and_then(coerce_str)
                .unwrap_or_default(),
            payload: object.get("payload").cloned(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub todo_id: String,
    pub agent_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TodoStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_in_step_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_in_step_id: Option<String>,
}

impl Todo {
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let todo_id = object
            .get("todo_id")
            .or_else(|| object.get("id"))
            .and_then(coerce_str)?;
        Some(Self {
            todo_id,
            agent_id: object
                .get("agent_id")
                .and_then(coerce_str)
                .unwrap_or_default(),
            title: object.get("title").and_then(coerce_str)?,
            description: object.get("description").and_then(coerce_str),
            status: object
                .get("status")
                .and_then(coerce_str)
                .map(|s| TodoStatus::parse(&s))
                .unwrap_or(TodoStatus::Open),
            created_at: object
                .get("created_at")
                .and_then(coerce_timestamp)
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            completed_at: object.get("completed_at").and_then(coerce_timestamp),
            created_in_step_id: object.get("created_in_step_id").and_then(coerce_str),
            completed_in_step_id: object.get("completed_in_step_id").and_then(coerce_str),
        })
    }
}
