use serde::{Deserialize, Serialize};
use std::fmt;

/// Status vocabulary of the upstream task-execution service. Anything the
/// service invents beyond the known states folds into `Queued`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RecordStatus {
    pub fn parse(input: &str) -> Self {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "running" | "in-progress" | "in_progress" => Self::Running,
            "completed" | "done" | "success" => Self::Completed,
            "failed" | "error" => Self::Failed,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Queued,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Success,
    Failed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Running,
    Success,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Running,
    Sleeping,
    Error,
    Offline,
}

impl AgentStatus {
    pub fn parse(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "running" | "active" => Self::Running,
            "sleeping" | "asleep" => Self::Sleeping,
            "error" => Self::Error,
            "offline" | "disabled" => Self::Offline,
            _ => Self::Idle,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkLogStatus {
    Info,
    Success,
    Failed,
    Partial,
}

impl WorkLogStatus {
    pub fn parse(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "success" | "ok" => Self::Success,
            "failed" | "error" => Self::Failed,
            "partial" => Self::Partial,
            _ => Self::Info,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Partial => "partial",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkLogKind {
    MessageSent,
    MessageReply,
    FunctionCall,
    Action,
    SubAgentCreated,
    SubAgentSleep,
    SubAgentWake,
    SubAgentDestroyed,
}

impl WorkLogKind {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "message_sent" => Some(Self::MessageSent),
            "message_reply" => Some(Self::MessageReply),
            "function_call" => Some(Self::FunctionCall),
            "action" => Some(Self::Action),
            "sub_agent_created" => Some(Self::SubAgentCreated),
            "sub_agent_sleep" => Some(Self::SubAgentSleep),
            "sub_agent_wake" => Some(Self::SubAgentWake),
            "sub_agent_destroyed" => Some(Self::SubAgentDestroyed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MessageSent => "message_sent",
            Self::MessageReply => "message_reply",
            Self::FunctionCall => "function_call",
            Self::Action => "action",
            Self::SubAgentCreated => "sub_agent_created",
            Self::SubAgentSleep => "sub_agent_sleep",
            Self::SubAgentWake => "sub_agent_wake",
            Self::SubAgentDestroyed => "sub_agent_destroyed",
        }
    }

    /// Which of the four per-step counters this kind contributes to.
    pub fn count_bucket(self) -> LogBucket {
        match self {
            Self::MessageSent | Self::MessageReply => LogBucket::Message,
            Self::FunctionCall => LogBucket::FunctionCall,
            Self::Action => LogBucket::Action,
            Self::SubAgentCreated
            | Self::SubAgentSleep
            | Self::SubAgentWake
            | Self::SubAgentDestroyed => LogBucket::SubAgent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogBucket {
    Message,
    FunctionCall,
    Action,
    SubAgent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Open,
    Done,
}

impl TodoStatus {
    pub fn parse(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "done" | "completed" | "closed" => Self::Done,
            _ => Self::Open,
        }
    }
}

/// Dashboard task status for one upstream record.
pub fn task_status_for(record: RecordStatus) -> TaskStatus {
    match record {
        RecordStatus::Queued => TaskStatus::Queued,
        RecordStatus::Running => TaskStatus::Running,
        RecordStatus::Completed => TaskStatus::Success,
        RecordStatus::Failed | RecordStatus::Cancelled => TaskStatus::Failed,
    }
}

/// Step status taken from a behavior-anchor record attributed to the step.
/// A queued anchor still counts as running: the loop has announced the step.
pub fn step_status_for_anchor(record: RecordStatus) -> StepStatus {
    match record {
        RecordStatus::Queued | RecordStatus::Running => StepStatus::Running,
        RecordStatus::Completed => StepStatus::Success,
        RecordStatus::Failed => StepStatus::Failed,
        RecordStatus::Cancelled => StepStatus::Skipped,
    }
}

/// Run status mapped from the chronologically last contributing record,
/// once the running/failed/cancelled precedence rules have not applied.
pub fn run_status_for_last(record: RecordStatus) -> RunStatus {
    match record {
        RecordStatus::Queued | RecordStatus::Running => RunStatus::Running,
        RecordStatus::Completed => RunStatus::Success,
        RecordStatus::Failed => RunStatus::Failed,
        RecordStatus::Cancelled => RunStatus::Cancelled,
    }
}
