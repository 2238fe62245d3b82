//! Fixed fallback dataset served when an upstream collaborator is down.
//! A small but coherent workspace: a planner agent mid-run, a research
//! sub-agent, one earlier deploy run that failed.

use awi_core::{
    Agent, AgentKind, AgentSession, AgentStatus, Run, RunStatus, RunSummary, Step, StepLogCounts,
    StepStatus, Task, TaskStatus, Todo, TodoStatus, WorkLogEntry, WorkLogKind, WorkLogStatus,
};
use chrono::{DateTime, Duration, Utc};

const BASE_EPOCH_SECS: i64 = 1_771_840_000;

fn at(offset_secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(BASE_EPOCH_SECS + offset_secs)
}

pub fn agents() -> Vec<Agent> {
    vec![
        Agent {
            agent_id: "sample-agent-planner".to_string(),
            agent_name: "Planner".to_string(),
            kind: AgentKind::Main,
            status: AgentStatus::Running,
            parent_agent_id: None,
            current_run_id: Some("sample-run-feature".to_string()),
            last_active_at: at(3600),
        },
        Agent {
            agent_id: "sample-agent-research".to_string(),
            agent_name: "Research".to_string(),
            kind: AgentKind::Sub,
            status: AgentStatus::Idle,
            parent_agent_id: Some("sample-agent-planner".to_string()),
            current_run_id: None,
            last_active_at: at(3000),
        },
    ]
}

pub fn sessions() -> Vec<AgentSession> {
    vec![AgentSession {
        session_id: "sample-session-1".to_string(),
        owner_agent: "sample-agent-planner".to_string(),
        title: "Feature planning".to_string(),
        summary: Some("Break the roadmap item into shippable steps".to_string()),
        status: "active".to_string(),
        created_at: at(0),
        updated_at: at(3600),
        last_activity_at: at(3600),
    }]
}

pub fn runs() -> Vec<Run> {
    vec![
        Run {
            run_id: "sample-run-feature".to_string(),
            agent_id: "sample-agent-planner".to_string(),
            trigger_event: "user_request: plan the reporting feature".to_string(),
            status: RunStatus::Running,
            started_at: at(1800),
            ended_at: None,
            duration_secs: None,
            current_step_index: 1,
            summary: RunSummary {
                step_count: 2,
                task_count: 3,
                log_count: 5,
                todo_count: 2,
                sub_agent_count: 1,
            },
        },
        Run {
            run_id: "sample-run-deploy".to_string(),
            agent_id: "sample-agent-planner".to_string(),
            trigger_event: "schedule: nightly deploy".to_string(),
            status: RunStatus::Failed,
            started_at: at(-86_400),
            ended_at: Some(at(-86_100)),
            duration_secs: Some(300),
            current_step_index: 0,
            summary: RunSummary {
                step_count: 1,
                task_count: 1,
                log_count: 2,
                todo_count: 0,
                sub_agent_count: 0,
            },
        },
    ]
}

pub fn steps() -> Vec<Step> {
    vec![
        Step {
            step_id: "sample-run-feature-step-0".to_string(),
            step_index: 0,
            title: Some("Gather requirements".to_string()),
            status: StepStatus::Success,
            started_at: at(1800),
            ended_at: Some(at(2400)),
            duration_secs: Some(600),
            task_count: 2,
            log_counts: StepLogCounts {
                message: 2,
                function_call: 1,
                action: 0,
                sub_agent: 1,
            },
            output_snapshot: Some("Reporting needs five views and a CSV export".to_string()),
        },
        Step {
            step_id: "sample-run-feature-step-1".to_string(),
            step_index: 1,
            title: Some("Draft implementation plan".to_string()),
            status: StepStatus::Running,
            started_at: at(2400),
            ended_at: None,
            duration_secs: None,
            task_count: 1,
            log_counts: StepLogCounts {
                message: 1,
                function_call: 0,
                action: 0,
                sub_agent: 0,
            },
            output_snapshot: None,
        },
    ]
}

pub fn tasks() -> Vec<Task> {
    vec![
        Task {
            task_id: "sample-task-draft".to_string(),
            step_id: "sample-run-feature-step-1".to_string(),
            behavior: Some("plan".to_string()),
            status: TaskStatus::Running,
            model: "sonnet".to_string(),
            tokens_in: Some(2200),
            tokens_out: None,
            prompt_preview: "Draft a step-by-step implementation plan".to_string(),
            result_preview: String::new(),
            raw_input: None,
            raw_output: None,
            created_at: at(2400),
            duration_secs: None,
        },
        Task {
            task_id: "sample-task-research".to_string(),
            step_id: "sample-run-feature-step-0".to_string(),
            behavior: Some("research".to_string()),
            status: TaskStatus::Success,
            model: "haiku".to_string(),
            tokens_in: Some(900),
            tokens_out: Some(350),
            prompt_preview: "Survey existing reporting endpoints".to_string(),
            result_preview: "Three endpoints reusable, one needs pagination".to_string(),
            raw_input: None,
            raw_output: None,
            created_at: at(2000),
            duration_secs: Some(180),
        },
        Task {
            task_id: "sample-task-requirements".to_string(),
            step_id: "sample-run-feature-step-0".to_string(),
            behavior: Some("plan".to_string()),
            status: TaskStatus::Success,
            model: "sonnet".to_string(),
            tokens_in: Some(1400),
            tokens_out: Some(600),
            prompt_preview: "Collect the open questions about the reporting feature".to_string(),
            result_preview: "Five views, CSV export, weekly schedule".to_string(),
            raw_input: None,
            raw_output: None,
            created_at: at(1800),
            duration_secs: Some(240),
        },
    ]
}

pub fn work_logs() -> Vec<WorkLogEntry> {
    vec![
        WorkLogEntry {
            log_id: "sample-log-1".to_string(),
            kind: WorkLogKind::MessageSent,
            agent_id: "sample-agent-planner".to_string(),
            related_agent_id: None,
            step_id: Some("sample-run-feature-step-0".to_string()),
            status: WorkLogStatus::Success,
            timestamp: at(1810),
            duration_secs: None,
            summary: "Asked the user to confirm the report cadence".to_string(),
            payload: None,
        },
        WorkLogEntry {
            log_id: "sample-log-2".to_string(),
            kind: WorkLogKind::SubAgentCreated,
            agent_id: "sample-agent-planner".to_string(),
            related_agent_id: Some("sample-agent-research".to_string()),
            step_id: Some("sample-run-feature-step-0".to_string()),
            status: WorkLogStatus::Success,
            timestamp: at(1900),
            duration_secs: Some(0.4),
            summary: "Spawned the research sub-agent".to_string(),
            payload: None,
        },
        WorkLogEntry {
            log_id: "sample-log-3".to_string(),
            kind: WorkLogKind::Action,
            agent_id: "sample-agent-planner".to_string(),
            related_agent_id: None,
            step_id: None,
            status: WorkLogStatus::Partial,
            timestamp: at(2300),
            duration_secs: Some(12.5),
            summary: "Batch-archived stale planning notes; 2 of 14 failed".to_string(),
            payload: None,
        },
        WorkLogEntry {
            log_id: "sample-log-4".to_string(),
            kind: WorkLogKind::MessageReply,
            agent_id: "sample-agent-planner".to_string(),
            related_agent_id: None,
            step_id: Some("sample-run-feature-step-1".to_string()),
            status: WorkLogStatus::Info,
            timestamp: at(2500),
            duration_secs: None,
            summary: "Shared the draft plan outline".to_string(),
            payload: None,
        },
    ]
}

pub fn todos() -> Vec<Todo> {
    vec![
        Todo {
            todo_id: "sample-todo-1".to_string(),
            agent_id: "sample-agent-planner".to_string(),
            title: "Confirm CSV column order with the user".to_string(),
            description: None,
            status: TodoStatus::Open,
            created_at: at(2450),
            completed_at: None,
            created_in_step_id: Some("sample-run-feature-step-1".to_string()),
            completed_in_step_id: None,
        },
        Todo {
            todo_id: "sample-todo-2".to_string(),
            agent_id: "sample-agent-planner".to_string(),
            title: "File the pagination gap on the reports endpoint".to_string(),
            description: Some("Found while surveying existing endpoints".to_string()),
            status: TodoStatus::Done,
            created_at: at(2050),
            completed_at: Some(at(2350)),
            created_in_step_id: Some("sample-run-feature-step-0".to_string()),
            completed_in_step_id: Some("sample-run-feature-step-0".to_string()),
        },
    ]
}

pub fn sub_agents() -> Vec<Agent> {
    vec![Agent {
        agent_id: "sample-agent-research".to_string(),
        agent_name: "Research".to_string(),
        kind: AgentKind::Sub,
        status: AgentStatus::Idle,
        parent_agent_id: Some("sample-agent-planner".to_string()),
        current_run_id: None,
        last_active_at: at(3000),
    }]
}
