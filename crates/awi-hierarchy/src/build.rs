use crate::resolve::{behavior_label, classify_anchors, is_behavior_record, resolve_step_ref};
use awi_core::status::{run_status_for_last, step_status_for_anchor, task_status_for};
use awi_core::value::truncate_text;
use awi_core::{
    RecordStatus, Run, RunStatus, RunSummary, Step, StepLogCounts, StepStatus, Task, TaskRecord,
    TaskStatus,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

const PREVIEW_MAX_CHARS: usize = 160;
const SNAPSHOT_MAX_CHARS: usize = 2000;

/// Lightweight per-run index kept around for work-log correlation, so a
/// run lookup does not force a full hierarchy rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunMeta {
    pub run_id: String,
    pub agent_id: String,
    pub session_id: Option<String>,
    pub started_ms: i64,
    pub ended_ms: Option<i64>,
    pub step_ids: BTreeSet<String>,
}

/// The full projection for one agent: ordered runs plus per-run steps,
/// tasks and metadata. Purely derived from a task-record snapshot and
/// rebuilt wholesale on every cache miss.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentHierarchy {
    pub agent_id: String,
    pub runs: Vec<Run>,
    pub steps: HashMap<String, Vec<Step>>,
    pub tasks: HashMap<String, Vec<Task>>,
    pub meta: HashMap<String, RunMeta>,
    /// Records with no resolvable run association, excluded from the
    /// hierarchy but counted for diagnostics.
    pub unresolved: usize,
}

impl AgentHierarchy {
    pub fn steps_for(&self, run_id: &str) -> &[Step] {
        self.steps.get(run_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn tasks_for(&self, run_id: &str) -> &[Task] {
        self.tasks.get(run_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Rebuild the whole Agent → Run → Step → Task projection from one
/// agent's task-record snapshot. Deterministic for identical input.
pub fn build_agent_hierarchy(agent_id: &str, records: &[TaskRecord]) -> AgentHierarchy {
    let anchors = classify_anchors(records);
    let index: HashMap<String, TaskRecord> = records
        .iter()
        .map(|record| (record.id.clone(), record.clone()))
        .collect();

    let mut grouped: BTreeMap<String, BTreeMap<usize, Vec<&TaskRecord>>> = BTreeMap::new();
    let mut unresolved = 0usize;
    for record in records {
        match resolve_step_ref(record, &index, &anchors) {
            Some(step_ref) => grouped
                .entry(step_ref.run_id)
                .or_default()
                .entry(step_ref.step_index)
                .or_default()
                .push(record),
            None => {
                unresolved += 1;
                debug!(task_id = %record.id, "task record has no resolvable run association");
            }
        }
    }

    let mut hierarchy = AgentHierarchy {
        agent_id: agent_id.to_string(),
        unresolved,
        ..AgentHierarchy::default()
    };

    for (run_id, step_groups) in &grouped {
        let steps = build_steps(run_id, step_groups);
        let tasks = build_tasks(run_id, step_groups);
        let run = build_run(agent_id, run_id, step_groups, &steps, tasks.len());
        let meta = RunMeta {
            run_id: run_id.clone(),
            agent_id: agent_id.to_string(),
            session_id: earliest_payload_str(step_groups, "session_id"),
            started_ms: run.started_at.timestamp_millis(),
            ended_ms: run.ended_at.map(|ended| ended.timestamp_millis()),
            step_ids: steps.iter().map(|step| step.step_id.clone()).collect(),
        };

        hierarchy.runs.push(run);
        hierarchy.steps.insert(run_id.clone(), steps);
        hierarchy.tasks.insert(run_id.clone(), tasks);
        hierarchy.meta.insert(run_id.clone(), meta);
    }

    hierarchy.runs.sort_by(|a, b| {
        b.started_at
            .cmp(&a.started_at)
            .then_with(|| a.run_id.cmp(&b.run_id))
    });
    hierarchy
}

fn build_steps(run_id: &str, step_groups: &BTreeMap<usize, Vec<&TaskRecord>>) -> Vec<Step> {
    let mut steps = Vec::with_capacity(step_groups.len());
    for (&step_index, group) in step_groups {
        let anchor = group
            .iter()
            .copied()
            .filter(|record| is_behavior_record(record))
            .max_by(|a, b| a.updated_at.cmp(&b.updated_at).then_with(|| a.id.cmp(&b.id)));

        let status = match anchor {
            Some(anchor) => step_status_for_anchor(anchor.status),
            None => fallback_step_status(group),
        };
        let started_at = group
            .iter()
            .map(|record| record.created_at)
            .min()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let ended_at = if status == StepStatus::Running {
            None
        } else {
            group.iter().map(|record| record.updated_at).max()
        };

        steps.push(Step {
            step_id: step_id_for(run_id, step_index),
            step_index,
            title: anchor.and_then(|a| a.payload_str("title").or_else(|| behavior_label(a))),
            status,
            started_at,
            ended_at,
            duration_secs: ended_at.map(|ended| (ended - started_at).num_seconds().max(0)),
            task_count: group.len(),
            log_counts: StepLogCounts::default(),
            output_snapshot: anchor
                .and_then(|a| a.payload_str("output_snapshot"))
                .map(|snapshot| truncate_text(&snapshot, SNAPSHOT_MAX_CHARS)),
        });
    }
    steps
}

fn build_tasks(run_id: &str, step_groups: &BTreeMap<usize, Vec<&TaskRecord>>) -> Vec<Task> {
    let mut tasks = Vec::new();
    for (&step_index, group) in step_groups {
        let step_id = step_id_for(run_id, step_index);
        for record in group {
            tasks.push(project_task(record, &step_id));
        }
    }
    tasks.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.task_id.cmp(&b.task_id))
    });
    tasks
}

fn build_run(
    agent_id: &str,
    run_id: &str,
    step_groups: &BTreeMap<usize, Vec<&TaskRecord>>,
    steps: &[Step],
    task_count: usize,
) -> Run {
    let contributing: Vec<&TaskRecord> = step_groups.values().flatten().copied().collect();

    let any_running = steps.iter().any(|step| step.status == StepStatus::Running);
    let any_failed = steps.iter().any(|step| step.status == StepStatus::Failed);
    let any_cancelled = contributing
        .iter()
        .any(|record| record.status == RecordStatus::Cancelled);

    let status = if any_running {
        RunStatus::Running
    } else if any_failed {
        RunStatus::Failed
    } else if any_cancelled {
        RunStatus::Cancelled
    } else {
        contributing
            .iter()
            .max_by(|a, b| a.updated_at.cmp(&b.updated_at).then_with(|| a.id.cmp(&b.id)))
            .map(|record| run_status_for_last(record.status))
            .unwrap_or(RunStatus::Running)
    };

    let started_at = steps
        .iter()
        .map(|step| step.started_at)
        .min()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    let ended_at = if status == RunStatus::Running {
        None
    } else {
        steps
            .iter()
            .filter_map(|step| step.ended_at)
            .max()
            .or(Some(started_at))
    };

    let current_step_index = steps
        .iter()
        .filter(|step| step.status == StepStatus::Running)
        .map(|step| step.step_index)
        .max()
        .or_else(|| steps.last().map(|step| step.step_index))
        .unwrap_or(0);

    Run {
        run_id: run_id.to_string(),
        agent_id: agent_id.to_string(),
        trigger_event: earliest_payload_str(step_groups, "trigger_event").unwrap_or_default(),
        status,
        started_at,
        ended_at,
        duration_secs: ended_at.map(|ended| (ended - started_at).num_seconds().max(0)),
        current_step_index,
        summary: RunSummary {
            step_count: steps.len(),
            task_count,
            ..RunSummary::default()
        },
    }
}

fn step_id_for(run_id: &str, step_index: usize) -> String {
    format!("{run_id}-step-{step_index}")
}

/// First match in creation order, so the value is stable across rebuilds.
fn earliest_payload_str(
    step_groups: &BTreeMap<usize, Vec<&TaskRecord>>,
    path: &str,
) -> Option<String> {
    let mut by_created: Vec<&TaskRecord> = step_groups.values().flatten().copied().collect();
    by_created.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    by_created
        .iter()
        .find_map(|record| record.payload_str(path))
}

fn fallback_step_status(group: &[&TaskRecord]) -> StepStatus {
    let mut any_failed = false;
    for record in group {
        match task_status_for(record.status) {
            TaskStatus::Running => return StepStatus::Running,
            TaskStatus::Failed => any_failed = true,
            TaskStatus::Queued | TaskStatus::Success => {}
        }
    }
    if any_failed {
        StepStatus::Failed
    } else {
        StepStatus::Success
    }
}

fn project_task(record: &TaskRecord, step_id: &str) -> Task {
    let finished = matches!(
        record.status,
        RecordStatus::Completed | RecordStatus::Failed | RecordStatus::Cancelled
    );
    Task {
        task_id: record.id.clone(),
        step_id: step_id.to_string(),
        behavior: behavior_label(record),
        status: task_status_for(record.status),
        model: record.payload_str("model").unwrap_or_default(),
        tokens_in: record
            .payload_i64("tokens_in")
            .or_else(|| record.payload_i64("usage.prompt_tokens")),
        tokens_out: record
            .payload_i64("tokens_out")
            .or_else(|| record.payload_i64("usage.completion_tokens")),
        prompt_preview: truncate_text(
            &record
                .payload_str("prompt")
                .unwrap_or_else(|| record.name.clone()),
            PREVIEW_MAX_CHARS,
        ),
        result_preview: truncate_text(
            &record.payload_str("result").unwrap_or_default(),
            PREVIEW_MAX_CHARS,
        ),
        raw_input: record.payload_value("input").map(render_json),
        raw_output: record.payload_value("output").map(render_json),
        created_at: record.created_at,
        duration_secs: if finished {
            Some((record.updated_at - record.created_at).num_seconds().max(0))
        } else {
            None
        },
    }
}

fn render_json(value: &Value) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> TaskRecord {
        TaskRecord::from_value(&value).expect("record")
    }

    /// Two runs: run-a finished (behavior anchors for steps 0 and 1 plus
    /// child tasks), run-b still running.
    fn fixture() -> Vec<TaskRecord> {
        vec![
            record(json!({
                "id": "b0",
                "task_type": "agent_behavior",
                "status": "Completed",
                "created_at": 1000,
                "updated_at": 1300,
                "data": {
                    "run_id": "run-a",
                    "step_index": 0,
                    "behavior": "plan",
                    "title": "Initialize Context",
                    "trigger_event": "user_request: plan feature",
                    "session_id": "sess-1",
                },
            })),
            record(json!({
                "id": "b1",
                "task_type": "agent_behavior",
                "status": "Completed",
                "created_at": 1300,
                "updated_at": 1900,
                "data": {"correlation_id": "loop:run-a:execute:1"},
            })),
            record(json!({
                "id": "t1",
                "task_type": "llm_call",
                "status": "Completed",
                "parent_id": "b0",
                "created_at": 1100,
                "updated_at": 1200,
                "data": {
                    "model": "opus",
                    "prompt": "analyze requirements",
                    "result": "five tabs, six entities",
                    "tokens_in": 1200,
                    "tokens_out": 450,
                },
            })),
            record(json!({
                "id": "t2",
                "task_type": "llm_call",
                "status": "Completed",
                "parent_id": "b1",
                "created_at": 1400,
                "updated_at": 1800,
                "data": {"usage": {"prompt_tokens": 600, "completion_tokens": 200}},
            })),
            record(json!({
                "id": "b2",
                "task_type": "agent_behavior",
                "status": "Running",
                "created_at": 5000,
                "updated_at": 5100,
                "data": {"run_id": "run-b", "step_index": 0, "session_id": "sess-2"},
            })),
            record(json!({
                "id": "t3",
                "task_type": "llm_call",
                "status": "Running",
                "parent_id": "b2",
                "created_at": 5200,
                "updated_at": 5200,
            })),
            // No correlation anywhere: excluded, not a synthetic run.
            record(json!({"id": "stray", "status": "Running", "created_at": 9000})),
        ]
    }

    #[test]
    fn rebuild_from_identical_snapshot_is_idempotent() {
        let records = fixture();
        let first = build_agent_hierarchy("agent-main-001", &records);
        let second = build_agent_hierarchy("agent-main-001", &records);
        assert_eq!(first, second);
    }

    #[test]
    fn runs_newest_first_steps_by_index_tasks_newest_first() {
        let hierarchy = build_agent_hierarchy("agent-main-001", &fixture());
        let run_ids: Vec<&str> = hierarchy.runs.iter().map(|r| r.run_id.as_str()).collect();
        assert_eq!(run_ids, vec!["run-b", "run-a"]);

        let steps = hierarchy.steps_for("run-a");
        let indexes: Vec<usize> = steps.iter().map(|s| s.step_index).collect();
        assert_eq!(indexes, vec![0, 1]);

        let tasks = hierarchy.tasks_for("run-a");
        for pair in tasks.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
    }

    #[test]
    fn summary_task_count_matches_returned_tasks() {
        let hierarchy = build_agent_hierarchy("agent-main-001", &fixture());
        for run in &hierarchy.runs {
            assert_eq!(run.summary.task_count, hierarchy.tasks_for(&run.run_id).len());
            assert_eq!(run.summary.step_count, hierarchy.steps_for(&run.run_id).len());
        }
    }

    #[test]
    fn every_task_maps_to_exactly_one_step_of_its_run() {
        let hierarchy = build_agent_hierarchy("agent-main-001", &fixture());
        for run in &hierarchy.runs {
            let meta = hierarchy.meta.get(&run.run_id).expect("meta");
            for task in hierarchy.tasks_for(&run.run_id) {
                assert!(meta.step_ids.contains(&task.step_id));
            }
        }
    }

    #[test]
    fn unresolved_records_are_excluded_and_counted() {
        let hierarchy = build_agent_hierarchy("agent-main-001", &fixture());
        assert_eq!(hierarchy.unresolved, 1);
        assert!(hierarchy
            .runs
            .iter()
            .all(|run| !hierarchy.tasks_for(&run.run_id).iter().any(|t| t.task_id == "stray")));
    }

    #[test]
    fn finished_run_takes_status_and_bounds_from_its_steps() {
        let hierarchy = build_agent_hierarchy("agent-main-001", &fixture());
        let run_a = hierarchy
            .runs
            .iter()
            .find(|r| r.run_id == "run-a")
            .expect("run-a");
        assert_eq!(run_a.status, RunStatus::Success);
        assert_eq!(run_a.started_at.timestamp(), 1000);
        assert_eq!(run_a.ended_at.map(|e| e.timestamp()), Some(1900));
        assert_eq!(run_a.trigger_event, "user_request: plan feature");
        assert_eq!(run_a.current_step_index, 1);

        let meta = hierarchy.meta.get("run-a").expect("meta");
        assert_eq!(meta.session_id.as_deref(), Some("sess-1"));
        assert_eq!(meta.started_ms, 1_000_000);
        assert_eq!(meta.ended_ms, Some(1_900_000));
    }

    #[test]
    fn running_run_has_no_end_and_points_at_running_step() {
        let hierarchy = build_agent_hierarchy("agent-main-001", &fixture());
        let run_b = hierarchy
            .runs
            .iter()
            .find(|r| r.run_id == "run-b")
            .expect("run-b");
        assert_eq!(run_b.status, RunStatus::Running);
        assert!(run_b.ended_at.is_none());
        assert!(run_b.duration_secs.is_none());
        assert_eq!(run_b.current_step_index, 0);

        let steps = hierarchy.steps_for("run-b");
        assert_eq!(steps[0].status, StepStatus::Running);
        assert!(steps[0].ended_at.is_none());
    }

    #[test]
    fn step_without_anchor_falls_back_to_grouped_task_statuses() {
        let records = vec![
            record(json!({
                "id": "t1",
                "status": "Running",
                "created_at": 1000,
                "data": {"run_id": "R", "step_index": 0},
            })),
            record(json!({
                "id": "t2",
                "status": "Completed",
                "created_at": 1100,
                "data": {"run_id": "R", "step_index": 0},
            })),
        ];
        let hierarchy = build_agent_hierarchy("agent-x", &records);
        assert_eq!(hierarchy.steps_for("R")[0].status, StepStatus::Running);
    }

    #[test]
    fn cancelled_contribution_marks_a_finished_run_cancelled() {
        let records = vec![
            record(json!({
                "id": "b0",
                "task_type": "agent_behavior",
                "status": "Completed",
                "created_at": 1000,
                "updated_at": 1500,
                "data": {"run_id": "R", "step_index": 0},
            })),
            record(json!({
                "id": "t1",
                "status": "Cancelled",
                "parent_id": "b0",
                "created_at": 1100,
                "updated_at": 1200,
            })),
        ];
        let hierarchy = build_agent_hierarchy("agent-x", &records);
        assert_eq!(hierarchy.runs[0].status, RunStatus::Cancelled);
    }

    #[test]
    fn task_projection_reads_tokens_from_both_shapes() {
        let hierarchy = build_agent_hierarchy("agent-main-001", &fixture());
        let tasks = hierarchy.tasks_for("run-a");
        let t1 = tasks.iter().find(|t| t.task_id == "t1").expect("t1");
        assert_eq!(t1.tokens_in, Some(1200));
        assert_eq!(t1.tokens_out, Some(450));
        assert_eq!(t1.model, "opus");
        assert_eq!(t1.duration_secs, Some(100));

        let t2 = tasks.iter().find(|t| t.task_id == "t2").expect("t2");
        assert_eq!(t2.tokens_in, Some(600));
        assert_eq!(t2.tokens_out, Some(200));
    }
}
