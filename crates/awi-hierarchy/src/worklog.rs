use crate::build::RunMeta;
use awi_core::{Step, StepLogCounts, WorkLogEntry};
use chrono::{DateTime, Utc};

/// Slack on both sides of the run window. Log timestamps and task-record
/// timestamps come from different clocks upstream.
pub const LOG_WINDOW_SLACK_MS: i64 = 120_000;

/// Work-log entries attributed to one run, plus the run's steps with
/// their per-step log counters recomputed from those entries.
#[derive(Debug, Clone, PartialEq)]
pub struct RunWorklog {
    pub entries: Vec<WorkLogEntry>,
    pub steps: Vec<Step>,
}

/// Attribute a workspace work-log stream to one run. An entry belongs to
/// the run when its timestamp falls inside the slack-padded run window
/// and it either names one of the run's steps or names no step at all.
/// Still-running runs use `now` as the provisional end.
pub fn correlate_run_worklog(
    meta: &RunMeta,
    steps: &[Step],
    entries: Vec<WorkLogEntry>,
    now: DateTime<Utc>,
) -> RunWorklog {
    let window_start = meta.started_ms - LOG_WINDOW_SLACK_MS;
    let window_end = meta.ended_ms.unwrap_or_else(|| now.timestamp_millis()) + LOG_WINDOW_SLACK_MS;

    let mut kept: Vec<WorkLogEntry> = entries
        .into_iter()
        .filter(|entry| {
            let at = entry.timestamp.timestamp_millis();
            if at < window_start || at > window_end {
                return false;
            }
            match &entry.step_id {
                Some(step_id) => meta.step_ids.contains(step_id),
                None => true,
            }
        })
        .collect();
    kept.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.log_id.cmp(&b.log_id))
    });

    let mut steps: Vec<Step> = steps.to_vec();
    for step in &mut steps {
        step.log_counts = StepLogCounts::default();
    }
    for entry in &kept {
        if let Some(step_id) = &entry.step_id {
            if let Some(step) = steps.iter_mut().find(|step| &step.step_id == step_id) {
                step.log_counts.bump(entry.kind.count_bucket());
            }
        }
    }

    RunWorklog {
        entries: kept,
        steps,
    }
}
