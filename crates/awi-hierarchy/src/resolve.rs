use awi_core::TaskRecord;
use std::collections::{HashMap, HashSet};

/// Task type marking a record as the authoritative owner of a run/step
/// correlation (a behavior anchor).
pub const BEHAVIOR_TASK_TYPE: &str = "agent_behavior";

/// Resolved run/step attribution for one task record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StepRef {
    pub run_id: String,
    pub step_index: usize,
}

pub fn is_behavior_record(record: &TaskRecord) -> bool {
    record.task_type == BEHAVIOR_TASK_TYPE
}

/// Pre-classify behavior anchors: every behavior record that carries its
/// own correlation becomes an O(1) lookup target for the ancestor walk.
pub fn classify_anchors(records: &[TaskRecord]) -> HashMap<String, StepRef> {
    let mut anchors = HashMap::new();
    for record in records {
        if !is_behavior_record(record) {
            continue;
        }
        if let Some(step_ref) = direct_step_ref(record) {
            anchors.insert(record.id.clone(), step_ref);
        }
    }
    anchors
}

/// Correlation rules 1 and 2: explicit payload fields win, then the
/// composite colon-delimited correlation identifier.
pub fn direct_step_ref(record: &TaskRecord) -> Option<StepRef> {
    let explicit_run = record
        .payload_str("run_id")
        .or_else(|| record.payload_str("loop_run_id"));
    let explicit_index = record
        .payload_i64("step_index")
        .or_else(|| record.payload_i64("step"))
        .and_then(|raw| usize::try_from(raw).ok());
    if let (Some(run_id), Some(step_index)) = (explicit_run, explicit_index) {
        return Some(StepRef { run_id, step_index });
    }

    record
        .payload_str("correlation_id")
        .and_then(|raw| parse_correlation_id(&raw))
        .map(|(step_ref, _)| step_ref)
}

/// Parse `marker:run_id:behavior:step_index`. Anything malformed or with
/// fewer than 4 segments is treated as absent, never as an error.
pub fn parse_correlation_id(raw: &str) -> Option<(StepRef, String)> {
    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() < 4 {
        return None;
    }
    let run_id = parts[1].trim();
    if run_id.is_empty() {
        return None;
    }
    let behavior = parts[2].trim().to_string();
    let step_index = parts[3].trim().parse::<usize>().ok()?;
    Some((
        StepRef {
            run_id: run_id.to_string(),
            step_index,
        },
        behavior,
    ))
}

/// The behavior label for a record, if any: explicit payload field first,
/// then the composite correlation identifier's behavior segment.
pub fn behavior_label(record: &TaskRecord) -> Option<String> {
    record.payload_str("behavior").or_else(|| {
        record
            .payload_str("correlation_id")
            .and_then(|raw| parse_correlation_id(&raw))
            .map(|(_, behavior)| behavior)
            .filter(|behavior| !behavior.is_empty())
    })
}

/// Full resolution for one record: direct correlation, then the ancestor
/// chain (`parent_id` falling back to `root_id`). The walk checks the
/// pre-classified anchor table before re-applying the direct rules to the
/// ancestor, detects cycles with a visited set, and gives up on a missing
/// ancestor.
pub fn resolve_step_ref(
    record: &TaskRecord,
    index: &HashMap<String, TaskRecord>,
    anchors: &HashMap<String, StepRef>,
) -> Option<StepRef> {
    if let Some(step_ref) = direct_step_ref(record) {
        return Some(step_ref);
    }

    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(record.id.as_str());
    let mut next = record.ancestor_id().map(str::to_string);

    while let Some(ancestor_id) = next {
        if let Some(anchor) = anchors.get(ancestor_id.as_str()) {
            return Some(anchor.clone());
        }
        let ancestor = index.get(ancestor_id.as_str())?;
        if !visited.insert(ancestor.id.as_str()) {
            return None;
        }
        if let Some(step_ref) = direct_step_ref(ancestor) {
            return Some(step_ref);
        }
        next = ancestor.ancestor_id().map(str::to_string);
    }

    None
}
