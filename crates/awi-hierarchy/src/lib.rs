pub mod build;
pub mod resolve;
pub mod worklog;

pub use build::{build_agent_hierarchy, AgentHierarchy, RunMeta};
pub use resolve::{
    classify_anchors, direct_step_ref, resolve_step_ref, StepRef, BEHAVIOR_TASK_TYPE,
};
pub use worklog::{correlate_run_worklog, RunWorklog, LOG_WINDOW_SLACK_MS};
