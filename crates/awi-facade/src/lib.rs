//! Read-side query facade for the agent workspace dashboard: caches
//! hierarchy rebuilds, correlates work-logs to runs, and degrades to a
//! fixed sample dataset whenever an upstream collaborator fails.

pub mod cache;
pub mod sample;
pub mod upstream;

pub use cache::{RunMetaIndex, TtlCache};
pub use upstream::{
    AgentDirectory, AgentQuery, RpcAgentDirectory, RpcTaskService, RpcTransport, SubAgentQuery,
    TaskFilter, TaskService, TodoQuery, UpstreamError, WorklogQuery,
};

use awi_core::{
    Agent, AgentSession, AgentStatus, LogBucket, Run, RunStatus, Step, Task, TaskRecord,
    TaskStatus, Todo, WorkLogEntry, WorkLogKind, WorkLogStatus,
};
use awi_hierarchy::{
    build_agent_hierarchy, correlate_run_worklog, AgentHierarchy, RunMeta, RunWorklog,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Constructor-injected knobs. Defaults match the dashboard's refresh
/// cadence; embedders with slower upstreams raise the TTLs.
#[derive(Debug, Clone)]
pub struct FacadeConfig {
    pub hierarchy_ttl: Duration,
    pub worklog_ttl: Duration,
    pub session_ttl: Duration,
    pub agent_list_limit: usize,
    pub session_list_limit: usize,
    pub worklog_list_limit: usize,
    pub todo_list_limit: usize,
    pub sub_agent_list_limit: usize,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            hierarchy_ttl: Duration::from_secs(5),
            worklog_ttl: Duration::from_secs(5),
            session_ttl: Duration::from_secs(5),
            agent_list_limit: 100,
            session_list_limit: 50,
            worklog_list_limit: 500,
            todo_list_limit: 200,
            sub_agent_list_limit: 100,
        }
    }
}

/// Result of every facade operation, serialized as the `{data, error}`
/// envelope the dashboard consumes. A populated `error` next to
/// populated `data` means "degraded, but renderable": `data` is then the
/// fixed sample set for that entity, never a partially-real value.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<UpstreamError>,
}

impl<T> QueryResult<T> {
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Narrows `fetch_tasks`. Deserializable so the dashboard can pass its
/// filter state straight through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskQuery {
    pub step_id: Option<String>,
    pub status: Option<TaskStatus>,
}

/// Narrows `fetch_work_logs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkLogFilter {
    pub step_id: Option<String>,
    pub kind: Option<WorkLogKind>,
    pub status: Option<WorkLogStatus>,
    pub keyword: Option<String>,
}

impl WorkLogFilter {
    fn matches(&self, entry: &WorkLogEntry) -> bool {
        self.step_id
            .as_deref()
            .map_or(true, |step| entry.step_id.as_deref() == Some(step))
            && self.kind.map_or(true, |kind| entry.kind == kind)
            && self.status.map_or(true, |status| entry.status == status)
            && self.keyword.as_deref().map_or(true, |keyword| {
                entry
                    .summary
                    .to_lowercase()
                    .contains(&keyword.to_lowercase())
            })
    }
}

pub struct WorkspaceFacade<S, D> {
    tasks: S,
    directory: D,
    config: FacadeConfig,
    hierarchies: TtlCache<AgentHierarchy>,
    worklogs: TtlCache<RunWorklog>,
    sessions: TtlCache<Vec<AgentSession>>,
    run_meta: RunMetaIndex,
}

impl<S: TaskService, D: AgentDirectory> WorkspaceFacade<S, D> {
    pub fn new(tasks: S, directory: D, config: FacadeConfig) -> Self {
        Self {
            hierarchies: TtlCache::new(config.hierarchy_ttl),
            worklogs: TtlCache::new(config.worklog_ttl),
            sessions: TtlCache::new(config.session_ttl),
            run_meta: RunMetaIndex::default(),
            tasks,
            directory,
            config,
        }
    }

    pub async fn fetch_agents(&self) -> QueryResult<Vec<Agent>> {
        degrade(self.agents_inner().await, sample::agents)
    }

    pub async fn fetch_agent_sessions(&self, agent_id: &str) -> QueryResult<Vec<AgentSession>> {
        degrade(self.agent_sessions(agent_id).await, sample::sessions)
    }

    pub async fn fetch_runs(&self, agent_id: &str) -> QueryResult<Vec<Run>> {
        degrade(self.runs_inner(agent_id).await, sample::runs)
    }

    /// A run's steps with per-step log counters merged in from the
    /// correlated work-log.
    pub async fn fetch_steps(&self, run_id: &str) -> QueryResult<Vec<Step>> {
        degrade(
            self.run_worklog(run_id).await.map(|worklog| worklog.steps),
            sample::steps,
        )
    }

    pub async fn fetch_tasks(&self, run_id: &str, query: &TaskQuery) -> QueryResult<Vec<Task>> {
        degrade(self.tasks_inner(run_id, query).await, sample::tasks)
    }

    pub async fn fetch_work_logs(
        &self,
        run_id: &str,
        filter: &WorkLogFilter,
    ) -> QueryResult<Vec<WorkLogEntry>> {
        degrade(self.work_logs_inner(run_id, filter).await, sample::work_logs)
    }

    pub async fn fetch_todos(&self, agent_id: &str, include_closed: bool) -> QueryResult<Vec<Todo>> {
        degrade(self.todos_inner(agent_id, include_closed).await, sample::todos)
    }

    pub async fn fetch_sub_agents(
        &self,
        agent_id: &str,
        include_disabled: bool,
    ) -> QueryResult<Vec<Agent>> {
        degrade(
            self.directory
                .list_workspace_sub_agents(&SubAgentQuery {
                    agent_id: agent_id.to_string(),
                    include_disabled,
                    limit: self.config.sub_agent_list_limit,
                })
                .await,
            sample::sub_agents,
        )
    }

    async fn agents_inner(&self) -> Result<Vec<Agent>, UpstreamError> {
        let mut agents = self
            .directory
            .list_agents(&AgentQuery {
                include_disabled: false,
                limit: self.config.agent_list_limit,
            })
            .await?;
        for agent in &mut agents {
            let hierarchy = self.hierarchy(&agent.agent_id).await?;
            if let Some(run) = hierarchy
                .runs
                .iter()
                .find(|run| run.status == RunStatus::Running)
            {
                agent.current_run_id = Some(run.run_id.clone());
                agent.status = AgentStatus::Running;
            }
        }
        Ok(agents)
    }

    async fn runs_inner(&self, agent_id: &str) -> Result<Vec<Run>, UpstreamError> {
        let hierarchy = self.hierarchy(agent_id).await?;
        let mut runs = hierarchy.runs.clone();

        // Summary enrichment is best-effort: a down work-log or todo
        // endpoint leaves the counts at zero, it never fails the listing.
        let todos = self
            .directory
            .list_workspace_todos(&TodoQuery {
                agent_id: agent_id.to_string(),
                owner_session_id: None,
                include_closed: true,
                limit: self.config.todo_list_limit,
            })
            .await
            .ok();
        for run in &mut runs {
            if let Ok(worklog) = self.run_worklog(&run.run_id).await {
                run.summary.log_count = worklog.entries.len();
                run.summary.sub_agent_count = worklog
                    .entries
                    .iter()
                    .filter(|entry| entry.kind.count_bucket() == LogBucket::SubAgent)
                    .count();
            }
            if let (Some(todos), Some(meta)) = (todos.as_ref(), hierarchy.meta.get(&run.run_id)) {
                run.summary.todo_count = todos
                    .iter()
                    .filter(|todo| {
                        todo.created_in_step_id
                            .as_ref()
                            .map_or(false, |step| meta.step_ids.contains(step))
                    })
                    .count();
            }
        }
        Ok(runs)
    }

    async fn tasks_inner(
        &self,
        run_id: &str,
        query: &TaskQuery,
    ) -> Result<Vec<Task>, UpstreamError> {
        let meta = self.known_run(run_id)?;
        let hierarchy = self.hierarchy(&meta.agent_id).await?;
        Ok(hierarchy
            .tasks_for(run_id)
            .iter()
            .filter(|task| {
                query
                    .step_id
                    .as_deref()
                    .map_or(true, |step| task.step_id == step)
                    && query.status.map_or(true, |status| task.status == status)
            })
            .cloned()
            .collect())
    }

    async fn work_logs_inner(
        &self,
        run_id: &str,
        filter: &WorkLogFilter,
    ) -> Result<Vec<WorkLogEntry>, UpstreamError> {
        let worklog = self.run_worklog(run_id).await?;
        Ok(worklog
            .entries
            .into_iter()
            .filter(|entry| filter.matches(entry))
            .collect())
    }

    async fn todos_inner(
        &self,
        agent_id: &str,
        include_closed: bool,
    ) -> Result<Vec<Todo>, UpstreamError> {
        let owner_session_id = self
            .agent_sessions(agent_id)
            .await
            .ok()
            .and_then(|sessions| sessions.first().map(|s| s.session_id.clone()));
        self.directory
            .list_workspace_todos(&TodoQuery {
                agent_id: agent_id.to_string(),
                owner_session_id,
                include_closed,
                limit: self.config.todo_list_limit,
            })
            .await
    }

    /// Cached hierarchy for one agent; a rebuild also refreshes the
    /// cross-agent run-metadata index.
    async fn hierarchy(&self, agent_id: &str) -> Result<AgentHierarchy, UpstreamError> {
        if let Some(hit) = self.hierarchies.get(agent_id) {
            return Ok(hit);
        }
        let records = self.agent_records(agent_id).await?;
        let hierarchy = build_agent_hierarchy(agent_id, &records);
        for meta in hierarchy.meta.values() {
            self.run_meta.record(meta.clone());
        }
        self.hierarchies.put(agent_id, hierarchy.clone());
        Ok(hierarchy)
    }

    async fn agent_records(&self, agent_id: &str) -> Result<Vec<TaskRecord>, UpstreamError> {
        let filtered = self
            .tasks
            .list_tasks(Some(&TaskFilter::for_app(agent_id)))
            .await?;
        if !filtered.is_empty() {
            return Ok(filtered);
        }
        // Some workspaces never stamp app_name; list everything and keep
        // what plausibly belongs to this agent.
        let all = self.tasks.list_tasks(None).await?;
        Ok(all
            .into_iter()
            .filter(|record| record.app_name == agent_id || record.app_name.is_empty())
            .collect())
    }

    async fn agent_sessions(&self, agent_id: &str) -> Result<Vec<AgentSession>, UpstreamError> {
        if let Some(hit) = self.sessions.get(agent_id) {
            return Ok(hit);
        }
        let mut sessions = self
            .directory
            .list_agent_sessions(agent_id, self.config.session_list_limit)
            .await?;
        sessions.sort_by(|a, b| {
            b.last_activity_at
                .cmp(&a.last_activity_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        self.sessions.put(agent_id, sessions.clone());
        Ok(sessions)
    }

    async fn run_worklog(&self, run_id: &str) -> Result<RunWorklog, UpstreamError> {
        if let Some(hit) = self.worklogs.get(run_id) {
            return Ok(hit);
        }
        let meta = self.known_run(run_id)?;
        let hierarchy = self.hierarchy(&meta.agent_id).await?;
        let steps = hierarchy.steps_for(run_id).to_vec();

        let session_id = match self.owning_session(&meta).await? {
            Some(session_id) => session_id,
            None => {
                warn!(run_id, agent_id = %meta.agent_id, "no owning session for run, serving empty work-log");
                let empty = RunWorklog {
                    entries: Vec::new(),
                    steps,
                };
                self.worklogs.put(run_id, empty.clone());
                return Ok(empty);
            }
        };

        let entries = self
            .directory
            .list_workspace_worklogs(&WorklogQuery {
                agent_id: meta.agent_id.clone(),
                owner_session_id: session_id,
                limit: self.config.worklog_list_limit,
            })
            .await?;
        let correlated = correlate_run_worklog(&meta, &steps, entries, Utc::now());
        self.worklogs.put(run_id, correlated.clone());
        Ok(correlated)
    }

    /// Explicit session from the run metadata first, else the agent's
    /// most-recently-active session.
    async fn owning_session(&self, meta: &RunMeta) -> Result<Option<String>, UpstreamError> {
        if let Some(session_id) = &meta.session_id {
            return Ok(Some(session_id.clone()));
        }
        let sessions = self.agent_sessions(&meta.agent_id).await?;
        Ok(sessions.first().map(|session| session.session_id.clone()))
    }

    fn known_run(&self, run_id: &str) -> Result<RunMeta, UpstreamError> {
        self.run_meta
            .get(run_id)
            .ok_or_else(|| UpstreamError::unknown_run(run_id))
    }
}

/// The single degradation seam shared by every public operation: a real
/// value passes through, any upstream failure is swapped for the sample
/// set plus the triggering error.
fn degrade<T>(result: Result<T, UpstreamError>, fallback: fn() -> T) -> QueryResult<T> {
    match result {
        Ok(data) => QueryResult { data, error: None },
        Err(error) => {
            warn!(%error, "upstream fetch failed, serving sample data");
            QueryResult {
                data: fallback(),
                error: Some(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: WorkLogKind, status: WorkLogStatus, step: Option<&str>, summary: &str) -> WorkLogEntry {
        WorkLogEntry {
            log_id: "log-1".to_string(),
            kind,
            agent_id: "agent-main-001".to_string(),
            related_agent_id: None,
            step_id: step.map(str::to_string),
            status,
            timestamp: chrono::DateTime::<Utc>::UNIX_EPOCH,
            duration_secs: None,
            summary: summary.to_string(),
            payload: None,
        }
    }

    #[test]
    fn work_log_filter_clauses_are_conjunctive() {
        let probe = entry(
            WorkLogKind::Action,
            WorkLogStatus::Partial,
            Some("run-a-step-0"),
            "Batch-archived stale notes",
        );

        assert!(WorkLogFilter::default().matches(&probe));
        assert!(WorkLogFilter {
            step_id: Some("run-a-step-0".to_string()),
            kind: Some(WorkLogKind::Action),
            status: Some(WorkLogStatus::Partial),
            keyword: Some("ARCHIVED".to_string()),
        }
        .matches(&probe));
        assert!(!WorkLogFilter {
            kind: Some(WorkLogKind::FunctionCall),
            ..WorkLogFilter::default()
        }
        .matches(&probe));
        assert!(!WorkLogFilter {
            keyword: Some("deploy".to_string()),
            ..WorkLogFilter::default()
        }
        .matches(&probe));
    }

    #[test]
    fn query_result_serializes_as_the_data_error_envelope() {
        let healthy = QueryResult {
            data: vec!["run-a"],
            error: None,
        };
        assert_eq!(
            serde_json::to_value(&healthy).expect("json"),
            serde_json::json!({"data": ["run-a"]})
        );

        let degraded = QueryResult {
            data: Vec::<&str>::new(),
            error: Some(UpstreamError::unknown_run("run-a")),
        };
        let rendered = serde_json::to_value(&degraded).expect("json");
        assert_eq!(
            rendered["error"],
            serde_json::json!({"unknown_run": {"run_id": "run-a"}})
        );
    }

    #[test]
    fn filters_round_trip_from_dashboard_json() {
        let filter: WorkLogFilter = serde_json::from_value(serde_json::json!({
            "kind": "function_call",
            "keyword": "config",
        }))
        .expect("filter");
        assert_eq!(filter.kind, Some(WorkLogKind::FunctionCall));
        assert_eq!(filter.keyword.as_deref(), Some("config"));
        assert!(filter.step_id.is_none());

        let query: TaskQuery =
            serde_json::from_value(serde_json::json!({"status": "running"})).expect("query");
        assert_eq!(query.status, Some(TaskStatus::Running));
    }

    #[test]
    fn degrade_swaps_in_the_fallback_and_keeps_the_error() {
        let ok: QueryResult<Vec<Agent>> = degrade(Ok(Vec::new()), sample::agents);
        assert!(!ok.is_degraded());
        assert!(ok.data.is_empty());

        let failed: QueryResult<Vec<Agent>> = degrade(
            Err(UpstreamError::transport("list_agents", "connection refused")),
            sample::agents,
        );
        assert!(failed.is_degraded());
        assert_eq!(failed.data, sample::agents());
    }
}
