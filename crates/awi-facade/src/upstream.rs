use async_trait::async_trait;
use awi_core::{Agent, AgentSession, TaskRecord, Todo, WorkLogEntry};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Failure reaching or decoding an upstream collaborator. Never escapes
/// the query facade; it travels alongside fallback data instead.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamError {
    #[error("transport failure calling {method}: {message}")]
    Transport { method: String, message: String },
    #[error("malformed response from {method}")]
    MalformedResponse { method: String },
    #[error("unknown run {run_id}")]
    UnknownRun { run_id: String },
}

impl UpstreamError {
    pub fn transport(method: &str, message: impl Into<String>) -> Self {
        Self::Transport {
            method: method.to_string(),
            message: message.into(),
        }
    }

    pub fn malformed(method: &str) -> Self {
        Self::MalformedResponse {
            method: method.to_string(),
        }
    }

    pub fn unknown_run(run_id: &str) -> Self {
        Self::UnknownRun {
            run_id: run_id.to_string(),
        }
    }
}

/// The session-token/framing layer lives outside this engine; all it owes
/// us is a JSON response per named method.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn call(&self, method: &str, params: Value) -> Result<Value, UpstreamError>;
}

#[async_trait]
impl<T: RpcTransport + ?Sized> RpcTransport for &T {
    async fn call(&self, method: &str, params: Value) -> Result<Value, UpstreamError> {
        (**self).call(method, params).await
    }
}

#[async_trait]
impl<T: RpcTransport + ?Sized> RpcTransport for std::sync::Arc<T> {
    async fn call(&self, method: &str, params: Value) -> Result<Value, UpstreamError> {
        (**self).call(method, params).await
    }
}

/// Narrows a task listing by application identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub app: Option<String>,
}

impl TaskFilter {
    pub fn for_app(app: &str) -> Self {
        Self {
            app: Some(app.to_string()),
        }
    }
}

#[async_trait]
pub trait TaskService: Send + Sync {
    /// Unfiltered calls list every record; the caller uses that as the
    /// fallback when a filtered result comes back empty.
    async fn list_tasks(&self, filter: Option<&TaskFilter>)
        -> Result<Vec<TaskRecord>, UpstreamError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentQuery {
    pub include_disabled: bool,
    pub limit: usize,
}

impl Default for AgentQuery {
    fn default() -> Self {
        Self {
            include_disabled: false,
            limit: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorklogQuery {
    pub agent_id: String,
    pub owner_session_id: String,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoQuery {
    pub agent_id: String,
    pub owner_session_id: Option<String>,
    pub include_closed: bool,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubAgentQuery {
    pub agent_id: String,
    pub include_disabled: bool,
    pub limit: usize,
}

#[async_trait]
pub trait AgentDirectory: Send + Sync {
    async fn list_agents(&self, query: &AgentQuery) -> Result<Vec<Agent>, UpstreamError>;
    async fn list_agent_sessions(
        &self,
        agent_id: &str,
        limit: usize,
    ) -> Result<Vec<AgentSession>, UpstreamError>;
    async fn get_agent_session(
        &self,
        agent_id: &str,
        session_id: &str,
    ) -> Result<Option<AgentSession>, UpstreamError>;
    async fn list_workspace_worklogs(
        &self,
        query: &WorklogQuery,
    ) -> Result<Vec<WorkLogEntry>, UpstreamError>;
    async fn list_workspace_todos(&self, query: &TodoQuery) -> Result<Vec<Todo>, UpstreamError>;
    async fn list_workspace_sub_agents(
        &self,
        query: &SubAgentQuery,
    ) -> Result<Vec<Agent>, UpstreamError>;
}

/// Task listing over a raw transport. Accepts either a bare array or an
/// `{items}` envelope; individual malformed records are skipped.
pub struct RpcTaskService<T> {
    transport: T,
}

impl<T: RpcTransport> RpcTaskService<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl<T: RpcTransport> TaskService for RpcTaskService<T> {
    async fn list_tasks(
        &self,
        filter: Option<&TaskFilter>,
    ) -> Result<Vec<TaskRecord>, UpstreamError> {
        let method = "list_tasks";
        let params = match filter.and_then(|f| f.app.as_deref()) {
            Some(app) => json!({ "app_name": app }),
            None => json!({}),
        };
        let response = self.transport.call(method, params).await?;
        let rows = collection_items(&response).ok_or_else(|| UpstreamError::malformed(method))?;
        Ok(rows.iter().filter_map(TaskRecord::from_value).collect())
    }
}

/// Agent directory over a raw transport. Every method returns an `{items}`
/// envelope of loosely-shaped objects.
pub struct RpcAgentDirectory<T> {
    transport: T,
}

impl<T: RpcTransport> RpcAgentDirectory<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    async fn items(&self, method: &str, params: Value) -> Result<Vec<Value>, UpstreamError> {
        let response = self.transport.call(method, params).await?;
        collection_items(&response)
            .map(<[Value]>::to_vec)
            .ok_or_else(|| UpstreamError::malformed(method))
    }
}

#[async_trait]
impl<T: RpcTransport> AgentDirectory for RpcAgentDirectory<T> {
    async fn list_agents(&self, query: &AgentQuery) -> Result<Vec<Agent>, UpstreamError> {
        let rows = self
            .items(
                "list_agents",
                json!({
                    "include_disabled": query.include_disabled,
                    "limit": query.limit,
                }),
            )
            .await?;
        Ok(rows.iter().filter_map(Agent::from_value).collect())
    }

    async fn list_agent_sessions(
        &self,
        agent_id: &str,
        limit: usize,
    ) -> Result<Vec<AgentSession>, UpstreamError> {
        let rows = self
            .items(
                "list_agent_sessions",
                json!({ "agent_id": agent_id, "limit": limit }),
            )
            .await?;
        Ok(rows.iter().filter_map(AgentSession::from_value).collect())
    }

    async fn get_agent_session(
        &self,
        agent_id: &str,
        session_id: &str,
    ) -> Result<Option<AgentSession>, UpstreamError> {
        let response = self
            .transport
            .call(
                "get_agent_session",
                json!({ "agent_id": agent_id, "session_id": session_id }),
            )
            .await?;
        Ok(AgentSession::from_value(&response))
    }

    async fn list_workspace_worklogs(
        &self,
        query: &WorklogQuery,
    ) -> Result<Vec<WorkLogEntry>, UpstreamError> {
        let rows = self
            .items(
                "list_workspace_worklogs",
                json!({
                    "agent_id": query.agent_id,
                    "owner_session_id": query.owner_session_id,
                    "limit": query.limit,
                }),
            )
            .await?;
        Ok(rows.iter().filter_map(WorkLogEntry::from_value).collect())
    }

    async fn list_workspace_todos(&self, query: &TodoQuery) -> Result<Vec<Todo>, UpstreamError> {
        let rows = self
            .items(
                "list_workspace_todos",
                json!({
                    "agent_id": query.agent_id,
                    "owner_session_id": query.owner_session_id,
                    "include_closed": query.include_closed,
                    "limit": query.limit,
                }),
            )
            .await?;
        Ok(rows.iter().filter_map(Todo::from_value).collect())
    }

    async fn list_workspace_sub_agents(
        &self,
        query: &SubAgentQuery,
    ) -> Result<Vec<Agent>, UpstreamError> {
        let rows = self
            .items(
                "list_workspace_sub_agents",
                json!({
                    "agent_id": query.agent_id,
                    "include_disabled": query.include_disabled,
                    "limit": query.limit,
                }),
            )
            .await?;
        Ok(rows.iter().filter_map(Agent::from_value).collect())
    }
}

fn collection_items(response: &Value) -> Option<&[Value]> {
    if let Some(rows) = response.as_array() {
        return Some(rows);
    }
    response
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct CannedTransport {
        calls: Mutex<Vec<(String, Value)>>,
        response: Value,
    }

    impl CannedTransport {
        fn new(response: Value) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                response,
            }
        }
    }

    #[async_trait]
    impl RpcTransport for CannedTransport {
        async fn call(&self, method: &str, params: Value) -> Result<Value, UpstreamError> {
            self.calls
                .lock()
                .expect("lock")
                .push((method.to_string(), params));
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn task_listing_unwraps_envelopes_and_skips_malformed_rows() {
        let service = RpcTaskService::new(CannedTransport::new(json!({
            "items": [
                {"id": "t1", "status": "Running"},
                {"status": "no id, dropped"},
                {"id": 2},
            ],
        })));
        let records = service
            .list_tasks(Some(&TaskFilter::for_app("agent-main-001")))
            .await
            .expect("records");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "t1");
        assert_eq!(records[1].id, "2");
    }

    #[tokio::test]
    async fn task_filter_becomes_an_app_name_param() {
        let transport = CannedTransport::new(json!([]));
        {
            let service = RpcTaskService::new(&transport);
            service
                .list_tasks(Some(&TaskFilter::for_app("agent-x")))
                .await
                .expect("ok");
            service.list_tasks(None).await.expect("ok");
        }
        let calls = transport.calls.lock().expect("lock");
        assert_eq!(calls[0].1, json!({"app_name": "agent-x"}));
        assert_eq!(calls[1].1, json!({}));
    }

    #[tokio::test]
    async fn non_collection_response_is_malformed() {
        let service = RpcTaskService::new(CannedTransport::new(json!("oops")));
        let err = service.list_tasks(None).await.expect_err("malformed");
        assert_eq!(err, UpstreamError::malformed("list_tasks"));
    }

    #[tokio::test]
    async fn directory_normalizes_agents_from_items() {
        let directory = RpcAgentDirectory::new(CannedTransport::new(json!({
            "items": [
                {"agent_id": "agent-main-001", "status": "running"},
                {"id": "agent-sub-001", "parent_agent_id": "agent-main-001"},
                {"name": "no id"},
            ],
        })));
        let agents = directory
            .list_agents(&AgentQuery::default())
            .await
            .expect("agents");
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[0].agent_id, "agent-main-001");
    }

    #[tokio::test]
    async fn single_session_lookup_normalizes_the_response() {
        let transport = CannedTransport::new(json!({
            "id": "sess-1",
            "agent_id": "agent-main-001",
            "title": "Planning",
            "created_at": 1000,
            "updated_at": 2000,
        }));
        let directory = RpcAgentDirectory::new(&transport);
        let session = directory
            .get_agent_session("agent-main-001", "sess-1")
            .await
            .expect("call")
            .expect("session");
        assert_eq!(session.session_id, "sess-1");
        assert_eq!(session.owner_agent, "agent-main-001");
        assert_eq!(session.last_activity_at, session.updated_at);

        let calls = transport.calls.lock().expect("lock");
        assert_eq!(
            calls[0].1,
            json!({"agent_id": "agent-main-001", "session_id": "sess-1"})
        );
    }

    #[tokio::test]
    async fn missing_session_comes_back_as_none_not_an_error() {
        let directory = RpcAgentDirectory::new(CannedTransport::new(json!(null)));
        let session = directory
            .get_agent_session("agent-main-001", "sess-gone")
            .await
            .expect("call");
        assert!(session.is_none());

        // An id-less stub body is just as absent.
        let directory = RpcAgentDirectory::new(CannedTransport::new(json!({"title": "x"})));
        assert!(directory
            .get_agent_session("agent-main-001", "sess-gone")
            .await
            .expect("call")
            .is_none());
    }
}
