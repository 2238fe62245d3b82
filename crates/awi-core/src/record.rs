use crate::status::RecordStatus;
use crate::value::{coerce_str, coerce_timestamp, pluck, pluck_i64, pluck_str, pluck_timestamp};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// One snapshot of an upstream task record. The payload has no fixed
/// schema; every read goes through the `value` primitives.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub id: String,
    pub name: String,
    pub task_type: String,
    pub app_name: String,
    pub status: RecordStatus,
    pub parent_id: Option<String>,
    pub root_id: Option<String>,
    pub data: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    /// Lenient construction from whatever the task listing service returned.
    /// A record without an identifier is unusable and yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let id = object.get("id").and_then(coerce_str)?;

        let created_at = object
            .get("created_at")
            .and_then(coerce_timestamp)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let updated_at = object
            .get("updated_at")
            .and_then(coerce_timestamp)
            .unwrap_or(created_at);

        Some(Self {
            id,
            name: object
                .get("name")
                .and_then(coerce_str)
                .unwrap_or_default(),
            task_type: object
                .get("task_type")
                .and_then(coerce_str)
                .unwrap_or_default(),
            app_name: object
                .get("app_name")
                .and_then(coerce_str)
                .unwrap_or_default(),
            status: object
                .get("status")
                .and_then(coerce_str)
                .map(|s| RecordStatus::parse(&s))
                .unwrap_or(RecordStatus::Queued),
            parent_id: object.get("parent_id").and_then(coerce_str),
            root_id: object.get("root_id").and_then(coerce_str),
            data: object.get("data").cloned().map(unwrap_payload),
            created_at,
            updated_at,
        })
    }

    pub fn payload(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn payload_value(&self, path: &str) -> Option<&Value> {
        self.payload().and_then(|data| pluck(data, path))
    }

    pub fn payload_str(&self, path: &str) -> Option<String> {
        self.payload().and_then(|data| pluck_str(data, path))
    }

    pub fn payload_i64(&self, path: &str) -> Option<i64> {
        self.payload().and_then(|data| pluck_i64(data, path))
    }

    pub fn payload_timestamp(&self, path: &str) -> Option<DateTime<Utc>> {
        self.payload().and_then(|data| pluck_timestamp(data, path))
    }

    /// Next hop of the ancestor chain: parent first, root as fallback.
    pub fn ancestor_id(&self) -> Option<&str> {
        self.parent_id.as_deref().or(self.root_id.as_deref())
    }
}

/// Some producers double-encode the payload as a JSON string.
fn unwrap_payload(data: Value) -> Value {
    match data {
        Value::String(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        other => other,
    }
}
