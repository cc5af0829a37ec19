use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// One entry of a `phid.lookup` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhidLookupResult {
    pub phid: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub type_name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub status: String,
}

impl PhidLookupResult {
    pub fn is_task(&self) -> bool {
        self.kind.eq_ignore_ascii_case("TASK")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default, deserialize_with = "numeric_id")]
    pub id: u64,
    pub phid: String,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub slugs: Vec<String>,
}

/// `project.query` wraps its projects in a PHID-keyed `data` map.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectQueryResponse {
    #[serde(default, deserialize_with = "map_or_empty_list")]
    pub data: HashMap<String, Project>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub phid: String,
    pub user_name: String,
    #[serde(default)]
    pub real_name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// A Maniphest task as returned by `maniphest.query` and `maniphest.createtask`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManiphestTask {
    /// Monotonic creation sequence; the ordering key for every display.
    #[serde(deserialize_with = "numeric_id")]
    pub id: u64,
    pub phid: String,
    #[serde(default)]
    pub object_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub status_name: String,
    #[serde(default)]
    pub is_closed: bool,
    #[serde(default)]
    pub priority: String,
    #[serde(default, rename = "ownerPHID")]
    pub owner_phid: Option<String>,
    #[serde(default, rename = "projectPHIDs")]
    pub project_phids: Vec<String>,
    #[serde(default)]
    pub uri: String,
    #[serde(default, rename = "dependsOnTaskPHIDs")]
    pub depends_on_task_phids: Vec<String>,
}

/// Server-side status constraint for `maniphest.query`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "status-any")]
    Any,
    #[default]
    #[serde(rename = "status-open")]
    Open,
    #[serde(rename = "status-closed")]
    Closed,
    #[serde(rename = "status-resolved")]
    Resolved,
    #[serde(rename = "status-wontfix")]
    WontFix,
    #[serde(rename = "status-invalid")]
    Invalid,
    #[serde(rename = "status-spite")]
    Spite,
    #[serde(rename = "status-duplicate")]
    Duplicate,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Any => "status-any",
            TaskStatus::Open => "status-open",
            TaskStatus::Closed => "status-closed",
            TaskStatus::Resolved => "status-resolved",
            TaskStatus::WontFix => "status-wontfix",
            TaskStatus::Invalid => "status-invalid",
            TaskStatus::Spite => "status-spite",
            TaskStatus::Duplicate => "status-duplicate",
        }
    }

    /// Accepts both the short CLI spelling (`open`) and the wire constant (`status-open`).
    pub fn parse(value: &str) -> Option<Self> {
        let lc = value.trim().to_lowercase();
        let short = lc.strip_prefix("status-").unwrap_or(&lc);
        match short {
            "any" => Some(TaskStatus::Any),
            "open" => Some(TaskStatus::Open),
            "closed" => Some(TaskStatus::Closed),
            "resolved" => Some(TaskStatus::Resolved),
            "wontfix" => Some(TaskStatus::WontFix),
            "invalid" => Some(TaskStatus::Invalid),
            "spite" => Some(TaskStatus::Spite),
            "duplicate" => Some(TaskStatus::Duplicate),
            _ => None,
        }
    }
}

/// Constraint set for `maniphest.query`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskQuery {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub phids: Vec<String>,
    #[serde(rename = "projectPHIDs", skip_serializing_if = "Vec::is_empty")]
    pub project_phids: Vec<String>,
    pub status: TaskStatus,
}

impl TaskQuery {
    pub fn for_projects(project_phids: Vec<String>, status: TaskStatus) -> Self {
        Self {
            phids: Vec::new(),
            project_phids,
            status,
        }
    }

    pub fn for_tasks(phids: Vec<String>, status: TaskStatus) -> Self {
        Self {
            phids,
            project_phids: Vec::new(),
            status,
        }
    }

    /// Query used when expanding a task's dependencies: always open-only.
    pub fn dependencies(phids: Vec<String>) -> Self {
        Self::for_tasks(phids, TaskStatus::Open)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskAuxiliary {
    #[serde(rename = "std:maniphest:task_type")]
    pub task_type: String,
}

/// Body of `maniphest.createtask`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: String,
    #[serde(rename = "ownerPHID")]
    pub owner_phid: String,
    #[serde(rename = "ccPHIDs")]
    pub cc_phids: Vec<String>,
    #[serde(rename = "projectPHIDs")]
    pub project_phids: Vec<String>,
    pub auxiliary: TaskAuxiliary,
}

fn numeric_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(text) => text
            .trim()
            .parse::<u64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid numeric id: {text:?}"))),
    }
}

// Conduit encodes an empty map as `[]`.
fn map_or_empty_list<'de, D, V>(deserializer: D) -> Result<HashMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<V> {
        Map(HashMap<String, V>),
        List(Vec<serde_json::Value>),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Map(map) => Ok(map),
        Raw::List(items) if items.is_empty() => Ok(HashMap::new()),
        Raw::List(_) => Err(serde::de::Error::custom("expected an object keyed by PHID")),
    }
}

/// Decode a name- or PHID-keyed object. Conduit encodes an empty map as `[]`.
pub fn keyed_map<T>(value: serde_json::Value) -> Result<HashMap<String, T>, serde_json::Error>
where
    T: DeserializeOwned,
{
    match value {
        serde_json::Value::Null => Ok(HashMap::new()),
        serde_json::Value::Array(items) if items.is_empty() => Ok(HashMap::new()),
        other => serde_json::from_value(other),
    }
}

/// Values of a PHID-keyed object, in no particular order.
pub fn phid_keyed_values<T>(value: serde_json::Value) -> Result<Vec<T>, serde_json::Error>
where
    T: DeserializeOwned,
{
    Ok(keyed_map(value)?.into_values().collect())
}
