#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex};

use inam_core::conduit::{Conduit, ConduitError};
use inam_core::entities::{
    CreateTaskRequest, ManiphestTask, PhidLookupResult, Project, TaskQuery, TaskStatus, User,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    PhidLookup(Vec<String>),
    ProjectQuery(Vec<String>),
    ManiphestQuery(TaskQuery),
    UserQuery(Vec<String>),
    CreateTask(CreateTaskRequest),
}

/// In-memory conduit that answers from fixed data and records every call.
#[derive(Default)]
pub struct FakeConduit {
    pub lookups: HashMap<String, PhidLookupResult>,
    pub projects: Vec<Project>,
    pub tasks: Vec<ManiphestTask>,
    pub users: Vec<User>,
    /// Fail any call to this method name.
    pub fail_method: Option<&'static str>,
    /// Fail `maniphest.query` calls that ask for this PHID.
    pub fail_task_phid: Option<String>,
    calls: RefCell<Vec<Call>>,
}

impl FakeConduit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(mut self, tasks: Vec<ManiphestTask>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn with_projects(mut self, names: &[&str]) -> Self {
        self.projects.extend(names.iter().map(|name| project(name)));
        self
    }

    pub fn with_users(mut self, names: &[&str]) -> Self {
        self.users.extend(names.iter().map(|name| user(name)));
        self
    }

    pub fn with_lookup(mut self, name: &str, phid: &str, kind: &str) -> Self {
        self.lookups.insert(
            name.to_string(),
            PhidLookupResult {
                phid: phid.to_string(),
                kind: kind.to_string(),
                name: name.to_string(),
                ..Default::default()
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn task_queries(&self) -> Vec<TaskQuery> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::ManiphestQuery(query) => Some(query.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn created(&self) -> Vec<CreateTaskRequest> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::CreateTask(req) => Some(req.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, method: &'static str, call: Call) -> Result<(), ConduitError> {
        self.calls.borrow_mut().push(call);
        if self.fail_method == Some(method) {
            return Err(ConduitError::Api {
                code: "ERR-CONDUIT-CORE".to_string(),
                info: format!("{method} exploded"),
            });
        }
        Ok(())
    }
}

fn status_matches(status: TaskStatus, task: &ManiphestTask) -> bool {
    match status {
        TaskStatus::Any => true,
        TaskStatus::Open => !task.is_closed,
        TaskStatus::Closed => task.is_closed,
        other => other.as_str().trim_start_matches("status-") == task.status,
    }
}

impl Conduit for FakeConduit {
    fn phid_lookup(
        &self,
        names: &[String],
    ) -> Result<HashMap<String, PhidLookupResult>, ConduitError> {
        self.record("phid.lookup", Call::PhidLookup(names.to_vec()))?;
        Ok(self
            .lookups
            .iter()
            .filter(|(name, _)| names.contains(name))
            .map(|(name, result)| (name.clone(), result.clone()))
            .collect())
    }

    fn project_query(&self, names: &[String]) -> Result<Vec<Project>, ConduitError> {
        self.record("project.query", Call::ProjectQuery(names.to_vec()))?;
        Ok(self
            .projects
            .iter()
            .filter(|project| names.contains(&project.name))
            .cloned()
            .collect())
    }

    fn maniphest_query(&self, query: &TaskQuery) -> Result<Vec<ManiphestTask>, ConduitError> {
        self.record("maniphest.query", Call::ManiphestQuery(query.clone()))?;
        if let Some(phid) = &self.fail_task_phid {
            if query.phids.contains(phid) {
                return Err(ConduitError::Api {
                    code: "ERR-CONDUIT-CORE".to_string(),
                    info: format!("cannot load {phid}"),
                });
            }
        }
        let phids: HashSet<&String> = query.phids.iter().collect();
        Ok(self
            .tasks
            .iter()
            .filter(|task| phids.is_empty() || phids.contains(&task.phid))
            .filter(|task| {
                query.project_phids.is_empty()
                    || task
                        .project_phids
                        .iter()
                        .any(|p| query.project_phids.contains(p))
            })
            .filter(|task| status_matches(query.status, task))
            .cloned()
            .collect())
    }

    fn user_query(&self, usernames: &[String]) -> Result<Vec<User>, ConduitError> {
        self.record("user.query", Call::UserQuery(usernames.to_vec()))?;
        Ok(self
            .users
            .iter()
            .filter(|user| usernames.contains(&user.user_name))
            .cloned()
            .collect())
    }

    fn create_task(&self, request: &CreateTaskRequest) -> Result<ManiphestTask, ConduitError> {
        self.record("maniphest.createtask", Call::CreateTask(request.clone()))?;
        let id = 1000 + self.created().len() as u64;
        Ok(ManiphestTask {
            id,
            phid: format!("PHID-TASK-new{id}"),
            object_name: format!("T{id}"),
            title: request.title.clone(),
            description: request.description.clone(),
            ..Default::default()
        })
    }
}

pub fn task_phid(id: u64) -> String {
    format!("PHID-TASK-{id}")
}

pub fn task(id: u64, title: &str, deps: &[u64]) -> ManiphestTask {
    ManiphestTask {
        id,
        phid: task_phid(id),
        object_name: format!("T{id}"),
        title: title.to_string(),
        status: "open".to_string(),
        priority: "Normal".to_string(),
        depends_on_task_phids: deps.iter().map(|dep| task_phid(*dep)).collect(),
        ..Default::default()
    }
}

pub fn closed(mut task: ManiphestTask) -> ManiphestTask {
    task.is_closed = true;
    task.status = "resolved".to_string();
    task
}

pub fn in_project(mut task: ManiphestTask, project_name: &str) -> ManiphestTask {
    task.project_phids.push(project_phid(project_name));
    task
}

pub fn project_phid(name: &str) -> String {
    format!("PHID-PROJ-{}", name.to_lowercase().replace(' ', "-"))
}

pub fn project(name: &str) -> Project {
    Project {
        phid: project_phid(name),
        name: name.to_string(),
        ..Default::default()
    }
}

pub fn user_phid(name: &str) -> String {
    format!("PHID-USER-{name}")
}

pub fn user(name: &str) -> User {
    User {
        phid: user_phid(name),
        user_name: name.to_string(),
        real_name: name.to_uppercase(),
        ..Default::default()
    }
}

pub fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().expect("log buffer").clone();
        String::from_utf8(bytes).expect("utf8 logs")
    }
}

pub struct LogWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self
            .0
            .lock()
            .map_err(|_| io::Error::other("log buffer poisoned"))?;
        inner.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter(self.0.clone())
    }
}

/// Run `f` with a debug-level fmt subscriber and return its result plus everything logged.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, buffer.contents())
}
