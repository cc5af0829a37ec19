use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::conduit::{Conduit, ConduitError};
use crate::entities::{CreateTaskRequest, ManiphestTask, Project, TaskAuxiliary, User};
use crate::error::{EntityKind, MultiError, NotFound};
use crate::recipients::{BulkConfig, RecipientEntry};
use crate::resolve::{distinct_names, Resolver};
use crate::template::{TaskTemplates, TemplateContext, TemplateError};

/// Above this many CC'd users a committed task gets a warning.
pub const CC_WARNING_THRESHOLD: usize = 30;

const TASK_TYPE: &str = "task";

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum Mode {
    /// Resolve and render everything, log the intent, create nothing.
    #[default]
    DryRun,
    Commit,
}

#[derive(Debug, Error)]
pub enum BulkError {
    #[error(transparent)]
    Conduit(#[from] ConduitError),
    #[error(transparent)]
    NotFound(#[from] MultiError<NotFound>),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("no users specified to create task")]
    NoUsersSpecified,
    #[error("no project specified to create task")]
    NoProjectSpecified,
}

#[derive(Debug, Error)]
#[error("failed for entry {owner:?}: {source}")]
pub struct EntryError {
    pub owner: String,
    #[source]
    pub source: BulkError,
}

#[derive(Debug, Error)]
pub enum BulkRunError {
    #[error("failed to resolve common projects and users: {0}")]
    Conduit(#[from] ConduitError),
    #[error(transparent)]
    Shared(MultiError<NotFound>),
    #[error(transparent)]
    Entries(MultiError<EntryError>),
}

/// Everything needed to create one task, fully resolved and rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTask {
    pub owner: String,
    pub owner_phid: String,
    pub title: String,
    pub description: String,
    pub project_names: Vec<String>,
    pub project_phids: Vec<String>,
    pub cc_usernames: Vec<String>,
    pub cc_phids: Vec<String>,
}

impl PlannedTask {
    pub fn to_request(&self) -> CreateTaskRequest {
        CreateTaskRequest {
            title: self.title.clone(),
            description: self.description.clone(),
            owner_phid: self.owner_phid.clone(),
            cc_phids: self.cc_phids.clone(),
            project_phids: self.project_phids.clone(),
            auxiliary: TaskAuxiliary {
                task_type: TASK_TYPE.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    Planned(PlannedTask),
    Created {
        plan: PlannedTask,
        task: ManiphestTask,
    },
}

struct Shared {
    projects: Vec<Project>,
    users: Vec<User>,
}

/// Creates one task per recipient entry. Shared names are resolved once; a failing
/// entry is logged and collected while the rest still run.
pub struct BulkCreator<'a, C: Conduit + ?Sized> {
    conduit: &'a C,
    mode: Mode,
}

impl<'a, C: Conduit + ?Sized> BulkCreator<'a, C> {
    pub fn new(conduit: &'a C, mode: Mode) -> Self {
        Self { conduit, mode }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn create_all(&self, config: &BulkConfig) -> Result<Vec<EntryOutcome>, BulkRunError> {
        let resolver = Resolver::new(self.conduit);

        let projects = resolver.projects(&config.common_projects)?;
        let users = resolver.users(&config.common_cc_users)?;
        let mut missing = MultiError::new();
        missing.extend(projects.missing);
        missing.extend(users.missing);
        if !missing.is_empty() {
            error!(error = %missing, "errors looking up common projects and users");
            return Err(BulkRunError::Shared(missing));
        }
        let shared = Shared {
            projects: in_request_order(&config.common_projects, projects.found),
            users: in_request_order(&config.common_cc_users, users.found),
        };
        info!(
            users = ?shared.users.iter().map(|u| u.user_name.as_str()).collect::<Vec<_>>(),
            "common users"
        );

        let mut outcomes = Vec::with_capacity(config.emails.len());
        let mut errors = MultiError::new();
        for entry in &config.emails {
            match self.create_entry(&resolver, config, &shared, entry) {
                Ok(outcome) => outcomes.push(outcome),
                Err(source) => {
                    error!(owner = %entry.owner, error = %source, "failed to create task");
                    errors.push(EntryError {
                        owner: entry.owner.clone(),
                        source,
                    });
                }
            }
        }
        errors.into_result(outcomes).map_err(BulkRunError::Entries)
    }

    fn create_entry(
        &self,
        resolver: &Resolver<'_, C>,
        config: &BulkConfig,
        shared: &Shared,
        entry: &RecipientEntry,
    ) -> Result<EntryOutcome, BulkError> {
        let templates = TaskTemplates::compile(&config.title_template, &config.task_template)?;

        let entry_projects = resolver.projects(&entry.projects)?;
        let entry_users = resolver.users(&entry.cc_users)?;
        let owner = resolver.users(std::slice::from_ref(&entry.owner))?;

        let mut missing = MultiError::new();
        missing.extend(entry_projects.missing);
        missing.extend(entry_users.missing);
        missing.extend(owner.missing);
        if !missing.is_empty() {
            return Err(BulkError::NotFound(missing));
        }
        let entry_projects = entry_projects.found;
        let entry_users = entry_users.found;
        debug!(owner = %entry.owner, users = entry_users.len(), "entry users");

        let owner = owner
            .found
            .into_values()
            .next()
            .ok_or_else(|| owner_not_found(&entry.owner))?;
        debug!(owner = %owner.user_name, phid = %owner.phid, "owner user found");

        let rendered = templates.render(&TemplateContext::from(entry))?;

        let projects: Vec<Project> = shared
            .projects
            .iter()
            .cloned()
            .chain(in_request_order(&entry.projects, entry_projects))
            .collect();
        let users: Vec<User> = shared
            .users
            .iter()
            .cloned()
            .chain(in_request_order(&entry.cc_users, entry_users))
            .collect();

        let plan = PlannedTask {
            owner: entry.owner.clone(),
            owner_phid: owner.phid,
            title: rendered.title,
            description: rendered.description,
            project_names: projects.iter().map(|p| p.name.clone()).collect(),
            project_phids: projects.into_iter().map(|p| p.phid).collect(),
            cc_usernames: users.iter().map(|u| u.user_name.clone()).collect(),
            cc_phids: users
                .into_iter()
                .map(|u| u.phid)
                .filter(|phid| !phid.is_empty())
                .collect(),
        };

        if plan.cc_phids.is_empty() {
            return Err(BulkError::NoUsersSpecified);
        }
        if plan.project_phids.is_empty() {
            return Err(BulkError::NoProjectSpecified);
        }

        match self.mode {
            Mode::DryRun => {
                info!(
                    owner = %plan.owner,
                    projects = ?plan.project_names,
                    users = ?plan.cc_usernames,
                    title = %plan.title,
                    description = %plan.description,
                    "DRY RUN"
                );
                Ok(EntryOutcome::Planned(plan))
            }
            Mode::Commit => {
                let task = self.conduit.create_task(&plan.to_request())?;
                if plan.cc_phids.len() > CC_WARNING_THRESHOLD {
                    warn!(
                        id = task.id,
                        task = %task.object_name,
                        cc_count = plan.cc_phids.len(),
                        "more than 30 users cc'd on the task"
                    );
                }
                info!(
                    owner = %plan.owner,
                    title = %plan.title,
                    task = %task.object_name,
                    "created task for user"
                );
                Ok(EntryOutcome::Created { plan, task })
            }
        }
    }
}

fn owner_not_found(owner: &str) -> BulkError {
    BulkError::NotFound(
        std::iter::once(NotFound {
            kind: EntityKind::User,
            name: owner.to_string(),
        })
        .collect(),
    )
}

/// Values of `found` following the order names were requested in; duplicates collapse.
fn in_request_order<T>(requested: &[String], mut found: HashMap<String, T>) -> Vec<T> {
    let mut ordered: Vec<T> = distinct_names(requested)
        .iter()
        .filter_map(|name| found.remove(name))
        .collect();
    // Canonical names that differ from the request (e.g. case) go last, sorted.
    let mut rest: Vec<(String, T)> = found.into_iter().collect();
    rest.sort_by(|a, b| a.0.cmp(&b.0));
    ordered.extend(rest.into_iter().map(|(_, value)| value));
    ordered
}
