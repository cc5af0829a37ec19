use thiserror::Error;
use tracing::{debug, error, warn};

use crate::conduit::{Conduit, ConduitError};
use crate::entities::{TaskQuery, TaskStatus};
use crate::error::{MultiError, NotFound};
use crate::resolve::Resolver;
use crate::tree::{TaskTree, TreeBuilder, TreeError};

#[derive(Debug, Error)]
pub enum ListError {
    #[error(transparent)]
    Conduit(#[from] ConduitError),
    #[error(transparent)]
    NotFound(#[from] MultiError<NotFound>),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

#[derive(Debug, Clone, Default)]
pub struct ListRequest {
    pub projects: Vec<String>,
    pub tasks: Vec<String>,
    /// Status filter for the top-level queries; dependencies are always open-only.
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Default)]
pub struct Listing {
    /// Names of the projects that were found, sorted.
    pub projects: Vec<String>,
    /// Tasks across all found projects.
    pub project_tasks: Vec<TaskTree>,
    /// Trees for the individually requested task names.
    pub named_tasks: Vec<TaskTree>,
}

/// Gather everything `inam list` prints.
///
/// Missing projects are logged and skipped as long as at least one project resolved;
/// if none did, the aggregate not-found error is returned before any task query.
/// Missing task names always fail.
pub fn collect<C: Conduit + ?Sized>(
    conduit: &C,
    request: &ListRequest,
) -> Result<Listing, ListError> {
    let resolver = Resolver::new(conduit);
    let builder = TreeBuilder::new(conduit);
    let mut listing = Listing::default();

    if !request.projects.is_empty() {
        let resolution = resolver.projects(&request.projects)?;
        if !resolution.is_complete() {
            error!(error = %resolution.missing, "errors looking up projects");
            if resolution.found.is_empty() {
                return Err(resolution.missing.into());
            }
        }

        let mut found: Vec<_> = resolution.found.into_values().collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        for project in &found {
            debug!(phid = %project.phid, name = %project.name, "project found");
        }
        listing.projects = found.iter().map(|p| p.name.clone()).collect();

        let phids = found.into_iter().map(|p| p.phid).collect();
        listing.project_tasks = builder.build(&TaskQuery::for_projects(phids, request.status))?;
    }

    if !request.tasks.is_empty() {
        let found = resolver.tasks(&request.tasks)?.into_result()?;
        let mut results: Vec<_> = found.into_iter().collect();
        results.sort_by(|a, b| a.0.cmp(&b.0));

        for (name, result) in results {
            if !result.is_task() {
                warn!(name = %name, kind = %result.kind, "not a task, skipping");
                continue;
            }
            let trees =
                builder.build(&TaskQuery::for_tasks(vec![result.phid], request.status))?;
            listing.named_tasks.extend(trees);
        }
    }

    Ok(listing)
}
