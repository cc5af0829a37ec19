use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::conduit::{Conduit, ConduitError};
use crate::entities::{PhidLookupResult, Project, User};
use crate::error::{EntityKind, MultiError, NotFound};

/// Outcome of one batched lookup: what was found (keyed by the service's canonical name)
/// and one [`NotFound`] per requested name that had no entry.
#[derive(Debug)]
pub struct Resolution<T> {
    pub found: HashMap<String, T>,
    pub missing: MultiError<NotFound>,
}

impl<T> Resolution<T> {
    pub fn empty() -> Self {
        Self {
            found: HashMap::new(),
            missing: MultiError::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn into_result(self) -> Result<HashMap<String, T>, MultiError<NotFound>> {
        self.missing.into_result(self.found)
    }
}

/// Resolves names through one injected conduit handle.
pub struct Resolver<'a, C: Conduit + ?Sized> {
    conduit: &'a C,
}

impl<'a, C: Conduit + ?Sized> Resolver<'a, C> {
    pub fn new(conduit: &'a C) -> Self {
        Self { conduit }
    }

    /// Object names such as `T123` via `phid.lookup`.
    pub fn tasks(&self, names: &[String]) -> Result<Resolution<PhidLookupResult>, ConduitError> {
        let wanted = distinct_names(names);
        if wanted.is_empty() {
            return Ok(Resolution::empty());
        }
        let found = self.conduit.phid_lookup(&wanted)?;
        debug!(requested = wanted.len(), found = found.len(), "looked up names");
        let missing = compare(EntityKind::Task, &wanted, &found);
        Ok(Resolution { found, missing })
    }

    pub fn projects(&self, names: &[String]) -> Result<Resolution<Project>, ConduitError> {
        let wanted = distinct_names(names);
        if wanted.is_empty() {
            return Ok(Resolution::empty());
        }
        let found: HashMap<String, Project> = self
            .conduit
            .project_query(&wanted)?
            .into_iter()
            .map(|project| (project.name.clone(), project))
            .collect();
        debug!(requested = wanted.len(), found = found.len(), "looked up projects");
        let missing = compare(EntityKind::Project, &wanted, &found);
        Ok(Resolution { found, missing })
    }

    pub fn users(&self, usernames: &[String]) -> Result<Resolution<User>, ConduitError> {
        let wanted = distinct_names(usernames);
        if wanted.is_empty() {
            return Ok(Resolution::empty());
        }
        let found: HashMap<String, User> = self
            .conduit
            .user_query(&wanted)?
            .into_iter()
            .map(|user| (user.user_name.clone(), user))
            .collect();
        debug!(requested = wanted.len(), found = found.len(), "looked up users");
        let missing = compare(EntityKind::User, &wanted, &found);
        Ok(Resolution { found, missing })
    }
}

/// One [`NotFound`] per requested name absent from `found`, in request order.
pub fn compare<T>(
    kind: EntityKind,
    requested: &[String],
    found: &HashMap<String, T>,
) -> MultiError<NotFound> {
    requested
        .iter()
        .filter(|name| !found.contains_key(name.as_str()))
        .map(|name| NotFound {
            kind,
            name: name.clone(),
        })
        .collect()
}

/// Trimmed, non-empty, first-occurrence-ordered names.
pub fn distinct_names(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.to_string()))
        .map(str::to_string)
        .collect()
}

/// Split a comma separated flag value into names.
pub fn split_names(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
