use thiserror::Error;
use tracing::debug;

use crate::conduit::{Conduit, ConduitError};
use crate::entities::{ManiphestTask, TaskQuery};

#[derive(Debug, Clone, PartialEq)]
pub struct TaskTree {
    pub task: ManiphestTask,
    pub children: Vec<TaskTree>,
}

impl TaskTree {
    pub fn leaf(task: ManiphestTask) -> Self {
        Self {
            task,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.task.id
    }

    /// Number of nodes in this subtree, including itself.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TaskTree::node_count).sum::<usize>()
    }
}

#[derive(Debug, Error)]
pub enum TreeError {
    #[error(transparent)]
    Conduit(#[from] ConduitError),
    #[error("dependency cycle detected: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },
}

/// Sort a forest level by task id. Stable, so equal ids keep their input order.
pub fn sort_forest(forest: &mut [TaskTree]) {
    forest.sort_by_key(TaskTree::id);
}

/// Expands dependencies recursively; dependency queries are always open-only.
pub struct TreeBuilder<'a, C: Conduit + ?Sized> {
    conduit: &'a C,
}

struct PathEntry {
    phid: String,
    name: String,
}

impl<'a, C: Conduit + ?Sized> TreeBuilder<'a, C> {
    pub fn new(conduit: &'a C) -> Self {
        Self { conduit }
    }

    pub fn build(&self, query: &TaskQuery) -> Result<Vec<TaskTree>, TreeError> {
        let mut path = Vec::new();
        self.expand(query, &mut path)
    }

    fn expand(
        &self,
        query: &TaskQuery,
        path: &mut Vec<PathEntry>,
    ) -> Result<Vec<TaskTree>, TreeError> {
        let tasks = self.conduit.maniphest_query(query)?;
        let mut forest = Vec::with_capacity(tasks.len());

        for task in tasks {
            if let Some(start) = path.iter().position(|entry| entry.phid == task.phid) {
                let mut cycle: Vec<String> =
                    path[start..].iter().map(|entry| entry.name.clone()).collect();
                cycle.push(display_name(&task));
                return Err(TreeError::Cycle { path: cycle });
            }

            let mut node = TaskTree::leaf(task);
            if !node.task.depends_on_task_phids.is_empty() {
                debug!(
                    task = %node.task.object_name,
                    depends_on = ?node.task.depends_on_task_phids,
                    "task has dependant tasks"
                );
                let deps = TaskQuery::dependencies(node.task.depends_on_task_phids.clone());
                path.push(PathEntry {
                    phid: node.task.phid.clone(),
                    name: display_name(&node.task),
                });
                let children = self.expand(&deps, path);
                path.pop();
                node.children = children?;
            }
            forest.push(node);
        }

        sort_forest(&mut forest);
        Ok(forest)
    }
}

fn display_name(task: &ManiphestTask) -> String {
    if task.object_name.is_empty() {
        task.phid.clone()
    } else {
        task.object_name.clone()
    }
}
