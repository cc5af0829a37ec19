mod common;

use pretty_assertions::assert_eq;

use common::{closed, in_project, project_phid, task, task_phid, FakeConduit};
use inam_core::entities::{TaskQuery, TaskStatus};
use inam_core::tree::{TaskTree, TreeBuilder, TreeError};

fn ids(forest: &[TaskTree]) -> Vec<u64> {
    forest.iter().map(TaskTree::id).collect()
}

#[test]
fn task_without_dependencies_is_a_leaf_and_costs_one_call() {
    let conduit = FakeConduit::new().with_tasks(vec![task(100, "Fix bug", &[])]);
    let forest = TreeBuilder::new(&conduit)
        .build(&TaskQuery::for_tasks(vec![task_phid(100)], TaskStatus::Open))
        .expect("build");

    assert_eq!(ids(&forest), vec![100]);
    assert!(forest[0].children.is_empty());
    assert_eq!(conduit.calls().len(), 1);
}

#[test]
fn dependency_queries_are_narrowed_to_open() {
    let conduit = FakeConduit::new().with_tasks(vec![
        task(1, "root", &[2, 3]),
        task(2, "open dep", &[4]),
        closed(task(3, "closed dep", &[])),
        task(4, "grandchild", &[]),
    ]);
    let forest = TreeBuilder::new(&conduit)
        .build(&TaskQuery::for_tasks(vec![task_phid(1)], TaskStatus::Any))
        .expect("build");

    let queries = conduit.task_queries();
    assert_eq!(queries.len(), 3);
    assert_eq!(queries[0].status, TaskStatus::Any);
    assert!(queries[1..].iter().all(|q| q.status == TaskStatus::Open));
    assert_eq!(queries[1].phids, vec![task_phid(2), task_phid(3)]);

    assert_eq!(ids(&forest), vec![1]);
    assert_eq!(ids(&forest[0].children), vec![2]);
    assert_eq!(ids(&forest[0].children[0].children), vec![4]);
}

#[test]
fn every_level_is_sorted_by_id() {
    let conduit = FakeConduit::new().with_tasks(vec![
        in_project(task(30, "c", &[12, 11]), "Infra"),
        in_project(task(10, "a", &[]), "Infra"),
        in_project(task(20, "b", &[]), "Infra"),
        task(12, "dep b", &[]),
        task(11, "dep a", &[]),
    ]);
    let forest = TreeBuilder::new(&conduit)
        .build(&TaskQuery::for_projects(
            vec![project_phid("Infra")],
            TaskStatus::Open,
        ))
        .expect("build");

    assert_eq!(ids(&forest), vec![10, 20, 30]);
    assert_eq!(ids(&forest[2].children), vec![11, 12]);
}

#[test]
fn failure_deep_in_the_tree_fails_the_whole_build() {
    let mut conduit = FakeConduit::new().with_tasks(vec![
        task(1, "root", &[2]),
        task(2, "child", &[3]),
        task(3, "unreachable", &[]),
    ]);
    conduit.fail_task_phid = Some(task_phid(3));

    let err = TreeBuilder::new(&conduit)
        .build(&TaskQuery::for_tasks(vec![task_phid(1)], TaskStatus::Open))
        .unwrap_err();
    assert!(matches!(err, TreeError::Conduit(_)), "{err:?}");
    assert_eq!(err.to_string(), "ERR-CONDUIT-CORE: cannot load PHID-TASK-3");
}

#[test]
fn cycle_on_the_expansion_path_is_reported() {
    let conduit = FakeConduit::new().with_tasks(vec![task(1, "a", &[2]), task(2, "b", &[1])]);

    let err = TreeBuilder::new(&conduit)
        .build(&TaskQuery::for_tasks(vec![task_phid(1)], TaskStatus::Open))
        .unwrap_err();
    assert_eq!(err.to_string(), "dependency cycle detected: T1 -> T2 -> T1");
}

#[test]
fn self_dependency_is_a_cycle() {
    let conduit = FakeConduit::new().with_tasks(vec![task(7, "loop", &[7])]);
    let err = TreeBuilder::new(&conduit)
        .build(&TaskQuery::for_tasks(vec![task_phid(7)], TaskStatus::Open))
        .unwrap_err();
    assert!(matches!(err, TreeError::Cycle { .. }));
}

#[test]
fn shared_dependency_expands_under_each_parent() {
    let conduit = FakeConduit::new().with_tasks(vec![
        task(1, "root", &[2, 3]),
        task(2, "left", &[4]),
        task(3, "right", &[4]),
        task(4, "shared", &[]),
    ]);
    let forest = TreeBuilder::new(&conduit)
        .build(&TaskQuery::for_tasks(vec![task_phid(1)], TaskStatus::Open))
        .expect("diamond is not a cycle");

    let root = &forest[0];
    assert_eq!(ids(&root.children), vec![2, 3]);
    assert_eq!(ids(&root.children[0].children), vec![4]);
    assert_eq!(ids(&root.children[1].children), vec![4]);
    assert_eq!(root.node_count(), 5);
}
