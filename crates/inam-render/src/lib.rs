//! Terminal rendering of task dependency forests.
//!
//! ```text
//! T1: Ship release
//! ├── T2: HIGH   - Write changelog
//! │   └── T4: NORMAL - Collect PR titles
//! └── T3: LOW    - Tag build
//! ```
//!
//! Every level is re-sorted by task id here, independent of how the forest was built.

use inam_core::tree::TaskTree;

const BRANCH: &str = "├── ";
const CORNER: &str = "└── ";
const BAR: &str = "│   ";
const BLANK: &str = "    ";

/// Render each root (by ascending id) followed by its dependency subtree.
pub fn render_forest(forest: &[TaskTree]) -> String {
    let mut out = String::new();
    for tree in sorted(forest) {
        write_tree(tree, &mut out);
    }
    out
}

pub fn render_tree(tree: &TaskTree) -> String {
    let mut out = String::new();
    write_tree(tree, &mut out);
    out
}

fn write_tree(tree: &TaskTree, out: &mut String) {
    out.push_str(&format!("{}: {}\n", tree.task.object_name, tree.task.title));
    let mut last_flags = Vec::new();
    write_children(&tree.children, &mut last_flags, out);
}

fn write_children(children: &[TaskTree], last_flags: &mut Vec<bool>, out: &mut String) {
    let ordered = sorted(children);
    let count = ordered.len();
    for (idx, child) in ordered.into_iter().enumerate() {
        let last = idx + 1 == count;
        for ancestor_last in last_flags.iter() {
            out.push_str(if *ancestor_last { BLANK } else { BAR });
        }
        out.push_str(if last { CORNER } else { BRANCH });
        out.push_str(&child_line(child));
        out.push('\n');

        if !child.children.is_empty() {
            last_flags.push(last);
            write_children(&child.children, last_flags, out);
            last_flags.pop();
        }
    }
}

fn child_line(node: &TaskTree) -> String {
    format!(
        "{}: {:<6} - {}",
        node.task.object_name,
        node.task.priority.to_uppercase(),
        node.task.title
    )
}

fn sorted(forest: &[TaskTree]) -> Vec<&TaskTree> {
    let mut ordered: Vec<&TaskTree> = forest.iter().collect();
    ordered.sort_by_key(|node| node.id());
    ordered
}
