//! Pure derivations over the flat node list.
//!
//! Nothing here mutates or caches: the nested projection is rebuilt from the
//! flat set every time it is needed.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::{AppError, Result};
use crate::tree::node::{Node, NodeId, NodeType, TreeNode};

/// Where a drop would land.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DropTarget {
    /// No valid drop surface under the pointer.
    Nowhere,
    /// The top level of the tree.
    Root,
    /// Inside the given folder.
    Folder(NodeId),
}

impl DropTarget {
    /// The parent id a dropped node would receive, or `None` for [`DropTarget::Nowhere`].
    pub fn parent_id(&self) -> Option<Option<&str>> {
        match self {
            DropTarget::Nowhere => None,
            DropTarget::Root => Some(None),
            DropTarget::Folder(id) => Some(Some(id.as_str())),
        }
    }
}

/// Primary collation key: base letters only, accents stripped, case folded.
fn collation_key(name: &str) -> impl Iterator<Item = char> + '_ {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

/// Folders before files, then name by base letters (`éclair` sits between
/// `apple` and `fig`), then case-insensitive name, then exact name.
pub fn sibling_order(a_type: NodeType, a_name: &str, b_type: NodeType, b_name: &str) -> Ordering {
    let a_folder = a_type == NodeType::Folder;
    let b_folder = b_type == NodeType::Folder;
    b_folder
        .cmp(&a_folder)
        .then_with(|| collation_key(a_name).cmp(collation_key(b_name)))
        .then_with(|| a_name.to_lowercase().cmp(&b_name.to_lowercase()))
        .then_with(|| a_name.cmp(b_name))
}

fn compare_nodes(a: &Node, b: &Node) -> Ordering {
    sibling_order(a.node_type, &a.name, b.node_type, &b.name)
}

fn index_by_id(nodes: &[Node]) -> HashMap<&str, &Node> {
    nodes.iter().map(|n| (n.id.as_str(), n)).collect()
}

/// Parent id -> direct children, in input order.
fn children_index(nodes: &[Node]) -> HashMap<&str, Vec<&Node>> {
    let mut index: HashMap<&str, Vec<&Node>> = HashMap::new();
    for node in nodes {
        if let Some(parent) = node.parent_id.as_deref() {
            index.entry(parent).or_default().push(node);
        }
    }
    index
}

fn cycle_error(node_id: &str) -> AppError {
    tracing::error!(node_id, "parent cycle detected while walking ancestors");
    AppError::Invariant(format!("parent cycle above node {node_id}"))
}

/// Build the nested, sorted projection of `nodes`.
///
/// Only root-level nodes and nodes whose whole parent chain resolves inside
/// `nodes` appear; orphans are dropped without error.
pub fn unflatten(nodes: &[Node]) -> Vec<TreeNode> {
    let children = children_index(nodes);
    let mut roots: Vec<&Node> = nodes.iter().filter(|n| n.parent_id.is_none()).collect();
    roots.sort_by(|a, b| compare_nodes(a, b));

    let tree: Vec<TreeNode> = roots
        .into_iter()
        .map(|root| build_subtree(root, &children, 0, nodes.len()))
        .collect();

    let placed: usize = tree.iter().map(TreeNode::subtree_len).sum();
    let dropped = nodes.len().saturating_sub(placed);
    if dropped > 0 {
        tracing::debug!(dropped, "orphaned nodes left out of the tree");
    }
    tree
}

fn build_subtree(
    node: &Node,
    children: &HashMap<&str, Vec<&Node>>,
    depth: usize,
    limit: usize,
) -> TreeNode {
    let mut tree_node = TreeNode::from(node);
    if depth >= limit {
        tracing::error!(node_id = %node.id, "tree deeper than node count, stopping descent");
        return tree_node;
    }
    if let Some(kids) = children.get(node.id.as_str()) {
        let mut kids = kids.clone();
        kids.sort_by(|a, b| compare_nodes(a, b));
        tree_node.children = Some(
            kids.into_iter()
                .map(|child| build_subtree(child, children, depth + 1, limit))
                .collect(),
        );
    }
    tree_node
}

/// Ancestors of `node_id` in root-to-node order, the node itself last.
///
/// Empty when `node_id` is unknown. A parent cycle is reported as
/// [`AppError::Invariant`] instead of looping.
pub fn ancestor_chain<'a>(node_id: &str, nodes: &'a [Node]) -> Result<Vec<&'a Node>> {
    let by_id = index_by_id(nodes);
    let mut chain = Vec::new();
    let mut current = by_id.get(node_id).copied();

    while let Some(node) = current {
        if chain.len() >= nodes.len() {
            return Err(cycle_error(node_id));
        }
        chain.push(node);
        current = node
            .parent_id
            .as_deref()
            .and_then(|parent| by_id.get(parent).copied());
    }

    chain.reverse();
    Ok(chain)
}

/// Every node reachable through child links from any of `ids`.
pub fn descendants_of<S: AsRef<str>>(ids: &[S], nodes: &[Node]) -> HashSet<NodeId> {
    let children = children_index(nodes);
    let mut found = HashSet::new();
    let mut queue: VecDeque<&str> = ids.iter().map(|id| id.as_ref()).collect();

    while let Some(id) = queue.pop_front() {
        for child in children.get(id).into_iter().flatten() {
            if found.insert(child.id.clone()) {
                queue.push_back(child.id.as_str());
            }
        }
    }
    found
}

/// Whether dropping `dragged_ids` onto `target` is a real, acyclic move.
///
/// Rejected: no surface, dropping onto a dragged node, dropping into a
/// dragged node's subtree, or any dragged node already living in `target`.
pub fn can_move_to<S: AsRef<str>>(nodes: &[Node], dragged_ids: &[S], target: &DropTarget) -> bool {
    let Some(target_id) = target.parent_id() else {
        return false;
    };

    if let Some(target_id) = target_id {
        if dragged_ids.iter().any(|id| id.as_ref() == target_id) {
            return false;
        }
        if descendants_of(dragged_ids, nodes).contains(target_id) {
            return false;
        }
    }

    let by_id = index_by_id(nodes);
    let already_there = dragged_ids
        .iter()
        .filter_map(|id| by_id.get(id.as_ref()))
        .any(|node| node.parent_id.as_deref() == target_id);
    !already_there
}

/// First id, starting at `node_id` itself and walking up, that is not trashed.
///
/// `Ok(None)` means no living ancestor exists (or the id is unknown): go to the root.
pub fn nearest_active_ancestor_id(node_id: &str, nodes: &[Node]) -> Result<Option<NodeId>> {
    let by_id = index_by_id(nodes);
    let mut current = by_id.get(node_id).copied();
    let mut steps = 0;

    while let Some(node) = current {
        if node.is_active() {
            return Ok(Some(node.id.clone()));
        }
        steps += 1;
        if steps > nodes.len() {
            return Err(cycle_error(node_id));
        }
        current = node
            .parent_id
            .as_deref()
            .and_then(|parent| by_id.get(parent).copied());
    }
    Ok(None)
}

/// Sort a flat sibling list the same way every tree level is sorted.
pub fn sort_siblings<'a, I>(nodes: I) -> Vec<&'a Node>
where
    I: IntoIterator<Item = &'a Node>,
{
    let mut sorted: Vec<&Node> = nodes.into_iter().collect();
    sorted.sort_by(|a, b| compare_nodes(a, b));
    sorted
}

/// Direct children of `parent_id` (`None` = root level), sibling-sorted.
pub fn children_of<'a>(parent_id: Option<&str>, nodes: &'a [Node]) -> Vec<&'a Node> {
    sort_siblings(nodes.iter().filter(|n| n.parent_id.as_deref() == parent_id))
}

/// Nodes that cannot be reached from any root-level node.
pub fn orphan_ids(nodes: &[Node]) -> Vec<NodeId> {
    let roots: Vec<&str> = nodes
        .iter()
        .filter(|n| n.parent_id.is_none())
        .map(|n| n.id.as_str())
        .collect();
    let reachable = descendants_of(&roots, nodes);

    nodes
        .iter()
        .filter(|n| n.parent_id.is_some() && !reachable.contains(&n.id))
        .map(|n| n.id.clone())
        .collect()
}
