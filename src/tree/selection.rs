use std::collections::HashSet;

use crate::tree::node::{Node, NodeId, NodeType, TreeNode};

/// One row of the visible (expanded) linearization of the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleRow {
    pub id: NodeId,
    pub parent_id: Option<NodeId>,
    pub node_type: NodeType,
    pub name: String,
    pub depth: usize,
    pub is_favorite: bool,
    pub is_expanded: bool,
    pub is_last_sibling: bool,
    pub has_children: bool,
}

/// Pre-order rows, descending into a folder only when it is expanded.
pub fn visible_rows(tree: &[TreeNode], expanded: &HashSet<NodeId>) -> Vec<VisibleRow> {
    let mut rows = Vec::new();
    push_rows(tree, None, 0, expanded, &mut rows);
    rows
}

fn push_rows(
    level: &[TreeNode],
    parent_id: Option<&NodeId>,
    depth: usize,
    expanded: &HashSet<NodeId>,
    rows: &mut Vec<VisibleRow>,
) {
    for (i, node) in level.iter().enumerate() {
        let is_expanded = node.is_folder() && expanded.contains(&node.id);
        rows.push(VisibleRow {
            id: node.id.clone(),
            parent_id: parent_id.cloned(),
            node_type: node.node_type,
            name: node.name.clone(),
            depth,
            is_favorite: node.is_favorite,
            is_expanded,
            is_last_sibling: i + 1 == level.len(),
            has_children: node.children.as_ref().is_some_and(|c| !c.is_empty()),
        });
        if is_expanded {
            if let Some(children) = &node.children {
                push_rows(children, Some(&node.id), depth + 1, expanded, rows);
            }
        }
    }
}

/// Depth-0 rows for a flat listing that is already sorted (e.g. the trash).
pub fn flat_rows(nodes: &[&Node]) -> Vec<VisibleRow> {
    nodes
        .iter()
        .enumerate()
        .map(|(i, node)| VisibleRow {
            id: node.id.clone(),
            parent_id: node.parent_id.clone(),
            node_type: node.node_type,
            name: node.name.clone(),
            depth: 0,
            is_favorite: node.is_favorite,
            is_expanded: false,
            is_last_sibling: i + 1 == nodes.len(),
            has_children: false,
        })
        .collect()
}

/// Ids in visible order; the basis for range picks.
pub fn visible_order(tree: &[TreeNode], expanded: &HashSet<NodeId>) -> Vec<NodeId> {
    fn walk(level: &[TreeNode], expanded: &HashSet<NodeId>, out: &mut Vec<NodeId>) {
        for node in level {
            out.push(node.id.clone());
            if node.is_folder() && expanded.contains(&node.id) {
                if let Some(children) = &node.children {
                    walk(children, expanded, out);
                }
            }
        }
    }

    let mut out = Vec::new();
    walk(tree, expanded, &mut out);
    out
}

/// How a node was picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickKind {
    /// Plain click: select only this node.
    Plain,
    /// Platform modifier held: add or remove this node.
    Toggle,
    /// Shift held: select the visible span from the last pick.
    Range,
    /// Context action: keeps an existing selection that already holds the node.
    Context,
}

/// Current multi-selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub selected: Vec<NodeId>,
    pub last_picked: Option<NodeId>,
}

impl Selection {
    pub fn contains(&self, id: &str) -> bool {
        self.selected.iter().any(|s| s == id)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Apply one pick and return the resulting selection.
    ///
    /// `visible` is only consulted for range picks.
    pub fn pick(&self, id: &str, kind: PickKind, visible: &[NodeId]) -> Selection {
        match kind {
            PickKind::Context if self.contains(id) => self.clone(),
            PickKind::Range => match self.last_picked.as_deref() {
                Some(last) => self.range_to(last, id, visible),
                None => Self::single(id),
            },
            PickKind::Toggle => {
                let mut selected = self.selected.clone();
                if let Some(pos) = selected.iter().position(|s| s == id) {
                    selected.remove(pos);
                } else {
                    selected.push(id.to_string());
                }
                Selection {
                    selected,
                    last_picked: Some(id.to_string()),
                }
            }
            PickKind::Plain | PickKind::Context => Self::single(id),
        }
    }

    fn single(id: &str) -> Selection {
        Selection {
            selected: vec![id.to_string()],
            last_picked: Some(id.to_string()),
        }
    }

    fn range_to(&self, last: &str, id: &str, visible: &[NodeId]) -> Selection {
        let start = visible.iter().position(|v| v == last);
        let end = visible.iter().position(|v| v == id);
        let (Some(start), Some(end)) = (start, end) else {
            return self.clone();
        };
        let (from, to) = if start <= end { (start, end) } else { (end, start) };
        Selection {
            selected: visible[from..=to].to_vec(),
            last_picked: self.last_picked.clone(),
        }
    }

    /// Drop ids for which `keep` is false, e.g. after nodes leave the cache.
    pub fn retain(&mut self, keep: impl Fn(&str) -> bool) {
        self.selected.retain(|id| keep(id));
        if self.last_picked.as_deref().is_some_and(|id| !keep(id)) {
            self.last_picked = None;
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.last_picked = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::model::unflatten;
    use crate::tree::node::Node;

    fn tree() -> Vec<TreeNode> {
        unflatten(&[
            Node::folder("docs", None, "docs"),
            Node::file("d1", Some("docs"), "a.md"),
            Node::file("d2", Some("docs"), "b.md"),
            Node::folder("pics", None, "pics"),
            Node::file("p1", Some("pics"), "cat.png"),
            Node::file("readme", None, "readme.txt"),
        ])
    }

    fn expanded(ids: &[&str]) -> HashSet<NodeId> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn ids(v: &[&str]) -> Vec<NodeId> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn visible_order_collapsed() {
        let order = visible_order(&tree(), &HashSet::new());
        assert_eq!(order, ids(&["docs", "pics", "readme"]));
    }

    #[test]
    fn visible_order_descends_only_into_expanded() {
        let order = visible_order(&tree(), &expanded(&["docs"]));
        assert_eq!(order, ids(&["docs", "d1", "d2", "pics", "readme"]));
    }

    #[test]
    fn expanded_file_id_is_ignored() {
        let order = visible_order(&tree(), &expanded(&["readme"]));
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn visible_rows_track_depth_and_siblings() {
        let rows = visible_rows(&tree(), &expanded(&["docs"]));
        let order: Vec<NodeId> = rows.iter().map(|r| r.id.clone()).collect();
        assert_eq!(order, visible_order(&tree(), &expanded(&["docs"])));
        assert_eq!(rows[1].depth, 1);
        assert_eq!(rows[1].parent_id.as_deref(), Some("docs"));
        assert!(rows[2].is_last_sibling);
        assert!(rows[0].is_expanded);
        assert!(!rows[3].is_expanded);
        assert!(rows[3].has_children);
        assert!(rows[4].is_last_sibling);
    }

    #[test]
    fn plain_pick_replaces_selection() {
        let sel = Selection::default()
            .pick("docs", PickKind::Plain, &[])
            .pick("pics", PickKind::Plain, &[]);
        assert_eq!(sel.selected, ids(&["pics"]));
        assert_eq!(sel.last_picked.as_deref(), Some("pics"));
    }

    #[test]
    fn toggle_pick_adds_and_removes() {
        let sel = Selection::default()
            .pick("docs", PickKind::Plain, &[])
            .pick("readme", PickKind::Toggle, &[]);
        assert_eq!(sel.selected, ids(&["docs", "readme"]));
        let sel = sel.pick("docs", PickKind::Toggle, &[]);
        assert_eq!(sel.selected, ids(&["readme"]));
        assert_eq!(sel.last_picked.as_deref(), Some("docs"));
    }

    #[test]
    fn range_pick_selects_visible_span() {
        let visible = visible_order(&tree(), &expanded(&["docs"]));
        let sel = Selection::default()
            .pick("d1", PickKind::Plain, &visible)
            .pick("pics", PickKind::Range, &visible);
        assert_eq!(sel.selected, ids(&["d1", "d2", "pics"]));
        assert_eq!(sel.last_picked.as_deref(), Some("d1"));
    }

    #[test]
    fn range_pick_is_symmetric() {
        let visible = visible_order(&tree(), &expanded(&["docs", "pics"]));
        let forward = Selection::default()
            .pick("d2", PickKind::Plain, &visible)
            .pick("p1", PickKind::Range, &visible);
        let backward = Selection::default()
            .pick("p1", PickKind::Plain, &visible)
            .pick("d2", PickKind::Range, &visible);

        let a: HashSet<_> = forward.selected.into_iter().collect();
        let b: HashSet<_> = backward.selected.into_iter().collect();
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn range_pick_ignored_when_anchor_hidden() {
        let visible_open = visible_order(&tree(), &expanded(&["docs"]));
        let sel = Selection::default().pick("d1", PickKind::Plain, &visible_open);
        let visible_closed = visible_order(&tree(), &HashSet::new());
        let after = sel.pick("readme", PickKind::Range, &visible_closed);
        assert_eq!(after, sel);
    }

    #[test]
    fn range_pick_without_anchor_acts_plain() {
        let sel = Selection::default().pick("pics", PickKind::Range, &[]);
        assert_eq!(sel.selected, ids(&["pics"]));
        assert_eq!(sel.last_picked.as_deref(), Some("pics"));
    }

    #[test]
    fn context_pick_keeps_existing_multi_selection() {
        let sel = Selection::default()
            .pick("docs", PickKind::Plain, &[])
            .pick("readme", PickKind::Toggle, &[]);
        let after = sel.pick("docs", PickKind::Context, &[]);
        assert_eq!(after, sel);
    }

    #[test]
    fn context_pick_outside_selection_collapses() {
        let sel = Selection::default()
            .pick("docs", PickKind::Plain, &[])
            .pick("readme", PickKind::Toggle, &[]);
        let after = sel.pick("pics", PickKind::Context, &[]);
        assert_eq!(after.selected, ids(&["pics"]));
    }

    #[test]
    fn retain_drops_missing_ids_and_anchor() {
        let mut sel = Selection::default()
            .pick("docs", PickKind::Plain, &[])
            .pick("readme", PickKind::Toggle, &[]);
        sel.retain(|id| id != "readme");
        assert_eq!(sel.selected, ids(&["docs"]));
        assert!(sel.last_picked.is_none());
    }
}
