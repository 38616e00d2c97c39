use crate::tree::node::NodeId;

/// Nodes cut with `x`, waiting to be pasted (moved) into another folder.
#[derive(Debug, Clone, Default)]
pub struct MoveClipboard {
    ids: Vec<NodeId>,
}

impl MoveClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the clipboard content.
    pub fn set(&mut self, ids: Vec<NodeId>) {
        self.ids = ids;
    }

    /// Hand the content over for a paste, leaving the clipboard empty.
    pub fn take(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.ids)
    }

    /// Forget ids that no longer exist.
    pub fn retain(&mut self, keep: impl Fn(&str) -> bool) {
        self.ids.retain(|id| keep(id));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|i| i == id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[&str]) -> Vec<NodeId> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn new_clipboard_is_empty() {
        let cb = MoveClipboard::new();
        assert!(cb.is_empty());
        assert_eq!(cb.len(), 0);
    }

    #[test]
    fn set_then_take_empties() {
        let mut cb = MoveClipboard::new();
        cb.set(ids(&["a", "b"]));
        assert_eq!(cb.len(), 2);
        assert!(cb.contains("a"));
        assert_eq!(cb.take(), ids(&["a", "b"]));
        assert!(cb.is_empty());
    }

    #[test]
    fn set_replaces_previous_content() {
        let mut cb = MoveClipboard::new();
        cb.set(ids(&["a"]));
        cb.set(ids(&["c"]));
        assert!(!cb.contains("a"));
        assert!(cb.contains("c"));
    }

    #[test]
    fn retain_drops_vanished_nodes() {
        let mut cb = MoveClipboard::new();
        cb.set(ids(&["a", "b", "c"]));
        cb.retain(|id| id != "b");
        assert_eq!(cb.take(), ids(&["a", "c"]));
    }
}
