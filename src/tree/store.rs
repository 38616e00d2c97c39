//! The process-wide node cache and its synchronization with the tree service.
//!
//! Every mutation follows one shape: raise the loading flag of its kind, call
//! the service without holding the cache lock, then lower the flag and
//! reconcile the response (or hand the error back untouched).
//!
//! Each operation takes a sequence number when it is issued. Reconciliation
//! only writes a node if no later-issued operation has already written it,
//! so for overlapping operations on the same node the last one issued wins,
//! whatever order the responses arrive in.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{AppError, Result};
use crate::remote::{ApiResponse, DeleteResult, TreeService, UploadFile};
use crate::tree::model::{self, DropTarget};
use crate::tree::node::{Node, NodeId};

/// Operation kinds with their own loading flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Fetch,
    Create,
    Update,
    Delete,
    /// Operations that suspend all user input while in flight.
    Blocking,
}

/// In-flight counters per operation kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadingStatus {
    in_flight: HashMap<OpKind, usize>,
}

impl LoadingStatus {
    pub fn is_loading(&self, kind: OpKind) -> bool {
        self.in_flight.get(&kind).is_some_and(|n| *n > 0)
    }

    fn begin(&mut self, kind: OpKind) {
        *self.in_flight.entry(kind).or_default() += 1;
    }

    fn end(&mut self, kind: OpKind) {
        if let Some(n) = self.in_flight.get_mut(&kind) {
            *n = n.saturating_sub(1);
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    nodes: Vec<Node>,
    status: LoadingStatus,
    next_seq: u64,
    /// Sequence of the operation that last wrote (or removed) each node.
    written: HashMap<NodeId, u64>,
    /// Sequences of operations still waiting for their response.
    running: BTreeSet<u64>,
}

impl StoreState {
    fn issue(&mut self, kind: OpKind) -> u64 {
        self.status.begin(kind);
        self.next_seq += 1;
        self.running.insert(self.next_seq);
        self.next_seq
    }

    /// Retire a finished operation and forget writes no pending one can lose to.
    fn settle(&mut self, kind: OpKind, seq: u64) {
        self.status.end(kind);
        self.running.remove(&seq);
        match self.running.first().copied() {
            Some(oldest) => self.written.retain(|_, w| *w > oldest),
            None => self.written.clear(),
        }
    }

    fn is_stale(&self, id: &str, seq: u64) -> bool {
        self.written.get(id).is_some_and(|w| *w > seq)
    }

    fn mark(&mut self, id: &str, seq: u64) {
        self.written.insert(id.to_string(), seq);
    }

    /// Full replacement from a load, keeping nodes written by later operations.
    fn replace_all(&mut self, seq: u64, incoming: &[Node]) {
        let current: HashMap<&str, &Node> = self.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        let incoming_ids: HashSet<&str> = incoming.iter().map(|n| n.id.as_str()).collect();

        let mut next = Vec::with_capacity(incoming.len());
        for node in incoming {
            if !self.is_stale(&node.id, seq) {
                next.push(node.clone());
            } else if let Some(local) = current.get(node.id.as_str()) {
                next.push((*local).clone());
            }
        }
        for local in &self.nodes {
            if !incoming_ids.contains(local.id.as_str()) && self.is_stale(&local.id, seq) {
                next.push(local.clone());
            }
        }
        let fresh: Vec<NodeId> = incoming
            .iter()
            .filter(|n| !self.is_stale(&n.id, seq))
            .map(|n| n.id.clone())
            .collect();
        self.nodes = next;
        for id in fresh {
            self.mark(&id, seq);
        }
    }

    /// Batch partial update: replace cached nodes present in `updated`.
    fn merge(&mut self, seq: u64, updated: &[Node]) -> usize {
        let fresh: HashMap<&str, &Node> = updated
            .iter()
            .filter(|n| !self.is_stale(&n.id, seq))
            .map(|n| (n.id.as_str(), n))
            .collect();

        let mut merged = 0;
        for node in self.nodes.iter_mut() {
            if let Some(newer) = fresh.get(node.id.as_str()) {
                *node = (*newer).clone();
                merged += 1;
            }
        }
        let ids: Vec<NodeId> = fresh.keys().map(|id| id.to_string()).collect();
        for id in ids {
            self.mark(&id, seq);
        }
        merged
    }

    /// Insert new nodes; an id already cached is replaced instead of duplicated.
    fn append(&mut self, seq: u64, created: &[Node]) {
        for node in created {
            if self.is_stale(&node.id, seq) {
                continue;
            }
            match self.nodes.iter_mut().find(|n| n.id == node.id) {
                Some(existing) => *existing = node.clone(),
                None => self.nodes.push(node.clone()),
            }
            self.mark(&node.id, seq);
        }
    }

    fn remove(&mut self, seq: u64, removed: &[Node]) -> usize {
        let doomed: HashSet<&str> = removed
            .iter()
            .filter(|n| !self.is_stale(&n.id, seq))
            .map(|n| n.id.as_str())
            .collect();
        let before = self.nodes.len();
        self.nodes.retain(|n| !doomed.contains(n.id.as_str()));
        let ids: Vec<NodeId> = doomed.iter().map(|id| id.to_string()).collect();
        for id in ids {
            self.mark(&id, seq);
        }
        before - self.nodes.len()
    }
}

/// Reject blank names before they reach the service.
pub fn validated_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Shared handle to the node cache. Clones refer to the same cache.
#[derive(Clone)]
pub struct TreeStore {
    state: Arc<Mutex<StoreState>>,
    service: Arc<dyn TreeService>,
}

impl TreeStore {
    pub fn new(service: Arc<dyn TreeService>) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            service,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self, kind: OpKind) -> u64 {
        self.lock().issue(kind)
    }

    /// Lower the flag, then reconcile on success or hand the error back.
    fn finish<T>(
        &self,
        kind: OpKind,
        seq: u64,
        op: &'static str,
        result: Result<ApiResponse<T>>,
        reconcile: impl FnOnce(&mut StoreState, &ApiResponse<T>),
    ) -> Result<ApiResponse<T>> {
        let mut state = self.lock();
        let outcome = match result {
            Ok(response) => {
                reconcile(&mut *state, &response);
                tracing::debug!(op, nodes = state.nodes.len(), "store reconciled");
                Ok(response)
            }
            Err(err) => {
                tracing::warn!(op, error = %err, "store operation failed");
                Err(err)
            }
        };
        state.settle(kind, seq);
        outcome
    }

    // ── Operations ───────────────────────────────────────────────────────

    /// Replace the whole cache with the server's tree.
    pub async fn load_tree(&self, include_deleted: bool) -> Result<ApiResponse<Vec<Node>>> {
        let seq = self.begin(OpKind::Fetch);
        let result = self.service.fetch_tree(include_deleted).await;
        self.finish(OpKind::Fetch, seq, "load_tree", result, |state, response| {
            state.replace_all(seq, &response.data)
        })
    }

    pub async fn create_folder(
        &self,
        parent_id: Option<&str>,
        name: &str,
    ) -> Result<ApiResponse<Node>> {
        let name = validated_name(name)?;
        let seq = self.begin(OpKind::Create);
        let result = self.service.create_folder(parent_id, &name).await;
        self.finish(OpKind::Create, seq, "create_folder", result, |state, response| {
            state.append(seq, std::slice::from_ref(&response.data))
        })
    }

    pub async fn rename(&self, node_id: &str, name: &str) -> Result<ApiResponse<Node>> {
        let name = validated_name(name)?;
        let seq = self.begin(OpKind::Update);
        let result = self.service.rename(node_id, &name).await;
        self.finish(OpKind::Update, seq, "rename", result, |state, response| {
            state.merge(seq, std::slice::from_ref(&response.data));
        })
    }

    pub async fn toggle_favorite(&self, ids: &[NodeId]) -> Result<ApiResponse<Vec<Node>>> {
        let seq = self.begin(OpKind::Update);
        let result = self.service.set_favorite(ids).await;
        self.finish(OpKind::Update, seq, "toggle_favorite", result, |state, response| {
            state.merge(seq, &response.data);
        })
    }

    pub async fn upload_files(
        &self,
        parent_id: Option<&str>,
        files: Vec<UploadFile>,
    ) -> Result<ApiResponse<Vec<Node>>> {
        let seq = self.begin(OpKind::Blocking);
        let result = self.service.upload(parent_id, files).await;
        self.finish(OpKind::Blocking, seq, "upload_files", result, |state, response| {
            state.append(seq, &response.data)
        })
    }

    /// Move `ids` under `target_parent_id`.
    ///
    /// A move the drop rules reject fails with [`AppError::InvalidDrop`]
    /// without contacting the service.
    pub async fn move_nodes(
        &self,
        target_parent_id: Option<&str>,
        ids: &[NodeId],
    ) -> Result<ApiResponse<Vec<Node>>> {
        let target = match target_parent_id {
            Some(id) => DropTarget::Folder(id.to_string()),
            None => DropTarget::Root,
        };
        if ids.is_empty() || !self.with_nodes(|nodes| model::can_move_to(nodes, ids, &target)) {
            tracing::trace!(?target, count = ids.len(), "move rejected locally");
            return Err(AppError::InvalidDrop);
        }

        let seq = self.begin(OpKind::Blocking);
        let result = self.service.move_nodes(target_parent_id, ids).await;
        self.finish(OpKind::Blocking, seq, "move_nodes", result, |state, response| {
            state.merge(seq, &response.data);
        })
    }

    pub async fn restore(&self, ids: &[NodeId]) -> Result<ApiResponse<Vec<Node>>> {
        let seq = self.begin(OpKind::Delete);
        let result = self.service.restore(ids).await;
        self.finish(OpKind::Delete, seq, "restore", result, |state, response| {
            state.merge(seq, &response.data);
        })
    }

    /// Move to trash. A response with no nodes leaves the cache as is.
    pub async fn soft_delete(&self, ids: &[NodeId]) -> Result<ApiResponse<DeleteResult>> {
        let seq = self.begin(OpKind::Delete);
        let result = self.service.soft_delete(ids).await;
        self.finish(OpKind::Delete, seq, "soft_delete", result, |state, response| {
            if !response.data.nodes.is_empty() {
                state.merge(seq, &response.data.nodes);
            }
        })
    }

    /// Delete permanently: every node the response lists leaves the cache.
    pub async fn hard_delete(&self, ids: &[NodeId]) -> Result<ApiResponse<DeleteResult>> {
        let seq = self.begin(OpKind::Delete);
        let result = self.service.hard_delete(ids).await;
        self.finish(OpKind::Delete, seq, "hard_delete", result, |state, response| {
            state.remove(seq, &response.data.nodes);
        })
    }

    // ── Derived views ────────────────────────────────────────────────────

    /// Run `f` against the cached nodes without cloning them.
    pub fn with_nodes<R>(&self, f: impl FnOnce(&[Node]) -> R) -> R {
        f(&self.lock().nodes)
    }

    #[cfg(test)]
    pub fn nodes(&self) -> Vec<Node> {
        self.with_nodes(<[Node]>::to_vec)
    }

    pub fn node(&self, id: &str) -> Option<Node> {
        self.with_nodes(|nodes| nodes.iter().find(|n| n.id == id).cloned())
    }

    pub fn active_nodes(&self) -> Vec<Node> {
        self.with_nodes(|nodes| nodes.iter().filter(|n| n.is_active()).cloned().collect())
    }

    pub fn trashed_nodes(&self) -> Vec<Node> {
        self.with_nodes(|nodes| nodes.iter().filter(|n| !n.is_active()).cloned().collect())
    }

    pub fn favorites(&self) -> Vec<Node> {
        self.with_nodes(|nodes| {
            nodes
                .iter()
                .filter(|n| n.is_active() && n.is_favorite)
                .cloned()
                .collect()
        })
    }

    /// Root-to-node chain; empty for `None` or an unknown id.
    pub fn breadcrumb(&self, node_id: Option<&str>) -> Result<Vec<Node>> {
        let Some(node_id) = node_id else {
            return Ok(Vec::new());
        };
        self.with_nodes(|nodes| {
            model::ancestor_chain(node_id, nodes)
                .map(|chain| chain.into_iter().cloned().collect())
        })
    }

    pub fn nearest_active_ancestor_id(&self, node_id: Option<&str>) -> Result<Option<NodeId>> {
        let Some(node_id) = node_id else {
            return Ok(None);
        };
        self.with_nodes(|nodes| model::nearest_active_ancestor_id(node_id, nodes))
    }

    pub fn status(&self) -> LoadingStatus {
        self.lock().status.clone()
    }

    pub fn is_loading(&self, kind: OpKind) -> bool {
        self.lock().status.is_loading(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::memory::{Failure, MemoryTreeService};
    use crate::remote::ApiError;

    fn seed() -> Vec<Node> {
        vec![
            Node::folder("r", None, "root"),
            Node::folder("a", Some("r"), "A"),
            Node::file("b", Some("a"), "b.txt"),
            Node::file("c", Some("r"), "c.txt"),
        ]
    }

    async fn loaded() -> (Arc<MemoryTreeService>, TreeStore) {
        let service = Arc::new(MemoryTreeService::with_nodes(seed()));
        let store = TreeStore::new(service.clone());
        store.load_tree(true).await.unwrap();
        (service, store)
    }

    fn ids(v: &[&str]) -> Vec<NodeId> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn load_tree_replaces_cache() {
        let (_service, store) = loaded().await;
        assert_eq!(store.nodes().len(), 4);
        assert!(!store.is_loading(OpKind::Fetch));
    }

    #[tokio::test]
    async fn load_failure_keeps_cache_and_clears_flag() {
        let (service, store) = loaded().await;
        service.fail_next(Failure::Unavailable);
        let err = store.load_tree(false).await.unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(store.nodes().len(), 4);
        assert!(!store.is_loading(OpKind::Fetch));
    }

    #[tokio::test]
    async fn create_folder_appends_server_node() {
        let (_service, store) = loaded().await;
        let response = store.create_folder(Some("r"), "  New  ").await.unwrap();
        assert_eq!(response.data.name, "New");
        assert_eq!(store.nodes().len(), 5);
        assert!(store.node(&response.data.id).is_some());
        assert!(!store.is_loading(OpKind::Create));
    }

    #[tokio::test]
    async fn blank_name_never_reaches_service() {
        let (service, store) = loaded().await;
        let calls = service.calls();
        let err = store.create_folder(None, "   ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.rename("b", "").await.is_err());
        assert_eq!(service.calls(), calls);
    }

    #[tokio::test]
    async fn rename_replaces_node_in_place() {
        let (_service, store) = loaded().await;
        store.rename("b", "renamed.txt").await.unwrap();
        let nodes = store.nodes();
        assert_eq!(nodes[2].id, "b");
        assert_eq!(nodes[2].name, "renamed.txt");
    }

    #[tokio::test]
    async fn server_rejection_is_rethrown_verbatim() {
        let (service, store) = loaded().await;
        let rejection = ApiError::new(403, "Forbidden", "Forbidden");
        service.fail_next(Failure::Rejected(rejection.clone()));
        let err = store.rename("b", "x.txt").await.unwrap_err();
        match err {
            AppError::Api(e) => assert_eq!(e, rejection),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(store.node("b").unwrap().name, "b.txt");
        assert!(!store.is_loading(OpKind::Update));
    }

    #[tokio::test]
    async fn toggle_favorite_touches_only_returned_nodes() {
        let (_service, store) = loaded().await;
        let before = store.nodes();
        store.toggle_favorite(&ids(&["b"])).await.unwrap();
        let after = store.nodes();
        for (old, new) in before.iter().zip(after.iter()) {
            if new.id == "b" {
                assert!(new.is_favorite);
            } else {
                assert_eq!(old, new);
            }
        }
        assert_eq!(store.favorites().len(), 1);
    }

    #[tokio::test]
    async fn upload_appends_all_new_nodes_and_clears_blocking() {
        let (_service, store) = loaded().await;
        let files = vec![
            UploadFile {
                name: "one.txt".into(),
                content_type: Some("text/plain".into()),
                bytes: b"1".to_vec(),
            },
            UploadFile {
                name: "two.txt".into(),
                content_type: None,
                bytes: b"22".to_vec(),
            },
        ];
        let response = store.upload_files(Some("a"), files).await.unwrap();
        assert_eq!(response.data.len(), 2);
        assert_eq!(store.nodes().len(), 6);
        assert!(!store.is_loading(OpKind::Blocking));
    }

    #[tokio::test]
    async fn move_merges_updated_parents() {
        let (_service, store) = loaded().await;
        store.move_nodes(None, &ids(&["b"])).await.unwrap();
        assert!(store.node("b").unwrap().parent_id.is_none());
        assert_eq!(store.node("c").unwrap().parent_id.as_deref(), Some("r"));
    }

    #[tokio::test]
    async fn invalid_move_is_filtered_before_service() {
        let (service, store) = loaded().await;
        let calls = service.calls();
        let err = store.move_nodes(Some("a"), &ids(&["r"])).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidDrop));
        let err = store.move_nodes(Some("a"), &ids(&["b"])).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidDrop));
        assert_eq!(service.calls(), calls);
        assert!(!store.is_loading(OpKind::Blocking));
    }

    #[tokio::test]
    async fn soft_delete_marks_and_views_split() {
        let (_service, store) = loaded().await;
        store.soft_delete(&ids(&["a"])).await.unwrap();
        assert_eq!(store.trashed_nodes().len(), 1);
        assert_eq!(store.active_nodes().len(), 3);
        // child of the trashed folder is not cascaded
        assert!(store.node("b").unwrap().is_active());
        assert_eq!(
            store.nearest_active_ancestor_id(Some("a")).unwrap().as_deref(),
            Some("r")
        );
        assert_eq!(
            store.nearest_active_ancestor_id(Some("b")).unwrap().as_deref(),
            Some("b")
        );
    }

    #[tokio::test]
    async fn soft_delete_with_nothing_changed_is_noop() {
        let (_service, store) = loaded().await;
        store.soft_delete(&ids(&["b"])).await.unwrap();
        let before = store.nodes();
        let response = store.soft_delete(&ids(&["b"])).await.unwrap();
        assert!(!response.data.deleted);
        assert_eq!(store.nodes(), before);
        assert!(!store.is_loading(OpKind::Delete));
    }

    #[tokio::test]
    async fn restore_clears_deleted_at() {
        let (_service, store) = loaded().await;
        store.soft_delete(&ids(&["c"])).await.unwrap();
        store.restore(&ids(&["c"])).await.unwrap();
        assert!(store.node("c").unwrap().is_active());
    }

    #[tokio::test]
    async fn hard_delete_removes_listed_nodes() {
        let (_service, store) = loaded().await;
        let response = store.hard_delete(&ids(&["a"])).await.unwrap();
        assert!(response.data.deleted);
        let remaining: Vec<NodeId> = store.nodes().into_iter().map(|n| n.id).collect();
        assert_eq!(remaining, ids(&["r", "c"]));
    }

    #[tokio::test]
    async fn breadcrumb_views() {
        let (_service, store) = loaded().await;
        let crumbs: Vec<NodeId> = store
            .breadcrumb(Some("b"))
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(crumbs, ids(&["r", "a", "b"]));
        assert!(store.breadcrumb(None).unwrap().is_empty());
        assert!(store.breadcrumb(Some("ghost")).unwrap().is_empty());
        assert_eq!(store.nearest_active_ancestor_id(None).unwrap(), None);
    }

    #[test]
    fn loading_counters_survive_overlap() {
        let mut status = LoadingStatus::default();
        status.begin(OpKind::Update);
        status.begin(OpKind::Update);
        status.end(OpKind::Update);
        assert!(status.is_loading(OpKind::Update));
        status.end(OpKind::Update);
        assert!(!status.is_loading(OpKind::Update));
        status.end(OpKind::Update);
        assert!(!status.is_loading(OpKind::Update));
    }

    // ── Sequencing ───────────────────────────────────────────────────────

    fn state_with(nodes: Vec<Node>) -> StoreState {
        StoreState {
            nodes,
            ..Default::default()
        }
    }

    #[test]
    fn later_issued_delete_beats_late_rename_response() {
        let mut state = state_with(seed());
        let rename_seq = state.issue(OpKind::Update);
        let delete_seq = state.issue(OpKind::Delete);

        // delete answers first
        state.remove(delete_seq, &[Node::file("b", Some("a"), "b.txt")]);
        // the rename answer arrives afterwards and must not resurrect b
        state.merge(rename_seq, &[Node::file("b", Some("a"), "late.txt")]);
        state.append(rename_seq, &[Node::file("b", Some("a"), "late.txt")]);

        assert!(state.nodes.iter().all(|n| n.id != "b"));
    }

    #[test]
    fn later_issued_rename_beats_earlier_rename() {
        let mut state = state_with(seed());
        let first = state.issue(OpKind::Update);
        let second = state.issue(OpKind::Update);

        state.merge(second, &[Node::file("b", Some("a"), "second.txt")]);
        state.merge(first, &[Node::file("b", Some("a"), "first.txt")]);

        let b = state.nodes.iter().find(|n| n.id == "b").unwrap();
        assert_eq!(b.name, "second.txt");
    }

    #[test]
    fn stale_load_keeps_newer_local_nodes() {
        let mut state = state_with(seed());
        let load_seq = state.issue(OpKind::Fetch);
        let create_seq = state.issue(OpKind::Create);
        let rename_seq = state.issue(OpKind::Update);

        state.append(create_seq, &[Node::folder("n", Some("r"), "new")]);
        state.merge(rename_seq, &[Node::file("c", Some("r"), "renamed.txt")]);
        // the load was issued before both and does not know about them
        state.replace_all(load_seq, &seed());

        assert!(state.nodes.iter().any(|n| n.id == "n"));
        let c = state.nodes.iter().find(|n| n.id == "c").unwrap();
        assert_eq!(c.name, "renamed.txt");
        assert_eq!(state.nodes.len(), 5);
    }

    #[test]
    fn fresh_load_drops_nodes_missing_on_server() {
        let mut state = state_with(seed());
        let seq = state.issue(OpKind::Fetch);
        state.replace_all(seq, &seed()[..2]);
        assert_eq!(state.nodes.len(), 2);
    }

    #[test]
    fn append_does_not_duplicate_ids() {
        let mut state = state_with(seed());
        let seq = state.issue(OpKind::Create);
        state.append(seq, &[Node::file("c", Some("r"), "c2.txt")]);
        assert_eq!(state.nodes.iter().filter(|n| n.id == "c").count(), 1);
    }

    #[test]
    fn settled_writes_are_forgotten_once_no_older_call_is_pending() {
        let mut state = state_with(seed());
        let rename_seq = state.issue(OpKind::Update);
        let delete_seq = state.issue(OpKind::Delete);

        state.remove(delete_seq, &[Node::file("b", Some("a"), "b.txt")]);
        state.settle(OpKind::Delete, delete_seq);
        // the rename is older and still pending, so the tombstone stays
        assert_eq!(state.written.get("b"), Some(&delete_seq));
        state.merge(rename_seq, &[Node::file("b", Some("a"), "late.txt")]);
        assert!(state.nodes.iter().all(|n| n.id != "b"));

        state.settle(OpKind::Update, rename_seq);
        assert!(state.written.is_empty());
        assert!(state.running.is_empty());
        assert!(!state.status.is_loading(OpKind::Update));
        assert!(!state.status.is_loading(OpKind::Delete));
    }

    #[test]
    fn settle_keeps_only_writes_newer_than_oldest_pending() {
        let mut state = state_with(seed());
        let first = state.issue(OpKind::Update);
        let second = state.issue(OpKind::Update);
        let third = state.issue(OpKind::Update);

        state.merge(first, &[Node::file("c", Some("r"), "one.txt")]);
        state.merge(third, &[Node::file("b", Some("a"), "three.txt")]);
        state.settle(OpKind::Update, first);
        state.settle(OpKind::Update, third);

        assert!(!state.written.contains_key("c"));
        assert_eq!(state.written.get("b"), Some(&third));
        assert!(state.is_stale("b", second));
    }

    #[tokio::test]
    async fn sequence_map_empties_after_operations_finish() {
        let (service, store) = loaded().await;
        store.rename("b", "renamed.txt").await.unwrap();
        store.hard_delete(&ids(&["c"])).await.unwrap();
        service.fail_next(Failure::Unavailable);
        assert!(store.toggle_favorite(&ids(&["a"])).await.is_err());

        let state = store.lock();
        assert!(state.written.is_empty());
        assert!(state.running.is_empty());
    }
}
