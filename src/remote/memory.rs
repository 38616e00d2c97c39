use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::http::UNAVAILABLE_MESSAGE;
use super::{ApiError, ApiResponse, DeleteResult, TreeService, UploadFile};
use crate::error::{AppError, Result};
use crate::tree::model::descendants_of;
use crate::tree::node::{Node, NodeId, NodeType};

/// A failure to inject into the next call.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum Failure {
    /// Behave as if the server never answered.
    Unavailable,
    /// Answer with this error envelope.
    Rejected(ApiError),
}

#[derive(Debug, Default)]
struct MemoryState {
    nodes: Vec<Node>,
    fail_next: Option<Failure>,
    calls: usize,
}

/// In-process [`TreeService`] with the same observable rules as the backend.
#[derive(Debug, Default)]
pub struct MemoryTreeService {
    state: Mutex<MemoryState>,
}

impl MemoryTreeService {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodes(nodes: Vec<Node>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                nodes,
                ..Default::default()
            }),
        }
    }

    /// A small tree for offline use.
    pub fn demo() -> Self {
        let mut nodes = vec![
            Node::folder("documents", None, "Documents"),
            Node::folder("reports", Some("documents"), "Reports"),
            Node::file("q1", Some("reports"), "q1-summary.pdf"),
            Node::file("q2", Some("reports"), "q2-summary.pdf"),
            Node::file("notes", Some("documents"), "notes.md"),
            Node::folder("pictures", None, "Pictures"),
            Node::folder("holiday", Some("pictures"), "Holiday 2024"),
            Node::file("beach", Some("holiday"), "beach.jpg"),
            Node::file("avatar", Some("pictures"), "avatar.png"),
            Node::folder("archive", None, "Archive"),
            Node::file("todo", None, "todo.txt"),
        ];
        let now = Utc::now();
        for node in &mut nodes {
            node.created_at = Some(now);
            node.updated_at = Some(now);
        }
        if let Some(archive) = nodes.iter_mut().find(|n| n.id == "archive") {
            archive.deleted_at = Some(now);
        }
        Self::with_nodes(nodes)
    }

    /// Make the next call fail with `failure`.
    #[cfg(test)]
    pub fn fail_next(&self, failure: Failure) {
        self.lock().fail_next = Some(failure);
    }

    /// Number of calls received so far, failed ones included.
    #[cfg(test)]
    pub fn calls(&self) -> usize {
        self.lock().calls
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> Vec<Node> {
        self.lock().nodes.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self) -> Result<MutexGuard<'_, MemoryState>> {
        let mut state = self.lock();
        state.calls += 1;
        match state.fail_next.take() {
            Some(Failure::Unavailable) => {
                Err(AppError::ServiceUnavailable(UNAVAILABLE_MESSAGE.to_string()))
            }
            Some(Failure::Rejected(err)) => Err(AppError::Api(err)),
            None => Ok(state),
        }
    }
}

fn not_found(what: &str) -> AppError {
    AppError::Api(ApiError::new(404, format!("{what} not found"), "NotFound"))
}

impl MemoryState {
    fn find_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    fn check_parent(&self, parent_id: Option<&str>) -> Result<()> {
        let Some(parent_id) = parent_id else {
            return Ok(());
        };
        match self.nodes.iter().find(|n| n.id == parent_id) {
            Some(parent) if parent.is_folder() && parent.is_active() => Ok(()),
            _ => Err(not_found("Parent folder")),
        }
    }

    fn update_each(&mut self, ids: &[NodeId], mut apply: impl FnMut(&mut Node) -> bool) -> Vec<Node> {
        let now = Utc::now();
        let mut changed = Vec::new();
        for id in ids {
            if let Some(node) = self.find_mut(id) {
                if apply(node) {
                    node.updated_at = Some(now);
                    changed.push(node.clone());
                }
            }
        }
        changed
    }
}

fn new_node(parent_id: Option<&str>, node_type: NodeType, name: &str) -> Node {
    let id = Uuid::new_v4().to_string();
    let mut node = match node_type {
        NodeType::Folder => Node::folder(id, parent_id, name),
        NodeType::File => Node::file(id, parent_id, name),
    };
    let now = Utc::now();
    node.created_at = Some(now);
    node.updated_at = Some(now);
    node
}

#[async_trait]
impl TreeService for MemoryTreeService {
    async fn fetch_tree(&self, include_deleted: bool) -> Result<ApiResponse<Vec<Node>>> {
        let state = self.begin()?;
        let nodes: Vec<Node> = state
            .nodes
            .iter()
            .filter(|n| include_deleted || n.is_active())
            .cloned()
            .collect();
        Ok(ApiResponse::new("Tree loaded successfully", nodes))
    }

    async fn create_folder(&self, parent_id: Option<&str>, name: &str) -> Result<ApiResponse<Node>> {
        let mut state = self.begin()?;
        state.check_parent(parent_id)?;
        let node = new_node(parent_id, NodeType::Folder, name);
        state.nodes.push(node.clone());
        Ok(ApiResponse::new("Folder created successfully", node))
    }

    async fn rename(&self, node_id: &str, name: &str) -> Result<ApiResponse<Node>> {
        let mut state = self.begin()?;
        let node = state.find_mut(node_id).ok_or_else(|| not_found("Node"))?;
        node.name = name.to_string();
        node.updated_at = Some(Utc::now());
        Ok(ApiResponse::new("Node renamed successfully", node.clone()))
    }

    async fn set_favorite(&self, ids: &[NodeId]) -> Result<ApiResponse<Vec<Node>>> {
        let mut state = self.begin()?;
        let changed = state.update_each(ids, |node| {
            node.is_favorite = !node.is_favorite;
            true
        });
        Ok(ApiResponse::new("Favorites updated successfully", changed))
    }

    async fn upload(
        &self,
        parent_id: Option<&str>,
        files: Vec<UploadFile>,
    ) -> Result<ApiResponse<Vec<Node>>> {
        let mut state = self.begin()?;
        state.check_parent(parent_id)?;
        let created: Vec<Node> = files
            .into_iter()
            .map(|file| {
                let mut node = new_node(parent_id, NodeType::File, &file.name);
                node.size = file.bytes.len() as u64;
                node.content_type = file.content_type;
                node
            })
            .collect();
        state.nodes.extend(created.iter().cloned());
        let message = format!("{} file(s) uploaded successfully", created.len());
        Ok(ApiResponse::new(message, created))
    }

    async fn move_nodes(
        &self,
        parent_id: Option<&str>,
        ids: &[NodeId],
    ) -> Result<ApiResponse<Vec<Node>>> {
        let mut state = self.begin()?;
        state.check_parent(parent_id)?;
        if let Some(target) = parent_id {
            let into_self = ids.iter().any(|id| id == target);
            if into_self || descendants_of(ids, &state.nodes).contains(target) {
                return Err(AppError::Api(ApiError::new(
                    400,
                    "Cannot move a folder into itself",
                    "BadRequest",
                )));
            }
        }
        let moved = state.update_each(ids, |node| {
            node.parent_id = parent_id.map(str::to_string);
            true
        });
        Ok(ApiResponse::new("Nodes moved successfully", moved))
    }

    async fn restore(&self, ids: &[NodeId]) -> Result<ApiResponse<Vec<Node>>> {
        let mut state = self.begin()?;
        let restored = state.update_each(ids, |node| node.deleted_at.take().is_some());
        Ok(ApiResponse::new("Nodes restored successfully", restored))
    }

    async fn soft_delete(&self, ids: &[NodeId]) -> Result<ApiResponse<DeleteResult>> {
        let mut state = self.begin()?;
        let now = Utc::now();
        let trashed = state.update_each(ids, |node| {
            if node.is_active() {
                node.deleted_at = Some(now);
                true
            } else {
                false
            }
        });
        let deleted = !trashed.is_empty();
        let message = if deleted {
            "Moved to trash"
        } else {
            "Nothing to move to trash"
        };
        Ok(ApiResponse::new(
            message,
            DeleteResult {
                nodes: trashed,
                deleted,
            },
        ))
    }

    async fn hard_delete(&self, ids: &[NodeId]) -> Result<ApiResponse<DeleteResult>> {
        let mut state = self.begin()?;
        let mut doomed = descendants_of(ids, &state.nodes);
        doomed.extend(ids.iter().cloned());

        let (removed, kept): (Vec<Node>, Vec<Node>) = std::mem::take(&mut state.nodes)
            .into_iter()
            .partition(|n| doomed.contains(&n.id));
        state.nodes = kept;

        let deleted = !removed.is_empty();
        let message = format!("{} item(s) deleted permanently", removed.len());
        Ok(ApiResponse::new(
            message,
            DeleteResult {
                nodes: removed,
                deleted,
            },
        ))
    }
}
