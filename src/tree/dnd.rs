//! Drag-and-drop controller.
//!
//! A gesture is a short-lived value: it is created on drag start (or when
//! external files are pasted), follows the pointer across surfaces while
//! tracking whether the current drop target is valid, and is consumed by a
//! drop or a cancel. Nothing in here talks to the store until a drop has
//! been turned into a [`DropIntent`].

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{AppError, Result};
use crate::remote::UploadFile;
use crate::tree::model::{self, DropTarget};
use crate::tree::node::{Node, NodeId, NodeType};
use crate::tree::selection::Selection;
use crate::tree::store::TreeStore;

/// What the pointer is over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Surface {
    /// A rendered node row or card.
    Node {
        id: NodeId,
        node_type: NodeType,
        parent_id: Option<NodeId>,
    },
    /// Empty space of a panel listing the children of a folder (`None` = root).
    Container(Option<NodeId>),
    /// Anything that is not a drop zone.
    Outside,
}

impl Surface {
    pub fn of(node: &Node) -> Self {
        Surface::Node {
            id: node.id.clone(),
            node_type: node.node_type,
            parent_id: node.parent_id.clone(),
        }
    }

    /// A folder is its own target, a file targets its parent.
    pub fn drop_target(&self) -> DropTarget {
        match self {
            Surface::Node {
                id,
                node_type: NodeType::Folder,
                ..
            } => DropTarget::Folder(id.clone()),
            Surface::Node { parent_id, .. } | Surface::Container(parent_id) => match parent_id {
                Some(id) => DropTarget::Folder(id.clone()),
                None => DropTarget::Root,
            },
            Surface::Outside => DropTarget::Nowhere,
        }
    }

    fn folder_id(&self) -> Option<&str> {
        match self {
            Surface::Node {
                id,
                node_type: NodeType::Folder,
                ..
            } => Some(id),
            _ => None,
        }
    }
}

/// What a gesture carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragPayload {
    Nodes(Vec<NodeId>),
    Files(Vec<PathBuf>),
}

impl DragPayload {
    /// Serialized form of a node payload: a JSON array of ids.
    #[cfg(test)]
    pub fn encode(ids: &[NodeId]) -> Result<String> {
        Ok(serde_json::to_string(ids)?)
    }

    /// Interpret pasted text: a JSON id list moves nodes, anything else is
    /// read as local file paths.
    pub fn from_transfer(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Ok(ids) = serde_json::from_str::<Vec<NodeId>>(text) {
            return (!ids.is_empty()).then_some(DragPayload::Nodes(ids));
        }
        let paths = split_pasted_paths(text);
        (!paths.is_empty()).then_some(DragPayload::Files(paths))
    }
}

/// Split text pasted by a terminal file drop into paths.
///
/// Terminals differ: one path per line, space-separated with backslash
/// escapes, single or double quoted, or `file://` URIs.
pub fn split_pasted_paths(text: &str) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if Path::new(line).exists() {
            paths.push(PathBuf::from(line));
            continue;
        }
        paths.extend(split_words(line).into_iter().map(|word| {
            let word = word.strip_prefix("file://").unwrap_or(&word).to_string();
            PathBuf::from(word)
        }));
    }
    paths
}

fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => quote = Some(c),
            (None, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            (None, c) if c.is_whitespace() => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            (None, c) => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    Dragging,
    HoveringValid(DropTarget),
    HoveringInvalid,
}

/// A resolved drop, ready to run against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropIntent {
    Upload {
        parent_id: Option<NodeId>,
        files: Vec<PathBuf>,
    },
    Move {
        parent_id: Option<NodeId>,
        ids: Vec<NodeId>,
    },
}

impl DropIntent {
    pub fn parent_id(&self) -> Option<&str> {
        match self {
            DropIntent::Upload { parent_id, .. } | DropIntent::Move { parent_id, .. } => {
                parent_id.as_deref()
            }
        }
    }

    /// Run the intent and return the service's message.
    pub async fn execute(self, store: &TreeStore) -> Result<String> {
        match self {
            DropIntent::Upload { parent_id, files } => {
                let mut uploads = Vec::with_capacity(files.len());
                for path in &files {
                    uploads.push(read_upload(path).await?);
                }
                tracing::info!(count = uploads.len(), parent = ?parent_id, "uploading dropped files");
                let response = store.upload_files(parent_id.as_deref(), uploads).await?;
                Ok(response.message)
            }
            DropIntent::Move { parent_id, ids } => {
                tracing::info!(count = ids.len(), parent = ?parent_id, "moving dropped nodes");
                let response = store.move_nodes(parent_id.as_deref(), &ids).await?;
                Ok(response.message)
            }
        }
    }
}

async fn read_upload(path: &Path) -> Result<UploadFile> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AppError::Validation(format!("Not a file: {}", path.display())))?
        .to_string();
    let bytes = tokio::fs::read(path).await?;
    let content_type = mime_guess::from_path(path).first().map(|m| m.to_string());
    Ok(UploadFile {
        name,
        content_type,
        bytes,
    })
}

#[derive(Debug, Clone)]
struct DragGesture {
    payload: DragPayload,
    phase: DragPhase,
    /// Folder under the pointer and when the pointer arrived on it.
    hovered_folder: Option<(NodeId, Instant)>,
    /// Folders already auto-expanded during this gesture.
    expanded: Vec<NodeId>,
}

/// Drives one drag gesture at a time.
#[derive(Debug, Clone)]
pub struct DragController {
    gesture: Option<DragGesture>,
    hover_expand: Duration,
}

impl DragController {
    pub fn new(hover_expand: Duration) -> Self {
        Self {
            gesture: None,
            hover_expand,
        }
    }

    /// Start dragging `id`: the whole selection travels if `id` is part of it.
    pub fn start(&mut self, id: &str, selection: &Selection) {
        let ids = if selection.contains(id) {
            selection.selected.clone()
        } else {
            vec![id.to_string()]
        };
        tracing::trace!(count = ids.len(), "drag started");
        self.begin(DragPayload::Nodes(ids));
    }

    /// Start a gesture carrying local files, or a pasted payload.
    pub fn start_with(&mut self, payload: DragPayload) {
        self.begin(payload);
    }

    fn begin(&mut self, payload: DragPayload) {
        self.gesture = Some(DragGesture {
            payload,
            phase: DragPhase::Dragging,
            hovered_folder: None,
            expanded: Vec::new(),
        });
    }

    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    pub fn phase(&self) -> DragPhase {
        self.gesture
            .as_ref()
            .map_or(DragPhase::Idle, |g| g.phase.clone())
    }

    pub fn payload(&self) -> Option<&DragPayload> {
        self.gesture.as_ref().map(|g| &g.payload)
    }

    /// The valid target currently hovered, if any.
    pub fn hover_target(&self) -> Option<&DropTarget> {
        match self.gesture.as_ref().map(|g| &g.phase) {
            Some(DragPhase::HoveringValid(target)) => Some(target),
            _ => None,
        }
    }

    /// Pointer moved over `surface`. Re-evaluates validity every time.
    pub fn hover(&mut self, surface: &Surface, nodes: &[Node], now: Instant) {
        let Some(gesture) = self.gesture.as_mut() else {
            return;
        };
        let target = surface.drop_target();
        let valid = match &gesture.payload {
            DragPayload::Nodes(ids) => model::can_move_to(nodes, ids, &target),
            DragPayload::Files(_) => target.parent_id().is_some(),
        };

        if !valid {
            if gesture.phase != DragPhase::HoveringInvalid {
                tracing::trace!(?target, "drop target rejected");
            }
            gesture.phase = DragPhase::HoveringInvalid;
            gesture.hovered_folder = None;
            return;
        }

        gesture.phase = DragPhase::HoveringValid(target);
        match surface.folder_id() {
            Some(folder) => {
                let same = gesture
                    .hovered_folder
                    .as_ref()
                    .is_some_and(|(id, _)| id == folder);
                if !same {
                    gesture.hovered_folder = Some((folder.to_string(), now));
                }
            }
            None => gesture.hovered_folder = None,
        }
    }

    /// Folder to auto-expand after a stable valid hover. Fires once per folder per gesture.
    pub fn tick(&mut self, now: Instant) -> Option<NodeId> {
        let gesture = self.gesture.as_mut()?;
        if !matches!(gesture.phase, DragPhase::HoveringValid(_)) {
            return None;
        }
        let (folder, since) = gesture.hovered_folder.as_ref()?;
        if now.duration_since(*since) < self.hover_expand || gesture.expanded.contains(folder) {
            return None;
        }
        let folder = folder.clone();
        gesture.expanded.push(folder.clone());
        Some(folder)
    }

    /// Pointer left the drop zone: the gesture ends without effect.
    pub fn leave(&mut self) {
        self.cancel();
    }

    pub fn cancel(&mut self) {
        if self.gesture.take().is_some() {
            tracing::trace!("drag cancelled");
        }
    }

    /// End the gesture. Only a recorded valid hover produces an intent.
    pub fn drop_intent(&mut self) -> Option<DropIntent> {
        let gesture = self.gesture.take()?;
        let DragPhase::HoveringValid(target) = gesture.phase else {
            tracing::trace!("drop without valid target");
            return None;
        };
        let parent_id = target.parent_id()?.map(str::to_string);
        Some(match gesture.payload {
            DragPayload::Files(files) => DropIntent::Upload { parent_id, files },
            DragPayload::Nodes(ids) => DropIntent::Move { parent_id, ids },
        })
    }
}
