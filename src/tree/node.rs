use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque node identifier assigned by the tree service.
pub type NodeId = String;

/// Kind of tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    File,
    Folder,
}

/// A file or folder record as stored in the flat cache.
///
/// Only `id`, `parent_id`, `node_type`, `name`, `is_favorite` and
/// `deleted_at` are structurally significant; the rest is carried for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    /// Set when the node is in the trash.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Node {
    /// Create a folder record with no descriptive attributes.
    pub fn folder(id: impl Into<NodeId>, parent_id: Option<&str>, name: impl Into<String>) -> Self {
        Self::bare(id.into(), parent_id, NodeType::Folder, name.into())
    }

    /// Create a file record with no descriptive attributes.
    pub fn file(id: impl Into<NodeId>, parent_id: Option<&str>, name: impl Into<String>) -> Self {
        Self::bare(id.into(), parent_id, NodeType::File, name.into())
    }

    fn bare(id: NodeId, parent_id: Option<&str>, node_type: NodeType, name: String) -> Self {
        Self {
            id,
            parent_id: parent_id.map(str::to_string),
            node_type,
            name,
            color: None,
            is_favorite: false,
            deleted_at: None,
            size: 0,
            content_type: None,
            url: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.node_type == NodeType::Folder
    }

    /// Not trashed.
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Render-facing nested node, always derived from the flat node set.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub id: NodeId,
    pub node_type: NodeType,
    pub name: String,
    pub color: Option<String>,
    pub is_favorite: bool,
    /// `Some` only for folders that have at least one child.
    pub children: Option<Vec<TreeNode>>,
}

impl TreeNode {
    pub fn is_folder(&self) -> bool {
        self.node_type == NodeType::Folder
    }

    /// Count of this node plus every descendant.
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(TreeNode::subtree_len)
            .sum::<usize>()
    }
}

impl From<&Node> for TreeNode {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            node_type: node.node_type,
            name: node.name.clone(),
            color: node.color.clone(),
            is_favorite: node.is_favorite,
            children: None,
        }
    }
}
