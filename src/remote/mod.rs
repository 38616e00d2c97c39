//! Boundary to the remote tree service.
//!
//! The store only sees [`TreeService`]; [`HttpTreeService`] talks to the real
//! backend and [`MemoryTreeService`] keeps everything in-process.

pub mod envelope;
pub mod http;
pub mod memory;

use async_trait::async_trait;

pub use envelope::{ApiError, ApiResponse, DeleteResult};
pub use http::HttpTreeService;
pub use memory::MemoryTreeService;

use crate::error::Result;
use crate::tree::node::{Node, NodeId};

/// A local file handed to the service as an opaque upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Tree CRUD operations offered by the backend.
///
/// `parent_id == None` always means the tree root.
#[async_trait]
pub trait TreeService: Send + Sync {
    async fn fetch_tree(&self, include_deleted: bool) -> Result<ApiResponse<Vec<Node>>>;

    async fn create_folder(&self, parent_id: Option<&str>, name: &str) -> Result<ApiResponse<Node>>;

    async fn rename(&self, node_id: &str, name: &str) -> Result<ApiResponse<Node>>;

    /// Toggle the favorite flag of every listed node.
    async fn set_favorite(&self, ids: &[NodeId]) -> Result<ApiResponse<Vec<Node>>>;

    async fn upload(
        &self,
        parent_id: Option<&str>,
        files: Vec<UploadFile>,
    ) -> Result<ApiResponse<Vec<Node>>>;

    async fn move_nodes(
        &self,
        parent_id: Option<&str>,
        ids: &[NodeId],
    ) -> Result<ApiResponse<Vec<Node>>>;

    async fn restore(&self, ids: &[NodeId]) -> Result<ApiResponse<Vec<Node>>>;

    async fn soft_delete(&self, ids: &[NodeId]) -> Result<ApiResponse<DeleteResult>>;

    async fn hard_delete(&self, ids: &[NodeId]) -> Result<ApiResponse<DeleteResult>>;
}
