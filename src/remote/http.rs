use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::{ApiError, ApiResponse, DeleteResult, TreeService, UploadFile};
use crate::error::{AppError, Result};
use crate::tree::node::{Node, NodeId};

/// Message shown when no response arrives at all.
pub const UNAVAILABLE_MESSAGE: &str = "Server unavailable. Check your connection.";

/// [`TreeService`] backed by the HTTP tree API.
pub struct HttpTreeService {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTreeService {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<ApiResponse<T>> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(|e| transport_error(&e, path))?;
        let status = response.status();

        if status.is_success() {
            let body = response.bytes().await.map_err(|e| transport_error(&e, path))?;
            let decoded: ApiResponse<T> = serde_json::from_slice(&body)?;
            tracing::debug!(path, status = status.as_u16(), "tree service responded");
            Ok(decoded)
        } else {
            let body = response.text().await.unwrap_or_default();
            let err = ApiError::from_body(status.as_u16(), &body, path);
            tracing::debug!(path, status = err.status, kind = %err.error, "tree service rejected request");
            Err(AppError::Api(err))
        }
    }
}

fn transport_error(err: &reqwest::Error, path: &str) -> AppError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        tracing::warn!(path, error = %err, "tree service unreachable");
        AppError::ServiceUnavailable(UNAVAILABLE_MESSAGE.to_string())
    } else {
        AppError::Api(ApiError::new(500, err.to_string(), "InternalError"))
    }
}

#[async_trait]
impl TreeService for HttpTreeService {
    async fn fetch_tree(&self, include_deleted: bool) -> Result<ApiResponse<Vec<Node>>> {
        let path = "/tree/user";
        let request = self
            .client
            .get(self.url(path))
            .query(&[("deleted", include_deleted)]);
        self.send::<Option<Vec<Node>>>(request, path)
            .await
            .map(ApiResponse::or_default)
    }

    async fn create_folder(&self, parent_id: Option<&str>, name: &str) -> Result<ApiResponse<Node>> {
        let path = "/tree/add-folder";
        let request = self
            .client
            .post(self.url(path))
            .json(&json!({ "parentId": parent_id, "name": name }));
        self.send(request, path).await
    }

    async fn rename(&self, node_id: &str, name: &str) -> Result<ApiResponse<Node>> {
        let path = "/tree/rename";
        let request = self
            .client
            .put(self.url(path))
            .json(&json!({ "nodeId": node_id, "name": name }));
        self.send(request, path).await
    }

    async fn set_favorite(&self, ids: &[NodeId]) -> Result<ApiResponse<Vec<Node>>> {
        let path = "/tree/favorite";
        let request = self.client.put(self.url(path)).json(&json!({ "ids": ids }));
        self.send(request, path).await
    }

    async fn upload(
        &self,
        parent_id: Option<&str>,
        files: Vec<UploadFile>,
    ) -> Result<ApiResponse<Vec<Node>>> {
        let path = "/tree/upload";
        let mut form = multipart::Form::new();
        if let Some(parent_id) = parent_id {
            form = form.text("parentId", parent_id.to_string());
        }
        for file in files {
            let mut part = multipart::Part::bytes(file.bytes).file_name(file.name);
            if let Some(content_type) = file.content_type.as_deref() {
                part = part.mime_str(content_type).map_err(|e| {
                    AppError::Validation(format!("invalid content type {content_type}: {e}"))
                })?;
            }
            form = form.part("files", part);
        }
        let request = self.client.post(self.url(path)).multipart(form);
        self.send(request, path).await
    }

    async fn move_nodes(
        &self,
        parent_id: Option<&str>,
        ids: &[NodeId],
    ) -> Result<ApiResponse<Vec<Node>>> {
        let path = "/tree/update-parent";
        let request = self
            .client
            .put(self.url(path))
            .json(&json!({ "parentId": parent_id, "nodesIds": ids }));
        self.send(request, path).await
    }

    async fn restore(&self, ids: &[NodeId]) -> Result<ApiResponse<Vec<Node>>> {
        let path = "/tree/restore";
        let request = self.client.put(self.url(path)).json(ids);
        self.send(request, path).await
    }

    async fn soft_delete(&self, ids: &[NodeId]) -> Result<ApiResponse<DeleteResult>> {
        let path = "/tree/trash";
        let request = self.client.put(self.url(path)).json(ids);
        self.send::<Option<DeleteResult>>(request, path)
            .await
            .map(ApiResponse::or_default)
    }

    async fn hard_delete(&self, ids: &[NodeId]) -> Result<ApiResponse<DeleteResult>> {
        let path = "/tree/delete";
        let request = self.client.delete(self.url(path)).json(ids);
        self.send::<Option<DeleteResult>>(request, path)
            .await
            .map(ApiResponse::or_default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let service =
            HttpTreeService::new("http://localhost:8080/", None, Duration::from_secs(1)).unwrap();
        assert_eq!(service.url("/tree/user"), "http://localhost:8080/tree/user");
    }

    #[tokio::test]
    async fn unreachable_server_is_service_unavailable() {
        // Port 9 (discard) on loopback is closed on CI machines; connect fails fast.
        let service =
            HttpTreeService::new("http://127.0.0.1:9", None, Duration::from_secs(2)).unwrap();
        let err = service.fetch_tree(false).await.unwrap_err();
        assert!(err.is_unavailable(), "unexpected error: {err:?}");
        assert_eq!(err.to_string(), UNAVAILABLE_MESSAGE);
    }
}
