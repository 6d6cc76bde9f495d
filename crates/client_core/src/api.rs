//! HTTP access to the tracker server.
//!
//! Every call resolves to `Result<_, ApiError>`; non-2xx responses are
//! decoded from the server's `{status, message}` body when present.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{ProjectId, ProjectSummary, Task, TaskId, TaskPosition, TaskType, User},
    error::ApiError,
    protocol::{
        ClaimedByFilter, CreateTaskRequest, PositionUpsertRequest, SaveTaskRequest, SearchQuery,
        TaskListQuery, VersionedRequest,
    },
};
use tracing::debug;
use url::Url;

use crate::{drag::Point, message::TaskTransition};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait TrackerApi: Send + Sync {
    async fn who_am_i(&self) -> Result<User, ApiError>;
    async fn end_session(&self) -> Result<(), ApiError>;
    async fn list_projects(&self) -> Result<Vec<ProjectSummary>, ApiError>;
    async fn list_task_types(&self, project_id: ProjectId) -> Result<Vec<TaskType>, ApiError>;
    async fn list_tasks(
        &self,
        project_id: ProjectId,
        query: TaskListQuery,
    ) -> Result<Vec<Task>, ApiError>;
    async fn search_tasks(&self, query: &str) -> Result<Vec<Task>, ApiError>;
    async fn create_task(
        &self,
        project_id: ProjectId,
        request: &CreateTaskRequest,
    ) -> Result<Task, ApiError>;
    async fn save_task(&self, task_id: TaskId, request: &SaveTaskRequest)
        -> Result<Task, ApiError>;
    async fn transition_task(
        &self,
        transition: TaskTransition,
        task_id: TaskId,
        version: i64,
    ) -> Result<Task, ApiError>;
    async fn list_positions(&self, project_id: ProjectId) -> Result<Vec<TaskPosition>, ApiError>;
    async fn upsert_position(
        &self,
        task_id: TaskId,
        position: Point,
    ) -> Result<TaskPosition, ApiError>;
}

pub struct HttpTrackerApi {
    http: Client,
    server_url: String,
    token: Option<String>,
}

impl HttpTrackerApi {
    pub fn new(server_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let parsed = Url::parse(server_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("unsupported server url scheme: {}", parsed.scheme());
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            server_url: server_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|token| !token.is_empty());
        self
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|err| ApiError::transport(err.to_string()))?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(decode_error(response).await)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|err| ApiError::transport(format!("malformed response: {err}")))
    }
}

async fn decode_error(response: Response) -> ApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), "request rejected");
    match serde_json::from_str::<ApiError>(&body) {
        Ok(error) => error,
        Err(_) => {
            let message = if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                body
            };
            ApiError::new(status.as_u16(), message)
        }
    }
}

fn transition_path(transition: TaskTransition) -> &'static str {
    match transition {
        TaskTransition::Claim => "claim",
        TaskTransition::Release => "release",
        TaskTransition::Complete => "complete",
    }
}

#[async_trait]
impl TrackerApi for HttpTrackerApi {
    async fn who_am_i(&self) -> Result<User, ApiError> {
        let url = format!("{}/session", self.server_url);
        self.send_json(self.http.get(url)).await
    }

    async fn end_session(&self) -> Result<(), ApiError> {
        let url = format!("{}/session", self.server_url);
        self.send(self.http.delete(url)).await?;
        Ok(())
    }

    async fn list_projects(&self) -> Result<Vec<ProjectSummary>, ApiError> {
        let url = format!("{}/projects", self.server_url);
        self.send_json(self.http.get(url)).await
    }

    async fn list_task_types(&self, project_id: ProjectId) -> Result<Vec<TaskType>, ApiError> {
        let url = format!("{}/projects/{}/task_types", self.server_url, project_id);
        self.send_json(self.http.get(url)).await
    }

    async fn list_tasks(
        &self,
        project_id: ProjectId,
        query: TaskListQuery,
    ) -> Result<Vec<Task>, ApiError> {
        let url = format!("{}/projects/{}/tasks", self.server_url, project_id);
        self.send_json(self.http.get(url).query(&query)).await
    }

    async fn search_tasks(&self, query: &str) -> Result<Vec<Task>, ApiError> {
        let url = format!("{}/tasks/search", self.server_url);
        let query = SearchQuery {
            q: query.to_string(),
        };
        self.send_json(self.http.get(url).query(&query)).await
    }

    async fn create_task(
        &self,
        project_id: ProjectId,
        request: &CreateTaskRequest,
    ) -> Result<Task, ApiError> {
        let url = format!("{}/projects/{}/tasks", self.server_url, project_id);
        self.send_json(self.http.post(url).json(request)).await
    }

    async fn save_task(
        &self,
        task_id: TaskId,
        request: &SaveTaskRequest,
    ) -> Result<Task, ApiError> {
        let url = format!("{}/tasks/{}", self.server_url, task_id);
        self.send_json(self.http.put(url).json(request)).await
    }

    async fn transition_task(
        &self,
        transition: TaskTransition,
        task_id: TaskId,
        version: i64,
    ) -> Result<Task, ApiError> {
        let url = format!(
            "{}/tasks/{}/{}",
            self.server_url,
            task_id,
            transition_path(transition)
        );
        self.send_json(self.http.post(url).json(&VersionedRequest { version }))
            .await
    }

    async fn list_positions(&self, project_id: ProjectId) -> Result<Vec<TaskPosition>, ApiError> {
        let url = format!("{}/projects/{}/positions", self.server_url, project_id);
        self.send_json(self.http.get(url)).await
    }

    async fn upsert_position(
        &self,
        task_id: TaskId,
        position: Point,
    ) -> Result<TaskPosition, ApiError> {
        let url = format!("{}/tasks/{}/position", self.server_url, task_id);
        let body = PositionUpsertRequest {
            x: position.x,
            y: position.y,
        };
        self.send_json(self.http.put(url).json(&body)).await
    }
}

/// Query for the "my tasks" aggregate.
pub fn claimed_by_me() -> TaskListQuery {
    TaskListQuery {
        claimed_by: Some(ClaimedByFilter::Me),
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
