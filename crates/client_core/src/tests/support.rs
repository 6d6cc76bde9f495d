//! In-memory `TrackerApi` shared by the worker and program tests.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use shared::{
    domain::{
        ProjectId, ProjectSummary, Role, Task, TaskId, TaskPosition, TaskStatus, TaskType,
        TaskTypeId, User, UserId,
    },
    error::ApiError,
    protocol::{CreateTaskRequest, SaveTaskRequest, TaskListQuery},
};

use crate::{api::TrackerApi, drag::Point, message::TaskTransition};

pub(crate) fn member() -> User {
    User {
        user_id: UserId(5),
        username: "alice".to_string(),
        role: Role::Member,
    }
}

pub(crate) fn task(task_id: i64, project_id: i64, version: i64) -> Task {
    Task {
        task_id: TaskId(task_id),
        project_id: ProjectId(project_id),
        task_type_id: TaskTypeId(1),
        title: format!("task {task_id}"),
        description: String::new(),
        priority: 3,
        status: TaskStatus::Available,
        claimed_by: None,
        version,
        created_at: None,
        updated_at: None,
    }
}

#[derive(Default)]
pub(crate) struct FakeApi {
    pub user: Option<User>,
    pub projects: Vec<ProjectSummary>,
    pub tasks: HashMap<ProjectId, Vec<Task>>,
    pub transition_error: Option<ApiError>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeApi {
    /// Signed-in member with projects 7 (3 tasks) and 9 (2 tasks).
    pub(crate) fn with_two_projects() -> Self {
        let mut tasks = HashMap::new();
        tasks.insert(ProjectId(7), (1..4).map(|id| task(id, 7, 1)).collect());
        tasks.insert(ProjectId(9), (10..12).map(|id| task(id, 9, 1)).collect());
        Self {
            user: Some(member()),
            projects: [7, 9]
                .into_iter()
                .map(|id| ProjectSummary {
                    project_id: ProjectId(id),
                    name: format!("project {id}"),
                })
                .collect(),
            tasks,
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    fn record(&self, call: impl Into<String>) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call.into());
        }
    }

    fn find(&self, task_id: TaskId) -> Result<Task, ApiError> {
        self.tasks
            .values()
            .flatten()
            .find(|task| task.task_id == task_id)
            .cloned()
            .ok_or_else(|| ApiError::new(404, format!("task {task_id} not found")))
    }
}

#[async_trait]
impl TrackerApi for FakeApi {
    async fn who_am_i(&self) -> Result<User, ApiError> {
        self.record("who_am_i");
        self.user
            .clone()
            .ok_or_else(|| ApiError::new(401, "not signed in"))
    }

    async fn end_session(&self) -> Result<(), ApiError> {
        self.record("end_session");
        Ok(())
    }

    async fn list_projects(&self) -> Result<Vec<ProjectSummary>, ApiError> {
        self.record("list_projects");
        Ok(self.projects.clone())
    }

    async fn list_task_types(&self, project_id: ProjectId) -> Result<Vec<TaskType>, ApiError> {
        self.record(format!("list_task_types {project_id}"));
        Ok(vec![TaskType {
            task_type_id: TaskTypeId(1),
            project_id,
            name: "Bug".to_string(),
        }])
    }

    async fn list_tasks(
        &self,
        project_id: ProjectId,
        query: TaskListQuery,
    ) -> Result<Vec<Task>, ApiError> {
        let scope = if query.claimed_by.is_some() { "mine" } else { "all" };
        self.record(format!("list_tasks {project_id} {scope}"));
        Ok(self.tasks.get(&project_id).cloned().unwrap_or_default())
    }

    async fn search_tasks(&self, query: &str) -> Result<Vec<Task>, ApiError> {
        self.record(format!("search_tasks {query}"));
        Ok(self
            .tasks
            .values()
            .flatten()
            .filter(|task| task.title.contains(query))
            .cloned()
            .collect())
    }

    async fn create_task(
        &self,
        project_id: ProjectId,
        request: &CreateTaskRequest,
    ) -> Result<Task, ApiError> {
        self.record(format!("create_task {project_id}"));
        let mut created = task(100, project_id.0, 1);
        created.title = request.title.clone();
        Ok(created)
    }

    async fn save_task(
        &self,
        task_id: TaskId,
        request: &SaveTaskRequest,
    ) -> Result<Task, ApiError> {
        self.record(format!("save_task {task_id}"));
        let mut saved = self.find(task_id)?;
        saved.title = request.title.clone();
        saved.version = request.version + 1;
        Ok(saved)
    }

    async fn transition_task(
        &self,
        transition: TaskTransition,
        task_id: TaskId,
        version: i64,
    ) -> Result<Task, ApiError> {
        self.record(format!("transition {transition:?} {task_id} v{version}"));
        if let Some(error) = &self.transition_error {
            return Err(error.clone());
        }
        let mut updated = self.find(task_id)?;
        updated.version = version + 1;
        Ok(updated)
    }

    async fn list_positions(&self, project_id: ProjectId) -> Result<Vec<TaskPosition>, ApiError> {
        self.record(format!("list_positions {project_id}"));
        Ok(Vec::new())
    }

    async fn upsert_position(
        &self,
        task_id: TaskId,
        position: Point,
    ) -> Result<TaskPosition, ApiError> {
        self.record(format!("upsert_position {task_id} {} {}", position.x, position.y));
        Ok(TaskPosition {
            task_id,
            x: position.x,
            y: position.y,
        })
    }
}
