//! Side effects requested by the router and executed by the backend worker.

use std::time::Duration;

use shared::{
    domain::{ProjectId, TaskId},
    protocol::{CreateTaskRequest, SaveTaskRequest},
};

use crate::{
    drag::Point,
    error::Failure,
    fanout::Epoch,
    guard::MutationKind,
    message::{Msg, TaskScope, TaskTransition},
    preferences::Preferences,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchSession,
    EndSession,
    FetchProjects,
    FetchTasks {
        scope: TaskScope,
        project_id: ProjectId,
        epoch: Epoch,
    },
    FetchTaskTypes {
        project_id: ProjectId,
    },
    FetchPositions {
        project_id: ProjectId,
    },
    TransitionTask {
        transition: TaskTransition,
        task_id: TaskId,
        version: i64,
    },
    CreateTask {
        project_id: ProjectId,
        request: CreateTaskRequest,
    },
    SaveTask {
        task_id: TaskId,
        request: SaveTaskRequest,
    },
    UpsertPosition {
        task_id: TaskId,
        position: Point,
    },
    MeasureContainer {
        task_id: TaskId,
    },
    StartDebounce {
        epoch: Epoch,
        delay: Duration,
    },
    SearchTasks {
        query: String,
        epoch: Epoch,
    },
    WriteClipboard {
        text: String,
    },
    SavePreferences(Preferences),
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FetchSession => "fetch_session",
            Self::EndSession => "end_session",
            Self::FetchProjects => "fetch_projects",
            Self::FetchTasks {
                scope: TaskScope::Mine,
                ..
            } => "fetch_my_tasks",
            Self::FetchTasks {
                scope: TaskScope::Project,
                ..
            } => "fetch_project_tasks",
            Self::FetchTaskTypes { .. } => "fetch_task_types",
            Self::FetchPositions { .. } => "fetch_positions",
            Self::TransitionTask {
                transition: TaskTransition::Claim,
                ..
            } => "claim_task",
            Self::TransitionTask {
                transition: TaskTransition::Release,
                ..
            } => "release_task",
            Self::TransitionTask {
                transition: TaskTransition::Complete,
                ..
            } => "complete_task",
            Self::CreateTask { .. } => "create_task",
            Self::SaveTask { .. } => "save_task",
            Self::UpsertPosition { .. } => "upsert_position",
            Self::MeasureContainer { .. } => "measure_container",
            Self::StartDebounce { .. } => "start_debounce",
            Self::SearchTasks { .. } => "search_tasks",
            Self::WriteClipboard { .. } => "write_clipboard",
            Self::SavePreferences(_) => "save_preferences",
        }
    }

    /// The result message this effect would have produced had it failed
    /// with `failure`. Used when an effect cannot be handed to the worker,
    /// so guards and cells still settle.
    pub fn fail(self, failure: Failure) -> Msg {
        match self {
            Self::FetchSession => Msg::SessionLoaded(Err(failure)),
            Self::EndSession => Msg::LoggedOut(Err(failure)),
            Self::FetchProjects => Msg::ProjectsLoaded(Err(failure)),
            Self::FetchTasks {
                scope,
                project_id,
                epoch,
            } => Msg::TasksLoaded {
                scope,
                epoch,
                project_id,
                result: Err(failure),
            },
            Self::FetchTaskTypes { project_id } => Msg::TaskTypesLoaded {
                project_id,
                result: Err(failure),
            },
            Self::FetchPositions { project_id } => Msg::PositionsLoaded {
                project_id,
                result: Err(failure),
            },
            Self::TransitionTask {
                transition,
                task_id,
                ..
            } => Msg::MutationFinished {
                kind: transition.into(),
                task_id: Some(task_id),
                result: Err(failure),
            },
            Self::CreateTask { .. } => Msg::MutationFinished {
                kind: MutationKind::Create,
                task_id: None,
                result: Err(failure),
            },
            Self::SaveTask { task_id, .. } => Msg::MutationFinished {
                kind: MutationKind::Save,
                task_id: Some(task_id),
                result: Err(failure),
            },
            Self::UpsertPosition { task_id, position } => Msg::PositionSaved {
                task_id,
                requested: position,
                result: Err(failure),
            },
            Self::MeasureContainer { task_id } => Msg::ContainerMeasured {
                task_id,
                result: Err(failure),
            },
            Self::StartDebounce { epoch, .. } => Msg::DebounceElapsed { epoch },
            Self::SearchTasks { epoch, .. } => Msg::SearchResults {
                epoch,
                result: Err(failure),
            },
            Self::WriteClipboard { .. } => Msg::ClipboardWritten(Err(failure)),
            Self::SavePreferences(_) => Msg::PreferencesSaved(Err(failure)),
        }
    }
}
