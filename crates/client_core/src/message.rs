//! Every input the router reacts to: user intents, pointer events, and
//! effect results.

use shared::domain::{
    ProjectId, ProjectSummary, Task, TaskId, TaskPosition, TaskType, TaskTypeId, User,
};

use crate::{
    drag::Point,
    error::Failure,
    fanout::Epoch,
    guard::MutationKind,
    preferences::{LayoutMode, Theme},
};

/// Which task aggregate a list fetch feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskScope {
    /// Tasks claimed by the current member, across all their projects.
    Mine,
    /// Every task of the selected project.
    Project,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskTransition {
    Claim,
    Release,
    Complete,
}

impl From<TaskTransition> for MutationKind {
    fn from(value: TaskTransition) -> Self {
        match value {
            TaskTransition::Claim => MutationKind::Claim,
            TaskTransition::Release => MutationKind::Release,
            TaskTransition::Complete => MutationKind::Complete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: u8,
    pub task_type_id: TaskTypeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEdit {
    pub title: String,
    pub description: String,
    pub priority: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    Boot,
    SessionLoaded(Result<User, Failure>),
    Logout,
    LoggedOut(Result<(), Failure>),

    ProjectsLoaded(Result<Vec<ProjectSummary>, Failure>),
    /// `None` selects the cross-project "my tasks" view.
    SelectProject(Option<ProjectId>),
    RefreshTasks,
    TasksLoaded {
        scope: TaskScope,
        epoch: Epoch,
        project_id: ProjectId,
        result: Result<Vec<Task>, Failure>,
    },
    TaskTypesLoaded {
        project_id: ProjectId,
        result: Result<Vec<TaskType>, Failure>,
    },

    Transition {
        transition: TaskTransition,
        task_id: TaskId,
    },
    CreateTask(TaskDraft),
    SaveTask {
        task_id: TaskId,
        edit: TaskEdit,
    },
    MutationFinished {
        kind: MutationKind,
        task_id: Option<TaskId>,
        result: Result<Task, Failure>,
    },

    PositionsLoaded {
        project_id: ProjectId,
        result: Result<Vec<TaskPosition>, Failure>,
    },
    PointerDown {
        task_id: TaskId,
        offset: Point,
    },
    ContainerMeasured {
        task_id: TaskId,
        result: Result<Point, Failure>,
    },
    PointerMove {
        client: Point,
    },
    PointerUp,
    PointerLeave,
    SetPosition {
        task_id: TaskId,
        position: Point,
    },
    PositionSaved {
        task_id: TaskId,
        requested: Point,
        result: Result<TaskPosition, Failure>,
    },

    SearchInput(String),
    DebounceElapsed {
        epoch: Epoch,
    },
    SearchResults {
        epoch: Epoch,
        result: Result<Vec<Task>, Failure>,
    },

    CopyTaskLink(TaskId),
    ClipboardWritten(Result<(), Failure>),

    SetTheme(Theme),
    ToggleFilters,
    SetLayout(LayoutMode),
    PreferencesSaved(Result<(), Failure>),

    DismissToast(u64),
}

impl Msg {
    /// The failure carried by an effect result, if any. The session guard
    /// inspects this before the message reaches its feature handler.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::SessionLoaded(Err(failure))
            | Self::LoggedOut(Err(failure))
            | Self::ProjectsLoaded(Err(failure))
            | Self::TasksLoaded {
                result: Err(failure),
                ..
            }
            | Self::TaskTypesLoaded {
                result: Err(failure),
                ..
            }
            | Self::MutationFinished {
                result: Err(failure),
                ..
            }
            | Self::PositionsLoaded {
                result: Err(failure),
                ..
            }
            | Self::ContainerMeasured {
                result: Err(failure),
                ..
            }
            | Self::PositionSaved {
                result: Err(failure),
                ..
            }
            | Self::SearchResults {
                result: Err(failure),
                ..
            }
            | Self::ClipboardWritten(Err(failure))
            | Self::PreferencesSaved(Err(failure)) => Some(failure),
            _ => None,
        }
    }
}
