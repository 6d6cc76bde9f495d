//! The state tree owned by the router.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    time::Duration,
};

use shared::domain::{ProjectId, ProjectSummary, Task, TaskId, TaskPosition, TaskType};

use crate::{
    debounce::DebouncedInput,
    drag::{DragController, Point},
    fanout::{Epoch, FanOut},
    guard::MutationGuards,
    message::TaskScope,
    preferences::Preferences,
    remote::Remote,
    session::Session,
};

const MAX_TOASTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Board,
}

/// Surfaces that carry a persistent inline error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feature {
    Session,
    Projects,
    MyTasks,
    ProjectTasks,
    TaskTypes,
    Positions,
    TaskForm,
    Mutation,
    Search,
}

impl From<TaskScope> for Feature {
    fn from(value: TaskScope) -> Self {
        match value {
            TaskScope::Mine => Self::MyTasks,
            TaskScope::Project => Self::ProjectTasks,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub level: ToastLevel,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct Notices {
    toasts: VecDeque<Toast>,
    next_toast_id: u64,
    inline: BTreeMap<Feature, String>,
}

impl Notices {
    pub fn toast(&mut self, level: ToastLevel, text: impl Into<String>) -> u64 {
        self.next_toast_id += 1;
        let id = self.next_toast_id;
        self.toasts.push_back(Toast {
            id,
            level,
            text: text.into(),
        });
        while self.toasts.len() > MAX_TOASTS {
            self.toasts.pop_front();
        }
        id
    }

    pub fn dismiss(&mut self, id: u64) {
        self.toasts.retain(|toast| toast.id != id);
    }

    pub fn toasts(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    /// Id of the most recent toast at `level`, surviving queue eviction
    /// because ids only grow.
    pub fn latest_toast_id(&self, level: ToastLevel) -> Option<u64> {
        self.toasts
            .iter()
            .rev()
            .find(|toast| toast.level == level)
            .map(|toast| toast.id)
    }

    pub fn set_inline(&mut self, feature: Feature, text: impl Into<String>) {
        self.inline.insert(feature, text.into());
    }

    pub fn clear_inline(&mut self, feature: Feature) {
        self.inline.remove(&feature);
    }

    pub fn inline(&self, feature: Feature) -> Option<&str> {
        self.inline.get(&feature).map(String::as_str)
    }

    pub fn clear_all_inline(&mut self) {
        self.inline.clear();
    }
}

/// Displayed task positions for the selected project. Local writes (drag,
/// manual edit) land here first; server echoes only confirm them.
#[derive(Debug, Clone, Default)]
pub struct PositionCache {
    pub status: Remote<ProjectId>,
    entries: BTreeMap<TaskId, Point>,
    unconfirmed: HashMap<TaskId, Point>,
}

impl PositionCache {
    pub fn get(&self, task_id: TaskId) -> Option<Point> {
        self.entries.get(&task_id).copied()
    }

    pub fn set_local(&mut self, task_id: TaskId, position: Point) {
        self.entries.insert(task_id, position);
    }

    pub fn mark_unconfirmed(&mut self, task_id: TaskId, position: Point) {
        self.entries.insert(task_id, position);
        self.unconfirmed.insert(task_id, position);
    }

    pub fn is_unconfirmed(&self, task_id: TaskId) -> bool {
        self.unconfirmed.contains_key(&task_id)
    }

    /// Applies a server snapshot. Positions with a write still in flight,
    /// and the task being dragged, keep their local value. Returns what the
    /// dragged task's entry would be without the drag.
    pub fn apply_snapshot(
        &mut self,
        positions: Vec<TaskPosition>,
        dragging: Option<(TaskId, Point)>,
    ) -> Option<Point> {
        let mut entries: BTreeMap<TaskId, Point> = positions
            .into_iter()
            .map(|p| (p.task_id, Point::new(p.x, p.y)))
            .collect();
        for (task_id, local) in &self.unconfirmed {
            entries.insert(*task_id, *local);
        }
        let underneath = dragging.and_then(|(task_id, live)| {
            let before = entries.get(&task_id).copied();
            entries.insert(task_id, live);
            before
        });
        self.entries = entries;
        underneath
    }

    /// Puts back an entry saved earlier; `None` removes it.
    pub fn restore(&mut self, task_id: TaskId, saved: Option<Point>) {
        match saved {
            Some(position) => self.entries.insert(task_id, position),
            None => self.entries.remove(&task_id),
        };
    }

    /// Confirms an upsert echo. Echoes of anything but the latest requested
    /// position for that task are ignored.
    pub fn confirm(&mut self, saved: TaskPosition) -> bool {
        let echoed = Point::new(saved.x, saved.y);
        if self.unconfirmed.get(&saved.task_id) != Some(&echoed) {
            return false;
        }
        self.unconfirmed.remove(&saved.task_id);
        self.entries.insert(saved.task_id, echoed);
        true
    }

    /// Forgets a failed write if it is still the latest one.
    pub fn reject(&mut self, task_id: TaskId, requested: Point) -> bool {
        if self.unconfirmed.get(&task_id) != Some(&requested) {
            return false;
        }
        self.unconfirmed.remove(&task_id);
        true
    }

    pub fn clear(&mut self) {
        self.status.reset();
        self.entries.clear();
        self.unconfirmed.clear();
    }
}

#[derive(Debug, Clone, Default)]
pub struct Board {
    pub projects: Remote<Vec<ProjectSummary>>,
    pub selected_project: Option<ProjectId>,
    pub my_tasks: FanOut<ProjectId, Task>,
    pub project_tasks: FanOut<ProjectId, Task>,
    pub task_types: Remote<Vec<TaskType>>,
    pub positions: PositionCache,
}

impl Board {
    pub fn tasks(&self, scope: TaskScope) -> &FanOut<ProjectId, Task> {
        match scope {
            TaskScope::Mine => &self.my_tasks,
            TaskScope::Project => &self.project_tasks,
        }
    }

    pub fn tasks_mut(&mut self, scope: TaskScope) -> &mut FanOut<ProjectId, Task> {
        match scope {
            TaskScope::Mine => &mut self.my_tasks,
            TaskScope::Project => &mut self.project_tasks,
        }
    }

    /// The aggregate currently on screen.
    pub fn active_scope(&self) -> TaskScope {
        if self.selected_project.is_some() {
            TaskScope::Project
        } else {
            TaskScope::Mine
        }
    }

    pub fn active_tasks(&self) -> &Remote<Vec<Task>> {
        self.tasks(self.active_scope()).view()
    }

    pub fn project_ids(&self) -> Option<Vec<ProjectId>> {
        self.projects
            .loaded()
            .map(|projects| projects.iter().map(|p| p.project_id).collect())
    }

    pub fn reset(&mut self) {
        self.projects.reset();
        self.selected_project = None;
        self.my_tasks.invalidate();
        self.project_tasks.invalidate();
        self.task_types.reset();
        self.positions.clear();
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub input: DebouncedInput,
    pub results: Remote<Vec<Task>>,
    request_epoch: Epoch,
}

impl SearchState {
    /// Supersedes any search in flight and returns the epoch for the new one.
    pub fn start_request(&mut self) -> Epoch {
        self.request_epoch = self.request_epoch.next();
        self.results = Remote::Loading;
        self.request_epoch
    }

    pub fn is_current(&self, epoch: Epoch) -> bool {
        epoch == self.request_epoch
    }

    pub fn reset(&mut self) {
        self.input.clear();
        self.results.reset();
        self.request_epoch = self.request_epoch.next();
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub view: View,
    pub session: Session,
    pub board: Board,
    pub drag: DragController,
    pub guards: MutationGuards,
    pub search: SearchState,
    pub preferences: Preferences,
    pub notices: Notices,
    pub server_url: String,
    pub search_debounce: Duration,
}

impl AppState {
    pub fn new(
        server_url: impl Into<String>,
        preferences: Preferences,
        search_debounce: Duration,
    ) -> Self {
        Self {
            view: View::Login,
            session: Session::default(),
            board: Board::default(),
            drag: DragController::default(),
            guards: MutationGuards::default(),
            search: SearchState::default(),
            preferences,
            notices: Notices::default(),
            server_url: server_url.into(),
            search_debounce,
        }
    }

    /// Looks a task up in every cache that may hold it, selected project
    /// first, so mutations pick up the most recently observed version.
    pub fn find_task(&self, task_id: TaskId) -> Option<&Task> {
        [
            self.board.project_tasks.view(),
            self.board.my_tasks.view(),
            &self.search.results,
        ]
        .into_iter()
        .filter_map(Remote::loaded)
        .flat_map(|tasks| tasks.iter())
        .find(|task| task.task_id == task_id)
    }

    pub fn task_link(&self, task_id: TaskId) -> String {
        format!("{}/tasks/{}", self.server_url.trim_end_matches('/'), task_id.0)
    }

    /// Drops everything tied to the signed-in user. Local preferences and
    /// toasts survive.
    pub fn sign_out_locally(&mut self) {
        self.session.clear();
        self.guards.reset_all();
        self.drag.cancel();
        self.board.reset();
        self.search.reset();
        self.notices.clear_all_inline();
        self.view = View::Login;
    }
}
