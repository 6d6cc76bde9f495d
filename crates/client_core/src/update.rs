//! The message router: the only code that mutates [`AppState`].
//!
//! `update` is synchronous and pure apart from logging; every side effect
//! is returned as an [`Effect`] for the dispatcher to run.

use shared::{
    domain::{ProjectId, ProjectSummary, Task, TaskId, TaskPosition, TaskType, User},
    protocol::{CreateTaskRequest, SaveTaskRequest},
};
use tracing::{debug, info, warn};

use crate::{
    drag::Point,
    effect::Effect,
    error::{
        normalize_query, validate_position, validate_priority, validate_title, Failure,
        ValidationError,
    },
    fanout::{Epoch, FanIn},
    guard::MutationKind,
    message::{Msg, TaskDraft, TaskEdit, TaskScope, TaskTransition},
    preferences::{LayoutMode, Theme},
    remote::Remote,
    session,
    state::{AppState, Feature, ToastLevel, View},
};

pub fn update(state: &mut AppState, msg: Msg) -> Vec<Effect> {
    if let Some(failure) = msg.failure() {
        if session::intercept(state, failure) {
            return Vec::new();
        }
    }

    match msg {
        Msg::Boot => handle_boot(state),
        Msg::SessionLoaded(result) => handle_session_loaded(state, result),
        Msg::Logout => handle_logout(state),
        Msg::LoggedOut(result) => {
            if let Err(failure) = result {
                warn!("server-side logout failed: {failure}");
            }
            Vec::new()
        }

        Msg::ProjectsLoaded(result) => handle_projects_loaded(state, result),
        Msg::SelectProject(project_id) => handle_select_project(state, project_id),
        Msg::RefreshTasks => reload_active_tasks(state),
        Msg::TasksLoaded {
            scope,
            epoch,
            project_id,
            result,
        } => handle_tasks_loaded(state, scope, epoch, project_id, result),
        Msg::TaskTypesLoaded { project_id, result } => {
            handle_task_types_loaded(state, project_id, result)
        }

        Msg::Transition {
            transition,
            task_id,
        } => handle_transition(state, transition, task_id),
        Msg::CreateTask(draft) => handle_create_task(state, draft),
        Msg::SaveTask { task_id, edit } => handle_save_task(state, task_id, edit),
        Msg::MutationFinished {
            kind,
            task_id,
            result,
        } => handle_mutation_finished(state, kind, task_id, result),

        Msg::PositionsLoaded { project_id, result } => {
            handle_positions_loaded(state, project_id, result)
        }
        Msg::PointerDown { task_id, offset } => {
            let before_drag = state.board.positions.get(task_id);
            if let Some(replaced) = state.drag.pointer_down(task_id, offset, before_drag) {
                if replaced.last_local.is_some() {
                    state
                        .board
                        .positions
                        .restore(replaced.subject, replaced.before_drag);
                    state.drag.rebase(state.board.positions.get(task_id));
                }
            }
            vec![Effect::MeasureContainer { task_id }]
        }
        Msg::ContainerMeasured { task_id, result } => {
            handle_container_measured(state, task_id, result)
        }
        Msg::PointerMove { client } => {
            if let Some((task_id, local)) = state.drag.pointer_move(client) {
                state.board.positions.set_local(task_id, local);
            }
            Vec::new()
        }
        Msg::PointerUp | Msg::PointerLeave => {
            let before_drag = state.drag.session().and_then(|s| s.before_drag);
            match state.drag.release() {
                Some((task_id, position)) => drop_dragged(state, task_id, position, before_drag),
                None => Vec::new(),
            }
        }
        Msg::SetPosition { task_id, position } => persist_position(state, task_id, position),
        Msg::PositionSaved {
            task_id,
            requested,
            result,
        } => handle_position_saved(state, task_id, requested, result),

        Msg::SearchInput(raw) => {
            let epoch = state.search.input.input(raw);
            vec![Effect::StartDebounce {
                epoch,
                delay: state.search_debounce,
            }]
        }
        Msg::DebounceElapsed { epoch } => handle_debounce_elapsed(state, epoch),
        Msg::SearchResults { epoch, result } => handle_search_results(state, epoch, result),

        Msg::CopyTaskLink(task_id) => vec![Effect::WriteClipboard {
            text: state.task_link(task_id),
        }],
        Msg::ClipboardWritten(result) => {
            match result {
                Ok(()) => state.notices.toast(ToastLevel::Info, "Link copied"),
                Err(failure) => state
                    .notices
                    .toast(ToastLevel::Error, format!("Copy failed: {failure}")),
            };
            Vec::new()
        }

        Msg::SetTheme(theme) => handle_set_theme(state, theme),
        Msg::ToggleFilters => {
            state.preferences.show_filters = !state.preferences.show_filters;
            vec![Effect::SavePreferences(state.preferences.clone())]
        }
        Msg::SetLayout(layout) => handle_set_layout(state, layout),
        Msg::PreferencesSaved(result) => {
            if let Err(failure) = result {
                warn!("failed to persist preferences: {failure}");
                state
                    .notices
                    .toast(ToastLevel::Error, "Preferences could not be saved");
            }
            Vec::new()
        }

        Msg::DismissToast(id) => {
            state.notices.dismiss(id);
            Vec::new()
        }
    }
}

fn handle_boot(state: &mut AppState) -> Vec<Effect> {
    if state.session.authenticated || !state.session.begin_check() {
        return Vec::new();
    }
    vec![Effect::FetchSession]
}

fn handle_session_loaded(state: &mut AppState, result: Result<User, Failure>) -> Vec<Effect> {
    match result {
        Ok(user) => {
            let username = user.username.clone();
            if !state.session.sign_in(user) {
                debug!("dropping session result for a cleared session");
                return Vec::new();
            }
            info!(username = %username, "session established");
            state.view = View::Board;
            state.notices.clear_inline(Feature::Session);
            if state.board.projects.begin_load() {
                vec![Effect::FetchProjects]
            } else {
                Vec::new()
            }
        }
        Err(failure) => {
            if state.session.end_check() {
                state.view = View::Login;
                state
                    .notices
                    .set_inline(Feature::Session, failure.to_string());
            }
            Vec::new()
        }
    }
}

fn handle_logout(state: &mut AppState) -> Vec<Effect> {
    let was_signed_in = state.session.authenticated;
    state.sign_out_locally();
    if was_signed_in {
        info!("signed out");
        vec![Effect::EndSession]
    } else {
        Vec::new()
    }
}

fn handle_projects_loaded(
    state: &mut AppState,
    result: Result<Vec<ProjectSummary>, Failure>,
) -> Vec<Effect> {
    let failure = result.as_ref().err().cloned();
    if !state.board.projects.complete(result) {
        debug!("dropping projects result for a reset cell");
        return Vec::new();
    }

    if let Some(failure) = failure {
        warn!("failed to load projects: {failure}");
        state
            .notices
            .set_inline(Feature::Projects, failure.to_string());
        return Vec::new();
    }

    state.notices.clear_inline(Feature::Projects);
    if let (Some(selected), Some(ids)) = (state.board.selected_project, state.board.project_ids()) {
        if !ids.contains(&selected) {
            return handle_select_project(state, None);
        }
    }
    reload_active_tasks(state)
}

fn handle_select_project(state: &mut AppState, project_id: Option<ProjectId>) -> Vec<Effect> {
    state.drag.cancel();
    state.board.selected_project = project_id;
    state.board.task_types.reset();
    state.board.positions.clear();
    state.notices.clear_inline(Feature::TaskTypes);
    state.notices.clear_inline(Feature::Positions);

    let Some(project_id) = project_id else {
        state.board.project_tasks.invalidate();
        return start_fan_out(state, TaskScope::Mine);
    };

    let mut effects = start_fan_out(state, TaskScope::Project);
    if state.board.task_types.begin_load() {
        effects.push(Effect::FetchTaskTypes { project_id });
    }
    effects.extend(load_positions(state));
    effects
}

/// Starts a new fan-out group for `scope`. "Mine" spans every project the
/// member belongs to; "Project" spans the selected project only.
fn start_fan_out(state: &mut AppState, scope: TaskScope) -> Vec<Effect> {
    let keys = match scope {
        TaskScope::Mine => match state.board.project_ids() {
            Some(ids) => ids,
            None => return Vec::new(),
        },
        TaskScope::Project => match state.board.selected_project {
            Some(project_id) => vec![project_id],
            None => return Vec::new(),
        },
    };

    let (epoch, keys) = state.board.tasks_mut(scope).begin(keys);
    debug!(?scope, epoch = epoch.0, fetches = keys.len(), "task fan-out started");
    keys.into_iter()
        .map(|project_id| Effect::FetchTasks {
            scope,
            project_id,
            epoch,
        })
        .collect()
}

fn reload_active_tasks(state: &mut AppState) -> Vec<Effect> {
    let scope = state.board.active_scope();
    start_fan_out(state, scope)
}

fn handle_tasks_loaded(
    state: &mut AppState,
    scope: TaskScope,
    epoch: Epoch,
    project_id: ProjectId,
    result: Result<Vec<Task>, Failure>,
) -> Vec<Effect> {
    match state.board.tasks_mut(scope).accept(epoch, project_id, result) {
        FanIn::Discarded => {
            debug!(?scope, epoch = epoch.0, project_id = project_id.0, "dropping stale task list");
        }
        FanIn::Pending { remaining } => {
            debug!(?scope, remaining, "task fan-in pending");
        }
        FanIn::Complete { total } => {
            debug!(?scope, total, "task fan-in complete");
            state.notices.clear_inline(scope.into());
        }
        FanIn::Aborted(failure) => {
            warn!(?scope, project_id = project_id.0, "task fan-out aborted: {failure}");
            state.notices.set_inline(scope.into(), failure.to_string());
        }
    }
    Vec::new()
}

fn handle_task_types_loaded(
    state: &mut AppState,
    project_id: ProjectId,
    result: Result<Vec<TaskType>, Failure>,
) -> Vec<Effect> {
    if state.board.selected_project != Some(project_id) {
        return Vec::new();
    }
    let failure = result.as_ref().err().cloned();
    if state.board.task_types.complete(result) {
        match failure {
            Some(failure) => state
                .notices
                .set_inline(Feature::TaskTypes, failure.to_string()),
            None => state.notices.clear_inline(Feature::TaskTypes),
        }
    }
    Vec::new()
}

fn reject_input(state: &mut AppState, feature: Feature, error: ValidationError) -> Vec<Effect> {
    debug!(?feature, "rejected input: {error}");
    state.notices.set_inline(feature, error.to_string());
    Vec::new()
}

fn handle_transition(
    state: &mut AppState,
    transition: TaskTransition,
    task_id: TaskId,
) -> Vec<Effect> {
    let kind = MutationKind::from(transition);
    if state.guards.is_submitting(kind) {
        debug!(kind = kind.label(), task_id = task_id.0, "mutation already in flight");
        return Vec::new();
    }
    let Some(version) = state.find_task(task_id).map(|task| task.version) else {
        return reject_input(state, Feature::Mutation, ValidationError::UnknownTask(task_id.0));
    };
    if !state.guards.try_begin(kind, Some(task_id), Some(version)) {
        return Vec::new();
    }
    vec![Effect::TransitionTask {
        transition,
        task_id,
        version,
    }]
}

fn handle_create_task(state: &mut AppState, draft: TaskDraft) -> Vec<Effect> {
    if state.guards.is_submitting(MutationKind::Create) {
        return Vec::new();
    }
    let Some(project_id) = state.board.selected_project else {
        return reject_input(state, Feature::TaskForm, ValidationError::NoProjectSelected);
    };
    let title = match validate_title(&draft.title) {
        Ok(title) => title,
        Err(error) => return reject_input(state, Feature::TaskForm, error),
    };
    let priority = match validate_priority(draft.priority) {
        Ok(priority) => priority,
        Err(error) => return reject_input(state, Feature::TaskForm, error),
    };
    state.notices.clear_inline(Feature::TaskForm);

    if !state.guards.try_begin(MutationKind::Create, None, None) {
        return Vec::new();
    }
    vec![Effect::CreateTask {
        project_id,
        request: CreateTaskRequest {
            title,
            description: draft.description.trim().to_string(),
            priority,
            task_type_id: draft.task_type_id,
        },
    }]
}

fn handle_save_task(state: &mut AppState, task_id: TaskId, edit: TaskEdit) -> Vec<Effect> {
    if state.guards.is_submitting(MutationKind::Save) {
        return Vec::new();
    }
    let Some(version) = state.find_task(task_id).map(|task| task.version) else {
        return reject_input(state, Feature::TaskForm, ValidationError::UnknownTask(task_id.0));
    };
    let title = match validate_title(&edit.title) {
        Ok(title) => title,
        Err(error) => return reject_input(state, Feature::TaskForm, error),
    };
    let priority = match validate_priority(edit.priority) {
        Ok(priority) => priority,
        Err(error) => return reject_input(state, Feature::TaskForm, error),
    };
    state.notices.clear_inline(Feature::TaskForm);

    if !state
        .guards
        .try_begin(MutationKind::Save, Some(task_id), Some(version))
    {
        return Vec::new();
    }
    vec![Effect::SaveTask {
        task_id,
        request: SaveTaskRequest {
            version,
            title,
            description: edit.description.trim().to_string(),
            priority,
        },
    }]
}

/// Settles a mutation slot. Success and failure both reload the aggregate
/// on screen, so the cache always reflects the server's version.
fn handle_mutation_finished(
    state: &mut AppState,
    kind: MutationKind,
    task_id: Option<TaskId>,
    result: Result<Task, Failure>,
) -> Vec<Effect> {
    let Some(submission) = state.guards.finish(kind) else {
        debug!(kind = kind.label(), "dropping result for an idle mutation slot");
        return Vec::new();
    };

    let target = submission
        .target
        .or(task_id)
        .or_else(|| result.as_ref().ok().map(|task| task.task_id));
    match result {
        Ok(task) => {
            info!(
                kind = kind.label(),
                task_id = task.task_id.0,
                version = task.version,
                "mutation applied"
            );
            state.notices.clear_inline(Feature::Mutation);
            state.notices.toast(ToastLevel::Info, kind.success_text());
        }
        Err(failure) => {
            warn!(
                kind = kind.label(),
                task_id = task_id.map(|id| id.0),
                expected_version = submission.expected_version,
                "mutation failed: {failure}"
            );
            let text = if failure.is_conflict() {
                "Task was changed by someone else; showing the latest version".to_string()
            } else {
                format!("Could not {} task: {failure}", kind.label())
            };
            state.notices.set_inline(Feature::Mutation, text.clone());
            state.notices.toast(ToastLevel::Error, text);
        }
    }

    reload_after_mutation(state, kind, target)
}

/// Reloads every aggregate that may hold a stale copy of `task_id`: the one
/// on screen, the other task scope when it lists the task (or when a claim
/// adds it to "mine"), and the committed search.
fn reload_after_mutation(
    state: &mut AppState,
    kind: MutationKind,
    task_id: Option<TaskId>,
) -> Vec<Effect> {
    let mut effects = reload_active_tasks(state);
    let Some(task_id) = task_id else {
        return effects;
    };
    let holds = |tasks: &Remote<Vec<Task>>| {
        tasks
            .loaded()
            .is_some_and(|tasks| tasks.iter().any(|task| task.task_id == task_id))
    };

    let hidden = match state.board.active_scope() {
        TaskScope::Mine => TaskScope::Project,
        TaskScope::Project => TaskScope::Mine,
    };
    let hidden_view = state.board.tasks(hidden).view();
    let claimed_into_mine = kind == MutationKind::Claim
        && hidden == TaskScope::Mine
        && hidden_view.loaded().is_some();
    if holds(hidden_view) || claimed_into_mine {
        effects.extend(start_fan_out(state, hidden));
    }

    if holds(&state.search.results) {
        effects.extend(rerun_search(state));
    }
    effects
}

/// Re-issues the committed query under a fresh epoch.
fn rerun_search(state: &mut AppState) -> Vec<Effect> {
    match normalize_query(state.search.input.committed()) {
        Ok(Some(query)) => {
            let epoch = state.search.start_request();
            debug!(epoch = epoch.0, "refreshing search results");
            vec![Effect::SearchTasks { query, epoch }]
        }
        _ => Vec::new(),
    }
}

fn load_positions(state: &mut AppState) -> Vec<Effect> {
    let Some(project_id) = state.board.selected_project else {
        return Vec::new();
    };
    if state.board.positions.status.begin_load() {
        vec![Effect::FetchPositions { project_id }]
    } else {
        Vec::new()
    }
}

fn handle_positions_loaded(
    state: &mut AppState,
    project_id: ProjectId,
    result: Result<Vec<TaskPosition>, Failure>,
) -> Vec<Effect> {
    if state.board.selected_project != Some(project_id) {
        return Vec::new();
    }
    let positions = &mut state.board.positions;
    match result {
        Ok(snapshot) => {
            if positions.status.complete(Ok(project_id)) {
                let dragging = state.drag.live_position();
                let underneath = positions.apply_snapshot(snapshot, dragging);
                if dragging.is_some() {
                    state.drag.rebase(underneath);
                }
                state.notices.clear_inline(Feature::Positions);
            }
        }
        Err(failure) => {
            let text = failure.to_string();
            if positions.status.complete(Err(failure)) {
                state.notices.set_inline(Feature::Positions, text);
            }
        }
    }
    Vec::new()
}

fn handle_container_measured(
    state: &mut AppState,
    task_id: TaskId,
    result: Result<Point, Failure>,
) -> Vec<Effect> {
    match result {
        Ok(origin) => {
            if !state.drag.container_measured(task_id, origin) {
                debug!(task_id = task_id.0, "measurement for an inactive drag");
            }
        }
        Err(failure) => {
            if state.drag.session().map(|s| s.subject) == Some(task_id) {
                state.drag.cancel();
            }
            state
                .notices
                .set_inline(Feature::Positions, failure.to_string());
        }
    }
    Vec::new()
}

/// A drop the server would refuse puts the task back where it was before
/// the drag, so the cache never shows a position that was not sent.
fn drop_dragged(
    state: &mut AppState,
    task_id: TaskId,
    position: Point,
    before_drag: Option<Point>,
) -> Vec<Effect> {
    if let Err(error) = validate_position(position.x, position.y) {
        state.board.positions.restore(task_id, before_drag);
        return reject_input(state, Feature::Positions, error);
    }
    persist_position(state, task_id, position)
}

/// Shared by drag release and manual edits: write the cache first, then
/// persist.
fn persist_position(state: &mut AppState, task_id: TaskId, position: Point) -> Vec<Effect> {
    if let Err(error) = validate_position(position.x, position.y) {
        return reject_input(state, Feature::Positions, error);
    }
    state.board.positions.mark_unconfirmed(task_id, position);
    vec![Effect::UpsertPosition { task_id, position }]
}

fn handle_position_saved(
    state: &mut AppState,
    task_id: TaskId,
    requested: Point,
    result: Result<TaskPosition, Failure>,
) -> Vec<Effect> {
    match result {
        Ok(saved) => {
            if state.board.positions.confirm(saved) {
                state.notices.clear_inline(Feature::Positions);
            } else {
                debug!(task_id = task_id.0, "ignoring superseded position echo");
            }
            Vec::new()
        }
        Err(failure) => {
            if !state.board.positions.reject(task_id, requested) {
                return Vec::new();
            }
            warn!(task_id = task_id.0, "position not saved: {failure}");
            state
                .notices
                .toast(ToastLevel::Error, format!("Position not saved: {failure}"));
            state.board.positions.status.reset();
            load_positions(state)
        }
    }
}

fn handle_debounce_elapsed(state: &mut AppState, epoch: Epoch) -> Vec<Effect> {
    let Some(committed) = state.search.input.elapsed(epoch).map(str::to_owned) else {
        return Vec::new();
    };
    match normalize_query(&committed) {
        Ok(Some(query)) => {
            state.notices.clear_inline(Feature::Search);
            let epoch = state.search.start_request();
            vec![Effect::SearchTasks { query, epoch }]
        }
        Ok(None) => {
            state.search.start_request();
            state.search.results.reset();
            Vec::new()
        }
        Err(error) => reject_input(state, Feature::Search, error),
    }
}

fn handle_search_results(
    state: &mut AppState,
    epoch: Epoch,
    result: Result<Vec<Task>, Failure>,
) -> Vec<Effect> {
    if !state.search.is_current(epoch) {
        debug!(epoch = epoch.0, "dropping superseded search results");
        return Vec::new();
    }
    match &result {
        Ok(_) => state.notices.clear_inline(Feature::Search),
        Err(failure) => state
            .notices
            .set_inline(Feature::Search, failure.to_string()),
    }
    state.search.results.complete(result);
    Vec::new()
}

fn handle_set_theme(state: &mut AppState, theme: Theme) -> Vec<Effect> {
    if state.preferences.theme == theme {
        return Vec::new();
    }
    state.preferences.theme = theme;
    vec![Effect::SavePreferences(state.preferences.clone())]
}

fn handle_set_layout(state: &mut AppState, layout: LayoutMode) -> Vec<Effect> {
    if state.preferences.layout == layout {
        return Vec::new();
    }
    state.preferences.layout = layout;
    vec![Effect::SavePreferences(state.preferences.clone())]
}

#[cfg(test)]
#[path = "tests/update_tests.rs"]
mod tests;
