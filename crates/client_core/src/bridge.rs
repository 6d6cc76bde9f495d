//! Backend worker: receives effects from the router, runs them on a tokio
//! runtime, and feeds result messages back.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    thread::{self, JoinHandle},
};

use crossbeam_channel::{Receiver, Sender};
use shared::domain::TaskId;
use tracing::{debug, error};

use crate::{
    api::{claimed_by_me, TrackerApi},
    drag::Point,
    effect::Effect,
    error::Failure,
    guard::MutationKind,
    message::{Msg, TaskScope},
    preferences::Preferences,
};

pub trait ClipboardWriter: Send + Sync {
    fn write_text(&self, text: &str) -> anyhow::Result<()>;
}

/// Keeps the last written text; used by the CLI driver and tests.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl ClipboardWriter for MemoryClipboard {
    fn write_text(&self, text: &str) -> anyhow::Result<()> {
        let mut contents = self
            .contents
            .lock()
            .map_err(|_| anyhow::anyhow!("clipboard lock poisoned"))?;
        *contents = Some(text.to_string());
        Ok(())
    }
}

#[cfg(feature = "system-clipboard")]
pub struct SystemClipboard;

#[cfg(feature = "system-clipboard")]
impl ClipboardWriter for SystemClipboard {
    fn write_text(&self, text: &str) -> anyhow::Result<()> {
        let mut clipboard = arboard::Clipboard::new()?;
        clipboard.set_text(text.to_string())?;
        Ok(())
    }
}

/// Where the positioning canvas sits in client coordinates.
pub trait ContainerGeometry: Send + Sync {
    fn container_origin(&self, task_id: TaskId) -> Result<Point, Failure>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FixedGeometry(pub Point);

impl ContainerGeometry for FixedGeometry {
    fn container_origin(&self, _task_id: TaskId) -> Result<Point, Failure> {
        Ok(self.0)
    }
}

/// Executes effects and turns each outcome into the matching
/// result message. Cheap to clone; each effect runs on its own task.
#[derive(Clone)]
pub struct EffectRunner {
    api: Arc<dyn TrackerApi>,
    clipboard: Arc<dyn ClipboardWriter>,
    geometry: Arc<dyn ContainerGeometry>,
    preferences_path: Option<PathBuf>,
}

impl EffectRunner {
    pub fn new(api: Arc<dyn TrackerApi>) -> Self {
        Self {
            api,
            clipboard: Arc::new(MemoryClipboard::default()),
            geometry: Arc::new(FixedGeometry::default()),
            preferences_path: None,
        }
    }

    pub fn with_clipboard(mut self, clipboard: Arc<dyn ClipboardWriter>) -> Self {
        self.clipboard = clipboard;
        self
    }

    pub fn with_geometry(mut self, geometry: Arc<dyn ContainerGeometry>) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn with_preferences_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.preferences_path = Some(path.into());
        self
    }

    pub async fn run(&self, effect: Effect) -> Msg {
        match effect {
            Effect::FetchSession => {
                Msg::SessionLoaded(self.api.who_am_i().await.map_err(Failure::from))
            }
            Effect::EndSession => {
                Msg::LoggedOut(self.api.end_session().await.map_err(Failure::from))
            }
            Effect::FetchProjects => {
                Msg::ProjectsLoaded(self.api.list_projects().await.map_err(Failure::from))
            }
            Effect::FetchTasks {
                scope,
                project_id,
                epoch,
            } => {
                let query = match scope {
                    TaskScope::Mine => claimed_by_me(),
                    TaskScope::Project => Default::default(),
                };
                let result = self.api.list_tasks(project_id, query).await;
                Msg::TasksLoaded {
                    scope,
                    epoch,
                    project_id,
                    result: result.map_err(Failure::from),
                }
            }
            Effect::FetchTaskTypes { project_id } => Msg::TaskTypesLoaded {
                project_id,
                result: self
                    .api
                    .list_task_types(project_id)
                    .await
                    .map_err(Failure::from),
            },
            Effect::FetchPositions { project_id } => Msg::PositionsLoaded {
                project_id,
                result: self
                    .api
                    .list_positions(project_id)
                    .await
                    .map_err(Failure::from),
            },
            Effect::TransitionTask {
                transition,
                task_id,
                version,
            } => Msg::MutationFinished {
                kind: transition.into(),
                task_id: Some(task_id),
                result: self
                    .api
                    .transition_task(transition, task_id, version)
                    .await
                    .map_err(Failure::from),
            },
            Effect::CreateTask {
                project_id,
                request,
            } => {
                let result = self.api.create_task(project_id, &request).await;
                Msg::MutationFinished {
                    kind: MutationKind::Create,
                    task_id: result.as_ref().ok().map(|task| task.task_id),
                    result: result.map_err(Failure::from),
                }
            }
            Effect::SaveTask { task_id, request } => Msg::MutationFinished {
                kind: MutationKind::Save,
                task_id: Some(task_id),
                result: self
                    .api
                    .save_task(task_id, &request)
                    .await
                    .map_err(Failure::from),
            },
            Effect::UpsertPosition { task_id, position } => Msg::PositionSaved {
                task_id,
                requested: position,
                result: self
                    .api
                    .upsert_position(task_id, position)
                    .await
                    .map_err(Failure::from),
            },
            Effect::MeasureContainer { task_id } => Msg::ContainerMeasured {
                task_id,
                result: self.geometry.container_origin(task_id),
            },
            Effect::StartDebounce { epoch, delay } => {
                tokio::time::sleep(delay).await;
                Msg::DebounceElapsed { epoch }
            }
            Effect::SearchTasks { query, epoch } => Msg::SearchResults {
                epoch,
                result: self.api.search_tasks(&query).await.map_err(Failure::from),
            },
            Effect::WriteClipboard { text } => {
                let clipboard = Arc::clone(&self.clipboard);
                let result = tokio::task::spawn_blocking(move || clipboard.write_text(&text)).await;
                Msg::ClipboardWritten(flatten_blocking(result))
            }
            Effect::SavePreferences(preferences) => {
                Msg::PreferencesSaved(self.save_preferences(preferences).await)
            }
        }
    }

    async fn save_preferences(&self, preferences: Preferences) -> Result<(), Failure> {
        let Some(path) = self.preferences_path.clone() else {
            debug!("no preferences path configured; skipping save");
            return Ok(());
        };
        let result = tokio::task::spawn_blocking(move || preferences.save(&path)).await;
        flatten_blocking(result)
    }
}

fn flatten_blocking(
    result: Result<anyhow::Result<()>, tokio::task::JoinError>,
) -> Result<(), Failure> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(Failure::Transport(format!("{err:#}"))),
        Err(err) => Err(Failure::Transport(err.to_string())),
    }
}

/// Starts the worker thread. It owns a multi-threaded tokio runtime and
/// spawns one task per effect, so slow requests never block later ones.
/// The thread exits once every command sender is dropped.
pub fn spawn_backend_thread(
    runner: EffectRunner,
    cmd_rx: Receiver<Effect>,
    msg_tx: Sender<Msg>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                error!("failed to build backend runtime: {err}");
                let failure = Failure::Transport(format!("backend worker startup failure: {err}"));
                while let Ok(effect) = cmd_rx.recv() {
                    let _ = msg_tx.send(effect.fail(failure.clone()));
                }
                return;
            }
        };

        runtime.block_on(async move {
            let mut in_flight = Vec::new();
            while let Ok(effect) = cmd_rx.recv() {
                debug!(effect = effect.name(), "running effect");
                let runner = runner.clone();
                let msg_tx = msg_tx.clone();
                in_flight.push(tokio::spawn(async move {
                    let msg = runner.run(effect).await;
                    if msg_tx.send(msg).is_err() {
                        debug!("router gone; dropping effect result");
                    }
                }));
                in_flight.retain(|task: &tokio::task::JoinHandle<()>| !task.is_finished());
            }
            for task in in_flight {
                let _ = task.await;
            }
        });
    })
}

#[cfg(test)]
#[path = "tests/bridge_tests.rs"]
mod tests;
