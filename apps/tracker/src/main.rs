use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    bridge::ClipboardWriter,
    drag::Point,
    error::normalize_query,
    message::TaskDraft,
    preferences::{Preferences, Theme},
    state::{Feature, ToastLevel, View},
    AppState, EffectRunner, HttpTrackerApi, Msg, Program, Remote, TaskScope, TaskTransition,
};
use serde::Serialize;
use shared::domain::{ProjectId, TaskId, TaskTypeId};
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod config;

#[derive(Parser, Debug)]
#[command(name = "tracker", about = "Headless task tracker client")]
struct Args {
    /// Path to a tracker.toml; defaults to ./tracker.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    token: Option<String>,
    /// Overrides RUST_LOG.
    #[arg(long)]
    log_filter: Option<String>,
    /// How long to wait for the server before giving up.
    #[arg(long, default_value_t = 15)]
    wait_secs: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Whoami,
    Projects,
    /// Tasks claimed by me across all projects, or every task of one project.
    Tasks {
        #[arg(long)]
        project: Option<i64>,
    },
    Claim {
        #[arg(long)]
        project: i64,
        task: i64,
    },
    Release {
        #[arg(long)]
        project: i64,
        task: i64,
    },
    Complete {
        #[arg(long)]
        project: i64,
        task: i64,
    },
    Create {
        #[arg(long)]
        project: i64,
        #[arg(long)]
        task_type: i64,
        #[arg(long, default_value_t = 3)]
        priority: u8,
        #[arg(long, default_value = "")]
        description: String,
        title: String,
    },
    /// Places a task on the project's board canvas.
    Move {
        #[arg(long)]
        project: i64,
        task: i64,
        #[arg(allow_hyphen_values = true)]
        x: i32,
        #[arg(allow_hyphen_values = true)]
        y: i32,
    },
    Search {
        query: String,
    },
    Link {
        task: i64,
    },
    Theme {
        theme: ThemeArg,
    },
    Logout,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ThemeArg {
    Light,
    Dark,
}

impl From<ThemeArg> for Theme {
    fn from(value: ThemeArg) -> Self {
        match value {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
        }
    }
}

fn init_tracing(log_filter: Option<&str>) {
    let filter = match log_filter {
        Some(filter) => EnvFilter::new(filter),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn clipboard() -> Arc<dyn ClipboardWriter> {
    #[cfg(feature = "system-clipboard")]
    {
        Arc::new(client_core::bridge::SystemClipboard)
    }
    #[cfg(not(feature = "system-clipboard"))]
    {
        Arc::new(client_core::MemoryClipboard::default())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_filter.as_deref());

    let mut settings = config::load_settings(args.config.as_deref())?;
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    if args.token.is_some() {
        settings.api_token = args.token;
    }
    settings.validate()?;

    let api = HttpTrackerApi::new(&settings.server_url, settings.request_timeout())?
        .with_token(settings.api_token.clone());
    let runner = EffectRunner::new(Arc::new(api))
        .with_clipboard(clipboard())
        .with_preferences_path(&settings.preferences_path);
    let state = AppState::new(
        settings.server_url.clone(),
        Preferences::load(&settings.preferences_path),
        settings.search_debounce(),
    );
    let (mut program, worker) = Program::launch(state, runner, settings.command_queue_capacity);

    let outcome = Driver {
        program: &mut program,
        wait: Duration::from_secs(args.wait_secs),
    }
    .run(args.command);

    // Dropping the program closes the queue; the worker finishes what is
    // in flight and exits.
    drop(program);
    if worker.join().is_err() {
        warn!("backend worker panicked");
    }
    outcome
}

struct Driver<'a> {
    program: &'a mut Program,
    wait: Duration,
}

impl Driver<'_> {
    fn run(mut self, command: Command) -> Result<()> {
        match command {
            Command::Theme { theme } => {
                self.program.dispatch(Msg::SetTheme(theme.into()));
                print_json(&self.program.state().preferences)
            }
            Command::Link { task } => {
                self.program.dispatch(Msg::CopyTaskLink(TaskId(task)));
                self.settle(|state| state.notices.toasts().next().is_some())?;
                println!("{}", self.program.state().task_link(TaskId(task)));
                Ok(())
            }
            command => {
                self.sign_in()?;
                self.run_signed_in(command)
            }
        }
    }

    fn run_signed_in(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Whoami => print_json(&self.program.state().session.user),
            Command::Projects => print_json(&self.program.state().board.projects.loaded()),
            Command::Tasks { project } => {
                let scope = match project {
                    Some(project) => self.select_project(project)?,
                    None => {
                        self.wait_for_tasks(TaskScope::Mine)?;
                        TaskScope::Mine
                    }
                };
                print_json(&self.program.state().board.tasks(scope).view().loaded())
            }
            Command::Claim { project, task } => {
                self.transition(project, task, TaskTransition::Claim)
            }
            Command::Release { project, task } => {
                self.transition(project, task, TaskTransition::Release)
            }
            Command::Complete { project, task } => {
                self.transition(project, task, TaskTransition::Complete)
            }
            Command::Create {
                project,
                task_type,
                priority,
                description,
                title,
            } => {
                self.select_project(project)?;
                self.program.dispatch(Msg::CreateTask(TaskDraft {
                    title,
                    description,
                    priority,
                    task_type_id: TaskTypeId(task_type),
                }));
                if let Some(error) = self.program.state().notices.inline(Feature::TaskForm) {
                    bail!("{error}");
                }
                self.finish_mutation()?;
                print_json(&self.program.state().board.active_tasks().loaded())
            }
            Command::Move {
                project,
                task,
                x,
                y,
            } => self.move_task(project, TaskId(task), x, y),
            Command::Search { query } => {
                if normalize_query(&query)?.is_none() {
                    bail!("search query is empty");
                }
                self.program.dispatch(Msg::SearchInput(query));
                self.settle(|state| {
                    matches!(state.search.results, Remote::Loaded(_) | Remote::Failed(_))
                        || state.notices.inline(Feature::Search).is_some()
                })?;
                let state = self.program.state();
                if let Some(error) = state.notices.inline(Feature::Search) {
                    bail!("{error}");
                }
                print_json(&state.search.results.loaded())
            }
            Command::Logout => {
                self.program.dispatch(Msg::Logout);
                println!("signed out");
                Ok(())
            }
            Command::Theme { .. } | Command::Link { .. } => Ok(()),
        }
    }

    /// Waits for `done`, treating a forced sign-out as failure.
    fn settle(&mut self, mut done: impl FnMut(&AppState) -> bool) -> Result<()> {
        let was_signed_in = self.program.state().session.authenticated;
        let settled = self.program.run_until(self.wait, |state| {
            done(state) || (was_signed_in && state.view == View::Login)
        });
        if was_signed_in && self.program.state().view == View::Login {
            bail!("session expired; sign in again");
        }
        if !settled {
            bail!("timed out waiting for the server");
        }
        Ok(())
    }

    fn sign_in(&mut self) -> Result<()> {
        self.program.dispatch(Msg::Boot);
        self.settle(|state| {
            !state.session.is_checking()
                && (state.view == View::Login || !state.board.projects.is_loading())
        })?;
        let state = self.program.state();
        if state.view == View::Login {
            let reason = state
                .notices
                .inline(Feature::Session)
                .unwrap_or("session expired or not signed in");
            bail!("not signed in: {reason}");
        }
        if let Some(failure) = state.board.projects.failure() {
            bail!("could not load projects: {failure}");
        }
        Ok(())
    }

    fn wait_for_tasks(&mut self, scope: TaskScope) -> Result<()> {
        self.settle(|state| !state.board.tasks(scope).view().is_loading())?;
        if let Some(failure) = self.program.state().board.tasks(scope).view().failure() {
            bail!("could not load tasks: {failure}");
        }
        Ok(())
    }

    fn select_project(&mut self, project: i64) -> Result<TaskScope> {
        let project_id = ProjectId(project);
        let known = self
            .program
            .state()
            .board
            .project_ids()
            .is_some_and(|ids| ids.contains(&project_id));
        if !known {
            bail!("project {project} is not one of yours");
        }
        self.program.dispatch(Msg::SelectProject(Some(project_id)));
        self.wait_for_tasks(TaskScope::Project)?;
        Ok(TaskScope::Project)
    }

    fn transition(&mut self, project: i64, task: i64, transition: TaskTransition) -> Result<()> {
        self.select_project(project)?;
        let task_id = TaskId(task);
        self.program.dispatch(Msg::Transition {
            transition,
            task_id,
        });
        self.finish_mutation()?;
        print_json(&self.program.state().find_task(task_id))
    }

    /// Waits for the mutation in flight and the reload it triggers.
    fn finish_mutation(&mut self) -> Result<()> {
        if let Some(error) = self.program.state().notices.inline(Feature::Mutation) {
            bail!("{error}");
        }
        self.settle(|state| {
            !state.guards.any_submitting() && !state.board.active_tasks().is_loading()
        })?;
        if let Some(error) = self.program.state().notices.inline(Feature::Mutation) {
            bail!("{error}");
        }
        Ok(())
    }

    fn move_task(&mut self, project: i64, task_id: TaskId, x: i32, y: i32) -> Result<()> {
        self.select_project(project)?;
        self.settle(|state| !state.board.positions.status.is_loading())?;

        let last_error = self
            .program
            .state()
            .notices
            .latest_toast_id(ToastLevel::Error);
        self.program.dispatch(Msg::SetPosition {
            task_id,
            position: Point::new(x, y),
        });
        if let Some(error) = self.program.state().notices.inline(Feature::Positions) {
            bail!("{error}");
        }
        self.settle(|state| !state.board.positions.is_unconfirmed(task_id))?;
        if self.program.state().notices.latest_toast_id(ToastLevel::Error) != last_error {
            bail!("position for task {task_id} was not saved");
        }

        #[derive(Serialize)]
        struct Placed {
            task_id: TaskId,
            x: i32,
            y: i32,
        }
        print_json(&Placed { task_id, x, y })
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
