use std::sync::Arc;

use shared::domain::{ProjectId, ProjectSummary, TaskId};

use super::*;
use crate::{
    bridge::EffectRunner,
    error::Failure,
    guard::MutationKind,
    message::{TaskScope, TaskTransition},
    preferences::Preferences,
    remote::Remote,
    state::{Feature, View},
    test_support::{member, task, FakeApi},
};

const TIMEOUT: Duration = Duration::from_secs(5);

fn fresh_state() -> AppState {
    AppState::new(
        "http://tracker.test",
        Preferences::default(),
        Duration::from_millis(20),
    )
}

fn drain(cmd_rx: &Receiver<Effect>) -> Vec<Effect> {
    cmd_rx.try_iter().collect()
}

#[test]
fn full_queue_settles_the_cell_it_would_have_loaded() {
    let (cmd_tx, cmd_rx) = bounded(1);
    let mut program = Program::new(fresh_state(), cmd_tx);

    program.dispatch(Msg::Boot);
    program
        .sender()
        .send(Msg::SessionLoaded(Ok(member())))
        .expect("send");
    program.pump();

    assert_eq!(drain(&cmd_rx), vec![Effect::FetchSession]);
    assert!(matches!(
        program.state().board.projects,
        Remote::Failed(Failure::Transport(_))
    ));
    assert!(program.state().notices.inline(Feature::Projects).is_some());
}

#[test]
fn disconnected_worker_releases_mutation_guard() {
    let (cmd_tx, cmd_rx) = bounded(16);
    let mut program = Program::new(fresh_state(), cmd_tx);
    program.dispatch(Msg::Boot);
    program.dispatch(Msg::SessionLoaded(Ok(member())));
    program.dispatch(Msg::ProjectsLoaded(Ok(vec![ProjectSummary {
        project_id: ProjectId(7),
        name: "project 7".to_string(),
    }])));
    program.dispatch(Msg::SelectProject(Some(ProjectId(7))));

    let epoch = drain(&cmd_rx)
        .into_iter()
        .rev()
        .find_map(|effect| match effect {
            Effect::FetchTasks {
                scope: TaskScope::Project,
                epoch,
                ..
            } => Some(epoch),
            _ => None,
        })
        .expect("project fetch queued");
    program.dispatch(Msg::TasksLoaded {
        scope: TaskScope::Project,
        epoch,
        project_id: ProjectId(7),
        result: Ok(vec![task(12, 7, 3)]),
    });

    drop(cmd_rx);
    program.dispatch(Msg::Transition {
        transition: TaskTransition::Claim,
        task_id: TaskId(12),
    });
    program.pump();

    let state = program.state();
    assert!(!state.guards.is_submitting(MutationKind::Claim));
    assert_eq!(
        state.notices.inline(Feature::Mutation),
        Some("Could not claim task: request failed: backend worker is not running")
    );
    assert!(state.session.authenticated);
}

#[test]
fn boots_and_merges_tasks_across_projects() {
    let api = Arc::new(FakeApi::with_two_projects());
    let runner = EffectRunner::new(api.clone());
    let (mut program, worker) = Program::launch(fresh_state(), runner, 8);

    program.dispatch(Msg::Boot);
    let loaded = program.run_until(TIMEOUT, |state| {
        state.board.my_tasks.view().loaded().is_some()
    });
    assert!(loaded);
    assert_eq!(
        program.state().board.my_tasks.view().loaded().map(Vec::len),
        Some(5)
    );

    let calls = api.calls();
    assert_eq!(calls[0], "who_am_i");
    assert_eq!(calls[1], "list_projects");
    assert!(calls.contains(&"list_tasks 7 mine".to_string()));
    assert!(calls.contains(&"list_tasks 9 mine".to_string()));

    drop(program);
    worker.join().expect("worker exits");
}

#[test]
fn rapid_double_claim_reaches_server_once() {
    let api = Arc::new(FakeApi::with_two_projects());
    let runner = EffectRunner::new(api.clone());
    let (mut program, worker) = Program::launch(fresh_state(), runner, 8);

    program.dispatch(Msg::Boot);
    assert!(program.run_until(TIMEOUT, |state| state.board.projects.loaded().is_some()));
    program.dispatch(Msg::SelectProject(Some(ProjectId(7))));
    assert!(program.run_until(TIMEOUT, |state| {
        state.board.project_tasks.view().loaded().is_some()
    }));

    let claim = Msg::Transition {
        transition: TaskTransition::Claim,
        task_id: TaskId(1),
    };
    program.dispatch(claim.clone());
    program.dispatch(claim);
    assert!(program.run_until(TIMEOUT, |state| {
        !state.guards.is_submitting(MutationKind::Claim)
            && state.board.project_tasks.view().loaded().is_some()
    }));

    let claims = api
        .calls()
        .into_iter()
        .filter(|call| call.starts_with("transition Claim"))
        .collect::<Vec<_>>();
    assert_eq!(claims, vec!["transition Claim 1 v1"]);

    drop(program);
    worker.join().expect("worker exits");
}

#[test]
fn signed_out_boot_lands_on_login() {
    let api = Arc::new(FakeApi::default());
    let (mut program, worker) = Program::launch(fresh_state(), EffectRunner::new(api), 8);

    program.dispatch(Msg::Boot);
    assert!(program.run_until(TIMEOUT, |state| !state.session.is_checking()));
    let state = program.into_state();
    assert_eq!(state.view, View::Login);
    assert!(state.notices.toasts().next().is_none());
    worker.join().expect("worker exits");
}
