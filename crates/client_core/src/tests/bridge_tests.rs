use std::time::Duration;

use crossbeam_channel::{bounded, unbounded};
use shared::domain::ProjectId;

use super::*;
use crate::{
    fanout::Epoch,
    message::TaskTransition,
    preferences::Theme,
    test_support::FakeApi,
};

fn runner(api: FakeApi) -> (EffectRunner, Arc<FakeApi>) {
    let api = Arc::new(api);
    (EffectRunner::new(api.clone()), api)
}

#[tokio::test]
async fn my_tasks_fetch_filters_on_claimed_by_me() {
    let (runner, api) = runner(FakeApi::with_two_projects());
    let msg = runner
        .run(Effect::FetchTasks {
            scope: TaskScope::Mine,
            project_id: ProjectId(7),
            epoch: Epoch(4),
        })
        .await;

    match msg {
        Msg::TasksLoaded {
            scope,
            epoch,
            project_id,
            result,
        } => {
            assert_eq!(scope, TaskScope::Mine);
            assert_eq!(epoch, Epoch(4));
            assert_eq!(project_id, ProjectId(7));
            assert_eq!(result.map(|tasks| tasks.len()), Ok(3));
        }
        other => panic!("unexpected message {other:?}"),
    }
    assert_eq!(api.calls(), vec!["list_tasks 7 mine"]);
}

#[tokio::test]
async fn transition_failure_maps_to_failure_category() {
    let mut api = FakeApi::with_two_projects();
    api.transition_error = Some(shared::error::ApiError::new(409, "stale"));
    let (runner, _) = runner(api);

    let msg = runner
        .run(Effect::TransitionTask {
            transition: TaskTransition::Claim,
            task_id: TaskId(1),
            version: 1,
        })
        .await;
    assert_eq!(
        msg,
        Msg::MutationFinished {
            kind: MutationKind::Claim,
            task_id: Some(TaskId(1)),
            result: Err(Failure::Conflict("stale".to_string())),
        }
    );
}

#[tokio::test]
async fn missing_session_is_an_auth_failure() {
    let (runner, _) = runner(FakeApi::default());
    assert_eq!(
        runner.run(Effect::FetchSession).await,
        Msg::SessionLoaded(Err(Failure::Auth))
    );
}

#[tokio::test]
async fn debounce_timer_reports_its_epoch() {
    let (runner, _) = runner(FakeApi::default());
    let msg = runner
        .run(Effect::StartDebounce {
            epoch: Epoch(9),
            delay: Duration::from_millis(5),
        })
        .await;
    assert_eq!(msg, Msg::DebounceElapsed { epoch: Epoch(9) });
}

#[tokio::test]
async fn clipboard_and_geometry_are_pluggable() {
    let clipboard = Arc::new(MemoryClipboard::default());
    let (runner, _) = runner(FakeApi::default());
    let runner = runner
        .with_clipboard(clipboard.clone())
        .with_geometry(Arc::new(FixedGeometry(Point::new(100, 200))));

    let msg = runner
        .run(Effect::WriteClipboard {
            text: "http://tracker.test/tasks/12".to_string(),
        })
        .await;
    assert_eq!(msg, Msg::ClipboardWritten(Ok(())));
    assert_eq!(
        clipboard.contents().as_deref(),
        Some("http://tracker.test/tasks/12")
    );

    let msg = runner
        .run(Effect::MeasureContainer {
            task_id: TaskId(42),
        })
        .await;
    assert_eq!(
        msg,
        Msg::ContainerMeasured {
            task_id: TaskId(42),
            result: Ok(Point::new(100, 200)),
        }
    );
}

#[tokio::test]
async fn preferences_are_written_to_configured_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("preferences.json");
    let (runner, _) = runner(FakeApi::default());
    let runner = runner.with_preferences_path(&path);

    let preferences = Preferences {
        theme: Theme::Dark,
        ..Preferences::default()
    };
    let msg = runner.run(Effect::SavePreferences(preferences.clone())).await;
    assert_eq!(msg, Msg::PreferencesSaved(Ok(())));
    assert_eq!(Preferences::load(&path), preferences);
}

#[test]
fn worker_thread_answers_every_effect_and_exits_when_router_leaves() {
    let (runner, api) = runner(FakeApi::with_two_projects());
    let (cmd_tx, cmd_rx) = bounded(8);
    let (msg_tx, msg_rx) = unbounded();
    let handle = spawn_backend_thread(runner, cmd_rx, msg_tx);

    cmd_tx.send(Effect::FetchProjects).expect("queue");
    cmd_tx
        .send(Effect::UpsertPosition {
            task_id: TaskId(42),
            position: Point::new(45, 45),
        })
        .expect("queue");
    drop(cmd_tx);

    let mut received = Vec::new();
    while let Ok(msg) = msg_rx.recv_timeout(Duration::from_secs(5)) {
        received.push(msg);
    }
    handle.join().expect("worker exits");

    assert_eq!(received.len(), 2);
    assert!(received
        .iter()
        .any(|msg| matches!(msg, Msg::ProjectsLoaded(Ok(projects)) if projects.len() == 2)));
    assert!(received.contains(&Msg::PositionSaved {
        task_id: TaskId(42),
        requested: Point::new(45, 45),
        result: Ok(shared::domain::TaskPosition {
            task_id: TaskId(42),
            x: 45,
            y: 45,
        }),
    }));
    assert_eq!(api.calls().len(), 2);
}
