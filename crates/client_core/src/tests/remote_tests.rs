use super::*;

#[test]
fn loading_cell_rejects_second_begin() {
    let mut cell: Remote<u32> = Remote::NotAsked;
    assert!(cell.begin_load());
    assert!(!cell.begin_load());
    assert!(cell.is_loading());
}

#[test]
fn failed_and_loaded_cells_can_reload() {
    let mut cell: Remote<u32> = Remote::Failed(Failure::Transport("down".into()));
    assert!(cell.begin_load());
    assert!(cell.complete(Ok(3)));
    assert_eq!(cell.loaded(), Some(&3));
    assert!(cell.begin_load());
}

#[test]
fn result_for_reset_cell_is_dropped() {
    let mut cell: Remote<u32> = Remote::NotAsked;
    cell.begin_load();
    cell.reset();
    assert!(!cell.complete(Ok(9)));
    assert_eq!(cell, Remote::NotAsked);
}

#[test]
fn auth_failures_are_not_rendered_inline() {
    let mut cell: Remote<u32> = Remote::Loading;
    cell.complete(Err(Failure::Auth));
    assert_eq!(cell.inline_error(), None);

    let mut cell: Remote<u32> = Remote::Loading;
    cell.complete(Err(Failure::Permission("managers only".into())));
    assert_eq!(
        cell.inline_error().as_deref(),
        Some("not permitted: managers only")
    );
}
