use futures::StreamExt;
use pagewise::{
    Direction, PaginationManager, PagingError, Trigger, UserInfo, testing::VecSource,
};
use std::{sync::Arc, time::Duration};

mod common;
use common::{ScriptedSource, eager, settle, size, values};

#[tokio::test(start_paused = true)]
async fn test_refresh_then_append_accumulates() {
    let source = Arc::new(VecSource::new(0..10u32, 3));
    let manager = eager(source.clone(), 3).build();

    assert_eq!(
        manager.refresh(UserInfo::new()).unwrap(),
        Trigger::Issued(Direction::Refresh)
    );
    settle().await;
    assert_eq!(values(&manager), [0, 1, 2]);

    manager.append(UserInfo::new()).unwrap();
    settle().await;
    manager.append(UserInfo::new()).unwrap();
    settle().await;
    assert_eq!(values(&manager), [0, 1, 2, 3, 4, 5, 6, 7, 8]);

    // Page 3 only has one value.
    manager.append(UserInfo::new()).unwrap();
    settle().await;
    assert_eq!(values(&manager), (0..10).collect::<Vec<_>>());
    assert_eq!(source.fetch_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_incomplete_page_is_requested_again() {
    let source = Arc::new(VecSource::new(0..4u32, 3));
    let manager = eager(source.clone(), 3).build();

    manager.refresh(UserInfo::new()).unwrap();
    settle().await;
    manager.append(UserInfo::new()).unwrap();
    settle().await;
    assert_eq!(values(&manager), [0, 1, 2, 3]);

    source.push([4, 5]);
    assert_eq!(
        manager.append(UserInfo::new()).unwrap(),
        Trigger::Issued(Direction::Append)
    );
    settle().await;

    // The stale single value was replaced, not duplicated.
    assert_eq!(values(&manager), [0, 1, 2, 3, 4, 5]);
    assert_eq!(
        source.fetched(),
        [
            (Direction::Refresh, 0),
            (Direction::Append, 1),
            (Direction::Append, 1)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_first_prepend_or_append_refreshes() {
    let source = Arc::new(VecSource::new(0..10u32, 5));
    let manager = eager(source.clone(), 5).build();

    assert_eq!(
        manager.prepend(UserInfo::new()).unwrap(),
        Trigger::Issued(Direction::Refresh)
    );
    settle().await;
    assert_eq!(values(&manager), [0, 1, 2, 3, 4]);
    assert_eq!(source.fetched(), [(Direction::Refresh, 0)]);
}

#[tokio::test(start_paused = true)]
async fn test_prepend_overlap_drops_stale_values() {
    let source = ScriptedSource::new(1, 0, 1)
        .script(1, &[&["c1", "c2", "c3", "c4", "c5"]])
        .script(0, &[&["a", "b"], &["x1", "x2", "x3", "x4", "x5"]]);
    let manager = eager(source, 5).build();

    manager.refresh(UserInfo::new()).unwrap();
    settle().await;
    manager.prepend(UserInfo::new()).unwrap();
    settle().await;
    assert_eq!(values(&manager), ["a", "b", "c1", "c2", "c3", "c4", "c5"]);

    // Key 0 came back incomplete, so the same key is asked for again.
    manager.prepend(UserInfo::new()).unwrap();
    settle().await;
    assert_eq!(
        values(&manager),
        ["x1", "x2", "x3", "x4", "x5", "c1", "c2", "c3", "c4", "c5"]
    );
    assert_eq!(manager.source().fetch_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_replaces_history() {
    let source = ScriptedSource::new(1, 0, 2)
        .script(0, &[&["a", "b"]])
        .script(1, &[&["c", "d"], &["fresh", "data"]])
        .script(2, &[&["e", "f"]]);
    let manager = eager(source, 2).build();

    manager.refresh(UserInfo::new()).unwrap();
    settle().await;
    manager.prepend(UserInfo::new()).unwrap();
    settle().await;
    manager.append(UserInfo::new()).unwrap();
    settle().await;
    assert_eq!(values(&manager), ["a", "b", "c", "d", "e", "f"]);

    manager.refresh(UserInfo::new()).unwrap();
    settle().await;
    assert_eq!(values(&manager), ["fresh", "data"]);
}

#[tokio::test(start_paused = true)]
async fn test_no_more_data_is_a_no_op() {
    let source = ScriptedSource::new(0, 0, 0).script(0, &[&["only", "page"]]);
    let manager = eager(source, 2).build();

    manager.refresh(UserInfo::new()).unwrap();
    settle().await;
    let before = manager.output().unwrap();

    assert_eq!(manager.prepend(UserInfo::new()).unwrap(), Trigger::Exhausted);
    assert_eq!(manager.append(UserInfo::new()).unwrap(), Trigger::Exhausted);
    settle().await;

    assert_eq!(manager.output().unwrap(), before);
    assert_eq!(manager.source().fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_starts_at_refresh_key() {
    let source = Arc::new(VecSource::new(0..9u32, 3).with_refresh_key(1));
    let manager = eager(source.clone(), 3).build();

    manager.refresh(UserInfo::new()).unwrap();
    settle().await;
    assert_eq!(values(&manager), [3, 4, 5]);

    assert!(manager.prepend(UserInfo::new()).unwrap().is_issued());
    assert!(manager.append(UserInfo::new()).unwrap().is_issued());
    settle().await;
    assert_eq!(values(&manager), (0..9).collect::<Vec<_>>());

    assert!(!manager.prepend(UserInfo::new()).unwrap().is_issued());
    assert!(!manager.append(UserInfo::new()).unwrap().is_issued());
    assert_eq!(source.fetch_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_busy_flags_while_fetching() {
    let source = VecSource::new(0..10u32, 3).with_latency(Duration::from_millis(100));
    let manager = PaginationManager::new(source, size(3));

    manager.refresh(UserInfo::new()).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    let output = manager.output().unwrap();
    assert!(output.is_refreshing());
    assert!(output.values.is_empty());

    tokio::time::sleep(Duration::from_millis(100)).await;
    manager.append(UserInfo::new()).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    let output = manager.output().unwrap();
    assert!(output.is_appending());
    assert!(!output.is_refreshing());
    assert_eq!(output.values, [0, 1, 2]);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!manager.output().unwrap().is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_yields_current_then_changes() {
    let source = VecSource::new(0..6u32, 3);
    let manager = PaginationManager::new(source, size(3));
    let mut outputs = manager.subscribe();

    let initial = outputs.next().await.unwrap().unwrap();
    assert!(initial.values.is_empty());
    assert!(!initial.is_busy());

    manager.refresh(UserInfo::new()).unwrap();
    settle().await;
    let latest = outputs.next().await.unwrap().unwrap();
    assert_eq!(latest.values, [0, 1, 2]);
    assert!(!latest.is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_failure_terminates_output_and_closes_triggers() {
    let source = Arc::new(VecSource::new(0..6u32, 3));
    let manager = eager(source.clone(), 3).build();
    let mut outputs = manager.subscribe();
    outputs.next().await;

    manager.refresh(UserInfo::new()).unwrap();
    settle().await;
    source.fail_permanently(true);
    manager.append(UserInfo::new()).unwrap();
    settle().await;

    // Skip to the terminal item; earlier snapshots may be coalesced.
    let mut last = None;
    while let Some(snapshot) = outputs.next().await {
        last = Some(snapshot);
    }
    let err = last.unwrap().unwrap_err();
    assert!(err.is_fetch());

    assert!(manager.is_closed());
    assert!(manager.output().is_err());
    assert!(matches!(
        manager.refresh(UserInfo::new()),
        Err(PagingError::Closed)
    ));

    // Fail-closed: nothing is fetched once the pipeline is down.
    source.fail_permanently(false);
    settle().await;
    assert_eq!(source.fetch_count(), 2);
}
