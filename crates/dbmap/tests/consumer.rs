use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use dbmap::prelude::*;

#[derive(Record, Debug, Default, PartialEq)]
struct Hero {
    #[dbmap(column = "hero_id")]
    id: i64,
    name: String,
    age: Option<i32>,
}

fn hero_row(id: i64, name: &str) -> MemoryRow {
    MemoryRow::from_pairs([
        ("hero_id", Value::Int(id)),
        ("name", Value::from(name)),
        ("age", Value::Null),
    ])
}

fn heroes(n: i64) -> MemoryRows {
    MemoryRows::new((1..=n).map(|id| hero_row(id, &format!("hero-{id}"))).collect())
}

fn closed(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

/// The producer thread closes the cursor shortly after it is abandoned.
fn wait_for_close(counter: &Arc<AtomicUsize>) {
    for _ in 0..500 {
        if closed(counter) > 0 {
            return;
        }
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn scan_one_on_empty_cursor_reports_not_found() {
    let schema = Schema::<Hero>::must_build();
    let rows = MemoryRows::empty();
    let closes = rows.close_counter();
    let mut hero = Hero::default();
    assert!(!schema.scan_one(&mut hero, rows).unwrap());
    assert_eq!(hero, Hero::default());
    assert_eq!(closed(&closes), 1);
}

#[test]
fn scan_one_reads_only_the_first_row() {
    let schema = Schema::<Hero>::must_build();
    let rows = heroes(3);
    let closes = rows.close_counter();
    let mut hero = Hero::default();
    assert!(schema.scan_one(&mut hero, rows).unwrap());
    assert_eq!(hero.id, 1);
    assert_eq!(hero.age, None);
    assert_eq!(closed(&closes), 1);
}

#[test]
fn scan_one_closes_after_scan_error() {
    let schema = Schema::<Hero>::must_build();
    let rows = heroes(2).fail_scan_at(0, "driver went away");
    let closes = rows.close_counter();
    let err = schema.scan_one(&mut Hero::default(), rows).unwrap_err();
    assert_eq!(err.to_string(), "driver went away");
    assert_eq!(closed(&closes), 1);
}

#[test]
fn scan_all_returns_every_row_in_order() {
    let schema = Schema::<Hero>::must_build();
    let rows = heroes(5);
    let closes = rows.close_counter();
    let all = schema.scan_all(rows).unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(all[4].name, "hero-5");
    assert_eq!(closed(&closes), 1);
}

#[test]
fn scan_all_never_returns_partial_results() {
    let schema = Schema::<Hero>::must_build();
    for failing in 0..4 {
        let rows = heroes(4).fail_scan_at(failing, "bad row");
        let closes = rows.close_counter();
        let result = schema.scan_all(rows);
        assert!(result.is_err(), "row {failing} should fail the whole scan");
        assert_eq!(closed(&closes), 1);
    }
}

#[test]
fn scan_all_propagates_end_of_cursor_error() {
    let schema = Schema::<Hero>::must_build();
    let rows = heroes(2).with_end_error("connection reset by peer");
    let err = schema.scan_all(rows).unwrap_err();
    assert!(matches!(err, Error::Cursor(_)));
}

#[test]
fn scan_all_on_column_failure() {
    let schema = Schema::<Hero>::must_build();
    let rows = heroes(2).fail_columns("statement closed");
    let closes = rows.close_counter();
    let err = schema.scan_all(rows).unwrap_err();
    assert!(matches!(err, Error::ColumnListUnavailable(_)));
    assert_eq!(closed(&closes), 1);
}

#[test]
fn stream_yields_records_then_end_error() {
    let schema = Schema::<Hero>::must_build();
    let rows = heroes(3).with_end_error("cursor timed out");
    let closes = rows.close_counter();
    let items: Vec<_> = schema.scan_stream(rows).collect();
    assert_eq!(items.len(), 4);
    assert!(items[..3].iter().all(Result::is_ok));
    assert_eq!(
        items[3].as_ref().unwrap_err().to_string(),
        "cursor timed out"
    );
    assert_eq!(closed(&closes), 1);
}

#[test]
fn stream_stops_at_first_error() {
    let schema = Schema::<Hero>::must_build();
    let rows = heroes(10).fail_scan_at(2, "bad row");
    let items: Vec<_> = schema.scan_stream(rows).collect();
    assert_eq!(items.len(), 3);
    assert!(items[2].is_err());
}

#[test]
fn abandoned_stream_releases_cursor() {
    let schema = Schema::<Hero>::must_build();
    let rows = heroes(1_000);
    let closes = rows.close_counter();
    let first_two: Vec<_> = schema.scan_stream(rows).take(2).collect();
    assert_eq!(first_two.len(), 2);
    wait_for_close(&closes);
    assert_eq!(closed(&closes), 1);
}

#[test]
fn cancelled_stream_yields_nothing_more() {
    let schema = Schema::<Hero>::must_build();
    let rows = heroes(1_000);
    let closes = rows.close_counter();
    let mut stream = schema.scan_stream(rows);
    assert_eq!(stream.next().unwrap().unwrap().id, 1);
    stream.cancel();
    assert!(stream.next().is_none());
    wait_for_close(&closes);
    assert_eq!(closed(&closes), 1);
}

#[test]
fn stream_runs_on_a_named_thread() {
    let schema = Schema::<Hero>::build_with(
        &Registry::standard(),
        Options::new().stream_thread_name("hero-stream"),
    )
    .unwrap();
    assert_eq!(schema.mapping().options().stream_thread_name, "hero-stream");
    let all: Result<Vec<Hero>> = schema.scan_stream(heroes(2)).collect();
    assert_eq!(all.unwrap().len(), 2);
}

#[test]
fn schemas_are_shared_across_threads() {
    let schema = Schema::<Hero>::must_build();
    let handles: Vec<_> = (0..4)
        .map(|n| {
            let schema = schema.clone();
            thread::spawn(move || schema.scan_all(heroes(n + 1)).unwrap().len())
        })
        .collect();
    let counts: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(counts, [1, 2, 3, 4]);
}
