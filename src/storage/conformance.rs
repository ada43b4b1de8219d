//! Behaviour every `Store` backend must share
//!
//! Each backend's test module calls [`run_all`] with a constructor; every
//! scenario gets a fresh state directory.

use std::path::Path;
use std::time::Duration;

use super::{FileStore, SqliteStore, Store};
use crate::core::{
    DedupOptions, Filter, GroupMode, Level, NewNotification, Notification, ReadFilter, SortField,
    SortOptions, SortOrder, State, group_notifications, sort_with_unread_first,
};
use crate::error::{StoreError, ValidationError};

type Factory<'a> = &'a dyn Fn(&Path) -> Box<dyn Store>;

const SCENARIOS: &[(&str, fn(&dyn Store))] = &[
    ("add_assigns_increasing_ids", add_assigns_increasing_ids),
    ("add_round_trips_fields", add_round_trips_fields),
    ("add_defaults_timestamp_to_now", add_defaults_timestamp_to_now),
    ("add_rejects_invalid_input", add_rejects_invalid_input),
    ("list_applies_every_criterion", list_applies_every_criterion),
    ("get_missing_is_not_found", get_missing_is_not_found),
    ("dismiss_is_one_way", dismiss_is_one_way),
    ("dismiss_all_on_empty_store", dismiss_all_on_empty_store),
    ("dismiss_all_counts_active_only", dismiss_all_counts_active_only),
    ("dismiss_by_filter_matches_origin", dismiss_by_filter_matches_origin),
    ("read_state_is_independent", read_state_is_independent),
    ("cleanup_zero_days", cleanup_zero_days),
    ("cleanup_respects_age", cleanup_respects_age),
    ("ids_survive_cleanup", ids_survive_cleanup),
    ("group_by_session_end_to_end", group_by_session_end_to_end),
    ("unread_first_end_to_end", unread_first_end_to_end),
];

pub(super) fn run_all(make: Factory<'_>) {
    for (name, scenario) in SCENARIOS {
        let dir = tempfile::tempdir().unwrap();
        let store = make(dir.path());
        log::debug!("event=conformance_case backend={} case={name}", store.backend());
        scenario(store.as_ref());
    }
}

fn add(store: &dyn Store, message: &str) -> i64 {
    store.add(NewNotification::new(message)).unwrap()
}

fn add_at(store: &dyn Store, message: &str, ts: &str) -> i64 {
    store
        .add(NewNotification::new(message).with_timestamp(ts))
        .unwrap()
}

fn ids(notifs: &[Notification]) -> Vec<i64> {
    notifs.iter().map(|n| n.id).collect()
}

fn add_assigns_increasing_ids(store: &dyn Store) {
    let a = add(store, "first");
    let b = add(store, "second");
    let c = add(store, "third");
    assert!(a > 0);
    assert!(a < b && b < c);
}

fn add_round_trips_fields(store: &dyn Store) {
    let message = "tab\there\nnewline \\ backslash \\n literal";
    let id = store
        .add(
            NewNotification::new(message)
                .with_timestamp("2025-02-03T04:05:06Z")
                .with_origin("$1", "@2", "%3")
                .with_pane_created("1700000000")
                .with_level(Level::Critical),
        )
        .unwrap();
    let n = store.get(id).unwrap();
    assert_eq!(n.message, message);
    assert_eq!(n.timestamp, "2025-02-03T04:05:06Z");
    assert_eq!((n.session.as_str(), n.window.as_str(), n.pane.as_str()), ("$1", "@2", "%3"));
    assert_eq!(n.pane_created, "1700000000");
    assert_eq!(n.level, Level::Critical);
    assert_eq!(n.state, State::Active);
    assert!(!n.is_read());
}

fn add_defaults_timestamp_to_now(store: &dyn Store) {
    let id = add(store, "now");
    let n = store.get(id).unwrap();
    assert!(crate::utils::is_rfc3339(&n.timestamp));
    assert!(n.timestamp.as_str() >= "2025-01-01T00:00:00Z");
}

fn add_rejects_invalid_input(store: &dyn Store) {
    let err = store.add(NewNotification::new("  ")).unwrap_err();
    assert!(matches!(err, StoreError::Validation(ValidationError::EmptyMessage)));
    let err = store
        .add(NewNotification::new("x").with_timestamp("tomorrow"))
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::InvalidTimestamp { .. })
    ));
    assert!(store.list(&Filter::default()).unwrap().is_empty());
    assert_eq!(add(store, "valid"), 1);
}

fn list_applies_every_criterion(store: &dyn Store) {
    let a = store
        .add(
            NewNotification::new("a")
                .with_timestamp("2025-01-01T00:00:00Z")
                .with_origin("$1", "@1", "%1")
                .with_level(Level::Error),
        )
        .unwrap();
    let b = store
        .add(
            NewNotification::new("b")
                .with_timestamp("2025-01-05T00:00:00Z")
                .with_origin("$1", "@2", "%2"),
        )
        .unwrap();
    let c = store
        .add(
            NewNotification::new("c")
                .with_timestamp("2025-01-10T00:00:00Z")
                .with_origin("$2", "@1", "%1")
                .with_level(Level::Error),
        )
        .unwrap();
    store.dismiss(b).unwrap();
    store.mark_read(c).unwrap();

    let all = store.list(&Filter::default()).unwrap();
    assert_eq!(ids(&all), vec![a, b, c]);

    let check = |filter: Filter, expected: Vec<i64>| {
        assert_eq!(ids(&store.list(&filter).unwrap()), expected, "{filter:?}");
    };
    check(Filter::active(), vec![a, c]);
    check(
        Filter {
            state: Some(State::Dismissed),
            ..Filter::default()
        },
        vec![b],
    );
    check(
        Filter {
            level: Some(Level::Error),
            ..Filter::default()
        },
        vec![a, c],
    );
    check(Filter::origin("$1", "", ""), vec![a, b]);
    check(Filter::origin("", "@1", ""), vec![a, c]);
    check(Filter::origin("$2", "@1", "%1"), vec![c]);
    check(
        Filter {
            older_than: Some("2025-01-05T00:00:00Z".to_string()),
            ..Filter::default()
        },
        vec![a, b],
    );
    check(
        Filter {
            newer_than: Some("2025-01-05T00:00:00Z".to_string()),
            ..Filter::default()
        },
        vec![b, c],
    );
    check(
        Filter {
            read: Some(ReadFilter::Read),
            ..Filter::default()
        },
        vec![c],
    );
    check(
        Filter {
            read: Some(ReadFilter::Unread),
            state: Some(State::Active),
            ..Filter::default()
        },
        vec![a],
    );
}

fn get_missing_is_not_found(store: &dyn Store) {
    assert!(matches!(store.get(99), Err(StoreError::NotFound { id: 99 })));
}

fn dismiss_is_one_way(store: &dyn Store) {
    let id = add(store, "x");
    store.dismiss(id).unwrap();
    assert_eq!(store.get(id).unwrap().state, State::Dismissed);
    assert!(matches!(
        store.dismiss(id),
        Err(StoreError::AlreadyDismissed { .. })
    ));
    assert!(matches!(store.dismiss(404), Err(StoreError::NotFound { id: 404 })));
    assert_eq!(store.active_count().unwrap(), 0);
}

fn dismiss_all_on_empty_store(store: &dyn Store) {
    assert_eq!(store.dismiss_all().unwrap(), 0);
    assert_eq!(store.active_count().unwrap(), 0);
}

fn dismiss_all_counts_active_only(store: &dyn Store) {
    let a = add(store, "a");
    add(store, "b");
    add(store, "c");
    store.dismiss(a).unwrap();
    assert_eq!(store.active_count().unwrap(), 2);
    assert_eq!(store.dismiss_all().unwrap(), 2);
    assert_eq!(store.active_count().unwrap(), 0);
    assert_eq!(store.list(&Filter::default()).unwrap().len(), 3);
}

fn dismiss_by_filter_matches_origin(store: &dyn Store) {
    let origin = |s: &str, w: &str, p: &str| NewNotification::new("m").with_origin(s, w, p);
    let a = store.add(origin("$1", "@1", "%1")).unwrap();
    let b = store.add(origin("$1", "@1", "%2")).unwrap();
    let c = store.add(origin("$2", "@1", "%1")).unwrap();

    assert_eq!(store.dismiss_by_filter("$9", "", "").unwrap(), 0);
    assert_eq!(store.dismiss_by_filter("$1", "@1", "%2").unwrap(), 1);
    assert_eq!(store.get(b).unwrap().state, State::Dismissed);
    assert_eq!(store.dismiss_by_filter("$1", "", "").unwrap(), 1);
    assert_eq!(store.get(a).unwrap().state, State::Dismissed);
    assert_eq!(store.get(c).unwrap().state, State::Active);
}

fn read_state_is_independent(store: &dyn Store) {
    let id = add(store, "x");
    store.mark_read(id).unwrap();
    let n = store.get(id).unwrap();
    assert!(n.is_read());
    assert!(crate::utils::is_rfc3339(&n.read_timestamp));

    store.dismiss(id).unwrap();
    assert!(store.get(id).unwrap().is_read());
    store.mark_unread(id).unwrap();
    let n = store.get(id).unwrap();
    assert!(!n.is_read());
    assert_eq!(n.state, State::Dismissed);

    assert!(matches!(store.mark_read(77), Err(StoreError::NotFound { id: 77 })));
    assert!(matches!(store.mark_unread(77), Err(StoreError::NotFound { id: 77 })));
}

fn cleanup_zero_days(store: &dyn Store) {
    let a = add(store, "a");
    let b = add(store, "b");
    let c = add(store, "c");
    store.dismiss(a).unwrap();
    store.dismiss(c).unwrap();

    let dry = store.cleanup_old(0, true).unwrap();
    assert_eq!(dry.candidates, vec![a, c]);
    assert_eq!(dry.deleted, 0);
    assert_eq!(store.list(&Filter::default()).unwrap().len(), 3);

    let real = store.cleanup_old(0, false).unwrap();
    assert_eq!(real.candidates, vec![a, c]);
    assert_eq!(real.deleted, 2);
    assert!(matches!(store.get(a), Err(StoreError::NotFound { .. })));
    assert!(matches!(store.get(c), Err(StoreError::NotFound { .. })));
    assert_eq!(store.get(b).unwrap().state, State::Active);
}

fn cleanup_respects_age(store: &dyn Store) {
    let old = add_at(store, "old", "2020-01-01T00:00:00Z");
    let old_active = add_at(store, "old active", "2020-01-01T00:00:00Z");
    let fresh = add(store, "fresh");
    store.dismiss(old).unwrap();
    store.dismiss(fresh).unwrap();

    let report = store.cleanup_old(30, false).unwrap();
    assert_eq!(report.candidates, vec![old]);
    assert_eq!(report.deleted, 1);
    assert!(store.get(fresh).is_ok());
    assert!(store.get(old_active).is_ok());
}

fn ids_survive_cleanup(store: &dyn Store) {
    add(store, "a");
    let b = add(store, "b");
    store.dismiss(b).unwrap();
    store.cleanup_old(0, false).unwrap();
    assert!(add(store, "c") > b);
}

fn group_by_session_end_to_end(store: &dyn Store) {
    for session in ["$1", "$2", "$1"] {
        store
            .add(NewNotification::new("m").with_origin(session, "", ""))
            .unwrap();
    }
    let rows = store.list(&Filter::default()).unwrap();
    let result = group_notifications(&rows, GroupMode::Session, &DedupOptions::default());
    assert_eq!(result.total_count, 3);
    assert_eq!(result.groups.len(), 2);
    assert_eq!(result.groups[0].display_name, "$1");
    assert_eq!(result.groups[0].count, 2);
    assert_eq!(result.groups[1].display_name, "$2");
    assert_eq!(result.groups[1].count, 1);
}

fn unread_first_end_to_end(store: &dyn Store) {
    let read = add_at(store, "old but read", "2025-01-02T00:00:00Z");
    store.mark_read(read).unwrap();
    let unread = add_at(store, "older unread", "2025-01-01T00:00:00Z");
    let rows = store.list(&Filter::default()).unwrap();

    for order in [SortOrder::Asc, SortOrder::Desc] {
        let opts = SortOptions {
            field: SortField::Timestamp,
            order,
            case_insensitive: false,
        };
        let sorted = sort_with_unread_first(&rows, &opts);
        assert_eq!(ids(&sorted), vec![unread, read], "order {order:?}");
    }
}

/// Comparable view of a record; read time is reduced to a flag because
/// each backend stamps its own clock.
#[derive(Debug, PartialEq)]
struct Snapshot {
    id: i64,
    timestamp: String,
    state: State,
    session: String,
    window: String,
    pane: String,
    pane_created: String,
    message: String,
    level: Level,
    read: bool,
}

fn snapshot(store: &dyn Store) -> Vec<Snapshot> {
    store
        .list(&Filter::default())
        .unwrap()
        .into_iter()
        .map(|n| {
            let read = n.is_read();
            Snapshot {
                id: n.id,
                timestamp: n.timestamp,
                state: n.state,
                session: n.session,
                window: n.window,
                pane: n.pane,
                pane_created: n.pane_created,
                message: n.message,
                level: n.level,
                read,
            }
        })
        .collect()
}

#[test]
fn backends_agree_on_identical_operations() {
    let tsv_dir = tempfile::tempdir().unwrap();
    let db_dir = tempfile::tempdir().unwrap();
    let timeout = Duration::from_millis(500);
    let tsv = FileStore::open(tsv_dir.path(), timeout).unwrap();
    let db = SqliteStore::open(&db_dir.path().join(super::sqlite::DB_FILE), timeout).unwrap();
    let stores: [&dyn Store; 2] = [&tsv, &db];

    for store in stores {
        for (i, level) in [Level::Info, Level::Error, Level::Warning, Level::Critical]
            .into_iter()
            .enumerate()
        {
            store
                .add(
                    NewNotification::new(format!("msg {i}"))
                        .with_timestamp(format!("2025-01-0{}T00:00:00Z", i + 1))
                        .with_origin("$1", format!("@{}", i % 2), format!("%{i}"))
                        .with_pane_created((1000 + i).to_string())
                        .with_level(level),
                )
                .unwrap();
        }
        store.mark_read(2).unwrap();
        store.dismiss(3).unwrap();
        store.dismiss_by_filter("$1", "@0", "").unwrap();
        store.mark_unread(2).unwrap();
        store
            .add(NewNotification::new("late").with_timestamp("2025-02-01T00:00:00Z"))
            .unwrap();
        store.cleanup_old(0, false).unwrap();
    }

    assert_eq!(snapshot(&tsv), snapshot(&db));
    assert_eq!(tsv.active_count().unwrap(), db.active_count().unwrap());
    for filter in [
        Filter::active(),
        Filter::origin("$1", "@1", ""),
        Filter {
            level: Some(Level::Error),
            ..Filter::default()
        },
    ] {
        assert_eq!(
            ids(&tsv.list(&filter).unwrap()),
            ids(&db.list(&filter).unwrap())
        );
    }
}
