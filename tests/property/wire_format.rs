//! Property-based tests for the Taskboard wire format.
//!
//! Uses proptest to verify:
//! 1. Random bytes never cause a panic when decoded as a notification frame.
//! 2. Any spelling of a status that differs only in case, hyphens, or
//!    surrounding whitespace parses to the same status.
//! 3. Task bodies keep ids, statuses, and assignments through JSON.
//! 4. Filters only send `room_id` when a room is set.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use taskboard_proto::api::{TaskFilter, TaskListResponse};
use taskboard_proto::codec;
use taskboard_proto::notification::ServerMessage;
use taskboard_proto::task::{Assignment, Priority, RoomId, Task, TaskId, TaskStatus, UserId};

// --- Strategies ---

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop::sample::select(TaskStatus::ALL.to_vec())
}

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop::sample::select(vec![
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ])
}

/// Whole-second timestamps, so JSON text and parsed values agree exactly.
fn arb_timestamp() -> impl Strategy<Value = chrono::DateTime<Utc>> {
    (0i64..4_000_000_000).prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap())
}

fn arb_task() -> impl Strategy<Value = Task> {
    (
        any::<u64>(),
        "[^\u{0}]{1,64}",
        arb_status(),
        arb_priority(),
        prop::option::of(any::<u64>()),
        arb_timestamp(),
        prop::collection::vec(any::<u64>(), 0..4),
        prop::option::of(1u8..=10),
    )
        .prop_map(
            |(id, title, status, priority, room, created_at, assignees, complexity)| Task {
                id: TaskId::new(id),
                title,
                description: None,
                status,
                priority,
                room_id: room.map(RoomId::new),
                created_by_id: UserId::new(1),
                created_at,
                updated_at: created_at,
                estimated_hours: None,
                complexity_score: complexity,
                due_date: None,
                assignments: assignees
                    .into_iter()
                    .map(|user| Assignment {
                        user_id: UserId::new(user),
                        assigned_at: created_at,
                        username: None,
                    })
                    .collect(),
            },
        )
}

// --- Property tests ---

proptest! {
    /// Random bytes never cause a panic when decoded; they return Err or a
    /// message gracefully.
    #[test]
    fn random_frames_decode_no_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = codec::decode_server_message(&bytes);
    }

    /// Random JSON objects with a `type` tag never cause a panic either.
    #[test]
    fn random_tagged_objects_decode_no_panic(kind in "[a-z_]{0,24}", body in ".{0,64}") {
        let frame = serde_json::json!({ "type": kind, "data": body }).to_string();
        let _ = codec::decode_server_message(frame.as_bytes());
    }

    /// Status parsing ignores case, hyphens, and surrounding whitespace.
    #[test]
    fn status_spellings_parse(
        status in arb_status(),
        upper in prop::collection::vec(any::<bool>(), 11),
        hyphen in any::<bool>(),
        pad in "[ \t]{0,3}",
    ) {
        let spelled: String = status
            .as_str()
            .chars()
            .zip(upper.iter().cycle())
            .map(|(c, &up)| if up { c.to_ascii_uppercase() } else { c })
            .map(|c| if hyphen && c == '_' { '-' } else { c })
            .collect();
        let input = format!("{pad}{spelled}{pad}");
        prop_assert_eq!(input.parse::<TaskStatus>(), Ok(status));
    }

    /// Task bodies survive the list envelope used by the REST routes.
    #[test]
    fn task_list_keeps_tasks(tasks in prop::collection::vec(arb_task(), 0..8)) {
        let body = codec::encode(&TaskListResponse::single_page(tasks.clone())).unwrap();
        let decoded: TaskListResponse = codec::decode(&body).unwrap();
        prop_assert_eq!(decoded.tasks, tasks);
        prop_assert_eq!(decoded.total_pages, 1);
    }

    /// `room_id` is only sent when the filter names a room.
    #[test]
    fn room_query_only_when_set(room in prop::option::of(any::<u64>()), mine in any::<bool>()) {
        let mut filter = TaskFilter::all();
        if let Some(room) = room {
            filter = filter.in_room(RoomId::new(room));
        }
        if mine {
            filter = filter.mine();
        }
        let pairs = filter.query_pairs();
        let sent_room = pairs.iter().find(|(key, _)| *key == "room_id").map(|(_, v)| v.clone());
        prop_assert_eq!(sent_room, room.map(|r| r.to_string()));
        prop_assert!(filter.path().ends_with('/') != mine);
    }
}

#[test]
fn ai_progress_never_refreshes() {
    let msg: ServerMessage =
        codec::decode(r#"{"type":"ai_progress","status":"running"}"#).unwrap();
    assert!(!msg.requests_board_refresh());
}
