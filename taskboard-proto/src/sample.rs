//! A small, fixed board used for offline demos and dev-server seeding.

use chrono::{DateTime, Duration, Utc};

use crate::task::{Assignment, Priority, RoomId, Task, TaskId, TaskStatus, UserId};

/// User id the sample tasks are assigned to.
pub const SAMPLE_USER: UserId = UserId::new(1);

/// Second sample user.
pub const SAMPLE_TEAMMATE: UserId = UserId::new(2);

/// Room most sample tasks belong to.
pub const SAMPLE_ROOM: RoomId = RoomId::new(1);

/// Builds the sample board, timestamped relative to `now`.
#[must_use]
pub fn sample_board(now: DateTime<Utc>) -> Vec<Task> {
    #[rustfmt::skip]
    let rows: [(u64, &str, TaskStatus, Priority, Option<RoomId>, &[UserId]); 7] = [
        (1, "Sketch board layout", TaskStatus::Done, Priority::Low, Some(SAMPLE_ROOM), &[SAMPLE_USER]),
        (2, "Wire up task list API", TaskStatus::Done, Priority::High, Some(SAMPLE_ROOM), &[SAMPLE_TEAMMATE]),
        (3, "Drag cards between columns", TaskStatus::InProgress, Priority::High, Some(SAMPLE_ROOM), &[SAMPLE_USER]),
        (4, "Reload board on failed update", TaskStatus::InProgress, Priority::Medium, Some(SAMPLE_ROOM), &[SAMPLE_USER, SAMPLE_TEAMMATE]),
        (5, "Confirm before deleting", TaskStatus::Todo, Priority::Medium, Some(SAMPLE_ROOM), &[]),
        (6, "Push notifications on assignment", TaskStatus::Todo, Priority::Urgent, None, &[SAMPLE_TEAMMATE]),
        (7, "Write release notes", TaskStatus::Todo, Priority::Low, None, &[SAMPLE_USER]),
    ];

    rows.into_iter()
        .zip(0i64..)
        .map(|((id, title, status, priority, room_id, assignees), age)| {
            let created_at = now - Duration::days(7 - age);
            Task {
                id: TaskId::new(id),
                title: title.to_string(),
                description: None,
                status,
                priority,
                room_id,
                created_by_id: SAMPLE_USER,
                created_at,
                updated_at: created_at,
                estimated_hours: Some(f64::from(u8::try_from(id).unwrap_or(1)) * 1.5),
                complexity_score: u8::try_from(id % 10 + 1).ok(),
                due_date: (status != TaskStatus::Done).then_some(now + Duration::days(3)),
                assignments: assignees
                    .iter()
                    .map(|&user_id| Assignment {
                        user_id,
                        assigned_at: created_at,
                        username: None,
                    })
                    .collect(),
            }
        })
        .collect()
}
