use crate::models::{DailyBriefing, MissedTask, Notification, NotificationType};

/// Decodes the payload of a DAILY_BRIEFING notification.
///
/// The backend stores the briefing as a JSON string; newer builds inline the
/// object. Other notification types, or malformed content, yield `None`.
pub fn briefing_payload(notification: &Notification) -> Option<DailyBriefing> {
    if notification.notification_type != NotificationType::DailyBriefing {
        return None;
    }
    let parsed = match &notification.content {
        serde_json::Value::String(raw) => serde_json::from_str(raw),
        other => serde_json::from_value(other.clone()),
    };
    match parsed {
        Ok(briefing) => Some(briefing),
        Err(e) => {
            tracing::warn!(id = notification.id, error = %e, "unreadable daily briefing");
            None
        }
    }
}

/// Plain text of a notification, for listing.
pub fn content_text(notification: &Notification) -> String {
    match &notification.content {
        serde_json::Value::String(s) if notification.notification_type != NotificationType::DailyBriefing => s.clone(),
        serde_json::Value::Null => String::new(),
        _ => match briefing_payload(notification) {
            Some(b) => format!("{} missed task(s) on {}", b.missed_tasks.len(), b.date),
            None => notification.content.to_string(),
        },
    }
}

/// The most recent daily briefing among `notifications`.
pub fn latest_briefing(notifications: &[Notification]) -> Option<&Notification> {
    notifications
        .iter()
        .filter(|n| n.notification_type == NotificationType::DailyBriefing)
        .max_by_key(|n| n.created_at)
}

/// A one-off missed task is resolved once the backend no longer reports it
/// as active. Recurring ones were replaced by their next instance and stay
/// unresolved.
pub fn is_resolved(task: &MissedTask, still_active: &[u64]) -> bool {
    !task.is_recurring && !still_active.contains(&task.id)
}

/// Unresolved missed tasks first, otherwise in briefing order.
pub fn sort_missed(tasks: &[MissedTask], still_active: &[u64]) -> Vec<MissedTask> {
    let mut out = tasks.to_vec();
    out.sort_by_key(|t| is_resolved(t, still_active));
    out
}

/// Yesterday's missed count: one-offs still open plus recurring misses.
pub fn missed_count(briefing: &DailyBriefing, still_active: &[u64]) -> usize {
    let recurring = briefing.missed_tasks.iter().filter(|t| t.is_recurring).count();
    still_active.len() + recurring
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn briefing_note(id: u64, content: serde_json::Value, day: u32) -> Notification {
        Notification {
            id,
            title: Some("Your Daily Report".into()),
            notification_type: NotificationType::DailyBriefing,
            is_read: false,
            redirect_url: None,
            created_at: NaiveDate::from_ymd_opt(2026, 10, day).and_then(|d| d.and_hms_opt(3, 0, 0)),
            content,
        }
    }

    #[test]
    fn decodes_string_content() {
        let raw = r#"{"date":"2026-10-17","dayOfWeek":"SATURDAY","missedTasks":[{"id":4,"title":"Gym","isRecurring":true,"nextRunDate":"2026-10-19","taskLink":"/tasks/4"}],"actionLink":"/dashboard"}"#;
        let note = briefing_note(1, serde_json::Value::String(raw.into()), 17);
        let briefing = briefing_payload(&note).unwrap();
        assert_eq!(briefing.missed_tasks[0].next_run_date, NaiveDate::from_ymd_opt(2026, 10, 19));
        assert_eq!(content_text(&note), "1 missed task(s) on 2026-10-17");
    }

    #[test]
    fn system_text_is_not_a_briefing() {
        let mut note = briefing_note(1, serde_json::Value::String("hello".into()), 17);
        note.notification_type = NotificationType::SystemText;
        assert!(briefing_payload(&note).is_none());
        assert_eq!(content_text(&note), "hello");
    }

    #[test]
    fn picks_newest_briefing() {
        let notes = vec![
            briefing_note(1, serde_json::Value::Null, 15),
            briefing_note(2, serde_json::Value::Null, 17),
            briefing_note(3, serde_json::Value::Null, 16),
        ];
        assert_eq!(latest_briefing(&notes).map(|n| n.id), Some(2));
    }

    #[test]
    fn resolved_tasks_sink() {
        let missed = vec![
            MissedTask { id: 1, title: "done since".into(), is_recurring: false, next_run_date: None, task_link: None },
            MissedTask { id: 2, title: "still open".into(), is_recurring: false, next_run_date: None, task_link: None },
            MissedTask { id: 3, title: "habit".into(), is_recurring: true, next_run_date: None, task_link: None },
        ];
        let sorted = sort_missed(&missed, &[2]);
        let ids: Vec<u64> = sorted.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }
}
