use chrono::{Datelike, Duration, NaiveDateTime};
use crate::models::{HabitStats, Metrics};

const SECONDS_PER_WEEK: f64 = 7.0 * 24.0 * 60.0 * 60.0;

/// Fraction of the current week (from Monday 00:00) that has passed at `now`.
pub fn week_progress(now: NaiveDateTime) -> f64 {
    let monday = now.date() - Duration::days(now.weekday().num_days_from_monday() as i64);
    let start = monday.and_hms_opt(0, 0, 0).unwrap_or(now);
    let elapsed = (now - start).num_seconds() as f64;
    (elapsed / SECONDS_PER_WEEK).clamp(0.0, 1.0)
}

pub fn completion_rate(completed: u32, expected: u32) -> f64 {
    if expected == 0 {
        0.0
    } else {
        completed as f64 / expected as f64
    }
}

pub fn goal_met(completed: u32, expected: u32) -> bool {
    expected > 0 && completed >= expected
}

/// Short encouragement derived from the completion rate against time elapsed.
pub fn insight(rate: f64, progress: f64, goal_met: bool) -> &'static str {
    if goal_met {
        "Weekly goal achieved!"
    } else if rate > progress {
        "You're ahead of schedule!"
    } else if rate > 0.0 {
        "Keep going, you're doing great!"
    } else {
        "Start your first task to build momentum!"
    }
}

/// Fills the derived fields the backend may leave empty.
pub fn complete_metrics(mut metrics: Metrics, now: NaiveDateTime) -> Metrics {
    if metrics.completion_rate == 0.0 {
        metrics.completion_rate = completion_rate(metrics.weekly_completed, metrics.weekly_total_expected);
    }
    if !metrics.goal_met {
        metrics.goal_met = goal_met(metrics.weekly_completed, metrics.weekly_total_expected);
    }
    if metrics.week_progress_percentage == 0.0 {
        metrics.week_progress_percentage = week_progress(now);
    }
    if metrics.insight_message.as_deref().is_none_or(str::is_empty) {
        let message = insight(metrics.completion_rate, metrics.week_progress_percentage, metrics.goal_met);
        metrics.insight_message = Some(message.to_string());
    }
    metrics
}

impl HabitStats {
    pub fn total(&self) -> u64 {
        self.done_count + self.skipped_count + self.missed_count
    }

    pub fn has_data(&self) -> bool {
        self.total() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn week_progress_on_monday_midnight_is_zero() {
        assert_eq!(week_progress(at(2026, 10, 12, 0)), 0.0);
    }

    #[test]
    fn week_progress_on_thursday_noon_is_half() {
        assert!((week_progress(at(2026, 10, 15, 12)) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn rate_without_expected_tasks() {
        assert_eq!(completion_rate(3, 0), 0.0);
        assert!(!goal_met(3, 0));
        assert!(goal_met(4, 4));
    }

    #[test]
    fn insight_order() {
        assert_eq!(insight(0.2, 0.9, true), "Weekly goal achieved!");
        assert_eq!(insight(0.6, 0.5, false), "You're ahead of schedule!");
        assert_eq!(insight(0.2, 0.5, false), "Keep going, you're doing great!");
        assert_eq!(insight(0.0, 0.5, false), "Start your first task to build momentum!");
    }

    #[test]
    fn backend_insight_is_kept() {
        let metrics = Metrics {
            weekly_total_expected: 4,
            weekly_completed: 1,
            insight_message: Some("Nice".into()),
            ..Metrics::default()
        };
        let filled = complete_metrics(metrics, at(2026, 10, 15, 12));
        assert_eq!(filled.completion_rate, 0.25);
        assert_eq!(filled.insight_message.as_deref(), Some("Nice"));
    }

    #[test]
    fn habit_totals() {
        let stats = HabitStats { done_count: 3, skipped_count: 1, missed_count: 2 };
        assert_eq!(stats.total(), 6);
        assert!(!HabitStats::default().has_data());
    }
}
