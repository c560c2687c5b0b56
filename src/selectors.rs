use std::cmp::Ordering;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use crate::models::{DisplayStatus, RecurrenceType, Target, Task, TaskSchedule, TaskStatus, TaskType};
use crate::recurrence::{display_status, status_rank};

/// How far ahead the upcoming view looks by default.
pub const UPCOMING_DAYS: i64 = 14;

/// Status / type / free-text filter over tasks. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub task_type: Option<TaskType>,
    pub search: String,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        let status_ok = self.status.is_none_or(|s| task.status == s);
        let type_ok = self.task_type.is_none_or(|t| task.task_type == Some(t));
        status_ok && type_ok && matches_search(task, &self.search)
    }

    /// Keeps the tasks matching every criterion, preserving order.
    pub fn apply(&self, tasks: &[Task]) -> Vec<Task> {
        tasks.iter().filter(|t| self.matches(t)).cloned().collect()
    }

    pub fn active_filter_count(&self) -> usize {
        [self.status.is_some(), self.task_type.is_some(), !self.search.is_empty()]
            .into_iter()
            .filter(|on| *on)
            .count()
    }

    pub fn has_active_filters(&self) -> bool {
        self.active_filter_count() > 0
    }

    pub fn clear(&mut self) {
        *self = TaskFilter::default();
    }
}

fn matches_search(task: &Task, search: &str) -> bool {
    if search.is_empty() {
        return true;
    }
    let needle = search.to_lowercase();
    task.title.to_lowercase().contains(&needle)
        || task.description.as_deref().is_some_and(|d| d.to_lowercase().contains(&needle))
}

/// Tasks due on `date` that pass `filter`.
pub fn due_on(tasks: &[Task], date: NaiveDate, filter: &TaskFilter) -> Vec<Task> {
    tasks
        .iter()
        .filter(|t| t.due_day() == Some(date) && filter.matches(t))
        .cloned()
        .collect()
}

/// Active tasks whose due date lies before `today`, oldest first.
pub fn overdue(tasks: &[Task], today: NaiveDate, filter: &TaskFilter) -> Vec<Task> {
    let mut out: Vec<Task> = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Active)
        .filter(|t| t.due_day().is_some_and(|d| d < today))
        .filter(|t| filter.matches(t))
        .cloned()
        .collect();
    out.sort_by_key(|t| t.due_date);
    out
}

/// Tasks due after `today` and no later than `today + days`, soonest first.
pub fn upcoming(tasks: &[Task], today: NaiveDate, days: i64, filter: &TaskFilter) -> Vec<Task> {
    let horizon = today + Duration::days(days);
    let mut out: Vec<Task> = tasks
        .iter()
        .filter(|t| t.due_day().is_some_and(|d| d > today && d <= horizon))
        .filter(|t| filter.matches(t))
        .cloned()
        .collect();
    out.sort_by_key(|t| t.due_date);
    out
}

/// Filter over blueprint schedules, keyed on the derived plan status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleFilter {
    pub status: Option<DisplayStatus>,
    pub recurrence: Option<RecurrenceType>,
    pub search: String,
}

impl ScheduleFilter {
    pub fn matches(&self, schedule: &TaskSchedule, now: NaiveDateTime) -> bool {
        let plan = schedule.recurring_plan.as_ref();
        let recurrence_ok = self
            .recurrence
            .is_none_or(|r| plan.is_some_and(|p| p.recurrence_type == r));
        let status_ok = self
            .status
            .is_none_or(|s| schedule_status(schedule, now) == s);
        let search_ok = self.search.is_empty()
            || schedule
                .task_template
                .title
                .to_lowercase()
                .contains(&self.search.to_lowercase());
        recurrence_ok && status_ok && search_ok
    }

    pub fn active_filter_count(&self) -> usize {
        [self.status.is_some(), self.recurrence.is_some(), !self.search.is_empty()]
            .into_iter()
            .filter(|on| *on)
            .count()
    }

    /// Filters, then orders by status rank, priority (high first) and title.
    pub fn apply(&self, schedules: &[TaskSchedule], now: NaiveDateTime) -> Vec<TaskSchedule> {
        let mut out: Vec<TaskSchedule> = schedules
            .iter()
            .filter(|s| self.matches(s, now))
            .cloned()
            .collect();
        out.sort_by(|a, b| compare_schedules(a, b, now));
        out
    }
}

/// A blueprint without a plan behaves like a manual one.
pub fn schedule_status(schedule: &TaskSchedule, now: NaiveDateTime) -> DisplayStatus {
    schedule
        .recurring_plan
        .as_ref()
        .map(|p| display_status(p, now))
        .unwrap_or(DisplayStatus::ManualTrigger)
}

fn compare_schedules(a: &TaskSchedule, b: &TaskSchedule, now: NaiveDateTime) -> Ordering {
    status_rank(schedule_status(a, now))
        .cmp(&status_rank(schedule_status(b, now)))
        .then_with(|| b.task_template.priority.cmp(&a.task_template.priority))
        .then_with(|| a.task_template.title.to_lowercase().cmp(&b.task_template.title.to_lowercase()))
}

/// Targets of the given type, or all of them.
pub fn targets_of_type(targets: &[Target], target_type: Option<TaskType>) -> Vec<Target> {
    targets
        .iter()
        .filter(|t| target_type.is_none_or(|ty| t.target_type == ty))
        .cloned()
        .collect()
}
