use chrono::{Datelike, Duration, Local, Months, NaiveDate, NaiveDateTime};
use crate::models::{DisplayStatus, RecurrenceType, RecurringPlan, Weekday};

/// Derives the display status of a plan at `now`.
///
/// Rules are checked in order:
/// - **NONE** recurrence: the blueprint is only triggered by hand.
/// - **Inactive**: paused, whatever the dates say.
/// - **Past end**: the cycle is over.
/// - **Before start**: not running yet.
/// - Otherwise the plan is running.
pub fn display_status(plan: &RecurringPlan, now: NaiveDateTime) -> DisplayStatus {
    if plan.recurrence_type == RecurrenceType::None {
        return DisplayStatus::ManualTrigger;
    }
    if !plan.is_active {
        return DisplayStatus::Paused;
    }
    if plan.recurrence_end.is_some_and(|end| now > end) {
        return DisplayStatus::Completed;
    }
    if plan.recurrence_start.is_some_and(|start| now < start) {
        return DisplayStatus::Upcoming;
    }
    DisplayStatus::Ongoing
}

/// [`display_status`] evaluated against the local clock.
pub fn current_status(plan: &RecurringPlan) -> DisplayStatus {
    display_status(plan, Local::now().naive_local())
}

/// Short label shown next to a status.
pub fn status_label(status: DisplayStatus) -> &'static str {
    match status {
        DisplayStatus::Ongoing => "Running",
        DisplayStatus::Upcoming => "Upcoming",
        DisplayStatus::Paused => "Paused",
        DisplayStatus::Completed => "Completed",
        DisplayStatus::ManualTrigger => "Template",
    }
}

/// Position of a status in plan listings (running plans first).
pub fn status_rank(status: DisplayStatus) -> u8 {
    match status {
        DisplayStatus::Ongoing => 1,
        DisplayStatus::Upcoming => 2,
        DisplayStatus::Paused => 3,
        DisplayStatus::ManualTrigger => 4,
        DisplayStatus::Completed => 5,
    }
}

/// Describes how often a plan repeats, e.g. `"Every 2 weeks on Mon, Thu"`.
pub fn format_frequency(plan: &RecurringPlan) -> String {
    let unit = match plan.recurrence_type {
        RecurrenceType::None => return "Manual".to_string(),
        RecurrenceType::Daily => return "Every day".to_string(),
        RecurrenceType::Weekly => "week",
        RecurrenceType::Monthly => "month",
        RecurrenceType::Yearly => "year",
    };

    let mut label = if plan.recurrence_interval > 1 {
        format!("Every {} {}s", plan.recurrence_interval, unit)
    } else {
        format!("Every {}", unit)
    };

    if !plan.recurrence_days.is_empty() {
        let days: Vec<&str> = plan.recurrence_days.iter().map(|d| d.abbrev()).collect();
        label.push_str(" on ");
        label.push_str(&days.join(", "));
    }
    label
}

/// Formats a plan boundary as `2026/02/13 (Fri)`.
pub fn format_date(date: Option<NaiveDateTime>) -> String {
    match date {
        Some(d) => d.format("%Y/%m/%d (%a)").to_string(),
        None => "No date".to_string(),
    }
}

/// Human description of a plan's timeframe, consistent with `status`.
pub fn period_label(plan: &RecurringPlan, status: DisplayStatus) -> String {
    let start = plan.recurrence_start;
    let end = plan.recurrence_end;
    let range = |s, e| format!("{} - {}", format_date(Some(s)), format_date(Some(e)));

    match status {
        DisplayStatus::ManualTrigger => match (start, end) {
            (Some(s), Some(e)) => range(s, e),
            (Some(s), None) => format!("Scheduled: {}", format_date(Some(s))),
            (None, Some(e)) => format!("Deadline: {}", format_date(Some(e))),
            (None, None) => "Smart Template (Manual)".to_string(),
        },
        DisplayStatus::Paused => "Currently Paused".to_string(),
        DisplayStatus::Completed => match end {
            Some(e) => format!("Blueprint cycle ended on {}", format_date(Some(e))),
            None => "Execution Completed".to_string(),
        },
        DisplayStatus::Upcoming => match start {
            Some(s) => format!("Scheduled to start {}", format_date(Some(s))),
            None => "Upcoming Plan".to_string(),
        },
        DisplayStatus::Ongoing => match (start, end) {
            (Some(s), Some(e)) => range(s, e),
            (Some(s), None) => format!("Active since {}", format_date(Some(s))),
            (None, Some(e)) => format!("Ends on {}", format_date(Some(e))),
            (None, None) => "Active Continuous Blueprint".to_string(),
        },
    }
}

/// Computes when the next task of a plan falls due.
///
/// `last_due` is the due date of the most recent generated task, `None` for
/// the first run. Interval plans step forward from `last_due`, else from
/// `recurrence_start`, else from `now`. Weekday plans may land on the base
/// date itself on their first run. Dates that already passed are skipped, so
/// a plan left idle for weeks resumes at the next slot from `now`.
///
/// Returns `None` for manual or paused plans and when the next slot would lie
/// past `recurrence_end`.
pub fn next_due_date(plan: &RecurringPlan, last_due: Option<NaiveDateTime>, now: NaiveDateTime) -> Option<NaiveDateTime> {
    if plan.recurrence_type == RecurrenceType::None || !plan.is_active {
        return None;
    }
    let interval = plan.recurrence_interval.max(1);
    let first_run = last_due.is_none();
    let base = last_due.or(plan.recurrence_start).unwrap_or(now);
    let today = now.date();

    let next = match plan.recurrence_type {
        RecurrenceType::None => None,
        RecurrenceType::Daily => catch_up(base, today, |d| d.checked_add_signed(Duration::days(interval as i64))),
        RecurrenceType::Weekly if plan.recurrence_days.is_empty() => {
            catch_up(base, today, |d| d.checked_add_signed(Duration::weeks(interval as i64)))
        }
        RecurrenceType::Weekly => {
            let anchor = plan.recurrence_start.unwrap_or(base).date();
            next_weekly_slot(plan, anchor, base, first_run, today, interval)
        }
        RecurrenceType::Monthly => catch_up(base, today, |d| d.checked_add_months(Months::new(interval))),
        RecurrenceType::Yearly => catch_up(base, today, |d| d.checked_add_months(Months::new(interval.saturating_mul(12)))),
    }?;

    match plan.recurrence_end {
        Some(end) if next > end => None,
        _ => Some(next),
    }
}

/// Applies `step` once, then keeps stepping while the date is before `today`.
fn catch_up<F>(base: NaiveDateTime, today: NaiveDate, step: F) -> Option<NaiveDateTime>
where
    F: Fn(NaiveDateTime) -> Option<NaiveDateTime>,
{
    let mut next = step(base)?;
    while next.date() < today {
        next = step(next)?;
    }
    Some(next)
}

fn next_weekly_slot(
    plan: &RecurringPlan,
    anchor: NaiveDate,
    base: NaiveDateTime,
    first_run: bool,
    today: NaiveDate,
    interval: u32,
) -> Option<NaiveDateTime> {
    let mut search = if first_run { base } else { base.checked_add_signed(Duration::days(1))? };
    if search.date() < today {
        search = today.and_time(search.time());
    }
    let interval = interval as i64;
    let search_week = week_start(search.date());
    let behind = (search_week - week_start(anchor)).num_weeks().rem_euclid(interval);

    if behind == 0 {
        if let Some(hit) = first_selected_day(plan, search) {
            return Some(hit);
        }
    }
    // Jump to the start of the next week on the plan's cycle.
    let week = search_week.checked_add_signed(Duration::weeks(interval - behind))?;
    first_selected_day(plan, week.and_time(search.time()))
}

/// First selected weekday from `from` to the end of its week.
fn first_selected_day(plan: &RecurringPlan, from: NaiveDateTime) -> Option<NaiveDateTime> {
    let left = 7 - from.weekday().num_days_from_monday() as i64;
    (0..left)
        .filter_map(|i| from.checked_add_signed(Duration::days(i)))
        .find(|d| plan.recurrence_days.contains(&Weekday::from_chrono(d.weekday())))
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}
