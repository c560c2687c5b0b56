use std::io::{self, Write};

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use dialoguer::Password;

use crate::api::TaskApi;
use crate::error::AppError;
use crate::models::{
    priority_label, priority_severity, DisplayStatus, MetricsPeriod, NewPlan, NewTarget, RecurrenceType, Severity, Task, TaskDraft,
    TaskSchedule, TaskStatus, TaskType, Weekday,
};
use crate::notifications::{briefing_payload, content_text, is_resolved, latest_briefing, missed_count, sort_missed};
use crate::recurrence::{current_status, format_date, format_frequency, next_due_date, period_label, status_label};
use crate::selectors::{self, schedule_status, ScheduleFilter, TaskFilter};
use crate::stats::complete_metrics;
use crate::storage::delete_local_state;
use crate::validate::{validate_patch, validate_task};
use crate::workspace::Workspace;

/// Which slice of the task list to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ListView {
    #[default]
    All,
    Today,
    Overdue,
    Upcoming,
    Month,
}

/// Fields of `add` / `edit` as typed on the command line.
#[derive(Debug, Clone, Default)]
pub struct TaskInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due: Option<String>,
    pub start: Option<String>,
    pub priority: Option<i32>,
    pub task_type: Option<TaskType>,
}

/// Arguments of `plan add`.
#[derive(Debug, Clone)]
pub struct PlanInput {
    pub template_id: u64,
    pub recurrence: RecurrenceType,
    pub interval: u32,
    pub days: Vec<Weekday>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub habit: bool,
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Parses a `YYYY-MM-DD` argument.
pub fn parse_day(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| AppError::Usage(format!("Invalid date '{value}': {e}. Use YYYY-MM-DD.")))
}

/// Parses a `YYYY-MM` argument into `(year, month)`.
pub fn parse_month(value: &str) -> Result<(i32, u32), AppError> {
    let invalid = || AppError::Usage(format!("Invalid month '{value}'. Use YYYY-MM."));
    let (y, m) = value.trim().split_once('-').ok_or_else(invalid)?;
    let year: i32 = y.parse().map_err(|_| invalid())?;
    let month: u32 = m.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok((year, month))
}

fn parse_moment(value: Option<&str>) -> Result<Option<NaiveDateTime>, AppError> {
    value
        .map(|v| parse_day(v).map(|d| d.and_time(NaiveTime::MIN)))
        .transpose()
}

impl TaskInput {
    fn into_draft(self) -> Result<TaskDraft, AppError> {
        Ok(TaskDraft {
            title: self.title,
            description: self.description,
            status: None,
            priority: self.priority,
            task_type: self.task_type,
            start_date: parse_moment(self.start.as_deref())?,
            due_date: parse_moment(self.due.as_deref())?,
        })
    }
}

fn bold(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold)
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
        Severity::Success => Color::Green,
    }
}

fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Active => Color::Yellow,
        TaskStatus::Completed => Color::Green,
        TaskStatus::Canceled => Color::Grey,
    }
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.iter().map(|h| bold(h)).collect::<Vec<_>>());
    table
}

/// Renders tasks with their time left relative to `today`.
pub fn task_table(tasks: &[Task], today: NaiveDate) -> Table {
    let mut table = new_table(&["ID", "Title", "Type", "Priority", "Due", "Time Left", "Status"]);
    for t in tasks {
        let (due, left, overdue) = match t.due_day() {
            Some(d) => {
                let days = (d - today).num_days();
                let left = if days < 0 {
                    format!("{}d overdue", -days)
                } else if days == 0 {
                    "Today".to_string()
                } else {
                    format!("{days}d")
                };
                (d.to_string(), left, days < 0 && t.status == TaskStatus::Active)
            }
            None => ("-".to_string(), "-".to_string(), false),
        };
        let priority = t.priority.unwrap_or(0);
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.title),
            Cell::new(t.task_type.map(TaskType::label).unwrap_or("-")),
            Cell::new(priority_label(priority)).fg(severity_color(priority_severity(priority))),
            Cell::new(due),
            Cell::new(left).fg(if overdue { Color::Red } else { Color::Reset }),
            Cell::new(t.status).fg(status_color(t.status)),
        ]);
    }
    table
}

/// Renders blueprints with their derived status and next run.
pub fn schedule_table(schedules: &[TaskSchedule], now: NaiveDateTime) -> Table {
    let mut table = new_table(&["Template", "Plan", "Title", "Status", "Frequency", "Period", "Next Run", "Habit"]);
    for s in schedules {
        let status = schedule_status(s, now);
        let plan = s.recurring_plan.as_ref();
        let (plan_id, frequency, period, next, habit) = match plan {
            Some(p) => (
                p.id.to_string(),
                format_frequency(p),
                period_label(p, status),
                p.next_run_at
                    .or_else(|| next_due_date(p, p.last_generated_at, now))
                    .map(|d| format_date(Some(d)))
                    .unwrap_or_else(|| "-".to_string()),
                if p.is_habit { "yes" } else { "" },
            ),
            None => ("-".to_string(), "Manual".to_string(), "Smart Template (Manual)".to_string(), "-".to_string(), ""),
        };
        let color = match status {
            DisplayStatus::Ongoing => Color::Green,
            DisplayStatus::Upcoming => Color::Cyan,
            DisplayStatus::Paused => Color::Yellow,
            DisplayStatus::Completed => Color::Grey,
            DisplayStatus::ManualTrigger => Color::Reset,
        };
        table.add_row(vec![
            Cell::new(s.task_template.id),
            Cell::new(plan_id),
            Cell::new(&s.task_template.title),
            Cell::new(status_label(status)).fg(color),
            Cell::new(frequency),
            Cell::new(period),
            Cell::new(next),
            Cell::new(habit),
        ]);
    }
    table
}

// -- session --

/// Logs in. Without `password` the user is prompted with echo turned off.
pub fn cmd_login<A: TaskApi>(ws: &mut Workspace<A>, username: String, password: Option<String>) -> Result<(), AppError> {
    let password = match password {
        Some(p) => p,
        None => Password::new()
            .with_prompt(format!("Password for {username}"))
            .interact()
            .map_err(|e| AppError::Usage(format!("Could not read password: {e}. Pass --password or set TASKAPP_PASSWORD.")))?,
    };
    ws.login(&username, &password)?;
    println!("Logged in as {username}.");
    Ok(())
}

pub fn cmd_logout<A: TaskApi>(ws: &mut Workspace<A>) -> Result<(), AppError> {
    ws.logout()?;
    println!("Logged out.");
    Ok(())
}

pub fn cmd_whoami<A: TaskApi>(ws: &mut Workspace<A>) -> Result<(), AppError> {
    let user = ws.current_user()?;
    println!("{}", user.username);
    Ok(())
}

// -- tasks --

/// Lists tasks for `view`, narrowed by `filter`.
pub fn cmd_list<A: TaskApi>(
    ws: &mut Workspace<A>,
    view: ListView,
    month: Option<String>,
    filter: &TaskFilter,
    upcoming_days: i64,
) -> Result<(), AppError> {
    let today = Local::now().date_naive();
    let tasks = match view {
        ListView::All => filter.apply(&ws.tasks()?),
        ListView::Today => selectors::due_on(&ws.tasks()?, today, filter),
        ListView::Overdue => selectors::overdue(&ws.overdue_tasks()?, today, filter),
        ListView::Upcoming => selectors::upcoming(&ws.tasks()?, today, upcoming_days, filter),
        ListView::Month => {
            let (year, month) = match month {
                Some(m) => parse_month(&m)?,
                None => (today.year(), today.month()),
            };
            filter.apply(&ws.tasks_in_month(year, month)?)
        }
    };

    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }
    println!("{}", task_table(&tasks, today));
    if filter.has_active_filters() {
        println!("{} filter(s) active.", filter.active_filter_count());
    }
    Ok(())
}

/// Shows one task with its blueprint, target and habit record.
pub fn cmd_show<A: TaskApi>(ws: &mut Workspace<A>, id: u64) -> Result<(), AppError> {
    let detail = ws.task_detail(id)?;
    let t = &detail.task;
    let priority = t.priority.unwrap_or(0);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec![bold("ID"), Cell::new(t.id)]);
    table.add_row(vec![bold("Title"), Cell::new(&t.title)]);
    table.add_row(vec![bold("Description"), Cell::new(t.description.as_deref().unwrap_or("-"))]);
    table.add_row(vec![bold("Status"), Cell::new(t.status).fg(status_color(t.status))]);
    table.add_row(vec![
        bold("Priority"),
        Cell::new(priority_label(priority)).fg(severity_color(priority_severity(priority))),
    ]);
    table.add_row(vec![bold("Type"), Cell::new(t.task_type.map(TaskType::label).unwrap_or("-"))]);
    table.add_row(vec![bold("Start"), Cell::new(format_date(t.start_date))]);
    table.add_row(vec![bold("Due"), Cell::new(format_date(t.due_date))]);
    if let Some(target) = &detail.target {
        table.add_row(vec![bold("Target"), Cell::new(format!("{} ({})", target.title, target.target_type.label()))]);
    }

    if let Some(plan) = &detail.recurring_plan {
        let status = current_status(plan);
        let next = next_due_date(plan, t.due_date, now());
        table.add_row(vec![bold("Blueprint"), Cell::new(status_label(status))]);
        table.add_row(vec![bold("Frequency"), Cell::new(format_frequency(plan))]);
        table.add_row(vec![bold("Period"), Cell::new(period_label(plan, status))]);
        table.add_row(vec![bold("Next Due"), Cell::new(next.map(|d| format_date(Some(d))).unwrap_or_else(|| "-".into()))]);
    }

    if let Some(habit) = detail.habit_stats.filter(|h| h.has_data()) {
        table.add_row(vec![
            bold("Habit"),
            Cell::new(format!(
                "{} done, {} skipped, {} missed (of {})",
                habit.done_count,
                habit.skipped_count,
                habit.missed_count,
                habit.total()
            )),
        ]);
    }

    if let Some(message) = &t.system_message {
        table.add_row(vec![bold("Note"), Cell::new(message)]);
    }

    println!("{table}");
    Ok(())
}

/// Creates a task after checking every required field.
pub fn cmd_add<A: TaskApi>(ws: &mut Workspace<A>, input: TaskInput, silent: bool) -> Result<u64, AppError> {
    let draft = input.into_draft()?;
    let issues = validate_task(&draft);
    if !issues.is_empty() {
        return Err(AppError::Invalid(issues));
    }
    let task = ws.create_task(&draft)?;
    tracing::info!(id = task.id, "task created");
    if !silent {
        println!("Task added (id = {})", task.id);
    }
    Ok(task.id)
}

/// Sends only the fields that were given.
pub fn cmd_edit<A: TaskApi>(ws: &mut Workspace<A>, id: u64, input: TaskInput, silent: bool) -> Result<(), AppError> {
    let patch = input.into_draft()?;
    if patch == TaskDraft::default() {
        return Err(AppError::Usage("Nothing to change.".to_string()));
    }
    let issues = validate_patch(&patch);
    if !issues.is_empty() {
        return Err(AppError::Invalid(issues));
    }
    let task = ws.update_task(id, &patch)?;
    if !silent {
        println!("Task {} updated.", task.id);
    }
    Ok(())
}

/// Moves a task to `status`. The backend may answer with a message, e.g.
/// when completing a recurring task spawns its next instance.
pub fn cmd_set_status<A: TaskApi>(ws: &mut Workspace<A>, id: u64, status: TaskStatus, silent: bool) -> Result<(), AppError> {
    let task = ws.update_task(id, &TaskDraft::status(status))?;
    tracing::info!(id, %status, "task status changed");
    if !silent {
        match &task.system_message {
            Some(message) => println!("{message}"),
            None => println!("Task {} marked as {}.", id, status.as_str().to_lowercase()),
        }
    }
    Ok(())
}

pub fn cmd_remove<A: TaskApi>(ws: &mut Workspace<A>, id: u64, silent: bool) -> Result<(), AppError> {
    ws.delete_task(id)?;
    if !silent {
        println!("Task {id} removed.");
    }
    Ok(())
}

// -- blueprints --

/// Lists blueprints with their derived status, narrowed by `filter`.
pub fn cmd_plans<A: TaskApi>(ws: &mut Workspace<A>, target: Option<u64>, filter: &ScheduleFilter) -> Result<(), AppError> {
    let now = now();
    let schedules = filter.apply(&ws.schedules(target)?, now);
    if schedules.is_empty() {
        println!("No blueprints found.");
        return Ok(());
    }
    println!("{}", schedule_table(&schedules, now));
    Ok(())
}

/// Attaches a recurring plan to a blueprint.
pub fn cmd_plan_add<A: TaskApi>(ws: &mut Workspace<A>, input: PlanInput, silent: bool) -> Result<u64, AppError> {
    if !input.days.is_empty() && input.recurrence != RecurrenceType::Weekly {
        return Err(AppError::Usage("Weekdays only apply to weekly plans.".to_string()));
    }
    let request = NewPlan {
        task_template_id: input.template_id,
        recurrence_type: input.recurrence,
        recurrence_interval: input.interval.max(1),
        recurrence_days: input.days.into_iter().collect(),
        recurrence_start: parse_moment(input.start.as_deref())?,
        recurrence_end: parse_moment(input.end.as_deref())?,
        is_habit: input.habit,
    };
    if let (Some(s), Some(e)) = (request.recurrence_start, request.recurrence_end) {
        if e < s {
            return Err(AppError::Usage("The end date must not be before the start date.".to_string()));
        }
    }

    let preview = request.preview();
    let created = ws.create_plan(&request)?;
    if !silent {
        let status = current_status(&preview);
        println!(
            "Plan added (id = {}): {}, {}",
            created.id,
            format_frequency(&preview),
            status_label(status).to_lowercase()
        );
    }
    Ok(created.id)
}

pub fn cmd_plan_remove<A: TaskApi>(ws: &mut Workspace<A>, id: u64, silent: bool) -> Result<(), AppError> {
    let Some(plan) = ws.plans(None)?.into_iter().find(|p| p.id == id) else {
        return Err(AppError::Usage(format!("Plan {id} not found.")));
    };
    ws.delete_plan(id)?;
    if !silent {
        println!("Plan {} removed ({}).", id, format_frequency(&plan));
    }
    Ok(())
}

// -- targets --

pub fn cmd_targets<A: TaskApi>(ws: &mut Workspace<A>, target_type: Option<TaskType>) -> Result<(), AppError> {
    let targets = selectors::targets_of_type(&ws.targets()?, target_type);
    if targets.is_empty() {
        println!("No targets found.");
        return Ok(());
    }
    let mut table = new_table(&["ID", "Title", "Type", "Description"]);
    for t in targets {
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(t.title),
            Cell::new(t.target_type.label()),
            Cell::new(t.description.unwrap_or_else(|| "-".into())),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn cmd_target_add<A: TaskApi>(
    ws: &mut Workspace<A>,
    title: String,
    target_type: TaskType,
    description: Option<String>,
    silent: bool,
) -> Result<u64, AppError> {
    if title.trim().is_empty() {
        return Err(AppError::Usage("Target title is required.".to_string()));
    }
    let target = ws.create_target(&NewTarget { title, description, target_type })?;
    if !silent {
        println!("Target added (id = {})", target.id);
    }
    Ok(target.id)
}

pub fn cmd_target_remove<A: TaskApi>(ws: &mut Workspace<A>, id: u64, silent: bool) -> Result<(), AppError> {
    ws.delete_target(id)?;
    if !silent {
        println!("Target {id} removed.");
    }
    Ok(())
}

// -- statistics --

/// Status counts of tasks due on `date` (today by default).
pub fn cmd_stats<A: TaskApi>(ws: &mut Workspace<A>, date: Option<String>) -> Result<(), AppError> {
    let date = match date {
        Some(d) => parse_day(&d)?,
        None => Local::now().date_naive(),
    };
    let stats = ws.daily_stats(date)?;
    let mut table = new_table(&["Date", "Active", "Completed", "Canceled", "Total"]);
    table.add_row(vec![
        Cell::new(date),
        Cell::new(stats.active).fg(Color::Yellow),
        Cell::new(stats.completed).fg(Color::Green),
        Cell::new(stats.canceled).fg(Color::Grey),
        Cell::new(stats.total()),
    ]);
    println!("{table}");
    Ok(())
}

pub fn cmd_metrics<A: TaskApi>(ws: &mut Workspace<A>, period: MetricsPeriod, target: Option<u64>) -> Result<(), AppError> {
    let m = complete_metrics(ws.metrics(period, target)?, now());
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec![bold("Completed"), Cell::new(format!("{} / {}", m.weekly_completed, m.weekly_total_expected))]);
    table.add_row(vec![bold("Extra"), Cell::new(m.extra_tasks_completed)]);
    table.add_row(vec![bold("Completion"), Cell::new(format!("{:.0}%", m.completion_rate * 100.0))]);
    table.add_row(vec![bold("Week Elapsed"), Cell::new(format!("{:.0}%", m.week_progress_percentage * 100.0))]);
    table.add_row(vec![bold("Streak"), Cell::new(format!("{} day(s)", m.current_streak))]);
    table.add_row(vec![bold("Blueprints"), Cell::new(m.active_blueprints_count)]);
    table.add_row(vec![bold("XP"), Cell::new(m.total_experience_points)]);
    table.add_row(vec![
        bold("Goal"),
        if m.goal_met { Cell::new("met").fg(Color::Green) } else { Cell::new("open").fg(Color::Yellow) },
    ]);
    println!("{table}");
    if let Some(insight) = &m.insight_message {
        println!("{insight}");
    }
    Ok(())
}

// -- notifications --

pub fn cmd_notifications<A: TaskApi>(ws: &mut Workspace<A>, page: u32, size: u32) -> Result<(), AppError> {
    let unread = ws.unread_count()?;
    let result = ws.notifications(page, size)?;
    if result.content.is_empty() {
        println!("No notifications.");
        return Ok(());
    }
    let mut table = new_table(&["ID", "", "Title", "Content", "Received"]);
    for n in &result.content {
        table.add_row(vec![
            Cell::new(n.id),
            if n.is_read { Cell::new("") } else { Cell::new("●").fg(Color::Cyan) },
            Cell::new(n.title.as_deref().unwrap_or("-")),
            Cell::new(content_text(n)),
            Cell::new(n.created_at.map(|d| d.format("%Y-%m-%d %H:%M").to_string()).unwrap_or_default()),
        ]);
    }
    println!("{table}");
    println!(
        "Page {} of {} ({} total, {} unread)",
        page + 1,
        result.total_pages.max(1),
        result.total_elements,
        unread
    );
    Ok(())
}

/// Marks one notification read, or all of them when `id` is `None`.
pub fn cmd_read<A: TaskApi>(ws: &mut Workspace<A>, id: Option<u64>, silent: bool) -> Result<(), AppError> {
    match id {
        Some(id) => {
            ws.mark_read(id)?;
            if !silent {
                println!("Notification {id} marked as read.");
            }
        }
        None => {
            ws.mark_all_read()?;
            if !silent {
                println!("All notifications marked as read.");
            }
        }
    }
    Ok(())
}

/// Shows the newest daily briefing, open misses first.
pub fn cmd_briefing<A: TaskApi>(ws: &mut Workspace<A>) -> Result<(), AppError> {
    let page = ws.notifications(0, 50)?;
    let Some(briefing) = latest_briefing(&page.content).and_then(briefing_payload) else {
        println!("No daily briefing yet.");
        return Ok(());
    };

    let one_off: Vec<u64> = briefing.missed_tasks.iter().filter(|t| !t.is_recurring).map(|t| t.id).collect();
    let still_active = ws.active_check(&one_off)?;

    println!(
        "Briefing for {}{}: {} missed task(s)",
        briefing.date,
        briefing.day_of_week.as_deref().map(|d| format!(" ({d})")).unwrap_or_default(),
        missed_count(&briefing, &still_active)
    );
    if briefing.missed_tasks.is_empty() {
        return Ok(());
    }

    let mut table = new_table(&["ID", "Title", "Kind", "Next Run", "State"]);
    for t in sort_missed(&briefing.missed_tasks, &still_active) {
        let resolved = is_resolved(&t, &still_active);
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.title),
            Cell::new(if t.is_recurring { "recurring" } else { "one-off" }),
            Cell::new(t.next_run_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into())),
            if resolved { Cell::new("resolved").fg(Color::Green) } else { Cell::new("open").fg(Color::Red) },
        ]);
    }
    println!("{table}");
    Ok(())
}

// -- local state --

/// Forgets the stored session and query cache.
pub fn cmd_reset(force: bool) -> Result<(), AppError> {
    if !force {
        print!("Forget the stored session and cache? [y/N] ");
        let _ = io::stdout().flush();
        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() || input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(());
        }
    }
    delete_local_state()?;
    println!("Local state cleared.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_argument() {
        assert_eq!(parse_month("2026-02").unwrap(), (2026, 2));
        assert!(parse_month("2026-13").is_err());
        assert!(parse_month("Feb").is_err());
    }

    #[test]
    fn day_argument() {
        assert_eq!(parse_day(" 2026-10-18 ").unwrap(), NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        let err = parse_day("18/10/2026").unwrap_err();
        assert!(err.to_string().contains("Use YYYY-MM-DD"));
    }

    #[test]
    fn input_becomes_midnight_draft() {
        let draft = TaskInput { due: Some("2026-10-20".into()), ..TaskInput::default() }.into_draft().unwrap();
        assert_eq!(draft.due_date.map(|d| d.to_string()).as_deref(), Some("2026-10-20 00:00:00"));
        assert!(draft.title.is_none());
    }

    #[test]
    fn task_table_marks_overdue() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let task: Task = serde_json::from_value(serde_json::json!({
            "id": 1, "title": "File taxes", "status": "ACTIVE", "priority": 5,
            "dueDate": "2026-10-15T00:00:00"
        }))
        .unwrap();
        let rendered = task_table(&[task], today).to_string();
        assert!(rendered.contains("File taxes"));
        assert!(rendered.contains("3d overdue"));
        assert!(rendered.contains("Urgent"));
    }
}
