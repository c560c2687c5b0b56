use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a task. Tasks are never hard-deleted by a status change;
/// `Canceled` is the soft drop.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Active,
    Completed,
    Canceled,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Active => "ACTIVE",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => Ok(TaskStatus::Active),
            "COMPLETED" | "DONE" => Ok(TaskStatus::Completed),
            "CANCELED" | "CANCELLED" => Ok(TaskStatus::Canceled),
            other => Err(format!("unknown task status '{other}' (expected active, completed, canceled)")),
        }
    }
}

/// Category of a task or target.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    #[serde(alias = "WORK")]
    Work,
    #[serde(alias = "LIFE")]
    Life,
    #[serde(alias = "STUDY")]
    Study,
    #[serde(alias = "SHOPPING")]
    Shopping,
}

impl TaskType {
    pub const ALL: [TaskType; 4] = [TaskType::Work, TaskType::Life, TaskType::Study, TaskType::Shopping];

    pub fn label(self) -> &'static str {
        match self {
            TaskType::Work => "Work",
            TaskType::Life => "Life",
            TaskType::Study => "Study",
            TaskType::Shopping => "Shopping",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskType::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown task type '{s}' (expected work, life, study, shopping)"))
    }
}

/// Human label for a priority value (1 = Low .. 5 = Urgent).
pub fn priority_label(priority: i32) -> &'static str {
    match priority {
        1 => "Low",
        2 => "Medium",
        3 => "High",
        4 => "Critical",
        5 => "Urgent",
        _ => "Unknown",
    }
}

/// Severity bucket used to colour a priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Warning,
    Error,
}

pub fn priority_severity(priority: i32) -> Severity {
    match priority {
        3 => Severity::Warning,
        p if p >= 4 => Severity::Error,
        _ => Severity::Success,
    }
}

/// A single task as returned by `/api/tasks`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(rename = "type", default)]
    pub task_type: Option<TaskType>,
    #[serde(default)]
    pub start_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub due_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
    /// Blueprint this task was generated from, if any.
    #[serde(default)]
    pub template_id: Option<u64>,
    /// Message the backend attaches after a status change (e.g. next session date).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
}

impl Task {
    pub fn due_day(&self) -> Option<NaiveDate> {
        self.due_date.map(|d| d.date())
    }
}

/// Body for creating a task or patching one. `None` fields are left untouched
/// on PATCH.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub task_type: Option<TaskType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDateTime>,
}

impl TaskDraft {
    pub fn status(status: TaskStatus) -> Self {
        TaskDraft { status: Some(status), ..TaskDraft::default() }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurrenceType {
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurrenceType {
    pub fn as_str(self) -> &'static str {
        match self {
            RecurrenceType::None => "NONE",
            RecurrenceType::Daily => "DAILY",
            RecurrenceType::Weekly => "WEEKLY",
            RecurrenceType::Monthly => "MONTHLY",
            RecurrenceType::Yearly => "YEARLY",
        }
    }
}

impl fmt::Display for RecurrenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecurrenceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NONE" | "MANUAL" => Ok(RecurrenceType::None),
            "DAILY" => Ok(RecurrenceType::Daily),
            "WEEKLY" => Ok(RecurrenceType::Weekly),
            "MONTHLY" => Ok(RecurrenceType::Monthly),
            "YEARLY" => Ok(RecurrenceType::Yearly),
            other => Err(format!("unknown recurrence '{other}' (expected none, daily, weekly, monthly, yearly)")),
        }
    }
}

/// Day of the week, ordered Monday first.
///
/// The backend sends short names (`"Mon"`); long and upper-case spellings are
/// accepted as well.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Weekday {
    #[serde(alias = "MON", alias = "MONDAY", alias = "Monday")]
    Mon,
    #[serde(alias = "TUE", alias = "TUESDAY", alias = "Tuesday")]
    Tue,
    #[serde(alias = "WED", alias = "WEDNESDAY", alias = "Wednesday")]
    Wed,
    #[serde(alias = "THU", alias = "THURSDAY", alias = "Thursday")]
    Thu,
    #[serde(alias = "FRI", alias = "FRIDAY", alias = "Friday")]
    Fri,
    #[serde(alias = "SAT", alias = "SATURDAY", alias = "Saturday")]
    Sat,
    #[serde(alias = "SUN", alias = "SUNDAY", alias = "Sunday")]
    Sun,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    pub fn abbrev(self) -> &'static str {
        match self {
            Weekday::Mon => "Mon",
            Weekday::Tue => "Tue",
            Weekday::Wed => "Wed",
            Weekday::Thu => "Thu",
            Weekday::Fri => "Fri",
            Weekday::Sat => "Sat",
            Weekday::Sun => "Sun",
        }
    }

    pub fn from_chrono(day: chrono::Weekday) -> Self {
        Weekday::ALL[day.num_days_from_monday() as usize]
    }
}

impl FromStr for Weekday {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Weekday::ALL
            .into_iter()
            .find(|d| s.get(..3).is_some_and(|head| head.eq_ignore_ascii_case(d.abbrev())))
            .ok_or_else(|| format!("unknown weekday '{s}'"))
    }
}

/// Derived, never persisted phase of a recurring plan.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisplayStatus {
    Ongoing,
    Upcoming,
    Paused,
    Completed,
    ManualTrigger,
}

impl fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DisplayStatus::Ongoing => "ONGOING",
            DisplayStatus::Upcoming => "UPCOMING",
            DisplayStatus::Paused => "PAUSED",
            DisplayStatus::Completed => "COMPLETED",
            DisplayStatus::ManualTrigger => "MANUAL_TRIGGER",
        })
    }
}

impl FromStr for DisplayStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "ONGOING" | "RUNNING" => Ok(DisplayStatus::Ongoing),
            "UPCOMING" => Ok(DisplayStatus::Upcoming),
            "PAUSED" => Ok(DisplayStatus::Paused),
            "COMPLETED" => Ok(DisplayStatus::Completed),
            "MANUAL_TRIGGER" | "MANUAL" | "TEMPLATE" => Ok(DisplayStatus::ManualTrigger),
            other => Err(format!("unknown plan status '{other}'")),
        }
    }
}

fn default_interval() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

/// Schedule metadata attached to a blueprint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecurringPlan {
    #[serde(default)]
    pub id: u64,
    pub recurrence_type: RecurrenceType,
    #[serde(default = "default_interval")]
    pub recurrence_interval: u32,
    #[serde(default, deserialize_with = "de_weekdays")]
    pub recurrence_days: BTreeSet<Weekday>,
    #[serde(default)]
    pub recurrence_start: Option<NaiveDateTime>,
    #[serde(default)]
    pub recurrence_end: Option<NaiveDateTime>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_habit: bool,
    #[serde(default)]
    pub next_run_at: Option<NaiveDateTime>,
    #[serde(default, alias = "lastGenerateAt")]
    pub last_generated_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
    /// Backend-computed status. Read for completeness only; views use
    /// `recurrence::display_status`.
    #[serde(default, skip_serializing)]
    pub display_status: Option<String>,
}

impl RecurringPlan {
    pub fn new(recurrence_type: RecurrenceType, recurrence_interval: u32) -> Self {
        RecurringPlan {
            id: 0,
            recurrence_type,
            recurrence_interval,
            recurrence_days: BTreeSet::new(),
            recurrence_start: None,
            recurrence_end: None,
            is_active: true,
            is_habit: false,
            next_run_at: None,
            last_generated_at: None,
            created_at: None,
            updated_at: None,
            display_status: None,
        }
    }
}

/// Body for attaching a recurring plan to a blueprint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPlan {
    pub task_template_id: u64,
    pub recurrence_type: RecurrenceType,
    pub recurrence_interval: u32,
    pub recurrence_days: BTreeSet<Weekday>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence_start: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence_end: Option<NaiveDateTime>,
    pub is_habit: bool,
}

impl NewPlan {
    /// The plan this request would create, for previewing its status and
    /// frequency before sending.
    pub fn preview(&self) -> RecurringPlan {
        let mut plan = RecurringPlan::new(self.recurrence_type, self.recurrence_interval);
        plan.recurrence_days = self.recurrence_days.clone();
        plan.recurrence_start = self.recurrence_start;
        plan.recurrence_end = self.recurrence_end;
        plan.is_habit = self.is_habit;
        plan
    }
}

/// `recurrenceDays` arrives either as a JSON array or as a comma separated
/// string (older backend builds); `null` means no days.
fn de_weekdays<'de, D>(deserializer: D) -> Result<BTreeSet<Weekday>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<Weekday>),
        Csv(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(BTreeSet::new()),
        Some(Raw::List(days)) => Ok(days.into_iter().collect()),
        Some(Raw::Csv(s)) => s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(|part| part.parse::<Weekday>().map_err(serde::de::Error::custom))
            .collect(),
    }
}

/// Reusable task definition driving recurring instances.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskTemplate {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

/// A blueprint paired with its plan, as served by `/api/task_schedules`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskSchedule {
    pub task_template: TaskTemplate,
    #[serde(default)]
    pub recurring_plan: Option<RecurringPlan>,
}

/// A goal grouping blueprints and their tasks.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub target_type: TaskType,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewTarget {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub target_type: TaskType,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    SystemText,
    DailyBriefing,
    TaskReminder,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    /// Plain text for SYSTEM_TEXT, a JSON document (string or object) otherwise.
    #[serde(default)]
    pub content: serde_json::Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPage {
    #[serde(default)]
    pub content: Vec<Notification>,
    #[serde(default)]
    pub total_elements: u64,
    #[serde(default)]
    pub total_pages: u64,
    #[serde(default)]
    pub last: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MissedTask {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub next_run_date: Option<NaiveDate>,
    #[serde(default)]
    pub task_link: Option<String>,
}

/// Payload of a DAILY_BRIEFING notification.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyBriefing {
    pub date: NaiveDate,
    #[serde(default)]
    pub day_of_week: Option<String>,
    #[serde(default)]
    pub missed_tasks: Vec<MissedTask>,
    #[serde(default)]
    pub action_link: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    #[serde(default)]
    pub active: u64,
    #[serde(default)]
    pub completed: u64,
    #[serde(default)]
    pub canceled: u64,
}

impl DailyStats {
    pub fn total(&self) -> u64 {
        self.active + self.completed + self.canceled
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetricsPeriod {
    Weekly,
    Monthly,
}

impl MetricsPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricsPeriod::Weekly => "weekly",
            MetricsPeriod::Monthly => "monthly",
        }
    }
}

/// Performance metrics from `/api/metrics/{weekly,monthly}`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Metrics {
    pub weekly_total_expected: u32,
    pub weekly_completed: u32,
    pub extra_tasks_completed: u32,
    pub completion_rate: f64,
    pub current_streak: u32,
    pub goal_met: bool,
    pub active_blueprints_count: u32,
    pub week_progress_percentage: f64,
    pub total_experience_points: u32,
    pub insight_message: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct HabitStats {
    pub done_count: u64,
    pub skipped_count: u64,
    pub missed_count: u64,
}

/// Everything `/api/tasks/{id}/detail` knows about a task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetail {
    pub task: Task,
    #[serde(default)]
    pub recurring_plan: Option<RecurringPlan>,
    #[serde(default)]
    pub target: Option<Target>,
    #[serde(default)]
    pub habit_stats: Option<HabitStats>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub id: Option<u64>,
}
