use chrono::NaiveDate;

use crate::error::ApiError;
use crate::models::{
    DailyStats, Metrics, MetricsPeriod, NewPlan, NewTarget, NotificationPage, RecurringPlan, Target, Task,
    TaskDetail, TaskDraft, TaskSchedule, User,
};

/// The REST backend as seen by this client.
///
/// [`crate::client::ApiClient`] implements it over HTTP; tests substitute an
/// in-memory backend.
pub trait TaskApi {
    // -- tasks --
    fn list_tasks(&mut self) -> Result<Vec<Task>, ApiError>;
    /// Active tasks; with `overdue` only those due before today.
    fn active_tasks(&mut self, overdue: bool) -> Result<Vec<Task>, ApiError>;
    /// Tasks due within a calendar month.
    fn tasks_in_month(&mut self, year: i32, month: u32) -> Result<Vec<Task>, ApiError>;
    fn get_task(&mut self, id: u64) -> Result<Task, ApiError>;
    fn task_detail(&mut self, id: u64) -> Result<TaskDetail, ApiError>;
    fn create_task(&mut self, draft: &TaskDraft) -> Result<Task, ApiError>;
    fn update_task(&mut self, id: u64, patch: &TaskDraft) -> Result<Task, ApiError>;
    fn delete_task(&mut self, id: u64) -> Result<(), ApiError>;
    fn daily_stats(&mut self, date: NaiveDate) -> Result<DailyStats, ApiError>;
    /// Subset of `ids` that are still active.
    fn active_check(&mut self, ids: &[u64]) -> Result<Vec<u64>, ApiError>;

    // -- targets --
    fn list_targets(&mut self) -> Result<Vec<Target>, ApiError>;
    fn create_target(&mut self, target: &NewTarget) -> Result<Target, ApiError>;
    fn delete_target(&mut self, id: u64) -> Result<(), ApiError>;

    // -- blueprints --
    fn list_plans(&mut self, target: Option<u64>) -> Result<Vec<RecurringPlan>, ApiError>;
    fn create_plan(&mut self, plan: &NewPlan) -> Result<RecurringPlan, ApiError>;
    fn delete_plan(&mut self, id: u64) -> Result<(), ApiError>;
    fn task_schedules(&mut self, target: Option<u64>) -> Result<Vec<TaskSchedule>, ApiError>;

    // -- notifications --
    fn notifications(&mut self, page: u32, size: u32) -> Result<NotificationPage, ApiError>;
    fn unread_count(&mut self) -> Result<u64, ApiError>;
    fn mark_read(&mut self, id: u64) -> Result<(), ApiError>;
    fn mark_all_read(&mut self) -> Result<(), ApiError>;

    // -- metrics --
    fn metrics(&mut self, period: MetricsPeriod, target: Option<u64>) -> Result<Metrics, ApiError>;

    // -- session --
    fn login(&mut self, username: &str, password: &str) -> Result<(), ApiError>;
    fn logout(&mut self) -> Result<(), ApiError>;
    fn current_user(&mut self) -> Result<User, ApiError>;
}
