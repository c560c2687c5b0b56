#![allow(dead_code)]

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use taskapp::api::TaskApi;
use taskapp::error::ApiError;
use taskapp::models::*;

pub fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
}

pub fn task(id: u64, title: &str, status: TaskStatus, due: Option<NaiveDateTime>) -> Task {
    Task {
        id,
        title: title.into(),
        description: Some(format!("about {title}")),
        status,
        priority: Some(2),
        task_type: Some(TaskType::Work),
        start_date: None,
        due_date: due,
        created_at: None,
        updated_at: None,
        template_id: None,
        system_message: None,
    }
}

pub fn template(id: u64, title: &str, priority: i32) -> TaskTemplate {
    TaskTemplate { id, title: title.into(), description: None, priority, created_at: None, updated_at: None }
}

/// In-memory backend counting how often each endpoint is hit.
#[derive(Default)]
pub struct FakeApi {
    pub tasks: Vec<Task>,
    pub targets: Vec<Target>,
    pub plans: Vec<RecurringPlan>,
    pub schedules: Vec<TaskSchedule>,
    pub notifications: Vec<Notification>,
    pub still_active: Vec<u64>,
    pub metrics: Metrics,
    pub user: Option<String>,
    /// Every authenticated call answers 401 while set.
    pub expired: bool,
    pub calls: BTreeMap<&'static str, usize>,
    next_id: u64,
}

impl FakeApi {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        FakeApi { tasks, ..FakeApi::default() }
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls.get(name).copied().unwrap_or(0)
    }

    fn hit(&mut self, name: &'static str) -> Result<(), ApiError> {
        *self.calls.entry(name).or_default() += 1;
        if self.expired {
            return Err(ApiError::SessionExpired);
        }
        Ok(())
    }

    fn fresh_id(&mut self) -> u64 {
        self.next_id += 1;
        1000 + self.next_id
    }

    fn not_found() -> ApiError {
        ApiError::Status { status: 404, message: None }
    }
}

impl TaskApi for FakeApi {
    fn list_tasks(&mut self) -> Result<Vec<Task>, ApiError> {
        self.hit("list_tasks")?;
        Ok(self.tasks.clone())
    }

    fn active_tasks(&mut self, _overdue: bool) -> Result<Vec<Task>, ApiError> {
        self.hit("active_tasks")?;
        Ok(self.tasks.iter().filter(|t| t.status == TaskStatus::Active).cloned().collect())
    }

    fn tasks_in_month(&mut self, year: i32, month: u32) -> Result<Vec<Task>, ApiError> {
        use chrono::Datelike;
        self.hit("tasks_in_month")?;
        Ok(self
            .tasks
            .iter()
            .filter(|t| t.due_day().is_some_and(|d| d.year() == year && d.month() == month))
            .cloned()
            .collect())
    }

    fn get_task(&mut self, id: u64) -> Result<Task, ApiError> {
        self.hit("get_task")?;
        self.tasks.iter().find(|t| t.id == id).cloned().ok_or_else(Self::not_found)
    }

    fn task_detail(&mut self, id: u64) -> Result<TaskDetail, ApiError> {
        self.hit("task_detail")?;
        let task = self.tasks.iter().find(|t| t.id == id).cloned().ok_or_else(Self::not_found)?;
        let recurring_plan = task
            .template_id
            .and_then(|tid| self.schedules.iter().find(|s| s.task_template.id == tid))
            .and_then(|s| s.recurring_plan.clone());
        Ok(TaskDetail { task, recurring_plan, target: None, habit_stats: None })
    }

    fn create_task(&mut self, draft: &TaskDraft) -> Result<Task, ApiError> {
        self.hit("create_task")?;
        let id = self.fresh_id();
        let mut created = task(id, draft.title.as_deref().unwrap_or_default(), TaskStatus::Active, draft.due_date);
        created.description = draft.description.clone();
        created.priority = draft.priority;
        created.task_type = draft.task_type;
        self.tasks.push(created.clone());
        Ok(created)
    }

    fn update_task(&mut self, id: u64, patch: &TaskDraft) -> Result<Task, ApiError> {
        self.hit("update_task")?;
        let task = self.tasks.iter_mut().find(|t| t.id == id).ok_or_else(Self::not_found)?;
        if let Some(title) = &patch.title {
            task.title = title.clone();
        }
        if let Some(description) = &patch.description {
            task.description = Some(description.clone());
        }
        if let Some(status) = patch.status {
            task.status = status;
            if status == TaskStatus::Completed && task.template_id.is_some() {
                task.system_message = Some("Next occurrence scheduled.".into());
            }
        }
        if patch.priority.is_some() {
            task.priority = patch.priority;
        }
        if patch.due_date.is_some() {
            task.due_date = patch.due_date;
        }
        Ok(task.clone())
    }

    fn delete_task(&mut self, id: u64) -> Result<(), ApiError> {
        self.hit("delete_task")?;
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            return Err(Self::not_found());
        }
        Ok(())
    }

    fn daily_stats(&mut self, date: NaiveDate) -> Result<DailyStats, ApiError> {
        self.hit("daily_stats")?;
        let mut stats = DailyStats::default();
        for t in self.tasks.iter().filter(|t| t.due_day() == Some(date)) {
            match t.status {
                TaskStatus::Active => stats.active += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Canceled => stats.canceled += 1,
            }
        }
        Ok(stats)
    }

    fn active_check(&mut self, ids: &[u64]) -> Result<Vec<u64>, ApiError> {
        self.hit("active_check")?;
        Ok(ids.iter().copied().filter(|id| self.still_active.contains(id)).collect())
    }

    fn list_targets(&mut self) -> Result<Vec<Target>, ApiError> {
        self.hit("list_targets")?;
        Ok(self.targets.clone())
    }

    fn create_target(&mut self, target: &NewTarget) -> Result<Target, ApiError> {
        self.hit("create_target")?;
        let created = Target {
            id: self.fresh_id(),
            title: target.title.clone(),
            description: target.description.clone(),
            target_type: target.target_type,
            created_at: None,
            updated_at: None,
        };
        self.targets.push(created.clone());
        Ok(created)
    }

    fn delete_target(&mut self, id: u64) -> Result<(), ApiError> {
        self.hit("delete_target")?;
        self.targets.retain(|t| t.id != id);
        Ok(())
    }

    fn list_plans(&mut self, _target: Option<u64>) -> Result<Vec<RecurringPlan>, ApiError> {
        self.hit("list_plans")?;
        Ok(self.plans.clone())
    }

    fn create_plan(&mut self, plan: &NewPlan) -> Result<RecurringPlan, ApiError> {
        self.hit("create_plan")?;
        let mut created = plan.preview();
        created.id = self.fresh_id();
        self.plans.push(created.clone());
        Ok(created)
    }

    fn delete_plan(&mut self, id: u64) -> Result<(), ApiError> {
        self.hit("delete_plan")?;
        self.plans.retain(|p| p.id != id);
        Ok(())
    }

    fn task_schedules(&mut self, _target: Option<u64>) -> Result<Vec<TaskSchedule>, ApiError> {
        self.hit("task_schedules")?;
        Ok(self.schedules.clone())
    }

    fn notifications(&mut self, page: u32, size: u32) -> Result<NotificationPage, ApiError> {
        self.hit("notifications")?;
        let size = size.max(1) as usize;
        let content: Vec<Notification> =
            self.notifications.iter().skip(page as usize * size).take(size).cloned().collect();
        let total = self.notifications.len() as u64;
        Ok(NotificationPage {
            content,
            total_elements: total,
            total_pages: total.div_ceil(size as u64),
            last: (page as u64 + 1) * size as u64 >= total,
        })
    }

    fn unread_count(&mut self) -> Result<u64, ApiError> {
        self.hit("unread_count")?;
        Ok(self.notifications.iter().filter(|n| !n.is_read).count() as u64)
    }

    fn mark_read(&mut self, id: u64) -> Result<(), ApiError> {
        self.hit("mark_read")?;
        let n = self.notifications.iter_mut().find(|n| n.id == id).ok_or_else(Self::not_found)?;
        n.is_read = true;
        Ok(())
    }

    fn mark_all_read(&mut self) -> Result<(), ApiError> {
        self.hit("mark_all_read")?;
        self.notifications.iter_mut().for_each(|n| n.is_read = true);
        Ok(())
    }

    fn metrics(&mut self, _period: MetricsPeriod, _target: Option<u64>) -> Result<Metrics, ApiError> {
        self.hit("metrics")?;
        Ok(self.metrics.clone())
    }

    fn login(&mut self, username: &str, password: &str) -> Result<(), ApiError> {
        *self.calls.entry("login").or_default() += 1;
        if password != "secret" {
            return Err(ApiError::Status { status: 401, message: Some("Bad credentials".into()) });
        }
        self.expired = false;
        self.user = Some(username.to_string());
        Ok(())
    }

    fn logout(&mut self) -> Result<(), ApiError> {
        *self.calls.entry("logout").or_default() += 1;
        self.user = None;
        Ok(())
    }

    fn current_user(&mut self) -> Result<User, ApiError> {
        self.hit("current_user")?;
        self.user
            .clone()
            .map(|username| User { username, id: Some(1) })
            .ok_or(ApiError::Status { status: 401, message: None })
    }
}
