use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::api::TaskApi;
use crate::cache::{QueryCache, QueryKey};
use crate::error::ApiError;
use crate::models::{
    DailyStats, Metrics, MetricsPeriod, NewPlan, NewTarget, NotificationPage, RecurringPlan, Target, Task,
    TaskDetail, TaskDraft, TaskSchedule, User,
};

const TASKS: &str = "tasks";
const STATS: &str = "stats";
const METRICS: &str = "metrics";
const PLANS: &str = "recurringPlans";
const SCHEDULES: &str = "taskSchedules";
const TARGETS: &str = "targets";
const NOTIFICATIONS: &str = "notifications";

const TASK_ROOTS: &[&str] = &[TASKS, STATS, METRICS];
// The active blueprint count in metrics changes with plans.
const PLAN_ROOTS: &[&str] = &[PLANS, SCHEDULES, METRICS];

/// A [`TaskApi`] fronted by the persistent query cache.
///
/// Reads are served from the cache while fresh. Every mutation drops the
/// cache subtrees it can affect, so the next read refetches.
pub struct Workspace<A: TaskApi> {
    api: A,
    cache: QueryCache,
    stale_after: Duration,
    refresh: bool,
}

impl<A: TaskApi> Workspace<A> {
    pub fn new(api: A, cache: QueryCache, stale_after: Duration) -> Self {
        Workspace {
            api,
            cache,
            stale_after,
            refresh: false,
        }
    }

    /// Skip cached reads for this run; results are still stored.
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn api_mut(&mut self) -> &mut A {
        &mut self.api
    }

    pub fn into_parts(self) -> (A, QueryCache) {
        (self.api, self.cache)
    }

    fn cached<T, F>(&mut self, key: QueryKey, fetch: F) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut A) -> Result<T, ApiError>,
    {
        let now = Utc::now();
        if !self.refresh {
            if let Some(hit) = self.cache.get_fresh(&key, self.stale_after, now) {
                tracing::debug!(%key, "cache hit");
                return Ok(hit);
            }
        }
        tracing::debug!(%key, "cache miss");
        let fetched = fetch(&mut self.api);
        let value = self.expire_on_401(fetched)?;
        self.cache.put(key, &value, now);
        Ok(value)
    }

    /// Drops every cached query when the backend ended the session.
    fn expire_on_401<T>(&mut self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if matches!(result, Err(ApiError::SessionExpired)) {
            tracing::debug!("session expired, clearing query cache");
            self.cache.clear();
        }
        result
    }

    /// Runs a mutation and drops `roots` once it succeeds.
    fn mutate<T, F>(&mut self, roots: &[&str], call: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut A) -> Result<T, ApiError>,
    {
        let result = call(&mut self.api);
        let value = self.expire_on_401(result)?;
        self.invalidate(roots);
        Ok(value)
    }

    fn invalidate(&mut self, roots: &[&str]) {
        for root in roots {
            let removed = self.cache.invalidate(&QueryKey::new([*root]));
            if removed > 0 {
                tracing::debug!(root, removed, "invalidated");
            }
        }
    }

    // -- tasks --

    pub fn tasks(&mut self) -> Result<Vec<Task>, ApiError> {
        self.cached(QueryKey::new([TASKS, "all"]), |api| api.list_tasks())
    }

    pub fn overdue_tasks(&mut self) -> Result<Vec<Task>, ApiError> {
        self.cached(QueryKey::new([TASKS, "overdue"]), |api| api.active_tasks(true))
    }

    pub fn tasks_in_month(&mut self, year: i32, month: u32) -> Result<Vec<Task>, ApiError> {
        let key = QueryKey::new([TASKS.to_string(), "month".to_string(), format!("{year:04}-{month:02}")]);
        self.cached(key, |api| api.tasks_in_month(year, month))
    }

    pub fn task_detail(&mut self, id: u64) -> Result<TaskDetail, ApiError> {
        self.cached(QueryKey::new([TASKS.to_string(), "detail".to_string(), id.to_string()]), |api| {
            api.task_detail(id)
        })
    }

    pub fn daily_stats(&mut self, date: NaiveDate) -> Result<DailyStats, ApiError> {
        self.cached(QueryKey::new([STATS.to_string(), "daily".to_string(), date.to_string()]), |api| {
            api.daily_stats(date)
        })
    }

    /// Never cached: the answer is only meaningful right now.
    pub fn active_check(&mut self, ids: &[u64]) -> Result<Vec<u64>, ApiError> {
        let result = self.api.active_check(ids);
        self.expire_on_401(result)
    }

    pub fn create_task(&mut self, draft: &TaskDraft) -> Result<Task, ApiError> {
        self.mutate(TASK_ROOTS, |api| api.create_task(draft))
    }

    pub fn update_task(&mut self, id: u64, patch: &TaskDraft) -> Result<Task, ApiError> {
        self.mutate(TASK_ROOTS, |api| api.update_task(id, patch))
    }

    pub fn delete_task(&mut self, id: u64) -> Result<(), ApiError> {
        self.mutate(TASK_ROOTS, |api| api.delete_task(id))
    }

    // -- targets --

    pub fn targets(&mut self) -> Result<Vec<Target>, ApiError> {
        self.cached(QueryKey::new([TARGETS]), |api| api.list_targets())
    }

    pub fn create_target(&mut self, target: &NewTarget) -> Result<Target, ApiError> {
        self.mutate(&[TARGETS], |api| api.create_target(target))
    }

    pub fn delete_target(&mut self, id: u64) -> Result<(), ApiError> {
        self.mutate(&[TARGETS], |api| api.delete_target(id))
    }

    // -- plans --

    pub fn plans(&mut self, target: Option<u64>) -> Result<Vec<RecurringPlan>, ApiError> {
        let key = match target {
            Some(id) => QueryKey::new([PLANS.to_string(), "target".to_string(), id.to_string()]),
            None => QueryKey::new([PLANS, "all"]),
        };
        self.cached(key, |api| api.list_plans(target))
    }

    pub fn schedules(&mut self, target: Option<u64>) -> Result<Vec<TaskSchedule>, ApiError> {
        let scope = target.map_or_else(|| "all".to_string(), |id| id.to_string());
        self.cached(QueryKey::new([SCHEDULES.to_string(), scope]), |api| api.task_schedules(target))
    }

    pub fn create_plan(&mut self, plan: &NewPlan) -> Result<RecurringPlan, ApiError> {
        self.mutate(PLAN_ROOTS, |api| api.create_plan(plan))
    }

    pub fn delete_plan(&mut self, id: u64) -> Result<(), ApiError> {
        self.mutate(PLAN_ROOTS, |api| api.delete_plan(id))
    }

    // -- notifications --

    pub fn notifications(&mut self, page: u32, size: u32) -> Result<NotificationPage, ApiError> {
        let key = QueryKey::new([NOTIFICATIONS.to_string(), page.to_string(), size.to_string()]);
        self.cached(key, |api| api.notifications(page, size))
    }

    pub fn unread_count(&mut self) -> Result<u64, ApiError> {
        self.cached(QueryKey::new([NOTIFICATIONS, "unread-count"]), |api| api.unread_count())
    }

    pub fn mark_read(&mut self, id: u64) -> Result<(), ApiError> {
        self.mutate(&[NOTIFICATIONS], |api| api.mark_read(id))
    }

    pub fn mark_all_read(&mut self) -> Result<(), ApiError> {
        self.mutate(&[NOTIFICATIONS], |api| api.mark_all_read())
    }

    // -- metrics --

    pub fn metrics(&mut self, period: MetricsPeriod, target: Option<u64>) -> Result<Metrics, ApiError> {
        let scope = target.map_or_else(|| "all".to_string(), |id| id.to_string());
        let key = QueryKey::new([METRICS.to_string(), period.as_str().to_string(), scope]);
        self.cached(key, |api| api.metrics(period, target))
    }

    // -- session --

    /// Logging in or out makes every cached answer belong to someone else.
    pub fn login(&mut self, username: &str, password: &str) -> Result<(), ApiError> {
        self.api.login(username, password)?;
        self.cache.clear();
        Ok(())
    }

    pub fn logout(&mut self) -> Result<(), ApiError> {
        self.cache.clear();
        self.api.logout()
    }

    pub fn current_user(&mut self) -> Result<User, ApiError> {
        self.api.current_user()
    }
}
