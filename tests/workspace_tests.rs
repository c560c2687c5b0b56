mod common;

use std::time::Duration;

use common::{at, task, template, FakeApi};
use taskapp::cache::QueryCache;
use taskapp::error::ApiError;
use taskapp::models::{
    MetricsPeriod, NewPlan, NewTarget, RecurrenceType, TaskDraft, TaskSchedule, TaskStatus, TaskType,
};
use taskapp::workspace::Workspace;

fn workspace(api: FakeApi) -> Workspace<FakeApi> {
    Workspace::new(api, QueryCache::default(), Duration::from_secs(300))
}

#[test]
fn test_reads_are_served_from_cache() {
    let mut ws = workspace(FakeApi::with_tasks(vec![task(1, "A", TaskStatus::Active, None)]));
    assert_eq!(ws.tasks().unwrap().len(), 1);
    assert_eq!(ws.tasks().unwrap().len(), 1);
    assert_eq!(ws.api_mut().calls("list_tasks"), 1);
}

#[test]
fn test_refresh_bypasses_cache() {
    let mut ws = workspace(FakeApi::default()).with_refresh(true);
    ws.targets().unwrap();
    ws.targets().unwrap();
    assert_eq!(ws.api_mut().calls("list_targets"), 2);
    assert_eq!(ws.cache().len(), 1);
}

#[test]
fn test_task_mutation_invalidates_tasks_and_stats() {
    let mut ws = workspace(FakeApi::default());
    ws.tasks().unwrap();
    ws.daily_stats(at(2026, 2, 13, 0).date()).unwrap();
    ws.metrics(MetricsPeriod::Weekly, None).unwrap();
    ws.targets().unwrap();
    assert_eq!(ws.cache().len(), 4);

    let draft = TaskDraft {
        title: Some("New".into()),
        description: Some("d".into()),
        priority: Some(3),
        due_date: Some(at(2026, 2, 13, 0)),
        ..TaskDraft::default()
    };
    ws.create_task(&draft).unwrap();

    // Only the targets entry survives.
    assert_eq!(ws.cache().len(), 1);
    assert_eq!(ws.tasks().unwrap().len(), 1);
    assert_eq!(ws.api_mut().calls("list_tasks"), 2);
    ws.targets().unwrap();
    assert_eq!(ws.api_mut().calls("list_targets"), 1);
}

#[test]
fn test_plan_mutation_invalidates_plans_and_schedules() {
    let mut api = FakeApi::default();
    api.schedules = vec![TaskSchedule { task_template: template(3, "Stretch", 2), recurring_plan: None }];
    let mut ws = workspace(api);
    ws.schedules(None).unwrap();
    ws.plans(None).unwrap();
    ws.targets().unwrap();

    let plan = NewPlan {
        task_template_id: 3,
        recurrence_type: RecurrenceType::Daily,
        recurrence_interval: 1,
        recurrence_days: Default::default(),
        recurrence_start: None,
        recurrence_end: None,
        is_habit: true,
    };
    let created = ws.create_plan(&plan).unwrap();
    assert!(created.is_habit);
    assert_eq!(ws.cache().len(), 1);

    ws.delete_plan(created.id).unwrap();
    assert!(ws.plans(None).unwrap().is_empty());
}

#[test]
fn test_target_and_notification_mutations() {
    let mut ws = workspace(FakeApi::default());
    ws.targets().unwrap();
    ws.unread_count().unwrap();
    ws.notifications(0, 10).unwrap();

    let target = ws
        .create_target(&NewTarget { title: "Fitness".into(), description: None, target_type: TaskType::Life })
        .unwrap();
    assert_eq!(ws.targets().unwrap(), vec![target]);

    ws.mark_all_read().unwrap();
    assert_eq!(ws.cache().len(), 1);
}

#[test]
fn test_failed_mutation_keeps_cache() {
    let mut ws = workspace(FakeApi::default());
    ws.tasks().unwrap();
    let err = ws.delete_task(42).unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 404, .. }));
    assert_eq!(ws.cache().len(), 1);
}

#[test]
fn test_session_expiry_drops_cache() {
    let mut ws = workspace(FakeApi::default());
    ws.targets().unwrap();
    ws.api_mut().expired = true;
    let err = ws.tasks().unwrap_err();
    assert!(matches!(err, ApiError::SessionExpired));
    assert!(ws.cache().is_empty());
}

#[test]
fn test_login_and_logout_reset_cache() {
    let mut ws = workspace(FakeApi::default());
    ws.targets().unwrap();
    assert!(ws.login("alice", "wrong").is_err());
    assert_eq!(ws.cache().len(), 1);

    ws.login("alice", "secret").unwrap();
    assert!(ws.cache().is_empty());
    assert_eq!(ws.current_user().unwrap().username, "alice");

    ws.targets().unwrap();
    ws.logout().unwrap();
    assert!(ws.cache().is_empty());
    assert!(ws.current_user().is_err());
}

#[test]
fn test_active_check_is_never_cached() {
    let mut api = FakeApi::default();
    api.still_active = vec![2];
    let mut ws = workspace(api);
    assert_eq!(ws.active_check(&[1, 2]).unwrap(), vec![2]);
    assert_eq!(ws.active_check(&[1, 2]).unwrap(), vec![2]);
    assert_eq!(ws.api_mut().calls("active_check"), 2);
    assert!(ws.cache().is_empty());
}

#[test]
fn test_month_query_keyed_per_month() {
    let tasks = vec![
        task(1, "Feb", TaskStatus::Active, Some(at(2026, 2, 3, 9))),
        task(2, "Mar", TaskStatus::Active, Some(at(2026, 3, 3, 9))),
    ];
    let mut ws = workspace(FakeApi::with_tasks(tasks));
    assert_eq!(ws.tasks_in_month(2026, 2).unwrap()[0].title, "Feb");
    assert_eq!(ws.tasks_in_month(2026, 3).unwrap()[0].title, "Mar");
    assert_eq!(ws.api_mut().calls("tasks_in_month"), 2);
    assert_eq!(ws.cache().len(), 2);
}

#[test]
fn test_session_expiry_on_mutation_drops_cache() {
    let mut ws = workspace(FakeApi::with_tasks(vec![task(1, "A", TaskStatus::Active, None)]));
    ws.targets().unwrap();
    ws.tasks().unwrap();
    ws.api_mut().expired = true;

    let draft = TaskDraft { title: Some("New".into()), ..TaskDraft::default() };
    assert!(matches!(ws.create_task(&draft), Err(ApiError::SessionExpired)));
    assert!(ws.cache().is_empty());

    ws.api_mut().expired = false;
    ws.unread_count().unwrap();
    ws.api_mut().expired = true;
    assert!(matches!(ws.mark_all_read(), Err(ApiError::SessionExpired)));
    assert!(matches!(ws.delete_plan(3), Err(ApiError::SessionExpired)));
    assert!(ws.cache().is_empty());
}
