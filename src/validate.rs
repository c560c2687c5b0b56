use std::fmt;

use crate::models::TaskDraft;

/// One problem found in a task draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub field: &'static str,
    pub message: &'static str,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Checks a draft before it is sent as a new task. Every issue is reported.
pub fn validate_task(draft: &TaskDraft) -> Vec<Issue> {
    let mut issues = Vec::new();

    if draft.title.as_deref().is_none_or(|t| t.trim().is_empty()) {
        issues.push(Issue { field: "title", message: "Task title is required" });
    }
    if draft.description.as_deref().is_none_or(|d| d.trim().is_empty()) {
        issues.push(Issue { field: "description", message: "Task description is required" });
    }
    if draft.due_date.is_none() {
        issues.push(Issue { field: "dueDate", message: "Due date is required" });
    }
    match draft.priority {
        None => issues.push(Issue { field: "priority", message: "Priority is required" }),
        Some(p) if !(1..=5).contains(&p) => {
            issues.push(Issue { field: "priority", message: "Priority must be between 1 and 5" })
        }
        Some(_) => {}
    }

    issues
}

/// Checks the fields a PATCH actually sets.
pub fn validate_patch(draft: &TaskDraft) -> Vec<Issue> {
    let mut issues = Vec::new();
    if draft.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        issues.push(Issue { field: "title", message: "Task title is required" });
    }
    if draft.description.as_deref().is_some_and(|d| d.trim().is_empty()) {
        issues.push(Issue { field: "description", message: "Task description is required" });
    }
    if draft.priority.is_some_and(|p| !(1..=5).contains(&p)) {
        issues.push(Issue { field: "priority", message: "Priority must be between 1 and 5" });
    }
    issues
}
