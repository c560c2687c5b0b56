use chrono::NaiveDate;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::api::TaskApi;
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{
    DailyStats, Metrics, MetricsPeriod, NewPlan, NewTarget, NotificationPage, RecurringPlan, Target, Task,
    TaskDetail, TaskDraft, TaskSchedule, User,
};
use crate::storage::{self, Session};

/// Endpoints whose 401 means "not logged in yet" rather than "session expired".
const SILENT_AUTH_PATHS: [&str; 3] = ["/api/user/me", "/api/csrf", "/login"];

const CSRF_HEADER: &str = "X-XSRF-TOKEN";

enum Body {
    Empty,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

/// Blocking HTTP client for the task backend.
///
/// Session cookies are kept in a [`Session`] that is written back to disk
/// whenever the server changes them.
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    pub fn new(config: &Config, session: Session) -> Result<Self, ApiError> {
        endpoint_url(&config.base_url, "/")?;
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(ApiClient {
            http,
            base_url: config.base_url.clone(),
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn send(&mut self, method: Method, path: &str, query: &[(&str, String)], body: Body) -> Result<String, ApiError> {
        let url = endpoint_url(&self.base_url, path)?;
        tracing::debug!(%method, %url, "request");

        let mut req: RequestBuilder = self.http.request(method.clone(), url).query(query);
        if let Some(cookies) = self.session.cookie_header() {
            req = req.header(COOKIE, cookies);
        }
        if let Some(token) = self.session.csrf_token() {
            req = req.header(CSRF_HEADER, token);
        }
        req = match body {
            Body::Empty => req,
            Body::Json(v) => req.json(&v),
            Body::Form(pairs) => req.form(&pairs),
        };

        let resp = req.send()?;
        let status = resp.status();
        self.absorb_cookies(resp.headers().get_all(SET_COOKIE).iter().filter_map(|v| v.to_str().ok()));
        let text = resp.text()?;
        tracing::debug!(%method, path, status = status.as_u16(), bytes = text.len(), "response");

        if status.is_success() {
            return Ok(text);
        }
        if status == StatusCode::UNAUTHORIZED && !is_silent_auth_path(path) {
            tracing::warn!(path, "session expired");
            self.session = Session::default();
            if let Err(e) = storage::clear_session() {
                tracing::warn!(error = %e, "could not clear stored session");
            }
            return Err(ApiError::SessionExpired);
        }
        Err(ApiError::Status {
            status: status.as_u16(),
            message: error_message(&text),
        })
    }

    fn absorb_cookies<'a>(&mut self, headers: impl Iterator<Item = &'a str>) {
        let before = self.session.clone();
        for header in headers {
            self.session.absorb_set_cookie(header);
        }
        if self.session != before {
            if let Err(e) = storage::save_session(&self.session) {
                tracing::warn!(error = %e, "could not persist session");
            }
        }
    }

    fn get<T: DeserializeOwned>(&mut self, path: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        let text = self.send(Method::GET, path, query, Body::Empty)?;
        decode_envelope(&text)
    }

    fn write<T: DeserializeOwned>(&mut self, method: Method, path: &str, body: serde_json::Value) -> Result<T, ApiError> {
        let text = self.send(method, path, &[], Body::Json(body))?;
        decode_envelope(&text)
    }

    fn fire(&mut self, method: Method, path: &str) -> Result<(), ApiError> {
        self.send(method, path, &[], Body::Empty).map(|_| ())
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

impl TaskApi for ApiClient {
    fn list_tasks(&mut self) -> Result<Vec<Task>, ApiError> {
        self.get("/api/tasks", &[])
    }

    fn active_tasks(&mut self, overdue: bool) -> Result<Vec<Task>, ApiError> {
        let mut query = vec![("status", "active".to_string())];
        if overdue {
            query.push(("overdue", "true".to_string()));
        }
        self.get("/api/tasks", &query)
    }

    fn tasks_in_month(&mut self, year: i32, month: u32) -> Result<Vec<Task>, ApiError> {
        self.get("/api/tasks/month", &[("month", format!("{year:04}-{month:02}"))])
    }

    fn get_task(&mut self, id: u64) -> Result<Task, ApiError> {
        self.get(&format!("/api/tasks/{id}"), &[])
    }

    fn task_detail(&mut self, id: u64) -> Result<TaskDetail, ApiError> {
        self.get(&format!("/api/tasks/{id}/detail"), &[])
    }

    fn create_task(&mut self, draft: &TaskDraft) -> Result<Task, ApiError> {
        let body = to_json(draft)?;
        self.write(Method::POST, "/api/tasks", body)
    }

    fn update_task(&mut self, id: u64, patch: &TaskDraft) -> Result<Task, ApiError> {
        let body = to_json(patch)?;
        self.write(Method::PATCH, &format!("/api/tasks/{id}"), body)
    }

    fn delete_task(&mut self, id: u64) -> Result<(), ApiError> {
        self.fire(Method::DELETE, &format!("/api/tasks/{id}"))
    }

    fn daily_stats(&mut self, date: NaiveDate) -> Result<DailyStats, ApiError> {
        let stats: Option<DailyStats> = self.get("/api/tasks/stats/daily", &[("date", date.to_string())])?;
        Ok(stats.unwrap_or_default())
    }

    fn active_check(&mut self, ids: &[u64]) -> Result<Vec<u64>, ApiError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined: Vec<String> = ids.iter().map(u64::to_string).collect();
        let active: Option<Vec<u64>> = self.get("/api/tasks/active-check", &[("ids", joined.join(","))])?;
        Ok(active.unwrap_or_default())
    }

    fn list_targets(&mut self) -> Result<Vec<Target>, ApiError> {
        self.get("/api/targets", &[])
    }

    fn create_target(&mut self, target: &NewTarget) -> Result<Target, ApiError> {
        let body = to_json(target)?;
        self.write(Method::POST, "/api/targets", body)
    }

    fn delete_target(&mut self, id: u64) -> Result<(), ApiError> {
        self.fire(Method::DELETE, &format!("/api/targets/{id}"))
    }

    fn list_plans(&mut self, target: Option<u64>) -> Result<Vec<RecurringPlan>, ApiError> {
        match target {
            Some(id) => self.get(&format!("/api/recurringPlans/target/{id}"), &[]),
            None => self.get("/api/recurringPlans", &[]),
        }
    }

    fn create_plan(&mut self, plan: &NewPlan) -> Result<RecurringPlan, ApiError> {
        let body = to_json(plan)?;
        self.write(Method::POST, "/api/recurringPlans", body)
    }

    fn delete_plan(&mut self, id: u64) -> Result<(), ApiError> {
        self.fire(Method::DELETE, &format!("/api/recurringPlans/{id}"))
    }

    fn task_schedules(&mut self, target: Option<u64>) -> Result<Vec<TaskSchedule>, ApiError> {
        let query: Vec<(&str, String)> = target.map(|id| ("target_id", id.to_string())).into_iter().collect();
        let schedules: Option<Vec<TaskSchedule>> = self.get("/api/task_schedules", &query)?;
        Ok(schedules.unwrap_or_default())
    }

    fn notifications(&mut self, page: u32, size: u32) -> Result<NotificationPage, ApiError> {
        let page: Option<NotificationPage> = self.get(
            "/api/notifications",
            &[("page", page.to_string()), ("size", size.to_string())],
        )?;
        Ok(page.unwrap_or_default())
    }

    fn unread_count(&mut self) -> Result<u64, ApiError> {
        let count: Option<u64> = self.get("/api/notifications/unread-count", &[])?;
        Ok(count.unwrap_or(0))
    }

    fn mark_read(&mut self, id: u64) -> Result<(), ApiError> {
        self.fire(Method::PATCH, &format!("/api/notifications/{id}/read"))
    }

    fn mark_all_read(&mut self) -> Result<(), ApiError> {
        self.fire(Method::PATCH, "/api/notifications/read-all")
    }

    fn metrics(&mut self, period: MetricsPeriod, target: Option<u64>) -> Result<Metrics, ApiError> {
        let query: Vec<(&str, String)> = target.map(|id| ("targetId", id.to_string())).into_iter().collect();
        let metrics: Option<Metrics> = self.get(&format!("/api/metrics/{}", period.as_str()), &query)?;
        Ok(metrics.unwrap_or_default())
    }

    fn login(&mut self, username: &str, password: &str) -> Result<(), ApiError> {
        // The CSRF cookie must exist before the form post.
        self.send(Method::GET, "/api/csrf", &[], Body::Empty)?;
        let form = vec![
            ("username".to_string(), username.to_string()),
            ("password".to_string(), password.to_string()),
        ];
        self.send(Method::POST, "/login", &[], Body::Form(form))?;
        self.session.username = Some(username.to_string());
        if let Err(e) = storage::save_session(&self.session) {
            tracing::warn!(error = %e, "could not persist session");
        }
        tracing::info!(username, "logged in");
        Ok(())
    }

    fn logout(&mut self) -> Result<(), ApiError> {
        let result = self.fire(Method::POST, "/logout");
        self.session = Session::default();
        if let Err(e) = storage::clear_session() {
            tracing::warn!(error = %e, "could not clear stored session");
        }
        result
    }

    fn current_user(&mut self) -> Result<User, ApiError> {
        let user: Option<User> = self.get("/api/user/me", &[])?;
        user.ok_or(ApiError::Status { status: 401, message: Some("Not logged in.".to_string()) })
    }
}

/// Joins the configured origin and an absolute API path.
pub fn endpoint_url(base: &str, path: &str) -> Result<Url, ApiError> {
    let joined = format!("{}{}", base.trim_end_matches('/'), path);
    Url::parse(&joined).map_err(|_| ApiError::InvalidUrl(base.to_string()))
}

pub fn is_silent_auth_path(path: &str) -> bool {
    SILENT_AUTH_PATHS.iter().any(|p| path.starts_with(p))
}

/// Extracts the payload of a `{ code, message, data }` envelope. Bodies
/// without a `data` member are decoded as the payload itself; an empty body
/// decodes as JSON `null`.
pub fn decode_envelope<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    let value: serde_json::Value = if text.trim().is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_str(text).map_err(|e| ApiError::Decode(e.to_string()))?
    };
    let payload = match value {
        serde_json::Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(serde_json::Value::Null)
        }
        other => other,
    };
    serde_json::from_value(payload).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Human message carried by an error body: the envelope's `message`, or the
/// body itself when the server answered with plain text.
pub fn error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: Option<String>,
    }

    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.message.filter(|m| !m.trim().is_empty()),
        Err(_) if !body.starts_with('{') && !body.starts_with('<') => Some(body.to_string()),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_and_bare_payloads() {
        let wrapped: Vec<u64> = decode_envelope(r#"{"code":200,"message":"success","data":[1,2]}"#).unwrap();
        assert_eq!(wrapped, vec![1, 2]);
        let bare: Vec<u64> = decode_envelope("[3]").unwrap();
        assert_eq!(bare, vec![3]);
        let empty: Option<u64> = decode_envelope("").unwrap();
        assert_eq!(empty, None);
        let missing: Option<Vec<u64>> = decode_envelope(r#"{"code":200,"data":null}"#).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn envelope_shape_mismatch_is_decode_error() {
        let err = decode_envelope::<Vec<u64>>(r#"{"data":"nope"}"#).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn error_bodies() {
        assert_eq!(error_message(r#"{"code":404,"message":"Task not found"}"#).as_deref(), Some("Task not found"));
        assert_eq!(error_message("Access denied").as_deref(), Some("Access denied"));
        assert_eq!(error_message("<html>oops</html>"), None);
        assert_eq!(error_message(""), None);
    }

    #[test]
    fn url_joining() {
        let url = endpoint_url("http://localhost:8080/", "/api/tasks").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/tasks");
        assert!(matches!(endpoint_url("not a url", "/api"), Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn silent_paths() {
        assert!(is_silent_auth_path("/api/user/me"));
        assert!(is_silent_auth_path("/login"));
        assert!(!is_silent_auth_path("/api/tasks"));
    }
}
