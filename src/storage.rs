use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cache::QueryCache;
use crate::error::StorageError;

/// Session cookies issued by the backend (`JSESSIONID`, `XSRF-TOKEN`, ...).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Session {
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,
    /// Username of the logged in user, when known.
    #[serde(default)]
    pub username: Option<String>,
}

impl Session {
    /// Value for the `Cookie` request header, if any cookie is held.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self.cookies.iter().map(|(k, v)| format!("{k}={v}")).collect();
        Some(pairs.join("; "))
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.cookies.get("XSRF-TOKEN").map(String::as_str)
    }

    /// Records the `name=value` part of a `Set-Cookie` header. An empty value
    /// or `Max-Age=0` removes the cookie.
    pub fn absorb_set_cookie(&mut self, header: &str) {
        let mut parts = header.split(';');
        let Some((name, value)) = parts.next().and_then(|kv| kv.split_once('=')) else {
            return;
        };
        let expired = parts.any(|attr| attr.trim().eq_ignore_ascii_case("max-age=0"));
        let name = name.trim().to_string();
        let value = value.trim().to_string();
        if expired || value.is_empty() {
            self.cookies.remove(&name);
        } else {
            self.cookies.insert(name, value);
        }
    }
}

/// Returns the directory holding the session and cache files.
///
/// The path is determined in the following order:
/// 1. `TASKAPP_DATA_DIR` environment variable.
/// 2. `~/.local/share/taskapp` (on Linux).
/// 3. `./.taskapp` (fallback).
pub fn data_dir() -> PathBuf {
    std::env::var_os("TASKAPP_DATA_DIR").map(PathBuf::from).unwrap_or_else(|| {
        dirs::data_local_dir()
            .map(|p| p.join("taskapp"))
            .unwrap_or_else(|| PathBuf::from(".taskapp"))
    })
}

/// Returns the path to the session file (`session.json`).
fn session_path() -> PathBuf {
    data_dir().join("session.json")
}

/// Returns the path to the query cache snapshot (`cache.json`).
fn cache_path() -> PathBuf {
    data_dir().join("cache.json")
}

/// Reads a JSON file. A missing or unreadable file yields the default value;
/// a corrupt one is logged and also treated as empty.
fn load_json<T: DeserializeOwned + Default>(path: &Path) -> T {
    if !path.exists() {
        return T::default();
    }
    let mut f = match OpenOptions::new().read(true).open(path) {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot open state file");
            return T::default();
        }
    };
    let mut s = String::new();
    if f.read_to_string(&mut s).is_err() {
        return T::default();
    }
    serde_json::from_str(&s).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "discarding corrupt state file");
        T::default()
    })
}

/// Overwrites `path` with the pretty-printed JSON of `value`.
fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|source| StorageError::Io { path: dir.to_path_buf(), source })?;
    }
    let s = serde_json::to_string_pretty(value).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let io_err = |source| StorageError::Io { path: path.to_path_buf(), source };
    let mut f = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(io_err)?;
    f.write_all(s.as_bytes()).map_err(io_err)?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<(), StorageError> {
    if path.exists() {
        fs::remove_file(path).map_err(|source| StorageError::Io { path: path.to_path_buf(), source })?;
    }
    Ok(())
}

/// Loads the stored session. Returns an empty session if none was saved.
pub fn load_session() -> Session {
    load_json(&session_path())
}

pub fn save_session(session: &Session) -> Result<(), StorageError> {
    save_json(&session_path(), session)
}

/// Forgets the session, e.g. after logout or a 401.
pub fn clear_session() -> Result<(), StorageError> {
    remove_if_exists(&session_path())
}

/// Loads the persisted query cache. Returns an empty cache if none exists.
pub fn load_cache() -> QueryCache {
    load_json(&cache_path())
}

pub fn save_cache(cache: &QueryCache) -> Result<(), StorageError> {
    save_json(&cache_path(), cache)
}

/// Deletes the session and cache files.
pub fn delete_local_state() -> Result<(), StorageError> {
    remove_if_exists(&session_path())?;
    remove_if_exists(&cache_path())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_cookie_round() {
        let mut s = Session::default();
        s.absorb_set_cookie("JSESSIONID=abc123; Path=/; HttpOnly");
        s.absorb_set_cookie("XSRF-TOKEN=tok; Path=/");
        assert_eq!(s.csrf_token(), Some("tok"));
        assert_eq!(s.cookie_header().as_deref(), Some("JSESSIONID=abc123; XSRF-TOKEN=tok"));

        s.absorb_set_cookie("JSESSIONID=; Max-Age=0; Path=/");
        assert_eq!(s.cookie_header().as_deref(), Some("XSRF-TOKEN=tok"));
    }

    #[test]
    fn malformed_set_cookie_is_ignored() {
        let mut s = Session::default();
        s.absorb_set_cookie("garbage");
        assert!(s.cookie_header().is_none());
    }
}
