// Persisted session store
//
// One JSON file per role holds a previously captured storage state (cookies,
// localStorage, sessionStorage) keyed by origin. Produced once by a
// successful login, consumed by later runs to skip the login form entirely.

use crate::driver::PageDriver;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Session-storage key the dashboard reads its bearer token from.
pub const AUTH_TOKEN_KEY: &str = "authToken";

/// Session-storage key holding the JSON-stringified user profile.
pub const USER_DATA_KEY: &str = "userData";

/// Page-side snapshot of sessionStorage as a plain object.
///
/// Playwright's `storageState` capture covers cookies and localStorage only,
/// so the store evaluates this in the live page and merges the result.
pub(crate) const SESSION_SNAPSHOT_SCRIPT: &str = "\
(() => {
  const out = {};
  for (let i = 0; i < sessionStorage.length; i++) {
    const key = sessionStorage.key(i);
    out[key] = sessionStorage.getItem(key);
  }
  return out;
})()";

/// Cookie record inside a captured storage state.
///
/// Opaque to the bootstrap logic; carried through persist/load untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// Cookie domain (dot prefix for subdomain matching, e.g. ".caseboard.example")
    pub domain: String,
    /// Cookie path
    pub path: String,
    /// Unix timestamp in seconds; -1 for session cookies
    pub expires: f64,
    /// HTTP-only flag
    pub http_only: bool,
    /// Secure flag
    pub secure: bool,
    /// SameSite attribute ("Strict", "Lax", "None")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

/// One key/value entry in localStorage or sessionStorage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageItem {
    /// Storage key
    pub name: String,
    /// Storage value
    pub value: String,
}

impl StorageItem {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Per-origin storage record.
///
/// `sessionStorage` is this crate's extension over Playwright's native
/// capture; files written by other tools simply deserialize it as empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginState {
    /// Origin URL (e.g. "https://caseboard.example")
    pub origin: String,
    /// localStorage entries for this origin
    pub local_storage: Vec<StorageItem>,
    /// sessionStorage entries for this origin
    #[serde(default)]
    pub session_storage: Vec<StorageItem>,
}

/// Captured browser session: cookies plus per-origin storage.
///
/// This is the on-disk shape of the persisted session file and the in-memory
/// result of a storage-state capture. Always rewritten whole, never patched
/// in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    /// Cookies from the automation-layer capture
    pub cookies: Vec<Cookie>,
    /// Origins with their storage entries
    pub origins: Vec<OriginState>,
}

impl SessionState {
    /// First origin record, the one session bootstrap injects from.
    pub fn first_origin(&self) -> Option<&OriginState> {
        self.origins.first()
    }

    /// Bearer token stored under [`AUTH_TOKEN_KEY`], searched across origins.
    pub fn auth_token(&self) -> Option<&str> {
        self.origins
            .iter()
            .flat_map(|origin| origin.session_storage.iter())
            .find(|item| item.name == AUTH_TOKEN_KEY)
            .map(|item| item.value.as_str())
    }

    /// A state is usable only if some origin carries a non-empty
    /// sessionStorage with an auth token entry.
    pub fn is_valid(&self) -> bool {
        self.auth_token().is_some_and(|token| !token.is_empty())
    }
}

/// Reads and writes the persisted session file for one role.
///
/// Not safe for concurrent writers on the same path; parallel workers must
/// point at distinct files (one per logical user/role).
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path this store reads from and writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and validates the persisted session.
    ///
    /// Absent file, unparseable JSON, and a state without an auth token are
    /// all the same non-error condition: "no session available". Each reason
    /// is logged at debug level so a surprising fresh login is explainable.
    pub async fn load(&self) -> Option<SessionState> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::debug!(path = %self.path.display(), %err, "no persisted session file");
                return None;
            }
        };

        let state: SessionState = match serde_json::from_slice(&bytes) {
            Ok(state) => state,
            Err(err) => {
                tracing::debug!(path = %self.path.display(), %err, "persisted session not parseable, ignoring");
                return None;
            }
        };

        if !state.is_valid() {
            tracing::debug!(
                path = %self.path.display(),
                origins = state.origins.len(),
                "persisted session has no auth token, ignoring"
            );
            return None;
        }

        Some(state)
    }

    /// Captures the driver's current session and writes it to the store path.
    ///
    /// Merges a live sessionStorage snapshot into the first origin of the
    /// automation-layer capture (which omits session storage), then rewrites
    /// the file. Returns the absolute path written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the capture contains zero origins;
    /// nothing is written in that case.
    pub async fn capture<D: PageDriver + ?Sized>(&self, driver: &D) -> Result<PathBuf> {
        let mut state = driver.storage_state().await?;
        if state.origins.is_empty() {
            return Err(Error::Persistence("no origins captured".into()));
        }

        let snapshot = driver.evaluate(SESSION_SNAPSHOT_SCRIPT).await?;
        let entries = snapshot_entries(&snapshot);
        tracing::debug!(entries = entries.len(), "captured sessionStorage snapshot");
        state.origins[0].session_storage = entries;

        let json = serde_json::to_vec_pretty(&state)?;
        tokio::fs::write(&self.path, json).await?;

        let absolute = std::path::absolute(&self.path)?;
        tracing::debug!(path = %absolute.display(), "persisted session state");
        Ok(absolute)
    }
}

/// Converts the snapshot object `{key: value, ...}` into storage items.
///
/// Non-object snapshots and non-string values are dropped rather than
/// persisted as garbage.
pub(crate) fn snapshot_entries(snapshot: &serde_json::Value) -> Vec<StorageItem> {
    let Some(map) = snapshot.as_object() else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(key, value)| {
            value
                .as_str()
                .map(|value| StorageItem::new(key.clone(), value))
        })
        .collect()
}
