// Fake page driver for integration tests
//
// Stands in for a live browser page: it executes injected init scripts
// against in-memory storage maps and routes navigations the way the
// dashboard does (bounce to /login when the session storage has no accepted
// token, honor the login form otherwise).

// Note: Functions appear "unused" because each test binary compiles separately,
// but they ARE used across multiple test files. Suppress false-positive warnings.
#![allow(dead_code)]

use async_trait::async_trait;
use caseboard_e2e::{
    AUTH_TOKEN_KEY, Cookie, Error, GotoOptions, OriginState, PageDriver, Result, SessionState,
    StorageItem, USER_DATA_KEY, WaitUntil,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

/// Installs a fmt subscriber once so `RUST_LOG=debug cargo test` shows the
/// bootstrap transitions. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Origin the fake dashboard is served from.
pub const BASE: &str = "https://caseboard.example";

/// Token the fake dashboard accepts as authenticated.
pub const VALID_TOKEN: &str = "tok-e2e-fake";

/// Credentials the fake login form accepts.
pub const DEMO_USER: &str = "ncrp_demo";
pub const DEMO_PASSWORD: &str = "ncrp_demo";

#[derive(Debug, Default)]
struct Inner {
    init_scripts: Vec<String>,
    session: BTreeMap<String, String>,
    local: BTreeMap<String, String>,
    url: String,
    form: BTreeMap<String, String>,
    navigations: usize,
}

/// Scripted in-memory page.
#[derive(Debug)]
pub struct FakePage {
    inner: Mutex<Inner>,
    valid_token: String,
    accepted: (String, String),
    network_idle_hangs: bool,
    capture_no_origins: bool,
}

impl FakePage {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                url: "about:blank".into(),
                ..Inner::default()
            }),
            valid_token: VALID_TOKEN.into(),
            accepted: (DEMO_USER.into(), DEMO_PASSWORD.into()),
            network_idle_hangs: false,
            capture_no_origins: false,
        }
    }

    /// Overrides the token the fake app treats as authenticated.
    pub fn valid_token(mut self, token: impl Into<String>) -> Self {
        self.valid_token = token.into();
        self
    }

    /// Overrides the credentials the login form accepts.
    pub fn accepting(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.accepted = (username.into(), password.into());
        self
    }

    /// Makes every network-idle wait time out (busy dashboard widgets).
    pub fn network_idle_hangs(mut self) -> Self {
        self.network_idle_hangs = true;
        self
    }

    /// Makes storage-state capture come back empty.
    pub fn capture_no_origins(mut self) -> Self {
        self.capture_no_origins = true;
        self
    }

    pub fn session_item(&self, key: &str) -> Option<String> {
        self.inner.lock().unwrap().session.get(key).cloned()
    }

    pub fn local_item(&self, key: &str) -> Option<String> {
        self.inner.lock().unwrap().local.get(key).cloned()
    }

    pub fn navigations(&self) -> usize {
        self.inner.lock().unwrap().navigations
    }

    fn is_authenticated(&self, inner: &Inner) -> bool {
        inner.session.get(AUTH_TOKEN_KEY) == Some(&self.valid_token)
    }
}

enum StoreKind {
    Session,
    Local,
}

/// Parses one `sessionStorage.setItem("k", "v");` line of an init script.
fn parse_set_item(line: &str) -> Option<(StoreKind, String, String)> {
    let line = line.trim();
    let (kind, rest) = if let Some(rest) = line.strip_prefix("sessionStorage.setItem(") {
        (StoreKind::Session, rest)
    } else if let Some(rest) = line.strip_prefix("localStorage.setItem(") {
        (StoreKind::Local, rest)
    } else {
        return None;
    };
    let args = rest.strip_suffix(");")?;
    match serde_json::from_str::<Value>(&format!("[{args}]")) {
        Ok(Value::Array(values)) => match values.as_slice() {
            [Value::String(key), Value::String(value)] => {
                Some((kind, key.clone(), value.clone()))
            }
            _ => None,
        },
        _ => None,
    }
}

fn run_init_scripts(inner: &mut Inner) {
    let scripts = inner.init_scripts.clone();
    for script in scripts {
        for line in script.lines() {
            if let Some((kind, key, value)) = parse_set_item(line) {
                match kind {
                    StoreKind::Session => inner.session.insert(key, value),
                    StoreKind::Local => inner.local.insert(key, value),
                };
            }
        }
    }
}

fn path_of(url: &str) -> &str {
    url.strip_prefix(BASE).unwrap_or(url)
}

#[async_trait]
impl PageDriver for FakePage {
    async fn add_init_script(&self, source: &str) -> Result<()> {
        self.inner.lock().unwrap().init_scripts.push(source.into());
        Ok(())
    }

    async fn goto(&self, url: &str, options: Option<GotoOptions>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.navigations += 1;

        // Context init scripts run on every navigation, before app code.
        run_init_scripts(&mut inner);

        let path = path_of(url).to_string();
        if path.starts_with("/login") || self.is_authenticated(&inner) {
            inner.url = url.to_string();
        } else {
            inner.url = format!("{BASE}/login?next={path}");
        }

        // Navigation committed; a hanging network-idle wait still times out.
        if self.network_idle_hangs
            && options.and_then(|options| options.wait_until) == Some(WaitUntil::NetworkIdle)
        {
            return Err(Error::Timeout("networkidle not reached".into()));
        }
        Ok(())
    }

    fn url(&self) -> String {
        self.inner.lock().unwrap().url.clone()
    }

    async fn wait_for_load_state(&self, state: WaitUntil, _timeout: Duration) -> Result<()> {
        if self.network_idle_hangs && state == WaitUntil::NetworkIdle {
            return Err(Error::Timeout("networkidle not reached".into()));
        }
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value> {
        let inner = self.inner.lock().unwrap();
        if expression.contains("sessionStorage") {
            let map: serde_json::Map<String, Value> = inner
                .session
                .iter()
                .map(|(key, value)| (key.clone(), Value::String(value.clone())))
                .collect();
            return Ok(Value::Object(map));
        }
        Ok(Value::Null)
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.url.contains("/login") {
            return Err(Error::ElementNotFound(selector.to_string()));
        }
        inner.form.insert(selector.to_string(), value.to_string());
        Ok(())
    }

    async fn click(&self, _selector: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.url.contains("/login") {
            return Ok(());
        }

        let submitted = inner.form.values().any(|value| value == &self.accepted.0)
            && inner.form.values().any(|value| value == &self.accepted.1);
        if submitted {
            // The app stores the session itself after a form login.
            inner
                .session
                .insert(AUTH_TOKEN_KEY.into(), self.valid_token.clone());
            inner.session.insert(
                USER_DATA_KEY.into(),
                format!("{{\"username\":\"{}\"}}", self.accepted.0),
            );
            inner.url = format!("{BASE}/dashboard");
        }
        Ok(())
    }

    async fn storage_state(&self) -> Result<SessionState> {
        if self.capture_no_origins {
            return Ok(SessionState {
                cookies: vec![],
                origins: vec![],
            });
        }

        let inner = self.inner.lock().unwrap();
        Ok(SessionState {
            cookies: vec![Cookie {
                name: "caseboard_csrf".into(),
                value: "csrf-1".into(),
                domain: ".caseboard.example".into(),
                path: "/".into(),
                expires: -1.0,
                http_only: true,
                secure: true,
                same_site: Some("Lax".into()),
            }],
            origins: vec![OriginState {
                origin: BASE.into(),
                local_storage: inner
                    .local
                    .iter()
                    .map(|(name, value)| StorageItem::new(name.clone(), value.clone()))
                    .collect(),
                // Native capture omits session storage; SessionStore::capture
                // merges it from the evaluate() snapshot.
                session_storage: vec![],
            }],
        })
    }
}
