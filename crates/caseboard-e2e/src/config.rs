// Static harness configuration: credentials per role, base URL, routes.
//
// Everything here is decided at suite start and never mutated. Callers pass
// the config (or pieces of it) into the authenticator and bootstrapper
// explicitly; there is no process-wide singleton.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::path::PathBuf;
use url::Url;

/// Dashboard roles the suite logs in as.
///
/// Each role owns its own credentials, landing route, and persisted session
/// file, so parallel workers never share a session path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Reads and works cases
    Analyst,
    /// Reviews and reassigns cases across analysts
    Supervisor,
    /// Administers users and reference data
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Analyst => "analyst",
            Role::Supervisor => "supervisor",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Username/password pair for one role.
#[derive(Debug, Clone)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Selectors for the dashboard's login form.
#[derive(Debug, Clone)]
pub struct LoginSelectors {
    /// Username/email input
    pub username: String,
    /// Password input
    pub password: String,
    /// Submit button
    pub submit: String,
}

impl Default for LoginSelectors {
    fn default() -> Self {
        Self {
            username: "input[name='username']".into(),
            password: "input[type='password']".into(),
            submit: "button[type='submit']".into(),
        }
    }
}

/// Per-role bundle: credential, landing route, session file.
#[derive(Debug, Clone)]
pub struct RoleConfig {
    pub credential: Credential,
    /// Route the role lands on after login (e.g. "/dashboard")
    pub dashboard_path: String,
    /// Persisted session file for this role
    pub session_file: PathBuf,
}

/// Immutable harness configuration shared by every test in a run.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    base_url: Url,
    auth_path: String,
    login_path: String,
    login_route: Regex,
    selectors: LoginSelectors,
    roles: HashMap<Role, RoleConfig>,
}

impl HarnessConfig {
    /// Creates a new builder for HarnessConfig
    pub fn builder(base_url: impl Into<String>) -> HarnessConfigBuilder {
        HarnessConfigBuilder::new(base_url)
    }

    /// Base URL of the application under test.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL of the authentication API endpoint.
    pub fn auth_endpoint(&self) -> Result<Url> {
        self.join(&self.auth_path)
    }

    /// Absolute URL of the login form.
    pub fn login_url(&self) -> Result<Url> {
        self.join(&self.login_path)
    }

    /// True when the URL is on the login route.
    ///
    /// Landing back here after navigating with an injected session is how an
    /// expired/invalid token shows up.
    pub fn is_login_url(&self, url: &str) -> bool {
        self.login_route.is_match(url)
    }

    /// Login form selectors.
    pub fn selectors(&self) -> &LoginSelectors {
        &self.selectors
    }

    /// Config bundle for one role.
    pub fn role(&self, role: Role) -> Result<&RoleConfig> {
        self.roles
            .get(&role)
            .ok_or_else(|| Error::InvalidArgument(format!("role '{role}' is not configured")))
    }

    /// Absolute dashboard URL for one role.
    pub fn dashboard_url(&self, role: Role) -> Result<Url> {
        let role_config = self.role(role)?;
        self.join(&role_config.dashboard_path)
    }

    fn join(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|err| Error::InvalidArgument(format!("cannot join '{path}': {err}")))
    }
}

/// Builder for HarnessConfig
#[derive(Debug)]
pub struct HarnessConfigBuilder {
    base_url: String,
    auth_path: String,
    login_path: String,
    login_route_pattern: Option<String>,
    selectors: LoginSelectors,
    session_dir: PathBuf,
    roles: Vec<(Role, Credential, String)>,
}

impl HarnessConfigBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_path: "/api/auth/login".into(),
            login_path: "/login".into(),
            login_route_pattern: None,
            selectors: LoginSelectors::default(),
            session_dir: PathBuf::from(".auth"),
            roles: Vec::new(),
        }
    }

    /// Sets the authentication API path (default "/api/auth/login")
    pub fn auth_path(mut self, path: impl Into<String>) -> Self {
        self.auth_path = path.into();
        self
    }

    /// Sets the login form route (default "/login")
    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    /// Overrides the regex that classifies a URL as the login route.
    ///
    /// By default the pattern is derived from the login path.
    pub fn login_route_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.login_route_pattern = Some(pattern.into());
        self
    }

    /// Sets the login form selectors
    pub fn selectors(mut self, selectors: LoginSelectors) -> Self {
        self.selectors = selectors;
        self
    }

    /// Sets the directory for persisted session files (default ".auth")
    pub fn session_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.session_dir = dir.into();
        self
    }

    /// Registers a role with its credential and landing route.
    ///
    /// The role's session file is `<session_dir>/<role>.json`.
    pub fn role(
        mut self,
        role: Role,
        credential: Credential,
        dashboard_path: impl Into<String>,
    ) -> Self {
        self.roles.push((role, credential, dashboard_path.into()));
        self
    }

    /// Builds the HarnessConfig
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the base URL does not parse, the
    /// login route pattern is not a valid regex, or no role was registered.
    pub fn build(self) -> Result<HarnessConfig> {
        let base_url = Url::parse(&self.base_url)
            .map_err(|err| Error::InvalidArgument(format!("invalid base URL: {err}")))?;

        if self.roles.is_empty() {
            return Err(Error::InvalidArgument(
                "at least one role must be configured".into(),
            ));
        }

        let pattern = self
            .login_route_pattern
            .unwrap_or_else(|| format!(r"{}([/?#]|$)", regex::escape(&self.login_path)));
        let login_route = Regex::new(&pattern)
            .map_err(|err| Error::InvalidArgument(format!("invalid login route pattern: {err}")))?;

        let session_dir = self.session_dir;
        let roles = self
            .roles
            .into_iter()
            .map(|(role, credential, dashboard_path)| {
                let session_file = session_dir.join(format!("{role}.json"));
                (
                    role,
                    RoleConfig {
                        credential,
                        dashboard_path,
                        session_file,
                    },
                )
            })
            .collect();

        Ok(HarnessConfig {
            base_url,
            auth_path: self.auth_path,
            login_path: self.login_path,
            login_route,
            selectors: self.selectors,
            roles,
        })
    }
}
