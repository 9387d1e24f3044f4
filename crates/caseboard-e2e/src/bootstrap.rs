// Session bootstrapper
//
// Orchestrates session reuse for one role: load the persisted session,
// inject it, navigate, and fall back to the UI login form when the app
// bounces the stale session back to the login route.

use crate::auth::{AuthSession, Authenticator};
use crate::config::{HarnessConfig, Role};
use crate::driver::{GotoOptions, PageDriver, WaitUntil};
use crate::error::{Error, Result};
use crate::inject::{SessionSeed, UserProfile};
use crate::storage::SessionStore;
use std::time::Duration;

/// Default bound for navigation waits, matching Playwright's standard default.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound for the post-submit redirect wait during UI login.
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(15);

const LOGIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How a bootstrap run reached an authenticated page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The injected session was accepted; no login form was touched.
    Verified { final_url: String },
    /// The session was absent or rejected and the UI login fallback ran.
    LoginSucceeded { final_url: String },
}

impl BootstrapOutcome {
    /// URL the run ended on.
    pub fn final_url(&self) -> &str {
        match self {
            BootstrapOutcome::Verified { final_url } => final_url,
            BootstrapOutcome::LoginSucceeded { final_url } => final_url,
        }
    }

    /// True when the fresh-login fallback was taken.
    pub fn used_fallback(&self) -> bool {
        matches!(self, BootstrapOutcome::LoginSucceeded { .. })
    }
}

/// Bootstrap progress, logged at every transition.
///
/// `Verified` and `LoginSucceeded` are the success terminals; a failed UI
/// login has no state of its own, the underlying error propagates instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    NoSession,
    SessionInjected,
    Verified,
    Rejected,
    FreshLoginInProgress,
    LoginSucceeded,
}

fn transition(state: &mut State, next: State) {
    tracing::debug!(from = ?state, to = ?next, "bootstrap transition");
    *state = next;
}

type VerifyFn = dyn Fn(&str) -> Result<()> + Send + Sync;

/// Drives one role's session bootstrap against a page driver.
///
/// Holds no process-wide state: each test constructs its own bootstrapper
/// from the shared config, so parallel workers cannot interfere through a
/// shared token cache.
pub struct Bootstrapper<'a> {
    config: &'a HarnessConfig,
    role: Role,
    store: SessionStore,
    persist_on_login: bool,
    navigation_timeout: Duration,
    login_timeout: Duration,
    verify: Option<Box<VerifyFn>>,
}

impl<'a> Bootstrapper<'a> {
    /// Creates a bootstrapper for the role, storing sessions at the role's
    /// configured session file.
    pub fn new(config: &'a HarnessConfig, role: Role) -> Result<Self> {
        let session_file = config.role(role)?.session_file.clone();
        Ok(Self {
            config,
            role,
            store: SessionStore::new(session_file),
            persist_on_login: false,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            login_timeout: DEFAULT_LOGIN_TIMEOUT,
            verify: None,
        })
    }

    /// Re-persists the session file after a successful fallback login.
    ///
    /// This is how the session file gets produced in the first place; later
    /// runs then skip the login form.
    pub fn persist_on_login(mut self, persist: bool) -> Self {
        self.persist_on_login = persist;
        self
    }

    /// Sets the bound for navigation waits.
    pub fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Sets the bound for the post-submit redirect wait.
    pub fn login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    /// Verification callback invoked with the final URL on both success
    /// terminals. Its error propagates unchanged; the bootstrapper never
    /// swallows a failed verification.
    pub fn verify(mut self, verify: impl Fn(&str) -> Result<()> + Send + Sync + 'static) -> Self {
        self.verify = Some(Box::new(verify));
        self
    }

    /// Session store this bootstrapper reads and writes.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Runs the bootstrap state machine.
    ///
    /// Terminals: [`BootstrapOutcome::Verified`] when the injected session
    /// was accepted, [`BootstrapOutcome::LoginSucceeded`] when the UI login
    /// fallback ran and landed on the requested route. Authentication,
    /// navigation, and timeout errors propagate to the caller; only the
    /// "no usable session file" condition is downgraded to the fallback path.
    pub async fn run<D: PageDriver + ?Sized>(&self, driver: &D) -> Result<BootstrapOutcome> {
        let target = self.config.dashboard_url(self.role)?;
        let mut state = State::NoSession;
        let mut seeded = false;

        if let Some(session) = self.store.load().await {
            // load() validated the token, so a first origin exists.
            if let Some(origin) = session.first_origin() {
                SessionSeed::from_entries(origin.session_storage.clone(), Vec::new())
                    .apply(driver)
                    .await?;
                seeded = true;
                transition(&mut state, State::SessionInjected);
            }
        }

        self.navigate(driver, target.as_str()).await?;

        let landed_on = driver.url();
        if !self.config.is_login_url(&landed_on) {
            transition(&mut state, State::Verified);
            self.run_verify(&landed_on)?;
            return Ok(BootstrapOutcome::Verified {
                final_url: landed_on,
            });
        }

        transition(&mut state, State::Rejected);
        tracing::debug!(role = %self.role, url = %landed_on, "session rejected, falling back to UI login");

        transition(&mut state, State::FreshLoginInProgress);
        self.ui_login(driver).await?;
        transition(&mut state, State::LoginSucceeded);

        if seeded {
            // The stale seed keeps running on every later navigation, ahead
            // of app scripts. Registering the fresh session on top wins at
            // execution time (later registrations override the same keys).
            let snapshot = driver.evaluate(crate::storage::SESSION_SNAPSHOT_SCRIPT).await?;
            let entries = crate::storage::snapshot_entries(&snapshot);
            if !entries.is_empty() {
                SessionSeed::from_entries(entries, Vec::new())
                    .apply(driver)
                    .await?;
            }
        }

        // Back to the route the caller actually asked for.
        self.navigate(driver, target.as_str()).await?;

        if self.persist_on_login {
            self.store
                .capture(driver)
                .await
                .map_err(|err| err.context("persisting session after fallback login"))?;
        }

        let final_url = driver.url();
        self.run_verify(&final_url)?;
        Ok(BootstrapOutcome::LoginSucceeded { final_url })
    }

    /// Navigates waiting for network-idle, falling back to load-complete
    /// when the idle wait times out.
    async fn navigate<D: PageDriver + ?Sized>(&self, driver: &D, url: &str) -> Result<()> {
        let options = GotoOptions::new()
            .timeout(self.navigation_timeout)
            .wait_until(WaitUntil::NetworkIdle);
        match driver.goto(url, Some(options)).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_timeout() => {
                tracing::debug!(%url, "network-idle not reached, waiting for load instead");
                driver
                    .wait_for_load_state(WaitUntil::Load, self.navigation_timeout)
                    .await
            }
            Err(err) => Err(err),
        }
    }

    /// Fills the login form, submits, and waits for the redirect off the
    /// login route. No redirect within the login timeout is a hard failure.
    async fn ui_login<D: PageDriver + ?Sized>(&self, driver: &D) -> Result<()> {
        let selectors = self.config.selectors();
        let credential = &self.config.role(self.role)?.credential;

        driver.fill(&selectors.username, &credential.username).await?;
        driver.fill(&selectors.password, &credential.password).await?;
        driver.click(&selectors.submit).await?;

        let deadline = tokio::time::Instant::now() + self.login_timeout;
        loop {
            if !self.config.is_login_url(&driver.url()) {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(Error::Timeout(format!(
                    "still on login route {}ms after submitting credentials",
                    self.login_timeout.as_millis()
                )));
            }
            tokio::time::sleep(LOGIN_POLL_INTERVAL).await;
        }
    }

    fn run_verify(&self, final_url: &str) -> Result<()> {
        match &self.verify {
            Some(verify) => verify(final_url),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Bootstrapper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bootstrapper")
            .field("role", &self.role)
            .field("session_file", &self.store.path())
            .field("persist_on_login", &self.persist_on_login)
            .finish()
    }
}

/// Seeds an authenticated session without touching the login form.
///
/// Authenticates against the API endpoint, then registers an init script
/// carrying the token and profile. The API path is the canonical way to get
/// a token; the UI form only runs as the bootstrap fallback.
pub async fn seed_via_api<D: PageDriver + ?Sized>(
    config: &HarnessConfig,
    role: Role,
    driver: &D,
) -> Result<AuthSession> {
    let role_config = config.role(role)?;
    let authenticator = Authenticator::new(config.auth_endpoint()?);
    let session = authenticator.authenticate(&role_config.credential).await?;

    let username = session
        .username
        .clone()
        .unwrap_or_else(|| role_config.credential.username.clone());
    let role_name = session
        .roles
        .first()
        .cloned()
        .unwrap_or_else(|| role.as_str().to_string());

    SessionSeed::from_token(&session.token, &UserProfile::new(username, role_name))?
        .apply(driver)
        .await?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_accessors() {
        let verified = BootstrapOutcome::Verified {
            final_url: "https://caseboard.example/dashboard".into(),
        };
        assert!(!verified.used_fallback());
        assert_eq!(verified.final_url(), "https://caseboard.example/dashboard");

        let fallback = BootstrapOutcome::LoginSucceeded {
            final_url: "https://caseboard.example/dashboard".into(),
        };
        assert!(fallback.used_fallback());
    }

    #[test]
    fn transition_replaces_state() {
        let mut state = State::NoSession;
        transition(&mut state, State::SessionInjected);
        transition(&mut state, State::Rejected);
        assert_eq!(state, State::Rejected);
    }
}
