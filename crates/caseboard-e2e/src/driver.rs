// Driver seam between the bootstrap logic and a browser automation client.
//
// The bootstrapper never talks to a browser directly; it drives whatever
// implements `PageDriver`. Production suites back this with a Playwright
// page/context pair, tests back it with a scripted in-memory page.

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::storage::SessionState;

/// When to consider navigation succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// Consider operation to be finished when the `load` event is fired
    Load,
    /// Consider operation to be finished when the `DOMContentLoaded` event is fired
    DomContentLoaded,
    /// Consider operation to be finished when there are no network connections for at least 500ms
    NetworkIdle,
}

impl WaitUntil {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            WaitUntil::Load => "load",
            WaitUntil::DomContentLoaded => "domcontentloaded",
            WaitUntil::NetworkIdle => "networkidle",
        }
    }
}

impl std::fmt::Display for WaitUntil {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for `PageDriver::goto`
#[derive(Debug, Clone)]
pub struct GotoOptions {
    /// Maximum operation time
    pub timeout: Option<Duration>,
    /// When to consider operation succeeded
    pub wait_until: Option<WaitUntil>,
}

impl GotoOptions {
    /// Creates new GotoOptions with default values
    pub fn new() -> Self {
        Self {
            timeout: None,
            wait_until: None,
        }
    }

    /// Sets the timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the wait_until option
    pub fn wait_until(mut self, wait_until: WaitUntil) -> Self {
        self.wait_until = Some(wait_until);
        self
    }
}

impl Default for GotoOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// The browser-page surface consumed by session bootstrap.
///
/// Implementations wrap one page plus the context it lives in. Every method
/// that waits carries a bounded timeout (either explicit or the
/// implementation's navigation default); a timeout surfaces as
/// [`crate::Error::Timeout`] or [`crate::Error::NavigationTimeout`] and is
/// never retried here.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Registers a script evaluated on every subsequent navigation, after the
    /// document is created but before any of its own scripts run.
    ///
    /// This ordering is what makes pre-authenticated storage injection work:
    /// the app's first synchronous script already sees the injected values.
    async fn add_init_script(&self, source: &str) -> Result<()>;

    /// Navigates to the URL and waits per `options` (load by default).
    async fn goto(&self, url: &str, options: Option<GotoOptions>) -> Result<()>;

    /// Returns the last committed URL of the page.
    fn url(&self) -> String;

    /// Waits until the page reaches the given load state or the timeout elapses.
    async fn wait_for_load_state(&self, state: WaitUntil, timeout: Duration) -> Result<()>;

    /// Evaluates a JavaScript expression in the page and returns its JSON value.
    async fn evaluate(&self, expression: &str) -> Result<Value>;

    /// Fills the first element matching the selector with the value.
    async fn fill(&self, selector: &str, value: &str) -> Result<()>;

    /// Clicks the first element matching the selector.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Captures the context's storage state (cookies + localStorage).
    ///
    /// Mirrors Playwright's `storageState`: session storage is NOT included
    /// in the capture. [`crate::storage::SessionStore::capture`] fills that
    /// gap with a separate page-side snapshot.
    async fn storage_state(&self) -> Result<SessionState>;
}
