//! caseboard-e2e: session bootstrap for Caseboard dashboard end-to-end tests
//!
//! This crate owns the session/authentication layer of the e2e suite:
//! credentials and routes per role, API token acquisition, pre-navigation
//! storage injection, the persisted-session JSON store, and the bootstrap
//! state machine that falls back to the UI login form when a reused session
//! is rejected. Browser automation stays behind the [`PageDriver`] trait,
//! which production suites back with a Playwright page.
//!
//! # Examples
//!
//! ## Reuse a persisted session, fall back to UI login
//!
//! ```ignore
//! use caseboard_e2e::{Bootstrapper, Credential, HarnessConfig, Role};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HarnessConfig::builder("https://caseboard.example")
//!         .role(
//!             Role::Analyst,
//!             Credential::new("ncrp_demo", "ncrp_demo"),
//!             "/dashboard",
//!         )
//!         .build()?;
//!
//!     // `page` is anything implementing PageDriver, e.g. a Playwright page.
//!     let outcome = Bootstrapper::new(&config, Role::Analyst)?
//!         .persist_on_login(true)
//!         .verify(|url| {
//!             assert!(url.ends_with("/dashboard"));
//!             Ok(())
//!         })
//!         .run(&page)
//!         .await?;
//!
//!     // First run logs in through the form and writes .auth/analyst.json;
//!     // later runs inject the stored session and skip the form.
//!     assert!(outcome.final_url().ends_with("/dashboard"));
//!     Ok(())
//! }
//! ```
//!
//! ## Seed a session straight from the auth API
//!
//! ```ignore
//! use caseboard_e2e::{seed_via_api, Role};
//!
//! // Skips the login form entirely: POST credentials, inject the token and
//! // profile into storage, then navigate.
//! let session = seed_via_api(&config, Role::Analyst, &page).await?;
//! page.goto("https://caseboard.example/dashboard", None).await?;
//! assert!(!session.token.is_empty());
//! ```

mod auth;
mod bootstrap;
mod config;
mod driver;
mod error;
mod inject;
mod storage;

// Re-export error types
pub use error::{Error, Result};

// Re-export configuration types
pub use config::{Credential, HarnessConfig, HarnessConfigBuilder, LoginSelectors, Role, RoleConfig};

// Re-export the driver seam
pub use driver::{GotoOptions, PageDriver, WaitUntil};

// Re-export authentication API
pub use auth::{AuthSession, Authenticator};

// Re-export storage injection
pub use inject::{SessionSeed, UserProfile};

// Re-export the persisted session store
pub use storage::{
    AUTH_TOKEN_KEY, Cookie, OriginState, SessionState, SessionStore, StorageItem, USER_DATA_KEY,
};

// Re-export the bootstrapper
pub use bootstrap::{
    Bootstrapper, BootstrapOutcome, DEFAULT_LOGIN_TIMEOUT, DEFAULT_NAVIGATION_TIMEOUT, seed_via_api,
};
