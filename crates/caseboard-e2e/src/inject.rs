// Storage injector
//
// Turns a token + profile (or a persisted session's entries) into an
// init script that seeds sessionStorage/localStorage before any document
// script runs, so the app renders as already-authenticated on first paint.

use crate::driver::PageDriver;
use crate::error::{Error, Result};
use crate::storage::{AUTH_TOKEN_KEY, StorageItem, USER_DATA_KEY};

/// Minimal user profile the dashboard reads from `sessionStorage["userData"]`.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub username: String,
    pub role: String,
}

impl UserProfile {
    pub fn new(username: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            role: role.into(),
        }
    }
}

/// Default localStorage preference keys the app expects on first load.
///
/// Values match a fresh account; override via [`SessionSeed::local_item`].
const DEFAULT_PREFERENCES: &[(&str, &str)] = &[("uiTheme", "light"), ("uiLanguage", "en")];

/// Storage entries to seed into a fresh browser context.
///
/// Built either from an API auth result ([`SessionSeed::from_token`]) or from
/// a persisted session's entries ([`SessionSeed::from_entries`]), then applied
/// to a driver with [`SessionSeed::apply`].
#[derive(Debug, Clone)]
pub struct SessionSeed {
    session: Vec<StorageItem>,
    local: Vec<StorageItem>,
}

impl SessionSeed {
    /// Seeds the token and profile under the keys the dashboard reads.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the token is empty.
    pub fn from_token(token: &str, profile: &UserProfile) -> Result<Self> {
        if token.is_empty() {
            return Err(Error::InvalidArgument(
                "cannot seed a session with an empty token".into(),
            ));
        }

        let user_data = serde_json::json!({
            "username": profile.username,
            "role": profile.role,
        });

        let local = DEFAULT_PREFERENCES
            .iter()
            .map(|(name, value)| StorageItem::new(*name, *value))
            .collect();

        Ok(Self {
            session: vec![
                StorageItem::new(AUTH_TOKEN_KEY, token),
                StorageItem::new(USER_DATA_KEY, user_data.to_string()),
            ],
            local,
        })
    }

    /// Seeds exactly the given entries, e.g. from a persisted session file.
    pub fn from_entries(session: Vec<StorageItem>, local: Vec<StorageItem>) -> Self {
        Self { session, local }
    }

    /// Adds or overrides a sessionStorage entry.
    pub fn session_item(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        upsert(&mut self.session, name.into(), value.into());
        self
    }

    /// Adds or overrides a localStorage entry.
    pub fn local_item(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        upsert(&mut self.local, name.into(), value.into());
        self
    }

    /// sessionStorage entries this seed will write.
    pub fn session_entries(&self) -> &[StorageItem] {
        &self.session
    }

    /// Renders the init-script source.
    ///
    /// Keys and values are JSON-escaped into string literals; the same seed
    /// always renders the same script, and re-running it writes the same
    /// values to the same keys.
    pub fn init_script(&self) -> String {
        let mut script = String::from("(() => {\n");
        for item in &self.session {
            script.push_str(&format!(
                "  sessionStorage.setItem({}, {});\n",
                js_string(&item.name),
                js_string(&item.value)
            ));
        }
        for item in &self.local {
            script.push_str(&format!(
                "  localStorage.setItem({}, {});\n",
                js_string(&item.name),
                js_string(&item.value)
            ));
        }
        script.push_str("})();");
        script
    }

    /// Registers the init script on the driver.
    ///
    /// Must be called before the navigation whose first paint should see the
    /// injected values; the driver guarantees the script runs ahead of any
    /// document script.
    pub async fn apply<D: PageDriver + ?Sized>(&self, driver: &D) -> Result<()> {
        tracing::debug!(
            session_entries = self.session.len(),
            local_entries = self.local.len(),
            "registering storage init script"
        );
        driver.add_init_script(&self.init_script()).await
    }
}

fn upsert(items: &mut Vec<StorageItem>, name: String, value: String) {
    match items.iter_mut().find(|item| item.name == name) {
        Some(item) => item.value = value,
        None => items.push(StorageItem { name, value }),
    }
}

/// JSON string literal, which is also a valid JS string literal.
fn js_string(raw: &str) -> String {
    serde_json::to_string(raw).expect("strings always serialize")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_is_rejected() {
        let profile = UserProfile::new("ncrp_demo", "analyst");
        let err = SessionSeed::from_token("", &profile).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn script_writes_token_and_profile() {
        let profile = UserProfile::new("ncrp_demo", "analyst");
        let seed = SessionSeed::from_token("abc123", &profile).unwrap();
        let script = seed.init_script();

        assert!(script.contains(r#"sessionStorage.setItem("authToken", "abc123");"#));
        assert!(script.contains(r#"sessionStorage.setItem("userData", "#));
        assert!(script.contains(r#"\"username\":\"ncrp_demo\""#));
        assert!(script.contains(r#"localStorage.setItem("uiTheme", "light");"#));
        assert!(script.contains(r#"localStorage.setItem("uiLanguage", "en");"#));
    }

    #[test]
    fn values_are_escaped_into_the_script() {
        let seed = SessionSeed::from_entries(
            vec![StorageItem::new("authToken", "ey\"quote</script>")],
            vec![],
        );
        let script = seed.init_script();
        assert!(script.contains(r#"sessionStorage.setItem("authToken", "ey\"quote</script>");"#));
    }

    #[test]
    fn overrides_replace_defaults() {
        let profile = UserProfile::new("ncrp_demo", "analyst");
        let seed = SessionSeed::from_token("abc123", &profile)
            .unwrap()
            .local_item("uiTheme", "dark")
            .session_item("authToken", "later-token");
        let script = seed.init_script();

        assert!(script.contains(r#"localStorage.setItem("uiTheme", "dark");"#));
        assert!(!script.contains(r#""light""#));
        assert!(script.contains(r#"sessionStorage.setItem("authToken", "later-token");"#));
        assert!(!script.contains("abc123"));
    }

    #[test]
    fn same_seed_renders_same_script() {
        let profile = UserProfile::new("ncrp_demo", "analyst");
        let first = SessionSeed::from_token("abc123", &profile).unwrap();
        let second = SessionSeed::from_token("abc123", &profile).unwrap();
        assert_eq!(first.init_script(), second.init_script());
    }
}
