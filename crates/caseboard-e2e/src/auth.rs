// Remote authenticator
//
// One POST against the dashboard's auth endpoint, credentials in, bearer
// token out. No retries and no caching: callers own the returned session and
// decide what to do with it.

use crate::config::Credential;
use crate::error::{Error, Result};
use serde_json::Value;
use url::Url;

/// Token extraction paths, tried in order. The deployed API answers with
/// `data.token`; the fallbacks cover older gateway builds.
const TOKEN_PATHS: &[&[&str]] = &[
    &["data", "token"],
    &["token"],
    &["data", "jwt"],
    &["data", "accessToken"],
];

/// Result of a successful API authentication.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// Opaque bearer token for subsequent API calls
    pub token: String,
    /// Username echoed by the endpoint, when present
    pub username: Option<String>,
    /// Role list echoed by the endpoint, when present
    pub roles: Vec<String>,
}

/// Issues authentication requests against a fixed endpoint.
#[derive(Debug, Clone)]
pub struct Authenticator {
    client: reqwest::Client,
    endpoint: Url,
}

impl Authenticator {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    /// Reuses an existing reqwest client (connection pooling across tests).
    pub fn with_client(endpoint: Url, client: reqwest::Client) -> Self {
        Self { client, endpoint }
    }

    /// Exchanges the credential for a bearer token.
    ///
    /// # Errors
    ///
    /// - [`Error::AuthenticationFailed`] on any non-success HTTP status,
    ///   carrying the status code and response body text.
    /// - [`Error::AuthTokenMissing`] when the endpoint answers with success
    ///   but no token is found at any known path; the message lists the
    ///   top-level keys that were present.
    ///
    /// A failed attempt propagates immediately; there is no retry policy here.
    pub async fn authenticate(&self, credential: &Credential) -> Result<AuthSession> {
        tracing::debug!(endpoint = %self.endpoint, username = %credential.username, "authenticating");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&serde_json::json!({
                "username": credential.username,
                "password": credential.password,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::AuthenticationFailed {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        let (token, path) = extract_token(&body).ok_or_else(|| Error::AuthTokenMissing {
            keys: top_level_keys(&body),
        })?;
        tracing::debug!(path, "token extracted");

        Ok(AuthSession {
            token,
            username: string_at(&body, &["data", "username"])
                .or_else(|| string_at(&body, &["username"])),
            roles: roles_at(&body),
        })
    }
}

/// Tries each known token path in order; returns the token and the path that
/// matched (for logging). Empty strings do not count as tokens.
fn extract_token(body: &Value) -> Option<(String, String)> {
    TOKEN_PATHS.iter().find_map(|path| {
        let value = path
            .iter()
            .try_fold(body, |value, segment| value.get(segment))?;
        let token = value.as_str().filter(|token| !token.is_empty())?;
        Some((token.to_string(), path.join(".")))
    })
}

/// Top-level keys of the response body, for the missing-token diagnostic.
fn top_level_keys(body: &Value) -> Vec<String> {
    match body.as_object() {
        Some(map) => map.keys().cloned().collect(),
        None => vec![format!("<non-object: {body}>")],
    }
}

fn string_at(body: &Value, path: &[&str]) -> Option<String> {
    path.iter()
        .try_fold(body, |value, segment| value.get(segment))?
        .as_str()
        .map(str::to_string)
}

fn roles_at(body: &Value) -> Vec<String> {
    let roles = body
        .get("data")
        .and_then(|data| data.get("roles"))
        .or_else(|| body.get("roles"));
    match roles.and_then(Value::as_array) {
        Some(values) => values
            .iter()
            .filter_map(|value| value.as_str().map(str::to_string))
            .collect(),
        None => Vec::new(),
    }
}
