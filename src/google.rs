//! Google OAuth 2.0 sign-in (authorization code flow).
//!
//! 1. `authorize_url` sends the browser to Google's consent page with a
//!    random CSRF `state` that the caller keeps in the session.
//! 2. On callback, `fetch_profile` exchanges the code for an access token
//!    and reads the userinfo profile (`sub` and display name).

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use crate::config::GoogleSettings;
use crate::error::{AppError, AppResult};

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const SCOPE: &str = "profile";

/// Where the three legs of the flow live. Tests point these at a mock.
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        GoogleEndpoints {
            authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_owned(),
            token_url: "https://oauth2.googleapis.com/token".to_owned(),
            userinfo_url: "https://www.googleapis.com/oauth2/v3/userinfo".to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GoogleOAuth {
    http: reqwest::Client,
    client_id: String,
    client_secret: SecretString,
    callback_url: String,
    endpoints: GoogleEndpoints,
}

/// The userinfo fields we use.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    pub sub: String,
    pub name: Option<String>,
}

impl GoogleProfile {
    /// Username for a new account; falls back to the subject id when the
    /// profile has no name.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.sub,
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

/// Random hex string for the OAuth `state` parameter.
pub fn generate_state() -> String {
    let random_bytes: [u8; 32] = rand::random();
    hex::encode(random_bytes)
}

fn oauth_failure(step: &str, err: reqwest::Error) -> AppError {
    log::warn!("Google OAuth: {} failed: {}", step, err);
    AppError::OAuth(format!("{} failed", step))
}

impl GoogleOAuth {
    pub fn new(settings: &GoogleSettings, endpoints: GoogleEndpoints) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()?;
        Ok(GoogleOAuth {
            http,
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            callback_url: settings.callback_url.clone(),
            endpoints,
        })
    }

    /// URL of Google's consent page for this client.
    pub fn authorize_url(&self, state: &str) -> AppResult<String> {
        let url = reqwest::Url::parse_with_params(
            &self.endpoints.authorize_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.callback_url.as_str()),
                ("response_type", "code"),
                ("scope", SCOPE),
                ("state", state),
            ],
        )
        .map_err(|err| AppError::OAuth(format!("bad authorize URL: {}", err)))?;
        Ok(url.into())
    }

    /// Exchanges an authorization code for the signed-in user's profile.
    pub async fn fetch_profile(&self, code: &str) -> AppResult<GoogleProfile> {
        let token: TokenResponse = self
            .http
            .post(&self.endpoints.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret()),
                ("redirect_uri", self.callback_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| oauth_failure("code exchange", err))?
            .json()
            .await
            .map_err(|err| oauth_failure("reading token response", err))?;

        if let Some(err) = &token.error {
            log::warn!("Google OAuth: token endpoint returned error: {}", err);
            return Err(AppError::OAuth("code exchange rejected".to_owned()));
        }
        let access_token = token.access_token.map(SecretString::from).ok_or_else(|| {
            log::warn!("Google OAuth: no access_token in response");
            AppError::OAuth("code exchange rejected".to_owned())
        })?;

        self.http
            .get(&self.endpoints.userinfo_url)
            .bearer_auth(access_token.expose_secret())
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| oauth_failure("userinfo request", err))?
            .json()
            .await
            .map_err(|err| oauth_failure("reading userinfo", err))
    }
}
