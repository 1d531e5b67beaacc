//! GitHub OAuth web flow for the front-end popup.
//!
//! The front-end opens GitHub's authorize page with the client id from
//! `/oauth`; GitHub redirects the popup to `/oauth/callback`, where the code
//! is exchanged for a user token and handed back through `window.opener`.

use crate::config::RelayConfig;
use crate::error::AppError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Handshake descriptor returned by `GET /oauth`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthSession {
    pub id: String,
    pub client_id: String,
}

/// Message posted to the opener window.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CallbackMessage<'a> {
    success: bool,
    access_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// The token endpoint answers 200 for both outcomes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokenResponse {
    Success(AccessTokenResponse),
    Error(TokenErrorResponse),
}

#[derive(Debug, Clone)]
pub struct OAuthClient {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl OAuthClient {
    pub fn new(config: &RelayConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(concat!("org-relay/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            token_url: format!(
                "{}/login/oauth/access_token",
                config.oauth_url.trim_end_matches('/')
            ),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }

    /// Start a login: a fresh handshake id plus the public client id.
    pub fn new_session(&self) -> OAuthSession {
        OAuthSession {
            id: uuid::Uuid::new_v4().to_string(),
            client_id: self.client_id.clone(),
        }
    }

    /// Exchange an authorization code for a user access token.
    pub async fn exchange_code(&self, code: &str, state: Option<&str>) -> Result<String, AppError> {
        let mut form = vec![
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
        ];
        if let Some(state) = state {
            form.push(("state", state));
        }

        let response = self
            .client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::github_api_full(
                format!("Token exchange failed: {}", text),
                status.as_u16(),
                "/login/oauth/access_token",
            ));
        }

        match response.json::<TokenResponse>().await? {
            TokenResponse::Success(token) => Ok(token.access_token),
            TokenResponse::Error(err) => Err(AppError::github_api(
                err.error_description.unwrap_or(err.error),
            )),
        }
    }
}

/// Popup page that posts the outcome to the opener and closes itself.
pub fn render_callback_page(access_token: Option<&str>) -> String {
    let message = CallbackMessage {
        success: access_token.is_some(),
        access_token,
    };
    // postMessage receives the JSON text; escape '<' so a token can never
    // close the script element.
    let payload = serde_json::to_string(&serde_json::to_string(&message).unwrap_or_default())
        .unwrap_or_else(|_| "\"{}\"".to_string())
        .replace('<', "\\u003c");

    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <script>
      window.opener && window.opener.postMessage({payload}, '*')
      window.close()
    </script>
  </head>
  <body>
    <span style="padding: 2rem; font-size: 18px;">
      This page should close in a few seconds.
    </span>
  </body>
</html>"#
    )
}
