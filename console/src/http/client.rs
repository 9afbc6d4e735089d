//! HTTP client implementation

use std::time::Duration;

use openapi_client::models::{ErrorResponse, LoginRequest, LoginResponse};
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::errors::ConsoleError;

/// HTTP client for the dockrune admin API
pub struct HttpClient {
    client: Client,
    base: Url,
    base_url: String,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConsoleError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dockrune-console/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let base_url = base_url.trim_end_matches('/').to_string();
        let base = Url::parse(&base_url)?;
        if base.cannot_be_a_base() {
            return Err(ConsoleError::ConfigError(format!(
                "Invalid API base URL: {}",
                base_url
            )));
        }

        Ok(Self {
            client,
            base,
            base_url,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve path segments against the base URL
    ///
    /// Each segment is percent-encoded, so an ID never escapes its slot.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ConsoleError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ConsoleError::ConfigError(format!("Invalid API base URL: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(request: RequestBuilder, token: Option<&SecretString>) -> RequestBuilder {
        match token {
            Some(token) => request.header(
                header::AUTHORIZATION,
                format!("Bearer {}", token.expose_secret()),
            ),
            None => request,
        }
    }

    /// Make a GET request and decode a JSON body
    pub async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        token: Option<&SecretString>,
    ) -> Result<T, ConsoleError> {
        let url = self.endpoint(segments)?;
        debug!("GET {}", url);

        let request = Self::authorize(self.client.get(url), token);
        let response = check_status("GET", request.send().await?).await?;

        let body = response.json().await?;
        Ok(body)
    }

    /// Make a GET request and return the body as plain text
    pub async fn get_text(
        &self,
        segments: &[&str],
        token: Option<&SecretString>,
    ) -> Result<String, ConsoleError> {
        let url = self.endpoint(segments)?;
        debug!("GET {} (text)", url);

        let request = Self::authorize(self.client.get(url), token)
            .header(header::ACCEPT, "text/plain");
        let response = check_status("GET", request.send().await?).await?;

        Ok(response.text().await?)
    }

    /// Make a POST request and decode a JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        segments: &[&str],
        token: Option<&SecretString>,
        body: Option<&B>,
    ) -> Result<T, ConsoleError> {
        let response = self.send_post(segments, token, body).await?;
        let body = response.json().await?;
        Ok(body)
    }

    /// Make a POST request and discard whatever the server answers
    pub async fn post_no_content<B: Serialize>(
        &self,
        segments: &[&str],
        token: Option<&SecretString>,
        body: Option<&B>,
    ) -> Result<(), ConsoleError> {
        self.send_post(segments, token, body).await?;
        Ok(())
    }

    async fn send_post<B: Serialize>(
        &self,
        segments: &[&str],
        token: Option<&SecretString>,
        body: Option<&B>,
    ) -> Result<Response, ConsoleError> {
        let url = self.endpoint(segments)?;
        debug!("POST {}", url);

        let mut request = Self::authorize(self.client.post(url), token);
        if let Some(body) = body {
            request = request.json(body);
        }

        check_status("POST", request.send().await?).await
    }

    /// Exchange operator credentials for a bearer token
    ///
    /// Any rejection is reported as [`ConsoleError::AuthError`] carrying the
    /// server's `error` message, or `"Login failed"` when it sent none.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<SecretString, ConsoleError> {
        let url = self.endpoint(&["admin", "login"])?;
        debug!("POST {} (login as {})", url, username);

        let body = LoginRequest {
            username: username.to_string(),
            password: password.expose_secret().to_string(),
        };

        let response = self.client.post(url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Login failed: {} - {}", status, body);
            let reason = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.reason().map(str::to_string))
                .unwrap_or_else(|| LOGIN_FAILED.to_string());
            return Err(ConsoleError::AuthError(reason));
        }

        let body: LoginResponse = response.json().await?;
        if body.token.is_empty() {
            return Err(ConsoleError::AuthError(LOGIN_FAILED.to_string()));
        }
        Ok(SecretString::from(body.token))
    }
}

/// Message shown when a login fails without a server explanation
pub const LOGIN_FAILED: &str = "Login failed";

async fn check_status(method: &str, response: Response) -> Result<Response, ConsoleError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    error!("HTTP {} {} failed: {} - {}", method, url, status, body);
    Err(error_from_status(status, &body))
}

/// Map a non-success status and its body onto the error taxonomy
pub fn error_from_status(status: StatusCode, body: &str) -> ConsoleError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|e| e.reason().map(str::to_string))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ConsoleError::AuthError(message),
        StatusCode::NOT_FOUND => ConsoleError::NotFound(message),
        _ => ConsoleError::ApiError {
            status: status.as_u16(),
            message,
        },
    }
}
