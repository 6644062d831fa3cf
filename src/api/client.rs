//! HTTP implementation of [`ChatBackend`]

use crate::api::{
    interpret_response, ChatBackend, QueryRequest, TokenRequest, DEVICE_HEADER, QUERY_PATH,
    TENANT_HEADER, TOKEN_PATH,
};
use crate::config::{ApiConfig, MessagesConfig};
use crate::error::{DispatchError, PaccChatError, Result};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Client for the chat API
///
/// The tenant and device headers are attached to every request.
///
/// # Examples
///
/// ```
/// use pacc_chat::api::ApiClient;
/// use pacc_chat::config::{ApiConfig, MessagesConfig};
///
/// let client = ApiClient::new(&ApiConfig::default(), MessagesConfig::default());
/// assert!(client.is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    messages: MessagesConfig,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// # Errors
    ///
    /// Returns error if a header value is not valid HTTP or the HTTP client
    /// cannot be built
    pub fn new(config: &ApiConfig, messages: MessagesConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in [(TENANT_HEADER, &config.empresa), (DEVICE_HEADER, &config.device)] {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                PaccChatError::Config(format!("Invalid header name {}: {}", name, e))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                PaccChatError::Config(format!("Invalid {} header value: {}", name, e))
            })?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("pacc-chat/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| PaccChatError::Config(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized API client: url={}, empresa={}, device={}",
            config.url,
            config.empresa,
            config.device
        );

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            messages,
        })
    }

    /// Base URL the endpoints are resolved against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// POSTs `body` and decodes the JSON answer
    ///
    /// Returns the success flag with the decoded body. A send failure or a
    /// body that is not JSON maps to the transport error `connection_message`.
    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        bearer: Option<&str>,
        connection_message: &str,
    ) -> std::result::Result<(bool, Value), DispatchError> {
        let url = self.endpoint(path);
        let mut request = self.client.post(&url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        tracing::debug!("POST {}", url);
        let response = request.send().await.map_err(|e| {
            tracing::error!("Request to {} failed: {}", url, e);
            DispatchError::Transport(connection_message.to_string())
        })?;

        let status = response.status();
        let payload = response.json::<Value>().await.map_err(|e| {
            tracing::error!("Unreadable response from {} ({}): {}", url, status, e);
            DispatchError::Transport(connection_message.to_string())
        })?;

        tracing::debug!("POST {} -> {}", url, status);
        Ok((status.is_success(), payload))
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn authenticate(
        &self,
        nif: &str,
        movil: &str,
    ) -> std::result::Result<String, DispatchError> {
        let body = TokenRequest { nif, movil };
        let (ok, payload) = self
            .post_json(TOKEN_PATH, &body, None, &self.messages.auth_connection)
            .await?;

        let outcome = interpret_response(ok, &payload, "token", &self.messages.auth_failed);
        match &outcome {
            Ok(_) => tracing::info!("Authentication succeeded"),
            Err(e) => tracing::warn!("Authentication rejected: {}", e),
        }
        outcome
    }

    async fn query(&self, text: &str, token: &str) -> std::result::Result<String, DispatchError> {
        let body = QueryRequest { consulta: text };
        let (ok, payload) = self
            .post_json(QUERY_PATH, &body, Some(token), &self.messages.chat_connection)
            .await?;

        let outcome = interpret_response(ok, &payload, "message", &self.messages.chat_failed);
        if let Err(e) = &outcome {
            tracing::warn!("Chat query failed: {}", e);
        }
        outcome
    }
}
