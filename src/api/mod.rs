//! Chat API access
//!
//! The remote API exposes two calls: `/get-token` exchanges a NIF and a
//! mobile number for a bearer token, `/consulta` answers a free-text query.
//! [`ChatBackend`] is the seam the dispatcher talks to; [`ApiClient`] is the
//! HTTP implementation.
//!
//! Every call makes exactly one attempt and ends in exactly one of three
//! outcomes: a value, a [`DispatchError::Application`] carrying the server's
//! message (or a fallback), or a [`DispatchError::Transport`].

use crate::error::DispatchError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

pub mod client;

pub use client::ApiClient;

/// Path of the authentication endpoint, relative to the API base URL
pub const TOKEN_PATH: &str = "get-token";

/// Path of the chat endpoint, relative to the API base URL
pub const QUERY_PATH: &str = "consulta";

/// Header carrying the tenant tag
pub const TENANT_HEADER: &str = "Empresa";

/// Header carrying the device tag
pub const DEVICE_HEADER: &str = "Device";

/// Remote operations needed by the chat front end
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Exchanges credentials for an access token
    ///
    /// `nif` and `movil` are sent as given; normalisation is the caller's job.
    async fn authenticate(&self, nif: &str, movil: &str) -> Result<String, DispatchError>;

    /// Sends a chat query and returns the bot's reply (HTML)
    async fn query(&self, text: &str, token: &str) -> Result<String, DispatchError>;
}

/// Body of `POST /get-token`
#[derive(Debug, Clone, Serialize)]
pub struct TokenRequest<'a> {
    /// Tax identifier
    pub nif: &'a str,
    /// Mobile phone number
    pub movil: &'a str,
}

/// Body of `POST /consulta`
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest<'a> {
    /// User's message
    pub consulta: &'a str,
}

/// Reads a non-empty field out of a JSON response body
///
/// Non-string values are rendered as JSON text; `null`, empty strings and
/// missing keys count as absent.
pub(crate) fn response_field(payload: &Value, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(false) => None,
        other => Some(other.to_string()),
    }
}

/// Turns a decoded response into the call's outcome
///
/// Success requires a 2xx status and a non-empty `success_key`; otherwise the
/// server's `error` text (or `fallback`) becomes an application error.
pub(crate) fn interpret_response(
    ok: bool,
    payload: &Value,
    success_key: &str,
    fallback: &str,
) -> Result<String, DispatchError> {
    if ok {
        if let Some(value) = response_field(payload, success_key) {
            return Ok(value);
        }
    }

    let message = response_field(payload, "error").unwrap_or_else(|| fallback.to_string());
    Err(DispatchError::Application(message))
}
