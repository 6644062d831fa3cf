//! Shared helpers for integration tests

#![allow(dead_code)]

use pacc_chat::config::{ApiConfig, MessagesConfig};
use pacc_chat::directive::LinkOpener;
use std::sync::{Arc, Mutex};

/// Fixed "now" used by tests that pin the clock
pub const NOW: i64 = 1_700_000_000_000;

/// API configuration pointing at a mock server
///
/// `base` is the mock server URI; the API is mounted under `/api` like the
/// real deployment.
pub fn api_config(base: &str) -> ApiConfig {
    ApiConfig {
        url: format!("{}/api", base),
        ecliente_url: "https://ecliente.example.com".to_string(),
        empresa: "pacc".to_string(),
        device: "terminal".to_string(),
        timeout_seconds: 5,
    }
}

/// Default user-facing messages
pub fn messages() -> MessagesConfig {
    MessagesConfig::default()
}

/// Link opener that records every URL instead of launching a browser
#[derive(Clone, Default)]
pub struct RecordingOpener {
    pub opened: Arc<Mutex<Vec<String>>>,
}

impl RecordingOpener {
    pub fn urls(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl LinkOpener for RecordingOpener {
    fn open(&self, url: &str) -> pacc_chat::Result<()> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }
}
