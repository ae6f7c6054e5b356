//! HTTP requests and responses as plain data, plus status classification.
//!
//! # Design
//! The request builder produces `HttpRequest` values and the response shaper
//! consumes `HttpResponse` values without touching the network. Only a
//! `Transport` performs I/O, which keeps building and parsing deterministic
//! and lets tests substitute canned responses.
//!
//! `check_status` is the single place where HTTP statuses become typed
//! errors.

use serde_json::Value;

use crate::error::{Error, Result};

/// HTTP method for a request. The Explorer API only needs these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Absolute URL including any query string.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// First value of the header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Replace any existing `name` header with `value`.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Map a non-2xx response to the matching `Error` variant.
pub fn check_status(response: &HttpResponse, url: &str) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }
    match response.status {
        401 | 403 => Err(Error::Authentication {
            status: response.status,
            message: server_message(&response.body),
        }),
        404 => Err(Error::NotFound { url: url.to_string() }),
        status => Err(Error::Api {
            status,
            message: server_message(&response.body),
        }),
    }
}

/// Pull a human-readable message out of an error body. JSON bodies are
/// searched for the usual message keys, anything else is returned as text.
fn server_message(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return "no message".to_string();
    }
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error", "detail", "error_description"] {
            if let Some(Value::String(message)) = map.get(key) {
                return message.clone();
            }
        }
    }
    body.to_string()
}
