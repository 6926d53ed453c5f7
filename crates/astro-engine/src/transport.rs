use std::error::Error as StdError;
use std::fmt;

use indexmap::IndexMap;
use reqwest::blocking::multipart::{Form as MultipartForm, Part as MultipartPart};
use reqwest::blocking::Client as HttpClient;

use crate::config::ServiceConfig;

const MAX_ERROR_CHARS: usize = 512;

/// Status and body text of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReply {
    pub status: u16,
    pub body: String,
}

impl ServiceReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// One file part plus ordered text fields.
#[derive(Debug, Clone, PartialEq)]
pub struct MultipartPayload {
    pub fields: IndexMap<String, String>,
    pub file_field: String,
    pub file_name: String,
    pub content_type: String,
    pub file_bytes: Vec<u8>,
}

/// The request never produced an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub message: String,
    pub timed_out: bool,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: true,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.timed_out {
            write!(f, "request timed out ({})", self.message)
        } else {
            f.write_str(&self.message)
        }
    }
}

impl StdError for TransportError {}

/// How the clients reach the enhancement service.
pub trait ServiceTransport {
    fn name(&self) -> &str;
    fn get(&self, path: &str) -> Result<ServiceReply, TransportError>;
    fn post_multipart(
        &self,
        path: &str,
        payload: &MultipartPayload,
    ) -> Result<ServiceReply, TransportError>;
}

/// Blocking reqwest transport against `ServiceConfig::api_base`.
pub struct HttpTransport {
    config: ServiceConfig,
    http: HttpClient,
}

impl HttpTransport {
    pub fn new(config: ServiceConfig) -> anyhow::Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { config, http })
    }

    fn read_reply(
        response: reqwest::blocking::Response,
    ) -> Result<ServiceReply, TransportError> {
        let status = response.status().as_u16();
        let body = response.text().map_err(transport_error)?;
        Ok(ServiceReply { status, body })
    }
}

impl ServiceTransport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    fn get(&self, path: &str) -> Result<ServiceReply, TransportError> {
        let endpoint = self.config.endpoint(path);
        let response = self
            .http
            .get(&endpoint)
            .send()
            .map_err(transport_error)?;
        Self::read_reply(response)
    }

    fn post_multipart(
        &self,
        path: &str,
        payload: &MultipartPayload,
    ) -> Result<ServiceReply, TransportError> {
        let endpoint = self.config.endpoint(path);
        let mut form = MultipartForm::new();
        for (key, value) in &payload.fields {
            form = form.text(key.clone(), value.clone());
        }
        let part = MultipartPart::bytes(payload.file_bytes.clone())
            .file_name(payload.file_name.clone())
            .mime_str(&payload.content_type)
            .map_err(transport_error)?;
        form = form.part(payload.file_field.clone(), part);

        let response = self
            .http
            .post(&endpoint)
            .multipart(form)
            .send()
            .map_err(transport_error)?;
        Self::read_reply(response)
    }
}

fn transport_error(err: reqwest::Error) -> TransportError {
    let message = error_chain_text(&err, MAX_ERROR_CHARS);
    if err.is_timeout() {
        TransportError::timeout(message)
    } else {
        TransportError::new(message)
    }
}

fn error_chain_text(err: &(dyn StdError + 'static), max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(cause) = current {
        let text = cause.to_string();
        let trimmed = text.trim();
        if !trimmed.is_empty()
            && !parts
                .last()
                .map(|existing| existing == trimmed)
                .unwrap_or(false)
        {
            parts.push(trimmed.to_string());
        }
        current = cause.source();
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
