// Copyright (c) 2026 The Chainseal Developers

//! HTTP transport abstraction for backend requests
//!
//! [ApiHandle][crate::api::ApiHandle] is generic over [Transport] so the
//! backend can be replaced with a scripted transport in tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// Default request timeout for the production transport
const REQUEST_TIMEOUT_S: u64 = 30;

/// HTTP method subset used by the client
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Transport-level request
#[derive(Clone, Debug, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: vec![],
            body: None,
        }
    }

    /// Create a POST request with a body
    pub fn post(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: vec![],
            body: Some(body),
        }
    }

    /// Attach a header
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }
}

/// Transport-level response
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Whether the status code indicates success
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Response body as lossy text, for error reporting
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the response body as JSON
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TransportError {
    /// Request could not be performed
    #[error("request failed: {0}")]
    Request(String),

    /// Transport setup failed
    #[error("could not create http client: {0}")]
    Setup(String),
}

/// Exchange trait for HTTP transports
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a single HTTP exchange
    async fn exchange(&self, req: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Shared transports are transports too
#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn exchange(&self, req: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).exchange(req).await
    }
}

/// Production transport backed by [reqwest::Client]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with the default request timeout
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_S))
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn exchange(&self, req: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut r = match req.method {
            Method::Get => self.client.get(&req.url),
            Method::Post => self.client.post(&req.url),
        };

        for (name, value) in &req.headers {
            r = r.header(name, value);
        }

        if let Some(body) = req.body {
            r = r.body(body);
        }

        let resp = r
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?
            .to_vec();

        Ok(HttpResponse { status, body })
    }
}
