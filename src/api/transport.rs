use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;

use crate::utils::errors::BananasyncError;

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turns a non-2xx response into a transport error.
    pub fn error_for_status(self, url: &str) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(anyhow!(BananasyncError::transport(
                Some(self.status),
                format!("GET {} returned status {}", url, self.status)
            )))
        }
    }
}

/// The only network capability the sync engine needs.
///
/// Implementations report connection failures and timeouts as
/// [`BananasyncError::Transport`]; status codes are left to the caller.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse>;

    /// GET that fails on any non-2xx status.
    async fn get_ok(&self, url: &str) -> Result<HttpResponse> {
        self.get(url).await?.error_for_status(url)
    }

    /// Like [`get_ok`](Self::get_ok), but for file bodies of arbitrary size: the timeout
    /// bounds each wait for data instead of the whole transfer.
    async fn download(&self, url: &str) -> Result<HttpResponse> {
        self.get_ok(url).await
    }
}

pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(user_agent)?);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, timeout })
    }
}

fn send_error(url: &str, err: reqwest::Error) -> anyhow::Error {
    anyhow!(BananasyncError::transport(
        err.status().map(|s| s.as_u16()),
        format!("Failed to send request to {}: {}", url, err)
    ))
}

fn read_error(url: &str, status: u16, err: impl std::fmt::Display) -> anyhow::Error {
    anyhow!(BananasyncError::transport(
        Some(status),
        format!("Failed to read response body from {}: {}", url, err)
    ))
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| send_error(url, err))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|err| read_error(url, status, err))?;

        Ok(HttpResponse::new(status, body.to_vec()))
    }

    async fn download(&self, url: &str) -> Result<HttpResponse> {
        let mut response = tokio::time::timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| {
                anyhow!(BananasyncError::transport(
                    None,
                    format!("Timed out waiting for {}", url)
                ))
            })?
            .map_err(|err| send_error(url, err))?;

        let status = response.status().as_u16();
        let mut body = Vec::new();
        loop {
            let chunk = tokio::time::timeout(self.timeout, response.chunk())
                .await
                .map_err(|_| read_error(url, status, "no data received before the timeout"))?
                .map_err(|err| read_error(url, status, err))?;
            match chunk {
                Some(bytes) => body.extend_from_slice(&bytes),
                None => break,
            }
        }

        HttpResponse::new(status, body).error_for_status(url)
    }
}
