//! Generic HTTP/JSON adapters for the collaborator traits

use std::time::Duration;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use crate::core::{Messenger, TelemetryStore, TriageProvider};
use crate::error::{FetchError, NotifyError, TriageError};
use crate::types::{TriageBrief, VitalsRecord};

/// Realtime-database style REST store: `GET {base}/{path}.json`
#[derive(Debug, Clone)]
pub struct RestTelemetryStore {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl RestTelemetryStore {
    pub fn new(base_url: &str, auth_token: Option<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }
}

#[async_trait]
impl TelemetryStore for RestTelemetryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, FetchError> {
        let mut request = self.client.get(self.url_for(path));
        if let Some(token) = &self.auth_token {
            request = request.query(&[("auth", token)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let value: Value = response.json().await.map_err(|e| FetchError::Malformed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Ok(if value.is_null() { None } else { Some(value) })
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    to: &'a str,
    body: &'a str,
}

/// Posts `{to, body}` to a notification webhook
#[derive(Debug, Clone)]
pub struct WebhookMessenger {
    client: reqwest::Client,
    url: String,
}

impl WebhookMessenger {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self { client, url: url.to_string() })
    }
}

#[async_trait]
impl Messenger for WebhookMessenger {
    async fn send(&self, body: &str, to: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookPayload { to, body })
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::Rejected(status.as_u16()))
        }
    }
}

/// Posts the vitals record and expects a `TriageBrief` back.
/// The caller enforces its own timeout on top of the client one.
#[derive(Debug, Clone)]
pub struct HttpTriageProvider {
    client: reqwest::Client,
    endpoint: String,
    timeout_ms: u64,
}

impl HttpTriageProvider {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, TriageError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TriageError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        })
    }
}

#[async_trait]
impl TriageProvider for HttpTriageProvider {
    async fn summarize(&self, vitals: &VitalsRecord) -> Result<TriageBrief, TriageError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(vitals)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TriageError::Timeout(self.timeout_ms)
                } else {
                    TriageError::Transport(e.to_string())
                }
            })?;
        if !response.status().is_success() {
            return Err(TriageError::Transport(format!("status {}", response.status())));
        }
        response
            .json::<TriageBrief>()
            .await
            .map_err(|e| TriageError::Invalid(e.to_string()))
    }
}
