//! Adapters for the external action that applies a promo code on the shop.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

use service_core::observability::inject_trace_headers;

pub const APPLIER_UNAVAILABLE: &str = "APPLIER_UNAVAILABLE";
pub const APPLIER_BAD_RESPONSE: &str = "APPLIER_BAD_RESPONSE";

/// What the shop said about an application attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplyOutcome {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl ApplyOutcome {
    pub fn applied(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error_code: None,
        }
    }

    pub fn rejected(message: impl Into<String>, error_code: Option<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error_code,
        }
    }
}

#[derive(Debug, Error)]
pub enum ApplierError {
    #[error("Code applier unreachable: {0}")]
    Unavailable(String),

    #[error("Code applier returned an unusable response: {0}")]
    BadResponse(String),
}

impl ApplierError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ApplierError::Unavailable(_) => APPLIER_UNAVAILABLE,
            ApplierError::BadResponse(_) => APPLIER_BAD_RESPONSE,
        }
    }
}

#[async_trait]
pub trait CodeApplier: Send + Sync {
    /// Apply `code` on the shop. May take a long time; callers impose no timeout.
    async fn apply_code(&self, code: &str) -> Result<ApplyOutcome, ApplierError>;

    /// Short label for logs and metrics.
    fn name(&self) -> &'static str;
}

/// Calls the browser-automation worker over HTTP.
pub struct HttpCodeApplier {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct ApplyRequest<'a> {
    code: &'a str,
}

impl HttpCodeApplier {
    pub fn new(endpoint: String, api_key: Option<String>) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("promo-service/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl CodeApplier for HttpCodeApplier {
    #[tracing::instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn apply_code(&self, code: &str) -> Result<ApplyOutcome, ApplierError> {
        let mut headers = reqwest::header::HeaderMap::new();
        inject_trace_headers(&mut headers, None);

        let mut request = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .json(&ApplyRequest { code });
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApplierError::Unavailable(e.to_string()))?;

        let status = response.status();
        // The worker reports shop-side rejections in the body, even on 4xx.
        let body = response
            .text()
            .await
            .map_err(|e| ApplierError::Unavailable(e.to_string()))?;

        match serde_json::from_str::<ApplyOutcome>(&body) {
            Ok(outcome) => Ok(outcome),
            Err(_) if status.is_server_error() => Err(ApplierError::Unavailable(format!(
                "worker responded with status {}",
                status
            ))),
            Err(e) => Err(ApplierError::BadResponse(format!(
                "status {}: {}",
                status, e
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// How [`MockCodeApplier`] responds.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    Apply,
    Reject {
        message: String,
        error_code: Option<String>,
    },
    Fail(String),
    Panic,
}

/// Scripted applier for development and tests.
pub struct MockCodeApplier {
    behavior: Mutex<MockBehavior>,
    delay: Option<Duration>,
    call_count: AtomicU64,
    applied_codes: Mutex<Vec<String>>,
}

impl MockCodeApplier {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            delay: None,
            call_count: AtomicU64::new(0),
            applied_codes: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(MockBehavior::Apply)
    }

    pub fn rejecting(message: impl Into<String>) -> Self {
        Self::new(MockBehavior::Reject {
            message: message.into(),
            error_code: None,
        })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.lock().unwrap_or_else(|e| e.into_inner()) = behavior;
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn applied_codes(&self) -> Vec<String> {
        self.applied_codes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl CodeApplier for MockCodeApplier {
    async fn apply_code(&self, code: &str) -> Result<ApplyOutcome, ApplierError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.applied_codes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(code.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let behavior = self
            .behavior
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        tracing::info!(code = %code, behavior = ?behavior, "[MOCK] Promo code application");

        match behavior {
            MockBehavior::Apply => Ok(ApplyOutcome::applied("Promo code applied successfully")),
            MockBehavior::Reject {
                message,
                error_code,
            } => Ok(ApplyOutcome::rejected(message, error_code)),
            MockBehavior::Fail(reason) => Err(ApplierError::Unavailable(reason)),
            MockBehavior::Panic => panic!("mock applier panicked while applying {}", code),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
