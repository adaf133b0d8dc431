//! # Checkout API Client
//!
//! HTTP submission of sales to the checkout server.
//!
//! ## Response Classification
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Server Response         Classified As          Queue Consequence       │
//! │  ──────────────────      ─────────────────      ────────────────────    │
//! │  2xx + {"id": ...}       Accepted{server_id}    entry removed           │
//! │  409 Conflict            Rejected{reason}       entry removed           │
//! │  422 Unprocessable       Rejected{reason}       entry removed           │
//! │  other 4xx, 5xx, 429     Err(ServerUnavailable) entry stays, retried    │
//! │  timeout / transport     Err(Timeout/..)        entry stays, retried    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Only 409 and 422 are terminal: they mean the server examined the sale
//! and refused it. Every other failure is presumed transient, because
//! dropping a sale that would have succeeded is worse than retrying one
//! that won't.
//!
//! ## Idempotency
//! Every submission carries `Idempotency-Key: <local_id>`. A sale
//! resubmitted after an ambiguous timeout deduplicates server-side and
//! returns the original server ID.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use vela_core::{LocalId, SaleRequest};

/// Header carrying the local ID as the server-side deduplication key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

// =============================================================================
// API Contract
// =============================================================================

/// Definitive server verdicts on a submission.
///
/// Transient failures (timeouts, 5xx, transport errors) are NOT replies;
/// they surface as `Err(SyncError)` with `is_retryable() == true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitReply {
    /// The server recorded the sale (or had already, if this was a
    /// resubmission) and assigned its canonical ID.
    Accepted { server_id: String },

    /// The server examined the sale and refused it. Terminal.
    Rejected { reason: String },
}

/// Client for submitting sales to the checkout server.
///
/// A trait so the sync engine and gateway can be exercised against a
/// scripted server in tests.
#[async_trait]
pub trait CheckoutApi: Send + Sync {
    /// Submits one sale under its local ID as the idempotency key.
    async fn submit(&self, local_id: &LocalId, request: &SaleRequest) -> SyncResult<SubmitReply>;
}

// =============================================================================
// HTTP Implementation
// =============================================================================

/// Successful response body from `POST /sales`.
#[derive(Debug, Deserialize)]
struct SaleCreatedBody {
    id: String,
}

/// Rejection response body (best-effort parse; plain text bodies fall
/// back to the raw string).
#[derive(Debug, Deserialize)]
struct RejectionBody {
    reason: String,
}

/// HTTP checkout client against the configured server.
pub struct HttpCheckoutApi {
    client: reqwest::Client,
    sales_url: String,
}

impl HttpCheckoutApi {
    /// Creates a client with the config's request timeout baked in.
    pub fn new(config: &SyncConfig) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SyncError::Internal(e.to_string()))?;

        Ok(HttpCheckoutApi {
            client,
            sales_url: format!("{}/sales", config.server_url.trim_end_matches('/')),
        })
    }

    fn rejection_reason(status: reqwest::StatusCode, body: &str) -> String {
        match serde_json::from_str::<RejectionBody>(body) {
            Ok(parsed) => parsed.reason,
            Err(_) if !body.is_empty() => body.to_string(),
            Err(_) => format!("HTTP {}", status.as_u16()),
        }
    }
}

#[async_trait]
impl CheckoutApi for HttpCheckoutApi {
    async fn submit(&self, local_id: &LocalId, request: &SaleRequest) -> SyncResult<SubmitReply> {
        debug!(local_id = %local_id, "Submitting sale");

        let response = self
            .client
            .post(&self.sales_url)
            .header(IDEMPOTENCY_KEY_HEADER, local_id.as_str())
            .json(request)
            .send()
            .await?;

        let status = response.status();

        if status.is_success() {
            let body: SaleCreatedBody = response.json().await?;
            debug!(local_id = %local_id, server_id = %body.id, "Sale accepted");
            return Ok(SubmitReply::Accepted {
                server_id: body.id,
            });
        }

        // Only these statuses mean "the payload itself was refused".
        if status == reqwest::StatusCode::CONFLICT
            || status == reqwest::StatusCode::UNPROCESSABLE_ENTITY
        {
            let body = response.text().await.unwrap_or_default();
            let reason = Self::rejection_reason(status, &body);
            debug!(local_id = %local_id, %reason, "Sale rejected");
            return Ok(SubmitReply::Rejected { reason });
        }

        Err(SyncError::ServerUnavailable {
            status: status.as_u16(),
        })
    }
}
