// =============================================================================
// Signal Webhook (§6) — best-effort open/close notification
// =============================================================================
//
// A webhook failure never rolls back a position mutation (§6, §7): this is a
// fire-and-forget POST with a single bounded-timeout attempt, shaped like the
// teacher's outbound HTTP calls but with no retry loop, since there is
// nothing to retry against — the position state is already durable by the
// time this fires.
// =============================================================================

use serde::Serialize;
use tracing::{instrument, warn};

use crate::types::TechnicalSnapshot;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalAction {
    BuyToOpen,
    SellToOpen,
    BuyToClose,
    SellToClose,
}

#[derive(Debug, Serialize)]
pub struct Signal<'a> {
    pub ticker: &'a str,
    pub action: SignalAction,
    pub indicator: &'a str,
    pub reason: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enter_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_loss: Option<f64>,
    pub technical_indicators: &'a TechnicalSnapshot,
}

#[derive(Clone)]
pub struct WebhookClient {
    url: String,
    client: reqwest::Client,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .expect("failed to build reqwest client");
        Self { url: url.into(), client }
    }

    /// Best-effort delivery: logs and swallows any failure (§6). An empty
    /// URL (webhook not configured) is a silent no-op.
    #[instrument(skip(self, signal), fields(ticker = signal.ticker), name = "webhook::send")]
    pub async fn send(&self, signal: &Signal<'_>) {
        if self.url.is_empty() {
            return;
        }
        match self.client.post(&self.url).json(signal).send().await {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => warn!(status = %resp.status(), "webhook returned non-success status"),
            Err(e) => warn!(error = %e, "webhook delivery failed"),
        }
    }
}

impl std::fmt::Debug for WebhookClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookClient").field("url", &self.url).finish()
    }
}
