//! crates/freshness_core/src/dispatch.rs
//!
//! Fans one message out to every device token of the recipients.
//!
//! Every token is attempted independently with bounded parallelism and a
//! per-call timeout; one failure never stops the others. Without a transport
//! the dispatcher runs in offline mode and only logs what it would have sent.

use crate::domain::DeviceToken;
use crate::ports::PushTransport;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered,
    Failed(String),
    TimedOut,
    /// Offline mode: nothing was sent.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenOutcome {
    pub token: String,
    pub label: Option<String>,
    pub status: DeliveryStatus,
}

/// Per-token results of one fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutReport {
    pub outcomes: Vec<TokenOutcome>,
}

impl FanoutReport {
    fn count(&self, pred: impl Fn(&DeliveryStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }

    pub fn attempted(&self) -> usize {
        self.count(|s| *s != DeliveryStatus::Skipped)
    }

    pub fn delivered(&self) -> usize {
        self.count(|s| *s == DeliveryStatus::Delivered)
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, DeliveryStatus::Failed(_)))
    }

    pub fn timed_out(&self) -> usize {
        self.count(|s| *s == DeliveryStatus::TimedOut)
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| *s == DeliveryStatus::Skipped)
    }
}

#[derive(Clone)]
pub struct PushFanoutDispatcher {
    transport: Option<Arc<dyn PushTransport>>,
    timeout: Duration,
    concurrency: usize,
}

impl PushFanoutDispatcher {
    /// Creates a dispatcher. Passing `None` as the transport selects offline mode.
    pub fn new(
        transport: Option<Arc<dyn PushTransport>>,
        timeout: Duration,
        concurrency: usize,
    ) -> Self {
        if transport.is_none() {
            warn!("No push transport configured; running in offline-notification mode.");
        }
        Self {
            transport,
            timeout,
            concurrency: concurrency.max(1),
        }
    }

    pub fn is_online(&self) -> bool {
        self.transport.is_some()
    }

    /// Sends `title`/`body` to every distinct token in `devices` and reports
    /// the outcome of each. An empty device list is a valid, silent no-op.
    pub async fn dispatch(
        &self,
        devices: &[DeviceToken],
        title: &str,
        body: &str,
    ) -> FanoutReport {
        let mut seen = HashSet::new();
        let devices: Vec<&DeviceToken> = devices
            .iter()
            .filter(|d| seen.insert(d.token.as_str()))
            .collect();

        let Some(transport) = self.transport.as_ref() else {
            if !devices.is_empty() {
                debug!(devices = devices.len(), body, "Offline mode: skipping push notification");
            }
            let outcomes = devices
                .into_iter()
                .map(|d| outcome(d, DeliveryStatus::Skipped))
                .collect();
            return FanoutReport { outcomes };
        };

        let sends: Vec<_> = devices
            .into_iter()
            .map(|device| self.send_one(transport, device, title, body))
            .collect();
        let outcomes = stream::iter(sends)
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        FanoutReport { outcomes }
    }

    async fn send_one(
        &self,
        transport: &Arc<dyn PushTransport>,
        device: &DeviceToken,
        title: &str,
        body: &str,
    ) -> TokenOutcome {
        let label = device.label.as_deref().unwrap_or("unnamed device");
        let send = transport.send(&device.token, title, body);
        let status = match tokio::time::timeout(self.timeout, send).await {
            Ok(Ok(())) => {
                info!(device = label, "Push notification delivered");
                DeliveryStatus::Delivered
            }
            Ok(Err(e)) => {
                warn!(device = label, error = %e, "Push notification failed");
                DeliveryStatus::Failed(e.to_string())
            }
            Err(_) => {
                warn!(device = label, timeout = ?self.timeout, "Push notification timed out");
                DeliveryStatus::TimedOut
            }
        };
        outcome(device, status)
    }
}

fn outcome(device: &DeviceToken, status: DeliveryStatus) -> TokenOutcome {
    TokenOutcome {
        token: device.token.clone(),
        label: device.label.clone(),
        status,
    }
}
