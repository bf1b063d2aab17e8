//! services/expiry_worker/src/adapters/fcm.rs
//!
//! This module contains the adapter for Firebase Cloud Messaging (HTTP v1).
//! It implements the `PushTransport` port from the `freshness_core` crate.

use crate::config::FcmConfig;
use async_trait::async_trait;
use freshness_core::ports::{DeliveryError, PushTransport};
use serde_json::json;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `PushTransport` port using the FCM HTTP v1 API.
#[derive(Clone)]
pub struct FcmPushAdapter {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
}

impl FcmPushAdapter {
    /// Creates a new `FcmPushAdapter`.
    pub fn new(client: reqwest::Client, config: &FcmConfig) -> Self {
        let endpoint = format!(
            "{}/v1/projects/{}/messages:send",
            config.base_url.trim_end_matches('/'),
            config.project_id
        );
        Self {
            client,
            endpoint,
            access_token: config.access_token.clone(),
        }
    }
}

fn message_body(token: &str, title: &str, body: &str) -> serde_json::Value {
    json!({
        "message": {
            "token": token,
            "notification": { "title": title, "body": body },
            "android": {
                "priority": "HIGH",
                "notification": {
                    "icon": "ic_notification",
                    "color": "#4caf50",
                    "notification_priority": "PRIORITY_HIGH"
                }
            },
            "data": { "title": title, "body": body }
        }
    })
}

//=========================================================================================
// `PushTransport` Trait Implementation
//=========================================================================================

#[async_trait]
impl PushTransport for FcmPushAdapter {
    async fn send(&self, token: &str, title: &str, body: &str) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(&message_body(token, title, body))
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        // FCM explains rejections in the response body; keep it for the logs.
        let message = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}
