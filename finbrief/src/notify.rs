//! Webhook delivery of the finished digest.
//!
//! When no webhook URL is configured the message is printed to stdout
//! instead, so an unconfigured deployment still shows its output.
//! Delivery failure is logged, never raised: by the time we are here
//! the analysis already succeeded and losing the notification is the
//! smaller problem.

use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use tracing::{error, info};

pub struct WebhookNotifier {
    client: Client,
    webhook_url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(client: Client, webhook_url: Option<String>) -> Self {
        WebhookNotifier {
            client,
            webhook_url,
        }
    }

    /// Deliver a digest message, or print it locally when unconfigured.
    pub async fn send(&self, message: &str) {
        let url = match &self.webhook_url {
            Some(url) => url,
            None => {
                info!("webhook not configured, printing digest locally");
                println!("--- Market digest (local view) ---");
                println!("{}", message);
                return;
            }
        };

        let payload = build_payload(message);
        match self.client.post(url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                info!("digest notification sent");
            }
            Ok(response) => {
                error!(status = %response.status(), "webhook rejected the notification");
            }
            Err(e) => {
                error!(error = %e, "failed to deliver notification");
            }
        }
    }
}

/// Slack-style message payload: a header text, the digest as a markdown
/// section, and a date context line.
fn build_payload(message: &str) -> serde_json::Value {
    json!({
        "text": "📊 *Daily market trend report*",
        "blocks": [
            {
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": message
                }
            },
            {
                "type": "context",
                "elements": [
                    {
                        "type": "mrkdwn",
                        "text": format!("📅 Date: {}", Utc::now().format("%Y-%m-%d"))
                    }
                ]
            }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_message_and_date_context() {
        let payload = build_payload("markets are calm");
        assert_eq!(
            payload["blocks"][0]["text"]["text"].as_str(),
            Some("markets are calm")
        );
        let context = payload["blocks"][1]["elements"][0]["text"]
            .as_str()
            .unwrap();
        assert!(context.starts_with("📅 Date: "));
    }
}
