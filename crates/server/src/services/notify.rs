//! Order notification dispatch.
//!
//! Polymorphic over `send(address, message)`: a log-only channel by default,
//! or a pub/sub topic when one is configured. Dispatch failures are logged
//! and swallowed - they never fail the triggering business operation. No
//! delivery guarantee, no retry, no cross-message ordering.

use std::time::Duration;

use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::Serialize;

use bookbazaar_core::Email;

use crate::config::MirrorConfig;
use crate::services::mirror::MirrorStore;

/// Subject line attached to every published notification.
const NOTIFICATION_SUBJECT: &str = "BookBazaar Order Update";

/// Upper bound on a publish; a slow topic must never stall a request.
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(2);

/// Envelope published to the topic. One attribute carries the recipient
/// address for auditing.
#[derive(Debug, Serialize)]
struct NotificationEnvelope<'a> {
    subject: &'static str,
    message: &'a str,
    attributes: NotificationAttributes<'a>,
}

#[derive(Debug, Serialize)]
struct NotificationAttributes<'a> {
    email: &'a str,
}

/// Notification channel, selected once at startup.
#[derive(Clone)]
pub enum Notifier {
    /// Default: write the notification to the log.
    Log,
    /// Publish to a pub/sub topic on the mirror endpoint.
    Topic {
        conn: ConnectionManager,
        topic: String,
    },
}

impl Notifier {
    /// Pick the channel from configuration: the topic variant requires both
    /// a reachable mirror endpoint and a configured topic name.
    #[must_use]
    pub fn from_config(mirror: Option<&MirrorStore>, config: &MirrorConfig) -> Self {
        match (mirror, &config.notify_topic) {
            (Some(store), Some(topic)) => Self::Topic {
                conn: store.connection(),
                topic: topic.clone(),
            },
            _ => Self::Log,
        }
    }

    /// Whether this dispatcher publishes to an external topic.
    #[must_use]
    pub const fn is_topic(&self) -> bool {
        matches!(self, Self::Topic { .. })
    }

    /// Send a notification to `address`.
    ///
    /// Infallible by contract: failures are logged and swallowed.
    pub async fn send(&self, address: &Email, message: &str) {
        match self {
            Self::Log => {
                tracing::info!(recipient = %address, message, "notification");
            }
            Self::Topic { conn, topic } => {
                let envelope = NotificationEnvelope {
                    subject: NOTIFICATION_SUBJECT,
                    message,
                    attributes: NotificationAttributes {
                        email: address.as_str(),
                    },
                };
                let payload = match serde_json::to_string(&envelope) {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to encode notification");
                        return;
                    }
                };

                let mut conn = conn.clone();
                let publish = async {
                    let _: () = conn.publish(topic, payload).await?;
                    Ok::<(), redis::RedisError>(())
                };
                match tokio::time::timeout(PUBLISH_TIMEOUT, publish).await {
                    Ok(Ok(())) => {
                        tracing::debug!(recipient = %address, topic, "notification published");
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(recipient = %address, error = %e, "notification dispatch failed");
                    }
                    Err(_) => {
                        tracing::warn!(recipient = %address, "notification dispatch timed out");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_log_channel() {
        let notifier = Notifier::from_config(None, &MirrorConfig::default());
        assert!(!notifier.is_topic());
    }

    #[test]
    fn test_topic_requires_mirror_endpoint() {
        // A topic name without a reachable mirror store still logs locally
        let config = MirrorConfig {
            url: None,
            notify_topic: Some("bookbazaar-notifications".to_owned()),
        };
        let notifier = Notifier::from_config(None, &config);
        assert!(!notifier.is_topic());
    }

    #[tokio::test]
    async fn test_log_channel_send_is_infallible() {
        let notifier = Notifier::Log;
        let email = Email::parse("reader@example.com").unwrap();
        // Returns normally; nothing to assert beyond not panicking
        notifier.send(&email, "Order placed for: Dune").await;
    }

    #[test]
    fn test_envelope_shape() {
        let envelope = NotificationEnvelope {
            subject: NOTIFICATION_SUBJECT,
            message: "Order #7 cancelled",
            attributes: NotificationAttributes {
                email: "reader@example.com",
            },
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["subject"], "BookBazaar Order Update");
        assert_eq!(json["attributes"]["email"], "reader@example.com");
    }
}
