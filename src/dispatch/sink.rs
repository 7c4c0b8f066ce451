use async_trait::async_trait;
use serde::Serialize;

use super::error::DeliveryError;

/// One fully-parameterized submission for a single recipient.
///
/// Serializes to the provider's form-encoded call surface. Optional fields
/// are omitted entirely so the provider applies its own defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
	/// Application token of the sending application
	pub token: String,
	/// Destination key of the recipient
	pub user: String,
	/// Notification body, the MQTT message payload verbatim
	pub message: String,
	/// Resolved title, provider default when absent
	#[serde(skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
	/// Resolved priority, provider default when absent
	#[serde(skip_serializing_if = "Option::is_none")]
	pub priority: Option<i8>,
	/// Seconds between provider-side redelivery attempts
	#[serde(skip_serializing_if = "Option::is_none")]
	pub retry: Option<u32>,
	/// Seconds until the provider stops redelivering
	#[serde(skip_serializing_if = "Option::is_none")]
	pub expire: Option<u32>,
}

/// Delivery transport for push notifications.
///
/// The bridge reaches the delivery service only through this seam, so
/// tests can observe submissions without any network.
#[async_trait]
pub trait NotificationSink: Send + Sync {
	/// Submits one notification, bounded by the transport's own timeout.
	async fn send(&self, message: &PushMessage) -> Result<(), DeliveryError>;
}

#[async_trait]
impl<S: NotificationSink> NotificationSink for std::sync::Arc<S> {
	async fn send(&self, message: &PushMessage) -> Result<(), DeliveryError> {
		self.as_ref().send(message).await
	}
}
