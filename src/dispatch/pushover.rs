use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::error::DeliveryError;
use super::sink::{NotificationSink, PushMessage};

/// Pushover message submission endpoint.
pub const PUSHOVER_ENDPOINT: &str = "https://api.pushover.net/1/messages.json";

/// HTTP implementation of [`NotificationSink`] for the Pushover API.
///
/// Every request carries the client-wide timeout, so a stalled provider
/// cannot block the event loop indefinitely.
pub struct PushoverClient {
	http: reqwest::Client,
	endpoint: String,
}

impl PushoverClient {
	pub fn new(timeout: Duration) -> Result<Self, DeliveryError> {
		let http = reqwest::Client::builder().timeout(timeout).build()?;
		Ok(Self {
			http,
			endpoint: PUSHOVER_ENDPOINT.to_string(),
		})
	}
}

#[async_trait]
impl NotificationSink for PushoverClient {
	async fn send(&self, message: &PushMessage) -> Result<(), DeliveryError> {
		let response = self
			.http
			.post(&self.endpoint)
			.form(message)
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(DeliveryError::rejected(status.as_u16(), body));
		}
		debug!(user = %message.user, "Notification accepted by provider");
		Ok(())
	}
}
