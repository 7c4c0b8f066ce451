use tracing::{debug, warn};

use super::sink::{NotificationSink, PushMessage};
use crate::routing::{Recipient, ResolvedRoute};

/// Priority level that requires acknowledgement-based redelivery from the
/// provider.
pub const EMERGENCY_PRIORITY: i8 = 2;

/// Provider-side delivery shaping attached to submissions.
#[derive(Debug, Clone)]
pub struct DeliveryTuning {
	/// Seconds between provider redelivery attempts
	pub retry_secs: u32,
	/// Seconds until provider redelivery stops
	pub expire_secs: u32,
	/// Attach retry/expiry only to emergency-priority submissions.
	/// When false, both are attached to every submission and providers
	/// that do not escalate simply ignore them.
	pub emergency_only: bool,
}

impl Default for DeliveryTuning {
	fn default() -> Self {
		Self {
			retry_secs: 60,
			expire_secs: 3600,
			emergency_only: false,
		}
	}
}

/// Sends one notification per resolved recipient.
///
/// `dispatch` never fails as a whole: each recipient's send is isolated,
/// a failure is logged at warn level and the remaining recipients are
/// still attempted.
pub struct Dispatcher<S> {
	sink: S,
	tuning: DeliveryTuning,
}

impl<S: NotificationSink> Dispatcher<S> {
	/// Creates a dispatcher over the given delivery transport.
	pub fn new(sink: S, tuning: DeliveryTuning) -> Self {
		Self { sink, tuning }
	}

	/// Sends the payload to every recipient of the route.
	pub async fn dispatch(&self, payload: &str, route: &ResolvedRoute) {
		for recipient in &route.recipients {
			let message = self.build_message(payload, route, recipient);
			debug!(
				recipient = %recipient.name,
				title = ?message.title,
				priority = ?message.priority,
				"Sending notification"
			);
			match self.sink.send(&message).await {
				| Ok(()) => {
					debug!(recipient = %recipient.name, "Notification sent");
				}
				| Err(err) => {
					warn!(
						recipient = %recipient.name,
						error = %err,
						"Notification failed"
					);
				}
			}
		}
	}

	fn build_message(
		&self,
		payload: &str,
		route: &ResolvedRoute,
		recipient: &Recipient,
	) -> PushMessage {
		let shaping = !self.tuning.emergency_only
			|| route.priority == Some(EMERGENCY_PRIORITY);
		PushMessage {
			token: recipient.credential.app_token.clone(),
			user: recipient.credential.user_key.clone(),
			message: payload.to_string(),
			title: route.title.clone(),
			priority: route.priority,
			retry: shaping.then_some(self.tuning.retry_secs),
			expire: shaping.then_some(self.tuning.expire_secs),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Mutex;

	use async_trait::async_trait;

	use super::*;
	use crate::dispatch::error::DeliveryError;
	use crate::routing::RecipientCredential;

	/// Records every submission; fails those whose user key is listed.
	struct RecordingSink {
		sent: Mutex<Vec<PushMessage>>,
		fail_users: Vec<String>,
	}

	impl RecordingSink {
		fn new() -> Self {
			Self {
				sent: Mutex::new(Vec::new()),
				fail_users: Vec::new(),
			}
		}

		fn failing_for(user: &str) -> Self {
			Self {
				sent: Mutex::new(Vec::new()),
				fail_users: vec![user.to_string()],
			}
		}
	}

	#[async_trait]
	impl NotificationSink for RecordingSink {
		async fn send(
			&self,
			message: &PushMessage,
		) -> Result<(), DeliveryError> {
			if self.fail_users.contains(&message.user) {
				return Err(DeliveryError::rejected(400, "invalid user"));
			}
			self.sent.lock().unwrap().push(message.clone());
			Ok(())
		}
	}

	fn recipient(name: &str, key: &str, token: &str) -> Recipient {
		Recipient {
			name: name.to_string(),
			credential: RecipientCredential {
				user_key: key.to_string(),
				app_token: token.to_string(),
			},
		}
	}

	fn route_to(recipients: Vec<Recipient>) -> ResolvedRoute {
		ResolvedRoute {
			recipients,
			title: None,
			priority: None,
		}
	}

	#[tokio::test]
	async fn sends_one_message_per_recipient() {
		let sink = RecordingSink::new();
		let dispatcher = Dispatcher::new(sink, DeliveryTuning::default());
		let route = route_to(vec![
			recipient("alice", "key1", "token1"),
			recipient("bob", "key2", "token2"),
		]);

		dispatcher.dispatch("92% full", &route).await;

		let sent = dispatcher.sink.sent.lock().unwrap();
		assert_eq!(sent.len(), 2);
		assert_eq!(sent[0].user, "key1");
		assert_eq!(sent[0].token, "token1");
		assert_eq!(sent[1].user, "key2");
		assert!(sent.iter().all(|m| m.message == "92% full"));
	}

	#[tokio::test]
	async fn one_failed_send_does_not_block_the_rest() {
		let sink = RecordingSink::failing_for("key1");
		let dispatcher = Dispatcher::new(sink, DeliveryTuning::default());
		let route = route_to(vec![
			recipient("alice", "key1", "token1"),
			recipient("bob", "key2", "token2"),
		]);

		dispatcher.dispatch("payload", &route).await;

		let sent = dispatcher.sink.sent.lock().unwrap();
		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].user, "key2");
	}

	#[tokio::test]
	async fn empty_recipient_list_sends_nothing() {
		let sink = RecordingSink::new();
		let dispatcher = Dispatcher::new(sink, DeliveryTuning::default());

		dispatcher.dispatch("payload", &route_to(Vec::new())).await;

		assert!(dispatcher.sink.sent.lock().unwrap().is_empty());
	}

	#[test]
	fn shaping_is_always_attached_by_default() {
		let dispatcher =
			Dispatcher::new(RecordingSink::new(), DeliveryTuning::default());
		let route = route_to(vec![recipient("alice", "key1", "token1")]);

		let message = dispatcher.build_message("x", &route, &route.recipients[0]);
		assert_eq!(message.retry, Some(60));
		assert_eq!(message.expire, Some(3600));
	}

	#[test]
	fn shaping_respects_emergency_only() {
		let tuning = DeliveryTuning {
			emergency_only: true,
			..DeliveryTuning::default()
		};
		let dispatcher = Dispatcher::new(RecordingSink::new(), tuning);

		let calm = ResolvedRoute {
			recipients: vec![recipient("alice", "key1", "token1")],
			title: None,
			priority: Some(1),
		};
		let message = dispatcher.build_message("x", &calm, &calm.recipients[0]);
		assert_eq!(message.retry, None);
		assert_eq!(message.expire, None);

		let urgent = ResolvedRoute {
			priority: Some(EMERGENCY_PRIORITY),
			..calm
		};
		let message =
			dispatcher.build_message("x", &urgent, &urgent.recipients[0]);
		assert_eq!(message.retry, Some(60));
		assert_eq!(message.expire, Some(3600));
	}

	#[test]
	fn optional_fields_default_to_provider_side() {
		let dispatcher =
			Dispatcher::new(RecordingSink::new(), DeliveryTuning::default());
		let route = route_to(vec![recipient("alice", "key1", "token1")]);

		let message = dispatcher.build_message("x", &route, &route.recipients[0]);
		assert_eq!(message.title, None);
		assert_eq!(message.priority, None);
	}
}
