//! End-to-end tests for the routing and dispatch path.
//!
//! Drives the same pipeline the event loop uses, with a recording sink in
//! place of the Pushover API; no broker or network is required.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mqtt_push_bridge::config::BridgeConfig;
use mqtt_push_bridge::dispatch::{
	DeliveryError, Dispatcher, NotificationSink, PushMessage,
};
use mqtt_push_bridge::MessagePipeline;

/// Captures every submission instead of calling the provider.
#[derive(Default)]
struct RecordingSink {
	sent: Mutex<Vec<PushMessage>>,
}

impl RecordingSink {
	fn sent(&self) -> Vec<PushMessage> {
		self.sent.lock().unwrap().clone()
	}
}

#[async_trait]
impl NotificationSink for RecordingSink {
	async fn send(&self, message: &PushMessage) -> Result<(), DeliveryError> {
		self.sent.lock().unwrap().push(message.clone());
		Ok(())
	}
}

fn pipeline_from(
	config: &str,
) -> (MessagePipeline<Arc<RecordingSink>>, Arc<RecordingSink>) {
	let config = BridgeConfig::parse(config).unwrap();
	let sink = Arc::new(RecordingSink::default());
	let dispatcher =
		Dispatcher::new(Arc::clone(&sink), config.delivery_tuning());
	(MessagePipeline::new(config.routing_table(), dispatcher), sink)
}

const ALERT_CONFIG: &str = r#"
	[broker]
	host = "localhost"

	[[rules.recipients]]
	pattern = "alerts/disk"
	to = ["alice"]

	[[rules.titles]]
	pattern = "alerts/disk"
	title = "Disk"

	[credentials.alice]
	user_key = "key1"
	app_token = "token1"
"#;

#[tokio::test]
async fn routed_message_reaches_exactly_one_recipient() {
	let (pipeline, sink) = pipeline_from(ALERT_CONFIG);

	pipeline.handle("alerts/disk", b"92% full").await;

	let messages = sink.sent();
	assert_eq!(messages.len(), 1);
	let message = &messages[0];
	assert_eq!(message.message, "92% full");
	assert_eq!(message.user, "key1");
	assert_eq!(message.token, "token1");
	assert_eq!(message.title.as_deref(), Some("Disk"));
	// No priority rule matched: the provider default applies.
	assert_eq!(message.priority, None);
}

#[tokio::test]
async fn unrouted_topic_dispatches_nothing() {
	let (pipeline, sink) = pipeline_from(ALERT_CONFIG);

	pipeline.handle("metrics/cpu", b"54%").await;

	assert!(sink.sent().is_empty());
}

#[tokio::test]
async fn first_listed_rule_selects_the_recipients() {
	let (pipeline, sink) = pipeline_from(
		r#"
		[broker]
		host = "localhost"

		[[rules.recipients]]
		pattern = "a/#"
		to = ["alice"]

		[[rules.recipients]]
		pattern = "a/b"
		to = ["bob"]

		[credentials.alice]
		user_key = "key1"
		app_token = "token1"

		[credentials.bob]
		user_key = "key2"
		app_token = "token2"
		"#,
	);

	pipeline.handle("a/b", b"payload").await;

	let messages = sink.sent();
	assert_eq!(messages.len(), 1);
	assert_eq!(messages[0].user, "key1");
}

#[tokio::test]
async fn every_listed_recipient_gets_a_notification() {
	let (pipeline, sink) = pipeline_from(
		r#"
		[broker]
		host = "localhost"

		[[rules.recipients]]
		pattern = "alerts/#"
		to = ["alice", "bob"]

		[credentials.alice]
		user_key = "key1"
		app_token = "token1"

		[credentials.bob]
		user_key = "key2"
		app_token = "token2"
		"#,
	);

	pipeline.handle("alerts/disk", b"92% full").await;

	let messages = sink.sent();
	assert_eq!(messages.len(), 2);
	assert_eq!(messages[0].user, "key1");
	assert_eq!(messages[1].user, "key2");
}

#[tokio::test]
async fn missing_credential_skips_only_that_recipient() {
	let (pipeline, sink) = pipeline_from(
		r#"
		[broker]
		host = "localhost"

		[[rules.recipients]]
		pattern = "alerts/#"
		to = ["ghost", "alice"]

		[credentials.alice]
		user_key = "key1"
		app_token = "token1"
		"#,
	);

	pipeline.handle("alerts/disk", b"payload").await;

	let messages = sink.sent();
	assert_eq!(messages.len(), 1);
	assert_eq!(messages[0].user, "key1");
}

#[tokio::test]
async fn same_topic_twice_resolves_identically() {
	let (pipeline, sink) = pipeline_from(ALERT_CONFIG);

	pipeline.handle("alerts/disk", b"first").await;
	pipeline.handle("alerts/disk", b"second").await;

	let messages = sink.sent();
	assert_eq!(messages.len(), 2);
	assert_eq!(messages[0].user, messages[1].user);
	assert_eq!(messages[0].title, messages[1].title);
	assert_eq!(messages[0].priority, messages[1].priority);
}

#[tokio::test]
async fn non_utf8_payload_is_forwarded_lossily() {
	let (pipeline, sink) = pipeline_from(ALERT_CONFIG);

	pipeline.handle("alerts/disk", &[0x66, 0xff, 0x75]).await;

	let messages = sink.sent();
	assert_eq!(messages.len(), 1);
	assert!(messages[0].message.contains('\u{fffd}'));
}
