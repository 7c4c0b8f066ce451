//! Last Will and Testament message types

use rumqttc::{LastWill, QoS};

/// A Last Will and Testament (LWT) message registered with the broker.
///
/// The broker publishes it on our behalf if the session ends without a
/// clean DISCONNECT. Registered once, before the first connect attempt.
#[derive(Debug, Clone)]
pub struct WillMessage {
	/// The topic to which the LWT message will be published.
	pub topic: String,
	/// The payload of the LWT message.
	pub payload: String,
	/// The Quality of Service level for the LWT message.
	pub qos: QoS,
	/// Whether the LWT message should be retained by the broker.
	pub retain: bool,
}

impl WillMessage {
	/// Creates a new Last Will and Testament message.
	pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
		Self {
			topic: topic.into(),
			payload: payload.into(),
			qos: QoS::AtMostOnce,
			retain: false,
		}
	}

	/// Sets the QoS level for the LWT message.
	pub fn qos(mut self, qos: QoS) -> Self {
		self.qos = qos;
		self
	}

	/// Sets the retain flag for the LWT message.
	pub fn retain(mut self, retain: bool) -> Self {
		self.retain = retain;
		self
	}
}

impl From<WillMessage> for LastWill {
	fn from(will: WillMessage) -> Self {
		LastWill::new(will.topic, will.payload, will.qos, will.retain)
	}
}
