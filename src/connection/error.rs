use thiserror::Error;

/// Errors that terminate the bridge run loop.
///
/// Everything recoverable (refused handshakes, session drops) is handled
/// inside the event loop and never surfaces here.
#[derive(Error, Debug)]
pub enum ConnectError {
	/// Transport-level failure before any session was established
	#[error("cannot reach MQTT broker: {0}")]
	Transport(#[from] rumqttc::ConnectionError),
}
