use std::time::Duration;

/// Fixed delay before retrying a refused handshake.
pub const HANDSHAKE_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Fixed delay before reconnecting after an unexpected session drop.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Lifecycle state of the broker session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
	/// No session and none being opened
	Disconnected,
	/// Handshake in flight or scheduled
	Connecting,
	/// Session established, subscriptions active
	Connected,
	/// Session dropped unexpectedly, reconnect scheduled
	AwaitingReconnect,
}

/// What the event loop must do after a session event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
	/// Handshake succeeded: (re-)establish all subscriptions
	Subscribe,
	/// Recoverable failure: sleep for the delay, then poll again
	RetryAfter(Duration),
	/// Transport failure before any session existed; not retried
	FailStartup,
	/// Clean disconnect: stop without reconnecting
	Stop,
}

/// Pure state machine for the session lifecycle.
///
/// Owns no I/O. The event loop feeds it handshake results, disconnects
/// and transport errors, and performs whatever action it returns. A
/// handshake refusal is always retried; a transport error is fatal only
/// until the first session has been established, recoverable forever
/// after.
#[derive(Debug)]
pub struct SessionTracker {
	state: ConnectionState,
	ever_connected: bool,
}

impl SessionTracker {
	/// Starts in `Disconnected` with no session ever established.
	pub fn new() -> Self {
		Self {
			state: ConnectionState::Disconnected,
			ever_connected: false,
		}
	}

	/// Current lifecycle state.
	pub fn state(&self) -> ConnectionState {
		self.state
	}

	/// The first connect attempt is starting.
	pub fn connect_started(&mut self) {
		self.state = ConnectionState::Connecting;
	}

	/// A retry delay elapsed; the next poll reconnects.
	pub fn reconnect_started(&mut self) {
		self.state = ConnectionState::Connecting;
	}

	/// CONNACK arrived with a success code.
	pub fn handshake_accepted(&mut self) -> SessionAction {
		self.state = ConnectionState::Connected;
		self.ever_connected = true;
		SessionAction::Subscribe
	}

	/// CONNACK arrived with a non-zero return code.
	///
	/// Retried indefinitely at a fixed interval; attempts are not counted.
	pub fn handshake_refused(&mut self) -> SessionAction {
		self.state = ConnectionState::Connecting;
		SessionAction::RetryAfter(HANDSHAKE_RETRY_DELAY)
	}

	/// The broker ended the session cleanly. No reconnect is attempted.
	pub fn clean_disconnect(&mut self) -> SessionAction {
		self.state = ConnectionState::Disconnected;
		SessionAction::Stop
	}

	/// The transport failed or the session dropped without a DISCONNECT.
	pub fn transport_error(&mut self) -> SessionAction {
		if self.ever_connected {
			self.state = ConnectionState::AwaitingReconnect;
			SessionAction::RetryAfter(RECONNECT_DELAY)
		} else {
			self.state = ConnectionState::Disconnected;
			SessionAction::FailStartup
		}
	}

	/// Shutdown finished; the session is closed for good.
	pub fn terminated(&mut self) {
		self.state = ConnectionState::Disconnected;
	}
}

impl Default for SessionTracker {
	fn default() -> Self {
		Self::new()
	}
}
