use std::time::Duration;

use bytes::Bytes;
use rumqttc::{
	AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Outgoing,
	Packet, QoS,
};
use tokio::signal::unix::SignalKind;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, error, info, warn};

use super::error::ConnectError;
use super::last_will::WillMessage;
use super::state::{ConnectionState, SessionAction, SessionTracker};

/// Capacity of the rumqttc request channel.
const EVENT_LOOP_CAPACITY: usize = 10;
/// Keepalive negotiated with the broker.
const KEEP_ALIVE: Duration = Duration::from_secs(60);
/// Delivery-quality level for every bridge subscription.
const SUBSCRIBE_QOS: QoS = QoS::AtMostOnce;
/// Bound on draining the event loop during shutdown.
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Broker session settings consumed from configuration.
#[derive(Debug, Clone)]
pub struct BrokerSettings {
	/// Broker hostname or address
	pub host: String,
	/// Broker port
	pub port: u16,
	/// Stable client identity; the broker keeps subscription state for it
	/// across reconnects because the session is persistent
	pub client_id: String,
	/// Username and password, attached once before the first attempt
	pub credentials: Option<(String, String)>,
	/// Optional last-will registration
	pub last_will: Option<WillMessage>,
}

/// An inbound message surfaced to the bridge.
#[derive(Debug)]
pub struct InboundMessage {
	/// Concrete topic the message was published on
	pub topic: String,
	/// Message body, forwarded verbatim as the notification text
	pub payload: Bytes,
}

/// Why the event loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
	/// The broker ended the session cleanly
	CleanDisconnect,
	/// A termination signal requested shutdown; carries the signal number
	Signal(i32),
}

/// What [`ConnectionManager::next_event`] hands to the caller.
#[derive(Debug)]
pub enum SessionEvent {
	/// A message arrived on a subscribed topic
	Message(InboundMessage),
	/// The session ended and no further events will follow
	Stopped(StopReason),
}

enum LoopFlow {
	Continue,
	Stop(StopReason),
}

/// Owner of the single broker session for the process lifetime.
///
/// Wraps the rumqttc client and event loop together with the session
/// state machine. Reconnection, subscription re-establishment and the
/// shutdown sequence all happen inside [`Self::next_event`]; the caller
/// only ever sees inbound messages and the final stop reason.
pub struct ConnectionManager {
	client: AsyncClient,
	event_loop: EventLoop,
	tracker: SessionTracker,
	subscriptions: Vec<String>,
	shutdown_rx: watch::Receiver<Option<i32>>,
}

impl ConnectionManager {
	/// Builds the session options and the event loop.
	///
	/// Credentials and the last-will are attached here, once, before the
	/// first connect attempt. The session is persistent (clean session
	/// disabled) under the configured client identity.
	pub fn new(
		settings: BrokerSettings,
		subscriptions: Vec<String>,
		shutdown_rx: watch::Receiver<Option<i32>>,
	) -> Self {
		info!(
			host = %settings.host,
			port = settings.port,
			client_id = %settings.client_id,
			"Configuring MQTT session"
		);
		let mut options = MqttOptions::new(
			settings.client_id,
			settings.host,
			settings.port,
		);
		options.set_keep_alive(KEEP_ALIVE);
		options.set_clean_session(false);
		if let Some((username, password)) = settings.credentials {
			options.set_credentials(username, password);
		}
		if let Some(will) = settings.last_will {
			debug!(topic = %will.topic, "Registering last will");
			options.set_last_will(will.into());
		}
		let (client, event_loop) =
			AsyncClient::new(options, EVENT_LOOP_CAPACITY);

		Self {
			client,
			event_loop,
			tracker: SessionTracker::new(),
			subscriptions,
			shutdown_rx,
		}
	}

	/// Current lifecycle state of the session.
	pub fn state(&self) -> ConnectionState {
		self.tracker.state()
	}

	/// Drives the event loop until a message arrives or the session ends.
	pub async fn next_event(&mut self) -> Result<SessionEvent, ConnectError> {
		if self.tracker.state() == ConnectionState::Disconnected {
			debug!("Opening connection to MQTT broker");
			self.tracker.connect_started();
		}

		loop {
			// Copy the value out so no watch guard is held across awaits.
			let requested = *self.shutdown_rx.borrow();
			if let Some(signo) = requested {
				let reason = self.shutdown(signo).await;
				return Ok(SessionEvent::Stopped(reason));
			}

			let event = tokio::select! {
				changed = self.shutdown_rx.changed() => {
					if changed.is_err() {
						// Without the signal task no termination request
						// can ever arrive; stop instead of running
						// unstoppable.
						warn!("Shutdown channel closed, stopping");
						let signo =
							SignalKind::terminate().as_raw_value();
						let reason = self.shutdown(signo).await;
						return Ok(SessionEvent::Stopped(reason));
					}
					continue;
				}
				event = self.event_loop.poll() => event,
			};

			match event {
				| Ok(Event::Incoming(Packet::Publish(publish))) => {
					debug!(
						topic = %publish.topic,
						payload_size = publish.payload.len(),
						"Message received"
					);
					return Ok(SessionEvent::Message(InboundMessage {
						topic: publish.topic,
						payload: publish.payload,
					}));
				}
				| Ok(Event::Incoming(Packet::ConnAck(ack))) => {
					info!(
						session_present = ack.session_present,
						"Connected to MQTT broker"
					);
					let action = self.tracker.handshake_accepted();
					if let LoopFlow::Stop(reason) =
						self.perform(action).await
					{
						return Ok(SessionEvent::Stopped(reason));
					}
				}
				| Ok(Event::Incoming(Packet::Disconnect)) => {
					info!(
						"Broker closed the session cleanly, not reconnecting"
					);
					let action = self.tracker.clean_disconnect();
					if let LoopFlow::Stop(reason) =
						self.perform(action).await
					{
						return Ok(SessionEvent::Stopped(reason));
					}
				}
				| Ok(event) => {
					debug!(event = ?event, "Broker event");
				}
				| Err(ConnectionError::ConnectionRefused(code)) => {
					warn!(code = ?code, "Broker refused the handshake");
					let action = self.tracker.handshake_refused();
					if let LoopFlow::Stop(reason) =
						self.perform(action).await
					{
						return Ok(SessionEvent::Stopped(reason));
					}
				}
				| Err(err) => match self.tracker.transport_error() {
					| SessionAction::FailStartup => {
						error!(
							error = %err,
							"Cannot reach MQTT broker, giving up"
						);
						return Err(ConnectError::Transport(err));
					}
					| action => {
						warn!(
							error = %err,
							"Unexpected disconnection from MQTT broker"
						);
						if let LoopFlow::Stop(reason) =
							self.perform(action).await
						{
							return Ok(SessionEvent::Stopped(reason));
						}
					}
				},
			}
		}
	}

	async fn perform(&mut self, action: SessionAction) -> LoopFlow {
		match action {
			| SessionAction::Subscribe => {
				self.establish_subscriptions().await;
				LoopFlow::Continue
			}
			| SessionAction::RetryAfter(delay) => {
				info!(delay = ?delay, "Waiting before reconnecting");
				// The shutdown signal interrupts the backoff as well;
				// the request is picked up at the top of the loop.
				tokio::select! {
					_ = self.shutdown_rx.changed() => {}
					_ = time::sleep(delay) => {}
				}
				self.tracker.reconnect_started();
				LoopFlow::Continue
			}
			| SessionAction::Stop => {
				LoopFlow::Stop(StopReason::CleanDisconnect)
			}
			| SessionAction::FailStartup => {
				unreachable!("startup failures are returned as errors")
			}
		}
	}

	/// (Re-)establish every subscription the routing table needs, at the
	/// lowest delivery-quality level.
	async fn establish_subscriptions(&mut self) {
		for pattern in &self.subscriptions {
			debug!(pattern = %pattern, "Subscribing");
			if let Err(err) = self
				.client
				.subscribe(pattern.clone(), SUBSCRIBE_QOS)
				.await
			{
				error!(
					pattern = %pattern,
					error = %err,
					"Failed to queue subscribe request"
				);
			}
		}
	}

	/// Close the session before process exit.
	///
	/// Sends DISCONNECT and drains the event loop until the request is on
	/// the wire, bounded by a timeout so a dead transport cannot hold up
	/// termination. Whatever state the signal arrived in, the session is
	/// closed by the time this returns.
	async fn shutdown(&mut self, signo: i32) -> StopReason {
		info!(
			signal = signo,
			state = ?self.tracker.state(),
			"Termination signal received, closing session"
		);

		if let Err(err) = self.client.disconnect().await {
			warn!(error = %err, "Failed to queue disconnect request");
		}

		let drain = async {
			loop {
				match self.event_loop.poll().await {
					| Ok(Event::Outgoing(Outgoing::Disconnect)) => {
						debug!("Disconnect request sent to broker");
						break;
					}
					| Ok(_) => continue,
					| Err(_) => break, // transport already gone
				}
			}
		};
		if time::timeout(SHUTDOWN_DRAIN_TIMEOUT, drain).await.is_err() {
			warn!(
				timeout = ?SHUTDOWN_DRAIN_TIMEOUT,
				"Shutdown drain timed out"
			);
		}

		self.tracker.terminated();
		info!("MQTT session closed");
		StopReason::Signal(signo)
	}
}
