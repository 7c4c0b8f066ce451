//! Top-level orchestration: broker events through routing into dispatch.

use tracing::info;

use crate::connection::{
	ConnectError, ConnectionManager, SessionEvent, StopReason,
};
use crate::dispatch::{Dispatcher, NotificationSink};
use crate::routing::{RouteOutcome, RoutingTable};

/// Routes one inbound message and dispatches the result.
///
/// Kept separate from the connection so the whole routing and dispatch
/// path can be exercised without a broker.
pub struct MessagePipeline<S> {
	routing: RoutingTable,
	dispatcher: Dispatcher<S>,
}

impl<S: NotificationSink> MessagePipeline<S> {
	/// Combines the routing table with a dispatcher.
	pub fn new(routing: RoutingTable, dispatcher: Dispatcher<S>) -> Self {
		Self {
			routing,
			dispatcher,
		}
	}

	/// Resolve and dispatch one message.
	///
	/// A topic with no matching recipient rule is dropped silently; that
	/// is the expected no-op path, not an error.
	pub async fn handle(&self, topic: &str, payload: &[u8]) {
		let route = match self.routing.resolve(topic) {
			| RouteOutcome::Routed(route) => route,
			| RouteOutcome::Unrouted => {
				info!(topic = %topic, "No recipient rule for topic, dropping");
				return;
			}
		};
		let payload = String::from_utf8_lossy(payload);
		self.dispatcher.dispatch(&payload, &route).await;
	}
}

/// Wires inbound broker messages through the pipeline.
///
/// One event loop, one message at a time: arrival order is processing
/// order, and a send in flight blocks the next message, never the other
/// way around.
pub struct Bridge<S> {
	connection: ConnectionManager,
	pipeline: MessagePipeline<S>,
}

impl<S: NotificationSink> Bridge<S> {
	/// Wires a connection manager to a message pipeline.
	pub fn new(
		connection: ConnectionManager,
		pipeline: MessagePipeline<S>,
	) -> Self {
		Self {
			connection,
			pipeline,
		}
	}

	/// Process inbound messages sequentially until the session ends.
	pub async fn run(mut self) -> Result<StopReason, ConnectError> {
		loop {
			match self.connection.next_event().await? {
				| SessionEvent::Message(message) => {
					self.pipeline
						.handle(&message.topic, &message.payload)
						.await;
				}
				| SessionEvent::Stopped(reason) => return Ok(reason),
			}
		}
	}
}
