//! # mqtt-push-bridge
//!
//! A bridge daemon that subscribes to an MQTT broker and forwards
//! matching messages as Pushover push notifications.
//!
//! ## Features
//!
//! - **Pattern-based Routing**: MQTT wildcard patterns (`+`, `#`) select
//!   recipients, titles and priorities per topic, first listed match wins
//! - **Independent Rule Categories**: a topic may pick a recipient rule
//!   but fall back to provider defaults for title or priority
//! - **Resilient Session**: fixed-delay reconnect after unexpected drops,
//!   persistent subscriptions, optional last-will registration
//! - **Graceful Shutdown**: SIGTERM/SIGINT close the broker session
//!   cleanly before the process exits
//! - **Failure Isolation**: one unreachable recipient or one rejected
//!   notification never stops the rest of the traffic
//!
//! ## How a message travels
//!
//! The connection manager owns the single broker session and surfaces
//! inbound messages one at a time. For each message the routing table is
//! scanned in configured order; the first matching recipient rule selects
//! who gets notified, while title and priority rules resolve on their
//! own. The dispatcher then submits one notification per recipient to the
//! Pushover API, attaching the configured retry/expiry shaping.
//!
//! Topics with no matching recipient rule are dropped silently; that is
//! the normal filtering path, not an error.

#![warn(missing_docs)]

// Core modules
pub mod bridge;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod routing;
pub mod topic;

// === Core Public API ===
pub use bridge::{Bridge, MessagePipeline};
pub use config::{BridgeConfig, ConfigError};
pub use connection::{ConnectionManager, ConnectionState, StopReason};
pub use dispatch::{
	DeliveryTuning, Dispatcher, NotificationSink, PushMessage, PushoverClient,
};
pub use routing::{RouteOutcome, RoutingTable};
pub use topic::{TopicPattern, TopicPatternError};
