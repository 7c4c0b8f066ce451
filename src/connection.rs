//! Broker connection lifecycle module
//!
//! Owns the single MQTT session for the process: initial connect with
//! unbounded fixed-delay retry, subscription establishment, last-will
//! registration, disconnect classification and signal-driven shutdown
//! with guaranteed session teardown.

// Submodules
pub mod error;
pub mod last_will;
pub mod manager;
pub mod state;

// Re-export commonly used types for convenience
pub use error::ConnectError;
pub use last_will::WillMessage;
pub use manager::{
	BrokerSettings, ConnectionManager, InboundMessage, SessionEvent,
	StopReason,
};
pub use state::{ConnectionState, SessionAction, SessionTracker};
