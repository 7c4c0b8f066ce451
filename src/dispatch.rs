//! Notification dispatch module
//!
//! Turns a resolved route plus a message payload into one delivery-service
//! submission per recipient, isolating per-recipient failures.

// Submodules
pub mod dispatcher;
pub mod error;
pub mod pushover;
pub mod sink;

// Re-export commonly used types for convenience
pub use dispatcher::{DeliveryTuning, Dispatcher, EMERGENCY_PRIORITY};
pub use error::DeliveryError;
pub use pushover::PushoverClient;
pub use sink::{NotificationSink, PushMessage};
