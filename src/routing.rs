//! Message routing module
//!
//! Resolves a concrete topic to a recipient set and notification
//! parameters using three independent, ordered rule lists.

// Submodules
pub mod error;
pub mod table;

// Re-export commonly used types for convenience
pub use error::RouteDefect;
pub use table::{
	Recipient, RecipientCredential, ResolvedRoute, RouteOutcome, RoutingRule,
	RoutingTable,
};
