use thiserror::Error;

/// Defects found while materializing a matched rule.
///
/// A defect is not a routing miss: the rule did match, but part of its
/// value cannot be used. The affected recipient is skipped and the rest of
/// the route is still produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteDefect {
	/// A matched recipient rule names a recipient with no credential entry
	#[error(
		"recipient '{recipient}' selected by '{pattern}' has no credential \
		 entry"
	)]
	UnknownRecipient { recipient: String, pattern: String },
}

impl RouteDefect {
	/// Creates a new UnknownRecipient defect
	pub fn unknown_recipient(
		recipient: impl Into<String>,
		pattern: impl Into<String>,
	) -> Self {
		Self::UnknownRecipient {
			recipient: recipient.into(),
			pattern: pattern.into(),
		}
	}
}
