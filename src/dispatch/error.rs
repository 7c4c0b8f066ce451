use thiserror::Error;

/// Errors for a single notification submission.
///
/// These never propagate past the dispatcher; a failed submission is
/// logged and the remaining recipients are still attempted.
#[derive(Error, Debug)]
pub enum DeliveryError {
	/// Transport-level failure, including the enforced request timeout
	#[error("request failed: {0}")]
	Request(#[from] reqwest::Error),

	/// The provider answered with a non-success status
	#[error("provider rejected notification: status {status}")]
	Rejected { status: u16, body: String },
}

impl DeliveryError {
	/// Creates a new Rejected error
	pub fn rejected(status: u16, body: impl Into<String>) -> Self {
		Self::Rejected {
			status,
			body: body.into(),
		}
	}
}
