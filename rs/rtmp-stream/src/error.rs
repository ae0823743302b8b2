/// Errors surfaced to callers of a [crate::Stream].
///
/// Precondition failures detected while a queued command runs are never reported here;
/// those commands are skipped and logged instead.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum Error {
	/// The session's worker has exited, so no more commands can be submitted.
	#[error("session closed")]
	Closed,

	#[error("stream already closed")]
	AlreadyClosed,

	#[error("invalid object encoding: {0}")]
	InvalidEncoding(String),
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for Error {
	fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
		Error::Closed
	}
}
