use tokio::sync::mpsc;

use crate::{Chunk, Error, Status, StreamId};

/// The connection a stream is multiplexed over.
///
/// Handshaking, chunk encoding, and message serialization all live behind this trait.
pub trait Transport: Send + Sync + 'static {
	/// Whether the connection has completed its handshake.
	fn connected(&self) -> bool;

	/// Ask the server for a new message stream.
	///
	/// The result is delivered later with [Notifier::stream_created].
	fn create_stream(&self, notifier: Notifier);

	/// Queue a chunk for transmission.
	fn write(&self, chunk: Chunk);
}

pub(crate) enum Event {
	StreamCreated(StreamId),
	Status(Status),
}

/// Delivers connection events to a stream's worker.
///
/// Events are applied in the same serial context as queued commands, so they never race
/// with them.
#[derive(Clone)]
pub struct Notifier {
	tx: mpsc::UnboundedSender<Event>,
}

impl Notifier {
	pub(crate) fn new(tx: mpsc::UnboundedSender<Event>) -> Self {
		Self { tx }
	}

	/// The server assigned a message stream id.
	pub fn stream_created(&self, id: StreamId) -> Result<(), Error> {
		self.tx.send(Event::StreamCreated(id))?;
		Ok(())
	}

	/// A status notification arrived.
	pub fn status(&self, status: Status) -> Result<(), Error> {
		self.tx.send(Event::Status(status))?;
		Ok(())
	}

	/// Wait until the stream's worker has exited.
	///
	/// The worker outlives its [crate::Stream] handles until every submitted command has run.
	pub async fn closed(&self) {
		self.tx.closed().await
	}
}
