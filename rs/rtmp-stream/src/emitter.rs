use std::sync::Arc;

use bytes::Bytes;
use web_async::Lock;

use crate::{Chunk, ChunkType, MediaMessage, MediaType, Message, StreamId, Transport};

/// Which media types have had a chunk sent since the last publish.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChunkTypeTable([bool; 2]);

impl ChunkTypeTable {
	pub fn sent(&self, kind: MediaType) -> bool {
		self.0[kind.index()]
	}

	/// The header for the next chunk of this type: full for the first, incremental after.
	pub fn next(&self, kind: MediaType) -> ChunkType {
		match self.sent(kind) {
			false => ChunkType::Zero,
			true => ChunkType::One,
		}
	}

	pub fn mark(&mut self, kind: MediaType) {
		self.0[kind.index()] = true;
	}

	pub fn clear(&mut self) {
		self.0 = [false; 2];
	}

	pub fn is_empty(&self) -> bool {
		!self.0.iter().any(|sent| *sent)
	}
}

/// Per-type running timestamp that keeps the fractional milliseconds the wire drops.
///
/// Each sample is written with the integer part of the *previous* accumulated value,
/// then the accumulator becomes the new timestamp plus the previous fractional remainder.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TimestampAccumulator([f64; 2]);

impl TimestampAccumulator {
	pub fn current(&self, kind: MediaType) -> f64 {
		self.0[kind.index()]
	}

	/// Returns the wire timestamp for this sample and advances the accumulator.
	pub fn advance(&mut self, kind: MediaType, timestamp: f64) -> u32 {
		let previous = self.0[kind.index()];
		self.0[kind.index()] = timestamp + (previous - previous.floor());
		previous as u32
	}
}

#[derive(Default)]
struct EmitterState {
	stream_id: StreamId,
	chunk_types: ChunkTypeTable,
	timestamps: TimestampAccumulator,
}

/// Frames encoded samples and writes them to the transport.
///
/// Samples arrive on the media source's threads; framing is serialized by an internal lock
/// so the first chunk of each type is always the one written with a full header.
#[derive(Clone)]
pub struct ChunkEmitter {
	transport: Arc<dyn Transport>,
	state: Lock<EmitterState>,
}

impl ChunkEmitter {
	pub(crate) fn new(transport: Arc<dyn Transport>) -> Self {
		Self {
			transport,
			state: Default::default(),
		}
	}

	/// Start a new publish on the given stream; the next chunk of each type gets a full header.
	///
	/// Timestamps are intentionally carried across publishes.
	pub(crate) fn reset(&self, stream_id: StreamId) {
		let mut state = self.state.lock();
		state.stream_id = stream_id;
		state.chunk_types.clear();
	}

	pub fn emit(&self, kind: MediaType, payload: Bytes, timestamp: f64) {
		let mut state = self.state.lock();

		let chunk_type = state.chunk_types.next(kind);
		let wire = state.timestamps.advance(kind, timestamp);

		tracing::trace!(?kind, ?chunk_type, timestamp = wire, size = payload.len(), "emitting chunk");

		self.transport.write(Chunk {
			chunk_type,
			chunk_stream_id: kind.chunk_stream_id(),
			message: Message::Media(MediaMessage {
				stream_id: state.stream_id,
				kind,
				timestamp: wire,
				payload,
			}),
		});

		state.chunk_types.mark(kind);
	}

	pub fn chunk_types(&self) -> ChunkTypeTable {
		self.state.lock().chunk_types
	}

	pub fn timestamps(&self) -> TimestampAccumulator {
		self.state.lock().timestamps
	}
}
