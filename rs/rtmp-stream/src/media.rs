use bytes::Bytes;

use crate::{ChunkEmitter, ChunkStreamId, Object};

/// The kind of media carried by a sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaType {
	Audio,
	Video,
}

impl MediaType {
	pub const ALL: [MediaType; 2] = [MediaType::Audio, MediaType::Video];

	/// The chunk stream this media is written on.
	pub fn chunk_stream_id(&self) -> u16 {
		match self {
			Self::Audio => ChunkStreamId::AUDIO,
			Self::Video => ChunkStreamId::VIDEO,
		}
	}

	pub(crate) fn index(&self) -> usize {
		match self {
			Self::Audio => 0,
			Self::Video => 1,
		}
	}
}

/// The capture and encode pipeline feeding a publishing stream.
///
/// The session drives it but never produces samples itself; encoded samples come back
/// through the [SampleSink] installed with [MediaSource::bind].
pub trait MediaSource: Send + Sync + 'static {
	/// Throw away any encoder state from a previous publish.
	fn reset(&self);

	/// (Re)start capturing.
	fn start(&self);

	/// Install or remove the sink for encoded samples of the given kind.
	fn bind(&self, kind: MediaType, sink: Option<SampleSink>);

	/// Stream metadata sent as `onMetaData` once publishing starts.
	fn metadata(&self) -> Object;
}

/// The callback handed to a [MediaSource] for one media type.
///
/// Each call frames the sample and writes it to the transport immediately.
#[derive(Clone)]
pub struct SampleSink {
	kind: MediaType,
	emitter: ChunkEmitter,
}

impl SampleSink {
	pub(crate) fn new(kind: MediaType, emitter: ChunkEmitter) -> Self {
		Self { kind, emitter }
	}

	pub fn kind(&self) -> MediaType {
		self.kind
	}

	/// Write an encoded sample with its timestamp in milliseconds.
	pub fn write(&self, payload: Bytes, timestamp: f64) {
		self.emitter.emit(self.kind, payload, timestamp);
	}
}

impl std::fmt::Debug for SampleSink {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SampleSink").field("kind", &self.kind).finish()
	}
}
