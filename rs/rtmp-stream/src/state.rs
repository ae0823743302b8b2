use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::PlayOptions;

/// The message stream id assigned by the server, or zero until then.
pub type StreamId = u32;

/// The lifecycle of a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ReadyState {
	/// Waiting for the server to assign a stream id.
	Initialized = 0,
	Open = 1,
	/// `play` was sent but not yet acknowledged.
	Play = 2,
	Playing = 3,
	/// `publish` was sent but not yet acknowledged.
	Publish = 4,
	Publishing = 5,
	Closed = 6,
}

impl Default for ReadyState {
	fn default() -> Self {
		Self::Initialized
	}
}

/// Work that must happen when a state is entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Effect {
	/// Send `@setDataFrame("onMetaData", ..)` with the source's metadata.
	SendMetadata,
	/// Connect the media source to the chunk emitter.
	BindSamples,
	/// Disconnect the media source.
	UnbindSamples,
}

impl ReadyState {
	/// The side effects of entering this state, in order.
	///
	/// These run on every entry, including re-entering the current state.
	pub(crate) fn effects(self) -> &'static [Effect] {
		match self {
			Self::Publishing => &[Effect::SendMetadata, Effect::BindSamples],
			Self::Closed => &[Effect::UnbindSamples],
			_ => &[],
		}
	}

	/// Whether the server has assigned a stream yet.
	pub fn is_created(self) -> bool {
		self != Self::Initialized
	}

	pub fn is_closed(self) -> bool {
		self == Self::Closed
	}
}

/// What a [crate::Stream] handle can observe about its worker.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Snapshot {
	pub state: ReadyState,
	pub id: StreamId,
	pub play_options: Option<PlayOptions>,
}
