use bytes::Bytes;
use derive_more::Debug;
use num_enum::IntoPrimitive;

use crate::{MediaType, ObjectEncoding, StreamId, Value};

/// The chunk header format.
///
/// [ChunkType::Zero] carries a full header with an absolute timestamp.
/// [ChunkType::One] omits the message stream id and carries a timestamp delta.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoPrimitive)]
#[repr(u8)]
pub enum ChunkType {
	Zero = 0,
	One = 1,
}

/// Well-known chunk stream ids.
pub struct ChunkStreamId;

impl ChunkStreamId {
	pub const COMMAND: u16 = 0x03;
	pub const AUDIO: u16 = 0x04;
	pub const VIDEO: u16 = 0x05;
}

/// The RTMP message type id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoPrimitive)]
#[repr(u8)]
pub enum MessageType {
	Audio = 0x08,
	Video = 0x09,
	Amf3Data = 0x0f,
	Amf3Command = 0x11,
	Amf0Data = 0x12,
	Amf0Command = 0x14,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CommandMessage {
	pub stream_id: StreamId,
	pub transaction_id: u32,
	pub object_encoding: ObjectEncoding,
	pub command_name: String,
	pub command_object: Option<Value>,
	pub arguments: Vec<Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DataMessage {
	pub stream_id: StreamId,
	pub object_encoding: ObjectEncoding,
	pub handler_name: String,
	pub arguments: Vec<Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MediaMessage {
	pub stream_id: StreamId,
	pub kind: MediaType,

	/// Milliseconds, truncated from the accumulated timestamp.
	pub timestamp: u32,

	#[debug("{} bytes", payload.len())]
	pub payload: Bytes,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Message {
	Command(CommandMessage),
	Data(DataMessage),
	Media(MediaMessage),
}

impl Message {
	pub fn message_type(&self) -> MessageType {
		match self {
			Self::Command(msg) => match msg.object_encoding {
				ObjectEncoding::Amf0 => MessageType::Amf0Command,
				ObjectEncoding::Amf3 => MessageType::Amf3Command,
			},
			Self::Data(msg) => match msg.object_encoding {
				ObjectEncoding::Amf0 => MessageType::Amf0Data,
				ObjectEncoding::Amf3 => MessageType::Amf3Data,
			},
			Self::Media(msg) => match msg.kind {
				MediaType::Audio => MessageType::Audio,
				MediaType::Video => MessageType::Video,
			},
		}
	}

	pub fn stream_id(&self) -> StreamId {
		match self {
			Self::Command(msg) => msg.stream_id,
			Self::Data(msg) => msg.stream_id,
			Self::Media(msg) => msg.stream_id,
		}
	}
}

/// A framed message handed to the transport for writing.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
	pub chunk_type: ChunkType,
	pub chunk_stream_id: u16,
	pub message: Message,
}

impl Chunk {
	/// A full-header chunk on the command chunk stream.
	pub fn new(message: Message) -> Self {
		Self {
			chunk_type: ChunkType::Zero,
			chunk_stream_id: ChunkStreamId::COMMAND,
			message,
		}
	}

	/// The command name, if this chunk carries a command.
	pub fn command_name(&self) -> Option<&str> {
		match &self.message {
			Message::Command(msg) => Some(&msg.command_name),
			_ => None,
		}
	}
}
