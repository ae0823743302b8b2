use std::str::FromStr;

use clap::{Args, ValueEnum};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use crate::Error;

/// The AMF version used for command and data message bodies.
///
/// Written as its version number, `0` or `3`, both on the command line and in config files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum ObjectEncoding {
	Amf0 = 0,
	Amf3 = 3,
}

// Not derived; num_enum would treat a `#[default]` variant as a catch-all.
impl Default for ObjectEncoding {
	fn default() -> Self {
		Self::Amf0
	}
}

impl ObjectEncoding {
	pub fn from_u8(value: u8) -> Result<Self, Error> {
		Self::try_from(value).map_err(|_| Error::InvalidEncoding(value.to_string()))
	}
}

impl FromStr for ObjectEncoding {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let value = s.parse().map_err(|_| Error::InvalidEncoding(s.to_string()))?;
		Self::from_u8(value)
	}
}

/// The second argument of a `publish` command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishType {
	#[default]
	Live,
	Record,
	Append,
}

impl PublishType {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Live => "live",
			Self::Record => "record",
			Self::Append => "append",
		}
	}
}

/// Per-stream settings.
#[derive(Args, Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct StreamConfig {
	/// The AMF version stamped on every command and data message.
	#[arg(long = "object-encoding", env = "RTMP_OBJECT_ENCODING", default_value = "0")]
	pub object_encoding: ObjectEncoding,

	/// The publish type used when none is given explicitly.
	#[arg(long = "publish-type", env = "RTMP_PUBLISH_TYPE", value_enum, default_value_t = PublishType::Live)]
	pub publish_type: PublishType,

	/// Target audio bitrate handed to the encoder pipeline, in bits per second.
	#[arg(long = "audio-bitrate", env = "RTMP_AUDIO_BITRATE", default_value_t = StreamConfig::DEFAULT_AUDIO_BITRATE)]
	pub audio_bitrate: u32,

	/// Target video bitrate handed to the encoder pipeline, in bits per second.
	#[arg(long = "video-bitrate", env = "RTMP_VIDEO_BITRATE", default_value_t = StreamConfig::DEFAULT_VIDEO_BITRATE)]
	pub video_bitrate: u32,
}

impl StreamConfig {
	pub const DEFAULT_AUDIO_BITRATE: u32 = 32 * 1024;
	pub const DEFAULT_VIDEO_BITRATE: u32 = 160 * 1000;
}

impl Default for StreamConfig {
	fn default() -> Self {
		Self {
			object_encoding: ObjectEncoding::default(),
			publish_type: PublishType::default(),
			audio_bitrate: Self::DEFAULT_AUDIO_BITRATE,
			video_bitrate: Self::DEFAULT_VIDEO_BITRATE,
		}
	}
}
