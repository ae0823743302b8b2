use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Object, Value};

/// How a `play2` request relates to whatever is currently playing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayTransition {
	Append,
	AppendAndWait,
	Reset,
	Resume,
	Stop,
	Swap,
	#[default]
	Switch,
}

impl PlayTransition {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Append => "append",
			Self::AppendAndWait => "appendAndWait",
			Self::Reset => "reset",
			Self::Resume => "resume",
			Self::Stop => "stop",
			Self::Swap => "swap",
			Self::Switch => "switch",
		}
	}
}

impl fmt::Display for PlayTransition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Options for a `play2` request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayOptions {
	pub len: f64,
	pub offset: f64,
	pub old_stream_name: String,
	pub start: f64,
	pub stream_name: String,
	pub transition: PlayTransition,
}

impl From<&PlayOptions> for Object {
	fn from(options: &PlayOptions) -> Self {
		Object::new()
			.with("len", options.len)
			.with("offset", options.offset)
			.with("oldStreamName", options.old_stream_name.as_str())
			.with("start", options.start)
			.with("streamName", options.stream_name.as_str())
			.with("transition", options.transition.as_str())
	}
}

impl From<&PlayOptions> for Value {
	fn from(options: &PlayOptions) -> Self {
		Value::Object(options.into())
	}
}

impl fmt::Display for PlayOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"RTMPStreamPlayOptions{{len:{},offset:{},oldStreamName:{},start:{},streamName:{},transition:{}}}",
			self.len, self.offset, self.old_stream_name, self.start, self.stream_name, self.transition
		)
	}
}
