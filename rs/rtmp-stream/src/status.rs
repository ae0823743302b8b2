use serde::Deserialize;

/// A status notification delivered by the connection.
///
/// Only the codes the session reacts to get their own variant.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "StatusInfo")]
pub enum Status {
	/// `NetConnection.Connect.Success`
	ConnectSuccess,
	/// `NetStream.Publish.Start`
	PublishStart,
	/// `NetStream.Play.Start`
	PlayStart,
	Unknown(String),
}

impl Status {
	pub const CONNECT_SUCCESS: &str = "NetConnection.Connect.Success";
	pub const PUBLISH_START: &str = "NetStream.Publish.Start";
	pub const PLAY_START: &str = "NetStream.Play.Start";

	pub fn from_code(code: &str) -> Self {
		match code {
			Self::CONNECT_SUCCESS => Self::ConnectSuccess,
			Self::PUBLISH_START => Self::PublishStart,
			Self::PLAY_START => Self::PlayStart,
			other => Self::Unknown(other.to_string()),
		}
	}

	pub fn code(&self) -> &str {
		match self {
			Self::ConnectSuccess => Self::CONNECT_SUCCESS,
			Self::PublishStart => Self::PUBLISH_START,
			Self::PlayStart => Self::PLAY_START,
			Self::Unknown(code) => code,
		}
	}
}

// The on-the-wire shape; `level` and `description` are ignored.
#[derive(Deserialize)]
struct StatusInfo {
	code: String,
}

impl From<StatusInfo> for Status {
	fn from(info: StatusInfo) -> Self {
		Self::from_code(&info.code)
	}
}
