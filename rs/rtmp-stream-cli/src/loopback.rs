use std::sync::{
	Mutex,
	atomic::{AtomicBool, AtomicU64, Ordering},
};

use rtmp_stream::{
	Chunk, MediaSource, MediaType, Message, Notifier, Object, SampleSink, Status, Stream, StreamConfig, Transport,
};
use tokio::sync::watch;

/// A transport that plays the server's part in-process.
///
/// Acknowledges the connect, assigns stream id 1, acknowledges `publish`, and logs every
/// chunk instead of sending it.
#[derive(Default)]
pub struct Loopback {
	connected: AtomicBool,
	notifier: Mutex<Option<Notifier>>,
	chunks: AtomicU64,
	bytes: AtomicU64,
}

impl Loopback {
	pub const STREAM_ID: u32 = 1;

	/// Complete the handshake and tell `stream` the connection is up.
	pub fn connect(&self, stream: &Stream) -> Result<(), rtmp_stream::Error> {
		self.connected.store(true, Ordering::SeqCst);
		tracing::info!("connected");
		stream.on_status(Status::ConnectSuccess)
	}

	pub fn chunks(&self) -> u64 {
		self.chunks.load(Ordering::Relaxed)
	}

	pub fn bytes(&self) -> u64 {
		self.bytes.load(Ordering::Relaxed)
	}

	fn reply(&self, status: Status) {
		let notifier = self.notifier.lock().unwrap().clone();
		if let Some(notifier) = notifier {
			if let Err(err) = notifier.status(status) {
				tracing::warn!(%err, "stream gone");
			}
		}
	}
}

impl Transport for Loopback {
	fn connected(&self) -> bool {
		self.connected.load(Ordering::SeqCst)
	}

	fn create_stream(&self, notifier: Notifier) {
		if let Err(err) = notifier.stream_created(Self::STREAM_ID) {
			tracing::warn!(%err, "stream gone");
		}
		*self.notifier.lock().unwrap() = Some(notifier);
	}

	fn write(&self, chunk: Chunk) {
		self.chunks.fetch_add(1, Ordering::Relaxed);

		let stream = chunk.message.stream_id();
		let message_type = u8::from(chunk.message.message_type());

		match &chunk.message {
			Message::Command(msg) => {
				let arguments: Vec<String> = msg.arguments.iter().map(ToString::to_string).collect();
				tracing::info!(
					stream,
					message_type,
					command = %msg.command_name,
					arguments = %arguments.join(","),
					"command"
				);

				if msg.command_name == "publish" {
					self.reply(Status::PublishStart);
				}
			}
			Message::Data(msg) => {
				tracing::info!(stream, message_type, handler = %msg.handler_name, "data");
			}
			Message::Media(msg) => {
				self.bytes.fetch_add(msg.payload.len() as u64, Ordering::Relaxed);
				tracing::debug!(
					stream,
					kind = ?msg.kind,
					chunk_type = u8::from(chunk.chunk_type),
					timestamp = msg.timestamp,
					size = msg.payload.len(),
					"media"
				);
			}
		}
	}
}

/// Treats stdin as an already-encoded video elementary stream.
pub struct StdinSource {
	config: StreamConfig,
	fps: f64,
	video: watch::Sender<Option<SampleSink>>,
}

impl StdinSource {
	pub fn new(config: StreamConfig, fps: f64) -> Self {
		Self {
			config,
			fps,
			video: watch::Sender::new(None),
		}
	}

	/// Wait until the stream starts accepting video.
	pub async fn video(&self) -> anyhow::Result<SampleSink> {
		let mut rx = self.video.subscribe();
		let sink = rx.wait_for(Option::is_some).await?;
		sink.clone().ok_or_else(|| anyhow::anyhow!("video sink removed"))
	}
}

impl MediaSource for StdinSource {
	fn reset(&self) {
		tracing::debug!("resetting encoder");
	}

	fn start(&self) {
		tracing::debug!("starting capture");
	}

	fn bind(&self, kind: MediaType, sink: Option<SampleSink>) {
		tracing::debug!(?kind, bound = sink.is_some(), "bind");
		if kind == MediaType::Video {
			self.video.send_replace(sink);
		}
	}

	fn metadata(&self) -> Object {
		Object::new()
			.with("videocodecid", "avc1")
			.with("framerate", self.fps)
			.with("videodatarate", self.config.video_bitrate as f64 / 1000.0)
			.with("audiodatarate", self.config.audio_bitrate as f64 / 1000.0)
	}
}
