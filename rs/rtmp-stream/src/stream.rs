use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use crate::{
	Chunk, ChunkEmitter, ChunkTypeTable, DataMessage, Error, MediaSource, Message, Notifier, PlayOptions,
	PublishType, ReadyState, Status, StreamConfig, StreamId, Transport, Value,
	playback::PlaybackGate,
	queue::{Command, Queue},
	state::Snapshot,
};

/// A single audio/video stream multiplexed over a [Transport].
///
/// Every control operation except [Stream::send] is queued and executed in submission order
/// by a background task, so callers on any thread return immediately and the transport sees
/// commands in the order they were issued. Preconditions (for example, `seek` only while
/// playing) are checked when the command runs, and a command that fails them is dropped.
///
/// Must be created inside a tokio runtime.
pub struct Stream {
	commands: mpsc::UnboundedSender<Command>,
	notifier: Notifier,
	transport: Arc<dyn Transport>,
	emitter: ChunkEmitter,
	playback: PlaybackGate,
	snapshot: watch::Receiver<Snapshot>,
	config: StreamConfig,
}

impl Stream {
	pub fn new(transport: Arc<dyn Transport>, source: Arc<dyn MediaSource>, config: StreamConfig) -> Self {
		let (commands_tx, commands_rx) = mpsc::unbounded_channel();
		let (events_tx, events_rx) = mpsc::unbounded_channel();
		let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());

		let notifier = Notifier::new(events_tx);
		let emitter = ChunkEmitter::new(transport.clone());
		let playback = PlaybackGate::default();

		let queue = Queue::new(
			transport.clone(),
			source,
			emitter.clone(),
			notifier.clone(),
			playback.clone(),
			config.clone(),
			snapshot_tx,
		);
		web_async::spawn(queue.run(commands_rx, events_rx));

		if transport.connected() {
			transport.create_stream(notifier.clone());
		}

		Self {
			commands: commands_tx,
			notifier,
			transport,
			emitter,
			playback,
			snapshot: snapshot_rx,
			config,
		}
	}

	/// A handle the transport uses to deliver events for this stream.
	pub fn notifier(&self) -> Notifier {
		self.notifier.clone()
	}

	/// Deliver a status notification received by the connection.
	pub fn on_status(&self, status: Status) -> Result<(), Error> {
		self.notifier.status(status)
	}

	/// Start playing; the arguments are sent as-is.
	///
	/// Waits for stream creation before sending.
	pub fn play(&self, arguments: Vec<Value>) -> Result<(), Error> {
		self.submit(Command::Play(arguments))
	}

	/// Send `play2` with the given options, remembering them on the stream.
	pub fn play2(&self, options: PlayOptions) -> Result<(), Error> {
		self.submit(Command::Play2(options))
	}

	/// Publish under `name` using the configured publish type.
	pub fn publish<'a>(&self, name: impl Into<Option<&'a str>>) -> Result<(), Error> {
		self.publish_with_type(name, self.config.publish_type)
	}

	/// Publish under `name`. A missing name does nothing.
	///
	/// Waits for stream creation, then resets the media source and sends `publish`.
	/// Samples start flowing once the server replies with `NetStream.Publish.Start`.
	pub fn publish_with_type<'a>(&self, name: impl Into<Option<&'a str>>, kind: PublishType) -> Result<(), Error> {
		self.submit(Command::Publish {
			name: name.into().map(str::to_string),
			kind,
		})
	}

	/// Seek to `offset` milliseconds. Ignored unless playing.
	pub fn seek(&self, offset: f64) -> Result<(), Error> {
		self.submit(Command::Seek(offset))
	}

	/// Ignored unless playing.
	pub fn receive_audio(&self, flag: bool) -> Result<(), Error> {
		self.submit(Command::ReceiveAudio(flag))
	}

	/// Ignored unless playing.
	pub fn receive_video(&self, flag: bool) -> Result<(), Error> {
		self.submit(Command::ReceiveVideo(flag))
	}

	/// Delete the stream on the server and stop sampling. Does nothing if already closed.
	///
	/// Runs after every previously submitted command.
	pub fn close(&self) -> Result<(), Error> {
		self.submit(Command::Close)
	}

	/// Send a data message immediately, bypassing the command queue.
	///
	/// This is not ordered with respect to queued commands that have not run yet.
	pub fn send(&self, handler: &str, arguments: Vec<Value>) -> Result<(), Error> {
		let (state, id) = {
			let snapshot = self.snapshot.borrow();
			(snapshot.state, snapshot.id)
		};

		if state.is_closed() {
			tracing::debug!(stream = id, handler, "not sending, stream closed");
			return Err(Error::AlreadyClosed);
		}

		self.transport.write(Chunk::new(Message::Data(DataMessage {
			stream_id: id,
			object_encoding: self.config.object_encoding,
			handler_name: handler.to_string(),
			arguments,
		})));

		Ok(())
	}

	/// Wait until every command submitted before this call has run.
	pub async fn flushed(&self) -> Result<(), Error> {
		let (tx, rx) = oneshot::channel();
		self.submit(Command::Flush(tx))?;
		rx.await.map_err(|_| Error::Closed)
	}

	/// Whether a decoded video frame should be rendered now.
	///
	/// After `play`, frames are held back until the first keyframe.
	pub fn accept_video(&self, keyframe: bool, ready_for_more: bool) -> bool {
		self.playback.accept(keyframe, ready_for_more)
	}

	pub fn ready_state(&self) -> ReadyState {
		self.snapshot.borrow().state
	}

	pub fn stream_id(&self) -> StreamId {
		self.snapshot.borrow().id
	}

	/// The options from the most recent `play2`.
	pub fn play_options(&self) -> Option<PlayOptions> {
		self.snapshot.borrow().play_options.clone()
	}

	pub fn chunk_types(&self) -> ChunkTypeTable {
		self.emitter.chunk_types()
	}

	pub fn config(&self) -> &StreamConfig {
		&self.config
	}

	fn submit(&self, command: Command) -> Result<(), Error> {
		self.commands.send(command)?;
		Ok(())
	}
}

#[cfg(test)]
mod test {
	use std::sync::Mutex;

	use bytes::Bytes;

	use super::*;
	use crate::{
		ChunkStreamId, ChunkType, CommandMessage, MediaType, PlayTransition,
		mock::{MockSource, MockTransport, SourceEvent},
	};

	fn command(chunk: &Chunk) -> &CommandMessage {
		match &chunk.message {
			Message::Command(msg) => msg,
			other => panic!("expected command, got {other:?}"),
		}
	}

	fn data(chunk: &Chunk) -> &DataMessage {
		match &chunk.message {
			Message::Data(msg) => msg,
			other => panic!("expected data, got {other:?}"),
		}
	}

	// A stream whose id has been assigned.
	async fn created() -> (Arc<MockTransport>, Arc<MockSource>, Stream) {
		let transport = MockTransport::connected();
		let source = MockSource::new();
		let stream = Stream::new(transport.clone(), source.clone(), StreamConfig::default());

		transport.notifier().stream_created(1).unwrap();
		stream.flushed().await.unwrap();
		assert_eq!(stream.ready_state(), ReadyState::Open);

		(transport, source, stream)
	}

	async fn playing() -> (Arc<MockTransport>, Arc<MockSource>, Stream) {
		let (transport, source, stream) = created().await;
		stream.play(vec!["cam1".into()]).unwrap();
		stream.flushed().await.unwrap();

		// Events can overtake queued commands, so only acknowledge once `play` has run.
		stream.on_status(Status::PlayStart).unwrap();
		stream.flushed().await.unwrap();
		assert_eq!(stream.ready_state(), ReadyState::Playing);

		(transport, source, stream)
	}

	#[tokio::test(start_paused = true)]
	async fn test_publish_lifecycle() {
		let transport = MockTransport::connected();
		let source = MockSource::new();
		let stream = Stream::new(transport.clone(), source.clone(), StreamConfig::default());
		assert_eq!(transport.create_requests(), 1);

		stream.on_status(Status::ConnectSuccess).unwrap();
		stream.flushed().await.unwrap();
		assert_eq!(stream.ready_state(), ReadyState::Initialized);
		assert_eq!(transport.create_requests(), 2);

		// Parked until the stream exists.
		stream.publish("cam1").unwrap();
		tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
		assert!(transport.chunks().is_empty());
		assert!(source.events().is_empty());

		transport.notifier().stream_created(1).unwrap();
		stream.flushed().await.unwrap();

		assert_eq!(stream.ready_state(), ReadyState::Publish);
		assert_eq!(stream.stream_id(), 1);
		assert!(stream.chunk_types().is_empty());
		assert_eq!(source.events(), [SourceEvent::Reset, SourceEvent::Start]);

		let chunks = transport.chunks();
		assert_eq!(chunks.len(), 1);
		assert_eq!(chunks[0].chunk_type, ChunkType::Zero);
		assert_eq!(chunks[0].chunk_stream_id, ChunkStreamId::AUDIO);
		let publish = command(&chunks[0]);
		assert_eq!(publish.command_name, "publish");
		assert_eq!(publish.stream_id, 1);
		assert_eq!(publish.transaction_id, 0);
		assert_eq!(publish.arguments, [Value::from("cam1"), Value::from("live")]);

		stream.on_status(Status::PublishStart).unwrap();
		stream.flushed().await.unwrap();
		assert_eq!(stream.ready_state(), ReadyState::Publishing);

		let chunks = transport.chunks();
		assert_eq!(chunks.len(), 2);
		let metadata = data(&chunks[1]);
		assert_eq!(metadata.handler_name, "@setDataFrame");
		assert_eq!(metadata.arguments[0], Value::from("onMetaData"));
		match &metadata.arguments[1] {
			Value::Object(obj) => assert_eq!(obj.get("width"), Some(&Value::Number(1280.0))),
			other => panic!("expected metadata object, got {other:?}"),
		}

		assert_eq!(
			&source.events()[2..],
			[
				SourceEvent::Bind(MediaType::Audio, true),
				SourceEvent::Bind(MediaType::Video, true)
			]
		);
	}

	#[tokio::test]
	async fn test_samples_after_publish() {
		let (transport, source, stream) = created().await;
		stream.publish("cam1").unwrap();
		stream.flushed().await.unwrap();
		stream.on_status(Status::PublishStart).unwrap();
		stream.flushed().await.unwrap();

		let video = source.sink(MediaType::Video).unwrap();
		let audio = source.sink(MediaType::Audio).unwrap();
		assert_eq!(video.kind(), MediaType::Video);

		video.write(Bytes::from_static(b"key"), 33.4);
		audio.write(Bytes::from_static(b"aac"), 23.2);
		video.write(Bytes::from_static(b"delta"), 33.4);

		let media: Vec<_> = transport
			.chunks()
			.into_iter()
			.filter_map(|chunk| match chunk.message {
				Message::Media(msg) => Some((chunk.chunk_type, msg.kind, msg.timestamp, msg.stream_id)),
				_ => None,
			})
			.collect();

		assert_eq!(
			media,
			[
				(ChunkType::Zero, MediaType::Video, 0, 1),
				(ChunkType::Zero, MediaType::Audio, 0, 1),
				(ChunkType::One, MediaType::Video, 33, 1),
			]
		);

		let table = stream.chunk_types();
		assert!(table.sent(MediaType::Audio) && table.sent(MediaType::Video));

		// A new publish starts over with full headers.
		stream.publish("cam2").unwrap();
		stream.flushed().await.unwrap();
		assert!(stream.chunk_types().is_empty());
		assert_eq!(stream.ready_state(), ReadyState::Publish);

		video.write(Bytes::from_static(b"key"), 33.4);
		let last = transport.chunks().pop().unwrap();
		assert_eq!(last.chunk_type, ChunkType::Zero);
	}

	#[tokio::test]
	async fn test_publish_without_name() {
		let transport = MockTransport::new();
		let source = MockSource::new();
		let stream = Stream::new(transport.clone(), source.clone(), StreamConfig::default());

		// Does not wait for the stream, there is nothing to do.
		stream.publish(None::<&str>).unwrap();
		stream.flushed().await.unwrap();

		assert!(transport.chunks().is_empty());
		assert!(source.events().is_empty());
		assert_eq!(stream.ready_state(), ReadyState::Initialized);
	}

	#[tokio::test]
	async fn test_publish_type() {
		let (transport, _source, stream) = created().await;
		stream.publish_with_type("cam1", PublishType::Record).unwrap();
		stream.flushed().await.unwrap();

		let chunks = transport.chunks();
		assert_eq!(command(&chunks[0]).arguments[1], Value::from("record"));
	}

	#[tokio::test]
	async fn test_not_connected() {
		let transport = MockTransport::new();
		let stream = Stream::new(transport.clone(), MockSource::new(), StreamConfig::default());
		assert_eq!(transport.create_requests(), 0);

		stream.on_status(Status::ConnectSuccess).unwrap();
		stream.on_status(Status::Unknown("NetConnection.Connect.Closed".into())).unwrap();
		stream.flushed().await.unwrap();
		assert_eq!(transport.create_requests(), 1);
		assert_eq!(stream.ready_state(), ReadyState::Initialized);
	}

	#[tokio::test]
	async fn test_ignored_unless_playing() {
		let (transport, _source, stream) = created().await;

		stream.seek(1000.0).unwrap();
		stream.receive_audio(false).unwrap();
		stream.receive_video(false).unwrap();
		stream.flushed().await.unwrap();
		assert!(transport.chunks().is_empty());

		stream.play(vec!["cam1".into(), (-2.0).into()]).unwrap();
		stream.seek(1000.0).unwrap();
		stream.flushed().await.unwrap();
		assert_eq!(stream.ready_state(), ReadyState::Play);
		assert_eq!(transport.commands(), ["play"]);

		stream.on_status(Status::PlayStart).unwrap();
		stream.seek(1000.0).unwrap();
		stream.receive_audio(false).unwrap();
		stream.receive_video(true).unwrap();
		stream.flushed().await.unwrap();

		assert_eq!(transport.commands(), ["play", "seek", "receiveAudio", "receiveVideo"]);

		let chunks = transport.chunks();
		assert_eq!(command(&chunks[0]).arguments, [Value::from("cam1"), Value::Number(-2.0)]);
		assert_eq!(command(&chunks[1]).arguments, [Value::Number(1000.0)]);
		assert_eq!(command(&chunks[2]).arguments, [Value::Bool(false)]);
		assert_eq!(command(&chunks[3]).arguments, [Value::Bool(true)]);
		assert!(chunks.iter().all(|c| c.chunk_stream_id == ChunkStreamId::COMMAND));
	}

	#[tokio::test]
	async fn test_play2() {
		let (transport, _source, stream) = created().await;
		let options = PlayOptions {
			stream_name: "cam2".into(),
			old_stream_name: "cam1".into(),
			transition: PlayTransition::Swap,
			..Default::default()
		};

		stream.play2(options.clone()).unwrap();
		stream.flushed().await.unwrap();

		assert_eq!(stream.play_options(), Some(options.clone()));
		let chunks = transport.chunks();
		let play2 = command(&chunks[0]);
		assert_eq!(play2.command_name, "play2");
		assert_eq!(play2.arguments, [Value::from(&options)]);
	}

	#[tokio::test]
	async fn test_close() {
		let (transport, source, stream) = playing().await;

		stream.close().unwrap();
		stream.close().unwrap();
		stream.seek(10.0).unwrap();
		stream.flushed().await.unwrap();

		assert_eq!(stream.ready_state(), ReadyState::Closed);
		assert_eq!(transport.commands(), ["play", "deleteStream"]);

		let chunks = transport.chunks();
		assert_eq!(chunks[1].chunk_stream_id, ChunkStreamId::AUDIO);
		assert_eq!(command(&chunks[1]).arguments, [Value::Number(1.0)]);
		assert_eq!(
			source.events(),
			[
				SourceEvent::Bind(MediaType::Audio, false),
				SourceEvent::Bind(MediaType::Video, false)
			]
		);

		// Late acknowledgements don't reopen a closed stream.
		stream.on_status(Status::PublishStart).unwrap();
		stream.flushed().await.unwrap();
		assert_eq!(stream.ready_state(), ReadyState::Closed);

		assert_eq!(stream.send("onTextData", vec!["hi".into()]), Err(Error::AlreadyClosed));
		assert_eq!(transport.chunks().len(), 2);
	}

	#[tokio::test]
	async fn test_send_bypasses_queue() {
		let transport = MockTransport::new();
		let stream = Stream::new(transport.clone(), MockSource::new(), StreamConfig::default());

		// The publish is stuck waiting for the stream; the send is not.
		stream.publish("cam1").unwrap();
		stream.send("onCuePoint", vec![Value::from(1.5)]).unwrap();

		let chunks = transport.chunks();
		assert_eq!(chunks.len(), 1);
		let msg = data(&chunks[0]);
		assert_eq!(msg.handler_name, "onCuePoint");
		assert_eq!(msg.stream_id, 0);
		assert_eq!(chunks[0].chunk_stream_id, ChunkStreamId::COMMAND);
	}

	#[tokio::test]
	async fn test_object_encoding() {
		let transport = MockTransport::connected();
		let config = StreamConfig {
			object_encoding: crate::ObjectEncoding::Amf3,
			..Default::default()
		};
		let stream = Stream::new(transport.clone(), MockSource::new(), config);
		transport.notifier().stream_created(3).unwrap();
		stream.publish("cam1").unwrap();
		stream.send("onTextData", vec![]).unwrap();
		stream.flushed().await.unwrap();

		for chunk in transport.chunks() {
			assert_eq!(
				u8::from(chunk.message.message_type()) & 0x0f,
				match chunk.message {
					Message::Command(_) => 0x01,
					_ => 0x0f,
				}
			);
		}
	}

	#[tokio::test]
	async fn test_accept_video() {
		let (_transport, _source, stream) = playing().await;

		assert!(!stream.accept_video(false, true));
		assert!(stream.accept_video(true, true));
		assert!(!stream.accept_video(false, false));

		stream.play(vec!["cam2".into()]).unwrap();
		stream.flushed().await.unwrap();
		assert!(!stream.accept_video(false, true));
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn test_concurrent_ordering() {
		let (transport, _source, stream) = playing().await;
		let stream = Arc::new(stream);

		// Record the order in which commands were actually submitted.
		let submitted = Arc::new(Mutex::new(Vec::new()));

		let threads: Vec<_> = (0..4)
			.map(|thread| {
				let stream = stream.clone();
				let submitted = submitted.clone();
				std::thread::spawn(move || {
					for i in 0..50 {
						let offset = (thread * 1000 + i) as f64;
						let mut submitted = submitted.lock().unwrap();
						stream.seek(offset).unwrap();
						submitted.push(offset);
					}
				})
			})
			.collect();

		for thread in threads {
			thread.join().unwrap();
		}

		stream.flushed().await.unwrap();

		let observed: Vec<f64> = transport
			.chunks()
			.iter()
			.filter(|chunk| chunk.command_name() == Some("seek"))
			.map(|chunk| match command(chunk).arguments[0] {
				Value::Number(offset) => offset,
				_ => panic!("seek offset should be a number"),
			})
			.collect();

		assert_eq!(observed.len(), 200);
		assert_eq!(observed, *submitted.lock().unwrap());
	}

	#[tokio::test]
	async fn test_drop_runs_parked_commands() {
		let transport = MockTransport::new();
		let stream = Stream::new(transport.clone(), MockSource::new(), StreamConfig::default());
		stream.on_status(Status::ConnectSuccess).unwrap();
		stream.flushed().await.unwrap();
		let notifier = transport.notifier();

		stream.publish("cam1").unwrap();
		stream.close().unwrap();
		drop(stream);

		// The worker is still waiting for the stream id.
		tokio::task::yield_now().await;
		assert!(transport.commands().is_empty());

		notifier.stream_created(1).unwrap();
		notifier.closed().await;
		assert_eq!(transport.commands(), ["publish", "deleteStream"]);
	}

	#[tokio::test]
	async fn test_drop_exits_when_idle() {
		let (transport, _source, stream) = created().await;
		let notifier = transport.notifier();

		stream.close().unwrap();
		drop(stream);

		notifier.closed().await;
		assert_eq!(transport.commands(), ["deleteStream"]);
		assert_eq!(notifier.stream_created(2), Err(Error::Closed));
	}

	#[derive(Clone, Copy, Debug)]
	enum Op {
		Play,
		Publish,
		ReceiveVideo,
		Seek,
		Close,
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn test_concurrent_ordering_while_parked() {
		let transport = MockTransport::new();
		let stream = Stream::new(transport.clone(), MockSource::new(), StreamConfig::default());
		stream.on_status(Status::ConnectSuccess).unwrap();
		stream.flushed().await.unwrap();

		// Everything submitted below queues up behind this.
		stream.publish("cam0").unwrap();

		let stream = Arc::new(stream);
		let submitted = Arc::new(Mutex::new(vec![Op::Publish]));
		let ops = [Op::Play, Op::Publish, Op::ReceiveVideo, Op::Seek, Op::Close];

		let threads: Vec<_> = (0..4)
			.map(|thread| {
				let stream = stream.clone();
				let submitted = submitted.clone();
				std::thread::spawn(move || {
					for i in 0..25 {
						let op = ops[(thread + i) % ops.len()];
						let mut submitted = submitted.lock().unwrap();
						let result = match op {
							Op::Play => stream.play(vec![]),
							Op::Publish => stream.publish("cam1"),
							Op::ReceiveVideo => stream.receive_video(true),
							Op::Seek => stream.seek(i as f64),
							Op::Close => stream.close(),
						};
						result.unwrap();
						submitted.push(op);
					}
				})
			})
			.collect();

		for thread in threads {
			thread.join().unwrap();
		}

		// Nothing is written before the stream exists.
		assert!(transport.chunks().is_empty());
		assert_eq!(stream.ready_state(), ReadyState::Initialized);

		transport.notifier().stream_created(1).unwrap();
		stream.flushed().await.unwrap();

		// Never playing, so seek and receiveVideo are dropped. A close only writes when the
		// stream is not already closed.
		let mut closed = false;
		let expected: Vec<&str> = submitted
			.lock()
			.unwrap()
			.iter()
			.filter_map(|op| match op {
				Op::Play => {
					closed = false;
					Some("play")
				}
				Op::Publish => {
					closed = false;
					Some("publish")
				}
				Op::Close if !closed => {
					closed = true;
					Some("deleteStream")
				}
				_ => None,
			})
			.collect();

		assert_eq!(expected.iter().filter(|name| **name == "publish").count(), 21);
		assert_eq!(transport.commands(), expected);
	}
}
