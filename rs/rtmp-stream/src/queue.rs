use std::{collections::VecDeque, sync::Arc};

use tokio::sync::{mpsc, oneshot, watch};

use crate::{
	Chunk, ChunkEmitter, ChunkStreamId, ChunkType, CommandMessage, DataMessage, MediaSource, MediaType, Message,
	Notifier, PlayOptions, PublishType, ReadyState, SampleSink, Status, StreamConfig, StreamId, Value,
	playback::PlaybackGate,
	state::{Effect, Snapshot},
	transport::{Event, Transport},
};

/// A unit of work submitted by a [crate::Stream] handle.
#[derive(Debug)]
pub(crate) enum Command {
	Play(Vec<Value>),
	Play2(PlayOptions),
	Publish { name: Option<String>, kind: PublishType },
	Seek(f64),
	ReceiveAudio(bool),
	ReceiveVideo(bool),
	Close,
	Flush(oneshot::Sender<()>),
}

impl Command {
	// Commands that cannot run until the server has assigned a stream id.
	fn needs_stream(&self) -> bool {
		match self {
			Self::Play(_) | Self::Play2(_) => true,
			Self::Publish { name, .. } => name.is_some(),
			_ => false,
		}
	}
}

/// The single writer for one stream.
///
/// Owns the ready state and stream id; every queued command and every connection event is
/// applied here, one at a time, in the order received.
pub(crate) struct Queue {
	transport: Arc<dyn Transport>,
	source: Arc<dyn MediaSource>,
	emitter: ChunkEmitter,
	notifier: Notifier,
	playback: PlaybackGate,
	config: StreamConfig,

	state: ReadyState,
	id: StreamId,
	play_options: Option<PlayOptions>,

	snapshot: watch::Sender<Snapshot>,
}

impl Queue {
	pub fn new(
		transport: Arc<dyn Transport>,
		source: Arc<dyn MediaSource>,
		emitter: ChunkEmitter,
		notifier: Notifier,
		playback: PlaybackGate,
		config: StreamConfig,
		snapshot: watch::Sender<Snapshot>,
	) -> Self {
		Self {
			transport,
			source,
			emitter,
			notifier,
			playback,
			config,
			state: ReadyState::Initialized,
			id: 0,
			play_options: None,
			snapshot,
		}
	}

	/// Run until every [crate::Stream] handle is dropped and every submitted command has run.
	///
	/// Commands still parked when the handles go away keep waiting for the stream to be created.
	pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>, mut events: mpsc::UnboundedReceiver<Event>) {
		// Commands parked behind one that is waiting for the stream to be created.
		let mut backlog = VecDeque::new();
		let mut submitting = true;

		loop {
			tokio::select! {
				biased;
				Some(event) = events.recv() => self.recv_event(event),
				command = commands.recv(), if submitting => match command {
					Some(command) => backlog.push_back(command),
					None => submitting = false,
				},
				else => break,
			}

			while let Some(command) = backlog.front() {
				if command.needs_stream() && !self.state.is_created() {
					tracing::debug!(?command, "waiting for stream creation");
					break;
				}

				if let Some(command) = backlog.pop_front() {
					self.run_command(command);
				}
			}

			if !submitting && backlog.is_empty() {
				break;
			}
		}

		tracing::debug!(stream = self.id, pending = backlog.len(), "stream dropped");
	}

	fn recv_event(&mut self, event: Event) {
		match event {
			Event::StreamCreated(id) => {
				tracing::debug!(stream = id, "stream created");
				self.id = id;
				if self.state.is_created() {
					// A late reply; keep the id but leave the lifecycle alone.
					self.publish_snapshot();
				} else {
					self.enter(ReadyState::Open);
				}
			}
			Event::Status(Status::ConnectSuccess) => {
				self.enter(ReadyState::Initialized);
				self.transport.create_stream(self.notifier.clone());
			}
			Event::Status(Status::PublishStart) if !self.state.is_closed() => self.enter(ReadyState::Publishing),
			Event::Status(Status::PlayStart) if self.state == ReadyState::Play => self.enter(ReadyState::Playing),
			Event::Status(status) => tracing::trace!(code = status.code(), state = ?self.state, "ignoring status"),
		}
	}

	fn run_command(&mut self, command: Command) {
		match command {
			Command::Play(arguments) => {
				self.playback.disarm();
				self.write_command(ChunkStreamId::COMMAND, "play", arguments);
				self.enter(ReadyState::Play);
			}
			Command::Play2(options) => {
				let arguments = vec![Value::from(&options)];
				self.play_options = Some(options);
				self.publish_snapshot();
				self.write_command(ChunkStreamId::COMMAND, "play2", arguments);
			}
			Command::Publish { name: None, .. } => tracing::debug!("publish without a name"),
			Command::Publish { name: Some(name), kind } => {
				self.source.reset();
				self.emitter.reset(self.id);
				self.source.start();
				self.write_command(ChunkStreamId::AUDIO, "publish", vec![name.into(), kind.as_str().into()]);
				self.enter(ReadyState::Publish);
			}
			Command::Seek(offset) => self.write_playing("seek", offset.into()),
			Command::ReceiveAudio(flag) => self.write_playing("receiveAudio", flag.into()),
			Command::ReceiveVideo(flag) => self.write_playing("receiveVideo", flag.into()),
			Command::Close => {
				if self.state.is_closed() {
					tracing::debug!(stream = self.id, "already closed");
					return;
				}

				self.write_command(ChunkStreamId::AUDIO, "deleteStream", vec![self.id.into()]);
				self.enter(ReadyState::Closed);
			}
			Command::Flush(done) => {
				let _ = done.send(());
			}
		}
	}

	// Commands that only make sense while playing are silently dropped otherwise.
	fn write_playing(&mut self, name: &str, argument: Value) {
		if self.state != ReadyState::Playing {
			tracing::debug!(command = name, state = ?self.state, "ignoring command, not playing");
			return;
		}

		self.write_command(ChunkStreamId::COMMAND, name, vec![argument]);
	}

	fn write_command(&mut self, chunk_stream_id: u16, name: &str, arguments: Vec<Value>) {
		tracing::debug!(stream = self.id, command = name, "sending command");

		self.transport.write(Chunk {
			chunk_type: ChunkType::Zero,
			chunk_stream_id,
			message: Message::Command(CommandMessage {
				stream_id: self.id,
				transaction_id: 0,
				object_encoding: self.config.object_encoding,
				command_name: name.to_string(),
				command_object: None,
				arguments,
			}),
		});
	}

	fn enter(&mut self, state: ReadyState) {
		tracing::debug!(stream = self.id, from = ?self.state, to = ?state, "state change");
		self.state = state;
		self.publish_snapshot();

		for effect in state.effects() {
			self.apply(*effect);
		}
	}

	fn apply(&mut self, effect: Effect) {
		match effect {
			Effect::SendMetadata => {
				let metadata = self.source.metadata();
				self.transport.write(Chunk::new(Message::Data(DataMessage {
					stream_id: self.id,
					object_encoding: self.config.object_encoding,
					handler_name: "@setDataFrame".to_string(),
					arguments: vec!["onMetaData".into(), metadata.into()],
				})));
			}
			Effect::BindSamples => {
				for kind in MediaType::ALL {
					self.source.bind(kind, Some(SampleSink::new(kind, self.emitter.clone())));
				}
			}
			Effect::UnbindSamples => {
				for kind in MediaType::ALL {
					self.source.bind(kind, None);
				}
			}
		}
	}

	fn publish_snapshot(&self) {
		self.snapshot.send_replace(Snapshot {
			state: self.state,
			id: self.id,
			play_options: self.play_options.clone(),
		});
	}
}
