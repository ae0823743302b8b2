use std::sync::{
	Arc, Mutex,
	atomic::{AtomicBool, AtomicUsize, Ordering},
};

use crate::{Chunk, MediaSource, MediaType, Notifier, Object, SampleSink, Transport};

/// Records every chunk written and every stream creation request.
#[derive(Default)]
pub struct MockTransport {
	connected: AtomicBool,
	chunks: Mutex<Vec<Chunk>>,
	notifier: Mutex<Option<Notifier>>,
	create_requests: AtomicUsize,
}

impl MockTransport {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn connected() -> Arc<Self> {
		let transport = Self::default();
		transport.connected.store(true, Ordering::SeqCst);
		Arc::new(transport)
	}

	pub fn chunks(&self) -> Vec<Chunk> {
		self.chunks.lock().unwrap().clone()
	}

	pub fn commands(&self) -> Vec<String> {
		self.chunks
			.lock()
			.unwrap()
			.iter()
			.filter_map(|chunk| chunk.command_name().map(str::to_string))
			.collect()
	}

	pub fn create_requests(&self) -> usize {
		self.create_requests.load(Ordering::SeqCst)
	}

	/// The notifier from the most recent `create_stream`.
	pub fn notifier(&self) -> Notifier {
		self.notifier.lock().unwrap().clone().expect("create_stream was not called")
	}
}

impl Transport for MockTransport {
	fn connected(&self) -> bool {
		self.connected.load(Ordering::SeqCst)
	}

	fn create_stream(&self, notifier: Notifier) {
		self.create_requests.fetch_add(1, Ordering::SeqCst);
		*self.notifier.lock().unwrap() = Some(notifier);
	}

	fn write(&self, chunk: Chunk) {
		self.chunks.lock().unwrap().push(chunk);
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceEvent {
	Reset,
	Start,
	Bind(MediaType, bool),
}

#[derive(Default)]
pub struct MockSource {
	events: Mutex<Vec<SourceEvent>>,
	sinks: Mutex<[Option<SampleSink>; 2]>,
}

impl MockSource {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn events(&self) -> Vec<SourceEvent> {
		self.events.lock().unwrap().clone()
	}

	pub fn sink(&self, kind: MediaType) -> Option<SampleSink> {
		self.sinks.lock().unwrap()[kind.index()].clone()
	}
}

impl MediaSource for MockSource {
	fn reset(&self) {
		self.events.lock().unwrap().push(SourceEvent::Reset);
	}

	fn start(&self) {
		self.events.lock().unwrap().push(SourceEvent::Start);
	}

	fn bind(&self, kind: MediaType, sink: Option<SampleSink>) {
		self.events.lock().unwrap().push(SourceEvent::Bind(kind, sink.is_some()));
		self.sinks.lock().unwrap()[kind.index()] = sink;
	}

	fn metadata(&self) -> Object {
		Object::new().with("width", 1280u32).with("height", 720u32)
	}
}
