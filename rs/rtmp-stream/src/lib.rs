//! # rtmp-stream: the stream half of an RTMP connection
//!
//! A [Stream] coordinates one audio/video stream multiplexed over a persistent connection.
//! It owns three things:
//! - The [ReadyState] lifecycle, advanced by server acknowledgements delivered through a [Notifier].
//! - Strict ordering of control commands (`play`, `publish`, `seek`, `close`, ...) issued from any thread.
//! - Framing of encoded media via the [ChunkEmitter]: full or incremental chunk headers, and
//!   integer timestamps that carry the fractional remainder forward.
//!
//! The connection itself (handshake, chunk encoding, serialization) sits behind [Transport],
//! and capture/encoding sits behind [MediaSource].
//!
//! ## Publishing
//!
//! - [Stream::new] requests a stream if the transport is already connected.
//! - [Stream::publish] waits for the stream id, resets the [MediaSource], and sends `publish`.
//! - On `NetStream.Publish.Start` the stream sends `onMetaData` and binds a [SampleSink] per media type.
//! - [Stream::close] sends `deleteStream` and unbinds the sinks.

mod config;
mod emitter;
mod error;
mod media;
mod message;
mod play;
mod playback;
mod queue;
mod state;
mod status;
mod stream;
mod transport;
mod value;

#[cfg(test)]
mod mock;

pub use config::*;
pub use emitter::*;
pub use error::*;
pub use media::*;
pub use message::*;
pub use play::*;
pub use state::{ReadyState, StreamId};
pub use status::*;
pub use stream::*;
pub use transport::{Notifier, Transport};
pub use value::*;
