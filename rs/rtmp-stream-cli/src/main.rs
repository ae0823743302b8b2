mod log;
mod loopback;

use std::sync::Arc;

use anyhow::Context;
use bytes::BytesMut;
use clap::{Parser, Subcommand};
use rtmp_stream::{PublishType, Stream, StreamConfig};
use tokio::io::AsyncReadExt;

use log::Log;
use loopback::{Loopback, StdinSource};

#[derive(Parser, Clone)]
pub struct Cli {
	#[command(flatten)]
	log: Log,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Clone)]
pub enum Command {
	/// Publish stdin as a video stream over a loopback connection.
	Publish {
		#[command(flatten)]
		config: StreamConfig,

		/// The name of the stream to publish.
		#[arg(long)]
		name: String,

		/// Overrides the configured publish type.
		#[arg(long = "type", value_enum)]
		kind: Option<PublishType>,

		/// Frames per second used to timestamp each sample.
		#[arg(long, default_value_t = 30.0)]
		fps: f64,

		/// Bytes of input per sample.
		#[arg(long, default_value_t = 4096)]
		chunk: usize,
	},
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	cli.log.init();

	match cli.command {
		Command::Publish {
			config,
			name,
			kind,
			fps,
			chunk,
		} => publish(config, name, kind, fps, chunk).await,
	}
}

async fn publish(
	config: StreamConfig,
	name: String,
	kind: Option<PublishType>,
	fps: f64,
	chunk: usize,
) -> anyhow::Result<()> {
	anyhow::ensure!(fps > 0.0, "--fps must be positive");
	anyhow::ensure!(chunk > 0, "--chunk must be positive");

	let transport = Arc::new(Loopback::default());
	let source = Arc::new(StdinSource::new(config.clone(), fps));
	let kind = kind.unwrap_or(config.publish_type);
	let stream = Stream::new(transport.clone(), source.clone(), config);
	transport.connect(&stream)?;

	stream.publish_with_type(name.as_str(), kind)?;
	let video = source.video().await.context("stream never started publishing")?;
	tracing::info!(%name, state = ?stream.ready_state(), "publishing");

	let duration = 1000.0 / fps;
	let mut input = tokio::io::stdin();
	let mut buffer = BytesMut::with_capacity(chunk);
	let mut samples = 0u64;

	loop {
		let eof = input.read_buf(&mut buffer).await? == 0;

		while buffer.len() >= chunk || (eof && !buffer.is_empty()) {
			let size = buffer.len().min(chunk);
			video.write(buffer.split_to(size).freeze(), duration);
			samples += 1;
		}

		if eof {
			break;
		}
	}

	stream.close()?;
	stream.flushed().await?;

	tracing::info!(samples, chunks = transport.chunks(), bytes = transport.bytes(), "closed");
	println!("{} samples, {} chunks, {} media bytes", samples, transport.chunks(), transport.bytes());

	Ok(())
}
