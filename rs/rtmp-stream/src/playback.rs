use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};

/// Decides whether a decoded video frame should be handed to the renderer.
///
/// Nothing is shown after `play` until a keyframe arrives.
#[derive(Clone, Default)]
pub(crate) struct PlaybackGate {
	armed: Arc<AtomicBool>,
}

impl PlaybackGate {
	pub fn disarm(&self) {
		self.armed.store(false, Ordering::Release);
	}

	pub fn accept(&self, keyframe: bool, ready_for_more: bool) -> bool {
		if keyframe {
			self.armed.store(true, Ordering::Release);
		}

		self.armed.load(Ordering::Acquire) && ready_for_more
	}
}
