/*!
# CDDA: Streaming Rip Engine
*/

mod queue;

use crate::{
	CANCEL_POLL,
	CD_FRAME_SIZE,
	CddaError,
	Drive,
	RIP_BUFFER_FRAMES,
	RipProgressEvent,
	RipProgressListener,
	session::SessionShared,
};
use queue::{
	FrameQueue,
	Push,
};
use std::{
	io,
	sync::Arc,
};



/// # Rip Outcome.
enum Outcome {
	/// # Every Frame Was Read.
	Complete,

	/// # Cancelled (or the Reader Went Away).
	Cancelled,

	/// # Unrecoverable Read Error.
	Failed(CddaError),
}



/// # Rip Worker.
///
/// The producing half of a track rip, bound to exactly one (session, track)
/// pair. It owns the drive handle and the bounded queue; frames flow in one
/// at a time, stalling whenever the consumer falls behind. Whatever the exit
/// path — completion, error, cancellation — the session is returned to idle
/// exactly once.
pub(crate) struct RipWorker {
	/// # The Open (and Pre-Seeked) Drive.
	drive: Box<dyn Drive>,

	/// # Owning Session State.
	shared: Arc<SessionShared>,

	/// # The Handoff Queue.
	queue: Arc<FrameQueue>,

	/// # Progress Listener, If Any.
	listener: Option<Box<dyn RipProgressListener>>,

	/// # Track Being Ripped.
	track: u8,

	/// # Total Frames to Read.
	total_frames: u32,

	/// # Frames Read So Far.
	frames_read: u32,

	/// # Last Percent Reported.
	last_percent: Option<u8>,
}

impl RipWorker {
	/// # New Worker.
	pub(crate) fn new(
		drive: Box<dyn Drive>,
		shared: Arc<SessionShared>,
		listener: Option<Box<dyn RipProgressListener>>,
		track: u8,
		total_frames: u32,
	) -> Self {
		Self {
			drive,
			shared,
			queue: Arc::new(FrameQueue::new(RIP_BUFFER_FRAMES * CD_FRAME_SIZE)),
			listener,
			track,
			total_frames,
			frames_read: 0,
			last_percent: None,
		}
	}

	/// # Spawn.
	///
	/// Move the worker onto its own thread and hand back the consuming half.
	///
	/// ## Errors
	///
	/// Returns an error if the thread cannot be spawned, in which case the
	/// caller still owns the session and must close it.
	pub(crate) fn spawn(self) -> Result<TrackReader, CddaError> {
		let reader = TrackReader { queue: Arc::clone(&self.queue) };
		std::thread::Builder::new()
			.name(format!("cdda-rip{:02}", self.track))
			.spawn(move || self.run())
			.map_err(|e| CddaError::DiscRead(format!("unable to spawn the rip worker: {e}")))?;
		Ok(reader)
	}

	/// # Run to Termination.
	fn run(mut self) {
		match self.rip() {
			Outcome::Complete => {
				tracing::info!(track = self.track, "reached end of track, releasing resources");
				self.queue.close();
			},
			Outcome::Cancelled => {
				tracing::info!(track = self.track, "terminated, releasing resources");
				self.queue.abort();
			},
			Outcome::Failed(e) => {
				tracing::error!(track = self.track, "error reading CD: {e}");
				if let Some(listener) = self.listener.as_deref() {
					listener.on_error(&e.to_string());
				}
				self.queue.fail(e);
			},
		}

		// Close the drive before the session reads as idle again, then flip
		// the state exactly once. (Release is idempotent either way.)
		drop(self.drive);
		self.shared.release();
	}

	/// # The Fill Loop.
	///
	/// One frame per step: check for cancellation, read, enqueue, report.
	/// The enqueue stalls while the buffer is full, waking every poll
	/// interval to recheck cancellation so a stopped consumer cannot wedge
	/// the teardown.
	fn rip(&mut self) -> Outcome {
		let mut frame = [0_u8; CD_FRAME_SIZE];
		while self.frames_read < self.total_frames {
			if self.shared.cancel_requested() { return Outcome::Cancelled; }

			if let Err(e) = self.drive.read_frame(&mut frame) {
				return Outcome::Failed(e);
			}
			self.frames_read += 1;

			let queued = loop {
				match self.queue.push(&frame, CANCEL_POLL) {
					Push::Done => break true,
					Push::Closed => break false,
					Push::Full => if self.shared.cancel_requested() { break false; },
				}
			};
			if ! queued { return Outcome::Cancelled; }

			self.progress();
		}
		Outcome::Complete
	}

	#[allow(
		clippy::cast_possible_truncation,
		clippy::integer_division,
	)]
	/// # Report Progress.
	///
	/// Emit an event whenever the integer percent advances. The math can
	/// only land on 100 once the final frame has been read.
	fn progress(&mut self) {
		let percent = (u64::from(self.frames_read) * 100 / u64::from(self.total_frames)) as u8;
		if self.last_percent != Some(percent) {
			self.last_percent.replace(percent);
			if let Some(listener) = self.listener.as_deref() {
				listener.on_progress(RipProgressEvent::new(self.shared.id(), percent));
			}
		}
	}
}



#[derive(Debug)]
/// # Track Reader.
///
/// The consuming half of a track rip: a blocking [`io::Read`] over the raw
/// frame bytes. Reads return `Ok(0)` once the track is exhausted (or the rip
/// was cancelled), and an error wrapping the underlying [`CddaError`] if the
/// rip died.
///
/// Dropping the reader early counts as cancellation; the rip stops and the
/// session returns to idle on its own.
pub struct TrackReader {
	/// # The Handoff Queue.
	queue: Arc<FrameQueue>,
}

impl io::Read for TrackReader {
	#[inline]
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		if buf.is_empty() { Ok(0) }
		else { self.queue.read(buf) }
	}
}

impl Drop for TrackReader {
	#[inline]
	fn drop(&mut self) { self.queue.reader_gone(); }
}
