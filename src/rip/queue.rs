/*!
# CDDA: Frame Queue
*/

use crate::CddaError;
use std::{
	collections::VecDeque,
	io,
	sync::{
		Condvar,
		Mutex,
		MutexGuard,
		PoisonError,
	},
	time::Duration,
};



/// # Push Outcome.
pub(super) enum Push {
	/// # The frame was queued.
	Done,

	/// # No room; the wait slice elapsed.
	Full,

	/// # Nobody will ever drain this queue again.
	Closed,
}



#[derive(Debug)]
/// # Queue Internals.
struct QueueState {
	/// # Buffered Bytes.
	buf: VecDeque<u8>,

	/// # End of Stream?
	closed: bool,

	/// # Terminal Failure, If Any.
	failed: Option<CddaError>,

	/// # Reader Dropped?
	reader_gone: bool,
}

#[derive(Debug)]
/// # Bounded Frame Queue.
///
/// The single point of data handoff between the rip worker and the consumer.
/// The worker pushes whole frames, blocking while the queue is full; the
/// consumer pulls arbitrary byte counts, blocking while it is empty. Closing
/// is one-way and carries an optional terminal error.
pub(super) struct FrameQueue {
	/// # Capacity in Bytes.
	capacity: usize,

	/// # State.
	state: Mutex<QueueState>,

	/// # Signals Room For the Producer.
	not_full: Condvar,

	/// # Signals Data (or Closure) For the Consumer.
	not_empty: Condvar,
}

impl FrameQueue {
	/// # New Queue.
	pub(super) fn new(capacity: usize) -> Self {
		Self {
			capacity,
			state: Mutex::new(QueueState {
				buf: VecDeque::with_capacity(capacity),
				closed: false,
				failed: None,
				reader_gone: false,
			}),
			not_full: Condvar::new(),
			not_empty: Condvar::new(),
		}
	}

	/// # Lock, Shrugging Off Poison.
	///
	/// The state is a plain buffer; a panicking peer cannot leave it in a
	/// state worth refusing to look at.
	fn lock(&self) -> MutexGuard<'_, QueueState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// # Push One Frame.
	///
	/// Queue a whole frame if it fits, otherwise wait up to `wait` for room
	/// and try once more. A `Full` return hands control back to the caller
	/// so it can recheck cancellation between slices.
	pub(super) fn push(&self, frame: &[u8], wait: Duration) -> Push {
		let mut state = self.lock();
		if state.reader_gone || state.closed { return Push::Closed; }
		if self.capacity - state.buf.len() < frame.len() {
			let (s, _timeout) = self.not_full.wait_timeout(state, wait)
				.unwrap_or_else(PoisonError::into_inner);
			state = s;
			if state.reader_gone || state.closed { return Push::Closed; }
			if self.capacity - state.buf.len() < frame.len() { return Push::Full; }
		}

		state.buf.extend(frame.iter().copied());
		drop(state);
		self.not_empty.notify_one();
		Push::Done
	}

	/// # Close (End of Stream).
	///
	/// Already-buffered bytes remain readable; once drained, reads return
	/// zero.
	pub(super) fn close(&self) {
		let mut state = self.lock();
		state.closed = true;
		drop(state);
		self.not_empty.notify_all();
		self.not_full.notify_all();
	}

	/// # Abort.
	///
	/// Discard anything buffered and close; the consumer sees an immediate
	/// end of stream.
	pub(super) fn abort(&self) {
		let mut state = self.lock();
		state.buf.clear();
		state.closed = true;
		drop(state);
		self.not_empty.notify_all();
		self.not_full.notify_all();
	}

	/// # Fail.
	///
	/// Like [`FrameQueue::abort`], but reads surface the error instead of a
	/// clean end of stream.
	pub(super) fn fail(&self, err: CddaError) {
		let mut state = self.lock();
		state.buf.clear();
		state.closed = true;
		state.failed.replace(err);
		drop(state);
		self.not_empty.notify_all();
		self.not_full.notify_all();
	}

	/// # The Reader Went Away.
	///
	/// Flagged from the reader's `Drop` so a blocked producer stops waiting
	/// for drains that will never come.
	pub(super) fn reader_gone(&self) {
		let mut state = self.lock();
		state.reader_gone = true;
		state.buf.clear();
		drop(state);
		self.not_full.notify_all();
	}

	/// # Blocking Read.
	///
	/// Copy up to `buf.len()` bytes out of the queue, waiting for data while
	/// the stream is still live.
	///
	/// ## Errors
	///
	/// Returns the rip's terminal error, if any, once the buffer is empty.
	pub(super) fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
		let mut state = self.lock();
		loop {
			if ! state.buf.is_empty() {
				let len = usize::min(buf.len(), state.buf.len());
				for (dst, src) in buf.iter_mut().zip(state.buf.drain(..len)) {
					*dst = src;
				}
				drop(state);
				self.not_full.notify_one();
				return Ok(len);
			}
			if let Some(e) = state.failed.as_ref() {
				return Err(io::Error::new(io::ErrorKind::Other, e.clone()));
			}
			if state.closed { return Ok(0); }
			state = self.not_empty.wait(state)
				.unwrap_or_else(PoisonError::into_inner);
		}
	}
}
