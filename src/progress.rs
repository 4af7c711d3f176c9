/*!
# CDDA: Rip Progress
*/



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Rip Progress Event.
///
/// A point-in-time snapshot of a rip's completion, delivered to a registered
/// [`RipProgressListener`]. The session field is an opaque correlation id so
/// a listener watching several sessions can tell them apart; it carries no
/// other meaning.
pub struct RipProgressEvent {
	/// # Originating Session Id.
	session: u64,

	/// # Percent Complete (`0..=100`).
	percent: u8,
}

impl RipProgressEvent {
	/// # New Event.
	pub(crate) const fn new(session: u64, percent: u8) -> Self {
		Self { session, percent }
	}

	#[must_use]
	/// # Session Id.
	pub const fn session(&self) -> u64 { self.session }

	#[must_use]
	/// # Percent Complete.
	pub const fn percent(&self) -> u8 { self.percent }
}



/// # Rip Progress Listener.
///
/// Implementations registered with [`Session::track`](crate::Session::track)
/// receive progress updates while the rip is live, and an error notification
/// if it dies early.
///
/// Callbacks are invoked from the rip's worker thread, so implementations
/// must be `Send` and should return promptly; a slow listener slows the rip.
pub trait RipProgressListener: Send {
	/// # Progress Update.
	fn on_progress(&self, event: RipProgressEvent);

	/// # Rip Failure.
	///
	/// The same failure also surfaces through the track reader's own error
	/// signal, so this is informational.
	fn on_error(&self, message: &str);
}
