/*!
# CDDA: Device Session
*/

use crate::{
	CANCEL_TIMEOUT,
	CddaError,
	CdioBackend,
	discid,
	Drive,
	DriveBackend,
	rip::RipWorker,
	RipProgressListener,
	Toc,
	TocEntry,
	TrackReader,
};
use std::{
	fmt,
	io,
	path::PathBuf,
	sync::{
		Arc,
		atomic::{
			AtomicU64,
			Ordering::Relaxed,
		},
		Condvar,
		Mutex,
		MutexGuard,
		PoisonError,
	},
	time::Instant,
};



/// # Session Id Sequence.
///
/// Progress events carry the originating session's id so listeners watching
/// several drives can tell them apart.
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Session Phase.
///
/// One explicit state instead of the usual pile of `busy`/`ripping` booleans;
/// `Ripping` structurally implies "busy", so that invariant cannot drift.
enum Phase {
	/// # Nothing Held.
	Idle,

	/// # The Drive Is Held (TOC read, id read, or rip setup).
	Open,

	/// # A Rip Worker Owns the Drive.
	Ripping,
}

#[derive(Debug)]
/// # Mutable Session State.
struct SessionState {
	/// # Current Phase.
	phase: Phase,

	/// # Cancellation Requested?
	///
	/// Only meaningful while ripping; cleared on every release.
	cancel: bool,

	/// # Release Generation.
	///
	/// Bumped on every release. An open that lost its reservation while
	/// blocked in the backend compares this against the value it reserved
	/// under, and bows out rather than installing a second owner.
	generation: u64,

	/// # The Open Drive, When Held Here.
	///
	/// `None` while idle, mid-open, or while a rip worker has taken it.
	drive: Option<Box<dyn Drive>>,
}

#[derive(Debug)]
/// # Shared Session Core.
///
/// The part of a session a rip worker needs a handle to: the state machine
/// and the condvar that announces phase changes (most importantly, the
/// return to idle that a blocked `cancel` is waiting for).
pub(crate) struct SessionShared {
	/// # Correlation Id.
	id: u64,

	/// # State.
	state: Mutex<SessionState>,

	/// # Phase-Change Signal.
	cond: Condvar,
}

impl SessionShared {
	/// # Lock, Shrugging Off Poison.
	fn lock(&self) -> MutexGuard<'_, SessionState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// # Correlation Id.
	pub(crate) const fn id(&self) -> u64 { self.id }

	/// # Has Cancellation Been Requested?
	pub(crate) fn cancel_requested(&self) -> bool { self.lock().cancel }

	/// # Release Everything.
	///
	/// Drop any held drive, reset the phase to idle, clear the cancellation
	/// flag, and wake anybody waiting on the change. Safe to call from any
	/// state, any number of times.
	pub(crate) fn release(&self) {
		let mut state = self.lock();
		state.drive = None;
		state.phase = Phase::Idle;
		state.cancel = false;
		state.generation = state.generation.wrapping_add(1);
		drop(state);
		self.cond.notify_all();
	}
}



/// # Device Session.
///
/// The exclusive-access lifecycle around one CD-ROM drive: reading the table
/// of contents, computing disc identifiers, streaming a track's audio, and
/// cancelling whatever is in flight.
///
/// The drive is a sequential, single-owner resource, so at most one
/// operation can hold it at a time; a second caller gets
/// [`CddaError::DiscInUse`] rather than a queue. All holds are scoped — every
/// exit path, error or otherwise, returns the session to idle.
pub struct Session {
	/// # How Drives Get Opened.
	backend: Box<dyn DriveBackend>,

	/// # Configured Device Path (autodetect when `None`).
	dev: Option<PathBuf>,

	/// # Shared Core.
	shared: Arc<SessionShared>,
}

impl fmt::Debug for Session {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Session")
			.field("dev", &self.dev)
			.field("id", &self.shared.id)
			.finish_non_exhaustive()
	}
}

impl Session {
	#[must_use]
	#[inline]
	/// # New Session.
	///
	/// Use the drive at `dev`, or autodetect one on each open if
	/// unconfigured. Construction touches no hardware; the drive is only
	/// opened (and re-verified) per operation.
	pub fn new(dev: Option<PathBuf>) -> Self {
		Self::with_backend(Box::new(CdioBackend), dev)
	}

	#[must_use]
	/// # New Session With a Custom Backend.
	pub fn with_backend(backend: Box<dyn DriveBackend>, dev: Option<PathBuf>) -> Self {
		Self {
			backend,
			dev,
			shared: Arc::new(SessionShared {
				id: NEXT_SESSION_ID.fetch_add(1, Relaxed),
				state: Mutex::new(SessionState {
					phase: Phase::Idle,
					cancel: false,
					generation: 0,
					drive: None,
				}),
				cond: Condvar::new(),
			}),
		}
	}

	#[must_use]
	/// # Is the Session Busy?
	///
	/// `true` between a successful open and the matching close, whether the
	/// hold is a metadata read or an active rip.
	pub fn is_busy(&self) -> bool {
		! matches!(self.shared.lock().phase, Phase::Idle)
	}
}

/// # Open/Close.
impl Session {
	/// # Open the Drive.
	///
	/// The idle check and the phase reservation happen atomically, so of two
	/// concurrent opens exactly one wins and the other fails fast; the slow
	/// hardware part happens outside the lock. A reservation lost to a
	/// cancel while the backend call is in flight is detected by generation,
	/// and the late handle is discarded rather than installed.
	///
	/// ## Errors
	///
	/// `DiscInUse` if the session already holds the drive, `DiscRead` if the
	/// native open fails.
	fn open(&self) -> Result<(), CddaError> {
		let generation = {
			let mut state = self.shared.lock();
			if ! matches!(state.phase, Phase::Idle) {
				return Err(CddaError::DiscInUse);
			}
			state.phase = Phase::Open;
			state.generation
		};

		if let Some(dev) = self.dev.as_deref() {
			tracing::info!("opening cdrom [{}]", dev.display());
		}
		else { tracing::info!("searching for a cdrom"); }

		match self.backend.open(self.dev.as_deref()) {
			Ok(drive) => {
				let mut state = self.shared.lock();
				// A cancel may have force-closed the reservation while the
				// hardware was spinning up, and a later open may hold a
				// fresh one; the generation tells those apart.
				if matches!(state.phase, Phase::Open) && state.generation == generation {
					state.drive.replace(drive);
					Ok(())
				}
				else {
					drop(state);
					Err(CddaError::DiscRead("the session was cancelled while opening".to_owned()))
				}
			},
			Err(e) => {
				// Same voided-reservation caveat on the failure path: only
				// clean up a reservation this call still owns.
				let state = self.shared.lock();
				if matches!(state.phase, Phase::Open) && state.generation == generation {
					drop(state);
					self.close();
				}
				Err(e)
			},
		}
	}

	/// # Close the Drive.
	///
	/// Idempotent, and always safe to call, including after a failed open.
	fn close(&self) {
		tracing::debug!("releasing the drive");
		self.shared.release();
	}
}

/// # Metadata.
impl Session {
	/// # Table of Contents.
	///
	/// Open the drive, walk its audio tracks, and close it again — on every
	/// exit path.
	///
	/// ## Errors
	///
	/// `DiscInUse` if the session is busy, `DiscRead` if the disc cannot be
	/// read or holds no audio tracks.
	pub fn table_of_contents(&self) -> Result<Toc, CddaError> {
		self.open()?;
		let out = self.build_toc();
		self.close();
		if let Ok(toc) = &out {
			tracing::debug!("got table of contents:\n{toc}");
		}
		out
	}

	#[must_use]
	/// # Is There a Disc in the Drive?
	///
	/// A failed read means no; an in-use session means yes, because somebody
	/// already validated the media to get there. (The two truths — media
	/// presence and session availability — are conflated on purpose, as
	/// they always have been.)
	pub fn is_disc_in_drive(&self) -> bool {
		match self.open() {
			Ok(()) => {
				self.close();
				true
			},
			Err(CddaError::DiscInUse) => true,
			// A failed open has already cleaned up after itself.
			Err(_) => false,
		}
	}

	/// # CDDB/FreeDB Disc Id.
	///
	/// ## Errors
	///
	/// `DiscInUse` if the session is busy, `DiscRead` if the disc cannot be
	/// read.
	pub fn cddb_id(&self) -> Result<String, CddaError> {
		self.disc_ids().map(|ids| ids.cddb)
	}

	/// # MusicBrainz Disc Id.
	///
	/// ## Errors
	///
	/// `DiscInUse` if the session is busy, `DiscRead` if the disc cannot be
	/// read.
	pub fn musicbrainz_disc_id(&self) -> Result<String, CddaError> {
		self.disc_ids().map(|ids| ids.musicbrainz)
	}

	/// # MusicBrainz Lookup URL.
	///
	/// ## Errors
	///
	/// `DiscInUse` if the session is busy, `DiscRead` if the disc cannot be
	/// read.
	pub fn musicbrainz_url(&self) -> Result<String, CddaError> {
		self.disc_ids().map(|ids| ids.musicbrainz_url)
	}

	/// # Compute All Disc Ids (Scoped).
	fn disc_ids(&self) -> Result<discid::DiscIds, CddaError> {
		self.open()?;
		let out = {
			let state = self.shared.lock();
			match state.drive.as_deref() {
				Some(drive) => discid::disc_ids(drive),
				None => Err(CddaError::DiscRead("the session closed mid-read".to_owned())),
			}
		};
		self.close();
		out
	}

	/// # Build the TOC.
	///
	/// Walk tracks `1..=N`, keeping the audio ones. Data tracks are skipped
	/// silently and nothing is renumbered, so entry ids may have gaps.
	fn build_toc(&self) -> Result<Toc, CddaError> {
		let state = self.shared.lock();
		let Some(drive) = state.drive.as_deref() else {
			return Err(CddaError::DiscRead("the session closed mid-read".to_owned()));
		};

		let total = drive.num_tracks()?;
		let mut entries = Vec::with_capacity(usize::from(total));
		for idx in 1..=total {
			if drive.is_audio(idx)? {
				let (first, last) = drive.track_bounds(idx)?;
				entries.push(TocEntry::new(idx, first, last, drive.track_flags(idx)));
			}
		}
		Toc::from_entries(entries)
	}
}

/// # Ripping.
impl Session {
	/// # Stream a Track.
	///
	/// Open the drive, rebuild the TOC for authoritative sector bounds,
	/// validate the track number, and hand back the pull side of a rip bound
	/// to it. The registered listener (if any) receives progress and error
	/// callbacks for the life of the rip.
	///
	/// The session stays busy until the rip terminates — completion, error,
	/// cancellation, or the reader being dropped — and then returns to idle
	/// on its own.
	///
	/// ## Errors
	///
	/// `DiscInUse` if the session is busy, `InvalidTrack` if the number
	/// matches no audio track, `DiscRead` for anything the drive chokes on.
	/// Setup failures close the session before the error propagates.
	pub fn track(
		&self,
		track: u8,
		listener: Option<Box<dyn RipProgressListener>>,
	) -> Result<TrackReader, CddaError> {
		tracing::info!(track, "starting rip");
		self.open()?;
		match self.bind_rip(track, listener) {
			Ok(reader) => Ok(reader),
			Err(e) => {
				self.close();
				Err(e)
			},
		}
	}

	/// # Rip a Track Into a Sink.
	///
	/// The pull-and-copy convenience: stream the track and shovel it into
	/// `sink` in 1 KiB chunks until end of stream.
	///
	/// ## Errors
	///
	/// Everything [`Session::track`] can return, plus `DiscRead` for rip or
	/// sink failures along the way.
	pub fn track_to(
		&self,
		track: u8,
		listener: Option<Box<dyn RipProgressListener>>,
		sink: &mut dyn io::Write,
	) -> Result<(), CddaError> {
		use io::Read;

		let mut reader = self.track(track, listener)?;
		let mut chunk = [0_u8; 1024];
		loop {
			match reader.read(&mut chunk) {
				Ok(0) => return Ok(()),
				Ok(n) => sink.write_all(&chunk[..n])
					.map_err(|e| CddaError::DiscRead(e.to_string()))?,
				Err(e) => return Err(CddaError::DiscRead(e.to_string())),
			}
		}
	}

	/// # Cancel Whatever Is Happening.
	///
	/// Idle sessions are left alone. A plain hold is force-closed on the
	/// spot. An active rip is flagged and this call blocks — on the phase
	/// condvar, not a poll loop — until the worker observes the flag at its
	/// next fill step and tears itself down.
	///
	/// ## Errors
	///
	/// `CancelTimedOut` if the rip does not acknowledge within the bounded
	/// wait; this only happens when a fill step is wedged inside a hardware
	/// read, which nothing at this layer can interrupt. The flag stays set,
	/// so the worker will still stop if the read ever returns.
	pub fn cancel(&self) -> Result<(), CddaError> {
		let mut state = self.shared.lock();
		match state.phase {
			Phase::Idle => Ok(()),
			Phase::Open => {
				drop(state);
				self.close();
				Ok(())
			},
			Phase::Ripping => {
				state.cancel = true;
				let deadline = Instant::now() + CANCEL_TIMEOUT;
				while matches!(state.phase, Phase::Ripping) {
					let now = Instant::now();
					if deadline <= now { return Err(CddaError::CancelTimedOut); }
					let (s, _timeout) = self.shared.cond.wait_timeout(state, deadline - now)
						.unwrap_or_else(PoisonError::into_inner);
					state = s;
				}
				Ok(())
			},
		}
	}

	/// # Eject the Disc.
	///
	/// Any in-flight rip is cancelled (best effort) before the tray pops.
	/// Returns `true` if the eject succeeded.
	pub fn eject(&self) -> bool {
		let _res = self.cancel();
		self.backend.eject(self.dev.as_deref())
	}

	/// # Bind a Rip Worker.
	///
	/// Expects the session to have been opened by the caller, which also
	/// owns the cleanup if anything here goes sideways.
	fn bind_rip(
		&self,
		track: u8,
		listener: Option<Box<dyn RipProgressListener>>,
	) -> Result<TrackReader, CddaError> {
		let toc = self.build_toc()?;
		let Some(entry) = toc.get(track) else {
			return Err(CddaError::InvalidTrack(track));
		};
		let first = entry.first_sector();
		let total = entry.total_frames();

		let drive = {
			let mut state = self.shared.lock();
			let Some(mut drive) = state.drive.take() else {
				return Err(CddaError::DiscRead("the session closed mid-setup".to_owned()));
			};
			// Seek before committing so a failure leaves the session merely
			// open (and closable by the caller).
			if let Err(e) = drive.seek(first) {
				state.drive.replace(drive);
				return Err(e);
			}
			state.phase = Phase::Ripping;
			drive
		};

		RipWorker::new(drive, Arc::clone(&self.shared), listener, track, total).spawn()
	}
}



#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		CD_FRAME_SIZE,
		RipProgressEvent,
		TrackFlags,
	};
	use std::{
		io::Read,
		sync::atomic::AtomicU32,
		time::Duration,
	};

	/// # Scripted Disc.
	///
	/// Layout plus read instrumentation, shared by every handle the fake
	/// backend opens.
	struct FakeDisc {
		/// # Tracks: (audio?, first, last).
		tracks: Vec<(bool, u32, u32)>,

		/// # Total Frame Reads Across All Handles.
		reads: AtomicU32,

		/// # Per-Frame Read Latency.
		read_delay: Duration,

		/// # Reads Succeed Until This Many Have Happened.
		fail_after: u32,
	}

	impl FakeDisc {
		/// # The Three-Track Reference Layout.
		fn standard() -> Arc<Self> {
			Arc::new(Self {
				tracks: vec![(true, 0, 999), (true, 1000, 1999), (true, 2000, 2999)],
				reads: AtomicU32::new(0),
				read_delay: Duration::ZERO,
				fail_after: u32::MAX,
			})
		}

		/// # Total Reads So Far.
		fn reads(&self) -> u32 { self.reads.load(Relaxed) }
	}

	/// # Fake Backend.
	struct FakeBackend {
		/// # The Disc in the Drive, If Any.
		disc: Option<Arc<FakeDisc>>,

		/// # Time the Native Open Takes.
		open_delay: Duration,
	}

	impl DriveBackend for FakeBackend {
		fn open(&self, _dev: Option<&std::path::Path>) -> Result<Box<dyn Drive>, CddaError> {
			if ! self.open_delay.is_zero() {
				std::thread::sleep(self.open_delay);
			}
			match &self.disc {
				Some(disc) => Ok(Box::new(FakeDrive {
					disc: Arc::clone(disc),
					pos: 0,
				})),
				None => Err(CddaError::DiscRead("no disc in the drive".to_owned())),
			}
		}

		fn eject(&self, _dev: Option<&std::path::Path>) -> bool { true }
	}

	/// # Fake Drive Handle.
	struct FakeDrive {
		/// # The Disc.
		disc: Arc<FakeDisc>,

		/// # Next Sector.
		pos: u32,
	}

	impl Drive for FakeDrive {
		fn num_tracks(&self) -> Result<u8, CddaError> {
			u8::try_from(self.disc.tracks.len())
				.map_err(|_| CddaError::DiscRead("too many tracks".to_owned()))
		}

		fn is_audio(&self, track: u8) -> Result<bool, CddaError> {
			Ok(self.disc.tracks[usize::from(track) - 1].0)
		}

		fn track_bounds(&self, track: u8) -> Result<(u32, u32), CddaError> {
			let (_, first, last) = self.disc.tracks[usize::from(track) - 1];
			Ok((first, last))
		}

		fn track_flags(&self, _track: u8) -> TrackFlags {
			TrackFlags { copy_permitted: true, linear_preemphasis: false, channels: 2 }
		}

		fn leadout(&self) -> Result<u32, CddaError> {
			Ok(self.disc.tracks.last().map_or(0, |&(_, _, last)| last + 1))
		}

		fn seek(&mut self, sector: u32) -> Result<(), CddaError> {
			self.pos = sector;
			Ok(())
		}

		fn read_frame(&mut self, buf: &mut [u8; CD_FRAME_SIZE]) -> Result<(), CddaError> {
			if ! self.disc.read_delay.is_zero() {
				std::thread::sleep(self.disc.read_delay);
			}
			let n = self.disc.reads.fetch_add(1, Relaxed) + 1;
			if self.disc.fail_after < n {
				return Err(CddaError::DiscRead("synthetic read failure".to_owned()));
			}
			// Stamp the sector number so reads are verifiable downstream.
			buf[..4].copy_from_slice(&self.pos.to_le_bytes());
			self.pos += 1;
			Ok(())
		}
	}

	/// # Progress Recorder.
	#[derive(Debug, Default)]
	struct Recorder {
		/// # Percents, In Arrival Order.
		percents: Mutex<Vec<u8>>,

		/// # Error Messages.
		errors: Mutex<Vec<String>>,
	}

	impl RipProgressListener for Arc<Recorder> {
		fn on_progress(&self, event: RipProgressEvent) {
			self.percents.lock().unwrap().push(event.percent());
		}

		fn on_error(&self, message: &str) {
			self.errors.lock().unwrap().push(message.to_owned());
		}
	}

	/// # Session Over a Fake Disc.
	fn session_with(disc: &Arc<FakeDisc>) -> Session {
		Session::with_backend(
			Box::new(FakeBackend {
				disc: Some(Arc::clone(disc)),
				open_delay: Duration::ZERO,
			}),
			None,
		)
	}

	/// # Wait (Briefly) For the Session to Idle.
	///
	/// Rip teardown happens on the worker thread, a hair after the consumer
	/// sees end-of-stream.
	fn wait_idle(session: &Session) -> bool {
		for _ in 0..200 {
			if ! session.is_busy() { return true; }
			std::thread::sleep(Duration::from_millis(5));
		}
		false
	}

	#[test]
	fn t_open_close() {
		let disc = FakeDisc::standard();
		let session = session_with(&disc);
		assert!(! session.is_busy());

		session.open().expect("First open should succeed.");
		assert!(session.is_busy());
		assert_eq!(session.open(), Err(CddaError::DiscInUse));

		session.close();
		assert!(! session.is_busy());
		session.open().expect("Open after close should succeed.");
		session.close();

		// Close is idempotent.
		session.close();
		assert!(! session.is_busy());
	}

	#[test]
	fn t_open_concurrent() {
		let disc = FakeDisc::standard();
		let session = session_with(&disc);

		session.open().expect("First open should succeed.");
		std::thread::scope(|s| {
			let second = s.spawn(|| session.open());
			assert_eq!(
				second.join().expect("Opener thread panicked."),
				Err(CddaError::DiscInUse),
			);
		});

		// The loser can get in once the winner lets go.
		session.close();
		session.open().expect("Open after close should succeed.");
		session.close();
	}

	#[test]
	fn t_open_cancelled_while_opening() {
		let disc = FakeDisc::standard();
		let session = Session::with_backend(
			Box::new(FakeBackend {
				disc: Some(Arc::clone(&disc)),
				open_delay: Duration::from_millis(150),
			}),
			None,
		);

		std::thread::scope(|s| {
			let first = s.spawn(|| session.open());

			// Let the first open reserve and sink into the slow backend,
			// then void its reservation and claim the session anew.
			std::thread::sleep(Duration::from_millis(30));
			session.cancel().expect("Cancel should succeed.");
			let second = session.open();
			let first = first.join().expect("Opener thread panicked.");

			// Exactly one owner: the late finisher has to bow out.
			assert!(second.is_ok(), "The fresh reservation should win: {second:?}");
			assert!(
				first.is_err(),
				"A voided open must not install a second owner.",
			);
		});

		assert!(session.is_busy());
		session.close();
		assert!(! session.is_busy());
	}

	#[test]
	fn t_toc() {
		let disc = FakeDisc::standard();
		let session = session_with(&disc);

		let toc = session.table_of_contents().expect("TOC should build.");
		assert_eq!(toc.len(), 3);
		assert_eq!(toc.get(2).map(TocEntry::total_frames), Some(1000));
		assert!(! session.is_busy(), "Session should idle after a TOC read.");

		// No reads happen during a TOC build; that's all metadata.
		assert_eq!(disc.reads(), 0);
	}

	#[test]
	fn t_toc_data_track_gap() {
		let disc = Arc::new(FakeDisc {
			tracks: vec![(true, 0, 999), (false, 1000, 1999), (true, 2000, 2999)],
			reads: AtomicU32::new(0),
			read_delay: Duration::ZERO,
			fail_after: u32::MAX,
		});
		let session = session_with(&disc);

		let toc = session.table_of_contents().expect("TOC should build.");
		let ids: Vec<u8> = toc.entries().iter().map(TocEntry::id).collect();
		assert_eq!(ids, vec![1, 3], "Data tracks skip without renumbering.");
	}

	#[test]
	fn t_toc_no_disc() {
		let session = Session::with_backend(Box::new(FakeBackend { disc: None, open_delay: Duration::ZERO }), None);
		assert!(matches!(
			session.table_of_contents(),
			Err(CddaError::DiscRead(_)),
		));
		assert!(! session.is_busy(), "A failed open should leave nothing held.");
	}

	#[test]
	fn t_is_disc_in_drive() {
		// No disc.
		let session = Session::with_backend(Box::new(FakeBackend { disc: None, open_delay: Duration::ZERO }), None);
		assert!(! session.is_disc_in_drive());

		// Disc.
		let disc = FakeDisc::standard();
		let session = session_with(&disc);
		assert!(session.is_disc_in_drive());
		assert!(! session.is_busy());

		// Busy implies media; the existing hold is left alone.
		session.open().expect("Open should succeed.");
		assert!(session.is_disc_in_drive());
		assert!(session.is_busy(), "The probe must not steal the hold.");
		session.close();
	}

	#[test]
	fn t_disc_ids() {
		let disc = FakeDisc::standard();
		let session = session_with(&disc);

		let mb = session.musicbrainz_disc_id().expect("MusicBrainz id should compute.");
		let url = session.musicbrainz_url().expect("MusicBrainz URL should compute.");
		assert!(url.contains(&mb));
		assert!(! session.cddb_id().expect("CDDB id should compute.").is_empty());
		assert!(! session.is_busy());
	}

	#[test]
	fn t_cancel_idle() {
		let disc = FakeDisc::standard();
		let session = session_with(&disc);
		assert_eq!(session.cancel(), Ok(()));
		assert!(! session.is_busy());
	}

	#[test]
	fn t_cancel_open() {
		let disc = FakeDisc::standard();
		let session = session_with(&disc);
		session.open().expect("Open should succeed.");
		assert_eq!(session.cancel(), Ok(()));
		assert!(! session.is_busy(), "Cancel should force-close a plain hold.");
	}

	#[test]
	fn t_track_invalid() {
		let disc = FakeDisc::standard();
		let session = session_with(&disc);

		assert!(matches!(
			session.track(4, None),
			Err(CddaError::InvalidTrack(4)),
		));
		assert_eq!(disc.reads(), 0, "No drive read may precede validation.");
		assert!(! session.is_busy(), "Setup failure must close the session.");

		assert!(matches!(
			session.track(0, None),
			Err(CddaError::InvalidTrack(0)),
		));
	}

	#[test]
	fn t_rip_complete() {
		let disc = FakeDisc::standard();
		let session = session_with(&disc);
		let recorder = Arc::new(Recorder::default());

		let mut reader = session.track(2, Some(Box::new(Arc::clone(&recorder))))
			.expect("Rip should start.");
		assert!(session.is_busy());

		let mut out = Vec::new();
		reader.read_to_end(&mut out).expect("Rip should stream cleanly.");
		assert_eq!(out.len(), 1000 * CD_FRAME_SIZE, "Track two is exactly 1000 frames.");
		assert_eq!(disc.reads(), 1000, "Exactly 1000 frames should be read.");

		// The first frame comes from the track's first sector.
		assert_eq!(&out[..4], &1000_u32.to_le_bytes());

		// Progress counts up to exactly 100.
		let percents = recorder.percents.lock().unwrap();
		assert!(! percents.is_empty());
		assert!(percents.windows(2).all(|w| w[0] < w[1]), "Progress must not regress.");
		assert_eq!(percents.last(), Some(&100));
		assert!(recorder.errors.lock().unwrap().is_empty());
		drop(percents);

		// And the session is reusable.
		assert!(wait_idle(&session), "Session should return to idle.");
		assert!(session.table_of_contents().is_ok());
	}

	#[test]
	fn t_rip_error() {
		let disc = Arc::new(FakeDisc {
			tracks: vec![(true, 0, 999)],
			reads: AtomicU32::new(0),
			read_delay: Duration::ZERO,
			fail_after: 500,
		});
		let session = session_with(&disc);
		let recorder = Arc::new(Recorder::default());

		let mut reader = session.track(1, Some(Box::new(Arc::clone(&recorder))))
			.expect("Rip should start.");
		let mut out = Vec::new();
		assert!(reader.read_to_end(&mut out).is_err(), "The stream should surface the failure.");

		assert!(wait_idle(&session), "Session should return to idle after an error.");
		let errors = recorder.errors.lock().unwrap();
		assert_eq!(errors.len(), 1);
		assert!(errors[0].contains("synthetic read failure"), "Unexpected message: {}", errors[0]);
	}

	#[test]
	fn t_rip_cancel() {
		let disc = Arc::new(FakeDisc {
			tracks: vec![(true, 0, 999)],
			reads: AtomicU32::new(0),
			read_delay: Duration::from_millis(1),
			fail_after: u32::MAX,
		});
		let session = session_with(&disc);

		let mut reader = session.track(1, None).expect("Rip should start.");

		// Drain three hundred frames' worth, then stop pulling. The worker
		// runs a few frames ahead before the buffer jams.
		let mut sink = vec![0_u8; 300 * CD_FRAME_SIZE];
		reader.read_exact(&mut sink).expect("Early reads should succeed.");

		let now = Instant::now();
		assert_eq!(session.cancel(), Ok(()));
		assert!(
			now.elapsed() < Duration::from_secs(1),
			"Cancellation should land within a poll interval or so.",
		);

		let reads = disc.reads();
		assert!((300..1000).contains(&reads), "Cancel should stop the fill loop ({reads}).");
		assert!(! session.is_busy(), "Cancel returns only after release.");

		// The stream ends cleanly rather than hanging.
		let mut rest = Vec::new();
		reader.read_to_end(&mut rest).expect("Post-cancel reads should EOF.");
		assert_eq!(disc.reads(), reads, "No further frames after cancellation.");
	}

	#[test]
	fn t_rip_reader_dropped() {
		let disc = Arc::new(FakeDisc {
			tracks: vec![(true, 0, 999)],
			reads: AtomicU32::new(0),
			read_delay: Duration::from_millis(1),
			fail_after: u32::MAX,
		});
		let session = session_with(&disc);

		let reader = session.track(1, None).expect("Rip should start.");
		drop(reader);
		assert!(wait_idle(&session), "A dropped reader should release the session.");
		assert!(disc.reads() < 1000, "The fill loop should have stopped early.");
	}

	#[test]
	fn t_track_to() {
		let disc = FakeDisc::standard();
		let session = session_with(&disc);

		let mut sink = Vec::new();
		session.track_to(3, None, &mut sink).expect("Copy should succeed.");
		assert_eq!(sink.len(), 1000 * CD_FRAME_SIZE);
		assert!(wait_idle(&session));
	}

	#[test]
	fn t_eject() {
		let disc = FakeDisc::standard();
		let session = session_with(&disc);
		session.open().expect("Open should succeed.");
		assert!(session.eject(), "Eject should report success.");
		assert!(! session.is_busy(), "Eject should have cancelled the hold.");
	}
}
