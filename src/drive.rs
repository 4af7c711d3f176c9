/*!
# CDDA: Drive Primitives
*/

use crate::{
	CD_FRAME_SIZE,
	CddaError,
};
use std::{
	fmt,
	path::Path,
};



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Track Flags.
///
/// The per-track control flags a drive reports alongside the sector bounds.
pub struct TrackFlags {
	/// # Copy Permit Flag.
	pub copy_permitted: bool,

	/// # Pre-Emphasis Flag.
	pub linear_preemphasis: bool,

	/// # Channel Count (typically two).
	pub channels: u8,
}



/// # An Open Drive.
///
/// The capability contract for a drive holding a readable audio disc. The
/// session layer owns exactly one of these between an open and the matching
/// close; frame reads are sequential from wherever the last [`seek`](Drive::seek)
/// pointed.
///
/// Implementations are expected to retry flaky reads internally; a
/// `DiscRead` error out of [`read_frame`](Drive::read_frame) means the retry
/// budget is exhausted and the rip cannot continue.
pub trait Drive: Send {
	/// # Total Number of Tracks.
	///
	/// This counts every track on the disc, data tracks included.
	///
	/// ## Errors
	///
	/// Returns an error if the disc cannot be interrogated.
	fn num_tracks(&self) -> Result<u8, CddaError>;

	/// # Is This an Audio Track?
	///
	/// ## Errors
	///
	/// Returns an error if the track's format cannot be determined.
	fn is_audio(&self, track: u8) -> Result<bool, CddaError>;

	/// # Track Sector Bounds.
	///
	/// The absolute first and last (inclusive) sectors of the track.
	///
	/// ## Errors
	///
	/// Returns an error if the bounds cannot be read.
	fn track_bounds(&self, track: u8) -> Result<(u32, u32), CddaError>;

	/// # Track Flags.
	///
	/// Drives that cannot answer fall back to sensible defaults (copy
	/// forbidden, no pre-emphasis, two channels), so this is infallible.
	fn track_flags(&self, track: u8) -> TrackFlags;

	/// # Lead-Out Sector.
	///
	/// ## Errors
	///
	/// Returns an error if the lead-out position cannot be read.
	fn leadout(&self) -> Result<u32, CddaError>;

	/// # Seek to an Absolute Sector.
	///
	/// ## Errors
	///
	/// Returns an error if the position cannot be set.
	fn seek(&mut self, sector: u32) -> Result<(), CddaError>;

	/// # Read the Next Frame.
	///
	/// Read exactly one frame from the current position into `buf` and
	/// advance by one sector.
	///
	/// ## Errors
	///
	/// Returns an error once the internal retry budget is exhausted.
	fn read_frame(&mut self, buf: &mut [u8; CD_FRAME_SIZE]) -> Result<(), CddaError>;
}

impl fmt::Debug for dyn Drive {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("dyn Drive")
	}
}



/// # Drive Backend.
///
/// The way drives get opened and ejected. The stock implementation is
/// [`CdioBackend`](crate::CdioBackend); tests substitute their own.
pub trait DriveBackend: Send + Sync {
	/// # Open a Drive.
	///
	/// Open the drive at `dev`, or autodetect one if `None`, and verify it
	/// holds a readable audio disc.
	///
	/// ## Errors
	///
	/// Returns an error if there is no disc, the disc is unreadable, or no
	/// drive can be found.
	fn open(&self, dev: Option<&Path>) -> Result<Box<dyn Drive>, CddaError>;

	/// # Eject the Disc.
	///
	/// Returns `true` if the eject succeeded.
	fn eject(&self, dev: Option<&Path>) -> bool;
}
