/*!
# CDDA: Library
*/

#![deny(unsafe_code)]

#![warn(
	clippy::filetype_is_file,
	clippy::integer_division,
	clippy::needless_borrow,
	clippy::nursery,
	clippy::pedantic,
	clippy::perf,
	clippy::suboptimal_flops,
	clippy::unneeded_field_pattern,
	macro_use_extern_crate,
	missing_copy_implementations,
	missing_debug_implementations,
	missing_docs,
	non_ascii_idents,
	trivial_casts,
	trivial_numeric_casts,
	unreachable_pub,
	unused_crate_dependencies,
	unused_extern_crates,
	unused_import_braces,
)]

#![allow(
	clippy::doc_markdown,
	clippy::module_name_repetitions,
	clippy::redundant_pub_crate,
)]

mod cdio;
mod discid;
mod drive;
mod error;
mod progress;
mod rip;
mod session;
mod toc;

pub use cdio::CdioBackend;
pub use drive::{
	Drive,
	DriveBackend,
	TrackFlags,
};
pub use error::CddaError;
pub use progress::{
	RipProgressEvent,
	RipProgressListener,
};
pub use rip::TrackReader;
pub use session::Session;
pub use toc::{
	Toc,
	TocEntry,
};

use std::time::Duration;



/// # Bytes Per Frame.
///
/// One frame of raw CD audio — 588 stereo 16-bit samples — occupying exactly
/// one sector on the disc.
pub const CD_FRAME_SIZE: usize = 2352;

/// # Sectors Per Second.
///
/// Audio discs play back at a fixed seventy-five sectors per second.
pub const SECTORS_PER_SECOND: u32 = 75;

/// # Number of Lead-In Sectors.
///
/// All discs have a 2-second region at the start before any data. Disc
/// identifiers are computed against offsets that include this amount.
pub(crate) const CD_LEADIN: u32 = 150;

/// # Rip Buffer Capacity (Frames).
///
/// The rip engine's bounded queue holds at most this many whole frames; once
/// full, production stalls until the consumer drains some. This is the
/// backpressure mechanism.
pub(crate) const RIP_BUFFER_FRAMES: usize = 8;

/// # Frame Read Retry Budget.
///
/// Number of times a failed frame read is retried before the rip gives up.
pub(crate) const READ_RETRIES: u8 = 20;

/// # Cancellation Poll Interval.
///
/// The longest a rip worker will wait for queue space before rechecking the
/// cancellation flag.
pub(crate) const CANCEL_POLL: Duration = Duration::from_millis(100);

/// # Cancellation Timeout.
///
/// How long `Session::cancel` will wait for an in-flight rip to acknowledge
/// termination before giving up. A frame read blocked inside the drive cannot
/// be interrupted from this layer, so the wait has to be bounded somewhere.
pub(crate) const CANCEL_TIMEOUT: Duration = Duration::from_secs(10);
