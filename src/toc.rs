/*!
# CDDA: Table of Contents
*/

use crate::{
	CddaError,
	SECTORS_PER_SECOND,
	TrackFlags,
};
use dactyl::NiceU32;
use std::fmt;



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # TOC Entry.
///
/// One audio track on the disc. Entries are built while reading the disc's
/// table of contents and are immutable afterward.
///
/// The `id` is the drive's native track number; because data tracks are
/// skipped during the TOC build without renumbering, ids may have gaps.
pub struct TocEntry {
	/// # Track Number (1-based, native).
	id: u8,

	/// # First Sector (absolute).
	first_sector: u32,

	/// # Last Sector (absolute, inclusive).
	last_sector: u32,

	/// # Copy Permit Flag.
	copy_permitted: bool,

	/// # Pre-Emphasis Flag.
	linear_preemphasis: bool,

	/// # Channel Count.
	channels: u8,
}

impl TocEntry {
	/// # New Entry.
	pub(crate) const fn new(id: u8, first_sector: u32, last_sector: u32, flags: TrackFlags)
	-> Self {
		Self {
			id,
			first_sector,
			last_sector,
			copy_permitted: flags.copy_permitted,
			linear_preemphasis: flags.linear_preemphasis,
			channels: flags.channels,
		}
	}

	#[must_use]
	/// # Track Number.
	pub const fn id(&self) -> u8 { self.id }

	#[must_use]
	/// # First Sector.
	pub const fn first_sector(&self) -> u32 { self.first_sector }

	#[must_use]
	/// # Last Sector (inclusive).
	pub const fn last_sector(&self) -> u32 { self.last_sector }

	#[must_use]
	/// # Copy Permitted?
	pub const fn copy_permitted(&self) -> bool { self.copy_permitted }

	#[must_use]
	/// # Linear Pre-Emphasis?
	pub const fn linear_preemphasis(&self) -> bool { self.linear_preemphasis }

	#[must_use]
	/// # Channels.
	pub const fn channels(&self) -> u8 { self.channels }

	#[must_use]
	/// # Total Frames.
	///
	/// Sector bounds are inclusive, so this is one more than their difference.
	pub const fn total_frames(&self) -> u32 {
		self.last_sector - self.first_sector + 1
	}

	#[allow(clippy::integer_division)]
	#[must_use]
	/// # Duration in Seconds.
	pub const fn duration_seconds(&self) -> u32 {
		(self.last_sector - self.first_sector) / SECTORS_PER_SECOND
	}

	#[must_use]
	/// # Duration, `HH:MM:SS`.
	pub fn duration(&self) -> String { hms(self.duration_seconds()) }
}



#[derive(Debug, Clone)]
/// # Table of Contents.
///
/// The ordered audio tracks of a disc, in disc order. A successfully built
/// TOC is never empty; a disc without audio tracks is a read failure, not an
/// empty table.
pub struct Toc(Vec<TocEntry>);

impl fmt::Display for Toc {
	/// # Summarize the TOC.
	///
	/// Print the entries in a nice little table, one row per track, with the
	/// total sector count and runtime at the bottom.
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		/// # Divider.
		const DIVIDER: &str = "--------------------------------------------------\n";

		f.write_str("\n##   FIRST    LAST  COPY  PRE  CHAN  DURATION\n")?;
		f.write_str(DIVIDER)?;
		for e in &self.0 {
			writeln!(
				f,
				"{:02}  {:>6}  {:>6}  {:>4}  {:>3}  {:>4}  {}",
				e.id(),
				e.first_sector(),
				e.last_sector(),
				if e.copy_permitted() { "yes" } else { "no" },
				if e.linear_preemphasis() { "yes" } else { "no" },
				e.channels(),
				e.duration(),
			)?;
		}
		f.write_str(DIVIDER)?;
		writeln!(
			f,
			"Total sectors: {}  duration: {}",
			NiceU32::from(self.total_sectors()),
			self.duration(),
		)
	}
}

impl Toc {
	/// # From Entries.
	///
	/// ## Errors
	///
	/// An empty set is reported as a disc-read failure, and any entry with
	/// impossible sector bounds invalidates the whole table.
	pub(crate) fn from_entries(entries: Vec<TocEntry>) -> Result<Self, CddaError> {
		if entries.is_empty() {
			return Err(CddaError::DiscRead("no audio tracks found".to_owned()));
		}
		if entries.iter().any(|e| e.last_sector <= e.first_sector) {
			return Err(CddaError::DiscRead("impossible track bounds".to_owned()));
		}
		Ok(Self(entries))
	}

	#[must_use]
	/// # Entries.
	pub fn entries(&self) -> &[TocEntry] { &self.0 }

	#[must_use]
	/// # Number of Audio Tracks.
	pub fn len(&self) -> usize { self.0.len() }

	#[must_use]
	/// # Is Empty?
	///
	/// Always `false` for a successfully built TOC, but the conventional
	/// companion to `len` all the same.
	pub fn is_empty(&self) -> bool { self.0.is_empty() }

	#[must_use]
	/// # Entry by Track Number.
	///
	/// Look up an entry by its native track number (not its position).
	pub fn get(&self, id: u8) -> Option<&TocEntry> {
		self.0.iter().find(|e| e.id == id)
	}

	#[must_use]
	/// # Total Sectors.
	///
	/// The last entry's last sector.
	pub fn total_sectors(&self) -> u32 {
		self.0.last().map_or(0, TocEntry::last_sector)
	}

	#[allow(clippy::integer_division)]
	#[must_use]
	/// # Total Duration, `HH:MM:SS`.
	pub fn duration(&self) -> String {
		hms(self.total_sectors() / SECTORS_PER_SECOND)
	}
}



#[allow(clippy::integer_division)]
/// # Seconds to `HH:MM:SS`.
fn hms(secs: u32) -> String {
	let mins = secs / 60;
	format!("{:02}:{:02}:{:02}", mins / 60, mins % 60, secs % 60)
}
