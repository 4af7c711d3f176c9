/*!
# CDDA: Errors
*/

use std::{
	error::Error,
	fmt,
};



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Errors.
///
/// Everything that can go wrong while talking to the drive. `DiscInUse` is
/// kept distinct from `DiscRead` because it implies a disc is physically
/// present (some other caller already validated the media).
pub enum CddaError {
	/// # Cancellation was not acknowledged in time.
	CancelTimedOut,

	/// # The session is already holding the drive.
	DiscInUse,

	/// # No disc, unreadable disc, or no drive.
	DiscRead(String),

	/// # Invalid track number.
	InvalidTrack(u8),
}

impl Error for CddaError {}

impl fmt::Display for CddaError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::CancelTimedOut => f.write_str("The rip did not acknowledge cancellation in time."),
			Self::DiscInUse => f.write_str("The drive is already in use."),
			Self::DiscRead(s) => write!(f, "Unable to read the disc: {s}"),
			Self::InvalidTrack(n) => write!(f, "There is no track #{n} on this disc."),
		}
	}
}
