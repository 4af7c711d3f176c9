/*!
# CDDA: Disc Identity
*/

use crate::{
	CD_LEADIN,
	CddaError,
	Drive,
};



/// # MusicBrainz Lookup Base.
const MUSICBRAINZ_WS: &str = "https://musicbrainz.org/ws/2/discid/";



#[derive(Debug, Clone)]
/// # Disc Identifiers.
///
/// Content-based identifiers computed from the disc layout, for looking up
/// metadata from the usual web services.
pub(crate) struct DiscIds {
	/// # FreeDB/CDDB Id.
	pub(crate) cddb: String,

	/// # MusicBrainz Disc Id.
	pub(crate) musicbrainz: String,

	/// # MusicBrainz Lookup URL.
	pub(crate) musicbrainz_url: String,
}

/// # Compute Disc Identifiers.
///
/// Walk the drive's track list, collect the lead-in-adjusted offsets, and
/// hand them to `cdtoc` for the actual id math.
///
/// ## Errors
///
/// This will return an error if the layout cannot be read or does not add up
/// to a valid audio disc.
pub(crate) fn disc_ids(drive: &dyn Drive) -> Result<DiscIds, CddaError> {
	// Grab the position and type for each track.
	let mut audio = Vec::new();
	let mut data = None;
	let total = drive.num_tracks()?;
	for idx in 1..=total {
		let (start, _) = drive.track_bounds(idx)?;
		let start = start + CD_LEADIN;
		if drive.is_audio(idx)? { audio.push(start); }
		else if data.is_none() { data.replace(start); }
	}

	// Grab the leadout, then build the ToC.
	let leadout = drive.leadout()? + CD_LEADIN;
	let toc = cdtoc::Toc::from_parts(audio, data, leadout)
		.map_err(|e| CddaError::DiscRead(e.to_string()))?;

	let musicbrainz = toc.musicbrainz_id().to_string();
	let musicbrainz_url = format!("{MUSICBRAINZ_WS}{musicbrainz}?inc=recordings");
	Ok(DiscIds {
		cddb: toc.cddb_id().to_string(),
		musicbrainz,
		musicbrainz_url,
	})
}
