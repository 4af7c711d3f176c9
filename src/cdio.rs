/*!
# CDDA: `libcdio` Backend
*/

use crate::{
	CD_FRAME_SIZE,
	CddaError,
	Drive,
	DriveBackend,
	READ_RETRIES,
	TrackFlags,
};
use libcdio_sys::{
	cdio_track_enums_CDIO_CDROM_LEADOUT_TRACK,
	discmode_t_CDIO_DISC_MODE_CD_DA,
	discmode_t_CDIO_DISC_MODE_CD_MIXED,
	driver_id_t_DRIVER_DEVICE, // The equivalent of "use whatever's best".
	driver_return_code_t_DRIVER_OP_SUCCESS,
	track_flag_t_CDIO_TRACK_FLAG_TRUE,
	track_format_t_TRACK_FORMAT_AUDIO,
	track_format_t_TRACK_FORMAT_ERROR,
};
use std::{
	ffi::CString,
	os::unix::ffi::OsStrExt,
	path::Path,
	sync::Once,
};



static LIBCDIO_INIT: Once = Once::new();



#[derive(Debug, Clone, Copy, Default)]
/// # Stock Drive Backend.
///
/// Opens real hardware through `libcdio` and ejects through
/// `cdio_eject_media_drive`, falling back to the external `eject` utility
/// when the library call is refused (some drives only respond to the
/// latter).
pub struct CdioBackend;

impl DriveBackend for CdioBackend {
	#[inline]
	fn open(&self, dev: Option<&Path>) -> Result<Box<dyn Drive>, CddaError> {
		CdioDrive::new(dev).map(|d| Box::new(d) as Box<dyn Drive>)
	}

	#[allow(unsafe_code)]
	fn eject(&self, dev: Option<&Path>) -> bool {
		init();

		let cdev = dev.and_then(|p| CString::new(p.as_os_str().as_bytes()).ok());
		let res = unsafe {
			libcdio_sys::cdio_eject_media_drive(
				cdev.as_ref().map_or_else(std::ptr::null, |v| v.as_ptr()),
			)
		};
		if res == driver_return_code_t_DRIVER_OP_SUCCESS { return true; }

		// The library call failed; give the external utility a crack at it.
		let mut cmd = std::process::Command::new("eject");
		if let Some(p) = dev { cmd.arg(p); }
		cmd.status().is_ok_and(|s| s.success())
	}
}



#[derive(Debug)]
#[allow(dead_code)] // We just want to make sure dev lives as long as the ptr.
/// # An Open `libcdio` Drive.
struct CdioDrive {
	/// # Device Path.
	dev: Option<CString>,

	/// # CDIO Instance.
	ptr: *mut libcdio_sys::CdIo_t,

	/// # Next Sector to Read.
	pos: i32,
}

// The pointer is exclusively owned and only touched through &mut self or at
// drop, so handing the whole thing to a rip worker thread is fine.
#[allow(unsafe_code)]
unsafe impl Send for CdioDrive {}

impl Drop for CdioDrive {
	#[allow(unsafe_code)]
	fn drop(&mut self) {
		// Release the C memory!
		if ! self.ptr.is_null() {
			unsafe { libcdio_sys::cdio_destroy(self.ptr); }
		}
	}
}

impl CdioDrive {
	#[allow(unsafe_code)]
	/// # Open!
	///
	/// Open the drive at `dev`, or whatever drive the library digs up if
	/// unconfigured, and make sure it is holding an audio disc.
	///
	/// ## Errors
	///
	/// This will return an error if the device path is obviously wrong, the
	/// drive cannot be opened, or the disc is missing/unsupported.
	fn new(dev: Option<&Path>) -> Result<Self, CddaError> {
		// Make sure the library has been initialized.
		init();

		// Take a look at the desired device.
		let dev = match dev {
			Some(dev) => {
				if ! dev.exists() {
					return Err(CddaError::DiscRead(format!(
						"CDROM drive [{}] not found.",
						dev.display(),
					)));
				}
				let original = dev.display().to_string();
				let dev = CString::new(dev.as_os_str().as_bytes())
					.map_err(|_| CddaError::DiscRead(format!(
						"invalid device path [{original}]"
					)))?;
				Some(dev)
			},
			None => None,
		};

		// Connect to it.
		let ptr = unsafe {
			libcdio_sys::cdio_open(
				dev.as_ref().map_or_else(std::ptr::null, |v| v.as_ptr()),
				driver_id_t_DRIVER_DEVICE,
			)
		};

		// NULL is bad.
		if ptr.is_null() {
			return Err(CddaError::DiscRead(
				"unable to open a connection with the drive".to_owned(),
			));
		}

		let out = Self { dev, ptr, pos: 0 };
		out.check_disc_mode()?;
		Ok(out)
	}

	#[allow(unsafe_code)]
	/// # Check Disc Mode.
	///
	/// This makes sure an audio CD is actually present in the drive.
	///
	/// ## Errors
	///
	/// Returns an error if the disc is missing or unsupported.
	fn check_disc_mode(&self) -> Result<(), CddaError> {
		let discmode = unsafe {
			libcdio_sys::cdio_get_discmode(self.ptr)
		};
		if discmode == discmode_t_CDIO_DISC_MODE_CD_DA || discmode == discmode_t_CDIO_DISC_MODE_CD_MIXED {
			Ok(())
		}
		else {
			Err(CddaError::DiscRead(
				"is there an audio CD in the drive?".to_owned(),
			))
		}
	}

	#[allow(unsafe_code)]
	/// # Track LSN Helper.
	fn track_lsn(&self, track: u8) -> Result<u32, CddaError> {
		let raw = unsafe {
			libcdio_sys::cdio_get_track_lsn(self.ptr, track)
		};
		if raw < 0 {
			Err(CddaError::DiscRead(format!("unable to read the start of track #{track}")))
		}
		else { Ok(raw.unsigned_abs()) }
	}
}

impl Drive for CdioDrive {
	#[allow(unsafe_code)]
	fn num_tracks(&self) -> Result<u8, CddaError> {
		let raw = unsafe {
			libcdio_sys::cdio_get_num_tracks(self.ptr)
		};

		if raw == 0 {
			Err(CddaError::DiscRead("unable to obtain the track total".to_owned()))
		}
		else { Ok(raw) }
	}

	#[allow(unsafe_code)]
	fn is_audio(&self, track: u8) -> Result<bool, CddaError> {
		let kind = unsafe {
			libcdio_sys::cdio_get_track_format(self.ptr, track)
		};

		if kind == track_format_t_TRACK_FORMAT_ERROR {
			Err(CddaError::DiscRead(format!("unreadable format for track #{track}")))
		}
		else { Ok(kind == track_format_t_TRACK_FORMAT_AUDIO) }
	}

	#[allow(unsafe_code)]
	fn track_bounds(&self, track: u8) -> Result<(u32, u32), CddaError> {
		let first = self.track_lsn(track)?;
		let last = unsafe {
			libcdio_sys::cdio_get_track_last_lsn(self.ptr, track)
		};
		if last < 0 {
			Err(CddaError::DiscRead(format!("unable to read the end of track #{track}")))
		}
		else { Ok((first, last.unsigned_abs())) }
	}

	#[allow(unsafe_code)]
	fn track_flags(&self, track: u8) -> TrackFlags {
		let copy_permitted = track_flag_t_CDIO_TRACK_FLAG_TRUE == unsafe {
			libcdio_sys::cdio_get_track_copy_permit(self.ptr, track)
		};
		let linear_preemphasis = track_flag_t_CDIO_TRACK_FLAG_TRUE == unsafe {
			libcdio_sys::cdio_get_track_preemphasis(self.ptr, track)
		};
		let channels = unsafe {
			libcdio_sys::cdio_get_track_channels(self.ptr, track)
		};

		TrackFlags {
			copy_permitted,
			linear_preemphasis,
			// Errors come back negative; assume stereo in that case.
			channels: u8::try_from(channels).ok().filter(|&c| c != 0).unwrap_or(2),
		}
	}

	fn leadout(&self) -> Result<u32, CddaError> {
		let idx = u8::try_from(cdio_track_enums_CDIO_CDROM_LEADOUT_TRACK)
			.unwrap_or(170);
		self.track_lsn(idx)
	}

	fn seek(&mut self, sector: u32) -> Result<(), CddaError> {
		self.pos = i32::try_from(sector)
			.map_err(|_| CddaError::DiscRead(format!("sector {sector} is out of range")))?;
		Ok(())
	}

	#[allow(unsafe_code)]
	fn read_frame(&mut self, buf: &mut [u8; CD_FRAME_SIZE]) -> Result<(), CddaError> {
		// Silly, but would otherwise fail quietly.
		const _: () = assert!(CD_FRAME_SIZE == 2352);

		for _ in 0..READ_RETRIES {
			let res = unsafe {
				libcdio_sys::mmc_read_cd(
					self.ptr,
					buf.as_mut_ptr().cast(),
					self.pos,
					1,      // Sector type: CDDA.
					0,      // No random data manipulation thank you kindly.
					0,      // No header syncing.
					0,      // No headers.
					1,      // YES audio block!
					0,      // No EDC.
					0,      // No C2.
					0,      // No subchannel.
					CD_FRAME_SIZE as u16,
					1,      // One block at a time.
				)
			};
			if res == driver_return_code_t_DRIVER_OP_SUCCESS {
				self.pos += 1;
				return Ok(());
			}
		}

		Err(CddaError::DiscRead(format!(
			"sector {} failed after {READ_RETRIES} attempts",
			self.pos,
		)))
	}
}



#[allow(unsafe_code)]
/// # Initialize `libcdio`.
fn init() {
	LIBCDIO_INIT.call_once(|| unsafe { libcdio_sys::cdio_init(); });
}
