//! Dated daily snapshots of the store.
//!
//! Snapshots are named `mod_environments_YYYYMMDD.json`, at most one per day.
//! Those older than [`RETENTION_DAYS`] are removed after each snapshot.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use modsort::cache::date_stamp;

pub const RETENTION_DAYS: i64 = 30;

const PREFIX: &str = "mod_environments_";
const SUFFIX: &str = ".json";

pub fn backup_file_name(date: NaiveDate) -> String {
	format!("{}{}{}", PREFIX, date_stamp(date), SUFFIX)
}

/// Date of a snapshot file, `None` for anything else in the folder.
fn backup_date(file_name: &str) -> Option<NaiveDate> {
	let stamp = file_name.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
	NaiveDate::parse_from_str(stamp, "%Y%m%d").ok()
}

#[derive(Debug, Clone)]
pub struct BackupDir {
	path: PathBuf,
}

impl BackupDir {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn backup_path(&self, date: NaiveDate) -> PathBuf {
		self.path.join(backup_file_name(date))
	}

	/// Whether no snapshot was taken on `today` yet.
	pub fn should_backup(&self, today: NaiveDate) -> bool {
		!self.backup_path(today).exists()
	}

	/// Copies `store` to today's snapshot, replacing one taken earlier today, then prunes.
	///
	/// Returns `None` without touching anything when `store` does not exist.
	pub fn snapshot(&self, store: impl AsRef<Path>, today: NaiveDate) -> std::io::Result<Option<PathBuf>> {
		let store = store.as_ref();
		if !store.is_file() {
			return Ok(None);
		}

		std::fs::create_dir_all(&self.path)?;
		let destination = self.backup_path(today);
		let mut tmp = tempfile::NamedTempFile::new_in(&self.path)?;
		std::io::copy(&mut std::fs::File::open(store)?, &mut tmp)?;
		tmp.persist(&destination).map_err(|e| e.error)?;
		log::info!("Backed up {} to {}", store.display(), destination.display());

		self.cleanup(today)?;
		Ok(Some(destination))
	}

	/// Removes snapshots dated [`RETENTION_DAYS`] or more before `today`.
	///
	/// Returns how many were removed.
	pub fn cleanup(&self, today: NaiveDate) -> std::io::Result<usize> {
		let cutoff = today - chrono::Duration::days(RETENTION_DAYS);
		let mut removed = 0;

		for entry in std::fs::read_dir(&self.path)? {
			let entry = entry?;
			let file_name = entry.file_name();
			let date = match file_name.to_str().and_then(backup_date) {
				Some(date) => date,
				None => continue,
			};
			if date <= cutoff {
				log::debug!("Removing expired backup {}", entry.path().display());
				match std::fs::remove_file(entry.path()) {
					Ok(()) => removed += 1,
					Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
					Err(e) => return Err(e),
				}
			}
		}

		Ok(removed)
	}
}
