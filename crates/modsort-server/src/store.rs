//! The shared environment store, a single JSON file in the data directory.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use modsort::cache::UPDATE_TIME_KEY;
use modsort::{Classification, EnvironmentCache};

pub const STORE_FILE_NAME: &str = "mod_environments.json";

#[derive(Debug, Clone)]
pub struct Store {
	path: PathBuf,
}

impl Store {
	pub fn new(data_dir: impl AsRef<Path>) -> Self {
		Self { path: data_dir.as_ref().join(STORE_FILE_NAME) }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn exists(&self) -> bool {
		self.path.is_file()
	}

	/// Loads the store, a missing file is an empty store.
	pub fn load(&self) -> modsort::Result<EnvironmentCache> {
		match EnvironmentCache::load_from_file(&self.path) {
			Err(modsort::Error::IO(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(EnvironmentCache::new()),
			other => other,
		}
	}

	/// Merges `upload` into the store, stamps it with `today` and writes it back.
	///
	/// Returns the number of entries in the merged store.
	pub fn merge(&self, upload: Vec<(String, Classification)>, today: NaiveDate) -> modsort::Result<usize> {
		let mut cache = self.load()?;
		cache.merge(upload);
		cache.set_update_time(today);
		cache.save_to_file(&self.path)?;
		Ok(cache.len())
	}
}

/// Validates an upload body.
///
/// The body must be a JSON object with at least one entry, every value a terminal
/// classification. A client-supplied `update_time` is dropped.
pub fn parse_upload(body: &[u8]) -> Result<Vec<(String, Classification)>, String> {
	let value: serde_json::Value = serde_json::from_slice(body).map_err(|e| format!("invalid JSON: {}", e))?;
	let obj = value.as_object().ok_or_else(|| "upload must be a JSON object".to_string())?;

	let mut entries = Vec::with_capacity(obj.len());
	for (identifier, value) in obj {
		if identifier == UPDATE_TIME_KEY {
			continue;
		}
		let classification = value.as_str().map(Classification::parse).unwrap_or_default();
		if !classification.is_terminal() {
			return Err(format!("invalid classification for {}: {}", identifier, value));
		}
		entries.push((identifier.clone(), classification));
	}

	if entries.is_empty() {
		return Err("No data provided".to_string());
	}
	Ok(entries)
}
