//! Environment caches.
//!
//! Resolved classifications are remembered at three levels:
//! - [`RunBatch`] collects what a single run learned, to be uploaded when it finishes.
//! - [`LocalCache`] is the on-disk copy consulted before any network lookup.
//! - the shared store kept by the sync server, which uses [`EnvironmentCache`] directly.
//!
//! The on-disk format is a flat JSON object of `identifier: classification`
//! with one reserved key, `update_time`, holding a `YYYYMMDD` date.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::Classification;

/// Reserved key holding the date of the last refresh.
pub const UPDATE_TIME_KEY: &str = "update_time";

/// Formats a date the way `update_time` and backup names store it.
pub fn date_stamp(date: chrono::NaiveDate) -> String {
	date.format("%Y%m%d").to_string()
}

/// Today's date in local time.
pub fn today() -> chrono::NaiveDate {
	chrono::Local::now().date_naive()
}

/// Identifier to classification mapping plus its refresh date.
///
/// Only terminal classifications are ever stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentCache {
	entries: BTreeMap<String, Classification>,
	update_time: Option<String>,
}

impl EnvironmentCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, identifier: &str) -> Option<Classification> {
		self.entries.get(identifier).copied()
	}

	/// Stores a classification, returns `false` for [`Unknown`](Classification::Unknown) which is never stored.
	pub fn insert(&mut self, identifier: impl Into<String>, classification: Classification) -> bool {
		if !classification.is_terminal() {
			return false;
		}
		self.entries.insert(identifier.into(), classification);
		true
	}

	/// Merges by key: incoming entries replace existing ones with the same identifier,
	/// every other existing entry is left alone.
	pub fn merge(&mut self, incoming: impl IntoIterator<Item = (String, Classification)>) {
		for (identifier, classification) in incoming {
			self.insert(identifier, classification);
		}
	}

	pub fn update_time(&self) -> Option<&str> {
		self.update_time.as_deref()
	}

	pub fn set_update_time(&mut self, date: chrono::NaiveDate) {
		self.update_time = Some(date_stamp(date));
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/* Serialization */

	/// Reads a cache from its JSON object form.
	///
	/// Values that are not terminal classifications are skipped.
	///
	/// # Errors
	/// - [`Parse`](crate::Error::Parse) when `value` is not an object.
	pub fn from_json(value: &serde_json::Value) -> crate::Result<Self> {
		let obj = value.as_object().ok_or_else(|| crate::Error::Parse("environment cache must be a JSON object".to_string()))?;

		let mut cache = Self::new();
		for (key, value) in obj {
			if key == UPDATE_TIME_KEY {
				cache.update_time = value.as_str().map(str::to_string);
				continue;
			}

			let classification = value.as_str().map(Classification::parse).unwrap_or_default();
			if !cache.insert(key.clone(), classification) {
				log::debug!("Skipping cache entry {} with unusable value {}", key, value);
			}
		}
		Ok(cache)
	}

	pub fn to_json(&self) -> serde_json::Value {
		let mut obj = serde_json::Map::new();
		for (identifier, classification) in &self.entries {
			obj.insert(identifier.clone(), serde_json::Value::from(classification.as_str()));
		}
		if let Some(update_time) = &self.update_time {
			obj.insert(UPDATE_TIME_KEY.to_string(), serde_json::Value::from(update_time.as_str()));
		}
		serde_json::Value::Object(obj)
	}

	/// # Errors
	/// - [`IO`](crate::Error::IO) when opening or reading from the file.
	/// - [`SerdeJSON`](crate::Error::SerdeJSON) or [`Parse`](crate::Error::Parse) when the contents are not a cache.
	pub fn load_from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
		let file = std::fs::File::open(path)?;
		let value: serde_json::Value = serde_json::from_reader(std::io::BufReader::new(file))?;
		Self::from_json(&value)
	}

	/// Writes the cache to `path`, creating parent directories as needed.
	///
	/// Each call writes its own uniquely named temporary file beside `path` and
	/// renames it over `path`, so concurrent writers replace each other whole
	/// and readers never observe a half written cache.
	pub fn save_to_file(&self, path: impl AsRef<Path>) -> crate::Result<()> {
		let path = path.as_ref();
		let parent = match path.parent() {
			Some(parent) if !parent.as_os_str().is_empty() => parent,
			_ => Path::new("."),
		};
		std::fs::create_dir_all(parent)?;

		let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
		serde_json::to_writer_pretty(&mut tmp, &self.to_json())?;
		tmp.as_file().sync_all()?;
		tmp.persist(path).map_err(|e| e.error)?;
		Ok(())
	}
}

/// The client's persistent cache file, loaded once per run.
#[derive(Debug)]
pub struct LocalCache {
	path: PathBuf,
	cache: EnvironmentCache,
}

impl LocalCache {
	/// Loads the cache at `path`. A missing file is an empty cache, as is an unreadable one.
	pub fn open(path: impl Into<PathBuf>) -> Self {
		let path = path.into();
		let cache = match EnvironmentCache::load_from_file(&path) {
			Ok(cache) => cache,
			Err(crate::Error::IO(e)) if e.kind() == std::io::ErrorKind::NotFound => {
				log::debug!("No local cache at {}, starting empty.", path.display());
				EnvironmentCache::new()
			}
			Err(e) => {
				log::warn!("Failed to read local cache {}: {}", path.display(), e);
				EnvironmentCache::new()
			}
		};
		Self { path, cache }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn cache(&self) -> &EnvironmentCache {
		&self.cache
	}

	pub fn get(&self, identifier: &str) -> Option<Classification> {
		self.cache.get(identifier)
	}

	/// Records a resolution and writes it through to disk immediately.
	///
	/// The file is re-read before writing so entries written by someone else since
	/// this cache was opened survive. There is no locking, the last writer wins.
	/// The in-memory entry is kept even when writing fails.
	pub fn persist(&mut self, identifier: &str, classification: Classification) -> crate::Result<()> {
		if !self.cache.insert(identifier, classification) {
			return Ok(());
		}

		let mut on_disk = match EnvironmentCache::load_from_file(&self.path) {
			Ok(cache) => cache,
			Err(e) => {
				log::trace!("Rewriting local cache from memory: {}", e);
				self.cache.clone()
			}
		};
		on_disk.insert(identifier, classification);
		on_disk.save_to_file(&self.path)
	}
}

/// Classifications newly learned during one run, uploaded as one batch at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct RunBatch {
	entries: BTreeMap<String, Classification>,
}

impl RunBatch {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a terminal classification, [`Unknown`](Classification::Unknown) is ignored.
	pub fn insert(&mut self, identifier: impl Into<String>, classification: Classification) {
		if classification.is_terminal() {
			self.entries.insert(identifier.into(), classification);
		}
	}

	pub fn get(&self, identifier: &str) -> Option<Classification> {
		self.entries.get(identifier).copied()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl IntoIterator for RunBatch {
	type Item = (String, Classification);
	type IntoIter = std::collections::btree_map::IntoIter<String, Classification>;
	fn into_iter(self) -> Self::IntoIter {
		self.entries.into_iter()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn unknown_is_never_stored() {
		let mut cache = EnvironmentCache::new();
		assert!(!cache.insert("a", Classification::Unknown));
		assert!(cache.is_empty());

		let mut batch = RunBatch::new();
		batch.insert("a", Classification::Unknown);
		assert!(batch.is_empty());
	}

	#[test]
	fn merge_overwrites_only_incoming_keys() {
		let mut cache = EnvironmentCache::from_json(&json!({"foo": "unsupported", "bar": "optional"})).unwrap();
		cache.merge(vec![("bar".to_string(), Classification::Required), ("baz".to_string(), Classification::Optional)]);
		assert_eq!(cache.get("foo"), Some(Classification::Unsupported));
		assert_eq!(cache.get("bar"), Some(Classification::Required));
		assert_eq!(cache.get("baz"), Some(Classification::Optional));
	}

	#[test]
	fn json_form() {
		let cache = EnvironmentCache::from_json(&json!({
			"foo": "unsupported",
			"legacy": "server_required",
			"junk": 4,
			"pending": "unknown",
			"update_time": "20240101"
		})).unwrap();
		assert_eq!(cache.len(), 2);
		assert_eq!(cache.update_time(), Some("20240101"));
		assert_eq!(cache.to_json(), json!({"foo": "unsupported", "legacy": "required", "update_time": "20240101"}));

		assert!(EnvironmentCache::from_json(&json!(["foo"])).is_err());
	}

	#[test]
	fn date_stamp_format() {
		let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
		assert_eq!(date_stamp(date), "20240307");
	}

	#[test]
	fn local_cache_writes_through() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("mod_environments.json");

		let mut local = LocalCache::open(&path);
		assert!(local.cache().is_empty());
		local.persist("examplemod", Classification::Required).unwrap();
		local.persist("pending", Classification::Unknown).unwrap();

		let reopened = LocalCache::open(&path);
		assert_eq!(reopened.get("examplemod"), Some(Classification::Required));
		assert_eq!(reopened.get("pending"), None);
	}

	#[test]
	fn local_cache_keeps_foreign_writes() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("mod_environments.json");

		let mut local = LocalCache::open(&path);
		let mut other = LocalCache::open(&path);
		other.persist("theirs", Classification::Optional).unwrap();
		local.persist("ours", Classification::Unsupported).unwrap();

		let reopened = EnvironmentCache::load_from_file(&path).unwrap();
		assert_eq!(reopened.get("theirs"), Some(Classification::Optional));
		assert_eq!(reopened.get("ours"), Some(Classification::Unsupported));
	}

	#[test]
	fn overlapping_saves_leave_a_whole_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("mod_environments.json");

		for round in 0..20 {
			let writers: Vec<_> = (0..8)
				.map(|writer| {
					let path = path.clone();
					std::thread::spawn(move || {
						let mut cache = EnvironmentCache::new();
						for i in 0..(writer * 50 + round) {
							cache.insert(format!("mod-{}-{}", writer, i), Classification::Optional);
						}
						cache.save_to_file(&path).unwrap();
					})
				})
				.collect();
			for writer in writers {
				writer.join().unwrap();
			}

			EnvironmentCache::load_from_file(&path).unwrap();
		}

		let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
		assert_eq!(leftovers, 1);
	}

	#[test]
	fn corrupt_local_cache_starts_empty() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("mod_environments.json");
		std::fs::write(&path, "{ nope").unwrap();
		assert!(LocalCache::open(&path).cache().is_empty());
	}

	#[test]
	fn batch_serializes_as_flat_object() {
		let mut batch = RunBatch::new();
		batch.insert("bar", Classification::Required);
		assert_eq!(serde_json::to_value(&batch).unwrap(), json!({"bar": "required"}));
	}
}
