//! A full classification run over a mods folder.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use crate::classifier::{Classifier, Resolution};
use crate::sync::{PullOutcome, SyncClient};

/// Receives each classified archive, e.g. to copy it into a folder per classification.
pub trait PackageSink: Send {
	fn place(&mut self, archive_path: &Path, resolution: &Resolution) -> crate::Result<()>;
}

/// What a run did.
#[derive(Debug, Default)]
pub struct RunReport {
	/// Archives handed to the sink, in processing order.
	pub results: Vec<(PathBuf, Resolution)>,
	pub pulled: Option<PullOutcome>,
	/// Set when the run stopped early. Nothing is uploaded for a cancelled run.
	pub cancelled: bool,
	pub pushed: bool,
}

/// `*.jar` files directly inside `mods_dir`, sorted by name.
pub fn list_archives(mods_dir: impl AsRef<Path>) -> crate::Result<Vec<PathBuf>> {
	let mut archives = Vec::new();
	for entry in walkdir::WalkDir::new(mods_dir).min_depth(1).max_depth(1).sort_by_file_name() {
		let entry = entry?;
		if entry.file_type().is_file() && entry.path().extension().map_or(false, |ext| ext == "jar") {
			archives.push(entry.into_path());
		}
	}
	Ok(archives)
}

pub struct Run {
	mods_dir: PathBuf,
	cache_path: PathBuf,
	sync: Option<SyncClient>,
}

impl Run {
	/// # Parameters
	/// - `mods_dir` - Folder holding the archives to classify.
	/// - `cache_path` - Local cache file, refreshed before classification when syncing.
	pub fn new(mods_dir: impl Into<PathBuf>, cache_path: impl Into<PathBuf>) -> Self {
		Self {
			mods_dir: mods_dir.into(),
			cache_path: cache_path.into(),
			sync: None,
		}
	}

	/// A run over `mods_dir` syncing with the server named in `config`, if any.
	pub fn from_config(config: &crate::Config, client: &reqwest::Client, mods_dir: impl Into<PathBuf>) -> Self {
		let run = Self::new(mods_dir, config.cache_file());
		match config.server_url() {
			Some(url) => run.with_sync(SyncClient::new(client.clone(), url)),
			None => run,
		}
	}

	pub fn with_sync(mut self, sync: SyncClient) -> Self {
		self.sync = Some(sync);
		self
	}

	/// Pulls, classifies every archive in order, then pushes what was learned.
	///
	/// `build_classifier` is called after the pull so the classifier sees the
	/// refreshed cache. `cancel` is checked before each archive and again before
	/// handing a result to `sink`. Sync and sink failures are logged and do not
	/// stop the run.
	///
	/// # Errors
	/// - [`WalkDir`](crate::Error::WalkDir) when the mods folder cannot be listed.
	pub async fn execute<F>(self, build_classifier: F, sink: &mut dyn PackageSink, cancel: &CancellationToken) -> crate::Result<RunReport>
	where
		F: FnOnce() -> Classifier,
	{
		let mut report = RunReport::default();

		if let Some(sync) = &self.sync {
			match sync.pull(&self.cache_path, crate::cache::today()).await {
				Ok(outcome) => report.pulled = Some(outcome),
				Err(e) => log::warn!("Failed to pull shared environments, using local cache: {}", e),
			}
		}

		let archives = list_archives(&self.mods_dir)?;
		log::info!("Classifying {} archives in {}", archives.len(), self.mods_dir.display());

		let mut classifier = build_classifier();
		for archive in archives {
			if cancel.is_cancelled() {
				report.cancelled = true;
				break;
			}

			let resolution = classifier.classify(&archive).await;

			if cancel.is_cancelled() {
				report.cancelled = true;
				break;
			}

			if let Err(e) = sink.place(&archive, &resolution) {
				log::error!("Failed to place {}: {}", archive.display(), e);
			}
			report.results.push((archive, resolution));
		}

		if report.cancelled {
			log::info!("Run cancelled after {} archives, skipping upload.", report.results.len());
			return Ok(report);
		}

		if let Some(sync) = &self.sync {
			match sync.push(&classifier.take_batch()).await {
				Ok(()) => report.pushed = true,
				Err(e) => log::warn!("Failed to upload this run's environments: {}", e),
			}
		}

		Ok(report)
	}
}
