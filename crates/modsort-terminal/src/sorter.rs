//! Copies classified archives into one folder per classification.

use std::path::{Path, PathBuf};

use modsort::classifier::Resolution;
use modsort::run::PackageSink;
use modsort::Classification;

/// Destination folder names, created next to the `mods` folder.
pub fn folder_name(classification: Classification) -> &'static str {
	match classification {
		Classification::Required => "服务端需装",
		Classification::Optional => "服务端可选",
		Classification::Unsupported => "服务端无效",
		Classification::Unknown => "无法识别",
	}
}

const CLASSIFICATIONS: [Classification; 4] = [
	Classification::Required,
	Classification::Optional,
	Classification::Unsupported,
	Classification::Unknown,
];

pub struct FolderSorter {
	root: PathBuf,
}

impl FolderSorter {
	/// Creates the destination folders under `root`, emptying any that already exist.
	pub fn prepare(root: impl Into<PathBuf>) -> std::io::Result<Self> {
		let sorter = Self { root: root.into() };
		for classification in CLASSIFICATIONS {
			let folder = sorter.folder_for(classification);
			if folder.is_dir() {
				clear_folder(&folder)?;
				log::debug!("Cleared {}", folder.display());
			} else {
				std::fs::create_dir_all(&folder)?;
				log::debug!("Created {}", folder.display());
			}
		}
		Ok(sorter)
	}

	pub fn folder_for(&self, classification: Classification) -> PathBuf {
		self.root.join(folder_name(classification))
	}
}

fn clear_folder(folder: &Path) -> std::io::Result<()> {
	for entry in std::fs::read_dir(folder)? {
		let path = entry?.path();
		if path.is_dir() {
			std::fs::remove_dir_all(&path)?;
		} else {
			std::fs::remove_file(&path)?;
		}
	}
	Ok(())
}

/// `destination`, or the first of `name_1.ext`, `name_2.ext`, ... that does not exist yet.
fn free_destination(destination: PathBuf) -> PathBuf {
	if !destination.exists() {
		return destination;
	}
	let stem = destination.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
	let extension = destination.extension().map(|e| format!(".{}", e.to_string_lossy())).unwrap_or_default();

	(1..)
		.map(|n| destination.with_file_name(format!("{}_{}{}", stem, n, extension)))
		.find(|candidate| !candidate.exists())
		.unwrap_or(destination)
}

impl PackageSink for FolderSorter {
	fn place(&mut self, archive_path: &Path, resolution: &Resolution) -> modsort::Result<()> {
		let file_name = archive_path.file_name().ok_or_else(|| modsort::Error::Parse(format!("{} has no file name", archive_path.display())))?;
		let destination = free_destination(self.folder_for(resolution.classification).join(file_name));

		std::fs::copy(archive_path, &destination)?;
		log::info!("Copied {} to {}", archive_path.display(), destination.display());
		Ok(())
	}
}
