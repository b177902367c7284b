//! Package identity extraction from mod archives.
//!
//! Loaders each ship their own descriptor format. They are probed in a fixed
//! order and the first descriptor present in the archive decides the identity.

use std::io::Read;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::normalize::normalize_filename;

mod toml_scan;

/// The stable identifier of a package plus the name it is shown under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageIdentity {
	/// Cache key across runs. Never empty.
	pub identifier: String,
	/// Only used for fuzzy searching.
	pub display_name: String,
}

impl PackageIdentity {
	/// Builds an identity from manifest values, `None` when the identifier is blank.
	/// A missing display name falls back to the identifier.
	fn from_manifest(identifier: Option<&str>, display_name: Option<&str>) -> Option<Self> {
		let identifier = identifier.map(str::trim).filter(|s| !s.is_empty())?;
		let display_name = display_name.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(identifier);
		Some(Self {
			identifier: identifier.to_string(),
			display_name: display_name.to_string(),
		})
	}

	/// Identity derived purely from the archive's file name.
	pub fn from_filename(archive_path: impl AsRef<Path>) -> Self {
		let file_name = archive_path.as_ref()
			.file_name()
			.map(|n| n.to_string_lossy().into_owned())
			.unwrap_or_default();
		let token = normalize_filename(&file_name);
		Self {
			identifier: token.clone(),
			display_name: token,
		}
	}
}

/// Known descriptor formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
	/// Legacy Forge `mcmod.info`, JSON that is often not quite JSON.
	McmodInfo,
	Fabric,
	Quilt,
	/// Forge 1.13+ `mods.toml`.
	Forge,
	NeoForge,
}

static MCMOD_MODID: Lazy<Regex> = Lazy::new(|| Regex::new(r#""modid"\s*:\s*"([^"]*)""#).expect("modid pattern should compile"));

impl ManifestFormat {
	pub const PROBE_ORDER: [ManifestFormat; 5] = [
		ManifestFormat::McmodInfo,
		ManifestFormat::Fabric,
		ManifestFormat::Quilt,
		ManifestFormat::Forge,
		ManifestFormat::NeoForge,
	];

	/// Path of the descriptor inside the archive.
	pub fn entry_name(self) -> &'static str {
		match self {
			Self::McmodInfo => "mcmod.info",
			Self::Fabric => "fabric.mod.json",
			Self::Quilt => "quilt.mod.json",
			Self::Forge => "META-INF/mods.toml",
			Self::NeoForge => "META-INF/neoforge.mods.toml",
		}
	}

	/// Reads an identity from the descriptor's contents.
	///
	/// `Ok(None)` means the descriptor was readable but had no usable identifier.
	pub fn read_identity(self, content: &str) -> crate::Result<Option<PackageIdentity>> {
		Ok(match self {
			Self::McmodInfo => {
				let modid = MCMOD_MODID.captures(content).and_then(|c| c.get(1)).map(|m| m.as_str());
				PackageIdentity::from_manifest(modid, modid)
			}
			Self::Fabric => {
				let json: serde_json::Value = serde_json::from_str(content)?;
				PackageIdentity::from_manifest(
					json.get("id").and_then(|v| v.as_str()),
					json.get("name").and_then(|v| v.as_str()),
				)
			}
			Self::Quilt => {
				let json: serde_json::Value = serde_json::from_str(content)?;
				let loader = json.get("quilt_loader");
				PackageIdentity::from_manifest(
					loader.and_then(|l| l.get("id")).and_then(|v| v.as_str()),
					loader.and_then(|l| l.get("metadata")).and_then(|m| m.get("name")).and_then(|v| v.as_str()),
				)
			}
			Self::Forge | Self::NeoForge => {
				let modid = toml_scan::get_value("modId", content);
				let display_name = toml_scan::get_value("displayName", content);
				PackageIdentity::from_manifest(modid.as_deref(), display_name.as_deref())
			}
		})
	}
}

/// Extracts the identity of the package at `archive_path`.
///
/// Never fails: unreadable archives, archives without a known descriptor and
/// descriptors without an identifier all fall back to [`PackageIdentity::from_filename`].
pub fn extract_identity(archive_path: impl AsRef<Path>) -> PackageIdentity {
	let archive_path = archive_path.as_ref();
	match read_manifest_identity(archive_path) {
		Ok(Some(identity)) => identity,
		Ok(None) => {
			log::debug!("No usable manifest in {}, using file name.", archive_path.display());
			PackageIdentity::from_filename(archive_path)
		}
		Err(e) => {
			log::warn!("Failed to read manifest from {}: {}", archive_path.display(), e);
			PackageIdentity::from_filename(archive_path)
		}
	}
}

fn read_manifest_identity(archive_path: &Path) -> crate::Result<Option<PackageIdentity>> {
	let mut zip = zip::ZipArchive::new(std::fs::File::open(archive_path)?)?;

	for format in ManifestFormat::PROBE_ORDER {
		let mut entry = match zip.by_name(format.entry_name()) {
			Ok(entry) => entry,
			Err(zip::result::ZipError::FileNotFound) => continue,
			Err(e) => return Err(e.into()),
		};

		let mut content = String::new();
		entry.read_to_string(&mut content)?;
		log::trace!("Reading {:?} manifest from {}", format, archive_path.display());
		return format.read_identity(&content);
	}

	Ok(None)
}
