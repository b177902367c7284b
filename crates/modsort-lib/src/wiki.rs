//! Mod wiki lookups.
//!
//! The wiki identifies mods by a numeric reference id. Ids are found through a
//! flat index file ([`index`]) or, failing that, the wiki's own search page
//! ([`search`]). The mod's page ([`page`]) then states its runtime environment.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::normalize::{normalize_display_name, normalize_filename, UNKNOWN_TOKEN};

pub mod index;
pub mod page;
pub mod search;

pub use index::WikiIndex;
pub use page::{PageScraper, WikiPageScraper};
pub use search::RemoteSearch;

/// The wiki's numeric key for a mod.
pub type ReferenceId = u32;

/// Which stage of [`WikiSearcher`] produced a reference id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
	Filename,
	DisplayName,
	RemoteSearch,
}

impl std::fmt::Display for MatchKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			MatchKind::Filename => write!(f, "filename"),
			MatchKind::DisplayName => write!(f, "display name"),
			MatchKind::RemoteSearch => write!(f, "remote search"),
		}
	}
}

#[async_trait::async_trait]
pub trait ReferenceSearch: Send + Sync {
	/// Finds the wiki reference id for an archive, `None` when every stage comes up empty.
	async fn resolve_reference_id(&self, archive_path: &Path, display_name: &str) -> Option<(ReferenceId, MatchKind)>;
}

/// Index lookups by file name then display name, falling back to the remote search.
pub struct WikiSearcher {
	index: WikiIndex,
	remote: Option<RemoteSearch>,
}

impl WikiSearcher {
	/// # Parameters
	/// - `index` - The local flat index.
	/// - `remote` - Remote search used as the last resort. `None` keeps lookups offline.
	pub fn new(index: WikiIndex, remote: Option<RemoteSearch>) -> Self {
		Self { index, remote }
	}

	fn find_in_index(&self, token: &str) -> Option<ReferenceId> {
		if token == UNKNOWN_TOKEN {
			return None;
		}
		match self.index.find(token) {
			Ok(id) => id,
			Err(e) => {
				log::warn!("Failed to search wiki index {}: {}", self.index.path().display(), e);
				None
			}
		}
	}
}

#[async_trait::async_trait]
impl ReferenceSearch for WikiSearcher {
	async fn resolve_reference_id(&self, archive_path: &Path, display_name: &str) -> Option<(ReferenceId, MatchKind)> {
		let file_name = archive_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
		if let Some(id) = self.find_in_index(&normalize_filename(&file_name)) {
			return Some((id, MatchKind::Filename));
		}

		if display_name.trim().is_empty() {
			return None;
		}

		let display_token = normalize_display_name(display_name);
		if let Some(id) = self.find_in_index(&display_token) {
			return Some((id, MatchKind::DisplayName));
		}

		let remote = self.remote.as_ref()?;
		if display_token == UNKNOWN_TOKEN {
			return None;
		}
		match remote.search(&display_token.replace('-', "")).await {
			Ok(id) => id.map(|id| (id, MatchKind::RemoteSearch)),
			Err(e) => {
				log::warn!("Wiki search for {} failed: {}", display_name, e);
				None
			}
		}
	}
}

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern should compile"));
static NUMERIC_ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"&#(?:[xX]([0-9a-fA-F]+)|([0-9]+));").expect("entity pattern should compile"));

/// Visible text of an HTML fragment: tags removed, entities decoded, trimmed.
///
/// Numeric entities naming no valid character are dropped.
fn html_text(fragment: &str) -> String {
	let text = TAG.replace_all(fragment, "");
	let text = text.replace("&nbsp;", " ")
		.replace("&lt;", "<")
		.replace("&gt;", ">")
		.replace("&quot;", "\"");
	let text = NUMERIC_ENTITY.replace_all(&text, |captures: &regex::Captures| {
		let code = match (captures.get(1), captures.get(2)) {
			(Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
			(None, Some(decimal)) => decimal.as_str().parse::<u32>().ok(),
			(None, None) => None,
		};
		code.and_then(char::from_u32).map(String::from).unwrap_or_default()
	});
	text.replace("&amp;", "&").trim().to_string()
}
