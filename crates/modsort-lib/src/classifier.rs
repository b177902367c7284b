//! Classification of a single package through the fallback chain.
//!
//! Each package moves through these states:
//!
//! ```text
//! CacheCheck -> RegistryPath -> WikiPath -> Unresolved
//!      \              \             \
//!       +--------------+-------------+--> Resolved
//! ```
//!
//! A cache hit resolves without any network traffic. Anything resolved by the
//! registry or the wiki is written to the local cache and added to the run's
//! [`RunBatch`]. Unresolved packages come out as [`Classification::Unknown`]
//! and are left out of both, so they are retried next run.

use std::path::Path;

use crate::cache::{LocalCache, RunBatch};
use crate::manifest::{extract_identity, PackageIdentity};
use crate::registry::{ModrinthRegistry, RegistryLookup};
use crate::wiki::{MatchKind, PageScraper, ReferenceSearch, RemoteSearch, WikiIndex, WikiPageScraper, WikiSearcher};
use crate::Classification;

/// Where a classification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
	Cache,
	Registry,
	Wiki(MatchKind),
	Unresolved,
}

/// The outcome of classifying one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
	pub identity: PackageIdentity,
	pub classification: Classification,
	pub source: ResolutionSource,
}

enum State {
	CacheCheck,
	RegistryPath,
	WikiPath,
	Resolved(Classification, ResolutionSource),
	Unresolved,
}

/// Runs the fallback chain and owns the state of one classification run.
pub struct Classifier {
	cache: LocalCache,
	batch: RunBatch,
	registry: Box<dyn RegistryLookup>,
	search: Box<dyn ReferenceSearch>,
	scraper: Box<dyn PageScraper>,
}

impl Classifier {
	/// Creates a classifier with an empty batch.
	pub fn new(cache: LocalCache, registry: Box<dyn RegistryLookup>, search: Box<dyn ReferenceSearch>, scraper: Box<dyn PageScraper>) -> Self {
		Self {
			cache,
			batch: RunBatch::new(),
			registry,
			search,
			scraper,
		}
	}

	/// Creates a classifier using the real registry and wiki endpoints named in `config`.
	///
	/// The local cache is read from disk here, so pull the shared store first.
	pub fn from_config(config: &crate::Config, client: reqwest::Client) -> Self {
		let registry = ModrinthRegistry::new(client.clone(), config.registry_url());
		let search = WikiSearcher::new(
			WikiIndex::new(config.index_path()),
			Some(RemoteSearch::new(client.clone(), config.wiki_search_url())),
		);
		let scraper = WikiPageScraper::new(client, config.wiki_page_url());

		Self::new(
			LocalCache::open(config.cache_file()),
			Box::new(registry),
			Box::new(search),
			Box::new(scraper),
		)
	}

	pub fn cache(&self) -> &LocalCache {
		&self.cache
	}

	/// Classifications learned so far this run.
	pub fn batch(&self) -> &RunBatch {
		&self.batch
	}

	/// Takes the batch, leaving an empty one behind.
	pub fn take_batch(&mut self) -> RunBatch {
		std::mem::take(&mut self.batch)
	}

	/// Classifies the package at `archive_path`.
	///
	/// Never fails; every error along the way only moves the package further
	/// down the chain, at worst to [`Classification::Unknown`].
	pub async fn classify(&mut self, archive_path: &Path) -> Resolution {
		let identity = extract_identity(archive_path);
		log::debug!("{} identified as {} ({})", archive_path.display(), identity.identifier, identity.display_name);

		let mut state = State::CacheCheck;
		loop {
			state = match state {
				State::CacheCheck => match self.cache.get(&identity.identifier) {
					Some(classification) => State::Resolved(classification, ResolutionSource::Cache),
					None => State::RegistryPath,
				},
				State::RegistryPath => match self.registry.lookup_by_hash(archive_path).await {
					Some(support) if support.server_side.is_terminal() => {
						log::info!("{} found in registry as {}", identity.identifier, support.project_title);
						self.remember(&identity.identifier, support.server_side);
						State::Resolved(support.server_side, ResolutionSource::Registry)
					}
					Some(support) => {
						log::debug!("Registry has no server side answer for {}", support.project_title);
						State::WikiPath
					}
					None => State::WikiPath,
				},
				State::WikiPath => match self.classify_by_wiki(archive_path, &identity).await {
					Some((classification, kind)) => {
						self.remember(&identity.identifier, classification);
						State::Resolved(classification, ResolutionSource::Wiki(kind))
					}
					None => State::Unresolved,
				},
				State::Resolved(classification, source) => {
					log::info!("{} is {} ({:?})", identity.identifier, classification, source);
					return Resolution { identity, classification, source };
				}
				State::Unresolved => {
					log::info!("{} could not be classified", identity.identifier);
					return Resolution {
						identity,
						classification: Classification::Unknown,
						source: ResolutionSource::Unresolved,
					};
				}
			}
		}
	}

	/// Only returns terminal classifications.
	async fn classify_by_wiki(&self, archive_path: &Path, identity: &PackageIdentity) -> Option<(Classification, MatchKind)> {
		let (id, kind) = self.search.resolve_reference_id(archive_path, &identity.display_name).await?;
		log::debug!("{} has wiki reference {} (matched by {})", identity.identifier, id, kind);

		let text = match self.scraper.lookup_support_text(id).await {
			Ok(Some(text)) => text,
			Ok(None) => {
				log::debug!("Wiki page {} has no runtime environment", id);
				return None;
			}
			Err(e) => {
				log::warn!("Failed to read wiki page {}: {}", id, e);
				return None;
			}
		};

		let classification = Classification::from_wiki_text(&text);
		if classification.is_terminal() {
			Some((classification, kind))
		} else {
			log::debug!("Unrecognised runtime environment \"{}\"", text);
			None
		}
	}

	fn remember(&mut self, identifier: &str, classification: Classification) {
		if let Err(e) = self.cache.persist(identifier, classification) {
			log::error!("Failed to write {} to local cache {}: {}", identifier, self.cache.path().display(), e);
		}
		self.batch.insert(identifier, classification);
	}
}
