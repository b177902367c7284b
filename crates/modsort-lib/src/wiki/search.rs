//! Fuzzy lookups through the wiki's search page.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{html_text, ReferenceId};
use crate::normalize::{letters_only, similarity};

/// Only the first few results are worth comparing, the rest are rarely relevant.
const CANDIDATE_LIMIT: usize = 3;
/// Minimum [`similarity`] for a result to be accepted.
const SIMILARITY_THRESHOLD: f64 = 90.0;

static CLASS_LINK: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["'][^"']*/class/(\d+)\.html[^"']*["'][^>]*>(.*?)</a>"#).expect("class link pattern should compile")
});
static NESTED_PARENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^()]*\)").expect("paren pattern should compile"));
static SQUARE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.*?\]").expect("tag pattern should compile"));

/// A search result linking to a mod page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCandidate {
	pub id: ReferenceId,
	pub label: String,
}

/// Collects links to mod pages in page order, keeping the first link to each page.
pub fn parse_candidates(html: &str) -> Vec<SearchCandidate> {
	let mut seen = std::collections::HashSet::<ReferenceId>::new();
	let mut candidates = Vec::new();

	for captures in CLASS_LINK.captures_iter(html) {
		let id = match captures.get(1).and_then(|m| m.as_str().parse::<ReferenceId>().ok()) {
			Some(id) => id,
			None => continue,
		};
		if !seen.insert(id) {
			continue;
		}
		candidates.push(SearchCandidate {
			id,
			label: html_text(captures.get(2).map_or("", |m| m.as_str())),
		});
	}

	candidates
}

/// The part of a result label that names the mod.
///
/// Labels are usually `中文名 (English Name)`, in which case the parenthesized
/// alias is used with any inner parentheses removed, so `落叶 (FallingLeaves (Fabric))`
/// gives `FallingLeaves`. Labels without an alias drop `[TAG]` prefixes and any
/// ` - subtitle`, so `[BB] Brutal Bosses - Custom Bosses` gives `Brutal Bosses`.
pub fn candidate_name(label: &str) -> String {
	if let Some(alias) = parenthesized_alias(label) {
		let mut alias = alias.to_string();
		loop {
			let stripped = NESTED_PARENS.replace_all(&alias, "").into_owned();
			if stripped == alias {
				break;
			}
			alias = stripped;
		}
		return alias.trim().to_string();
	}

	let text = SQUARE_TAGS.replace_all(label, "");
	let text = text.trim();
	text.split(" - ").next().unwrap_or(text).trim().to_string()
}

/// Contents of the first parenthesized group, matched by depth.
/// An unbalanced group runs to the first closing parenthesis.
fn parenthesized_alias(label: &str) -> Option<&str> {
	let open = label.find('(')?;
	let inner = &label[open + 1..];

	let mut depth = 1usize;
	for (i, c) in inner.char_indices() {
		match c {
			'(' => depth += 1,
			')' => {
				depth -= 1;
				if depth == 0 {
					return Some(&inner[..i]);
				}
			}
			_ => {}
		}
	}

	inner.find(')').map(|i| &inner[..i])
}

/// The first of the top results whose name is close enough to `query`.
pub fn pick_candidate(query: &str, candidates: &[SearchCandidate]) -> Option<ReferenceId> {
	let query = letters_only(query);

	for candidate in candidates.iter().take(CANDIDATE_LIMIT) {
		let name = letters_only(&candidate_name(&candidate.label));
		let score = similarity(&query, &name);
		if score >= SIMILARITY_THRESHOLD {
			log::info!("Wiki search matched \"{}\" (similarity {:.2}%)", candidate.label, score);
			return Some(candidate.id);
		}
		log::trace!("Wiki search rejected \"{}\" (similarity {:.2}%)", candidate.label, score);
	}

	None
}

/// The wiki's full text search endpoint.
pub struct RemoteSearch {
	client: reqwest::Client,
	search_url: String,
}

impl RemoteSearch {
	pub fn new(client: reqwest::Client, search_url: impl Into<String>) -> Self {
		Self {
			client,
			search_url: search_url.into(),
		}
	}

	/// Searches for `query` and returns the reference id of the first acceptable result.
	pub async fn search(&self, query: &str) -> crate::Result<Option<ReferenceId>> {
		log::debug!("Searching wiki for {}", query);
		let response = self.client
			.get(&self.search_url)
			.query(&[("key", query), ("filter", "1"), ("mold", "1")])
			.send()
			.await?;
		if !response.status().is_success() {
			return Err(crate::Error::Status { url: self.search_url.clone(), status: response.status().as_u16() });
		}
		let html = response.text().await?;

		Ok(pick_candidate(query, &parse_candidates(&html)))
	}
}
