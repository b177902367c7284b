//! Name canonicalization used when matching packages against the wiki index.
//!
//! Archive filenames and manifest display names are turned into lowercase,
//! hyphen-joined tokens with loader tags, version numbers and filler words removed,
//! e.g. `[Fabric] Tomtaru's Mod-1.20.1.jar` becomes `tomtarus`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Words that only describe the loader or the fact that this is a mod.
const STOPLIST: [&str; 5] = ["neoforge", "forge", "fabric", "mc", "mod"];

/// Returned when nothing of the name survives normalization.
pub const UNKNOWN_TOKEN: &str = "unknown";

static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[【】\[\]].*?[】\]]").expect("bracket pattern should compile"));
static POSSESSIVE: Lazy<Regex> = Lazy::new(|| Regex::new(r"'s\b").expect("possessive pattern should compile"));
static WORD_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[_\s-]+").expect("separator pattern should compile"));

/// Normalizes an archive filename such as `jei-1.20.1-forge-15.2.0.27.jar` into `jei`.
pub fn normalize_filename(raw: &str) -> String {
	let stem = raw.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(raw);
	let name = BRACKETED.replace_all(stem, "");
	let name = name.replace('&', "and");
	canonical_words(&name, true)
}

/// Normalizes a human readable display name.
///
/// Display names are free text, so unlike [`normalize_filename`] nothing is
/// treated as an extension, bracket tag or version number.
pub fn normalize_display_name(raw: &str) -> String {
	canonical_words(raw, false)
}

fn canonical_words(name: &str, drop_versions: bool) -> String {
	let name = POSSESSIVE.replace_all(name, "s");
	let name = name.replace('\'', "");

	let words: Vec<String> = WORD_SEPARATOR.split(&name)
		.filter(|word| !word.is_empty())
		.filter(|word| !(drop_versions && is_version_word(word)))
		.map(str::to_lowercase)
		.filter(|word| !STOPLIST.contains(&word.as_str()))
		.map(|word| {
			if word.ends_with("mod") && word.chars().count() > 3 {
				word[..word.len() - 3].to_string()
			} else {
				word
			}
		})
		.collect();

	if words.is_empty() {
		UNKNOWN_TOKEN.to_string()
	} else {
		words.join("-")
	}
}

fn is_version_word(word: &str) -> bool {
	word.contains('.') && word.chars().any(|c| c.is_ascii_digit())
}

/// Keeps only ASCII letters, lowercased.
pub fn letters_only(text: &str) -> String {
	text.chars()
		.filter(char::is_ascii_alphabetic)
		.map(|c| c.to_ascii_lowercase())
		.collect()
}

/// Percentage of characters in `a` that also occur somewhere in `b`, measured
/// against the longer of the two strings.
///
/// This is a coarse overlap measure, not an edit distance, and it is directional:
/// duplicate characters are counted from `a` only.
pub fn similarity(a: &str, b: &str) -> f64 {
	if a.is_empty() || b.is_empty() {
		return 0.0;
	}

	let common = a.chars().filter(|c| b.contains(*c)).count();
	let max_len = a.chars().count().max(b.chars().count());
	common as f64 / max_len as f64 * 100.0
}
