//! Various helper functions for testing
//!
//! functions in this module should use results and not use any panics to avoid confusion in callers

use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("zip error: {0}")]
	Zip(#[from] zip::result::ZipError),
}

/// Writes a jar archive containing the given `(entry name, contents)` pairs.
///
/// # Returns
/// The path of the new archive, `dir/file_name`.
pub fn write_jar(dir: &Path, file_name: &str, entries: &[(&str, &str)]) -> Result<PathBuf, Error> {
	let path = dir.join(file_name);
	let mut zip = zip::ZipWriter::new(std::fs::File::create(&path)?);
	for (name, contents) in entries {
		zip.start_file(*name, zip::write::FileOptions::default())?;
		zip.write_all(contents.as_bytes())?;
	}
	zip.finish()?;
	Ok(path)
}

/// Writes a Fabric jar whose manifest carries `id` and `name`.
pub fn write_fabric_jar(dir: &Path, file_name: &str, id: &str, name: &str) -> Result<PathBuf, Error> {
	let manifest = format!(r#"{{"schemaVersion":1,"id":"{}","name":"{}"}}"#, id, name);
	write_jar(dir, file_name, &[("fabric.mod.json", &manifest)])
}

/// Writes a flat wiki index, one entry per line. Line `n` (1-based) is reference id `n`.
pub fn write_index(dir: &Path, lines: &[&str]) -> Result<PathBuf, Error> {
	let path = dir.join("ModData.txt");
	let mut file = std::fs::File::create(&path)?;
	for line in lines {
		writeln!(file, "{}", line)?;
	}
	Ok(path)
}

/// A wiki search results page linking to each `(id, label)` in order.
pub fn search_results_page(results: &[(u32, &str)]) -> String {
	let mut html = String::from("<html><body><div class=\"search-result-list\">");
	for (id, label) in results {
		html.push_str(&format!(
			"<div class=\"result-item\"><div class=\"head\"><a target=\"_blank\" href=\"https://www.mcmod.cn/class/{}.html\">{}</a></div></div>",
			id, label
		));
	}
	html.push_str("</div></body></html>");
	html
}

/// A wiki mod page with the given runtime environment descriptors.
pub fn wiki_page(environment: &str) -> String {
	format!(
		"<html><body><ul class=\"class-meta\">\
		<li class=\"col-lg-4\">支持平台: Java版</li>\
		<li class=\"col-lg-4\" style=\"user-select: auto;\">运行环境: {}</li>\
		<li class=\"col-lg-4\">前置Mod: 无</li>\
		</ul></body></html>",
		environment
	)
}
