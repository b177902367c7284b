//! The flat wiki index.
//!
//! A third party text export with one entry per line where the 1-based line
//! number *is* the wiki reference id. The file is only ever appended to upstream;
//! re-sorting or deduplicating it would silently change the meaning of every id,
//! so it is treated as read-only here and always scanned in file order.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use super::ReferenceId;

#[derive(Debug, Clone)]
pub struct WikiIndex {
	path: PathBuf,
}

impl WikiIndex {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Reference id of the first line containing `token`, compared case-insensitively.
	///
	/// Every call reads the file from the start.
	///
	/// # Errors
	/// - [`IO`](crate::Error::IO) when the file cannot be opened or is not valid UTF-8.
	pub fn find(&self, token: &str) -> crate::Result<Option<ReferenceId>> {
		let token = token.to_lowercase();
		let reader = std::io::BufReader::new(std::fs::File::open(&self.path)?);

		for (position, line) in reader.lines().enumerate() {
			if line?.to_lowercase().contains(&token) {
				let id = ReferenceId::try_from(position + 1)
					.map_err(|_| crate::Error::Parse(format!("wiki index line {} is out of range", position + 1)))?;
				return Ok(Some(id));
			}
		}

		Ok(None)
	}
}

/// Downloads a fresh copy of the index to `destination`.
///
/// The download is written beside the destination and renamed over it once complete,
/// leaving the previous copy intact if the transfer fails.
pub async fn download_index(client: &reqwest::Client, url: &str, destination: impl AsRef<Path>) -> crate::Result<()> {
	let destination = destination.as_ref();

	log::info!("Downloading wiki index from {}", url);
	let response = client.get(url).send().await?;
	if !response.status().is_success() {
		return Err(crate::Error::Status { url: url.to_string(), status: response.status().as_u16() });
	}
	let content = response.bytes().await?;

	if let Some(parent) = destination.parent() {
		tokio::fs::create_dir_all(parent).await?;
	}
	let tmp = destination.with_extension("txt.part");
	tokio::fs::write(&tmp, &content).await?;
	tokio::fs::rename(&tmp, destination).await?;

	log::info!("Wiki index saved to {} ({} bytes)", destination.display(), content.len());
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use modsort_test_utils::write_index;
	use wiremock::matchers::{method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	#[test]
	fn line_number_is_the_id() {
		let dir = tempfile::tempdir().unwrap();
		let index = WikiIndex::new(write_index(dir.path(), &["", "alpha|Alpha", "beta|Beta", "alphabet|Alphabet"]).unwrap());

		assert_eq!(index.find("beta").unwrap(), Some(3));
		assert_eq!(index.find("ALPHA").unwrap(), Some(2));
		assert_eq!(index.find("gamma").unwrap(), None);
	}

	#[test]
	fn repeated_searches_start_over() {
		let dir = tempfile::tempdir().unwrap();
		let index = WikiIndex::new(write_index(dir.path(), &["alpha", "beta"]).unwrap());

		assert_eq!(index.find("beta").unwrap(), Some(2));
		assert_eq!(index.find("alpha").unwrap(), Some(1));
	}

	#[test]
	fn missing_file_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		assert!(WikiIndex::new(dir.path().join("ModData.txt")).find("alpha").is_err());
	}

	#[tokio::test]
	async fn download_replaces_index() {
		let dir = tempfile::tempdir().unwrap();
		let destination = write_index(dir.path(), &["old"]).unwrap();

		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/ModData.txt"))
			.respond_with(ResponseTemplate::new(200).set_body_string("first\nsecond\n"))
			.mount(&server)
			.await;

		download_index(&reqwest::Client::new(), &format!("{}/ModData.txt", server.uri()), &destination).await.unwrap();
		assert_eq!(WikiIndex::new(&destination).find("second").unwrap(), Some(2));
	}

	#[tokio::test]
	async fn failed_download_keeps_old_index() {
		let dir = tempfile::tempdir().unwrap();
		let destination = write_index(dir.path(), &["old"]).unwrap();

		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(503))
			.mount(&server)
			.await;

		assert!(download_index(&reqwest::Client::new(), &format!("{}/ModData.txt", server.uri()), &destination).await.is_err());
		assert_eq!(WikiIndex::new(&destination).find("old").unwrap(), Some(1));
	}
}
