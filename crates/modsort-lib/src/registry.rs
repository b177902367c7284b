//! Package registry lookups by content hash.
//!
//! The registry knows a file by its SHA-1. The hash leads to a version record,
//! the version record to a project, and the project carries the server-side support field.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use sha1::{Digest, Sha1};

use crate::Classification;

const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// What the registry says about the project an archive belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSupport {
	pub file_name: String,
	pub project_title: String,
	pub project_id: String,
	pub client_side: Classification,
	pub server_side: Classification,
	pub loaders: Vec<String>,
	pub game_versions: Vec<String>,
}

#[async_trait::async_trait]
pub trait RegistryLookup: Send + Sync {
	/// Looks the archive up by content hash.
	///
	/// Returns `None` when the archive is not a known jar or anything at all goes wrong;
	/// registry failures never reach the caller.
	async fn lookup_by_hash(&self, archive_path: &Path) -> Option<ProjectSupport>;
}

#[derive(Debug, Deserialize)]
struct VersionRecord {
	project_id: String,
}

#[derive(Debug, Deserialize)]
struct ProjectRecord {
	title: String,
	client_side: Option<String>,
	server_side: Option<String>,
	#[serde(default)]
	loaders: Vec<String>,
	#[serde(default)]
	game_versions: Vec<String>,
}

/// Hex SHA-1 of a file, read in fixed size chunks.
pub fn file_sha1(path: impl AsRef<Path>) -> crate::Result<String> {
	let mut file = std::fs::File::open(path)?;
	let mut hasher = Sha1::new();
	let mut buf = vec![0u8; HASH_CHUNK_SIZE];
	loop {
		let n = file.read(&mut buf)?;
		if n == 0 {
			break;
		}
		hasher.update(&buf[..n]);
	}
	Ok(format!("{:x}", hasher.finalize()))
}

/// [`RegistryLookup`] against a Modrinth style v2 API.
pub struct ModrinthRegistry {
	client: reqwest::Client,
	base_url: String,
}

impl ModrinthRegistry {
	/// # Parameters
	/// - `client` - Shared client, carries the timeout and user agent.
	/// - `base_url` - API root, e.g. `https://api.modrinth.com/v2`.
	pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
		Self {
			client,
			base_url: base_url.into().trim_end_matches('/').to_string(),
		}
	}

	async fn fetch_support(&self, archive_path: &Path) -> crate::Result<Option<ProjectSupport>> {
		let is_jar = archive_path.extension().map_or(false, |e| e.eq_ignore_ascii_case("jar"));
		if !is_jar || !archive_path.is_file() {
			return Ok(None);
		}

		let hash = file_sha1(archive_path)?;

		let url = format!("{}/version_file/{}", self.base_url, hash);
		log::debug!("Looking up {} in registry by hash {}", archive_path.display(), hash);
		let response = self.client.get(&url).send().await?;
		if !response.status().is_success() {
			log::debug!("Registry has no version for hash {} ({})", hash, response.status());
			return Ok(None);
		}
		let version: VersionRecord = response.json().await?;

		let url = format!("{}/project/{}", self.base_url, version.project_id);
		let response = self.client.get(&url).send().await?;
		if !response.status().is_success() {
			return Err(crate::Error::Status { url, status: response.status().as_u16() });
		}
		let project: ProjectRecord = response.json().await?;

		Ok(Some(ProjectSupport {
			file_name: archive_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
			project_title: project.title,
			project_id: version.project_id,
			client_side: project.client_side.as_deref().map(Classification::parse).unwrap_or_default(),
			server_side: project.server_side.as_deref().map(Classification::parse).unwrap_or_default(),
			loaders: project.loaders,
			game_versions: project.game_versions,
		}))
	}
}

#[async_trait::async_trait]
impl RegistryLookup for ModrinthRegistry {
	async fn lookup_by_hash(&self, archive_path: &Path) -> Option<ProjectSupport> {
		match self.fetch_support(archive_path).await {
			Ok(support) => support,
			Err(e) => {
				log::warn!("Registry lookup for {} failed: {}", archive_path.display(), e);
				None
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use modsort_test_utils::write_fabric_jar;
	use wiremock::matchers::{method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	#[test]
	fn sha1_of_file() {
		let dir = tempfile::tempdir().unwrap();
		let file = dir.path().join("abc.bin");
		std::fs::write(&file, "abc").unwrap();
		assert_eq!(file_sha1(&file).unwrap(), "a9993e364706816aba3e25717850c26c9cd0d89d");
	}

	#[tokio::test]
	async fn resolves_project_server_side() {
		let dir = tempfile::tempdir().unwrap();
		let jar = write_fabric_jar(dir.path(), "sodium.jar", "sodium", "Sodium").unwrap();
		let hash = file_sha1(&jar).unwrap();

		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path(format!("/version_file/{}", hash)))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"project_id": "AANobbMI", "name": "Sodium 0.5.3"})))
			.expect(1)
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/project/AANobbMI"))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
				"title": "Sodium",
				"client_side": "required",
				"server_side": "unsupported",
				"loaders": ["fabric", "quilt"],
				"game_versions": ["1.20.1"]
			})))
			.expect(1)
			.mount(&server)
			.await;

		let registry = ModrinthRegistry::new(reqwest::Client::new(), server.uri());
		let support = registry.lookup_by_hash(&jar).await.expect("registry should know the jar");
		assert_eq!(support.project_title, "Sodium");
		assert_eq!(support.file_name, "sodium.jar");
		assert_eq!(support.server_side, Classification::Unsupported);
		assert_eq!(support.client_side, Classification::Required);
		assert_eq!(support.loaders, vec!["fabric", "quilt"]);
	}

	#[tokio::test]
	async fn unknown_hash_is_none() {
		let dir = tempfile::tempdir().unwrap();
		let jar = write_fabric_jar(dir.path(), "private.jar", "private", "Private").unwrap();

		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(404))
			.mount(&server)
			.await;

		let registry = ModrinthRegistry::new(reqwest::Client::new(), server.uri());
		assert_eq!(registry.lookup_by_hash(&jar).await, None);
	}

	#[tokio::test]
	async fn failed_project_request_is_none() {
		let dir = tempfile::tempdir().unwrap();
		let jar = write_fabric_jar(dir.path(), "flaky.jar", "flaky", "Flaky").unwrap();
		let hash = file_sha1(&jar).unwrap();

		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path(format!("/version_file/{}", hash)))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"project_id": "flaky"})))
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/project/flaky"))
			.respond_with(ResponseTemplate::new(500))
			.mount(&server)
			.await;

		let registry = ModrinthRegistry::new(reqwest::Client::new(), server.uri());
		assert_eq!(registry.lookup_by_hash(&jar).await, None);
	}

	#[tokio::test]
	async fn only_existing_jars_are_looked_up() {
		let dir = tempfile::tempdir().unwrap();
		let zip = write_fabric_jar(dir.path(), "packed.zip", "packed", "Packed").unwrap();

		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(500))
			.expect(0)
			.mount(&server)
			.await;

		let registry = ModrinthRegistry::new(reqwest::Client::new(), server.uri());
		assert_eq!(registry.lookup_by_hash(&zip).await, None);
		assert_eq!(registry.lookup_by_hash(&dir.path().join("gone.jar")).await, None);
	}
}
