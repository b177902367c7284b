//! Client side of the shared environment store.
//!
//! The local cache is refreshed from the server at most once a day, and what a
//! run learned is uploaded when it finishes. Neither direction is required for
//! a run to succeed.

use std::path::Path;

use chrono::NaiveDate;

use crate::cache::{date_stamp, EnvironmentCache};
use crate::RunBatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
	/// The local cache was already refreshed today.
	Skipped,
	/// The local cache was replaced with this many entries.
	Pulled(usize),
}

/// Whether the cache at `cache_path` needs refreshing.
///
/// True when the file is missing or unreadable, or its `update_time` is not `today`.
pub fn should_pull(cache_path: impl AsRef<Path>, today: NaiveDate) -> bool {
	match EnvironmentCache::load_from_file(cache_path) {
		Ok(cache) => cache.update_time() != Some(date_stamp(today).as_str()),
		Err(_) => true,
	}
}

pub struct SyncClient {
	client: reqwest::Client,
	server_url: String,
}

impl SyncClient {
	pub fn new(client: reqwest::Client, server_url: impl Into<String>) -> Self {
		Self {
			client,
			server_url: server_url.into().trim_end_matches('/').to_string(),
		}
	}

	fn endpoint(&self, path: &str) -> String {
		format!("{}/{}", self.server_url, path)
	}

	/// Replaces the local cache with the server's store unless it was already refreshed `today`.
	///
	/// The pulled store is stamped with `today`. On failure the local file is untouched.
	pub async fn pull(&self, cache_path: impl AsRef<Path>, today: NaiveDate) -> crate::Result<PullOutcome> {
		let cache_path = cache_path.as_ref();
		if !should_pull(cache_path, today) {
			log::debug!("Local cache already refreshed today, skipping pull.");
			return Ok(PullOutcome::Skipped);
		}

		let url = self.endpoint("mod_environments");
		log::info!("Pulling shared environments from {}", url);
		let response = self.client.get(&url).send().await?;
		if !response.status().is_success() {
			return Err(crate::Error::Status { url, status: response.status().as_u16() });
		}
		let value: serde_json::Value = response.json().await?;

		let mut cache = EnvironmentCache::from_json(&value)?;
		cache.set_update_time(today);
		cache.save_to_file(cache_path)?;

		log::info!("Pulled {} shared environments", cache.len());
		Ok(PullOutcome::Pulled(cache.len()))
	}

	/// Uploads a run's batch. An empty batch is not sent.
	///
	/// # Errors
	/// - [`Reqwest`](crate::Error::Reqwest) when the server cannot be reached.
	/// - [`Sync`](crate::Error::Sync) when the server rejects the upload.
	pub async fn push(&self, batch: &RunBatch) -> crate::Result<()> {
		if batch.is_empty() {
			log::debug!("Nothing learned this run, skipping upload.");
			return Ok(());
		}

		let url = self.endpoint("upload");
		log::info!("Uploading {} environments to {}", batch.len(), url);
		let response = self.client.post(&url).json(batch).send().await?;
		let status = response.status();
		if status != reqwest::StatusCode::OK {
			let body = response.text().await.unwrap_or_default();
			return Err(crate::Error::Sync(format!("upload rejected with status {}: {}", status.as_u16(), body)));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Classification;
	use wiremock::matchers::{body_json, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn day(d: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
	}

	#[test]
	fn pull_needed_unless_stamped_today() {
		let dir = tempfile::tempdir().unwrap();
		let cache_path = dir.path().join("mod_environments.json");
		assert!(should_pull(&cache_path, day(2)));

		std::fs::write(&cache_path, "not json").unwrap();
		assert!(should_pull(&cache_path, day(2)));

		let mut cache = EnvironmentCache::new();
		cache.set_update_time(day(1));
		cache.save_to_file(&cache_path).unwrap();
		assert!(should_pull(&cache_path, day(2)));
		assert!(!should_pull(&cache_path, day(1)));
	}

	#[tokio::test]
	async fn pull_replaces_local_cache() {
		let dir = tempfile::tempdir().unwrap();
		let cache_path = dir.path().join("mod_environments.json");
		let mut stale = EnvironmentCache::new();
		stale.insert("local-only", Classification::Required);
		stale.save_to_file(&cache_path).unwrap();

		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/mod_environments"))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
				"a": "optional",
				"b": "unsupported",
				"update_time": "20240101",
			})))
			.expect(1)
			.mount(&server)
			.await;

		let sync = SyncClient::new(reqwest::Client::new(), format!("{}/", server.uri()));
		assert_eq!(sync.pull(&cache_path, day(3)).await.unwrap(), PullOutcome::Pulled(2));
		assert_eq!(sync.pull(&cache_path, day(3)).await.unwrap(), PullOutcome::Skipped);

		let pulled = EnvironmentCache::load_from_file(&cache_path).unwrap();
		assert_eq!(pulled.get("local-only"), None);
		assert_eq!(pulled.get("a"), Some(Classification::Optional));
		assert_eq!(pulled.update_time(), Some("20240503"));
	}

	#[tokio::test]
	async fn failed_pull_keeps_local_cache() {
		let dir = tempfile::tempdir().unwrap();
		let cache_path = dir.path().join("mod_environments.json");
		let mut local = EnvironmentCache::new();
		local.insert("kept", Classification::Optional);
		local.save_to_file(&cache_path).unwrap();

		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(500))
			.mount(&server)
			.await;

		let sync = SyncClient::new(reqwest::Client::new(), server.uri());
		assert!(sync.pull(&cache_path, day(3)).await.is_err());
		assert_eq!(EnvironmentCache::load_from_file(&cache_path).unwrap().get("kept"), Some(Classification::Optional));
	}

	#[tokio::test]
	async fn push_sends_batch() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/upload"))
			.and(body_json(serde_json::json!({"c": "required"})))
			.respond_with(ResponseTemplate::new(200))
			.expect(1)
			.mount(&server)
			.await;

		let mut batch = RunBatch::new();
		batch.insert("c", Classification::Required);
		batch.insert("d", Classification::Unknown);

		SyncClient::new(reqwest::Client::new(), server.uri()).push(&batch).await.unwrap();
	}

	#[tokio::test]
	async fn empty_batch_is_not_sent() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(200))
			.expect(0)
			.mount(&server)
			.await;

		SyncClient::new(reqwest::Client::new(), server.uri()).push(&RunBatch::new()).await.unwrap();
	}

	#[tokio::test]
	async fn rejected_push_is_an_error() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(400).set_body_string("bad"))
			.mount(&server)
			.await;

		let mut batch = RunBatch::new();
		batch.insert("c", Classification::Required);
		let result = SyncClient::new(reqwest::Client::new(), server.uri()).push(&batch).await;
		assert!(matches!(result, Err(crate::Error::Sync(_))));
	}
}
