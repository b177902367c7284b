use std::path::Path;

use modsort::classifier::Resolution;
use modsort::registry::{ProjectSupport, RegistryLookup};
use modsort::run::{PackageSink, Run};
use modsort::sync::{PullOutcome, SyncClient};
use modsort::wiki::{MatchKind, PageScraper, ReferenceId, ReferenceSearch};
use modsort::{Classification, Classifier, EnvironmentCache, LocalCache};
use tokio_util::sync::CancellationToken;

/// Knows every package as required.
struct AlwaysRequired;

#[async_trait::async_trait]
impl RegistryLookup for AlwaysRequired {
	async fn lookup_by_hash(&self, _: &Path) -> Option<ProjectSupport> {
		Some(ProjectSupport {
			file_name: String::new(),
			project_title: String::new(),
			project_id: String::new(),
			client_side: Classification::Required,
			server_side: Classification::Required,
			loaders: vec![],
			game_versions: vec![],
		})
	}
}

struct NoWiki;

#[async_trait::async_trait]
impl ReferenceSearch for NoWiki {
	async fn resolve_reference_id(&self, _: &Path, _: &str) -> Option<(ReferenceId, MatchKind)> {
		None
	}
}

#[async_trait::async_trait]
impl PageScraper for NoWiki {
	async fn lookup_support_text(&self, _: ReferenceId) -> modsort::Result<Option<String>> {
		Ok(None)
	}
}

struct Discard;

impl PackageSink for Discard {
	fn place(&mut self, _: &Path, _: &Resolution) -> modsort::Result<()> {
		Ok(())
	}
}

#[tokio::test]
async fn pull_classify_push() {
	let server_dir = tempfile::tempdir().unwrap();
	let data_dir = server_dir.path().join("data");
	std::fs::create_dir_all(&data_dir).unwrap();
	std::fs::write(data_dir.join("mod_environments.json"), r#"{"foo": "unsupported", "update_time": "20240101"}"#).unwrap();

	let app = modsort_server::build_router(modsort_server::AppState::new(&data_dir, server_dir.path().join("backups")));
	let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
	let address = listener.local_addr().unwrap();
	tokio::spawn(async move { axum::serve(listener, app).await });

	let client_dir = tempfile::tempdir().unwrap();
	let mods = client_dir.path().join("mods");
	std::fs::create_dir_all(&mods).unwrap();
	modsort_test_utils::write_fabric_jar(&mods, "bar-1.0.jar", "bar", "Bar").unwrap();
	let cache_path = client_dir.path().join("mod_environments.json");

	let sync = SyncClient::new(reqwest::Client::new(), format!("http://{}", address));
	let build_cache_path = cache_path.clone();
	let report = Run::new(&mods, &cache_path)
		.with_sync(sync)
		.execute(
			move || Classifier::new(LocalCache::open(build_cache_path), Box::new(AlwaysRequired), Box::new(NoWiki), Box::new(NoWiki)),
			&mut Discard,
			&CancellationToken::new(),
		)
		.await
		.unwrap();

	assert_eq!(report.pulled, Some(PullOutcome::Pulled(1)));
	assert!(report.pushed);
	assert_eq!(report.results.len(), 1);
	assert_eq!(report.results[0].1.classification, Classification::Required);

	let local = EnvironmentCache::load_from_file(&cache_path).unwrap();
	assert_eq!(local.get("foo"), Some(Classification::Unsupported));
	assert_eq!(local.get("bar"), Some(Classification::Required));

	let today = modsort::cache::date_stamp(modsort::cache::today());
	let merged: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(data_dir.join("mod_environments.json")).unwrap()).unwrap();
	assert_eq!(merged, serde_json::json!({
		"foo": "unsupported",
		"bar": "required",
		"update_time": today,
	}));
}
