use modsort::classifier::ResolutionSource;
use modsort::wiki::MatchKind;
use modsort::{Classification, Classifier, Config, EnvironmentCache};
use modsort_test_utils::{search_results_page, wiki_page, write_fabric_jar};
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer, data_dir: &std::path::Path) -> Config {
	let mut config = Config::default();
	config.set_data_dir(data_dir.to_path_buf());
	config.set_registry_url(format!("{}/v2", server.uri()));
	config.set_wiki_page_url(format!("{}/class/{{id}}.html", server.uri()));
	config.set_wiki_search_url(format!("{}/s", server.uri()));
	config.set_https_only(false);
	config
}

#[tokio::test]
async fn unknown_package_is_resolved_through_remote_search() {
	let _ = env_logger::builder().is_test(true).try_init();
	let dir = tempfile::tempdir().unwrap();
	let jar = write_fabric_jar(dir.path(), "examplemod-1.0.jar", "examplemod", "Example Mod").unwrap();

	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path_regex(r"^/v2/version_file/[0-9a-f]{40}$"))
		.respond_with(ResponseTemplate::new(404))
		.expect(1)
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path("/s"))
		.and(query_param("key", "example"))
		.respond_with(ResponseTemplate::new(200).set_body_string(search_results_page(&[(4242, "示例模组 (Example)")])))
		.expect(1)
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path("/class/4242.html"))
		.respond_with(ResponseTemplate::new(200).set_body_string(wiki_page("客户端需装, 服务端需装")))
		.expect(1)
		.mount(&server)
		.await;

	let config = config_for(&server, dir.path());
	let mut classifier = Classifier::from_config(&config, config.build_client().unwrap());
	let resolution = classifier.classify(&jar).await;

	assert_eq!(resolution.identity.identifier, "examplemod");
	assert_eq!(resolution.classification, Classification::Required);
	assert_eq!(resolution.source, ResolutionSource::Wiki(MatchKind::RemoteSearch));
	assert_eq!(classifier.batch().get("examplemod"), Some(Classification::Required));

	let cache = EnvironmentCache::load_from_file(config.cache_file()).unwrap();
	assert_eq!(cache.get("examplemod"), Some(Classification::Required));
}

#[tokio::test]
async fn cached_package_makes_no_requests() {
	let dir = tempfile::tempdir().unwrap();
	let jar = write_fabric_jar(dir.path(), "examplemod-1.0.jar", "examplemod", "Example Mod").unwrap();

	let server = MockServer::start().await;
	Mock::given(wiremock::matchers::any())
		.respond_with(ResponseTemplate::new(500))
		.expect(0)
		.mount(&server)
		.await;

	let config = config_for(&server, dir.path());
	let mut cache = EnvironmentCache::new();
	cache.insert("examplemod", Classification::Optional);
	cache.save_to_file(config.cache_file()).unwrap();

	let mut classifier = Classifier::from_config(&config, config.build_client().unwrap());
	let resolution = classifier.classify(&jar).await;

	assert_eq!(resolution.classification, Classification::Optional);
	assert_eq!(resolution.source, ResolutionSource::Cache);
	assert!(classifier.batch().is_empty());
}
