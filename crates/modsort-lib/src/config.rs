//! Runtime configuration.
//!
//! Stored as `config.json` in the data directory. Any field missing from the
//! file takes its default value.

use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.json";
const CACHE_FILE_NAME: &str = "mod_environments.json";
const INDEX_FILE_NAME: &str = "ModData.txt";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
	data_dir: PathBuf,
	index_path: Option<PathBuf>,
	index_url: String,
	server_url: Option<String>,
	registry_url: String,
	wiki_page_url: String,
	wiki_search_url: String,
	request_timeout_secs: u64,
	user_agent: String,
	https_only: bool,
}

fn default_data_dir() -> PathBuf {
	#[cfg(target_os = "windows")]
	let path = std::env::var("APPDATA").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("."));

	#[cfg(not(target_os = "windows"))]
	let path = if let Ok(e) = std::env::var("XDG_DATA_HOME") {
		PathBuf::from(e)
	} else if let Ok(home) = std::env::var("HOME") {
		PathBuf::from(home).join(".local/share")
	} else {
		PathBuf::from(".")
	};

	path.join("modsort")
}

impl Default for Config {
	fn default() -> Self {
		Self {
			data_dir: default_data_dir(),
			index_path: None,
			index_url: "https://raw.githubusercontent.com/Meloong-Git/PCL/refs/heads/main/Plain%20Craft%20Launcher%202/Resources/ModData.txt".to_string(),
			server_url: None,
			registry_url: "https://api.modrinth.com/v2".to_string(),
			wiki_page_url: "https://www.mcmod.cn/class/{id}.html".to_string(),
			wiki_search_url: "https://search.mcmod.cn/s".to_string(),
			request_timeout_secs: 10,
			user_agent: concat!("modsort/", env!("CARGO_PKG_VERSION")).to_string(),
			https_only: true,
		}
	}
}

impl Config {
	/// Reads `config.json` from the default data directory.
	///
	/// # Errors
	/// - [`IO`](crate::Error::IO) when the file is missing or unreadable.
	/// - [`SerdeJSON`](crate::Error::SerdeJSON) when the file is not valid config JSON.
	pub fn load_from_disk() -> crate::Result<Self> {
		Self::load_from_file(default_data_dir().join(CONFIG_FILE_NAME))
	}

	pub fn load_from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
		let file = std::fs::File::open(path)?;
		Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
	}

	/// Writes the config to `config.json` inside [`data_dir`](Config::data_dir).
	pub fn save_to_disk(&self) -> crate::Result<()> {
		std::fs::create_dir_all(&self.data_dir)?;
		let file = std::fs::File::create(self.data_dir.join(CONFIG_FILE_NAME))?;
		serde_json::to_writer_pretty(file, self)?;
		Ok(())
	}

	/// Builds the HTTP client shared by every remote lookup in a run.
	pub fn build_client(&self) -> crate::Result<reqwest::Client> {
		Ok(reqwest::Client::builder()
			.https_only(self.https_only)
			.timeout(std::time::Duration::from_secs(self.request_timeout_secs))
			.user_agent(&self.user_agent)
			.build()?)
	}

	/* Paths */

	pub fn data_dir(&self) -> &Path {
		&self.data_dir
	}
	pub fn set_data_dir(&mut self, data_dir: PathBuf) {
		self.data_dir = data_dir;
	}

	/// The local persistent cache.
	pub fn cache_file(&self) -> PathBuf {
		self.data_dir.join(CACHE_FILE_NAME)
	}

	/// The flat wiki index. Defaults to `ModData.txt` in the data directory.
	pub fn index_path(&self) -> PathBuf {
		self.index_path.clone().unwrap_or_else(|| self.data_dir.join(INDEX_FILE_NAME))
	}
	pub fn set_index_path(&mut self, index_path: PathBuf) {
		self.index_path = Some(index_path);
	}

	/* Remote endpoints */

	pub fn index_url(&self) -> &str {
		&self.index_url
	}

	/// `None` disables syncing with the shared store.
	pub fn server_url(&self) -> Option<&str> {
		self.server_url.as_deref()
	}
	pub fn set_server_url(&mut self, server_url: Option<String>) {
		self.server_url = server_url;
	}

	pub fn registry_url(&self) -> &str {
		&self.registry_url
	}
	pub fn set_registry_url(&mut self, registry_url: String) {
		self.registry_url = registry_url;
	}

	/// Page URL template, `{id}` is replaced with the reference id.
	pub fn wiki_page_url(&self) -> &str {
		&self.wiki_page_url
	}
	pub fn set_wiki_page_url(&mut self, wiki_page_url: String) {
		self.wiki_page_url = wiki_page_url;
	}

	pub fn wiki_search_url(&self) -> &str {
		&self.wiki_search_url
	}
	pub fn set_wiki_search_url(&mut self, wiki_search_url: String) {
		self.wiki_search_url = wiki_search_url;
	}

	/* Client */

	pub fn request_timeout_secs(&self) -> u64 {
		self.request_timeout_secs
	}
	pub fn set_request_timeout_secs(&mut self, secs: u64) {
		self.request_timeout_secs = secs;
	}

	pub fn https_only(&self) -> bool {
		self.https_only
	}
	pub fn set_https_only(&mut self, https_only: bool) {
		self.https_only = https_only;
	}
}
