//! Wiki mod pages.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{html_text, ReferenceId};
use crate::classification::WIKI_ENVIRONMENT_MARKER;

static LIST_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<li\b[^>]*>(.*?)</li>").expect("list item pattern should compile"));

#[async_trait::async_trait]
pub trait PageScraper: Send + Sync {
	/// Fetches the raw runtime environment text of a mod page.
	///
	/// `Ok(None)` when the page has no environment field.
	async fn lookup_support_text(&self, id: ReferenceId) -> crate::Result<Option<String>>;
}

/// Text of the first list item mentioning the runtime environment,
/// e.g. `运行环境: 客户端需装, 服务端可选`.
pub fn find_environment_text(html: &str) -> Option<String> {
	LIST_ITEM.captures_iter(html)
		.filter_map(|c| c.get(1))
		.map(|m| html_text(m.as_str()))
		.find(|text| text.contains(WIKI_ENVIRONMENT_MARKER))
}

pub struct WikiPageScraper {
	client: reqwest::Client,
	url_template: String,
}

impl WikiPageScraper {
	/// # Parameters
	/// - `client` - Shared client, carries the timeout.
	/// - `url_template` - Page URL with an `{id}` placeholder.
	pub fn new(client: reqwest::Client, url_template: impl Into<String>) -> Self {
		Self {
			client,
			url_template: url_template.into(),
		}
	}

	pub fn page_url(&self, id: ReferenceId) -> String {
		self.url_template.replace("{id}", &id.to_string())
	}
}

#[async_trait::async_trait]
impl PageScraper for WikiPageScraper {
	async fn lookup_support_text(&self, id: ReferenceId) -> crate::Result<Option<String>> {
		let url = self.page_url(id);
		log::debug!("Fetching wiki page {}", url);

		let response = self.client.get(&url).send().await?;
		if !response.status().is_success() {
			return Err(crate::Error::Status { url, status: response.status().as_u16() });
		}
		let html = response.text().await?;

		Ok(find_environment_text(&html))
	}
}
