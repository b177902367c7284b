use serde::*;

/// Whether a package has to be installed on a multiplayer server.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
	Required,
	Optional,
	Unsupported,
	/// Nothing could be resolved. Never persisted, so the package is retried next run.
	#[default]
	Unknown,
}

/// Marker preceding the environment descriptors on a wiki page.
pub const WIKI_ENVIRONMENT_MARKER: &str = "运行环境:";

impl Classification {
	/// Required, optional and unsupported are final answers worth caching.
	pub fn is_terminal(self) -> bool {
		!matches!(self, Self::Unknown)
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Required => "required",
			Self::Optional => "optional",
			Self::Unsupported => "unsupported",
			Self::Unknown => "unknown",
		}
	}

	/// Parses a stored or registry value. Unrecognised values are [`Unknown`](Classification::Unknown).
	pub fn parse(value: &str) -> Self {
		match value {
			"required" | "server_required" => Self::Required,
			"optional" | "server_optional" => Self::Optional,
			"unsupported" | "server_unsupported" => Self::Unsupported,
			_ => Self::Unknown,
		}
	}

	/// Maps the free text of a wiki "runtime environment" field.
	///
	/// e.g. `运行环境: 客户端需装, 服务端需装` is [`Required`](Classification::Required).
	pub fn from_wiki_text(text: &str) -> Self {
		if text.contains("服务端需装") {
			Self::Required
		} else if text.contains("服务端可选") {
			Self::Optional
		} else if text.contains("服务端无效") {
			Self::Unsupported
		} else {
			Self::Unknown
		}
	}
}

impl std::fmt::Display for Classification {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
