//! Just enough of TOML to pull single values out of `mods.toml` descriptors.
//!
//! Real descriptors are frequently malformed (unquoted values, trailing commas,
//! stray comments) so a tolerant scan serves better than a full parser here.

/// Reads the value following the first occurrence of `key`.
///
/// Quoted values run to the matching quote. Unquoted values end at whitespace, `#` or `,`.
pub fn get_value(key: &str, content: &str) -> Option<String> {
	let start = content.find(key)? + key.len();
	let rest = content[start..].trim_start_matches([' ', '\t', '=']);

	let value = match rest.chars().next()? {
		quote @ ('"' | '\'') => {
			let body = &rest[1..];
			&body[..body.find(quote)?]
		}
		_ => {
			let end = rest.find([' ', '\t', '\n', '\r', '#', ',']).unwrap_or(rest.len());
			&rest[..end]
		}
	};

	let value = value.trim();
	if value.is_empty() {
		None
	} else {
		Some(value.to_string())
	}
}
