//! Cookie payloads carried by `cookies_set` and returned by `cookies_get`.

use serde::{Deserialize, Serialize};

/// SameSite cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SameSite {
	/// Sent with same-site and cross-site requests
	#[serde(rename = "None")]
	None,
	/// Sent with same-site requests and cross-site top-level navigations
	#[default]
	#[serde(rename = "Lax")]
	Lax,
	/// Only sent with same-site requests
	#[serde(rename = "Strict")]
	Strict,
}

/// A browser cookie.
///
/// Only `name` and `value` are mandatory on the wire; the remaining
/// attributes are forwarded to the provider untouched when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
	pub name: String,
	pub value: String,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub domain: Option<String>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,

	/// Unix timestamp in seconds (-1 means session cookie)
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires: Option<f64>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub http_only: Option<bool>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub secure: Option<bool>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub same_site: Option<SameSite>,

	/// URL to infer domain and path from
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
}

impl Cookie {
	/// Creates a cookie with only the mandatory fields set.
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			domain: None,
			path: None,
			expires: None,
			http_only: None,
			secure: None,
			same_site: None,
			url: None,
		}
	}

	pub fn domain(mut self, domain: impl Into<String>) -> Self {
		self.domain = Some(domain.into());
		self
	}

	pub fn http_only(mut self, http_only: bool) -> Self {
		self.http_only = Some(http_only);
		self
	}

	pub fn same_site(mut self, same_site: SameSite) -> Self {
		self.same_site = Some(same_site);
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cookie_serializes_camel_case_and_skips_unset() {
		let cookie = Cookie::new("session", "abc").domain(".example.com").http_only(true).same_site(SameSite::Strict);

		let json = serde_json::to_string(&cookie).unwrap();
		assert!(json.contains("\"httpOnly\":true"));
		assert!(json.contains("\"sameSite\":\"Strict\""));
		assert!(!json.contains("expires"));
	}

	#[test]
	fn minimal_cookie_deserializes() {
		let cookie: Cookie = serde_json::from_str(r#"{"name":"session","value":"abc123"}"#).unwrap();
		assert_eq!(cookie, Cookie::new("session", "abc123"));
	}
}
