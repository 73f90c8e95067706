//! Cookie record shared by all store backends.
//!
//! [`Cookie`] is the serializable value type every backend persists. All three
//! backends write it through the same `serde_json` contract, so a record
//! stored by one backend decodes identically from any other.
//!
//! `expires` uses RFC 3339 on the wire (`time::serde::rfc3339::option`); a
//! session cookie with no expiry is `None` and round-trips without a parse
//! error.
//!
//! ```rust
//! use crumbjar::cookies::Cookie;
//!
//! let c = Cookie::new("session", "abc123")
//!     .with_domain("example.com")
//!     .with_path("/");
//! assert!(!c.secure);
//! ```

use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use url::Url;

/// SameSite policy carried on a cookie record.
///
/// `Unset` means the response did not specify the attribute; it is not
/// normalized to `Lax` here since attribute enforcement is out of scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    #[default]
    Unset,
    Lax,
    Strict,
    None,
}

/// A cookie as stored/serialized by the cookie stores.
///
/// Within one stored entry for a lookup key, `name` is the identity: every
/// backend keeps at most one record per name, last write wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name (case-sensitive).
    pub name: String,

    /// Raw cookie value (not URL-decoded).
    pub value: String,

    /// Path scoping. Defaults to `"/"`.
    #[serde(default = "default_root_path")]
    pub path: String,

    /// Domain scoping; `None` means host-only.
    #[serde(default)]
    pub domain: Option<String>,

    /// Expiration timestamp, if any. Session cookies have `None`.
    ///
    /// Advisory metadata only: stores never evict on expiry.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires: Option<OffsetDateTime>,

    /// Max-Age in seconds, if the response carried one.
    #[serde(default)]
    pub max_age: Option<i64>,

    /// If `true`, the cookie is only sent over HTTPS.
    #[serde(default)]
    pub secure: bool,

    /// If `true`, the cookie is hidden from client-side scripts.
    #[serde(default)]
    pub http_only: bool,

    /// SameSite policy, [`SameSite::Unset`] when absent.
    #[serde(default)]
    pub same_site: SameSite,

    /// Original `Set-Cookie` header text, when the record came off the wire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl Cookie {
    /// Creates a host-only session cookie with path `"/"`.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: default_root_path(),
            domain: None,
            expires: None,
            max_age: None,
            secure: false,
            http_only: false,
            same_site: SameSite::Unset,
            raw: None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Parses a single `Set-Cookie` header value in the context of `url`.
    ///
    /// Attributes handled: value, `Path`, `Domain` (leading dot stripped),
    /// `Expires`, `Max-Age`, `SameSite`, `Secure`, `HttpOnly`. If `Path` is
    /// absent, a default path is derived from the request URL. The original
    /// header text is kept in `raw`. Returns `None` for headers without a
    /// `name=` prefix.
    pub fn parse_set_cookie(header: &str, url: &Url) -> Option<Cookie> {
        let (name, rest) = header.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Cookie::new(name, "");
        cookie.path = String::new();
        cookie.raw = Some(header.to_string());

        let mut first = true;
        for part in rest.split(';') {
            let part = part.trim();
            if first {
                cookie.value = part.to_string();
                first = false;
                continue;
            }

            if let Some((k, v)) = part.split_once('=') {
                let v = v.trim();
                match k.trim().to_ascii_lowercase().as_str() {
                    "path" => cookie.path = v.to_string(),
                    "domain" => cookie.domain = Some(v.trim_start_matches('.').to_string()),
                    "expires" => cookie.expires = parse_http_date(v),
                    "max-age" => cookie.max_age = v.parse().ok(),
                    "samesite" => {
                        cookie.same_site = if v.eq_ignore_ascii_case("lax") {
                            SameSite::Lax
                        } else if v.eq_ignore_ascii_case("strict") {
                            SameSite::Strict
                        } else if v.eq_ignore_ascii_case("none") {
                            SameSite::None
                        } else {
                            SameSite::Unset
                        };
                    }
                    _ => {}
                }
            } else if part.eq_ignore_ascii_case("secure") {
                cookie.secure = true;
            } else if part.eq_ignore_ascii_case("httponly") {
                cookie.http_only = true;
            }
        }

        if cookie.path.is_empty() {
            cookie.path = default_path(url);
        }

        Some(cookie)
    }
}

fn default_root_path() -> String {
    "/".to_string()
}

/// Default path for a cookie set without a `Path` attribute: the request path
/// up to (not including) its last segment.
pub(crate) fn default_path(url: &Url) -> String {
    url.path()
        .rsplit_once('/')
        .map_or("/", |(a, _)| if a.is_empty() { "/" } else { a })
        .to_string()
}

/// Parses an IMF-fixdate `Expires` value, e.g. `Tue, 07 Nov 2023 12:00:00 GMT`.
///
/// Unparseable dates yield `None`; the original text stays available in
/// [`Cookie::raw`].
fn parse_http_date(value: &str) -> Option<OffsetDateTime> {
    const IMF_FIXDATE: &[BorrowedFormatItem<'static>] = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    PrimitiveDateTime::parse(value, IMF_FIXDATE)
        .ok()
        .map(|dt| dt.assume_utc())
}

/// Collapses duplicate names within one `put`, keeping the last record per
/// name at the position of its first occurrence.
pub(crate) fn dedupe_last_wins(cookies: Vec<Cookie>) -> Vec<Cookie> {
    let mut result: Vec<Cookie> = Vec::with_capacity(cookies.len());
    for cookie in cookies {
        if let Some(existing) = result.iter_mut().find(|c| c.name == cookie.name) {
            *existing = cookie;
        } else {
            result.push(cookie);
        }
    }
    result
}

/// Union of `incoming` and `existing`: incoming records win on name collision,
/// prior records the new write does not mention are preserved.
pub(crate) fn merge_by_name(existing: Vec<Cookie>, incoming: Vec<Cookie>) -> Vec<Cookie> {
    let mut result = dedupe_last_wins(incoming);
    for cookie in existing {
        if !result.iter().any(|c| c.name == cookie.name) {
            result.push(cookie);
        }
    }
    result
}
