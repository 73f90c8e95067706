//! Cookie jar facade over a store backend.
//!
//! [`PersistentCookieJar`] is the single interface the HTTP client depends on.
//! It translates request URLs into hostname lookup keys and delegates to the
//! active [`CookieStore`], so swapping backends changes persistence and
//! domain-matching fidelity but never the calling contract.
//!
//! The jar exposes two surfaces:
//! - fallible methods ([`set_cookies_for_url`](PersistentCookieJar::set_cookies_for_url),
//!   [`cookies_for_url`](PersistentCookieJar::cookies_for_url)) for callers
//!   that want to observe store failures;
//! - an implementation of `reqwest::cookie::CookieStore`, which is infallible
//!   by contract — there, store failures are logged and the request degrades
//!   to stateless behavior (no cookies attached) instead of aborting.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use crumbjar::cookies::{InMemoryCookieStore, PersistentCookieJar};
//!
//! let jar = Arc::new(PersistentCookieJar::new(Arc::new(InMemoryCookieStore::new())));
//! let client = reqwest::Client::builder().cookie_provider(jar).build().unwrap();
//! ```

use std::sync::Arc;

use http::HeaderValue;
use url::Url;

use crate::cookies::cookie::Cookie;
use crate::cookies::store::CookieStore;
use crate::errors::StoreError;

/// Backend-agnostic cookie jar holding a reference to exactly one store.
pub struct PersistentCookieJar {
    store: Arc<dyn CookieStore>,
}

impl PersistentCookieJar {
    pub fn new(store: Arc<dyn CookieStore>) -> Self {
        Self { store }
    }

    /// Stores `cookies` under the URL's hostname.
    ///
    /// A URL without a hostname is a benign no-op: there is no valid key to
    /// operate on, so storage stays untouched and `Ok` is returned.
    pub fn set_cookies_for_url(&self, url: &Url, cookies: Vec<Cookie>) -> Result<(), StoreError> {
        let Some(host) = url.host_str() else {
            log::warn!("cookie write skipped: {url} has no hostname");
            return Ok(());
        };
        self.store.put(host, cookies)
    }

    /// Returns whatever the backend yields for the URL's hostname. Ordering is
    /// not guaranteed; an empty collection is a normal result.
    pub fn cookies_for_url(&self, url: &Url) -> Result<Vec<Cookie>, StoreError> {
        let Some(host) = url.host_str() else {
            return Ok(Vec::new());
        };
        self.store.get(host, url.path())
    }
}

impl reqwest::cookie::CookieStore for PersistentCookieJar {
    /// Parses the response's `Set-Cookie` headers and writes them through the
    /// backend. Store failures are logged; the response itself is unaffected.
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let cookies: Vec<Cookie> = cookie_headers
            .filter_map(|header| header.to_str().ok())
            .filter_map(|header| Cookie::parse_set_cookie(header, url))
            .collect();
        if cookies.is_empty() {
            return;
        }

        if let Err(err) = self.set_cookies_for_url(url, cookies) {
            log::warn!("cookie write failed, continuing without persistence: {err}");
        }
    }

    /// Renders the `Cookie` request header for `url`, filtering by path prefix
    /// and the `Secure` flag. `None` when nothing matches or the lookup fails
    /// (the request is then sent without cookies).
    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let cookies = match self.cookies_for_url(url) {
            Ok(cookies) => cookies,
            Err(err) => {
                log::warn!("cookie lookup failed, sending request without cookies: {err}");
                return None;
            }
        };

        let path = url.path();
        let is_https = url.scheme() == "https";

        let header = cookies
            .iter()
            .filter(|c| path.starts_with(c.path.as_str()))
            .filter(|c| !c.secure || is_https)
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");

        if header.is_empty() {
            None
        } else {
            HeaderValue::from_str(&header).ok()
        }
    }
}
