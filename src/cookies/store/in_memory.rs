use std::collections::HashMap;
use std::sync::RwLock;

use crate::cookies::cookie::{dedupe_last_wins, Cookie};
use crate::cookies::store::CookieStore;
use crate::errors::StoreError;

/// Volatile, process-local cookie store keyed by exact hostname.
///
/// `put` fully replaces the record set for the host: a prior cookie with the
/// same name is superseded, the others are dropped entirely. There is no
/// domain hierarchy; a cookie stored under `sub.example.com` is invisible when
/// querying `example.com`. State is lost when the process exits.
pub struct InMemoryCookieStore {
    /// Cookie records per hostname
    entries: RwLock<HashMap<String, Vec<Cookie>>>,
}

impl InMemoryCookieStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryCookieStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CookieStore for InMemoryCookieStore {
    fn put(&self, host: &str, cookies: Vec<Cookie>) -> Result<(), StoreError> {
        if host.is_empty() {
            log::warn!("in-memory cookie write skipped: no hostname to key on");
            return Ok(());
        }

        self.entries
            .write()
            .unwrap()
            .insert(host.to_string(), dedupe_last_wins(cookies));
        Ok(())
    }

    fn get(&self, host: &str, _request_path: &str) -> Result<Vec<Cookie>, StoreError> {
        if host.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .entries
            .read()
            .unwrap()
            .get(host)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_host_yields_empty() {
        let store = InMemoryCookieStore::new();
        assert!(store.get("example.com", "/").unwrap().is_empty());
    }

    #[test]
    fn put_then_get_round_trips() {
        let store = InMemoryCookieStore::new();
        let cookies = vec![Cookie::new("session", "abc"), Cookie::new("theme", "dark")];

        store.put("example.com", cookies.clone()).unwrap();
        assert_eq!(store.get("example.com", "/").unwrap(), cookies);
    }

    #[test]
    fn second_put_fully_replaces() {
        let store = InMemoryCookieStore::new();
        store
            .put(
                "example.com",
                vec![Cookie::new("session", "old"), Cookie::new("theme", "dark")],
            )
            .unwrap();
        store
            .put("example.com", vec![Cookie::new("session", "new")])
            .unwrap();

        let got = store.get("example.com", "/").unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].value, "new");
    }

    #[test]
    fn duplicate_names_in_one_put_last_write_wins() {
        let store = InMemoryCookieStore::new();
        store
            .put(
                "example.com",
                vec![Cookie::new("session", "first"), Cookie::new("session", "last")],
            )
            .unwrap();

        let got = store.get("example.com", "/").unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].value, "last");
    }

    #[test]
    fn exact_hostname_only_no_domain_hierarchy() {
        let store = InMemoryCookieStore::new();
        store
            .put(
                "sub.example.com",
                vec![Cookie::new("session", "abc").with_domain("example.com")],
            )
            .unwrap();

        assert!(store.get("example.com", "/").unwrap().is_empty());
        assert_eq!(store.get("sub.example.com", "/").unwrap().len(), 1);
    }

    #[test]
    fn empty_host_is_a_no_op() {
        let store = InMemoryCookieStore::new();
        store.put("", vec![Cookie::new("lost", "1")]).unwrap();
        assert!(store.get("", "/").unwrap().is_empty());
        assert!(store.get("example.com", "/").unwrap().is_empty());
    }
}
