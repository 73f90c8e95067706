//! Redis-backed cookie store.
//!
//! `RedisCookieStore` keeps one key per hostname, `"<prefix>:<hostname>"`,
//! holding a JSON array of [`Cookie`] records with no TTL. Lookup is purely by
//! exact hostname key: unlike the SQLite store there is no cross-subdomain
//! matching, so `example.com` and `sub.example.com` are independent entries.
//!
//! ## Write policy
//! The default is **merge by name** ([`WritePolicy::MergeByName`]): a write
//! reads the existing set, lets incoming records win on name collision, and
//! preserves prior cookies the new write does not mention. This matches a jar
//! accumulating state from successive responses rather than one response
//! clobbering everything known for a host. [`WritePolicy::Replace`] restores
//! plain overwrite semantics for callers that want them.
//!
//! The read-then-write cycle holds the connection mutex throughout, so two
//! in-process writers cannot interleave and lose an update.

use std::sync::Mutex;
use std::time::Duration;

use redis::Commands;

use crate::cookies::cookie::{dedupe_last_wins, merge_by_name, Cookie};
use crate::cookies::store::CookieStore;
use crate::errors::StoreError;

/// Key prefix used when the caller does not supply one.
const DEFAULT_PREFIX: &str = "crumbjar";
/// One-time connect bound.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Per-command read/write bound on the established connection.
const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// How a write combines with what the key already holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WritePolicy {
    /// Incoming cookies win by name, unmentioned prior cookies survive.
    #[default]
    MergeByName,
    /// The incoming set overwrites the key outright.
    Replace,
}

/// Cookie store backed by a Redis server.
pub struct RedisCookieStore {
    conn: Mutex<redis::Connection>,
    prefix: String,
    policy: WritePolicy,
}

impl std::fmt::Debug for RedisCookieStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCookieStore")
            .field("prefix", &self.prefix)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RedisCookieStore {
    /// Connects to the Redis server at `url` (e.g. `redis://127.0.0.1:6379`).
    ///
    /// An unparseable URL is a [`StoreError::Config`]; an unreachable server
    /// fails fast with a backend error. Read and write timeouts are set on the
    /// connection so a stalled command returns a recoverable error.
    pub fn new(url: &str, prefix: Option<&str>) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)
            .map_err(|e| StoreError::Config(format!("invalid redis url: {e}")))?;
        let conn = client
            .get_connection_with_timeout(CONNECT_TIMEOUT)
            .map_err(|e| StoreError::backend("redis", "connect", "", e))?;
        conn.set_read_timeout(Some(IO_TIMEOUT))
            .map_err(|e| StoreError::backend("redis", "connect", "", e))?;
        conn.set_write_timeout(Some(IO_TIMEOUT))
            .map_err(|e| StoreError::backend("redis", "connect", "", e))?;

        Ok(Self {
            conn: Mutex::new(conn),
            prefix: prefix.unwrap_or(DEFAULT_PREFIX).to_string(),
            policy: WritePolicy::default(),
        })
    }

    pub fn with_write_policy(mut self, policy: WritePolicy) -> Self {
        self.policy = policy;
        self
    }

    fn key(&self, host: &str) -> String {
        format!("{}:{}", self.prefix, host)
    }
}

impl CookieStore for RedisCookieStore {
    fn put(&self, host: &str, cookies: Vec<Cookie>) -> Result<(), StoreError> {
        if host.is_empty() {
            log::warn!("redis cookie write skipped: no hostname to key on");
            return Ok(());
        }

        let key = self.key(host);
        let incoming = dedupe_last_wins(cookies);

        // Holds the connection lock across read and write so the merge cycle
        // cannot interleave with another in-process writer.
        let mut conn = self.conn.lock().unwrap();

        let merged = match self.policy {
            WritePolicy::Replace => incoming,
            WritePolicy::MergeByName => {
                let existing: Option<String> = conn
                    .get(&key)
                    .map_err(|e| StoreError::backend("redis", "put", host, e))?;
                let existing = match existing {
                    Some(json) => {
                        serde_json::from_str(&json).map_err(|source| StoreError::Decode {
                            host: host.to_string(),
                            source,
                        })?
                    }
                    None => Vec::new(),
                };
                merge_by_name(existing, incoming)
            }
        };

        let json = serde_json::to_string(&merged).map_err(|source| StoreError::Encode {
            host: host.to_string(),
            source,
        })?;
        conn.set::<_, _, ()>(&key, json)
            .map_err(|e| StoreError::backend("redis", "put", host, e))?;

        Ok(())
    }

    fn get(&self, host: &str, _request_path: &str) -> Result<Vec<Cookie>, StoreError> {
        if host.is_empty() {
            return Ok(Vec::new());
        }

        let key = self.key(host);
        let mut conn = self.conn.lock().unwrap();
        let value: Option<String> = conn
            .get(&key)
            .map_err(|e| StoreError::backend("redis", "get", host, e))?;

        match value {
            Some(json) => serde_json::from_str(&json).map_err(|source| StoreError::Decode {
                host: host.to_string(),
                source,
            }),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unparseable_url() {
        let err = RedisCookieStore::new("not a redis url", None).unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    // The remaining tests need a live server, e.g.
    // `docker run --rm -p 6379:6379 redis:7-alpine`, and run with
    // `cargo test -- --ignored`.

    fn live_store(prefix: &str) -> RedisCookieStore {
        RedisCookieStore::new("redis://127.0.0.1:6379", Some(prefix)).unwrap()
    }

    #[test]
    #[ignore]
    fn unseen_host_yields_empty() {
        let store = live_store("crumbjar_test_unseen");
        assert!(store.get("another-domain.org", "/").unwrap().is_empty());
    }

    #[test]
    #[ignore]
    fn put_then_get_round_trips() {
        let store = live_store("crumbjar_test_roundtrip");
        let cookies = vec![
            Cookie::new("session-id", "abc123xyz").with_domain("example.com"),
            Cookie::new("user_preference", "theme=dark").with_domain("sub.example.com"),
        ];

        store.put("roundtrip.example.com", cookies.clone()).unwrap();
        let got = store.get("roundtrip.example.com", "/").unwrap();
        assert_eq!(got, cookies);

        // Exact hostname keys only: the bare domain is a different entry.
        assert!(store.get("example.com", "/").unwrap().is_empty());
    }

    #[test]
    #[ignore]
    fn second_put_merges_by_name() {
        let store = live_store("crumbjar_test_merge");
        store
            .put(
                "merge.example.com",
                vec![Cookie::new("session", "old"), Cookie::new("theme", "dark")],
            )
            .unwrap();
        store
            .put(
                "merge.example.com",
                vec![Cookie::new("session", "new"), Cookie::new("tracker", "off")],
            )
            .unwrap();

        let got = store.get("merge.example.com", "/").unwrap();
        assert_eq!(got.len(), 3);
        assert_eq!(
            got.iter().find(|c| c.name == "session").unwrap().value,
            "new"
        );
        assert!(got.iter().any(|c| c.name == "theme"));
        assert!(got.iter().any(|c| c.name == "tracker"));
    }

    #[test]
    #[ignore]
    fn replace_policy_overwrites() {
        let store = live_store("crumbjar_test_replace").with_write_policy(WritePolicy::Replace);
        store
            .put(
                "replace.example.com",
                vec![Cookie::new("session", "old"), Cookie::new("theme", "dark")],
            )
            .unwrap();
        store
            .put("replace.example.com", vec![Cookie::new("session", "new")])
            .unwrap();

        let got = store.get("replace.example.com", "/").unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].value, "new");
    }

    #[test]
    #[ignore]
    fn empty_host_is_a_no_op() {
        let store = live_store("crumbjar_test_empty_host");
        store.put("", vec![Cookie::new("lost", "1")]).unwrap();
        assert!(store.get("", "/").unwrap().is_empty());
    }
}
