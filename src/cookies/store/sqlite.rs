//! SQLite-backed cookie store.
//!
//! `SqliteCookieStore` persists cookies in a single two-column table: `host`
//! (primary key) and `cookies` (one JSON array blob for everything stored
//! under that host). Writes upsert the row for the exact hostname; reads scan
//! **every row** and apply a domain-matching predicate per stored cookie, so a
//! query for `sub.example.com` also picks up cookies a response set with
//! `Domain=example.com`, and a query for the bare domain can retrieve cookies
//! that were actually stored under a subdomain.
//!
//! ## Concurrency
//! - One `RwLock` serializes operations on an instance: readers run
//!   concurrently with each other, writers are exclusive.
//! - The lock does not coordinate independent processes sharing the table; the
//!   last upsert physically committed wins.
//!
//! ## I/O characteristics
//! - Database access goes through an `r2d2` pool; each connection carries a
//!   `busy_timeout` so a contended query returns a recoverable error instead
//!   of blocking indefinitely.
//! - Table creation at construction runs under a longer one-time setup
//!   timeout.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::rusqlite::params;
use r2d2_sqlite::SqliteConnectionManager;

use crate::cookies::cookie::{dedupe_last_wins, Cookie};
use crate::cookies::store::CookieStore;
use crate::errors::StoreError;

/// Per-query bound, applied as `busy_timeout` on every pooled connection.
const QUERY_TIMEOUT: Duration = Duration::from_secs(5);
/// One-time setup bound for pool checkout and table creation.
const SETUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Durable cookie store backed by a SQLite database.
#[derive(Debug)]
pub struct SqliteCookieStore {
    pool: Pool<SqliteConnectionManager>,
    table: String,
    /// Serializes store operations on this instance.
    lock: RwLock<()>,
}

impl SqliteCookieStore {
    /// Opens (or creates) the database at `path` and ensures `table` exists.
    ///
    /// Fails fast with [`StoreError::Config`] if the table name is empty or
    /// not a plain identifier (it is interpolated into SQL), and with a
    /// backend error if the database is unreachable or the table cannot be
    /// created.
    pub fn new(path: PathBuf, table: &str) -> Result<Arc<Self>, StoreError> {
        if table.is_empty() {
            return Err(StoreError::Config("table name cannot be empty".to_string()));
        }
        let identifier = table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !table.starts_with(|c: char| c.is_ascii_digit());
        if !identifier {
            return Err(StoreError::Config(format!(
                "table name {table:?} is not a valid identifier"
            )));
        }

        let manager =
            SqliteConnectionManager::file(path).with_init(|conn| conn.busy_timeout(QUERY_TIMEOUT));
        let pool = Pool::builder()
            .connection_timeout(SETUP_TIMEOUT)
            .build(manager)
            .map_err(|e| StoreError::backend("sqlite", "connect", "", e))?;

        // First checkout doubles as the reachability check.
        let conn = pool
            .get()
            .map_err(|e| StoreError::backend("sqlite", "connect", "", e))?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                host TEXT PRIMARY KEY,
                cookies TEXT NOT NULL
            );"
        ))
        .map_err(|e| StoreError::backend("sqlite", "create table", "", e))?;

        Ok(Arc::new(Self {
            pool,
            table: table.to_string(),
            lock: RwLock::new(()),
        }))
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StoreError> {
        self.pool
            .get()
            .map_err(|e| StoreError::backend("sqlite", "connect", "", e))
    }
}

impl CookieStore for SqliteCookieStore {
    /// Serializes the (name-deduped) cookies as one JSON array and upserts the
    /// row for the exact `host` key: everything previously stored under that
    /// host is replaced.
    fn put(&self, host: &str, cookies: Vec<Cookie>) -> Result<(), StoreError> {
        if host.is_empty() {
            log::warn!("sqlite cookie write skipped: no hostname to key on");
            return Ok(());
        }

        let _guard = self.lock.write().unwrap();

        let cookies = dedupe_last_wins(cookies);
        let json = serde_json::to_string(&cookies).map_err(|source| StoreError::Encode {
            host: host.to_string(),
            source,
        })?;

        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO {} (host, cookies) VALUES (?1, ?2)
                 ON CONFLICT(host) DO UPDATE SET cookies = excluded.cookies",
                self.table
            ),
            params![host, json],
        )
        .map_err(|e| StoreError::backend("sqlite", "put", host, e))?;

        Ok(())
    }

    /// Scans every row and collects the cookies whose domain applies to
    /// `host`; see [`applies_to`] for the predicate.
    fn get(&self, host: &str, request_path: &str) -> Result<Vec<Cookie>, StoreError> {
        if host.is_empty() {
            return Ok(Vec::new());
        }

        let _guard = self.lock.read().unwrap();

        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("SELECT host, cookies FROM {}", self.table))
            .map_err(|e| StoreError::backend("sqlite", "get", host, e))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| StoreError::backend("sqlite", "get", host, e))?;

        let mut matched = Vec::new();
        for row in rows {
            let (stored_host, json) =
                row.map_err(|e| StoreError::backend("sqlite", "get", host, e))?;
            let cookies: Vec<Cookie> =
                serde_json::from_str(&json).map_err(|source| StoreError::Decode {
                    host: stored_host.clone(),
                    source,
                })?;

            for cookie in cookies {
                if applies_to(&cookie, &stored_host, host, request_path) {
                    matched.push(cookie);
                }
            }
        }

        Ok(matched)
    }
}

/// Whether a cookie stored under `stored_host` applies to a request for
/// `host` with `request_path`.
///
/// 1. Host-only cookie (no domain): only if the stored host equals the
///    requested host exactly.
/// 2. Domain cookie: if the requested host equals the domain or is a
///    subdomain of it.
/// 3. Inverse case, requested host is a parent of the cookie's domain: only if
///    the request path is root or the cookie's path is a prefix of it. This
///    lets a query for the bare domain retrieve cookies that were actually set
///    on a subdomain.
fn applies_to(cookie: &Cookie, stored_host: &str, host: &str, request_path: &str) -> bool {
    let domain = match cookie.domain.as_deref() {
        Some(d) if !d.is_empty() => d,
        _ => return stored_host == host,
    };

    if host == domain || host.ends_with(&format!(".{domain}")) {
        return true;
    }

    if domain == host || domain.ends_with(&format!(".{host}")) {
        return request_path == "/" || request_path.starts_with(cookie.path.as_str());
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> Arc<SqliteCookieStore> {
        let _ = env_logger::builder().is_test(true).try_init();
        SqliteCookieStore::new(dir.path().join("cookies.db"), "cookies").unwrap()
    }

    #[test]
    fn rejects_bad_table_names() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cookies.db");

        let err = SqliteCookieStore::new(path.clone(), "").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));

        let err = SqliteCookieStore::new(path.clone(), "cookies; DROP TABLE x").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));

        let err = SqliteCookieStore::new(path, "1cookies").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn unseen_host_yields_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.get("another-domain.org", "/").unwrap().is_empty());
    }

    #[test]
    fn put_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let cookies = vec![
            Cookie::new("session-id", "abc123xyz").with_domain("example.com"),
            Cookie::new("user_preference", "theme=dark")
                .with_domain("sub.example.com")
                .with_path("/some"),
        ];
        store.put("sub.example.com", cookies.clone()).unwrap();

        let got = store.get("sub.example.com", "/some/path").unwrap();
        assert_eq!(got.len(), 2);
        assert!(got.iter().any(|c| c.name == "session-id"));
        assert!(got.iter().any(|c| c.name == "user_preference"));
    }

    #[test]
    fn state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = store_in(&dir);
            store
                .put("example.com", vec![Cookie::new("session", "abc")])
                .unwrap();
        }
        let store = store_in(&dir);
        assert_eq!(store.get("example.com", "/").unwrap().len(), 1);
    }

    #[test]
    fn domain_suffix_match_from_subdomain() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        // Stored under example.com with Domain=example.com: a subdomain
        // request matches via the domain-suffix rule.
        store
            .put(
                "example.com",
                vec![Cookie::new("session-id", "abc123xyz").with_domain("example.com")],
            )
            .unwrap();

        let got = store.get("sub.example.com", "/").unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].name, "session-id");
    }

    #[test]
    fn inverse_parent_match_for_root_path() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        // Stored under sub.example.com with Domain=sub.example.com: the bare
        // domain still retrieves it when requesting the root path.
        store
            .put(
                "sub.example.com",
                vec![Cookie::new("session", "abc").with_domain("sub.example.com")],
            )
            .unwrap();

        assert_eq!(store.get("example.com", "/").unwrap().len(), 1);
        assert!(store.get("other.com", "/").unwrap().is_empty());
    }

    #[test]
    fn host_only_cookie_requires_exact_host() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store
            .put("sub.example.com", vec![Cookie::new("session", "abc")])
            .unwrap();

        assert_eq!(store.get("sub.example.com", "/").unwrap().len(), 1);
        assert!(store.get("example.com", "/x").unwrap().is_empty());
    }

    #[test]
    fn second_put_fully_replaces_for_host() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store
            .put(
                "sub.example.com",
                vec![
                    Cookie::new("session-id", "old").with_domain("example.com"),
                    Cookie::new("user_preference", "theme=dark").with_domain("sub.example.com"),
                ],
            )
            .unwrap();
        store
            .put(
                "sub.example.com",
                vec![
                    Cookie::new("session-id", "new-session-value-456").with_domain("example.com"),
                    Cookie::new("tracker-status", "opt-out").with_domain("sub.example.com"),
                ],
            )
            .unwrap();

        let got = store.get("sub.example.com", "/").unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(
            got.iter().find(|c| c.name == "session-id").unwrap().value,
            "new-session-value-456"
        );
        assert!(!got.iter().any(|c| c.name == "user_preference"));
    }

    #[test]
    fn duplicate_names_in_one_put_last_write_wins() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

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
    fn empty_host_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store
            .put("example.com", vec![Cookie::new("session", "abc")])
            .unwrap();
        store.put("", vec![Cookie::new("lost", "1")]).unwrap();

        assert!(store.get("", "/").unwrap().is_empty());
        assert_eq!(store.get("example.com", "/").unwrap().len(), 1);
    }
}
