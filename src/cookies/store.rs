//! Cookie store infrastructure.
//!
//! A **cookie store** is the persistence layer behind a cookie jar: a mapping
//! from a hostname-derived lookup key to the set of [`Cookie`] records stored
//! under it. The [`PersistentCookieJar`](crate::cookies::PersistentCookieJar)
//! facade adapts any store to the jar contract the HTTP client consumes, so
//! swapping backends changes persistence and matching fidelity but never the
//! calling contract.
//!
//! This module exports three interchangeable implementations:
//! - [`InMemoryCookieStore`]: volatile, process-local map (exact-host keys,
//!   full replace on write).
//! - [`SqliteCookieStore`]: durable relational store, one JSON blob row per
//!   host, with best-effort cross-subdomain matching on reads.
//! - [`RedisCookieStore`]: networked key-value store keyed
//!   `"<prefix>:<hostname>"`, merging by cookie name on write.
//!
//! ## Design notes
//! - Stores are `Send + Sync` and internally synchronized; callers hold only
//!   `&self`.
//! - Entries are never expired or evicted: `expires` on a record is advisory
//!   metadata, and stale cookies stay retrievable until overwritten.
//! - The backends deliberately differ in write policy (replace vs. merge) and
//!   lookup fidelity (exact host vs. domain suffix); each documents its own
//!   behavior.

mod in_memory;
#[cfg(feature = "redis_cookie_store")]
mod redis;
#[cfg(feature = "sqlite_cookie_store")]
mod sqlite;

use crate::cookies::Cookie;
use crate::errors::StoreError;

/// Volatile in-process cookie store.
pub use in_memory::InMemoryCookieStore;
/// Redis-backed cookie store (one key per hostname).
#[cfg(feature = "redis_cookie_store")]
pub use self::redis::RedisCookieStore;
/// Write policy knob for [`RedisCookieStore`].
#[cfg(feature = "redis_cookie_store")]
pub use self::redis::WritePolicy;
/// SQLite-backed cookie store (one row per hostname).
#[cfg(feature = "sqlite_cookie_store")]
pub use sqlite::SqliteCookieStore;

/// Capability contract shared by all cookie store backends.
///
/// Implementations must be `Send + Sync` and safe for concurrent use.
///
/// ### Expectations
/// - `put` applies the last-write-wins name invariant: after a `put`, at most
///   one record exists per distinct cookie name for that key.
/// - `get` for a host with no prior `put` returns `Ok` with an empty
///   collection, never an error; "host unknown" and "host known but nothing
///   matches" are indistinguishable.
/// - An empty `host` is a benign no-op for both operations: there is no valid
///   key to operate on, so `put` leaves storage untouched and `get` yields an
///   empty result.
/// - I/O and serialization failures surface as [`StoreError`]; a write failure
///   is never reported as success.
pub trait CookieStore: Send + Sync {
    /// Stores `cookies` under `host`. Whether prior records for the key are
    /// replaced or merged is backend policy; see the implementations.
    fn put(&self, host: &str, cookies: Vec<Cookie>) -> Result<(), StoreError>;

    /// Returns the cookies applicable to `host`. `request_path` feeds the
    /// relational backend's inverse-parent path check; backends with exact
    /// hostname keys ignore it.
    fn get(&self, host: &str, request_path: &str) -> Result<Vec<Cookie>, StoreError>;
}
