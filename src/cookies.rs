// src/cookies.rs
//! Cookies: [`Cookie`] record, [`PersistentCookieJar`] facade and store backends.

mod cookie;
mod jar;
mod store;

pub use cookie::Cookie;
pub use cookie::SameSite;

pub use jar::PersistentCookieJar;

pub use store::CookieStore;
pub use store::InMemoryCookieStore;
#[cfg(feature = "redis_cookie_store")]
pub use store::RedisCookieStore;
#[cfg(feature = "sqlite_cookie_store")]
pub use store::SqliteCookieStore;
#[cfg(feature = "redis_cookie_store")]
pub use store::WritePolicy;
