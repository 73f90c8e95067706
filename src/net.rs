// src/net.rs
//! HTTP layer: the thin [`Client`] wrapper and the buffered [`Response`].

mod client;
mod response;

pub use client::Client;
pub use response::Response;
