pub mod cookies;
pub mod errors;
pub mod net;

pub use cookies::*;
