use std::error::Error as StdError;

/// Errors produced by cookie store backends and the jar facade.
///
/// Construction problems surface as [`StoreError::Config`]; everything else
/// carries the backend kind, the operation and the host involved so a failed
/// `put`/`get` can be diagnosed without leaking connection details.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid store configuration: {0}")]
    Config(String),

    #[error("failed to encode cookies for host {host:?}: {source}")]
    Encode {
        host: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode cookies stored for host {host:?}: {source}")]
    Decode {
        host: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{backend} {op} failed for host {host:?}: {source}")]
    Backend {
        backend: &'static str,
        op: &'static str,
        host: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl StoreError {
    pub(crate) fn backend(
        backend: &'static str,
        op: &'static str,
        host: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        StoreError::Backend {
            backend,
            op,
            host: host.into(),
            source: source.into(),
        }
    }
}
