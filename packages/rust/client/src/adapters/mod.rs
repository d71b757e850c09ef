//! Source adapter trait and built-in connectors.
//!
//! Every upstream (documentation site, forum, feed, local fallback files)
//! is reached through the same [`SourceAdapter`] contract, so the client
//! core never special-cases a source kind.

mod feed;
mod file;

use async_trait::async_trait;

use sourcedock_shared::{
    AuthConfig, Document, FetchRequest, Protocol, Result, SyntaxReport,
};

pub use feed::HttpFeedConnector;
pub use file::FileConnector;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Uniform contract every connector implements.
///
/// `fetch` returns documents already shaped as [`Document`]; normalization
/// from the upstream's native format happens inside the adapter. Empty
/// results are a normal outcome, not an error.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Fetch documents for the request's topic from the configured source.
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Document>>;

    /// Which protocol this adapter speaks.
    fn protocol(&self) -> Protocol;

    /// Install credentials. Adapters hold the [`AuthConfig`] and resolve the
    /// key from the environment per call; the key itself is never stored.
    fn set_auth(&mut self, auth: AuthConfig);

    /// Check a native query for upstream-specific syntax problems without
    /// making a network call.
    fn validate_syntax(&self, query: &str) -> SyntaxReport {
        let _ = query;
        SyntaxReport::ok()
    }

    /// Release held resources. The default is a no-op for connectors with
    /// nothing to tear down.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Maps a protocol to the connector that handles it.
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    /// Registry with no connectors; callers register what their sources need.
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// Register a connector. A later registration for the same protocol
    /// shadows an earlier one.
    pub fn register(&mut self, adapter: Box<dyn SourceAdapter>) {
        self.adapters.insert(0, adapter);
    }

    /// Find the connector for a protocol.
    pub fn get(&self, protocol: Protocol) -> Option<&dyn SourceAdapter> {
        self.adapters
            .iter()
            .find(|a| a.protocol() == protocol)
            .map(|a| a.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Close every registered connector, ignoring individual failures so one
    /// bad teardown cannot block the rest.
    pub async fn close_all(&self) {
        for adapter in &self.adapters {
            let _ = adapter.close().await;
        }
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
