//! Multi-source document client.
//!
//! [`SourceClient`] is the single entry point for fetching topic-relevant
//! documents from configured sources. Every fetch runs the same pipeline:
//! cache lookup, circuit breaker check, rate-limit wait, adapter dispatch,
//! relevance filtering, cache store. Sources fail independently; one broken
//! upstream never takes down a multi-source request.

pub mod adapters;
mod breaker;
mod cache;
mod ratelimit;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use sourcedock_query::{QueryNode, evaluate, has_operators, parse};
use sourcedock_relevance::RelevanceFilter;
use sourcedock_shared::{
    AppConfig, Document, FetchRequest, Result, SourceConfig, SourceDockError, SyntaxReport, guard,
};

pub use adapters::{AdapterRegistry, FileConnector, HttpFeedConnector, SourceAdapter};
pub use breaker::{CircuitBreaker, CircuitState, is_breaker_failure};
pub use cache::{CacheStats, DocumentCache, fingerprint};
pub use ratelimit::RateLimiter;

/// Snapshot returned by [`SourceClient::cache_stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientStats {
    /// Configured cache TTL in seconds.
    pub ttl_secs: u64,
    /// Number of enabled sources.
    pub enabled_sources: usize,
    /// Number of distinct protocols among enabled sources.
    pub protocols: usize,
    /// Number of allow-listed domains.
    pub allowed_domains: usize,
    /// Live cache entries.
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

// ---------------------------------------------------------------------------
// SourceClient
// ---------------------------------------------------------------------------

/// Orchestrating client over all configured sources.
///
/// Must be constructed inside a Tokio runtime (rate limiters spawn refill
/// tasks). Construction validates the configuration and fails with a
/// [`SourceDockError::Config`] instead of panicking, whatever the input.
pub struct SourceClient {
    config: AppConfig,
    registry: AdapterRegistry,
    limiters: HashMap<String, RateLimiter>,
    breaker: CircuitBreaker,
    cache: DocumentCache,
    filter: RelevanceFilter,
    closed: AtomicBool,
}

impl SourceClient {
    /// Build a client from the given configuration, or from defaults when
    /// `None`. The configuration guard runs first; an invalid config is an
    /// error, never a partially working client.
    pub fn new(config: Option<AppConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();
        guard::validate(&config)?;

        let mut registry = AdapterRegistry::new();
        registry.register(Box::new(FileConnector::new(&config.defaults.fallback_dir)));
        registry.register(Box::new(HttpFeedConnector::new()));

        let limiters = config
            .sources
            .iter()
            .map(|s| {
                (
                    s.name.clone(),
                    RateLimiter::new(s.name.clone(), s.requests_per_minute, s.burst),
                )
            })
            .collect();

        info!(sources = config.sources.len(), "source client ready");

        Ok(Self {
            breaker: CircuitBreaker::new(config.breaker.clone()),
            cache: DocumentCache::new(Duration::from_secs(config.defaults.cache_ttl_secs)),
            filter: RelevanceFilter::default(),
            limiters,
            registry,
            config,
            closed: AtomicBool::new(false),
        })
    }

    /// Register a connector, shadowing any built-in for the same protocol.
    pub fn register_adapter(&mut self, adapter: Box<dyn SourceAdapter>) {
        self.registry.register(adapter);
    }

    // -----------------------------------------------------------------------
    // Fetching
    // -----------------------------------------------------------------------

    /// Fetch topic-relevant documents from one source.
    ///
    /// `limit` is clamped to the source's per-call cap; zero means "as many
    /// as the source allows". `sections` narrows the source's configured
    /// sections; empty means all of them.
    #[instrument(skip_all, fields(source = %source_name, topic = %topic))]
    pub async fn fetch_from_source(
        &self,
        source_name: &str,
        topic: &str,
        sections: &[String],
        limit: usize,
    ) -> Result<Vec<Document>> {
        self.ensure_open()?;
        let source = self.lookup_enabled(source_name)?;

        let limit = match limit {
            0 => source.max_docs_per_call,
            n => n.min(source.max_docs_per_call),
        };
        let sections = effective_sections(source, sections);

        let key = fingerprint(source_name, topic, limit);
        if let Some(docs) = self.cache.get(&key) {
            return Ok(docs);
        }

        // The breaker tracks endpoints; endpoint-less sources (file) key by
        // source name.
        let endpoint = source
            .primary_endpoint()
            .unwrap_or(source_name)
            .to_string();
        if self.breaker.is_open(&endpoint) {
            return Err(SourceDockError::CircuitOpen { endpoint });
        }

        self.wait_for_token(source_name).await?;

        let adapter = self.registry.get(source.protocol).ok_or_else(|| {
            SourceDockError::fetch(
                source_name,
                format!("no adapter registered for protocol {}", source.protocol),
            )
        })?;

        let request = FetchRequest {
            source: source.clone(),
            topic: topic.to_string(),
            sections,
            limit,
        };

        let documents = match adapter.fetch(&request).await {
            Ok(docs) => docs,
            Err(e) => {
                if e.status().is_some_and(is_breaker_failure) {
                    self.breaker.record_failure(&endpoint);
                }
                return Err(e);
            }
        };
        self.breaker.record_success(&endpoint);

        let kind = source.protocol.source_kind();
        let native_query = source.native_query;
        let query = parse_boolean_topic(topic);
        let mut accepted: Vec<Document> = documents
            .into_iter()
            .filter(|d| {
                matches_query(query.as_ref(), d)
                    && self.filter.evaluate(d, topic, kind, native_query).accepted
            })
            .collect();
        accepted.truncate(limit);

        debug!(count = accepted.len(), "fetch complete");
        // Empty results are cached too, so dead topics stay cheap.
        self.cache.put(key, accepted.clone());
        Ok(accepted)
    }

    /// Fetch from several sources, tolerating individual failures.
    ///
    /// Returns documents per source for every source that succeeded. Only
    /// when every requested source fails does the whole call fail.
    pub async fn fetch_from_many(
        &self,
        source_names: &[String],
        topic: &str,
        limit: usize,
    ) -> Result<HashMap<String, Vec<Document>>> {
        let mut results = HashMap::new();
        let mut failures = 0usize;

        for name in source_names {
            match self.fetch_from_source(name, topic, &[], limit).await {
                Ok(docs) => {
                    results.insert(name.clone(), docs);
                }
                Err(e) => {
                    warn!(source = %name, error = %e, "source failed, continuing");
                    failures += 1;
                }
            }
        }

        if failures > 0 && results.is_empty() {
            return Err(SourceDockError::AllSourcesFailed);
        }
        Ok(results)
    }

    /// Check a topic against a source's adapter without any network call.
    pub fn validate_topic(&self, source_name: &str, topic: &str) -> Result<SyntaxReport> {
        let source = self.lookup(source_name)?;
        let adapter = self.registry.get(source.protocol).ok_or_else(|| {
            SourceDockError::fetch(
                source_name,
                format!("no adapter registered for protocol {}", source.protocol),
            )
        })?;
        Ok(adapter.validate_syntax(topic))
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// Names of every enabled source.
    pub fn available_sources(&self) -> Vec<String> {
        self.config
            .sources
            .iter()
            .filter(|s| s.enabled)
            .map(|s| s.name.clone())
            .collect()
    }

    pub fn is_source_enabled(&self, source_name: &str) -> bool {
        self.lookup(source_name).map(|s| s.enabled).unwrap_or(false)
    }

    /// Configuration of a source, if registered.
    pub fn source_config(&self, source_name: &str) -> Option<&SourceConfig> {
        self.config
            .sources
            .iter()
            .find(|s| s.name == source_name)
    }

    /// Structured snapshot of the cache and the configuration behind it.
    pub fn cache_stats(&self) -> ClientStats {
        let cache = self.cache.stats();
        let enabled: Vec<_> = self.config.sources.iter().filter(|s| s.enabled).collect();
        let mut protocols: Vec<_> = enabled.iter().map(|s| s.protocol).collect();
        protocols.sort_by_key(|p| p.as_str());
        protocols.dedup();

        ClientStats {
            ttl_secs: self.config.defaults.cache_ttl_secs,
            enabled_sources: enabled.len(),
            protocols: protocols.len(),
            allowed_domains: self.config.allowed_domains.len(),
            entries: cache.entries,
            hits: cache.hits,
            misses: cache.misses,
        }
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Shut the client down: stop rate limiters, close adapters, drop the
    /// cache. Idempotent; fetches after close fail fast.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        for limiter in self.limiters.values() {
            limiter.close();
        }
        self.registry.close_all().await;
        self.cache.clear();
        info!("source client closed");
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SourceDockError::validation("client is closed"));
        }
        Ok(())
    }

    fn lookup(&self, source_name: &str) -> Result<&SourceConfig> {
        self.source_config(source_name)
            .ok_or_else(|| SourceDockError::SourceNotFound(source_name.to_string()))
    }

    fn lookup_enabled(&self, source_name: &str) -> Result<&SourceConfig> {
        let source = self.lookup(source_name)?;
        if !source.enabled {
            return Err(SourceDockError::SourceDisabled(source_name.to_string()));
        }
        Ok(source)
    }

    /// Take a rate-limit token, waiting up to the configured bound.
    async fn wait_for_token(&self, source_name: &str) -> Result<()> {
        let Some(limiter) = self.limiters.get(source_name) else {
            // No limiter only happens for sources added after construction;
            // treat as unlimited rather than failing the fetch.
            return Ok(());
        };
        if limiter.try_acquire() {
            return Ok(());
        }

        let wait = Duration::from_secs(self.config.defaults.rate_wait_secs);
        match tokio::time::timeout(wait, limiter.acquire()).await {
            Ok(result) => result,
            Err(_elapsed) => Err(SourceDockError::RateLimited {
                source_name: source_name.to_string(),
            }),
        }
    }
}

/// Try to read the topic as a boolean query.
///
/// Plain topics and unparseable boolean attempts both fall back to keyword
/// matching; parse failure is logged, never surfaced to the caller.
fn parse_boolean_topic(topic: &str) -> Option<QueryNode> {
    if !has_operators(topic) {
        return None;
    }
    match parse(topic) {
        Ok(node) => Some(node),
        Err(e) => {
            debug!(topic, error = %e, "boolean parse failed, using keyword matching");
            None
        }
    }
}

/// Evaluate a parsed boolean topic against title + body. No query means no
/// constraint.
fn matches_query(query: Option<&QueryNode>, doc: &Document) -> bool {
    match query {
        Some(node) => evaluate(node, &format!("{} {}", doc.title, doc.body)),
        None => true,
    }
}

/// Intersect requested sections with the source's configured ones.
///
/// Requested sections outside the source's list are dropped with a warning
/// rather than failing the fetch.
fn effective_sections(source: &SourceConfig, requested: &[String]) -> Vec<String> {
    if requested.is_empty() {
        return source.sections.clone();
    }
    if source.sections.is_empty() {
        return requested.to_vec();
    }
    let (allowed, dropped): (Vec<String>, Vec<String>) = requested
        .iter()
        .cloned()
        .partition(|s| source.sections.contains(s));
    if !dropped.is_empty() {
        warn!(source = %source.name, ?dropped, "dropping sections not offered by source");
    }
    allowed
}
