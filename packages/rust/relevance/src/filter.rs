//! Universal relevance filter — the ordered acceptance pipeline applied to
//! every document before it reaches the caller.
//!
//! Rules run in a fixed order and the first failure decides the rejection;
//! the reason and composite score are kept for diagnostics only.

use sourcedock_shared::{Document, SourceKind};

use crate::topic::{extract_topic_keywords, score_content_relevance_with_title};

/// Generic titles that mark error/placeholder pages when matched exactly.
const ERROR_TITLES: &[&str] = &[
    "404",
    "not found",
    "page not found",
    "error",
    "access denied",
    "forbidden",
];

/// Body phrases counted toward the error-page heuristic.
const ERROR_PHRASES: &[&str] = &[
    "page not found",
    "access denied",
    "an error occurred",
    "try again later",
    "service unavailable",
    "under maintenance",
];

/// Promotional phrases counted toward the spam heuristic.
const PROMO_PHRASES: &[&str] = &[
    "buy now",
    "subscribe today",
    "sign up now",
    "limited offer",
    "special discount",
    "act now",
];

/// Navigation chrome keywords that dominate scraped boilerplate.
const NAV_KEYWORDS: &[&str] = &[
    "home",
    "about",
    "contact",
    "privacy",
    "terms",
    "login",
    "menu",
    "next",
    "previous",
    "sitemap",
];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which rule rejected a document. Diagnostics only — callers just see the
/// document filtered out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Empty or below the absolute minimum length.
    TooShort,
    /// No alphabetic characters at all.
    NoAlphabetic,
    /// Markup/script density too high for short content.
    MarkupHeavy,
    /// Promotional-language density too high for short content.
    PromotionalHeavy,
    /// Looks like an error or placeholder page.
    ErrorPage,
    /// Navigation-keyword density above the configured ratio.
    NavigationHeavy,
    /// Topic relevance score below the complexity-scaled minimum.
    OffTopic,
    /// Below the source-kind-specific minimum length.
    BelowSourceMinimum,
}

/// Composite diagnostic score for an evaluated document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevanceScore {
    /// Sum of the three components, clamped to 0–100.
    pub total: u32,
    /// Structural quality, 0–40.
    pub content_quality: u32,
    /// Topic match strength, 0–40.
    pub semantic_relevance: u32,
    /// Upstream authority, 0–20.
    pub source_authority: u32,
    /// Whether the document passed every applicable rule.
    pub passes: bool,
}

/// Result of running the pipeline over one document.
#[derive(Debug, Clone)]
pub struct Verdict {
    /// True when every applicable rule passed.
    pub accepted: bool,
    /// First failing rule, when rejected.
    pub reason: Option<RejectReason>,
    /// Diagnostic score, populated for accepted and rejected documents alike.
    pub score: RelevanceScore,
}

/// Tunable thresholds for the pipeline.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Absolute minimum body length in characters (rule 1).
    pub min_length: usize,
    /// Bodies at or above this length skip the density heuristics (rule 3).
    pub long_content_threshold: usize,
    /// Maximum markup character ratio for short content.
    pub markup_density_max: f32,
    /// Maximum promotional phrase hits for short content.
    pub promo_hits_max: usize,
    /// Maximum navigation keywords per body word.
    pub nav_ratio_max: f32,
    /// Base topic-relevance score a document must clear (rule 6).
    pub min_topic_score: u32,
    /// Minimum body length for documentation/knowledge-base sources (rule 7).
    pub documentation_min_length: usize,
    /// Minimum body length for community sources (rule 7).
    pub community_min_length: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_length: 30,
            long_content_threshold: 2_000,
            markup_density_max: 0.05,
            promo_hits_max: 2,
            nav_ratio_max: 0.25,
            min_topic_score: 4,
            documentation_min_length: 200,
            community_min_length: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// The pipeline itself. Stateless between documents.
#[derive(Debug, Clone, Default)]
pub struct RelevanceFilter {
    config: FilterConfig,
}

impl RelevanceFilter {
    /// Create a filter with custom thresholds.
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    /// Run the ordered pipeline over one document.
    ///
    /// `native_query` marks sources whose upstream search API already
    /// filtered by topic; those skip the topic-relevance rule.
    pub fn evaluate(
        &self,
        doc: &Document,
        topic: &str,
        kind: SourceKind,
        native_query: bool,
    ) -> Verdict {
        let reason = self.first_failure(doc, topic, kind, native_query);
        if let Some(reason) = reason {
            tracing::trace!(url = %doc.url, ?reason, "document rejected");
        }
        let score = self.score(doc, topic, reason.is_none());
        Verdict {
            accepted: reason.is_none(),
            reason,
            score,
        }
    }

    fn first_failure(
        &self,
        doc: &Document,
        topic: &str,
        kind: SourceKind,
        native_query: bool,
    ) -> Option<RejectReason> {
        let body = doc.body.trim();
        let body_lc = body.to_lowercase();

        // 1. Empty / below absolute minimum.
        if body.chars().count() < self.config.min_length {
            return Some(RejectReason::TooShort);
        }

        // 2. Must contain alphabetic characters.
        if !body.chars().any(|c| c.is_alphabetic()) {
            return Some(RejectReason::NoAlphabetic);
        }

        // 3. Density heuristics, short content only — long pages earn trust
        //    by their size.
        if body.chars().count() < self.config.long_content_threshold {
            if markup_density(body) > self.config.markup_density_max {
                return Some(RejectReason::MarkupHeavy);
            }
            let promo_hits = PROMO_PHRASES
                .iter()
                .filter(|p| body_lc.contains(*p))
                .count();
            if promo_hits >= self.config.promo_hits_max {
                return Some(RejectReason::PromotionalHeavy);
            }
        }

        // 4. Error/placeholder pages.
        let title_lc = doc.title.trim().to_lowercase();
        if ERROR_TITLES.contains(&title_lc.as_str()) {
            return Some(RejectReason::ErrorPage);
        }
        let error_hits = ERROR_PHRASES
            .iter()
            .filter(|p| body_lc.contains(*p))
            .count();
        if error_hits >= 2 {
            return Some(RejectReason::ErrorPage);
        }

        // 5. Navigation boilerplate.
        let word_count = body_lc.split_whitespace().count().max(1);
        let nav_hits = body_lc
            .split_whitespace()
            .filter(|w| NAV_KEYWORDS.contains(&w.trim_matches(|c: char| !c.is_alphanumeric())))
            .count();
        if nav_hits as f32 / word_count as f32 > self.config.nav_ratio_max {
            return Some(RejectReason::NavigationHeavy);
        }

        // 6. Topic relevance, skipped for upstream-filtered sources.
        if !native_query {
            let keywords = extract_topic_keywords(topic);
            if !keywords.is_empty() {
                let score = score_content_relevance_with_title(body, &keywords, &doc.title);
                if score < self.required_topic_score(keywords.len()) {
                    return Some(RejectReason::OffTopic);
                }
            }
        }

        // 7. Source-kind minimum length.
        let kind_min = match kind {
            SourceKind::Documentation => self.config.documentation_min_length,
            SourceKind::Community => self.config.community_min_length,
        };
        if body.chars().count() < kind_min {
            return Some(RejectReason::BelowSourceMinimum);
        }

        None
    }

    /// More complex topics (more keywords) demand a higher score, but the
    /// scaling stays sublinear so synonym expansion cannot reject everything.
    fn required_topic_score(&self, keyword_count: usize) -> u32 {
        self.config.min_topic_score + (keyword_count as u32) / 4
    }

    fn score(&self, doc: &Document, topic: &str, passes: bool) -> RelevanceScore {
        let body = doc.body.trim();

        // Quality from length buckets.
        let content_quality = match body.chars().count() {
            0..=99 => 5,
            100..=499 => 20,
            500..=1999 => 32,
            _ => 40,
        };

        let keywords = extract_topic_keywords(topic);
        let semantic_relevance = if keywords.is_empty() {
            20
        } else {
            (score_content_relevance_with_title(body, &keywords, &doc.title) * 4).min(40)
        };

        let source_authority = doc
            .authority
            .map(|a| (a.clamp(0.0, 1.0) * 20.0) as u32)
            .unwrap_or(10);

        RelevanceScore {
            total: (content_quality + semantic_relevance + source_authority).min(100),
            content_quality,
            semantic_relevance,
            source_authority,
            passes,
        }
    }
}

/// Ratio of markup-ish characters to total characters.
fn markup_density(body: &str) -> f32 {
    let total = body.chars().count().max(1);
    let markup = body
        .chars()
        .filter(|c| matches!(c, '<' | '>' | '{' | '}' | ';'))
        .count();
    markup as f32 / total as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use sourcedock_shared::Document;

    fn doc(title: &str, body: &str) -> Document {
        Document {
            title: title.into(),
            body: body.into(),
            url: "https://docs.example.com/page".into(),
            section: "guides".into(),
            source: "docs".into(),
            author: None,
            labels: vec![],
            created_at: None,
            updated_at: None,
            authority: None,
        }
    }

    fn long_doc_about(topic_word: &str) -> Document {
        let body = format!(
            "This guide explains {topic_word} behaviour in production. \
             It walks through configuration, failure modes, and recovery steps. "
        )
        .repeat(6);
        doc(&format!("{topic_word} guide"), &body)
    }

    #[test]
    fn good_document_is_accepted() {
        let filter = RelevanceFilter::default();
        let verdict = filter.evaluate(
            &long_doc_about("cache"),
            "cache",
            SourceKind::Documentation,
            false,
        );
        assert!(verdict.accepted, "rejected: {:?}", verdict.reason);
        assert!(verdict.score.passes);
        assert!(verdict.score.total > 0);
    }

    #[test]
    fn empty_body_rejected_first() {
        let filter = RelevanceFilter::default();
        let verdict = filter.evaluate(&doc("t", ""), "cache", SourceKind::Community, false);
        assert_eq!(verdict.reason, Some(RejectReason::TooShort));
    }

    #[test]
    fn non_alphabetic_body_rejected() {
        let filter = RelevanceFilter::default();
        let body = "1234567890 !!! ??? 555-0100 ### 42 42 42 9999999999 0000";
        let verdict = filter.evaluate(&doc("t", body), "cache", SourceKind::Community, false);
        assert_eq!(verdict.reason, Some(RejectReason::NoAlphabetic));
    }

    #[test]
    fn markup_heavy_short_content_rejected() {
        let filter = RelevanceFilter::default();
        let body = "<div><span>{x};</span></div> cache cache cache <p>{y};</p> more markup here";
        let verdict = filter.evaluate(&doc("t", body), "cache", SourceKind::Community, false);
        assert_eq!(verdict.reason, Some(RejectReason::MarkupHeavy));
    }

    #[test]
    fn long_content_skips_density_checks() {
        let filter = RelevanceFilter::default();
        let mut body = "cache guide content with useful words ".repeat(80);
        body.push_str("<div>{};</div>");
        let verdict = filter.evaluate(
            &doc("cache guide", &body),
            "cache",
            SourceKind::Documentation,
            false,
        );
        assert!(verdict.accepted, "rejected: {:?}", verdict.reason);
    }

    #[test]
    fn promotional_short_content_rejected() {
        let filter = RelevanceFilter::default();
        let body = "Buy now and get a special discount on our cache product, act now friends";
        let verdict = filter.evaluate(&doc("t", body), "cache", SourceKind::Community, false);
        assert_eq!(verdict.reason, Some(RejectReason::PromotionalHeavy));
    }

    #[test]
    fn error_title_rejected_exactly() {
        let filter = RelevanceFilter::default();
        let body = "cache cache cache something long enough to pass the minimum length rule";
        let verdict = filter.evaluate(
            &doc("Page Not Found", body),
            "cache",
            SourceKind::Community,
            false,
        );
        assert_eq!(verdict.reason, Some(RejectReason::ErrorPage));

        // A title merely containing an error word is not an exact match.
        let verdict = filter.evaluate(
            &doc("Handling 404 responses in the cache", body),
            "cache",
            SourceKind::Community,
            false,
        );
        assert_ne!(verdict.reason, Some(RejectReason::ErrorPage));
    }

    #[test]
    fn repeated_error_phrases_rejected() {
        let filter = RelevanceFilter::default();
        let body = "An error occurred while loading. Please try again later. cache note";
        let verdict = filter.evaluate(&doc("t", body), "cache", SourceKind::Community, false);
        assert_eq!(verdict.reason, Some(RejectReason::ErrorPage));
    }

    #[test]
    fn navigation_boilerplate_rejected() {
        let filter = RelevanceFilter::default();
        let body = "Home About Contact Privacy Terms Login Menu Next Previous Sitemap cache ok";
        let verdict = filter.evaluate(&doc("t", body), "cache", SourceKind::Community, false);
        assert_eq!(verdict.reason, Some(RejectReason::NavigationHeavy));
    }

    #[test]
    fn off_topic_rejected_unless_native_query() {
        let filter = RelevanceFilter::default();
        let off_topic = long_doc_about("billing");

        let verdict = filter.evaluate(&off_topic, "websocket", SourceKind::Documentation, false);
        assert_eq!(verdict.reason, Some(RejectReason::OffTopic));

        // Upstream already filtered by topic: rule skipped.
        let verdict = filter.evaluate(&off_topic, "websocket", SourceKind::Documentation, true);
        assert!(verdict.accepted, "rejected: {:?}", verdict.reason);
    }

    #[test]
    fn documentation_held_to_higher_length_bar() {
        let filter = RelevanceFilter::default();
        let body = "short cache answer that mentions cache twice for relevance purposes here";
        assert!(body.len() >= 60 && body.len() < 200);

        let verdict = filter.evaluate(
            &doc("cache", body),
            "cache",
            SourceKind::Documentation,
            false,
        );
        assert_eq!(verdict.reason, Some(RejectReason::BelowSourceMinimum));

        let verdict = filter.evaluate(&doc("cache", body), "cache", SourceKind::Community, false);
        assert!(verdict.accepted, "rejected: {:?}", verdict.reason);
    }

    #[test]
    fn authority_feeds_the_score() {
        let filter = RelevanceFilter::default();
        let mut d = long_doc_about("cache");
        d.authority = Some(1.0);
        let high = filter.evaluate(&d, "cache", SourceKind::Documentation, false);
        d.authority = Some(0.0);
        let low = filter.evaluate(&d, "cache", SourceKind::Documentation, false);
        assert!(high.score.source_authority > low.score.source_authority);
        assert!(high.score.total <= 100);
    }
}
