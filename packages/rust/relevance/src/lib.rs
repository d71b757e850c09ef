//! Topic analysis and document relevance filtering.
//!
//! Two layers:
//! - [`topic`] — expands a search topic into weighted, synonym-enriched
//!   keyword sets and scores raw text against them.
//! - [`filter`] — the ordered acceptance pipeline that rejects low-quality
//!   or off-topic documents before they reach the caller.

pub mod filter;
pub mod topic;

pub use filter::{FilterConfig, RejectReason, RelevanceFilter, RelevanceScore, Verdict};
pub use topic::{
    build_expanded_search_terms, extract_topic_keywords, score_content_relevance_with_title,
    select_best_chunk_with_context,
};
