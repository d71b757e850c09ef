//! Boolean topic query engine.
//!
//! Parses topics like `(mobile OR web) AND crash AND NOT obsolete` into an
//! expression tree, evaluates the tree against document text, and can flatten
//! it back to a keyword list for upstreams without boolean search support.
//!
//! Parse failure is an explicit [`ParseError`], never a partial tree — the
//! caller decides whether to fall back to plain keyword matching.

mod parser;

pub use parser::{ParseError, parse};

// ---------------------------------------------------------------------------
// QueryNode
// ---------------------------------------------------------------------------

/// One node of a parsed boolean query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryNode {
    /// A bare word or quoted phrase.
    Term(String),
    /// Both sides must match.
    And(Box<QueryNode>, Box<QueryNode>),
    /// Either side must match.
    Or(Box<QueryNode>, Box<QueryNode>),
    /// The child must not match.
    Not(Box<QueryNode>),
}

/// Evaluate a query tree against a body of text.
///
/// Term leaves match by case-insensitive substring containment; inner nodes
/// combine results with boolean semantics.
pub fn evaluate(node: &QueryNode, text: &str) -> bool {
    let lowered = text.to_lowercase();
    eval_lowered(node, &lowered)
}

fn eval_lowered(node: &QueryNode, text_lc: &str) -> bool {
    match node {
        QueryNode::Term(term) => text_lc.contains(&term.to_lowercase()),
        QueryNode::And(l, r) => eval_lowered(l, text_lc) && eval_lowered(r, text_lc),
        QueryNode::Or(l, r) => eval_lowered(l, text_lc) || eval_lowered(r, text_lc),
        QueryNode::Not(child) => !eval_lowered(child, text_lc),
    }
}

/// Whether a topic uses boolean query syntax worth parsing.
///
/// Only uppercase operators count, so a natural-language topic like
/// "cache and eviction" stays on the plain keyword path. Parentheses and
/// quoted phrases always signal query syntax.
pub fn has_operators(topic: &str) -> bool {
    topic.contains('(')
        || topic.contains(')')
        || topic.contains('"')
        || topic
            .split_whitespace()
            .any(|w| matches!(w, "AND" | "OR" | "NOT"))
}

/// Collect every term leaf in the tree, including negated ones.
///
/// Used for upstreams that only support keyword search.
pub fn extract_keywords(node: &QueryNode) -> Vec<String> {
    let mut out = Vec::new();
    collect_terms(node, &mut out);
    out
}

fn collect_terms(node: &QueryNode, out: &mut Vec<String>) {
    match node {
        QueryNode::Term(term) => {
            if !out.contains(term) {
                out.push(term.clone());
            }
        }
        QueryNode::And(l, r) | QueryNode::Or(l, r) => {
            collect_terms(l, out);
            collect_terms(r, out);
        }
        QueryNode::Not(child) => collect_terms(child, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_or_precedence_evaluation() {
        let node = parse("(mobile OR web) AND bug").unwrap();
        assert!(evaluate(&node, "mobile bug report"));
        assert!(evaluate(&node, "web app bug"));
        assert!(!evaluate(&node, "mobile chat feature"));
        assert!(!evaluate(&node, "desktop bug"));
    }

    #[test]
    fn not_excludes_matches() {
        let node = parse("a AND NOT b").unwrap();
        assert!(evaluate(&node, "a only here"));
        assert!(!evaluate(&node, "a b"));
    }

    #[test]
    fn or_binds_looser_than_and() {
        // kafka OR redis AND cache == kafka OR (redis AND cache). Terms are
        // multi-letter on purpose: a single-letter term would substring-match
        // inside unrelated words.
        let node = parse("kafka OR redis AND cache").unwrap();
        assert!(evaluate(&node, "just kafka"));
        assert!(evaluate(&node, "redis with cache"));
        assert!(!evaluate(&node, "redis alone"));
        assert!(!evaluate(&node, "cache alone"));
    }

    #[test]
    fn evaluation_is_case_insensitive() {
        let node = parse("Deployment AND Rollback").unwrap();
        assert!(evaluate(&node, "DEPLOYMENT and rollback notes"));
    }

    #[test]
    fn quoted_phrase_matches_as_whole() {
        let node = parse("\"connection pool\" AND timeout").unwrap();
        assert!(evaluate(&node, "the connection pool hit a timeout"));
        assert!(!evaluate(&node, "pool connection timeout"));
    }

    #[test]
    fn keywords_collected_from_all_leaves() {
        let node = parse("(mobile OR web) AND bug AND NOT obsolete").unwrap();
        let mut keywords = extract_keywords(&node);
        keywords.sort();
        assert_eq!(keywords, vec!["bug", "mobile", "obsolete", "web"]);
    }

    #[test]
    fn keywords_deduplicated() {
        let node = parse("cache AND cache").unwrap();
        assert_eq!(extract_keywords(&node), vec!["cache"]);
    }

    #[test]
    fn operator_detection_requires_uppercase() {
        assert!(has_operators("cache AND eviction"));
        assert!(has_operators("NOT obsolete"));
        assert!(has_operators("(mobile OR web) crash"));
        assert!(has_operators("\"connection pool\" timeout"));

        // Natural language stays on the keyword path.
        assert!(!has_operators("cache and eviction"));
        assert!(!has_operators("why is the app not loading"));
    }
}
