//! Topic keyword extraction, synonym expansion, and text scoring.

use std::sync::LazyLock;

use regex::Regex;

/// Words stripped from topics before expansion.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "how", "in", "is", "it", "of",
    "on", "or", "our", "that", "the", "this", "to", "was", "what", "when", "where", "which",
    "with", "not",
];

/// Static synonym table: a topic keyword on the left also yields the
/// keywords on the right.
const SYNONYMS: &[(&str, &[&str])] = &[
    ("mobile", &["ios", "android", "react native"]),
    ("ios", &["iphone", "swift"]),
    ("android", &["kotlin"]),
    ("auth", &["authentication", "login", "oauth", "sso"]),
    ("authentication", &["auth", "login", "oauth"]),
    ("database", &["sql", "postgres", "schema"]),
    ("db", &["database", "sql"]),
    ("deploy", &["deployment", "release", "rollout"]),
    ("deployment", &["deploy", "release"]),
    ("crash", &["panic", "exception", "stacktrace"]),
    ("bug", &["defect", "regression", "issue"]),
    ("websocket", &["websockets"]),
    ("api", &["endpoint", "rest"]),
    ("cache", &["caching", "ttl"]),
    ("performance", &["latency", "slow", "profiling"]),
];

/// Tokenizer for topics and content: word characters plus inner hyphens.
static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?u)\b[\w][\w-]*\b").expect("token regex"));

// ---------------------------------------------------------------------------
// Keyword extraction
// ---------------------------------------------------------------------------

/// Expand a topic into a lowercase, stop-word-free, synonym-enriched
/// keyword list. Order is deterministic: topic tokens first, then synonyms.
pub fn extract_topic_keywords(topic: &str) -> Vec<String> {
    let lowered = topic.to_lowercase();
    let mut keywords: Vec<String> = Vec::new();

    for m in TOKEN_RE.find_iter(&lowered) {
        let token = m.as_str();
        if is_stop_word(token) || is_operator(token) {
            continue;
        }
        push_unique(&mut keywords, token);
    }

    // Synonym expansion after the original tokens so callers can truncate
    // without losing the user's own words.
    let original_count = keywords.len();
    for i in 0..original_count {
        let token = keywords[i].clone();
        if let Some((_, syns)) = SYNONYMS.iter().find(|(k, _)| *k == token) {
            for syn in *syns {
                push_unique(&mut keywords, syn);
            }
        }
    }

    keywords
}

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Boolean operators leak into plain-keyword extraction when a boolean topic
/// falls back; drop them here.
fn is_operator(token: &str) -> bool {
    matches!(token, "and" | "or" | "not")
}

fn push_unique(keywords: &mut Vec<String>, token: &str) {
    if !keywords.iter().any(|k| k == token) {
        keywords.push(token.to_string());
    }
}

// ---------------------------------------------------------------------------
// Matching & scoring
// ---------------------------------------------------------------------------

/// Whether `keyword` occurs in `text_lc` (both already lowercase).
///
/// Short keywords match on word boundaries only, so "web" does not count a
/// hit inside "websocket". Longer keywords use plain substring containment,
/// which lets "deploy" match "deployment".
pub(crate) fn keyword_matches(text_lc: &str, keyword: &str) -> bool {
    if keyword.len() > 4 {
        return text_lc.contains(keyword);
    }
    contains_word(text_lc, keyword)
}

/// Word-boundary substring search without per-call regex compilation.
fn contains_word(text: &str, word: &str) -> bool {
    let mut start = 0;
    while let Some(idx) = text[start..].find(word) {
        let abs = start + idx;
        let before_ok = abs == 0
            || !text[..abs]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric());
        let after = abs + word.len();
        let after_ok = after >= text.len()
            || !text[after..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
        start = abs + word.len().max(1);
    }
    false
}

/// Score content against a keyword set, weighting title matches above body
/// matches. Returns a non-negative score; zero means no keyword matched.
pub fn score_content_relevance_with_title(content: &str, keywords: &[String], title: &str) -> u32 {
    let content_lc = content.to_lowercase();
    let title_lc = title.to_lowercase();

    let mut score = 0u32;
    for keyword in keywords {
        if keyword_matches(&title_lc, keyword) {
            score += 6;
        }
        if keyword_matches(&content_lc, keyword) {
            // Repeated occurrences add a little, capped so one keyword
            // cannot dominate the score.
            let occurrences = content_lc.matches(keyword.as_str()).count().min(3) as u32;
            score += 2 * occurrences.max(1);
        }
    }
    score
}

/// Build an ordered, length-bounded term list for upstreams with strict
/// query-length ceilings. The user's own tokens always come first.
pub fn build_expanded_search_terms(topic: &str, max_terms: usize) -> Vec<String> {
    let mut terms = extract_topic_keywords(topic);
    terms.truncate(max_terms);
    terms
}

// ---------------------------------------------------------------------------
// Chunk selection
// ---------------------------------------------------------------------------

/// Pick the chunk with the highest keyword overlap for `topic`, joined with
/// its following neighbor for context (or the preceding one at the end).
///
/// Falls back to the first chunk when the topic is empty or nothing matches.
pub fn select_best_chunk_with_context(chunks: &[String], topic: &str) -> String {
    if chunks.is_empty() {
        return String::new();
    }

    let keywords = extract_topic_keywords(topic);
    if keywords.is_empty() {
        return chunks[0].clone();
    }

    let mut best_idx = 0;
    let mut best_overlap = 0usize;
    for (i, chunk) in chunks.iter().enumerate() {
        let chunk_lc = chunk.to_lowercase();
        let overlap = keywords
            .iter()
            .filter(|k| keyword_matches(&chunk_lc, k))
            .count();
        if overlap > best_overlap {
            best_overlap = overlap;
            best_idx = i;
        }
    }

    if best_overlap == 0 {
        return chunks[0].clone();
    }

    let neighbor = if best_idx + 1 < chunks.len() {
        Some(best_idx + 1)
    } else if best_idx > 0 {
        Some(best_idx - 1)
    } else {
        None
    };

    match neighbor {
        Some(n) if n > best_idx => format!("{}\n{}", chunks[best_idx], chunks[n]),
        Some(n) => format!("{}\n{}", chunks[n], chunks[best_idx]),
        None => chunks[best_idx].clone(),
    }
}
