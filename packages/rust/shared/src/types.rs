//! Core domain types shared across SourceDock crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SourceConfig;

// ---------------------------------------------------------------------------
// Protocol
// ---------------------------------------------------------------------------

/// Identifies the wire protocol an adapter speaks.
///
/// Adapters register by protocol; the orchestrator dispatches on this value
/// and never inspects the concrete adapter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Page-scraping web adapter.
    Web,
    /// Code-hosting platform API.
    Github,
    /// Issue tracker API.
    Issues,
    /// Wiki / knowledge-base API.
    Wiki,
    /// Community forum API.
    Forum,
    /// Internal chat search API.
    Chat,
    /// Local filesystem documents (fallback directory).
    File,
    /// Normalized HTTP document feed.
    Feed,
}

impl Protocol {
    /// All protocol identifiers known to the configuration guard.
    pub const ALL: [Protocol; 8] = [
        Protocol::Web,
        Protocol::Github,
        Protocol::Issues,
        Protocol::Wiki,
        Protocol::Forum,
        Protocol::Chat,
        Protocol::File,
        Protocol::Feed,
    ];

    /// The stable string identifier used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Web => "web",
            Protocol::Github => "github",
            Protocol::Issues => "issues",
            Protocol::Wiki => "wiki",
            Protocol::Forum => "forum",
            Protocol::Chat => "chat",
            Protocol::File => "file",
            Protocol::Feed => "feed",
        }
    }

    /// How strictly the relevance filter should hold this protocol's
    /// documents to length requirements.
    pub fn source_kind(&self) -> SourceKind {
        match self {
            Protocol::Web | Protocol::Wiki | Protocol::File | Protocol::Feed => {
                SourceKind::Documentation
            }
            Protocol::Github | Protocol::Issues | Protocol::Forum | Protocol::Chat => {
                SourceKind::Community
            }
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "web" => Ok(Protocol::Web),
            "github" => Ok(Protocol::Github),
            "issues" => Ok(Protocol::Issues),
            "wiki" => Ok(Protocol::Wiki),
            "forum" => Ok(Protocol::Forum),
            "chat" => Ok(Protocol::Chat),
            "file" => Ok(Protocol::File),
            "feed" => Ok(Protocol::Feed),
            other => Err(format!("unknown protocol: {other}")),
        }
    }
}

/// Broad quality tier of a source, used by the relevance filter's
/// length requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Curated documentation / knowledge-base content.
    Documentation,
    /// Community-authored posts, issues, and chat messages.
    Community,
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A normalized document returned by any adapter.
///
/// Immutable once produced; the core only filters and truncates document
/// lists, never mutates fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Display title.
    pub title: String,
    /// Plain-text body.
    pub body: String,
    /// Canonical URL of the original content.
    pub url: String,
    /// Logical section within the source (e.g. "guides", "api").
    pub section: String,
    /// Name of the source that produced this document.
    pub source: String,
    /// Author, when the upstream exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Free-form labels/tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    /// When the upstream content was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the upstream content was last updated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Upstream authority score (votes, stars), when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<f32>,
}

// ---------------------------------------------------------------------------
// FetchRequest / SyntaxReport
// ---------------------------------------------------------------------------

/// A single fetch dispatched to an adapter.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Resolved configuration of the source being queried.
    pub source: SourceConfig,
    /// Free-text or boolean search topic.
    pub topic: String,
    /// Sections the caller wants, already intersected with the source's
    /// allowed sections. Empty means all allowed sections.
    pub sections: Vec<String>,
    /// Result limit, already clamped to the source's per-call cap.
    pub limit: usize,
}

/// Outcome of an adapter's search-syntax validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntaxReport {
    /// Whether the adapter can execute the topic as written.
    pub valid: bool,
    /// Human-readable problems found, empty when valid.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

impl SyntaxReport {
    /// A report with no issues.
    pub fn ok() -> Self {
        Self {
            valid: true,
            issues: Vec::new(),
        }
    }

    /// A failing report with the given issues.
    pub fn invalid(issues: Vec<String>) -> Self {
        Self {
            valid: false,
            issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_roundtrip() {
        for p in Protocol::ALL {
            let parsed: Protocol = p.as_str().parse().expect("parse protocol");
            assert_eq!(p, parsed);
        }
        assert!("gopher".parse::<Protocol>().is_err());
    }

    #[test]
    fn source_kind_mapping() {
        assert_eq!(Protocol::Wiki.source_kind(), SourceKind::Documentation);
        assert_eq!(Protocol::Forum.source_kind(), SourceKind::Community);
        assert_eq!(Protocol::Chat.source_kind(), SourceKind::Community);
    }

    #[test]
    fn document_serialization_skips_empty_optionals() {
        let doc = Document {
            title: "Deploy guide".into(),
            body: "How to deploy the service.".into(),
            url: "https://docs.example.com/deploy".into(),
            section: "guides".into(),
            source: "team-docs".into(),
            author: None,
            labels: vec![],
            created_at: None,
            updated_at: None,
            authority: None,
        };

        let json = serde_json::to_string(&doc).expect("serialize");
        assert!(!json.contains("author"));
        assert!(!json.contains("labels"));

        let parsed: Document = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.title, "Deploy guide");
        assert!(parsed.labels.is_empty());
    }
}
