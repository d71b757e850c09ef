//! Local filesystem connector.
//!
//! Reads normalized documents from `<fallback_dir>/<source>/*.json`, one
//! [`Document`] per file. This is the offline fallback: when a network
//! source is down, a mirrored snapshot under the fallback directory keeps
//! answering.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use sourcedock_query::parse;
use sourcedock_relevance::topic::{extract_topic_keywords, score_content_relevance_with_title};
use sourcedock_shared::{
    AuthConfig, Document, FetchRequest, Protocol, Result, SourceDockError, SyntaxReport,
};

use super::SourceAdapter;

/// Connector serving documents from a local directory tree.
pub struct FileConnector {
    base_dir: PathBuf,
}

impl FileConnector {
    /// Serve documents from `base_dir`. A leading `~/` is expanded to the
    /// user's home directory.
    pub fn new(base_dir: impl AsRef<str>) -> Self {
        Self {
            base_dir: expand_home(base_dir.as_ref()),
        }
    }

    async fn load_documents(&self, source_name: &str) -> Result<Vec<Document>> {
        let dir = self.base_dir.join(source_name);
        if !dir.is_dir() {
            debug!(?dir, "no fallback directory for source");
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| SourceDockError::io(&dir, e))?;

        let mut documents = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SourceDockError::io(&dir, e))?
        {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| SourceDockError::io(&path, e))?;
            match serde_json::from_str::<Document>(&content) {
                Ok(doc) => documents.push(doc),
                // One malformed file must not poison the whole directory.
                Err(e) => warn!(?path, error = %e, "skipping malformed document file"),
            }
        }

        Ok(documents)
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    Path::new(path).to_path_buf()
}

#[async_trait]
impl SourceAdapter for FileConnector {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Document>> {
        let mut documents = self.load_documents(&request.source.name).await?;

        if !request.sections.is_empty() {
            documents.retain(|d| request.sections.iter().any(|s| s == &d.section));
        }

        let keywords = extract_topic_keywords(&request.topic);
        if keywords.is_empty() {
            documents.truncate(request.limit);
            return Ok(documents);
        }

        // Keep only topic-relevant documents, best first.
        let mut scored: Vec<(u32, Document)> = documents
            .into_iter()
            .filter_map(|d| {
                let score = score_content_relevance_with_title(&d.body, &keywords, &d.title);
                (score > 0).then_some((score, d))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.truncate(request.limit);

        Ok(scored.into_iter().map(|(_, d)| d).collect())
    }

    fn protocol(&self) -> Protocol {
        Protocol::File
    }

    /// Local files need no credentials.
    fn set_auth(&mut self, _auth: AuthConfig) {}

    fn validate_syntax(&self, query: &str) -> SyntaxReport {
        match parse(query) {
            Ok(_) => SyntaxReport::ok(),
            Err(e) => SyntaxReport::invalid(vec![e.to_string()]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sourcedock_shared::SourceConfig;

    fn write_doc(dir: &Path, file: &str, title: &str, body: &str, section: &str) {
        let doc = serde_json::json!({
            "title": title,
            "body": body,
            "url": format!("https://docs.example.com/{file}"),
            "section": section,
            "source": "local-docs",
        });
        std::fs::write(dir.join(file), doc.to_string()).expect("write doc");
    }

    fn request(topic: &str, limit: usize) -> FetchRequest {
        FetchRequest {
            source: SourceConfig::new("local-docs", Protocol::File),
            topic: topic.to_string(),
            sections: Vec::new(),
            limit,
        }
    }

    #[tokio::test]
    async fn missing_directory_returns_empty() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let connector = FileConnector::new(tmp.path().to_str().expect("utf8 path"));
        let docs = connector
            .fetch(&request("deploy", 10))
            .await
            .expect("fetch");
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn filters_by_topic_and_respects_limit() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src_dir = tmp.path().join("local-docs");
        std::fs::create_dir(&src_dir).expect("mkdir");
        write_doc(
            &src_dir,
            "a.json",
            "Cache eviction guide",
            "How the cache eviction policy works in detail.",
            "guides",
        );
        write_doc(
            &src_dir,
            "b.json",
            "Release notes",
            "Cache improvements landed this release.",
            "notes",
        );
        write_doc(
            &src_dir,
            "c.json",
            "Unrelated page",
            "Nothing to see here about networking.",
            "guides",
        );

        let connector = FileConnector::new(tmp.path().to_str().expect("utf8 path"));
        let docs = connector
            .fetch(&request("cache eviction", 10))
            .await
            .expect("fetch");

        assert_eq!(docs.len(), 2);
        // Title + body hits should rank the guide first.
        assert_eq!(docs[0].title, "Cache eviction guide");

        let limited = connector
            .fetch(&request("cache eviction", 1))
            .await
            .expect("fetch");
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn section_filter_applies() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src_dir = tmp.path().join("local-docs");
        std::fs::create_dir(&src_dir).expect("mkdir");
        write_doc(&src_dir, "a.json", "Cache guide", "cache details", "guides");
        write_doc(&src_dir, "b.json", "Cache notes", "cache details", "notes");

        let connector = FileConnector::new(tmp.path().to_str().expect("utf8 path"));
        let mut req = request("cache", 10);
        req.sections = vec!["notes".to_string()];
        let docs = connector.fetch(&req).await.expect("fetch");

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].section, "notes");
    }

    #[tokio::test]
    async fn malformed_file_is_skipped() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src_dir = tmp.path().join("local-docs");
        std::fs::create_dir(&src_dir).expect("mkdir");
        write_doc(&src_dir, "good.json", "Cache guide", "cache details", "g");
        std::fs::write(src_dir.join("bad.json"), "{ not json").expect("write");
        std::fs::write(src_dir.join("ignored.txt"), "plain text").expect("write");

        let connector = FileConnector::new(tmp.path().to_str().expect("utf8 path"));
        let docs = connector
            .fetch(&request("cache", 10))
            .await
            .expect("fetch");
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn syntax_validation_uses_boolean_parser() {
        let connector = FileConnector::new("/tmp/does-not-matter");
        assert!(connector.validate_syntax("cache AND eviction").valid);
        assert!(!connector.validate_syntax("cache AND (eviction").valid);
    }
}
