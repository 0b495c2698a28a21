// src/content/dump.rs
// =============================================================================
// A content store backed by a JSON export of a site.
//
// File layout:
//
//   {
//     "site_url": "http://docs.test",
//     "records": [
//       { "id": 7, "post_type": "page", "date": "2024-01-01T09:30:00",
//         "title": "Guides", "permalink": "http://docs.test/guides",
//         "body": "<a href=\"https://aka.ms/abc123\">Guide</a>" }
//     ]
//   }
//
// Filtering by post type and date happens here, in memory.
// =============================================================================

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;
use url::Url;

use super::{ContentRecord, ContentStore};
use crate::error::{PipelineError, Result};

#[derive(Debug, Deserialize)]
struct Dump {
    site_url: String,
    records: Vec<ContentRecord>,
}

pub struct DumpStore {
    site_url: Url,
    records: Vec<ContentRecord>,
}

impl DumpStore {
    pub fn open(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let dump: Dump = serde_json::from_str(&text).map_err(|e| {
            PipelineError::Store(format!("{} is not a valid content dump: {e}", path.display()))
        })?;
        DumpStore::new(&dump.site_url, dump.records)
    }

    pub fn new(site_url: &str, records: Vec<ContentRecord>) -> Result<Self> {
        let site_url = Url::parse(site_url)
            .map_err(|e| PipelineError::Store(format!("invalid site URL '{site_url}': {e}")))?;
        Ok(DumpStore { site_url, records })
    }
}

#[async_trait]
impl ContentStore for DumpStore {
    fn site_url(&self) -> &Url {
        &self.site_url
    }

    async fn query(
        &self,
        post_types: &[String],
        after: Option<NaiveDate>,
    ) -> Result<Vec<ContentRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| post_types.iter().any(|t| *t == r.post_type))
            .filter(|r| r.published_since(after))
            .cloned()
            .collect())
    }

    async fn record(&self, id: u64, post_types: &[String]) -> Result<Option<ContentRecord>> {
        Ok(self
            .records
            .iter()
            .find(|r| r.id == id && post_types.iter().any(|t| *t == r.post_type))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DUMP: &str = r#"{
        "site_url": "http://docs.test",
        "records": [
            { "id": 1, "date": "2024-01-01T09:30:00", "title": "Old post",
              "permalink": "http://docs.test/old", "body": "" },
            { "id": 2, "post_type": "page", "date": "2024-06-01T00:00:00", "title": "A page",
              "permalink": "http://docs.test/page", "body": "" },
            { "id": 3, "date": "2024-06-02T12:00:00", "title": "New post",
              "permalink": "http://docs.test/new", "body": "" }
        ]
    }"#;

    fn store() -> DumpStore {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DUMP.as_bytes()).unwrap();
        DumpStore::open(file.path()).unwrap()
    }

    #[tokio::test]
    async fn test_query_filters_type_and_date() {
        let store = store();
        let posts = vec!["post".to_string()];

        let all = store.query(&posts, None).await.unwrap();
        assert_eq!(all.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 3]);

        let recent = store.query(&posts, NaiveDate::from_ymd_opt(2024, 6, 2)).await.unwrap();
        assert_eq!(recent.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3]);
    }

    #[tokio::test]
    async fn test_record_by_id() {
        let store = store();
        let types = vec!["post".to_string(), "page".to_string()];
        assert_eq!(store.record(2, &types).await.unwrap().unwrap().title, "A page");
        assert!(store.record(2, &types[..1]).await.unwrap().is_none());
        assert!(store.record(99, &types).await.unwrap().is_none());
        assert_eq!(store.site_url().host_str(), Some("docs.test"));
    }

    #[test]
    fn test_invalid_dump_is_store_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        assert!(matches!(DumpStore::open(file.path()), Err(PipelineError::Store(_))));
    }
}
