//! Registry persistence: local files and HTTP endpoints

use super::{Blueprint, Database};
use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::fetch::{is_remote, HttpFetcher};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Registry document as it appears on the wire; every collection may be null
#[derive(Debug, Deserialize)]
struct RawDatabase {
    #[serde(default)]
    blueprints: Option<Vec<RawBlueprint>>,
}

#[derive(Debug, Deserialize)]
struct RawBlueprint {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    repo: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

impl RawDatabase {
    /// Replace every null collection or string with its empty value
    fn normalize(self) -> Database {
        Database {
            blueprints: self
                .blueprints
                .unwrap_or_default()
                .into_iter()
                .map(RawBlueprint::normalize)
                .collect(),
        }
    }
}

impl RawBlueprint {
    fn normalize(self) -> Blueprint {
        Blueprint {
            name: self.name.unwrap_or_default(),
            version: self.version.unwrap_or_default(),
            repo: self.repo.unwrap_or_default(),
            path: self.path.unwrap_or_default(),
            download_url: self.download_url.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            tags: self.tags.unwrap_or_default(),
        }
    }
}

/// Load a registry from a local path or an `http://`/`https://` URL
pub async fn load(location: &str) -> Result<Database> {
    load_with(&HttpFetcher::default(), location, &CancelToken::new()).await
}

/// Load a registry with an explicit HTTP client and cancellation token
pub async fn load_with(
    fetcher: &HttpFetcher,
    location: &str,
    cancel: &CancelToken,
) -> Result<Database> {
    let data = if is_remote(location) {
        fetcher.fetch(location, "application/json", cancel).await?
    } else {
        cancel.check()?;
        fs::read(location)
            .await
            .map_err(|e| Error::io(location, e))?
    };

    let db = parse(location, &data)?;
    debug!(location, blueprints = db.blueprints.len(), "loaded registry");
    Ok(db)
}

fn parse(location: &str, data: &[u8]) -> Result<Database> {
    let raw: RawDatabase = serde_json::from_slice(data)
        .map_err(|e| Error::format(format!("registry JSON at {}", location), e))?;
    Ok(raw.normalize())
}

/// Serialize a registry to indented JSON and write it to `path`
///
/// Output is deterministic: equal databases produce byte-identical files.
pub async fn save(path: impl AsRef<Path>, db: &Database) -> Result<()> {
    let path = path.as_ref();
    let mut bytes = to_json(db)?;
    bytes.push(b'\n');
    fs::write(path, &bytes)
        .await
        .map_err(|e| Error::io(path, e))?;
    debug!(path = %path.display(), blueprints = db.blueprints.len(), "saved registry");
    Ok(())
}

fn to_json(db: &Database) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(db).map_err(|e| Error::format("registry", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fetch::testing::serve_once;
    use tempfile::TempDir;

    fn sample() -> Database {
        Database::new(vec![
            Blueprint {
                name: "rust-service".to_string(),
                version: "1.2.0".to_string(),
                repo: "https://github.com/example/blueprints".to_string(),
                path: "rust/service".to_string(),
                download_url: "https://example.com/rust-service.zip".to_string(),
                description: "Axum service skeleton".to_string(),
                tags: vec!["rust".to_string(), "http".to_string()],
            },
            Blueprint::new("bare", "0.1.0-alpha"),
        ])
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.json");

        save(&path, &sample()).await.unwrap();
        let loaded = load(path.to_str().unwrap()).await.unwrap();
        assert_eq!(loaded, sample());
    }

    #[tokio::test]
    async fn test_save_is_deterministic_and_never_null() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");

        save(&a, &sample()).await.unwrap();
        save(&b, &sample()).await.unwrap();
        let first = std::fs::read_to_string(&a).unwrap();
        let second = std::fs::read_to_string(&b).unwrap();
        assert_eq!(first, second);

        assert!(!first.contains("null"));
        assert!(first.contains("\"tags\": []"));
        let name_at = first.find("\"name\"").unwrap();
        let tags_at = first.find("\"tags\"").unwrap();
        assert!(name_at < tags_at);
    }

    #[tokio::test]
    async fn test_save_empty_database_emits_empty_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.json");
        save(&path, &Database::default()).await.unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\n  \"blueprints\": []\n}\n");
    }

    #[tokio::test]
    async fn test_save_into_missing_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no-such-dir").join("registry.json");
        let err = save(&path, &sample()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        match err {
            Error::Io { path: failed, .. } => assert_eq!(failed, path),
            other => panic!("expected io error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_normalizes_nulls() {
        let db = parse(
            "inline",
            br#"{"blueprints": [{"name": "a", "version": "1.0.0", "tags": null, "description": null}]}"#,
        )
        .unwrap();
        assert_eq!(db.blueprints[0].tags, Vec::<String>::new());
        assert_eq!(db.blueprints[0].description, "");

        assert!(parse("inline", br#"{"blueprints": null}"#).unwrap().blueprints.is_empty());
        assert!(parse("inline", b"{}").unwrap().blueprints.is_empty());
    }

    #[test]
    fn test_parse_ignores_unknown_keys() {
        let db = parse(
            "inline",
            br#"{"schema": 2, "blueprints": [{"name": "a", "stars": 10, "tags": ["x"]}]}"#,
        )
        .unwrap();
        assert_eq!(db.blueprints[0].name, "a");
        assert_eq!(db.blueprints[0].tags, vec!["x".to_string()]);
    }

    #[test]
    fn test_parse_malformed_json() {
        let err = parse("inline", b"{\"blueprints\": [").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.json");
        let err = load(missing.to_str().unwrap()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[tokio::test]
    async fn test_load_remote_registry() {
        let body = br#"{"blueprints": [{"name": "remote", "version": "3.0.0"}]}"#.to_vec();
        let (base, _requests) = serve_once("200 OK", "application/json", body);

        let db = load(&format!("{}/registry.json", base)).await.unwrap();
        assert_eq!(db.find("remote").unwrap().version, "3.0.0");
        assert!(db.blueprints[0].tags.is_empty());
    }

    #[tokio::test]
    async fn test_load_remote_404_is_fetch_error() {
        let (base, _requests) = serve_once("404 Not Found", "text/plain", b"no registry here".to_vec());

        let err = load(&format!("{}/registry.json", base)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fetch);
        assert!(err.to_string().contains("404"));
        match err {
            Error::Fetch { status, message, .. } => {
                assert_eq!(status, Some(404));
                assert_eq!(message, "no registry here");
            }
            other => panic!("expected fetch error, got {:?}", other),
        }
    }
}
