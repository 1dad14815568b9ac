//! Locating a blueprint's template tree on local storage
//!
//! A blueprint is materialized from one of two places:
//! - `download_url`: a zip archive fetched over HTTP and extracted into a cache directory
//! - `repo`: a directory that already exists on this machine
//!
//! In both cases the blueprint's `path` selects a subdirectory of the source.

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::fetch::HttpFetcher;
use crate::registry::Blueprint;
use sha2::{Digest, Sha256};
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use zip::ZipArchive;

/// Where a blueprint's files come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlueprintSource {
    /// Zip archive to download
    Archive(String),
    /// Directory on the local filesystem
    Local(PathBuf),
}

impl BlueprintSource {
    /// Pick the source for a blueprint; archives take precedence over `repo`
    pub fn for_blueprint(blueprint: &Blueprint) -> Result<Self> {
        if !blueprint.download_url.is_empty() {
            return Ok(Self::Archive(blueprint.download_url.clone()));
        }
        let repo = Path::new(&blueprint.repo);
        if !blueprint.repo.is_empty() && repo.is_dir() {
            return Ok(Self::Local(repo.to_path_buf()));
        }
        Err(Error::fetch(
            blueprint.repo.clone(),
            None,
            format!(
                "blueprint '{}' has no download_url and its repo is not a local directory",
                blueprint.name
            ),
        ))
    }
}

/// Make a blueprint's template tree available locally and return its root
///
/// Archives are extracted under `cache_dir/<name>-<version>-<digest>`, replacing any
/// previous extraction of the same version.
pub async fn materialize(
    blueprint: &Blueprint,
    cache_dir: &Path,
    fetcher: &HttpFetcher,
    cancel: &CancelToken,
) -> Result<PathBuf> {
    let base = match BlueprintSource::for_blueprint(blueprint)? {
        BlueprintSource::Local(dir) => {
            debug!(blueprint = %blueprint.name, dir = %dir.display(), "using local source");
            dir
        }
        BlueprintSource::Archive(url) => {
            let bytes = fetcher.fetch(&url, "application/zip, */*", cancel).await?;
            let target = cache_dir.join(cache_key(blueprint));
            if fs::try_exists(&target).await.unwrap_or(false) {
                fs::remove_dir_all(&target)
                    .await
                    .map_err(|e| Error::io(&target, e))?;
            }
            let count = extract_zip(&bytes, &url, &target, cancel).await?;
            info!(blueprint = %blueprint.name, files = count, dir = %target.display(), "extracted archive");
            target
        }
    };

    let root = join_subpath(&base, &blueprint.path)?;
    if !root.is_dir() {
        return Err(Error::io(
            &root,
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "blueprint template directory does not exist",
            ),
        ));
    }
    Ok(root)
}

/// Directory name for an extracted archive
///
/// Sanitizing can map different names to the same string, so a short digest of
/// the raw name and version is appended.
fn cache_key(blueprint: &Blueprint) -> String {
    let raw = if blueprint.version.is_empty() {
        blueprint.name.clone()
    } else {
        format!("{}-{}", blueprint.name, blueprint.version)
    };
    let readable: String = raw
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '.' || c == '_' { c } else { '_' })
        .collect();

    let mut hasher = Sha256::new();
    hasher.update(blueprint.name.as_bytes());
    hasher.update([0u8]);
    hasher.update(blueprint.version.as_bytes());
    let digest: String = hasher
        .finalize()
        .iter()
        .take(4)
        .map(|b| format!("{:02x}", b))
        .collect();
    format!("{}-{}", readable, digest)
}

/// Join a blueprint sub-path, refusing anything that leaves `base`
fn join_subpath(base: &Path, sub: &str) -> Result<PathBuf> {
    let mut out = base.to_path_buf();
    for component in Path::new(sub).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => {
                return Err(Error::format(
                    format!("blueprint path '{}'", sub),
                    "must be a relative path inside the source",
                ))
            }
        }
    }
    Ok(out)
}

/// Extract a zip archive into `target`, returning the number of files written
///
/// If every entry shares one top-level directory (as GitHub archives do), that
/// directory is stripped.
async fn extract_zip(bytes: &[u8], url: &str, target: &Path, cancel: &CancelToken) -> Result<usize> {
    let entries = read_zip(bytes, url)?;
    let prefix = common_root(entries.iter().map(|(name, _)| name.as_path()));

    let mut count = 0;
    for (name, contents) in entries {
        cancel.check()?;
        let rel = match &prefix {
            Some(prefix) => name.strip_prefix(prefix).unwrap_or(&name).to_path_buf(),
            None => name,
        };
        if rel.as_os_str().is_empty() {
            continue;
        }
        let dest = target.join(&rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(parent, e))?;
        }
        fs::write(&dest, &contents)
            .await
            .map_err(|e| Error::io(&dest, e))?;
        count += 1;
    }
    Ok(count)
}

/// Read all file entries of an archive into memory
fn read_zip(bytes: &[u8], url: &str) -> Result<Vec<(PathBuf, Vec<u8>)>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::format(format!("archive {}", url), e))?;

    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| Error::format(format!("archive {}", url), e))?;

        // Skip directories
        if file.is_dir() {
            continue;
        }

        let name = file.enclosed_name().ok_or_else(|| {
            Error::format(
                format!("archive {}", url),
                format!("entry '{}' escapes the extraction directory", file.name()),
            )
        })?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)
            .map_err(|e| Error::format(format!("archive {}", url), e))?;
        entries.push((name, contents));
    }
    Ok(entries)
}

/// The single top-level directory shared by every path, if there is one
fn common_root<'a>(paths: impl Iterator<Item = &'a Path>) -> Option<PathBuf> {
    let mut root: Option<PathBuf> = None;
    for path in paths {
        let mut components = path.components();
        let first = components.next()?;
        // A file directly at the top level means there is no wrapper directory
        components.next()?;
        let first = PathBuf::from(first.as_os_str());
        match &root {
            None => root = Some(first),
            Some(existing) if *existing == first => {}
            Some(_) => return None,
        }
    }
    root
}
