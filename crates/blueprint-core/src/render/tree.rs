//! Enumerating and reading a template source tree

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

/// One file of a template tree
#[derive(Debug, Clone)]
pub struct TreeFile {
    /// Source-relative path with `/` separators, used as the template name
    pub rel: String,
    /// Absolute (or caller-relative) path on disk
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// List every regular file under `root`, sorted by name at each level
///
/// Directories are traversed but not returned. Symlinks are followed.
pub fn enumerate(root: &Path, cancel: &CancelToken) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
    {
        cancel.check()?;
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
            Error::io(path, source)
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        let rel = relative_name(root, &path)?;
        files.push((rel, path));
    }
    Ok(files)
}

/// Read every enumerated file into memory
pub async fn read(root: &Path, cancel: &CancelToken) -> Result<Vec<TreeFile>> {
    let mut tree = Vec::new();
    for (rel, path) in enumerate(root, cancel)? {
        cancel.check()?;
        let bytes = fs::read(&path).await.map_err(|e| Error::io(&path, e))?;
        tree.push(TreeFile { rel, path, bytes });
    }
    Ok(tree)
}

/// `/`-joined path of `path` relative to `root`
fn relative_name(root: &Path, path: &Path) -> Result<String> {
    let rel = path.strip_prefix(root).map_err(|_| {
        Error::format(
            format!("path {}", path.display()),
            format!("not under {}", root.display()),
        )
    })?;

    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => {
                return Err(Error::format(
                    format!("path {}", path.display()),
                    "unexpected path component",
                ))
            }
        }
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_enumerate_is_sorted_and_skips_dirs() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b.txt", "b");
        write(dir.path(), "a/z.txt", "z");
        write(dir.path(), "a/y.txt", "y");
        std::fs::create_dir_all(dir.path().join("empty")).unwrap();

        let names: Vec<String> = enumerate(dir.path(), &CancelToken::new())
            .unwrap()
            .into_iter()
            .map(|(rel, _)| rel)
            .collect();
        assert_eq!(names, ["a/y.txt", "a/z.txt", "b.txt"]);
    }

    #[test]
    fn test_enumerate_missing_root_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = enumerate(&dir.path().join("missing"), &CancelToken::new()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io);
    }

    #[tokio::test]
    async fn test_read_loads_contents() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "{{Pkg}}/main.go.tmpl", "package {{Pkg}}");

        let tree = read(dir.path(), &CancelToken::new()).await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].rel, "{{Pkg}}/main.go.tmpl");
        assert_eq!(tree[0].bytes, b"package {{Pkg}}");
    }
}
