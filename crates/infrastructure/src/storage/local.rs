use crate::storage::backend::StorageBackend;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Writes under a fixed root directory, refusing any resolved path that
/// escapes it. Grounded on `LocalDriver._abs()` in the original, which
/// rejects `os.path.commonpath([root, target]) != root`.
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> anyhow::Result<PathBuf> {
        let joined = self.root.join(path.trim_start_matches('/'));
        let abs = normalize(&joined);
        let root_abs = normalize(&self.root);
        if !abs.starts_with(&root_abs) {
            anyhow::bail!("path '{path}' escapes storage root");
        }
        Ok(abs)
    }
}

/// Lexically collapses `.`/`..` components without touching the filesystem,
/// since the destination may not exist yet.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                out.pop();
            }
            std::path::Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[async_trait]
impl StorageBackend for LocalBackend {
    async fn put(&mut self, path: &str, bytes: &[u8]) -> anyhow::Result<()> {
        let abs = self.resolve(path)?;
        if let Some(parent) = abs.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&abs, bytes).await?;
        Ok(())
    }

    async fn mkdirs(&mut self, path: &str) -> anyhow::Result<()> {
        let abs = self.resolve(path)?;
        tokio::fs::create_dir_all(&abs).await?;
        Ok(())
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_writes_bytes_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = LocalBackend::new(dir.path());
        backend.put("images/a.jpg", b"data").await.unwrap();
        let written = tokio::fs::read(dir.path().join("images/a.jpg"))
            .await
            .unwrap();
        assert_eq!(written, b"data");
    }

    #[tokio::test]
    async fn put_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = LocalBackend::new(dir.path());
        let err = backend.put("../../etc/passwd", b"x").await.unwrap_err();
        assert!(err.to_string().contains("escapes storage root"));
    }

    #[tokio::test]
    async fn mkdirs_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = LocalBackend::new(dir.path());
        backend.mkdirs("a/b/c").await.unwrap();
        backend.mkdirs("a/b/c").await.unwrap();
        assert!(dir.path().join("a/b/c").is_dir());
    }
}
