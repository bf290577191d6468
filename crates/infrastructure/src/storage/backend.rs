use async_trait::async_trait;

/// Polymorphic upload target for the Storage Manager. Mirrors the Python
/// original's `BaseDriver` surface — `put`/`mkdirs`/`close` is all a backend
/// needs to expose; directory listing, stat and rename are out of scope
/// for this core (see DESIGN.md).
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Writes `bytes` to `path`, overwriting any existing file.
    async fn put(&mut self, path: &str, bytes: &[u8]) -> anyhow::Result<()>;

    /// Creates `path` and any missing parent directories. Idempotent.
    async fn mkdirs(&mut self, path: &str) -> anyhow::Result<()>;

    /// Releases the underlying connection. A no-op for the local backend.
    async fn close(&mut self) -> anyhow::Result<()>;
}

/// Connection parameters for the remote backends, read off a device's
/// `parameters` JSON blob. Field names match `storage_drivers.py`'s
/// `SFTPDriver.__init__` keyword arguments.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RemoteStorageParams {
    pub host: String,
    /// `0` means "use the backend's conventional default" (22 for SFTP, 21 for FTP).
    #[serde(default)]
    pub port: u16,
    pub user: String,
    pub password: String,
    #[serde(default = "default_root_path")]
    pub root_path: String,
    #[serde(default)]
    pub passive: bool,
    #[serde(default)]
    pub tls: bool,
}

fn default_root_path() -> String {
    "/".to_string()
}
