mod backend;
mod ftp;
mod local;
mod sftp;

pub use backend::{RemoteStorageParams, StorageBackend};
pub use ftp::FtpBackend;
pub use local::LocalBackend;
pub use sftp::SftpBackend;

use domain::device::Device;
use domain::StorageBackendKind;

/// Opens the right backend for a device's resolved storage kind. Local
/// storage never fails to "connect" (it's just a root directory); the
/// remote kinds open a fresh connection per call, matching the original's
/// "connections are per-operation, no pool" rule.
pub async fn open_backend(
    kind: StorageBackendKind,
    device: &Device,
    storage_root: &str,
) -> anyhow::Result<Box<dyn StorageBackend>> {
    match kind {
        StorageBackendKind::Local => Ok(Box::new(LocalBackend::new(storage_root))),
        StorageBackendKind::Sftp => {
            let params: RemoteStorageParams = serde_json::from_value(device.parameters.clone())?;
            Ok(Box::new(SftpBackend::connect(&params).await?))
        }
        StorageBackendKind::Ftp => {
            let params: RemoteStorageParams = serde_json::from_value(device.parameters.clone())?;
            Ok(Box::new(FtpBackend::connect(&params).await?))
        }
    }
}
