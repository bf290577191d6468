use crate::storage::backend::{RemoteStorageParams, StorageBackend};
use async_trait::async_trait;
use suppaftp::AsyncNativeTlsFtpStream;

const DEFAULT_FTP_PORT: u16 = 21;

/// Plain/implicit-TLS FTP upload. Not present in the original (which only
/// ever spoke SFTP for its remote backend) — added because `protocol: ftp`
/// is a device parameter this core's device models are allowed to carry;
/// see DESIGN.md for the ungrounded-crate note.
pub struct FtpBackend {
    stream: AsyncNativeTlsFtpStream,
    root: String,
}

impl FtpBackend {
    pub async fn connect(params: &RemoteStorageParams) -> anyhow::Result<Self> {
        let port = if params.port == 0 {
            DEFAULT_FTP_PORT
        } else {
            params.port
        };

        let mut stream =
            AsyncNativeTlsFtpStream::connect(format!("{}:{}", params.host, port)).await?;
        if params.tls {
            stream = stream.into_secure(suppaftp::native_tls::TlsConnector::new()?.into(), &params.host).await?;
        }
        stream.login(&params.user, &params.password).await?;
        if params.passive {
            stream.set_mode(suppaftp::Mode::Passive);
        } else {
            stream.set_mode(suppaftp::Mode::Active);
        }

        let root = if params.root_path.is_empty() {
            "/".to_string()
        } else {
            params.root_path.clone()
        };

        Ok(Self { stream, root })
    }

    fn remote_path(&self, path: &str) -> String {
        format!("{}/{}", self.root.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

#[async_trait]
impl StorageBackend for FtpBackend {
    async fn put(&mut self, path: &str, bytes: &[u8]) -> anyhow::Result<()> {
        let remote = self.remote_path(path);
        if let Some(parent) = remote.rsplit_once('/').map(|(p, _)| p) {
            self.mkdirs(parent).await?;
        }
        let mut cursor = std::io::Cursor::new(bytes.to_vec());
        self.stream.put_file(&remote, &mut cursor).await?;
        Ok(())
    }

    async fn mkdirs(&mut self, path: &str) -> anyhow::Result<()> {
        let remote = self.remote_path(path);
        let mut built = String::new();
        for segment in remote.split('/').filter(|s| !s.is_empty()) {
            built.push('/');
            built.push_str(segment);
            // FTP has no "mkdir -p"; ignore the error when the directory
            // already exists and keep descending.
            let _ = self.stream.mkdir(&built).await;
        }
        Ok(())
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.stream.quit().await?;
        Ok(())
    }
}
